//! Effective-priority classification.
//!
//! Scenario overrides apply first, then environment-driven demotions.
//! The ordering is deliberate: operational urgency may force work to the
//! front, but resource scarcity only pushes non-critical work further
//! back. Demotions never promote and never touch Critical.

use std::sync::Arc;

use stump_core::{Category, Priority};
use stump_sensor::{EnvironmentSensor, NetworkClass};

use crate::scenario::ScenarioContext;

/// Computes the priority a unit is actually scheduled at.
pub struct PriorityClassifier {
    scenario: Arc<ScenarioContext>,
    sensor: Arc<EnvironmentSensor>,
}

impl PriorityClassifier {
    pub fn new(scenario: Arc<ScenarioContext>, sensor: Arc<EnvironmentSensor>) -> Self {
        Self { scenario, sensor }
    }

    /// Classify a unit's declared priority into its effective priority.
    pub fn classify(&self, category: Category, declared: Priority) -> Priority {
        let mut effective = self.scenario.effective_priority(category, declared);
        let snapshot = self.sensor.sample();

        // Demotions apply in sequence: a low-end device on a slow network
        // takes Important all the way to Background.
        if snapshot.is_low_end_device && effective == Priority::Important {
            effective = effective.demote();
        }
        if (snapshot.network_class == NetworkClass::Slow || snapshot.data_saver_requested)
            && effective == Priority::Deferred
        {
            effective = effective.demote();
        }
        effective
    }

    pub fn scenario(&self) -> &Arc<ScenarioContext> {
        &self.scenario
    }

    pub fn sensor(&self) -> &Arc<EnvironmentSensor> {
        &self.sensor
    }
}
