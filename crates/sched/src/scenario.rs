//! Operational scenarios and category priority overrides.
//!
//! A scenario is a named operational mode that remaps category priorities
//! system-wide. The override table is fully recomputed on every scenario
//! change — never incrementally patched — so no stale entries survive a
//! transition.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use stump_core::{Category, NoopTelemetry, Priority, TelemetrySink};

use crate::error::SchedError;

/// Named operational mode of the campaign dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    Normal,
    Rally,
    ElectionDay,
    Crisis,
    Planning,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Normal => "normal",
            Scenario::Rally => "rally",
            Scenario::ElectionDay => "election-day",
            Scenario::Crisis => "crisis",
            Scenario::Planning => "planning",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(Scenario::Normal),
            "rally" => Ok(Scenario::Rally),
            "election-day" | "electionday" => Ok(Scenario::ElectionDay),
            "crisis" => Ok(Scenario::Crisis),
            "planning" => Ok(Scenario::Planning),
            _ => Err(SchedError::UnknownScenario(s.to_string())),
        }
    }
}

/// Fixed category→priority override table for a scenario.
fn overrides_for(scenario: Scenario) -> HashMap<Category, Priority> {
    match scenario {
        Scenario::Normal => HashMap::new(),
        Scenario::Rally => HashMap::from([
            (Category::Communication, Priority::Critical),
            (Category::Media, Priority::Important),
        ]),
        Scenario::ElectionDay => HashMap::from([
            (Category::Analytics, Priority::Critical),
            (Category::Visualization, Priority::Critical),
        ]),
        Scenario::Crisis => HashMap::from([
            (Category::Communication, Priority::Critical),
            (Category::PoliticalIntel, Priority::Critical),
        ]),
        Scenario::Planning => HashMap::from([(Category::Analytics, Priority::Important)]),
    }
}

struct State {
    current: Scenario,
    overrides: HashMap<Category, Priority>,
}

/// Holds the current scenario and its category override table.
pub struct ScenarioContext {
    state: RwLock<State>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl ScenarioContext {
    pub fn new(telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            state: RwLock::new(State {
                current: Scenario::Normal,
                overrides: overrides_for(Scenario::Normal),
            }),
            telemetry,
        }
    }

    /// Parse and apply a scenario by name. Unknown names are rejected and
    /// the context is left unchanged.
    pub fn set_scenario(&self, name: &str) -> Result<Scenario, SchedError> {
        let scenario: Scenario = name.parse()?;
        self.set(scenario);
        Ok(scenario)
    }

    /// Apply a scenario, recomputing the override table wholesale.
    pub fn set(&self, scenario: Scenario) {
        let mut state = self.state.write().unwrap();
        let previous = state.current;
        state.current = scenario;
        state.overrides = overrides_for(scenario);
        drop(state);

        if previous != scenario {
            info!(from = %previous, to = %scenario, "scenario changed");
            self.telemetry.record(
                "scenario.changed",
                json!({ "from": previous.as_str(), "to": scenario.as_str() }),
            );
        }
    }

    pub fn current(&self) -> Scenario {
        self.state.read().unwrap().current
    }

    /// Override for the category if present, else the declared priority.
    pub fn effective_priority(&self, category: Category, declared: Priority) -> Priority {
        self.state
            .read()
            .unwrap()
            .overrides
            .get(&category)
            .copied()
            .unwrap_or(declared)
    }

    /// Snapshot of the active override table.
    pub fn overrides(&self) -> HashMap<Category, Priority> {
        self.state.read().unwrap().overrides.clone()
    }
}

impl Default for ScenarioContext {
    fn default() -> Self {
        Self::new(Arc::new(NoopTelemetry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stump_core::MemoryTelemetry;

    #[test]
    fn starts_in_normal_with_no_overrides() {
        let ctx = ScenarioContext::default();
        assert_eq!(ctx.current(), Scenario::Normal);
        assert!(ctx.overrides().is_empty());
        assert_eq!(
            ctx.effective_priority(Category::Communication, Priority::Deferred),
            Priority::Deferred
        );
    }

    #[test]
    fn crisis_forces_communication_and_intel_critical() {
        let ctx = ScenarioContext::default();
        ctx.set_scenario("crisis").unwrap();

        assert_eq!(
            ctx.effective_priority(Category::Communication, Priority::Deferred),
            Priority::Critical
        );
        assert_eq!(
            ctx.effective_priority(Category::PoliticalIntel, Priority::Background),
            Priority::Critical
        );
        // Unaffected category keeps its declared priority.
        assert_eq!(
            ctx.effective_priority(Category::Visualization, Priority::Deferred),
            Priority::Deferred
        );
    }

    #[test]
    fn election_day_promotes_analytics_and_visualization() {
        let ctx = ScenarioContext::default();
        ctx.set_scenario("election-day").unwrap();
        assert_eq!(
            ctx.effective_priority(Category::Analytics, Priority::Background),
            Priority::Critical
        );
        assert_eq!(
            ctx.effective_priority(Category::Visualization, Priority::Deferred),
            Priority::Critical
        );
    }

    #[test]
    fn unknown_scenario_rejected_context_unchanged() {
        let ctx = ScenarioContext::default();
        ctx.set_scenario("crisis").unwrap();

        let err = ctx.set_scenario("marsattack").unwrap_err();
        assert!(matches!(err, SchedError::UnknownScenario(_)));
        assert_eq!(ctx.current(), Scenario::Crisis);
        assert_eq!(
            ctx.effective_priority(Category::Communication, Priority::Deferred),
            Priority::Critical
        );
    }

    #[test]
    fn overrides_recomputed_not_merged() {
        let ctx = ScenarioContext::default();
        ctx.set_scenario("crisis").unwrap();
        ctx.set_scenario("election-day").unwrap();

        // Crisis entries must not survive the transition.
        assert_eq!(
            ctx.effective_priority(Category::Communication, Priority::Deferred),
            Priority::Deferred
        );
        assert_eq!(
            ctx.effective_priority(Category::Analytics, Priority::Deferred),
            Priority::Critical
        );
    }

    #[test]
    fn crisis_strictly_raises_for_declared_at_or_below_override() {
        let ctx = ScenarioContext::default();
        for declared in [Priority::Important, Priority::Deferred, Priority::Background] {
            let normal = ctx.effective_priority(Category::Communication, declared);
            ctx.set_scenario("crisis").unwrap();
            let crisis = ctx.effective_priority(Category::Communication, declared);
            assert!(crisis < normal, "crisis must raise {declared}");
            ctx.set_scenario("normal").unwrap();
        }
    }

    #[test]
    fn scenario_change_emits_telemetry() {
        let sink = Arc::new(MemoryTelemetry::new());
        let ctx = ScenarioContext::new(sink.clone());
        ctx.set_scenario("rally").unwrap();
        ctx.set_scenario("rally").unwrap(); // no-op change, no event

        assert_eq!(sink.count("scenario.changed"), 1);
        let events = sink.events();
        assert_eq!(events[0].1["to"], "rally");
    }

    #[test]
    fn scenario_parse_roundtrip() {
        for s in [
            Scenario::Normal,
            Scenario::Rally,
            Scenario::ElectionDay,
            Scenario::Crisis,
            Scenario::Planning,
        ] {
            assert_eq!(s.as_str().parse::<Scenario>().unwrap(), s);
        }
    }
}
