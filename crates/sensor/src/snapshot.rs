//! Immutable environment snapshots.
//!
//! A snapshot captures coarse network quality and device capability at one
//! point in time. Snapshots are value objects: recomputed and replaced
//! wholesale on platform change events, never mutated in place.

use serde::{Deserialize, Serialize};

/// Coarse network quality scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkClass {
    Slow,
    Medium,
    Fast,
}

/// Coarse device memory scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryClass {
    Low,
    Mid,
    High,
}

/// Point-in-time view of network and device conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub network_class: NetworkClass,
    /// Best-effort downlink estimate; 0.0 when the platform reports none.
    pub estimated_bandwidth_mbps: f64,
    pub device_memory_class: MemoryClass,
    pub core_count: usize,
    /// Derived: low memory or very few cores.
    pub is_low_end_device: bool,
    pub data_saver_requested: bool,
}

impl EnvironmentSnapshot {
    /// Build a snapshot, deriving `is_low_end_device`.
    pub fn new(
        network_class: NetworkClass,
        estimated_bandwidth_mbps: f64,
        device_memory_class: MemoryClass,
        core_count: usize,
        data_saver_requested: bool,
    ) -> Self {
        let is_low_end_device = device_memory_class == MemoryClass::Low || core_count <= 2;
        Self {
            network_class,
            estimated_bandwidth_mbps,
            device_memory_class,
            core_count,
            is_low_end_device,
            data_saver_requested,
        }
    }

    /// Conservative default when platform introspection is unavailable:
    /// medium network, mid-range device.
    pub fn conservative_default() -> Self {
        Self::new(NetworkClass::Medium, 5.0, MemoryClass::Mid, 4, false)
    }

    /// Whether the snapshot calls for reduced resource usage.
    pub fn is_constrained(&self) -> bool {
        self.is_low_end_device
            || self.network_class == NetworkClass::Slow
            || self.data_saver_requested
    }

    /// Whether device memory and cores are abundant enough to boost
    /// concurrency.
    pub fn is_abundant(&self) -> bool {
        self.device_memory_class == MemoryClass::High && self.core_count >= 8
    }
}

impl Default for EnvironmentSnapshot {
    fn default() -> Self {
        Self::conservative_default()
    }
}
