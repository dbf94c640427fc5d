//! Platform introspection seam.

use crate::snapshot::{EnvironmentSnapshot, MemoryClass, NetworkClass};

/// Read-only view of the host platform's network/device introspection APIs.
///
/// Every read returns `Option`: `None` means the platform does not expose
/// that capability, and the sensor substitutes a conservative default.
pub trait PlatformProbe: Send + Sync {
    fn network_class(&self) -> Option<NetworkClass>;
    fn bandwidth_mbps(&self) -> Option<f64>;
    fn memory_class(&self) -> Option<MemoryClass>;
    fn core_count(&self) -> Option<usize>;
    fn data_saver(&self) -> Option<bool>;

    /// Resolve a full snapshot, filling gaps from the conservative default.
    fn snapshot(&self) -> EnvironmentSnapshot {
        let fallback = EnvironmentSnapshot::conservative_default();
        EnvironmentSnapshot::new(
            self.network_class().unwrap_or(fallback.network_class),
            self.bandwidth_mbps()
                .unwrap_or(fallback.estimated_bandwidth_mbps),
            self.memory_class().unwrap_or(fallback.device_memory_class),
            self.core_count().unwrap_or(fallback.core_count),
            self.data_saver().unwrap_or(fallback.data_saver_requested),
        )
    }
}

/// Probe returning fixed values. Used in tests and deployments where the
/// platform adapter resolves conditions once up front.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    pub network_class: Option<NetworkClass>,
    pub bandwidth_mbps: Option<f64>,
    pub memory_class: Option<MemoryClass>,
    pub core_count: Option<usize>,
    pub data_saver: Option<bool>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_network(mut self, class: NetworkClass) -> Self {
        self.network_class = Some(class);
        self
    }

    pub fn with_bandwidth(mut self, mbps: f64) -> Self {
        self.bandwidth_mbps = Some(mbps);
        self
    }

    pub fn with_memory(mut self, class: MemoryClass) -> Self {
        self.memory_class = Some(class);
        self
    }

    pub fn with_cores(mut self, count: usize) -> Self {
        self.core_count = Some(count);
        self
    }

    pub fn with_data_saver(mut self, on: bool) -> Self {
        self.data_saver = Some(on);
        self
    }
}

impl PlatformProbe for StaticProbe {
    fn network_class(&self) -> Option<NetworkClass> {
        self.network_class
    }

    fn bandwidth_mbps(&self) -> Option<f64> {
        self.bandwidth_mbps
    }

    fn memory_class(&self) -> Option<MemoryClass> {
        self.memory_class
    }

    fn core_count(&self) -> Option<usize> {
        self.core_count
    }

    fn data_saver(&self) -> Option<bool> {
        self.data_saver
    }
}
