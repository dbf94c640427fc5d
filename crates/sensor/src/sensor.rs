//! Environment sensor: current snapshot plus change subscriptions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use tracing::debug;

use crate::probe::{PlatformProbe, StaticProbe};
use crate::snapshot::EnvironmentSnapshot;

type Listener = Box<dyn Fn(&EnvironmentSnapshot) + Send + Sync>;
type ListenerMap = Mutex<HashMap<u64, Listener>>;

/// Samples network quality and device capability through a
/// [`PlatformProbe`] and pushes snapshot changes to subscribers.
///
/// The platform adapter calls [`refresh`](EnvironmentSensor::refresh) from
/// its connection-change event source; consumers either poll
/// [`sample`](EnvironmentSensor::sample) or subscribe via
/// [`on_change`](EnvironmentSensor::on_change).
pub struct EnvironmentSensor {
    probe: Arc<dyn PlatformProbe>,
    current: RwLock<EnvironmentSnapshot>,
    listeners: Arc<ListenerMap>,
    next_id: AtomicU64,
}

impl EnvironmentSensor {
    pub fn new(probe: Arc<dyn PlatformProbe>) -> Self {
        let current = probe.snapshot();
        Self {
            probe,
            current: RwLock::new(current),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Sensor with no platform introspection — always reports the
    /// conservative default snapshot.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(StaticProbe::new()))
    }

    /// Current snapshot (cheap clone of a value object).
    pub fn sample(&self) -> EnvironmentSnapshot {
        self.current.read().unwrap().clone()
    }

    /// Re-read the probe and replace the snapshot wholesale. Subscribers
    /// are notified only when the snapshot actually changed.
    pub fn refresh(&self) -> EnvironmentSnapshot {
        let fresh = self.probe.snapshot();
        let changed = {
            let mut current = self.current.write().unwrap();
            if *current == fresh {
                false
            } else {
                *current = fresh.clone();
                true
            }
        };

        if changed {
            debug!(
                network = ?fresh.network_class,
                low_end = fresh.is_low_end_device,
                data_saver = fresh.data_saver_requested,
                "environment snapshot changed"
            );
            let listeners = self.listeners.lock().unwrap();
            for listener in listeners.values() {
                listener(&fresh);
            }
        }
        fresh
    }

    /// Register a change callback. The returned subscription deregisters
    /// the callback when dropped or explicitly unsubscribed.
    pub fn on_change(
        &self,
        callback: impl Fn(&EnvironmentSnapshot) + Send + Sync + 'static,
    ) -> SensorSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap()
            .insert(id, Box::new(callback));
        SensorSubscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }
}

/// Handle to a registered change callback. Dropping it deregisters.
pub struct SensorSubscription {
    id: u64,
    listeners: Weak<ListenerMap>,
}

impl SensorSubscription {
    /// Deregister explicitly. Returns whether the callback was still
    /// registered.
    pub fn unsubscribe(self) -> bool {
        self.remove()
    }

    fn remove(&self) -> bool {
        match self.listeners.upgrade() {
            Some(listeners) => listeners.lock().unwrap().remove(&self.id).is_some(),
            None => false,
        }
    }
}

impl Drop for SensorSubscription {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{MemoryClass, NetworkClass};
    use std::sync::atomic::AtomicUsize;

    /// Probe whose readings can be swapped mid-test.
    struct SwappableProbe {
        inner: Mutex<StaticProbe>,
    }

    impl SwappableProbe {
        fn new(probe: StaticProbe) -> Self {
            Self {
                inner: Mutex::new(probe),
            }
        }

        fn set(&self, probe: StaticProbe) {
            *self.inner.lock().unwrap() = probe;
        }
    }

    impl PlatformProbe for SwappableProbe {
        fn network_class(&self) -> Option<NetworkClass> {
            self.inner.lock().unwrap().network_class
        }
        fn bandwidth_mbps(&self) -> Option<f64> {
            self.inner.lock().unwrap().bandwidth_mbps
        }
        fn memory_class(&self) -> Option<MemoryClass> {
            self.inner.lock().unwrap().memory_class
        }
        fn core_count(&self) -> Option<usize> {
            self.inner.lock().unwrap().core_count
        }
        fn data_saver(&self) -> Option<bool> {
            self.inner.lock().unwrap().data_saver
        }
    }

    #[test]
    fn sample_returns_probe_snapshot() {
        let sensor = EnvironmentSensor::with_defaults();
        assert_eq!(sensor.sample(), EnvironmentSnapshot::conservative_default());
    }

    #[test]
    fn refresh_notifies_on_change_only() {
        let probe = Arc::new(SwappableProbe::new(StaticProbe::new()));
        let sensor = EnvironmentSensor::new(probe.clone());

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let _sub = sensor.on_change(move |_| {
            fired_clone.fetch_add(1, Ordering::Relaxed);
        });

        // Same readings — no notification.
        sensor.refresh();
        assert_eq!(fired.load(Ordering::Relaxed), 0);

        probe.set(StaticProbe::new().with_network(NetworkClass::Slow));
        sensor.refresh();
        assert_eq!(fired.load(Ordering::Relaxed), 1);
        assert_eq!(sensor.sample().network_class, NetworkClass::Slow);

        // Unchanged again.
        sensor.refresh();
        assert_eq!(fired.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn dropping_subscription_deregisters() {
        let sensor = EnvironmentSensor::with_defaults();
        let sub = sensor.on_change(|_| {});
        assert_eq!(sensor.listener_count(), 1);
        drop(sub);
        assert_eq!(sensor.listener_count(), 0);
    }

    #[test]
    fn explicit_unsubscribe() {
        let sensor = EnvironmentSensor::with_defaults();
        let sub = sensor.on_change(|_| {});
        assert!(sub.unsubscribe());
        assert_eq!(sensor.listener_count(), 0);
    }
}
