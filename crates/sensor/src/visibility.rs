//! One-shot viewport visibility observer.
//!
//! The platform adapter feeds intersection reports in; each observed handle
//! fires its callback at most once, on the first report at or above its
//! threshold, then auto-disposes.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::snapshot::EnvironmentSnapshot;

/// Visibility check parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityOptions {
    /// Fraction of the unit that must intersect the viewport (0.0–1.0).
    pub threshold: f64,
    /// Extra margin around the viewport counted as visible.
    pub margin_px: u32,
}

impl VisibilityOptions {
    /// Widen the options for constrained environments: fewer, coarser
    /// checks. A resource-conservation policy, not a correctness one.
    pub fn widened_for(self, snapshot: &EnvironmentSnapshot) -> Self {
        if snapshot.is_low_end_device || snapshot.data_saver_requested {
            Self {
                threshold: (self.threshold * 2.0).min(0.5),
                margin_px: self.margin_px / 2,
            }
        } else {
            self
        }
    }
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            margin_px: 100,
        }
    }
}

type VisibleCallback = Box<dyn FnOnce() + Send>;

struct Entry {
    options: VisibilityOptions,
    callback: VisibleCallback,
}

/// Tracks pending one-shot visibility subscriptions keyed by unit handle.
#[derive(Default)]
pub struct ViewportObserver {
    entries: Mutex<HashMap<String, Entry>>,
}

impl ViewportObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a one-shot callback for a unit handle. A later `observe`
    /// for the same handle replaces the earlier subscription.
    pub fn observe(
        &self,
        handle_id: impl Into<String>,
        options: VisibilityOptions,
        callback: impl FnOnce() + Send + 'static,
    ) {
        let handle_id = handle_id.into();
        debug!(handle = %handle_id, threshold = options.threshold, "observing unit");
        self.entries.lock().unwrap().insert(
            handle_id,
            Entry {
                options,
                callback: Box::new(callback),
            },
        );
    }

    /// Cancel a subscription before it fires. Returns whether one existed.
    pub fn unobserve(&self, handle_id: &str) -> bool {
        self.entries.lock().unwrap().remove(handle_id).is_some()
    }

    /// Platform adapter entry point: report an intersection ratio for a
    /// handle. Fires and disposes the subscription when the ratio meets
    /// the threshold. Returns whether the callback fired.
    pub fn report_intersection(&self, handle_id: &str, ratio: f64) -> bool {
        let entry = {
            let mut entries = self.entries.lock().unwrap();
            match entries.get(handle_id) {
                Some(entry) if ratio >= entry.options.threshold => {
                    entries.remove(handle_id)
                }
                _ => None,
            }
        };

        match entry {
            Some(entry) => {
                debug!(handle = %handle_id, ratio, "unit became visible");
                (entry.callback)();
                true
            }
            None => false,
        }
    }

    /// Number of pending subscriptions.
    pub fn pending(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}
