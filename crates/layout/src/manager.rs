//! Grid layout manager.
//!
//! Owns the live set of widget instances, validates mutations against the
//! registry, and persists snapshots through a [`LayoutStore`]. Loading is
//! forgiving: a missing or corrupt snapshot degrades to an empty layout
//! rather than surfacing an error to the dashboard. Writes are
//! last-write-wins; concurrent sessions are not reconciled.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indexmap::IndexMap;
use serde_json::json;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use stump_core::{LayoutConfig, NoopTelemetry, TelemetrySink};
use stump_registry::{ConfigOverrides, GridPos, WidgetRegistry};

use crate::error::LayoutError;
use crate::snapshot::{BreakpointConfig, LayoutSnapshot, WidgetInstance, SNAPSHOT_VERSION};
use crate::store::{LayoutStore, MemoryStore};

struct Inner {
    instances: IndexMap<String, WidgetInstance>,
    layouts: BreakpointConfig,
    // Per-definition instance counters, kept ahead of restored ids.
    seq: HashMap<String, u64>,
}

/// Explicit-instance layout manager; store and registry are injected.
pub struct LayoutManager {
    registry: Arc<WidgetRegistry>,
    store: Arc<dyn LayoutStore>,
    config: LayoutConfig,
    telemetry: Arc<dyn TelemetrySink>,
    inner: Mutex<Inner>,
    autosave_gen: AtomicU64,
}

impl LayoutManager {
    pub fn new(
        registry: Arc<WidgetRegistry>,
        store: Arc<dyn LayoutStore>,
        config: LayoutConfig,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            registry,
            store,
            config,
            telemetry,
            inner: Mutex::new(Inner {
                instances: IndexMap::new(),
                layouts: BreakpointConfig::default(),
                seq: HashMap::new(),
            }),
            autosave_gen: AtomicU64::new(0),
        }
    }

    pub fn with_defaults(registry: Arc<WidgetRegistry>) -> Self {
        Self::new(
            registry,
            Arc::new(MemoryStore::new()),
            LayoutConfig::default(),
            Arc::new(NoopTelemetry),
        )
    }

    // ── Instance mutation ─────────────────────────────────────────

    /// Place a new instance of a registered widget. Geometry comes from
    /// the registry's grid config for the definition.
    pub fn add_instance(
        self: &Arc<Self>,
        widget_id: &str,
        position: GridPos,
    ) -> Result<WidgetInstance, LayoutError> {
        let grid = self
            .registry
            .grid_config(widget_id, ConfigOverrides::default())
            .map_err(|_| LayoutError::DefinitionNotFound(widget_id.to_string()))?;

        let instance = {
            let mut inner = self.inner.lock().unwrap();
            let seq = inner.seq.entry(widget_id.to_string()).or_insert(0);
            *seq += 1;
            let instance = WidgetInstance {
                instance_id: format!("{widget_id}-{seq}"),
                widget_definition_id: widget_id.to_string(),
                position,
                size: grid.size,
                props: grid.props,
                created_at: chrono::Utc::now(),
                orphaned: false,
            };
            inner
                .instances
                .insert(instance.instance_id.clone(), instance.clone());
            instance
        };

        debug!(instance = %instance.instance_id, "widget instance added");
        self.schedule_autosave();
        Ok(instance)
    }

    /// Remove an instance. Idempotent.
    pub fn remove_instance(self: &Arc<Self>, instance_id: &str) -> bool {
        let removed = self
            .inner
            .lock()
            .unwrap()
            .instances
            .shift_remove(instance_id)
            .is_some();
        if removed {
            debug!(instance = %instance_id, "widget instance removed");
            self.schedule_autosave();
        }
        removed
    }

    /// Current instances in placement order.
    pub fn instances(&self) -> Vec<WidgetInstance> {
        self.inner.lock().unwrap().instances.values().cloned().collect()
    }

    pub fn get_instance(&self, instance_id: &str) -> Option<WidgetInstance> {
        self.inner.lock().unwrap().instances.get(instance_id).cloned()
    }

    /// Replace the whole layout atomically. Every incoming instance is
    /// validated first; one bad instance rejects the entire update.
    /// Instances referencing unknown definitions are kept but flagged
    /// orphaned.
    pub fn replace_layout(
        self: &Arc<Self>,
        instances: Vec<WidgetInstance>,
    ) -> Result<(), LayoutError> {
        let validated = self.validate_incoming(instances)?;
        {
            let mut inner = self.inner.lock().unwrap();
            inner.instances = validated
                .iter()
                .map(|inst| (inst.instance_id.clone(), inst.clone()))
                .collect();
            rebuild_sequences(&mut inner);
        }
        self.schedule_autosave();
        Ok(())
    }

    // ── Persistence ───────────────────────────────────────────────

    /// Write the current layout under the configured namespace key.
    pub fn save(&self) -> Result<(), LayoutError> {
        let snapshot = {
            let inner = self.inner.lock().unwrap();
            LayoutSnapshot::saved(
                inner.layouts.clone(),
                inner
                    .instances
                    .iter()
                    .map(|(id, inst)| (id.clone(), inst.clone()))
                    .collect(),
            )
        };
        let text = serde_json::to_string(&snapshot)
            .map_err(|err| LayoutError::Persistence(err.to_string()))?;
        self.store.set(&self.config.storage_key, &text)?;
        debug!(key = %self.config.storage_key, widgets = snapshot.widgets.len(), "layout saved");
        Ok(())
    }

    /// Restore the persisted layout. A missing or corrupt snapshot (or a
    /// failing store) degrades to an empty layout; the number of restored
    /// instances is returned.
    pub fn load(&self) -> usize {
        let raw = match self.store.get(&self.config.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return 0,
            Err(err) => {
                self.persistence_warning("load", &err.to_string());
                return 0;
            }
        };

        let snapshot: LayoutSnapshot = match serde_json::from_str(&raw) {
            Ok(snap) => snap,
            Err(err) => {
                self.persistence_warning("load", &err.to_string());
                return 0;
            }
        };
        if snapshot.version != SNAPSHOT_VERSION {
            self.persistence_warning(
                "load",
                &format!("unsupported snapshot version {}", snapshot.version),
            );
            return 0;
        }

        let mut inner = self.inner.lock().unwrap();
        inner.layouts = snapshot.layouts;
        inner.instances = snapshot
            .widgets
            .into_iter()
            .map(|(id, mut inst)| {
                inst.orphaned = !self.registry.contains(&inst.widget_definition_id);
                (id, inst)
            })
            .collect();
        rebuild_sequences(&mut inner);
        let count = inner.instances.len();
        info!(count, "layout restored");
        count
    }

    /// Clear the live layout and drop the persisted snapshot.
    pub fn reset(&self) -> Result<(), LayoutError> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.instances.clear();
            inner.seq.clear();
            inner.layouts = BreakpointConfig::default();
        }
        self.store.remove(&self.config.storage_key)?;
        info!("layout reset");
        Ok(())
    }

    // ── Export / import ───────────────────────────────────────────

    pub fn export_snapshot(&self) -> LayoutSnapshot {
        let inner = self.inner.lock().unwrap();
        LayoutSnapshot::exported(
            inner.layouts.clone(),
            inner
                .instances
                .iter()
                .map(|(id, inst)| (id.clone(), inst.clone()))
                .collect(),
        )
    }

    /// Adopt a snapshot from another session. Validation matches
    /// `replace_layout`; returns the number of adopted instances.
    pub fn import_snapshot(
        self: &Arc<Self>,
        snapshot: LayoutSnapshot,
    ) -> Result<usize, LayoutError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(LayoutError::Validation(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        let incoming: Vec<WidgetInstance> =
            snapshot.widgets.into_iter().map(|(_, inst)| inst).collect();
        let validated = self.validate_incoming(incoming)?;
        let count = validated.len();
        {
            let mut inner = self.inner.lock().unwrap();
            inner.layouts = snapshot.layouts;
            inner.instances = validated
                .into_iter()
                .map(|inst| (inst.instance_id.clone(), inst))
                .collect();
            rebuild_sequences(&mut inner);
        }
        self.schedule_autosave();
        Ok(count)
    }

    // ── Internals ─────────────────────────────────────────────────

    fn validate_incoming(
        &self,
        instances: Vec<WidgetInstance>,
    ) -> Result<Vec<WidgetInstance>, LayoutError> {
        let mut validated = Vec::with_capacity(instances.len());
        for mut inst in instances {
            match self.registry.get_widget(&inst.widget_definition_id) {
                None => {
                    // Unknown definition: keep the instance, flag it.
                    inst.orphaned = true;
                }
                Some(def) => {
                    if !def.min_size.fits_within(inst.size)
                        || !inst.size.fits_within(def.max_size)
                    {
                        return Err(LayoutError::Validation(format!(
                            "instance {} size {} outside [{}, {}]",
                            inst.instance_id, inst.size, def.min_size, def.max_size
                        )));
                    }
                    inst.orphaned = false;
                }
            }
            validated.push(inst);
        }
        Ok(validated)
    }

    /// Debounced save: each mutation bumps the generation and arms a
    /// timer; only the newest generation actually writes.
    fn schedule_autosave(self: &Arc<Self>) {
        let generation = self.autosave_gen.fetch_add(1, Ordering::SeqCst) + 1;
        let Ok(handle) = Handle::try_current() else {
            // No runtime (synchronous caller): rely on explicit save().
            return;
        };
        let this = self.clone();
        let quiet = Duration::from_millis(self.config.autosave_quiet_ms);
        handle.spawn(async move {
            tokio::time::sleep(quiet).await;
            if this.autosave_gen.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Err(err) = this.save() {
                this.persistence_warning("autosave", &err.to_string());
            }
        });
    }

    fn persistence_warning(&self, stage: &str, error: &str) {
        warn!(stage, error, "layout persistence degraded");
        self.telemetry.record(
            "layout.persistence_error",
            json!({ "stage": stage, "error": error }),
        );
    }
}

fn rebuild_sequences(inner: &mut Inner) {
    inner.seq.clear();
    for inst in inner.instances.values() {
        let def_id = &inst.widget_definition_id;
        let n = inst
            .instance_id
            .strip_prefix(def_id.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|rest| rest.parse::<u64>().ok())
            .unwrap_or(0);
        let seq = inner.seq.entry(def_id.clone()).or_insert(0);
        *seq = (*seq).max(n);
    }
}
