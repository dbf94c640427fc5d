//! Widget catalog.
//!
//! Holds every registered [`WidgetDefinition`] plus a category index for
//! browse views. Definitions are immutable once registered; replacing one
//! means unregister then register.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use stump_core::Category;

use crate::definition::{
    ConfigOverrides, ConfigValidation, GridConfig, WidgetDefinition,
};
use crate::error::RegistryError;

#[derive(Default)]
struct Inner {
    definitions: HashMap<String, Arc<WidgetDefinition>>,
    by_category: HashMap<Category, Vec<String>>,
}

/// Thread-safe catalog of widget definitions.
#[derive(Default)]
pub struct WidgetRegistry {
    inner: RwLock<Inner>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Fails on an empty id/name, inverted size
    /// bounds, or a duplicate id; the existing entry is never replaced.
    pub fn register(&self, def: WidgetDefinition) -> Result<(), RegistryError> {
        validate_definition(&def)?;

        let mut inner = self.inner.write().unwrap();
        if inner.definitions.contains_key(&def.id) {
            return Err(RegistryError::DuplicateDefinition(def.id));
        }

        info!(id = %def.id, category = %def.category, "widget registered");
        inner
            .by_category
            .entry(def.category)
            .or_default()
            .push(def.id.clone());
        inner.definitions.insert(def.id.clone(), Arc::new(def));
        Ok(())
    }

    /// Remove a definition. Returns whether anything was removed. Live
    /// instances referencing the id are left for the layout manager to
    /// flag as orphaned.
    pub fn unregister(&self, id: &str) -> bool {
        let mut inner = self.inner.write().unwrap();
        let Some(def) = inner.definitions.remove(id) else {
            return false;
        };
        if let Some(ids) = inner.by_category.get_mut(&def.category) {
            ids.retain(|entry| entry != id);
        }
        debug!(id, "widget unregistered");
        true
    }

    pub fn get_widget(&self, id: &str) -> Option<Arc<WidgetDefinition>> {
        self.inner.read().unwrap().definitions.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().unwrap().definitions.contains_key(id)
    }

    pub fn get_widgets_by_category(&self, category: Category) -> Vec<Arc<WidgetDefinition>> {
        let inner = self.inner.read().unwrap();
        let mut defs: Vec<_> = inner
            .by_category
            .get(&category)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.definitions.get(id).cloned())
            .collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    /// All definitions, sorted by id for deterministic listings.
    pub fn get_all_widgets(&self) -> Vec<Arc<WidgetDefinition>> {
        let inner = self.inner.read().unwrap();
        let mut defs: Vec<_> = inner.definitions.values().cloned().collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    /// Case-insensitive substring search over display name, description
    /// and category.
    pub fn search_widgets(&self, query: &str) -> Vec<Arc<WidgetDefinition>> {
        let needle = query.to_lowercase();
        let mut defs: Vec<_> = self
            .inner
            .read()
            .unwrap()
            .definitions
            .values()
            .filter(|def| {
                def.display_name.to_lowercase().contains(&needle)
                    || def.description.to_lowercase().contains(&needle)
                    || def.category.as_str().contains(&needle)
            })
            .cloned()
            .collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    /// Build a placement descriptor for a widget. Size overrides are
    /// clamped into the definition's bounds rather than rejected; props
    /// are merged over the definition defaults (empty).
    pub fn grid_config(
        &self,
        id: &str,
        overrides: ConfigOverrides,
    ) -> Result<GridConfig, RegistryError> {
        let def = self
            .get_widget(id)
            .ok_or_else(|| RegistryError::DefinitionNotFound(id.to_string()))?;

        let size = overrides
            .size
            .unwrap_or(def.default_size)
            .clamp(def.min_size, def.max_size);

        Ok(GridConfig {
            widget_id: def.id.clone(),
            size,
            props: overrides.props,
        })
    }

    /// Check an existing config against its definition, collecting every
    /// violation.
    pub fn validate_config(&self, id: &str, config: &GridConfig) -> ConfigValidation {
        let Some(def) = self.get_widget(id) else {
            return ConfigValidation::from_errors(vec![format!(
                "unknown widget definition: {id}"
            )]);
        };

        let mut errors = Vec::new();
        if !def.min_size.fits_within(config.size) {
            errors.push(format!(
                "size {} is below minimum {}",
                config.size, def.min_size
            ));
        }
        if !config.size.fits_within(def.max_size) {
            errors.push(format!(
                "size {} exceeds maximum {}",
                config.size, def.max_size
            ));
        }
        ConfigValidation::from_errors(errors)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_definition(def: &WidgetDefinition) -> Result<(), RegistryError> {
    if def.id.trim().is_empty() {
        return Err(RegistryError::Validation("widget id is empty".into()));
    }
    if def.display_name.trim().is_empty() {
        return Err(RegistryError::Validation(format!(
            "widget {} has an empty display name",
            def.id
        )));
    }
    if !def.min_size.fits_within(def.default_size)
        || !def.default_size.fits_within(def.max_size)
    {
        return Err(RegistryError::Validation(format!(
            "widget {} sizes must satisfy min <= default <= max (got min {}, default {}, max {})",
            def.id, def.min_size, def.default_size, def.max_size
        )));
    }
    Ok(())
}
