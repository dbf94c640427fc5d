//! Widget definitions and grid geometry.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use stump_core::{Category, Priority};
use stump_sched::LoadFuture;

/// Deferred-resolution widget loader. Produces a fresh load future per
/// call so a widget can be retried after a failure.
pub type WidgetLoader = Arc<dyn Fn() -> LoadFuture + Send + Sync>;

/// Grid extent in columns by rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub w: u32,
    pub h: u32,
}

impl GridSize {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    /// Component-wise containment check.
    pub fn fits_within(&self, outer: GridSize) -> bool {
        self.w <= outer.w && self.h <= outer.h
    }

    /// Component-wise clamp into `[min, max]`.
    pub fn clamp(&self, min: GridSize, max: GridSize) -> GridSize {
        GridSize {
            w: self.w.clamp(min.w, max.w),
            h: self.h.clamp(min.h, max.h),
        }
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Grid position in column/row coordinates, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
}

impl GridPos {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A registered widget kind. Immutable once registered.
#[derive(Clone)]
pub struct WidgetDefinition {
    pub id: String,
    pub display_name: String,
    pub category: Category,
    pub priority: Priority,
    pub loader: WidgetLoader,
    pub default_size: GridSize,
    pub min_size: GridSize,
    pub max_size: GridSize,
    pub description: String,
    pub required_permissions: Vec<String>,
    pub dependencies: Vec<String>,
}

impl WidgetDefinition {
    pub fn new(id: &str, display_name: &str, category: Category, loader: WidgetLoader) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            category,
            priority: Priority::Deferred,
            loader,
            default_size: GridSize::new(4, 4),
            min_size: GridSize::new(1, 1),
            max_size: GridSize::new(12, 12),
            description: String::new(),
            required_permissions: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_sizes(mut self, default: GridSize, min: GridSize, max: GridSize) -> Self {
        self.default_size = default;
        self.min_size = min;
        self.max_size = max;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_permission(mut self, permission: &str) -> Self {
        self.required_permissions.push(permission.to_string());
        self
    }

    pub fn with_dependency(mut self, widget_id: &str) -> Self {
        self.dependencies.push(widget_id.to_string());
        self
    }
}

impl fmt::Debug for WidgetDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetDefinition")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("category", &self.category)
            .field("priority", &self.priority)
            .field("default_size", &self.default_size)
            .field("min_size", &self.min_size)
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

/// Ready-to-place descriptor for one widget on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub widget_id: String,
    pub size: GridSize,
    #[serde(default)]
    pub props: Map<String, Value>,
}

/// Caller overrides applied on top of a definition's defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub size: Option<GridSize>,
    pub props: Map<String, Value>,
}

impl ConfigOverrides {
    pub fn size(size: GridSize) -> Self {
        Self {
            size: Some(size),
            props: Map::new(),
        }
    }

    pub fn with_prop(mut self, key: &str, value: Value) -> Self {
        self.props.insert(key.to_string(), value);
        self
    }
}

/// Outcome of checking a [`GridConfig`] against its definition. Collects
/// every violation instead of stopping at the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}
