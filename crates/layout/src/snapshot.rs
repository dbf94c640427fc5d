//! Persisted layout model.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use stump_registry::{GridPos, GridSize};

pub const SNAPSHOT_VERSION: u32 = 1;

/// One placed widget on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetInstance {
    /// Definition id plus a per-definition sequence: `"alert-stream-3"`.
    pub instance_id: String,
    pub widget_definition_id: String,
    pub position: GridPos,
    pub size: GridSize,
    #[serde(default)]
    pub props: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    /// Set when the referenced definition is no longer registered. The
    /// instance is kept so re-registering the widget revives it.
    #[serde(default)]
    pub orphaned: bool,
}

/// A responsive breakpoint: applies at viewport widths at or above
/// `min_width_px`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    pub min_width_px: u32,
    pub columns: u32,
}

/// Named breakpoints, widest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreakpointConfig {
    pub breakpoints: IndexMap<String, Breakpoint>,
}

impl Default for BreakpointConfig {
    fn default() -> Self {
        let mut breakpoints = IndexMap::new();
        breakpoints.insert(
            "lg".to_string(),
            Breakpoint {
                min_width_px: 1200,
                columns: 12,
            },
        );
        breakpoints.insert(
            "md".to_string(),
            Breakpoint {
                min_width_px: 768,
                columns: 8,
            },
        );
        breakpoints.insert(
            "sm".to_string(),
            Breakpoint {
                min_width_px: 0,
                columns: 4,
            },
        );
        Self { breakpoints }
    }
}

impl BreakpointConfig {
    /// Column count for a viewport width, falling back to the narrowest
    /// breakpoint.
    pub fn columns_for_width(&self, width_px: u32) -> u32 {
        self.breakpoints
            .values()
            .find(|bp| width_px >= bp.min_width_px)
            .or_else(|| self.breakpoints.values().last())
            .map(|bp| bp.columns)
            .unwrap_or(12)
    }
}

/// The persisted/exported unit. Widgets are an ordered list of
/// `[instanceId, record]` pairs so placement order survives the trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSnapshot {
    pub layouts: BreakpointConfig,
    pub widgets: Vec<(String, WidgetInstance)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    pub version: u32,
}

impl LayoutSnapshot {
    pub fn saved(layouts: BreakpointConfig, widgets: Vec<(String, WidgetInstance)>) -> Self {
        Self {
            layouts,
            widgets,
            saved_at: Some(Utc::now()),
            exported_at: None,
            version: SNAPSHOT_VERSION,
        }
    }

    pub fn exported(layouts: BreakpointConfig, widgets: Vec<(String, WidgetInstance)>) -> Self {
        Self {
            layouts,
            widgets,
            saved_at: None,
            exported_at: Some(Utc::now()),
            version: SNAPSHOT_VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: &str) -> WidgetInstance {
        WidgetInstance {
            instance_id: id.to_string(),
            widget_definition_id: "alert-stream".to_string(),
            position: GridPos::new(0, 0),
            size: GridSize::new(4, 6),
            props: Map::new(),
            created_at: Utc::now(),
            orphaned: false,
        }
    }

    #[test]
    fn snapshot_serializes_camel_case_pairs() {
        let snap = LayoutSnapshot::saved(
            BreakpointConfig::default(),
            vec![("alert-stream-1".to_string(), instance("alert-stream-1"))],
        );
        let value = serde_json::to_value(&snap).unwrap();

        assert_eq!(value["version"], 1);
        assert!(value["savedAt"].is_string());
        assert!(value.get("exportedAt").is_none());
        assert_eq!(value["widgets"][0][0], "alert-stream-1");
        assert_eq!(value["widgets"][0][1]["instanceId"], "alert-stream-1");
        assert_eq!(value["widgets"][0][1]["widgetDefinitionId"], "alert-stream");
        assert_eq!(value["layouts"]["lg"]["columns"], 12);
    }

    #[test]
    fn snapshot_round_trips() {
        let snap = LayoutSnapshot::exported(
            BreakpointConfig::default(),
            vec![("alert-stream-1".to_string(), instance("alert-stream-1"))],
        );
        let text = serde_json::to_string(&snap).unwrap();
        let back: LayoutSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn columns_for_width_picks_widest_match() {
        let config = BreakpointConfig::default();
        assert_eq!(config.columns_for_width(1440), 12);
        assert_eq!(config.columns_for_width(1000), 8);
        assert_eq!(config.columns_for_width(320), 4);
    }
}
