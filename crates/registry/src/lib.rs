pub mod definition;
pub mod error;
pub mod registry;

pub use definition::{
    ConfigOverrides, ConfigValidation, GridConfig, GridPos, GridSize, WidgetDefinition,
    WidgetLoader,
};
pub use error::RegistryError;
pub use registry::WidgetRegistry;
