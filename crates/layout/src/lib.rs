pub mod error;
pub mod manager;
pub mod snapshot;
pub mod store;

pub use error::{LayoutError, StoreError};
pub use manager::LayoutManager;
pub use snapshot::{Breakpoint, BreakpointConfig, LayoutSnapshot, WidgetInstance, SNAPSHOT_VERSION};
pub use store::{FileStore, LayoutStore, MemoryStore};
