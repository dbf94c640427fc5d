pub mod config;
pub mod priority;
pub mod telemetry;
pub mod unit;

pub use config::{load_dotenv, Config, LayoutConfig, QueueConfig, WaveConfig, WrapperConfig};
pub use priority::*;
pub use telemetry::*;
pub use unit::*;
