pub mod probe;
pub mod sensor;
pub mod snapshot;
pub mod visibility;

pub use probe::{PlatformProbe, StaticProbe};
pub use sensor::{EnvironmentSensor, SensorSubscription};
pub use snapshot::{EnvironmentSnapshot, MemoryClass, NetworkClass};
pub use visibility::{ViewportObserver, VisibilityOptions};
