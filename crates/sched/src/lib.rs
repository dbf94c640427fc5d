pub mod classifier;
pub mod error;
pub mod progressive;
pub mod queue;
pub mod scenario;
pub mod wrapper;

pub use classifier::PriorityClassifier;
pub use error::{LoadError, SchedError};
pub use progressive::{ProgressiveLoader, WaveProgress};
pub use queue::{LoadFactory, LoadFn, LoadFuture, LoadQueue, QueueStats};
pub use scenario::{Scenario, ScenarioContext};
pub use wrapper::{LoadCoordinator, LoadHandle, WrapOptions};
