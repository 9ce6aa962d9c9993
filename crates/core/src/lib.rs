pub mod clock;
pub mod config;
pub mod dom;
pub mod error;
pub mod types;

pub use clock::EngineClock;
pub use config::{EngineConfig, TimingConfig};
pub use dom::{ElementId, ElementSnapshot, ElementTree, MemoryTree};
pub use error::{EngineError, EngineResult};
pub use types::{ErrorRecord, ExecutionStatus, Timing};
