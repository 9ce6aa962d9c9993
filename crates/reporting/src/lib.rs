//! Results log, performance aggregation and report export.

pub mod ci;
pub mod export;
pub mod log;
pub mod performance;
pub mod record;

pub use ci::{should_trigger, CiSession, NotificationStatus, NotificationSummary};
pub use export::{export, ExportFormat};
pub use log::ResultsLog;
pub use performance::{compute_performance, PerformanceMetrics, PerformanceReport};
pub use record::{Leaf, RunRecord};
