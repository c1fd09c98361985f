pub mod classify;
pub mod report;
pub mod scan;

pub use classify::ClassificationService;
pub use scan::{ScanAggregator, ScanError};
