pub mod outcome;
pub mod paper;
pub mod report;

pub use outcome::{FailureKind, SummaryOutcome};
pub use paper::PaperRef;
pub use report::{Report, ReportCounts};
