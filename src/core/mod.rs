pub mod engine;
pub mod metrics;
pub mod report;
pub mod scenario;
pub mod scheduler;
pub mod threshold;

pub use crate::domain::model::{
    CheckResult, IterationOutcome, RunSummary, Stage, ThresholdResult, ThresholdSpec,
};
pub use crate::domain::ports::{ConfigProvider, Scenario, Storage};
pub use crate::utils::error::Result;
