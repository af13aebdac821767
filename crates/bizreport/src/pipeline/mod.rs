pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod runner;

pub use config::PipelineConfig;
pub use context::{PipelineContext, StageOutcome};
pub use error::{FatalJobError, StageError};
pub use progress::{stage_progress, NoopProgress, ProgressEvent, ProgressReporter, ProgressTracker};
pub use runner::Pipeline;
