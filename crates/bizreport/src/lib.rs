pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod sanitize;
pub mod secrets;
pub mod storage;
pub mod telemetry;
pub mod worker;

pub use broadcast::{JobProgressBroadcaster, JobProgressEvent};
pub use config::{load_config, Config, PipelineVariant, ReportSpec};
pub use db::Database;
pub use error::{BizreportError, ConfigError, Result, StorageError};
pub use generator::{ContentGenerator, GeneratedContent, GenerationError, GenerationRequest, HttpGenerator};
pub use pipeline::{Pipeline, PipelineConfig, PipelineContext};
pub use secrets::{resolve_secret, SecretError};
pub use storage::{ArtifactPersister, ArtifactStore, Manifest};
pub use worker::{job_status, JobPoller, JobStateMachine, JobStatus, ShutdownSignal};
