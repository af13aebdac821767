pub mod job;
pub mod poller;
pub mod shutdown;
pub mod state;

pub use job::{job_status, Job, JobResult, JobStatusView};
pub use poller::{JobPoller, PollError, PollOutcome};
pub use shutdown::ShutdownSignal;
pub use state::{JobStateMachine, JobStatus, TransitionError};
