//! Broadcasting for real-time job progress.
//!
//! Any in-process observer (a status endpoint, a CLI progress bar) can
//! subscribe; the worker never blocks on slow or absent subscribers.

pub mod job_progress;

pub use job_progress::{JobProgressBroadcaster, JobProgressEvent};
