//! Progress-callback trait for workflow stage events.
//!
//! Inject an [`Arc<dyn WorkflowProgressCallback>`] via
//! [`crate::workflow::WorkflowConfigBuilder::progress_callback`] to hear
//! about each step as a job moves through upload, submit, poll, download
//! and write. The CLI drives a spinner from these events; a service could
//! forward them to a job-status record instead.
//!
//! # Example
//!
//! ```rust
//! use pdf_services_jobs::{JobHandle, WorkflowProgressCallback};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct SubmitCounter(AtomicUsize);
//!
//! impl WorkflowProgressCallback for SubmitCounter {
//!     fn on_submitted(&self, handle: &JobHandle) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("tracking {handle}");
//!     }
//! }
//!
//! let counter = SubmitCounter(AtomicUsize::new(0));
//! counter.on_submitted(&JobHandle::new("https://example.test/status/1"));
//! assert_eq!(counter.0.load(Ordering::SeqCst), 1);
//! ```

use crate::job::{Asset, JobHandle, JobKind};
use std::path::Path;
use std::sync::Arc;

/// Called by the workflow as it moves through its steps.
///
/// All methods default to no-ops so implementors only override what they
/// care about. Events arrive in order, from the task running the workflow.
pub trait WorkflowProgressCallback: Send + Sync {
    /// The input file was read and is about to be uploaded.
    fn on_upload_start(&self, input: &Path, bytes: usize) {
        let _ = (input, bytes);
    }

    /// The service accepted the upload.
    fn on_uploaded(&self, asset: &Asset) {
        let _ = asset;
    }

    /// The job was submitted and is being tracked at `handle`.
    fn on_submitted(&self, handle: &JobHandle) {
        let _ = handle;
    }

    /// The job finished successfully on the service side.
    fn on_job_complete(&self, kind: &JobKind) {
        let _ = kind;
    }

    /// A result asset is being downloaded.
    fn on_download_start(&self, asset: &Asset) {
        let _ = asset;
    }

    /// An output file was written.
    fn on_written(&self, path: &Path, bytes: usize) {
        let _ = (path, bytes);
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl WorkflowProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::workflow::WorkflowConfig`].
pub type ProgressCallback = Arc<dyn WorkflowProgressCallback>;
