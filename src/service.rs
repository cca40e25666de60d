//! The remote PDF service seen through four logical operations.
//!
//! [`PdfServices`] is the only seam between the workflow and the network.
//! [`crate::rest::RestPdfServices`] implements it over HTTP; tests implement
//! it in memory to script failures, stalls and call counts.

use crate::config::PollPolicy;
use crate::error::{PdfServicesError, Result};
use crate::job::{Asset, Job, JobHandle, JobResult, JobStatus, StreamAsset};
use crate::media::MediaType;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::debug;

/// Shortest wait a server `retry-after` hint can impose between polls.
/// The configured interval still applies when it is shorter.
pub const MIN_RETRY_AFTER: Duration = Duration::from_millis(500);

/// A cloud PDF-processing service.
///
/// Implementations perform exactly one remote round-trip per method call and
/// never retry; `await_result` is the only method that waits.
#[async_trait]
pub trait PdfServices: Send + Sync {
    /// Upload fully buffered bytes and return the new input asset.
    async fn upload(&self, bytes: Vec<u8>, media_type: MediaType) -> Result<Asset>;

    /// Submit a job and return the location used to track it.
    async fn submit(&self, job: &Job) -> Result<JobHandle>;

    /// Ask once for the current state of a submitted job.
    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus>;

    /// Fetch the full content of a result asset.
    async fn download(&self, asset: &Asset) -> Result<StreamAsset>;

    /// Poll until the job succeeds or fails, bounded by `policy.timeout`.
    ///
    /// Waits `policy.interval` between polls unless the service suggested
    /// its own delay. A hint is raised to [`MIN_RETRY_AFTER`], or to
    /// `policy.interval` if that is shorter. A `failed` job becomes
    /// [`PdfServicesError::JobFailed`]; running out of time becomes
    /// [`PdfServicesError::PollTimeout`].
    async fn await_result(&self, handle: &JobHandle, policy: &PollPolicy) -> Result<JobResult> {
        let start = Instant::now();
        let wait = async {
            let mut polls: u32 = 0;
            loop {
                polls += 1;
                match self.poll(handle).await? {
                    JobStatus::Succeeded(result) => {
                        debug!(
                            "Job {} done after {} polls, {:?}",
                            handle,
                            polls,
                            start.elapsed()
                        );
                        return Ok(result);
                    }
                    JobStatus::Failed { code, message } => {
                        return Err(PdfServicesError::JobFailed { code, message });
                    }
                    JobStatus::InProgress { retry_after } => {
                        let floor = MIN_RETRY_AFTER.min(policy.interval);
                        let delay = retry_after.map_or(policy.interval, |hint| hint.max(floor));
                        debug!("Job {} in progress (poll {}), next in {:?}", handle, polls, delay);
                        sleep(delay).await;
                    }
                }
            }
        };

        timeout(policy.timeout, wait)
            .await
            .map_err(|_| PdfServicesError::PollTimeout {
                location: handle.to_string(),
                secs: policy.timeout.as_secs(),
            })?
    }
}
