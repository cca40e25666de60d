//! The job workflow: read → upload → submit → await → download → write.
//!
//! [`execute`] runs one job against any [`PdfServices`]. [`run_job`] is the
//! usual entry point: it loads credentials from the environment, builds a
//! [`RestPdfServices`] from a [`ClientConfig`] and calls [`execute`].
//!
//! Nothing is written until every download has succeeded, and the output
//! files of one run are committed together, so a failed run never leaves an
//! output file behind.

use crate::config::{ClientConfig, Credentials, PollPolicy};
use crate::error::{PdfServicesError, Result};
use crate::job::{Asset, Job, JobKind, JobResult};
use crate::media::MediaType;
use crate::output::{write_outputs, Clock, OutputTarget, SystemClock};
use crate::progress::ProgressCallback;
use crate::rest::RestPdfServices;
use crate::service::PdfServices;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Everything one run needs besides credentials and transport settings.
///
/// Built via [`WorkflowConfig::builder()`].
///
/// # Example
/// ```rust
/// use pdf_services_jobs::{AutotagParams, JobKind, WorkflowConfig};
///
/// let config = WorkflowConfig::builder(
///         "resources/autotagPDFInput.pdf",
///         JobKind::AutotagPdf(AutotagParams::default()),
///     )
///     .output_dir("output")
///     .build()
///     .unwrap();
/// assert_eq!(config.output.category, "AutotagPDF");
/// ```
#[derive(Clone)]
pub struct WorkflowConfig {
    /// Local file to upload.
    pub input_path: PathBuf,
    /// Declared input format. Inferred from `input_path` at build time.
    pub media_type: MediaType,
    /// Operation to run.
    pub job: JobKind,
    /// Where the primary result goes.
    pub output: OutputTarget,
    /// How long and how often to poll.
    pub poll: PollPolicy,
    /// Optional stage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for WorkflowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowConfig")
            .field("input_path", &self.input_path)
            .field("media_type", &self.media_type)
            .field("job", &self.job)
            .field("output", &self.output)
            .field("poll", &self.poll)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn WorkflowProgressCallback>"),
            )
            .finish()
    }
}

impl WorkflowConfig {
    /// Start a builder. Output defaults to [`OutputTarget::for_job`].
    pub fn builder(input_path: impl Into<PathBuf>, job: JobKind) -> WorkflowConfigBuilder {
        WorkflowConfigBuilder {
            input_path: input_path.into(),
            media_type: None,
            output: OutputTarget::for_job(&job),
            job,
            poll: PollPolicy::default(),
            progress_callback: None,
        }
    }
}

/// Builder for [`WorkflowConfig`].
pub struct WorkflowConfigBuilder {
    input_path: PathBuf,
    media_type: Option<MediaType>,
    job: JobKind,
    output: OutputTarget,
    poll: PollPolicy,
    progress_callback: Option<ProgressCallback>,
}

impl WorkflowConfigBuilder {
    pub fn media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type);
        self
    }

    pub fn output(mut self, target: OutputTarget) -> Self {
        self.output = target;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output.dir = dir.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.output.category = category.into();
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output.prefix = prefix.into();
        self
    }

    pub fn poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll = policy;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll.interval = interval;
        self
    }

    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll.timeout = timeout;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WorkflowConfig> {
        self.poll.validate()?;
        self.output.validate()?;

        let media_type = match self.media_type {
            Some(m) => m,
            None => MediaType::from_path(&self.input_path).ok_or_else(|| {
                PdfServicesError::InvalidConfig(format!(
                    "Cannot infer media type of '{}'; set it explicitly",
                    self.input_path.display()
                ))
            })?,
        };
        if !self.job.accepts(media_type) {
            return Err(PdfServicesError::InvalidConfig(format!(
                "{} jobs do not accept {} input",
                self.job, media_type
            )));
        }

        Ok(WorkflowConfig {
            input_path: self.input_path,
            media_type,
            job: self.job,
            output: self.output,
            poll: self.poll,
            progress_callback: self.progress_callback,
        })
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub job: JobKind,
    /// Id of the uploaded input asset.
    pub input_asset: String,
    /// Location the job was tracked at.
    pub location: String,
    /// Path of the primary output file.
    pub output_path: PathBuf,
    pub bytes_written: usize,
    /// Secondary files, e.g. the auto-tag report.
    pub extra_outputs: Vec<PathBuf>,
    pub duration_ms: u64,
}

/// Run one job end to end against `service`.
///
/// Output file names are stamped with `clock.now()`, taken once when the
/// downloads have finished.
pub async fn execute(
    service: &dyn PdfServices,
    config: &WorkflowConfig,
    clock: &dyn Clock,
) -> Result<JobOutcome> {
    let start = Instant::now();
    let cb = config.progress_callback.as_ref();
    info!(
        "Starting {} job for {}",
        config.job,
        config.input_path.display()
    );

    // ── Step 1: Read input ───────────────────────────────────────────────
    let bytes = read_input(&config.input_path).await?;
    if let Some(cb) = cb {
        cb.on_upload_start(&config.input_path, bytes.len());
    }

    // ── Step 2: Upload ───────────────────────────────────────────────────
    let input_asset = service.upload(bytes, config.media_type).await?;
    info!("Uploaded input as asset {}", input_asset.id);
    if let Some(cb) = cb {
        cb.on_uploaded(&input_asset);
    }

    // ── Step 3: Submit ───────────────────────────────────────────────────
    let job = Job::new(config.job, input_asset.clone());
    let handle = service.submit(&job).await?;
    info!("Submitted {} job, tracking at {}", config.job, handle);
    if let Some(cb) = cb {
        cb.on_submitted(&handle);
    }

    // ── Step 4: Await result ─────────────────────────────────────────────
    let result = service.await_result(&handle, &config.poll).await?;
    debug!(
        "Job result roles: {:?}",
        result.roles().collect::<Vec<_>>()
    );
    if let Some(cb) = cb {
        cb.on_job_complete(&config.job);
    }

    // ── Step 5: Download everything before writing anything ──────────────
    let primary_role = config.job.primary_role();
    let primary = result.get(primary_role).ok_or_else(|| {
        PdfServicesError::MalformedResponse(format!(
            "Finished {} job has no '{}' asset",
            config.job, primary_role
        ))
    })?;
    let content = fetch(service, primary, config).await?;
    let report = match report_asset(&config.job, &result) {
        Some(asset) => Some(fetch(service, asset, config).await?),
        None => None,
    };

    // ── Step 6: Write all outputs as one unit ───────────────────────────
    let now = clock.now();
    let output_path = config.output.path_at(now);
    let bytes_written = content.len();
    let mut files = vec![(output_path.clone(), content)];
    if let Some(report) = report {
        let path = config.output.companion("report", "xlsx").path_at(now);
        files.push((path, report));
    }
    let written: Vec<(PathBuf, usize)> =
        files.iter().map(|(p, b)| (p.clone(), b.len())).collect();
    write_outputs(files).await?;

    for (path, len) in &written {
        info!("Wrote {} bytes to {}", len, path.display());
        if let Some(cb) = cb {
            cb.on_written(path, *len);
        }
    }
    let extra_outputs = written.into_iter().skip(1).map(|(p, _)| p).collect();

    Ok(JobOutcome {
        job: config.job,
        input_asset: input_asset.id,
        location: handle.to_string(),
        output_path,
        bytes_written,
        extra_outputs,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Load credentials through `lookup`, connect with `connect`, then [`execute`].
///
/// Credentials are checked before `connect` is called, so a missing
/// variable fails without any client being built or any request sent.
/// Failures are logged here with the job context before being returned.
pub async fn run_job_with<L, F>(
    lookup: L,
    connect: F,
    config: &WorkflowConfig,
) -> Result<JobOutcome>
where
    L: Fn(&str) -> Option<String>,
    F: FnOnce(Credentials) -> Result<Arc<dyn PdfServices>>,
{
    let outcome = async {
        let credentials = Credentials::from_lookup(lookup)?;
        let service = connect(credentials)?;
        execute(service.as_ref(), config, &SystemClock).await
    }
    .await;

    if let Err(ref e) = outcome {
        error!(
            "{} job for {} failed ({:?}): {}",
            config.job,
            config.input_path.display(),
            e.kind(),
            e
        );
    }
    outcome
}

/// Run one job with credentials from the process environment over HTTP.
pub async fn run_job(client: &ClientConfig, config: &WorkflowConfig) -> Result<JobOutcome> {
    run_job_with(
        |var| std::env::var(var).ok(),
        |credentials| {
            let service = RestPdfServices::new(credentials, client)?;
            Ok(Arc::new(service) as Arc<dyn PdfServices>)
        },
        config,
    )
    .await
}

/// Synchronous wrapper around [`run_job`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_job_sync(client: &ClientConfig, config: &WorkflowConfig) -> Result<JobOutcome> {
    tokio::runtime::Runtime::new()
        .map_err(PdfServicesError::Runtime)?
        .block_on(run_job(client, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn read_input(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|source| PdfServicesError::InputReadFailed {
            path: path.to_path_buf(),
            source,
        })
}

/// Download one asset, rejecting empty content.
async fn fetch(
    service: &dyn PdfServices,
    asset: &Asset,
    config: &WorkflowConfig,
) -> Result<Vec<u8>> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_download_start(asset);
    }
    let content = service.download(asset).await?;
    if content.bytes.is_empty() {
        return Err(PdfServicesError::MalformedResponse(format!(
            "Asset {} downloaded with no content",
            asset.id
        )));
    }
    Ok(content.bytes)
}

/// The auto-tag report, when one was requested and produced.
fn report_asset<'a>(kind: &JobKind, result: &'a JobResult) -> Option<&'a Asset> {
    match kind {
        JobKind::AutotagPdf(params) if params.generate_report => result.report(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::job::{AutotagParams, ResultRole};

    #[test]
    fn media_type_inferred_from_extension() {
        let config = WorkflowConfig::builder("in/createPDFInput.docx", JobKind::CreatePdf)
            .build()
            .unwrap();
        assert_eq!(config.media_type, MediaType::Docx);
        assert_eq!(config.output.category, "CreatePDF");
    }

    #[test]
    fn unknown_extension_needs_explicit_type() {
        let err = WorkflowConfig::builder("in/blob.bin", JobKind::OcrPdf)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        assert!(WorkflowConfig::builder("in/blob.bin", JobKind::OcrPdf)
            .media_type(MediaType::Pdf)
            .build()
            .is_ok());
    }

    #[test]
    fn rejects_input_the_job_cannot_take() {
        let err = WorkflowConfig::builder(
            "in/photo.png",
            JobKind::AutotagPdf(AutotagParams::default()),
        )
        .build()
        .unwrap_err();
        assert!(err.to_string().contains("autotag"), "got: {err}");
    }

    #[test]
    fn category_and_prefix_overrides() {
        let config = WorkflowConfig::builder("in.docx", JobKind::CreatePdf)
            .output_dir("/tmp/out")
            .category("CreatePDFWithProxyServer")
            .prefix("create")
            .build()
            .unwrap();
        assert_eq!(
            config.output.category_dir(),
            PathBuf::from("/tmp/out/CreatePDFWithProxyServer")
        );
    }

    #[test]
    fn report_only_when_requested() {
        let result = JobResult::new()
            .with(ResultRole::TaggedPdf, Asset::new("t"))
            .with(ResultRole::Report, Asset::new("r"));
        let with = JobKind::AutotagPdf(AutotagParams {
            shift_headings: false,
            generate_report: true,
        });
        let without = JobKind::AutotagPdf(AutotagParams::default());
        assert_eq!(report_asset(&with, &result).map(|a| a.id.as_str()), Some("r"));
        assert!(report_asset(&without, &result).is_none());
        assert!(report_asset(&JobKind::CreatePdf, &result).is_none());
    }
}
