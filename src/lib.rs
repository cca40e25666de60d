//! # pdf-services-jobs
//!
//! Run cloud PDF Services jobs (auto-tagging, PDF creation, OCR,
//! compression, linearization) from Rust.
//!
//! All of the document processing happens on the service side. This crate
//! moves bytes in and out and tracks the job in between:
//!
//! ```text
//! input file
//!  │
//!  ├─ 1. Credentials  PDF_SERVICES_CLIENT_ID / PDF_SERVICES_CLIENT_SECRET
//!  ├─ 2. Client       timeouts, optional proxy, region
//!  ├─ 3. Upload       bytes + media type → input asset
//!  ├─ 4. Submit       job kind + asset  → job location
//!  ├─ 5. Await        poll location until done / failed / timeout
//!  ├─ 6. Download     result asset → bytes
//!  └─ 7. Write        output/<Category>/<prefix><timestamp>.pdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_services_jobs::{run_job, AutotagParams, ClientConfig, JobKind, WorkflowConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientConfig::default();
//!     let job = WorkflowConfig::builder(
//!         "resources/autotagPDFInput.pdf",
//!         JobKind::AutotagPdf(AutotagParams::default()),
//!     )
//!     .build()?;
//!
//!     let outcome = run_job(&client, &job).await?;
//!     println!("tagged PDF written to {}", outcome.output_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Testing against a fake service
//!
//! The workflow only talks to the [`PdfServices`] trait. Implement it in
//! memory and call [`execute`] directly to script failures and stalls
//! without a network.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfjobs` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod job;
pub mod media;
pub mod output;
pub mod progress;
pub mod rest;
pub mod service;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ClientConfig, ClientConfigBuilder, Credentials, PollPolicy, ProxyCredentials, ProxyScheme,
    ProxyServerConfig, Region, CLIENT_ID_VAR, CLIENT_SECRET_VAR,
};
pub use error::{ErrorKind, PdfServicesError, Result};
pub use job::{
    Asset, AutotagParams, Job, JobHandle, JobKind, JobResult, JobStatus, ResultRole, StreamAsset,
};
pub use media::MediaType;
pub use output::{
    format_timestamp, write_output, write_outputs, Clock, FixedClock, OutputTarget, SystemClock,
};
pub use progress::{NoopProgressCallback, ProgressCallback, WorkflowProgressCallback};
pub use rest::RestPdfServices;
pub use service::{PdfServices, MIN_RETRY_AFTER};
pub use workflow::{
    execute, run_job, run_job_sync, run_job_with, JobOutcome, WorkflowConfig,
    WorkflowConfigBuilder,
};
