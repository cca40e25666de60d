//! Error types for the pdf-services-jobs library.
//!
//! Every fallible operation returns [`PdfServicesError`]. Each variant
//! belongs to exactly one [`ErrorKind`], so callers can decide what to do
//! (fix the environment, fix the request, wait for quota, retry later)
//! with a `match` on [`PdfServicesError::kind`] instead of parsing text.
//!
//! | Kind | Raised when |
//! |------|-------------|
//! | `Configuration` | credentials or client settings are missing/invalid; raised before any network call |
//! | `ServiceApi`    | the service rejected a request or reported a failed job |
//! | `ServiceUsage`  | the account hit a quota or plan limit (HTTP 429) |
//! | `Transport`     | network failure, timeout, or a response we could not understand |
//! | `Io`            | reading the input file or writing the output file failed |

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, PdfServicesError>;

/// Broad category of a [`PdfServicesError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    ServiceApi,
    ServiceUsage,
    Transport,
    Io,
}

/// All errors returned by the pdf-services-jobs library.
#[derive(Debug, Error)]
pub enum PdfServicesError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// A required credential environment variable is unset or empty.
    #[error("Missing credential: environment variable {var} is not set or empty")]
    MissingCredential { var: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Service errors ────────────────────────────────────────────────────
    /// The service rejected a request (bad input, bad auth, bad job parameters).
    #[error("Service API error (HTTP {status}, code {code}): {message}")]
    ServiceApi {
        status: u16,
        code: String,
        message: String,
    },

    /// The job reached the `failed` state on the service side.
    #[error("Job failed remotely (code {code}): {message}")]
    JobFailed { code: String, message: String },

    /// Quota or plan limit exceeded.
    #[error("Service usage limit reached (HTTP {status}): {message}")]
    ServiceUsage { status: u16, message: String },

    // ── Transport errors ──────────────────────────────────────────────────
    /// The HTTP call itself failed (DNS, TLS, proxy, connection reset, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The job did not reach a terminal state within the poll timeout.
    #[error("Job at '{location}' did not finish within {secs}s")]
    PollTimeout { location: String, secs: u64 },

    /// The service answered with something we could not interpret.
    #[error("Malformed service response: {0}")]
    MalformedResponse(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The async runtime for the blocking entry point could not start.
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// Could not read the local input file.
    #[error("Failed to read input file '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PdfServicesError {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential { .. } | Self::InvalidConfig(_) => ErrorKind::Configuration,
            Self::ServiceApi { .. } | Self::JobFailed { .. } => ErrorKind::ServiceApi,
            Self::ServiceUsage { .. } => ErrorKind::ServiceUsage,
            Self::Transport(_) | Self::PollTimeout { .. } | Self::MalformedResponse(_) => {
                ErrorKind::Transport
            }
            Self::Runtime(_) | Self::InputReadFailed { .. } | Self::OutputWriteFailed { .. } => {
                ErrorKind::Io
            }
        }
    }
}

impl From<reqwest::Error> for PdfServicesError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::MalformedResponse(e.to_string())
        } else if e.is_builder() {
            Self::InvalidConfig(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
