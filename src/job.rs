//! Job model: assets, job descriptions, handles and results.
//!
//! ```text
//! local bytes ──upload──▶ Asset ──Job::new──▶ Job ──submit──▶ JobHandle
//!                                                                 │
//!                                             poll (InProgress…)  ▼
//!                           StreamAsset ◀──download── JobResult[role]
//! ```

use crate::media::MediaType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

// ── Assets ───────────────────────────────────────────────────────────────

/// Reference to binary content stored by the service.
///
/// The service owns the bytes; this is only a handle. Input assets come from
/// an upload, result assets from a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Opaque asset id assigned by the service.
    pub id: String,
    /// MIME type reported by the service, when known.
    pub media_type: Option<String>,
    /// Pre-signed download location. Result assets usually carry one.
    pub download_uri: Option<String>,
    /// Size in bytes as reported by the service.
    pub size: Option<u64>,
}

impl Asset {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            media_type: None,
            download_uri: None,
            size: None,
        }
    }

    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type.mime().to_string());
        self
    }

    pub fn with_download_uri(mut self, uri: impl Into<String>) -> Self {
        self.download_uri = Some(uri.into());
        self
    }
}

/// Downloaded content of an asset, fully buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamAsset {
    pub bytes: Vec<u8>,
    pub media_type: Option<String>,
}

// ── Jobs ─────────────────────────────────────────────────────────────────

/// Options for the auto-tag operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutotagParams {
    /// Shift detected headings one level down.
    pub shift_headings: bool,
    /// Also produce an XLSX tagging report.
    pub generate_report: bool,
}

/// The operation a job performs. Every kind takes exactly one input asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobKind {
    /// Add accessibility tags to a PDF.
    AutotagPdf(AutotagParams),
    /// Convert an office document or image to PDF.
    CreatePdf,
    /// Run OCR over a scanned PDF.
    OcrPdf,
    /// Reduce PDF file size.
    CompressPdf,
    /// Optimise a PDF for fast web view.
    LinearizePdf,
}

impl JobKind {
    /// Path segment under `/operation/`.
    pub fn endpoint(&self) -> &'static str {
        match self {
            JobKind::AutotagPdf(_) => "autotag",
            JobKind::CreatePdf => "createpdf",
            JobKind::OcrPdf => "ocr",
            JobKind::CompressPdf => "compresspdf",
            JobKind::LinearizePdf => "linearizepdf",
        }
    }

    /// The role of the asset this job exists to produce.
    pub fn primary_role(&self) -> ResultRole {
        match self {
            JobKind::AutotagPdf(_) => ResultRole::TaggedPdf,
            _ => ResultRole::Asset,
        }
    }

    /// Output sub-directory used when the caller does not choose one.
    pub fn default_category(&self) -> &'static str {
        match self {
            JobKind::AutotagPdf(_) => "AutotagPDF",
            JobKind::CreatePdf => "CreatePDF",
            JobKind::OcrPdf => "OcrPDF",
            JobKind::CompressPdf => "CompressPDF",
            JobKind::LinearizePdf => "LinearizePDF",
        }
    }

    /// File-name prefix placed before the timestamp.
    pub fn default_prefix(&self) -> &'static str {
        match self {
            JobKind::AutotagPdf(_) => "autotag-tagged",
            JobKind::CreatePdf => "create",
            JobKind::OcrPdf => "ocr",
            JobKind::CompressPdf => "compress",
            JobKind::LinearizePdf => "linearize",
        }
    }

    /// Whether the service accepts `media` as input for this kind.
    pub fn accepts(&self, media: MediaType) -> bool {
        match self {
            JobKind::CreatePdf => media != MediaType::Pdf,
            _ => media == MediaType::Pdf,
        }
    }

    /// Operation-specific request parameters.
    fn params(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut params = serde_json::Map::new();
        if let JobKind::AutotagPdf(p) = self {
            params.insert("shiftHeadings".into(), p.shift_headings.into());
            params.insert("generateReport".into(), p.generate_report.into());
        }
        params
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// A job description: what to do, and to which uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub kind: JobKind,
    pub input: Asset,
}

impl Job {
    pub fn new(kind: JobKind, input: Asset) -> Self {
        Self { kind, input }
    }

    /// JSON body for the submit call.
    pub fn request_body(&self) -> serde_json::Value {
        let mut body = self.kind.params();
        body.insert("assetID".into(), self.input.id.clone().into());
        serde_json::Value::Object(body)
    }
}

/// Location of a submitted job. One handle tracks exactly one job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One observation of a job's remote state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Submitted or running. The service may suggest when to ask again.
    InProgress { retry_after: Option<Duration> },
    Succeeded(JobResult),
    Failed { code: String, message: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::InProgress { .. })
    }
}

// ── Results ──────────────────────────────────────────────────────────────

/// Semantic role of a result asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResultRole {
    /// Tagged PDF from auto-tagging.
    #[serde(rename = "tagged-pdf")]
    TaggedPdf,
    /// Optional auto-tag report (XLSX).
    #[serde(rename = "report")]
    Report,
    /// Generic output of single-output operations.
    #[serde(rename = "asset")]
    Asset,
}

impl ResultRole {
    /// Key under which the status response carries this asset.
    pub fn wire_key(&self) -> &'static str {
        match self {
            ResultRole::TaggedPdf => "tagged-pdf",
            ResultRole::Report => "report",
            ResultRole::Asset => "asset",
        }
    }

    pub const ALL: [ResultRole; 3] = [ResultRole::TaggedPdf, ResultRole::Report, ResultRole::Asset];
}

impl fmt::Display for ResultRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_key())
    }
}

/// Terminal outcome of a successful job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobResult {
    assets: BTreeMap<ResultRole, Asset>,
}

impl JobResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: ResultRole, asset: Asset) -> Self {
        self.assets.insert(role, asset);
        self
    }

    pub fn get(&self, role: ResultRole) -> Option<&Asset> {
        self.assets.get(&role)
    }

    pub fn tagged_pdf(&self) -> Option<&Asset> {
        self.get(ResultRole::TaggedPdf)
    }

    pub fn report(&self) -> Option<&Asset> {
        self.get(ResultRole::Report)
    }

    pub fn asset(&self) -> Option<&Asset> {
        self.get(ResultRole::Asset)
    }

    pub fn roles(&self) -> impl Iterator<Item = ResultRole> + '_ {
        self.assets.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autotag_body_carries_params() {
        let job = Job::new(
            JobKind::AutotagPdf(AutotagParams {
                shift_headings: true,
                generate_report: false,
            }),
            Asset::new("urn:aaid:AS:UE1:abc"),
        );
        let body = job.request_body();
        assert_eq!(body["assetID"], "urn:aaid:AS:UE1:abc");
        assert_eq!(body["shiftHeadings"], true);
        assert_eq!(body["generateReport"], false);
    }

    #[test]
    fn create_pdf_body_is_asset_only() {
        let body = Job::new(JobKind::CreatePdf, Asset::new("a1")).request_body();
        assert_eq!(body, serde_json::json!({ "assetID": "a1" }));
    }

    #[test]
    fn kind_defaults() {
        let tag = JobKind::AutotagPdf(AutotagParams::default());
        assert_eq!(tag.endpoint(), "autotag");
        assert_eq!(tag.primary_role(), ResultRole::TaggedPdf);
        assert_eq!(tag.default_category(), "AutotagPDF");
        assert_eq!(tag.default_prefix(), "autotag-tagged");
        assert_eq!(JobKind::CreatePdf.primary_role(), ResultRole::Asset);
        assert_eq!(JobKind::CreatePdf.default_prefix(), "create");
    }

    #[test]
    fn accepted_inputs() {
        assert!(JobKind::CreatePdf.accepts(MediaType::Docx));
        assert!(!JobKind::CreatePdf.accepts(MediaType::Pdf));
        assert!(JobKind::OcrPdf.accepts(MediaType::Pdf));
        assert!(!JobKind::AutotagPdf(AutotagParams::default()).accepts(MediaType::Png));
    }

    #[test]
    fn result_lookup_by_role() {
        let result = JobResult::new()
            .with(ResultRole::TaggedPdf, Asset::new("tagged"))
            .with(ResultRole::Report, Asset::new("report"));
        assert_eq!(result.tagged_pdf().map(|a| a.id.as_str()), Some("tagged"));
        assert_eq!(result.report().map(|a| a.id.as_str()), Some("report"));
        assert!(result.asset().is_none());
        assert_eq!(
            result.roles().collect::<Vec<_>>(),
            vec![ResultRole::TaggedPdf, ResultRole::Report]
        );
    }

    #[test]
    fn in_progress_is_not_terminal() {
        assert!(!JobStatus::InProgress { retry_after: None }.is_terminal());
        assert!(JobStatus::Failed {
            code: "X".into(),
            message: "y".into()
        }
        .is_terminal());
    }
}
