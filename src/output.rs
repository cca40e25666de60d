//! Output paths and atomic file writes.
//!
//! Results land in `<dir>/<category>/<prefix><timestamp>.<ext>`, where the
//! timestamp is local time at second resolution (`2024-01-01T00-00-00`).
//! Two runs in the same second share a name and the later one wins.

use crate::error::{PdfServicesError, Result};
use crate::job::JobKind;
use chrono::{Local, NaiveDateTime};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// `strftime` pattern for output timestamps. Colon-free so it is a valid
/// file name on every platform.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Source of "now" for output file names.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Parse a reading in [`TIMESTAMP_FORMAT`], e.g. `2024-01-01T00-00-00`.
    pub fn parse(reading: &str) -> Result<Self> {
        NaiveDateTime::parse_from_str(reading, TIMESTAMP_FORMAT)
            .map(Self)
            .map_err(|e| PdfServicesError::InvalidConfig(format!("Bad clock reading '{reading}': {e}")))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Where a job's output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// Root output directory. Default: `output`.
    pub dir: PathBuf,
    /// Sub-directory named after the operation, e.g. `AutotagPDF`.
    pub category: String,
    /// File-name text before the timestamp, e.g. `autotag-tagged`.
    pub prefix: String,
    /// Extension without the dot. Default: `pdf`.
    pub extension: String,
}

impl OutputTarget {
    pub fn new(
        dir: impl Into<PathBuf>,
        category: impl Into<String>,
        prefix: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            category: category.into(),
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    /// Conventional target for a job kind under `output/`.
    pub fn for_job(kind: &JobKind) -> Self {
        Self::new(
            "output",
            kind.default_category(),
            kind.default_prefix(),
            "pdf",
        )
    }

    pub fn category_dir(&self) -> PathBuf {
        self.dir.join(&self.category)
    }

    /// Full path for a write happening at `at`.
    pub fn path_at(&self, at: NaiveDateTime) -> PathBuf {
        let name = format!(
            "{}{}.{}",
            self.prefix,
            format_timestamp(at),
            self.extension.trim_start_matches('.')
        );
        self.category_dir().join(name)
    }

    /// Sibling target for a secondary artifact (e.g. the auto-tag report).
    pub fn companion(&self, suffix: &str, extension: &str) -> Self {
        Self {
            dir: self.dir.clone(),
            category: self.category.clone(),
            prefix: format!("{}-{}", self.prefix, suffix),
            extension: extension.to_string(),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let single_component = |s: &str| {
            let mut comps = Path::new(s).components();
            matches!(comps.next(), Some(Component::Normal(_))) && comps.next().is_none()
        };
        if !single_component(&self.category) {
            return Err(PdfServicesError::InvalidConfig(format!(
                "Output category must be a single directory name, got '{}'",
                self.category
            )));
        }
        if self.prefix.contains(['/', '\\']) {
            return Err(PdfServicesError::InvalidConfig(format!(
                "Output prefix must not contain path separators, got '{}'",
                self.prefix
            )));
        }
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(PdfServicesError::InvalidConfig(
                "Output extension must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Write `bytes` to `path`, creating parent directories.
///
/// Bytes go to a temp file in the destination directory which is then
/// renamed over `path`, so readers never observe a half-written file and an
/// existing file at `path` is replaced.
pub async fn write_output(path: &Path, bytes: Vec<u8>) -> Result<()> {
    write_outputs(vec![(path.to_path_buf(), bytes)]).await
}

/// Write several files as one unit.
///
/// Every file is staged as a temp file next to its target before any of
/// them is renamed into place. If a rename fails, the files already renamed
/// are removed again and the remaining temp files are dropped, so either all
/// targets appear or none do.
pub async fn write_outputs(files: Vec<(PathBuf, Vec<u8>)>) -> Result<()> {
    let first = files.first().map(|(p, _)| p.clone()).unwrap_or_default();
    tokio::task::spawn_blocking(move || write_all_blocking(files))
        .await
        .map_err(|e| PdfServicesError::OutputWriteFailed {
            path: first,
            source: std::io::Error::other(e),
        })?
}

fn write_all_blocking(files: Vec<(PathBuf, Vec<u8>)>) -> Result<()> {
    let fail = |path: &Path, source: std::io::Error| PdfServicesError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    // ── Stage ────────────────────────────────────────────────────────────
    let mut staged = Vec::with_capacity(files.len());
    for (path, bytes) in files {
        let tmp = stage(&path, &bytes).map_err(|e| fail(&path, e))?;
        staged.push((path, tmp));
    }

    // ── Commit ───────────────────────────────────────────────────────────
    let mut committed: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for (path, tmp) in staged {
        if let Err(e) = tmp.persist(&path) {
            for done in &committed {
                if let Err(rm) = std::fs::remove_file(done) {
                    warn!("Could not roll back {}: {}", done.display(), rm);
                }
            }
            return Err(fail(&path, e.error));
        }
        committed.push(path);
    }
    Ok(())
}

/// Temp file holding `bytes` in the directory `path` will live in.
fn stage(path: &Path, bytes: &[u8]) -> std::io::Result<tempfile::NamedTempFile> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::AutotagParams;

    #[test]
    fn autotag_path_for_fixed_clock() {
        let target = OutputTarget::for_job(&JobKind::AutotagPdf(AutotagParams::default()));
        let clock = FixedClock::parse("2024-01-01T00-00-00").unwrap();
        assert_eq!(
            target.path_at(clock.now()),
            PathBuf::from("output/AutotagPDF/autotag-tagged2024-01-01T00-00-00.pdf")
        );
    }

    #[test]
    fn create_pdf_path() {
        let target = OutputTarget::for_job(&JobKind::CreatePdf);
        let at = FixedClock::parse("2024-03-05T14-07-09").unwrap().now();
        assert_eq!(
            target.path_at(at),
            PathBuf::from("output/CreatePDF/create2024-03-05T14-07-09.pdf")
        );
    }

    #[test]
    fn runs_a_second_apart_get_different_names() {
        let target = OutputTarget::for_job(&JobKind::OcrPdf);
        let first = FixedClock::parse("2024-01-01T00-00-00").unwrap().now();
        let second = first + chrono::Duration::seconds(1);
        assert_ne!(target.path_at(first), target.path_at(second));
    }

    #[test]
    fn companion_target_for_report() {
        let target = OutputTarget::for_job(&JobKind::AutotagPdf(AutotagParams::default()));
        let at = FixedClock::parse("2024-01-01T00-00-00").unwrap().now();
        assert_eq!(
            target.companion("report", "xlsx").path_at(at),
            PathBuf::from("output/AutotagPDF/autotag-tagged-report2024-01-01T00-00-00.xlsx")
        );
    }

    #[test]
    fn bad_clock_reading_rejected() {
        assert!(FixedClock::parse("2024-01-01 00:00:00").is_err());
    }

    #[test]
    fn category_must_be_one_component() {
        let mut target = OutputTarget::for_job(&JobKind::CreatePdf);
        assert!(target.validate().is_ok());
        target.category = "../escape".into();
        assert!(target.validate().is_err());
        target.category = String::new();
        assert!(target.validate().is_err());
    }

    #[tokio::test]
    async fn write_creates_dirs_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Cat").join("file.pdf");

        write_output(&path, b"first".to_vec()).await.unwrap();
        write_output(&path, b"second".to_vec()).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        let entries = std::fs::read_dir(dir.path().join("Cat")).unwrap().count();
        assert_eq!(entries, 1, "temp files must not be left behind");
    }

    #[tokio::test]
    async fn failed_commit_removes_earlier_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("Cat").join("a.pdf");
        let second = dir.path().join("Cat").join("b.xlsx");
        // A directory where the second file should go makes its rename fail.
        std::fs::create_dir_all(&second).unwrap();

        let err = write_outputs(vec![
            (first.clone(), b"primary".to_vec()),
            (second.clone(), b"report".to_vec()),
        ])
        .await
        .unwrap_err();

        assert!(
            matches!(err, PdfServicesError::OutputWriteFailed { ref path, .. } if *path == second),
            "got: {err:?}"
        );
        assert!(!first.exists(), "first file must be rolled back");
        let left: Vec<_> = std::fs::read_dir(dir.path().join("Cat"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(left, vec![second], "temp files must not be left behind");
    }
}
