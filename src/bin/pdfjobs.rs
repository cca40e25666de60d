//! CLI binary for pdf-services-jobs.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClientConfig` / `WorkflowConfig` and prints the outcome.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_services_jobs::{
    run_job, Asset, AutotagParams, ClientConfig, JobHandle, JobKind, JobOutcome, PollPolicy,
    ProgressCallback, ProxyScheme, ProxyServerConfig, Region, WorkflowConfig,
    WorkflowProgressCallback,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one spinner whose prefix follows the workflow stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl WorkflowProgressCallback for CliProgressCallback {
    fn on_upload_start(&self, input: &Path, bytes: usize) {
        self.bar.set_prefix("Uploading");
        self.bar
            .set_message(format!("{} ({} bytes)", input.display(), bytes));
    }

    fn on_uploaded(&self, asset: &Asset) {
        self.bar
            .println(format!("  {} uploaded  {}", green("✓"), dim(&asset.id)));
    }

    fn on_submitted(&self, handle: &JobHandle) {
        self.bar.set_prefix("Processing");
        self.bar.set_message("waiting for the service…");
        self.bar
            .println(format!("  {} submitted {}", green("✓"), dim(handle.as_str())));
    }

    fn on_job_complete(&self, kind: &JobKind) {
        self.bar
            .println(format!("  {} {} job done", green("✓"), kind));
    }

    fn on_download_start(&self, asset: &Asset) {
        self.bar.set_prefix("Downloading");
        self.bar.set_message(asset.id.clone());
    }

    fn on_written(&self, path: &Path, bytes: usize) {
        self.bar.println(format!(
            "  {} wrote {}  {}",
            green("✓"),
            bold(&path.display().to_string()),
            dim(&format!("{bytes} bytes"))
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Tag a PDF for accessibility
  pdfjobs autotag --input report.pdf

  # Tag and also fetch the tagging report
  pdfjobs autotag --input report.pdf --generate-report --shift-headings

  # Word → PDF through a proxy
  pdfjobs create-pdf --input letter.docx \
      --proxy-host proxy.corp --proxy-scheme http --proxy-port 3128

  # OCR a scan, EU region, JSON summary
  pdfjobs ocr --input scan.pdf --region eu --json

OUTPUT:
  Files are written to <output-dir>/<category>/<prefix><timestamp>.pdf,
  e.g. output/AutotagPDF/autotag-tagged2024-01-01T00-00-00.pdf

ENVIRONMENT VARIABLES:
  PDF_SERVICES_CLIENT_ID      Service-principal client id (required)
  PDF_SERVICES_CLIENT_SECRET  Service-principal client secret (required)
  RUST_LOG                    Override the log filter
  A .env file in the working directory is loaded if present.
"#;

/// Run cloud PDF Services jobs on local files.
#[derive(Parser, Debug)]
#[command(
    name = "pdfjobs",
    version,
    about = "Run cloud PDF Services jobs (auto-tag, create, OCR, compress, linearize) on local files",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    job: JobCommand,

    #[command(flatten)]
    output: OutputArgs,

    #[command(flatten)]
    transport: TransportArgs,

    /// Seconds between job status checks.
    #[arg(long, global = true, env = "PDFJOBS_POLL_INTERVAL", default_value_t = 3)]
    poll_interval: u64,

    /// Give up waiting for the job after this many seconds.
    #[arg(long, global = true, env = "PDFJOBS_POLL_TIMEOUT", default_value_t = 600)]
    poll_timeout: u64,

    /// Print the outcome as JSON on stdout.
    #[arg(long, global = true, env = "PDFJOBS_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "PDFJOBS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFJOBS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFJOBS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum JobCommand {
    /// Add accessibility tags to a PDF.
    Autotag {
        /// PDF to tag.
        #[arg(short, long, default_value = "resources/autotagPDFInput.pdf")]
        input: PathBuf,

        /// Shift detected headings one level down.
        #[arg(long)]
        shift_headings: bool,

        /// Also download the XLSX tagging report.
        #[arg(long)]
        generate_report: bool,
    },
    /// Convert an office document or image to PDF.
    CreatePdf {
        #[arg(short, long, default_value = "resources/createPDFInput.docx")]
        input: PathBuf,
    },
    /// Make a scanned PDF searchable.
    Ocr {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Reduce PDF file size.
    Compress {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Optimise a PDF for fast web view.
    Linearize {
        #[arg(short, long)]
        input: PathBuf,
    },
}

impl JobCommand {
    fn kind_and_input(&self) -> (JobKind, &Path) {
        match self {
            JobCommand::Autotag {
                input,
                shift_headings,
                generate_report,
            } => (
                JobKind::AutotagPdf(AutotagParams {
                    shift_headings: *shift_headings,
                    generate_report: *generate_report,
                }),
                input,
            ),
            JobCommand::CreatePdf { input } => (JobKind::CreatePdf, input),
            JobCommand::Ocr { input } => (JobKind::OcrPdf, input),
            JobCommand::Compress { input } => (JobKind::CompressPdf, input),
            JobCommand::Linearize { input } => (JobKind::LinearizePdf, input),
        }
    }
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Root directory for results.
    #[arg(long, global = true, env = "PDFJOBS_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Sub-directory under the output dir. Defaults to the job's name, e.g. AutotagPDF.
    #[arg(long, global = true, env = "PDFJOBS_CATEGORY")]
    category: Option<String>,

    /// File-name prefix before the timestamp. Defaults per job, e.g. autotag-tagged.
    #[arg(long, global = true, env = "PDFJOBS_PREFIX")]
    prefix: Option<String>,
}

#[derive(Args, Debug)]
struct TransportArgs {
    /// TCP connect timeout in milliseconds.
    #[arg(long, global = true, env = "PDFJOBS_CONNECT_TIMEOUT_MS", default_value_t = 10_000)]
    connect_timeout_ms: u64,

    /// Read timeout in milliseconds.
    #[arg(long, global = true, env = "PDFJOBS_READ_TIMEOUT_MS", default_value_t = 40_000)]
    read_timeout_ms: u64,

    /// Service region.
    #[arg(long, global = true, env = "PDFJOBS_REGION", value_enum, default_value = "us")]
    region: RegionArg,

    /// Explicit API base URL (overrides --region).
    #[arg(long, global = true, env = "PDFJOBS_BASE_URL")]
    base_url: Option<String>,

    /// Route all calls through this proxy host.
    #[arg(long, global = true, env = "PDFJOBS_PROXY_HOST")]
    proxy_host: Option<String>,

    /// Scheme used to reach the proxy.
    #[arg(long, global = true, env = "PDFJOBS_PROXY_SCHEME", value_enum, default_value = "http")]
    proxy_scheme: ProxySchemeArg,

    /// Proxy port. Defaults to 80 for http, 443 for https.
    #[arg(long, global = true, env = "PDFJOBS_PROXY_PORT")]
    proxy_port: Option<u16>,

    /// Proxy basic-auth user.
    #[arg(long, global = true, env = "PDFJOBS_PROXY_USER", requires = "proxy_password")]
    proxy_user: Option<String>,

    /// Proxy basic-auth password.
    #[arg(
        long,
        global = true,
        env = "PDFJOBS_PROXY_PASSWORD",
        hide_env_values = true,
        requires = "proxy_user"
    )]
    proxy_password: Option<String>,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum RegionArg {
    Us,
    Eu,
}

impl From<RegionArg> for Region {
    fn from(v: RegionArg) -> Self {
        match v {
            RegionArg::Us => Region::Us,
            RegionArg::Eu => Region::Eu,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ProxySchemeArg {
    Http,
    Https,
}

impl From<ProxySchemeArg> for ProxyScheme {
    fn from(v: ProxySchemeArg) -> Self {
        match v {
            ProxySchemeArg::Http => ProxyScheme::Http,
            ProxySchemeArg::Https => ProxyScheme::Https,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_with_env(None, std::env::args_os()).unwrap_or_else(|e| e.exit());

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the per-stage feedback, so INFO logs stay quiet
    // while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let client = build_client_config(&cli.transport)?;

    let progress = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };
    let workflow = build_workflow_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as ProgressCallback),
    )?;

    // ── Run ──────────────────────────────────────────────────────────────
    let outcome = run_job(&client, &workflow).await;
    if let Some(ref cb) = progress {
        cb.finish();
    }
    let outcome = outcome.with_context(|| format!("{} job failed", workflow.job))?;

    report(&cli, &outcome)
}

/// Load `.env` (or `env_file`) into the process environment, then parse `args`.
///
/// Flag `env = ...` fallbacks are read while parsing, so the file must be
/// loaded first. Variables already set in the environment win over the file.
fn parse_with_env<I, T>(env_file: Option<&Path>, args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    // A missing .env is the normal case.
    let _ = match env_file {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    Cli::try_parse_from(args)
}

/// Map transport flags to `ClientConfig`.
fn build_client_config(args: &TransportArgs) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .connect_timeout_ms(args.connect_timeout_ms)
        .read_timeout_ms(args.read_timeout_ms)
        .region(args.region.clone().into());

    if let Some(ref url) = args.base_url {
        builder = builder.base_url(url);
    }

    if let Some(ref host) = args.proxy_host {
        let mut proxy = ProxyServerConfig::new(host, args.proxy_scheme.clone().into());
        if let Some(port) = args.proxy_port {
            proxy = proxy.with_port(port);
        }
        if let (Some(user), Some(pass)) = (&args.proxy_user, &args.proxy_password) {
            proxy = proxy.with_credentials(user, pass);
        }
        builder = builder.proxy(proxy);
    }

    builder.build().context("Invalid client configuration")
}

/// Map job and output flags to `WorkflowConfig`.
fn build_workflow_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<WorkflowConfig> {
    let (kind, input) = cli.job.kind_and_input();

    let mut builder = WorkflowConfig::builder(input, kind)
        .output_dir(&cli.output.output_dir)
        .poll_policy(PollPolicy::new(
            Duration::from_secs(cli.poll_interval),
            Duration::from_secs(cli.poll_timeout),
        ));

    if let Some(ref category) = cli.output.category {
        builder = builder.category(category);
    }
    if let Some(ref prefix) = cli.output.prefix {
        builder = builder.prefix(prefix);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid job configuration")
}

/// Print the outcome as JSON or a one-line summary.
fn report(cli: &Cli, outcome: &JobOutcome) -> Result<()> {
    if cli.json {
        let json =
            serde_json::to_string_pretty(outcome).context("Failed to serialise outcome")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        eprintln!(
            "{}  {} job  {}ms  →  {}",
            green("✔"),
            outcome.job,
            outcome.duration_ms,
            bold(&outcome.output_path.display().to_string()),
        );
        for extra in &outcome.extra_outputs {
            eprintln!("   also wrote {}", dim(&extra.display().to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "pdfjobs",
            "create-pdf",
            "--proxy-host",
            "proxy.corp",
            "--proxy-scheme",
            "https",
            "--proxy-port",
            "8443",
        ])
        .unwrap();
        let config = build_client_config(&cli.transport).unwrap();
        let proxy = config.proxy.unwrap();
        assert_eq!(proxy.host, "proxy.corp");
        assert_eq!(proxy.scheme, ProxyScheme::Https);
        assert_eq!(proxy.port(), 8443);
    }

    #[test]
    fn autotag_defaults() {
        let cli = Cli::try_parse_from(["pdfjobs", "autotag", "--generate-report"]).unwrap();
        let config = build_workflow_config(&cli, None).unwrap();
        assert_eq!(
            config.input_path,
            PathBuf::from("resources/autotagPDFInput.pdf")
        );
        assert_eq!(config.output.category, "AutotagPDF");
        assert!(matches!(
            config.job,
            JobKind::AutotagPdf(AutotagParams {
                generate_report: true,
                ..
            })
        ));
    }

    #[test]
    fn dotenv_values_feed_flag_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(&env_file, "PDFJOBS_BASE_URL=http://from-dotenv.test\n").unwrap();

        let cli = parse_with_env(Some(&env_file), ["pdfjobs", "compress", "-i", "in.pdf"]).unwrap();

        assert_eq!(
            cli.transport.base_url.as_deref(),
            Some("http://from-dotenv.test")
        );
    }

    #[test]
    fn proxy_credentials_need_both_halves() {
        let base = ["pdfjobs", "create-pdf", "--proxy-host", "proxy.corp"];
        let user_only = [&base[..], &["--proxy-user", "alice"]].concat();
        let password_only = [&base[..], &["--proxy-password", "s3cret"]].concat();
        let both = [
            &base[..],
            &["--proxy-user", "alice", "--proxy-password", "s3cret"],
        ]
        .concat();

        assert!(Cli::try_parse_from(user_only).is_err());
        assert!(Cli::try_parse_from(password_only).is_err());
        let cli = Cli::try_parse_from(both).unwrap();
        let proxy = build_client_config(&cli.transport).unwrap().proxy.unwrap();
        assert_eq!(proxy.credentials.unwrap().username, "alice");
    }

    #[test]
    fn ocr_requires_input() {
        assert!(Cli::try_parse_from(["pdfjobs", "ocr"]).is_err());
    }
}
