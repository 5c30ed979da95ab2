//! CLI binary for report2docx.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `ServiceConfig`, then either generates one report or starts
//! the upload web UI.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use report2docx::{
    ProgressCallback, ReportCategory, ReportPipeline, ReportProgressCallback, ReportRequest,
    ServiceConfig, Stage,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that shows the current stage and the poll counter while a job is
/// pending, and leaves one ✓ line per finished stage.
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
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ReportProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message("");
    }

    fn on_stage_complete(&self, stage: Stage) {
        self.bar.println(format!("  {} {}", green("✓"), stage));
    }

    fn on_job_submitted(&self, job_id: &str) {
        self.bar.set_message(format!("job {}", dim(job_id)));
    }

    fn on_poll(&self, job_id: &str, attempt: u32, max_attempts: u32, status: Option<&str>) {
        self.bar.set_message(format!(
            "job {}  poll {attempt}/{max_attempts}  {}",
            dim(job_id),
            status.unwrap_or("no response")
        ));
    }

    fn on_report_complete(&self, _file_name: &str) {
        self.bar.finish_and_clear();
    }
}

// The last pipeline handle goes away before `main` prints an error, so the
// spinner is cleared on failure too.
impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Equity report with a cover image
  report2docx generate report1.pdf --category equity --image cover.png

  # Weekly fund flow into ./out
  report2docx generate flows.pdf --category weekly-fund-flow -o out

  # Upload UI on http://127.0.0.1:8501
  report2docx serve

ENVIRONMENT VARIABLES:
  CLIENT_ID                 OAuth2 client id for the job service
  CLIENT_SECRET             OAuth2 client secret
  REPORT_AUTH_URL           Token endpoint override
  REPORT_API_BASE_URL       Job service base URL override
  REPORT_MODEL              Model name (default: deepseek-r1)
  REPORT_POLL_INTERVAL_MS   Delay between status polls (default: 2000)
  REPORT_MAX_POLL_ATTEMPTS  Polls before giving up (default: 60)
  PDFIUM_LIB_PATH           Path to libpdfium (file or directory)

  A .env file in the working directory is loaded at startup.
"#;

/// Turn financial-research PDFs into styled Word reports.
#[derive(Parser, Debug)]
#[command(
    name = "report2docx",
    version,
    about = "Turn financial-research PDFs into styled Word reports",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    service: ServiceArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "REPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "REPORT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate one report from a PDF.
    Generate(GenerateArgs),

    /// Serve the upload web UI.
    #[cfg(feature = "server")]
    Serve {
        /// Address to listen on.
        #[arg(long, env = "REPORT_BIND", default_value = "127.0.0.1:8501")]
        bind: std::net::SocketAddr,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Source PDF.
    pdf: PathBuf,

    /// Name used in the output file name.
    #[arg(long, default_value = "Charlotte")]
    user_name: String,

    /// equity, macro, fx-commodity or weekly-fund-flow.
    #[arg(long, default_value = "equity")]
    category: ReportCategory,

    /// Cover image appended at the end (ignored for weekly fund flow).
    #[arg(long)]
    image: Option<PathBuf>,

    /// Directory the .docx is written to.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Disable the spinner.
    #[arg(long, env = "REPORT_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct ServiceArgs {
    /// OAuth2 client id.
    #[arg(long, global = true, env = "CLIENT_ID", default_value = "")]
    client_id: String,

    /// OAuth2 client secret.
    #[arg(long, global = true, env = "CLIENT_SECRET", default_value = "", hide_env_values = true)]
    client_secret: String,

    /// Token endpoint.
    #[arg(long, global = true, env = "REPORT_AUTH_URL")]
    auth_url: Option<String>,

    /// Job service base URL.
    #[arg(long, global = true, env = "REPORT_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Model name sent with every job.
    #[arg(long, global = true, env = "REPORT_MODEL")]
    model: Option<String>,

    /// Delay before each status poll, in milliseconds.
    #[arg(long, global = true, env = "REPORT_POLL_INTERVAL_MS", default_value_t = 2000)]
    poll_interval_ms: u64,

    /// Status polls before a job times out.
    #[arg(long, global = true, env = "REPORT_MAX_POLL_ATTEMPTS", default_value_t = 60)]
    max_poll_attempts: u32,
}

#[tokio::main]
async fn main() {
    // A missing .env is fine; the variables may come from the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", red("✘"), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs would fight with the spinner, so they are muted while it
    // runs unless -v was given.
    let show_progress = match &cli.command {
        Command::Generate(args) => !cli.quiet && !args.no_progress,
        #[cfg(feature = "server")]
        Command::Serve { .. } => false,
    };
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

    match cli.command {
        Command::Generate(ref args) => {
            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn ReportProgressCallback>)
            } else {
                None
            };
            let config = build_config(&cli.service, progress)?;
            generate(args, config, cli.quiet).await
        }
        #[cfg(feature = "server")]
        Command::Serve { bind } => {
            let config = build_config(&cli.service, None)?;
            let pipeline =
                ReportPipeline::new(Arc::new(config)).context("Failed to build pipeline")?;
            report2docx::server::serve(bind, report2docx::server::AppState::new(pipeline))
                .await
                .context("Server stopped")
        }
    }
}

async fn generate(args: &GenerateArgs, config: ServiceConfig, quiet: bool) -> Result<()> {
    let bytes = tokio::fs::read(&args.pdf)
        .await
        .with_context(|| format!("Failed to read {}", args.pdf.display()))?;
    let source_name = args
        .pdf
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.pdf".to_string());

    let request = ReportRequest::new(bytes, source_name)
        .user_name(args.user_name.clone())
        .category(args.category)
        .image(args.image.clone());

    let pipeline = ReportPipeline::new(Arc::new(config)).context("Failed to build pipeline")?;
    let report = pipeline
        .generate(&request, &args.output_dir)
        .await
        .context("Report generation failed")?;

    if !quiet {
        eprintln!(
            "{} {} report  →  {}",
            green("✔"),
            args.category,
            bold(&report.file_name)
        );
    }
    println!("{}", report.path.display());
    Ok(())
}

/// Map CLI args to `ServiceConfig`.
fn build_config(args: &ServiceArgs, progress: Option<ProgressCallback>) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder()
        .credentials(args.client_id.clone(), args.client_secret.clone())
        .poll_interval_ms(args.poll_interval_ms)
        .max_poll_attempts(args.max_poll_attempts);

    if let Some(ref url) = args.auth_url {
        builder = builder.auth_url(url.clone());
    }
    if let Some(ref url) = args.api_base_url {
        builder = builder.api_base_url(url.clone());
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
