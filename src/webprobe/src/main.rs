//! webprobe — headless form and interaction testing.
//!
//! Loads a page fixture into an in-memory element tree, runs the requested
//! sequences, suites and form flows, and writes the configured reports.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use webprobe_core::dom::{MemoryTree, PageFixture};
use webprobe_core::{EngineConfig, ExecutionStatus};
use webprobe_engine::TestEngine;
use webprobe_reporting::{ExportFormat, NotificationStatus, NotificationSummary, RunRecord};

#[derive(Parser, Debug)]
#[command(name = "webprobe")]
#[command(about = "Headless form validation and interaction testing")]
#[command(version)]
struct Cli {
    /// Page fixture (JSON) to load as the page under test
    #[arg(long)]
    page: PathBuf,

    /// Config file (TOML); environment variables prefixed WEBPROBE__ also apply
    #[arg(long, env = "WEBPROBE_CONFIG")]
    config: Option<PathBuf>,

    /// Interaction sequence descriptor (JSON); repeatable
    #[arg(long = "sequence")]
    sequences: Vec<PathBuf>,

    /// Registered suite to run; repeatable
    #[arg(long = "suite")]
    suites: Vec<String>,

    /// Selector scoping suite runs
    #[arg(long)]
    target: Option<String>,

    /// Form selector to run the fill/validate/submit flow against; repeatable
    #[arg(long = "form")]
    forms: Vec<String>,

    /// Run every enabled suite as a CI session and print its summary
    #[arg(long, default_value_t = false)]
    ci: bool,

    /// Page URL for CI decisions (defaults to the fixture's url)
    #[arg(long)]
    url: Option<String>,

    /// Report formats (overrides config)
    #[arg(long = "format", env = "WEBPROBE__REPORT_FORMATS", value_delimiter = ',')]
    formats: Option<Vec<String>>,

    /// Directory reports are written to
    #[arg(long, default_value = "reports")]
    out_dir: PathBuf,

    /// Stop sequences at the first failed step (overrides config)
    #[arg(long, env = "WEBPROBE__STOP_ON_FAILURE")]
    stop_on_failure: Option<bool>,

    /// CI environment name (overrides config)
    #[arg(long, env = "WEBPROBE__CI__ENVIRONMENT")]
    environment: Option<String>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "webprobe=info".into());
    let logs = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        logs.json().init();
    } else {
        logs.init();
    }

    // Load configuration
    let mut config = EngineConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        EngineConfig::default()
    });

    // Apply CLI overrides
    if let Some(formats) = cli.formats {
        config.report_formats = formats;
    }
    if let Some(stop) = cli.stop_on_failure {
        config.stop_on_failure = stop;
    }
    if let Some(environment) = cli.environment {
        config.ci.environment = environment;
    }
    // Reject unknown formats before anything runs.
    for format in &config.report_formats {
        format.parse::<ExportFormat>()?;
    }

    info!(
        suites = ?config.enabled_suites,
        formats = ?config.report_formats,
        stop_on_failure = config.stop_on_failure,
        environment = %config.ci.environment,
        "Configuration loaded"
    );

    let page = load_page(&cli.page)?;
    let url = cli.url.or_else(|| page.url.clone()).unwrap_or_default();
    let tree = Arc::new(MemoryTree::from_fixture(page));
    let engine = TestEngine::new(config, tree)?;

    for path in &cli.sequences {
        let descriptor = read_json(path)?;
        let result = engine.run_sequence_value(descriptor).await?;
        info!(
            sequence = %result.sequence_name,
            status = %result.status,
            completed = result.completed_steps(),
            failed = result.failed_steps(),
            "Sequence finished"
        );
    }

    for suite in &cli.suites {
        let result = engine.run_suite(suite, cli.target.as_deref()).await?;
        info!(
            suite = %result.suite_name,
            passed = result.passed(),
            failed = result.failed(),
            "Suite finished"
        );
    }

    for form in &cli.forms {
        let result = engine.test_form_interaction(form, None).await?;
        info!(
            form = %result.form_selector,
            status = %result.status,
            steps = result.steps.len(),
            "Form flow finished"
        );
    }

    let mut notification = None;
    if cli.ci {
        if engine.should_trigger_ci(&url) {
            let session = engine.run_ci_session(&url).await;
            notification = Some(NotificationSummary::from_session(&session));
        } else {
            info!(url = %url, "CI run skipped for this URL");
        }
    }

    write_reports(&engine, &cli.out_dir)?;

    if let Some(summary) = &notification {
        println!("{}", serde_json::to_string_pretty(summary)?);
    }

    let failed = engine.results().iter().any(run_failed)
        || notification.is_some_and(|n| n.status == NotificationStatus::Failure);
    if failed {
        warn!("One or more runs failed");
        std::process::exit(1);
    }
    Ok(())
}

fn run_failed(record: &RunRecord) -> bool {
    record.status() == ExecutionStatus::Failed || record.leaves().iter().any(|l| l.is_failed())
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn load_page(path: &Path) -> anyhow::Result<PageFixture> {
    let page: PageFixture = serde_json::from_value(read_json(path)?)
        .with_context(|| format!("page fixture {}", path.display()))?;
    info!(page = %path.display(), elements = page.elements.len(), "Page fixture loaded");
    Ok(page)
}

fn write_reports(engine: &TestEngine, out_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    for (format, body) in engine.export_configured()? {
        let extension = format.parse::<ExportFormat>()?.extension();
        let path = out_dir.join(format!("webprobe-report.{extension}"));
        std::fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "Report written");
    }
    Ok(())
}
