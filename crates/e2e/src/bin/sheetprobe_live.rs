//! Live harness: runs the TODAY() scenario against a real account
//!
//! Credentials come from `EXCEL_URL`, `EXCEL_USERNAME` and `EXCEL_PASSWORD`
//! (a `.env` file in the working directory is honoured).
//! Run with: cargo run --package sheetprobe-e2e --bin sheetprobe-live

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sheetprobe_common::{Credentials, DateFormat, RetryBudget};
use sheetprobe_e2e::playwright::{Browser, PlaywrightConfig};
use sheetprobe_e2e::runner::RunnerConfig;
use sheetprobe_e2e::{E2eResult, Profile, ScenarioRunner};

#[derive(Parser, Debug)]
#[command(name = "sheetprobe-live")]
#[command(about = "Verify that =TODAY() renders today's date in the web spreadsheet")]
struct Args {
    /// YAML profile overriding selectors, offsets, timings and date format
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Date format the spreadsheet renders, e.g. DD/MM/YYYY
    #[arg(long)]
    date_format: Option<DateFormat>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, default_value = "chromium")]
    browser: Browser,

    /// Installed browser channel; pass an empty string for bundled Chromium
    #[arg(long, default_value = "chrome")]
    channel: String,

    /// Run without a visible window
    #[arg(long)]
    headless: bool,

    /// Use a fixed viewport instead of a maximized window
    #[arg(long)]
    no_maximize: bool,

    /// Viewport width when not maximized
    #[arg(long, default_value = "1280")]
    viewport_width: u32,

    /// Viewport height when not maximized
    #[arg(long, default_value = "720")]
    viewport_height: u32,

    /// Clipboard read attempts before giving up
    #[arg(long, default_value = "5")]
    max_attempts: u32,

    /// Delay between clipboard read attempts
    #[arg(long, default_value = "1000")]
    retry_delay_ms: u64,

    /// Directory containing node_modules/playwright
    #[arg(long, default_value = ".")]
    playwright_dir: PathBuf,

    /// Directory for recorded videos
    #[arg(long, default_value = "test-results/videos")]
    video_dir: PathBuf,

    /// Do not record a video
    #[arg(long)]
    no_video: bool,

    /// Output directory for results
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match dotenvy::dotenv() {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring unreadable .env file: {}", e),
    }

    // Run async main
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let credentials = Credentials::from_env()?;

    let mut profile = match &args.profile {
        Some(path) => Profile::from_file(path)?,
        None => Profile::default(),
    };
    if let Some(format) = args.date_format {
        profile.date_format = format;
    }

    let config = RunnerConfig {
        playwright: PlaywrightConfig {
            browser: args.browser,
            channel: Some(args.channel).filter(|c| !c.is_empty()),
            headless: args.headless,
            maximized: !args.no_maximize,
            viewport_width: args.viewport_width,
            viewport_height: args.viewport_height,
            video_dir: (!args.no_video).then_some(args.video_dir),
            working_dir: args.playwright_dir,
            ..Default::default()
        },
        profile,
        retry: RetryBudget::new(args.max_attempts, Duration::from_millis(args.retry_delay_ms))?,
        output_dir: args.output,
    };

    let runner = ScenarioRunner::with_config(config);
    let result = runner.run(&credentials).await?;
    runner.write_results(&result)?;

    Ok(result.success)
}
