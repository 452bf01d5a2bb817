use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use timetable_core::SemesterReport;
use timetable_engine::{
    find_provider, provider_ids, write_calendar, ExportOptions, PortalConfig, Provider,
    ScheduleFetcher, SemesterAggregator, SessionAuthenticator,
};
use timetable_logging::sched_info;

mod config;
mod logging;
mod solver;

#[derive(Parser)]
#[command(name = "timetable", about = "Harvest a semester timetable into an iCalendar file")]
#[command(version)]
struct Cli {
    /// Path to the RON run configuration.
    #[arg(long, default_value = "timetable.ron")]
    config: PathBuf,

    /// Directory the calendar artifact is written to.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Also write logs to ./timetable.log.
    #[arg(long)]
    log_file: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let destination = if cli.log_file {
        logging::LogDestination::Both
    } else {
        logging::LogDestination::Terminal
    };
    logging::initialize(destination, cli.verbose);

    let run = config::load(&cli.config)?;
    let provider = find_provider(&run.provider).with_context(|| {
        format!(
            "unknown provider {:?}; known providers: {}",
            run.provider,
            provider_ids().join(", ")
        )
    })?;
    let (account, password) = config::resolve_credentials(&run)?;

    // All portal IO is strictly sequential; a single-threaded runtime is
    // enough and keeps the ordering obvious.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let report = runtime.block_on(harvest(provider, &run, &account, &password))?;

    println!("Merged {} course events.", report.events.len());
    if !report.failed_weeks.is_empty() {
        println!("Failed weeks: {:?}", report.failed_weeks);
    }
    if report.degraded {
        println!("Warning: more than half the term failed to fetch; the calendar is incomplete.");
    }
    if report.events.is_empty() {
        bail!("no course events harvested; refusing to write an empty calendar");
    }

    let options = ExportOptions {
        timezone: run.timezone.clone(),
        output_filename: run.output_filename.clone(),
    };
    let summary = write_calendar(
        &cli.output_dir,
        &report.events,
        &provider.time_table(),
        &options,
    )?;
    println!(
        "Calendar written to {} ({} events, {} skipped).",
        summary.output_path.display(),
        summary.event_count,
        summary.skipped
    );
    Ok(())
}

async fn harvest(
    provider: &'static Provider,
    run: &config::RunConfig,
    account: &str,
    password: &str,
) -> Result<SemesterReport> {
    let portal = PortalConfig::new(provider.base_url);
    let authenticator = SessionAuthenticator::new(
        portal.clone(),
        Arc::new(solver::PromptCaptchaSolver),
        provider.cipher,
    )?;
    let session = authenticator.authenticate(account, password).await?;
    sched_info!("authenticated against {}", provider.display_name);

    let fetcher = ScheduleFetcher::new(session, portal.clone());
    let aggregator = SemesterAggregator::new(fetcher, portal);
    Ok(aggregator.run(&run.term_code, run.total_weeks).await)
}
