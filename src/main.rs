use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use veta_scrape::aggregate::{BatchEntry, BatchRunner, RecpoIndex, read_identifier_file};
use veta_scrape::browser::{BrowserSession, SiteAvailabilityProbe};
use veta_scrape::config::{LookupConfig, LookupConfigBuilder};
use veta_scrape::lookup::{ReinfoLookup, SunatLookup};
use veta_scrape::portal::{ChromeDriver, PortalDriver, PortalScope};

mod cli;

use cli::{Cli, Commands, SingleArgs, VerifyArgs};

fn init_tracing(verbose: u8) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
                .add_directive("chromiumoxide::handler=off".parse()?)
                .add_directive("chromiumoxide::conn=off".parse()?),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<LookupConfig> {
    let mut config = match &cli.config {
        Some(path) => LookupConfig::from_json_file(path)?,
        None => LookupConfig::default(),
    };
    config.apply_env_overrides()?;
    if cli.headed {
        config = LookupConfigBuilder::from_config(config).headless(false).build()?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = load_config(&cli)?;
    let session = Arc::new(BrowserSession::new(config.browser().clone()));
    let driver = ChromeDriver::new(Arc::clone(&session));

    let result = match &cli.command {
        Commands::Verify(args) => verify(args, &config, driver).await,
        Commands::Reinfo(args) => reinfo(args, &config, driver).await,
        Commands::Sunat(args) => sunat(args, &config, driver).await,
        Commands::Probe => probe(&config, driver).await,
    };

    if let Err(e) = session.close().await {
        warn!("Browser shutdown failed: {e:#}");
    }
    result
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            serde_json::to_writer_pretty(std::io::BufWriter::new(file), value)?;
            info!(path = %path.display(), "Report written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, value)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

async fn verify(args: &VerifyArgs, config: &LookupConfig, driver: ChromeDriver) -> Result<()> {
    let mut entries: Vec<BatchEntry> = args.rucs.iter().map(|ruc| BatchEntry::new(ruc)).collect();
    if let Some(path) = &args.input {
        entries.extend(read_identifier_file(path)?);
    }
    if entries.is_empty() {
        bail!("No RUCs given; pass them as arguments or with --input");
    }

    let recpo = match (&args.recpo, &args.recpo_dir) {
        (Some(path), _) => RecpoIndex::from_json_file(path)?,
        (None, Some(dir)) => RecpoIndex::load_monthly(dir, chrono::Local::now().date_naive())?,
        (None, None) => {
            warn!("No RECPO source given; every row will be flagged as missing RECPO");
            RecpoIndex::empty()
        }
    };

    let runner = BatchRunner::new(driver, config);
    let report = runner.run(&entries, &recpo).await;

    if args.only_flagged {
        write_json(&report.flagged(), args.output.as_deref())
    } else {
        write_json(&report.rows, args.output.as_deref())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SingleOutput<T: Serialize, S: Serialize> {
    ruc: String,
    result: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<S>,
}

async fn reinfo(args: &SingleArgs, config: &LookupConfig, driver: ChromeDriver) -> Result<()> {
    let lookup = ReinfoLookup::new(driver, config.reinfo().clone());
    let traced = lookup.lookup_traced(&args.ruc).await;
    write_json(
        &SingleOutput {
            ruc: veta_scrape::normalize_ruc(&args.ruc),
            result: traced.outcome,
            trace: args.trace.then_some(traced.trace),
        },
        None,
    )
}

async fn sunat(args: &SingleArgs, config: &LookupConfig, driver: ChromeDriver) -> Result<()> {
    let lookup = SunatLookup::new(driver, config.sunat().clone());
    let traced = lookup.lookup_traced(&args.ruc).await;
    write_json(
        &SingleOutput {
            ruc: traced.outcome.ruc.clone(),
            result: traced.outcome,
            trace: args.trace.then_some(traced.trace),
        },
        None,
    )
}

#[derive(Serialize)]
struct ProbeOutput {
    reinfo: bool,
    sunat: bool,
}

async fn probe_one(driver: &ChromeDriver, url: &str, config: &LookupConfig) -> Result<bool> {
    let scope = driver.open_scope().await?;
    let reachable =
        SiteAvailabilityProbe::is_reachable(&scope, url, config.reinfo().probe_timeout()).await;
    scope.close().await?;
    Ok(reachable)
}

async fn probe(config: &LookupConfig, driver: ChromeDriver) -> Result<()> {
    let output = ProbeOutput {
        reinfo: probe_one(&driver, &config.reinfo().url, config).await?,
        sunat: probe_one(&driver, &config.sunat().url, config).await?,
    };
    write_json(&output, None)
}
