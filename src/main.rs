use anyhow::{bail, Context, Result};
use chrono::Local;
use cvmscraper::{
    config::Config,
    extract,
    fetch::{self, list_archives},
    normalize::SourceFile,
    pipeline,
    report::{self, ReportData},
};
use std::{env, path::PathBuf};
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

const USAGE: &str = "Usage: cvmscraper [--local <DIR>]";

/// Where this run's CSV sources come from.
enum Source {
    Portal,
    Local(PathBuf),
}

fn parse_args() -> Result<Source> {
    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        None => Ok(Source::Portal),
        Some("--local") => match args.next() {
            Some(dir) => Ok(Source::Local(PathBuf::from(dir))),
            None => bail!("--local needs a directory\n{}", USAGE),
        },
        Some("-h" | "--help") => {
            println!("{}", USAGE);
            std::process::exit(0);
        }
        Some(other) => bail!("unexpected argument {:?}\n{}", other, USAGE),
    }
}

async fn retrieve(config: &Config) -> Result<Vec<SourceFile>> {
    let client = fetch::build_client(config)?;
    let base = Url::parse(&config.base_url)
        .with_context(|| format!("invalid base URL {}", config.base_url))?;

    let urls = list_archives(&client, &base, config.retry_policy()).await?;
    if urls.is_empty() {
        bail!("no zip archives listed at {}", base);
    }

    let retrieval = fetch::retrieve_archives(&client, urls, config).await?;
    for failure in &retrieval.failures {
        warn!(url = %failure.url, error = %failure.error, "archive not included in this run");
    }
    Ok(retrieval.files)
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()))
    });
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let source = parse_args()?;
    let config = Config::load()?;
    info!(?config, "loaded configuration");
    let start = Instant::now();

    // ─── 3) gather sources ───────────────────────────────────────────
    let files = match source {
        Source::Portal => retrieve(&config).await?,
        Source::Local(dir) => {
            let local = tokio::task::spawn_blocking(move || extract::load_local_dir(&dir)).await??;
            for failure in &local.failures {
                warn!(path = %failure.path.display(), error = %failure.error, "source not included in this run");
            }
            local.files
        }
    };
    info!(files = files.len(), elapsed = ?start.elapsed(), "sources ready");

    // ─── 4) normalize, consolidate, persist, delta ───────────────────
    let outcome = tokio::task::spawn_blocking({
        let config = config.clone();
        move || pipeline::run(files, &config, Local::now().naive_local())
    })
    .await??;

    // ─── 5) report ───────────────────────────────────────────────────
    let data = ReportData::from_outcome(&outcome);
    print!("{}", report::render_console(&data));
    let latest = report::publish(&data, &config.reports_dir, config.report_backups)?;

    info!(
        outputs = outcome.outputs.len(),
        report = %latest.display(),
        elapsed = ?start.elapsed(),
        "all done"
    );
    Ok(())
}
