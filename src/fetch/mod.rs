//! Retrieval: discover the CVM archives, download them with a bounded
//! worker pool and hand their CSV entries over as [`SourceFile`]s.

pub mod listing;
pub mod retry;
pub mod zips;

pub use listing::list_archives;
pub use retry::RetryPolicy;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use std::{path::Path, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, Semaphore},
    time::Instant,
};
use tracing::{error, info, warn};
use url::Url;

use crate::{config::Config, extract, normalize::SourceFile};

/// An archive that could not be downloaded or read.
#[derive(Debug, Clone)]
pub struct ArchiveFailure {
    pub url: Url,
    pub error: String,
}

/// Everything retrieval produced, in listing order.
#[derive(Debug, Default)]
pub struct Retrieval {
    pub files: Vec<SourceFile>,
    /// Archives that were downloaded and read.
    pub archives: usize,
    pub failures: Vec<ArchiveFailure>,
}

/// HTTP client for the CVM portal.
pub fn build_client(config: &Config) -> Result<Client> {
    if config.accept_invalid_certs {
        warn!("TLS certificate verification disabled");
    }
    Client::builder()
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .gzip(true)
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("building HTTP client")
}

async fn fetch_archive(
    client: &Client,
    url: &Url,
    zips_dir: &Path,
    policy: RetryPolicy,
) -> Result<Vec<SourceFile>> {
    let zip_path = zips::download_zip(client, url, zips_dir, policy).await?;

    let files = tokio::task::spawn_blocking({
        let zip_path = zip_path.clone();
        move || extract::read_csv_entries(&zip_path)
    })
    .await
    .context("extraction task panicked")?;

    if let Err(e) = tokio::fs::remove_file(&zip_path).await {
        warn!(path = %zip_path.display(), error = %e, "failed to delete zip");
    }
    files
}

/// Download and extract every archive with at most `config.max_workers` in
/// flight. Individual failures are logged and recorded; only a run that
/// yields no CSV at all is an error.
pub async fn retrieve_archives(client: &Client, urls: Vec<Url>, config: &Config) -> Result<Retrieval> {
    tokio::fs::create_dir_all(&config.zips_dir)
        .await
        .with_context(|| format!("creating {}", config.zips_dir.display()))?;

    let policy = config.retry_policy();
    let (tx, mut rx) = mpsc::channel::<(usize, Url, Result<Vec<SourceFile>>)>(100);
    let sem = Arc::new(Semaphore::new(config.max_workers.max(1)));
    let mut handles = Vec::with_capacity(urls.len());

    for (index, url) in urls.into_iter().enumerate() {
        let client = client.clone();
        let zips_dir = config.zips_dir.clone();
        let tx = tx.clone();
        let sem = sem.clone();

        handles.push(tokio::spawn(async move {
            let _permit = match sem.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    let _ = tx.send((index, url, Err(e.into()))).await;
                    return;
                }
            };
            info!(%url, "downloading");
            let start = Instant::now();
            let result = fetch_archive(&client, &url, &zips_dir, policy).await;
            if result.is_ok() {
                info!(%url, elapsed = ?start.elapsed(), "downloaded and extracted");
            }
            let _ = tx.send((index, url, result)).await;
        }));
    }
    // drop the original sender so `rx.recv()` ends once every task is done
    drop(tx);

    let mut done: Vec<(usize, Vec<SourceFile>)> = Vec::new();
    let mut retrieval = Retrieval::default();
    while let Some((index, url, result)) = rx.recv().await {
        match result {
            Ok(files) => {
                info!(%url, csv_files = files.len(), "archive ready");
                done.push((index, files));
            }
            Err(e) => {
                error!(%url, error = %e, "archive failed");
                retrieval.failures.push(ArchiveFailure {
                    url,
                    error: format!("{:#}", e),
                });
            }
        }
    }

    for handle in futures::future::join_all(handles).await {
        if let Err(e) = handle {
            error!(error = %e, "download task panicked");
        }
    }

    // completion order is arbitrary; concatenate in listing order
    done.sort_by_key(|(index, _)| *index);
    retrieval.archives = done.len();
    retrieval.files = done.into_iter().flat_map(|(_, files)| files).collect();

    if retrieval.files.is_empty() {
        bail!("no CSV files were successfully downloaded and extracted");
    }
    info!(
        archives = retrieval.archives,
        files = retrieval.files.len(),
        failures = retrieval.failures.len(),
        "retrieval finished"
    );
    Ok(retrieval)
}
