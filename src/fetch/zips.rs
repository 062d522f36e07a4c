use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use url::Url;

use super::retry::{get_bytes, RetryPolicy};

/// Last path segment of `url`, or `download.zip` when there is none.
pub fn archive_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
        .unwrap_or("download.zip")
        .to_string()
}

/// Download the given ZIP URL and save it under `dest_dir` using the original filename.
/// Returns the full path of the saved file.
pub async fn download_zip(
    client: &Client,
    url: &Url,
    dest_dir: impl AsRef<Path>,
    policy: RetryPolicy,
) -> Result<PathBuf> {
    let dest_path = dest_dir.as_ref().join(archive_file_name(url));

    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let bytes = get_bytes(client, url, policy).await?;
    fs::write(&dest_path, &bytes)
        .await
        .with_context(|| format!("writing {}", dest_path.display()))?;

    Ok(dest_path)
}
