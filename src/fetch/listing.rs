use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{info, instrument};
use url::Url;

use super::retry::{get_bytes, RetryPolicy};

static ARCHIVE_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})\.zip$").expect("archive year regex should be valid"));

/// Year encoded at the end of an archive name, e.g. `vlmo_cia_aberta_2024.zip`.
pub fn archive_year(url: &Url) -> Option<u16> {
    ARCHIVE_YEAR
        .captures(url.path())
        .and_then(|caps| caps[1].parse().ok())
}

/// All distinct `.zip` links of a directory index page, resolved against
/// `base` and ordered by archive year (links without a year first, in page
/// order).
pub fn extract_zip_links(base: &Url, html: &str) -> Vec<Url> {
    let selector =
        Selector::parse(r#"a[href$=".zip"]"#).expect("CSS selector for ZIP links should be valid");
    let doc = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links: Vec<Url> = doc
        .select(&selector)
        .filter_map(|e| e.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(|u| seen.insert(u.clone()))
        .collect();
    links.sort_by_key(archive_year);
    links
}

/// Fetch the directory index at `base` and list its ZIP archives.
#[instrument(level = "info", skip(client, policy), fields(base = %base))]
pub async fn list_archives(client: &Client, base: &Url, policy: RetryPolicy) -> Result<Vec<Url>> {
    let body = get_bytes(client, base, policy)
        .await
        .with_context(|| format!("listing archives at {}", base))?;
    let html = String::from_utf8_lossy(&body);
    let links = extract_zip_links(base, &html);
    info!(
        count = links.len(),
        first_year = ?links.first().and_then(archive_year),
        last_year = ?links.last().and_then(archive_year),
        "found zip archives"
    );
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"<html><body><h1>Index of /dados/CIA_ABERTA/DOC/VLMO/DADOS/</h1><pre>
<a href="../">../</a>
<a href="vlmo_cia_aberta_2019.zip">vlmo_cia_aberta_2019.zip</a>   05-Jan-2024 10:00  1.2M
<a href="vlmo_cia_aberta_2024.zip">vlmo_cia_aberta_2024.zip</a>   05-Oct-2024 10:00  2.2M
<a href="vlmo_cia_aberta_2018.zip">vlmo_cia_aberta_2018.zip</a>   05-Jan-2024 10:00  1.0M
<a href="/dados/CIA_ABERTA/DOC/VLMO/DADOS/vlmo_cia_aberta_2019.zip">dup</a>
<a href="META/">META/</a>
<a href="leia_me.txt">leia_me.txt</a>
</pre></body></html>"#;

    #[test]
    fn extracts_resolves_dedupes_and_orders() {
        let base = Url::parse("https://dados.cvm.gov.br/dados/CIA_ABERTA/DOC/VLMO/DADOS/").unwrap();
        let links = extract_zip_links(&base, INDEX);
        let names: Vec<_> = links
            .iter()
            .map(|u| u.path_segments().unwrap().last().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "vlmo_cia_aberta_2018.zip",
                "vlmo_cia_aberta_2019.zip",
                "vlmo_cia_aberta_2024.zip"
            ]
        );
        assert_eq!(
            links[0].as_str(),
            "https://dados.cvm.gov.br/dados/CIA_ABERTA/DOC/VLMO/DADOS/vlmo_cia_aberta_2018.zip"
        );
    }

    #[test]
    fn year_from_archive_name() {
        let url = Url::parse("https://example.org/x/vlmo_cia_aberta_2021.zip").unwrap();
        assert_eq!(archive_year(&url), Some(2021));
        let url = Url::parse("https://example.org/x/latest.zip").unwrap();
        assert_eq!(archive_year(&url), None);
    }
}
