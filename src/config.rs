use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::{env, fmt::Display, fs, path::PathBuf, str::FromStr, time::Duration};

use crate::fetch::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://dados.cvm.gov.br/dados/CIA_ABERTA/DOC/VLMO/DADOS/";

/// Environment variable naming an optional YAML config file.
pub const CONFIG_FILE_VAR: &str = "CVM_CONFIG";

/// Run configuration: defaults, then an optional YAML file, then `CVM_*`
/// environment overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub base_url: String,
    pub zips_dir: PathBuf,
    pub datasets_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub max_workers: usize,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub consolidated_only: bool,
    pub write_parquet: bool,
    pub accept_invalid_certs: bool,
    pub report_backups: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            zips_dir: PathBuf::from("zips"),
            datasets_dir: PathBuf::from("datasets"),
            reports_dir: PathBuf::from("reports"),
            max_workers: 4,
            max_retries: 3,
            initial_backoff_ms: 1_000,
            consolidated_only: false,
            write_parquet: true,
            accept_invalid_certs: false,
            report_backups: 10,
        }
    }
}

fn override_from<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) -> Result<()>
where
    T: FromStr,
    T::Err: Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {}={:?}: {}", key, raw, e))?;
    }
    Ok(())
}

impl Config {
    /// Load from the process environment.
    pub fn load() -> Result<Self> {
        let yaml = match env::var(CONFIG_FILE_VAR) {
            Ok(path) => Some(
                fs::read_to_string(&path).with_context(|| format!("reading config {}", path))?,
            ),
            Err(_) => None,
        };
        Self::from_sources(yaml.as_deref(), |key| env::var(key).ok())
    }

    /// Build from optional YAML text and an environment lookup.
    pub fn from_sources(
        yaml: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut cfg = match yaml {
            Some(text) => serde_yaml::from_str(text).context("parsing YAML config")?,
            None => Config::default(),
        };

        override_from(&lookup, "CVM_BASE_URL", &mut cfg.base_url)?;
        override_from(&lookup, "CVM_ZIPS_DIR", &mut cfg.zips_dir)?;
        override_from(&lookup, "CVM_DATASETS_DIR", &mut cfg.datasets_dir)?;
        override_from(&lookup, "CVM_REPORTS_DIR", &mut cfg.reports_dir)?;
        override_from(&lookup, "CVM_MAX_WORKERS", &mut cfg.max_workers)?;
        override_from(&lookup, "CVM_MAX_RETRIES", &mut cfg.max_retries)?;
        override_from(&lookup, "CVM_BACKOFF_MS", &mut cfg.initial_backoff_ms)?;
        override_from(&lookup, "CVM_CONSOLIDATED_ONLY", &mut cfg.consolidated_only)?;
        override_from(&lookup, "CVM_WRITE_PARQUET", &mut cfg.write_parquet)?;
        override_from(&lookup, "CVM_ACCEPT_INVALID_CERTS", &mut cfg.accept_invalid_certs)?;
        override_from(&lookup, "CVM_REPORT_BACKUPS", &mut cfg.report_backups)?;

        if cfg.max_workers == 0 {
            return Err(anyhow!("max_workers must be at least 1"));
        }
        Ok(cfg)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
        }
    }

    /// Run history holding the `last_run` snapshot.
    pub fn history_path(&self) -> PathBuf {
        self.reports_dir.join("run_history.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_sources() {
        let cfg = Config::from_sources(None, vars(&[])).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.history_path(), PathBuf::from("reports/run_history.json"));
        assert_eq!(cfg.retry_policy().max_retries, 3);
    }

    #[test]
    fn yaml_then_env() {
        let yaml = "max_workers: 8\nconsolidated_only: true\nreports_dir: out/reports\n";
        let cfg = Config::from_sources(
            Some(yaml),
            vars(&[("CVM_MAX_WORKERS", "2"), ("CVM_WRITE_PARQUET", "false")]),
        )
        .unwrap();
        assert_eq!(cfg.max_workers, 2);
        assert!(cfg.consolidated_only);
        assert!(!cfg.write_parquet);
        assert_eq!(cfg.reports_dir, PathBuf::from("out/reports"));
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_sources(None, vars(&[("CVM_MAX_WORKERS", "many")])).is_err());
        assert!(Config::from_sources(None, vars(&[("CVM_MAX_WORKERS", "0")])).is_err());
        assert!(Config::from_sources(Some("max_wrokers: 3\n"), vars(&[])).is_err());
    }
}
