//! Run-over-run change tracking against the persisted `last_run` snapshot.

pub mod snapshot;

pub use snapshot::{FamilyCounts, RunSnapshot};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::normalize::FamilyKind;

/// Key of the snapshot inside the history file.
pub const LAST_RUN_KEY: &str = "last_run";

/// Change figures for one family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FamilyDelta {
    pub total_records: u64,
    pub unique_entities: u64,
    /// `total_records` minus the previous run's; negative when upstream
    /// retracted rows.
    pub new_records: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunDelta {
    pub timestamp: String,
    pub consolidated: FamilyDelta,
    pub individual: FamilyDelta,
}

impl RunDelta {
    pub fn family(&self, family: FamilyKind) -> &FamilyDelta {
        match family {
            FamilyKind::Consolidated => &self.consolidated,
            FamilyKind::Individual => &self.individual,
        }
    }
}

/// Compare `current` against `previous` (zeros on a first run).
pub fn compute_delta(previous: &RunSnapshot, current: &RunSnapshot) -> RunDelta {
    let family = |kind: FamilyKind| {
        let total = current.total_records.get(kind);
        FamilyDelta {
            total_records: total,
            unique_entities: current.unique_companies.get(kind),
            new_records: total as i64 - previous.total_records.get(kind) as i64,
        }
    };
    RunDelta {
        timestamp: current.timestamp.clone(),
        consolidated: family(FamilyKind::Consolidated),
        individual: family(FamilyKind::Individual),
    }
}

/// JSON history file holding the `last_run` snapshot. Other top-level keys
/// are carried through untouched.
pub struct DeltaTracker {
    path: PathBuf,
}

impl DeltaTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The previous snapshot, or `None` when there is none or it is unreadable.
    pub fn previous(&self) -> Option<RunSnapshot> {
        self.last_run(&self.load_history())
    }

    /// Compute the delta against the stored snapshot, then replace it with
    /// `current`.
    pub fn record(&self, current: &RunSnapshot) -> Result<RunDelta> {
        let mut history = self.load_history();
        let previous = self.last_run(&history).unwrap_or_default();

        let delta = compute_delta(&previous, current);
        for kind in FamilyKind::ALL {
            let d = delta.family(kind);
            info!(
                family = %kind,
                total = d.total_records,
                previous = previous.total_records.get(kind),
                new = d.new_records,
                unique = d.unique_entities,
                "run delta"
            );
        }

        history.insert(
            LAST_RUN_KEY.to_string(),
            serde_json::to_value(current).context("serializing run snapshot")?,
        );
        self.save_history(&history)?;
        Ok(delta)
    }

    fn last_run(&self, history: &Map<String, Value>) -> Option<RunSnapshot> {
        let value = history.get(LAST_RUN_KEY)?;
        match serde_json::from_value(value.clone()) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt last_run snapshot, treating as first run");
                None
            }
        }
    }

    fn load_history(&self) -> Map<String, Value> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no run history yet");
                return Map::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read run history");
                return Map::new();
            }
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!(path = %self.path.display(), "run history is not a JSON object, ignoring it");
                Map::new()
            }
        }
    }

    /// Write via a temp file and rename over the original.
    fn save_history(&self, history: &Map<String, Value>) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "run_history.json".to_string());
        let tmp_path = dir.join(format!(".{}.tmp", file_name));

        let mut tmp = fs::File::create(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;
        serde_json::to_writer_pretty(&mut tmp, history).context("serializing run history")?;
        tmp.write_all(b"\n")?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!("renaming {} -> {}", tmp_path.display(), self.path.display())
        })?;
        Ok(())
    }
}
