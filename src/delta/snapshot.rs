use serde::{Deserialize, Deserializer, Serialize};

use crate::normalize::FamilyKind;

/// One count per family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyCounts {
    #[serde(default)]
    pub consolidated: u64,
    #[serde(default)]
    pub individual: u64,
}

impl FamilyCounts {
    pub fn get(&self, family: FamilyKind) -> u64 {
        match family {
            FamilyKind::Consolidated => self.consolidated,
            FamilyKind::Individual => self.individual,
        }
    }

    pub fn set(&mut self, family: FamilyKind, value: u64) {
        match family {
            FamilyKind::Consolidated => self.consolidated = value,
            FamilyKind::Individual => self.individual = value,
        }
    }
}

/// Older history files stored a single consolidated count.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCounts {
    PerFamily(FamilyCounts),
    Consolidated(u64),
}

fn stored_counts<'de, D: Deserializer<'de>>(d: D) -> Result<FamilyCounts, D::Error> {
    Ok(match StoredCounts::deserialize(d)? {
        StoredCounts::PerFamily(counts) => counts,
        StoredCounts::Consolidated(consolidated) => FamilyCounts {
            consolidated,
            individual: 0,
        },
    })
}

/// Counts persisted by a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Local time of the run, `%Y-%m-%d %H:%M:%S`.
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, deserialize_with = "stored_counts")]
    pub total_records: FamilyCounts,
    #[serde(default, deserialize_with = "stored_counts")]
    pub unique_companies: FamilyCounts,
}
