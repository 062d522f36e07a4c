use serde::{Deserialize, Serialize};
use std::fmt;

/// Substring (case-insensitive) that marks a consolidated extract in a file name.
pub const CONSOLIDATED_MARKER: &str = "_con_";

/// Schema shape of a source file, and of every record read from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FamilyKind {
    Consolidated,
    Individual,
}

impl FamilyKind {
    pub const ALL: [FamilyKind; 2] = [FamilyKind::Consolidated, FamilyKind::Individual];

    pub fn as_str(&self) -> &'static str {
        match self {
            FamilyKind::Consolidated => "Consolidated",
            FamilyKind::Individual => "Individual",
        }
    }

    /// Lower-case key used in the run history file.
    pub fn key(&self) -> &'static str {
        match self {
            FamilyKind::Consolidated => "consolidated",
            FamilyKind::Individual => "individual",
        }
    }

    /// Classify a source file by its identifier (path or entry name).
    pub fn classify(identifier: &str) -> Self {
        if identifier.to_lowercase().contains(CONSOLIDATED_MARKER) {
            FamilyKind::Consolidated
        } else {
            FamilyKind::Individual
        }
    }
}

impl fmt::Display for FamilyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_marker_case_insensitively() {
        assert_eq!(
            FamilyKind::classify("vlmo_cia_aberta_con_2024.csv"),
            FamilyKind::Consolidated
        );
        assert_eq!(
            FamilyKind::classify("/tmp/x/VLMO_CIA_ABERTA_CON_2019.CSV"),
            FamilyKind::Consolidated
        );
        assert_eq!(
            FamilyKind::classify("vlmo_cia_aberta_2024.csv"),
            FamilyKind::Individual
        );
        // "con" without the surrounding underscores is not the marker
        assert_eq!(
            FamilyKind::classify("vlmo_consolidado2024.csv"),
            FamilyKind::Individual
        );
    }
}
