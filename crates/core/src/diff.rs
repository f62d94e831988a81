//! Diff status shared by the row diff view.
//!
//! Values are compared in their display form, so a missing field and an
//! empty one are the same thing.

use serde::{Deserialize, Serialize};

/// The status of one field between two adjacent rows.
///
/// - `Added`     -- empty in the previous row, set in the current one.
/// - `Removed`   -- set in the previous row, empty in the current one.
/// - `Changed`   -- set in both rows with different values.
/// - `Unchanged` -- identical display values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Added,
    Removed,
    Changed,
    Unchanged,
}

impl DiffStatus {
    /// Classify a field from its previous and current display values.
    pub fn between(previous: &str, current: &str) -> Self {
        match (previous.is_empty(), current.is_empty()) {
            _ if previous == current => Self::Unchanged,
            (true, false) => Self::Added,
            (false, true) => Self::Removed,
            _ => Self::Changed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_returns_correct_strings() {
        assert_eq!(DiffStatus::Added.as_str(), "added");
        assert_eq!(DiffStatus::Removed.as_str(), "removed");
        assert_eq!(DiffStatus::Changed.as_str(), "changed");
        assert_eq!(DiffStatus::Unchanged.as_str(), "unchanged");
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(format!("{}", DiffStatus::Added), "added");
        assert_eq!(format!("{}", DiffStatus::Changed), "changed");
    }

    #[test]
    fn between_classifies_transitions() {
        assert_eq!(DiffStatus::between("", "7"), DiffStatus::Added);
        assert_eq!(DiffStatus::between("7", ""), DiffStatus::Removed);
        assert_eq!(DiffStatus::between("7", "8"), DiffStatus::Changed);
        assert_eq!(DiffStatus::between("7", "7"), DiffStatus::Unchanged);
        assert_eq!(DiffStatus::between("", ""), DiffStatus::Unchanged);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&DiffStatus::Changed).unwrap();
        assert_eq!(json, "\"changed\"");
    }
}
