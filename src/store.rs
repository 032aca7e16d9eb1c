//! In-memory label store: the local source of truth for region labels.
//!
//! Unlabeled regions have no entry. Mutation is crate-private and only the
//! history reducer in [`crate::undo`] performs it, so every visible change has
//! a matching history entry.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::model::{HealthLabel, Label, LabelAssignment, RegionId, Stamp};

/// Mapping region id → current label assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelStore {
    entries: HashMap<RegionId, LabelAssignment>,
}

impl LabelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from assignments fetched remotely or imported from a file.
    pub fn from_assignments(entries: impl IntoIterator<Item = (RegionId, LabelAssignment)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, id: &RegionId) -> Option<&LabelAssignment> {
        self.entries.get(id)
    }

    /// Current label of a region, `Unlabeled` when absent.
    pub fn label_of(&self, id: &RegionId) -> Label {
        self.entries.get(id).map(|a| a.label).into()
    }

    pub(crate) fn set(&mut self, id: RegionId, label: HealthLabel, stamp: &Stamp) {
        self.entries.insert(id, LabelAssignment::new(label, stamp));
    }

    pub(crate) fn clear(&mut self, id: &RegionId) -> Option<LabelAssignment> {
        self.entries.remove(id)
    }

    /// Write `label` for `id`: set for a category, remove for unlabeled.
    pub(crate) fn write(&mut self, id: &RegionId, label: Label, stamp: &Stamp) {
        match label {
            Label::Health(h) => self.set(id.clone(), h, stamp),
            Label::Unlabeled => {
                self.clear(id);
            }
        }
    }

    /// Drop entries whose region is not accepted by `keep`.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&RegionId) -> bool) {
        self.entries.retain(|id, _| keep(id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegionId, &LabelAssignment)> {
        self.entries.iter()
    }

    /// Entries ordered by region id, for stable output.
    pub fn sorted(&self) -> BTreeMap<RegionId, LabelAssignment> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Compare only the labels, ignoring timestamps and users.
    pub fn same_labels(&self, other: &LabelStore) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(id, a)| other.entries.get(id).is_some_and(|b| b.label == a.label))
    }

    /// Per-category counts for a session with `total_regions` regions.
    pub fn counts(&self, total_regions: usize) -> LabelCounts {
        let mut counts = LabelCounts {
            total: total_regions,
            ..LabelCounts::default()
        };
        for assignment in self.entries.values() {
            match assignment.label {
                HealthLabel::Good => counts.good += 1,
                HealthLabel::Moderate => counts.moderate += 1,
                HealthLabel::Bad => counts.bad += 1,
            }
        }
        counts.unlabeled = total_regions.saturating_sub(counts.labeled());
        counts
    }
}

/// Aggregated label counts for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    pub good: usize,
    pub moderate: usize,
    pub bad: usize,
    pub unlabeled: usize,
    pub total: usize,
}

impl LabelCounts {
    pub fn get(&self, label: HealthLabel) -> usize {
        match label {
            HealthLabel::Good => self.good,
            HealthLabel::Moderate => self.moderate,
            HealthLabel::Bad => self.bad,
        }
    }

    pub fn labeled(&self) -> usize {
        self.good + self.moderate + self.bad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp() -> Stamp {
        Stamp::new(1, "tester")
    }

    #[test]
    fn test_absent_is_unlabeled() {
        let store = LabelStore::new();
        assert_eq!(store.label_of(&"a".into()), Label::Unlabeled);
    }

    #[test]
    fn test_write_unlabeled_removes_entry() {
        let mut store = LabelStore::new();
        store.write(&"a".into(), Label::Health(HealthLabel::Good), &stamp());
        assert_eq!(store.len(), 1);
        store.write(&"a".into(), Label::Unlabeled, &stamp());
        assert!(store.is_empty());
    }

    #[test]
    fn test_counts_sum_to_total() {
        let mut store = LabelStore::new();
        store.set("a".into(), HealthLabel::Good, &stamp());
        store.set("b".into(), HealthLabel::Bad, &stamp());
        store.set("c".into(), HealthLabel::Bad, &stamp());

        let counts = store.counts(10);
        assert_eq!(counts.good, 1);
        assert_eq!(counts.moderate, 0);
        assert_eq!(counts.bad, 2);
        assert_eq!(counts.unlabeled, 7);
        assert_eq!(counts.labeled() + counts.unlabeled, counts.total);
    }

    #[test]
    fn test_same_labels_ignores_stamps() {
        let mut a = LabelStore::new();
        let mut b = LabelStore::new();
        a.set("r".into(), HealthLabel::Moderate, &Stamp::new(1, "x"));
        b.set("r".into(), HealthLabel::Moderate, &Stamp::new(99, "y"));
        assert!(a.same_labels(&b));
        b.set("s".into(), HealthLabel::Good, &stamp());
        assert!(!a.same_labels(&b));
    }

    #[test]
    fn test_serializes_as_plain_mapping() {
        let mut store = LabelStore::new();
        store.set("7".into(), HealthLabel::Good, &Stamp::new(5, "web_user"));
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["7"]["label"], "good");
        assert_eq!(json["7"]["ts"], 5);
    }
}
