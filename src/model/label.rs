//! Health label categories and per-region label assignments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wire/string form of the absent label.
pub const UNLABELED: &str = "unlabeled";

/// A crop-health category a region can be labeled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLabel {
    Good,
    Moderate,
    Bad,
}

impl HealthLabel {
    /// All categories in hotkey order (`1`, `2`, `3`).
    pub fn all() -> &'static [HealthLabel] {
        &[HealthLabel::Good, HealthLabel::Moderate, HealthLabel::Bad]
    }

    /// Category bound to the given 0-based hotkey slot.
    pub fn from_index(index: usize) -> Option<HealthLabel> {
        Self::all().get(index).copied()
    }

    /// Lowercase tag used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLabel::Good => "good",
            HealthLabel::Moderate => "moderate",
            HealthLabel::Bad => "bad",
        }
    }

    /// Display name for toolbars.
    pub fn name(&self) -> &'static str {
        match self {
            HealthLabel::Good => "Good",
            HealthLabel::Moderate => "Moderate",
            HealthLabel::Bad => "Bad",
        }
    }

    /// Overlay fill colour (RGBA, translucent).
    pub fn fill_color(&self) -> [u8; 4] {
        match self {
            HealthLabel::Good => [120, 255, 154, 115],
            HealthLabel::Moderate => [255, 179, 71, 115],
            HealthLabel::Bad => [255, 99, 99, 115],
        }
    }
}

impl fmt::Display for HealthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown label tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown label '{0}'")]
pub struct UnknownLabel(pub String);

impl FromStr for HealthLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "good" => Ok(HealthLabel::Good),
            "moderate" => Ok(HealthLabel::Moderate),
            "bad" => Ok(HealthLabel::Bad),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

/// The label of a region as seen by history and persistence:
/// either a category or unlabeled.
///
/// Inside the label store unlabeled is never stored; it is the absence of an
/// entry. This type only exists at the edges (history entries, save requests).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Label {
    #[default]
    Unlabeled,
    Health(HealthLabel),
}

impl Label {
    pub fn health(&self) -> Option<HealthLabel> {
        match self {
            Label::Unlabeled => None,
            Label::Health(h) => Some(*h),
        }
    }

    pub fn is_unlabeled(&self) -> bool {
        matches!(self, Label::Unlabeled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Unlabeled => UNLABELED,
            Label::Health(h) => h.as_str(),
        }
    }
}

impl From<HealthLabel> for Label {
    fn from(label: HealthLabel) -> Self {
        Label::Health(label)
    }
}

impl From<Option<HealthLabel>> for Label {
    fn from(label: Option<HealthLabel>) -> Self {
        label.map_or(Label::Unlabeled, Label::Health)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(UNLABELED) {
            Ok(Label::Unlabeled)
        } else {
            s.parse().map(Label::Health)
        }
    }
}

impl Serialize for Label {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A stored label assignment for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelAssignment {
    pub label: HealthLabel,
    /// Milliseconds since the Unix epoch when the assignment was written locally.
    #[serde(default)]
    pub ts: u64,
    #[serde(default)]
    pub user: String,
}

impl LabelAssignment {
    pub fn new(label: HealthLabel, stamp: &Stamp) -> Self {
        Self {
            label,
            ts: stamp.ts,
            user: stamp.user.clone(),
        }
    }
}

/// Who wrote a label and when. Passed into edits so the history reducer
/// stays free of clock access.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stamp {
    pub ts: u64,
    pub user: String,
}

impl Stamp {
    pub fn new(ts: u64, user: impl Into<String>) -> Self {
        Self {
            ts,
            user: user.into(),
        }
    }

    /// Stamp for `user` at the current wall-clock time.
    pub fn now(user: impl Into<String>) -> Self {
        let ts = web_time::SystemTime::now()
            .duration_since(web_time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self::new(ts, user)
    }
}
