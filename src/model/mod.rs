//! Data models for the annotator: regions, labels and session metadata.

mod label;
mod region;
mod session;

pub use label::{HealthLabel, Label, LabelAssignment, Stamp, UNLABELED, UnknownLabel};
pub use region::{MIN_POLYGON_VERTICES, Region, RegionId};
pub use session::{ImageShape, SessionMeta};
