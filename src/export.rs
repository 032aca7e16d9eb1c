//! Local label export: `{ image_id, labels }` documents.
//!
//! `labels` is the label store mapping verbatim, keyed by region id, so an
//! exported file can be imported back into an equivalent store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ExportError;
use crate::model::{LabelAssignment, RegionId};
use crate::store::LabelStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelExport {
    pub image_id: String,
    /// Sorted so exports are stable and diffable.
    pub labels: BTreeMap<RegionId, LabelAssignment>,
}

impl LabelExport {
    pub fn new(image_id: impl Into<String>, store: &LabelStore) -> Self {
        Self {
            image_id: image_id.into(),
            labels: store.sorted(),
        }
    }

    /// Download filename: `{image_id}_labels.json`.
    pub fn filename(&self) -> String {
        export_filename(&self.image_id)
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rebuild the label store, checking the document belongs to `image_id`.
    pub fn into_store(self, image_id: &str) -> Result<LabelStore, ExportError> {
        if self.image_id != image_id {
            return Err(ExportError::ImageMismatch {
                expected: image_id.to_string(),
                found: self.image_id,
            });
        }
        Ok(LabelStore::from_assignments(self.labels))
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn write_to(&self, path: &std::path::Path) -> Result<(), ExportError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Exported {} labels to {:?}", self.labels.len(), path);
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn read_from(path: &std::path::Path) -> Result<Self, ExportError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

pub fn export_filename(image_id: &str) -> String {
    format!("{}_labels.json", image_id)
}
