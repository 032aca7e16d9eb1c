//! Directory-backed label service for the native driver.
//!
//! Layout under the data directory:
//!
//! ```text
//! segments/{image_id}_segments.json   session metadata
//! labels/{image_id}_labels.json       region id -> label assignment
//! ```
//!
//! Requests complete synchronously.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::service::{Completion, LabelService, SaveLabelRequest};
use crate::error::SyncError;
use crate::model::{LabelAssignment, SessionMeta, Stamp};
use crate::store::LabelStore;

#[derive(Debug, Clone)]
pub struct FileLabelService {
    root: PathBuf,
}

impl FileLabelService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn labels_path(&self, image_id: &str) -> PathBuf {
        self.root
            .join("labels")
            .join(format!("{}_labels.json", image_id))
    }

    pub fn segments_path(&self, image_id: &str) -> PathBuf {
        self.root
            .join("segments")
            .join(format!("{}_segments.json", image_id))
    }

    /// Store session metadata so it can later be opened by id.
    pub fn write_session(&self, meta: &SessionMeta) -> Result<(), SyncError> {
        let path = self.segments_path(&meta.image_id);
        write_json(&path, &serde_json::to_string_pretty(meta)?)
    }

    fn read_labels(&self, image_id: &str) -> Result<LabelStore, SyncError> {
        let path = self.labels_path(image_id);
        if !path.exists() {
            return Ok(LabelStore::new());
        }
        let json = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Update one entry of the label file. Fields this crate does not model
    /// (`patch_path`, `bbox` written by the segmentation server) are kept.
    fn write_label(&self, request: &SaveLabelRequest) -> Result<(), SyncError> {
        let path = self.labels_path(&request.image_id);
        let mut entries: Map<String, Value> = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            Map::new()
        };

        let key = request.region_id.to_string();
        match request.label.health() {
            Some(label) => {
                let stamp = Stamp::now(request.user.clone());
                let assignment = serde_json::to_value(LabelAssignment::new(label, &stamp))?;
                let entry = entries
                    .entry(key)
                    .or_insert_with(|| Value::Object(Map::new()));
                match (entry, assignment) {
                    (Value::Object(fields), Value::Object(update)) => fields.extend(update),
                    (entry, update) => *entry = update,
                }
            }
            None => {
                entries.remove(&key);
            }
        }

        write_json(&path, &serde_json::to_string_pretty(&entries)?)
    }

    fn read_session(&self, image_id: &str) -> Result<SessionMeta, SyncError> {
        let path = self.segments_path(image_id);
        if !path.exists() {
            return Err(SyncError::NotFound(format!("session '{}'", image_id)));
        }
        let json = fs::read_to_string(&path)?;
        Ok(SessionMeta::from_json(&json)?)
    }
}

fn write_json(path: &Path, json: &str) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;
    Ok(())
}

impl LabelService for FileLabelService {
    fn fetch_labels(&self, image_id: &str, done: Completion<LabelStore>) {
        done(self.read_labels(image_id));
    }

    fn save_label(&self, request: SaveLabelRequest, done: Completion<()>) {
        let result = self.write_label(&request);
        if let Err(e) = &result {
            log::error!("Failed to write label file for '{}': {}", request.image_id, e);
        }
        done(result);
    }

    fn fetch_session(&self, image_id: &str, done: Completion<SessionMeta>) {
        done(self.read_session(image_id));
    }
}
