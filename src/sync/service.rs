//! The remote label store seam.
//!
//! [`LabelService`] is the boundary to the key/value labeling service. Calls
//! never block: each takes a completion callback that the implementation
//! invokes once the request finishes, which may be immediately (in-memory and
//! file stores) or later from the event loop (HTTP on the web).

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::SyncError;
use crate::model::{Label, RegionId, SessionMeta, Stamp};
use crate::store::LabelStore;

/// Callback receiving the outcome of a service request.
pub type Completion<T> = Box<dyn FnOnce(Result<T, SyncError>)>;

/// Body of `POST /save_label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveLabelRequest {
    pub image_id: String,
    #[serde(rename = "superpixel_id")]
    pub region_id: RegionId,
    pub label: Label,
    pub user: String,
}

/// Operations the annotator needs from the labeling backend.
pub trait LabelService {
    /// `GET /labels/{image_id}`
    fn fetch_labels(&self, image_id: &str, done: Completion<LabelStore>);

    /// `POST /save_label`
    fn save_label(&self, request: SaveLabelRequest, done: Completion<()>);

    /// `GET /segments/{image_id}`
    fn fetch_session(&self, image_id: &str, done: Completion<SessionMeta>);
}

// ============================================================================
// In-memory service
// ============================================================================

#[derive(Default)]
struct MemoryInner {
    sessions: HashMap<String, SessionMeta>,
    labels: HashMap<String, LabelStore>,
    saves: Vec<SaveLabelRequest>,
    fail_saves: bool,
    fail_loads: bool,
    hold_saves: bool,
    held: Vec<(SaveLabelRequest, Completion<()>)>,
}

/// A key/value label store kept in memory.
///
/// Used offline and in tests: it records every save, can be told to fail
/// loads or saves, and can hold save completions back to simulate requests
/// that are still in flight.
#[derive(Clone, Default)]
pub struct MemoryLabelService {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryLabelService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_session(&self, meta: SessionMeta) {
        self.inner
            .borrow_mut()
            .sessions
            .insert(meta.image_id.clone(), meta);
    }

    pub fn set_labels(&self, image_id: &str, store: LabelStore) {
        self.inner
            .borrow_mut()
            .labels
            .insert(image_id.to_string(), store);
    }

    /// Labels currently stored for an image.
    pub fn labels(&self, image_id: &str) -> LabelStore {
        self.inner
            .borrow()
            .labels
            .get(image_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every save request received, in arrival order.
    pub fn saves(&self) -> Vec<SaveLabelRequest> {
        self.inner.borrow().saves.clone()
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.inner.borrow_mut().fail_saves = fail;
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.inner.borrow_mut().fail_loads = fail;
    }

    /// While holding, save completions are queued instead of delivered.
    pub fn set_hold_saves(&self, hold: bool) {
        self.inner.borrow_mut().hold_saves = hold;
    }

    pub fn held_count(&self) -> usize {
        self.inner.borrow().held.len()
    }

    /// Deliver all held save completions in arrival order.
    pub fn release_held(&self) {
        let held = std::mem::take(&mut self.inner.borrow_mut().held);
        for (request, done) in held {
            let result = self.store_save(&request);
            done(result);
        }
    }

    fn store_save(&self, request: &SaveLabelRequest) -> Result<(), SyncError> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_saves {
            return Err(SyncError::Network("connection refused".to_string()));
        }
        let store = inner.labels.entry(request.image_id.clone()).or_default();
        let stamp = Stamp::new(0, request.user.clone());
        store.write(&request.region_id, request.label, &stamp);
        Ok(())
    }
}

impl LabelService for MemoryLabelService {
    fn fetch_labels(&self, image_id: &str, done: Completion<LabelStore>) {
        let result = {
            let inner = self.inner.borrow();
            if inner.fail_loads {
                Err(SyncError::Network("connection refused".to_string()))
            } else {
                Ok(inner.labels.get(image_id).cloned().unwrap_or_default())
            }
        };
        done(result);
    }

    fn save_label(&self, request: SaveLabelRequest, done: Completion<()>) {
        let hold = {
            let mut inner = self.inner.borrow_mut();
            inner.saves.push(request.clone());
            inner.hold_saves
        };
        if hold {
            self.inner.borrow_mut().held.push((request, done));
            return;
        }
        let result = self.store_save(&request);
        done(result);
    }

    fn fetch_session(&self, image_id: &str, done: Completion<SessionMeta>) {
        let result = self
            .inner
            .borrow()
            .sessions
            .get(image_id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("session '{image_id}'")));
        done(result);
    }
}
