//! Persistence gateway: debounced, fire-and-forget label sync.
//!
//! Label writes are coalesced per region and sent once the region has been
//! quiet for the debounce delay. At most one write per region is in flight;
//! a newer value for a busy region waits until the earlier request completes,
//! so the remote always ends with the last local value. Completions arrive on
//! an inbox that the owner drains from its event loop.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;
use web_time::Instant;

use super::debounce::Debouncer;
use super::service::{LabelService, SaveLabelRequest};
use crate::error::SyncError;
use crate::model::{Label, RegionId, SessionMeta};
use crate::store::LabelStore;
use crate::undo::LabelWrite;

/// Completions posted by service callbacks.
enum InboxItem {
    Labels {
        generation: u64,
        result: Result<LabelStore, SyncError>,
    },
    Saved {
        generation: u64,
        region_id: RegionId,
        label: Label,
        result: Result<(), SyncError>,
    },
    Session {
        request: u64,
        image_id: String,
        result: Result<SessionMeta, SyncError>,
    },
}

/// What the owner needs to react to after draining the inbox.
#[derive(Debug)]
pub enum GatewayEvent {
    /// Authoritative labels for the active session arrived.
    LabelsLoaded(LabelStore),
    /// Fetching labels for the active session failed.
    LabelsFailed(SyncError),
    /// A label write for the active session failed.
    SaveFailed {
        region_id: RegionId,
        label: Label,
        error: SyncError,
    },
    /// Result of the most recent `open_session` request.
    SessionFetched {
        image_id: String,
        result: Result<SessionMeta, SyncError>,
    },
}

/// Debounced label persistence for one active session at a time.
pub struct PersistenceGateway {
    service: Rc<dyn LabelService>,
    inbox: Rc<RefCell<VecDeque<InboxItem>>>,
    pending: Debouncer<RegionId, Label>,
    in_flight: HashSet<RegionId>,
    image_id: Option<String>,
    user: String,
    /// Bumped on every session switch; stale completions are ignored.
    generation: u64,
    /// Id of the latest session fetch; older responses are ignored.
    session_request: u64,
}

impl std::fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("image_id", &self.image_id)
            .field("pending", &self.pending.len())
            .field("in_flight", &self.in_flight.len())
            .field("generation", &self.generation)
            .finish()
    }
}

impl PersistenceGateway {
    pub fn new(service: Rc<dyn LabelService>, debounce: Duration, user: impl Into<String>) -> Self {
        Self {
            service,
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            pending: Debouncer::new(debounce),
            in_flight: HashSet::new(),
            image_id: None,
            user: user.into(),
            generation: 0,
            session_request: 0,
        }
    }

    pub fn image_id(&self) -> Option<&str> {
        self.image_id.as_deref()
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Number of regions with a write waiting for its debounce window.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of regions with a write currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// When the next pending write becomes due. A region still waiting on
    /// an in-flight request may report a deadline in the past.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.next_deadline()
    }

    /// Make `image_id` the active session: cancel pending writes of the
    /// previous session, forget its in-flight requests and fetch labels.
    pub fn begin_session(&mut self, image_id: &str) {
        let cancelled = self.pending.cancel_all();
        if cancelled > 0 {
            log::info!(
                "Cancelled {} pending label writes for previous session",
                cancelled
            );
        }
        self.in_flight.clear();
        self.generation += 1;
        self.image_id = Some(image_id.to_string());
        log::info!("Session '{}' active (generation {})", image_id, self.generation);
        self.request_labels();
    }

    /// Fetch the authoritative labels for the active session.
    pub fn request_labels(&mut self) {
        let Some(image_id) = self.image_id.clone() else {
            return;
        };
        let inbox = Rc::clone(&self.inbox);
        let generation = self.generation;
        log::debug!("Fetching labels for '{}'", image_id);
        self.service.fetch_labels(
            &image_id,
            Box::new(move |result| {
                inbox
                    .borrow_mut()
                    .push_back(InboxItem::Labels { generation, result });
            }),
        );
    }

    /// Fetch session metadata for `image_id`. Only the latest request's
    /// result is reported.
    pub fn open_session(&mut self, image_id: &str) {
        self.session_request += 1;
        let request = self.session_request;
        let inbox = Rc::clone(&self.inbox);
        let id = image_id.to_string();
        log::debug!("Fetching session '{}'", image_id);
        self.service.fetch_session(
            image_id,
            Box::new(move |result| {
                inbox.borrow_mut().push_back(InboxItem::Session {
                    request,
                    image_id: id,
                    result,
                });
            }),
        );
    }

    /// Queue a label write; rearms the region's debounce timer.
    pub fn schedule(&mut self, write: LabelWrite, now: Instant) {
        if self.image_id.is_none() {
            log::warn!("Dropping label write for {}: no active session", write.region_id);
            return;
        }
        let coalesced = self.pending.schedule(write.region_id.clone(), write.label, now);
        log::trace!(
            "Debounce: {} -> {}{}",
            write.region_id,
            write.label,
            if coalesced { " (coalesced)" } else { "" }
        );
    }

    /// Send every write whose debounce window has elapsed.
    /// Returns how many requests were issued.
    pub fn flush_due(&mut self, now: Instant) -> usize {
        let in_flight = &self.in_flight;
        let due = self.pending.take_due(now, |id| in_flight.contains(id));
        self.send_all(due)
    }

    /// Send every pending write immediately (e.g. before shutdown). Regions
    /// with a write in flight keep their pending value.
    pub fn flush_all(&mut self) -> usize {
        let in_flight = &self.in_flight;
        let due = self.pending.take_all(|id| in_flight.contains(id));
        self.send_all(due)
    }

    fn send_all(&mut self, writes: Vec<(RegionId, Label)>) -> usize {
        let n = writes.len();
        for (region_id, label) in writes {
            self.send(region_id, label);
        }
        n
    }

    fn send(&mut self, region_id: RegionId, label: Label) {
        let Some(image_id) = self.image_id.clone() else {
            return;
        };
        self.in_flight.insert(region_id.clone());
        let request = SaveLabelRequest {
            image_id,
            region_id: region_id.clone(),
            label,
            user: self.user.clone(),
        };
        log::debug!("💾 Saving {} = {}", region_id, label);

        let inbox = Rc::clone(&self.inbox);
        let generation = self.generation;
        self.service.save_label(
            request,
            Box::new(move |result| {
                inbox.borrow_mut().push_back(InboxItem::Saved {
                    generation,
                    region_id,
                    label,
                    result,
                });
            }),
        );
    }

    /// Process completions, then send any writes that became due or were
    /// waiting on a finished request.
    pub fn poll(&mut self, now: Instant) -> Vec<GatewayEvent> {
        let mut events = Vec::new();
        loop {
            let item = self.inbox.borrow_mut().pop_front();
            let Some(item) = item else { break };
            if let Some(event) = self.handle(item) {
                events.push(event);
            }
        }
        self.flush_due(now);
        events
    }

    fn handle(&mut self, item: InboxItem) -> Option<GatewayEvent> {
        match item {
            InboxItem::Labels { generation, result } => {
                if generation != self.generation {
                    log::debug!("Ignoring labels for a previous session");
                    return None;
                }
                Some(match result {
                    Ok(store) => {
                        log::info!("Loaded {} labels", store.len());
                        GatewayEvent::LabelsLoaded(store)
                    }
                    Err(error) => GatewayEvent::LabelsFailed(error),
                })
            }
            InboxItem::Saved {
                generation,
                region_id,
                label,
                result,
            } => {
                if generation != self.generation {
                    if let Err(error) = result {
                        log::warn!(
                            "Save of {} = {} for a previous session failed: {}",
                            region_id,
                            label,
                            error
                        );
                    }
                    return None;
                }
                self.in_flight.remove(&region_id);
                match result {
                    Ok(()) => {
                        log::trace!("Saved {} = {}", region_id, label);
                        None
                    }
                    Err(error) => {
                        log::warn!("Failed to save {} = {}: {}", region_id, label, error);
                        Some(GatewayEvent::SaveFailed {
                            region_id,
                            label,
                            error,
                        })
                    }
                }
            }
            InboxItem::Session {
                request,
                image_id,
                result,
            } => {
                if request != self.session_request {
                    log::debug!("Ignoring stale session response for '{}'", image_id);
                    return None;
                }
                Some(GatewayEvent::SessionFetched { image_id, result })
            }
        }
    }
}
