//! The annotator: one labeling session and everything attached to it.
//!
//! [`Annotator`] composes the edit state (labels + history), the viewport,
//! the minimap mapper and the persistence gateway. All user input goes
//! through [`Annotator::dispatch`], which always reads the current state.
//! The host drives background work by calling [`Annotator::poll`] from its
//! event loop (a timer on the web, the command loop on native).

use serde::Serialize;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use web_time::Instant;

use crate::config::AppConfig;
use crate::error::{ExportError, SessionError, SyncError};
use crate::export::LabelExport;
use crate::geometry::{Point, Size};
use crate::interaction::{self, Command, InputEvent, ToolMode};
use crate::keybindings::KeyBindings;
use crate::minimap::{MinimapMapper, MinimapView};
use crate::model::{RegionId, SessionMeta, Stamp};
use crate::overlay::{self, OverlayPolygon};
use crate::store::{LabelCounts, LabelStore};
use crate::sync::{GatewayEvent, LabelService, PersistenceGateway};
use crate::undo::{EditAction, EditState, UndoStack};
use crate::viewport::{Viewport, ViewportController, ViewportListener, ViewportTransform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A message the host should show the user once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

/// The active session, if any.
#[derive(Debug)]
struct Session {
    meta: SessionMeta,
    regions: HashMap<RegionId, usize>,
    minimap: MinimapMapper,
    /// Remote labels have been merged at least once.
    labels_loaded: bool,
}

#[derive(Debug)]
pub struct Annotator {
    user: String,
    bindings: KeyBindings,
    minimap_size: f32,

    session: Option<Session>,
    edit: EditState,
    viewport: Viewport,
    gateway: PersistenceGateway,

    mode: ToolMode,
    hovered: Option<RegionId>,
    notifications: Vec<Notification>,
}

impl Annotator {
    pub fn new(config: &AppConfig, service: Rc<dyn LabelService>) -> Self {
        Self {
            user: config.server.user.clone(),
            bindings: config.keybindings.clone(),
            minimap_size: config.minimap.size,
            session: None,
            edit: EditState::new(),
            viewport: Viewport::new(config.viewport),
            gateway: PersistenceGateway::new(service, config.sync.debounce(), config.server.user.clone()),
            mode: ToolMode::default(),
            hovered: None,
            notifications: Vec::new(),
        }
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Make `meta` the active session. Labels, history, hover and the view
    /// are replaced together; pending saves of the previous session are
    /// cancelled and its labels are fetched.
    pub fn load_session(&mut self, meta: SessionMeta) -> Result<(), SessionError> {
        meta.validate()?;

        let image = meta.image_size();
        let session = Session {
            regions: meta.region_index(),
            minimap: MinimapMapper::new(self.minimap_size, image),
            labels_loaded: false,
            meta,
        };
        log::info!(
            "Loading session '{}' ({} regions, {}x{})",
            session.meta.image_id,
            session.meta.region_count(),
            image.width,
            image.height
        );

        self.edit = EditState::new();
        self.hovered = None;
        self.gateway.begin_session(&session.meta.image_id);
        self.session = Some(session);
        self.viewport.set_image(image);
        Ok(())
    }

    /// Fetch a previously segmented session by id. The result is applied on
    /// a later [`poll`](Self::poll); unknown ids only raise a notification.
    pub fn open_session(&mut self, image_id: &str) {
        let image_id = image_id.trim();
        if image_id.is_empty() {
            self.notify(Severity::Warning, "Enter a session id to open".to_string());
            return;
        }
        self.gateway.open_session(image_id);
    }

    /// Re-fetch labels for the active session; local history is replayed on
    /// top of the result.
    pub fn reload_labels(&mut self) {
        if self.session.is_none() {
            self.notify(Severity::Warning, "No session loaded".to_string());
            return;
        }
        self.gateway.request_labels();
    }

    pub fn session(&self) -> Option<&SessionMeta> {
        self.session.as_ref().map(|s| &s.meta)
    }

    pub fn image_id(&self) -> Option<&str> {
        self.session().map(|m| m.image_id.as_str())
    }

    /// Whether the remote label set has been merged since the session loaded.
    pub fn labels_loaded(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.labels_loaded)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn store(&self) -> &LabelStore {
        self.edit.store()
    }

    pub fn history(&self) -> &UndoStack {
        self.edit.history()
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn hovered(&self) -> Option<&RegionId> {
        self.hovered.as_ref()
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn transform(&self) -> ViewportTransform {
        self.viewport.transform()
    }

    pub fn gateway(&self) -> &PersistenceGateway {
        &self.gateway
    }

    /// Register a callback run synchronously after every view change.
    pub fn subscribe_viewport(&mut self, listener: ViewportListener) {
        self.viewport.subscribe(listener);
    }

    /// Update the size of the on-screen image container.
    pub fn set_container(&mut self, size: Size) {
        self.viewport.set_container(size);
    }

    pub fn counts(&self) -> LabelCounts {
        let total = self.session().map_or(0, |m| m.region_count());
        self.edit.store().counts(total)
    }

    pub fn minimap_view(&self) -> Option<MinimapView> {
        let session = self.session.as_ref()?;
        Some(MinimapView::compute(
            &session.minimap,
            &self.viewport.transform(),
            self.viewport.container_size(),
        ))
    }

    pub fn overlay(&self) -> Vec<OverlayPolygon> {
        match self.session() {
            Some(meta) => overlay::build_overlay(meta, self.edit.store(), self.hovered.as_ref()),
            None => Vec::new(),
        }
    }

    pub fn overlay_svg(&self) -> String {
        let size = self.session().map(|m| m.overlay_size()).unwrap_or_default();
        overlay::to_svg(&self.overlay(), size)
    }

    /// Current labels as an export document.
    pub fn export(&self) -> Result<LabelExport, ExportError> {
        let image_id = self.image_id().ok_or(ExportError::NoSession)?;
        Ok(LabelExport::new(image_id, self.edit.store()))
    }

    /// Messages raised since the last call, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn notify(&mut self, severity: Severity, message: String) {
        match severity {
            Severity::Info => log::info!("{}", message),
            Severity::Warning => log::warn!("{}", message),
            Severity::Error => log::error!("{}", message),
        }
        self.notifications.push(Notification { severity, message });
    }

    // ========================================================================
    // Input
    // ========================================================================

    pub fn handle_input(&mut self, event: InputEvent) {
        self.handle_input_at(event, Instant::now());
    }

    pub fn handle_input_at(&mut self, event: InputEvent, now: Instant) {
        let command = interaction::interpret(
            event,
            self.mode,
            self.hovered.as_ref(),
            &self.bindings,
            self.viewport.settings().zoom_factor,
        );
        if let Some(command) = command {
            self.dispatch_at(command, now);
        }
    }

    pub fn dispatch(&mut self, command: Command) {
        self.dispatch_at(command, Instant::now());
    }

    /// Execute one command against the current state.
    pub fn dispatch_at(&mut self, command: Command, now: Instant) {
        match command {
            Command::Edit(action) => self.edit(action, now),
            Command::SetTool(mode) => {
                if mode != self.mode {
                    log::debug!("Tool mode: {}", mode);
                    self.mode = mode;
                }
            }
            Command::Hover(target) => self.set_hover(target),
            Command::ClickAt(p) => {
                if let Some(id) = self.region_at_viewport(p) {
                    let action = self.mode.action_for(id);
                    self.edit(action, now);
                }
            }
            Command::HoverAt(p) => {
                let target = self.region_at_viewport(p);
                self.set_hover(target);
            }
            Command::ZoomIn => self.viewport.zoom_in(),
            Command::ZoomOut => self.viewport.zoom_out(),
            Command::ResetView => self.viewport.reset(),
            Command::PanBy { dx, dy } => self.viewport.pan_by(dx, dy),
            Command::ZoomAt { anchor, factor } => self.viewport.zoom_at(anchor, factor),
            Command::SetTransform { x, y, scale } => self.viewport.set_transform(x, y, scale),
            Command::CenterOn(p) => self.viewport.center_on(p),
            Command::CenterOnMinimap(p) => {
                let target = self
                    .session
                    .as_ref()
                    .and_then(|s| s.minimap.minimap_to_image(p));
                if let Some(point) = target {
                    self.viewport.center_on(point);
                }
            }
        }
    }

    fn edit(&mut self, action: EditAction, now: Instant) {
        let Some(session) = &self.session else {
            log::warn!("Ignoring {:?}: no session loaded", action);
            return;
        };
        if let EditAction::Apply { region_id, .. } | EditAction::Erase { region_id } = &action {
            if !session.regions.contains_key(region_id) {
                log::warn!("Ignoring edit for unknown region {}", region_id);
                return;
            }
        }

        let stamp = Stamp::now(self.user.clone());
        if let Some(write) = self.edit.apply(action, &stamp) {
            self.gateway.schedule(write, now);
        }
    }

    fn set_hover(&mut self, target: Option<RegionId>) {
        let target = target.filter(|id| {
            self.session
                .as_ref()
                .is_some_and(|s| s.regions.contains_key(id))
        });
        if target != self.hovered {
            log::trace!("Hover: {:?}", target);
            self.hovered = target;
        }
    }

    /// Hit test a viewport-space point.
    pub fn region_at_viewport(&self, p: Point) -> Option<RegionId> {
        let meta = self.session()?;
        let image_point = self.viewport.transform().viewport_to_image(p);
        meta.region_at(meta.image_to_overlay(image_point))
            .map(|r| r.id.clone())
    }

    // ========================================================================
    // Background work
    // ========================================================================

    pub fn poll(&mut self) {
        self.poll_at(Instant::now());
    }

    /// Apply finished requests and send writes whose debounce elapsed.
    pub fn poll_at(&mut self, now: Instant) {
        for event in self.gateway.poll(now) {
            self.on_gateway_event(event);
        }
    }

    /// Time until [`poll_at`](Self::poll_at) has a write to send, zero when
    /// one is already due. `None` when nothing is pending.
    pub fn next_poll_in(&self, now: Instant) -> Option<Duration> {
        self.gateway
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Send all pending writes now, e.g. before exit.
    pub fn flush(&mut self) -> usize {
        self.gateway.flush_all()
    }

    fn on_gateway_event(&mut self, event: GatewayEvent) {
        match event {
            GatewayEvent::LabelsLoaded(remote) => {
                let Some(session) = &mut self.session else {
                    return;
                };
                let first = !std::mem::replace(&mut session.labels_loaded, true);
                let regions = &session.regions;
                let known = |id: &RegionId| regions.contains_key(id);
                let stamp = Stamp::now(self.user.clone());
                if first {
                    self.edit.rebase(remote, known, &stamp);
                } else {
                    log::info!("Reloaded {} labels", remote.len());
                    self.edit.refresh(remote, known, &stamp);
                }
            }
            GatewayEvent::LabelsFailed(error) => {
                let first = match &mut self.session {
                    Some(session) => !std::mem::replace(&mut session.labels_loaded, true),
                    None => return,
                };
                let message = if first {
                    format!("Could not load saved labels, starting empty: {}", error)
                } else {
                    format!("Could not reload labels, keeping local labels: {}", error)
                };
                self.notify(Severity::Warning, message);
            }
            GatewayEvent::SaveFailed {
                region_id,
                label,
                error,
            } => {
                self.notify(
                    Severity::Error,
                    format!(
                        "Failed to save label '{}' for region {}: {}",
                        label, region_id, error
                    ),
                );
            }
            GatewayEvent::SessionFetched { image_id, result } => match result {
                Ok(meta) => {
                    if let Err(e) = self.load_session(meta) {
                        self.notify(Severity::Error, format!("Session '{}' is invalid: {}", image_id, e));
                    }
                }
                Err(SyncError::NotFound(_)) => {
                    self.notify(Severity::Warning, format!("Session '{}' not found", image_id));
                }
                Err(e) => {
                    self.notify(Severity::Error, format!("Could not open session '{}': {}", image_id, e));
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HealthLabel, ImageShape, Label, Region};
    use crate::sync::MemoryLabelService;

    fn square(id: &str, x: f32, y: f32) -> Region {
        Region::new(
            id,
            vec![
                (x, y).into(),
                (x + 10.0, y).into(),
                (x + 10.0, y + 10.0).into(),
                (x, y + 10.0).into(),
            ],
        )
    }

    fn annotator() -> (Annotator, MemoryLabelService) {
        let service = MemoryLabelService::new();
        let mut a = Annotator::new(&AppConfig::default(), Rc::new(service.clone()));
        a.set_container(Size::new(100.0, 100.0));
        let meta = SessionMeta::new(
            "img",
            ImageShape::new(100, 100),
            vec![square("a", 0.0, 0.0), square("b", 50.0, 50.0)],
        );
        a.load_session(meta).unwrap();
        a.poll();
        (a, service)
    }

    #[test]
    fn test_click_in_viewport_labels_region() {
        let (mut a, _) = annotator();
        a.handle_input(InputEvent::PointerDown(Point::new(55.0, 55.0)));
        assert_eq!(a.store().label_of(&"b".into()), Label::Health(HealthLabel::Good));
        // Click on background does nothing
        a.handle_input(InputEvent::PointerDown(Point::new(30.0, 30.0)));
        assert_eq!(a.history().undo_count(), 1);
    }

    #[test]
    fn test_unknown_region_rejected() {
        let (mut a, _) = annotator();
        a.handle_input(InputEvent::RegionClicked("zzz".into()));
        assert!(a.store().is_empty());
        assert!(!a.history().can_undo());
    }

    #[test]
    fn test_hover_is_not_history() {
        let (mut a, _) = annotator();
        a.handle_input(InputEvent::PointerMoved(Point::new(5.0, 5.0)));
        assert_eq!(a.hovered(), Some(&"a".into()));
        assert!(a.overlay().iter().any(|p| p.hovered));
        a.handle_input(InputEvent::PointerLeft("a".into()));
        assert_eq!(a.hovered(), None);
        assert!(!a.history().can_undo());
    }

    #[test]
    fn test_blank_open_id_alerts_without_change() {
        let (mut a, _) = annotator();
        a.open_session("   ");
        a.poll();
        assert_eq!(a.image_id(), Some("img"));
        let notes = a.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Warning);
    }

    #[test]
    fn test_unknown_open_id_alerts_without_change() {
        let (mut a, _) = annotator();
        a.handle_input(InputEvent::RegionClicked("a".into()));
        a.open_session("missing");
        a.poll();
        assert_eq!(a.image_id(), Some("img"));
        assert_eq!(a.store().len(), 1);
        assert!(a.take_notifications()[0].message.contains("not found"));
    }

    #[test]
    fn test_open_known_session_switches() {
        let (mut a, service) = annotator();
        service.add_session(SessionMeta::new("next", ImageShape::new(50, 50), vec![square("c", 0.0, 0.0)]));
        a.handle_input(InputEvent::RegionClicked("a".into()));
        a.open_session("next");
        a.poll();
        assert_eq!(a.image_id(), Some("next"));
        assert!(a.store().is_empty());
        assert!(!a.history().can_undo());
    }

    #[test]
    fn test_export_document() {
        let (mut a, _) = annotator();
        a.handle_input(InputEvent::RegionClicked("a".into()));
        let export = a.export().unwrap();
        assert_eq!(export.filename(), "img_labels.json");
        assert_eq!(export.labels.len(), 1);
    }

    #[test]
    fn test_viewport_keys() {
        let (mut a, _) = annotator();
        let fit = a.transform().scale;
        a.handle_input(InputEvent::Key {
            key: '+',
            modifiers: Default::default(),
            in_text_input: false,
        });
        assert!(a.transform().scale > fit);
        a.handle_input(InputEvent::Key {
            key: '0',
            modifiers: Default::default(),
            in_text_input: false,
        });
        assert_eq!(a.transform().scale, fit);
    }
}
