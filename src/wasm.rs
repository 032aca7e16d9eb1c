//! Browser bindings.
//!
//! The page owns rendering and DOM events and forwards them here. Structured
//! results cross the boundary as JSON strings.

use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::annotator::Annotator;
use crate::config::AppConfig;
use crate::export::export_filename;
use crate::geometry::{Point, Size};
use crate::interaction::{Command, InputEvent, ToolMode};
use crate::keybindings::Modifiers;
use crate::model::SessionMeta;
use crate::sync::HttpLabelService;
use crate::undo::EditAction;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_json(value: &impl Serialize) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(to_js_error)
}

#[wasm_bindgen]
pub struct WasmAnnotator {
    inner: Annotator,
}

#[wasm_bindgen]
impl WasmAnnotator {
    /// Build an annotator talking to `base_url`, or to the configured
    /// server when omitted.
    #[wasm_bindgen(constructor)]
    pub fn new(base_url: Option<String>) -> WasmAnnotator {
        let config = AppConfig::load_from_local_storage().unwrap_or_default();
        if console_log::init_with_level(config.log_level.to_level_filter().to_level().unwrap_or(log::Level::Info)).is_err() {
            log::debug!("Logger already initialized");
        }
        let base_url = base_url.unwrap_or_else(|| config.server.base_url.clone());
        log::info!("{} talking to {}", config.app_name, base_url);

        let service = HttpLabelService::new(base_url);
        WasmAnnotator {
            inner: Annotator::new(&config, Rc::new(service)),
        }
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Load a session from segment JSON already fetched by the page.
    pub fn load_session(&mut self, json: &str) -> Result<(), JsValue> {
        let meta = SessionMeta::from_json(json).map_err(to_js_error)?;
        self.inner.load_session(meta).map_err(to_js_error)
    }

    /// Fetch a session by image id from the server.
    pub fn open_session(&mut self, image_id: &str) {
        self.inner.open_session(image_id);
    }

    pub fn reload_labels(&mut self) {
        self.inner.reload_labels();
    }

    pub fn image_id(&self) -> Option<String> {
        self.inner.image_id().map(str::to_string)
    }

    pub fn labels_loaded(&self) -> bool {
        self.inner.labels_loaded()
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    pub fn click_region(&mut self, region_id: &str) {
        self.inner.handle_input(InputEvent::RegionClicked(region_id.into()));
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.inner.handle_input(InputEvent::PointerDown(Point::new(x, y)));
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.inner.handle_input(InputEvent::PointerMoved(Point::new(x, y)));
    }

    pub fn pointer_enter(&mut self, region_id: &str) {
        self.inner.handle_input(InputEvent::PointerEntered(region_id.into()));
    }

    pub fn pointer_leave(&mut self, region_id: &str) {
        self.inner.handle_input(InputEvent::PointerLeft(region_id.into()));
    }

    pub fn hovered(&self) -> Option<String> {
        self.inner.hovered().map(|id| id.to_string())
    }

    /// Forward a `keydown`. Returns true when the key was consumed.
    pub fn key(
        &mut self,
        key: &str,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        in_text_input: bool,
    ) -> bool {
        let mut chars = key.chars();
        let (Some(key), None) = (chars.next(), chars.next()) else {
            return false;
        };
        let modifiers = Modifiers {
            shift,
            ctrl,
            alt,
            meta,
        };
        if in_text_input || self.inner.bindings().action_for_key(key, modifiers).is_none() {
            return false;
        }
        self.inner.handle_input(InputEvent::Key {
            key,
            modifiers,
            in_text_input,
        });
        true
    }

    pub fn mode(&self) -> String {
        self.inner.mode().to_string()
    }

    pub fn set_mode(&mut self, mode: &str) -> Result<(), JsValue> {
        let mode: ToolMode = mode.parse().map_err(to_js_error)?;
        self.inner.handle_input(InputEvent::ToolSelected(mode));
        Ok(())
    }

    pub fn undo(&mut self) {
        self.inner.dispatch(Command::Edit(EditAction::Undo));
    }

    pub fn redo(&mut self) {
        self.inner.dispatch(Command::Edit(EditAction::Redo));
    }

    pub fn can_undo(&self) -> bool {
        self.inner.history().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.history().can_redo()
    }

    // ------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------

    pub fn zoom_in(&mut self) {
        self.inner.dispatch(Command::ZoomIn);
    }

    pub fn zoom_out(&mut self) {
        self.inner.dispatch(Command::ZoomOut);
    }

    pub fn reset_view(&mut self) {
        self.inner.dispatch(Command::ResetView);
    }

    pub fn wheel(&mut self, x: f32, y: f32, delta: f32) {
        self.inner.handle_input(InputEvent::Wheel {
            anchor: Point::new(x, y),
            delta,
        });
    }

    pub fn drag(&mut self, dx: f32, dy: f32) {
        self.inner.handle_input(InputEvent::Drag { dx, dy });
    }

    pub fn set_transform(&mut self, x: f32, y: f32, scale: f32) {
        self.inner.dispatch(Command::SetTransform { x, y, scale });
    }

    pub fn center_on(&mut self, x: f32, y: f32) {
        self.inner.dispatch(Command::CenterOn(Point::new(x, y)));
    }

    pub fn set_container(&mut self, width: f32, height: f32) {
        self.inner.set_container(Size::new(width, height));
    }

    pub fn minimap_click(&mut self, x: f32, y: f32) {
        self.inner.handle_input(InputEvent::MinimapClicked(Point::new(x, y)));
    }

    /// `{scale, translate_x, translate_y}`
    pub fn transform_json(&self) -> Result<String, JsValue> {
        to_json(&self.inner.transform())
    }

    /// `{size, thumbnail, visible}` or `null` without a session.
    pub fn minimap_view_json(&self) -> Result<String, JsValue> {
        to_json(&self.inner.minimap_view())
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    pub fn overlay_svg(&self) -> String {
        self.inner.overlay_svg()
    }

    pub fn overlay_json(&self) -> Result<String, JsValue> {
        to_json(&self.inner.overlay())
    }

    pub fn counts_json(&self) -> Result<String, JsValue> {
        to_json(&self.inner.counts())
    }

    pub fn export_json(&self) -> Result<String, JsValue> {
        self.inner
            .export()
            .and_then(|export| export.to_json())
            .map_err(to_js_error)
    }

    pub fn export_filename(&self) -> Option<String> {
        self.inner.image_id().map(export_filename)
    }

    /// Pending user-facing messages as `[{severity, message}]`.
    pub fn take_notifications_json(&mut self) -> Result<String, JsValue> {
        to_json(&self.inner.take_notifications())
    }

    /// Drive background work; call from `requestAnimationFrame` or a timer.
    pub fn tick(&mut self) {
        self.inner.poll();
    }

    /// Milliseconds until `tick` has a save to send, or `undefined` when
    /// nothing is pending. Lets the page arm a single `setTimeout`.
    pub fn next_tick_ms(&self) -> Option<f64> {
        self.inner
            .next_poll_in(web_time::Instant::now())
            .map(|d| d.as_secs_f64() * 1000.0)
    }

    /// Send pending writes now, e.g. on `pagehide`.
    pub fn flush(&mut self) -> usize {
        self.inner.flush()
    }
}
