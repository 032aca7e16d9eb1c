//! Orthoviewer - superpixel health annotation
//!
//! The core of an interactive annotator for segmented aerial images: each
//! superpixel region is labeled `good`, `moderate` or `bad` by clicking it.
//! Labels are kept locally with full undo/redo and synced to a key/value
//! labeling service in the background. Runs natively and in the browser.

pub mod annotator;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod geometry;
pub mod interaction;
pub mod keybindings;
pub mod minimap;
pub mod model;
#[cfg(not(target_arch = "wasm32"))]
pub mod native;
pub mod overlay;
pub mod store;
pub mod sync;
pub mod undo;
pub mod viewport;

#[cfg(test)]
mod tests;

pub use annotator::{Annotator, Notification, Severity};
pub use config::AppConfig;
pub use interaction::{Command, InputEvent, ToolMode};
pub use model::{HealthLabel, Label, RegionId, SessionMeta};

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
