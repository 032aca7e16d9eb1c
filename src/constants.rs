//! Global constants for the annotator.

/// Zoom constants (relative to the auto-fit scale).
pub mod zoom {
    /// Zoom increment/decrement factor
    pub const FACTOR: f32 = 1.2;
    /// Maximum zoom level
    pub const MAX: f32 = 10.0;
    /// Minimum zoom level
    pub const MIN: f32 = 0.5;
    /// Pan step size for keyboard/button navigation (viewport pixels)
    pub const PAN_STEP: f32 = 40.0;
}

/// Remote sync constants.
pub mod sync {
    /// Quiet period before a region's pending label is written
    pub const DEBOUNCE_MS: u64 = 150;
    /// Default label-service base URL
    pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
    /// User recorded with every label write
    pub const DEFAULT_USER: &str = "web_user";
}

/// Minimap side length in pixels
pub const MINIMAP_SIZE: f32 = 180.0;

/// Overlay stroke width in polygon space
pub const OVERLAY_STROKE_WIDTH: f32 = 0.7;
