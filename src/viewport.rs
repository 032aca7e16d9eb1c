//! Viewport transform and the controller that owns it.
//!
//! A [`ViewportTransform`] maps image-pixel space to viewport space:
//! `viewport = image * scale + translate`. The [`Viewport`] keeps the current
//! transform, clamps zoom relative to the auto-fit scale, and notifies
//! listeners synchronously on every change so dependent views (the minimap
//! rectangle) never lag behind.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::zoom;
use crate::geometry::{Point, Rect, Size};

/// Represents pan/zoom transform state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl ViewportTransform {
    pub fn new(scale: f32, translate_x: f32, translate_y: f32) -> Self {
        Self {
            scale,
            translate_x,
            translate_y,
        }
    }

    /// Create an identity transform (scale=1, no translation).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    pub fn image_to_viewport(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale + self.translate_x,
            p.y * self.scale + self.translate_y,
        )
    }

    pub fn viewport_to_image(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.translate_x) / self.scale,
            (p.y - self.translate_y) / self.scale,
        )
    }

    /// Change scale while keeping the image point under `anchor` (viewport
    /// space) fixed on screen.
    pub fn zoom_about(&self, new_scale: f32, anchor: Point) -> ViewportTransform {
        // Image-space point under the anchor before zooming
        let img = self.viewport_to_image(anchor);

        ViewportTransform {
            scale: new_scale,
            translate_x: anchor.x - img.x * new_scale,
            translate_y: anchor.y - img.y * new_scale,
        }
    }

    /// Apply a pan delta to the transform.
    pub fn pan_by(&self, dx: f32, dy: f32) -> ViewportTransform {
        ViewportTransform {
            scale: self.scale,
            translate_x: self.translate_x + dx,
            translate_y: self.translate_y + dy,
        }
    }

    /// Part of image space visible through a viewport of `viewport_size`.
    /// Not clipped to the image bounds.
    pub fn visible_image_rect(&self, viewport_size: Size) -> Rect {
        let top_left = self.viewport_to_image(Point::new(0.0, 0.0));
        Rect::new(
            top_left.x,
            top_left.y,
            viewport_size.width / self.scale,
            viewport_size.height / self.scale,
        )
    }
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Inclusive bounds on `ViewportTransform::scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLimits {
    pub min: f32,
    pub max: f32,
}

impl ScaleLimits {
    pub fn clamp(&self, scale: f32) -> f32 {
        if scale.is_nan() {
            return self.min;
        }
        scale.clamp(self.min, self.max)
    }
}

/// Zoom behaviour. Zoom bounds are multiples of the auto-fit scale, so the
/// same settings work for any image resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    /// Smallest zoom relative to fit (0.5 = half the fitted size)
    pub min_zoom: f32,
    /// Largest zoom relative to fit
    pub max_zoom: f32,
    /// Multiplier applied per zoom in/out step
    pub zoom_factor: f32,
}

impl ViewportSettings {
    /// Zoom bounds are positive, finite and ordered, and a zoom step grows
    /// the scale.
    pub fn validate(&self) -> Result<(), String> {
        let finite = self.min_zoom.is_finite() && self.max_zoom.is_finite() && self.zoom_factor.is_finite();
        if !finite || self.min_zoom <= 0.0 {
            return Err(format!(
                "zoom bounds must be positive numbers (min_zoom {}, max_zoom {})",
                self.min_zoom, self.max_zoom
            ));
        }
        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "min_zoom {} is larger than max_zoom {}",
                self.min_zoom, self.max_zoom
            ));
        }
        if self.zoom_factor <= 1.0 {
            return Err(format!("zoom_factor {} must be greater than 1", self.zoom_factor));
        }
        Ok(())
    }
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            min_zoom: zoom::MIN,
            max_zoom: zoom::MAX,
            zoom_factor: zoom::FACTOR,
        }
    }
}

/// Programmatic navigation used by the toolbar, sliders and minimap.
pub trait ViewportController {
    /// Current transform.
    fn transform(&self) -> ViewportTransform;

    /// Zoom in one step around the viewport center.
    fn zoom_in(&mut self);

    /// Zoom out one step around the viewport center.
    fn zoom_out(&mut self);

    /// Return to the auto-fit scale with the image centered.
    fn reset(&mut self);

    /// Absolute transform; `scale` is clamped into the allowed range.
    fn set_transform(&mut self, x: f32, y: f32, scale: f32);

    /// Keep the current scale and move `point` (image space) to the viewport center.
    fn center_on(&mut self, point: Point);
}

/// Callback invoked synchronously after every transform change.
pub type ViewportListener = Box<dyn FnMut(&ViewportTransform)>;

/// The viewport controller: transform, container/image sizes and listeners.
pub struct Viewport {
    transform: ViewportTransform,
    container: Size,
    image: Size,
    settings: ViewportSettings,
    listeners: Vec<ViewportListener>,
}

impl fmt::Debug for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewport")
            .field("transform", &self.transform)
            .field("container", &self.container)
            .field("image", &self.image)
            .field("settings", &self.settings)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Viewport {
    /// Invalid settings are replaced by the defaults.
    pub fn new(settings: ViewportSettings) -> Self {
        let settings = match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                log::warn!("Ignoring viewport settings: {}", e);
                ViewportSettings::default()
            }
        };
        Self {
            transform: ViewportTransform::identity(),
            container: Size::default(),
            image: Size::default(),
            settings,
            listeners: Vec::new(),
        }
    }

    /// Register a listener for transform changes.
    pub fn subscribe(&mut self, listener: ViewportListener) {
        self.listeners.push(listener);
    }

    pub fn container_size(&self) -> Size {
        self.container
    }

    pub fn image_size(&self) -> Size {
        self.image
    }

    pub fn settings(&self) -> &ViewportSettings {
        &self.settings
    }

    /// Switch to a new image and fit it into the container.
    pub fn set_image(&mut self, image: Size) {
        self.image = image;
        self.reset();
    }

    /// Update the displayed container size. The transform is kept but
    /// re-clamped to the new limits.
    pub fn set_container(&mut self, container: Size) {
        self.container = container;
        let t = self.transform;
        let scale = self.limits().clamp(t.scale);
        self.commit(ViewportTransform::new(scale, t.translate_x, t.translate_y));
    }

    /// Scale at which the whole image fits inside the container.
    pub fn fit_scale(&self) -> f32 {
        if self.image.is_empty() || self.container.is_empty() {
            return 1.0;
        }
        (self.container.width / self.image.width).min(self.container.height / self.image.height)
    }

    pub fn limits(&self) -> ScaleLimits {
        let fit = self.fit_scale();
        ScaleLimits {
            min: fit * self.settings.min_zoom,
            max: fit * self.settings.max_zoom,
        }
    }

    /// Zoom factor relative to fit, for display ("2.0x").
    pub fn relative_zoom(&self) -> f32 {
        self.transform.scale / self.fit_scale()
    }

    /// Drag gesture: shift by a viewport-space delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        let t = self.transform.pan_by(dx, dy);
        self.commit(t);
    }

    /// Wheel/pinch gesture: multiply scale by `factor` keeping `anchor` fixed.
    pub fn zoom_at(&mut self, anchor: Point, factor: f32) {
        let scale = self.limits().clamp(self.transform.scale * factor);
        let t = self.transform.zoom_about(scale, anchor);
        self.commit(t);
    }

    /// Part of the image currently visible, clipped to the image bounds.
    pub fn visible_image_rect(&self) -> Rect {
        self.transform
            .visible_image_rect(self.container)
            .intersect(&Rect::from_size(self.image))
    }

    fn commit(&mut self, transform: ViewportTransform) {
        if transform == self.transform {
            return;
        }
        self.transform = transform;
        log::trace!(
            "🔍 Viewport: scale {:.3}, translate ({:.1}, {:.1})",
            transform.scale,
            transform.translate_x,
            transform.translate_y
        );
        for listener in &mut self.listeners {
            listener(&self.transform);
        }
    }
}

impl ViewportController for Viewport {
    fn transform(&self) -> ViewportTransform {
        self.transform
    }

    fn zoom_in(&mut self) {
        self.zoom_at(self.container.center(), self.settings.zoom_factor);
        log::debug!("🔍 Zoom in: {:.2}x", self.relative_zoom());
    }

    fn zoom_out(&mut self) {
        self.zoom_at(self.container.center(), 1.0 / self.settings.zoom_factor);
        log::debug!("🔍 Zoom out: {:.2}x", self.relative_zoom());
    }

    fn reset(&mut self) {
        let scale = self.fit_scale();
        let tx = (self.container.width - self.image.width * scale) / 2.0;
        let ty = (self.container.height - self.image.height * scale) / 2.0;
        self.commit(ViewportTransform::new(scale, tx.max(0.0), ty.max(0.0)));
        log::debug!("🔄 View reset (fit scale {:.3})", scale);
    }

    fn set_transform(&mut self, x: f32, y: f32, scale: f32) {
        let scale = self.limits().clamp(scale);
        self.commit(ViewportTransform::new(scale, x, y));
    }

    fn center_on(&mut self, point: Point) {
        let scale = self.transform.scale;
        let center = self.container.center();
        self.commit(ViewportTransform::new(
            scale,
            center.x - point.x * scale,
            center.y - point.y * scale,
        ));
        log::debug!("🎯 Centered on ({:.1}, {:.1})", point.x, point.y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const EPSILON: f32 = 0.001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn viewport(container: (f32, f32), image: (f32, f32)) -> Viewport {
        let mut v = Viewport::new(ViewportSettings::default());
        v.set_container(Size::new(container.0, container.1));
        v.set_image(Size::new(image.0, image.1));
        v
    }

    #[test]
    fn test_inverted_zoom_bounds_fall_back_to_defaults() {
        let settings = ViewportSettings {
            min_zoom: 5.0,
            max_zoom: 2.0,
            ..ViewportSettings::default()
        };
        assert!(settings.validate().is_err());

        let mut v = Viewport::new(settings);
        assert_eq!(*v.settings(), ViewportSettings::default());
        v.set_container(Size::new(800.0, 600.0));
        v.set_image(Size::new(400.0, 300.0));
        v.zoom_in();
        let limits = v.limits();
        assert!(limits.min <= v.transform().scale && v.transform().scale <= limits.max);
    }

    #[test]
    fn test_settings_validation() {
        assert!(ViewportSettings::default().validate().is_ok());
        let bad_factor = ViewportSettings {
            zoom_factor: 1.0,
            ..ViewportSettings::default()
        };
        assert!(bad_factor.validate().is_err());
        let nan = ViewportSettings {
            max_zoom: f32::NAN,
            ..ViewportSettings::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_round_trip_image_viewport() {
        let t = ViewportTransform::new(2.5, 30.0, -12.0);
        let p = Point::new(17.0, 42.0);
        let back = t.viewport_to_image(t.image_to_viewport(p));
        assert!(approx_eq(back.x, p.x));
        assert!(approx_eq(back.y, p.y));
    }

    #[test]
    fn test_zoom_about_preserves_anchor_point() {
        let t = ViewportTransform::new(1.0, 50.0, 30.0);
        let anchor = Point::new(150.0, 120.0);
        let before = t.viewport_to_image(anchor);
        let after = t.zoom_about(2.0, anchor).viewport_to_image(anchor);
        assert!(approx_eq(before.x, after.x));
        assert!(approx_eq(before.y, after.y));
    }

    #[test]
    fn test_fit_scale_uses_limiting_axis() {
        let v = viewport((800.0, 600.0), (4000.0, 2000.0));
        // width limits: 800 / 4000 = 0.2 (height would allow 0.3)
        assert!(approx_eq(v.fit_scale(), 0.2));
        assert!(approx_eq(v.transform().scale, 0.2));
        // centered vertically: (600 - 2000 * 0.2) / 2
        assert!(approx_eq(v.transform().translate_y, 100.0));
    }

    #[test]
    fn test_set_transform_clamps_scale() {
        let mut v = viewport((1000.0, 1000.0), (1000.0, 1000.0));
        v.set_transform(5.0, 5.0, 1000.0);
        assert!(approx_eq(v.transform().scale, zoom::MAX));
        assert_eq!(v.transform().translate_x, 5.0);

        v.set_transform(0.0, 0.0, 0.0001);
        assert!(approx_eq(v.transform().scale, zoom::MIN));
    }

    #[test]
    fn test_zoom_in_out_returns_to_fit() {
        let mut v = viewport((1000.0, 500.0), (2000.0, 1000.0));
        let fit = v.transform();
        v.zoom_in();
        assert!(v.transform().scale > fit.scale);
        v.zoom_out();
        assert!(approx_eq(v.transform().scale, fit.scale));
        assert!(approx_eq(v.transform().translate_x, fit.translate_x));
    }

    #[test]
    fn test_center_on_moves_point_to_center() {
        let mut v = viewport((400.0, 300.0), (1000.0, 1000.0));
        v.set_transform(0.0, 0.0, 1.0);
        v.center_on(Point::new(600.0, 700.0));
        let c = v.transform().image_to_viewport(Point::new(600.0, 700.0));
        assert!(approx_eq(c.x, 200.0));
        assert!(approx_eq(c.y, 150.0));
    }

    #[test]
    fn test_listeners_notified_synchronously() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut v = viewport((100.0, 100.0), (100.0, 100.0));
        v.subscribe(Box::new(move |t| sink.borrow_mut().push(*t)));

        v.pan_by(10.0, 0.0);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].translate_x, 10.0);

        // No-op transforms are not reported
        v.pan_by(0.0, 0.0);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_visible_rect_clipped_to_image() {
        let mut v = viewport((100.0, 100.0), (1000.0, 1000.0));
        v.set_transform(-200.0, -300.0, 0.5);
        assert_eq!(v.visible_image_rect(), Rect::new(400.0, 600.0, 200.0, 200.0));

        v.set_transform(50.0, 0.0, 0.5);
        assert_eq!(v.visible_image_rect(), Rect::new(0.0, 0.0, 100.0, 200.0));
    }
}
