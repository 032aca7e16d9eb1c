//! Minimap coordinate mapping.
//!
//! The minimap is a fixed-size square showing the whole image. The image is
//! scaled by a single uniform factor (the smaller of the two axis scales) and
//! centered in the square. All functions here are pure.

use serde::Serialize;

use crate::geometry::{Point, Rect, Size};
use crate::viewport::ViewportTransform;

/// Maps between image-pixel space and minimap space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimapMapper {
    size: f32,
    image: Size,
    scale: f32,
    offset: Point,
}

impl MinimapMapper {
    /// Mapper for an image of `image` size shown in a `size`×`size` square.
    pub fn new(size: f32, image: Size) -> Self {
        let scale = if image.is_empty() || size <= 0.0 {
            0.0
        } else {
            (size / image.width).min(size / image.height)
        };
        let offset = Point::new(
            (size - image.width * scale) / 2.0,
            (size - image.height * scale) / 2.0,
        );
        Self {
            size,
            image,
            scale,
            offset,
        }
    }

    /// Uniform image → minimap scale factor.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    /// Where the thumbnail sits inside the minimap square.
    pub fn thumbnail_rect(&self) -> Rect {
        Rect::new(
            self.offset.x,
            self.offset.y,
            self.image.width * self.scale,
            self.image.height * self.scale,
        )
    }

    pub fn image_to_minimap(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale + self.offset.x,
            p.y * self.scale + self.offset.y,
        )
    }

    /// Inverse mapping, clamped to the image bounds so clicks on the letterbox
    /// margin still land on the nearest image edge. `None` if the image is empty.
    pub fn minimap_to_image(&self, p: Point) -> Option<Point> {
        if self.scale <= 0.0 {
            return None;
        }
        let x = (p.x - self.offset.x) / self.scale;
        let y = (p.y - self.offset.y) / self.scale;
        Some(Point::new(
            x.clamp(0.0, self.image.width),
            y.clamp(0.0, self.image.height),
        ))
    }

    pub fn image_rect_to_minimap(&self, r: Rect) -> Rect {
        let top_left = self.image_to_minimap(Point::new(r.x, r.y));
        Rect::new(top_left.x, top_left.y, r.width * self.scale, r.height * self.scale)
    }

    /// The "you are here" box: the part of the image visible through a
    /// viewport of `viewport_size` under `transform`, in minimap space.
    pub fn visible_rect(&self, transform: &ViewportTransform, viewport_size: Size) -> Rect {
        let visible = transform
            .visible_image_rect(viewport_size)
            .intersect(&Rect::from_size(self.image));
        self.image_rect_to_minimap(visible)
    }
}

/// Everything a UI needs to draw the minimap for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MinimapView {
    pub size: f32,
    pub thumbnail: Rect,
    pub visible: Rect,
}

impl MinimapView {
    pub fn compute(mapper: &MinimapMapper, transform: &ViewportTransform, viewport_size: Size) -> Self {
        Self {
            size: mapper.size(),
            thumbnail: mapper.thumbnail_rect(),
            visible: mapper.visible_rect(transform, viewport_size),
        }
    }
}
