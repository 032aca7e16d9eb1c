//! Session metadata returned by the segmentation service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::SessionError;
use crate::geometry::{Point, Size};
use crate::model::region::{Region, RegionId};

/// `[height, width, (channels)]` as emitted by the segmentation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct ImageShape {
    pub height: u32,
    pub width: u32,
}

impl ImageShape {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }
}

impl TryFrom<Vec<u32>> for ImageShape {
    type Error = SessionError;

    fn try_from(dims: Vec<u32>) -> Result<Self, Self::Error> {
        match dims.as_slice() {
            [height, width, ..] if *height > 0 && *width > 0 => Ok(Self::new(*height, *width)),
            _ => Err(SessionError::InvalidShape(dims)),
        }
    }
}

impl From<ImageShape> for Vec<u32> {
    fn from(shape: ImageShape) -> Self {
        vec![shape.height, shape.width]
    }
}

/// Everything the annotator needs to know about one segmented image.
/// Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub image_id: String,

    /// Stored filename of the uploaded image, used to build its URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_filename: Option<String>,

    /// Natural size of the original image.
    #[serde(default, alias = "orig_shape", skip_serializing_if = "Option::is_none")]
    pub image_shape: Option<ImageShape>,

    /// Size of the (possibly downscaled) raster the polygons were traced on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seg_shape: Option<ImageShape>,

    /// `seg_shape / image_shape` when the service downscaled before segmenting.
    #[serde(default = "default_scale")]
    pub scale: f32,

    #[serde(default)]
    pub polygons: Vec<Region>,
}

fn default_scale() -> f32 {
    1.0
}

impl SessionMeta {
    /// Build a session directly, mostly for tests and offline use.
    pub fn new(image_id: impl Into<String>, shape: ImageShape, polygons: Vec<Region>) -> Self {
        Self {
            image_id: image_id.into(),
            image_filename: None,
            image_shape: Some(shape),
            seg_shape: None,
            scale: default_scale(),
            polygons,
        }
    }

    /// Parse and validate a segmentation response.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let meta: Self = serde_json::from_str(json)?;
        meta.validate()?;
        Ok(meta)
    }

    /// Check the invariants the annotator relies on.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.image_id.trim().is_empty() {
            return Err(SessionError::BlankImageId);
        }
        if self.overlay_shape().is_none() {
            return Err(SessionError::MissingShape {
                image_id: self.image_id.clone(),
            });
        }
        Ok(())
    }

    /// Shape of the coordinate space polygons are expressed in.
    pub fn overlay_shape(&self) -> Option<ImageShape> {
        self.seg_shape.or(self.image_shape)
    }

    /// Size of the polygon coordinate space, zero if no shape is known.
    pub fn overlay_size(&self) -> Size {
        self.overlay_shape().map(|s| s.size()).unwrap_or_default()
    }

    /// Natural size of the displayed image. Falls back to the overlay size
    /// when the original shape is unknown.
    pub fn image_size(&self) -> Size {
        self.image_shape
            .or(self.seg_shape)
            .map(|s| s.size())
            .unwrap_or_default()
    }

    /// Convert an image-pixel point into polygon space.
    pub fn image_to_overlay(&self, p: Point) -> Point {
        let image = self.image_size();
        let overlay = self.overlay_size();
        if image.is_empty() || overlay.is_empty() {
            return p;
        }
        Point::new(
            p.x * overlay.width / image.width,
            p.y * overlay.height / image.height,
        )
    }

    /// Topmost region containing `p` (polygon space). Later polygons are
    /// drawn over earlier ones, so they win.
    pub fn region_at(&self, p: Point) -> Option<&Region> {
        self.polygons.iter().rev().find(|r| {
            r.bounds().is_some_and(|b| b.contains(&p)) && r.contains(&p)
        })
    }

    pub fn contains_region(&self, id: &RegionId) -> bool {
        self.polygons.iter().any(|r| &r.id == id)
    }

    pub fn region_count(&self) -> usize {
        self.polygons.len()
    }

    /// Index from region id to its position in `polygons`.
    pub fn region_index(&self) -> HashMap<RegionId, usize> {
        self.polygons
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect()
    }
}
