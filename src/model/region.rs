//! Superpixel regions: the unit of labeling.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::geometry::{Point, Rect};

/// Minimum number of vertices for a polygon to enclose any area.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Identifier of a region, unique within one image.
///
/// The segmentation service emits integer ids while exported label files key
/// them as strings, so both are accepted and the id is kept in string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RegionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for RegionId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for RegionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RegionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(u64),
            Str(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => RegionId::from(n),
            RawId::Str(s) => RegionId(s),
        })
    }
}

/// A closed polygon in image-pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RegionWire", into = "RegionWire")]
pub struct Region {
    pub id: RegionId,
    pub polygon: Vec<Point>,
}

/// `{"id": 7, "polygon": [[x, y], ...]}` as produced by the segmentation service.
#[derive(Serialize, Deserialize)]
struct RegionWire {
    id: RegionId,
    #[serde(default)]
    polygon: Vec<[f32; 2]>,
}

impl From<RegionWire> for Region {
    fn from(wire: RegionWire) -> Self {
        Region {
            id: wire.id,
            polygon: wire.polygon.into_iter().map(|[x, y]| Point::new(x, y)).collect(),
        }
    }
}

impl From<Region> for RegionWire {
    fn from(region: Region) -> Self {
        RegionWire {
            id: region.id,
            polygon: region.polygon.into_iter().map(|p| [p.x, p.y]).collect(),
        }
    }
}

impl Region {
    pub fn new(id: impl Into<RegionId>, polygon: Vec<Point>) -> Self {
        Self {
            id: id.into(),
            polygon,
        }
    }

    /// Whether the polygon has enough vertices to be hit or drawn as an area.
    pub fn is_valid(&self) -> bool {
        self.polygon.len() >= MIN_POLYGON_VERTICES
    }

    /// Axis-aligned bounds of the polygon, `None` for an empty point list.
    pub fn bounds(&self) -> Option<Rect> {
        let first = self.polygon.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.polygon[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Point-in-polygon test (ray casting). Degenerate polygons never contain a point.
    pub fn contains(&self, point: &Point) -> bool {
        if !self.is_valid() {
            return false;
        }
        let (x, y) = (point.x, point.y);
        let vertices = &self.polygon;
        let mut inside = false;
        let mut j = vertices.len() - 1;
        for i in 0..vertices.len() {
            let (xi, yi) = (vertices[i].x, vertices[i].y);
            let (xj, yj) = (vertices[j].x, vertices[j].y);
            if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// SVG `points` attribute: `"x1,y1 x2,y2 ..."`.
    pub fn svg_points(&self) -> String {
        self.polygon
            .iter()
            .map(|p| format!("{},{}", p.x, p.y))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
