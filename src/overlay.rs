//! Overlay rendering model: one translucent polygon per region.

use serde::Serialize;
use std::fmt::Write as _;

use crate::constants::OVERLAY_STROKE_WIDTH;
use crate::geometry::Size;
use crate::model::{Label, RegionId, SessionMeta};
use crate::store::LabelStore;

const STROKE: &str = "rgba(255,255,255,0.5)";
const HOVER_STROKE: &str = "#ffeb3b";
const UNLABELED_FILL: &str = "rgba(0,0,0,0)";

/// A region polygon ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayPolygon {
    pub region_id: RegionId,
    /// SVG `points` attribute in polygon space
    pub points: String,
    pub label: Label,
    pub fill: String,
    pub stroke: &'static str,
    pub stroke_width: f32,
    pub hovered: bool,
}

fn rgba([r, g, b, a]: [u8; 4]) -> String {
    format!("rgba({},{},{},{:.2})", r, g, b, a as f32 / 255.0)
}

/// CSS fill for a label.
pub fn fill_for(label: Label) -> String {
    match label.health() {
        Some(h) => rgba(h.fill_color()),
        None => UNLABELED_FILL.to_string(),
    }
}

/// Build the overlay for the current labels. Regions with no points are
/// skipped; everything else is drawn even if degenerate.
pub fn build_overlay(
    meta: &SessionMeta,
    store: &LabelStore,
    hovered: Option<&RegionId>,
) -> Vec<OverlayPolygon> {
    meta.polygons
        .iter()
        .filter(|region| !region.polygon.is_empty())
        .map(|region| {
            let label = store.label_of(&region.id);
            let hovered = hovered == Some(&region.id);
            OverlayPolygon {
                region_id: region.id.clone(),
                points: region.svg_points(),
                label,
                fill: fill_for(label),
                stroke: if hovered { HOVER_STROKE } else { STROKE },
                stroke_width: if hovered {
                    OVERLAY_STROKE_WIDTH * 2.0
                } else {
                    OVERLAY_STROKE_WIDTH
                },
                hovered,
            }
        })
        .collect()
}

/// Standalone SVG document whose `viewBox` is the polygon space, to be
/// stretched over the displayed image.
pub fn to_svg(polygons: &[OverlayPolygon], overlay_size: Size) -> String {
    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" preserveAspectRatio="none">"#,
        overlay_size.width, overlay_size.height
    );
    for p in polygons {
        let _ = write!(
            svg,
            r#"<polygon data-id="{}" data-label="{}" points="{}" fill="{}" stroke="{}" stroke-width="{}"/>"#,
            escape_attr(p.region_id.as_str()),
            p.label,
            p.points,
            p.fill,
            p.stroke,
            p.stroke_width
        );
    }
    svg.push_str("</svg>");
    svg
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HealthLabel, ImageShape, LabelAssignment, Region, Stamp};

    fn meta() -> SessionMeta {
        SessionMeta::new(
            "img",
            ImageShape::new(100, 200),
            vec![
                Region::new("a", vec![(0.0, 0.0).into(), (4.0, 0.0).into(), (4.0, 4.0).into()]),
                Region::new("empty", vec![]),
                Region::new("b", vec![(5.0, 5.0).into(), (9.0, 5.0).into(), (9.0, 9.0).into()]),
            ],
        )
    }

    #[test]
    fn test_empty_polygon_skipped() {
        let overlay = build_overlay(&meta(), &LabelStore::new(), None);
        let ids: Vec<&str> = overlay.iter().map(|p| p.region_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_fill_follows_label_and_hover() {
        let stamp = Stamp::new(0, "t");
        let store = LabelStore::from_assignments([(
            RegionId::from("a"),
            LabelAssignment::new(HealthLabel::Bad, &stamp),
        )]);
        let hovered = RegionId::from("b");
        let overlay = build_overlay(&meta(), &store, Some(&hovered));

        assert_eq!(overlay[0].label, Label::Health(HealthLabel::Bad));
        assert_eq!(overlay[0].fill, "rgba(255,99,99,0.45)");
        assert!(!overlay[0].hovered);
        assert_eq!(overlay[1].fill, UNLABELED_FILL);
        assert!(overlay[1].hovered);
        assert_eq!(overlay[1].stroke, HOVER_STROKE);
    }

    #[test]
    fn test_svg_document() {
        let m = meta();
        let svg = to_svg(&build_overlay(&m, &LabelStore::new(), None), m.overlay_size());
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"viewBox="0 0 200 100""#));
        assert!(svg.contains(r#"points="0,0 4,0 4,4""#));
        assert_eq!(svg.matches("<polygon").count(), 2);
        assert!(svg.ends_with("</svg>"));
    }
}
