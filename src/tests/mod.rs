//! Cross-component tests for the annotator.
//!
//! These drive the public [`Annotator`](crate::Annotator) surface the way a
//! host UI would, with the in-memory label service standing in for the
//! remote store.

mod history_tests;
mod sync_tests;

use std::rc::Rc;
use web_time::Instant;

use crate::config::AppConfig;
use crate::geometry::Size;
use crate::interaction::InputEvent;
use crate::model::{ImageShape, Region, SessionMeta};
use crate::sync::MemoryLabelService;
use crate::Annotator;

/// A unit square grid of `ids.len()` regions laid out left to right.
pub(super) fn strip_session(image_id: &str, ids: &[&str]) -> SessionMeta {
    let polygons = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let x = i as f32 * 10.0;
            Region::new(
                *id,
                vec![
                    (x, 0.0).into(),
                    (x + 10.0, 0.0).into(),
                    (x + 10.0, 10.0).into(),
                    (x, 10.0).into(),
                ],
            )
        })
        .collect();
    SessionMeta::new(image_id, ImageShape::new(10, ids.len() as u32 * 10), polygons)
}

/// An annotator with `session` loaded and its initial label fetch applied.
pub(super) fn loaded(session: SessionMeta) -> (Annotator, MemoryLabelService, Instant) {
    let service = MemoryLabelService::new();
    let mut annotator = Annotator::new(&AppConfig::default(), Rc::new(service.clone()));
    annotator.set_container(Size::new(800.0, 600.0));
    annotator.load_session(session).unwrap();
    let now = Instant::now();
    annotator.poll_at(now);
    (annotator, service, now)
}

pub(super) fn click(annotator: &mut Annotator, id: &str, now: Instant) {
    annotator.handle_input_at(InputEvent::RegionClicked(id.into()), now);
}
