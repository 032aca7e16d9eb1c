//! Persistence behaviour seen through the annotator.

use std::rc::Rc;
use std::time::Duration;
use web_time::Instant;

use super::{click, loaded, strip_session};
use crate::annotator::Severity;
use crate::config::AppConfig;
use crate::interaction::{Command, InputEvent, ToolMode};
use crate::model::{HealthLabel, Label, LabelAssignment, RegionId, Stamp};
use crate::store::LabelStore;
use crate::sync::MemoryLabelService;
use crate::undo::EditAction;
use crate::Annotator;

const DEBOUNCE: Duration = Duration::from_millis(150);

#[test]
fn test_burst_on_one_region_sends_final_label() {
    let (mut a, service, t0) = loaded(strip_session("img", &["a"]));
    for (i, label) in [HealthLabel::Good, HealthLabel::Moderate, HealthLabel::Bad]
        .into_iter()
        .enumerate()
    {
        let at = t0 + Duration::from_millis(30 * i as u64);
        a.handle_input_at(InputEvent::ToolSelected(ToolMode::Label(label)), at);
        click(&mut a, "a", at);
        a.poll_at(at);
    }
    assert!(service.saves().is_empty());

    a.poll_at(t0 + Duration::from_millis(60) + DEBOUNCE);
    let saves = service.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].label, Label::Health(HealthLabel::Bad));
    assert_eq!(saves[0].image_id, "img");
}

#[test]
fn test_next_poll_counts_down_to_pending_write() {
    let (mut a, service, t0) = loaded(strip_session("img", &["a"]));
    assert_eq!(a.next_poll_in(t0), None);

    click(&mut a, "a", t0);
    assert_eq!(a.next_poll_in(t0), Some(DEBOUNCE));
    assert_eq!(a.next_poll_in(t0 + Duration::from_millis(100)), Some(Duration::from_millis(50)));
    assert_eq!(a.next_poll_in(t0 + DEBOUNCE * 2), Some(Duration::ZERO));

    a.poll_at(t0 + DEBOUNCE);
    assert_eq!(service.saves().len(), 1);
    assert_eq!(a.next_poll_in(t0 + DEBOUNCE), None);
}

#[test]
fn test_undo_persists_previous_label() {
    let (mut a, service, t0) = loaded(strip_session("img", &["a"]));
    click(&mut a, "a", t0);
    a.poll_at(t0 + DEBOUNCE);
    a.dispatch_at(Command::Edit(EditAction::Undo), t0 + DEBOUNCE);
    a.poll_at(t0 + DEBOUNCE * 2);

    let saves = service.saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[1].label, Label::Unlabeled);
    assert!(service.labels("img").is_empty());
}

#[test]
fn test_regions_do_not_delay_each_other() {
    let (mut a, service, t0) = loaded(strip_session("img", &["a", "b"]));
    click(&mut a, "a", t0);
    // Keep editing "b" past a's deadline
    for i in 1..6u32 {
        click(&mut a, "b", t0 + Duration::from_millis(40) * i);
        a.poll_at(t0 + Duration::from_millis(40) * i);
    }
    let saved: Vec<RegionId> = service.saves().into_iter().map(|s| s.region_id).collect();
    assert_eq!(saved, vec![RegionId::from("a")]);
}

#[test]
fn test_save_failure_alerts_once_and_keeps_local_label() {
    let (mut a, service, t0) = loaded(strip_session("img", &["a"]));
    service.set_fail_saves(true);
    click(&mut a, "a", t0);
    a.poll_at(t0 + DEBOUNCE);
    a.poll_at(t0 + DEBOUNCE * 2);

    let notes = a.take_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Error);
    assert!(notes[0].message.contains("region a"));
    assert_eq!(a.store().label_of(&"a".into()), Label::Health(HealthLabel::Good));

    // No automatic retry
    a.poll_at(t0 + DEBOUNCE * 10);
    assert_eq!(service.saves().len(), 1);
    assert!(a.take_notifications().is_empty());
}

#[test]
fn test_load_failure_starts_empty_with_warning() {
    let service = MemoryLabelService::new();
    service.set_fail_loads(true);
    let mut a = Annotator::new(&AppConfig::default(), Rc::new(service.clone()));
    a.load_session(strip_session("img", &["a"])).unwrap();
    a.poll();

    assert!(a.store().is_empty());
    assert!(a.labels_loaded());
    let notes = a.take_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Warning);

    // Labeling still works
    a.handle_input(InputEvent::RegionClicked("a".into()));
    assert_eq!(a.store().len(), 1);
}

fn remote_labels() -> LabelStore {
    let stamp = Stamp::new(1, "someone");
    LabelStore::from_assignments([
        (RegionId::from("a"), LabelAssignment::new(HealthLabel::Bad, &stamp)),
        (RegionId::from("b"), LabelAssignment::new(HealthLabel::Moderate, &stamp)),
        (RegionId::from("gone"), LabelAssignment::new(HealthLabel::Good, &stamp)),
    ])
}

#[test]
fn test_fetched_labels_populate_store() {
    let service = MemoryLabelService::new();
    service.set_labels("img", remote_labels());
    let mut a = Annotator::new(&AppConfig::default(), Rc::new(service));
    a.load_session(strip_session("img", &["a", "b"])).unwrap();
    assert!(!a.labels_loaded());
    a.poll();

    assert!(a.labels_loaded());
    assert_eq!(a.store().len(), 2);
    assert_eq!(a.store().label_of(&"gone".into()), Label::Unlabeled);
    assert_eq!(a.counts().moderate, 1);
}

#[test]
fn test_edits_before_fetch_survive_it() {
    let service = MemoryLabelService::new();
    service.set_labels("img", remote_labels());
    let mut a = Annotator::new(&AppConfig::default(), Rc::new(service));
    a.load_session(strip_session("img", &["a", "b"])).unwrap();

    // Label before the fetch result is applied
    a.handle_input(InputEvent::RegionClicked("a".into()));
    a.poll();

    assert_eq!(a.store().label_of(&"a".into()), Label::Health(HealthLabel::Good));
    assert_eq!(a.store().label_of(&"b".into()), Label::Health(HealthLabel::Moderate));

    // Undo goes back to what the server had
    a.dispatch(Command::Edit(EditAction::Undo));
    assert_eq!(a.store().label_of(&"a".into()), Label::Health(HealthLabel::Bad));
}

#[test]
fn test_reload_rebases_history() {
    let (mut a, service, t0) = loaded(strip_session("img", &["a", "b"]));
    click(&mut a, "a", t0);
    service.set_labels("img", remote_labels());
    a.reload_labels();
    a.poll_at(t0);

    assert_eq!(a.store().label_of(&"a".into()), Label::Health(HealthLabel::Good));
    assert_eq!(a.store().label_of(&"b".into()), Label::Health(HealthLabel::Moderate));
}

#[test]
fn test_undo_after_reload_reverts_own_saved_edit() {
    let (mut a, service, t0) = loaded(strip_session("img", &["a"]));
    click(&mut a, "a", t0);
    a.poll_at(t0 + DEBOUNCE);
    assert_eq!(service.labels("img").label_of(&"a".into()), Label::Health(HealthLabel::Good));

    a.reload_labels();
    a.poll_at(t0 + DEBOUNCE);
    assert_eq!(a.store().label_of(&"a".into()), Label::Health(HealthLabel::Good));

    a.dispatch_at(Command::Edit(EditAction::Undo), t0 + DEBOUNCE);
    assert_eq!(a.store().label_of(&"a".into()), Label::Unlabeled);
    a.poll_at(t0 + DEBOUNCE * 2);
    assert!(service.labels("img").is_empty());
}

#[test]
fn test_failed_reload_keeps_local_labels() {
    let (mut a, service, t0) = loaded(strip_session("img", &["a", "b"]));
    click(&mut a, "a", t0);
    service.set_fail_loads(true);
    a.reload_labels();
    a.poll_at(t0);

    assert_eq!(a.store().label_of(&"a".into()), Label::Health(HealthLabel::Good));
    assert!(a.history().can_undo());
    let notes = a.take_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Warning);
    assert!(notes[0].message.contains("keeping local labels"));
}

#[test]
fn test_newer_value_waits_for_in_flight_write() {
    let (mut a, service, t0) = loaded(strip_session("img", &["a"]));
    service.set_hold_saves(true);

    click(&mut a, "a", t0);
    a.poll_at(t0 + DEBOUNCE);
    assert_eq!(service.held_count(), 1);

    a.handle_input_at(InputEvent::ToolSelected(ToolMode::Label(HealthLabel::Bad)), t0 + DEBOUNCE);
    click(&mut a, "a", t0 + DEBOUNCE);
    a.poll_at(t0 + DEBOUNCE * 3);
    assert_eq!(service.saves().len(), 1);

    service.set_hold_saves(false);
    service.release_held();
    a.poll_at(t0 + DEBOUNCE * 4);

    assert_eq!(service.saves().len(), 2);
    assert_eq!(
        service.labels("img").label_of(&"a".into()),
        Label::Health(HealthLabel::Bad)
    );
}

#[test]
fn test_flush_sends_pending_immediately() {
    let (mut a, service, t0) = loaded(strip_session("img", &["a", "b"]));
    click(&mut a, "a", t0);
    click(&mut a, "b", t0);
    assert_eq!(a.flush(), 2);
    assert_eq!(service.saves().len(), 2);
    a.poll_at(Instant::now());
    assert!(a.take_notifications().is_empty());
}
