//! Properties of the edit reducer over generated action sequences.

use crate::model::{HealthLabel, RegionId, Stamp};
use crate::store::LabelStore;
use crate::undo::{EditAction, EditState};

const REGIONS: [&str; 5] = ["r0", "r1", "r2", "r3", "r4"];

/// Small deterministic generator so failures are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn pick(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

fn random_edit(rng: &mut Lcg) -> EditAction {
    let region_id = RegionId::from(REGIONS[rng.pick(REGIONS.len())]);
    match rng.pick(4) {
        3 => EditAction::Erase { region_id },
        i => EditAction::Apply {
            region_id,
            label: HealthLabel::all()[i],
        },
    }
}

fn stamp() -> Stamp {
    Stamp::new(0, "tester")
}

/// Some labels already present before the sequence starts.
fn seeded_state(rng: &mut Lcg) -> EditState {
    let mut state = EditState::new();
    for _ in 0..4 {
        state.apply(random_edit(rng), &stamp());
    }
    state
}

#[test]
fn test_undo_reverses_any_sequence() {
    for seed in 0..50 {
        let mut rng = Lcg(seed);
        let mut state = seeded_state(&mut rng);
        let before: LabelStore = state.store().clone();

        let n = 1 + rng.pick(20);
        for _ in 0..n {
            state.apply(random_edit(&mut rng), &stamp());
        }
        for _ in 0..n {
            assert!(state.apply(EditAction::Undo, &stamp()).is_some());
        }
        assert!(state.store().same_labels(&before), "seed {}", seed);
    }
}

#[test]
fn test_redo_replays_undone_edits() {
    for seed in 0..30 {
        let mut rng = Lcg(seed);
        let mut state = EditState::new();
        let n = 1 + rng.pick(15);
        for _ in 0..n {
            state.apply(random_edit(&mut rng), &stamp());
        }
        let after = state.store().clone();

        let k = 1 + rng.pick(n);
        for _ in 0..k {
            state.apply(EditAction::Undo, &stamp());
        }
        for _ in 0..k {
            state.apply(EditAction::Redo, &stamp());
        }
        assert!(state.store().same_labels(&after), "seed {}", seed);
    }
}

#[test]
fn test_edit_after_undo_empties_redo() {
    for seed in 0..30 {
        let mut rng = Lcg(seed);
        let mut state = EditState::new();
        for _ in 0..(2 + rng.pick(10)) {
            state.apply(random_edit(&mut rng), &stamp());
        }
        state.apply(EditAction::Undo, &stamp());
        assert!(state.history().can_redo());

        state.apply(random_edit(&mut rng), &stamp());
        assert!(!state.history().can_redo(), "seed {}", seed);
        assert_eq!(state.apply(EditAction::Redo, &stamp()), None);
    }
}

#[test]
fn test_store_equals_history_replay() {
    for seed in 0..30 {
        let mut rng = Lcg(seed);
        let mut state = EditState::new();
        for _ in 0..25 {
            let action = match rng.pick(6) {
                0 => EditAction::Undo,
                1 => EditAction::Redo,
                _ => random_edit(&mut rng),
            };
            state.apply(action, &stamp());
        }
        let replayed = state.replayed_onto(LabelStore::new(), &stamp());
        assert!(state.store().same_labels(&replayed), "seed {}", seed);
    }
}

#[test]
fn test_every_effective_action_yields_one_write() {
    let mut rng = Lcg(7);
    let mut state = EditState::new();
    for _ in 0..40 {
        let action = match rng.pick(5) {
            0 => EditAction::Undo,
            1 => EditAction::Redo,
            _ => random_edit(&mut rng),
        };
        let can_undo = state.history().can_undo();
        let can_redo = state.history().can_redo();
        let expect_write = match &action {
            EditAction::Undo => can_undo,
            EditAction::Redo => can_redo,
            _ => true,
        };
        let write = state.apply(action, &stamp());
        assert_eq!(write.is_some(), expect_write);
        if let Some(write) = write {
            assert_eq!(state.store().label_of(&write.region_id), write.label);
        }
    }
}

#[test]
fn test_reduce_leaves_input_untouched() {
    let mut state = EditState::new();
    state.apply(
        EditAction::Apply {
            region_id: "r0".into(),
            label: HealthLabel::Good,
        },
        &stamp(),
    );
    let snapshot = state.clone();
    let next = snapshot.clone().reduce(EditAction::Undo, &stamp());
    assert!(next.state.store().is_empty());
    assert_eq!(snapshot.store().len(), 1);
}
