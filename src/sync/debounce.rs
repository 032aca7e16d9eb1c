//! Per-key debouncing of pending writes.
//!
//! Each key has its own timer: scheduling a key again replaces its value and
//! rearms only that key's deadline, so rapid edits to one region never delay
//! writes for another.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use web_time::Instant;

#[derive(Debug, Clone)]
struct Pending<V> {
    value: V,
    deadline: Instant,
}

/// Coalesces bursts of values per key, releasing the latest value once the
/// key has been quiet for the debounce delay.
#[derive(Debug, Clone)]
pub struct Debouncer<K, V> {
    /// Quiet period required after the last schedule of a key.
    delay: Duration,

    /// Latest value and deadline per key.
    pending: HashMap<K, Pending<V>>,
}

impl<K: Eq + Hash + Clone, V> Debouncer<K, V> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `value` for `key`, replacing any pending value (cancel and
    /// reschedule). Returns true if an earlier value was coalesced away.
    pub fn schedule(&mut self, key: K, value: V, now: Instant) -> bool {
        let deadline = now + self.delay;
        self.pending
            .insert(key, Pending { value, deadline })
            .is_some()
    }

    /// Remove and return every entry whose deadline has passed and which
    /// `hold` does not want to keep back, oldest deadline first.
    pub fn take_due(&mut self, now: Instant, hold: impl Fn(&K) -> bool) -> Vec<(K, V)> {
        let mut due: Vec<K> = self
            .pending
            .iter()
            .filter(|&(key, p)| p.deadline <= now && !hold(key))
            .map(|(key, _)| key.clone())
            .collect();
        due.sort_by_key(|key| self.pending[key].deadline);

        due.into_iter()
            .filter_map(|key| self.pending.remove(&key).map(|p| (key, p.value)))
            .collect()
    }

    /// Remove and return every entry regardless of deadline, skipping keys `hold` keeps back.
    pub fn take_all(&mut self, hold: impl Fn(&K) -> bool) -> Vec<(K, V)> {
        let keys: Vec<K> = self.pending.keys().filter(|&k| !hold(k)).cloned().collect();
        keys.into_iter()
            .filter_map(|key| self.pending.remove(&key).map(|p| (key, p.value)))
            .collect()
    }

    /// Drop everything pending. Returns how many entries were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn pending_value(&self, key: &K) -> Option<&V> {
        self.pending.get(key).map(|p| &p.value)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest deadline among pending keys.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(150);

    #[test]
    fn test_initial_state() {
        let d: Debouncer<&str, u8> = Debouncer::new(DELAY);
        assert!(d.is_empty());
        assert_eq!(d.next_deadline(), None);
    }

    #[test]
    fn test_debounce_prevents_immediate_release() {
        let mut d = Debouncer::new(DELAY);
        let t0 = Instant::now();
        d.schedule("a", 1, t0);
        assert!(d.take_due(t0, |_| false).is_empty());
        assert!(d.take_due(t0 + Duration::from_millis(149), |_| false).is_empty());
        assert_eq!(d.take_due(t0 + DELAY, |_| false), vec![("a", 1)]);
        assert!(d.is_empty());
    }

    #[test]
    fn test_burst_keeps_last_value_and_rearms() {
        let mut d = Debouncer::new(DELAY);
        let t0 = Instant::now();
        assert!(!d.schedule("a", 'A', t0));
        assert!(d.schedule("a", 'B', t0 + Duration::from_millis(100)));
        assert!(d.schedule("a", 'C', t0 + Duration::from_millis(200)));

        // Rearmed: first deadline has passed but the key is not due yet
        assert!(d.take_due(t0 + Duration::from_millis(300), |_| false).is_empty());
        assert_eq!(
            d.take_due(t0 + Duration::from_millis(350), |_| false),
            vec![("a", 'C')]
        );
    }

    #[test]
    fn test_keys_do_not_starve_each_other() {
        let mut d = Debouncer::new(DELAY);
        let t0 = Instant::now();
        d.schedule("a", 1, t0);
        // Repeatedly rearming "b" must not delay "a"
        for i in 1..10 {
            d.schedule("b", i, t0 + Duration::from_millis(i * 20));
        }
        let due = d.take_due(t0 + DELAY, |_| false);
        assert_eq!(due, vec![("a", 1)]);
        assert!(d.is_pending(&"b"));
    }

    #[test]
    fn test_hold_keeps_entry_pending() {
        let mut d = Debouncer::new(DELAY);
        let t0 = Instant::now();
        d.schedule("a", 1, t0);
        assert!(d.take_due(t0 + DELAY, |k| *k == "a").is_empty());
        assert_eq!(d.pending_value(&"a"), Some(&1));
    }

    #[test]
    fn test_cancel_all() {
        let mut d = Debouncer::new(DELAY);
        let t0 = Instant::now();
        d.schedule("a", 1, t0);
        d.schedule("b", 2, t0);
        assert_eq!(d.cancel_all(), 2);
        assert!(d.take_all(|_| false).is_empty());
    }
}
