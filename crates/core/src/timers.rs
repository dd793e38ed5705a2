use std::time::Instant;

/// Cancellable one-shot deadlines keyed by `K`. At most one deadline per key;
/// scheduling a key again replaces its deadline.
///
/// Nothing sleeps here. The owner calls [`TimerSet::take_due`] with the current
/// time and acts on whatever has expired.
#[derive(Debug)]
pub struct TimerSet<K> {
    pending: Vec<(K, Instant)>,
}

impl<K: Copy + PartialEq> TimerSet<K> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    pub fn schedule(&mut self, key: K, at: Instant) {
        self.cancel(key);
        self.pending.push((key, at));
    }

    pub fn cancel(&mut self, key: K) {
        self.pending.retain(|(k, _)| *k != key);
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_scheduled(&self, key: K) -> bool {
        self.pending.iter().any(|(k, _)| *k == key)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|(_, at)| *at).min()
    }

    /// Removes and returns the earliest expired timer, if any.
    pub fn take_due(&mut self, now: Instant) -> Option<K> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (_, at))| *at <= now)
            .min_by_key(|(_, (_, at))| *at)
            .map(|(index, _)| index)?;
        Some(self.pending.remove(index).0)
    }
}

impl<K: Copy + PartialEq> Default for TimerSet<K> {
    fn default() -> Self {
        Self::new()
    }
}
