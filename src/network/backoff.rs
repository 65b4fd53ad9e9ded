use crate::util::rand::{DiscreteDistribution, Rng};

pub const DEFAULT_MAX_ATTEMPT_COUNT: u32 = 3;

/// Largest exponent the window may grow to while still fitting in a `u32`.
const MAX_WINDOW_EXPONENT: u32 = 31;

/// Truncated binary exponential backoff.
///
/// After the k-th failed attempt a slot is drawn uniformly from
/// `[0, 2^min(k, max_attempt_count) - 1]`. A manually chosen slot, if set,
/// replaces the random draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSelector {
    failed_attempt_count: u32,
    max_attempt_count: u32,
    manual_slot: Option<u32>,
    last_slot: Option<u32>,
}

impl BackoffSelector {
    #[must_use]
    pub fn new(max_attempt_count: u32) -> BackoffSelector {
        BackoffSelector {
            failed_attempt_count: 0,
            max_attempt_count: max_attempt_count.min(MAX_WINDOW_EXPONENT),
            manual_slot: None,
            last_slot: None,
        }
    }

    pub fn next_slot_time(&mut self, rng: &mut Rng) -> u32 {
        self.failed_attempt_count = self.failed_attempt_count.saturating_add(1);
        let choice = match self.manual_slot {
            Some(value) => DiscreteDistribution::Always { value },
            None => DiscreteDistribution::Uniform {
                min: 0,
                max: self.window(),
            },
        };
        let slot = rng.sample(&choice);
        self.last_slot = Some(slot);
        slot
    }

    pub fn reset(&mut self) {
        self.failed_attempt_count = 0;
        self.manual_slot = None;
        self.last_slot = None;
    }

    pub fn set_manual_slot(&mut self, slot: Option<u32>) {
        self.manual_slot = slot;
    }

    #[must_use]
    pub const fn manual_slot(&self) -> Option<u32> {
        self.manual_slot
    }

    #[must_use]
    pub const fn failed_attempt_count(&self) -> u32 {
        self.failed_attempt_count
    }

    #[must_use]
    pub const fn max_attempt_count(&self) -> u32 {
        self.max_attempt_count
    }

    /// Slot chosen by the most recent draw.
    #[must_use]
    pub const fn last_slot(&self) -> Option<u32> {
        self.last_slot
    }

    /// Number of slots the most recent draw could pick from, zero if
    /// nothing has been drawn since the last reset.
    #[must_use]
    pub fn active_slots(&self) -> u32 {
        if self.failed_attempt_count == 0 {
            0
        } else {
            self.window()
        }
    }

    fn window(&self) -> u32 {
        1 << self.failed_attempt_count.min(self.max_attempt_count)
    }
}

impl Default for BackoffSelector {
    fn default() -> Self {
        BackoffSelector::new(DEFAULT_MAX_ATTEMPT_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use crate::util::rand::Rng;

    use super::BackoffSelector;

    #[test]
    fn slot_stays_inside_window() {
        let mut rng = Rng::from_seed(42);
        for _ in 0..200 {
            let mut backoff = BackoffSelector::default();
            for k in 1..=6u32 {
                let slot = backoff.next_slot_time(&mut rng);
                let window = 1 << k.min(3);
                assert!(slot < window, "attempt {k}: slot {slot} outside window {window}");
                assert_eq!(backoff.failed_attempt_count(), k);
                assert_eq!(backoff.active_slots(), window);
                assert_eq!(backoff.last_slot(), Some(slot));
            }
        }
    }

    #[test]
    fn truncated_window_is_fully_used() {
        let mut rng = Rng::from_seed(3);
        let mut backoff = BackoffSelector::default();
        for _ in 0..3 {
            backoff.next_slot_time(&mut rng);
        }
        let mut seen = [false; 8];
        for _ in 0..500 {
            seen[backoff.next_slot_time(&mut rng) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn reset_starts_over() {
        let mut rng = Rng::from_seed(5);
        let mut backoff = BackoffSelector::default();
        for _ in 0..5 {
            backoff.next_slot_time(&mut rng);
        }
        backoff.set_manual_slot(Some(6));
        backoff.reset();

        assert_eq!(backoff.failed_attempt_count(), 0);
        assert_eq!(backoff.active_slots(), 0);
        assert_eq!(backoff.manual_slot(), None);
        assert_eq!(backoff.last_slot(), None);

        for _ in 0..50 {
            let mut fresh = backoff.clone();
            assert!(fresh.next_slot_time(&mut rng) < 2);
            assert_eq!(fresh.failed_attempt_count(), 1);
        }
    }

    #[test]
    fn manual_slot_overrides_draw() {
        let mut rng = Rng::from_seed(9);
        let mut backoff = BackoffSelector::default();
        backoff.set_manual_slot(Some(5));
        assert_eq!(backoff.next_slot_time(&mut rng), 5);
        assert_eq!(backoff.next_slot_time(&mut rng), 5);
        assert_eq!(backoff.failed_attempt_count(), 2);

        backoff.set_manual_slot(None);
        assert!(backoff.next_slot_time(&mut rng) < 8);
    }

    #[test]
    fn zero_max_attempts_always_picks_first_slot() {
        let mut rng = Rng::from_seed(11);
        let mut backoff = BackoffSelector::new(0);
        for _ in 0..20 {
            assert_eq!(backoff.next_slot_time(&mut rng), 0);
        }
        assert_eq!(backoff.failed_attempt_count(), 20);
    }
}
