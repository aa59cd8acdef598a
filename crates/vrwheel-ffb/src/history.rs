//! Fixed-length history of smoothed centering magnitudes

use std::collections::VecDeque;

use crate::constants::HISTORY_LEN;

/// Ring of the most recent smoothed outputs, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedHistory {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl Default for SmoothedHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_LEN)
    }
}

impl SmoothedHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn latest(&self) -> Option<f32> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// The newest `n` samples, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = f32> + '_ {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_drops_oldest() {
        let mut history = SmoothedHistory::with_capacity(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            history.push(v);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.recent(3).collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
        assert_eq!(history.latest(), Some(4.0));
    }

    #[test]
    fn test_recent_shorter_than_window() {
        let mut history = SmoothedHistory::default();
        history.push(0.5);
        assert_eq!(history.recent(30).count(), 1);
    }
}
