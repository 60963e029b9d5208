use std::{collections::VecDeque, time::Duration};

use tokio::time::Instant;

/// Sliding window of fault timestamps of one cell.
#[derive(Debug)]
pub(crate) struct Recoverings {
    times: VecDeque<Instant>,
    max_faults: usize,
    window: Duration,
}

impl Recoverings {
    pub fn new(max_faults: usize, window: Duration) -> Self {
        let max_faults = max_faults.max(1);
        Self {
            times: VecDeque::with_capacity(max_faults),
            max_faults,
            window,
        }
    }

    pub fn record(&mut self, at: Instant) {
        self.times.push_back(at);
    }

    /// True when the last `max_faults` faults all happened within the window.
    pub fn is_too_frequent(&self) -> bool {
        let len = self.times.len();
        if len < self.max_faults {
            return false;
        }
        match (self.times.get(len - self.max_faults), self.times.back()) {
            (Some(first), Some(last)) => last.duration_since(*first) <= self.window,
            _ => false,
        }
    }

    /// Keeps only the most recent `max_faults` entries.
    pub fn trim(&mut self) {
        while self.times.len() > self.max_faults {
            self.times.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }
}
