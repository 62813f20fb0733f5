use std::collections::VecDeque;

/// Minimum over the last `window_length` inserted values.
///
/// Keeps a monotonic queue, so both insert and lookup are amortized O(1).
#[derive(Debug, Clone)]
pub(crate) struct WindowedMinFilter<T> {
    window_length: usize,
    inserted: u64,
    /// (insert index, value), values strictly increasing front to back.
    candidates: VecDeque<(u64, T)>,
}

impl<T: Copy + Ord> WindowedMinFilter<T> {
    pub(crate) fn new(window_length: usize) -> Self {
        Self {
            window_length: window_length.max(1),
            inserted: 0,
            candidates: VecDeque::new(),
        }
    }

    pub(crate) fn insert(&mut self, value: T) {
        while self.candidates.back().is_some_and(|&(_, v)| v >= value) {
            self.candidates.pop_back();
        }
        self.candidates.push_back((self.inserted, value));
        self.inserted += 1;

        let oldest_in_window = self.inserted.saturating_sub(self.window_length as u64);
        while self
            .candidates
            .front()
            .is_some_and(|&(index, _)| index < oldest_in_window)
        {
            self.candidates.pop_front();
        }
    }

    /// `None` until the first value has been inserted.
    pub(crate) fn min(&self) -> Option<T> {
        self.candidates.front().map(|&(_, v)| v)
    }
}
