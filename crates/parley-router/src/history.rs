//! Bounded buffer of the most recent chat lines, replayed on login.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Default number of lines kept.
pub const DEFAULT_HISTORY_LINES: usize = 20;

/// A FIFO of at most `capacity` lines; appending to a full buffer evicts
/// the oldest line.
///
/// Lines are stored without their terminator; the transport adds it when
/// the history is replayed.
#[derive(Debug)]
pub struct HistoryBuffer {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends one line, dropping trailing newlines first.
    pub fn append(&self, line: &str) {
        if self.capacity == 0 {
            return;
        }
        let mut lines = self.lines.lock();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.trim_end_matches(['\r', '\n']).to_string());
    }

    /// Returns the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LINES)
    }
}
