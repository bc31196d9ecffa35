use crate::models::access_log::AccessLogEntry;

/// Accumulates parsed documents between flushes.
///
/// The accumulator never flushes on its own: the session asks
/// `should_flush` after every `add` and drains once more at stream end if
/// anything is left.
#[derive(Debug)]
pub struct BatchAccumulator {
    entries: Vec<AccessLogEntry>,
    limit: usize,
}

impl BatchAccumulator {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::with_capacity(limit),
            limit,
        }
    }

    /// Appends a document and returns the new batch size.
    pub fn add(&mut self, entry: AccessLogEntry) -> usize {
        self.entries.push(entry);
        self.entries.len()
    }

    /// True exactly when the batch has reached the configured threshold.
    pub fn should_flush(&self) -> bool {
        self.entries.len() == self.limit
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hands the accumulated documents over and resets to empty.
    pub fn drain(&mut self) -> Vec<AccessLogEntry> {
        std::mem::replace(&mut self.entries, Vec::with_capacity(self.limit))
    }
}
