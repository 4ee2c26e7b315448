use std::{collections::VecDeque, sync::Arc};

/// Snapshot kept on an undo or redo stack.
#[derive(Debug)]
pub struct HistoryEntry<T> {
    /// State to restore.
    pub state: Arc<T>,
    /// Label of the transition that left `state`.
    pub label: Option<String>,
}

/// Bounded undo/redo stacks of previous snapshots.
#[derive(Debug)]
pub struct History<T> {
    undo: VecDeque<HistoryEntry<T>>,
    redo: Vec<HistoryEntry<T>>,
    limit: usize,
}

impl<T> History<T> {
    /// Empty history keeping at most `limit` undo steps. `0` disables recording.
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
        }
    }

    /// Records a forward transition away from `prev`. Clears redo.
    pub fn record(&mut self, prev: Arc<T>, label: Option<String>) {
        self.redo.clear();
        if self.limit == 0 {
            return;
        }
        self.push_undo(HistoryEntry { state: prev, label });
    }

    pub fn pop_undo(&mut self) -> Option<HistoryEntry<T>> {
        self.undo.pop_back()
    }

    pub fn push_undo(&mut self, entry: HistoryEntry<T>) {
        self.undo.push_back(entry);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    pub fn pop_redo(&mut self) -> Option<HistoryEntry<T>> {
        self.redo.pop()
    }

    pub fn push_redo(&mut self, entry: HistoryEntry<T>) {
        self.redo.push(entry);
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u32) -> HistoryEntry<u32> {
        HistoryEntry {
            state: Arc::new(n),
            label: None,
        }
    }

    #[test]
    fn record_clears_redo_even_when_disabled() {
        let mut history = History::new(0);
        history.push_redo(entry(1));

        history.record(Arc::new(2), Some("edit".to_string()));

        assert_eq!(history.redo_len(), 0);
        assert_eq!(history.undo_len(), 0);
    }

    #[test]
    fn record_drops_oldest_past_limit() {
        let mut history = History::new(2);
        for n in 0..3 {
            history.record(Arc::new(n), None);
        }
        assert_eq!(history.undo_len(), 2);
        assert_eq!(history.pop_undo().map(|e| *e.state), Some(2));
        assert_eq!(history.pop_undo().map(|e| *e.state), Some(1));
    }
}
