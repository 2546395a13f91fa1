//! Snapshot history with a movable cursor
//!
//! Every structural change pushes a full immutable snapshot. Undo and redo
//! only move the cursor; snapshots are never mutated. Pushing while the
//! cursor is behind the newest snapshot discards the redo branch first.

use std::sync::Arc;

/// Default number of snapshots kept
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Ordered snapshots plus a cursor
///
/// Invariant: `cursor < snapshots.len()` and the history is never empty.
#[derive(Debug, Clone)]
pub struct History<T> {
    snapshots: Vec<Arc<[T]>>,
    cursor: usize,
    limit: usize,
}

impl<T: Clone> History<T> {
    /// Create a history whose only snapshot is `initial`
    ///
    /// `limit` is clamped to at least 1.
    pub fn new(initial: &[T], limit: usize) -> Self {
        Self {
            snapshots: vec![Arc::from(initial)],
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Record a new snapshot after the cursor
    pub fn push(&mut self, state: &[T]) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(Arc::from(state));
        if self.snapshots.len() > self.limit {
            let excess = self.snapshots.len() - self.limit;
            self.snapshots.drain(..excess);
        }
        self.cursor = self.snapshots.len() - 1;
    }

    /// Step back; returns the snapshot now current, or None at the oldest
    pub fn undo(&mut self) -> Option<Arc<[T]>> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    /// Step forward; returns the snapshot now current, or None at the newest
    pub fn redo(&mut self) -> Option<Arc<[T]>> {
        if self.cursor + 1 >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }

    /// Snapshot at the cursor
    pub fn current(&self) -> Arc<[T]> {
        Arc::clone(&self.snapshots[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Cursor position
    pub fn index(&self) -> usize {
        self.cursor
    }

    /// Number of stored snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Drop everything and start over from `initial`
    pub fn reset(&mut self, initial: &[T]) {
        self.snapshots = vec![Arc::from(initial)];
        self.cursor = 0;
    }
}
