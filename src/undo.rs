//! Undo/Redo history for panel edits.
//!
//! Editing panels hand the controller opaque [`UndoEntry`] values. The
//! controller only sequences `apply`/`revert` calls; it never looks inside.

use std::collections::VecDeque;
use std::fmt;

use crate::constants::UNDO_HISTORY_LIMIT;

/// A reversible edit.
///
/// The edit itself has already happened when it is recorded; `apply` is only
/// called again on redo.
pub trait UndoEntry {
    /// Re-apply the edit.
    fn apply(&mut self);

    /// Reverse the edit.
    fn revert(&mut self);

    /// Human-readable label for menus and logs.
    fn description(&self) -> String {
        "Edit".to_string()
    }
}

/// Linear command history with a cursor.
///
/// Entries before the cursor are applied, entries at or after it are undone
/// and available for redo until the next [`record`](Self::record).
pub struct UndoController {
    entries: VecDeque<Box<dyn UndoEntry>>,
    cursor: usize,
    max_history: usize,
}

impl UndoController {
    pub fn new() -> Self {
        Self::with_limit(UNDO_HISTORY_LIMIT)
    }

    /// Create with a custom history limit.
    pub fn with_limit(max_history: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            max_history: max_history.max(1),
        }
    }

    /// Append an already-applied edit, discarding anything undone.
    pub fn record(&mut self, entry: Box<dyn UndoEntry>) {
        log::debug!("Undo: recorded '{}'", entry.description());
        self.entries.truncate(self.cursor);
        self.entries.push_back(entry);

        while self.entries.len() > self.max_history {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len();
    }

    /// Revert the entry before the cursor. Returns false at the start of history.
    pub fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let entry = &mut self.entries[self.cursor];
        log::debug!("Undo: '{}'", entry.description());
        entry.revert();
        true
    }

    /// Re-apply the entry at the cursor. Returns false at the end of history.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.entries.get_mut(self.cursor) else {
            return false;
        };
        log::debug!("Redo: '{}'", entry.description());
        entry.apply();
        self.cursor += 1;
        true
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("Undo history cleared ({} entries)", self.entries.len());
        }
        self.entries.clear();
        self.cursor = 0;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Label of the entry [`undo`](Self::undo) would revert.
    pub fn undo_description(&self) -> Option<String> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(|e| e.description())
    }

    /// Label of the entry [`redo`](Self::redo) would apply.
    pub fn redo_description(&self) -> Option<String> {
        self.entries.get(self.cursor).map(|e| e.description())
    }

    /// Total entries, applied and undone.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl Default for UndoController {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UndoController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoController")
            .field("entries", &self.entries.len())
            .field("cursor", &self.cursor)
            .field("max_history", &self.max_history)
            .finish()
    }
}
