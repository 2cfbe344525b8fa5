//! Navigable History over a Shared Cell
//!
//! A HistoryStore keeps an ordered history of items, a cursor, and an
//! optional pending item, all inside a single [`GlobalState`] cell so every
//! mounted handle observes the same timeline.
//!
//! # The Pending Item
//!
//! A pending item is a navigation that has been announced but not yet
//! committed. While one exists, it is the current item, and the first
//! matching `push` commits it (or merely clears the pending marker if it
//! was already committed at the cursor). A `push` that does not match the
//! pending item is dropped with a warning rather than corrupting the
//! timeline.
//!
//! # Forward Trimming
//!
//! Committing a new item while the cursor sits behind the tail discards
//! everything past the cursor first, the way a browser history does.

use std::fmt::Debug;
use std::sync::Arc;

use tracing::warn;

use crate::error::Error;

use super::global::{GlobalState, StateHandle};

/// Predicate deciding whether a pushed item corresponds to the pending one.
type MatchPredicate<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// The shared timeline state.
pub struct HistoryState<T> {
    pub history: Vec<T>,
    pub pending: Option<T>,
    pub current_position: usize,
}

impl<T> HistoryState<T> {
    fn empty() -> Self {
        Self {
            history: Vec::new(),
            pending: None,
            current_position: 0,
        }
    }

    /// Cursor position with the pending item counted in.
    fn effective_position(&self) -> usize {
        self.current_position + usize::from(self.pending.is_some())
    }
}

impl<T: Clone> Clone for HistoryState<T> {
    fn clone(&self) -> Self {
        Self {
            history: self.history.clone(),
            pending: self.pending.clone(),
            current_position: self.current_position,
        }
    }
}

impl<T: Debug> Debug for HistoryState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryState")
            .field("history", &self.history)
            .field("pending", &self.pending)
            .field("current_position", &self.current_position)
            .finish()
    }
}

fn trim_forward<T>(mut history: Vec<T>, keep: usize) -> Vec<T> {
    history.truncate(keep);
    history
}

/// A shared, navigable history of items.
///
/// Cloning shares the timeline. The match predicate given at construction
/// decides whether a pushed item corresponds to the currently pending one
/// (e.g. comparing route paths while ignoring volatile query parts).
pub struct HistoryStore<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    state: GlobalState<HistoryState<T>>,
    matches: MatchPredicate<T>,
}

impl<T> HistoryStore<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create an empty history with the given match predicate.
    pub fn new<F>(match_predicate: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            state: GlobalState::new(HistoryState::empty()),
            matches: Arc::new(match_predicate),
        }
    }

    /// Mount a consumer onto the timeline.
    pub fn mount(&self) -> HistoryHandle<T> {
        HistoryHandle {
            handle: self.state.mount(),
            matches: Arc::clone(&self.matches),
        }
    }
}

impl<T> Clone for HistoryStore<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            matches: Arc::clone(&self.matches),
        }
    }
}

/// A mounted view of a [`HistoryStore`].
///
/// All navigation goes through the shared cell, so every handle of the same
/// store observes the same sequence of transitions.
pub struct HistoryHandle<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    handle: StateHandle<HistoryState<T>>,
    matches: MatchPredicate<T>,
}

impl<T> HistoryHandle<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn snapshot(&self) -> HistoryState<T> {
        self.handle.value()
    }

    /// Get the committed history, oldest first.
    pub fn history(&self) -> Vec<T> {
        self.snapshot().history
    }

    /// Get the current item: the pending one if any, else the item at the
    /// cursor.
    pub fn current(&self) -> Option<T> {
        let state = self.snapshot();
        let position = state.effective_position();
        state
            .pending
            .clone()
            .or_else(|| state.history.get(position).cloned())
    }

    /// Get the item just behind the current one, if any.
    pub fn previous(&self) -> Option<T> {
        let state = self.snapshot();
        let position = state.effective_position();
        if position == 0 {
            return None;
        }
        state.history.get(position - 1).cloned()
    }

    /// Get the item just ahead of the current one, if any.
    pub fn next(&self) -> Option<T> {
        let state = self.snapshot();
        state.history.get(state.effective_position() + 1).cloned()
    }

    /// Commit an item at the head of the timeline.
    ///
    /// If a pending item exists, the push must match it (per the store's
    /// predicate); a mismatching push is dropped with a warning. A push of
    /// an already-committed pending item only clears the pending marker.
    /// Otherwise, forward history is trimmed, the item appended, and the
    /// cursor moved to it.
    pub fn push(&self, item: T) {
        let state = self.snapshot();

        if let Some(pending) = &state.pending {
            if !(self.matches)(pending, &item) {
                warn!("push dropped: item does not match the pending entry");
                return;
            }

            if state.history.get(state.current_position) == Some(pending) {
                self.handle.set(HistoryState {
                    history: state.history,
                    pending: None,
                    current_position: state.current_position,
                });
                return;
            }
        }

        let mut history = if state.history.len() == state.current_position + 1 {
            state.history
        } else {
            trim_forward(state.history, state.current_position + 1)
        };
        history.push(item);
        let current_position = history.len() - 1;

        self.handle.set(HistoryState {
            history,
            pending: None,
            current_position,
        });
    }

    /// Replace the current item with a new pending one.
    ///
    /// Steps the cursor back unless an uncommitted pending item absorbs the
    /// step, trims forward history, and installs `item` as pending.
    pub fn replace(&self, item: T) {
        let state = self.snapshot();

        let (current_position, keep) = if state.pending.is_some() {
            (state.current_position, state.current_position + 1)
        } else if state.current_position == 0 {
            // Replacing the very first entry empties the timeline.
            (0, 0)
        } else {
            (state.current_position - 1, state.current_position)
        };

        self.handle.set(HistoryState {
            history: trim_forward(state.history, keep),
            pending: Some(item),
            current_position,
        });
    }

    /// Install a pending item without touching the committed history.
    pub fn set_pending(&self, item: T) {
        let state = self.snapshot();

        self.handle.set(HistoryState {
            history: state.history,
            pending: Some(item),
            current_position: state.current_position,
        });
    }

    /// Move the cursor to the first committed entry equal to `item`.
    ///
    /// The target is re-installed as pending, awaiting its confirming push.
    /// Fails with [`Error::HistoryItemNotFound`] if no entry matches.
    pub fn go_to(&self, item: &T) -> Result<(), Error> {
        let state = self.snapshot();

        let index = state
            .history
            .iter()
            .position(|entry| entry == item)
            .ok_or(Error::HistoryItemNotFound)?;
        let target = state.history[index].clone();

        self.handle.set(HistoryState {
            history: state.history,
            pending: Some(target),
            current_position: index,
        });
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> HistoryStore<String> {
        HistoryStore::new(|a: &String, b: &String| a == b)
    }

    fn item(name: &str) -> String {
        name.to_string()
    }

    #[test]
    fn push_commits_and_moves_the_cursor() {
        let history = store().mount();

        history.push(item("a"));
        history.push(item("b"));

        assert_eq!(history.history(), vec![item("a"), item("b")]);
        assert_eq!(history.current(), Some(item("b")));
        assert_eq!(history.previous(), Some(item("a")));
        assert_eq!(history.next(), None);
    }

    #[test]
    fn handles_of_one_store_share_the_timeline() {
        let store = store();
        let handle_a = store.mount();
        let handle_b = store.mount();

        handle_a.push(item("a"));

        assert_eq!(handle_b.current(), Some(item("a")));
        assert_eq!(handle_b.history(), vec![item("a")]);
    }

    #[test]
    fn empty_history_has_no_items() {
        let history = store().mount();

        assert_eq!(history.current(), None);
        assert_eq!(history.previous(), None);
        assert_eq!(history.next(), None);
        assert!(history.history().is_empty());
    }

    #[test]
    fn pending_item_becomes_current() {
        let history = store().mount();

        history.push(item("a"));
        history.set_pending(item("b"));

        assert_eq!(history.current(), Some(item("b")));
        assert_eq!(history.previous(), Some(item("a")));
        assert_eq!(history.history(), vec![item("a")]);
    }

    #[test]
    fn matching_push_commits_the_pending_item() {
        let history = store().mount();

        history.push(item("a"));
        history.set_pending(item("b"));
        history.push(item("b"));

        assert_eq!(history.history(), vec![item("a"), item("b")]);
        assert_eq!(history.current(), Some(item("b")));
    }

    #[test]
    fn mismatching_push_is_dropped() {
        let history = store().mount();

        history.push(item("a"));
        history.set_pending(item("b"));
        history.push(item("c"));

        // Timeline untouched, pending still in place.
        assert_eq!(history.history(), vec![item("a")]);
        assert_eq!(history.current(), Some(item("b")));
    }

    #[test]
    fn push_after_go_to_only_clears_the_pending_marker() {
        let history = store().mount();

        history.push(item("a"));
        history.push(item("b"));
        history.go_to(&item("a")).unwrap();

        // The target is already committed at the cursor; its confirming
        // push must not duplicate it.
        history.push(item("a"));

        assert_eq!(history.history(), vec![item("a"), item("b")]);
        assert_eq!(history.current(), Some(item("a")));
        assert_eq!(history.next(), Some(item("b")));
    }

    #[test]
    fn push_behind_the_tail_trims_forward_history() {
        let history = store().mount();

        history.push(item("a"));
        history.push(item("b"));
        history.push(item("c"));
        history.go_to(&item("a")).unwrap();
        history.push(item("a"));

        history.push(item("d"));

        assert_eq!(history.history(), vec![item("a"), item("d")]);
        assert_eq!(history.current(), Some(item("d")));
    }

    #[test]
    fn replace_installs_a_new_pending_item() {
        let history = store().mount();

        history.push(item("a"));
        history.push(item("b"));
        history.replace(item("c"));

        assert_eq!(history.current(), Some(item("c")));
        assert_eq!(history.previous(), Some(item("a")));

        history.push(item("c"));
        assert_eq!(history.history(), vec![item("a"), item("c")]);
    }

    #[test]
    fn replace_of_the_first_entry_empties_the_timeline() {
        let history = store().mount();

        history.push(item("a"));
        history.replace(item("b"));

        assert_eq!(history.history(), Vec::<String>::new());
        assert_eq!(history.current(), Some(item("b")));
        assert_eq!(history.previous(), None);

        history.push(item("b"));
        assert_eq!(history.history(), vec![item("b")]);
        assert_eq!(history.current(), Some(item("b")));
    }

    #[test]
    fn go_to_unknown_item_fails() {
        let history = store().mount();

        history.push(item("a"));

        assert_eq!(
            history.go_to(&item("missing")),
            Err(Error::HistoryItemNotFound)
        );
    }

    #[test]
    fn go_to_navigates_backwards_and_forwards() {
        let history = store().mount();

        history.push(item("a"));
        history.push(item("b"));
        history.push(item("c"));

        history.go_to(&item("b")).unwrap();
        history.push(item("b"));

        assert_eq!(history.current(), Some(item("b")));
        assert_eq!(history.previous(), Some(item("a")));
        assert_eq!(history.next(), Some(item("c")));
        assert_eq!(history.history(), vec![item("a"), item("b"), item("c")]);
    }
}
