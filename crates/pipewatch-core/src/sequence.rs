//! Observable ordered sequence.
//!
//! [`ObservableSequence`] is the single container used for every node list
//! and for the pipeline's node collection. It exposes exactly two primitive
//! mutations, a length change and a write to a materialized slot, and derives
//! every other operation (`push`, `insert`, `remove`, `truncate`, ...) from
//! them. Each primitive notifies the installed listener synchronously, so no
//! mutation path can skip instrumentation.
//!
//! # Slot model
//!
//! Indices below `len` are *materialized*: writes to them emit
//! [`SequenceChange::Update`]. Indices at or beyond `len` may hold an
//! unobserved placeholder value, written silently while an operation is
//! under way. When the length grows over such an index the placeholder is
//! captured as the slot's initial value and reported in the
//! [`SequenceChange::Add`] record.

use std::fmt;

use crate::error::CoreError;

/// A low-level change record produced by an [`ObservableSequence`].
///
/// `value` is the slot content right after the change; `old` is the content
/// it replaced. `None` means the slot is empty.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceChange<T> {
    /// A slot was materialized by a length expansion.
    Add { index: usize, value: Option<T> },
    /// A materialized slot was written.
    Update {
        index: usize,
        old: Option<T>,
        value: Option<T>,
    },
    /// A slot was released by a length contraction.
    Delete { index: usize, old: Option<T> },
}

impl<T> SequenceChange<T> {
    /// The slot index this change refers to.
    pub fn index(&self) -> usize {
        match self {
            SequenceChange::Add { index, .. }
            | SequenceChange::Update { index, .. }
            | SequenceChange::Delete { index, .. } => *index,
        }
    }
}

/// Listener invoked synchronously for every change.
pub type SequenceListener<T> = Box<dyn FnMut(&SequenceChange<T>)>;

/// Ordered, index-addressable container whose mutations are all observable.
pub struct ObservableSequence<T> {
    /// Materialized slots followed by any pending placeholders.
    slots: Vec<Option<T>>,
    len: usize,
    listener: Option<SequenceListener<T>>,
}

impl<T: Clone> ObservableSequence<T> {
    /// Creates an empty, unobserved sequence.
    pub fn new() -> Self {
        ObservableSequence {
            slots: Vec::new(),
            len: 0,
            listener: None,
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Number of materialized slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Value at `index`, or `None` if out of range or the slot is empty.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        self.slots[index].as_ref()
    }

    /// Iterates over materialized slots, empty ones included.
    pub fn slots(&self) -> impl Iterator<Item = Option<&T>> + '_ {
        self.slots[..self.len].iter().map(Option::as_ref)
    }

    /// Iterates over the non-empty values in index order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.slots[..self.len].iter().flatten()
    }

    /// Returns `true` once a listener is installed.
    pub fn is_observed(&self) -> bool {
        self.listener.is_some()
    }

    // -----------------------------------------------------------------------
    // Listener installation
    // -----------------------------------------------------------------------

    /// Installs `listener` and reports every existing slot as an `Add`, in
    /// index order, so the listener starts from a complete picture.
    pub fn observe(&mut self, listener: SequenceListener<T>) -> Result<(), CoreError> {
        self.listen(listener)?;
        for index in 0..self.len {
            let value = self.slots[index].clone();
            self.notify(SequenceChange::Add { index, value });
        }
        Ok(())
    }

    /// Installs `listener` without replaying existing slots.
    pub fn listen(&mut self, listener: SequenceListener<T>) -> Result<(), CoreError> {
        if self.listener.is_some() {
            return Err(CoreError::AlreadyObserved);
        }
        self.listener = Some(listener);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Primitive mutations
    // -----------------------------------------------------------------------

    /// Changes the length.
    ///
    /// Contraction deletes from the highest index down to `new_len`;
    /// expansion materializes from the current length up to `new_len - 1`.
    pub fn set_len(&mut self, new_len: usize) {
        if new_len < self.len {
            while self.len > new_len {
                let index = self.len - 1;
                let old = self.slots[index].take();
                self.len = index;
                self.notify(SequenceChange::Delete { index, old });
            }
            // Released slots become plain empty storage again.
            self.slots.truncate(new_len);
            return;
        }

        if new_len > self.slots.len() {
            self.slots.resize(new_len, None);
        }
        for index in self.len..new_len {
            self.len = index + 1;
            let value = self.slots[index].clone();
            self.notify(SequenceChange::Add { index, value });
        }
        self.len = new_len;
    }

    /// Writes `value` into the materialized slot at `index`, returning the
    /// previous content. Notifies even when the value is unchanged.
    pub fn set(&mut self, index: usize, value: T) -> Result<Option<T>, CoreError> {
        self.set_slot(index, Some(value))
    }

    /// Empties the materialized slot at `index` without shrinking.
    pub fn unset(&mut self, index: usize) -> Result<Option<T>, CoreError> {
        self.set_slot(index, None)
    }

    /// Slot-level write: `None` empties the slot.
    pub fn set_slot(&mut self, index: usize, value: Option<T>) -> Result<Option<T>, CoreError> {
        if index >= self.len {
            return Err(CoreError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        let old = std::mem::replace(&mut self.slots[index], value.clone());
        self.notify(SequenceChange::Update {
            index,
            old: old.clone(),
            value,
        });
        Ok(old)
    }

    // -----------------------------------------------------------------------
    // Derived mutations
    // -----------------------------------------------------------------------

    /// Appends `value`: stages it as a placeholder, then grows by one.
    pub fn push(&mut self, value: T) {
        let at = self.len;
        self.write(at, Some(value));
        self.set_len(at + 1);
    }

    /// Removes and returns the last value.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let old = self.slots[self.len - 1].clone();
        self.set_len(self.len - 1);
        old
    }

    /// Inserts `value` at `index`, shifting later slots up.
    ///
    /// Shifted slots are rewritten from the top down, the new value is
    /// written at `index`, and the length grows last, so the listener sees
    /// updates followed by one `Add` at the old length.
    pub fn insert(&mut self, index: usize, value: T) -> Result<(), CoreError> {
        if index > self.len {
            return Err(CoreError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        let len = self.len;
        for from in (index..len).rev() {
            let moved = self.slots[from].clone();
            self.write(from + 1, moved);
        }
        self.write(index, Some(value));
        self.set_len(len + 1);
        Ok(())
    }

    /// Removes the value at `index`, shifting later slots down.
    ///
    /// Emits one `Update` per shifted slot and a `Delete` for the last slot.
    pub fn remove(&mut self, index: usize) -> Result<Option<T>, CoreError> {
        if index >= self.len {
            return Err(CoreError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        let removed = self.slots[index].clone();
        for from in index + 1..self.len {
            let moved = self.slots[from].clone();
            self.write(from - 1, moved);
        }
        self.set_len(self.len - 1);
        Ok(removed)
    }

    /// Shortens the sequence to `len` slots; no-op when already shorter.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.set_len(len);
        }
    }

    /// Removes every slot, highest index first.
    pub fn clear(&mut self) {
        self.set_len(0);
    }

    /// Routes a write either through `set` (materialized slot) or into the
    /// placeholder area (at or beyond `len`).
    fn write(&mut self, index: usize, value: Option<T>) {
        if index < self.len {
            let old = std::mem::replace(&mut self.slots[index], value.clone());
            self.notify(SequenceChange::Update { index, old, value });
        } else {
            if index >= self.slots.len() {
                self.slots.resize(index + 1, None);
            }
            self.slots[index] = value;
        }
    }

    fn notify(&mut self, change: SequenceChange<T>) {
        if let Some(listener) = self.listener.as_mut() {
            listener(&change);
        }
    }
}

impl<T: Clone> Default for ObservableSequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> FromIterator<T> for ObservableSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let slots: Vec<Option<T>> = iter.into_iter().map(Some).collect();
        ObservableSequence {
            len: slots.len(),
            slots,
            listener: None,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableSequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableSequence")
            .field("slots", &&self.slots[..self.len])
            .field("observed", &self.listener.is_some())
            .finish()
    }
}
