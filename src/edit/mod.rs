//! Inline edits to rows of the filtered set.
//!
//! Each row under edit keeps a snapshot of its five editable fields as they
//! were when editing began plus whatever the user has changed since. A row is
//! dirty while any current value differs from its snapshot. Saving sends one
//! minimal patch per dirty row.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{Expense, ExpensePatch};
use crate::service::{Column, DataService, Query};

/// The five editable fields of an expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub(crate) amount: Decimal,
    pub(crate) note: String,
    pub(crate) expense_type: String,
    pub(crate) date: NaiveDate,
    pub(crate) billed: bool,
}

impl Snapshot {
    pub(crate) fn of(expense: &Expense) -> Self {
        Self {
            amount: expense.amount,
            note: expense.note.clone(),
            expense_type: expense.expense_type.clone(),
            date: expense.date,
            billed: expense.billed,
        }
    }

    /// Overwrite the editable fields of `expense` with these values.
    pub(crate) fn apply_to(&self, expense: &mut Expense) {
        expense.amount = self.amount;
        expense.note = self.note.clone();
        expense.expense_type = self.expense_type.clone();
        expense.date = self.date;
        expense.billed = self.billed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FieldChange {
    Amount(Decimal),
    Note(String),
    Type(String),
    Date(NaiveDate),
    Billed(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EditDiff {
    pub(crate) original: Snapshot,
    pub(crate) amount: Option<Decimal>,
    pub(crate) note: Option<String>,
    pub(crate) expense_type: Option<String>,
    pub(crate) date: Option<NaiveDate>,
    pub(crate) billed: Option<bool>,
}

impl EditDiff {
    fn new(original: Snapshot) -> Self {
        Self {
            original,
            amount: None,
            note: None,
            expense_type: None,
            date: None,
            billed: None,
        }
    }

    /// Current values, each falling back to the snapshot.
    pub(crate) fn current(&self) -> Snapshot {
        Snapshot {
            amount: self.amount.unwrap_or(self.original.amount),
            note: self
                .note
                .clone()
                .unwrap_or_else(|| self.original.note.clone()),
            expense_type: self
                .expense_type
                .clone()
                .unwrap_or_else(|| self.original.expense_type.clone()),
            date: self.date.unwrap_or(self.original.date),
            billed: self.billed.unwrap_or(self.original.billed),
        }
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.current() != self.original
    }

    /// Only the fields whose current value differs from the snapshot.
    pub(crate) fn patch(&self) -> ExpensePatch {
        let current = self.current();
        let original = &self.original;
        ExpensePatch {
            amount: (current.amount != original.amount).then_some(current.amount),
            note: (current.note != original.note).then(|| current.note.clone()),
            expense_type: (current.expense_type != original.expense_type)
                .then(|| current.expense_type.clone()),
            date: (current.date != original.date).then_some(current.date),
            billed: (current.billed != original.billed).then_some(current.billed),
        }
    }

    fn set(&mut self, change: FieldChange) {
        match change {
            FieldChange::Amount(a) => self.amount = Some(a),
            // Notes are compared and saved trimmed.
            FieldChange::Note(n) => self.note = Some(n.trim().to_string()),
            FieldChange::Type(t) => self.expense_type = Some(t),
            FieldChange::Date(d) => self.date = Some(d),
            FieldChange::Billed(b) => self.billed = Some(b),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct EditTracker {
    diffs: BTreeMap<i64, EditDiff>,
    dirty: BTreeSet<i64>,
    editing: BTreeSet<i64>,
}

impl EditTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enter edit mode for a row. An existing snapshot is kept so re-entering
    /// does not lose the original values.
    pub(crate) fn begin_edit(&mut self, expense: &Expense) {
        self.diffs
            .entry(expense.id)
            .or_insert_with(|| EditDiff::new(Snapshot::of(expense)));
        self.editing.insert(expense.id);
    }

    /// Record a change to a row already under edit. Returns false when the row
    /// has no snapshot.
    pub(crate) fn set_field(&mut self, id: i64, change: FieldChange) -> bool {
        let Some(diff) = self.diffs.get_mut(&id) else {
            return false;
        };
        diff.set(change);
        self.recompute(id);
        true
    }

    /// Flip the billing flag. Starts tracking the row if needed, since the
    /// toggle is reachable without entering edit mode.
    pub(crate) fn toggle_billed(&mut self, expense: &Expense) {
        self.diffs
            .entry(expense.id)
            .or_insert_with(|| EditDiff::new(Snapshot::of(expense)));
        if let Some(diff) = self.diffs.get_mut(&expense.id) {
            let current = diff.current().billed;
            diff.billed = Some(!current);
        }
        self.recompute(expense.id);
    }

    /// Leave edit mode; the row keeps displaying its current values and stays
    /// dirty if it was.
    pub(crate) fn end_edit(&mut self, id: i64) -> Option<Snapshot> {
        self.editing.remove(&id);
        self.diffs.get(&id).map(EditDiff::current)
    }

    /// Discard all changes to a row and restore the authoritative values.
    pub(crate) fn cancel(&mut self, expense: &mut Expense, authoritative: &Expense) {
        self.diffs.remove(&expense.id);
        self.dirty.remove(&expense.id);
        self.editing.remove(&expense.id);
        Snapshot::of(authoritative).apply_to(expense);
    }

    fn recompute(&mut self, id: i64) {
        let dirty = self.diffs.get(&id).is_some_and(EditDiff::is_dirty);
        if dirty {
            self.dirty.insert(id);
        } else {
            self.dirty.remove(&id);
        }
    }

    pub(crate) fn is_dirty(&self, id: i64) -> bool {
        self.dirty.contains(&id)
    }

    pub(crate) fn is_editing(&self, id: i64) -> bool {
        self.editing.contains(&id)
    }

    pub(crate) fn has_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub(crate) fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    #[cfg(test)]
    pub(crate) fn diff(&self, id: i64) -> Option<&EditDiff> {
        self.diffs.get(&id)
    }

    /// Values to display for a row: current if tracked, else the row itself.
    pub(crate) fn display(&self, expense: &Expense) -> Snapshot {
        self.diffs
            .get(&expense.id)
            .map(EditDiff::current)
            .unwrap_or_else(|| Snapshot::of(expense))
    }

    /// Non-empty patches for dirty rows, by ascending id.
    pub(crate) fn patches(&self) -> Vec<(i64, ExpensePatch)> {
        self.dirty
            .iter()
            .filter_map(|id| self.diffs.get(id).map(|d| (*id, d.patch())))
            .filter(|(_, p)| !p.is_empty())
            .collect()
    }

    fn forget(&mut self, id: i64) {
        self.diffs.remove(&id);
        self.dirty.remove(&id);
        self.editing.remove(&id);
    }

    pub(crate) fn clear(&mut self) {
        self.diffs.clear();
        self.dirty.clear();
        self.editing.clear();
    }
}

/// Send one update per dirty row, keyed by id and owner.
///
/// Stops at the first failure. Rows saved before it are committed and dropped
/// from the tracker; the failed row and the rest stay pending. On full success
/// all edit state is cleared and the number of saved rows returned.
pub(crate) fn save_all<D: DataService + ?Sized>(
    tracker: &mut EditTracker,
    data: &D,
    owner: &str,
) -> AppResult<usize> {
    let patches = tracker.patches();
    let mut saved = Vec::new();
    for (id, patch) in patches {
        let query = Query::owned_by(owner).eq(Column::Id, id);
        match data.update_expenses(&query, &patch) {
            Ok(_) => saved.push(id),
            Err(source) => {
                warn!(id, saved = saved.len(), error = %source, "batch save stopped");
                for id in &saved {
                    tracker.forget(*id);
                }
                return Err(AppError::PartialSave {
                    saved,
                    failed: id,
                    source,
                });
            }
        }
    }
    info!(count = saved.len(), "edits saved");
    tracker.clear();
    Ok(saved.len())
}

#[cfg(test)]
mod tests;
