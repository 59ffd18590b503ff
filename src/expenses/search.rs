use rust_decimal::Decimal;

use crate::calendar::format_display_date;
use crate::generation::{Generation, Ticket};
use crate::models::Expense;

/// Case-insensitive match on note, type, amount text or display date.
/// `term` must already be lowercase.
pub(crate) fn matches_term(expense: &Expense, term: &str) -> bool {
    expense.note.to_lowercase().contains(term)
        || expense.expense_type.to_lowercase().contains(term)
        || expense.amount_text().contains(term)
        || format_display_date(expense.date)
            .to_lowercase()
            .contains(term)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SearchResults {
    pub(crate) rows: Vec<Expense>,
    pub(crate) total: Decimal,
}

impl SearchResults {
    pub(crate) fn count(&self) -> usize {
        self.rows.len()
    }
}

/// The full record set cached for the lifetime of one search view.
#[derive(Debug, Default)]
pub(crate) struct SearchSession {
    records: Option<Vec<Expense>>,
    generation: Generation,
}

impl SearchSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start loading the record set; the returned ticket must accompany the
    /// rows in `complete`.
    pub(crate) fn begin(&mut self) -> Ticket {
        self.generation.issue()
    }

    /// Install loaded rows. Returns false and drops them when a newer load
    /// started or the session closed in the meantime.
    pub(crate) fn complete(&mut self, ticket: Ticket, rows: Vec<Expense>) -> bool {
        if !self.generation.is_current(ticket) {
            return false;
        }
        self.records = Some(rows);
        true
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.records.is_some()
    }

    pub(crate) fn close(&mut self) {
        self.generation.invalidate();
        self.records = None;
    }

    /// Filter the cached set. An empty term returns every record in load order.
    pub(crate) fn search(&self, term: &str) -> SearchResults {
        let Some(records) = self.records.as_ref() else {
            return SearchResults::default();
        };
        let term = term.trim().to_lowercase();
        let rows: Vec<Expense> = if term.is_empty() {
            records.clone()
        } else {
            records
                .iter()
                .filter(|e| matches_term(e, &term))
                .cloned()
                .collect()
        };
        let total = rows.iter().map(|e| e.amount).sum();
        SearchResults { rows, total }
    }

    /// Drop a deleted record from the cache.
    pub(crate) fn remove(&mut self, id: i64) {
        if let Some(records) = self.records.as_mut() {
            records.retain(|e| e.id != id);
        }
    }
}
