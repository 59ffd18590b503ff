//! The filtered record set and everything derived from it.

mod chart;
mod export;

pub(crate) use chart::{bubble_points, category_totals, cumulative_daily, ChartKind};
pub(crate) use export::{export_csv, ExportOutcome};

use chrono::NaiveDate;
use tracing::debug;

use crate::generation::{Generation, Ticket};
use crate::models::{BillingFilter, Expense};
use crate::service::{Column, DataService, Order, Query, ServiceResult};

/// Predicates of the analytics filter bar. `None` means unbounded / any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FilterCriteria {
    pub(crate) start: Option<NaiveDate>,
    pub(crate) end: Option<NaiveDate>,
    pub(crate) billing: BillingFilter,
    pub(crate) expense_type: Option<String>,
}

impl FilterCriteria {
    pub(crate) fn query(&self, owner: &str) -> Query {
        let mut q = Query::owned_by(owner);
        if let Some(start) = self.start {
            q = q.gte(Column::Date, start);
        }
        if let Some(end) = self.end {
            q = q.lte(Column::Date, end);
        }
        if let Some(billed) = self.billing.as_flag() {
            q = q.eq(Column::Billed, billed);
        }
        if let Some(ref t) = self.expense_type {
            q = q.eq(Column::Type, t.as_str());
        }
        q.order(Column::Date, Order::Desc)
    }
}

/// Run the filter against the data service, newest first.
pub(crate) fn filter_records<D: DataService + ?Sized>(
    data: &D,
    owner: &str,
    criteria: &FilterCriteria,
) -> ServiceResult<Vec<Expense>> {
    let rows = data.select_expenses(&criteria.query(owner))?;
    debug!(count = rows.len(), ?criteria, "filter applied");
    Ok(rows)
}

/// The shared filtered set, guarded against stale loads.
#[derive(Debug, Default)]
pub(crate) struct FilterSession {
    pub(crate) criteria: FilterCriteria,
    rows: Vec<Expense>,
    generation: Generation,
}

impl FilterSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin(&mut self) -> Ticket {
        self.generation.issue()
    }

    /// Install rows for `ticket`. Stale tickets are rejected and the current
    /// set kept.
    pub(crate) fn complete(&mut self, ticket: Ticket, rows: Vec<Expense>) -> bool {
        if !self.generation.is_current(ticket) {
            debug!("discarding stale filter result");
            return false;
        }
        self.rows = rows;
        true
    }

    pub(crate) fn rows(&self) -> &[Expense] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Expense] {
        &mut self.rows
    }

    pub(crate) fn get(&self, id: i64) -> Option<&Expense> {
        self.rows.iter().find(|e| e.id == id)
    }

    pub(crate) fn remove(&mut self, id: i64) {
        self.rows.retain(|e| e.id != id);
    }

    pub(crate) fn close(&mut self) {
        self.generation.invalidate();
        self.rows.clear();
    }
}
