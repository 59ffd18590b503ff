use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::calendar::YearMonth;
use crate::error::{AppError, AppResult};
use crate::models::{Budget, BudgetKind, Expense};
use crate::service::{Column, DataService, Query, ServiceResult};

pub(crate) const APPROACHING_PERCENT: f64 = 90.0;
pub(crate) const EXCEEDED_PERCENT: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Normal,
    Approaching,
    Exceeded,
}

impl Severity {
    pub(crate) fn from_percent(used: f64) -> Self {
        if used >= EXCEEDED_PERCENT {
            Self::Exceeded
        } else if used >= APPROACHING_PERCENT {
            Self::Approaching
        } else {
            Self::Normal
        }
    }
}

/// Budget display for one billing kind in one month.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BudgetStatus {
    pub(crate) kind: BudgetKind,
    pub(crate) budget: Decimal,
    pub(crate) spent: Decimal,
    /// May be negative once over budget.
    pub(crate) remaining: Decimal,
    /// 0 when no budget is set.
    pub(crate) used_percent: f64,
    pub(crate) remaining_percent: f64,
    /// Bar fill, clamped to 100.
    pub(crate) progress: f64,
    pub(crate) over_budget: bool,
    pub(crate) severity: Severity,
}

impl BudgetStatus {
    pub(crate) fn compute(kind: BudgetKind, budget: Decimal, spent: Decimal) -> Self {
        let used_percent = if budget > Decimal::ZERO {
            (spent / budget * Decimal::ONE_HUNDRED)
                .to_f64()
                .unwrap_or_default()
        } else {
            0.0
        };
        let remaining = budget - spent;
        let remaining_percent = if budget > Decimal::ZERO {
            (remaining / budget * Decimal::ONE_HUNDRED)
                .to_f64()
                .unwrap_or_default()
        } else {
            0.0
        };
        Self {
            kind,
            budget,
            spent,
            remaining,
            used_percent,
            remaining_percent,
            progress: used_percent.min(100.0),
            over_budget: used_percent > 100.0,
            severity: if budget > Decimal::ZERO {
                Severity::from_percent(used_percent)
            } else {
                Severity::Normal
            },
        }
    }

    pub(crate) fn has_budget(&self) -> bool {
        self.budget > Decimal::ZERO
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BudgetDisplay {
    pub(crate) month: YearMonth,
    pub(crate) budget: Budget,
    pub(crate) billed: BudgetStatus,
    pub(crate) unbilled: BudgetStatus,
}

impl BudgetDisplay {
    /// `records` are the month's expenses; other months are ignored.
    pub(crate) fn compute(month: YearMonth, budget: Budget, records: &[Expense]) -> Self {
        let spent = |kind: BudgetKind| -> Decimal {
            records
                .iter()
                .filter(|e| month.contains(e.date) && kind.matches(e.billed))
                .map(|e| e.amount)
                .sum()
        };
        Self {
            month,
            billed: BudgetStatus::compute(
                BudgetKind::Billed,
                budget.amount(BudgetKind::Billed),
                spent(BudgetKind::Billed),
            ),
            unbilled: BudgetStatus::compute(
                BudgetKind::Unbilled,
                budget.amount(BudgetKind::Unbilled),
                spent(BudgetKind::Unbilled),
            ),
            budget,
        }
    }

    pub(crate) fn status(&self, kind: BudgetKind) -> &BudgetStatus {
        match kind {
            BudgetKind::Billed => &self.billed,
            BudgetKind::Unbilled => &self.unbilled,
        }
    }
}

/// The owner's budget row for a month, or a zero budget when none exists.
pub(crate) fn load_budget<D: DataService + ?Sized>(
    data: &D,
    owner: &str,
    month: YearMonth,
) -> ServiceResult<Budget> {
    let rows = data.select_budgets(
        &Query::owned_by(owner)
            .eq(Column::BudgetMonth, month.month)
            .eq(Column::BudgetYear, month.year)
            .single(),
    )?;
    Ok(rows
        .into_iter()
        .next()
        .unwrap_or_else(|| Budget::unset(owner, month.year, month.month)))
}

pub(crate) fn compute_budget_display<D: DataService + ?Sized>(
    data: &D,
    owner: &str,
    month: YearMonth,
) -> ServiceResult<BudgetDisplay> {
    let budget = load_budget(data, owner, month)?;
    let records = crate::expenses::month_expenses(data, owner, month)?;
    Ok(BudgetDisplay::compute(month, budget, &records))
}

/// Threshold alerts, raised at most once per kind until the budget changes.
#[derive(Debug, Default)]
pub(crate) struct BudgetWarnings {
    shown: HashSet<BudgetKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Warning {
    pub(crate) kind: BudgetKind,
    pub(crate) severity: Severity,
    pub(crate) message: String,
}

impl BudgetWarnings {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn check(&mut self, display: &BudgetDisplay) -> Vec<Warning> {
        let mut out = Vec::new();
        for kind in BudgetKind::all() {
            let status = display.status(*kind);
            if self.shown.contains(kind)
                || !status.has_budget()
                || status.used_percent < APPROACHING_PERCENT
            {
                continue;
            }
            let label = kind.as_str();
            let (severity, message) = if status.used_percent >= EXCEEDED_PERCENT {
                (
                    Severity::Exceeded,
                    format!("Alert: You've exceeded your monthly {label} budget!"),
                )
            } else {
                (
                    Severity::Approaching,
                    format!(
                        "Warning: You've used {}% of your {label} budget!",
                        status.used_percent.round()
                    ),
                )
            };
            self.shown.insert(*kind);
            out.push(Warning {
                kind: *kind,
                severity,
                message,
            });
        }
        out
    }

    #[cfg(test)]
    pub(crate) fn is_shown(&self, kind: BudgetKind) -> bool {
        self.shown.contains(&kind)
    }

    pub(crate) fn reset(&mut self) {
        self.shown.clear();
    }
}

/// Set both budgets for `month`.
///
/// Rejected without a service call when neither value changed or either is
/// negative. Returns the stored row.
pub(crate) fn set_budget<D: DataService + ?Sized>(
    data: &D,
    owner: &str,
    month: YearMonth,
    current: &Budget,
    billed: Decimal,
    unbilled: Decimal,
) -> AppResult<Budget> {
    if billed == current.billed && unbilled == current.unbilled {
        return Err(AppError::validation(
            "Please make changes to update the budgets.",
        ));
    }
    if billed < Decimal::ZERO || unbilled < Decimal::ZERO {
        return Err(AppError::validation("Budget amounts cannot be negative."));
    }
    let budget = Budget::new(owner, month.year, month.month, billed, unbilled);
    if let Err(e) = data.upsert_budget(&budget) {
        warn!(error = %e, "budget update failed");
        return Err(e.into());
    }
    info!(%month, billed = %billed, unbilled = %unbilled, "budgets updated");
    Ok(budget)
}

#[cfg(test)]
mod tests;
