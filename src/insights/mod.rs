use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::calendar::YearMonth;
use crate::expenses::{month_expenses, total};
use crate::models::Expense;
use crate::service::{DataService, ServiceResult};

pub(crate) const TOP_CATEGORIES: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Insights {
    pub(crate) month: YearMonth,
    pub(crate) this_month_total: Decimal,
    pub(crate) last_month_total: Decimal,
    /// Percent change from last month; 0 when last month had no spending.
    pub(crate) monthly_change: f64,
    /// Largest first; ties keep first-seen order.
    pub(crate) top_categories: Vec<(String, Decimal)>,
    pub(crate) daily_average: Decimal,
    pub(crate) projected_total: Decimal,
    pub(crate) highest: Option<Expense>,
    pub(crate) lowest: Option<Expense>,
    pub(crate) count: usize,
    pub(crate) average_per_transaction: Decimal,
}

/// Sum amounts by type, in the order each type first appears.
pub(crate) fn totals_by_type(records: &[Expense]) -> Vec<(String, Decimal)> {
    let mut out: Vec<(String, Decimal)> = Vec::new();
    for e in records {
        match out.iter_mut().find(|(name, _)| *name == e.expense_type) {
            Some((_, sum)) => *sum += e.amount,
            None => out.push((e.expense_type.clone(), e.amount)),
        }
    }
    out
}

impl Insights {
    /// `today` fixes the day-of-month used for the daily average.
    pub(crate) fn compute(today: NaiveDate, this_month: &[Expense], last_month: &[Expense]) -> Self {
        let month = YearMonth::of(today);
        let this_month_total = total(this_month);
        let last_month_total = total(last_month);

        let monthly_change = if last_month_total > Decimal::ZERO {
            ((this_month_total - last_month_total) / last_month_total * Decimal::ONE_HUNDRED)
                .to_f64()
                .unwrap_or_default()
        } else {
            0.0
        };

        let mut top_categories = totals_by_type(this_month);
        // sort_by is stable, so equal totals stay in first-seen order.
        top_categories.sort_by(|a, b| b.1.cmp(&a.1));
        top_categories.truncate(TOP_CATEGORIES);

        let day = Decimal::from(today.day());
        let daily_average = this_month_total / day;
        let projected_total = daily_average * Decimal::from(month.days());

        let mut highest: Option<&Expense> = None;
        let mut lowest: Option<&Expense> = None;
        for e in this_month {
            if highest.is_none_or(|h| e.amount > h.amount) {
                highest = Some(e);
            }
            if lowest.is_none_or(|l| e.amount < l.amount) {
                lowest = Some(e);
            }
        }

        let count = this_month.len();
        let average_per_transaction = if count > 0 {
            this_month_total / Decimal::from(count)
        } else {
            Decimal::ZERO
        };

        Self {
            month,
            this_month_total,
            last_month_total,
            monthly_change,
            top_categories,
            daily_average,
            projected_total,
            highest: highest.cloned(),
            lowest: lowest.cloned(),
            count,
            average_per_transaction,
        }
    }
}

pub(crate) fn compute_insights<D: DataService + ?Sized>(
    data: &D,
    owner: &str,
    today: NaiveDate,
) -> ServiceResult<Insights> {
    let month = YearMonth::of(today);
    let this_month = month_expenses(data, owner, month)?;
    let last_month = month_expenses(data, owner, month.previous())?;
    Ok(Insights::compute(today, &this_month, &last_month))
}
