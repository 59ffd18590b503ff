mod search;

pub(crate) use search::{SearchResults, SearchSession};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::info;

use crate::calendar::YearMonth;
use crate::error::{AppError, AppResult};
use crate::models::{Expense, ExpenseType, NewExpense};
use crate::service::{Column, DataService, Order, Query, ServiceResult};

pub(crate) const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
pub(crate) const MAX_NOTE_CHARS: usize = 500;
pub(crate) const RECENT_LIMIT: u32 = 5;

/// Raw values from the add-expense form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExpenseInput {
    pub(crate) amount: Option<Decimal>,
    pub(crate) date: NaiveDate,
    pub(crate) expense_type: String,
    pub(crate) note: String,
    pub(crate) billed: bool,
}

/// Lenient amount parsing: surrounding whitespace, thousands separators and a
/// leading currency mark are accepted.
pub(crate) fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .trim()
        .trim_start_matches('₹')
        .trim_start_matches("Rs.")
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Every rule the input violates, in form order. Empty means valid.
pub(crate) fn validate(input: &ExpenseInput, types: &[String]) -> Vec<String> {
    let mut errors = Vec::new();

    match input.amount {
        Some(a) if a > Decimal::ZERO => {
            if a > MAX_AMOUNT {
                errors.push("Amount cannot exceed ₹10,00,000".to_string());
            }
        }
        _ => errors.push("Valid amount is required".to_string()),
    }

    let expense_type = input.expense_type.trim();
    if expense_type.is_empty() {
        errors.push("Expense type is required".to_string());
    } else if ExpenseType::find_by_name(types, expense_type).is_none() {
        errors.push(format!("Unknown expense type '{expense_type}'"));
    }

    let note = input.note.trim();
    if note.is_empty() {
        errors.push("Description is required".to_string());
    }
    if note.chars().count() > MAX_NOTE_CHARS {
        errors.push(format!(
            "Description cannot exceed {MAX_NOTE_CHARS} characters"
        ));
    }

    errors
}

/// Validate and insert. Nothing reaches the data service when validation fails.
pub(crate) fn add_expense<D: DataService + ?Sized>(
    data: &D,
    owner: &str,
    input: &ExpenseInput,
    types: &[String],
) -> AppResult<Expense> {
    let errors = validate(input, types);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    let expense_type = ExpenseType::find_by_name(types, input.expense_type.trim())
        .cloned()
        .unwrap_or_else(|| input.expense_type.trim().to_string());
    let amount = input.amount.unwrap_or_default();
    let expense = data.insert_expense(&NewExpense {
        user_id: owner.to_string(),
        amount,
        date: input.date,
        expense_type,
        note: input.note.trim().to_string(),
        billed: input.billed,
    })?;
    info!(id = expense.id, amount = %expense.amount, "expense added");
    Ok(expense)
}

pub(crate) fn delete_expense<D: DataService + ?Sized>(data: &D, owner: &str, id: i64) -> AppResult<()> {
    let removed = data.delete_expenses(&Query::owned_by(owner).eq(Column::Id, id))?;
    if removed == 0 {
        return Err(AppError::State(format!("Expense {id} no longer exists")));
    }
    info!(id, "expense deleted");
    Ok(())
}

/// The most recent expenses, newest first.
pub(crate) fn recent<D: DataService + ?Sized>(data: &D, owner: &str) -> ServiceResult<Vec<Expense>> {
    data.select_expenses(
        &Query::owned_by(owner)
            .order(Column::Date, Order::Desc)
            .limit(RECENT_LIMIT),
    )
}

pub(crate) fn month_expenses<D: DataService + ?Sized>(
    data: &D,
    owner: &str,
    month: YearMonth,
) -> ServiceResult<Vec<Expense>> {
    let Some((first, last)) = month.bounds() else {
        return Ok(Vec::new());
    };
    data.select_expenses(
        &Query::owned_by(owner)
            .gte(Column::Date, first)
            .lte(Column::Date, last),
    )
}

/// Everything the owner has recorded, newest first.
pub(crate) fn all_expenses<D: DataService + ?Sized>(data: &D, owner: &str) -> ServiceResult<Vec<Expense>> {
    data.select_expenses(&Query::owned_by(owner).order(Column::Date, Order::Desc))
}

pub(crate) fn total(records: &[Expense]) -> Decimal {
    records.iter().map(|e| e.amount).sum()
}

/// Dashboard stat cards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Statistics {
    pub(crate) month_total: Decimal,
    pub(crate) month_count: usize,
    pub(crate) billed_total: Decimal,
    pub(crate) unbilled_total: Decimal,
    pub(crate) last_month_total: Decimal,
    pub(crate) all_time_total: Decimal,
}

impl Statistics {
    pub(crate) fn from_records(this_month: &[Expense], last_month: &[Expense], all: &[Expense]) -> Self {
        let (billed, unbilled): (Vec<&Expense>, Vec<&Expense>) =
            this_month.iter().partition(|e| e.billed);
        Self {
            month_total: total(this_month),
            month_count: this_month.len(),
            billed_total: billed.iter().map(|e| e.amount).sum(),
            unbilled_total: unbilled.iter().map(|e| e.amount).sum(),
            last_month_total: total(last_month),
            all_time_total: total(all),
        }
    }
}

pub(crate) fn statistics<D: DataService + ?Sized>(
    data: &D,
    owner: &str,
    month: YearMonth,
) -> ServiceResult<Statistics> {
    let this_month = month_expenses(data, owner, month)?;
    let last_month = month_expenses(data, owner, month.previous())?;
    let all = data.select_expenses(&Query::owned_by(owner))?;
    Ok(Statistics::from_records(&this_month, &last_month, &all))
}
