use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::FilterCriteria;
use crate::budget::load_budget;
use crate::calendar::YearMonth;
use crate::error::{AppError, AppResult, ServiceError};
use crate::models::{BillingFilter, Budget, BudgetKind, Expense};
use crate::service::DataService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExportOutcome {
    pub(crate) path: PathBuf,
    pub(crate) rows: usize,
    pub(crate) total: Decimal,
}

/// `expenses` + date slug + billing slug + `.csv`.
pub(crate) fn export_filename(criteria: &FilterCriteria) -> String {
    let mut name = String::from("expenses");
    match (criteria.start, criteria.end) {
        (Some(s), Some(e)) if s == e => name.push_str(&format!("_{s}")),
        (Some(s), Some(e)) => name.push_str(&format!("_{s}_to_{e}")),
        (Some(s), None) => name.push_str(&format!("_from_{s}")),
        (None, Some(e)) => name.push_str(&format!("_until_{e}")),
        (None, None) => {}
    }
    name.push_str(match criteria.billing {
        BillingFilter::Billed => "_billed",
        BillingFilter::Unbilled => "_unbilled",
        BillingFilter::All => "_both",
    });
    name.push_str(".csv");
    name
}

/// The month both ends of the range fall in, if they share one.
pub(crate) fn single_month(criteria: &FilterCriteria) -> Option<YearMonth> {
    let (start, end) = (criteria.start?, criteria.end?);
    let month = YearMonth::of(start);
    (month == YearMonth::of(end)).then_some(month)
}

fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn rupees(amount: Decimal) -> String {
    format!("Rs. {:.2}", amount)
}

fn blank() -> [String; 5] {
    Default::default()
}

fn summary(label: &str, amount: Decimal) -> [String; 5] {
    [
        String::new(),
        String::new(),
        label.to_string(),
        rupees(amount),
        String::new(),
    ]
}

/// Render the export table. `budget` is the single month's budget, when the
/// range covers exactly one month.
pub(crate) fn build_csv(records: &[Expense], budget: Option<&Budget>) -> Result<String, ServiceError> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(Vec::new());

    let write_err = |e: csv::Error| ServiceError::new(format!("CSV write failed: {e}"));

    wtr.write_record(["Date", "Type", "Amount", "Note", "Billed"])
        .map_err(write_err)?;
    for e in records {
        wtr.write_record([
            e.date.format("%Y-%m-%d").to_string(),
            quoted(&e.expense_type),
            e.amount_text(),
            quoted(&e.note),
            if e.billed { "Yes" } else { "No" }.to_string(),
        ])
        .map_err(write_err)?;
    }

    let total: Decimal = records.iter().map(|e| e.amount).sum();
    wtr.write_record(blank()).map_err(write_err)?;
    wtr.write_record(summary("TOTAL:", total))
        .map_err(write_err)?;

    if let Some(budget) = budget.filter(|b| b.is_set()) {
        let kinds: Vec<BudgetKind> = BudgetKind::all()
            .iter()
            .copied()
            .filter(|k| budget.amount(*k) > Decimal::ZERO && records.iter().any(|e| k.matches(e.billed)))
            .collect();
        wtr.write_record(blank()).map_err(write_err)?;
        for (i, kind) in kinds.iter().enumerate() {
            if i > 0 {
                wtr.write_record(blank()).map_err(write_err)?;
            }
            let label = kind.as_str().to_uppercase();
            let allotted = budget.amount(*kind);
            let spent: Decimal = records
                .iter()
                .filter(|e| kind.matches(e.billed))
                .map(|e| e.amount)
                .sum();
            wtr.write_record(summary(&format!("{label} BUDGET:"), allotted))
                .map_err(write_err)?;
            wtr.write_record(summary(&format!("{label} SPENT:"), spent))
                .map_err(write_err)?;
            wtr.write_record(summary(&format!("{label} REMAINING:"), allotted - spent))
                .map_err(write_err)?;
        }
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ServiceError::new(format!("CSV write failed: {e}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Write the filtered set to `dir`. An empty set is refused without touching
/// the filesystem. A failed budget lookup only drops the budget block.
pub(crate) fn export_csv<D: DataService + ?Sized>(
    data: &D,
    owner: &str,
    criteria: &FilterCriteria,
    records: &[Expense],
    dir: &Path,
) -> AppResult<ExportOutcome> {
    if records.is_empty() {
        return Err(AppError::validation(
            "No expenses to export for the selected date range.",
        ));
    }

    let budget = match single_month(criteria) {
        Some(month) => match load_budget(data, owner, month) {
            Ok(b) => Some(b),
            Err(e) => {
                warn!(error = %e, %month, "budget lookup for export failed");
                None
            }
        },
        None => None,
    };

    let content = build_csv(records, budget.as_ref())?;
    let path = dir.join(export_filename(criteria));
    std::fs::write(&path, content)
        .map_err(|e| ServiceError::new(format!("Failed to write {}: {e}", path.display())))?;

    let total = records.iter().map(|e| e.amount).sum();
    info!(path = %path.display(), rows = records.len(), "export written");
    Ok(ExportOutcome {
        path,
        rows: records.len(),
        total,
    })
}
