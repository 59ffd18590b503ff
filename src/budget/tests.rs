#![allow(clippy::unwrap_used)]

use super::*;
use crate::testutil::{date, db_with_user, expense, insert, Faults, FlakyBackend};
use rust_decimal_macros::dec;

const JAN: YearMonth = YearMonth {
    year: 2025,
    month: 1,
};

fn display(billed_budget: Decimal, billed_spent: Decimal) -> BudgetDisplay {
    let records = vec![expense(1, billed_spent, date(2025, 1, 10), "Food", true)];
    BudgetDisplay::compute(
        JAN,
        Budget::new("u1", 2025, 1, billed_budget, Decimal::ZERO),
        &records,
    )
}

// ── Status ────────────────────────────────────────────────────

#[test]
fn test_status_under_budget() {
    let s = BudgetStatus::compute(BudgetKind::Billed, dec!(1000), dec!(250));
    assert_eq!(s.remaining, dec!(750));
    assert_eq!(s.used_percent, 25.0);
    assert_eq!(s.remaining_percent, 75.0);
    assert_eq!(s.progress, 25.0);
    assert!(!s.over_budget);
    assert_eq!(s.severity, Severity::Normal);
}

#[test]
fn test_status_over_budget_clamps_progress() {
    let s = BudgetStatus::compute(BudgetKind::Unbilled, dec!(100), dec!(120));
    assert_eq!(s.remaining, dec!(-20));
    assert_eq!(s.used_percent, 120.0);
    assert_eq!(s.progress, 100.0);
    assert!(s.over_budget);
    assert_eq!(s.severity, Severity::Exceeded);
}

#[test]
fn test_exactly_100_is_exceeded_but_not_over() {
    let s = BudgetStatus::compute(BudgetKind::Billed, dec!(100), dec!(100));
    assert!(!s.over_budget);
    assert_eq!(s.severity, Severity::Exceeded);
}

#[test]
fn test_zero_budget_disables_percentages() {
    let s = BudgetStatus::compute(BudgetKind::Billed, Decimal::ZERO, dec!(500));
    assert_eq!(s.used_percent, 0.0);
    assert_eq!(s.progress, 0.0);
    assert!(!s.has_budget());
    assert_eq!(s.severity, Severity::Normal);
}

#[test]
fn test_display_splits_by_kind_and_month() {
    let records = vec![
        expense(1, dec!(100), date(2025, 1, 1), "Food", true),
        expense(2, dec!(40), date(2025, 1, 31), "Food", false),
        expense(3, dec!(999), date(2025, 2, 1), "Food", true),
    ];
    let d = BudgetDisplay::compute(JAN, Budget::new("u1", 2025, 1, dec!(200), dec!(80)), &records);
    assert_eq!(d.billed.spent, dec!(100));
    assert_eq!(d.unbilled.spent, dec!(40));
    assert_eq!(d.unbilled.used_percent, 50.0);
}

// ── Warnings ──────────────────────────────────────────────────

#[test]
fn test_approaching_warning_once() {
    let mut w = BudgetWarnings::new();
    let d = display(dec!(1000), dec!(900));
    let first = w.check(&d);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].severity, Severity::Approaching);
    assert_eq!(first[0].message, "Warning: You've used 90% of your billed budget!");
    assert!(w.check(&d).is_empty());
}

#[test]
fn test_exceeded_warning() {
    let mut w = BudgetWarnings::new();
    let warnings = w.check(&display(dec!(1000), dec!(1200)));
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].message,
        "Alert: You've exceeded your monthly billed budget!"
    );
    assert!(w.is_shown(BudgetKind::Billed));
    assert!(!w.is_shown(BudgetKind::Unbilled));
}

#[test]
fn test_percentage_is_rounded() {
    let mut w = BudgetWarnings::new();
    let warnings = w.check(&display(dec!(1000), dec!(956)));
    assert_eq!(warnings[0].message, "Warning: You've used 96% of your billed budget!");
}

#[test]
fn test_no_warning_below_threshold_or_without_budget() {
    let mut w = BudgetWarnings::new();
    assert!(w.check(&display(dec!(1000), dec!(899))).is_empty());
    assert!(w.check(&display(Decimal::ZERO, dec!(5000))).is_empty());
}

#[test]
fn test_reset_allows_warning_again() {
    let mut w = BudgetWarnings::new();
    let d = display(dec!(1000), dec!(950));
    assert_eq!(w.check(&d).len(), 1);
    w.reset();
    assert_eq!(w.check(&d).len(), 1);
}

// ── Persistence ───────────────────────────────────────────────

#[test]
fn test_missing_budget_is_zero() {
    let (db, user) = db_with_user();
    let b = load_budget(&db, &user.id, JAN).unwrap();
    assert!(!b.is_set());
}

#[test]
fn test_set_budget_upserts_current_month() {
    let (db, user) = db_with_user();
    let current = load_budget(&db, &user.id, JAN).unwrap();
    set_budget(&db, &user.id, JAN, &current, dec!(1000), dec!(500)).unwrap();
    let current = load_budget(&db, &user.id, JAN).unwrap();
    assert_eq!(current.billed, dec!(1000));
    set_budget(&db, &user.id, JAN, &current, dec!(1200), dec!(500)).unwrap();
    assert_eq!(load_budget(&db, &user.id, JAN).unwrap().billed, dec!(1200));
}

#[test]
fn test_set_budget_rejects_unchanged_and_negative() {
    let (db, user) = db_with_user();
    let current = Budget::new(&user.id, 2025, 1, dec!(100), dec!(50));
    let err = set_budget(&db, &user.id, JAN, &current, dec!(100), dec!(50)).unwrap_err();
    assert_eq!(err.to_string(), "Please make changes to update the budgets.");
    let err = set_budget(&db, &user.id, JAN, &current, dec!(-1), dec!(50)).unwrap_err();
    assert_eq!(err.to_string(), "Budget amounts cannot be negative.");
    assert!(!load_budget(&db, &user.id, JAN).unwrap().is_set());
}

#[test]
fn test_compute_budget_display_from_service() {
    let (db, user) = db_with_user();
    db.upsert_budget(&Budget::new(&user.id, 2025, 1, dec!(1000), dec!(0)))
        .unwrap();
    insert(&db, &user.id, dec!(100), date(2025, 1, 15), "Food", true);
    insert(&db, &user.id, dec!(50), date(2025, 1, 20), "Food", true);
    let d = compute_budget_display(&db, &user.id, JAN).unwrap();
    assert_eq!(d.billed.spent, dec!(150));
    assert_eq!(d.billed.remaining, dec!(850));
    assert_eq!(d.billed.used_percent, 15.0);
}

#[test]
fn test_budget_read_failure_propagates() {
    let (db, user) = db_with_user();
    let backend = FlakyBackend::new(
        db,
        Faults {
            fail_budget_reads: true,
            ..Faults::default()
        },
    );
    assert!(compute_budget_display(&backend, &user.id, JAN).is_err());
}
