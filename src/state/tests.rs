#![allow(clippy::unwrap_used)]

use super::*;
use crate::db::Database;
use crate::models::BudgetKind;
use crate::notify::Placement;
use crate::service::{AuthProvider, KeyValueStore};
use crate::testutil::{db_with_user, insert, Faults, FlakyBackend};
use rust_decimal_macros::dec;

fn started() -> (Database, AppState) {
    let (mut db, _) = db_with_user();
    let mut state = AppState::new(LaunchParams::default(), std::env::temp_dir());
    state.start(&mut db);
    state.notifier.clear();
    (db, state)
}

fn input(state: &AppState, amount: Decimal, billed: bool) -> ExpenseInput {
    ExpenseInput {
        amount: Some(amount),
        date: state.today,
        expense_type: "Food".into(),
        note: "lunch".into(),
        billed,
    }
}

fn messages(state: &AppState) -> Vec<String> {
    state.notifier.toasts().map(|n| n.message.clone()).collect()
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn test_start_resumes_and_loads_dashboard() {
    let (_, state) = started();
    assert_eq!(state.session.state(), SessionState::Authenticated);
    assert_eq!(state.types.len(), 8);
    assert!(state.budget.is_some());
}

#[test]
fn test_start_without_session_stays_anonymous() {
    let mut db = Database::open_in_memory().unwrap();
    let mut state = AppState::new(LaunchParams::default(), std::env::temp_dir());
    state.start(&mut db);
    assert_eq!(state.session.state(), SessionState::Anonymous);
    assert!(state.types.is_empty());
}

#[test]
fn test_start_with_bad_email_change_link() {
    let mut db = Database::open_in_memory().unwrap();
    let launch = LaunchParams::parse("expensetui://auth/confirm?token=nope&type=email_change");
    let mut state = AppState::new(launch, std::env::temp_dir());
    state.start(&mut db);
    assert_eq!(state.session.state(), SessionState::Anonymous);
    assert_eq!(
        messages(&state),
        vec!["Email verification failed. Please try the process again."]
    );
    assert!(state.launch.token.is_none());
}

#[test]
fn test_theme_preference_persists() {
    let (mut db, mut state) = started();
    assert!(!state.dark_mode);
    state.toggle_theme(&db);
    assert_eq!(db.get_item(DARK_MODE_KEY).unwrap().as_deref(), Some("true"));
    let mut again = AppState::new(LaunchParams::default(), std::env::temp_dir());
    again.start(&mut db);
    assert!(again.dark_mode);
}

#[test]
fn test_prefill_amount_is_one_shot() {
    let mut state = AppState::new(LaunchParams::parse("?amount=249.2"), std::env::temp_dir());
    assert_eq!(state.prefill_amount(), Some(dec!(250)));
    assert_eq!(state.prefill_amount(), None);
}

// ── Add / delete ──────────────────────────────────────────────

#[test]
fn test_add_expense_refreshes_displays() {
    let (db, mut state) = started();
    assert!(state.add_expense(&db, &input(&state, dec!(120), true)));
    assert_eq!(state.recent.len(), 1);
    assert_eq!(state.stats.month_total, dec!(120));
    assert_eq!(state.stats.billed_total, dec!(120));
    let display = state.budget.as_ref().unwrap();
    assert_eq!(display.billed.spent, dec!(120));
    assert_eq!(messages(&state), vec!["Expense added successfully!"]);
}

#[test]
fn test_add_expense_validation_goes_inline() {
    let (db, mut state) = started();
    let mut bad = input(&state, dec!(0), true);
    bad.note = String::new();
    assert!(!state.add_expense(&db, &bad));
    let alert = state.notifier.inline().unwrap();
    assert_eq!(alert.placement, Placement::Inline);
    assert!(alert.message.contains("Description is required"));
    assert!(state.recent.is_empty());
}

#[test]
fn test_budget_warning_raised_once() {
    let (db, mut state) = started();
    assert!(state.set_budget(&db, dec!(100), Decimal::ZERO));
    state.notifier.clear();

    state.add_expense(&db, &input(&state, dec!(92), true));
    assert!(messages(&state).contains(&"Warning: You've used 92% of your billed budget!".to_string()));
    state.notifier.clear();

    state.add_expense(&db, &input(&state, dec!(20), true));
    assert_eq!(messages(&state), vec!["Expense added successfully!"]);
    assert!(state.warnings.is_shown(BudgetKind::Billed));
}

#[test]
fn test_budget_change_rearms_warning() {
    let (db, mut state) = started();
    state.set_budget(&db, dec!(100), Decimal::ZERO);
    state.add_expense(&db, &input(&state, dec!(95), true));
    assert!(state.warnings.is_shown(BudgetKind::Billed));

    state.notifier.clear();
    assert!(state.set_budget(&db, dec!(90), Decimal::ZERO));
    let month = state.month().name();
    let msgs = messages(&state);
    assert!(msgs.contains(&format!("{month} budgets updated successfully!")));
    assert!(msgs.contains(&"Alert: You've exceeded your monthly billed budget!".to_string()));
}

#[test]
fn test_unchanged_budget_rejected() {
    let (db, mut state) = started();
    assert!(!state.set_budget(&db, Decimal::ZERO, Decimal::ZERO));
    assert_eq!(
        state.notifier.inline().unwrap().message,
        "Please make changes to update the budgets."
    );
}

#[test]
fn test_delete_expense_removes_everywhere() {
    let (db, mut state) = started();
    state.add_expense(&db, &input(&state, dec!(10), true));
    state.open_analytics(&db);
    let id = state.filter.rows()[0].id;
    state.toggle_billed(id);
    assert!(state.edits.is_dirty(id));

    assert!(state.delete_expense(&db, id));
    assert!(state.filter.rows().is_empty());
    assert!(state.recent.is_empty());
    assert!(!state.edits.is_dirty(id));
    assert_eq!(state.stats.month_count, 0);
}

// ── Analytics ─────────────────────────────────────────────────

#[test]
fn test_close_analytics_discards_edits() {
    let (db, mut state) = started();
    state.add_expense(&db, &input(&state, dec!(10), true));
    state.open_analytics(&db);
    let id = state.filter.rows()[0].id;
    state.toggle_billed(id);
    state.close_analytics();
    assert!(!state.edits.has_changes());
    assert!(state.filter.rows().is_empty());
}

#[test]
fn test_save_edits_reloads_view() {
    let (db, mut state) = started();
    state.add_expense(&db, &input(&state, dec!(10), true));
    state.open_analytics(&db);
    let id = state.filter.rows()[0].id;
    state.begin_edit(id);
    assert!(state.edit_field(id, FieldChange::Amount(dec!(15))));
    state.end_edit(id);

    assert!(state.save_edits(&db));
    assert!(!state.edits.has_changes());
    assert_eq!(state.filter.rows()[0].amount, dec!(15));
    assert_eq!(state.stats.month_total, dec!(15));
}

#[test]
fn test_cancel_edit_restores_row() {
    let (db, mut state) = started();
    state.add_expense(&db, &input(&state, dec!(10), true));
    state.open_analytics(&db);
    let id = state.filter.rows()[0].id;
    state.begin_edit(id);
    state.edit_field(id, FieldChange::Note("dinner".into()));
    state.cancel_edit(id);
    assert!(!state.edits.is_dirty(id));
    assert_eq!(state.edits.display(&state.filter.rows()[0]).note, "lunch");
}

#[test]
fn test_partial_save_keeps_failed_rows_pending() {
    let (db, mut state) = started();
    let owner = state.owner().unwrap();
    insert(&db, &owner, dec!(1), state.today, "Food", true);
    insert(&db, &owner, dec!(2), state.today, "Food", true);
    let backend = FlakyBackend::new(
        db,
        Faults {
            expense_updates_before_failure: Some(1),
            ..Faults::default()
        },
    );
    state.open_analytics(&backend);
    let ids: Vec<i64> = state.filter.rows().iter().map(|e| e.id).collect();
    for id in &ids {
        state.toggle_billed(*id);
    }
    assert!(!state.save_edits(&backend));
    assert_eq!(state.edits.dirty_count(), 1);
    assert!(messages(&state)[0].starts_with("Failed to save changes:"));
}

#[test]
fn test_apply_filter_and_export() {
    let (db, mut state) = started();
    state.add_expense(&db, &input(&state, dec!(10), true));
    state.add_expense(&db, &input(&state, dec!(20), false));
    let dir = tempfile::tempdir().unwrap();
    state.export_dir = dir.path().to_path_buf();
    state.open_analytics(&db);
    state.apply_filter(
        &db,
        FilterCriteria {
            billing: crate::models::BillingFilter::Unbilled,
            ..FilterCriteria::default()
        },
    );
    assert_eq!(state.filter.rows().len(), 1);
    let outcome = state.export(&db).unwrap();
    assert_eq!(outcome.rows, 1);
    assert!(outcome.path.ends_with("expenses_unbilled.csv"));
}

#[test]
fn test_export_of_empty_set_alerts() {
    let (db, mut state) = started();
    state.open_analytics(&db);
    assert!(state.export(&db).is_none());
    assert_eq!(
        state.notifier.inline().unwrap().message,
        "No expenses to export for the selected date range."
    );
}

// ── Search / insights / types ─────────────────────────────────

#[test]
fn test_search_over_loaded_set() {
    let (db, mut state) = started();
    state.add_expense(&db, &input(&state, dec!(10), true));
    let mut other = input(&state, dec!(30), true);
    other.note = "taxi home".into();
    other.expense_type = "Transportation".into();
    state.add_expense(&db, &other);

    state.open_search(&db);
    assert_eq!(state.search_results().count(), 2);
    state.search_term = "TAXI".into();
    let results = state.search_results();
    assert_eq!(results.count(), 1);
    assert_eq!(results.total, dec!(30));
    state.close_search();
    assert!(!state.search.is_loaded());
}

#[test]
fn test_insights_loaded() {
    let (db, mut state) = started();
    state.add_expense(&db, &input(&state, dec!(40), true));
    state.load_insights(&db);
    let insights = state.insights.as_ref().unwrap();
    assert_eq!(insights.this_month_total, dec!(40));
    assert_eq!(insights.count, 1);
}

#[test]
fn test_type_rename_refreshes_lists() {
    let (db, mut state) = started();
    state.add_expense(&db, &input(&state, dec!(10), true));
    state.open_analytics(&db);
    assert!(state.rename_type(&db, "Food", "Meals"));
    assert!(state.types.contains(&"Meals".to_string()));
    assert_eq!(state.filter.rows()[0].expense_type, "Meals");
    assert_eq!(state.recent[0].expense_type, "Meals");
}

#[test]
fn test_type_delete_in_use_refused() {
    let (db, mut state) = started();
    state.add_expense(&db, &input(&state, dec!(10), true));
    assert!(!state.delete_type(&db, "Food"));
    assert!(state.delete_type(&db, "Education"));
    assert_eq!(state.types.len(), 7);
}

// ── Session ───────────────────────────────────────────────────

#[test]
fn test_sign_out_clears_user_state() {
    let (mut db, mut state) = started();
    state.add_expense(&db, &input(&state, dec!(10), true));
    state.open_analytics(&db);
    state.sign_out(&mut db);
    assert_eq!(state.session.state(), SessionState::Anonymous);
    assert!(state.recent.is_empty());
    assert!(!state.analytics_open);
    assert!(messages(&state).contains(&"Signed out from all devices".to_string()));
    assert!(db.get_user().unwrap().is_none());
}

#[test]
fn test_sign_out_warns_when_provider_fails() {
    let (db, mut state) = started();
    let mut backend = FlakyBackend::new(
        db,
        Faults {
            fail_sign_out: true,
            ..Faults::default()
        },
    );
    state.sign_out(&mut backend);
    assert_eq!(state.session.state(), SessionState::Anonymous);
    let shown = messages(&state);
    assert!(shown
        .iter()
        .any(|m| m.starts_with("Signed out on this device") && m.contains("injected failure")));
    assert!(!shown.contains(&"Signed out from all devices".to_string()));
}

#[test]
fn test_sign_in_then_dashboard() {
    let (mut db, _) = db_with_user();
    db.sign_out().unwrap();
    db.poll_events();
    let mut state = AppState::new(LaunchParams::default(), std::env::temp_dir());
    state.start(&mut db);
    assert!(!state.sign_in(&mut db, "asha@example.com", "wrong"));
    assert!(state.sign_in(&mut db, "asha@example.com", "secret1"));
    assert_eq!(state.types.len(), 8);
}

#[test]
fn test_email_change_signs_out_after_delay() {
    let (mut db, mut state) = started();
    assert!(state.update_profile(&mut db, "Asha", "asha2@example.com"));
    assert_eq!(state.session.state(), SessionState::EmailChangePending);
    assert!(state.sign_out_pending());

    let now = Instant::now();
    state.tick(&mut db, now);
    assert_eq!(state.session.state(), SessionState::EmailChangePending);

    state.tick(&mut db, now + EMAIL_CHANGE_SIGN_OUT_DELAY + Duration::from_millis(10));
    assert_eq!(state.session.state(), SessionState::Anonymous);
    assert!(!state.sign_out_pending());
    assert!(db.get_user().unwrap().is_none());
}

#[test]
fn test_sign_up_routes_to_dashboard() {
    let mut db = Database::open_in_memory().unwrap();
    let mut state = AppState::new(LaunchParams::default(), std::env::temp_dir());
    state.start(&mut db);
    assert!(state.sign_up(&mut db, "Ravi", "ravi@example.com", "secret1", "secret1"));
    assert_eq!(state.session.state(), SessionState::Authenticated);
    assert_eq!(state.types.len(), 8);
    assert!(messages(&state).contains(&"Account created successfully!".to_string()));
}
