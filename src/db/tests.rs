#![allow(clippy::unwrap_used)]

use super::*;
use crate::service::{AuthEventKind, AuthProvider, OtpKind, UserUpdate};
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_expense(user: &str, amount: Decimal, on: NaiveDate, kind: &str, billed: bool) -> NewExpense {
    NewExpense {
        user_id: user.into(),
        amount,
        date: on,
        expense_type: kind.into(),
        note: format!("{kind} on {on}"),
        billed,
    }
}

fn signed_up(db: &mut Database, email: &str) -> User {
    db.sign_up(email, "secret1", &UserMetadata::named("Test"))
        .unwrap()
        .unwrap()
}

// ── Schema ────────────────────────────────────────────────────

#[test]
fn test_fresh_database_has_no_rows() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.select_expenses(&Query::new()).unwrap().is_empty());
    assert!(db.select_types(&Query::new()).unwrap().is_empty());
    assert!(db.keys().unwrap().is_empty());
}

#[test]
fn test_open_file_twice_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");
    {
        let db = Database::open(&path, "local").unwrap();
        db.insert_type(&ExpenseType::new("u1", "Food")).unwrap();
    }
    let db = Database::open(&path, "local").unwrap();
    assert_eq!(db.select_types(&Query::new()).unwrap().len(), 1);
}

// ── Expenses ──────────────────────────────────────────────────

#[test]
fn test_insert_and_select_expense() {
    let db = Database::open_in_memory().unwrap();
    let saved = db
        .insert_expense(&new_expense("u1", dec!(42.50), date(2025, 1, 5), "Food", true))
        .unwrap();
    assert!(saved.id > 0);

    let rows = db.select_expenses(&Query::owned_by("u1")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0], saved);
    assert_eq!(rows[0].amount, dec!(42.50));
}

#[test]
fn test_corrupt_amount_is_an_error_not_zero() {
    let db = Database::open_in_memory().unwrap();
    let saved = db
        .insert_expense(&new_expense("u1", dec!(42), date(2025, 1, 5), "Food", false))
        .unwrap();
    db.conn
        .execute("UPDATE expenses SET amount = 'abc' WHERE id = ?1", [saved.id])
        .unwrap();
    assert!(db.select_expenses(&Query::owned_by("u1")).is_err());

    db.upsert_budget(&Budget::new("u1", 2025, 1, dec!(1000), dec!(0)))
        .unwrap();
    db.conn
        .execute("UPDATE user_budgets SET monthly_unbilled_budget = '1,0.0'", [])
        .unwrap();
    assert!(db.select_budgets(&Query::owned_by("u1")).is_err());
}

#[test]
fn test_select_is_owner_scoped() {
    let db = Database::open_in_memory().unwrap();
    db.insert_expense(&new_expense("u1", dec!(1), date(2025, 1, 1), "Food", true))
        .unwrap();
    db.insert_expense(&new_expense("u2", dec!(2), date(2025, 1, 1), "Food", true))
        .unwrap();
    let rows = db.select_expenses(&Query::owned_by("u2")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].amount, dec!(2));
}

#[test]
fn test_date_range_and_order() {
    let db = Database::open_in_memory().unwrap();
    for d in [3, 15, 28] {
        db.insert_expense(&new_expense("u1", dec!(10), date(2025, 1, d), "Food", true))
            .unwrap();
    }
    db.insert_expense(&new_expense("u1", dec!(10), date(2025, 2, 1), "Food", true))
        .unwrap();

    let q = Query::owned_by("u1")
        .gte(Column::Date, date(2025, 1, 1))
        .lte(Column::Date, date(2025, 1, 31))
        .order(Column::Date, Order::Desc);
    let rows = db.select_expenses(&q).unwrap();
    let days: Vec<u32> = rows.iter().map(|e| chrono::Datelike::day(&e.date)).collect();
    assert_eq!(days, vec![28, 15, 3]);
}

#[test]
fn test_billed_and_type_filters() {
    let db = Database::open_in_memory().unwrap();
    db.insert_expense(&new_expense("u1", dec!(1), date(2025, 1, 1), "Food", true))
        .unwrap();
    db.insert_expense(&new_expense("u1", dec!(2), date(2025, 1, 1), "Food", false))
        .unwrap();
    db.insert_expense(&new_expense("u1", dec!(3), date(2025, 1, 1), "Travel", false))
        .unwrap();
    let q = Query::owned_by("u1")
        .eq(Column::Billed, false)
        .eq(Column::Type, "Food");
    let rows = db.select_expenses(&q).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].amount, dec!(2));
}

#[test]
fn test_limit_and_single() {
    let db = Database::open_in_memory().unwrap();
    for d in 1..=7 {
        db.insert_expense(&new_expense("u1", dec!(1), date(2025, 1, d), "Food", true))
            .unwrap();
    }
    let recent = db
        .select_expenses(&Query::owned_by("u1").order(Column::Date, Order::Desc).limit(5))
        .unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0].date, date(2025, 1, 7));
    let one = db.select_expenses(&Query::owned_by("u1").single()).unwrap();
    assert_eq!(one.len(), 1);
}

#[test]
fn test_update_writes_only_patched_fields() {
    let db = Database::open_in_memory().unwrap();
    let e = db
        .insert_expense(&new_expense("u1", dec!(10), date(2025, 1, 1), "Food", true))
        .unwrap();
    let patch = ExpensePatch {
        billed: Some(false),
        ..ExpensePatch::default()
    };
    let n = db
        .update_expenses(&Query::owned_by("u1").eq(Column::Id, e.id), &patch)
        .unwrap();
    assert_eq!(n, 1);
    let after = &db.select_expenses(&Query::new()).unwrap()[0];
    assert!(!after.billed);
    assert_eq!(after.note, e.note);
    assert_eq!(after.amount, e.amount);
}

#[test]
fn test_update_other_owner_touches_nothing() {
    let db = Database::open_in_memory().unwrap();
    let e = db
        .insert_expense(&new_expense("u1", dec!(10), date(2025, 1, 1), "Food", true))
        .unwrap();
    let n = db
        .update_expenses(
            &Query::owned_by("u2").eq(Column::Id, e.id),
            &ExpensePatch::rename_type("X"),
        )
        .unwrap();
    assert_eq!(n, 0);
}

#[test]
fn test_empty_patch_is_noop() {
    let db = Database::open_in_memory().unwrap();
    let n = db
        .update_expenses(&Query::owned_by("u1"), &ExpensePatch::default())
        .unwrap();
    assert_eq!(n, 0);
}

#[test]
fn test_delete_expense() {
    let db = Database::open_in_memory().unwrap();
    let e = db
        .insert_expense(&new_expense("u1", dec!(10), date(2025, 1, 1), "Food", true))
        .unwrap();
    let n = db
        .delete_expenses(&Query::owned_by("u1").eq(Column::Id, e.id))
        .unwrap();
    assert_eq!(n, 1);
    assert!(db.select_expenses(&Query::new()).unwrap().is_empty());
}

#[test]
fn test_ilike_matches_case_insensitively() {
    let db = Database::open_in_memory().unwrap();
    db.insert_type(&ExpenseType::new("u1", "Groceries")).unwrap();
    let rows = db
        .select_types(&Query::owned_by("u1").ilike(Column::Name, "groceries"))
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn test_unknown_column_is_service_error() {
    let db = Database::open_in_memory().unwrap();
    let err = db
        .select_types(&Query::new().eq(Column::Billed, true))
        .unwrap_err();
    assert!(err.message.contains("expense_types.billed"));
}

// ── Types ─────────────────────────────────────────────────────

#[test]
fn test_type_names_unique_per_owner_ignoring_case() {
    let db = Database::open_in_memory().unwrap();
    db.insert_type(&ExpenseType::new("u1", "Food")).unwrap();
    assert!(db.insert_type(&ExpenseType::new("u1", "food")).is_err());
    db.insert_type(&ExpenseType::new("u2", "Food")).unwrap();
}

#[test]
fn test_rename_and_delete_type() {
    let db = Database::open_in_memory().unwrap();
    db.insert_type(&ExpenseType::new("u1", "Food")).unwrap();
    let q = Query::owned_by("u1").eq(Column::Name, "Food");
    assert_eq!(db.rename_types(&q, "Meals").unwrap(), 1);
    let names: Vec<String> = db
        .select_types(&Query::owned_by("u1"))
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["Meals"]);
    assert_eq!(
        db.delete_types(&Query::owned_by("u1").eq(Column::Name, "Meals"))
            .unwrap(),
        1
    );
}

// ── Budgets & profiles ────────────────────────────────────────

#[test]
fn test_budget_upsert_replaces_same_month() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_budget(&Budget::new("u1", 2025, 1, dec!(1000), dec!(0)))
        .unwrap();
    db.upsert_budget(&Budget::new("u1", 2025, 1, dec!(1500), dec!(200)))
        .unwrap();
    db.upsert_budget(&Budget::new("u1", 2025, 2, dec!(1), dec!(1)))
        .unwrap();

    let q = Query::owned_by("u1")
        .eq(Column::BudgetMonth, 1u32)
        .eq(Column::BudgetYear, 2025)
        .single();
    let rows = db.select_budgets(&q).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].billed, dec!(1500));
    assert_eq!(rows[0].unbilled, dec!(200));
    assert_eq!(db.select_budgets(&Query::owned_by("u1")).unwrap().len(), 2);
}

#[test]
fn test_profile_upsert() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.select_profile("u1").unwrap().is_none());
    db.upsert_profile(&UserProfile {
        user_id: "u1".into(),
        requires_password_reset: true,
    })
    .unwrap();
    db.upsert_profile(&UserProfile {
        user_id: "u1".into(),
        requires_password_reset: false,
    })
    .unwrap();
    assert!(!db.select_profile("u1").unwrap().unwrap().requires_password_reset);
}

// ── Key-value store ───────────────────────────────────────────

#[test]
fn test_kv_set_get_remove() {
    let db = Database::open_in_memory().unwrap();
    db.set_item("darkMode", "true").unwrap();
    db.set_item("darkMode", "false").unwrap();
    assert_eq!(db.get_item("darkMode").unwrap().as_deref(), Some("false"));
    db.remove_item("darkMode").unwrap();
    assert!(db.get_item("darkMode").unwrap().is_none());
}

// ── Auth ──────────────────────────────────────────────────────

#[test]
fn test_sign_up_starts_session() {
    let mut db = Database::open_in_memory().unwrap();
    let user = signed_up(&mut db, "asha@example.com");
    assert_eq!(db.get_user().unwrap(), Some(user.clone()));
    assert!(db.get_item(&db.session_key()).unwrap().is_some());

    let events = db.poll_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, AuthEventKind::SignedIn);
    assert!(db.poll_events().is_empty());
}

#[test]
fn test_sign_up_rejects_duplicates_and_short_passwords() {
    let mut db = Database::open_in_memory().unwrap();
    signed_up(&mut db, "asha@example.com");
    let dup = db
        .sign_up("ASHA@example.com", "secret1", &UserMetadata::default())
        .unwrap_err();
    assert_eq!(dup.message, "User already registered");
    assert!(db
        .sign_up("new@example.com", "123", &UserMetadata::default())
        .is_err());
    assert!(db
        .sign_up("not-an-email", "secret1", &UserMetadata::default())
        .is_err());
}

#[test]
fn test_sign_in_checks_password() {
    let mut db = Database::open_in_memory().unwrap();
    let user = signed_up(&mut db, "asha@example.com");
    db.sign_out().unwrap();
    assert!(db.get_user().unwrap().is_none());

    let err = db
        .sign_in_with_password("asha@example.com", "wrong")
        .unwrap_err();
    assert_eq!(err.message, "Invalid login credentials");
    let back = db
        .sign_in_with_password("asha@example.com", "secret1")
        .unwrap();
    assert_eq!(back.id, user.id);
}

#[test]
fn test_recovery_token_flow() {
    let mut db = Database::open_in_memory().unwrap();
    signed_up(&mut db, "asha@example.com");
    db.sign_out().unwrap();
    db.poll_events();

    db.reset_password_for_email("asha@example.com").unwrap();
    let mail = db.outbox(1).unwrap();
    assert_eq!(mail.len(), 1);
    let token = mail[0]
        .link
        .split("token=")
        .nth(1)
        .unwrap()
        .split('&')
        .next()
        .unwrap()
        .to_string();

    let user = db.verify_otp(&token, OtpKind::Recovery).unwrap().unwrap();
    assert_eq!(user.email, "asha@example.com");
    let events = db.poll_events();
    assert_eq!(events[0].kind, AuthEventKind::PasswordRecovery);

    // tokens are single use
    assert!(db.verify_otp(&token, OtpKind::Recovery).is_err());
}

#[test]
fn test_reset_unknown_email_fails() {
    let mut db = Database::open_in_memory().unwrap();
    assert!(db.reset_password_for_email("ghost@example.com").is_err());
}

#[test]
fn test_email_change_applies_on_verify() {
    let mut db = Database::open_in_memory().unwrap();
    signed_up(&mut db, "old@example.com");
    let update = UserUpdate {
        email: Some("new@example.com".into()),
        ..UserUpdate::default()
    };
    let user = db.update_user(&update).unwrap();
    assert_eq!(user.email, "old@example.com");

    let link = db.outbox(1).unwrap().remove(0).link;
    assert!(link.contains("type=email_change"));
    let token = link
        .split("token=")
        .nth(1)
        .unwrap()
        .split('&')
        .next()
        .unwrap()
        .to_string();
    let changed = db
        .verify_otp(&token, OtpKind::EmailChange)
        .unwrap()
        .unwrap();
    assert_eq!(changed.email, "new@example.com");
}

#[test]
fn test_update_user_requires_session() {
    let mut db = Database::open_in_memory().unwrap();
    let err = db
        .update_user(&UserUpdate {
            password: Some("secret2".into()),
            ..UserUpdate::default()
        })
        .unwrap_err();
    assert_eq!(err.message, "Auth session missing!");
}

#[test]
fn test_password_update_changes_credentials() {
    let mut db = Database::open_in_memory().unwrap();
    signed_up(&mut db, "asha@example.com");
    db.update_user(&UserUpdate {
        password: Some("brandnew".into()),
        ..UserUpdate::default()
    })
    .unwrap();
    db.sign_out().unwrap();
    assert!(db
        .sign_in_with_password("asha@example.com", "secret1")
        .is_err());
    assert!(db
        .sign_in_with_password("asha@example.com", "brandnew")
        .is_ok());
}

#[test]
fn test_email_validation() {
    assert!(auth::is_valid_email("a@b.co"));
    assert!(!auth::is_valid_email("a@b"));
    assert!(!auth::is_valid_email("a b@c.de"));
}
