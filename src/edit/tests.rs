#![allow(clippy::unwrap_used)]

use super::*;
use crate::expenses::all_expenses;
use crate::testutil::{date, db_with_user, expense, insert, Faults, FlakyBackend};
use rust_decimal_macros::dec;

fn row() -> Expense {
    let mut e = expense(7, dec!(100), date(2025, 1, 5), "Food", false);
    e.note = "lunch".into();
    e
}

// ── Snapshots ─────────────────────────────────────────────────

#[test]
fn test_begin_edit_is_idempotent() {
    let mut t = EditTracker::new();
    let mut e = row();
    t.begin_edit(&e);
    t.set_field(e.id, FieldChange::Amount(dec!(150)));
    // Displayed row now shows 150; re-entering must keep the 100 snapshot.
    e.amount = dec!(150);
    t.begin_edit(&e);
    assert_eq!(t.diff(e.id).unwrap().original.amount, dec!(100));
    assert!(t.is_dirty(e.id));
}

#[test]
fn test_set_field_requires_snapshot() {
    let mut t = EditTracker::new();
    assert!(!t.set_field(1, FieldChange::Note("x".into())));
    assert!(!t.has_changes());
}

#[test]
fn test_reverting_value_clears_dirty() {
    let mut t = EditTracker::new();
    let e = row();
    t.begin_edit(&e);
    t.set_field(e.id, FieldChange::Note("dinner".into()));
    assert!(t.is_dirty(e.id));
    t.set_field(e.id, FieldChange::Note("lunch".into()));
    assert!(!t.is_dirty(e.id));
    assert!(t.patches().is_empty());
}

#[test]
fn test_note_trimmed_before_compare() {
    let mut t = EditTracker::new();
    let e = row();
    t.begin_edit(&e);
    t.set_field(e.id, FieldChange::Note("  lunch ".into()));
    assert!(!t.is_dirty(e.id));
}

// ── Patches ───────────────────────────────────────────────────

#[test]
fn test_patch_is_minimal() {
    let mut t = EditTracker::new();
    let e = row();
    t.begin_edit(&e);
    t.set_field(e.id, FieldChange::Amount(dec!(120)));
    t.set_field(e.id, FieldChange::Type("Food".into()));
    t.set_field(e.id, FieldChange::Date(date(2025, 1, 6)));

    let patches = t.patches();
    assert_eq!(patches.len(), 1);
    let (id, patch) = &patches[0];
    assert_eq!(*id, 7);
    assert_eq!(patch.fields(), vec!["amount", "date"]);
    assert_eq!(patch.amount, Some(dec!(120)));
    assert_eq!(patch.date, Some(date(2025, 1, 6)));
}

#[test]
fn test_toggle_only_produces_billed_patch() {
    let mut t = EditTracker::new();
    let e = row();
    t.toggle_billed(&e);
    assert!(t.is_dirty(e.id));
    let patches = t.patches();
    assert_eq!(patches[0].1.fields(), vec!["billed"]);
    assert_eq!(patches[0].1.billed, Some(true));
}

#[test]
fn test_double_toggle_is_clean() {
    let mut t = EditTracker::new();
    let e = row();
    t.toggle_billed(&e);
    t.toggle_billed(&e);
    assert!(!t.is_dirty(e.id));
    assert!(!t.has_changes());
}

#[test]
fn test_patches_ordered_by_id() {
    let mut t = EditTracker::new();
    for id in [9, 3, 5] {
        let e = expense(id, dec!(1), date(2025, 1, 1), "Food", true);
        t.toggle_billed(&e);
    }
    let ids: Vec<i64> = t.patches().into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![3, 5, 9]);
    assert_eq!(t.dirty_count(), 3);
}

// ── End / cancel ──────────────────────────────────────────────

#[test]
fn test_end_edit_freezes_current_and_keeps_dirty() {
    let mut t = EditTracker::new();
    let e = row();
    t.begin_edit(&e);
    t.set_field(e.id, FieldChange::Note("brunch".into()));
    let shown = t.end_edit(e.id).unwrap();
    assert_eq!(shown.note, "brunch");
    assert!(!t.is_editing(e.id));
    assert!(t.is_dirty(e.id));
    assert_eq!(t.display(&e).note, "brunch");
}

#[test]
fn test_cancel_restores_authoritative_values() {
    let mut t = EditTracker::new();
    let authoritative = row();
    let mut shown = authoritative.clone();
    t.begin_edit(&shown);
    t.set_field(shown.id, FieldChange::Amount(dec!(1)));
    shown.amount = dec!(1);
    t.toggle_billed(&shown);
    shown.billed = true;

    t.cancel(&mut shown, &authoritative);
    assert_eq!(shown, authoritative);
    assert!(!t.is_dirty(shown.id));
    assert!(t.diff(shown.id).is_none());
}

// ── Saving ────────────────────────────────────────────────────

#[test]
fn test_save_all_writes_and_clears() {
    let (db, user) = db_with_user();
    let a = insert(&db, &user.id, dec!(10), date(2025, 1, 1), "Food", false);
    let b = insert(&db, &user.id, dec!(20), date(2025, 1, 2), "Food", false);

    let mut t = EditTracker::new();
    t.toggle_billed(&a);
    t.begin_edit(&b);
    t.set_field(b.id, FieldChange::Note("updated".into()));

    assert_eq!(save_all(&mut t, &db, &user.id).unwrap(), 2);
    assert!(!t.has_changes());
    assert!(t.diff(a.id).is_none());

    let rows = all_expenses(&db, &user.id).unwrap();
    let a2 = rows.iter().find(|e| e.id == a.id).unwrap();
    let b2 = rows.iter().find(|e| e.id == b.id).unwrap();
    assert!(a2.billed);
    assert_eq!(a2.note, a.note);
    assert_eq!(b2.note, "updated");
    assert!(!b2.billed);
}

#[test]
fn test_save_all_with_nothing_dirty() {
    let (db, user) = db_with_user();
    let mut t = EditTracker::new();
    assert_eq!(save_all(&mut t, &db, &user.id).unwrap(), 0);
}

#[test]
fn test_partial_save_reports_committed_rows() {
    let (db, user) = db_with_user();
    let rows: Vec<Expense> = (1..=3)
        .map(|d| insert(&db, &user.id, dec!(10), date(2025, 1, d), "Food", false))
        .collect();
    let backend = FlakyBackend::new(
        db,
        Faults {
            expense_updates_before_failure: Some(1),
            ..Faults::default()
        },
    );

    let mut t = EditTracker::new();
    for e in &rows {
        t.toggle_billed(e);
    }
    let err = save_all(&mut t, &backend, &user.id).unwrap_err();
    match err {
        AppError::PartialSave { saved, failed, .. } => {
            assert_eq!(saved, vec![rows[0].id]);
            assert_eq!(failed, rows[1].id);
        }
        other => panic!("unexpected error: {other}"),
    }
    // committed row dropped, the rest still pending
    assert!(!t.is_dirty(rows[0].id));
    assert!(t.is_dirty(rows[1].id));
    assert!(t.is_dirty(rows[2].id));

    let stored = all_expenses(&backend.inner, &user.id).unwrap();
    let billed: Vec<i64> = stored.iter().filter(|e| e.billed).map(|e| e.id).collect();
    assert_eq!(billed, vec![rows[0].id]);
}

#[test]
fn test_save_scoped_to_owner() {
    let (db, user) = db_with_user();
    let foreign = insert(&db, "intruder", dec!(10), date(2025, 1, 1), "Food", false);
    let mut t = EditTracker::new();
    t.toggle_billed(&foreign);
    save_all(&mut t, &db, &user.id).unwrap();
    let stored = all_expenses(&db, "intruder").unwrap();
    assert!(!stored[0].billed);
}
