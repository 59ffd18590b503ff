//! Fixtures shared by unit tests across modules.
#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::cell::Cell;

use crate::db::Database;
use crate::error::ServiceError;
use crate::models::*;
use crate::service::*;

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn expense(id: i64, amount: Decimal, on: NaiveDate, kind: &str, billed: bool) -> Expense {
    Expense {
        id,
        user_id: "u1".into(),
        amount,
        date: on,
        expense_type: kind.into(),
        note: format!("note {id}"),
        billed,
    }
}

/// A database with one signed-in user and the default types.
pub(crate) fn db_with_user() -> (Database, User) {
    let mut db = Database::open_in_memory().unwrap();
    let user = db
        .sign_up("asha@example.com", "secret1", &UserMetadata::named("Asha"))
        .unwrap()
        .unwrap();
    for name in DEFAULT_TYPES {
        db.insert_type(&ExpenseType::new(&user.id, name)).unwrap();
    }
    db.poll_events();
    (db, user)
}

pub(crate) fn insert<D: DataService + ?Sized>(
    data: &D,
    owner: &str,
    amount: Decimal,
    on: NaiveDate,
    kind: &str,
    billed: bool,
) -> Expense {
    data.insert_expense(&NewExpense {
        user_id: owner.into(),
        amount,
        date: on,
        expense_type: kind.into(),
        note: format!("{kind} {on}"),
        billed,
    })
    .unwrap()
}

pub(crate) fn type_names<D: DataService + ?Sized>(data: &D, owner: &str) -> Vec<String> {
    data.select_types(&Query::owned_by(owner).order(Column::Name, Order::Asc))
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect()
}

/// Failures to inject into a wrapped database.
#[derive(Debug, Default)]
pub(crate) struct Faults {
    /// Expense updates that succeed before every later one fails.
    pub(crate) expense_updates_before_failure: Option<usize>,
    /// Type renames that succeed before every later one fails.
    pub(crate) type_renames_before_failure: Option<usize>,
    /// `insert_type` fails for these names.
    pub(crate) failing_type_inserts: Vec<String>,
    pub(crate) fail_profile_reads: bool,
    pub(crate) fail_profile_writes: bool,
    pub(crate) fail_sign_out: bool,
    pub(crate) fail_budget_reads: bool,
}

pub(crate) struct FlakyBackend {
    pub(crate) inner: Database,
    pub(crate) faults: Faults,
    expense_updates: Cell<usize>,
    type_renames: Cell<usize>,
}

impl FlakyBackend {
    pub(crate) fn new(inner: Database, faults: Faults) -> Self {
        Self {
            inner,
            faults,
            expense_updates: Cell::new(0),
            type_renames: Cell::new(0),
        }
    }
}

fn injected(what: &str) -> ServiceError {
    ServiceError::new(format!("injected failure: {what}"))
}

fn bump(counter: &Cell<usize>, allowed: Option<usize>) -> bool {
    let n = counter.get();
    counter.set(n + 1);
    matches!(allowed, Some(limit) if n >= limit)
}

impl DataService for FlakyBackend {
    fn select_expenses(&self, query: &Query) -> ServiceResult<Vec<Expense>> {
        self.inner.select_expenses(query)
    }

    fn insert_expense(&self, expense: &NewExpense) -> ServiceResult<Expense> {
        self.inner.insert_expense(expense)
    }

    fn update_expenses(&self, query: &Query, patch: &ExpensePatch) -> ServiceResult<usize> {
        if bump(&self.expense_updates, self.faults.expense_updates_before_failure) {
            return Err(injected("update expenses"));
        }
        self.inner.update_expenses(query, patch)
    }

    fn delete_expenses(&self, query: &Query) -> ServiceResult<usize> {
        self.inner.delete_expenses(query)
    }

    fn select_types(&self, query: &Query) -> ServiceResult<Vec<ExpenseType>> {
        self.inner.select_types(query)
    }

    fn insert_type(&self, expense_type: &ExpenseType) -> ServiceResult<()> {
        if self.faults.failing_type_inserts.contains(&expense_type.name) {
            return Err(injected("insert type"));
        }
        self.inner.insert_type(expense_type)
    }

    fn rename_types(&self, query: &Query, new_name: &str) -> ServiceResult<usize> {
        if bump(&self.type_renames, self.faults.type_renames_before_failure) {
            return Err(injected("rename type"));
        }
        self.inner.rename_types(query, new_name)
    }

    fn delete_types(&self, query: &Query) -> ServiceResult<usize> {
        self.inner.delete_types(query)
    }

    fn select_budgets(&self, query: &Query) -> ServiceResult<Vec<Budget>> {
        if self.faults.fail_budget_reads {
            return Err(injected("select budgets"));
        }
        self.inner.select_budgets(query)
    }

    fn upsert_budget(&self, budget: &Budget) -> ServiceResult<()> {
        self.inner.upsert_budget(budget)
    }

    fn select_profile(&self, user_id: &str) -> ServiceResult<Option<UserProfile>> {
        if self.faults.fail_profile_reads {
            return Err(injected("select profile"));
        }
        self.inner.select_profile(user_id)
    }

    fn upsert_profile(&self, profile: &UserProfile) -> ServiceResult<()> {
        if self.faults.fail_profile_writes {
            return Err(injected("upsert profile"));
        }
        self.inner.upsert_profile(profile)
    }
}

impl AuthProvider for FlakyBackend {
    fn sign_in_with_password(&mut self, email: &str, password: &str) -> ServiceResult<User> {
        self.inner.sign_in_with_password(email, password)
    }

    fn sign_up(&mut self, email: &str, password: &str, metadata: &UserMetadata) -> ServiceResult<Option<User>> {
        self.inner.sign_up(email, password, metadata)
    }

    fn reset_password_for_email(&mut self, email: &str) -> ServiceResult<()> {
        self.inner.reset_password_for_email(email)
    }

    fn update_user(&mut self, update: &UserUpdate) -> ServiceResult<User> {
        self.inner.update_user(update)
    }

    fn sign_out(&mut self) -> ServiceResult<()> {
        if self.faults.fail_sign_out {
            return Err(injected("sign out"));
        }
        self.inner.sign_out()
    }

    fn get_user(&self) -> ServiceResult<Option<User>> {
        self.inner.get_user()
    }

    fn verify_otp(&mut self, token: &str, kind: OtpKind) -> ServiceResult<Option<User>> {
        self.inner.verify_otp(token, kind)
    }

    fn poll_events(&mut self) -> Vec<AuthEvent> {
        self.inner.poll_events()
    }
}

impl KeyValueStore for FlakyBackend {
    fn get_item(&self, key: &str) -> ServiceResult<Option<String>> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> ServiceResult<()> {
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> ServiceResult<()> {
        self.inner.remove_item(key)
    }

    fn keys(&self) -> ServiceResult<Vec<String>> {
        self.inner.keys()
    }
}
