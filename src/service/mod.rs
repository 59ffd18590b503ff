//! Interfaces to the collaborators the dashboard depends on: the hosted auth
//! provider, the hosted table-query service and the local key-value store.
//!
//! `crate::db::Database` implements all three against SQLite. Everything above
//! this module is written against the traits so tests can substitute doubles.

mod query;

pub(crate) use query::{Column, Order, Predicate, Query, Value};

use crate::error::ServiceError;
use crate::models::{Budget, Expense, ExpensePatch, ExpenseType, NewExpense, User, UserMetadata, UserProfile};

pub(crate) type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthEventKind {
    PasswordRecovery,
    SignedIn,
    SignedOut,
    UserUpdated,
}

impl std::fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PasswordRecovery => write!(f, "PASSWORD_RECOVERY"),
            Self::SignedIn => write!(f, "SIGNED_IN"),
            Self::SignedOut => write!(f, "SIGNED_OUT"),
            Self::UserUpdated => write!(f, "USER_UPDATED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AuthEvent {
    pub(crate) kind: AuthEventKind,
    pub(crate) user: Option<User>,
}

impl AuthEvent {
    pub(crate) fn new(kind: AuthEventKind, user: Option<User>) -> Self {
        Self { kind, user }
    }
}

/// One-time token purposes accepted by `verify_otp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OtpKind {
    Recovery,
    EmailChange,
}

impl OtpKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Recovery => "recovery",
            Self::EmailChange => "email_change",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "recovery" => Some(Self::Recovery),
            "email_change" => Some(Self::EmailChange),
            _ => None,
        }
    }
}

/// Attributes `update_user` may change. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct UserUpdate {
    pub(crate) password: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) metadata: Option<UserMetadata>,
}

pub(crate) trait AuthProvider {
    fn sign_in_with_password(&mut self, email: &str, password: &str) -> ServiceResult<User>;

    /// Returns the created user, or `None` when the provider withholds it
    /// pending email confirmation.
    fn sign_up(&mut self, email: &str, password: &str, metadata: &UserMetadata) -> ServiceResult<Option<User>>;

    fn reset_password_for_email(&mut self, email: &str) -> ServiceResult<()>;

    /// Email changes are not applied immediately: the provider sends a
    /// confirmation token and applies the change on `verify_otp`.
    fn update_user(&mut self, update: &UserUpdate) -> ServiceResult<User>;

    fn sign_out(&mut self) -> ServiceResult<()>;

    fn get_user(&self) -> ServiceResult<Option<User>>;

    fn verify_otp(&mut self, token: &str, kind: OtpKind) -> ServiceResult<Option<User>>;

    /// Drain auth lifecycle events emitted since the last poll.
    fn poll_events(&mut self) -> Vec<AuthEvent>;
}

pub(crate) trait DataService {
    fn select_expenses(&self, query: &Query) -> ServiceResult<Vec<Expense>>;
    fn insert_expense(&self, expense: &NewExpense) -> ServiceResult<Expense>;
    fn update_expenses(&self, query: &Query, patch: &ExpensePatch) -> ServiceResult<usize>;
    fn delete_expenses(&self, query: &Query) -> ServiceResult<usize>;

    fn select_types(&self, query: &Query) -> ServiceResult<Vec<ExpenseType>>;
    fn insert_type(&self, expense_type: &ExpenseType) -> ServiceResult<()>;
    fn rename_types(&self, query: &Query, new_name: &str) -> ServiceResult<usize>;
    fn delete_types(&self, query: &Query) -> ServiceResult<usize>;

    fn select_budgets(&self, query: &Query) -> ServiceResult<Vec<Budget>>;
    /// Insert or replace on (user_id, budget_month, budget_year).
    fn upsert_budget(&self, budget: &Budget) -> ServiceResult<()>;

    fn select_profile(&self, user_id: &str) -> ServiceResult<Option<UserProfile>>;
    /// Insert or replace on user_id.
    fn upsert_profile(&self, profile: &UserProfile) -> ServiceResult<()>;
}

/// Persistent client-side key-value storage.
pub(crate) trait KeyValueStore {
    fn get_item(&self, key: &str) -> ServiceResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> ServiceResult<()>;
    fn remove_item(&self, key: &str) -> ServiceResult<()>;
    fn keys(&self) -> ServiceResult<Vec<String>>;
}

/// Everything the dashboard needs from its environment.
pub(crate) trait Backend: AuthProvider + DataService + KeyValueStore {}

impl<T: AuthProvider + DataService + KeyValueStore> Backend for T {}
