mod budget;
mod expense;
mod expense_type;
mod user;

pub(crate) use budget::{Budget, BudgetKind};
pub(crate) use expense::{BillingFilter, Expense, ExpensePatch, NewExpense};
pub(crate) use expense_type::{ExpenseType, DEFAULT_TYPES};
pub(crate) use user::{PendingEmailChange, User, UserMetadata, UserProfile};
