mod auth;
mod schema;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;


use crate::error::ServiceError;
use crate::models::*;
use crate::service::{
    AuthEvent, Column, DataService, KeyValueStore, Order, Predicate, Query, ServiceResult, Value,
};

/// Local stand-in for the hosted backend: auth, tables and the client-side
/// key-value store share one SQLite file.
pub(crate) struct Database {
    conn: Connection,
    project: String,
    events: Vec<AuthEvent>,
}

impl Database {
    pub(crate) fn open(path: &Path, project: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to set database pragmas")?;
        let mut db = Self::with_connection(conn, project);
        db.migrate().context("Database migration failed")?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self::with_connection(conn, "local");
        db.migrate()?;
        Ok(db)
    }

    fn with_connection(conn: Connection, project: &str) -> Self {
        Self {
            conn,
            project: project.to_string(),
            events: Vec::new(),
        }
    }

    fn migrate(&mut self) -> Result<()> {
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !has_version_table {
            self.conn.execute_batch(schema::SCHEMA_V1)?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            return Ok(());
        }

        let current: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                self.conn.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
        }

        Ok(())
    }

    /// Key under which the signed-in session is persisted.
    pub(crate) fn session_key(&self) -> String {
        session_key_for(&self.project)
    }
}

pub(crate) fn session_key_for(project: &str) -> String {
    format!("sb-{project}-auth-token")
}

// ── Query translation ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Table {
    Expenses,
    ExpenseTypes,
    UserBudgets,
}

impl Table {
    fn name(&self) -> &'static str {
        match self {
            Self::Expenses => "expenses",
            Self::ExpenseTypes => "expense_types",
            Self::UserBudgets => "user_budgets",
        }
    }

    fn has_column(&self, column: Column) -> bool {
        match self {
            Self::Expenses => matches!(
                column,
                Column::Id
                    | Column::UserId
                    | Column::Date
                    | Column::Type
                    | Column::Billed
            ),
            Self::ExpenseTypes => matches!(column, Column::Id | Column::UserId | Column::Name),
            Self::UserBudgets => matches!(
                column,
                Column::Id | Column::UserId | Column::BudgetMonth | Column::BudgetYear
            ),
        }
    }
}

type SqlParams = Vec<Box<dyn ToSql>>;

fn check_column(table: Table, column: Column) -> ServiceResult<()> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(ServiceError::new(format!(
            "column {}.{} does not exist",
            table.name(),
            column.as_str()
        )))
    }
}

fn column_sql(column: Column) -> String {
    format!("\"{}\"", column.as_str())
}

fn boxed_value(value: &Value) -> Box<dyn ToSql> {
    match value {
        Value::Text(s) => Box::new(s.clone()),
        Value::Int(n) => Box::new(*n),
        Value::Bool(b) => Box::new(*b),
        Value::Amount(d) => Box::new(d.to_string()),
        Value::Date(d) => Box::new(d.format("%Y-%m-%d").to_string()),
    }
}

/// Translate predicates into a WHERE clause, appending bound values to
/// `param_values`.
fn where_clause(table: Table, query: &Query, param_values: &mut SqlParams) -> ServiceResult<String> {
    let mut sql = String::from(" WHERE 1=1");
    for predicate in &query.predicates {
        let column = predicate.column();
        check_column(table, column)?;
        let n = param_values.len() + 1;
        let lhs = column_sql(column);
        match predicate {
            Predicate::Eq(_, v) => {
                sql.push_str(&format!(" AND {lhs} = ?{n}"));
                param_values.push(boxed_value(v));
            }
            Predicate::Neq(_, v) => {
                sql.push_str(&format!(" AND {lhs} != ?{n}"));
                param_values.push(boxed_value(v));
            }
            Predicate::Gte(_, v) => {
                sql.push_str(&format!(" AND {lhs} >= ?{n}"));
                param_values.push(boxed_value(v));
            }
            Predicate::Lte(_, v) => {
                sql.push_str(&format!(" AND {lhs} <= ?{n}"));
                param_values.push(boxed_value(v));
            }
            Predicate::ILike(_, pattern) => {
                sql.push_str(&format!(" AND lower({lhs}) LIKE lower(?{n})"));
                param_values.push(Box::new(pattern.clone()));
            }
        }
    }
    Ok(sql)
}

fn order_and_limit(table: Table, query: &Query, default: &str) -> ServiceResult<String> {
    let mut sql = match query.order {
        Some((column, order)) => {
            check_column(table, column)?;
            let dir = match order {
                Order::Asc => "ASC",
                Order::Desc => "DESC",
            };
            format!(" ORDER BY {} {dir}, id {dir}", column_sql(column))
        }
        None => format!(" ORDER BY {default}"),
    };
    if let Some(l) = query.limit {
        sql.push_str(&format!(" LIMIT {l}"));
    }
    Ok(sql)
}

fn as_refs(param_values: &SqlParams) -> Vec<&dyn ToSql> {
    param_values.iter().map(|p| p.as_ref()).collect()
}

fn parse_date(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_decimal(idx: usize, s: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn expense_from_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    let amount_str: String = row.get(2)?;
    let date_str: String = row.get(3)?;
    Ok(Expense {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount: parse_decimal(2, &amount_str)?,
        date: parse_date(3, &date_str)?,
        expense_type: row.get(4)?,
        note: row.get(5)?,
        billed: row.get(6)?,
    })
}

fn budget_from_row(row: &Row<'_>) -> rusqlite::Result<Budget> {
    let billed: String = row.get(1)?;
    let unbilled: String = row.get(2)?;
    Ok(Budget {
        user_id: row.get(0)?,
        billed: parse_decimal(1, &billed)?,
        unbilled: parse_decimal(2, &unbilled)?,
        month: row.get(3)?,
        year: row.get(4)?,
    })
}

const EXPENSE_COLUMNS: &str = "id, user_id, amount, date, \"type\", note, billed";

// ── Tables ────────────────────────────────────────────────────

impl DataService for Database {
    fn select_expenses(&self, query: &Query) -> ServiceResult<Vec<Expense>> {
        let mut param_values: SqlParams = Vec::new();
        let mut sql = format!("SELECT {EXPENSE_COLUMNS} FROM expenses");
        sql.push_str(&where_clause(Table::Expenses, query, &mut param_values)?);
        sql.push_str(&order_and_limit(Table::Expenses, query, "id")?);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(as_refs(&param_values).as_slice(), expense_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn insert_expense(&self, expense: &NewExpense) -> ServiceResult<Expense> {
        self.conn.execute(
            "INSERT INTO expenses (user_id, amount, date, \"type\", note, billed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                expense.user_id,
                expense.amount.to_string(),
                expense.date.format("%Y-%m-%d").to_string(),
                expense.expense_type,
                expense.note,
                expense.billed,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, "expense inserted");
        Ok(Expense {
            id,
            user_id: expense.user_id.clone(),
            amount: expense.amount,
            date: expense.date,
            expense_type: expense.expense_type.clone(),
            note: expense.note.clone(),
            billed: expense.billed,
        })
    }

    fn update_expenses(&self, query: &Query, patch: &ExpensePatch) -> ServiceResult<usize> {
        if patch.is_empty() {
            return Ok(0);
        }
        let mut param_values: SqlParams = Vec::new();
        let mut sets = Vec::new();
        if let Some(amount) = patch.amount {
            param_values.push(Box::new(amount.to_string()));
            sets.push(format!("amount = ?{}", param_values.len()));
        }
        if let Some(date) = patch.date {
            param_values.push(Box::new(date.format("%Y-%m-%d").to_string()));
            sets.push(format!("date = ?{}", param_values.len()));
        }
        if let Some(ref expense_type) = patch.expense_type {
            param_values.push(Box::new(expense_type.clone()));
            sets.push(format!("\"type\" = ?{}", param_values.len()));
        }
        if let Some(ref note) = patch.note {
            param_values.push(Box::new(note.clone()));
            sets.push(format!("note = ?{}", param_values.len()));
        }
        if let Some(billed) = patch.billed {
            param_values.push(Box::new(billed));
            sets.push(format!("billed = ?{}", param_values.len()));
        }
        let mut sql = format!("UPDATE expenses SET {}", sets.join(", "));
        sql.push_str(&where_clause(Table::Expenses, query, &mut param_values)?);
        Ok(self.conn.execute(&sql, as_refs(&param_values).as_slice())?)
    }

    fn delete_expenses(&self, query: &Query) -> ServiceResult<usize> {
        let mut param_values: SqlParams = Vec::new();
        let mut sql = String::from("DELETE FROM expenses");
        sql.push_str(&where_clause(Table::Expenses, query, &mut param_values)?);
        Ok(self.conn.execute(&sql, as_refs(&param_values).as_slice())?)
    }

    fn select_types(&self, query: &Query) -> ServiceResult<Vec<ExpenseType>> {
        let mut param_values: SqlParams = Vec::new();
        let mut sql = String::from("SELECT user_id, name FROM expense_types");
        sql.push_str(&where_clause(Table::ExpenseTypes, query, &mut param_values)?);
        sql.push_str(&order_and_limit(Table::ExpenseTypes, query, "id")?);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(as_refs(&param_values).as_slice(), |row| {
            Ok(ExpenseType {
                user_id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn insert_type(&self, expense_type: &ExpenseType) -> ServiceResult<()> {
        self.conn.execute(
            "INSERT INTO expense_types (user_id, name) VALUES (?1, ?2)",
            params![expense_type.user_id, expense_type.name],
        )?;
        Ok(())
    }

    fn rename_types(&self, query: &Query, new_name: &str) -> ServiceResult<usize> {
        let mut param_values: SqlParams = vec![Box::new(new_name.to_string())];
        let mut sql = String::from("UPDATE expense_types SET name = ?1");
        sql.push_str(&where_clause(Table::ExpenseTypes, query, &mut param_values)?);
        Ok(self.conn.execute(&sql, as_refs(&param_values).as_slice())?)
    }

    fn delete_types(&self, query: &Query) -> ServiceResult<usize> {
        let mut param_values: SqlParams = Vec::new();
        let mut sql = String::from("DELETE FROM expense_types");
        sql.push_str(&where_clause(Table::ExpenseTypes, query, &mut param_values)?);
        Ok(self.conn.execute(&sql, as_refs(&param_values).as_slice())?)
    }

    fn select_budgets(&self, query: &Query) -> ServiceResult<Vec<Budget>> {
        let mut param_values: SqlParams = Vec::new();
        let mut sql = String::from(
            "SELECT user_id, monthly_billed_budget, monthly_unbilled_budget, budget_month, budget_year
             FROM user_budgets",
        );
        sql.push_str(&where_clause(Table::UserBudgets, query, &mut param_values)?);
        sql.push_str(&order_and_limit(Table::UserBudgets, query, "id")?);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(as_refs(&param_values).as_slice(), budget_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn upsert_budget(&self, budget: &Budget) -> ServiceResult<()> {
        self.conn.execute(
            "INSERT INTO user_budgets (user_id, monthly_billed_budget, monthly_unbilled_budget, budget_month, budget_year)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, budget_month, budget_year)
             DO UPDATE SET monthly_billed_budget = ?2, monthly_unbilled_budget = ?3",
            params![
                budget.user_id,
                budget.billed.to_string(),
                budget.unbilled.to_string(),
                budget.month,
                budget.year,
            ],
        )?;
        Ok(())
    }

    fn select_profile(&self, user_id: &str) -> ServiceResult<Option<UserProfile>> {
        let result = self.conn.query_row(
            "SELECT user_id, requires_password_reset FROM user_profiles WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(UserProfile {
                    user_id: row.get(0)?,
                    requires_password_reset: row.get(1)?,
                })
            },
        );
        match result {
            Ok(p) => Ok(Some(p)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn upsert_profile(&self, profile: &UserProfile) -> ServiceResult<()> {
        self.conn.execute(
            "INSERT INTO user_profiles (user_id, requires_password_reset) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET requires_password_reset = ?2",
            params![profile.user_id, profile.requires_password_reset],
        )?;
        Ok(())
    }
}

// ── Key-value store ───────────────────────────────────────────

impl KeyValueStore for Database {
    fn get_item(&self, key: &str) -> ServiceResult<Option<String>> {
        let result = self.conn.query_row(
            "SELECT value FROM local_storage WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> ServiceResult<()> {
        self.conn.execute(
            "INSERT INTO local_storage (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> ServiceResult<()> {
        self.conn
            .execute("DELETE FROM local_storage WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn keys(&self) -> ServiceResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM local_storage ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests;
