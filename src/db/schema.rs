pub(crate) const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS expenses (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id   TEXT NOT NULL,
    amount    TEXT NOT NULL,
    date      TEXT NOT NULL,
    type      TEXT NOT NULL,
    note      TEXT NOT NULL DEFAULT '',
    billed    BOOLEAN NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_expenses_user_date ON expenses(user_id, date);
CREATE INDEX IF NOT EXISTS idx_expenses_user_type ON expenses(user_id, type);

CREATE TABLE IF NOT EXISTS expense_types (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id   TEXT NOT NULL,
    name      TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_expense_types_owner_name
    ON expense_types(user_id, name COLLATE NOCASE);

CREATE TABLE IF NOT EXISTS user_budgets (
    id                       INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id                  TEXT NOT NULL,
    monthly_billed_budget    TEXT NOT NULL DEFAULT '0',
    monthly_unbilled_budget  TEXT NOT NULL DEFAULT '0',
    budget_month             INTEGER NOT NULL,
    budget_year              INTEGER NOT NULL,
    UNIQUE(user_id, budget_month, budget_year)
);

CREATE TABLE IF NOT EXISTS user_profiles (
    user_id                  TEXT PRIMARY KEY,
    requires_password_reset  BOOLEAN NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS auth_users (
    id             TEXT PRIMARY KEY,
    email          TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash  TEXT NOT NULL,
    salt           TEXT NOT NULL,
    display_name   TEXT,
    name           TEXT,
    full_name      TEXT,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS auth_tokens (
    token      TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES auth_users(id),
    kind       TEXT NOT NULL,
    new_email  TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS auth_outbox (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    email      TEXT NOT NULL,
    subject    TEXT NOT NULL,
    link       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS local_storage (
    key    TEXT PRIMARY KEY,
    value  TEXT NOT NULL
);
"#;

pub(crate) const CURRENT_VERSION: i32 = 1;

/// Migrations from version N to N+1.
/// Each entry is (from_version, sql).
pub(crate) const MIGRATIONS: &[(i32, &str)] = &[];
