use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Columns addressable by filter predicates across the four tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Column {
    Id,
    UserId,
    Date,
    Type,
    Billed,
    Name,
    BudgetMonth,
    BudgetYear,
}

impl Column {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::UserId => "user_id",
            Self::Date => "date",
            Self::Type => "type",
            Self::Billed => "billed",
            Self::Name => "name",
            Self::BudgetMonth => "budget_month",
            Self::BudgetYear => "budget_year",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value {
    Text(String),
    Int(i64),
    Bool(bool),
    Amount(Decimal),
    Date(NaiveDate),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Int(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Self::Amount(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Predicate {
    Eq(Column, Value),
    Neq(Column, Value),
    Gte(Column, Value),
    Lte(Column, Value),
    /// Case-insensitive LIKE; `%` and `_` keep their wildcard meaning.
    ILike(Column, String),
}

impl Predicate {
    pub(crate) fn column(&self) -> Column {
        match self {
            Self::Eq(c, _) | Self::Neq(c, _) | Self::Gte(c, _) | Self::Lte(c, _) | Self::ILike(c, _) => *c,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Order {
    Asc,
    Desc,
}

/// A composable filter in the shape of a hosted table API call:
/// `Query::new().eq(..).gte(..).order(..).limit(..)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Query {
    pub(crate) predicates: Vec<Predicate>,
    pub(crate) order: Option<(Column, Order)>,
    pub(crate) limit: Option<u32>,
}

impl Query {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn eq(mut self, column: Column, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Eq(column, value.into()));
        self
    }

    pub(crate) fn neq(mut self, column: Column, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Neq(column, value.into()));
        self
    }

    pub(crate) fn gte(mut self, column: Column, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Gte(column, value.into()));
        self
    }

    pub(crate) fn lte(mut self, column: Column, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Lte(column, value.into()));
        self
    }

    pub(crate) fn ilike(mut self, column: Column, pattern: &str) -> Self {
        self.predicates
            .push(Predicate::ILike(column, pattern.to_string()));
        self
    }

    pub(crate) fn order(mut self, column: Column, order: Order) -> Self {
        self.order = Some((column, order));
        self
    }

    pub(crate) fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    /// At most one row is expected; callers take the first.
    pub(crate) fn single(self) -> Self {
        self.limit(1)
    }

    /// Owner scope shared by every user-facing query.
    pub(crate) fn owned_by(owner: &str) -> Self {
        Self::new().eq(Column::UserId, owner)
    }
}
