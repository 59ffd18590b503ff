use chrono::NaiveDate;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Expense {
    pub(crate) id: i64,
    pub(crate) user_id: String,
    pub(crate) amount: Decimal,
    pub(crate) date: NaiveDate,
    pub(crate) expense_type: String,
    pub(crate) note: String,
    pub(crate) billed: bool,
}

impl Expense {
    /// Amount as the service stringifies it: no trailing zeros.
    /// e.g. `100.00` → `"100"`, `12.50` → `"12.5"`
    pub(crate) fn amount_text(&self) -> String {
        self.amount.normalize().to_string()
    }
}

/// An expense row before the service has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewExpense {
    pub(crate) user_id: String,
    pub(crate) amount: Decimal,
    pub(crate) date: NaiveDate,
    pub(crate) expense_type: String,
    pub(crate) note: String,
    pub(crate) billed: bool,
}

/// Field-level update for one expense. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ExpensePatch {
    pub(crate) amount: Option<Decimal>,
    pub(crate) note: Option<String>,
    pub(crate) expense_type: Option<String>,
    pub(crate) date: Option<NaiveDate>,
    pub(crate) billed: Option<bool>,
}

impl ExpensePatch {
    pub(crate) fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.note.is_none()
            && self.expense_type.is_none()
            && self.date.is_none()
            && self.billed.is_none()
    }

    /// Column names this patch writes, in table order.
    #[cfg(test)]
    pub(crate) fn fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.amount.is_some() {
            out.push("amount");
        }
        if self.date.is_some() {
            out.push("date");
        }
        if self.expense_type.is_some() {
            out.push("type");
        }
        if self.note.is_some() {
            out.push("note");
        }
        if self.billed.is_some() {
            out.push("billed");
        }
        out
    }

    pub(crate) fn rename_type(name: &str) -> Self {
        Self {
            expense_type: Some(name.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum BillingFilter {
    #[default]
    All,
    Billed,
    Unbilled,
}

impl BillingFilter {
    pub(crate) fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "billed" | "b" => Self::Billed,
            "unbilled" | "u" => Self::Unbilled,
            _ => Self::All,
        }
    }

    pub(crate) fn as_flag(&self) -> Option<bool> {
        match self {
            Self::All => None,
            Self::Billed => Some(true),
            Self::Unbilled => Some(false),
        }
    }
}

impl std::fmt::Display for BillingFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "All"),
            Self::Billed => write!(f, "Billed"),
            Self::Unbilled => write!(f, "Unbilled"),
        }
    }
}
