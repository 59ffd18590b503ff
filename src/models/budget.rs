use rust_decimal::Decimal;

/// Billed and unbilled spending are tracked and budgeted independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum BudgetKind {
    Billed,
    Unbilled,
}

impl BudgetKind {
    pub(crate) fn all() -> &'static [BudgetKind] {
        &[Self::Billed, Self::Unbilled]
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Billed => "billed",
            Self::Unbilled => "unbilled",
        }
    }

    pub(crate) fn matches(&self, billed: bool) -> bool {
        match self {
            Self::Billed => billed,
            Self::Unbilled => !billed,
        }
    }
}

impl std::fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Billed => write!(f, "Billed"),
            Self::Unbilled => write!(f, "Unbilled"),
        }
    }
}

/// One row of `user_budgets`, keyed by (user, month, year).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Budget {
    pub(crate) user_id: String,
    pub(crate) month: u32,
    pub(crate) year: i32,
    pub(crate) billed: Decimal,
    pub(crate) unbilled: Decimal,
}

impl Budget {
    pub(crate) fn new(user_id: &str, year: i32, month: u32, billed: Decimal, unbilled: Decimal) -> Self {
        Self {
            user_id: user_id.to_string(),
            month,
            year,
            billed,
            unbilled,
        }
    }

    /// A missing row behaves as a zero budget.
    pub(crate) fn unset(user_id: &str, year: i32, month: u32) -> Self {
        Self::new(user_id, year, month, Decimal::ZERO, Decimal::ZERO)
    }

    pub(crate) fn amount(&self, kind: BudgetKind) -> Decimal {
        match kind {
            BudgetKind::Billed => self.billed,
            BudgetKind::Unbilled => self.unbilled,
        }
    }

    pub(crate) fn is_set(&self) -> bool {
        self.billed > Decimal::ZERO || self.unbilled > Decimal::ZERO
    }
}
