//! Multi-field input forms. Auth views render them full screen; everything
//! else shows them as a popup over the current screen.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::edit::Snapshot;
use crate::models::BillingFilter;
use crate::report::FilterCriteria;

const YES: &str = "Yes";
const NO: &str = "No";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Text,
    Secret,
    Toggle,
    /// One of a fixed set of values; `""` may be an option meaning "none".
    Choice(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Field {
    pub(crate) label: &'static str,
    pub(crate) kind: FieldKind,
    pub(crate) value: String,
}

impl Field {
    pub(crate) fn text(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            kind: FieldKind::Text,
            value: value.into(),
        }
    }

    pub(crate) fn secret(label: &'static str) -> Self {
        Self {
            label,
            kind: FieldKind::Secret,
            value: String::new(),
        }
    }

    pub(crate) fn toggle(label: &'static str, on: bool) -> Self {
        Self {
            label,
            kind: FieldKind::Toggle,
            value: if on { YES } else { NO }.to_string(),
        }
    }

    /// Falls back to the first option when `selected` is not among them.
    pub(crate) fn choice(label: &'static str, options: Vec<String>, selected: &str) -> Self {
        let value = options
            .iter()
            .find(|o| o.eq_ignore_ascii_case(selected))
            .or_else(|| options.first())
            .cloned()
            .unwrap_or_default();
        Self {
            label,
            kind: FieldKind::Choice(options),
            value,
        }
    }

    pub(crate) fn is_on(&self) -> bool {
        self.value == YES
    }

    /// The value as drawn: secrets masked, empty choices named.
    pub(crate) fn display(&self) -> String {
        match &self.kind {
            FieldKind::Secret => "•".repeat(self.value.chars().count()),
            FieldKind::Toggle => format!("[{}] {}", if self.is_on() { "x" } else { " " }, self.value),
            FieldKind::Choice(_) if self.value.is_empty() => "‹ none ›".to_string(),
            FieldKind::Choice(_) => format!("‹ {} ›", self.value),
            FieldKind::Text => self.value.clone(),
        }
    }

    fn cycle(&mut self, delta: i32) {
        match &self.kind {
            FieldKind::Toggle => {
                self.value = if self.is_on() { NO } else { YES }.to_string();
            }
            FieldKind::Choice(options) if !options.is_empty() => {
                let len = options.len() as i32;
                let idx = options.iter().position(|o| *o == self.value).unwrap_or(0) as i32;
                let next = (idx + delta).rem_euclid(len) as usize;
                self.value = options[next].clone();
            }
            _ => {}
        }
    }

    /// Jump to the next option starting with `c`, wrapping around.
    fn jump_to(&mut self, c: char) {
        let FieldKind::Choice(options) = &self.kind else {
            return;
        };
        let start = options.iter().position(|o| *o == self.value).unwrap_or(0);
        let lower = c.to_lowercase().to_string();
        let found = (1..=options.len())
            .map(|offset| &options[(start + offset) % options.len()])
            .find(|o| o.to_lowercase().starts_with(&lower));
        if let Some(option) = found {
            self.value = option.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FormKind {
    SignIn,
    SignUp,
    ForgotPassword,
    ResetPassword,
    ChangePassword,
    Profile,
    AddExpense,
    Budget,
    Filter,
    EditExpense { id: i64 },
    AddType,
    RenameType { old: String },
}

impl FormKind {
    pub(crate) fn title(&self) -> &'static str {
        match self {
            Self::SignIn => "Sign In",
            Self::SignUp => "Create Account",
            Self::ForgotPassword => "Forgot Password",
            Self::ResetPassword => "Set New Password",
            Self::ChangePassword => "Change Password",
            Self::Profile => "Edit Profile",
            Self::AddExpense => "Add Expense",
            Self::Budget => "Monthly Budgets",
            Self::Filter => "Filter Expenses",
            Self::EditExpense { .. } => "Edit Expense",
            Self::AddType => "Add Type",
            Self::RenameType { .. } => "Rename Type",
        }
    }

    /// Shown full screen in place of the tabs.
    pub(crate) fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::SignIn | Self::SignUp | Self::ForgotPassword | Self::ResetPassword
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Form {
    pub(crate) kind: FormKind,
    pub(crate) fields: Vec<Field>,
    pub(crate) focus: usize,
}

impl Form {
    pub(crate) fn new(kind: FormKind, fields: Vec<Field>) -> Self {
        Self {
            kind,
            fields,
            focus: 0,
        }
    }

    /// Value of the field labelled `label`, or `""` when there is none.
    pub(crate) fn value(&self, label: &str) -> &str {
        self.field(label).map(|f| f.value.as_str()).unwrap_or("")
    }

    pub(crate) fn is_on(&self, label: &str) -> bool {
        self.field(label).is_some_and(Field::is_on)
    }

    fn field(&self, label: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.label == label)
    }

    pub(crate) fn focused(&self) -> Option<&Field> {
        self.fields.get(self.focus)
    }

    pub(crate) fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub(crate) fn prev_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub(crate) fn input(&mut self, c: char) {
        let Some(field) = self.fields.get_mut(self.focus) else {
            return;
        };
        match field.kind {
            FieldKind::Text | FieldKind::Secret => field.value.push(c),
            FieldKind::Toggle if c == ' ' => field.cycle(1),
            FieldKind::Toggle => {}
            FieldKind::Choice(_) if c == ' ' => field.cycle(1),
            FieldKind::Choice(_) => field.jump_to(c),
        }
    }

    pub(crate) fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            if matches!(field.kind, FieldKind::Text | FieldKind::Secret) {
                field.value.pop();
            }
        }
    }

    /// Left/right on a toggle or choice.
    pub(crate) fn cycle(&mut self, delta: i32) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.cycle(delta);
        }
    }

    pub(crate) fn clear_secrets(&mut self) {
        for field in &mut self.fields {
            if field.kind == FieldKind::Secret {
                field.value.clear();
            }
        }
    }
}

// ── Builders ──────────────────────────────────────────────────

fn with_none(options: &[String]) -> Vec<String> {
    std::iter::once(String::new())
        .chain(options.iter().cloned())
        .collect()
}

fn amount_text(amount: Decimal) -> String {
    if amount.is_zero() {
        String::new()
    } else {
        amount.normalize().to_string()
    }
}

pub(crate) fn sign_in(email: &str) -> Form {
    let mut form = Form::new(
        FormKind::SignIn,
        vec![Field::text("Email", email), Field::secret("Password")],
    );
    if !email.is_empty() {
        form.focus = 1;
    }
    form
}

pub(crate) fn sign_up() -> Form {
    Form::new(
        FormKind::SignUp,
        vec![
            Field::text("Name", ""),
            Field::text("Email", ""),
            Field::secret("Password"),
            Field::secret("Confirm Password"),
        ],
    )
}

pub(crate) fn forgot_password(email: &str) -> Form {
    Form::new(FormKind::ForgotPassword, vec![Field::text("Email", email)])
}

pub(crate) fn reset_password() -> Form {
    Form::new(
        FormKind::ResetPassword,
        vec![Field::secret("New Password"), Field::secret("Confirm Password")],
    )
}

pub(crate) fn change_password() -> Form {
    Form::new(
        FormKind::ChangePassword,
        vec![Field::secret("New Password"), Field::secret("Confirm Password")],
    )
}

pub(crate) fn profile(name: &str, email: &str) -> Form {
    Form::new(
        FormKind::Profile,
        vec![Field::text("Name", name), Field::text("Email", email)],
    )
}

pub(crate) fn add_expense(today: NaiveDate, types: &[String], amount: Option<Decimal>) -> Form {
    Form::new(
        FormKind::AddExpense,
        vec![
            Field::text("Amount", amount.map(amount_text).unwrap_or_default()),
            Field::text("Date", today.to_string()),
            Field::choice("Type", with_none(types), ""),
            Field::text("Description", ""),
            Field::toggle("Billed", false),
        ],
    )
}

pub(crate) fn budget(billed: Decimal, unbilled: Decimal) -> Form {
    Form::new(
        FormKind::Budget,
        vec![
            Field::text("Billed", amount_text(billed)),
            Field::text("Unbilled", amount_text(unbilled)),
        ],
    )
}

pub(crate) fn filter(criteria: &FilterCriteria, types: &[String]) -> Form {
    let billing: Vec<String> = [BillingFilter::All, BillingFilter::Billed, BillingFilter::Unbilled]
        .iter()
        .map(|b| b.to_string())
        .collect();
    Form::new(
        FormKind::Filter,
        vec![
            Field::text("From", criteria.start.map(|d| d.to_string()).unwrap_or_default()),
            Field::text("To", criteria.end.map(|d| d.to_string()).unwrap_or_default()),
            Field::choice("Billing", billing, &criteria.billing.to_string()),
            Field::choice(
                "Type",
                with_none(types),
                criteria.expense_type.as_deref().unwrap_or(""),
            ),
        ],
    )
}

pub(crate) fn edit_expense(id: i64, current: &Snapshot, types: &[String]) -> Form {
    let mut options = types.to_vec();
    // A renamed-away type still has to be selectable as the current value.
    if !options.contains(&current.expense_type) {
        options.insert(0, current.expense_type.clone());
    }
    Form::new(
        FormKind::EditExpense { id },
        vec![
            Field::text("Amount", amount_text(current.amount)),
            Field::text("Date", current.date.to_string()),
            Field::choice("Type", options, &current.expense_type),
            Field::text("Description", current.note.clone()),
            Field::toggle("Billed", current.billed),
        ],
    )
}

pub(crate) fn add_type() -> Form {
    Form::new(FormKind::AddType, vec![Field::text("Name", "")])
}

pub(crate) fn rename_type(old: &str) -> Form {
    Form::new(
        FormKind::RenameType {
            old: old.to_string(),
        },
        vec![Field::text("New Name", old)],
    )
}
