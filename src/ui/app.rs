use rust_decimal::Decimal;

use super::form::{self, Form, FormKind};
use super::theme::{self, Palette};
use crate::calendar::parse_date;
use crate::db::Database;
use crate::edit::FieldChange;
use crate::expenses::{parse_amount, ExpenseInput, MAX_AMOUNT, MAX_NOTE_CHARS};
use crate::models::{BillingFilter, Expense, ExpenseType};
use crate::report::FilterCriteria;
use crate::session::SessionState;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    Dashboard,
    Analytics,
    Search,
    Insights,
    Types,
}

impl Screen {
    pub(crate) fn all() -> &'static [Screen] {
        &[
            Self::Dashboard,
            Self::Analytics,
            Self::Search,
            Self::Insights,
            Self::Types,
        ]
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dashboard => write!(f, "Dashboard"),
            Self::Analytics => write!(f, "Analytics"),
            Self::Search => write!(f, "Search"),
            Self::Insights => write!(f, "Insights"),
            Self::Types => write!(f, "Types"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputMode {
    Normal,
    Command,
    Search,
    Form,
    Confirm,
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "NORMAL"),
            Self::Command => write!(f, "COMMAND"),
            Self::Search => write!(f, "SEARCH"),
            Self::Form => write!(f, "FORM"),
            Self::Confirm => write!(f, "CONFIRM"),
        }
    }
}

/// Pending action that requires user confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PendingAction {
    DeleteExpense { id: i64, note: String },
    DeleteType { name: String },
    /// Leaving analytics drops unsaved row edits.
    DiscardEdits { to: Screen },
    SignOut,
}

pub(crate) struct App {
    pub(crate) running: bool,
    pub(crate) screen: Screen,
    pub(crate) input_mode: InputMode,
    pub(crate) command_input: String,
    pub(crate) status_message: String,
    pub(crate) show_help: bool,
    pub(crate) state: AppState,
    pub(crate) form: Option<Form>,

    // Cursors
    pub(crate) recent_index: usize,
    pub(crate) analytics_index: usize,
    pub(crate) analytics_scroll: usize,
    pub(crate) search_index: usize,
    pub(crate) search_scroll: usize,
    pub(crate) type_index: usize,
    pub(crate) type_scroll: usize,

    // Confirmation
    pub(crate) pending_action: Option<PendingAction>,
    pub(crate) confirm_message: String,

    // Layout (updated each render frame)
    pub(crate) visible_rows: usize,

    seen_session: SessionState,
}

impl App {
    pub(crate) fn new(state: AppState) -> Self {
        let mut app = Self {
            running: true,
            screen: Screen::Dashboard,
            input_mode: InputMode::Normal,
            command_input: String::new(),
            status_message: String::new(),
            show_help: false,
            state,
            form: None,

            recent_index: 0,
            analytics_index: 0,
            analytics_scroll: 0,
            search_index: 0,
            search_scroll: 0,
            type_index: 0,
            type_scroll: 0,

            pending_action: None,
            confirm_message: String::new(),

            visible_rows: 20,

            seen_session: SessionState::Anonymous,
        };
        app.route_session();
        app
    }

    pub(crate) fn palette(&self) -> &'static Palette {
        theme::palette(self.state.dark_mode)
    }

    pub(crate) fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    pub(crate) fn is_signed_in(&self) -> bool {
        self.state.owner().is_some()
    }

    /// Route to the view matching the session state. Called after every
    /// event; only acts when the state changed.
    pub(crate) fn sync_session(&mut self) {
        if self.state.session.state() != self.seen_session {
            self.route_session();
        }
    }

    fn route_session(&mut self) {
        let current = self.state.session.state();
        self.seen_session = current;
        match current {
            SessionState::Anonymous => {
                self.screen = Screen::Dashboard;
                self.pending_action = None;
                let keep = self
                    .form
                    .as_ref()
                    .is_some_and(|f| f.kind.is_auth() && f.kind != FormKind::ResetPassword);
                if !keep {
                    self.open_form(form::sign_in(""));
                }
            }
            SessionState::PasswordResetForced => self.open_form(form::reset_password()),
            SessionState::Authenticated | SessionState::EmailChangePending => {
                if self.form.as_ref().is_some_and(|f| f.kind.is_auth()) {
                    self.close_form();
                }
                self.screen = Screen::Dashboard;
                self.recent_index = 0;
            }
        }
    }

    // ── Forms ─────────────────────────────────────────────────

    pub(crate) fn open_form(&mut self, form: Form) {
        self.form = Some(form);
        self.input_mode = InputMode::Form;
    }

    pub(crate) fn close_form(&mut self) {
        self.form = None;
        self.input_mode = InputMode::Normal;
    }

    pub(crate) fn open_add_expense(&mut self) {
        let prefill = self.state.prefill_amount();
        let form = form::add_expense(self.state.today, &self.state.types, prefill);
        self.open_form(form);
    }

    pub(crate) fn open_budget(&mut self) {
        let (billed, unbilled) = self
            .state
            .budget
            .as_ref()
            .map(|d| (d.budget.billed, d.budget.unbilled))
            .unwrap_or_default();
        self.open_form(form::budget(billed, unbilled));
    }

    pub(crate) fn open_filter(&mut self) {
        let form = form::filter(&self.state.filter.criteria, &self.state.types);
        self.open_form(form);
    }

    pub(crate) fn open_profile(&mut self) {
        let (name, email) = self
            .state
            .session
            .user()
            .map(|u| (u.profile_name(), u.email.clone()))
            .unwrap_or_default();
        self.open_form(form::profile(&name, &email));
    }

    /// Start editing the selected analytics row.
    pub(crate) fn open_edit_selected(&mut self) {
        let Some(row) = self.selected_expense() else {
            self.set_status("No expense selected");
            return;
        };
        self.state.begin_edit(row.id);
        let current = self.state.edits.display(&row);
        let form = form::edit_expense(row.id, &current, &self.state.types);
        self.open_form(form);
    }

    /// Esc on a form. Auth forms fall back to sign-in; an open row edit is
    /// cancelled and its values restored.
    pub(crate) fn cancel_form(&mut self) {
        let Some(form) = self.form.take() else {
            return;
        };
        match form.kind {
            FormKind::SignUp | FormKind::ForgotPassword => {
                let email = form.value("Email").to_string();
                self.open_form(form::sign_in(&email));
            }
            FormKind::SignIn | FormKind::ResetPassword => self.form = Some(form),
            FormKind::EditExpense { id } => {
                self.state.cancel_edit(id);
                self.close_form();
            }
            _ => self.close_form(),
        }
    }

    pub(crate) fn submit_form(&mut self, db: &mut Database) {
        let Some(form) = self.form.clone() else {
            return;
        };
        let done = match &form.kind {
            FormKind::SignIn => {
                let ok = self
                    .state
                    .sign_in(db, form.value("Email").trim(), form.value("Password"));
                if !ok {
                    self.clear_form_secrets();
                }
                ok
            }
            FormKind::SignUp => {
                let email = form.value("Email").trim().to_string();
                let ok = self.state.sign_up(
                    db,
                    form.value("Name"),
                    &email,
                    form.value("Password"),
                    form.value("Confirm Password"),
                );
                if ok && !self.is_signed_in() {
                    self.open_form(form::sign_in(&email));
                }
                ok
            }
            FormKind::ForgotPassword => {
                let email = form.value("Email").trim().to_string();
                let ok = self.state.request_password_reset(db, &email);
                if ok {
                    self.open_form(form::sign_in(&email));
                }
                ok
            }
            FormKind::ResetPassword | FormKind::ChangePassword => {
                let ok = self.state.set_new_password(
                    db,
                    form.value("New Password"),
                    form.value("Confirm Password"),
                );
                if !ok {
                    self.clear_form_secrets();
                }
                ok
            }
            FormKind::Profile => {
                self.state
                    .update_profile(db, form.value("Name"), form.value("Email"))
            }
            FormKind::AddExpense => self.submit_add_expense(&form, db),
            FormKind::Budget => self.submit_budget(&form, db),
            FormKind::Filter => self.submit_filter(&form, db),
            FormKind::EditExpense { id } => self.submit_edit(*id, &form),
            FormKind::AddType => self.state.add_type(&*db, form.value("Name")),
            FormKind::RenameType { old } => {
                self.state.rename_type(&*db, old, form.value("New Name"))
            }
        };

        // Auth outcomes are routed by the session; a form replaced above stays.
        let replaced = self.form.as_ref().map(|f| &f.kind) != Some(&form.kind);
        if done && !form.kind.is_auth() && !replaced {
            self.close_form();
        }
        self.sync_session();
    }

    fn clear_form_secrets(&mut self) {
        if let Some(form) = self.form.as_mut() {
            form.clear_secrets();
        }
    }

    fn submit_add_expense(&mut self, form: &Form, db: &Database) -> bool {
        let Some(date) = parse_date(form.value("Date")) else {
            self.state
                .notifier
                .validation(&["Please enter a valid date (YYYY-MM-DD)".to_string()]);
            return false;
        };
        let input = ExpenseInput {
            amount: parse_amount(form.value("Amount")),
            date,
            expense_type: form.value("Type").to_string(),
            note: form.value("Description").to_string(),
            billed: form.is_on("Billed"),
        };
        let ok = self.state.add_expense(db, &input);
        if ok {
            self.recent_index = 0;
        }
        ok
    }

    fn submit_budget(&mut self, form: &Form, db: &Database) -> bool {
        let parse = |label: &str| -> Option<Decimal> {
            let raw = form.value(label).trim();
            if raw.is_empty() {
                Some(Decimal::ZERO)
            } else {
                parse_amount(raw)
            }
        };
        match (parse("Billed"), parse("Unbilled")) {
            (Some(billed), Some(unbilled)) => self.state.set_budget(db, billed, unbilled),
            _ => {
                self.state
                    .notifier
                    .validation(&["Please enter valid budget amounts.".to_string()]);
                false
            }
        }
    }

    fn submit_filter(&mut self, form: &Form, db: &Database) -> bool {
        let date = |label: &str| -> Result<Option<chrono::NaiveDate>, ()> {
            let raw = form.value(label).trim();
            if raw.is_empty() {
                return Ok(None);
            }
            parse_date(raw).map(Some).ok_or(())
        };
        let (Ok(start), Ok(end)) = (date("From"), date("To")) else {
            self.state
                .notifier
                .validation(&["Dates must be in YYYY-MM-DD format.".to_string()]);
            return false;
        };
        let expense_type = Some(form.value("Type").to_string()).filter(|t| !t.is_empty());
        let criteria = FilterCriteria {
            start,
            end,
            billing: BillingFilter::parse(form.value("Billing")),
            expense_type,
        };
        self.state.apply_filter(db, criteria);
        self.analytics_index = 0;
        self.analytics_scroll = 0;
        true
    }

    /// Push changed fields into the tracker and leave edit mode. The row
    /// stays dirty until saved.
    fn submit_edit(&mut self, id: i64, form: &Form) -> bool {
        let mut errors = Vec::new();
        let amount = parse_amount(form.value("Amount"));
        match amount {
            Some(a) if a > MAX_AMOUNT => errors.push("Amount cannot exceed ₹10,00,000".to_string()),
            Some(a) if a > Decimal::ZERO => {}
            _ => errors.push("Please enter a valid amount greater than 0".to_string()),
        }
        let date = parse_date(form.value("Date"));
        if date.is_none() {
            errors.push("Please enter a valid date (YYYY-MM-DD)".to_string());
        }
        let expense_type = form.value("Type").trim();
        if ExpenseType::find_by_name(&self.state.types, expense_type).is_none() {
            errors.push("Expense type is required".to_string());
        }
        let note = form.value("Description").trim();
        if note.is_empty() {
            errors.push("Description is required".to_string());
        } else if note.chars().count() > MAX_NOTE_CHARS {
            errors.push(format!("Description cannot exceed {MAX_NOTE_CHARS} characters"));
        }
        if !errors.is_empty() {
            self.state.notifier.validation(&errors);
            return false;
        }

        let changes = [
            amount.map(FieldChange::Amount),
            date.map(FieldChange::Date),
            Some(FieldChange::Type(expense_type.to_string())),
            Some(FieldChange::Note(note.to_string())),
            Some(FieldChange::Billed(form.is_on("Billed"))),
        ];
        for change in changes.into_iter().flatten() {
            self.state.edit_field(id, change);
        }
        self.state.end_edit(id);
        true
    }

    // ── Navigation ────────────────────────────────────────────

    /// Returns false when the switch waits on a discard confirmation.
    pub(crate) fn switch_screen(&mut self, db: &Database, screen: Screen) -> bool {
        if !self.is_signed_in() || screen == self.screen {
            return true;
        }
        if self.screen == Screen::Analytics && self.state.edits.has_changes() {
            let count = self.state.edits.dirty_count();
            self.confirm_message = format!(
                "Discard {count} unsaved change{}?",
                if count == 1 { "" } else { "s" }
            );
            self.pending_action = Some(PendingAction::DiscardEdits { to: screen });
            self.input_mode = InputMode::Confirm;
            return false;
        }
        self.enter_screen(db, screen);
        true
    }

    /// Switch without the unsaved-changes check.
    pub(crate) fn enter_screen(&mut self, db: &Database, screen: Screen) {
        match self.screen {
            Screen::Analytics => self.state.close_analytics(),
            Screen::Search => self.state.close_search(),
            _ => {}
        }
        self.screen = screen;
        match screen {
            Screen::Dashboard => {
                self.state.refresh_dashboard(db);
                self.recent_index = 0;
            }
            Screen::Analytics => {
                self.state.open_analytics(db);
                self.analytics_index = 0;
                self.analytics_scroll = 0;
            }
            Screen::Search => {
                self.state.open_search(db);
                self.search_index = 0;
                self.search_scroll = 0;
            }
            Screen::Insights => self.state.load_insights(db),
            Screen::Types => {
                self.type_index = 0;
                self.type_scroll = 0;
            }
        }
        self.set_status(format!("{screen}"));
    }

    /// The expense under the cursor on the current screen.
    pub(crate) fn selected_expense(&self) -> Option<Expense> {
        match self.screen {
            Screen::Dashboard => self.state.recent.get(self.recent_index).cloned(),
            Screen::Analytics => self.state.filter.rows().get(self.analytics_index).cloned(),
            Screen::Search => self
                .state
                .search_results()
                .rows
                .into_iter()
                .nth(self.search_index),
            _ => None,
        }
    }

    pub(crate) fn selected_type(&self) -> Option<&String> {
        self.state.types.get(self.type_index)
    }

    pub(crate) fn request_delete_expense(&mut self) {
        let Some(expense) = self.selected_expense() else {
            self.set_status("No expense selected");
            return;
        };
        let (id, note) = (expense.id, expense.note);
        self.confirm_message = format!("Delete '{note}'?");
        self.pending_action = Some(PendingAction::DeleteExpense { id, note });
        self.input_mode = InputMode::Confirm;
    }

    pub(crate) fn request_delete_type(&mut self) {
        let Some(name) = self.selected_type().cloned() else {
            self.set_status("No type selected");
            return;
        };
        self.confirm_message = format!("Delete type '{name}'?");
        self.pending_action = Some(PendingAction::DeleteType { name });
        self.input_mode = InputMode::Confirm;
    }

    pub(crate) fn request_sign_out(&mut self) {
        self.confirm_message = "Sign out from all devices?".to_string();
        self.pending_action = Some(PendingAction::SignOut);
        self.input_mode = InputMode::Confirm;
    }

    pub(crate) fn confirm_pending(&mut self, db: &mut Database) {
        let Some(action) = self.pending_action.take() else {
            return;
        };
        self.input_mode = InputMode::Normal;
        self.confirm_message.clear();
        match action {
            PendingAction::DeleteExpense { id, note } => {
                if self.state.delete_expense(&*db, id) {
                    self.set_status(format!("Deleted: {note}"));
                }
                self.clamp_cursors();
            }
            PendingAction::DeleteType { name } => {
                if self.state.delete_type(&*db, &name) {
                    self.set_status(format!("Deleted type: {name}"));
                }
                self.clamp_cursors();
            }
            PendingAction::DiscardEdits { to } => {
                self.state.close_analytics();
                self.enter_screen(&*db, to);
            }
            PendingAction::SignOut => self.state.sign_out(db),
        }
        self.sync_session();
    }

    pub(crate) fn cancel_pending(&mut self) {
        self.pending_action = None;
        self.input_mode = InputMode::Normal;
        self.confirm_message.clear();
        self.set_status("Cancelled");
    }

    /// Keep cursors inside lists that may have shrunk.
    pub(crate) fn clamp_cursors(&mut self) {
        use super::util::clamp_cursor;
        let mut unused = 0;
        clamp_cursor(&mut self.recent_index, &mut unused, self.state.recent.len());
        clamp_cursor(
            &mut self.analytics_index,
            &mut self.analytics_scroll,
            self.state.filter.rows().len(),
        );
        let found = self.state.search_results().count();
        clamp_cursor(&mut self.search_index, &mut self.search_scroll, found);
        clamp_cursor(&mut self.type_index, &mut self.type_scroll, self.state.types.len());
    }

    pub(crate) fn page(&self) -> usize {
        self.visible_rows.max(1)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::launch::LaunchParams;
    use crate::testutil::db_with_user;

    fn signed_in_app() -> (Database, App) {
        let (mut db, _) = db_with_user();
        let mut state = AppState::new(LaunchParams::default(), std::env::temp_dir());
        state.start(&mut db);
        (db, App::new(state))
    }

    fn fill(app: &mut App, values: &[(&str, &str)]) {
        let form = app.form.as_mut().unwrap();
        for (label, value) in values {
            let field = form.fields.iter_mut().find(|f| f.label == *label).unwrap();
            field.value = value.to_string();
        }
    }

    #[test]
    fn test_anonymous_start_shows_sign_in() {
        let mut db = Database::open_in_memory().unwrap();
        let mut state = AppState::new(LaunchParams::default(), std::env::temp_dir());
        state.start(&mut db);
        let app = App::new(state);
        assert_eq!(app.input_mode, InputMode::Form);
        assert_eq!(app.form.as_ref().unwrap().kind, FormKind::SignIn);
    }

    #[test]
    fn test_sign_in_form_routes_to_dashboard() {
        let (mut db, mut app) = signed_in_app();
        app.state.sign_out(&mut db);
        app.sync_session();
        assert_eq!(app.form.as_ref().unwrap().kind, FormKind::SignIn);

        fill(&mut app, &[("Email", "asha@example.com"), ("Password", "secret1")]);
        app.submit_form(&mut db);
        assert!(app.form.is_none());
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.screen, Screen::Dashboard);
    }

    #[test]
    fn test_failed_sign_in_clears_password() {
        let (mut db, mut app) = signed_in_app();
        app.state.sign_out(&mut db);
        app.sync_session();
        fill(&mut app, &[("Email", "asha@example.com"), ("Password", "nope")]);
        app.submit_form(&mut db);
        let form = app.form.as_ref().unwrap();
        assert_eq!(form.value("Password"), "");
        assert_eq!(form.value("Email"), "asha@example.com");
    }

    #[test]
    fn test_add_expense_form_submits() {
        let (mut db, mut app) = signed_in_app();
        app.open_add_expense();
        fill(
            &mut app,
            &[("Amount", "1,250"), ("Type", "Food"), ("Description", "groceries")],
        );
        app.submit_form(&mut db);
        assert!(app.form.is_none());
        assert_eq!(app.state.recent.len(), 1);
        assert_eq!(app.state.recent[0].amount, Decimal::from(1250));
    }

    #[test]
    fn test_invalid_add_keeps_form_open() {
        let (mut db, mut app) = signed_in_app();
        app.open_add_expense();
        fill(&mut app, &[("Amount", "abc")]);
        app.submit_form(&mut db);
        assert!(app.form.is_some());
        assert!(app.state.notifier.inline().is_some());
    }

    #[test]
    fn test_edit_form_marks_row_dirty() {
        let (mut db, mut app) = signed_in_app();
        app.open_add_expense();
        fill(&mut app, &[("Amount", "100"), ("Type", "Food"), ("Description", "lunch")]);
        app.submit_form(&mut db);
        app.enter_screen(&db, Screen::Analytics);

        app.open_edit_selected();
        fill(&mut app, &[("Amount", "120")]);
        app.submit_form(&mut db);
        let id = app.state.filter.rows()[0].id;
        assert!(app.state.edits.is_dirty(id));
        assert!(!app.state.edits.is_editing(id));
    }

    #[test]
    fn test_edit_form_rejects_bad_description() {
        let (mut db, mut app) = signed_in_app();
        app.open_add_expense();
        fill(&mut app, &[("Amount", "100"), ("Type", "Food"), ("Description", "lunch")]);
        app.submit_form(&mut db);
        app.enter_screen(&db, Screen::Analytics);
        let id = app.state.filter.rows()[0].id;

        for note in ["x".repeat(MAX_NOTE_CHARS + 1), "   ".to_string()] {
            app.open_edit_selected();
            fill(&mut app, &[("Description", note.as_str())]);
            app.submit_form(&mut db);
            assert!(app.form.is_some());
            assert!(!app.state.edits.is_dirty(id));
            app.cancel_form();
        }

        app.state.save_edits(&db);
        assert_eq!(app.state.filter.rows()[0].note, "lunch");
    }

    #[test]
    fn test_leaving_analytics_with_edits_asks_first() {
        let (mut db, mut app) = signed_in_app();
        app.open_add_expense();
        fill(&mut app, &[("Amount", "100"), ("Type", "Food"), ("Description", "lunch")]);
        app.submit_form(&mut db);
        app.enter_screen(&db, Screen::Analytics);
        let id = app.state.filter.rows()[0].id;
        app.state.toggle_billed(id);

        assert!(!app.switch_screen(&db, Screen::Dashboard));
        assert_eq!(app.input_mode, InputMode::Confirm);
        app.confirm_pending(&mut db);
        assert_eq!(app.screen, Screen::Dashboard);
        assert!(!app.state.edits.has_changes());
    }

    #[test]
    fn test_delete_confirmation_removes_expense() {
        let (mut db, mut app) = signed_in_app();
        app.open_add_expense();
        fill(&mut app, &[("Amount", "100"), ("Type", "Food"), ("Description", "lunch")]);
        app.submit_form(&mut db);

        app.request_delete_expense();
        assert_eq!(app.confirm_message, "Delete 'lunch'?");
        app.confirm_pending(&mut db);
        assert!(app.state.recent.is_empty());
        assert_eq!(app.status_message, "Deleted: lunch");
    }

    #[test]
    fn test_sign_out_returns_to_sign_in() {
        let (mut db, mut app) = signed_in_app();
        app.request_sign_out();
        app.confirm_pending(&mut db);
        assert!(!app.is_signed_in());
        assert_eq!(app.form.as_ref().unwrap().kind, FormKind::SignIn);
    }
}
