//! Application state: everything that lives for the duration of a run and
//! the order in which operations touch it.
//!
//! Methods take the backend as an argument and report outcomes through the
//! notifier; none of them fail. The UI reads the public fields to render.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::budget::{self, BudgetDisplay, BudgetWarnings, Severity};
use crate::calendar::{ist_today, YearMonth};
use crate::edit::{self, EditTracker, FieldChange};
use crate::error::AppError;
use crate::expenses::{self, ExpenseInput, SearchResults, SearchSession, Statistics};
use crate::insights::{compute_insights, Insights};
use crate::launch::LaunchParams;
use crate::models::{Budget, Expense};
use crate::notify::{Level, Notifier};
use crate::report::{self, ChartKind, ExportOutcome, FilterCriteria, FilterSession};
use crate::service::{Backend, OtpKind, ServiceResult};
use crate::session::{ProfileChange, Session, SessionState};
use crate::taxonomy;

pub(crate) const DARK_MODE_KEY: &str = "darkMode";
/// How long the email-change notice stays up before the forced sign-out.
pub(crate) const EMAIL_CHANGE_SIGN_OUT_DELAY: Duration = Duration::from_secs(5);

pub(crate) struct AppState {
    pub(crate) session: Session,
    pub(crate) notifier: Notifier,
    pub(crate) launch: LaunchParams,
    pub(crate) export_dir: PathBuf,
    pub(crate) dark_mode: bool,

    // Dashboard
    pub(crate) today: NaiveDate,
    pub(crate) stats: Statistics,
    pub(crate) recent: Vec<Expense>,
    pub(crate) budget: Option<BudgetDisplay>,
    pub(crate) warnings: BudgetWarnings,
    pub(crate) types: Vec<String>,

    // Analytics
    pub(crate) analytics_open: bool,
    pub(crate) filter: FilterSession,
    pub(crate) chart: ChartKind,
    pub(crate) edits: EditTracker,

    // Search / insights
    pub(crate) search: SearchSession,
    pub(crate) search_term: String,
    pub(crate) insights: Option<Insights>,

    sign_out_due: Option<Instant>,
}

impl AppState {
    pub(crate) fn new(launch: LaunchParams, export_dir: PathBuf) -> Self {
        Self {
            session: Session::new(),
            notifier: Notifier::new(),
            launch,
            export_dir,
            dark_mode: false,
            today: ist_today(),
            stats: Statistics::default(),
            recent: Vec::new(),
            budget: None,
            warnings: BudgetWarnings::new(),
            types: Vec::new(),
            analytics_open: false,
            filter: FilterSession::new(),
            chart: ChartKind::default(),
            edits: EditTracker::new(),
            search: SearchSession::new(),
            search_term: String::new(),
            insights: None,
            sign_out_due: None,
        }
    }

    pub(crate) fn owner(&self) -> Option<String> {
        self.session.owner().map(str::to_string)
    }

    pub(crate) fn month(&self) -> YearMonth {
        YearMonth::of(self.today)
    }

    // ── Startup / lifecycle ───────────────────────────────────

    /// Apply launch parameters, resume any stored session and load the
    /// dashboard.
    pub(crate) fn start<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        self.dark_mode = matches!(backend.get_item(DARK_MODE_KEY), Ok(Some(v)) if v == "true");
        self.session
            .set_email_change_marker(self.launch.is_email_change());

        let otp = self
            .launch
            .otp()
            .map(|(token, kind)| (token.to_string(), kind));
        match otp {
            Some((token, OtpKind::EmailChange)) => {
                self.launch.consume_token();
                match self.session.confirm_email_change(backend, &token) {
                    Ok(()) => self.notifier.success(
                        "Email successfully changed! Please sign in with your new email address.",
                    ),
                    Err(e) => self.notifier.report("", &e),
                }
            }
            Some((token, OtpKind::Recovery)) => {
                self.launch.consume_token();
                if let Err(e) = self.session.confirm_recovery(backend, &token) {
                    warn!(error = %e, "recovery link rejected");
                    self.notifier.report("", &e);
                    self.session.restore(&*backend);
                }
            }
            None => {
                self.session.restore(&*backend);
            }
        }
        self.drain_events(backend);
        self.refresh_dashboard(&*backend);
    }

    /// Feed pending auth events to the session. Refreshes the dashboard when
    /// one of them changed who is signed in.
    pub(crate) fn drain_events<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        let before = self.session.state();
        let events = backend.poll_events();
        for event in events {
            self.session.handle_event(backend, event);
        }
        let after = self.session.state();
        if before != after {
            debug!(from = %before, to = %after, "session changed by events");
            if after == SessionState::Anonymous {
                self.reset_user_state();
            } else {
                self.refresh_dashboard(&*backend);
            }
        }
    }

    /// Expire notifications and run the deferred email-change sign-out.
    pub(crate) fn tick<B: Backend + ?Sized>(&mut self, backend: &mut B, now: Instant) {
        self.notifier.prune(now);
        if self.sign_out_due.is_some_and(|due| now >= due) {
            self.sign_out_due = None;
            self.session.sign_out(backend);
            backend.poll_events();
            self.reset_user_state();
            self.notifier.notice(
                "Signed out. Check your email for verification link.",
                Level::Info,
            );
        }
        let today = ist_today();
        if today != self.today {
            self.today = today;
            self.refresh_dashboard(&*backend);
        }
    }

    pub(crate) fn toggle_theme<B: Backend + ?Sized>(&mut self, backend: &B) {
        self.dark_mode = !self.dark_mode;
        if let Err(e) = backend.set_item(DARK_MODE_KEY, if self.dark_mode { "true" } else { "false" }) {
            warn!(error = %e, "could not persist theme preference");
        }
    }

    fn reset_user_state(&mut self) {
        self.stats = Statistics::default();
        self.recent.clear();
        self.budget = None;
        self.warnings.reset();
        self.types.clear();
        self.close_analytics();
        self.close_search();
        self.insights = None;
        self.sign_out_due = None;
    }

    // ── Authentication ────────────────────────────────────────

    pub(crate) fn sign_in<B: Backend + ?Sized>(&mut self, backend: &mut B, email: &str, password: &str) -> bool {
        match self.session.sign_in(backend, email, password) {
            Ok(state) => {
                backend.poll_events();
                if state == SessionState::PasswordResetForced {
                    self.notifier.notice(
                        "Please set a new password to continue using your account.",
                        Level::Info,
                    );
                } else {
                    self.notifier.success("Sign in successful!");
                    self.refresh_dashboard(&*backend);
                }
                true
            }
            Err(e) => {
                self.notifier.report("", &e);
                false
            }
        }
    }

    pub(crate) fn sign_up<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        name: &str,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> bool {
        match self.session.sign_up(backend, name, email, password, confirm) {
            Ok(outcome) => {
                if let Some(user) = &outcome.user {
                    info!(user = %user.id, "account created");
                }
                if let Some(report) = outcome.seeding.filter(|r| !r.is_complete()) {
                    let names: Vec<&str> = report.failed.iter().map(|(n, _)| n.as_str()).collect();
                    self.notifier.notice(
                        format!(
                            "Added {} default types; could not add: {}",
                            report.seeded.len(),
                            names.join(", ")
                        ),
                        Level::Warning,
                    );
                }
                self.notifier.success("Account created successfully!");
                self.drain_events(backend);
                true
            }
            Err(e) => {
                self.notifier.report("", &e);
                false
            }
        }
    }

    pub(crate) fn request_password_reset<B: Backend + ?Sized>(&mut self, backend: &mut B, email: &str) -> bool {
        match self.session.request_password_reset(backend, email) {
            Ok(()) => {
                self.notifier
                    .success("Password reset link sent to your email!");
                true
            }
            Err(e) => {
                self.notifier.report("", &e);
                false
            }
        }
    }

    pub(crate) fn set_new_password<B: Backend + ?Sized>(&mut self, backend: &mut B, new: &str, confirm: &str) -> bool {
        let forced = self.session.is_reset_forced();
        match self.session.set_new_password(backend, new, confirm) {
            Ok(()) => {
                backend.poll_events();
                if forced {
                    self.notifier.success(
                        "Password updated successfully! You can now use your account.",
                    );
                    self.refresh_dashboard(&*backend);
                } else {
                    self.notifier.success("Password changed successfully!");
                }
                true
            }
            Err(e) => {
                self.notifier.report("", &e);
                false
            }
        }
    }

    pub(crate) fn sign_out<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        let report = self.session.sign_out(backend);
        backend.poll_events();
        debug!(purged = report.purged.len(), "session tokens purged");
        self.reset_user_state();
        match report.provider_error {
            Some(e) => self
                .notifier
                .warning(format!("Signed out on this device; other sessions may stay active: {e}")),
            None => self.notifier.success("Signed out from all devices"),
        }
    }

    pub(crate) fn update_profile<B: Backend + ?Sized>(&mut self, backend: &mut B, name: &str, email: &str) -> bool {
        match self.session.update_profile(backend, name, email) {
            Ok(ProfileChange::Unchanged) => true,
            Ok(ProfileChange::NameUpdated(_)) => {
                backend.poll_events();
                self.notifier.success("Profile updated successfully!");
                true
            }
            Ok(ProfileChange::EmailChangeRequested { new_email }) => {
                backend.poll_events();
                self.notifier.notice(
                    format!(
                        "Email change verification sent to {new_email}. Click the verification link to complete the change."
                    ),
                    Level::Success,
                );
                self.sign_out_due = Some(Instant::now() + EMAIL_CHANGE_SIGN_OUT_DELAY);
                true
            }
            Err(e) => {
                self.notifier.report("", &e);
                false
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn sign_out_pending(&self) -> bool {
        self.sign_out_due.is_some()
    }

    // ── Dashboard ─────────────────────────────────────────────

    /// Reload recent list, stats, budget display and types, then raise any
    /// new threshold warnings.
    pub(crate) fn refresh_dashboard<B: Backend + ?Sized>(&mut self, backend: &B) {
        let Some(owner) = self.owner() else {
            return;
        };
        let loaded = load_dashboard(backend, &owner, self.month());
        match loaded {
            Ok((recent, stats, display, types)) => {
                self.recent = recent;
                self.stats = stats;
                self.types = types;
                self.check_warnings(&display);
                self.budget = Some(display);
            }
            Err(e) => {
                warn!(error = %e, "dashboard refresh failed");
                self.notifier.error(format!("Failed to load dashboard: {e}"));
            }
        }
    }

    fn check_warnings(&mut self, display: &BudgetDisplay) {
        for warning in self.warnings.check(display) {
            let level = match warning.severity {
                Severity::Exceeded => Level::Error,
                _ => Level::Warning,
            };
            self.notifier.toast(warning.message, level);
        }
    }

    pub(crate) fn prefill_amount(&mut self) -> Option<Decimal> {
        self.launch.consume_amount()
    }

    pub(crate) fn add_expense<B: Backend + ?Sized>(&mut self, backend: &B, input: &ExpenseInput) -> bool {
        let Some(owner) = self.owner() else {
            return false;
        };
        match expenses::add_expense(backend, &owner, input, &self.types) {
            Ok(_) => {
                self.notifier.success("Expense added successfully!");
                self.refresh_dashboard(backend);
                self.search.close();
                true
            }
            Err(e) => {
                self.notifier.report("Failed to add expense", &e);
                false
            }
        }
    }

    /// Remove locally first, then delete and refresh. Confirmation is the
    /// caller's job.
    pub(crate) fn delete_expense<B: Backend + ?Sized>(&mut self, backend: &B, id: i64) -> bool {
        let Some(owner) = self.owner() else {
            return false;
        };
        if let Some(mut row) = self.filter.get(id).cloned() {
            let authoritative = row.clone();
            self.edits.cancel(&mut row, &authoritative);
        }
        self.filter.remove(id);
        self.search.remove(id);
        self.recent.retain(|e| e.id != id);

        let result = expenses::delete_expense(backend, &owner, id);
        match &result {
            Ok(()) => self.notifier.success("Expense deleted successfully!"),
            Err(AppError::State(msg)) => debug!(%msg, "delete of missing expense"),
            Err(e) => self.notifier.report("Failed to delete expense", e),
        }
        self.refresh_dashboard(backend);
        if self.analytics_open {
            self.reload_filter(backend);
        }
        result.is_ok()
    }

    pub(crate) fn set_budget<B: Backend + ?Sized>(&mut self, backend: &B, billed: Decimal, unbilled: Decimal) -> bool {
        let Some(owner) = self.owner() else {
            return false;
        };
        let month = self.month();
        let current = self
            .budget
            .as_ref()
            .filter(|d| d.month == month)
            .map(|d| d.budget.clone())
            .unwrap_or_else(|| Budget::unset(&owner, month.year, month.month));
        match budget::set_budget(backend, &owner, month, &current, billed, unbilled) {
            Ok(_) => {
                self.warnings.reset();
                self.notifier
                    .success(format!("{} budgets updated successfully!", month.name()));
                self.refresh_dashboard(backend);
                true
            }
            Err(e) => {
                self.notifier.report("Failed to update budgets", &e);
                false
            }
        }
    }

    // ── Analytics ─────────────────────────────────────────────

    pub(crate) fn open_analytics<B: Backend + ?Sized>(&mut self, backend: &B) {
        self.analytics_open = true;
        self.reload_filter(backend);
    }

    /// Closing tears down all edit state and drops any in-flight load.
    pub(crate) fn close_analytics(&mut self) {
        self.analytics_open = false;
        self.edits.clear();
        self.filter.close();
    }

    pub(crate) fn apply_filter<B: Backend + ?Sized>(&mut self, backend: &B, criteria: FilterCriteria) {
        self.filter.criteria = criteria;
        self.reload_filter(backend);
    }

    fn reload_filter<B: Backend + ?Sized>(&mut self, backend: &B) {
        let Some(owner) = self.owner() else {
            return;
        };
        let ticket = self.filter.begin();
        match report::filter_records(backend, &owner, &self.filter.criteria) {
            Ok(rows) => {
                self.filter.complete(ticket, rows);
            }
            Err(e) => {
                warn!(error = %e, "filter failed");
                self.notifier.error(format!("Failed to load expenses: {e}"));
            }
        }
    }

    pub(crate) fn begin_edit(&mut self, id: i64) {
        if let Some(row) = self.filter.get(id) {
            self.edits.begin_edit(row);
        }
    }

    pub(crate) fn edit_field(&mut self, id: i64, change: FieldChange) -> bool {
        self.edits.set_field(id, change)
    }

    pub(crate) fn toggle_billed(&mut self, id: i64) {
        if let Some(row) = self.filter.get(id) {
            self.edits.toggle_billed(row);
        }
    }

    pub(crate) fn end_edit(&mut self, id: i64) {
        self.edits.end_edit(id);
    }

    pub(crate) fn cancel_edit(&mut self, id: i64) {
        let Some(authoritative) = self.filter.get(id).cloned() else {
            return;
        };
        if let Some(row) = self.filter.rows_mut().iter_mut().find(|e| e.id == id) {
            self.edits.cancel(row, &authoritative);
        }
    }

    pub(crate) fn save_edits<B: Backend + ?Sized>(&mut self, backend: &B) -> bool {
        let Some(owner) = self.owner() else {
            return false;
        };
        if !self.edits.has_changes() {
            self.notifier.info("No changes to save.");
            return false;
        }
        let result = edit::save_all(&mut self.edits, backend, &owner);
        self.reload_filter(backend);
        self.refresh_dashboard(backend);
        self.search.close();
        match result {
            Ok(count) => {
                info!(count, "analytics edits saved");
                self.notifier.success("Changes saved successfully!");
                true
            }
            Err(e) => {
                self.notifier.report("Failed to save changes", &e);
                false
            }
        }
    }

    pub(crate) fn export<B: Backend + ?Sized>(&mut self, backend: &B) -> Option<ExportOutcome> {
        let owner = self.owner()?;
        match report::export_csv(
            backend,
            &owner,
            &self.filter.criteria,
            self.filter.rows(),
            &self.export_dir,
        ) {
            Ok(outcome) => {
                self.notifier
                    .success(format!("Exported {} expenses to {}", outcome.rows, outcome.path.display()));
                Some(outcome)
            }
            Err(e) => {
                self.notifier.report("Failed to export", &e);
                None
            }
        }
    }

    // ── Search ────────────────────────────────────────────────

    pub(crate) fn open_search<B: Backend + ?Sized>(&mut self, backend: &B) {
        let Some(owner) = self.owner() else {
            return;
        };
        if self.search.is_loaded() {
            return;
        }
        let ticket = self.search.begin();
        match expenses::all_expenses(backend, &owner) {
            Ok(rows) => {
                self.search.complete(ticket, rows);
            }
            Err(e) => {
                warn!(error = %e, "search load failed");
                self.notifier.error(format!("Failed to load expenses: {e}"));
            }
        }
    }

    pub(crate) fn search_results(&self) -> SearchResults {
        self.search.search(&self.search_term)
    }

    pub(crate) fn close_search(&mut self) {
        self.search.close();
        self.search_term.clear();
    }

    // ── Insights ──────────────────────────────────────────────

    pub(crate) fn load_insights<B: Backend + ?Sized>(&mut self, backend: &B) {
        let Some(owner) = self.owner() else {
            return;
        };
        match compute_insights(backend, &owner, self.today) {
            Ok(insights) => self.insights = Some(insights),
            Err(e) => {
                warn!(error = %e, "insights failed");
                self.notifier.error(format!("Failed to load insights: {e}"));
            }
        }
    }

    // ── Types ─────────────────────────────────────────────────

    fn after_type_change<B: Backend + ?Sized>(&mut self, backend: &B) {
        self.refresh_dashboard(backend);
        if self.analytics_open {
            self.reload_filter(backend);
        }
        self.search.close();
    }

    pub(crate) fn add_type<B: Backend + ?Sized>(&mut self, backend: &B, name: &str) -> bool {
        let Some(owner) = self.owner() else {
            return false;
        };
        match taxonomy::add_type(backend, &owner, name) {
            Ok(_) => {
                self.notifier.success("Type added successfully!");
                self.after_type_change(backend);
                true
            }
            Err(e) => {
                self.notifier.report("Failed to add type", &e);
                false
            }
        }
    }

    pub(crate) fn rename_type<B: Backend + ?Sized>(&mut self, backend: &B, old: &str, new: &str) -> bool {
        let Some(owner) = self.owner() else {
            return false;
        };
        let result = taxonomy::rename_type(backend, &owner, old, new);
        self.after_type_change(backend);
        match result {
            Ok(_) => {
                self.notifier.success("Type updated successfully!");
                true
            }
            Err(e) => {
                self.notifier.report("Failed to update type", &e);
                false
            }
        }
    }

    pub(crate) fn delete_type<B: Backend + ?Sized>(&mut self, backend: &B, name: &str) -> bool {
        let Some(owner) = self.owner() else {
            return false;
        };
        match taxonomy::delete_type(backend, &owner, name) {
            Ok(()) => {
                self.notifier.success("Type deleted successfully!");
                self.after_type_change(backend);
                true
            }
            Err(e) => {
                self.notifier.report("Failed to delete type", &e);
                false
            }
        }
    }
}

type DashboardData = (Vec<Expense>, Statistics, BudgetDisplay, Vec<String>);

fn load_dashboard<B: Backend + ?Sized>(backend: &B, owner: &str, month: YearMonth) -> ServiceResult<DashboardData> {
    Ok((
        expenses::recent(backend, owner)?,
        expenses::statistics(backend, owner, month)?,
        budget::compute_budget_display(backend, owner, month)?,
        taxonomy::list_types(backend, owner)?,
    ))
}

#[cfg(test)]
mod tests;
