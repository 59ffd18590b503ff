//! Authentication lifecycle: who is signed in and which flow they are in.
//!
//! The session never talks to the terminal. Callers pass the backend in,
//! forward provider events through [`Session::handle_event`] and turn the
//! returned outcomes into notifications.

use chrono::Utc;
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, ServiceError};
use crate::models::{PendingEmailChange, User, UserMetadata, UserProfile};
use crate::service::{
    AuthEvent, AuthEventKind, Backend, DataService, KeyValueStore, OtpKind, UserUpdate,
};
use crate::taxonomy::{seed_defaults, SeedReport};

pub(crate) const MIN_PASSWORD_LEN: usize = 6;
pub(crate) const PENDING_EMAIL_KEY: &str = "pendingEmailChange";
pub(crate) const LEGACY_TOKEN_KEY: &str = "supabase.auth.token";

pub(crate) const RESET_LOOKUP_FAILED: &str = "Invalid email or user doesn't exist. Please sign up.";
pub(crate) const EMAIL_CHANGE_FAILED: &str = "Email verification failed. Please try the process again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SessionState {
    #[default]
    Anonymous,
    Authenticated,
    /// Signed in through a recovery link; nothing else is reachable until a
    /// new password is committed.
    PasswordResetForced,
    /// An email change was requested; the account is about to be signed out.
    EmailChangePending,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::PasswordResetForced => write!(f, "password reset required"),
            Self::EmailChangePending => write!(f, "email change pending"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct SignUpOutcome {
    pub(crate) user: Option<User>,
    /// Absent when the provider withheld the user.
    pub(crate) seeding: Option<SeedReport>,
}

#[derive(Debug, Default)]
pub(crate) struct SignOutReport {
    pub(crate) purged: Vec<String>,
    /// The provider call failed; local state was cleared regardless.
    pub(crate) provider_error: Option<ServiceError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProfileChange {
    Unchanged,
    NameUpdated(String),
    EmailChangeRequested { new_email: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventOutcome {
    /// State or user changed; views should refresh.
    Applied,
    Ignored,
}

/// Whether a key holds a provider session token.
pub(crate) fn is_session_token_key(key: &str) -> bool {
    key == LEGACY_TOKEN_KEY
        || key
            .strip_prefix("sb-")
            .and_then(|rest| rest.strip_suffix("-auth-token"))
            .is_some_and(|project| !project.is_empty())
}

/// Remove every stored session token. Failures are logged and skipped.
pub(crate) fn purge_session_tokens<K: KeyValueStore + ?Sized>(store: &K) -> Vec<String> {
    let keys = match store.keys() {
        Ok(keys) => keys,
        Err(e) => {
            warn!(error = %e, "could not list stored keys");
            return Vec::new();
        }
    };
    let mut purged = Vec::new();
    for key in keys.into_iter().filter(|k| is_session_token_key(k)) {
        match store.remove_item(&key) {
            Ok(()) => purged.push(key),
            Err(e) => warn!(%key, error = %e, "could not remove session token"),
        }
    }
    purged
}

/// The profile's reset flag. A failed read counts as "not required".
pub(crate) fn requires_password_reset<D: DataService + ?Sized>(data: &D, user_id: &str) -> bool {
    match data.select_profile(user_id) {
        Ok(profile) => profile.is_some_and(|p| p.requires_password_reset),
        Err(e) => {
            warn!(%user_id, error = %e, "profile lookup failed, assuming no reset required");
            false
        }
    }
}

fn store_reset_flag<D: DataService + ?Sized>(data: &D, user_id: &str, required: bool) {
    let profile = UserProfile {
        user_id: user_id.to_string(),
        requires_password_reset: required,
    };
    if let Err(e) = data.upsert_profile(&profile) {
        warn!(%user_id, required, error = %e, "could not store password reset flag");
    }
}

#[cfg(test)]
pub(crate) fn load_pending_email_change<K: KeyValueStore + ?Sized>(store: &K) -> Option<PendingEmailChange> {
    let raw = store.get_item(PENDING_EMAIL_KEY).ok().flatten()?;
    match serde_json::from_str(&raw) {
        Ok(pending) => Some(pending),
        Err(e) => {
            debug!(error = %e, "ignoring unreadable pending email change");
            None
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Session {
    state: SessionState,
    user: Option<User>,
    /// Set when launched from an email-change confirmation link.
    email_change_marker: bool,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// The signed-in user's id while data may be read on their behalf.
    pub(crate) fn owner(&self) -> Option<&str> {
        match self.state {
            SessionState::Authenticated | SessionState::EmailChangePending => {
                self.user.as_ref().map(|u| u.id.as_str())
            }
            _ => None,
        }
    }

    pub(crate) fn is_reset_forced(&self) -> bool {
        self.state == SessionState::PasswordResetForced
    }

    pub(crate) fn set_email_change_marker(&mut self, on: bool) {
        self.email_change_marker = on;
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "session state changed");
            self.state = next;
        }
    }

    fn enter<D: DataService + ?Sized>(&mut self, user: User, data: &D) {
        let next = if requires_password_reset(data, &user.id) {
            SessionState::PasswordResetForced
        } else {
            SessionState::Authenticated
        };
        self.user = Some(user);
        self.transition(next);
    }

    fn clear(&mut self) {
        self.user = None;
        self.transition(SessionState::Anonymous);
    }

    /// Resume a stored session at startup.
    pub(crate) fn restore<B: Backend + ?Sized>(&mut self, backend: &B) -> SessionState {
        match backend.get_user() {
            Ok(Some(user)) => self.enter(user, backend),
            Ok(None) => self.clear(),
            Err(e) => {
                warn!(error = %e, "session restore failed");
                self.clear();
            }
        }
        self.state
    }

    pub(crate) fn sign_in<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        email: &str,
        password: &str,
    ) -> AppResult<SessionState> {
        let user = backend.sign_in_with_password(email, password)?;
        self.enter(user, &*backend);
        Ok(self.state)
    }

    pub(crate) fn sign_up<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        name: &str,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> AppResult<SignUpOutcome> {
        if password != confirm {
            return Err(AppError::validation("Passwords do not match."));
        }
        let user = backend.sign_up(email, password, &UserMetadata::named(name.trim()))?;
        let seeding = user.as_ref().map(|u| seed_defaults(&*backend, &u.id));
        Ok(SignUpOutcome { user, seeding })
    }

    /// Any provider failure is reported with the same wording, so the form
    /// does not reveal which addresses have accounts.
    pub(crate) fn request_password_reset<B: Backend + ?Sized>(&mut self, backend: &mut B, email: &str) -> AppResult<()> {
        if email.trim().is_empty() {
            return Err(AppError::validation(RESET_LOOKUP_FAILED));
        }
        backend.reset_password_for_email(email).map_err(|e| {
            debug!(error = %e, "password reset request refused");
            AppError::Service(ServiceError::new(RESET_LOOKUP_FAILED))
        })
    }

    pub(crate) fn set_new_password<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        new: &str,
        confirm: &str,
    ) -> AppResult<()> {
        if new != confirm {
            return Err(AppError::validation("New passwords do not match."));
        }
        if new.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(
                "Password must be at least 6 characters long.",
            ));
        }
        let user = backend.update_user(&UserUpdate {
            password: Some(new.to_string()),
            ..UserUpdate::default()
        })?;
        if self.is_reset_forced() {
            store_reset_flag(&*backend, &user.id, false);
            self.user = Some(user);
            self.transition(SessionState::Authenticated);
        }
        Ok(())
    }

    /// Provider sign-out, token purge, local reset. The last two always run.
    pub(crate) fn sign_out<B: Backend + ?Sized>(&mut self, backend: &mut B) -> SignOutReport {
        let provider_error = backend.sign_out().err();
        if let Some(ref e) = provider_error {
            warn!(error = %e, "provider sign-out failed, clearing local session anyway");
        }
        let purged = purge_session_tokens(&*backend);
        self.clear();
        SignOutReport {
            purged,
            provider_error,
        }
    }

    pub(crate) fn handle_event<B: Backend + ?Sized>(&mut self, backend: &mut B, event: AuthEvent) -> EventOutcome {
        debug!(kind = %event.kind, state = %self.state, "auth event");
        match event.kind {
            AuthEventKind::PasswordRecovery => {
                let Some(user) = event.user else {
                    return EventOutcome::Ignored;
                };
                store_reset_flag(&*backend, &user.id, true);
                self.user = Some(user);
                self.transition(SessionState::PasswordResetForced);
                EventOutcome::Applied
            }
            AuthEventKind::SignedIn => match (self.state, event.user) {
                (SessionState::PasswordResetForced, _) | (_, None) => EventOutcome::Ignored,
                (SessionState::Anonymous, Some(user)) => {
                    self.enter(user, &*backend);
                    EventOutcome::Applied
                }
                (_, Some(user)) => {
                    self.user = Some(user);
                    EventOutcome::Applied
                }
            },
            AuthEventKind::SignedOut => {
                if self.state == SessionState::Anonymous {
                    return EventOutcome::Ignored;
                }
                self.clear();
                EventOutcome::Applied
            }
            AuthEventKind::UserUpdated => {
                if self.email_change_marker || self.state == SessionState::Anonymous {
                    return EventOutcome::Ignored;
                }
                match event.user {
                    Some(user) => {
                        self.user = Some(user);
                        EventOutcome::Applied
                    }
                    None => EventOutcome::Ignored,
                }
            }
        }
    }

    /// Apply name and email edits from the profile form. An email change
    /// leaves the session in [`SessionState::EmailChangePending`]; the caller
    /// signs out once the user has seen the notice.
    pub(crate) fn update_profile<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        name: &str,
        email: &str,
    ) -> AppResult<ProfileChange> {
        let Some(current) = self.user.clone() else {
            return Err(AppError::State("Not signed in".into()));
        };
        let name = name.trim();
        let email = email.trim();
        let name_changed = !name.is_empty() && name != current.profile_name();
        let email_changed = !email.is_empty() && !email.eq_ignore_ascii_case(&current.email);

        if !name_changed && !email_changed {
            return Ok(ProfileChange::Unchanged);
        }

        if name_changed {
            let user = backend.update_user(&UserUpdate {
                metadata: Some(UserMetadata::named(name)),
                ..UserUpdate::default()
            })?;
            info!(user_id = %user.id, "profile name updated");
            self.user = Some(user);
        }

        if !email_changed {
            return Ok(ProfileChange::NameUpdated(name.to_string()));
        }

        let pending = PendingEmailChange {
            old_email: current.email.clone(),
            new_email: email.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        };
        backend.set_item(PENDING_EMAIL_KEY, &serde_json::to_string(&pending).map_err(ServiceError::from)?)?;
        backend.update_user(&UserUpdate {
            email: Some(email.to_string()),
            ..UserUpdate::default()
        })?;
        info!(user_id = %current.id, "email change requested");
        self.transition(SessionState::EmailChangePending);
        Ok(ProfileChange::EmailChangeRequested {
            new_email: email.to_string(),
        })
    }

    /// Complete an email change from its confirmation token. Ends signed out
    /// whether or not verification succeeds.
    pub(crate) fn confirm_email_change<B: Backend + ?Sized>(&mut self, backend: &mut B, token: &str) -> AppResult<()> {
        let verified = backend.verify_otp(token, OtpKind::EmailChange);
        self.email_change_marker = false;
        match verified {
            Ok(_) => {
                if let Err(e) = backend.remove_item(PENDING_EMAIL_KEY) {
                    warn!(error = %e, "could not clear pending email change");
                }
                self.sign_out(backend);
                backend.poll_events();
                info!("email change confirmed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "email change verification failed");
                self.clear();
                Err(AppError::Service(ServiceError::new(EMAIL_CHANGE_FAILED)))
            }
        }
    }

    /// Enter the recovery flow from a recovery link.
    pub(crate) fn confirm_recovery<B: Backend + ?Sized>(&mut self, backend: &mut B, token: &str) -> AppResult<()> {
        backend.verify_otp(token, OtpKind::Recovery)?;
        for event in backend.poll_events() {
            self.handle_event(backend, event);
        }
        Ok(())
    }
}
