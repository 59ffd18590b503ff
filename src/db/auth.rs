use chrono::Utc;
use regex::Regex;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use tracing::{info, warn};
use uuid::Uuid;

use super::Database;
use crate::error::ServiceError;
use crate::models::{User, UserMetadata};
use crate::service::{
    AuthEvent, AuthEventKind, AuthProvider, KeyValueStore, OtpKind, ServiceResult, UserUpdate,
};

pub(crate) const MIN_PASSWORD_LEN: usize = 6;

/// Scheme of links the local backend "emails" to users.
pub(crate) const LINK_BASE: &str = "expensetui://auth/confirm";

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@ \t\r\n]+@[^@ \t\r\n]+\.[^@ \t\r\n]+$").ok());

pub(crate) fn is_valid_email(email: &str) -> bool {
    match EMAIL_RE.as_ref() {
        Some(re) => re.is_match(email),
        None => email.contains('@'),
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    format!("{:x}", Sha256::digest(format!("{salt}{password}").as_bytes()))
}

/// Persisted under the session key while a user is signed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    user_id: String,
    issued_at: String,
}

/// A message the local backend would have emailed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutboxEntry {
    pub(crate) email: String,
    pub(crate) subject: String,
    pub(crate) link: String,
    pub(crate) created_at: String,
}

const USER_COLUMNS: &str = "id, email, display_name, name, full_name";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        metadata: UserMetadata {
            display_name: row.get(2)?,
            name: row.get(3)?,
            full_name: row.get(4)?,
        },
    })
}

impl Database {
    fn find_user_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM auth_users WHERE email = ?1"),
                params![email],
                user_from_row,
            )
            .optional()?)
    }

    fn find_user_by_id(&self, id: &str) -> ServiceResult<Option<User>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM auth_users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?)
    }

    fn start_session(&mut self, user: &User) -> ServiceResult<()> {
        let session = StoredSession {
            access_token: Uuid::new_v4().simple().to_string(),
            user_id: user.id.clone(),
            issued_at: Utc::now().to_rfc3339(),
        };
        let key = self.session_key();
        self.set_item(&key, &serde_json::to_string(&session)?)
    }

    fn current_user_id(&self) -> ServiceResult<Option<String>> {
        let Some(raw) = self.get_item(&self.session_key())? else {
            return Ok(None);
        };
        match serde_json::from_str::<StoredSession>(&raw) {
            Ok(session) => Ok(Some(session.user_id)),
            Err(e) => {
                warn!(error = %e, "discarding unreadable stored session");
                Ok(None)
            }
        }
    }

    fn require_user(&self) -> ServiceResult<User> {
        let Some(id) = self.current_user_id()? else {
            return Err(ServiceError::new("Auth session missing!"));
        };
        self.find_user_by_id(&id)?
            .ok_or_else(|| ServiceError::new("User from sub claim in JWT does not exist"))
    }

    fn issue_token(&self, user: &User, kind: OtpKind, new_email: Option<&str>) -> ServiceResult<String> {
        let token = Uuid::new_v4().simple().to_string();
        self.conn.execute(
            "INSERT INTO auth_tokens (token, user_id, kind, new_email, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![token, user.id, kind.as_str(), new_email, Utc::now().to_rfc3339()],
        )?;
        Ok(token)
    }

    fn send_link(&self, email: &str, subject: &str, token: &str, kind: OtpKind) -> ServiceResult<()> {
        let link = format!("{LINK_BASE}?token={token}&type={}", kind.as_str());
        self.conn.execute(
            "INSERT INTO auth_outbox (email, subject, link, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![email, subject, link, Utc::now().to_rfc3339()],
        )?;
        info!(%email, %subject, %link, "auth email queued");
        Ok(())
    }

    fn emit(&mut self, kind: AuthEventKind, user: Option<User>) {
        self.events.push(AuthEvent::new(kind, user));
    }

    /// Most recent queued auth emails, newest first.
    pub(crate) fn outbox(&self, limit: u32) -> ServiceResult<Vec<OutboxEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT email, subject, link, created_at FROM auth_outbox ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(OutboxEntry {
                email: row.get(0)?,
                subject: row.get(1)?,
                link: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

impl AuthProvider for Database {
    fn sign_in_with_password(&mut self, email: &str, password: &str) -> ServiceResult<User> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT salt, password_hash FROM auth_users WHERE email = ?1",
                params![email.trim()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let user = match (row, self.find_user_by_email(email.trim())?) {
            (Some((salt, hash)), Some(user)) if hash_password(&salt, password) == hash => user,
            _ => return Err(ServiceError::new("Invalid login credentials")),
        };
        self.start_session(&user)?;
        info!(user_id = %user.id, "signed in");
        self.emit(AuthEventKind::SignedIn, Some(user.clone()));
        Ok(user)
    }

    fn sign_up(&mut self, email: &str, password: &str, metadata: &UserMetadata) -> ServiceResult<Option<User>> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(ServiceError::new(
                "Unable to validate email address: invalid format",
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::new(
                "Password should be at least 6 characters.",
            ));
        }
        if self.find_user_by_email(email)?.is_some() {
            return Err(ServiceError::new("User already registered"));
        }
        let id = Uuid::new_v4().to_string();
        let salt = Uuid::new_v4().simple().to_string();
        self.conn.execute(
            "INSERT INTO auth_users (id, email, password_hash, salt, display_name, name, full_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                email,
                hash_password(&salt, password),
                salt,
                metadata.display_name,
                metadata.name,
                metadata.full_name,
                Utc::now().to_rfc3339(),
            ],
        )?;
        let user = User {
            id,
            email: email.to_string(),
            metadata: metadata.clone(),
        };
        // No confirmation step locally: the new account is signed in at once.
        self.start_session(&user)?;
        info!(user_id = %user.id, "account created");
        self.emit(AuthEventKind::SignedIn, Some(user.clone()));
        Ok(Some(user))
    }

    fn reset_password_for_email(&mut self, email: &str) -> ServiceResult<()> {
        let Some(user) = self.find_user_by_email(email.trim())? else {
            return Err(ServiceError::new("User not found"));
        };
        let token = self.issue_token(&user, OtpKind::Recovery, None)?;
        self.send_link(&user.email, "Reset your password", &token, OtpKind::Recovery)
    }

    fn update_user(&mut self, update: &UserUpdate) -> ServiceResult<User> {
        let mut user = self.require_user()?;

        if let Some(ref password) = update.password {
            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(ServiceError::new(
                    "Password should be at least 6 characters.",
                ));
            }
            let salt = Uuid::new_v4().simple().to_string();
            self.conn.execute(
                "UPDATE auth_users SET password_hash = ?1, salt = ?2 WHERE id = ?3",
                params![hash_password(&salt, password), salt, user.id],
            )?;
        }

        if let Some(ref metadata) = update.metadata {
            self.conn.execute(
                "UPDATE auth_users SET display_name = ?1, name = ?2, full_name = ?3 WHERE id = ?4",
                params![metadata.display_name, metadata.name, metadata.full_name, user.id],
            )?;
            user.metadata = metadata.clone();
        }

        if let Some(ref new_email) = update.email {
            let new_email = new_email.trim();
            if !new_email.eq_ignore_ascii_case(&user.email) {
                if !is_valid_email(new_email) {
                    return Err(ServiceError::new(
                        "Unable to validate email address: invalid format",
                    ));
                }
                if self.find_user_by_email(new_email)?.is_some() {
                    return Err(ServiceError::new(
                        "A user with this email address has already been registered",
                    ));
                }
                let token = self.issue_token(&user, OtpKind::EmailChange, Some(new_email))?;
                self.send_link(new_email, "Confirm email change", &token, OtpKind::EmailChange)?;
            }
        }

        self.emit(AuthEventKind::UserUpdated, Some(user.clone()));
        Ok(user)
    }

    fn sign_out(&mut self) -> ServiceResult<()> {
        let key = self.session_key();
        if self.get_item(&key)?.is_some() {
            self.remove_item(&key)?;
            info!("signed out");
        }
        self.emit(AuthEventKind::SignedOut, None);
        Ok(())
    }

    fn get_user(&self) -> ServiceResult<Option<User>> {
        match self.current_user_id()? {
            Some(id) => self.find_user_by_id(&id),
            None => Ok(None),
        }
    }

    fn verify_otp(&mut self, token: &str, kind: OtpKind) -> ServiceResult<Option<User>> {
        let row: Option<(String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT user_id, new_email FROM auth_tokens WHERE token = ?1 AND kind = ?2",
                params![token, kind.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((user_id, new_email)) = row else {
            return Err(ServiceError::new("Token has expired or is invalid"));
        };
        self.conn
            .execute("DELETE FROM auth_tokens WHERE token = ?1", params![token])?;

        if let (OtpKind::EmailChange, Some(new_email)) = (kind, new_email.as_deref()) {
            self.conn.execute(
                "UPDATE auth_users SET email = ?1 WHERE id = ?2",
                params![new_email, user_id],
            )?;
        }

        let Some(user) = self.find_user_by_id(&user_id)? else {
            return Ok(None);
        };
        self.start_session(&user)?;
        match kind {
            OtpKind::Recovery => self.emit(AuthEventKind::PasswordRecovery, Some(user.clone())),
            OtpKind::EmailChange => self.emit(AuthEventKind::UserUpdated, Some(user.clone())),
        }
        Ok(Some(user))
    }

    fn poll_events(&mut self) -> Vec<AuthEvent> {
        std::mem::take(&mut self.events)
    }
}
