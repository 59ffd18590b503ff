use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct UserMetadata {
    pub(crate) display_name: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) full_name: Option<String>,
}

impl UserMetadata {
    /// The same name written to all three keys, as sign-up and profile edits do.
    pub(crate) fn named(name: &str) -> Self {
        Self {
            display_name: Some(name.to_string()),
            name: Some(name.to_string()),
            full_name: Some(name.to_string()),
        }
    }

    pub(crate) fn preferred(&self) -> Option<&str> {
        [&self.display_name, &self.name, &self.full_name]
            .into_iter()
            .flatten()
            .map(|s| s.as_str())
            .find(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) metadata: UserMetadata,
}

impl User {
    pub(crate) fn display_name(&self) -> String {
        self.metadata.preferred().map(str::to_string).unwrap_or_else(|| {
            self.email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        })
    }

    /// Name as shown in the profile editor: empty when no metadata is set.
    pub(crate) fn profile_name(&self) -> String {
        self.metadata.preferred().unwrap_or_default().to_string()
    }

    pub(crate) fn initial(&self) -> char {
        self.display_name()
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('?')
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UserProfile {
    pub(crate) user_id: String,
    pub(crate) requires_password_reset: bool,
}

/// Stored locally while an email change awaits confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PendingEmailChange {
    pub(crate) old_email: String,
    pub(crate) new_email: String,
    /// Milliseconds since the Unix epoch.
    pub(crate) timestamp: i64,
}
