use std::time::{Duration, Instant};

use crate::error::AppError;

pub(crate) const TOAST_TTL: Duration = Duration::from_secs(3);
pub(crate) const ALERT_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Placement {
    /// Stacked in the corner, newest on top.
    Toast,
    /// Shown next to the form that produced it.
    Inline,
}

#[derive(Debug, Clone)]
pub(crate) struct Notification {
    pub(crate) message: String,
    pub(crate) level: Level,
    pub(crate) placement: Placement,
    expires_at: Instant,
}

impl Notification {
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Transient user-facing messages with fixed lifetimes.
#[derive(Debug, Default)]
pub(crate) struct Notifier {
    items: Vec<Notification>,
}

impl Notifier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_at(&mut self, now: Instant, message: impl Into<String>, level: Level, placement: Placement, ttl: Duration) {
        self.items.push(Notification {
            message: message.into(),
            level,
            placement,
            expires_at: now + ttl,
        });
    }

    pub(crate) fn toast(&mut self, message: impl Into<String>, level: Level) {
        self.push_at(Instant::now(), message, level, Placement::Toast, TOAST_TTL);
    }

    /// A toast that stays up as long as an inline alert.
    pub(crate) fn notice(&mut self, message: impl Into<String>, level: Level) {
        self.push_at(Instant::now(), message, level, Placement::Toast, ALERT_TTL);
    }

    pub(crate) fn info(&mut self, message: impl Into<String>) {
        self.toast(message, Level::Info);
    }

    pub(crate) fn success(&mut self, message: impl Into<String>) {
        self.toast(message, Level::Success);
    }

    pub(crate) fn warning(&mut self, message: impl Into<String>) {
        self.toast(message, Level::Warning);
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.toast(message, Level::Error);
    }

    pub(crate) fn validation(&mut self, errors: &[String]) {
        // A new alert replaces the previous one.
        self.items.retain(|n| n.placement != Placement::Inline);
        self.push_at(
            Instant::now(),
            errors.join("\n"),
            Level::Error,
            Placement::Inline,
            ALERT_TTL,
        );
    }

    /// Route an error to the surface matching its kind. `context` prefixes
    /// service failures, e.g. "Failed to add expense".
    pub(crate) fn report(&mut self, context: &str, err: &AppError) {
        match err {
            AppError::Validation(errors) => self.validation(errors),
            other if context.is_empty() => self.error(other.to_string()),
            other => self.error(format!("{context}: {other}")),
        }
    }

    pub(crate) fn prune(&mut self, now: Instant) {
        self.items.retain(|n| !n.is_expired(now));
    }

    /// Live toasts, newest first.
    pub(crate) fn toasts(&self) -> impl Iterator<Item = &Notification> {
        self.items
            .iter()
            .rev()
            .filter(|n| n.placement == Placement::Toast)
    }

    pub(crate) fn inline(&self) -> Option<&Notification> {
        self.items
            .iter()
            .rev()
            .find(|n| n.placement == Placement::Inline)
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_toasts_expire_after_three_seconds() {
        let mut n = Notifier::new();
        let t0 = Instant::now();
        n.push_at(t0, "saved", Level::Success, Placement::Toast, TOAST_TTL);
        n.prune(t0 + Duration::from_millis(2999));
        assert_eq!(n.len(), 1);
        n.prune(t0 + TOAST_TTL);
        assert!(n.is_empty());
    }

    #[test]
    fn test_toasts_newest_first() {
        let mut n = Notifier::new();
        n.info("first");
        n.warning("second");
        let msgs: Vec<&str> = n.toasts().map(|t| t.message.as_str()).collect();
        assert_eq!(msgs, vec!["second", "first"]);
    }

    #[test]
    fn test_validation_replaces_previous_alert() {
        let mut n = Notifier::new();
        n.validation(&["Valid amount is required".into()]);
        n.validation(&[
            "Expense type is required".into(),
            "Description is required".into(),
        ]);
        assert_eq!(n.len(), 1);
        let alert = n.inline().unwrap();
        assert_eq!(
            alert.message,
            "Expense type is required\nDescription is required"
        );
        assert_eq!(n.toasts().count(), 0);
    }

    #[test]
    fn test_report_routes_by_kind() {
        let mut n = Notifier::new();
        n.report("Failed to add expense", &AppError::validation("Description is required"));
        assert!(n.inline().is_some());

        n.report(
            "Failed to add expense",
            &AppError::Service(crate::error::ServiceError::new("offline")),
        );
        let toast = n.toasts().next().unwrap();
        assert_eq!(toast.message, "Failed to add expense: offline");
        assert_eq!(toast.level, Level::Error);
    }
}
