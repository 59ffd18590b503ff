//! Parameters carried by the URL the app was opened with.
//!
//! Accepted forms: `?amount=250.4` (prefill the add form), `?token=..&type=recovery`
//! and `?token=..&type=email_change` (links from auth emails), and
//! `?link=<encoded url>` which wraps any of the above one level deep.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::service::OtpKind;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LaunchParams {
    /// Prefill for the add-expense amount, already rounded up.
    pub(crate) amount: Option<Decimal>,
    pub(crate) token: Option<String>,
    pub(crate) kind: Option<OtpKind>,
    /// Raw `type` value, kept so an unknown type still reads as present.
    pub(crate) type_param: Option<String>,
}

impl LaunchParams {
    pub(crate) fn parse(url: &str) -> Self {
        let pairs = query_pairs(url);
        if let Some(inner) = lookup(&pairs, "link") {
            // One level only: a `link` inside the link is not followed.
            return Self::from_pairs(&query_pairs(&inner));
        }
        Self::from_pairs(&pairs)
    }

    fn from_pairs(pairs: &[(String, String)]) -> Self {
        let amount = lookup(pairs, "amount")
            .and_then(|a| Decimal::from_str(a.trim()).ok())
            .map(|a| a.ceil());
        let type_param = lookup(pairs, "type");
        Self {
            amount,
            token: lookup(pairs, "token").filter(|t| !t.is_empty()),
            kind: type_param.as_deref().and_then(OtpKind::parse),
            type_param,
        }
    }

    /// The app was opened from an email-change confirmation link.
    pub(crate) fn is_email_change(&self) -> bool {
        self.type_param.as_deref() == Some(OtpKind::EmailChange.as_str())
    }

    /// Token and purpose when both are present and recognised.
    pub(crate) fn otp(&self) -> Option<(&str, OtpKind)> {
        match (&self.token, self.kind) {
            (Some(t), Some(k)) => Some((t.as_str(), k)),
            _ => None,
        }
    }

    /// Drop one-shot parameters once handled. The email-change marker stays
    /// so a late user-updated event is still suppressed.
    pub(crate) fn consume_amount(&mut self) -> Option<Decimal> {
        self.amount.take()
    }

    pub(crate) fn consume_token(&mut self) {
        self.token = None;
    }
}

fn lookup(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

fn query_pairs(url: &str) -> Vec<(String, String)> {
    let query = match url.split_once('?') {
        Some((_, q)) => q,
        None if url.contains('=') => url,
        None => return Vec::new(),
    };
    let query = query.split('#').next().unwrap_or_default();
    query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| {
            let (k, v) = p.split_once('=').unwrap_or((p, ""));
            (percent_decode(k), percent_decode(v))
        })
        .collect()
}

/// Query-string decoding: `+` is a space, then `%XX` escapes. Malformed
/// escapes are kept as written.
fn percent_decode(s: &str) -> String {
    let spaced = s.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|d| d.into_owned())
        .unwrap_or(spaced)
}
