//! Admin session capability.

use chrono::{DateTime, Utc};

/// Proof that the caller holds an authenticated admin session.
///
/// Catalog write operations take a reference to this token instead of
/// consulting ambient session state. The surrounding application decides
/// how a session is established; tests construct one directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    subject: String,
    issued_at: DateTime<Utc>,
}

impl AdminSession {
    /// Issue a session for `subject` (an admin identifier such as an email).
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            issued_at: Utc::now(),
        }
    }

    /// Who the session belongs to.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}
