//! Authentication extractor for the admin API.
//!
//! Admins authenticate with a bearer token. The [`SessionProvider`] keeps a
//! SHA-256 digest of the configured token and issues an [`AdminSession`] for
//! each request that presents it; catalog writes take that session as proof.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use reve_essence_core::AdminSession;

use crate::error::ErrorBody;
use crate::state::AppState;

/// Issues admin sessions to callers holding the API token.
#[derive(Clone)]
pub struct SessionProvider {
    token_digest: [u8; 32],
    subject: String,
}

impl std::fmt::Debug for SessionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionProvider")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl SessionProvider {
    #[must_use]
    pub fn new(token: &SecretString, subject: impl Into<String>) -> Self {
        Self {
            token_digest: digest(token.expose_secret()),
            subject: subject.into(),
        }
    }

    /// Issue a session if `presented` matches the configured token.
    ///
    /// Compares fixed-length digests so the comparison time does not depend
    /// on how much of the token matched.
    #[must_use]
    pub fn authenticate(&self, presented: &str) -> Option<AdminSession> {
        let candidate = digest(presented);
        let diff = candidate
            .iter()
            .zip(self.token_digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));

        (diff == 0).then(|| AdminSession::new(self.subject.clone()))
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Extractor that requires an authenticated admin.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAdmin(session): RequireAdmin) -> impl IntoResponse {
///     format!("Hello, {}!", session.subject())
/// }
/// ```
pub struct RequireAdmin(pub AdminSession);

/// Error returned when the request carries no valid admin token.
#[derive(Debug)]
pub enum AdminAuthRejection {
    /// No `Authorization: Bearer` header.
    MissingToken,
    /// Token did not match.
    InvalidToken,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        let error = match self {
            Self::MissingToken => "Missing bearer token",
            Self::InvalidToken => "Invalid bearer token",
        };
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            Json(ErrorBody {
                error: error.to_string(),
                field: None,
            }),
        )
            .into_response()
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AdminAuthRejection::MissingToken)?;

        let session = state.sessions().authenticate(token).ok_or_else(|| {
            tracing::warn!(path = %parts.uri.path(), "Rejected admin token");
            AdminAuthRejection::InvalidToken
        })?;

        Ok(Self(session))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const TOKEN: &str = "k7#Qm2!vX9@pL4$wR8%tY1^zN6&bH3*d";

    #[test]
    fn test_authenticate_matching_token() {
        let provider = SessionProvider::new(&SecretString::from(TOKEN), "ops@reveessence.ng");
        let session = provider.authenticate(TOKEN).unwrap();
        assert_eq!(session.subject(), "ops@reveessence.ng");
    }

    #[test]
    fn test_authenticate_rejects_other_tokens() {
        let provider = SessionProvider::new(&SecretString::from(TOKEN), "admin");
        assert!(provider.authenticate("").is_none());
        assert!(provider.authenticate(&TOKEN[1..]).is_none());
        assert!(provider.authenticate(&format!("{TOKEN}x")).is_none());
    }

    #[test]
    fn test_debug_hides_digest() {
        let provider = SessionProvider::new(&SecretString::from(TOKEN), "admin");
        let debug = format!("{provider:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("token_digest"));
    }
}
