//! Mock session helpers for integration tests.
//!
//! Routes gated by `CurrentUser` read a signed session cookie. `MockSession`
//! signs one with [`TEST_SECRET`] so tests need no login round-trip.

use axum::http::{HeaderName, HeaderValue, header};
use uuid::Uuid;

use bboard_auth_types::cookie::BBOARD_SESSION;
use bboard_auth_types::session::SessionKey;
use bboard_auth_types::token::issue_session_token;

/// Secret shared by [`MockSession`] and [`test_session_key`].
pub const TEST_SECRET: &str = "test-session-secret-for-integration-tests";

pub fn test_session_key() -> SessionKey {
    SessionKey::new(TEST_SECRET)
}

/// Configurable identity injected into test requests.
pub struct MockSession {
    pub user_id: Uuid,
    pub username: String,
}

impl MockSession {
    pub fn new(user_id: Uuid, username: &str) -> Self {
        Self {
            user_id,
            username: username.to_owned(),
        }
    }

    /// Signed session-cookie value.
    pub fn token(&self) -> String {
        issue_session_token(self.user_id, &self.username, TEST_SECRET)
            .expect("sign test session")
            .0
    }

    /// `Cookie` header as a browser would send it after login.
    pub fn cookie_header(&self) -> (HeaderName, HeaderValue) {
        let value = format!("{BBOARD_SESSION}={}", self.token());
        (
            header::COOKIE,
            HeaderValue::from_str(&value).expect("cookie header is ASCII"),
        )
    }
}
