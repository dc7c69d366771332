//! Session-cookie extractors.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use http::request::Parts;
use url::form_urlencoded;
use uuid::Uuid;

use crate::cookie::BBOARD_SESSION;
use crate::token::validate_session_token;

/// Path of the login page that gated routes redirect to.
pub const LOGIN_URL: &str = "/accounts/login/";

/// Secret used to validate session cookies. Exposed to extractors via `FromRef`.
#[derive(Clone)]
pub struct SessionKey(Arc<str>);

impl SessionKey {
    pub fn new(secret: &str) -> Self {
        Self(Arc::from(secret))
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

/// Logged-in user taken from a valid session cookie.
///
/// Rejects with a redirect to [`LOGIN_URL`] carrying `next=<original path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub username: String,
}

/// Session user if present. Never rejects.
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<CurrentUser>);

/// Rejection for [`CurrentUser`]: send the visitor to the login page.
#[derive(Debug)]
pub struct LoginRedirect {
    pub next: String,
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        Redirect::to(&login_url_with_next(&self.next)).into_response()
    }
}

/// Build `LOGIN_URL?next=<next>` with `next` form-encoded.
pub fn login_url_with_next(next: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    format!("{LOGIN_URL}?{query}")
}

fn session_from_parts(parts: &Parts, key: &SessionKey) -> Option<CurrentUser> {
    let jar = CookieJar::from_headers(&parts.headers);
    let value = jar.get(BBOARD_SESSION)?.value().to_owned();
    if value.is_empty() {
        return None;
    }
    match validate_session_token(&value, key.secret()) {
        Ok(info) => Some(CurrentUser {
            user_id: info.user_id,
            username: info.username,
        }),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring invalid session cookie");
            None
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    SessionKey: FromRef<S>,
{
    type Rejection = LoginRedirect;

    // Values are extracted synchronously so the returned future is 'static.
    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let key = SessionKey::from_ref(state);
        let user = session_from_parts(parts, &key);
        let next = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_else(|| "/".to_owned());

        async move { user.ok_or(LoginRedirect { next }) }
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    SessionKey: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let key = SessionKey::from_ref(state);
        let user = session_from_parts(parts, &key);
        async move { Ok(MaybeUser(user)) }
    }
}
