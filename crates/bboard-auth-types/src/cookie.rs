//! Cookie builders for the session token and one-shot flash messages.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use time::Duration;

use crate::token::SESSION_TTL_SECS;

/// Cookie name for the session token.
pub const BBOARD_SESSION: &str = "bboard_session";

/// Cookie name for the pending flash message.
pub const BBOARD_FLASH: &str = "bboard_flash";

/// Set the session cookie on the jar.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use bboard_auth_types::cookie::{set_session_cookie, BBOARD_SESSION};
///
/// let jar = set_session_cookie(CookieJar::new(), "token_value".to_string(), true);
/// let cookie = jar.get(BBOARD_SESSION).unwrap();
/// assert_eq!(cookie.path(), Some("/"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(1_209_600)));
/// assert!(cookie.http_only().unwrap_or(false));
/// assert!(cookie.secure().unwrap_or(false));
/// ```
pub fn set_session_cookie(jar: CookieJar, value: String, secure: bool) -> CookieJar {
    let cookie = Cookie::build((BBOARD_SESSION, value))
        .path("/")
        .max_age(Duration::seconds(SESSION_TTL_SECS as i64))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

/// Clear the session cookie by setting Max-Age to 0.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use bboard_auth_types::cookie::{clear_session_cookie, set_session_cookie, BBOARD_SESSION};
///
/// let jar = set_session_cookie(CookieJar::new(), "t".to_string(), false);
/// let jar = clear_session_cookie(jar);
/// assert_eq!(jar.get(BBOARD_SESSION).unwrap().max_age(), Some(time::Duration::ZERO));
/// ```
pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    let cookie = Cookie::build((BBOARD_SESSION, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

/// Queue a flash message shown on the next rendered page.
pub fn set_flash(jar: CookieJar, message: &str) -> CookieJar {
    let cookie = Cookie::build((BBOARD_FLASH, URL_SAFE_NO_PAD.encode(message)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

/// Read and expire the pending flash message, if any.
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
    let message = jar
        .get(BBOARD_FLASH)
        .and_then(|c| URL_SAFE_NO_PAD.decode(c.value()).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .filter(|m| !m.is_empty());
    if jar.get(BBOARD_FLASH).is_none() {
        return (jar, None);
    }
    let expired = Cookie::build((BBOARD_FLASH, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build();
    (jar.add(expired), message)
}
