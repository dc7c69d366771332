use askama::Template;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

use bboard_auth_types::session::login_url_with_next;
use bboard_core::html::HtmlWithStatus;
use bboard_domain::form::FormErrors;

/// Board service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum BoardServiceError {
    #[error("invalid form data")]
    Validation(FormErrors),
    #[error("user not found")]
    UserNotFound,
    #[error("rubric not found")]
    RubricNotFound,
    #[error("listing not found")]
    ListingNotFound,
    #[error("page not found")]
    PageNotFound,
    #[error("not found")]
    NotFound,
    #[error("bad signature")]
    BadSignature,
    #[error("login required")]
    LoginRequired { next: String },
    #[error("forbidden")]
    Forbidden,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl BoardServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::RubricNotFound => "RUBRIC_NOT_FOUND",
            Self::ListingNotFound => "LISTING_NOT_FOUND",
            Self::PageNotFound => "PAGE_NOT_FOUND",
            Self::NotFound => "NOT_FOUND",
            Self::BadSignature => "BAD_SIGNATURE",
            Self::LoginRequired { .. } => "LOGIN_REQUIRED",
            Self::Forbidden => "FORBIDDEN",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadSignature => StatusCode::BAD_REQUEST,
            Self::UserNotFound
            | Self::RubricNotFound
            | Self::ListingNotFound
            | Self::PageNotFound
            | Self::NotFound => StatusCode::NOT_FOUND,
            Self::LoginRequired { .. } => StatusCode::SEE_OTHER,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Pull field errors out of a validation failure, passing anything else through.
    pub fn into_form_errors(self) -> Result<FormErrors, BoardServiceError> {
        match self {
            Self::Validation(errors) => Ok(errors),
            other => Err(other),
        }
    }
}

impl From<FormErrors> for BoardServiceError {
    fn from(errors: FormErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Plain error page. Does not extend the site layout so it renders without any lookups.
#[derive(Template)]
#[template(path = "error.html")]
struct ErrorPage {
    status_code: u16,
    title: &'static str,
    messages: Vec<String>,
}

impl IntoResponse for BoardServiceError {
    fn into_response(self) -> Response {
        if let Self::LoginRequired { next } = &self {
            return Redirect::to(&login_url_with_next(next)).into_response();
        }
        // 4xx are recorded by TraceLayer; only internal errors carry a chain worth logging.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %format!("{e:#}"), kind = "INTERNAL", "internal error");
        }
        let status = self.status();
        let title = match status {
            StatusCode::NOT_FOUND => "Page not found",
            StatusCode::FORBIDDEN => "Access denied",
            StatusCode::BAD_REQUEST => "Bad request",
            _ => "Server error",
        };
        let messages = match &self {
            Self::Validation(errors) => errors
                .iter()
                .flat_map(|(_, messages)| messages.iter().cloned())
                .collect(),
            Self::BadSignature => vec!["The activation link is invalid.".to_owned()],
            Self::Internal(_) => vec!["Something went wrong. Please try again later.".to_owned()],
            other => vec![capitalize(&other.to_string())],
        };
        HtmlWithStatus(
            status,
            ErrorPage {
                status_code: status.as_u16(),
                title,
                messages,
            },
        )
        .into_response()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
