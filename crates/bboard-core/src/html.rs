use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

/// Renders an askama template as an HTML response.
pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                tracing::error!(error = %err, "failed to render template");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to render template",
                )
                    .into_response()
            }
        }
    }
}

/// Same as [`HtmlTemplate`] but with an explicit status code.
pub struct HtmlWithStatus<T>(pub StatusCode, pub T);

impl<T> IntoResponse for HtmlWithStatus<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        let mut resp = HtmlTemplate(self.1).into_response();
        if resp.status().is_success() {
            *resp.status_mut() = self.0;
        }
        resp
    }
}
