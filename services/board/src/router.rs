use axum::{Router, extract::DefaultBodyLimit, routing::get};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use bboard_core::health::{healthz, readyz};
use bboard_core::middleware::request_id_layer;

use crate::handlers::{
    accounts::{
        activate, change_user_info, change_user_info_form, delete_user, delete_user_form, login,
        login_form, logout, password_change, password_change_form, profile, register,
        register_done, register_form,
    },
    listings::{
        add, add_form, by_rubric, change, change_form, delete, delete_form, detail,
        detail_comment, profile_detail, profile_detail_comment,
    },
    pages::{index, other_page},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let media = ServeDir::new(&state.config.media_root);
    let assets = ServeDir::new(&state.config.static_root);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Pages
        .route("/", get(index))
        .route("/pages/{page}/", get(other_page))
        // Accounts
        .route("/accounts/login/", get(login_form).post(login))
        .route("/accounts/logout/", get(logout))
        .route("/accounts/register/", get(register_form).post(register))
        .route("/accounts/register/done/", get(register_done))
        .route("/accounts/register/activate/{sign}/", get(activate))
        .route("/accounts/profile/", get(profile))
        .route(
            "/accounts/profile/change/",
            get(change_user_info_form).post(change_user_info),
        )
        .route(
            "/accounts/password/change/",
            get(password_change_form).post(password_change),
        )
        .route(
            "/accounts/profile/delete/",
            get(delete_user_form).post(delete_user),
        )
        // Own listings
        .route("/accounts/profile/add/", get(add_form).post(add))
        .route("/accounts/profile/change/{id}/", get(change_form).post(change))
        .route("/accounts/profile/delete/{id}/", get(delete_form).post(delete))
        .route(
            "/accounts/profile/{id}/",
            get(profile_detail).post(profile_detail_comment),
        )
        // Rubrics
        .route("/rubrics/{id}/", get(by_rubric))
        .route(
            "/rubrics/{rubric_id}/{id}/",
            get(detail).post(detail_comment),
        )
        // Files
        .nest_service("/media", media)
        .nest_service("/static", assets)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
