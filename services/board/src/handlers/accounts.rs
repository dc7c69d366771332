use anyhow::Context as _;
use askama::Template;
use axum::Form;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use bboard_auth_types::cookie::{clear_session_cookie, set_flash, set_session_cookie};
use bboard_auth_types::session::{CurrentUser, MaybeUser};
use bboard_auth_types::token::issue_session_token;
use bboard_core::html::{HtmlTemplate, HtmlWithStatus};
use bboard_domain::form::FormErrors;

use crate::domain::types::User;
use crate::error::BoardServiceError;
use crate::handlers::view::{ListingCard, NavQuery, PageContext, page_context};
use crate::state::AppState;
use crate::usecase::account::{
    ChangePasswordInput, ChangePasswordUseCase, ChangeUserInfoInput, ChangeUserInfoUseCase,
    DeleteUserUseCase, GetUserUseCase, LoginInput, LoginUseCase, RegisterUserInput,
    RegisterUserUseCase,
};
use crate::usecase::activation::{ActivateUserUseCase, ActivationOutcome};
use crate::usecase::listing::ProfileListingsUseCase;

pub const PROFILE_URL: &str = "/accounts/profile/";

/// Keep `next` only when it is a path on this site.
pub fn safe_next(next: &str) -> &str {
    let next = next.trim();
    if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') {
        next
    } else {
        PROFILE_URL
    }
}

fn sign_in(state: &AppState, jar: CookieJar, user: &User) -> Result<CookieJar, BoardServiceError> {
    let (token, _) = issue_session_token(user.id, &user.username, state.session_key.secret())
        .context("issue session token")?;
    Ok(set_session_cookie(jar, token, state.config.secure_cookies))
}

async fn anonymous_context(
    state: &AppState,
    jar: CookieJar,
) -> Result<(CookieJar, PageContext), BoardServiceError> {
    page_context(state, None, &NavQuery::default(), jar).await
}

// ── Login / logout ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginPage {
    ctx: PageContext,
    username: String,
    next: String,
    errors: FormErrors,
}

pub async fn login_form(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let (jar, ctx) = page_context(&state, user.as_ref(), &NavQuery::default(), jar).await?;
    let page = LoginPage {
        ctx,
        username: String::new(),
        next: query.next.unwrap_or_default(),
        errors: FormErrors::new(),
    };
    Ok((jar, HtmlTemplate(page)).into_response())
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, BoardServiceError> {
    let uc = LoginUseCase {
        users: state.user_repo(),
    };
    let input = LoginInput {
        username: form.username.clone(),
        password: form.password,
    };
    match uc.execute(input).await {
        Ok(user) => {
            let jar = sign_in(&state, jar, &user)?;
            tracing::info!(user_id = %user.id, "user logged in");
            Ok((jar, Redirect::to(safe_next(&form.next))).into_response())
        }
        Err(e) => {
            let errors = e.into_form_errors()?;
            let (jar, ctx) = anonymous_context(&state, jar).await?;
            let page = LoginPage {
                ctx,
                username: form.username,
                next: form.next,
                errors,
            };
            Ok((jar, HtmlTemplate(page)).into_response())
        }
    }
}

#[derive(Template)]
#[template(path = "logout.html")]
struct LogoutPage {
    ctx: PageContext,
}

pub async fn logout(
    State(state): State<AppState>,
    _user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let jar = clear_session_cookie(jar);
    let (jar, ctx) = anonymous_context(&state, jar).await?;
    Ok((jar, HtmlTemplate(LogoutPage { ctx })).into_response())
}

// ── Registration ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    /// Checkbox: present when ticked.
    pub send_messages: Option<String>,
}

#[derive(Template)]
#[template(path = "register_user.html")]
struct RegisterPage {
    ctx: PageContext,
    form: RegisterForm,
    errors: FormErrors,
}

pub async fn register_form(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let (jar, ctx) = page_context(&state, user.as_ref(), &NavQuery::default(), jar).await?;
    let page = RegisterPage {
        ctx,
        form: RegisterForm {
            send_messages: Some("on".to_owned()),
            ..RegisterForm::default()
        },
        errors: FormErrors::new(),
    };
    Ok((jar, HtmlTemplate(page)).into_response())
}

pub async fn register(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, BoardServiceError> {
    let uc = RegisterUserUseCase {
        users: state.user_repo(),
        notifier: state.mailer(),
    };
    let input = RegisterUserInput {
        username: form.username.clone(),
        email: form.email.clone(),
        password: form.password.clone(),
        password_confirm: form.password_confirm.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        send_messages: form.send_messages.is_some(),
    };
    match uc.execute(input).await {
        Ok(_) => Ok(Redirect::to("/accounts/register/done/").into_response()),
        Err(e) => {
            let errors = e.into_form_errors()?;
            let (jar, ctx) =
                page_context(&state, user.as_ref(), &NavQuery::default(), jar).await?;
            let page = RegisterPage {
                ctx,
                form: RegisterForm {
                    password: String::new(),
                    password_confirm: String::new(),
                    ..form
                },
                errors,
            };
            Ok((jar, HtmlTemplate(page)).into_response())
        }
    }
}

#[derive(Template)]
#[template(path = "register_done.html")]
struct RegisterDonePage {
    ctx: PageContext,
}

pub async fn register_done(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let (jar, ctx) = page_context(&state, user.as_ref(), &NavQuery::default(), jar).await?;
    Ok((jar, HtmlTemplate(RegisterDonePage { ctx })).into_response())
}

// ── GET /accounts/register/activate/{sign}/ ──────────────────────────────────

#[derive(Template)]
#[template(path = "activation_done.html")]
struct ActivationDonePage {
    ctx: PageContext,
}

#[derive(Template)]
#[template(path = "user_is_activated.html")]
struct UserIsActivatedPage {
    ctx: PageContext,
}

#[derive(Template)]
#[template(path = "bad_signature.html")]
struct BadSignaturePage {
    ctx: PageContext,
}

pub async fn activate(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(sign): Path<String>,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let uc = ActivateUserUseCase {
        users: state.user_repo(),
        signer: state.signer.clone(),
    };
    let outcome = uc.execute(&sign).await;
    let (jar, ctx) = page_context(&state, user.as_ref(), &NavQuery::default(), jar).await?;
    let body = match outcome {
        Ok(ActivationOutcome::Activated) => {
            HtmlTemplate(ActivationDonePage { ctx }).into_response()
        }
        Ok(ActivationOutcome::AlreadyActivated) => {
            HtmlTemplate(UserIsActivatedPage { ctx }).into_response()
        }
        Err(BoardServiceError::BadSignature) => {
            HtmlWithStatus(StatusCode::BAD_REQUEST, BadSignaturePage { ctx }).into_response()
        }
        Err(e) => return Err(e),
    };
    Ok((jar, body).into_response())
}

// ── Profile ──────────────────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "profile.html")]
struct ProfilePage {
    ctx: PageContext,
    greeting: String,
    listings: Vec<ListingCard>,
}

pub async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let user = GetUserUseCase {
        users: state.user_repo(),
    }
    .execute(current.user_id)
    .await?;
    let listings = ProfileListingsUseCase {
        listings: state.listing_repo(),
    }
    .execute(user.id)
    .await?;
    let (jar, ctx) = page_context(&state, Some(&current), &NavQuery::default(), jar).await?;
    let greeting = match (user.first_name.as_str(), user.last_name.as_str()) {
        ("", "") => user.username.clone(),
        (first, last) => format!("{first} {last}").trim().to_owned(),
    };
    let page = ProfilePage {
        ctx,
        greeting,
        listings: ListingCard::list(&listings, ""),
    };
    Ok((jar, HtmlTemplate(page)).into_response())
}

// ── /accounts/profile/change/ ────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserInfoForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub send_messages: Option<String>,
}

impl From<User> for UserInfoForm {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            send_messages: user.send_messages.then(|| "on".to_owned()),
        }
    }
}

#[derive(Template)]
#[template(path = "change_user_info.html")]
struct ChangeUserInfoPage {
    ctx: PageContext,
    form: UserInfoForm,
    errors: FormErrors,
}

pub async fn change_user_info_form(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let user = GetUserUseCase {
        users: state.user_repo(),
    }
    .execute(current.user_id)
    .await?;
    let (jar, ctx) = page_context(&state, Some(&current), &NavQuery::default(), jar).await?;
    let page = ChangeUserInfoPage {
        ctx,
        form: user.into(),
        errors: FormErrors::new(),
    };
    Ok((jar, HtmlTemplate(page)).into_response())
}

pub async fn change_user_info(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
    Form(form): Form<UserInfoForm>,
) -> Result<Response, BoardServiceError> {
    let uc = ChangeUserInfoUseCase {
        users: state.user_repo(),
    };
    let input = ChangeUserInfoInput {
        username: form.username.clone(),
        email: form.email.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        send_messages: form.send_messages.is_some(),
    };
    match uc.execute(current.user_id, input).await {
        Ok(user) => {
            // The session carries the username, so it is re-issued.
            let jar = sign_in(&state, jar, &user)?;
            let jar = set_flash(jar, "User data changed");
            Ok((jar, Redirect::to(PROFILE_URL)).into_response())
        }
        Err(e) => {
            let errors = e.into_form_errors()?;
            let (jar, ctx) =
                page_context(&state, Some(&current), &NavQuery::default(), jar).await?;
            let page = ChangeUserInfoPage { ctx, form, errors };
            Ok((jar, HtmlTemplate(page)).into_response())
        }
    }
}

// ── /accounts/password/change/ ───────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

#[derive(Template)]
#[template(path = "password_change.html")]
struct PasswordChangePage {
    ctx: PageContext,
    errors: FormErrors,
}

pub async fn password_change_form(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let (jar, ctx) = page_context(&state, Some(&current), &NavQuery::default(), jar).await?;
    let page = PasswordChangePage {
        ctx,
        errors: FormErrors::new(),
    };
    Ok((jar, HtmlTemplate(page)).into_response())
}

pub async fn password_change(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
    Form(form): Form<PasswordChangeForm>,
) -> Result<Response, BoardServiceError> {
    let uc = ChangePasswordUseCase {
        users: state.user_repo(),
    };
    let input = ChangePasswordInput {
        old_password: form.old_password,
        new_password: form.new_password,
        new_password_confirm: form.new_password_confirm,
    };
    match uc.execute(current.user_id, input).await {
        Ok(()) => {
            let jar = set_flash(jar, "Password changed");
            Ok((jar, Redirect::to(PROFILE_URL)).into_response())
        }
        Err(e) => {
            let errors = e.into_form_errors()?;
            let (jar, ctx) =
                page_context(&state, Some(&current), &NavQuery::default(), jar).await?;
            Ok((jar, HtmlTemplate(PasswordChangePage { ctx, errors })).into_response())
        }
    }
}

// ── /accounts/profile/delete/ ────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "delete_user.html")]
struct DeleteUserPage {
    ctx: PageContext,
}

pub async fn delete_user_form(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let (jar, ctx) = page_context(&state, Some(&current), &NavQuery::default(), jar).await?;
    Ok((jar, HtmlTemplate(DeleteUserPage { ctx })).into_response())
}

pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let uc = DeleteUserUseCase {
        users: state.user_repo(),
        images: state.image_store(),
    };
    uc.execute(current.user_id).await?;
    let jar = set_flash(clear_session_cookie(jar), "User deleted");
    Ok((jar, Redirect::to("/")).into_response())
}
