use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use bboard_auth_types::session::MaybeUser;
use bboard_core::html::HtmlTemplate;

use crate::error::BoardServiceError;
use crate::handlers::view::{ListingCard, NavQuery, PageContext, page_context};
use crate::state::AppState;
use crate::usecase::listing::HomeUseCase;

#[derive(Template)]
#[template(path = "index.html")]
struct IndexPage {
    ctx: PageContext,
    listings: Vec<ListingCard>,
}

#[derive(Template)]
#[template(path = "about.html")]
struct AboutPage {
    ctx: PageContext,
}

// ── GET / ────────────────────────────────────────────────────────────────────

pub async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(nav): Query<NavQuery>,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let uc = HomeUseCase {
        listings: state.listing_repo(),
    };
    let listings = uc.execute().await?;
    let (jar, ctx) = page_context(&state, user.as_ref(), &nav, jar).await?;
    let page = IndexPage {
        listings: ListingCard::list(&listings, ""),
        ctx,
    };
    Ok((jar, HtmlTemplate(page)).into_response())
}

// ── GET /pages/{page}/ ───────────────────────────────────────────────────────

pub async fn other_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(page): Path<String>,
    Query(nav): Query<NavQuery>,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let render: fn(PageContext) -> Response = match page.as_str() {
        "about" => |ctx| HtmlTemplate(AboutPage { ctx }).into_response(),
        _ => return Err(BoardServiceError::PageNotFound),
    };
    let (jar, ctx) = page_context(&state, user.as_ref(), &nav, jar).await?;
    Ok((jar, render(ctx)).into_response())
}
