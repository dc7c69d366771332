//! View models shared by the page templates.
//!
//! Templates only see plain strings, numbers and flags; every optional value
//! is resolved here so the markup never has to match on it.

use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::form_urlencoded;
use uuid::Uuid;

use bboard_auth_types::cookie::take_flash;
use bboard_auth_types::session::CurrentUser;

use crate::domain::types::{
    AdditionalImage, Comment, Listing, Rubric, RubricGroup, sub_rubrics,
};
use crate::error::BoardServiceError;
use crate::state::AppState;
use crate::usecase::rubric::NavigationUseCase;

// ── Navigation ───────────────────────────────────────────────────────────────

/// `keyword` / `page` query values carried between a rubric page and its detail pages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NavQuery {
    pub keyword: Option<String>,
    pub page: Option<String>,
}

impl NavQuery {
    /// Keyword exactly as submitted. Only an empty value means no filter.
    pub fn keyword(&self) -> &str {
        self.keyword.as_deref().unwrap_or_default()
    }

    /// Query string linking back to the same search page, e.g. `?keyword=bike&page=3`.
    pub fn back_query(&self) -> String {
        query_string(self.keyword(), self.page.as_deref())
    }
}

/// Build `?keyword=..&page=..`, leaving out an empty keyword and page `1`.
pub fn query_string(keyword: &str, page: Option<&str>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if !keyword.is_empty() {
        query.append_pair("keyword", keyword);
    }
    if let Some(page) = page.map(str::trim).filter(|p| !p.is_empty() && *p != "1") {
        query.append_pair("page", page);
    }
    let query = query.finish();
    if query.is_empty() {
        query
    } else {
        format!("?{query}")
    }
}

pub struct NavRubric {
    pub id: i32,
    pub name: String,
}

pub struct NavGroup {
    pub name: String,
    pub rubrics: Vec<NavRubric>,
}

impl From<RubricGroup> for NavGroup {
    fn from(group: RubricGroup) -> Self {
        Self {
            name: group.super_rubric.name,
            rubrics: group
                .sub_rubrics
                .into_iter()
                .map(|s| NavRubric {
                    id: s.id,
                    name: s.name,
                })
                .collect(),
        }
    }
}

/// Data every page layout needs: menu, signed-in user, pending flash message.
pub struct PageContext {
    pub groups: Vec<NavGroup>,
    pub back_query: String,
    pub is_authenticated: bool,
    pub username: String,
    pub flash: String,
}

impl PageContext {
    pub async fn load(
        state: &AppState,
        user: Option<&CurrentUser>,
        query: &NavQuery,
        flash: Option<String>,
    ) -> Result<Self, BoardServiceError> {
        let uc = NavigationUseCase {
            rubrics: state.rubric_repo(),
        };
        let groups = uc.execute().await?.into_iter().map(NavGroup::from).collect();
        Ok(Self {
            groups,
            back_query: query.back_query(),
            is_authenticated: user.is_some(),
            username: user.map(|u| u.username.clone()).unwrap_or_default(),
            flash: flash.unwrap_or_default(),
        })
    }
}

/// Consume the pending flash message and load the layout context.
pub async fn page_context(
    state: &AppState,
    user: Option<&CurrentUser>,
    query: &NavQuery,
    jar: CookieJar,
) -> Result<(CookieJar, PageContext), BoardServiceError> {
    let (jar, flash) = take_flash(jar);
    let ctx = PageContext::load(state, user, query, flash).await?;
    Ok((jar, ctx))
}

// ── Listings ─────────────────────────────────────────────────────────────────

/// URL of a stored upload.
pub fn media_url(path: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(path.as_bytes()).collect();
    format!("/media/{encoded}")
}

pub fn format_price(price: f64) -> String {
    format!("{price:.2}")
}

pub fn format_datetime(at: DateTime<Utc>) -> String {
    at.format("%d.%m.%Y %H:%M").to_string()
}

/// One listing in a list or on a detail page.
pub struct ListingCard {
    pub id: Uuid,
    pub rubric_id: i32,
    pub title: String,
    pub content: String,
    pub price: String,
    pub contacts: String,
    pub created_at: String,
    pub is_active: bool,
    pub has_image: bool,
    pub image_url: String,
    /// Public detail page, keeping the search query of the page it came from.
    pub detail_url: String,
    pub owner_url: String,
}

impl ListingCard {
    pub fn new(listing: &Listing, back_query: &str) -> Self {
        Self {
            id: listing.id,
            rubric_id: listing.rubric_id,
            title: listing.title.clone(),
            content: listing.content.clone(),
            price: format_price(listing.price),
            contacts: listing.contacts.clone(),
            created_at: format_datetime(listing.created_at),
            is_active: listing.is_active,
            has_image: listing.image.is_some(),
            image_url: listing.image.as_deref().map(media_url).unwrap_or_default(),
            detail_url: format!("/rubrics/{}/{}/{back_query}", listing.rubric_id, listing.id),
            owner_url: format!("/accounts/profile/{}/", listing.id),
        }
    }

    pub fn list(listings: &[Listing], back_query: &str) -> Vec<Self> {
        listings.iter().map(|l| Self::new(l, back_query)).collect()
    }
}

pub struct ImageView {
    pub id: Uuid,
    pub url: String,
}

impl From<&AdditionalImage> for ImageView {
    fn from(image: &AdditionalImage) -> Self {
        Self {
            id: image.id,
            url: media_url(&image.image),
        }
    }
}

pub struct CommentView {
    pub author: String,
    pub content: String,
    pub created_at: String,
}

impl From<&Comment> for CommentView {
    fn from(comment: &Comment) -> Self {
        Self {
            author: comment.author.clone(),
            content: comment.content.clone(),
            created_at: format_datetime(comment.created_at),
        }
    }
}

/// `<option>` of the rubric select.
pub struct RubricChoice {
    pub id: i32,
    pub label: String,
    pub selected: bool,
}

/// Sub-rubrics in menu order, labelled `Super - Sub`.
pub fn rubric_choices(all: &[Rubric], selected: &str) -> Vec<RubricChoice> {
    let selected = selected.trim();
    sub_rubrics(all)
        .into_iter()
        .map(|s| RubricChoice {
            id: s.id,
            label: s.display_name(),
            selected: s.id.to_string() == selected,
        })
        .collect()
}
