use askama::Template;
use axum::Form;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use bboard_auth_types::cookie::set_flash;
use bboard_auth_types::session::{CurrentUser, MaybeUser};
use bboard_core::html::HtmlTemplate;
use bboard_domain::form::FormErrors;

use crate::domain::repository::{CaptchaPort, RubricRepository};
use crate::domain::types::Listing;
use crate::error::BoardServiceError;
use crate::handlers::accounts::PROFILE_URL;
use crate::handlers::view::{
    CommentView, ImageView, ListingCard, NavQuery, PageContext, RubricChoice, page_context,
    query_string, rubric_choices,
};
use crate::state::AppState;
use crate::usecase::comment::{AddCommentUseCase, CommentAuthor, CommentInput};
use crate::usecase::listing::{
    BrowseRubricInput, BrowseRubricUseCase, CreateListingUseCase, DeleteListingUseCase,
    DetailScope, ListingDetail, ListingDetailUseCase, ListingInput, UpdateListingUseCase, Upload,
};

fn parse_rubric_id(raw: &str) -> Result<i32, BoardServiceError> {
    raw.parse().map_err(|_| BoardServiceError::RubricNotFound)
}

fn parse_listing_id(raw: &str) -> Result<Uuid, BoardServiceError> {
    Uuid::parse_str(raw).map_err(|_| BoardServiceError::ListingNotFound)
}

async fn load_detail(
    state: &AppState,
    listing_id: Uuid,
    scope: DetailScope,
) -> Result<ListingDetail, BoardServiceError> {
    ListingDetailUseCase {
        rubrics: state.rubric_repo(),
        listings: state.listing_repo(),
        comments: state.comment_repo(),
    }
    .execute(listing_id, scope)
    .await
}

// ── GET /rubrics/{id}/ ───────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "by_rubric.html")]
struct ByRubricPage {
    ctx: PageContext,
    rubric_id: i32,
    rubric_name: String,
    keyword: String,
    listings: Vec<ListingCard>,
    number: u64,
    num_pages: u64,
    /// Empty when there is no such page.
    previous_url: String,
    next_url: String,
}

pub async fn by_rubric(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
    Query(nav): Query<NavQuery>,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let rubric_id = parse_rubric_id(&id)?;
    let uc = BrowseRubricUseCase {
        rubrics: state.rubric_repo(),
        listings: state.listing_repo(),
        paginator: state.paginator(),
    };
    let result = uc
        .execute(BrowseRubricInput {
            rubric_id,
            keyword: Some(nav.keyword().to_owned()),
            page: nav.page.clone(),
        })
        .await?;

    let page = result.page;
    let base = format!("/rubrics/{rubric_id}/");
    let link = |n: u64| {
        let query = query_string(&result.keyword, Some(n.to_string().as_str()));
        format!("{base}{query}")
    };
    let back_query = query_string(&result.keyword, Some(page.number.to_string().as_str()));
    let (jar, ctx) = page_context(&state, user.as_ref(), &nav, jar).await?;
    let body = ByRubricPage {
        ctx,
        rubric_id,
        rubric_name: result.rubric.display_name(),
        listings: ListingCard::list(&result.listings, &back_query),
        number: page.number,
        num_pages: page.num_pages,
        previous_url: if page.has_previous() {
            link(page.previous_page_number())
        } else {
            String::new()
        },
        next_url: if page.has_next() {
            link(page.next_page_number())
        } else {
            String::new()
        },
        keyword: result.keyword,
    };
    Ok((jar, HtmlTemplate(body)).into_response())
}

// ── Detail pages with comments ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    /// Hidden: id of the listing the form was rendered for.
    pub bb: String,
    pub author: String,
    pub content: String,
    pub captcha_key: String,
    pub captcha_answer: String,
}

impl From<CommentForm> for CommentInput {
    fn from(form: CommentForm) -> Self {
        Self {
            listing: form.bb,
            author: form.author,
            content: form.content,
            captcha_key: form.captcha_key,
            captcha_answer: form.captcha_answer,
        }
    }
}

#[derive(Template)]
#[template(path = "detail.html")]
struct DetailPage {
    ctx: PageContext,
    listing: ListingCard,
    rubric_name: String,
    images: Vec<ImageView>,
    comments: Vec<CommentView>,
    /// Owner view: shows edit and delete links.
    is_owner_view: bool,
    back_url: String,
    post_url: String,
    form: CommentForm,
    /// Guests must name themselves and answer the captcha.
    is_guest: bool,
    captcha_question: String,
    errors: FormErrors,
}

struct DetailRender<'a> {
    user: Option<&'a CurrentUser>,
    nav: &'a NavQuery,
    scope: DetailScope,
    form: CommentForm,
    errors: FormErrors,
}

async fn render_detail(
    state: &AppState,
    jar: CookieJar,
    detail: ListingDetail,
    render: DetailRender<'_>,
) -> Result<Response, BoardServiceError> {
    let DetailRender {
        user,
        nav,
        scope,
        mut form,
        errors,
    } = render;
    let back_query = nav.back_query();
    let listing = &detail.listing;
    let (is_owner_view, back_url, post_url) = match scope {
        DetailScope::Public { rubric_id } => (
            false,
            format!("/rubrics/{rubric_id}/{back_query}"),
            format!("/rubrics/{rubric_id}/{}/{back_query}", listing.id),
        ),
        DetailScope::Owner { .. } => (
            true,
            PROFILE_URL.to_owned(),
            format!("/accounts/profile/{}/", listing.id),
        ),
    };

    form.bb = listing.id.to_string();
    form.captcha_answer.clear();
    let mut captcha_question = String::new();
    match user {
        Some(u) => form.author = u.username.clone(),
        None => {
            let challenge = state.captcha().issue().await?;
            form.captcha_key = challenge.key;
            captcha_question = challenge.question;
        }
    }

    let (jar, ctx) = page_context(state, user, nav, jar).await?;
    let page = DetailPage {
        ctx,
        listing: ListingCard::new(listing, &back_query),
        rubric_name: detail
            .rubric
            .as_ref()
            .map(|r| r.display_name())
            .unwrap_or_default(),
        images: detail.images.iter().map(ImageView::from).collect(),
        comments: detail.comments.iter().map(CommentView::from).collect(),
        is_owner_view,
        back_url,
        post_url,
        form,
        is_guest: user.is_none(),
        captcha_question,
        errors,
    };
    Ok((jar, HtmlTemplate(page)).into_response())
}

async fn submit_comment(
    state: &AppState,
    jar: CookieJar,
    detail: ListingDetail,
    render: DetailRender<'_>,
    redirect_to: String,
) -> Result<Response, BoardServiceError> {
    let uc = AddCommentUseCase {
        listings: state.listing_repo(),
        comments: state.comment_repo(),
        captcha: state.captcha(),
    };
    let author = match render.user {
        Some(u) => CommentAuthor::User(u.username.clone()),
        None => CommentAuthor::Guest,
    };
    match uc
        .execute(detail.listing.id, author, render.form.clone().into())
        .await
    {
        Ok(_) => {
            let jar = set_flash(jar, "Comment added");
            Ok((jar, Redirect::to(&redirect_to)).into_response())
        }
        Err(e) => {
            let errors = e.into_form_errors()?;
            render_detail(state, jar, detail, DetailRender { errors, ..render }).await
        }
    }
}

pub async fn detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path((rubric_id, id)): Path<(String, String)>,
    Query(nav): Query<NavQuery>,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let rubric_id = parse_rubric_id(&rubric_id)?;
    let scope = DetailScope::Public { rubric_id };
    let detail = load_detail(&state, parse_listing_id(&id)?, scope).await?;
    let render = DetailRender {
        user: user.as_ref(),
        nav: &nav,
        scope,
        form: CommentForm::default(),
        errors: FormErrors::new(),
    };
    render_detail(&state, jar, detail, render).await
}

pub async fn detail_comment(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path((rubric_id, id)): Path<(String, String)>,
    Query(nav): Query<NavQuery>,
    jar: CookieJar,
    Form(form): Form<CommentForm>,
) -> Result<Response, BoardServiceError> {
    let rubric_id = parse_rubric_id(&rubric_id)?;
    let scope = DetailScope::Public { rubric_id };
    let detail = load_detail(&state, parse_listing_id(&id)?, scope).await?;
    let redirect_to = format!(
        "/rubrics/{rubric_id}/{}/{}",
        detail.listing.id,
        nav.back_query()
    );
    let render = DetailRender {
        user: user.as_ref(),
        nav: &nav,
        scope,
        form,
        errors: FormErrors::new(),
    };
    submit_comment(&state, jar, detail, render, redirect_to).await
}

pub async fn profile_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let scope = DetailScope::Owner {
        user_id: current.user_id,
    };
    let detail = load_detail(&state, parse_listing_id(&id)?, scope).await?;
    let nav = NavQuery::default();
    let render = DetailRender {
        user: Some(&current),
        nav: &nav,
        scope,
        form: CommentForm::default(),
        errors: FormErrors::new(),
    };
    render_detail(&state, jar, detail, render).await
}

pub async fn profile_detail_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    jar: CookieJar,
    Form(form): Form<CommentForm>,
) -> Result<Response, BoardServiceError> {
    let scope = DetailScope::Owner {
        user_id: current.user_id,
    };
    let detail = load_detail(&state, parse_listing_id(&id)?, scope).await?;
    let redirect_to = format!("/accounts/profile/{}/", detail.listing.id);
    let nav = NavQuery::default();
    let render = DetailRender {
        user: Some(&current),
        nav: &nav,
        scope,
        form,
        errors: FormErrors::new(),
    };
    submit_comment(&state, jar, detail, render, redirect_to).await
}

// ── Listing form ─────────────────────────────────────────────────────────────

/// Scalar values echoed back into the listing form.
#[derive(Debug, Clone, Default)]
pub struct ListingFormView {
    pub rubric: String,
    pub title: String,
    pub content: String,
    pub price: String,
    pub contacts: String,
    pub is_active: bool,
}

impl From<&ListingInput> for ListingFormView {
    fn from(input: &ListingInput) -> Self {
        Self {
            rubric: input.rubric.clone(),
            title: input.title.clone(),
            content: input.content.clone(),
            price: input.price.clone(),
            contacts: input.contacts.clone(),
            is_active: input.is_active,
        }
    }
}

impl From<&Listing> for ListingFormView {
    fn from(listing: &Listing) -> Self {
        Self {
            rubric: listing.rubric_id.to_string(),
            title: listing.title.clone(),
            content: listing.content.clone(),
            price: listing.price.to_string(),
            contacts: listing.contacts.clone(),
            is_active: listing.is_active,
        }
    }
}

#[derive(Template)]
#[template(path = "profile_bb_form.html")]
struct ListingFormPage {
    ctx: PageContext,
    heading: &'static str,
    action: String,
    form: ListingFormView,
    rubrics: Vec<RubricChoice>,
    /// Edit only: current primary image, empty when none.
    image_url: String,
    images: Vec<ImageView>,
    is_edit: bool,
    errors: FormErrors,
}

/// Read a `multipart/form-data` listing submission.
///
/// Empty file parts (a file input left blank) are ignored.
pub async fn read_listing_form(mut multipart: Multipart) -> Result<ListingInput, MultipartError> {
    let mut input = ListingInput::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        let file_name = field.file_name().map(str::to_owned);
        let data = field.bytes().await?;
        let text = || String::from_utf8_lossy(&data).into_owned();
        match name.as_str() {
            "image" | "additional_image" => {
                let Some(file_name) = file_name.filter(|f| !f.is_empty()) else {
                    continue;
                };
                if data.is_empty() {
                    continue;
                }
                let upload = Upload {
                    file_name,
                    data: data.to_vec(),
                };
                if name == "image" {
                    input.image = Some(upload);
                } else {
                    input.additional_images.push(upload);
                }
            }
            "rubric" => input.rubric = text(),
            "title" => input.title = text(),
            "content" => input.content = text(),
            "price" => input.price = text(),
            "contacts" => input.contacts = text(),
            "is_active" => input.is_active = true,
            "image_clear" => input.image_clear = true,
            "delete_image" => {
                if let Ok(id) = Uuid::parse_str(text().trim()) {
                    input.delete_images.push(id);
                }
            }
            _ => {}
        }
    }
    Ok(input)
}

fn upload_error(e: MultipartError) -> FormErrors {
    tracing::debug!(error = %e, "unreadable listing upload");
    let mut errors = FormErrors::new();
    errors.add_non_field("The upload could not be read. Check the file sizes and try again.");
    errors
}

struct FormRender {
    heading: &'static str,
    action: String,
    form: ListingFormView,
    existing: Option<ListingDetail>,
    errors: FormErrors,
}

async fn render_listing_form(
    state: &AppState,
    current: &CurrentUser,
    jar: CookieJar,
    render: FormRender,
) -> Result<Response, BoardServiceError> {
    let all = state.rubric_repo().list().await?;
    let (image_url, images) = match &render.existing {
        Some(detail) => (
            ListingCard::new(&detail.listing, "").image_url,
            detail.images.iter().map(ImageView::from).collect(),
        ),
        None => (String::new(), Vec::new()),
    };
    let (jar, ctx) = page_context(state, Some(current), &NavQuery::default(), jar).await?;
    let page = ListingFormPage {
        ctx,
        heading: render.heading,
        action: render.action,
        rubrics: rubric_choices(&all, &render.form.rubric),
        form: render.form,
        image_url,
        images,
        is_edit: render.existing.is_some(),
        errors: render.errors,
    };
    Ok((jar, HtmlTemplate(page)).into_response())
}

// ── /accounts/profile/add/ ───────────────────────────────────────────────────

const ADD_HEADING: &str = "Add listing";
const ADD_URL: &str = "/accounts/profile/add/";

pub async fn add_form(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let render = FormRender {
        heading: ADD_HEADING,
        action: ADD_URL.to_owned(),
        form: ListingFormView {
            is_active: true,
            ..ListingFormView::default()
        },
        existing: None,
        errors: FormErrors::new(),
    };
    render_listing_form(&state, &current, jar, render).await
}

pub async fn add(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Response, BoardServiceError> {
    let outcome = match read_listing_form(multipart).await {
        Ok(input) => {
            let form = ListingFormView::from(&input);
            let uc = CreateListingUseCase {
                rubrics: state.rubric_repo(),
                listings: state.listing_repo(),
                images: state.image_store(),
            };
            uc.execute(current.user_id, input)
                .await
                .map_err(|e| (form, e))
        }
        Err(e) => Err((ListingFormView::default(), BoardServiceError::from(upload_error(e)))),
    };
    match outcome {
        Ok(_) => {
            let jar = set_flash(jar, "Listing added");
            Ok((jar, Redirect::to(PROFILE_URL)).into_response())
        }
        Err((form, e)) => {
            let render = FormRender {
                heading: ADD_HEADING,
                action: ADD_URL.to_owned(),
                form,
                existing: None,
                errors: e.into_form_errors()?,
            };
            render_listing_form(&state, &current, jar, render).await
        }
    }
}

// ── /accounts/profile/change/{id}/ ───────────────────────────────────────────

const CHANGE_HEADING: &str = "Edit listing";

pub async fn change_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let scope = DetailScope::Owner {
        user_id: current.user_id,
    };
    let detail = load_detail(&state, parse_listing_id(&id)?, scope).await?;
    let render = FormRender {
        heading: CHANGE_HEADING,
        action: format!("/accounts/profile/change/{}/", detail.listing.id),
        form: ListingFormView::from(&detail.listing),
        existing: Some(detail),
        errors: FormErrors::new(),
    };
    render_listing_form(&state, &current, jar, render).await
}

pub async fn change(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Response, BoardServiceError> {
    let listing_id = parse_listing_id(&id)?;
    let outcome = match read_listing_form(multipart).await {
        Ok(input) => {
            let form = ListingFormView::from(&input);
            let uc = UpdateListingUseCase {
                rubrics: state.rubric_repo(),
                listings: state.listing_repo(),
                images: state.image_store(),
            };
            uc.execute(current.user_id, listing_id, input)
                .await
                .map_err(|e| (Some(form), e))
        }
        Err(e) => Err((None, BoardServiceError::from(upload_error(e)))),
    };
    match outcome {
        Ok(_) => {
            let jar = set_flash(jar, "Listing changed");
            Ok((jar, Redirect::to(PROFILE_URL)).into_response())
        }
        Err((form, e)) => {
            let errors = e.into_form_errors()?;
            let scope = DetailScope::Owner {
                user_id: current.user_id,
            };
            let detail = load_detail(&state, listing_id, scope).await?;
            let render = FormRender {
                heading: CHANGE_HEADING,
                action: format!("/accounts/profile/change/{listing_id}/"),
                form: form.unwrap_or_else(|| ListingFormView::from(&detail.listing)),
                existing: Some(detail),
                errors,
            };
            render_listing_form(&state, &current, jar, render).await
        }
    }
}

// ── /accounts/profile/delete/{id}/ ───────────────────────────────────────────

#[derive(Template)]
#[template(path = "profile_bb_delete.html")]
struct ListingDeletePage {
    ctx: PageContext,
    listing: ListingCard,
}

pub async fn delete_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let scope = DetailScope::Owner {
        user_id: current.user_id,
    };
    let detail = load_detail(&state, parse_listing_id(&id)?, scope).await?;
    let (jar, ctx) = page_context(&state, Some(&current), &NavQuery::default(), jar).await?;
    let page = ListingDeletePage {
        ctx,
        listing: ListingCard::new(&detail.listing, ""),
    };
    Ok((jar, HtmlTemplate(page)).into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Response, BoardServiceError> {
    let uc = DeleteListingUseCase {
        listings: state.listing_repo(),
        images: state.image_store(),
    };
    uc.execute(current.user_id, parse_listing_id(&id)?).await?;
    let jar = set_flash(jar, "Listing deleted");
    Ok((jar, Redirect::to(PROFILE_URL)).into_response())
}
