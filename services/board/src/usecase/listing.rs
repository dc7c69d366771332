use chrono::Utc;
use uuid::Uuid;

use bboard_domain::form::FormErrors;
use bboard_domain::pagination::{Page, Paginator};

use crate::domain::repository::{
    CommentRepository, ImageStore, ListingRepository, RubricQuery, RubricRepository,
};
use crate::domain::types::{AdditionalImage, Comment, HOME_LISTINGS, Listing, SubRubric, sub_rubrics};
use crate::domain::validate::{self, TITLE_MAX};
use crate::error::BoardServiceError;
use crate::usecase::rubric::{INVALID_CHOICE, find_sub_rubric};

/// An uploaded file as received from the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub data: Vec<u8>,
}

// ── Browsing ─────────────────────────────────────────────────────────────────

pub struct HomeUseCase<L>
where
    L: ListingRepository,
{
    pub listings: L,
}

impl<L> HomeUseCase<L>
where
    L: ListingRepository,
{
    pub async fn execute(&self) -> Result<Vec<Listing>, BoardServiceError> {
        self.listings.latest_active(HOME_LISTINGS).await
    }
}

pub struct ProfileListingsUseCase<L>
where
    L: ListingRepository,
{
    pub listings: L,
}

impl<L> ProfileListingsUseCase<L>
where
    L: ListingRepository,
{
    pub async fn execute(&self, user_id: Uuid) -> Result<Vec<Listing>, BoardServiceError> {
        self.listings.list_by_author(user_id).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct BrowseRubricInput {
    pub rubric_id: i32,
    pub keyword: Option<String>,
    /// Raw `page` query value.
    pub page: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RubricPage {
    pub rubric: SubRubric,
    /// Keyword as submitted (empty when absent).
    pub keyword: String,
    pub page: Page,
    pub listings: Vec<Listing>,
}

pub struct BrowseRubricUseCase<R, L>
where
    R: RubricRepository,
    L: ListingRepository,
{
    pub rubrics: R,
    pub listings: L,
    pub paginator: Paginator,
}

impl<R, L> BrowseRubricUseCase<R, L>
where
    R: RubricRepository,
    L: ListingRepository,
{
    /// Active listings of a sub-rubric, keyword-filtered and paginated.
    pub async fn execute(&self, input: BrowseRubricInput) -> Result<RubricPage, BoardServiceError> {
        let rubric = find_sub_rubric(&self.rubrics, input.rubric_id).await?;
        let keyword = input.keyword.unwrap_or_default();
        let query = RubricQuery {
            rubric_id: rubric.id,
            keyword: Some(keyword.clone()).filter(|k| !k.is_empty()),
        };
        let count = self.listings.count_in_rubric(&query).await?;
        let page = self.paginator.get_page(input.page.as_deref(), count);
        let listings = if page.is_empty() {
            Vec::new()
        } else {
            self.listings
                .page_in_rubric(&query, page.offset(), page.per_page)
                .await?
        };
        Ok(RubricPage {
            rubric,
            keyword,
            page,
            listings,
        })
    }
}

// ── Detail ───────────────────────────────────────────────────────────────────

/// Who is looking at a listing.
#[derive(Debug, Clone, Copy)]
pub enum DetailScope {
    /// Public page reached through `rubric_id`; the listing must belong to it.
    Public { rubric_id: i32 },
    /// Owner page; only the author may open it.
    Owner { user_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct ListingDetail {
    pub listing: Listing,
    pub rubric: Option<SubRubric>,
    pub images: Vec<AdditionalImage>,
    pub comments: Vec<Comment>,
}

pub struct ListingDetailUseCase<R, L, C>
where
    R: RubricRepository,
    L: ListingRepository,
    C: CommentRepository,
{
    pub rubrics: R,
    pub listings: L,
    pub comments: C,
}

impl<R, L, C> ListingDetailUseCase<R, L, C>
where
    R: RubricRepository,
    L: ListingRepository,
    C: CommentRepository,
{
    pub async fn execute(
        &self,
        listing_id: Uuid,
        scope: DetailScope,
    ) -> Result<ListingDetail, BoardServiceError> {
        let listing = self
            .listings
            .find(listing_id)
            .await?
            .ok_or(BoardServiceError::ListingNotFound)?;
        match scope {
            DetailScope::Public { rubric_id } if listing.rubric_id != rubric_id => {
                return Err(BoardServiceError::ListingNotFound);
            }
            DetailScope::Owner { user_id } if listing.author_id != user_id => {
                return Err(BoardServiceError::Forbidden);
            }
            _ => {}
        }
        let all = self.rubrics.list().await?;
        let rubric = sub_rubrics(&all)
            .into_iter()
            .find(|s| s.id == listing.rubric_id);
        let images = self.listings.additional_images(listing.id).await?;
        let comments = self.comments.list_active(listing.id).await?;
        Ok(ListingDetail {
            listing,
            rubric,
            images,
            comments,
        })
    }
}

// ── Authoring ────────────────────────────────────────────────────────────────

/// Submitted listing form.
#[derive(Debug, Clone, Default)]
pub struct ListingInput {
    pub rubric: String,
    pub title: String,
    pub content: String,
    pub price: String,
    pub contacts: String,
    pub is_active: bool,
    pub image: Option<Upload>,
    pub additional_images: Vec<Upload>,
    /// Edit only: drop the current primary image.
    pub image_clear: bool,
    /// Edit only: additional image ids to remove.
    pub delete_images: Vec<Uuid>,
}

struct ValidListing {
    rubric_id: i32,
    title: String,
    content: String,
    price: f64,
    contacts: String,
}

/// Check scalar fields and every upload. Nothing is stored unless all pass.
async fn validate_listing<R>(rubrics: &R, input: &ListingInput) -> Result<ValidListing, BoardServiceError>
where
    R: RubricRepository,
{
    let mut errors = FormErrors::new();

    let rubric_id = match input.rubric.trim().parse::<i32>() {
        Ok(id) => match rubrics.find(id).await? {
            Some(r) if !r.is_super() => Some(id),
            _ => None,
        },
        Err(_) => None,
    };
    if rubric_id.is_none() {
        if input.rubric.trim().is_empty() {
            errors.add("rubric", validate::REQUIRED);
        } else {
            errors.add("rubric", INVALID_CHOICE);
        }
    }
    let title = validate::required_text(&mut errors, "title", &input.title, Some(TITLE_MAX));
    let content = validate::required_text(&mut errors, "content", &input.content, None);
    let price = validate::price(&mut errors, "price", &input.price);
    let contacts = validate::required_text(&mut errors, "contacts", &input.contacts, None);

    if let Some(upload) = &input.image {
        validate::image(&mut errors, "image", &upload.file_name, &upload.data);
    }
    for upload in &input.additional_images {
        validate::image(&mut errors, "additional_image", &upload.file_name, &upload.data);
    }

    let valid = ValidListing {
        rubric_id: rubric_id.unwrap_or_default(),
        title: title.to_owned(),
        content: content.to_owned(),
        price,
        contacts: contacts.to_owned(),
    };
    errors.into_result()?;
    Ok(valid)
}

/// Store uploads in order. On failure, files stored so far are removed.
async fn store_uploads<S>(store: &S, uploads: &[&Upload]) -> Result<Vec<String>, BoardServiceError>
where
    S: ImageStore,
{
    let mut saved = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match store.save(&upload.file_name, &upload.data).await {
            Ok(path) => saved.push(path),
            Err(e) => {
                store.remove_all(&saved).await;
                return Err(e);
            }
        }
    }
    Ok(saved)
}

pub struct CreateListingUseCase<R, L, S>
where
    R: RubricRepository,
    L: ListingRepository,
    S: ImageStore,
{
    pub rubrics: R,
    pub listings: L,
    pub images: S,
}

impl<R, L, S> CreateListingUseCase<R, L, S>
where
    R: RubricRepository,
    L: ListingRepository,
    S: ImageStore,
{
    pub async fn execute(
        &self,
        author_id: Uuid,
        input: ListingInput,
    ) -> Result<Listing, BoardServiceError> {
        let valid = validate_listing(&self.rubrics, &input).await?;

        let mut uploads: Vec<&Upload> = input.image.iter().collect();
        uploads.extend(input.additional_images.iter());
        let mut saved = store_uploads(&self.images, &uploads).await?.into_iter();

        let listing = Listing {
            id: Uuid::now_v7(),
            rubric_id: valid.rubric_id,
            author_id,
            title: valid.title,
            content: valid.content,
            price: valid.price,
            contacts: valid.contacts,
            image: input.image.as_ref().and_then(|_| saved.next()),
            is_active: input.is_active,
            created_at: Utc::now(),
        };
        let extra: Vec<AdditionalImage> = saved
            .map(|path| AdditionalImage {
                id: Uuid::now_v7(),
                listing_id: listing.id,
                image: path,
            })
            .collect();

        if let Err(e) = self.listings.create(&listing, &extra).await {
            let mut paths: Vec<String> = listing.image.iter().cloned().collect();
            paths.extend(extra.into_iter().map(|i| i.image));
            self.images.remove_all(&paths).await;
            return Err(e);
        }
        tracing::info!(listing_id = %listing.id, images = extra.len(), "listing created");
        Ok(listing)
    }
}

pub struct UpdateListingUseCase<R, L, S>
where
    R: RubricRepository,
    L: ListingRepository,
    S: ImageStore,
{
    pub rubrics: R,
    pub listings: L,
    pub images: S,
}

impl<R, L, S> UpdateListingUseCase<R, L, S>
where
    R: RubricRepository,
    L: ListingRepository,
    S: ImageStore,
{
    /// Apply an edit by the author, attaching new additional images and
    /// dropping the ones marked for deletion.
    pub async fn execute(
        &self,
        author_id: Uuid,
        listing_id: Uuid,
        input: ListingInput,
    ) -> Result<Listing, BoardServiceError> {
        let current = self
            .listings
            .find(listing_id)
            .await?
            .ok_or(BoardServiceError::ListingNotFound)?;
        if current.author_id != author_id {
            return Err(BoardServiceError::Forbidden);
        }
        let valid = validate_listing(&self.rubrics, &input).await?;

        let mut uploads: Vec<&Upload> = input.image.iter().collect();
        uploads.extend(input.additional_images.iter());
        let mut saved = store_uploads(&self.images, &uploads).await?.into_iter();

        let new_main = input.image.as_ref().and_then(|_| saved.next());
        let replaced = if new_main.is_some() || input.image_clear {
            current.image.clone()
        } else {
            None
        };
        let image = match (&new_main, input.image_clear) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => None,
            (None, false) => current.image.clone(),
        };
        let listing = Listing {
            rubric_id: valid.rubric_id,
            title: valid.title,
            content: valid.content,
            price: valid.price,
            contacts: valid.contacts,
            image,
            is_active: input.is_active,
            ..current
        };
        let added: Vec<AdditionalImage> = saved
            .map(|path| AdditionalImage {
                id: Uuid::now_v7(),
                listing_id: listing.id,
                image: path,
            })
            .collect();

        let dropped = match self
            .listings
            .update(&listing, &added, &input.delete_images)
            .await
        {
            Ok(dropped) => dropped,
            Err(e) => {
                let mut paths: Vec<String> = new_main.into_iter().collect();
                paths.extend(added.into_iter().map(|i| i.image));
                self.images.remove_all(&paths).await;
                return Err(e);
            }
        };

        let mut obsolete: Vec<String> = replaced.into_iter().collect();
        obsolete.extend(dropped);
        self.images.remove_all(&obsolete).await;
        tracing::info!(
            listing_id = %listing.id,
            added = added.len(),
            removed = input.delete_images.len(),
            "listing updated"
        );
        Ok(listing)
    }
}

pub struct DeleteListingUseCase<L, S>
where
    L: ListingRepository,
    S: ImageStore,
{
    pub listings: L,
    pub images: S,
}

impl<L, S> DeleteListingUseCase<L, S>
where
    L: ListingRepository,
    S: ImageStore,
{
    /// Delete a listing with its images and comments, then its files.
    pub async fn execute(&self, author_id: Uuid, listing_id: Uuid) -> Result<(), BoardServiceError> {
        let listing = self
            .listings
            .find(listing_id)
            .await?
            .ok_or(BoardServiceError::ListingNotFound)?;
        if listing.author_id != author_id {
            return Err(BoardServiceError::Forbidden);
        }
        let paths = self.listings.delete(listing.id).await?;
        self.images.remove_all(&paths).await;
        tracing::info!(listing_id = %listing.id, files = paths.len(), "listing deleted");
        Ok(())
    }
}
