#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::types::{
    ActivationFilter, AdditionalImage, CaptchaChallenge, Comment, Listing, OutboxEvent, Rubric,
    User,
};
use crate::error::BoardServiceError;

/// Repository for board users.
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, BoardServiceError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, BoardServiceError>;

    /// Whether `username` belongs to any user other than `except`.
    async fn username_taken(
        &self,
        username: &str,
        except: Option<Uuid>,
    ) -> Result<bool, BoardServiceError>;

    /// Insert the user and an outbox event in one transaction.
    async fn create_with_event(
        &self,
        user: &User,
        event: &OutboxEvent,
    ) -> Result<(), BoardServiceError>;

    /// Overwrite every mutable column of an existing user.
    async fn update(&self, user: &User) -> Result<(), BoardServiceError>;

    /// Users matching `filter`, oldest first.
    async fn list_by_filter(
        &self,
        filter: ActivationFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<User>, BoardServiceError>;

    /// Delete the user and every listing they own in one transaction.
    /// Returns the stored image paths that are no longer referenced.
    async fn delete_with_listings(&self, id: Uuid) -> Result<Vec<String>, BoardServiceError>;
}

/// Repository for the rubric tree.
pub trait RubricRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Rubric>, BoardServiceError>;

    async fn find(&self, id: i32) -> Result<Option<Rubric>, BoardServiceError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Rubric>, BoardServiceError>;

    /// Insert a rubric and return it with its assigned id.
    async fn create(
        &self,
        name: &str,
        order: i16,
        super_rubric_id: Option<i32>,
    ) -> Result<Rubric, BoardServiceError>;
}

/// Active listings of one sub-rubric, optionally narrowed by a keyword.
#[derive(Debug, Clone)]
pub struct RubricQuery {
    pub rubric_id: i32,
    /// Case-insensitive substring of title or content. `None` matches everything.
    pub keyword: Option<String>,
}

/// Repository for listings and their additional images.
pub trait ListingRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Listing>, BoardServiceError>;

    /// Newest active listings across all rubrics.
    async fn latest_active(&self, limit: u64) -> Result<Vec<Listing>, BoardServiceError>;

    /// Every listing of `author_id`, newest first, active or not.
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Listing>, BoardServiceError>;

    async fn count_in_rubric(&self, query: &RubricQuery) -> Result<u64, BoardServiceError>;

    /// One page of [`ListingRepository::count_in_rubric`]'s result set, newest first.
    async fn page_in_rubric(
        &self,
        query: &RubricQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Listing>, BoardServiceError>;

    async fn additional_images(
        &self,
        listing_id: Uuid,
    ) -> Result<Vec<AdditionalImage>, BoardServiceError>;

    /// Insert the listing, then its images, in one transaction.
    async fn create(
        &self,
        listing: &Listing,
        images: &[AdditionalImage],
    ) -> Result<(), BoardServiceError>;

    /// Update the listing, attach `added` and drop `removed` image ids in one transaction.
    /// Returns the stored paths of the dropped images.
    async fn update(
        &self,
        listing: &Listing,
        added: &[AdditionalImage],
        removed: &[Uuid],
    ) -> Result<Vec<String>, BoardServiceError>;

    /// Delete additional images, comments and the listing in one transaction.
    /// Returns every stored image path the listing referenced.
    async fn delete(&self, id: Uuid) -> Result<Vec<String>, BoardServiceError>;
}

/// Repository for listing comments.
pub trait CommentRepository: Send + Sync {
    /// Active comments of a listing, oldest first.
    async fn list_active(&self, listing_id: Uuid) -> Result<Vec<Comment>, BoardServiceError>;

    async fn create(&self, comment: &Comment) -> Result<(), BoardServiceError>;
}

/// Challenge provider gating guest comments.
pub trait CaptchaPort: Send + Sync {
    async fn issue(&self) -> Result<CaptchaChallenge, BoardServiceError>;

    /// Check an answer. A challenge can be answered once; it is spent even when wrong.
    async fn verify(&self, key: &str, answer: &str) -> Result<bool, BoardServiceError>;
}

/// Storage for uploaded listing images.
pub trait ImageStore: Send + Sync {
    /// Persist `data` and return its path relative to the media root.
    async fn save(&self, original_name: &str, data: &[u8]) -> Result<String, BoardServiceError>;

    /// Remove a stored file. Missing files are not an error.
    async fn remove(&self, path: &str) -> Result<(), BoardServiceError>;

    /// Remove files after their rows are gone. Failures are logged, not returned.
    async fn remove_all(&self, paths: &[String]) {
        for path in paths {
            if let Err(e) = self.remove(path).await {
                tracing::warn!(path = %path, error = %e, "failed to remove image file");
            }
        }
    }
}

/// Queues the account-activation letter for a user.
pub trait ActivationNotifier: Send + Sync {
    /// Outbox event carrying the letter. Registration stores it with the new user.
    fn activation_event(&self, user: &User) -> Result<OutboxEvent, BoardServiceError>;

    /// Queue the letter for a user that is already stored.
    async fn send_activation(&self, user: &User) -> Result<(), BoardServiceError>;
}
