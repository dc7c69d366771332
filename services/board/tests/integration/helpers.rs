use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use bboard::domain::repository::{
    ActivationNotifier, CaptchaPort, CommentRepository, ImageStore, ListingRepository,
    RubricQuery, RubricRepository, UserRepository,
};
use bboard::domain::types::{
    ActivationFilter, AdditionalImage, CaptchaChallenge, Comment, Listing, OutboxEvent, Rubric,
    User,
};
use bboard::error::BoardServiceError;
use bboard::usecase::account::hash_password;
use bboard::usecase::listing::Upload;

pub const TEST_SECRET_KEY: &str = "test-secret-key-for-activation-links";
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn test_user(username: &str, activated: bool) -> User {
    User {
        id: Uuid::now_v7(),
        username: username.to_owned(),
        email: format!("{username}@example.com"),
        password_hash: hash_password("correct-horse-battery").unwrap(),
        first_name: String::new(),
        last_name: String::new(),
        is_active: activated,
        is_activated: activated,
        send_messages: true,
        date_joined: Utc::now() - Duration::days(10),
        last_login: None,
    }
}

/// Super-rubric 1 "Vehicles" with sub-rubrics 2 "Cars" and 3 "Bikes".
pub fn test_rubrics() -> Vec<Rubric> {
    vec![
        Rubric {
            id: 1,
            name: "Vehicles".to_owned(),
            order: 0,
            super_rubric_id: None,
        },
        Rubric {
            id: 2,
            name: "Cars".to_owned(),
            order: 0,
            super_rubric_id: Some(1),
        },
        Rubric {
            id: 3,
            name: "Bikes".to_owned(),
            order: 1,
            super_rubric_id: Some(1),
        },
    ]
}

pub fn test_listing(rubric_id: i32, author_id: Uuid, title: &str, created_at: DateTime<Utc>) -> Listing {
    Listing {
        id: Uuid::now_v7(),
        rubric_id,
        author_id,
        title: title.to_owned(),
        content: format!("{title} in good condition"),
        price: 100.0,
        contacts: "call me".to_owned(),
        image: None,
        is_active: true,
        created_at,
    }
}

pub fn png_upload(name: &str) -> Upload {
    Upload {
        file_name: name.to_owned(),
        data: PNG_BYTES.to_vec(),
    }
}

// ── MockListingRepo ──────────────────────────────────────────────────────────

/// Listings, their images and their comments, shared with the other mocks.
#[derive(Clone, Default)]
pub struct MockListingRepo {
    pub listings: Arc<Mutex<Vec<Listing>>>,
    pub images: Arc<Mutex<Vec<AdditionalImage>>>,
    pub comments: Arc<Mutex<Vec<Comment>>>,
}

impl MockListingRepo {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings: Arc::new(Mutex::new(listings)),
            ..Self::default()
        }
    }

    pub fn listings_handle(&self) -> Arc<Mutex<Vec<Listing>>> {
        Arc::clone(&self.listings)
    }

    pub fn images_handle(&self) -> Arc<Mutex<Vec<AdditionalImage>>> {
        Arc::clone(&self.images)
    }

    pub fn comments_handle(&self) -> Arc<Mutex<Vec<Comment>>> {
        Arc::clone(&self.comments)
    }

    fn matching(&self, query: &RubricQuery) -> Vec<Listing> {
        let keyword = query.keyword.as_deref().map(str::to_lowercase);
        let mut found: Vec<Listing> = self
            .listings
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.is_active && l.rubric_id == query.rubric_id)
            .filter(|l| match &keyword {
                Some(k) => {
                    l.title.to_lowercase().contains(k) || l.content.to_lowercase().contains(k)
                }
                None => true,
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }

    /// Remove a listing with its images and comments; returns its file paths.
    fn remove_listing(&self, id: Uuid) -> Vec<String> {
        let mut paths = Vec::new();
        let mut listings = self.listings.lock().unwrap();
        if let Some(pos) = listings.iter().position(|l| l.id == id) {
            let listing = listings.remove(pos);
            paths.extend(listing.image);
        }
        let mut images = self.images.lock().unwrap();
        paths.extend(
            images
                .iter()
                .filter(|i| i.listing_id == id)
                .map(|i| i.image.clone()),
        );
        images.retain(|i| i.listing_id != id);
        self.comments.lock().unwrap().retain(|c| c.listing_id != id);
        paths
    }
}

impl ListingRepository for MockListingRepo {
    async fn find(&self, id: Uuid) -> Result<Option<Listing>, BoardServiceError> {
        Ok(self
            .listings
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.id == id)
            .cloned())
    }

    async fn latest_active(&self, limit: u64) -> Result<Vec<Listing>, BoardServiceError> {
        let mut found: Vec<Listing> = self
            .listings
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.is_active)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit as usize);
        Ok(found)
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Listing>, BoardServiceError> {
        let mut found: Vec<Listing> = self
            .listings
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.author_id == author_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn count_in_rubric(&self, query: &RubricQuery) -> Result<u64, BoardServiceError> {
        Ok(self.matching(query).len() as u64)
    }

    async fn page_in_rubric(
        &self,
        query: &RubricQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Listing>, BoardServiceError> {
        Ok(self
            .matching(query)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn additional_images(
        &self,
        listing_id: Uuid,
    ) -> Result<Vec<AdditionalImage>, BoardServiceError> {
        Ok(self
            .images
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.listing_id == listing_id)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        listing: &Listing,
        images: &[AdditionalImage],
    ) -> Result<(), BoardServiceError> {
        self.listings.lock().unwrap().push(listing.clone());
        self.images.lock().unwrap().extend(images.iter().cloned());
        Ok(())
    }

    async fn update(
        &self,
        listing: &Listing,
        added: &[AdditionalImage],
        removed: &[Uuid],
    ) -> Result<Vec<String>, BoardServiceError> {
        {
            let mut listings = self.listings.lock().unwrap();
            let Some(slot) = listings.iter_mut().find(|l| l.id == listing.id) else {
                return Err(BoardServiceError::ListingNotFound);
            };
            *slot = listing.clone();
        }
        let mut images = self.images.lock().unwrap();
        let dropped: Vec<String> = images
            .iter()
            .filter(|i| i.listing_id == listing.id && removed.contains(&i.id))
            .map(|i| i.image.clone())
            .collect();
        images.retain(|i| !(i.listing_id == listing.id && removed.contains(&i.id)));
        images.extend(added.iter().cloned());
        Ok(dropped)
    }

    async fn delete(&self, id: Uuid) -> Result<Vec<String>, BoardServiceError> {
        Ok(self.remove_listing(id))
    }
}

// ── MockCommentRepo ──────────────────────────────────────────────────────────

pub struct MockCommentRepo {
    pub comments: Arc<Mutex<Vec<Comment>>>,
}

impl MockCommentRepo {
    /// Shares the comment table of `listings`.
    pub fn over(listings: &MockListingRepo) -> Self {
        Self {
            comments: listings.comments_handle(),
        }
    }
}

impl CommentRepository for MockCommentRepo {
    async fn list_active(&self, listing_id: Uuid) -> Result<Vec<Comment>, BoardServiceError> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.listing_id == listing_id && c.is_active)
            .cloned()
            .collect())
    }

    async fn create(&self, comment: &Comment) -> Result<(), BoardServiceError> {
        self.comments.lock().unwrap().push(comment.clone());
        Ok(())
    }
}

// ── MockUserRepo ─────────────────────────────────────────────────────────────

pub struct MockUserRepo {
    pub users: Arc<Mutex<Vec<User>>>,
    pub events: Arc<Mutex<Vec<OutboxEvent>>>,
    pub listings: MockListingRepo,
}

impl MockUserRepo {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: Arc::new(Mutex::new(users)),
            events: Arc::default(),
            listings: MockListingRepo::default(),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Cascades user deletion into `listings`.
    pub fn with_listings(mut self, listings: &MockListingRepo) -> Self {
        self.listings = listings.clone();
        self
    }

    pub fn users_handle(&self) -> Arc<Mutex<Vec<User>>> {
        Arc::clone(&self.users)
    }

    /// Outbox events written together with a user.
    pub fn events_handle(&self) -> Arc<Mutex<Vec<OutboxEvent>>> {
        Arc::clone(&self.events)
    }
}

impl UserRepository for MockUserRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, BoardServiceError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, BoardServiceError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn username_taken(
        &self,
        username: &str,
        except: Option<Uuid>,
    ) -> Result<bool, BoardServiceError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .any(|u| u.username == username && Some(u.id) != except))
    }

    async fn create_with_event(
        &self,
        user: &User,
        event: &OutboxEvent,
    ) -> Result<(), BoardServiceError> {
        self.users.lock().unwrap().push(user.clone());
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), BoardServiceError> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(BoardServiceError::UserNotFound),
        }
    }

    async fn list_by_filter(
        &self,
        filter: ActivationFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<User>, BoardServiceError> {
        let mut found: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| filter.matches(u, now))
            .cloned()
            .collect();
        found.sort_by_key(|u| u.date_joined);
        Ok(found)
    }

    async fn delete_with_listings(&self, id: Uuid) -> Result<Vec<String>, BoardServiceError> {
        let owned: Vec<Uuid> = self
            .listings
            .listings
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.author_id == id)
            .map(|l| l.id)
            .collect();
        let mut paths = Vec::new();
        for listing_id in owned {
            paths.extend(self.listings.remove_listing(listing_id));
        }
        self.users.lock().unwrap().retain(|u| u.id != id);
        Ok(paths)
    }
}

// ── MockRubricRepo ───────────────────────────────────────────────────────────

pub struct MockRubricRepo {
    pub rubrics: Arc<Mutex<Vec<Rubric>>>,
}

impl MockRubricRepo {
    pub fn new(rubrics: Vec<Rubric>) -> Self {
        Self {
            rubrics: Arc::new(Mutex::new(rubrics)),
        }
    }

    pub fn rubrics_handle(&self) -> Arc<Mutex<Vec<Rubric>>> {
        Arc::clone(&self.rubrics)
    }
}

impl RubricRepository for MockRubricRepo {
    async fn list(&self) -> Result<Vec<Rubric>, BoardServiceError> {
        Ok(self.rubrics.lock().unwrap().clone())
    }

    async fn find(&self, id: i32) -> Result<Option<Rubric>, BoardServiceError> {
        Ok(self.rubrics.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Rubric>, BoardServiceError> {
        Ok(self
            .rubrics
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn create(
        &self,
        name: &str,
        order: i16,
        super_rubric_id: Option<i32>,
    ) -> Result<Rubric, BoardServiceError> {
        let mut rubrics = self.rubrics.lock().unwrap();
        let rubric = Rubric {
            id: rubrics.iter().map(|r| r.id).max().unwrap_or(0) + 1,
            name: name.to_owned(),
            order,
            super_rubric_id,
        };
        rubrics.push(rubric.clone());
        Ok(rubric)
    }
}

// ── MockCaptcha ──────────────────────────────────────────────────────────────

/// Every challenge asks the same question; answers are single-use.
pub struct MockCaptcha {
    pub answer: String,
    pub issued: Arc<Mutex<Vec<String>>>,
}

impl MockCaptcha {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_owned(),
            issued: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Pre-issue a challenge and return its key.
    pub fn challenge(&self) -> String {
        let key = Uuid::new_v4().to_string();
        self.issued.lock().unwrap().push(key.clone());
        key
    }

    pub fn issued_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.issued)
    }
}

impl CaptchaPort for MockCaptcha {
    async fn issue(&self) -> Result<CaptchaChallenge, BoardServiceError> {
        Ok(CaptchaChallenge {
            key: self.challenge(),
            question: "What is 2 + 2?".to_owned(),
        })
    }

    async fn verify(&self, key: &str, answer: &str) -> Result<bool, BoardServiceError> {
        let mut issued = self.issued.lock().unwrap();
        let Some(pos) = issued.iter().position(|k| k == key) else {
            return Ok(false);
        };
        issued.remove(pos);
        Ok(answer.trim() == self.answer)
    }
}

// ── MockImageStore ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockImageStore {
    pub files: Arc<Mutex<Vec<String>>>,
    /// Fail every save after this many successful ones.
    pub fail_after: Option<usize>,
}

impl MockImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(saves: usize) -> Self {
        Self {
            fail_after: Some(saves),
            ..Self::default()
        }
    }

    pub fn files_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.files)
    }
}

impl ImageStore for MockImageStore {
    async fn save(&self, original_name: &str, _data: &[u8]) -> Result<String, BoardServiceError> {
        let mut files = self.files.lock().unwrap();
        if self.fail_after.is_some_and(|n| files.len() >= n) {
            return Err(anyhow::anyhow!("disk full").into());
        }
        let path = format!("{}-{original_name}", files.len());
        files.push(path.clone());
        Ok(path)
    }

    async fn remove(&self, path: &str) -> Result<(), BoardServiceError> {
        self.files.lock().unwrap().retain(|f| f != path);
        Ok(())
    }
}

// ── MockNotifier ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockNotifier {
    pub sent: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every letter fails to render.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Usernames that were sent an activation letter, in order.
    pub fn sent_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.sent)
    }
}

impl ActivationNotifier for MockNotifier {
    fn activation_event(&self, user: &User) -> Result<OutboxEvent, BoardServiceError> {
        if self.fail {
            return Err(anyhow::anyhow!("activation template missing").into());
        }
        self.sent.lock().unwrap().push(user.username.clone());
        Ok(OutboxEvent {
            id: Uuid::now_v7(),
            kind: "activation_letter".to_owned(),
            payload: serde_json::json!({ "to": user.email }),
            idempotency_key: format!("activation_letter:{}", user.id),
        })
    }

    async fn send_activation(&self, user: &User) -> Result<(), BoardServiceError> {
        self.activation_event(user).map(|_| ())
    }
}
