use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, Condition,
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Select, Statement,
    TransactionTrait,
};
use uuid::Uuid;

use bboard_core::sea_ext::icontains;
use bboard_schema::{additional_images, comments, listings, outbox_events, rubrics, users};

use crate::domain::repository::{
    CommentRepository, ListingRepository, RubricQuery, RubricRepository, UserRepository,
};
use crate::domain::types::{
    ActivationFilter, AdditionalImage, Comment, Listing, OutboxEvent, Rubric, User,
};
use crate::error::BoardServiceError;

// ── User repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

impl UserRepository for DbUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, BoardServiceError> {
        let model = users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find user by id")?;
        Ok(model.map(user_from_model))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, BoardServiceError> {
        let model = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.db)
            .await
            .context("find user by username")?;
        Ok(model.map(user_from_model))
    }

    async fn username_taken(
        &self,
        username: &str,
        except: Option<Uuid>,
    ) -> Result<bool, BoardServiceError> {
        let mut select = users::Entity::find().filter(users::Column::Username.eq(username));
        if let Some(id) = except {
            select = select.filter(users::Column::Id.ne(id));
        }
        let count = select
            .count(&self.db)
            .await
            .context("check username uniqueness")?;
        Ok(count > 0)
    }

    async fn create_with_event(
        &self,
        user: &User,
        event: &OutboxEvent,
    ) -> Result<(), BoardServiceError> {
        let user = user.clone();
        let event = event.clone();
        self.db
            .transaction::<_, (), DbErr>(|txn| {
                Box::pin(async move {
                    user_active_model(&user).insert(txn).await?;
                    insert_outbox_event(txn, &event).await
                })
            })
            .await
            .context("create user with outbox event")?;
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), BoardServiceError> {
        user_active_model(user)
            .update(&self.db)
            .await
            .context("update user")?;
        Ok(())
    }

    async fn list_by_filter(
        &self,
        filter: ActivationFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<User>, BoardServiceError> {
        let select = match filter.joined_before(now) {
            None => users::Entity::find()
                .filter(users::Column::IsActive.eq(true))
                .filter(users::Column::IsActivated.eq(true)),
            Some(cutoff) => users::Entity::find()
                .filter(users::Column::IsActive.eq(false))
                .filter(users::Column::IsActivated.eq(false))
                .filter(users::Column::DateJoined.lt(cutoff)),
        };
        let models = select
            .order_by_asc(users::Column::DateJoined)
            .all(&self.db)
            .await
            .context("list users by activation filter")?;
        Ok(models.into_iter().map(user_from_model).collect())
    }

    async fn delete_with_listings(&self, id: Uuid) -> Result<Vec<String>, BoardServiceError> {
        let paths = self
            .db
            .transaction::<_, Vec<String>, DbErr>(|txn| {
                Box::pin(async move {
                    let owned = listings::Entity::find()
                        .filter(listings::Column::AuthorId.eq(id))
                        .all(txn)
                        .await?;
                    let mut paths = Vec::new();
                    for listing in owned {
                        paths.extend(delete_listing_rows(txn, listing).await?);
                    }
                    users::Entity::delete_by_id(id).exec(txn).await?;
                    Ok(paths)
                })
            })
            .await
            .context("delete user with listings")?;
        Ok(paths)
    }
}

fn user_active_model(user: &User) -> users::ActiveModel {
    users::ActiveModel {
        id: Set(user.id),
        username: Set(user.username.clone()),
        email: Set(user.email.clone()),
        password_hash: Set(user.password_hash.clone()),
        first_name: Set(user.first_name.clone()),
        last_name: Set(user.last_name.clone()),
        is_active: Set(user.is_active),
        is_activated: Set(user.is_activated),
        send_messages: Set(user.send_messages),
        date_joined: Set(user.date_joined),
        last_login: Set(user.last_login),
    }
}

fn user_from_model(model: users::Model) -> User {
    User {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        first_name: model.first_name,
        last_name: model.last_name,
        is_active: model.is_active,
        is_activated: model.is_activated,
        send_messages: model.send_messages,
        date_joined: model.date_joined,
        last_login: model.last_login,
    }
}

// ── Rubric repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRubricRepository {
    pub db: DatabaseConnection,
}

impl RubricRepository for DbRubricRepository {
    async fn list(&self) -> Result<Vec<Rubric>, BoardServiceError> {
        let models = rubrics::Entity::find()
            .order_by_asc(rubrics::Column::SortOrder)
            .order_by_asc(rubrics::Column::Name)
            .all(&self.db)
            .await
            .context("list rubrics")?;
        Ok(models.into_iter().map(rubric_from_model).collect())
    }

    async fn find(&self, id: i32) -> Result<Option<Rubric>, BoardServiceError> {
        let model = rubrics::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find rubric")?;
        Ok(model.map(rubric_from_model))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Rubric>, BoardServiceError> {
        let model = rubrics::Entity::find()
            .filter(rubrics::Column::Name.eq(name))
            .one(&self.db)
            .await
            .context("find rubric by name")?;
        Ok(model.map(rubric_from_model))
    }

    async fn create(
        &self,
        name: &str,
        order: i16,
        super_rubric_id: Option<i32>,
    ) -> Result<Rubric, BoardServiceError> {
        let model = rubrics::ActiveModel {
            id: NotSet,
            name: Set(name.to_owned()),
            sort_order: Set(order),
            super_rubric_id: Set(super_rubric_id),
        }
        .insert(&self.db)
        .await
        .context("create rubric")?;
        Ok(rubric_from_model(model))
    }
}

fn rubric_from_model(model: rubrics::Model) -> Rubric {
    Rubric {
        id: model.id,
        name: model.name,
        order: model.sort_order,
        super_rubric_id: model.super_rubric_id,
    }
}

// ── Listing repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbListingRepository {
    pub db: DatabaseConnection,
}

fn rubric_select(query: &RubricQuery) -> Select<listings::Entity> {
    let mut select = listings::Entity::find()
        .filter(listings::Column::RubricId.eq(query.rubric_id))
        .filter(listings::Column::IsActive.eq(true));
    if let Some(keyword) = query.keyword.as_deref().filter(|k| !k.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(icontains(listings::Column::Title, keyword))
                .add(icontains(listings::Column::Content, keyword)),
        );
    }
    select
}

/// One page of [`rubric_select`], newest first.
fn rubric_page(query: &RubricQuery, offset: u64, limit: u64) -> Select<listings::Entity> {
    rubric_select(query)
        .order_by_desc(listings::Column::CreatedAt)
        .order_by_desc(listings::Column::Id)
        .offset(offset)
        .limit(limit)
}

impl ListingRepository for DbListingRepository {
    async fn find(&self, id: Uuid) -> Result<Option<Listing>, BoardServiceError> {
        let model = listings::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find listing")?;
        Ok(model.map(listing_from_model))
    }

    async fn latest_active(&self, limit: u64) -> Result<Vec<Listing>, BoardServiceError> {
        let models = listings::Entity::find()
            .filter(listings::Column::IsActive.eq(true))
            .order_by_desc(listings::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .context("list latest listings")?;
        Ok(models.into_iter().map(listing_from_model).collect())
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Listing>, BoardServiceError> {
        let models = listings::Entity::find()
            .filter(listings::Column::AuthorId.eq(author_id))
            .order_by_desc(listings::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list listings by author")?;
        Ok(models.into_iter().map(listing_from_model).collect())
    }

    async fn count_in_rubric(&self, query: &RubricQuery) -> Result<u64, BoardServiceError> {
        let count = rubric_select(query)
            .count(&self.db)
            .await
            .context("count rubric listings")?;
        Ok(count)
    }

    async fn page_in_rubric(
        &self,
        query: &RubricQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Listing>, BoardServiceError> {
        let models = rubric_page(query, offset, limit)
            .all(&self.db)
            .await
            .context("page rubric listings")?;
        Ok(models.into_iter().map(listing_from_model).collect())
    }

    async fn additional_images(
        &self,
        listing_id: Uuid,
    ) -> Result<Vec<AdditionalImage>, BoardServiceError> {
        let models = additional_images::Entity::find()
            .filter(additional_images::Column::ListingId.eq(listing_id))
            .order_by_asc(additional_images::Column::Id)
            .all(&self.db)
            .await
            .context("list additional images")?;
        Ok(models.into_iter().map(image_from_model).collect())
    }

    async fn create(
        &self,
        listing: &Listing,
        images: &[AdditionalImage],
    ) -> Result<(), BoardServiceError> {
        let listing = listing.clone();
        let images = images.to_vec();
        self.db
            .transaction::<_, (), DbErr>(|txn| {
                Box::pin(async move {
                    listing_active_model(&listing).insert(txn).await?;
                    for image in &images {
                        insert_image(txn, image).await?;
                    }
                    Ok(())
                })
            })
            .await
            .context("create listing with images")?;
        Ok(())
    }

    async fn update(
        &self,
        listing: &Listing,
        added: &[AdditionalImage],
        removed: &[Uuid],
    ) -> Result<Vec<String>, BoardServiceError> {
        let listing = listing.clone();
        let added = added.to_vec();
        let removed = removed.to_vec();
        let paths = self
            .db
            .transaction::<_, Vec<String>, DbErr>(|txn| {
                Box::pin(async move {
                    listing_active_model(&listing).update(txn).await?;
                    let mut paths = Vec::new();
                    if !removed.is_empty() {
                        let owned = Condition::all()
                            .add(additional_images::Column::ListingId.eq(listing.id))
                            .add(additional_images::Column::Id.is_in(removed));
                        paths = additional_images::Entity::find()
                            .filter(owned.clone())
                            .all(txn)
                            .await?
                            .into_iter()
                            .map(|m| m.image)
                            .collect();
                        additional_images::Entity::delete_many()
                            .filter(owned)
                            .exec(txn)
                            .await?;
                    }
                    for image in &added {
                        insert_image(txn, image).await?;
                    }
                    Ok(paths)
                })
            })
            .await
            .context("update listing with images")?;
        Ok(paths)
    }

    async fn delete(&self, id: Uuid) -> Result<Vec<String>, BoardServiceError> {
        let paths = self
            .db
            .transaction::<_, Vec<String>, DbErr>(|txn| {
                Box::pin(async move {
                    match listings::Entity::find_by_id(id).one(txn).await? {
                        Some(listing) => delete_listing_rows(txn, listing).await,
                        None => Ok(Vec::new()),
                    }
                })
            })
            .await
            .context("delete listing")?;
        Ok(paths)
    }
}

/// Remove a listing's additional images, comments and row, in that order.
/// Returns every image path the listing referenced.
async fn delete_listing_rows(
    txn: &DatabaseTransaction,
    listing: listings::Model,
) -> Result<Vec<String>, DbErr> {
    let images = additional_images::Entity::find()
        .filter(additional_images::Column::ListingId.eq(listing.id))
        .all(txn)
        .await?;
    let mut paths: Vec<String> = listing.image.into_iter().collect();
    paths.extend(images.into_iter().map(|m| m.image));

    for stmt in listing_delete_statements(txn.get_database_backend(), listing.id) {
        txn.execute(stmt).await?;
    }
    Ok(paths)
}

/// Deletes of a listing's additional images, its comments and its row, in execution order.
fn listing_delete_statements(backend: DbBackend, listing_id: Uuid) -> [Statement; 3] {
    [
        additional_images::Entity::delete_many()
            .filter(additional_images::Column::ListingId.eq(listing_id))
            .build(backend),
        comments::Entity::delete_many()
            .filter(comments::Column::ListingId.eq(listing_id))
            .build(backend),
        listings::Entity::delete_by_id(listing_id).build(backend),
    ]
}

async fn insert_image(txn: &DatabaseTransaction, image: &AdditionalImage) -> Result<(), DbErr> {
    additional_images::ActiveModel {
        id: Set(image.id),
        listing_id: Set(image.listing_id),
        image: Set(image.image.clone()),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn listing_active_model(listing: &Listing) -> listings::ActiveModel {
    listings::ActiveModel {
        id: Set(listing.id),
        rubric_id: Set(listing.rubric_id),
        author_id: Set(listing.author_id),
        title: Set(listing.title.clone()),
        content: Set(listing.content.clone()),
        price: Set(listing.price),
        contacts: Set(listing.contacts.clone()),
        image: Set(listing.image.clone()),
        is_active: Set(listing.is_active),
        created_at: Set(listing.created_at),
    }
}

fn listing_from_model(model: listings::Model) -> Listing {
    Listing {
        id: model.id,
        rubric_id: model.rubric_id,
        author_id: model.author_id,
        title: model.title,
        content: model.content,
        price: model.price,
        contacts: model.contacts,
        image: model.image,
        is_active: model.is_active,
        created_at: model.created_at,
    }
}

fn image_from_model(model: additional_images::Model) -> AdditionalImage {
    AdditionalImage {
        id: model.id,
        listing_id: model.listing_id,
        image: model.image,
    }
}

// ── Comment repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbCommentRepository {
    pub db: DatabaseConnection,
}

impl CommentRepository for DbCommentRepository {
    async fn list_active(&self, listing_id: Uuid) -> Result<Vec<Comment>, BoardServiceError> {
        let models = comments::Entity::find()
            .filter(comments::Column::ListingId.eq(listing_id))
            .filter(comments::Column::IsActive.eq(true))
            .order_by_asc(comments::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list comments")?;
        Ok(models
            .into_iter()
            .map(|m| Comment {
                id: m.id,
                listing_id: m.listing_id,
                author: m.author,
                content: m.content,
                is_active: m.is_active,
                created_at: m.created_at,
            })
            .collect())
    }

    async fn create(&self, comment: &Comment) -> Result<(), BoardServiceError> {
        comments::ActiveModel {
            id: Set(comment.id),
            listing_id: Set(comment.listing_id),
            author: Set(comment.author.clone()),
            content: Set(comment.content.clone()),
            is_active: Set(comment.is_active),
            created_at: Set(comment.created_at),
        }
        .insert(&self.db)
        .await
        .context("create comment")?;
        Ok(())
    }
}

// ── Outbox ───────────────────────────────────────────────────────────────────

pub(crate) async fn insert_outbox_event<C>(conn: &C, event: &OutboxEvent) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    outbox_events::ActiveModel {
        id: Set(event.id),
        kind: Set(event.kind.clone()),
        payload: Set(event.payload.clone()),
        idempotency_key: Set(event.idempotency_key.clone()),
        attempts: Set(0),
        last_error: Set(None),
        created_at: Set(now),
        next_attempt_at: Set(now),
        processed_at: Set(None),
        failed_at: Set(None),
    }
    .insert(conn)
    .await?;
    Ok(())
}
