use chrono::Utc;
use uuid::Uuid;

use bboard_domain::form::FormErrors;

use crate::domain::repository::{CaptchaPort, CommentRepository, ListingRepository};
use crate::domain::types::Comment;
use crate::domain::validate::{self, COMMENT_AUTHOR_MAX};
use crate::error::BoardServiceError;

pub const FOREIGN_LISTING: &str = "The comment form does not belong to this listing.";
pub const WRONG_CAPTCHA: &str = "Wrong answer. Try again.";

/// Who is posting the comment.
#[derive(Debug, Clone)]
pub enum CommentAuthor {
    /// Logged-in user; the author is fixed to their username and no captcha is asked.
    User(String),
    /// Anonymous visitor; must name themselves and solve the captcha.
    Guest,
}

/// Submitted comment form.
#[derive(Debug, Clone, Default)]
pub struct CommentInput {
    /// Hidden field naming the target listing.
    pub listing: String,
    pub author: String,
    pub content: String,
    pub captcha_key: String,
    pub captcha_answer: String,
}

pub struct AddCommentUseCase<L, C, P>
where
    L: ListingRepository,
    C: CommentRepository,
    P: CaptchaPort,
{
    pub listings: L,
    pub comments: C,
    pub captcha: P,
}

impl<L, C, P> AddCommentUseCase<L, C, P>
where
    L: ListingRepository,
    C: CommentRepository,
    P: CaptchaPort,
{
    /// Validate and store an active comment on `listing_id`.
    pub async fn execute(
        &self,
        listing_id: Uuid,
        author: CommentAuthor,
        input: CommentInput,
    ) -> Result<Comment, BoardServiceError> {
        if self.listings.find(listing_id).await?.is_none() {
            return Err(BoardServiceError::ListingNotFound);
        }

        let mut errors = FormErrors::new();
        if Uuid::parse_str(input.listing.trim()).ok() != Some(listing_id) {
            errors.add_non_field(FOREIGN_LISTING);
        }
        let author = match author {
            CommentAuthor::User(username) => {
                validate::max_len(&mut errors, "author", &username, COMMENT_AUTHOR_MAX);
                username
            }
            CommentAuthor::Guest => {
                let name = validate::required_text(
                    &mut errors,
                    "author",
                    &input.author,
                    Some(COMMENT_AUTHOR_MAX),
                )
                .to_owned();
                // Checked even when other fields fail, so every attempt spends the challenge.
                if input.captcha_answer.trim().is_empty() {
                    errors.add("captcha", validate::REQUIRED);
                } else if !self
                    .captcha
                    .verify(&input.captcha_key, &input.captcha_answer)
                    .await?
                {
                    errors.add("captcha", WRONG_CAPTCHA);
                }
                name
            }
        };
        let content = validate::required_text(&mut errors, "content", &input.content, None);
        errors.into_result()?;

        let comment = Comment {
            id: Uuid::now_v7(),
            listing_id,
            author,
            content: content.to_owned(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.comments.create(&comment).await?;
        tracing::info!(listing_id = %listing_id, comment_id = %comment.id, "comment added");
        Ok(comment)
    }
}
