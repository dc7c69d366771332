use bboard::error::BoardServiceError;
use bboard::usecase::comment::{
    AddCommentUseCase, CommentAuthor, CommentInput, FOREIGN_LISTING, WRONG_CAPTCHA,
};
use chrono::Utc;
use uuid::Uuid;

use crate::helpers::{MockCaptcha, MockCommentRepo, MockListingRepo, test_listing};

fn setup() -> (AddCommentUseCase<MockListingRepo, MockCommentRepo, MockCaptcha>, Uuid) {
    let listing = test_listing(3, Uuid::now_v7(), "Bike", Utc::now());
    let id = listing.id;
    let listings = MockListingRepo::new(vec![listing]);
    let usecase = AddCommentUseCase {
        comments: MockCommentRepo::over(&listings),
        listings,
        captcha: MockCaptcha::new("4"),
    };
    (usecase, id)
}

#[tokio::test]
async fn should_reject_wrong_captcha_and_spend_the_challenge() {
    let (usecase, listing_id) = setup();
    let comments = usecase.comments.comments.clone();
    let key = usecase.captcha.challenge();

    let input = CommentInput {
        listing: listing_id.to_string(),
        author: "Guest".to_owned(),
        content: "Is it still available?".to_owned(),
        captcha_key: key.clone(),
        captcha_answer: "5".to_owned(),
    };
    let errors = usecase
        .execute(listing_id, CommentAuthor::Guest, input.clone())
        .await
        .unwrap_err()
        .into_form_errors()
        .unwrap();

    assert_eq!(errors.field("captcha"), [WRONG_CAPTCHA]);
    assert!(!errors.has("author"));
    assert!(comments.lock().unwrap().is_empty());
    assert!(usecase.captcha.issued_handle().lock().unwrap().is_empty());

    // Replaying the right answer on the spent key does not help.
    let replay = usecase
        .execute(
            listing_id,
            CommentAuthor::Guest,
            CommentInput {
                captcha_answer: "4".to_owned(),
                ..input
            },
        )
        .await
        .unwrap_err()
        .into_form_errors()
        .unwrap();
    assert_eq!(replay.field("captcha"), [WRONG_CAPTCHA]);
}

#[tokio::test]
async fn should_check_captcha_even_when_content_is_missing() {
    let (usecase, listing_id) = setup();
    let key = usecase.captcha.challenge();

    let errors = usecase
        .execute(
            listing_id,
            CommentAuthor::Guest,
            CommentInput {
                listing: listing_id.to_string(),
                author: String::new(),
                content: String::new(),
                captcha_key: key,
                captcha_answer: "4".to_owned(),
            },
        )
        .await
        .unwrap_err()
        .into_form_errors()
        .unwrap();

    assert!(errors.has("author"));
    assert!(errors.has("content"));
    assert!(!errors.has("captcha"));
    assert!(usecase.captcha.issued_handle().lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_accept_guest_comment_with_correct_answer() {
    let (usecase, listing_id) = setup();
    let key = usecase.captcha.challenge();

    let comment = usecase
        .execute(
            listing_id,
            CommentAuthor::Guest,
            CommentInput {
                listing: listing_id.to_string(),
                author: " Anna ".to_owned(),
                content: "How old is it?".to_owned(),
                captcha_key: key,
                captcha_answer: " 4 ".to_owned(),
            },
        )
        .await
        .unwrap();

    assert_eq!(comment.author, "Anna");
    assert!(comment.is_active);
    assert_eq!(usecase.comments.comments.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_use_username_for_logged_in_author() {
    let (usecase, listing_id) = setup();

    let comment = usecase
        .execute(
            listing_id,
            CommentAuthor::User("maria".to_owned()),
            CommentInput {
                listing: listing_id.to_string(),
                author: "somebody else".to_owned(),
                content: "Can I see it tomorrow?".to_owned(),
                ..CommentInput::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(comment.author, "maria");
    assert_eq!(comment.listing_id, listing_id);
}

#[tokio::test]
async fn should_reject_username_longer_than_author_column() {
    let (usecase, listing_id) = setup();
    let comments = usecase.comments.comments.clone();

    let errors = usecase
        .execute(
            listing_id,
            CommentAuthor::User("u".repeat(40)),
            CommentInput {
                listing: listing_id.to_string(),
                content: "Still for sale?".to_owned(),
                ..CommentInput::default()
            },
        )
        .await
        .unwrap_err()
        .into_form_errors()
        .unwrap();

    assert_eq!(
        errors.field("author"),
        ["Ensure this value has at most 30 characters (it has 40)."]
    );
    assert!(comments.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_reject_form_posted_for_another_listing() {
    let (usecase, listing_id) = setup();

    let errors = usecase
        .execute(
            listing_id,
            CommentAuthor::User("maria".to_owned()),
            CommentInput {
                listing: Uuid::now_v7().to_string(),
                content: "Hello".to_owned(),
                ..CommentInput::default()
            },
        )
        .await
        .unwrap_err()
        .into_form_errors()
        .unwrap();

    assert_eq!(errors.non_field(), [FOREIGN_LISTING]);
    assert!(usecase.comments.comments.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_report_missing_listing() {
    let (usecase, _) = setup();
    let result = usecase
        .execute(
            Uuid::now_v7(),
            CommentAuthor::User("maria".to_owned()),
            CommentInput::default(),
        )
        .await;
    assert!(matches!(result, Err(BoardServiceError::ListingNotFound)));
}
