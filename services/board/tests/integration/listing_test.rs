use bboard::error::BoardServiceError;
use bboard::usecase::listing::{
    BrowseRubricInput, BrowseRubricUseCase, CreateListingUseCase, DeleteListingUseCase,
    DetailScope, HomeUseCase, ListingDetailUseCase, ListingInput, UpdateListingUseCase, Upload,
};
use bboard::usecase::rubric::INVALID_CHOICE;
use bboard::domain::types::{AdditionalImage, Comment, Listing};
use bboard_domain::pagination::Paginator;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::helpers::{
    MockCommentRepo, MockImageStore, MockListingRepo, MockRubricRepo, png_upload, test_listing,
    test_rubrics,
};

fn listing_input(rubric: &str) -> ListingInput {
    ListingInput {
        rubric: rubric.to_owned(),
        title: "Mountain bike".to_owned(),
        content: "Barely used".to_owned(),
        price: "1500,50".to_owned(),
        contacts: "+7 900 000 00 00".to_owned(),
        is_active: true,
        ..ListingInput::default()
    }
}

/// `count` active listings in "Bikes", newest first by title index.
fn bikes(count: usize, author_id: Uuid) -> Vec<Listing> {
    let now = Utc::now();
    (0..count)
        .map(|i| test_listing(3, author_id, &format!("Bike {i}"), now - Duration::minutes(i as i64)))
        .collect()
}

fn browse(listings: &MockListingRepo) -> BrowseRubricUseCase<MockRubricRepo, MockListingRepo> {
    BrowseRubricUseCase {
        rubrics: MockRubricRepo::new(test_rubrics()),
        listings: listings.clone(),
        paginator: Paginator::new(2),
    }
}

fn page_query(page: Option<&str>, keyword: Option<&str>) -> BrowseRubricInput {
    BrowseRubricInput {
        rubric_id: 3,
        keyword: keyword.map(str::to_owned),
        page: page.map(str::to_owned),
    }
}

// ── CreateListingUseCase ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_listing_with_linked_additional_images() {
    let listings = MockListingRepo::default();
    let images = listings.images_handle();
    let store = MockImageStore::new();
    let files = store.files_handle();
    let usecase = CreateListingUseCase {
        rubrics: MockRubricRepo::new(test_rubrics()),
        listings: listings.clone(),
        images: store,
    };
    let author = Uuid::now_v7();

    let listing = usecase
        .execute(
            author,
            ListingInput {
                image: Some(png_upload("main.png")),
                additional_images: vec![png_upload("side.png"), png_upload("back.png")],
                ..listing_input("3")
            },
        )
        .await
        .unwrap();

    assert_eq!(listing.author_id, author);
    assert_eq!(listing.rubric_id, 3);
    assert_eq!(listing.price, 1500.5);
    assert_eq!(listing.image.as_deref(), Some("0-main.png"));
    let linked: Vec<String> = images
        .lock()
        .unwrap()
        .iter()
        .filter(|i| i.listing_id == listing.id)
        .map(|i| i.image.clone())
        .collect();
    assert_eq!(linked, ["1-side.png", "2-back.png"]);
    assert_eq!(files.lock().unwrap().len(), 3);
    assert_eq!(listings.listings_handle().lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_store_nothing_when_an_upload_is_not_an_image() {
    let listings = MockListingRepo::default();
    let store = MockImageStore::new();
    let files = store.files_handle();
    let usecase = CreateListingUseCase {
        rubrics: MockRubricRepo::new(test_rubrics()),
        listings: listings.clone(),
        images: store,
    };

    let errors = usecase
        .execute(
            Uuid::now_v7(),
            ListingInput {
                image: Some(png_upload("main.png")),
                additional_images: vec![Upload {
                    file_name: "notes.png".to_owned(),
                    data: b"plain text".to_vec(),
                }],
                ..listing_input("3")
            },
        )
        .await
        .unwrap_err()
        .into_form_errors()
        .unwrap();

    assert!(errors.has("additional_image"));
    assert!(!errors.has("image"));
    assert!(files.lock().unwrap().is_empty());
    assert!(listings.listings_handle().lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_remove_stored_files_when_storage_fails_midway() {
    let listings = MockListingRepo::default();
    let store = MockImageStore::failing_after(1);
    let files = store.files_handle();
    let usecase = CreateListingUseCase {
        rubrics: MockRubricRepo::new(test_rubrics()),
        listings: listings.clone(),
        images: store,
    };

    let result = usecase
        .execute(
            Uuid::now_v7(),
            ListingInput {
                image: Some(png_upload("main.png")),
                additional_images: vec![png_upload("side.png")],
                ..listing_input("3")
            },
        )
        .await;

    assert!(matches!(result, Err(BoardServiceError::Internal(_))));
    assert!(files.lock().unwrap().is_empty());
    assert!(listings.listings_handle().lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_reject_super_rubric_and_bad_price() {
    let usecase = CreateListingUseCase {
        rubrics: MockRubricRepo::new(test_rubrics()),
        listings: MockListingRepo::default(),
        images: MockImageStore::new(),
    };

    let errors = usecase
        .execute(
            Uuid::now_v7(),
            ListingInput {
                price: "cheap".to_owned(),
                ..listing_input("1")
            },
        )
        .await
        .unwrap_err()
        .into_form_errors()
        .unwrap();

    assert_eq!(errors.field("rubric"), [INVALID_CHOICE]);
    assert!(errors.has("price"));
    assert!(!errors.has("title"));
}

// ── UpdateListingUseCase ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_attach_new_images_and_drop_marked_ones_on_edit() {
    let author = Uuid::now_v7();
    let mut listing = test_listing(3, author, "Old bike", Utc::now());
    listing.image = Some("old-main.png".to_owned());
    let keep = AdditionalImage {
        id: Uuid::now_v7(),
        listing_id: listing.id,
        image: "keep.png".to_owned(),
    };
    let dropped = AdditionalImage {
        id: Uuid::now_v7(),
        listing_id: listing.id,
        image: "drop.png".to_owned(),
    };
    let listings = MockListingRepo::new(vec![listing.clone()]);
    listings
        .images_handle()
        .lock()
        .unwrap()
        .extend([keep.clone(), dropped.clone()]);
    let store = MockImageStore::new();
    let files = store.files_handle();
    files
        .lock()
        .unwrap()
        .extend(["old-main.png".to_owned(), "keep.png".to_owned(), "drop.png".to_owned()]);
    let usecase = UpdateListingUseCase {
        rubrics: MockRubricRepo::new(test_rubrics()),
        listings: listings.clone(),
        images: store,
    };

    let updated = usecase
        .execute(
            author,
            listing.id,
            ListingInput {
                title: "New bike".to_owned(),
                additional_images: vec![png_upload("fresh.png")],
                delete_images: vec![dropped.id],
                image_clear: true,
                ..listing_input("2")
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "New bike");
    assert_eq!(updated.rubric_id, 2);
    assert_eq!(updated.image, None);
    assert_eq!(updated.created_at, listing.created_at);

    let attached: Vec<String> = listings
        .images_handle()
        .lock()
        .unwrap()
        .iter()
        .map(|i| i.image.clone())
        .collect();
    assert_eq!(attached, ["keep.png", "3-fresh.png"]);
    assert_eq!(*files.lock().unwrap(), ["keep.png", "3-fresh.png"]);
}

#[tokio::test]
async fn should_forbid_editing_someone_elses_listing() {
    let listing = test_listing(3, Uuid::now_v7(), "Bike", Utc::now());
    let listings = MockListingRepo::new(vec![listing.clone()]);
    let store = MockImageStore::new();
    let files = store.files_handle();
    let usecase = UpdateListingUseCase {
        rubrics: MockRubricRepo::new(test_rubrics()),
        listings: listings.clone(),
        images: store,
    };

    let result = usecase
        .execute(
            Uuid::now_v7(),
            listing.id,
            ListingInput {
                image: Some(png_upload("main.png")),
                ..listing_input("3")
            },
        )
        .await;

    assert!(matches!(result, Err(BoardServiceError::Forbidden)));
    assert!(files.lock().unwrap().is_empty());
    assert_eq!(listings.listings_handle().lock().unwrap()[0].title, "Bike");
}

// ── DeleteListingUseCase ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_delete_listing_with_images_comments_and_files() {
    let author = Uuid::now_v7();
    let mut listing = test_listing(3, author, "Bike", Utc::now());
    listing.image = Some("main.png".to_owned());
    let other = test_listing(3, author, "Other", Utc::now());
    let listings = MockListingRepo::new(vec![listing.clone(), other.clone()]);
    listings.images_handle().lock().unwrap().push(AdditionalImage {
        id: Uuid::now_v7(),
        listing_id: listing.id,
        image: "side.png".to_owned(),
    });
    listings.comments_handle().lock().unwrap().push(Comment {
        id: Uuid::now_v7(),
        listing_id: listing.id,
        author: "guest".to_owned(),
        content: "Still available?".to_owned(),
        is_active: true,
        created_at: Utc::now(),
    });
    let store = MockImageStore::new();
    let files = store.files_handle();
    files
        .lock()
        .unwrap()
        .extend(["main.png".to_owned(), "side.png".to_owned(), "unrelated.png".to_owned()]);
    let usecase = DeleteListingUseCase {
        listings: listings.clone(),
        images: store,
    };

    let forbidden = usecase.execute(Uuid::now_v7(), listing.id).await;
    assert!(matches!(forbidden, Err(BoardServiceError::Forbidden)));

    usecase.execute(author, listing.id).await.unwrap();

    let remaining = listings.listings_handle();
    let remaining = remaining.lock().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, other.id);
    assert!(listings.images_handle().lock().unwrap().is_empty());
    assert!(listings.comments_handle().lock().unwrap().is_empty());
    assert_eq!(*files.lock().unwrap(), ["unrelated.png"]);
}

// ── Browsing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_show_latest_active_listings_on_home() {
    let author = Uuid::now_v7();
    let mut all = bikes(12, author);
    all[0].is_active = false;
    let usecase = HomeUseCase {
        listings: MockListingRepo::new(all),
    };

    let home = usecase.execute().await.unwrap();

    assert_eq!(home.len(), 10);
    assert_eq!(home[0].title, "Bike 1");
    assert!(home.iter().all(|l| l.is_active));
}

#[tokio::test]
async fn should_paginate_rubric_with_remainder_on_last_page() {
    let listings = MockListingRepo::new(bikes(5, Uuid::now_v7()));
    let usecase = browse(&listings);

    let first = usecase.execute(page_query(None, None)).await.unwrap();
    assert_eq!(first.page.num_pages, 3);
    assert_eq!(first.page.number, 1);
    assert_eq!(first.listings.len(), 2);
    assert_eq!(first.listings[0].title, "Bike 0");
    assert_eq!(first.rubric.name, "Bikes");
    assert_eq!(first.rubric.super_rubric.name, "Vehicles");

    let last = usecase.execute(page_query(Some("3"), None)).await.unwrap();
    assert_eq!(last.listings.len(), 1);
    assert_eq!(last.listings[0].title, "Bike 4");
}

#[tokio::test]
async fn should_fall_back_on_bad_page_numbers() {
    let listings = MockListingRepo::new(bikes(5, Uuid::now_v7()));
    let usecase = browse(&listings);

    let garbage = usecase.execute(page_query(Some("abc"), None)).await.unwrap();
    assert_eq!(garbage.page.number, 1);

    let past_end = usecase.execute(page_query(Some("99"), None)).await.unwrap();
    assert_eq!(past_end.page.number, 3);
    assert_eq!(past_end.listings.len(), 1);
}

#[tokio::test]
async fn should_search_case_insensitively_and_hide_inactive() {
    let author = Uuid::now_v7();
    let now = Utc::now();
    let mut hidden = test_listing(3, author, "Red bike", now);
    hidden.is_active = false;
    let mut by_content = test_listing(3, author, "Road bike", now - Duration::minutes(1));
    by_content.content = "Colour: RED".to_owned();
    let listings = MockListingRepo::new(vec![
        hidden,
        by_content,
        test_listing(3, author, "RED scooter", now - Duration::minutes(2)),
        test_listing(3, author, "Blue bike", now - Duration::minutes(3)),
        test_listing(2, author, "Red car", now),
    ]);
    let usecase = BrowseRubricUseCase {
        paginator: Paginator::new(10),
        ..browse(&listings)
    };

    let found = usecase.execute(page_query(None, Some("red"))).await.unwrap();

    let titles: Vec<&str> = found.listings.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, ["Road bike", "RED scooter"]);
    assert_eq!(found.keyword, "red");
}

#[tokio::test]
async fn should_show_one_empty_page_for_empty_rubric() {
    let usecase = browse(&MockListingRepo::default());

    let page = usecase.execute(page_query(Some("7"), None)).await.unwrap();

    assert_eq!(page.page.number, 1);
    assert_eq!(page.page.num_pages, 1);
    assert!(page.listings.is_empty());
}

#[tokio::test]
async fn should_not_browse_super_or_unknown_rubrics() {
    let usecase = browse(&MockListingRepo::default());
    for rubric_id in [1, 42] {
        let result = usecase
            .execute(BrowseRubricInput {
                rubric_id,
                ..BrowseRubricInput::default()
            })
            .await;
        assert!(matches!(result, Err(BoardServiceError::RubricNotFound)));
    }
}

// ── ListingDetailUseCase ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_show_detail_only_within_its_rubric() {
    let author = Uuid::now_v7();
    let mut listing = test_listing(3, author, "Bike", Utc::now());
    listing.is_active = false;
    let listings = MockListingRepo::new(vec![listing.clone()]);
    listings.comments_handle().lock().unwrap().extend([
        Comment {
            id: Uuid::now_v7(),
            listing_id: listing.id,
            author: "ann".to_owned(),
            content: "Nice".to_owned(),
            is_active: true,
            created_at: Utc::now(),
        },
        Comment {
            id: Uuid::now_v7(),
            listing_id: listing.id,
            author: "spam".to_owned(),
            content: "Buy now".to_owned(),
            is_active: false,
            created_at: Utc::now(),
        },
    ]);
    let usecase = ListingDetailUseCase {
        rubrics: MockRubricRepo::new(test_rubrics()),
        listings: listings.clone(),
        comments: MockCommentRepo::over(&listings),
    };

    let detail = usecase
        .execute(listing.id, DetailScope::Public { rubric_id: 3 })
        .await
        .unwrap();
    assert_eq!(detail.listing.id, listing.id);
    assert_eq!(detail.rubric.map(|r| r.name).as_deref(), Some("Bikes"));
    assert_eq!(detail.comments.len(), 1);
    assert_eq!(detail.comments[0].author, "ann");

    let wrong_rubric = usecase
        .execute(listing.id, DetailScope::Public { rubric_id: 2 })
        .await;
    assert!(matches!(wrong_rubric, Err(BoardServiceError::ListingNotFound)));

    let stranger = usecase
        .execute(
            listing.id,
            DetailScope::Owner {
                user_id: Uuid::now_v7(),
            },
        )
        .await;
    assert!(matches!(stranger, Err(BoardServiceError::Forbidden)));

    let owner = usecase
        .execute(listing.id, DetailScope::Owner { user_id: author })
        .await;
    assert!(owner.is_ok());
}
