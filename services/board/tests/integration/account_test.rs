use bboard::error::BoardServiceError;
use bboard::usecase::account::{
    BAD_CREDENTIALS, ChangePasswordInput, ChangePasswordUseCase, ChangeUserInfoInput,
    ChangeUserInfoUseCase, DeleteUserUseCase, INACTIVE_ACCOUNT, LoginInput, LoginUseCase,
    RegisterUserInput, RegisterUserUseCase, USERNAME_TAKEN, verify_password,
};
use bboard::domain::repository::ImageStore;
use chrono::Utc;

use crate::helpers::{
    MockImageStore, MockListingRepo, MockNotifier, MockUserRepo, test_listing, test_user,
};

fn registration(username: &str, password: &str, confirm: &str) -> RegisterUserInput {
    RegisterUserInput {
        username: username.to_owned(),
        email: format!("{username}@example.com"),
        password: password.to_owned(),
        password_confirm: confirm.to_owned(),
        first_name: "Ivan".to_owned(),
        last_name: String::new(),
        send_messages: true,
    }
}

// ── RegisterUserUseCase ──────────────────────────────────────────────────────

#[tokio::test]
async fn should_reject_mismatched_passwords_without_creating_user() {
    let users = MockUserRepo::empty();
    let users_handle = users.users_handle();
    let notifier = MockNotifier::new();
    let sent = notifier.sent_handle();
    let usecase = RegisterUserUseCase { users, notifier };

    let result = usecase
        .execute(registration("ivan", "long-enough-pass", "long-enough-pasS"))
        .await;

    let errors = result.unwrap_err().into_form_errors().unwrap();
    assert_eq!(errors.field("password"), ["The two password fields didn't match."]);
    assert!(users_handle.lock().unwrap().is_empty());
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_register_unactivated_user_and_send_activation() {
    let users = MockUserRepo::empty();
    let users_handle = users.users_handle();
    let notifier = MockNotifier::new();
    let sent = notifier.sent_handle();
    let usecase = RegisterUserUseCase { users, notifier };

    let user = usecase
        .execute(registration("ivan", "long-enough-pass", "long-enough-pass"))
        .await
        .unwrap();

    assert!(!user.is_active);
    assert!(!user.is_activated);
    assert!(verify_password("long-enough-pass", &user.password_hash));
    assert_eq!(users_handle.lock().unwrap().len(), 1);
    assert_eq!(*sent.lock().unwrap(), ["ivan"]);
}

#[tokio::test]
async fn should_store_activation_letter_with_new_user() {
    let users = MockUserRepo::empty();
    let events = users.events_handle();
    let usecase = RegisterUserUseCase {
        users,
        notifier: MockNotifier::new(),
    };

    let user = usecase
        .execute(registration("ivan", "long-enough-pass", "long-enough-pass"))
        .await
        .unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, "activation_letter");
    assert!(events[0].idempotency_key.contains(&user.id.to_string()));
}

#[tokio::test]
async fn should_leave_no_user_behind_when_letter_fails() {
    let users = MockUserRepo::empty();
    let users_handle = users.users_handle();
    let events = users.events_handle();
    let mut usecase = RegisterUserUseCase {
        users,
        notifier: MockNotifier::failing(),
    };

    let err = usecase
        .execute(registration("ivan", "long-enough-pass", "long-enough-pass"))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardServiceError::Internal(_)));
    assert!(users_handle.lock().unwrap().is_empty());
    assert!(events.lock().unwrap().is_empty());

    // The same username is still free on retry.
    usecase.notifier = MockNotifier::new();
    let user = usecase
        .execute(registration("ivan", "long-enough-pass", "long-enough-pass"))
        .await
        .unwrap();
    assert_eq!(user.username, "ivan");
    assert_eq!(users_handle.lock().unwrap().len(), 1);
    assert_eq!(events.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_reject_taken_username_and_weak_password_together() {
    let usecase = RegisterUserUseCase {
        users: MockUserRepo::new(vec![test_user("ivan", true)]),
        notifier: MockNotifier::new(),
    };

    let errors = usecase
        .execute(registration("ivan", "12345678", "12345678"))
        .await
        .unwrap_err()
        .into_form_errors()
        .unwrap();

    assert_eq!(errors.field("username"), [USERNAME_TAKEN]);
    assert!(errors.has("password"));
}

// ── LoginUseCase ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_login_active_user_and_stamp_last_login() {
    let user = test_user("maria", true);
    let users = MockUserRepo::new(vec![user.clone()]);
    let handle = users.users_handle();
    let usecase = LoginUseCase { users };

    let logged_in = usecase
        .execute(LoginInput {
            username: "maria".to_owned(),
            password: "correct-horse-battery".to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(logged_in.id, user.id);
    assert!(handle.lock().unwrap()[0].last_login.is_some());
}

#[tokio::test]
async fn should_refuse_wrong_password() {
    let usecase = LoginUseCase {
        users: MockUserRepo::new(vec![test_user("maria", true)]),
    };

    let errors = usecase
        .execute(LoginInput {
            username: "maria".to_owned(),
            password: "wrong-password".to_owned(),
        })
        .await
        .unwrap_err()
        .into_form_errors()
        .unwrap();

    assert_eq!(errors.non_field(), [BAD_CREDENTIALS]);
}

#[tokio::test]
async fn should_refuse_login_until_activated() {
    let usecase = LoginUseCase {
        users: MockUserRepo::new(vec![test_user("maria", false)]),
    };

    let errors = usecase
        .execute(LoginInput {
            username: "maria".to_owned(),
            password: "correct-horse-battery".to_owned(),
        })
        .await
        .unwrap_err()
        .into_form_errors()
        .unwrap();

    assert_eq!(errors.non_field(), [INACTIVE_ACCOUNT]);
}

// ── Profile changes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn should_change_user_info_keeping_own_username() {
    let user = test_user("maria", true);
    let users = MockUserRepo::new(vec![user.clone(), test_user("petr", true)]);
    let usecase = ChangeUserInfoUseCase { users };

    let taken = usecase
        .execute(
            user.id,
            ChangeUserInfoInput {
                username: "petr".to_owned(),
                email: "maria@example.com".to_owned(),
                ..ChangeUserInfoInput::default()
            },
        )
        .await
        .unwrap_err()
        .into_form_errors()
        .unwrap();
    assert_eq!(taken.field("username"), [USERNAME_TAKEN]);

    let changed = usecase
        .execute(
            user.id,
            ChangeUserInfoInput {
                username: "maria".to_owned(),
                email: "new@example.com".to_owned(),
                first_name: "Maria".to_owned(),
                last_name: "Ivanova".to_owned(),
                send_messages: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(changed.email, "new@example.com");
    assert!(!changed.send_messages);
}

#[tokio::test]
async fn should_require_old_password_to_change_password() {
    let user = test_user("maria", true);
    let users = MockUserRepo::new(vec![user.clone()]);
    let handle = users.users_handle();
    let usecase = ChangePasswordUseCase { users };

    let errors = usecase
        .execute(
            user.id,
            ChangePasswordInput {
                old_password: "not-my-password".to_owned(),
                new_password: "brand-new-secret".to_owned(),
                new_password_confirm: "brand-new-secret".to_owned(),
            },
        )
        .await
        .unwrap_err()
        .into_form_errors()
        .unwrap();
    assert!(errors.has("old_password"));

    usecase
        .execute(
            user.id,
            ChangePasswordInput {
                old_password: "correct-horse-battery".to_owned(),
                new_password: "brand-new-secret".to_owned(),
                new_password_confirm: "brand-new-secret".to_owned(),
            },
        )
        .await
        .unwrap();
    let stored = handle.lock().unwrap()[0].password_hash.clone();
    assert!(verify_password("brand-new-secret", &stored));
}

// ── DeleteUserUseCase ────────────────────────────────────────────────────────

#[tokio::test]
async fn should_delete_user_with_listings_and_their_files() {
    let user = test_user("maria", true);
    let other = test_user("petr", true);
    let store = MockImageStore::new();
    let main_image = store.save("bike.png", b"").await.unwrap();

    let mut own = test_listing(2, user.id, "Bike", Utc::now());
    own.image = Some(main_image);
    let foreign = test_listing(2, other.id, "Car", Utc::now());
    let listings = MockListingRepo::new(vec![own, foreign.clone()]);
    let listings_handle = listings.listings_handle();
    let users = MockUserRepo::new(vec![user.clone(), other]).with_listings(&listings);
    let users_handle = users.users_handle();
    let files = store.files_handle();

    let usecase = DeleteUserUseCase {
        users,
        images: store,
    };
    usecase.execute(user.id).await.unwrap();

    assert_eq!(users_handle.lock().unwrap().len(), 1);
    let remaining = listings_handle.lock().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, foreign.id);
    assert!(files.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_report_missing_user_on_delete() {
    let usecase = DeleteUserUseCase {
        users: MockUserRepo::empty(),
        images: MockImageStore::new(),
    };
    let result = usecase.execute(uuid::Uuid::now_v7()).await;
    assert!(matches!(result, Err(BoardServiceError::UserNotFound)));
}
