use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Utc;
use uuid::Uuid;

use bboard_domain::form::FormErrors;

use crate::domain::repository::{ActivationNotifier, ImageStore, UserRepository};
use crate::domain::types::User;
use crate::domain::validate::{self, NAME_MAX};
use crate::error::BoardServiceError;

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
pub const INACTIVE_ACCOUNT: &str = "This account is inactive.";

/// Hash a password with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, BoardServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("hash password: {e}"))?;
    Ok(hash.to_string())
}

/// `false` for a wrong password or an unparsable stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn check_profile_fields(errors: &mut FormErrors, email: &str, first_name: &str, last_name: &str) {
    validate::email(errors, "email", email);
    validate::max_len(errors, "first_name", first_name, NAME_MAX);
    validate::max_len(errors, "last_name", last_name, NAME_MAX);
}

// ── Registration ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct RegisterUserInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    pub send_messages: bool,
}

pub struct RegisterUserUseCase<U, N>
where
    U: UserRepository,
    N: ActivationNotifier,
{
    pub users: U,
    pub notifier: N,
}

impl<U, N> RegisterUserUseCase<U, N>
where
    U: UserRepository,
    N: ActivationNotifier,
{
    /// Create an unactivated user with its activation letter queued alongside.
    pub async fn execute(&self, input: RegisterUserInput) -> Result<User, BoardServiceError> {
        let username = input.username.trim();
        let email = input.email.trim();

        let mut errors = FormErrors::new();
        validate::username(&mut errors, "username", username);
        if !errors.has("username") && self.users.username_taken(username, None).await? {
            errors.add("username", USERNAME_TAKEN);
        }
        check_profile_fields(&mut errors, email, &input.first_name, &input.last_name);
        validate::password(&mut errors, "password", &input.password, username);
        validate::password_confirmation(
            &mut errors,
            "password",
            &input.password,
            &input.password_confirm,
        );
        errors.into_result()?;

        let user = User {
            id: Uuid::now_v7(),
            username: username.to_owned(),
            email: email.to_owned(),
            password_hash: hash_password(&input.password)?,
            first_name: input.first_name.trim().to_owned(),
            last_name: input.last_name.trim().to_owned(),
            is_active: false,
            is_activated: false,
            send_messages: input.send_messages,
            date_joined: Utc::now(),
            last_login: None,
        };
        let event = self.notifier.activation_event(&user)?;
        self.users.create_with_event(&user, &event).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }
}

// ── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

pub struct LoginUseCase<U>
where
    U: UserRepository,
{
    pub users: U,
}

impl<U> LoginUseCase<U>
where
    U: UserRepository,
{
    /// Check credentials and stamp `last_login`. Inactive users are refused.
    pub async fn execute(&self, input: LoginInput) -> Result<User, BoardServiceError> {
        let mut errors = FormErrors::new();
        let username = validate::required_text(&mut errors, "username", &input.username, None);
        if input.password.is_empty() {
            errors.add("password", validate::REQUIRED);
        }
        errors.into_result()?;

        let mut errors = FormErrors::new();
        let user = match self.users.find_by_username(username).await? {
            Some(user) if verify_password(&input.password, &user.password_hash) => user,
            _ => {
                errors.add_non_field(BAD_CREDENTIALS);
                return Err(errors.into());
            }
        };
        if !user.is_active {
            errors.add_non_field(INACTIVE_ACCOUNT);
            return Err(errors.into());
        }

        let user = User {
            last_login: Some(Utc::now()),
            ..user
        };
        self.users.update(&user).await?;
        Ok(user)
    }
}

// ── Profile changes ──────────────────────────────────────────────────────────

pub struct GetUserUseCase<U>
where
    U: UserRepository,
{
    pub users: U,
}

impl<U> GetUserUseCase<U>
where
    U: UserRepository,
{
    pub async fn execute(&self, user_id: Uuid) -> Result<User, BoardServiceError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(BoardServiceError::UserNotFound)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChangeUserInfoInput {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub send_messages: bool,
}

pub struct ChangeUserInfoUseCase<U>
where
    U: UserRepository,
{
    pub users: U,
}

impl<U> ChangeUserInfoUseCase<U>
where
    U: UserRepository,
{
    pub async fn execute(
        &self,
        user_id: Uuid,
        input: ChangeUserInfoInput,
    ) -> Result<User, BoardServiceError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(BoardServiceError::UserNotFound)?;

        let username = input.username.trim();
        let email = input.email.trim();
        let mut errors = FormErrors::new();
        validate::username(&mut errors, "username", username);
        if !errors.has("username") && self.users.username_taken(username, Some(user_id)).await? {
            errors.add("username", USERNAME_TAKEN);
        }
        check_profile_fields(&mut errors, email, &input.first_name, &input.last_name);
        errors.into_result()?;

        let user = User {
            username: username.to_owned(),
            email: email.to_owned(),
            first_name: input.first_name.trim().to_owned(),
            last_name: input.last_name.trim().to_owned(),
            send_messages: input.send_messages,
            ..user
        };
        self.users.update(&user).await?;
        Ok(user)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChangePasswordInput {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

pub struct ChangePasswordUseCase<U>
where
    U: UserRepository,
{
    pub users: U,
}

impl<U> ChangePasswordUseCase<U>
where
    U: UserRepository,
{
    pub async fn execute(
        &self,
        user_id: Uuid,
        input: ChangePasswordInput,
    ) -> Result<(), BoardServiceError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(BoardServiceError::UserNotFound)?;

        let mut errors = FormErrors::new();
        if !verify_password(&input.old_password, &user.password_hash) {
            errors.add(
                "old_password",
                "Your old password was entered incorrectly. Please enter it again.",
            );
        }
        validate::password(&mut errors, "new_password", &input.new_password, &user.username);
        validate::password_confirmation(
            &mut errors,
            "new_password",
            &input.new_password,
            &input.new_password_confirm,
        );
        errors.into_result()?;

        let user = User {
            password_hash: hash_password(&input.new_password)?,
            ..user
        };
        self.users.update(&user).await?;
        tracing::info!(user_id = %user.id, "password changed");
        Ok(())
    }
}

// ── Account deletion ─────────────────────────────────────────────────────────

pub struct DeleteUserUseCase<U, S>
where
    U: UserRepository,
    S: ImageStore,
{
    pub users: U,
    pub images: S,
}

impl<U, S> DeleteUserUseCase<U, S>
where
    U: UserRepository,
    S: ImageStore,
{
    /// Delete the user with all their listings, then clean up image files.
    pub async fn execute(&self, user_id: Uuid) -> Result<(), BoardServiceError> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(BoardServiceError::UserNotFound);
        }
        let paths = self.users.delete_with_listings(user_id).await?;
        self.images.remove_all(&paths).await;
        tracing::info!(user_id = %user_id, files = paths.len(), "user deleted");
        Ok(())
    }
}
