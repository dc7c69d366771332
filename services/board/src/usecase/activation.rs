use bboard_auth_types::signer::Signer;

use crate::domain::repository::{ActivationNotifier, UserRepository};
use crate::domain::types::{ActivationFilter, User};
use crate::error::BoardServiceError;

/// Result of following an activation link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    Activated,
    AlreadyActivated,
}

pub struct ActivateUserUseCase<U>
where
    U: UserRepository,
{
    pub users: U,
    pub signer: Signer,
}

impl<U> ActivateUserUseCase<U>
where
    U: UserRepository,
{
    /// Verify `token` and activate its user. Nothing is written unless the
    /// token is genuine and the user is still unactivated.
    pub async fn execute(&self, token: &str) -> Result<ActivationOutcome, BoardServiceError> {
        let username = self
            .signer
            .unsign(token)
            .map_err(|_| BoardServiceError::BadSignature)?;
        let user = self
            .users
            .find_by_username(&username)
            .await?
            .ok_or(BoardServiceError::UserNotFound)?;
        if user.is_activated {
            return Ok(ActivationOutcome::AlreadyActivated);
        }
        let user = User {
            is_active: true,
            is_activated: true,
            ..user
        };
        self.users.update(&user).await?;
        tracing::info!(user_id = %user.id, "user activated");
        Ok(ActivationOutcome::Activated)
    }
}

/// Operator listing of users by activation state.
pub struct ListUsersUseCase<U>
where
    U: UserRepository,
{
    pub users: U,
}

impl<U> ListUsersUseCase<U>
where
    U: UserRepository,
{
    pub async fn execute(&self, filter: ActivationFilter) -> Result<Vec<User>, BoardServiceError> {
        self.users.list_by_filter(filter, chrono::Utc::now()).await
    }
}

/// Which users an activation re-send targets.
#[derive(Debug, Clone)]
pub enum ResendSelection {
    Filter(ActivationFilter),
    Usernames(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResendReport {
    /// Usernames that were sent a letter.
    pub sent: Vec<String>,
    /// Selected users skipped because they are already activated.
    pub skipped: Vec<String>,
    /// Requested usernames with no matching user.
    pub missing: Vec<String>,
}

pub struct ResendActivationUseCase<U, N>
where
    U: UserRepository,
    N: ActivationNotifier,
{
    pub users: U,
    pub notifier: N,
}

impl<U, N> ResendActivationUseCase<U, N>
where
    U: UserRepository,
    N: ActivationNotifier,
{
    /// Send a fresh activation letter to every unactivated user in the selection.
    pub async fn execute(
        &self,
        selection: ResendSelection,
    ) -> Result<ResendReport, BoardServiceError> {
        let mut report = ResendReport::default();
        let selected = match selection {
            ResendSelection::Filter(filter) => {
                self.users.list_by_filter(filter, chrono::Utc::now()).await?
            }
            ResendSelection::Usernames(names) => {
                let mut found = Vec::with_capacity(names.len());
                for name in names {
                    match self.users.find_by_username(&name).await? {
                        Some(user) => found.push(user),
                        None => report.missing.push(name),
                    }
                }
                found
            }
        };
        for user in selected {
            if user.is_activated {
                report.skipped.push(user.username);
                continue;
            }
            self.notifier.send_activation(&user).await?;
            report.sent.push(user.username);
        }
        Ok(report)
    }
}
