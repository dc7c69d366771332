use std::sync::Arc;

use axum::extract::FromRef;
use sea_orm::DatabaseConnection;

use bboard_auth_types::session::SessionKey;
use bboard_auth_types::signer::{SignatureError, Signer};
use bboard_domain::pagination::Paginator;

use crate::config::BoardConfig;
use crate::infra::captcha::DbCaptcha;
use crate::infra::db::{
    DbCommentRepository, DbListingRepository, DbRubricRepository, DbUserRepository,
};
use crate::infra::mailer::OutboxActivationMailer;
use crate::infra::storage::LocalImageStore;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<BoardConfig>,
    pub signer: Signer,
    pub session_key: SessionKey,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: BoardConfig) -> Result<Self, SignatureError> {
        let signer = Signer::activation(&config.secret_key)?;
        let session_key = SessionKey::new(&config.secret_key);
        Ok(Self {
            db,
            config: Arc::new(config),
            signer,
            session_key,
        })
    }

    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn rubric_repo(&self) -> DbRubricRepository {
        DbRubricRepository {
            db: self.db.clone(),
        }
    }

    pub fn listing_repo(&self) -> DbListingRepository {
        DbListingRepository {
            db: self.db.clone(),
        }
    }

    pub fn comment_repo(&self) -> DbCommentRepository {
        DbCommentRepository {
            db: self.db.clone(),
        }
    }

    pub fn captcha(&self) -> DbCaptcha {
        DbCaptcha {
            db: self.db.clone(),
        }
    }

    pub fn image_store(&self) -> LocalImageStore {
        LocalImageStore {
            root: self.config.media_root.clone(),
        }
    }

    pub fn mailer(&self) -> OutboxActivationMailer {
        OutboxActivationMailer {
            db: self.db.clone(),
            signer: self.signer.clone(),
            site_url: self.config.site_url().to_owned(),
        }
    }

    pub fn paginator(&self) -> Paginator {
        Paginator::new(self.config.listings_per_page)
    }
}

impl FromRef<AppState> for SessionKey {
    fn from_ref(state: &AppState) -> Self {
        state.session_key.clone()
    }
}

impl FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
