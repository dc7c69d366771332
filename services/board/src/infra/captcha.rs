use anyhow::Context as _;
use chrono::{DateTime, Duration, Utc};
use rand::RngExt;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QuerySelect, Select, TransactionTrait,
};
use uuid::Uuid;

use bboard_schema::captchas;

use crate::domain::repository::CaptchaPort;
use crate::domain::types::{CAPTCHA_TTL_SECS, CaptchaChallenge};
use crate::error::BoardServiceError;

/// Arithmetic challenge stored in the `captchas` table.
#[derive(Clone)]
pub struct DbCaptcha {
    pub db: DatabaseConnection,
}

/// Pick two small operands and return `(question, answer)`.
pub fn arithmetic_challenge() -> (String, String) {
    let mut rng = rand::rng();
    let a: u8 = rng.random_range(1..=9);
    let b: u8 = rng.random_range(1..=9);
    (format!("What is {a} + {b}?"), (a + b).to_string())
}

/// Row lock held until the attempt is committed.
fn claim(id: Uuid) -> Select<captchas::Entity> {
    captchas::Entity::find_by_id(id).lock_exclusive()
}

fn is_correct(stored: &captchas::Model, answer: &str, now: DateTime<Utc>) -> bool {
    stored.expires_at > now && stored.answer == answer.trim()
}

impl CaptchaPort for DbCaptcha {
    async fn issue(&self) -> Result<CaptchaChallenge, BoardServiceError> {
        let now = Utc::now();
        captchas::Entity::delete_many()
            .filter(captchas::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await
            .context("purge expired captchas")?;

        let (question, answer) = arithmetic_challenge();
        let id = Uuid::new_v4();
        captchas::ActiveModel {
            id: Set(id),
            answer: Set(answer),
            expires_at: Set(now + Duration::seconds(CAPTCHA_TTL_SECS)),
        }
        .insert(&self.db)
        .await
        .context("create captcha")?;

        Ok(CaptchaChallenge {
            key: id.to_string(),
            question,
        })
    }

    async fn verify(&self, key: &str, answer: &str) -> Result<bool, BoardServiceError> {
        let Ok(id) = Uuid::parse_str(key) else {
            return Ok(false);
        };
        // The first attempt to lock and delete the row owns it.
        let claimed = self
            .db
            .transaction::<_, Option<captchas::Model>, DbErr>(|txn| {
                Box::pin(async move {
                    let Some(stored) = claim(id).one(txn).await? else {
                        return Ok(None);
                    };
                    captchas::Entity::delete_by_id(id).exec(txn).await?;
                    Ok(Some(stored))
                })
            })
            .await
            .context("consume captcha")?;
        Ok(claimed.is_some_and(|c| is_correct(&c, answer, Utc::now())))
    }
}
