use anyhow::Context as _;
use askama::Template;
use sea_orm::DatabaseConnection;
use url::form_urlencoded;
use uuid::Uuid;

use bboard_auth_types::signer::Signer;

use crate::domain::repository::ActivationNotifier;
use crate::domain::types::{Letter, OutboxEvent, User};
use crate::error::BoardServiceError;
use crate::infra::db::insert_outbox_event;

/// Outbox `kind` of activation letters.
pub const ACTIVATION_LETTER_KIND: &str = "activation_letter";

#[derive(Template)]
#[template(path = "email/activation_letter_subject.txt")]
struct ActivationSubject<'a> {
    username: &'a str,
}

#[derive(Template)]
#[template(path = "email/activation_letter_body.txt")]
struct ActivationBody<'a> {
    username: &'a str,
    activation_url: &'a str,
}

/// `<site_url>/accounts/register/activate/<token>/` for `username`.
pub fn activation_url(signer: &Signer, site_url: &str, username: &str) -> String {
    let token: String =
        form_urlencoded::byte_serialize(signer.sign(username).as_bytes()).collect();
    format!(
        "{}/accounts/register/activate/{token}/",
        site_url.trim_end_matches('/')
    )
}

/// Render the activation letter addressed to `user`.
pub fn compose_activation_letter(
    user: &User,
    signer: &Signer,
    site_url: &str,
) -> Result<Letter, askama::Error> {
    let url = activation_url(signer, site_url, &user.username);
    let subject = ActivationSubject {
        username: &user.username,
    }
    .render()?;
    let body = ActivationBody {
        username: &user.username,
        activation_url: &url,
    }
    .render()?;
    Ok(Letter {
        to: user.email.clone(),
        subject: subject.trim().to_owned(),
        body,
    })
}

/// Writes activation letters to the outbox for the mail relay.
#[derive(Clone)]
pub struct OutboxActivationMailer {
    pub db: DatabaseConnection,
    pub signer: Signer,
    pub site_url: String,
}

impl ActivationNotifier for OutboxActivationMailer {
    fn activation_event(&self, user: &User) -> Result<OutboxEvent, BoardServiceError> {
        let letter = compose_activation_letter(user, &self.signer, &self.site_url)
            .context("render activation letter")?;
        let id = Uuid::now_v7();
        Ok(OutboxEvent {
            id,
            kind: ACTIVATION_LETTER_KIND.to_owned(),
            payload: serde_json::to_value(&letter).context("serialize activation letter")?,
            idempotency_key: format!("{ACTIVATION_LETTER_KIND}:{}:{id}", user.id),
        })
    }

    async fn send_activation(&self, user: &User) -> Result<(), BoardServiceError> {
        let event = self.activation_event(user)?;
        insert_outbox_event(&self.db, &event)
            .await
            .context("enqueue activation letter")?;
        tracing::info!(user_id = %user.id, "activation letter queued");
        Ok(())
    }
}
