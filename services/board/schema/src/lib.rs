//! sea-orm entities for the bulletin board database.

pub mod additional_images;
pub mod captchas;
pub mod comments;
pub mod listings;
pub mod outbox_events;
pub mod rubrics;
pub mod users;
