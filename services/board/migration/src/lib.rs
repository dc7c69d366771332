use sea_orm_migration::prelude::*;

mod m20260901_000001_create_users;
mod m20260901_000002_create_rubrics;
mod m20260901_000003_create_listings;
mod m20260901_000004_create_additional_images;
mod m20260901_000005_create_comments;
mod m20260901_000006_create_captchas;
mod m20260901_000007_create_outbox_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260901_000001_create_users::Migration),
            Box::new(m20260901_000002_create_rubrics::Migration),
            Box::new(m20260901_000003_create_listings::Migration),
            Box::new(m20260901_000004_create_additional_images::Migration),
            Box::new(m20260901_000005_create_comments::Migration),
            Box::new(m20260901_000006_create_captchas::Migration),
            Box::new(m20260901_000007_create_outbox_events::Migration),
        ]
    }
}
