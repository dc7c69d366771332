use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AdditionalImages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdditionalImages::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AdditionalImages::ListingId).uuid().not_null())
                    .col(ColumnDef::new(AdditionalImages::Image).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(AdditionalImages::Table, AdditionalImages::ListingId)
                            .to(Listings::Table, Listings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(AdditionalImages::Table)
                    .col(AdditionalImages::ListingId)
                    .name("idx_additional_images_listing_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AdditionalImages::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AdditionalImages {
    Table,
    Id,
    ListingId,
    Image,
}

#[derive(Iden)]
enum Listings {
    Table,
    Id,
}
