use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Listings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Listings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Listings::RubricId).integer().not_null())
                    .col(ColumnDef::new(Listings::AuthorId).uuid().not_null())
                    .col(ColumnDef::new(Listings::Title).string_len(40).not_null())
                    .col(ColumnDef::new(Listings::Content).text().not_null())
                    .col(
                        ColumnDef::new(Listings::Price)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Listings::Contacts).text().not_null())
                    .col(ColumnDef::new(Listings::Image).string())
                    .col(
                        ColumnDef::new(Listings::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Listings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Listings::Table, Listings::RubricId)
                            .to(Rubrics::Table, Rubrics::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Listings::Table, Listings::AuthorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Rubric pages: active listings of one rubric, newest first.
        manager
            .create_index(
                Index::create()
                    .table(Listings::Table)
                    .col(Listings::RubricId)
                    .col(Listings::IsActive)
                    .col(Listings::CreatedAt)
                    .name("idx_listings_rubric_active_created")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Listings::Table)
                    .col(Listings::AuthorId)
                    .name("idx_listings_author_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Listings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Listings {
    Table,
    Id,
    RubricId,
    AuthorId,
    Title,
    Content,
    Price,
    Contacts,
    Image,
    IsActive,
    CreatedAt,
}

#[derive(Iden)]
enum Rubrics {
    Table,
    Id,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
