use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Words::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Words::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Words::Word).string().not_null())
                    .col(ColumnDef::new(Words::Meaning).string().not_null())
                    .col(ColumnDef::new(Words::Phonetic).string().null())
                    .col(ColumnDef::new(Words::Topic).string().not_null())
                    .col(ColumnDef::new(Words::Grade).integer().not_null())
                    .col(
                        ColumnDef::new(Words::Subject)
                            .string()
                            .not_null()
                            .default("english"),
                    )
                    .to_owned(),
            )
            .await?;

        // Seeding the same list twice must not duplicate rows
        manager
            .create_index(
                Index::create()
                    .name("idx_words_unique_entry")
                    .table(Words::Table)
                    .col(Words::Word)
                    .col(Words::Subject)
                    .col(Words::Grade)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_words_grade_subject")
                    .table(Words::Table)
                    .col(Words::Grade)
                    .col(Words::Subject)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Words::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Words {
    Table,
    Id,
    Word,
    Meaning,
    Phonetic,
    Topic,
    Grade,
    Subject,
}
