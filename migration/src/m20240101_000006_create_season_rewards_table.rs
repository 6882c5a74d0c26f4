use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SeasonRewards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SeasonRewards::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SeasonRewards::SeasonId).string().not_null())
                    .col(ColumnDef::new(SeasonRewards::UserId).uuid().not_null())
                    .col(ColumnDef::new(SeasonRewards::Tier).string().not_null())
                    .col(ColumnDef::new(SeasonRewards::Coins).integer().not_null())
                    .col(
                        ColumnDef::new(SeasonRewards::AwardedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // A user is rewarded at most once per season
        manager
            .create_index(
                Index::create()
                    .name("idx_season_rewards_season_user")
                    .table(SeasonRewards::Table)
                    .col(SeasonRewards::SeasonId)
                    .col(SeasonRewards::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SeasonRewards::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SeasonRewards {
    Table,
    Id,
    SeasonId,
    UserId,
    Tier,
    Coins,
    AwardedAt,
}
