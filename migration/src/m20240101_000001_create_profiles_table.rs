use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profiles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Profiles::DisplayName).string().not_null())
                    .col(ColumnDef::new(Profiles::Grade).integer().not_null().default(1))
                    .col(ColumnDef::new(Profiles::Xp).integer().not_null().default(0))
                    .col(ColumnDef::new(Profiles::Level).integer().not_null().default(1))
                    .col(ColumnDef::new(Profiles::Coins).integer().not_null().default(0))
                    .col(ColumnDef::new(Profiles::Energy).integer().not_null().default(100))
                    .col(ColumnDef::new(Profiles::MaxEnergy).integer().not_null().default(100))
                    .col(
                        ColumnDef::new(Profiles::EnergyUpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Profiles::Wins).integer().not_null().default(0))
                    .col(ColumnDef::new(Profiles::Losses).integer().not_null().default(0))
                    .col(ColumnDef::new(Profiles::Draws).integer().not_null().default(0))
                    .col(ColumnDef::new(Profiles::FreeWins).integer().not_null().default(0))
                    .col(ColumnDef::new(Profiles::FreeMatches).integer().not_null().default(0))
                    .col(ColumnDef::new(Profiles::WordsStudied).integer().not_null().default(0))
                    .col(ColumnDef::new(Profiles::BestWinStreak).integer().not_null().default(0))
                    .col(ColumnDef::new(Profiles::RankPoints).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Profiles::RankTier)
                            .string()
                            .not_null()
                            .default("bronze"),
                    )
                    .col(
                        ColumnDef::new(Profiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Profiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Leaderboard indexes
        manager
            .create_index(
                Index::create()
                    .name("idx_profiles_xp")
                    .table(Profiles::Table)
                    .col(Profiles::Xp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_profiles_rank_points")
                    .table(Profiles::Table)
                    .col(Profiles::RankPoints)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    DisplayName,
    Grade,
    Xp,
    Level,
    Coins,
    Energy,
    MaxEnergy,
    EnergyUpdatedAt,
    Wins,
    Losses,
    Draws,
    FreeWins,
    FreeMatches,
    WordsStudied,
    BestWinStreak,
    RankPoints,
    RankTier,
    CreatedAt,
    UpdatedAt,
}
