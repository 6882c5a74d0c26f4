pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_profiles_table;
mod m20240101_000002_create_words_table;
mod m20240101_000003_create_matches_table;
mod m20240101_000004_create_teams_tables;
mod m20240101_000005_create_social_tables;
mod m20240101_000006_create_season_rewards_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_profiles_table::Migration),
            Box::new(m20240101_000002_create_words_table::Migration),
            Box::new(m20240101_000003_create_matches_table::Migration),
            Box::new(m20240101_000004_create_teams_tables::Migration),
            Box::new(m20240101_000005_create_social_tables::Migration),
            Box::new(m20240101_000006_create_season_rewards_table::Migration),
        ]
    }
}
