use anyhow::Result;
use arena_core::{is_valid_season_id, season_reward_coins, tier_for_points};
use arena_types::{SeasonReward, Tier};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::info;
use uuid::Uuid;

use crate::entities::{prelude::*, profiles, season_rewards};
use crate::error::RepositoryError;

pub struct SeasonRepository {
    db: DatabaseConnection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonAwardReport {
    pub awarded: u64,
    /// Profiles that already had a reward row for the season.
    pub skipped: u64,
    pub coins: i64,
}

fn reward_view(model: season_rewards::Model) -> SeasonReward {
    SeasonReward {
        season_id: model.season_id,
        user_id: model.user_id,
        tier: Tier::parse(&model.tier).unwrap_or(Tier::Bronze),
        coins: model.coins,
        awarded_at: model.awarded_at.to_rfc3339(),
    }
}

impl SeasonRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Pay every profile the reward for the tier it holds now. The reward row
    /// is keyed by season and user and coins are only credited when the row is
    /// new, so a re-run for the same season pays nothing twice.
    pub async fn award_season_rewards(
        &self,
        season_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SeasonAwardReport> {
        if !is_valid_season_id(season_id) {
            return Err(RepositoryError::Invalid(format!(
                "'{}' is not a season id (expected YYYY-MM)",
                season_id
            ))
            .into());
        }

        let txn = self.db.begin().await?;
        let all_profiles = Profiles::find().all(&txn).await?;
        let mut report = SeasonAwardReport {
            awarded: 0,
            skipped: 0,
            coins: 0,
        };

        for profile in all_profiles {
            let tier = Tier::parse(&profile.rank_tier)
                .unwrap_or_else(|| tier_for_points(profile.rank_points));
            let coins = season_reward_coins(tier);

            let inserted = SeasonRewards::insert(season_rewards::ActiveModel {
                id: Set(Uuid::new_v4()),
                season_id: Set(season_id.to_string()),
                user_id: Set(profile.id),
                tier: Set(tier.as_str().to_string()),
                coins: Set(coins),
                awarded_at: Set(now.fixed_offset()),
            })
            .on_conflict(
                OnConflict::columns([
                    season_rewards::Column::SeasonId,
                    season_rewards::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

            if inserted == 0 {
                report.skipped += 1;
                continue;
            }

            Profiles::update_many()
                .col_expr(profiles::Column::Coins, Expr::col(profiles::Column::Coins).add(coins))
                .filter(profiles::Column::Id.eq(profile.id))
                .exec(&txn)
                .await?;
            report.awarded += 1;
            report.coins += i64::from(coins);
        }

        txn.commit().await?;
        info!(
            "Season {}: rewarded {} profiles with {} coins, {} already rewarded",
            season_id, report.awarded, report.coins, report.skipped
        );
        Ok(report)
    }

    pub async fn rewards_for(&self, user_id: Uuid) -> Result<Vec<SeasonReward>> {
        let models = SeasonRewards::find()
            .filter(season_rewards::Column::UserId.eq(user_id))
            .order_by_desc(season_rewards::Column::SeasonId)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(reward_view).collect())
    }
}
