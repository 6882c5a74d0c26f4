use anyhow::Result;
use arena_core::{
    DEFAULT_MAX_ENERGY, EnergyWallet, PlayerStanding, PurchaseOutcome, RankChange, STARTING_COINS,
    apply_ranked_result, level_for_xp, rank_by_rank_points, rank_by_win_rate, rank_by_xp,
    tier_for_points,
};
use arena_types::{EnergyPack, LeaderboardEntry, MatchKind, MatchOutcome, Profile, Tier};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entities::{prelude::*, profiles};
use crate::error::RepositoryError;
use crate::repositories::team_repository::credit_contribution;

const MAX_DISPLAY_NAME_CHARS: usize = 30;
const MAX_GRADE: i32 = 12;
/// Attempts for read-modify-write updates guarded by a compare on the old value.
const MAX_OPTIMISTIC_RETRIES: usize = 3;

pub struct ProfileRepository {
    db: DatabaseConnection,
}

#[derive(Debug, Clone, Copy)]
pub struct StudyCharge {
    pub energy_cost: i32,
    pub words: i32,
    pub xp: i32,
}

#[derive(Debug, Clone)]
pub struct StudyOutcome {
    pub wallet: EnergyWallet,
    pub profile: Profile,
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub display_name: String,
    pub grade: i32,
    pub max_energy: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct MatchResultUpdate {
    pub kind: MatchKind,
    pub outcome: MatchOutcome,
    pub xp: i32,
    pub coins: i32,
}

#[derive(Debug, Clone)]
pub struct RecordedResult {
    pub profile: Profile,
    /// Present for ranked matches only.
    pub rank_change: Option<RankChange>,
}

pub(crate) fn model_to_profile(model: profiles::Model) -> Profile {
    let rank_tier =
        Tier::parse(&model.rank_tier).unwrap_or_else(|| tier_for_points(model.rank_points));
    Profile {
        id: model.id,
        display_name: model.display_name,
        grade: model.grade,
        level: model.level,
        xp: model.xp,
        coins: model.coins,
        energy: model.energy,
        max_energy: model.max_energy,
        wins: model.wins,
        losses: model.losses,
        draws: model.draws,
        free_wins: model.free_wins,
        free_matches: model.free_matches,
        words_studied: model.words_studied,
        best_win_streak: model.best_win_streak,
        rank_tier,
        rank_points: model.rank_points,
        created_at: model.created_at.to_rfc3339(),
    }
}

fn wallet_of(model: &profiles::Model) -> EnergyWallet {
    EnergyWallet::new(
        model.energy,
        model.max_energy,
        model.energy_updated_at.with_timezone(&Utc),
    )
}

/// Standing for the all-matches boards, or the free-match board when `free_only`.
fn standing_of(model: profiles::Model, free_only: bool) -> PlayerStanding {
    let (wins, matches) = if free_only {
        (model.free_wins, model.free_matches)
    } else {
        (model.wins, model.wins + model.losses + model.draws)
    };
    let rank_tier =
        Tier::parse(&model.rank_tier).unwrap_or_else(|| tier_for_points(model.rank_points));
    PlayerStanding {
        user_id: model.id,
        display_name: model.display_name,
        level: model.level,
        xp: model.xp,
        rank_tier,
        rank_points: model.rank_points,
        wins,
        matches,
    }
}

async fn load<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<profiles::Model> {
    Profiles::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| RepositoryError::NotFound("profile").into())
}

/// Bring the stored level in line with the stored xp.
async fn sync_level<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<profiles::Model> {
    let mut model = load(conn, id).await?;
    let level = level_for_xp(model.xp);
    if level != model.level {
        Profiles::update_many()
            .col_expr(profiles::Column::Level, Expr::value(level))
            .filter(profiles::Column::Id.eq(id))
            .exec(conn)
            .await?;
        debug!("Profile {} reached level {}", id, level);
        model.level = level;
    }
    Ok(model)
}

impl ProfileRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>> {
        let model = Profiles::find_by_id(id).one(&self.db).await?;
        Ok(model.map(model_to_profile))
    }

    pub async fn get(&self, id: Uuid) -> Result<Profile> {
        Ok(model_to_profile(load(&self.db, id).await?))
    }

    pub async fn create_profile(&self, new: NewProfile, now: DateTime<Utc>) -> Result<Profile> {
        let display_name = new.display_name.trim().to_string();
        let name_length = display_name.chars().count();
        if name_length == 0 || name_length > MAX_DISPLAY_NAME_CHARS {
            return Err(RepositoryError::Invalid(format!(
                "display name must be 1-{} characters",
                MAX_DISPLAY_NAME_CHARS
            ))
            .into());
        }
        if !(1..=MAX_GRADE).contains(&new.grade) {
            return Err(RepositoryError::Invalid(format!("grade must be 1-{}", MAX_GRADE)).into());
        }
        if Profiles::find_by_id(new.id).one(&self.db).await?.is_some() {
            return Err(RepositoryError::Conflict("profile already exists".to_string()).into());
        }

        let max_energy = if new.max_energy > 0 {
            new.max_energy
        } else {
            DEFAULT_MAX_ENERGY
        };
        let now = now.into();
        let model = profiles::ActiveModel {
            id: Set(new.id),
            display_name: Set(display_name),
            grade: Set(new.grade),
            xp: Set(0),
            level: Set(level_for_xp(0)),
            coins: Set(STARTING_COINS),
            energy: Set(max_energy),
            max_energy: Set(max_energy),
            energy_updated_at: Set(now),
            wins: Set(0),
            losses: Set(0),
            draws: Set(0),
            free_wins: Set(0),
            free_matches: Set(0),
            words_studied: Set(0),
            best_win_streak: Set(0),
            rank_points: Set(0),
            rank_tier: Set(Tier::Bronze.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let saved = Profiles::insert(model).exec(&self.db).await?;
        info!("Created profile {}", saved.last_insert_id);

        // Fetch the created profile
        self.get(saved.last_insert_id).await
    }

    /// The stored energy state plus the current coin balance.
    pub async fn energy_wallet(&self, id: Uuid) -> Result<(EnergyWallet, i32)> {
        let model = load(&self.db, id).await?;
        Ok((wallet_of(&model), model.coins))
    }

    /// Spend coins on an energy pack. The coin debit only applies while the
    /// balance still covers the price, so concurrent purchases cannot overdraw.
    pub async fn purchase_energy(
        &self,
        id: Uuid,
        pack: EnergyPack,
        now: DateTime<Utc>,
        interval: Duration,
    ) -> Result<PurchaseOutcome> {
        for _ in 0..MAX_OPTIMISTIC_RETRIES {
            let model = load(&self.db, id).await?;
            let outcome = wallet_of(&model)
                .purchase(pack, model.coins, now, interval)
                .map_err(RepositoryError::from)?;

            let result = Profiles::update_many()
                .col_expr(
                    profiles::Column::Coins,
                    Expr::col(profiles::Column::Coins).sub(outcome.coins_spent),
                )
                .col_expr(profiles::Column::Energy, Expr::value(outcome.wallet.energy))
                .col_expr(
                    profiles::Column::EnergyUpdatedAt,
                    Expr::value(outcome.wallet.updated_at.fixed_offset()),
                )
                .col_expr(profiles::Column::UpdatedAt, Expr::value(now.fixed_offset()))
                .filter(profiles::Column::Id.eq(id))
                .filter(profiles::Column::Coins.gte(outcome.coins_spent))
                .filter(profiles::Column::Energy.eq(model.energy))
                .exec(&self.db)
                .await?;

            if result.rows_affected == 1 {
                info!(
                    "Profile {} bought {} energy for {} coins",
                    id, outcome.energy_added, outcome.coins_spent
                );
                return Ok(outcome);
            }
            debug!("Wallet of {} changed during purchase, retrying", id);
        }

        Err(RepositoryError::Conflict("wallet changed concurrently, try again".to_string()).into())
    }

    /// Pay the energy for a study session and credit its words and XP, plus
    /// the team contribution, all in one transaction.
    pub async fn complete_study(
        &self,
        id: Uuid,
        session: StudyCharge,
        now: DateTime<Utc>,
        interval: Duration,
    ) -> Result<StudyOutcome> {
        for _ in 0..MAX_OPTIMISTIC_RETRIES {
            let txn = self.db.begin().await?;
            let model = load(&txn, id).await?;
            let wallet = wallet_of(&model)
                .consume(session.energy_cost, now, interval)
                .map_err(RepositoryError::from)?;

            let result = Profiles::update_many()
                .col_expr(profiles::Column::Energy, Expr::value(wallet.energy))
                .col_expr(
                    profiles::Column::EnergyUpdatedAt,
                    Expr::value(wallet.updated_at.fixed_offset()),
                )
                .col_expr(
                    profiles::Column::WordsStudied,
                    Expr::col(profiles::Column::WordsStudied).add(session.words),
                )
                .col_expr(
                    profiles::Column::Xp,
                    Expr::col(profiles::Column::Xp).add(session.xp),
                )
                .col_expr(profiles::Column::UpdatedAt, Expr::value(now.fixed_offset()))
                .filter(profiles::Column::Id.eq(id))
                .filter(profiles::Column::Energy.eq(model.energy))
                .exec(&txn)
                .await?;
            if result.rows_affected != 1 {
                txn.rollback().await?;
                debug!("Energy of {} changed during study, retrying", id);
                continue;
            }

            let model = sync_level(&txn, id).await?;
            credit_contribution(&txn, id, session.xp, 0).await?;
            txn.commit().await?;
            return Ok(StudyOutcome {
                wallet,
                profile: model_to_profile(model),
            });
        }

        Err(RepositoryError::Conflict("energy changed concurrently, try again".to_string()).into())
    }

    pub async fn record_study(&self, id: Uuid, words: i32, xp: i32) -> Result<Profile> {
        let txn = self.db.begin().await?;

        let result = Profiles::update_many()
            .col_expr(
                profiles::Column::WordsStudied,
                Expr::col(profiles::Column::WordsStudied).add(words),
            )
            .col_expr(profiles::Column::Xp, Expr::col(profiles::Column::Xp).add(xp))
            .col_expr(profiles::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(profiles::Column::Id.eq(id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound("profile").into());
        }

        let model = sync_level(&txn, id).await?;
        txn.commit().await?;
        Ok(model_to_profile(model))
    }

    /// Apply the counters, rewards and (for ranked matches) rank points of one finished match.
    pub async fn apply_match_result(
        &self,
        id: Uuid,
        update: MatchResultUpdate,
    ) -> Result<RecordedResult> {
        let (wins, losses, draws) = match update.outcome {
            MatchOutcome::Win => (1, 0, 0),
            MatchOutcome::Loss => (0, 1, 0),
            MatchOutcome::Draw => (0, 0, 1),
        };

        let txn = self.db.begin().await?;

        let mut counters = Profiles::update_many()
            .col_expr(profiles::Column::Wins, Expr::col(profiles::Column::Wins).add(wins))
            .col_expr(profiles::Column::Losses, Expr::col(profiles::Column::Losses).add(losses))
            .col_expr(profiles::Column::Draws, Expr::col(profiles::Column::Draws).add(draws))
            .col_expr(profiles::Column::Xp, Expr::col(profiles::Column::Xp).add(update.xp))
            .col_expr(
                profiles::Column::Coins,
                Expr::col(profiles::Column::Coins).add(update.coins),
            )
            .col_expr(profiles::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()));
        if update.kind == MatchKind::Free {
            counters = counters
                .col_expr(
                    profiles::Column::FreeMatches,
                    Expr::col(profiles::Column::FreeMatches).add(1),
                )
                .col_expr(
                    profiles::Column::FreeWins,
                    Expr::col(profiles::Column::FreeWins).add(wins),
                );
        }
        let result = counters
            .filter(profiles::Column::Id.eq(id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound("profile").into());
        }

        let mut model = sync_level(&txn, id).await?;

        let rank_change = if update.kind == MatchKind::Ranked {
            let change = apply_ranked_result(model.rank_points, update.outcome);
            Profiles::update_many()
                .col_expr(profiles::Column::RankPoints, Expr::value(change.points))
                .col_expr(profiles::Column::RankTier, Expr::value(change.tier.as_str()))
                .filter(profiles::Column::Id.eq(id))
                .exec(&txn)
                .await?;
            if change.promoted {
                info!("Profile {} promoted to {}", id, change.tier.as_str());
            }
            model.rank_points = change.points;
            model.rank_tier = change.tier.as_str().to_string();
            Some(change)
        } else {
            None
        };

        txn.commit().await?;

        Ok(RecordedResult {
            profile: model_to_profile(model),
            rank_change,
        })
    }

    /// Raise the recorded best win streak; never lowers it.
    pub async fn update_best_win_streak(&self, id: Uuid, streak: i32) -> Result<bool> {
        let result = Profiles::update_many()
            .col_expr(profiles::Column::BestWinStreak, Expr::value(streak))
            .filter(profiles::Column::Id.eq(id))
            .filter(profiles::Column::BestWinStreak.lt(streak))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Credit coins to the given profiles, or to everyone when `targets` is `None`.
    pub async fn add_coins(&self, targets: Option<&[Uuid]>, amount: i32) -> Result<u64> {
        if amount <= 0 {
            return Err(RepositoryError::Invalid("amount must be positive".to_string()).into());
        }

        let mut query = Profiles::update_many()
            .col_expr(profiles::Column::Coins, Expr::col(profiles::Column::Coins).add(amount))
            .col_expr(profiles::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()));
        if let Some(ids) = targets {
            query = query.filter(profiles::Column::Id.is_in(ids.to_vec()));
        }

        let result = query.exec(&self.db).await?;
        info!("Credited {} coins to {} profiles", amount, result.rows_affected);
        Ok(result.rows_affected)
    }

    pub async fn xp_leaderboard(&self, limit: u64) -> Result<Vec<LeaderboardEntry>> {
        let models = Profiles::find()
            .order_by_desc(profiles::Column::Xp)
            .order_by_desc(profiles::Column::Level)
            .order_by_asc(profiles::Column::DisplayName)
            .limit(limit)
            .all(&self.db)
            .await?;

        let standings = models.into_iter().map(|m| standing_of(m, false)).collect();
        Ok(rank_by_xp(standings, limit as usize))
    }

    pub async fn ranked_leaderboard(&self, limit: u64) -> Result<Vec<LeaderboardEntry>> {
        let models = Profiles::find()
            .order_by_desc(profiles::Column::RankPoints)
            .order_by_desc(profiles::Column::Wins)
            .order_by_asc(profiles::Column::DisplayName)
            .limit(limit)
            .all(&self.db)
            .await?;

        let standings = models.into_iter().map(|m| standing_of(m, false)).collect();
        Ok(rank_by_rank_points(standings, limit as usize))
    }

    /// Free-match win rates. Qualification depends on every player, so the
    /// ordering happens in memory.
    pub async fn win_rate_leaderboard(&self, limit: u64) -> Result<Vec<LeaderboardEntry>> {
        let models = Profiles::find()
            .filter(profiles::Column::FreeMatches.gt(0))
            .all(&self.db)
            .await?;

        let standings = models.into_iter().map(|m| standing_of(m, true)).collect();
        Ok(rank_by_win_rate(standings, limit as usize))
    }

    pub async fn xp_rank(&self, id: Uuid) -> Result<Option<u32>> {
        let profile = Profiles::find_by_id(id).one(&self.db).await?;

        if let Some(model) = profile {
            let profiles_above = Profiles::find()
                .filter(profiles::Column::Xp.gt(model.xp))
                .count(&self.db)
                .await?;

            Ok(Some(profiles_above as u32 + 1))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use arena_core::EnergyError;
    use chrono::TimeZone;
    use migration::{Migrator, MigratorTrait};

    async fn setup_test_db() -> ProfileRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        ProfileRepository::new(db)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 8, 0, 0).unwrap()
    }

    fn six_minutes() -> Duration {
        Duration::minutes(6)
    }

    fn study(energy_cost: i32, words: i32, xp: i32) -> StudyCharge {
        StudyCharge {
            energy_cost,
            words,
            xp,
        }
    }

    async fn create(repo: &ProfileRepository, name: &str) -> Profile {
        repo.create_profile(
            NewProfile {
                id: Uuid::new_v4(),
                display_name: name.to_string(),
                grade: 3,
                max_energy: 100,
            },
            t0(),
        )
        .await
        .unwrap()
    }

    fn repository_error(err: &anyhow::Error) -> &RepositoryError {
        err.downcast_ref::<RepositoryError>()
            .expect("expected a repository error")
    }

    #[tokio::test]
    async fn test_create_and_find_profile() {
        let repo = setup_test_db().await;
        let created = create(&repo, "  Mia ").await;

        assert_eq!(created.display_name, "Mia");
        assert_eq!(created.level, 1);
        assert_eq!(created.coins, STARTING_COINS);
        assert_eq!(created.energy, 100);
        assert_eq!(created.rank_tier, Tier::Bronze);

        let found = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.display_name, "Mia");
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_and_invalid_profiles_rejected() {
        let repo = setup_test_db().await;
        let created = create(&repo, "Mia").await;

        let duplicate = NewProfile {
            id: created.id,
            display_name: "Again".to_string(),
            grade: 3,
            max_energy: 100,
        };
        let err = repo.create_profile(duplicate, t0()).await.unwrap_err();
        assert!(matches!(repository_error(&err), RepositoryError::Conflict(_)));

        let blank = NewProfile {
            id: Uuid::new_v4(),
            display_name: "   ".to_string(),
            grade: 3,
            max_energy: 100,
        };
        let err = repo.create_profile(blank, t0()).await.unwrap_err();
        assert!(matches!(repository_error(&err), RepositoryError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_study_updates_xp_and_level() {
        let repo = setup_test_db().await;
        let profile = create(&repo, "Mia").await;

        let updated = repo.record_study(profile.id, 60, 120).await.unwrap();
        assert_eq!(updated.words_studied, 60);
        assert_eq!(updated.xp, 120);
        assert_eq!(updated.level, 2);

        let err = repo.record_study(Uuid::new_v4(), 1, 2).await.unwrap_err();
        assert!(matches!(repository_error(&err), RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ranked_result_moves_points_and_counters() {
        let repo = setup_test_db().await;
        let profile = create(&repo, "Mia").await;

        let win = MatchResultUpdate {
            kind: MatchKind::Ranked,
            outcome: MatchOutcome::Win,
            xp: 35,
            coins: 10,
        };
        let recorded = repo.apply_match_result(profile.id, win).await.unwrap();
        assert_eq!(recorded.profile.wins, 1);
        assert_eq!(recorded.profile.rank_points, 25);
        assert_eq!(recorded.profile.xp, 35);
        assert_eq!(recorded.profile.coins, STARTING_COINS + 10);
        assert_eq!(recorded.profile.free_matches, 0);
        assert_eq!(recorded.rank_change.unwrap().delta, 25);

        let loss = MatchResultUpdate {
            kind: MatchKind::Ranked,
            outcome: MatchOutcome::Loss,
            xp: 10,
            coins: 2,
        };
        repo.apply_match_result(profile.id, loss).await.unwrap();
        let recorded = repo.apply_match_result(profile.id, loss).await.unwrap();
        // Points never drop below zero
        assert_eq!(recorded.profile.rank_points, 0);
        assert_eq!(recorded.profile.losses, 2);
        assert_eq!(recorded.profile.rank_tier, Tier::Bronze);
    }

    #[tokio::test]
    async fn test_free_result_counts_free_matches_only() {
        let repo = setup_test_db().await;
        let profile = create(&repo, "Mia").await;

        let win = MatchResultUpdate {
            kind: MatchKind::Free,
            outcome: MatchOutcome::Win,
            xp: 30,
            coins: 10,
        };
        let recorded = repo.apply_match_result(profile.id, win).await.unwrap();
        assert!(recorded.rank_change.is_none());
        assert_eq!(recorded.profile.free_wins, 1);
        assert_eq!(recorded.profile.free_matches, 1);
        assert_eq!(recorded.profile.rank_points, 0);
    }

    #[tokio::test]
    async fn test_energy_consume_and_purchase() {
        let repo = setup_test_db().await;
        let profile = create(&repo, "Mia").await;

        let studied = repo
            .complete_study(profile.id, study(50, 10, 20), t0(), six_minutes())
            .await
            .unwrap();
        assert_eq!(studied.wallet.energy, 50);

        let outcome = repo
            .purchase_energy(profile.id, EnergyPack::Small, t0(), six_minutes())
            .await
            .unwrap();
        assert_eq!(outcome.wallet.energy, 70);
        assert_eq!(outcome.coins_spent, 30);

        let (wallet, coins) = repo.energy_wallet(profile.id).await.unwrap();
        assert_eq!(wallet.energy, 70);
        assert_eq!(coins, STARTING_COINS - 30);

        // 70 coins left: the large pack is out of reach
        let err = repo
            .purchase_energy(profile.id, EnergyPack::Large, t0(), six_minutes())
            .await
            .unwrap_err();
        assert!(matches!(
            repository_error(&err),
            RepositoryError::Energy(EnergyError::InsufficientCoins { needed: 80, .. })
        ));

        let (_, coins) = repo.energy_wallet(profile.id).await.unwrap();
        assert_eq!(coins, STARTING_COINS - 30);
    }

    #[tokio::test]
    async fn test_purchase_rejected_when_full() {
        let repo = setup_test_db().await;
        let profile = create(&repo, "Mia").await;

        let err = repo
            .purchase_energy(profile.id, EnergyPack::Small, t0(), six_minutes())
            .await
            .unwrap_err();
        assert!(matches!(
            repository_error(&err),
            RepositoryError::Energy(EnergyError::AlreadyFull)
        ));
    }

    #[tokio::test]
    async fn test_study_charges_energy_and_credits_xp_together() {
        let repo = setup_test_db().await;
        let profile = create(&repo, "Mia").await;

        let outcome = repo
            .complete_study(profile.id, study(10, 60, 120), t0(), six_minutes())
            .await
            .unwrap();
        assert_eq!(outcome.wallet.energy, 90);
        assert_eq!(outcome.profile.words_studied, 60);
        assert_eq!(outcome.profile.xp, 120);
        assert_eq!(outcome.profile.level, 2);

        let stored = repo.get(profile.id).await.unwrap();
        assert_eq!(stored.energy, 90);
        assert_eq!(stored.xp, 120);
    }

    #[tokio::test]
    async fn test_study_without_energy_changes_nothing() {
        let repo = setup_test_db().await;
        let profile = create(&repo, "Mia").await;

        let err = repo
            .complete_study(profile.id, study(150, 10, 20), t0(), six_minutes())
            .await
            .unwrap_err();
        assert!(matches!(
            repository_error(&err),
            RepositoryError::Energy(EnergyError::InsufficientEnergy { .. })
        ));

        let stored = repo.get(profile.id).await.unwrap();
        assert_eq!(stored.energy, 100);
        assert_eq!(stored.words_studied, 0);
        assert_eq!(stored.xp, 0);
    }

    #[tokio::test]
    async fn test_best_win_streak_only_rises() {
        let repo = setup_test_db().await;
        let profile = create(&repo, "Mia").await;

        assert!(repo.update_best_win_streak(profile.id, 3).await.unwrap());
        assert!(!repo.update_best_win_streak(profile.id, 2).await.unwrap());
        assert_eq!(repo.get(profile.id).await.unwrap().best_win_streak, 3);
    }

    #[tokio::test]
    async fn test_add_coins() {
        let repo = setup_test_db().await;
        let mia = create(&repo, "Mia").await;
        let leo = create(&repo, "Leo").await;

        let updated = repo.add_coins(Some(&[mia.id]), 40).await.unwrap();
        assert_eq!(updated, 1);
        assert_eq!(repo.get(mia.id).await.unwrap().coins, STARTING_COINS + 40);
        assert_eq!(repo.get(leo.id).await.unwrap().coins, STARTING_COINS);

        assert_eq!(repo.add_coins(None, 5).await.unwrap(), 2);
        assert!(repo.add_coins(None, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_leaderboards() {
        let repo = setup_test_db().await;
        let mia = create(&repo, "Mia").await;
        let leo = create(&repo, "Leo").await;
        let ana = create(&repo, "Ana").await;

        repo.record_study(leo.id, 10, 300).await.unwrap();
        repo.record_study(mia.id, 10, 100).await.unwrap();

        let xp = repo.xp_leaderboard(10).await.unwrap();
        let names: Vec<_> = xp.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["Leo", "Mia", "Ana"]);
        assert_eq!(xp[0].rank, 1);

        assert_eq!(repo.xp_rank(leo.id).await.unwrap(), Some(1));
        assert_eq!(repo.xp_rank(ana.id).await.unwrap(), Some(3));
        assert_eq!(repo.xp_rank(Uuid::new_v4()).await.unwrap(), None);

        let free = |outcome| MatchResultUpdate {
            kind: MatchKind::Free,
            outcome,
            xp: 0,
            coins: 0,
        };
        // Ana: 1/1, Leo: 3/5
        repo.apply_match_result(ana.id, free(MatchOutcome::Win)).await.unwrap();
        for outcome in [
            MatchOutcome::Win,
            MatchOutcome::Win,
            MatchOutcome::Win,
            MatchOutcome::Loss,
            MatchOutcome::Loss,
        ] {
            repo.apply_match_result(leo.id, free(outcome)).await.unwrap();
        }

        let rates = repo.win_rate_leaderboard(10).await.unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].display_name, "Leo");
        assert!(rates[0].qualified);
        assert_eq!(rates[0].win_rate, 60.0);
        assert_eq!(rates[1].display_name, "Ana");
        assert!(!rates[1].qualified);

        let ranked = MatchResultUpdate {
            kind: MatchKind::Ranked,
            outcome: MatchOutcome::Win,
            xp: 0,
            coins: 0,
        };
        repo.apply_match_result(mia.id, ranked).await.unwrap();
        let ladder = repo.ranked_leaderboard(2).await.unwrap();
        assert_eq!(ladder.len(), 2);
        assert_eq!(ladder[0].display_name, "Mia");
        assert_eq!(ladder[0].rank_points, 25);
    }
}
