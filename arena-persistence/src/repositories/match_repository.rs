use anyhow::{Context, Result};
use arena_core::{decode_legacy, encode_legacy};
use arena_types::{MatchKind, MatchOutcome, MatchRecord, MatchStatus, ScoreCard, WordEntry};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{matches, prelude::*};
use crate::error::RepositoryError;

pub struct MatchRepository {
    db: DatabaseConnection,
}

#[derive(Debug, Clone)]
pub struct NewMatch {
    pub id: Uuid,
    pub kind: MatchKind,
    pub player1_id: Uuid,
    /// `None` when playing against the AI.
    pub player2_id: Option<Uuid>,
    pub words: Vec<WordEntry>,
}

fn model_to_record(model: matches::Model) -> Result<MatchRecord> {
    let kind = MatchKind::parse(&model.kind)
        .with_context(|| format!("match {} has unknown kind '{}'", model.id, model.kind))?;
    let status = MatchStatus::parse(&model.status)
        .with_context(|| format!("match {} has unknown status '{}'", model.id, model.status))?;
    let words: Vec<WordEntry> = serde_json::from_str(&model.words)
        .with_context(|| format!("match {} has an unreadable word list", model.id))?;

    Ok(MatchRecord {
        id: model.id,
        kind,
        status,
        player1_id: model.player1_id,
        player2_id: model.player2_id,
        player1_score: decode_legacy(model.player1_score).map_err(RepositoryError::from)?,
        player2_score: decode_legacy(model.player2_score).map_err(RepositoryError::from)?,
        winner_id: model.winner_id,
        words,
        created_at: model.created_at.to_rfc3339(),
        completed_at: model.completed_at.map(|at| at.to_rfc3339()),
    })
}

fn involving(user_id: Uuid) -> Condition {
    Condition::any()
        .add(matches::Column::Player1Id.eq(user_id))
        .add(matches::Column::Player2Id.eq(user_id))
}

impl MatchRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Record a match that is starting now.
    pub async fn create_match(&self, new: NewMatch, now: DateTime<Utc>) -> Result<MatchRecord> {
        let words = serde_json::to_string(&new.words)?;
        let model = matches::ActiveModel {
            id: Set(new.id),
            kind: Set(new.kind.as_str().to_string()),
            status: Set(MatchStatus::InProgress.as_str().to_string()),
            player1_id: Set(new.player1_id),
            player2_id: Set(new.player2_id),
            player1_score: Set(0),
            player2_score: Set(0),
            winner_id: Set(None),
            words: Set(words),
            created_at: Set(now.into()),
            completed_at: Set(None),
        };

        Matches::insert(model).exec(&self.db).await?;
        info!("Created {} match {}", new.kind.as_str(), new.id);

        self.find_by_id(new.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created match"))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<MatchRecord>> {
        Matches::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_record)
            .transpose()
    }

    /// Store intermediate scores of a running match.
    pub async fn record_progress(
        &self,
        id: Uuid,
        player1: &ScoreCard,
        player2: &ScoreCard,
    ) -> Result<bool> {
        let result = Matches::update_many()
            .col_expr(
                matches::Column::Player1Score,
                Expr::value(encode_legacy(player1).map_err(RepositoryError::from)?),
            )
            .col_expr(
                matches::Column::Player2Score,
                Expr::value(encode_legacy(player2).map_err(RepositoryError::from)?),
            )
            .filter(matches::Column::Id.eq(id))
            .filter(matches::Column::Status.eq(MatchStatus::InProgress.as_str()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Close a match. Returns `false` when it was already completed, so the
    /// caller knows rewards have been handed out before.
    pub async fn complete_match(
        &self,
        id: Uuid,
        player1: &ScoreCard,
        player2: &ScoreCard,
        winner_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = Matches::update_many()
            .col_expr(
                matches::Column::Status,
                Expr::value(MatchStatus::Completed.as_str()),
            )
            .col_expr(
                matches::Column::Player1Score,
                Expr::value(encode_legacy(player1).map_err(RepositoryError::from)?),
            )
            .col_expr(
                matches::Column::Player2Score,
                Expr::value(encode_legacy(player2).map_err(RepositoryError::from)?),
            )
            .col_expr(matches::Column::WinnerId, Expr::value(winner_id))
            .col_expr(matches::Column::CompletedAt, Expr::value(now.fixed_offset()))
            .filter(matches::Column::Id.eq(id))
            .filter(matches::Column::Status.ne(MatchStatus::Completed.as_str()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            warn!("Match {} was already completed or does not exist", id);
            return Ok(false);
        }
        info!("Completed match {}", id);
        Ok(true)
    }

    /// Completed matches of a player, most recent first.
    pub async fn history_for(&self, user_id: Uuid, limit: u64) -> Result<Vec<MatchRecord>> {
        let models = Matches::find()
            .filter(involving(user_id))
            .filter(matches::Column::Status.eq(MatchStatus::Completed.as_str()))
            .order_by_desc(matches::Column::CompletedAt)
            .limit(limit)
            .all(&self.db)
            .await?;

        models.into_iter().map(model_to_record).collect()
    }

    /// Outcomes of the player's latest completed matches, most recent first.
    pub async fn recent_outcomes(&self, user_id: Uuid, limit: u64) -> Result<Vec<MatchOutcome>> {
        let history = self.history_for(user_id, limit).await?;
        Ok(history
            .iter()
            .filter_map(|record| record.outcome_for(user_id))
            .collect())
    }

    /// Matches left running, e.g. by a server restart.
    pub async fn unfinished(&self) -> Result<Vec<MatchRecord>> {
        let models = Matches::find()
            .filter(matches::Column::Status.ne(MatchStatus::Completed.as_str()))
            .all(&self.db)
            .await?;

        models.into_iter().map(model_to_record).collect()
    }
}
