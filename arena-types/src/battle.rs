use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{Tier, WordEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MatchKind {
    Ranked, // Affects tier and rank points
    Free,   // Unranked duel
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Ranked => "ranked",
            MatchKind::Free => "free",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ranked" => Some(MatchKind::Ranked),
            "free" => Some(MatchKind::Free),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MatchStatus {
    Pending,
    InProgress,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(MatchStatus::Pending),
            "in_progress" => Some(MatchStatus::InProgress),
            "completed" => Some(MatchStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MatchOutcome {
    Win,
    Loss,
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AiDifficulty {
    Easy,
    Normal,
    Hard,
}

/// Progress of one side of a duel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScoreCard {
    pub points: u32,
    pub questions_answered: u32,
    pub finished: bool,
}

/// A quiz question as shown to players; the correct choice is never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Question {
    pub index: u32,
    pub word: String,
    pub phonetic: Option<String>,
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SeatInfo {
    /// `None` for an AI opponent.
    pub user_id: Option<Uuid>,
    pub display_name: String,
    pub score: ScoreCard,
}

/// Persisted record of a duel. The word list is a denormalized snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MatchRecord {
    pub id: Uuid,
    pub kind: MatchKind,
    pub status: MatchStatus,
    pub player1_id: Uuid,
    /// `None` when the opponent was the AI.
    pub player2_id: Option<Uuid>,
    pub player1_score: ScoreCard,
    pub player2_score: ScoreCard,
    pub winner_id: Option<Uuid>,
    pub words: Vec<WordEntry>,
    pub created_at: String,           // ISO 8601 string
    pub completed_at: Option<String>, // ISO 8601 string
}

impl MatchRecord {
    /// Outcome of this match from the point of view of `user_id`.
    pub fn outcome_for(&self, user_id: Uuid) -> Option<MatchOutcome> {
        if self.status != MatchStatus::Completed {
            return None;
        }
        let involved = self.player1_id == user_id || self.player2_id == Some(user_id);
        if !involved {
            return None;
        }
        Some(match self.winner_id {
            Some(winner) if winner == user_id => MatchOutcome::Win,
            Some(_) => MatchOutcome::Loss,
            None if self.player1_score.points == self.player2_score.points => MatchOutcome::Draw,
            // AI won: nobody to name as winner
            None => MatchOutcome::Loss,
        })
    }
}

/// Live state of a battle, personalized for one participant.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BattleView {
    pub match_id: Uuid,
    pub kind: MatchKind,
    pub status: MatchStatus,
    pub you: SeatInfo,
    pub opponent: SeatInfo,
    pub questions: Vec<Question>,
    pub question_time_limit_seconds: u32,
    pub started_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AnswerResult {
    pub match_id: Uuid,
    pub question_index: u32,
    pub correct: bool,
    pub correct_choice: u32,
    pub points_earned: u32,
    pub score: ScoreCard,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BattleSummary {
    pub match_id: Uuid,
    pub kind: MatchKind,
    pub outcome: MatchOutcome,
    pub your_score: ScoreCard,
    pub opponent_score: ScoreCard,
    pub xp_gained: i32,
    pub coins_gained: i32,
    pub rank_points_delta: i32,
    pub rank_points: i32,
    pub rank_tier: Tier,
}
