use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::Tier;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SeasonReward {
    pub season_id: String,
    pub user_id: Uuid,
    pub tier: Tier,
    pub coins: i32,
    pub awarded_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MilestoneMetric {
    Wins,
    Matches,
    WordsStudied,
    WinStreak,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MilestoneProgress {
    pub key: String,
    pub metric: MilestoneMetric,
    pub target: u32,
    pub current: u32,
    pub progress_percent: u32,
    pub completed: bool,
}

/// Result body of a batch job, mirroring the serverless function contract.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct JobReport {
    pub success: bool,
    pub message: String,
}
