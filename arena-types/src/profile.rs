use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Named rank bracket derived from accumulated rank points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Master,
    Champion,
}

impl Tier {
    pub const ALL: [Tier; 7] = [
        Tier::Bronze,
        Tier::Silver,
        Tier::Gold,
        Tier::Platinum,
        Tier::Diamond,
        Tier::Master,
        Tier::Champion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
            Tier::Platinum => "platinum",
            Tier::Diamond => "diamond",
            Tier::Master => "master",
            Tier::Champion => "champion",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.as_str() == value)
    }
}

/// A user's persistent gameplay record (distinct from the auth identity).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Profile {
    pub id: Uuid,
    pub display_name: String,
    pub grade: i32,
    pub level: i32,
    pub xp: i32,
    pub coins: i32,
    pub energy: i32,
    pub max_energy: i32,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub free_wins: i32,
    pub free_matches: i32,
    pub words_studied: i32,
    pub best_win_streak: i32,
    pub rank_tier: Tier,
    pub rank_points: i32,
    pub created_at: String, // ISO 8601 string
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: Uuid,
    pub display_name: String,
    pub level: i32,
    pub xp: i32,
    pub rank_tier: Tier,
    pub rank_points: i32,
    pub wins: i32,
    pub matches: i32,
    /// Percentage in `0..=100`, rounded to one decimal place.
    pub win_rate: f64,
    /// False when the player has not yet played enough matches to be ranked by rate.
    pub qualified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StreakKind {
    Win,
    Loss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StreakSummary {
    pub current_streak: u32,
    pub current_kind: Option<StreakKind>,
    pub best_win_streak: u32,
    pub best_loss_streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum EnergyPack {
    Small,
    Large,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EnergyStatus {
    pub energy: i32,
    pub max_energy: i32,
    pub coins: i32,
    /// Seconds until the next point regenerates, `None` when full.
    pub next_point_in_seconds: Option<i64>,
}
