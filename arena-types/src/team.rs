use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TeamRole {
    Member,
    Officer,
    Leader,
}

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Member => "member",
            TeamRole::Officer => "officer",
            TeamRole::Leader => "leader",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "member" => Some(TeamRole::Member),
            "officer" => Some(TeamRole::Officer),
            "leader" => Some(TeamRole::Leader),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub leader_id: Uuid,
    pub total_xp: i32,
    pub total_wins: i32,
    pub member_count: i32,
    pub rank_position: Option<i32>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TeamMember {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub role: TeamRole,
    pub contributed_xp: i32,
    pub contributed_wins: i32,
    pub joined_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TeamDetails {
    pub team: Team,
    pub members: Vec<TeamMember>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ApplicationStatus::Pending),
            "approved" => Some(ApplicationStatus::Approved),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TeamApplication {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub status: ApplicationStatus,
    pub created_at: String,
}
