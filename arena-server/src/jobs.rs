use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use arena_core::previous_season_id;
use arena_types::{JobReport, ServerMessage};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::state::AppState;

/// Batch work that runs on a timer and can also be triggered over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    AwardSeasonRewards,
    UpdateChallengeStats,
    ExpireInvites,
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::AwardSeasonRewards => "award-season-rewards",
            Job::UpdateChallengeStats => "update-challenge-stats",
            Job::ExpireInvites => "expire-invites",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Job {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "award-season-rewards" => Ok(Job::AwardSeasonRewards),
            "update-challenge-stats" => Ok(Job::UpdateChallengeStats),
            "expire-invites" => Ok(Job::ExpireInvites),
            other => Err(format!("unknown job '{}'", other)),
        }
    }
}

/// Run one job to completion. Season rewards default to the season that
/// ended most recently.
pub async fn run_job(
    job: Job,
    state: &AppState,
    now: DateTime<Utc>,
    season_id: Option<String>,
) -> Result<JobReport> {
    let message = match job {
        Job::AwardSeasonRewards => {
            let season_id = season_id.unwrap_or_else(|| previous_season_id(now));
            let report = state.seasons.award_season_rewards(&season_id, now).await?;
            format!(
                "Season {}: awarded {} profiles {} coins, {} already paid",
                season_id, report.awarded, report.coins, report.skipped
            )
        }
        Job::UpdateChallengeStats => {
            let teams = state.teams.recompute_standings().await?;
            format!("Recomputed standings for {} teams", teams)
        }
        Job::ExpireInvites => {
            let expired = state.social.expire_invites(now).await?;
            for invite in &expired {
                for party in [invite.from_user_id, invite.to_user_id] {
                    state
                        .connections
                        .notify_user(
                            party,
                            ServerMessage::InviteUpdated {
                                invite: invite.clone(),
                            },
                        )
                        .await;
                }
            }
            format!("Expired {} invites", expired.len())
        }
    };

    info!("Job {} finished: {}", job, message);
    Ok(JobReport {
        success: true,
        message,
    })
}
