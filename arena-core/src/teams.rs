use std::collections::HashMap;
use std::sync::LazyLock;

use arena_types::TeamRole;
use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

pub const MAX_TEAM_MEMBERS: usize = 30;

static TEAM_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{N} _-]{2,20}$").expect("team name pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeamError {
    #[error("team names must be 2-20 letters, digits, spaces, '_' or '-'")]
    InvalidName,
    #[error("team is full ({0} members)")]
    TeamFull(usize),
    #[error("your role does not allow this action")]
    NotPermitted,
    #[error("the leader must transfer leadership before leaving")]
    LeaderMustTransfer,
    #[error("cannot target yourself with this action")]
    SelfTarget,
    #[error("use a leadership transfer to appoint a new leader")]
    UseTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamAction {
    ReviewApplication,
    KickMember,
    ChangeRole,
    TransferLeadership,
}

pub fn can_perform(role: TeamRole, action: TeamAction) -> bool {
    match action {
        TeamAction::ReviewApplication | TeamAction::KickMember => {
            matches!(role, TeamRole::Leader | TeamRole::Officer)
        }
        TeamAction::ChangeRole | TeamAction::TransferLeadership => role == TeamRole::Leader,
    }
}

/// Normalize and validate a team name.
pub fn validate_team_name(name: &str) -> Result<String, TeamError> {
    let trimmed = name.trim();
    if TEAM_NAME.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(TeamError::InvalidName)
    }
}

pub fn check_capacity(member_count: usize) -> Result<(), TeamError> {
    if member_count >= MAX_TEAM_MEMBERS {
        Err(TeamError::TeamFull(member_count))
    } else {
        Ok(())
    }
}

/// Officers may only remove plain members; the leader may remove anyone else.
pub fn check_kick(actor: TeamRole, target: TeamRole, is_self: bool) -> Result<(), TeamError> {
    if is_self {
        return Err(TeamError::SelfTarget);
    }
    if !can_perform(actor, TeamAction::KickMember) || target >= actor {
        return Err(TeamError::NotPermitted);
    }
    Ok(())
}

pub fn check_role_change(actor: TeamRole, new_role: TeamRole, is_self: bool) -> Result<(), TeamError> {
    if !can_perform(actor, TeamAction::ChangeRole) {
        return Err(TeamError::NotPermitted);
    }
    if is_self {
        return Err(TeamError::SelfTarget);
    }
    if new_role == TeamRole::Leader {
        return Err(TeamError::UseTransfer);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveEffect {
    Leave,
    /// The last member left, so the team goes away.
    Disband,
}

pub fn check_leave(role: TeamRole, member_count: usize) -> Result<LeaveEffect, TeamError> {
    if member_count <= 1 {
        return Ok(LeaveEffect::Disband);
    }
    if role == TeamRole::Leader {
        return Err(TeamError::LeaderMustTransfer);
    }
    Ok(LeaveEffect::Leave)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamStanding {
    pub team_id: Uuid,
    pub name: String,
    pub total_xp: i32,
    pub total_wins: i32,
}

/// Per-member contribution row as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution {
    pub team_id: Uuid,
    pub xp: i32,
    pub wins: i32,
}

/// Sum member contributions per team.
pub fn aggregate_contributions(contributions: &[Contribution]) -> HashMap<Uuid, (i32, i32)> {
    let mut totals: HashMap<Uuid, (i32, i32)> = HashMap::new();
    for contribution in contributions {
        let entry = totals.entry(contribution.team_id).or_default();
        entry.0 += contribution.xp;
        entry.1 += contribution.wins;
    }
    totals
}

/// Order teams by xp, then wins, then name, and assign 1-based positions.
pub fn rank_teams(mut teams: Vec<TeamStanding>) -> Vec<(TeamStanding, i32)> {
    teams.sort_by(|a, b| {
        b.total_xp
            .cmp(&a.total_xp)
            .then_with(|| b.total_wins.cmp(&a.total_wins))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.team_id.cmp(&b.team_id))
    });
    teams
        .into_iter()
        .enumerate()
        .map(|(index, team)| (team, index as i32 + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_name_validation() {
        assert_eq!(validate_team_name("  Word Wizards "), Ok("Word Wizards".to_string()));
        assert!(validate_team_name("单词战队").is_ok());
        assert!(validate_team_name("team_42-b").is_ok());
        assert_eq!(validate_team_name("A"), Err(TeamError::InvalidName));
        assert_eq!(validate_team_name("bad!name"), Err(TeamError::InvalidName));
        assert_eq!(
            validate_team_name("this name is way too long for a team"),
            Err(TeamError::InvalidName)
        );
    }

    #[test]
    fn test_permissions() {
        assert!(can_perform(TeamRole::Leader, TeamAction::ChangeRole));
        assert!(can_perform(TeamRole::Officer, TeamAction::ReviewApplication));
        assert!(!can_perform(TeamRole::Officer, TeamAction::TransferLeadership));
        assert!(!can_perform(TeamRole::Member, TeamAction::KickMember));
    }

    #[test]
    fn test_kick_rules() {
        assert!(check_kick(TeamRole::Officer, TeamRole::Member, false).is_ok());
        assert_eq!(
            check_kick(TeamRole::Officer, TeamRole::Officer, false),
            Err(TeamError::NotPermitted)
        );
        assert!(check_kick(TeamRole::Leader, TeamRole::Officer, false).is_ok());
        assert_eq!(
            check_kick(TeamRole::Leader, TeamRole::Leader, true),
            Err(TeamError::SelfTarget)
        );
        assert_eq!(
            check_kick(TeamRole::Member, TeamRole::Member, false),
            Err(TeamError::NotPermitted)
        );
    }

    #[test]
    fn test_role_changes() {
        assert!(check_role_change(TeamRole::Leader, TeamRole::Officer, false).is_ok());
        assert_eq!(
            check_role_change(TeamRole::Officer, TeamRole::Member, false),
            Err(TeamError::NotPermitted)
        );
        assert_eq!(
            check_role_change(TeamRole::Leader, TeamRole::Leader, false),
            Err(TeamError::UseTransfer)
        );
    }

    #[test]
    fn test_leave_rules() {
        assert_eq!(check_leave(TeamRole::Leader, 1), Ok(LeaveEffect::Disband));
        assert_eq!(check_leave(TeamRole::Leader, 3), Err(TeamError::LeaderMustTransfer));
        assert_eq!(check_leave(TeamRole::Member, 3), Ok(LeaveEffect::Leave));
    }

    #[test]
    fn test_capacity() {
        assert!(check_capacity(29).is_ok());
        assert_eq!(check_capacity(30), Err(TeamError::TeamFull(30)));
    }

    #[test]
    fn test_ranking_and_aggregation() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let totals = aggregate_contributions(&[
            Contribution {
                team_id: a,
                xp: 100,
                wins: 2,
            },
            Contribution {
                team_id: a,
                xp: 50,
                wins: 1,
            },
            Contribution {
                team_id: b,
                xp: 150,
                wins: 5,
            },
        ]);
        assert_eq!(totals[&a], (150, 3));
        assert_eq!(totals[&b], (150, 5));

        let ranked = rank_teams(vec![
            TeamStanding {
                team_id: a,
                name: "Alpha".into(),
                total_xp: 150,
                total_wins: 3,
            },
            TeamStanding {
                team_id: b,
                name: "Beta".into(),
                total_xp: 150,
                total_wins: 5,
            },
        ]);
        assert_eq!(ranked[0].0.name, "Beta");
        assert_eq!(ranked[0].1, 1);
        assert_eq!(ranked[1].1, 2);
    }
}
