use std::collections::HashMap;

use anyhow::Result;
use arena_core::{
    Contribution, LeaveEffect, TeamAction, TeamError, TeamStanding, aggregate_contributions,
    can_perform, check_capacity, check_kick, check_leave, check_role_change, rank_teams,
    validate_team_name,
};
use arena_types::{ApplicationStatus, Team, TeamApplication, TeamDetails, TeamMember, TeamRole};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QuerySelect, TransactionTrait, sea_query::Expr,
};
use tracing::info;
use uuid::Uuid;

use crate::entities::{prelude::*, profiles, team_applications, team_members, teams};
use crate::error::RepositoryError;

/// Add to a member's team contribution. False when the user has no team.
pub(crate) async fn credit_contribution<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    xp: i32,
    wins: i32,
) -> Result<bool> {
    let result = TeamMembers::update_many()
        .col_expr(
            team_members::Column::ContributedXp,
            Expr::col(team_members::Column::ContributedXp).add(xp),
        )
        .col_expr(
            team_members::Column::ContributedWins,
            Expr::col(team_members::Column::ContributedWins).add(wins),
        )
        .filter(team_members::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

pub struct TeamRepository {
    db: DatabaseConnection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRemoval {
    Left,
    Kicked,
    Disbanded,
}

fn role_of(model: &team_members::Model) -> TeamRole {
    TeamRole::parse(&model.role).unwrap_or(TeamRole::Member)
}

fn team_view(model: teams::Model, member_count: usize) -> Team {
    Team {
        id: model.id,
        name: model.name,
        leader_id: model.leader_id,
        total_xp: model.total_xp,
        total_wins: model.total_wins,
        member_count: member_count as i32,
        rank_position: model.rank_position,
        created_at: model.created_at.to_rfc3339(),
    }
}

fn member_view(model: team_members::Model, profile: Option<profiles::Model>) -> TeamMember {
    let role = role_of(&model);
    TeamMember {
        team_id: model.team_id,
        user_id: model.user_id,
        display_name: profile.map(|p| p.display_name).unwrap_or_default(),
        role,
        contributed_xp: model.contributed_xp,
        contributed_wins: model.contributed_wins,
        joined_at: model.joined_at.to_rfc3339(),
    }
}

fn application_view(model: team_applications::Model) -> TeamApplication {
    TeamApplication {
        id: model.id,
        team_id: model.team_id,
        user_id: model.user_id,
        status: ApplicationStatus::parse(&model.status).unwrap_or(ApplicationStatus::Pending),
        created_at: model.created_at.to_rfc3339(),
    }
}

async fn membership_of<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<Option<team_members::Model>> {
    Ok(TeamMembers::find_by_id(user_id).one(conn).await?)
}

/// The member row of `user_id`, which must belong to `team_id`.
async fn member_of_team<C: ConnectionTrait>(
    conn: &C,
    team_id: Uuid,
    user_id: Uuid,
) -> Result<team_members::Model> {
    membership_of(conn, user_id)
        .await?
        .filter(|member| member.team_id == team_id)
        .ok_or_else(|| RepositoryError::NotFound("team member").into())
}

async fn member_count<C: ConnectionTrait>(conn: &C, team_id: Uuid) -> Result<usize> {
    let count = TeamMembers::find()
        .filter(team_members::Column::TeamId.eq(team_id))
        .count(conn)
        .await?;
    Ok(count as usize)
}

async fn set_role<C: ConnectionTrait>(conn: &C, user_id: Uuid, role: TeamRole) -> Result<()> {
    TeamMembers::update_many()
        .col_expr(team_members::Column::Role, Expr::value(role.as_str()))
        .filter(team_members::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

impl TeamRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_team(
        &self,
        leader_id: Uuid,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<TeamDetails> {
        let name = validate_team_name(name).map_err(RepositoryError::from)?;
        let txn = self.db.begin().await?;

        if membership_of(&txn, leader_id).await?.is_some() {
            return Err(RepositoryError::Conflict("you are already in a team".to_string()).into());
        }
        let taken = Teams::find()
            .filter(teams::Column::Name.eq(name.as_str()))
            .one(&txn)
            .await?;
        if taken.is_some() {
            return Err(RepositoryError::Conflict(format!("team name '{}' is taken", name)).into());
        }

        let team_id = Uuid::new_v4();
        let now = now.fixed_offset();
        Teams::insert(teams::ActiveModel {
            id: Set(team_id),
            name: Set(name.clone()),
            leader_id: Set(leader_id),
            total_xp: Set(0),
            total_wins: Set(0),
            rank_position: Set(None),
            created_at: Set(now),
        })
        .exec(&txn)
        .await?;
        TeamMembers::insert(team_members::ActiveModel {
            user_id: Set(leader_id),
            team_id: Set(team_id),
            role: Set(TeamRole::Leader.as_str().to_string()),
            contributed_xp: Set(0),
            contributed_wins: Set(0),
            joined_at: Set(now),
        })
        .exec(&txn)
        .await?;

        txn.commit().await?;
        info!("Team '{}' created by {}", name, leader_id);

        self.find_details(team_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created team"))
    }

    pub async fn find_details(&self, team_id: Uuid) -> Result<Option<TeamDetails>> {
        let Some(team) = Teams::find_by_id(team_id).one(&self.db).await? else {
            return Ok(None);
        };

        let rows = TeamMembers::find()
            .filter(team_members::Column::TeamId.eq(team_id))
            .find_also_related(Profiles)
            .all(&self.db)
            .await?;

        let mut members: Vec<TeamMember> = rows
            .into_iter()
            .map(|(member, profile)| member_view(member, profile))
            .collect();
        members.sort_by(|a, b| {
            b.role
                .cmp(&a.role)
                .then_with(|| b.contributed_xp.cmp(&a.contributed_xp))
                .then_with(|| a.display_name.cmp(&b.display_name))
        });

        Ok(Some(TeamDetails {
            team: team_view(team, members.len()),
            members,
        }))
    }

    /// Teams in ranking order; teams not ranked yet come last by xp.
    pub async fn list_teams(&self, limit: usize) -> Result<Vec<Team>> {
        let team_ids: Vec<Uuid> = TeamMembers::find()
            .select_only()
            .column(team_members::Column::TeamId)
            .into_tuple()
            .all(&self.db)
            .await?;
        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        for team_id in team_ids {
            *counts.entry(team_id).or_default() += 1;
        }

        let mut models = Teams::find().all(&self.db).await?;
        models.sort_by(|a, b| {
            let position = |team: &teams::Model| team.rank_position.unwrap_or(i32::MAX);
            position(a)
                .cmp(&position(b))
                .then_with(|| b.total_xp.cmp(&a.total_xp))
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(models
            .into_iter()
            .take(limit)
            .map(|model| {
                let count = counts.get(&model.id).copied().unwrap_or_default();
                team_view(model, count)
            })
            .collect())
    }

    pub async fn membership(&self, user_id: Uuid) -> Result<Option<TeamMember>> {
        let Some(member) = membership_of(&self.db, user_id).await? else {
            return Ok(None);
        };
        let profile = Profiles::find_by_id(user_id).one(&self.db).await?;
        Ok(Some(member_view(member, profile)))
    }

    pub async fn apply(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<TeamApplication> {
        if Teams::find_by_id(team_id).one(&self.db).await?.is_none() {
            return Err(RepositoryError::NotFound("team").into());
        }
        if membership_of(&self.db, user_id).await?.is_some() {
            return Err(RepositoryError::Conflict("you are already in a team".to_string()).into());
        }
        let pending = TeamApplications::find()
            .filter(team_applications::Column::TeamId.eq(team_id))
            .filter(team_applications::Column::UserId.eq(user_id))
            .filter(team_applications::Column::Status.eq(ApplicationStatus::Pending.as_str()))
            .one(&self.db)
            .await?;
        if pending.is_some() {
            return Err(
                RepositoryError::Conflict("application already pending".to_string()).into(),
            );
        }
        check_capacity(member_count(&self.db, team_id).await?).map_err(RepositoryError::from)?;

        let model = team_applications::ActiveModel {
            id: Set(Uuid::new_v4()),
            team_id: Set(team_id),
            user_id: Set(user_id),
            status: Set(ApplicationStatus::Pending.as_str().to_string()),
            created_at: Set(now.fixed_offset()),
        };
        let saved = TeamApplications::insert(model).exec(&self.db).await?;
        info!("{} applied to team {}", user_id, team_id);

        let created = TeamApplications::find_by_id(saved.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created application"))?;
        Ok(application_view(created))
    }

    pub async fn pending_applications(
        &self,
        team_id: Uuid,
        actor: Uuid,
    ) -> Result<Vec<TeamApplication>> {
        let member = member_of_team(&self.db, team_id, actor).await?;
        if !can_perform(role_of(&member), TeamAction::ReviewApplication) {
            return Err(RepositoryError::from(TeamError::NotPermitted).into());
        }

        let models = TeamApplications::find()
            .filter(team_applications::Column::TeamId.eq(team_id))
            .filter(team_applications::Column::Status.eq(ApplicationStatus::Pending.as_str()))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(application_view).collect())
    }

    pub async fn review_application(
        &self,
        application_id: Uuid,
        actor: Uuid,
        approve: bool,
        now: DateTime<Utc>,
    ) -> Result<TeamApplication> {
        let txn = self.db.begin().await?;

        let application = TeamApplications::find_by_id(application_id)
            .one(&txn)
            .await?
            .ok_or(RepositoryError::NotFound("application"))?;
        if application.status != ApplicationStatus::Pending.as_str() {
            return Err(
                RepositoryError::Conflict("application was already reviewed".to_string()).into(),
            );
        }

        let reviewer = member_of_team(&txn, application.team_id, actor).await?;
        if !can_perform(role_of(&reviewer), TeamAction::ReviewApplication) {
            return Err(RepositoryError::from(TeamError::NotPermitted).into());
        }

        let status = if approve {
            if membership_of(&txn, application.user_id).await?.is_some() {
                return Err(RepositoryError::Conflict(
                    "applicant has already joined a team".to_string(),
                )
                .into());
            }
            check_capacity(member_count(&txn, application.team_id).await?)
                .map_err(RepositoryError::from)?;

            TeamMembers::insert(team_members::ActiveModel {
                user_id: Set(application.user_id),
                team_id: Set(application.team_id),
                role: Set(TeamRole::Member.as_str().to_string()),
                contributed_xp: Set(0),
                contributed_wins: Set(0),
                joined_at: Set(now.fixed_offset()),
            })
            .exec(&txn)
            .await?;
            ApplicationStatus::Approved
        } else {
            ApplicationStatus::Rejected
        };

        TeamApplications::update_many()
            .col_expr(team_applications::Column::Status, Expr::value(status.as_str()))
            .filter(team_applications::Column::Id.eq(application_id))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        info!(
            "Application {} {} by {}",
            application_id,
            status.as_str(),
            actor
        );
        Ok(TeamApplication {
            status,
            ..application_view(application)
        })
    }

    pub async fn change_role(
        &self,
        team_id: Uuid,
        actor: Uuid,
        target: Uuid,
        new_role: TeamRole,
    ) -> Result<TeamMember> {
        let actor_member = member_of_team(&self.db, team_id, actor).await?;
        check_role_change(role_of(&actor_member), new_role, actor == target)
            .map_err(RepositoryError::from)?;
        member_of_team(&self.db, team_id, target).await?;

        set_role(&self.db, target, new_role).await?;
        info!("{} set role of {} to {}", actor, target, new_role.as_str());

        self.membership(target)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("team member").into())
    }

    /// Hand the team over to `target`; the previous leader becomes an officer.
    pub async fn transfer_leadership(
        &self,
        team_id: Uuid,
        actor: Uuid,
        target: Uuid,
    ) -> Result<TeamDetails> {
        let txn = self.db.begin().await?;

        let leader = member_of_team(&txn, team_id, actor).await?;
        if !can_perform(role_of(&leader), TeamAction::TransferLeadership) {
            return Err(RepositoryError::from(TeamError::NotPermitted).into());
        }
        if actor == target {
            return Err(RepositoryError::from(TeamError::SelfTarget).into());
        }
        member_of_team(&txn, team_id, target).await?;

        set_role(&txn, actor, TeamRole::Officer).await?;
        set_role(&txn, target, TeamRole::Leader).await?;
        Teams::update_many()
            .col_expr(teams::Column::LeaderId, Expr::value(target))
            .filter(teams::Column::Id.eq(team_id))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        info!("Leadership of team {} passed from {} to {}", team_id, actor, target);

        self.find_details(team_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("team").into())
    }

    /// Kick `target`, or leave the team when `actor == target`.
    pub async fn remove_member(
        &self,
        team_id: Uuid,
        actor: Uuid,
        target: Uuid,
    ) -> Result<MemberRemoval> {
        let txn = self.db.begin().await?;
        let actor_member = member_of_team(&txn, team_id, actor).await?;

        let removal = if actor == target {
            let count = member_count(&txn, team_id).await?;
            match check_leave(role_of(&actor_member), count).map_err(RepositoryError::from)? {
                LeaveEffect::Leave => MemberRemoval::Left,
                LeaveEffect::Disband => MemberRemoval::Disbanded,
            }
        } else {
            let target_member = member_of_team(&txn, team_id, target).await?;
            check_kick(role_of(&actor_member), role_of(&target_member), false)
                .map_err(RepositoryError::from)?;
            MemberRemoval::Kicked
        };

        TeamMembers::delete_by_id(target).exec(&txn).await?;
        if removal == MemberRemoval::Disbanded {
            TeamApplications::delete_many()
                .filter(team_applications::Column::TeamId.eq(team_id))
                .exec(&txn)
                .await?;
            Teams::delete_by_id(team_id).exec(&txn).await?;
        }
        txn.commit().await?;

        info!("{} removed from team {} ({:?})", target, team_id, removal);
        Ok(removal)
    }

    /// Credit xp and wins earned by `user_id` to their team, if any.
    pub async fn add_contribution(&self, user_id: Uuid, xp: i32, wins: i32) -> Result<bool> {
        credit_contribution(&self.db, user_id, xp, wins).await
    }

    /// Rebuild team totals from member contributions and assign rank positions.
    /// Running it twice yields the same result.
    pub async fn recompute_standings(&self) -> Result<usize> {
        let txn = self.db.begin().await?;

        let contributions: Vec<Contribution> = TeamMembers::find()
            .all(&txn)
            .await?
            .into_iter()
            .map(|member| Contribution {
                team_id: member.team_id,
                xp: member.contributed_xp,
                wins: member.contributed_wins,
            })
            .collect();
        let totals = aggregate_contributions(&contributions);

        let standings: Vec<TeamStanding> = Teams::find()
            .all(&txn)
            .await?
            .into_iter()
            .map(|team| {
                let (total_xp, total_wins) = totals.get(&team.id).copied().unwrap_or_default();
                TeamStanding {
                    team_id: team.id,
                    name: team.name,
                    total_xp,
                    total_wins,
                }
            })
            .collect();

        let ranked = rank_teams(standings);
        for (standing, position) in &ranked {
            Teams::update_many()
                .col_expr(teams::Column::TotalXp, Expr::value(standing.total_xp))
                .col_expr(teams::Column::TotalWins, Expr::value(standing.total_wins))
                .col_expr(teams::Column::RankPosition, Expr::value(*position))
                .filter(teams::Column::Id.eq(standing.team_id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        info!("Recomputed standings for {} teams", ranked.len());
        Ok(ranked.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use crate::{NewProfile, ProfileRepository, StudyCharge};
    use chrono::{Duration, TimeZone};
    use migration::{Migrator, MigratorTrait};

    struct Setup {
        teams: TeamRepository,
        profiles: ProfileRepository,
    }

    async fn setup_test_db() -> Setup {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        Setup {
            teams: TeamRepository::new(db.clone()),
            profiles: ProfileRepository::new(db),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
    }

    async fn player(setup: &Setup, name: &str) -> Uuid {
        setup
            .profiles
            .create_profile(
                NewProfile {
                    id: Uuid::new_v4(),
                    display_name: name.to_string(),
                    grade: 4,
                    max_energy: 100,
                },
                t0(),
            )
            .await
            .unwrap()
            .id
    }

    fn error(err: &anyhow::Error) -> &RepositoryError {
        err.downcast_ref::<RepositoryError>()
            .expect("expected a repository error")
    }

    /// A team led by the first player with the others approved as members.
    async fn team_with(setup: &Setup, leader: Uuid, members: &[Uuid]) -> Uuid {
        let team = setup
            .teams
            .create_team(leader, "Word Wizards", t0())
            .await
            .unwrap();
        for member in members {
            let application = setup.teams.apply(team.team.id, *member, t0()).await.unwrap();
            setup
                .teams
                .review_application(application.id, leader, true, t0())
                .await
                .unwrap();
        }
        team.team.id
    }

    #[tokio::test]
    async fn test_create_team() {
        let setup = setup_test_db().await;
        let leader = player(&setup, "Mia").await;

        let details = setup
            .teams
            .create_team(leader, " Word Wizards ", t0())
            .await
            .unwrap();
        assert_eq!(details.team.name, "Word Wizards");
        assert_eq!(details.team.member_count, 1);
        assert_eq!(details.members[0].role, TeamRole::Leader);
        assert_eq!(details.members[0].display_name, "Mia");

        // Same leader, second team
        let err = setup
            .teams
            .create_team(leader, "Other", t0())
            .await
            .unwrap_err();
        assert!(matches!(error(&err), RepositoryError::Conflict(_)));

        // Name taken
        let other = player(&setup, "Leo").await;
        let err = setup
            .teams
            .create_team(other, "Word Wizards", t0())
            .await
            .unwrap_err();
        assert!(matches!(error(&err), RepositoryError::Conflict(_)));

        let err = setup.teams.create_team(other, "x", t0()).await.unwrap_err();
        assert!(matches!(error(&err), RepositoryError::Team(TeamError::InvalidName)));
    }

    #[tokio::test]
    async fn test_application_flow() {
        let setup = setup_test_db().await;
        let leader = player(&setup, "Mia").await;
        let applicant = player(&setup, "Leo").await;
        let team_id = team_with(&setup, leader, &[]).await;

        let application = setup.teams.apply(team_id, applicant, t0()).await.unwrap();
        assert_eq!(application.status, ApplicationStatus::Pending);

        let err = setup.teams.apply(team_id, applicant, t0()).await.unwrap_err();
        assert!(matches!(error(&err), RepositoryError::Conflict(_)));

        // Applicants cannot review their own application
        let err = setup
            .teams
            .review_application(application.id, applicant, true, t0())
            .await
            .unwrap_err();
        assert!(matches!(error(&err), RepositoryError::NotFound(_)));

        let pending = setup
            .teams
            .pending_applications(team_id, leader)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);

        let reviewed = setup
            .teams
            .review_application(application.id, leader, true, t0())
            .await
            .unwrap();
        assert_eq!(reviewed.status, ApplicationStatus::Approved);

        let membership = setup.teams.membership(applicant).await.unwrap().unwrap();
        assert_eq!(membership.team_id, team_id);
        assert_eq!(membership.role, TeamRole::Member);

        let err = setup
            .teams
            .review_application(application.id, leader, true, t0())
            .await
            .unwrap_err();
        assert!(matches!(error(&err), RepositoryError::Conflict(_)));

        // Plain members cannot list applications
        let err = setup
            .teams
            .pending_applications(team_id, applicant)
            .await
            .unwrap_err();
        assert!(matches!(error(&err), RepositoryError::Team(TeamError::NotPermitted)));
    }

    #[tokio::test]
    async fn test_roles_and_kicks() {
        let setup = setup_test_db().await;
        let leader = player(&setup, "Mia").await;
        let officer = player(&setup, "Leo").await;
        let member = player(&setup, "Ana").await;
        let team_id = team_with(&setup, leader, &[officer, member]).await;

        let promoted = setup
            .teams
            .change_role(team_id, leader, officer, TeamRole::Officer)
            .await
            .unwrap();
        assert_eq!(promoted.role, TeamRole::Officer);

        let err = setup
            .teams
            .change_role(team_id, officer, member, TeamRole::Officer)
            .await
            .unwrap_err();
        assert!(matches!(error(&err), RepositoryError::Team(TeamError::NotPermitted)));

        let err = setup
            .teams
            .change_role(team_id, leader, member, TeamRole::Leader)
            .await
            .unwrap_err();
        assert!(matches!(error(&err), RepositoryError::Team(TeamError::UseTransfer)));

        // Officers cannot kick the leader, but can kick members
        let err = setup
            .teams
            .remove_member(team_id, officer, leader)
            .await
            .unwrap_err();
        assert!(matches!(error(&err), RepositoryError::Team(TeamError::NotPermitted)));

        let removal = setup
            .teams
            .remove_member(team_id, officer, member)
            .await
            .unwrap();
        assert_eq!(removal, MemberRemoval::Kicked);
        assert!(setup.teams.membership(member).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_leader_leaving_and_disband() {
        let setup = setup_test_db().await;
        let leader = player(&setup, "Mia").await;
        let member = player(&setup, "Leo").await;
        let team_id = team_with(&setup, leader, &[member]).await;

        let err = setup
            .teams
            .remove_member(team_id, leader, leader)
            .await
            .unwrap_err();
        assert!(matches!(
            error(&err),
            RepositoryError::Team(TeamError::LeaderMustTransfer)
        ));

        let details = setup
            .teams
            .transfer_leadership(team_id, leader, member)
            .await
            .unwrap();
        assert_eq!(details.team.leader_id, member);

        assert_eq!(
            setup.teams.remove_member(team_id, leader, leader).await.unwrap(),
            MemberRemoval::Left
        );
        assert_eq!(
            setup.teams.remove_member(team_id, member, member).await.unwrap(),
            MemberRemoval::Disbanded
        );
        assert!(setup.teams.find_details(team_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recompute_standings() {
        let setup = setup_test_db().await;
        let mia = player(&setup, "Mia").await;
        let leo = player(&setup, "Leo").await;
        let ana = player(&setup, "Ana").await;

        let wizards = team_with(&setup, mia, &[leo]).await;
        let owls = setup
            .teams
            .create_team(ana, "Night Owls", t0())
            .await
            .unwrap()
            .team
            .id;

        setup.teams.add_contribution(mia, 40, 1).await.unwrap();
        setup.teams.add_contribution(leo, 30, 1).await.unwrap();
        setup.teams.add_contribution(ana, 90, 3).await.unwrap();
        assert!(!setup.teams.add_contribution(Uuid::new_v4(), 5, 0).await.unwrap());

        assert_eq!(setup.teams.recompute_standings().await.unwrap(), 2);
        // Idempotent
        assert_eq!(setup.teams.recompute_standings().await.unwrap(), 2);

        let teams = setup.teams.list_teams(10).await.unwrap();
        assert_eq!(teams[0].id, owls);
        assert_eq!(teams[0].rank_position, Some(1));
        assert_eq!(teams[0].total_xp, 90);
        assert_eq!(teams[1].id, wizards);
        assert_eq!(teams[1].total_xp, 70);
        assert_eq!(teams[1].total_wins, 2);
        assert_eq!(teams[1].member_count, 2);
    }

    #[tokio::test]
    async fn test_study_credits_team_contribution() {
        let setup = setup_test_db().await;
        let mia = player(&setup, "Mia").await;
        team_with(&setup, mia, &[]).await;

        setup
            .profiles
            .complete_study(
                mia,
                StudyCharge {
                    energy_cost: 10,
                    words: 5,
                    xp: 10,
                },
                t0(),
                Duration::minutes(6),
            )
            .await
            .unwrap();

        let member = setup.teams.membership(mia).await.unwrap().unwrap();
        assert_eq!(member.contributed_xp, 10);
        assert_eq!(member.contributed_wins, 0);
    }
}
