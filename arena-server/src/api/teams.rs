use arena_persistence::MemberRemoval;
use arena_types::{ServerMessage, TeamRole};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::api::{ApiRoute, LimitQuery, authed, boxed, json_body, with_state};
use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, reject};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub approve: bool,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: TeamRole,
}

#[derive(Debug, Serialize)]
pub struct RemovalResponse {
    pub result: &'static str,
}

fn removal_label(removal: MemberRemoval) -> &'static str {
    match removal {
        MemberRemoval::Left => "left",
        MemberRemoval::Kicked => "kicked",
        MemberRemoval::Disbanded => "disbanded",
    }
}

pub fn routes(state: &AppState) -> ApiRoute {
    let create = warp::path!("api" / "teams")
        .and(warp::post())
        .and(authed(state))
        .and(json_body())
        .and_then(handle_create_team);

    let list = warp::path!("api" / "teams")
        .and(warp::get())
        .and(warp::query::<LimitQuery>())
        .and(with_state(state.clone()))
        .and_then(handle_list_teams);

    let mine = warp::path!("api" / "teams" / "mine")
        .and(warp::get())
        .and(authed(state))
        .and_then(handle_my_team);

    let review = warp::path!("api" / "teams" / "applications" / Uuid)
        .and(warp::post())
        .and(authed(state))
        .and(json_body())
        .and_then(handle_review_application);

    let details = warp::path!("api" / "teams" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_team_details);

    let apply = warp::path!("api" / "teams" / Uuid / "applications")
        .and(warp::post())
        .and(authed(state))
        .and_then(handle_apply);

    let applications = warp::path!("api" / "teams" / Uuid / "applications")
        .and(warp::get())
        .and(authed(state))
        .and_then(handle_pending_applications);

    let change_role = warp::path!("api" / "teams" / Uuid / "members" / Uuid / "role")
        .and(warp::put())
        .and(authed(state))
        .and(json_body())
        .and_then(handle_change_role);

    let remove = warp::path!("api" / "teams" / Uuid / "members" / Uuid)
        .and(warp::delete())
        .and(authed(state))
        .and_then(handle_remove_member);

    boxed(create)
        .or(boxed(list))
        .unify()
        .or(boxed(mine))
        .unify()
        .or(boxed(review))
        .unify()
        .or(boxed(details))
        .unify()
        .or(boxed(apply))
        .unify()
        .or(boxed(applications))
        .unify()
        .or(boxed(change_role))
        .unify()
        .or(boxed(remove))
        .unify()
        .boxed()
}

async fn handle_create_team(
    user: AuthenticatedUser,
    state: AppState,
    request: CreateTeamRequest,
) -> Result<impl Reply, Rejection> {
    let details = state
        .teams
        .create_team(user.id, &request.name, Utc::now())
        .await
        .map_err(reject)?;
    Ok(warp::reply::with_status(
        warp::reply::json(&details),
        StatusCode::CREATED,
    ))
}

async fn handle_list_teams(query: LimitQuery, state: AppState) -> Result<impl Reply, Rejection> {
    let teams = state
        .teams
        .list_teams(query.clamped() as usize)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&teams))
}

async fn handle_my_team(user: AuthenticatedUser, state: AppState) -> Result<impl Reply, Rejection> {
    let membership = state
        .teams
        .membership(user.id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(ApiError::not_found("you are not in a team")))?;
    let details = state
        .teams
        .find_details(membership.team_id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(ApiError::not_found("team not found")))?;
    Ok(warp::reply::json(&details))
}

async fn handle_team_details(team_id: Uuid, state: AppState) -> Result<impl Reply, Rejection> {
    let details = state
        .teams
        .find_details(team_id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(ApiError::not_found("team not found")))?;
    Ok(warp::reply::json(&details))
}

async fn handle_apply(
    team_id: Uuid,
    user: AuthenticatedUser,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let application = state
        .teams
        .apply(team_id, user.id, Utc::now())
        .await
        .map_err(reject)?;

    // Everyone who may review the application hears about it
    if let Some(details) = state.teams.find_details(team_id).await.map_err(reject)? {
        for reviewer in details
            .members
            .iter()
            .filter(|member| member.role >= TeamRole::Officer)
        {
            state
                .connections
                .notify_user(
                    reviewer.user_id,
                    ServerMessage::TeamApplicationReceived {
                        application: application.clone(),
                    },
                )
                .await;
        }
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&application),
        StatusCode::CREATED,
    ))
}

async fn handle_pending_applications(
    team_id: Uuid,
    user: AuthenticatedUser,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let applications = state
        .teams
        .pending_applications(team_id, user.id)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&applications))
}

async fn handle_review_application(
    application_id: Uuid,
    user: AuthenticatedUser,
    state: AppState,
    request: ReviewRequest,
) -> Result<impl Reply, Rejection> {
    let application = state
        .teams
        .review_application(application_id, user.id, request.approve, Utc::now())
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&application))
}

async fn handle_change_role(
    team_id: Uuid,
    target: Uuid,
    user: AuthenticatedUser,
    state: AppState,
    request: RoleRequest,
) -> Result<impl Reply, Rejection> {
    if request.role == TeamRole::Leader {
        let details = state
            .teams
            .transfer_leadership(team_id, user.id, target)
            .await
            .map_err(reject)?;
        return Ok(warp::reply::json(&details));
    }

    state
        .teams
        .change_role(team_id, user.id, target, request.role)
        .await
        .map_err(reject)?;
    let details = state
        .teams
        .find_details(team_id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(ApiError::not_found("team not found")))?;
    Ok(warp::reply::json(&details))
}

async fn handle_remove_member(
    team_id: Uuid,
    target: Uuid,
    user: AuthenticatedUser,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let removal = state
        .teams
        .remove_member(team_id, user.id, target)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&RemovalResponse {
        result: removal_label(removal),
    }))
}
