use arena_core::is_valid_season_id;
use arena_types::JobReport;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::api::{ApiRoute, authed, boxed, json_body};
use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, reject};
use crate::jobs::{Job, run_job};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DistributeCoinsRequest {
    pub amount: i32,
    /// Everyone when absent.
    pub user_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize)]
pub struct DistributeCoinsResponse {
    pub updated: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct FunctionQuery {
    pub season_id: Option<String>,
}

pub fn routes(state: &AppState) -> ApiRoute {
    let coins = warp::path!("api" / "admin" / "coins")
        .and(warp::post())
        .and(authed(state))
        .and(json_body())
        .and_then(handle_distribute_coins);

    let functions = warp::path!("functions" / String)
        .and(warp::post())
        .and(authed(state))
        .and(warp::query::<FunctionQuery>())
        .and_then(handle_run_function);

    boxed(coins).or(boxed(functions)).unify().boxed()
}

fn require_admin(user: &AuthenticatedUser) -> Result<(), Rejection> {
    if user.is_admin {
        Ok(())
    } else {
        Err(reject(ApiError::forbidden("admin role required")))
    }
}

async fn handle_distribute_coins(
    user: AuthenticatedUser,
    state: AppState,
    request: DistributeCoinsRequest,
) -> Result<impl Reply, Rejection> {
    require_admin(&user)?;

    let updated = state
        .profiles
        .add_coins(request.user_ids.as_deref(), request.amount)
        .await
        .map_err(reject)?;
    info!(
        "Admin {} granted {} coins to {} profiles",
        user.id, request.amount, updated
    );
    Ok(warp::reply::json(&DistributeCoinsResponse { updated }))
}

async fn handle_run_function(
    name: String,
    user: AuthenticatedUser,
    state: AppState,
    query: FunctionQuery,
) -> Result<impl Reply, Rejection> {
    require_admin(&user)?;
    let job: Job = name
        .parse()
        .map_err(|e: String| reject(ApiError::NotFound(e)))?;
    if let Some(season_id) = query.season_id.as_deref() {
        if !is_valid_season_id(season_id) {
            return Err(reject(ApiError::Unprocessable(format!(
                "season_id must look like 2024-05, got {}",
                season_id
            ))));
        }
    }

    match run_job(job, &state, Utc::now(), query.season_id).await {
        Ok(report) => Ok(warp::reply::with_status(
            warp::reply::json(&report),
            StatusCode::OK,
        )),
        Err(e) => {
            error!("Job {} failed: {:#}", job, e);
            Ok(warp::reply::with_status(
                warp::reply::json(&JobReport {
                    success: false,
                    message: e.to_string(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}
