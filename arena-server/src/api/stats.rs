use arena_core::{MilestoneCounters, all_milestone_progress, compute_streaks};
use warp::{Filter, Rejection, Reply};

use crate::api::{ApiRoute, LimitQuery, authed, boxed, with_state};
use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, reject};
use crate::state::AppState;

/// Completed matches considered when computing streaks.
const STREAK_HISTORY: u64 = 50;

pub fn routes(state: &AppState) -> ApiRoute {
    let streaks = warp::path!("api" / "stats" / "streaks")
        .and(warp::get())
        .and(authed(state))
        .and_then(handle_streaks);

    let milestones = warp::path!("api" / "stats" / "milestones")
        .and(warp::get())
        .and(authed(state))
        .and_then(handle_milestones);

    // Public, like the rest of the scoreboard
    let leaderboard = warp::path!("api" / "leaderboard" / String)
        .and(warp::get())
        .and(warp::query::<LimitQuery>())
        .and(with_state(state.clone()))
        .and_then(handle_leaderboard);

    let season_rewards = warp::path!("api" / "seasons" / "rewards")
        .and(warp::get())
        .and(authed(state))
        .and_then(handle_season_rewards);

    boxed(streaks)
        .or(boxed(milestones))
        .unify()
        .or(boxed(leaderboard))
        .unify()
        .or(boxed(season_rewards))
        .unify()
        .boxed()
}

fn counter(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

async fn handle_streaks(user: AuthenticatedUser, state: AppState) -> Result<impl Reply, Rejection> {
    let recent = state
        .matches
        .recent_outcomes(user.id, STREAK_HISTORY)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&compute_streaks(&recent)))
}

async fn handle_milestones(
    user: AuthenticatedUser,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let profile = state.profiles.get(user.id).await.map_err(reject)?;
    let counters = MilestoneCounters {
        wins: counter(profile.wins),
        matches: counter(profile.wins + profile.losses + profile.draws),
        words_studied: counter(profile.words_studied),
        best_win_streak: counter(profile.best_win_streak),
    };
    Ok(warp::reply::json(&all_milestone_progress(&counters)))
}

async fn handle_leaderboard(
    board: String,
    query: LimitQuery,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let limit = query.clamped();
    let entries = match board.as_str() {
        "xp" => state.profiles.xp_leaderboard(limit).await,
        "ranked" => state.profiles.ranked_leaderboard(limit).await,
        "win-rate" => state.profiles.win_rate_leaderboard(limit).await,
        _ => return Err(reject(ApiError::not_found("unknown leaderboard"))),
    }
    .map_err(reject)?;
    Ok(warp::reply::json(&entries))
}

async fn handle_season_rewards(
    user: AuthenticatedUser,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let rewards = state.seasons.rewards_for(user.id).await.map_err(reject)?;
    Ok(warp::reply::json(&rewards))
}
