use arena_types::AiDifficulty;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::api::{ApiRoute, LimitQuery, authed, boxed, json_body};
use crate::auth::AuthenticatedUser;
use crate::error::reject;
use crate::matchmaking::leave_queue_for_battle;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StartAiBattleRequest {
    #[serde(default)]
    pub difficulty: Option<AiDifficulty>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question_index: u32,
    pub choice: u32,
}

pub fn routes(state: &AppState) -> ApiRoute {
    let start_ai = warp::path!("api" / "battles" / "ai")
        .and(warp::post())
        .and(authed(state))
        .and(json_body())
        .and_then(handle_start_ai_battle);

    let history = warp::path!("api" / "battles" / "history")
        .and(warp::get())
        .and(authed(state))
        .and(warp::query::<LimitQuery>())
        .and_then(handle_history);

    let view = warp::path!("api" / "battles" / Uuid)
        .and(warp::get())
        .and(authed(state))
        .and_then(handle_battle_view);

    let answer = warp::path!("api" / "battles" / Uuid / "answers")
        .and(warp::post())
        .and(authed(state))
        .and(json_body())
        .and_then(handle_submit_answer);

    boxed(start_ai)
        .or(boxed(history))
        .unify()
        .or(boxed(view))
        .unify()
        .or(boxed(answer))
        .unify()
        .boxed()
}

async fn handle_start_ai_battle(
    user: AuthenticatedUser,
    state: AppState,
    request: StartAiBattleRequest,
) -> Result<impl Reply, Rejection> {
    let difficulty = request.difficulty.unwrap_or(AiDifficulty::Normal);
    let battle = state
        .battles
        .start_ai_battle(user.id, difficulty, Utc::now())
        .await
        .map_err(reject)?;
    leave_queue_for_battle(&state.ranked_queue, &state.connections, user.id).await;

    Ok(warp::reply::with_status(
        warp::reply::json(&battle),
        StatusCode::CREATED,
    ))
}

async fn handle_history(
    user: AuthenticatedUser,
    state: AppState,
    query: LimitQuery,
) -> Result<impl Reply, Rejection> {
    let history = state
        .matches
        .history_for(user.id, query.clamped())
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&history))
}

async fn handle_battle_view(
    match_id: Uuid,
    user: AuthenticatedUser,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let battle = state
        .battles
        .battle_view(match_id, user.id)
        .map_err(reject)?;
    Ok(warp::reply::json(&battle))
}

async fn handle_submit_answer(
    match_id: Uuid,
    user: AuthenticatedUser,
    state: AppState,
    request: AnswerRequest,
) -> Result<impl Reply, Rejection> {
    let result = state
        .battles
        .submit_answer(
            match_id,
            user.id,
            request.question_index,
            request.choice,
            Utc::now(),
        )
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&result))
}
