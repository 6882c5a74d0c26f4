use warp::Filter;

use crate::error::handle_rejection;
use crate::state::AppState;

pub mod api;
pub mod auth;
pub mod battle_manager;
pub mod config;
pub mod error;
pub mod jobs;
pub mod matchmaking;
pub mod realtime;
pub mod state;

pub fn create_routes(
    state: AppState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    // WebSocket endpoint
    let websocket = warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(api::with_state(state.clone()))
        .map(|ws: warp::ws::Ws, state: AppState| {
            ws.on_upgrade(move |socket| realtime::handle_connection(socket, state))
        });

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE"]);

    websocket
        .or(health)
        .or(api::routes(state))
        .recover(handle_rejection)
        .with(cors)
        .with(warp::log("vocab_arena"))
}
