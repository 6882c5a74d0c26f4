use std::convert::Infallible;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use warp::filters::BoxedFilter;
use warp::{Filter, Rejection, Reply};

use crate::auth::{AuthenticatedUser, with_auth};
use crate::state::AppState;

pub mod admin;
pub mod battles;
pub mod profile;
pub mod social;
pub mod stats;
pub mod teams;

/// Largest JSON body any endpoint accepts.
const MAX_BODY_BYTES: u64 = 16 * 1024;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

pub type ApiRoute = BoxedFilter<(Box<dyn Reply>,)>;

pub fn boxed<F, R>(filter: F) -> ApiRoute
where
    F: Filter<Extract = (R,), Error = Rejection> + Clone + Send + Sync + 'static,
    R: Reply + 'static,
{
    filter.map(|reply: R| Box::new(reply) as Box<dyn Reply>).boxed()
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// The signed-in caller plus the shared state.
pub fn authed(
    state: &AppState,
) -> impl Filter<Extract = (AuthenticatedUser, AppState), Error = Rejection> + Clone + use<> {
    with_auth(state.auth.clone()).and(with_state(state.clone()))
}

pub fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u64>,
}

impl LimitQuery {
    pub fn clamped(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

pub fn routes(state: AppState) -> ApiRoute {
    profile::routes(&state)
        .or(battles::routes(&state))
        .unify()
        .or(stats::routes(&state))
        .unify()
        .or(social::routes(&state))
        .unify()
        .or(teams::routes(&state))
        .unify()
        .or(admin::routes(&state))
        .unify()
        .boxed()
}
