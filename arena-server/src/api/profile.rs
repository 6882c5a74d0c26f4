use arena_core::{EnergyWallet, WordFilter, study_reward};
use arena_persistence::{NewProfile, StudyCharge};
use arena_types::{EnergyPack, EnergyStatus, Profile, StudySession, Subject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::api::{ApiRoute, authed, boxed, json_body};
use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, reject};
use crate::state::AppState;

const DEFAULT_STUDY_WORDS: usize = 10;
const MAX_STUDY_WORDS: usize = 50;
const MAX_WORDS_PAGE: u64 = 500;

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub display_name: Option<String>,
    pub grade: i32,
}

#[derive(Debug, Serialize)]
pub struct ProfileOverview {
    pub profile: Profile,
    pub xp_rank: Option<u32>,
    pub energy: EnergyStatus,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub pack: EnergyPack,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub energy_added: i32,
    pub coins_spent: i32,
    pub energy: EnergyStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct StudyRequest {
    pub grade: Option<i32>,
    pub subject: Option<Subject>,
    pub topic: Option<String>,
    pub count: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WordsQuery {
    pub grade: Option<i32>,
    pub subject: Option<Subject>,
    pub topic: Option<String>,
    pub limit: Option<u64>,
}

pub fn routes(state: &AppState) -> ApiRoute {
    let create = warp::path!("api" / "profile")
        .and(warp::post())
        .and(authed(state))
        .and(json_body())
        .and_then(handle_create_profile);

    let me = warp::path!("api" / "profile" / "me")
        .and(warp::get())
        .and(authed(state))
        .and_then(handle_get_me);

    let energy = warp::path!("api" / "profile" / "energy")
        .and(warp::get())
        .and(authed(state))
        .and_then(handle_get_energy);

    let purchase = warp::path!("api" / "profile" / "energy" / "purchase")
        .and(warp::post())
        .and(authed(state))
        .and(json_body())
        .and_then(handle_purchase_energy);

    let study = warp::path!("api" / "study")
        .and(warp::post())
        .and(authed(state))
        .and(json_body())
        .and_then(handle_study);

    let words = warp::path!("api" / "words")
        .and(warp::get())
        .and(authed(state))
        .and(warp::query::<WordsQuery>())
        .and_then(handle_list_words);

    boxed(create)
        .or(boxed(me))
        .unify()
        .or(boxed(energy))
        .unify()
        .or(boxed(purchase))
        .unify()
        .or(boxed(study))
        .unify()
        .or(boxed(words))
        .unify()
        .boxed()
}

fn energy_status(
    wallet: &EnergyWallet,
    coins: i32,
    now: DateTime<Utc>,
    interval: chrono::Duration,
) -> EnergyStatus {
    let current = wallet.regenerate(now, interval);
    EnergyStatus {
        energy: current.energy,
        max_energy: current.max_energy,
        coins,
        next_point_in_seconds: current.seconds_until_next_point(now, interval),
    }
}

async fn handle_create_profile(
    user: AuthenticatedUser,
    state: AppState,
    request: CreateProfileRequest,
) -> Result<impl Reply, Rejection> {
    let display_name = request
        .display_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(user.display_name);

    let profile = state
        .profiles
        .create_profile(
            NewProfile {
                id: user.id,
                display_name,
                grade: request.grade,
                max_energy: state.config.energy_max,
            },
            Utc::now(),
        )
        .await
        .map_err(reject)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&profile),
        StatusCode::CREATED,
    ))
}

async fn handle_get_me(user: AuthenticatedUser, state: AppState) -> Result<impl Reply, Rejection> {
    let mut profile = state.profiles.get(user.id).await.map_err(reject)?;
    let xp_rank = state.profiles.xp_rank(user.id).await.map_err(reject)?;
    let (wallet, coins) = state.profiles.energy_wallet(user.id).await.map_err(reject)?;

    let energy = energy_status(
        &wallet,
        coins,
        Utc::now(),
        state.config.energy_regen_interval(),
    );
    // Stored energy lags behind regeneration until the next write
    profile.energy = energy.energy;

    Ok(warp::reply::json(&ProfileOverview {
        profile,
        xp_rank,
        energy,
    }))
}

async fn handle_get_energy(
    user: AuthenticatedUser,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let (wallet, coins) = state.profiles.energy_wallet(user.id).await.map_err(reject)?;
    Ok(warp::reply::json(&energy_status(
        &wallet,
        coins,
        Utc::now(),
        state.config.energy_regen_interval(),
    )))
}

async fn handle_purchase_energy(
    user: AuthenticatedUser,
    state: AppState,
    request: PurchaseRequest,
) -> Result<impl Reply, Rejection> {
    let now = Utc::now();
    let interval = state.config.energy_regen_interval();
    let outcome = state
        .profiles
        .purchase_energy(user.id, request.pack, now, interval)
        .await
        .map_err(reject)?;
    info!(
        "User {} bought {} energy for {} coins",
        user.id, outcome.energy_added, outcome.coins_spent
    );

    Ok(warp::reply::json(&PurchaseResponse {
        energy_added: outcome.energy_added,
        coins_spent: outcome.coins_spent,
        energy: energy_status(&outcome.wallet, outcome.coins_remaining, now, interval),
    }))
}

async fn handle_study(
    user: AuthenticatedUser,
    state: AppState,
    request: StudyRequest,
) -> Result<impl Reply, Rejection> {
    let now = Utc::now();
    let profile = state.profiles.get(user.id).await.map_err(reject)?;

    let filter = WordFilter {
        grade: request.grade.or(Some(profile.grade)),
        subject: request.subject,
        topic: request.topic,
    };
    let count = request
        .count
        .unwrap_or(DEFAULT_STUDY_WORDS)
        .clamp(1, MAX_STUDY_WORDS);
    let words = {
        let mut rng = rand::rng();
        state.word_bank.random_words(&filter, count, &mut rng)
    };
    if words.is_empty() {
        return Err(reject(ApiError::Unprocessable(
            "no words match the requested filter".to_string(),
        )));
    }

    // Energy is only spent once there is something to study
    let xp_awarded = study_reward(words.len());
    let outcome = state
        .profiles
        .complete_study(
            user.id,
            StudyCharge {
                energy_cost: state.config.study_energy_cost,
                words: words.len() as i32,
                xp: xp_awarded,
            },
            now,
            state.config.energy_regen_interval(),
        )
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&StudySession {
        words,
        energy_remaining: outcome.wallet.energy,
        xp_awarded,
    }))
}

async fn handle_list_words(
    _user: AuthenticatedUser,
    state: AppState,
    query: WordsQuery,
) -> Result<impl Reply, Rejection> {
    let filter = WordFilter {
        grade: query.grade,
        subject: query.subject,
        topic: query.topic,
    };
    let limit = query.limit.unwrap_or(MAX_WORDS_PAGE).clamp(1, MAX_WORDS_PAGE);
    let words = state
        .words
        .find_words(&filter, Some(limit))
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&words))
}
