use std::convert::Infallible;

use arena_core::{BattleError, SocialError, TeamError};
use arena_persistence::RepositoryError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use crate::battle_manager::BattleManagerError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Gone(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("internal server error")]
    Internal,
}

impl warp::reject::Reject for ApiError {}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn forbidden(message: &str) -> Self {
        ApiError::Forbidden(message.to_string())
    }

    pub fn not_found(message: &str) -> Self {
        ApiError::NotFound(message.to_string())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        let message = err.to_string();
        match err {
            RepositoryError::NotFound(_) => ApiError::NotFound(message),
            RepositoryError::Conflict(_) => ApiError::Conflict(message),
            RepositoryError::Invalid(_) | RepositoryError::Energy(_) => {
                ApiError::Unprocessable(message)
            }
            RepositoryError::Forbidden(_) => ApiError::Forbidden(message),
            RepositoryError::Team(team) => team.into(),
            RepositoryError::Social(social) => social.into(),
            RepositoryError::Score(_) => {
                error!("Score could not be stored: {}", message);
                ApiError::Internal
            }
        }
    }
}

impl From<TeamError> for ApiError {
    fn from(err: TeamError) -> Self {
        let message = err.to_string();
        match err {
            TeamError::NotPermitted => ApiError::Forbidden(message),
            TeamError::TeamFull(_) => ApiError::Conflict(message),
            _ => ApiError::Unprocessable(message),
        }
    }
}

impl From<SocialError> for ApiError {
    fn from(err: SocialError) -> Self {
        let message = err.to_string();
        match err {
            SocialError::NotRecipient | SocialError::NotSender | SocialError::NotFriends => {
                ApiError::Forbidden(message)
            }
            SocialError::InviteExpired => ApiError::Gone(message),
            SocialError::AlreadyFriends | SocialError::RequestPending | SocialError::NotPending => {
                ApiError::Conflict(message)
            }
            SocialError::SelfTarget | SocialError::InvalidMessage => {
                ApiError::Unprocessable(message)
            }
        }
    }
}

impl From<BattleError> for ApiError {
    fn from(err: BattleError) -> Self {
        let message = err.to_string();
        match err {
            BattleError::NotAParticipant => ApiError::Forbidden(message),
            BattleError::AlreadyCompleted | BattleError::AlreadyAnswered { .. } => {
                ApiError::Conflict(message)
            }
            _ => ApiError::Unprocessable(message),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<RepositoryError>() {
            Ok(repository_error) => repository_error.into(),
            Err(err) => {
                error!("Request failed: {:#}", err);
                ApiError::Internal
            }
        }
    }
}

impl From<BattleManagerError> for ApiError {
    fn from(err: BattleManagerError) -> Self {
        match err {
            BattleManagerError::NotFound => ApiError::not_found("battle not found"),
            BattleManagerError::AlreadyInBattle => {
                ApiError::Conflict("you are already in a battle".to_string())
            }
            BattleManagerError::Battle(battle) => battle.into(),
            BattleManagerError::Quiz(quiz) => ApiError::Unprocessable(quiz.to_string()),
            BattleManagerError::Storage(storage) => storage.into(),
        }
    }
}

/// Shorthand for failing a handler with anything that maps to an `ApiError`.
pub fn reject(err: impl Into<ApiError>) -> Rejection {
    warp::reject::custom(err.into())
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(api_error) = err.find::<ApiError>() {
        (api_error.status(), api_error.to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(body_error) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("invalid request body: {}", body_error))
    } else if let Some(query_error) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, query_error.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "request body too large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorBody { error: message }),
        status,
    ))
}
