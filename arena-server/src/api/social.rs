use arena_core::InviteResponse;
use arena_types::{MatchKind, ServerMessage};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::api::{ApiRoute, LimitQuery, authed, boxed, json_body};
use crate::auth::AuthenticatedUser;
use crate::battle_manager::{BattleManagerError, DuelPlayer};
use crate::error::{ApiError, reject};
use crate::matchmaking::leave_queue_for_battle;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FriendRequestBody {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct FriendResponseBody {
    pub accept: bool,
}

#[derive(Debug, Deserialize)]
pub struct InviteBody {
    pub to_user_id: Uuid,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteAction {
    Accept,
    Decline,
    Cancel,
}

impl From<InviteAction> for InviteResponse {
    fn from(action: InviteAction) -> Self {
        match action {
            InviteAction::Accept => InviteResponse::Accept,
            InviteAction::Decline => InviteResponse::Decline,
            InviteAction::Cancel => InviteResponse::Cancel,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InviteResponseBody {
    pub action: InviteAction,
}

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub body: String,
}

pub fn routes(state: &AppState) -> ApiRoute {
    let friends = warp::path!("api" / "friends")
        .and(warp::get())
        .and(authed(state))
        .and_then(handle_list_friends);

    let incoming_requests = warp::path!("api" / "friends" / "requests")
        .and(warp::get())
        .and(authed(state))
        .and_then(handle_incoming_requests);

    let send_request = warp::path!("api" / "friends" / "requests")
        .and(warp::post())
        .and(authed(state))
        .and(json_body())
        .and_then(handle_send_friend_request);

    let respond_request = warp::path!("api" / "friends" / "requests" / Uuid)
        .and(warp::post())
        .and(authed(state))
        .and(json_body())
        .and_then(handle_respond_friend_request);

    let invites = warp::path!("api" / "invites")
        .and(warp::get())
        .and(authed(state))
        .and_then(handle_pending_invites);

    let send_invite = warp::path!("api" / "invites")
        .and(warp::post())
        .and(authed(state))
        .and(json_body())
        .and_then(handle_send_invite);

    let respond_invite = warp::path!("api" / "invites" / Uuid)
        .and(warp::post())
        .and(authed(state))
        .and(json_body())
        .and_then(handle_respond_invite);

    let conversation = warp::path!("api" / "messages" / Uuid)
        .and(warp::get())
        .and(authed(state))
        .and(warp::query::<LimitQuery>())
        .and_then(handle_conversation);

    let send_message = warp::path!("api" / "messages" / Uuid)
        .and(warp::post())
        .and(authed(state))
        .and(json_body())
        .and_then(handle_send_message);

    boxed(friends)
        .or(boxed(incoming_requests))
        .unify()
        .or(boxed(send_request))
        .unify()
        .or(boxed(respond_request))
        .unify()
        .or(boxed(invites))
        .unify()
        .or(boxed(send_invite))
        .unify()
        .or(boxed(respond_invite))
        .unify()
        .or(boxed(conversation))
        .unify()
        .or(boxed(send_message))
        .unify()
        .boxed()
}

async fn handle_list_friends(
    user: AuthenticatedUser,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let mut friends = state.social.friends(user.id).await.map_err(reject)?;

    let ids: Vec<Uuid> = friends.iter().map(|friend| friend.user_id).collect();
    let online = state.connections.online_among(&ids).await;
    for friend in &mut friends {
        friend.is_online = online.contains(&friend.user_id);
    }
    Ok(warp::reply::json(&friends))
}

async fn handle_incoming_requests(
    user: AuthenticatedUser,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let requests = state
        .social
        .incoming_requests(user.id)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&requests))
}

async fn handle_send_friend_request(
    user: AuthenticatedUser,
    state: AppState,
    body: FriendRequestBody,
) -> Result<impl Reply, Rejection> {
    let request = state
        .social
        .send_friend_request(user.id, body.user_id, Utc::now())
        .await
        .map_err(reject)?;

    state
        .connections
        .notify_user(
            body.user_id,
            ServerMessage::FriendRequestReceived {
                request: request.clone(),
            },
        )
        .await;

    Ok(warp::reply::with_status(
        warp::reply::json(&request),
        StatusCode::CREATED,
    ))
}

async fn handle_respond_friend_request(
    request_id: Uuid,
    user: AuthenticatedUser,
    state: AppState,
    body: FriendResponseBody,
) -> Result<impl Reply, Rejection> {
    let request = state
        .social
        .respond_friend_request(request_id, user.id, body.accept, Utc::now())
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&request))
}

async fn handle_pending_invites(
    user: AuthenticatedUser,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let invites = state
        .social
        .pending_invites(user.id, Utc::now())
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&invites))
}

async fn handle_send_invite(
    user: AuthenticatedUser,
    state: AppState,
    body: InviteBody,
) -> Result<impl Reply, Rejection> {
    let invite = state
        .social
        .create_invite(
            user.id,
            body.to_user_id,
            state.config.invite_ttl_seconds,
            Utc::now(),
        )
        .await
        .map_err(reject)?;

    state
        .connections
        .notify_user(
            invite.to_user_id,
            ServerMessage::InviteReceived {
                invite: invite.clone(),
            },
        )
        .await;

    Ok(warp::reply::with_status(
        warp::reply::json(&invite),
        StatusCode::CREATED,
    ))
}

async fn handle_respond_invite(
    invite_id: Uuid,
    user: AuthenticatedUser,
    state: AppState,
    body: InviteResponseBody,
) -> Result<impl Reply, Rejection> {
    let now = Utc::now();

    if matches!(body.action, InviteAction::Accept) {
        let pending = state
            .social
            .find_invite(invite_id)
            .await
            .map_err(reject)?
            .ok_or_else(|| reject(ApiError::not_found("invite not found")))?;
        // Refuse before touching the invite so it stays open for later
        if state.battles.is_in_battle(pending.from_user_id)
            || state.battles.is_in_battle(pending.to_user_id)
        {
            return Err(reject(BattleManagerError::AlreadyInBattle));
        }
    }

    let mut invite = state
        .social
        .respond_invite(invite_id, user.id, body.action.into(), now)
        .await
        .map_err(reject)?;

    if matches!(body.action, InviteAction::Accept) {
        let match_id =
            match start_invite_battle(&state, invite.from_user_id, invite.to_user_id).await {
                Ok(match_id) => match_id,
                Err(e) => {
                    // No battle, so the recipient may accept again later
                    if let Err(reopen) = state.social.reopen_invite(invite.id).await {
                        error!("Failed to reopen invite {}: {:#}", invite.id, reopen);
                    }
                    return Err(reject(e));
                }
            };
        state
            .social
            .attach_match(invite.id, match_id)
            .await
            .map_err(reject)?;
        invite.match_id = Some(match_id);
        info!("Invite {} started battle {}", invite.id, match_id);
    }

    for party in [invite.from_user_id, invite.to_user_id] {
        state
            .connections
            .notify_user(
                party,
                ServerMessage::InviteUpdated {
                    invite: invite.clone(),
                },
            )
            .await;
    }

    Ok(warp::reply::json(&invite))
}

async fn start_invite_battle(
    state: &AppState,
    from: Uuid,
    to: Uuid,
) -> Result<Uuid, BattleManagerError> {
    let inviter = state.profiles.get(from).await?;
    let invitee = state.profiles.get(to).await?;

    let result = state
        .battles
        .start_duel(
            MatchKind::Free,
            DuelPlayer {
                user_id: inviter.id,
                display_name: inviter.display_name,
            },
            DuelPlayer {
                user_id: invitee.id,
                display_name: invitee.display_name,
            },
            Utc::now(),
        )
        .await;
    match &result {
        Ok(_) => {
            for user_id in [from, to] {
                leave_queue_for_battle(&state.ranked_queue, &state.connections, user_id).await;
            }
        }
        Err(e) => error!("Accepted invite between {} and {} could not start: {}", from, to, e),
    }
    result
}

async fn handle_conversation(
    other: Uuid,
    user: AuthenticatedUser,
    state: AppState,
    query: LimitQuery,
) -> Result<impl Reply, Rejection> {
    let messages = state
        .social
        .conversation(user.id, other, query.limit.unwrap_or(50).clamp(1, 200))
        .await
        .map_err(reject)?;
    state
        .social
        .mark_read(user.id, other)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&messages))
}

async fn handle_send_message(
    recipient: Uuid,
    user: AuthenticatedUser,
    state: AppState,
    body: MessageBody,
) -> Result<impl Reply, Rejection> {
    let message = state
        .social
        .send_message(user.id, recipient, &body.body, Utc::now())
        .await
        .map_err(reject)?;

    state
        .connections
        .notify_user(
            recipient,
            ServerMessage::ChatReceived {
                message: message.clone(),
            },
        )
        .await;

    Ok(warp::reply::with_status(
        warp::reply::json(&message),
        StatusCode::CREATED,
    ))
}
