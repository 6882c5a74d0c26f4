use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::matchmaking::{QueuedPlayer, pair_waiting_players};
use crate::realtime::connection::ConnectionId;
use crate::state::AppState;
use arena_types::{ClientMessage, ServerMessage};

#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    state: AppState,
}

impl MessageHandler {
    pub fn new(connection_id: ConnectionId, state: AppState) -> Self {
        Self {
            connection_id,
            state,
        }
    }

    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), String> {
        self.state
            .connections
            .update_activity(self.connection_id)
            .await;

        match message {
            ClientMessage::Authenticate { token } => self.handle_authenticate(token).await,
            ClientMessage::JoinRankedQueue => self.handle_join_queue().await,
            ClientMessage::LeaveRankedQueue => self.handle_leave_queue().await,
            ClientMessage::SubmitAnswer {
                match_id,
                question_index,
                choice,
            } => {
                self.handle_submit_answer(match_id, question_index, choice)
                    .await
            }
            ClientMessage::Heartbeat => Ok(()),
        }
    }

    pub async fn handle_disconnect(&self) {
        info!("Handling disconnect for connection {}", self.connection_id);

        if let Some(user_id) = self.state.connections.user_of(self.connection_id).await {
            // Live battles keep running; the sweeper closes them if the player never returns
            self.state.ranked_queue.remove_player(user_id).await;
        }
    }

    async fn handle_authenticate(&self, token: String) -> Result<(), String> {
        info!("Authenticating connection {}", self.connection_id);

        let user = match self.state.auth.validate_token(&token) {
            Ok(user) => user,
            Err(e) => {
                warn!(
                    "Authentication failed for connection {}: {}",
                    self.connection_id, e
                );
                return self
                    .send_message(ServerMessage::AuthenticationFailed {
                        reason: e.to_string(),
                    })
                    .await;
            }
        };

        if let Err(reason) = self
            .state
            .connections
            .authenticate_connection(self.connection_id, user.id)
            .await
        {
            return self
                .send_message(ServerMessage::AuthenticationFailed { reason })
                .await;
        }

        let profile = self
            .state
            .profiles
            .find_by_id(user.id)
            .await
            .map_err(|e| format!("Failed to load profile: {}", e))?;
        self.send_message(ServerMessage::AuthenticationSuccess { profile })
            .await?;

        // Replay invites that arrived while the user was offline
        let invites = self
            .state
            .social
            .pending_invites(user.id, Utc::now())
            .await
            .map_err(|e| format!("Failed to load invites: {}", e))?;
        for invite in invites {
            self.send_message(ServerMessage::InviteReceived { invite })
                .await?;
        }
        Ok(())
    }

    async fn authenticated_user(&self) -> Option<Uuid> {
        self.state.connections.user_of(self.connection_id).await
    }

    async fn handle_join_queue(&self) -> Result<(), String> {
        let Some(user_id) = self.authenticated_user().await else {
            return self
                .send_error("Authentication required to join the ranked queue")
                .await;
        };

        let profile = self
            .state
            .profiles
            .find_by_id(user_id)
            .await
            .map_err(|e| format!("Failed to load profile: {}", e))?;
        let Some(profile) = profile else {
            return self.send_error("Create a profile before playing").await;
        };

        if self.state.battles.is_in_battle(user_id) {
            return self.send_error("Already in a battle").await;
        }

        let player = QueuedPlayer::new(user_id, profile.display_name, profile.rank_points);
        match self.state.ranked_queue.add_player(player).await {
            Ok(position) => {
                self.send_message(ServerMessage::QueueJoined { position })
                    .await?;
            }
            Err(e) => return self.send_error(&e).await,
        }

        pair_waiting_players(
            &self.state.ranked_queue,
            &self.state.battles,
            &self.state.connections,
        )
        .await;
        Ok(())
    }

    async fn handle_leave_queue(&self) -> Result<(), String> {
        let Some(user_id) = self.authenticated_user().await else {
            return self.send_error("Authentication required").await;
        };

        if self.state.ranked_queue.remove_player(user_id).await {
            self.send_message(ServerMessage::QueueLeft).await
        } else {
            self.send_error("Not in the ranked queue").await
        }
    }

    async fn handle_submit_answer(
        &self,
        match_id: Uuid,
        question_index: u32,
        choice: u32,
    ) -> Result<(), String> {
        let Some(user_id) = self.authenticated_user().await else {
            return self.send_error("Authentication required").await;
        };

        match self
            .state
            .battles
            .submit_answer(match_id, user_id, question_index, choice, Utc::now())
            .await
        {
            Ok(result) => {
                self.send_message(ServerMessage::AnswerAccepted { result })
                    .await
            }
            Err(e) => self.send_error(&e.to_string()).await,
        }
    }

    pub async fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.state
            .connections
            .send_to_connection(self.connection_id, message)
            .await
    }

    async fn send_error(&self, message: &str) -> Result<(), String> {
        self.send_message(ServerMessage::Error {
            message: message.to_string(),
        })
        .await
    }
}
