use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    AnswerResult, BattleInvite, BattleSummary, BattleView, ChatMessage, FriendRequest, Profile,
    ScoreCard, TeamApplication,
};

/// Messages accepted on the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ClientMessage {
    Authenticate { token: String },
    JoinRankedQueue,
    LeaveRankedQueue,
    SubmitAnswer {
        match_id: Uuid,
        question_index: u32,
        choice: u32,
    },
    Heartbeat,
}

/// Messages pushed to clients on the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    AuthenticationSuccess { profile: Option<Profile> },
    AuthenticationFailed { reason: String },
    QueueJoined { position: u32 },
    QueueLeft,
    MatchFound { battle: BattleView },
    AnswerAccepted { result: AnswerResult },
    OpponentProgress { match_id: Uuid, score: ScoreCard },
    BattleFinished { summary: BattleSummary },
    InviteReceived { invite: BattleInvite },
    InviteUpdated { invite: BattleInvite },
    FriendRequestReceived { request: FriendRequest },
    ChatReceived { message: ChatMessage },
    TeamApplicationReceived { application: TeamApplication },
    Error { message: String },
}
