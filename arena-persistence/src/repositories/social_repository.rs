use anyhow::Result;
use arena_core::{
    InviteResponse, SocialError, check_friend_request, invite_expiry, resolve_invite,
    respond_to_friend_request, validate_message,
};
use arena_types::{
    BattleInvite, ChatMessage, Friend, FriendRequest, FriendRequestStatus, InviteStatus,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entities::{battle_invites, friend_requests, messages, prelude::*};
use crate::error::RepositoryError;

pub struct SocialRepository {
    db: DatabaseConnection,
}

fn request_view(model: friend_requests::Model) -> FriendRequest {
    FriendRequest {
        id: model.id,
        requester_id: model.requester_id,
        addressee_id: model.addressee_id,
        status: FriendRequestStatus::parse(&model.status).unwrap_or(FriendRequestStatus::Pending),
        created_at: model.created_at.to_rfc3339(),
    }
}

fn invite_view(model: battle_invites::Model) -> BattleInvite {
    BattleInvite {
        id: model.id,
        from_user_id: model.from_user_id,
        to_user_id: model.to_user_id,
        status: InviteStatus::parse(&model.status).unwrap_or(InviteStatus::Expired),
        match_id: model.match_id,
        created_at: model.created_at.to_rfc3339(),
        expires_at: model.expires_at.to_rfc3339(),
    }
}

fn message_view(model: messages::Model) -> ChatMessage {
    ChatMessage {
        id: model.id,
        sender_id: model.sender_id,
        recipient_id: model.recipient_id,
        body: model.body,
        read: model.read,
        created_at: model.created_at.to_rfc3339(),
    }
}

/// Requests between `a` and `b` in either direction.
fn between(a: Uuid, b: Uuid) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(friend_requests::Column::RequesterId.eq(a))
                .add(friend_requests::Column::AddresseeId.eq(b)),
        )
        .add(
            Condition::all()
                .add(friend_requests::Column::RequesterId.eq(b))
                .add(friend_requests::Column::AddresseeId.eq(a)),
        )
}

impl SocialRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn are_friends(&self, a: Uuid, b: Uuid) -> Result<bool> {
        let accepted = FriendRequests::find()
            .filter(between(a, b))
            .filter(friend_requests::Column::Status.eq(FriendRequestStatus::Accepted.as_str()))
            .one(&self.db)
            .await?;
        Ok(accepted.is_some())
    }

    pub async fn send_friend_request(
        &self,
        requester: Uuid,
        addressee: Uuid,
        now: DateTime<Utc>,
    ) -> Result<FriendRequest> {
        if Profiles::find_by_id(addressee).one(&self.db).await?.is_none() {
            return Err(RepositoryError::NotFound("profile").into());
        }

        let existing = FriendRequests::find()
            .filter(between(requester, addressee))
            .all(&self.db)
            .await?;
        let status_is = |status: FriendRequestStatus| {
            existing.iter().any(|request| request.status == status.as_str())
        };
        check_friend_request(
            requester,
            addressee,
            status_is(FriendRequestStatus::Accepted),
            status_is(FriendRequestStatus::Pending),
        )
        .map_err(RepositoryError::from)?;

        let model = friend_requests::ActiveModel {
            id: Set(Uuid::new_v4()),
            requester_id: Set(requester),
            addressee_id: Set(addressee),
            status: Set(FriendRequestStatus::Pending.as_str().to_string()),
            created_at: Set(now.fixed_offset()),
            responded_at: Set(None),
        };
        let saved = FriendRequests::insert(model).exec(&self.db).await?;
        info!("Friend request from {} to {}", requester, addressee);

        let created = FriendRequests::find_by_id(saved.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created friend request"))?;
        Ok(request_view(created))
    }

    pub async fn respond_friend_request(
        &self,
        request_id: Uuid,
        responder: Uuid,
        accept: bool,
        now: DateTime<Utc>,
    ) -> Result<FriendRequest> {
        let request = FriendRequests::find_by_id(request_id)
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound("friend request"))?;
        let current =
            FriendRequestStatus::parse(&request.status).unwrap_or(FriendRequestStatus::Pending);
        let status = respond_to_friend_request(current, request.addressee_id, responder, accept)
            .map_err(RepositoryError::from)?;

        let result = FriendRequests::update_many()
            .col_expr(friend_requests::Column::Status, Expr::value(status.as_str()))
            .col_expr(friend_requests::Column::RespondedAt, Expr::value(now.fixed_offset()))
            .filter(friend_requests::Column::Id.eq(request_id))
            .filter(friend_requests::Column::Status.eq(FriendRequestStatus::Pending.as_str()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::from(SocialError::NotPending).into());
        }

        Ok(FriendRequest {
            status,
            ..request_view(request)
        })
    }

    pub async fn incoming_requests(&self, user_id: Uuid) -> Result<Vec<FriendRequest>> {
        let models = FriendRequests::find()
            .filter(friend_requests::Column::AddresseeId.eq(user_id))
            .filter(friend_requests::Column::Status.eq(FriendRequestStatus::Pending.as_str()))
            .order_by_desc(friend_requests::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(request_view).collect())
    }

    /// Friends of `user_id`; `is_online` is left for the caller to fill in.
    pub async fn friends(&self, user_id: Uuid) -> Result<Vec<Friend>> {
        let accepted = FriendRequests::find()
            .filter(
                Condition::any()
                    .add(friend_requests::Column::RequesterId.eq(user_id))
                    .add(friend_requests::Column::AddresseeId.eq(user_id)),
            )
            .filter(friend_requests::Column::Status.eq(FriendRequestStatus::Accepted.as_str()))
            .all(&self.db)
            .await?;

        let mut friends = Vec::with_capacity(accepted.len());
        for request in accepted {
            let friend_id = if request.requester_id == user_id {
                request.addressee_id
            } else {
                request.requester_id
            };
            let Some(profile) = Profiles::find_by_id(friend_id).one(&self.db).await? else {
                continue;
            };
            let since = request.responded_at.unwrap_or(request.created_at);
            friends.push(Friend {
                user_id: friend_id,
                display_name: profile.display_name,
                level: profile.level,
                is_online: false,
                since: since.to_rfc3339(),
            });
        }

        friends.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(friends)
    }

    pub async fn create_invite(
        &self,
        from: Uuid,
        to: Uuid,
        ttl_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<BattleInvite> {
        if from == to {
            return Err(RepositoryError::from(SocialError::SelfTarget).into());
        }
        if !self.are_friends(from, to).await? {
            return Err(RepositoryError::from(SocialError::NotFriends).into());
        }

        let open = BattleInvites::find()
            .filter(battle_invites::Column::FromUserId.eq(from))
            .filter(battle_invites::Column::ToUserId.eq(to))
            .filter(battle_invites::Column::Status.eq(InviteStatus::Pending.as_str()))
            .filter(battle_invites::Column::ExpiresAt.gt(now.fixed_offset()))
            .one(&self.db)
            .await?;
        if open.is_some() {
            return Err(
                RepositoryError::Conflict("an invite is already pending".to_string()).into(),
            );
        }

        let model = battle_invites::ActiveModel {
            id: Set(Uuid::new_v4()),
            from_user_id: Set(from),
            to_user_id: Set(to),
            status: Set(InviteStatus::Pending.as_str().to_string()),
            match_id: Set(None),
            created_at: Set(now.fixed_offset()),
            expires_at: Set(invite_expiry(now, ttl_seconds).fixed_offset()),
        };
        let saved = BattleInvites::insert(model).exec(&self.db).await?;
        info!("Battle invite from {} to {}", from, to);

        self.find_invite(saved.last_insert_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created invite"))
    }

    pub async fn find_invite(&self, id: Uuid) -> Result<Option<BattleInvite>> {
        let model = BattleInvites::find_by_id(id).one(&self.db).await?;
        Ok(model.map(invite_view))
    }

    /// Accept, decline or cancel an invite. An invite past its deadline is
    /// stored as expired and the call fails, whatever the response was.
    pub async fn respond_invite(
        &self,
        id: Uuid,
        actor: Uuid,
        response: InviteResponse,
        now: DateTime<Utc>,
    ) -> Result<BattleInvite> {
        let invite = BattleInvites::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound("invite"))?;
        let current = InviteStatus::parse(&invite.status).unwrap_or(InviteStatus::Expired);
        let status = resolve_invite(
            current,
            invite.from_user_id,
            invite.to_user_id,
            actor,
            response,
            invite.expires_at.with_timezone(&Utc),
            now,
        )
        .map_err(RepositoryError::from)?;

        let result = BattleInvites::update_many()
            .col_expr(battle_invites::Column::Status, Expr::value(status.as_str()))
            .filter(battle_invites::Column::Id.eq(id))
            .filter(battle_invites::Column::Status.eq(InviteStatus::Pending.as_str()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::from(SocialError::NotPending).into());
        }

        if status == InviteStatus::Expired {
            debug!("Invite {} expired before the response", id);
            return Err(RepositoryError::from(SocialError::InviteExpired).into());
        }

        info!("Invite {} is now {}", id, status.as_str());
        Ok(BattleInvite {
            status,
            ..invite_view(invite)
        })
    }

    pub async fn attach_match(&self, invite_id: Uuid, match_id: Uuid) -> Result<()> {
        BattleInvites::update_many()
            .col_expr(battle_invites::Column::MatchId, Expr::value(match_id))
            .filter(battle_invites::Column::Id.eq(invite_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Put an accepted invite whose battle never started back to pending.
    pub async fn reopen_invite(&self, invite_id: Uuid) -> Result<bool> {
        let result = BattleInvites::update_many()
            .col_expr(
                battle_invites::Column::Status,
                Expr::value(InviteStatus::Pending.as_str()),
            )
            .filter(battle_invites::Column::Id.eq(invite_id))
            .filter(battle_invites::Column::Status.eq(InviteStatus::Accepted.as_str()))
            .filter(battle_invites::Column::MatchId.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Open invites addressed to `user_id`.
    pub async fn pending_invites(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<BattleInvite>> {
        let models = BattleInvites::find()
            .filter(battle_invites::Column::ToUserId.eq(user_id))
            .filter(battle_invites::Column::Status.eq(InviteStatus::Pending.as_str()))
            .filter(battle_invites::Column::ExpiresAt.gt(now.fixed_offset()))
            .order_by_desc(battle_invites::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(invite_view).collect())
    }

    /// Mark every overdue pending invite as expired and return them.
    pub async fn expire_invites(&self, now: DateTime<Utc>) -> Result<Vec<BattleInvite>> {
        let overdue = BattleInvites::find()
            .filter(battle_invites::Column::Status.eq(InviteStatus::Pending.as_str()))
            .filter(battle_invites::Column::ExpiresAt.lte(now.fixed_offset()))
            .all(&self.db)
            .await?;
        if overdue.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = overdue.iter().map(|invite| invite.id).collect();
        BattleInvites::update_many()
            .col_expr(
                battle_invites::Column::Status,
                Expr::value(InviteStatus::Expired.as_str()),
            )
            .filter(battle_invites::Column::Id.is_in(ids))
            .filter(battle_invites::Column::Status.eq(InviteStatus::Pending.as_str()))
            .exec(&self.db)
            .await?;

        info!("Expired {} battle invites", overdue.len());
        Ok(overdue
            .into_iter()
            .map(|invite| BattleInvite {
                status: InviteStatus::Expired,
                ..invite_view(invite)
            })
            .collect())
    }

    pub async fn send_message(
        &self,
        sender: Uuid,
        recipient: Uuid,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<ChatMessage> {
        let body = validate_message(body).map_err(RepositoryError::from)?;
        if sender == recipient {
            return Err(RepositoryError::from(SocialError::SelfTarget).into());
        }
        if !self.are_friends(sender, recipient).await? {
            return Err(RepositoryError::from(SocialError::NotFriends).into());
        }

        let model = messages::ActiveModel {
            id: Set(Uuid::new_v4()),
            sender_id: Set(sender),
            recipient_id: Set(recipient),
            body: Set(body),
            read: Set(false),
            created_at: Set(now.fixed_offset()),
        };
        let saved = Messages::insert(model).exec(&self.db).await?;

        let created = Messages::find_by_id(saved.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve sent message"))?;
        Ok(message_view(created))
    }

    /// The latest messages between two users, oldest first.
    pub async fn conversation(
        &self,
        user_id: Uuid,
        other: Uuid,
        limit: u64,
    ) -> Result<Vec<ChatMessage>> {
        let condition = Condition::any()
            .add(
                Condition::all()
                    .add(messages::Column::SenderId.eq(user_id))
                    .add(messages::Column::RecipientId.eq(other)),
            )
            .add(
                Condition::all()
                    .add(messages::Column::SenderId.eq(other))
                    .add(messages::Column::RecipientId.eq(user_id)),
            );

        let mut models = Messages::find()
            .filter(condition)
            .order_by_desc(messages::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?;
        models.reverse();
        Ok(models.into_iter().map(message_view).collect())
    }

    pub async fn mark_read(&self, user_id: Uuid, other: Uuid) -> Result<u64> {
        let result = Messages::update_many()
            .col_expr(messages::Column::Read, Expr::value(true))
            .filter(messages::Column::SenderId.eq(other))
            .filter(messages::Column::RecipientId.eq(user_id))
            .filter(messages::Column::Read.eq(false))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use crate::{NewProfile, ProfileRepository};
    use chrono::{Duration, TimeZone};
    use migration::{Migrator, MigratorTrait};

    struct Setup {
        social: SocialRepository,
        profiles: ProfileRepository,
    }

    async fn setup_test_db() -> Setup {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        Setup {
            social: SocialRepository::new(db.clone()),
            profiles: ProfileRepository::new(db),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 5, 19, 0, 0).unwrap()
    }

    async fn player(setup: &Setup, name: &str) -> Uuid {
        setup
            .profiles
            .create_profile(
                NewProfile {
                    id: Uuid::new_v4(),
                    display_name: name.to_string(),
                    grade: 2,
                    max_energy: 100,
                },
                t0(),
            )
            .await
            .unwrap()
            .id
    }

    async fn befriend(setup: &Setup, a: Uuid, b: Uuid) {
        let request = setup.social.send_friend_request(a, b, t0()).await.unwrap();
        setup
            .social
            .respond_friend_request(request.id, b, true, t0())
            .await
            .unwrap();
    }

    fn social_error(err: &anyhow::Error) -> Option<&SocialError> {
        match err.downcast_ref::<RepositoryError>() {
            Some(RepositoryError::Social(social)) => Some(social),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_friend_request_lifecycle() {
        let setup = setup_test_db().await;
        let mia = player(&setup, "Mia").await;
        let leo = player(&setup, "Leo").await;

        let request = setup.social.send_friend_request(mia, leo, t0()).await.unwrap();
        assert_eq!(request.status, FriendRequestStatus::Pending);
        assert_eq!(setup.social.incoming_requests(leo).await.unwrap().len(), 1);

        // Either direction counts as a duplicate
        let err = setup
            .social
            .send_friend_request(leo, mia, t0())
            .await
            .unwrap_err();
        assert_eq!(social_error(&err), Some(&SocialError::RequestPending));

        let err = setup
            .social
            .respond_friend_request(request.id, mia, true, t0())
            .await
            .unwrap_err();
        assert_eq!(social_error(&err), Some(&SocialError::NotRecipient));

        let accepted = setup
            .social
            .respond_friend_request(request.id, leo, true, t0())
            .await
            .unwrap();
        assert_eq!(accepted.status, FriendRequestStatus::Accepted);
        assert!(setup.social.are_friends(leo, mia).await.unwrap());

        let friends = setup.social.friends(mia).await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].display_name, "Leo");

        let err = setup
            .social
            .send_friend_request(mia, leo, t0())
            .await
            .unwrap_err();
        assert_eq!(social_error(&err), Some(&SocialError::AlreadyFriends));

        let err = setup
            .social
            .send_friend_request(mia, mia, t0())
            .await
            .unwrap_err();
        assert_eq!(social_error(&err), Some(&SocialError::SelfTarget));
    }

    #[tokio::test]
    async fn test_invite_accept_and_expiry() {
        let setup = setup_test_db().await;
        let mia = player(&setup, "Mia").await;
        let leo = player(&setup, "Leo").await;
        let ana = player(&setup, "Ana").await;
        befriend(&setup, mia, leo).await;

        let err = setup
            .social
            .create_invite(mia, ana, 60, t0())
            .await
            .unwrap_err();
        assert_eq!(social_error(&err), Some(&SocialError::NotFriends));

        let invite = setup.social.create_invite(mia, leo, 60, t0()).await.unwrap();
        assert_eq!(setup.social.pending_invites(leo, t0()).await.unwrap().len(), 1);

        let accepted = setup
            .social
            .respond_invite(invite.id, leo, InviteResponse::Accept, t0() + Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(accepted.status, InviteStatus::Accepted);

        let match_id = Uuid::new_v4();
        setup.social.attach_match(invite.id, match_id).await.unwrap();
        let stored = setup.social.find_invite(invite.id).await.unwrap().unwrap();
        assert_eq!(stored.match_id, Some(match_id));

        // Too late: the invite is expired on the server side
        let late = setup.social.create_invite(mia, leo, 60, t0()).await.unwrap();
        let err = setup
            .social
            .respond_invite(late.id, leo, InviteResponse::Accept, t0() + Duration::seconds(61))
            .await
            .unwrap_err();
        assert_eq!(social_error(&err), Some(&SocialError::InviteExpired));
        let stored = setup.social.find_invite(late.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InviteStatus::Expired);
    }

    #[tokio::test]
    async fn test_reopen_invite_only_without_battle() {
        let setup = setup_test_db().await;
        let mia = player(&setup, "Mia").await;
        let leo = player(&setup, "Leo").await;
        befriend(&setup, mia, leo).await;

        let invite = setup.social.create_invite(mia, leo, 60, t0()).await.unwrap();
        // Pending invites have nothing to reopen
        assert!(!setup.social.reopen_invite(invite.id).await.unwrap());

        setup
            .social
            .respond_invite(invite.id, leo, InviteResponse::Accept, t0())
            .await
            .unwrap();
        assert!(setup.social.reopen_invite(invite.id).await.unwrap());
        let stored = setup.social.find_invite(invite.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InviteStatus::Pending);

        // Accepting again works, and a started battle pins the invite
        setup
            .social
            .respond_invite(invite.id, leo, InviteResponse::Accept, t0())
            .await
            .unwrap();
        setup.social.attach_match(invite.id, Uuid::new_v4()).await.unwrap();
        assert!(!setup.social.reopen_invite(invite.id).await.unwrap());
        let stored = setup.social.find_invite(invite.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InviteStatus::Accepted);
    }

    #[tokio::test]
    async fn test_expire_invites_sweeper() {
        let setup = setup_test_db().await;
        let mia = player(&setup, "Mia").await;
        let leo = player(&setup, "Leo").await;
        befriend(&setup, mia, leo).await;

        let invite = setup.social.create_invite(mia, leo, 60, t0()).await.unwrap();
        assert!(
            setup
                .social
                .expire_invites(t0() + Duration::seconds(10))
                .await
                .unwrap()
                .is_empty()
        );

        let expired = setup
            .social
            .expire_invites(t0() + Duration::seconds(60))
            .await
            .unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, invite.id);

        let err = setup
            .social
            .respond_invite(invite.id, mia, InviteResponse::Cancel, t0())
            .await
            .unwrap_err();
        assert_eq!(social_error(&err), Some(&SocialError::NotPending));
    }

    #[tokio::test]
    async fn test_messages_between_friends() {
        let setup = setup_test_db().await;
        let mia = player(&setup, "Mia").await;
        let leo = player(&setup, "Leo").await;
        let ana = player(&setup, "Ana").await;
        befriend(&setup, mia, leo).await;

        setup
            .social
            .send_message(mia, leo, " hi! ", t0())
            .await
            .unwrap();
        setup
            .social
            .send_message(leo, mia, "ready to battle?", t0() + Duration::seconds(5))
            .await
            .unwrap();

        let err = setup
            .social
            .send_message(mia, ana, "hello", t0())
            .await
            .unwrap_err();
        assert_eq!(social_error(&err), Some(&SocialError::NotFriends));

        let err = setup
            .social
            .send_message(mia, leo, &"a".repeat(501), t0())
            .await
            .unwrap_err();
        assert_eq!(social_error(&err), Some(&SocialError::InvalidMessage));

        let conversation = setup.social.conversation(mia, leo, 50).await.unwrap();
        let bodies: Vec<_> = conversation.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["hi!", "ready to battle?"]);

        assert_eq!(setup.social.mark_read(mia, leo).await.unwrap(), 1);
        assert_eq!(setup.social.mark_read(mia, leo).await.unwrap(), 0);
    }
}
