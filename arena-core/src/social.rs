use arena_types::{FriendRequestStatus, InviteStatus};
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_INVITE_TTL_SECONDS: i64 = 60;
pub const MAX_MESSAGE_LENGTH: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocialError {
    #[error("you cannot do that with yourself")]
    SelfTarget,
    #[error("you are already friends")]
    AlreadyFriends,
    #[error("a friend request is already pending")]
    RequestPending,
    #[error("request is no longer pending")]
    NotPending,
    #[error("only the recipient can respond")]
    NotRecipient,
    #[error("only the sender can cancel")]
    NotSender,
    #[error("invite has expired")]
    InviteExpired,
    #[error("you can only message friends")]
    NotFriends,
    #[error("message must be between 1 and 500 characters")]
    InvalidMessage,
}

pub fn check_friend_request(
    requester: Uuid,
    addressee: Uuid,
    already_friends: bool,
    pending_exists: bool,
) -> Result<(), SocialError> {
    if requester == addressee {
        return Err(SocialError::SelfTarget);
    }
    if already_friends {
        return Err(SocialError::AlreadyFriends);
    }
    if pending_exists {
        return Err(SocialError::RequestPending);
    }
    Ok(())
}

/// Validate a response to a friend request and return the new status.
pub fn respond_to_friend_request(
    status: FriendRequestStatus,
    addressee: Uuid,
    responder: Uuid,
    accept: bool,
) -> Result<FriendRequestStatus, SocialError> {
    if responder != addressee {
        return Err(SocialError::NotRecipient);
    }
    if status != FriendRequestStatus::Pending {
        return Err(SocialError::NotPending);
    }
    Ok(if accept {
        FriendRequestStatus::Accepted
    } else {
        FriendRequestStatus::Rejected
    })
}

pub fn invite_expiry(created_at: DateTime<Utc>, ttl_seconds: i64) -> DateTime<Utc> {
    created_at + Duration::seconds(ttl_seconds.max(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteResponse {
    Accept,
    Decline,
    Cancel,
}

/// Decide the next status of a battle invite. Expiry is enforced here rather
/// than trusted to the client: a pending invite past its deadline resolves to
/// `Expired` no matter what the caller asked for.
pub fn resolve_invite(
    status: InviteStatus,
    from_user: Uuid,
    to_user: Uuid,
    actor: Uuid,
    response: InviteResponse,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<InviteStatus, SocialError> {
    match response {
        InviteResponse::Cancel if actor != from_user => return Err(SocialError::NotSender),
        InviteResponse::Accept | InviteResponse::Decline if actor != to_user => {
            return Err(SocialError::NotRecipient);
        }
        _ => {}
    }

    if status != InviteStatus::Pending {
        return Err(SocialError::NotPending);
    }
    if now >= expires_at {
        return Ok(InviteStatus::Expired);
    }

    Ok(match response {
        InviteResponse::Accept => InviteStatus::Accepted,
        InviteResponse::Decline => InviteStatus::Declined,
        InviteResponse::Cancel => InviteStatus::Cancelled,
    })
}

pub fn validate_message(body: &str) -> Result<String, SocialError> {
    let trimmed = body.trim();
    let length = trimmed.chars().count();
    if length == 0 || length > MAX_MESSAGE_LENGTH {
        return Err(SocialError::InvalidMessage);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_friend_request_checks() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(check_friend_request(a, a, false, false), Err(SocialError::SelfTarget));
        assert_eq!(check_friend_request(a, b, true, false), Err(SocialError::AlreadyFriends));
        assert_eq!(check_friend_request(a, b, false, true), Err(SocialError::RequestPending));
        assert!(check_friend_request(a, b, false, false).is_ok());
    }

    #[test]
    fn test_friend_request_responses() {
        let addressee = Uuid::new_v4();
        assert_eq!(
            respond_to_friend_request(FriendRequestStatus::Pending, addressee, addressee, true),
            Ok(FriendRequestStatus::Accepted)
        );
        assert_eq!(
            respond_to_friend_request(FriendRequestStatus::Pending, addressee, Uuid::new_v4(), true),
            Err(SocialError::NotRecipient)
        );
        assert_eq!(
            respond_to_friend_request(FriendRequestStatus::Rejected, addressee, addressee, true),
            Err(SocialError::NotPending)
        );
    }

    #[test]
    fn test_invite_expires_after_ttl() {
        let from = Uuid::new_v4();
        let to = Uuid::new_v4();
        let expires = invite_expiry(t0(), DEFAULT_INVITE_TTL_SECONDS);
        assert_eq!(expires, t0() + Duration::seconds(60));

        let on_time = resolve_invite(
            InviteStatus::Pending,
            from,
            to,
            to,
            InviteResponse::Accept,
            expires,
            t0() + Duration::seconds(59),
        );
        assert_eq!(on_time, Ok(InviteStatus::Accepted));

        let late = resolve_invite(
            InviteStatus::Pending,
            from,
            to,
            to,
            InviteResponse::Accept,
            expires,
            expires,
        );
        assert_eq!(late, Ok(InviteStatus::Expired));
    }

    #[test]
    fn test_invite_actor_rules() {
        let from = Uuid::new_v4();
        let to = Uuid::new_v4();
        let expires = invite_expiry(t0(), 60);

        assert_eq!(
            resolve_invite(InviteStatus::Pending, from, to, from, InviteResponse::Accept, expires, t0()),
            Err(SocialError::NotRecipient)
        );
        assert_eq!(
            resolve_invite(InviteStatus::Pending, from, to, to, InviteResponse::Cancel, expires, t0()),
            Err(SocialError::NotSender)
        );
        assert_eq!(
            resolve_invite(InviteStatus::Pending, from, to, from, InviteResponse::Cancel, expires, t0()),
            Ok(InviteStatus::Cancelled)
        );
        assert_eq!(
            resolve_invite(InviteStatus::Declined, from, to, to, InviteResponse::Accept, expires, t0()),
            Err(SocialError::NotPending)
        );
    }

    #[test]
    fn test_message_validation() {
        assert_eq!(validate_message("  hi there "), Ok("hi there".to_string()));
        assert_eq!(validate_message("   "), Err(SocialError::InvalidMessage));
        assert!(validate_message(&"字".repeat(500)).is_ok());
        assert_eq!(validate_message(&"a".repeat(501)), Err(SocialError::InvalidMessage));
    }
}
