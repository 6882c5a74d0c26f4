pub use super::battle_invites::Entity as BattleInvites;
pub use super::friend_requests::Entity as FriendRequests;
pub use super::matches::Entity as Matches;
pub use super::messages::Entity as Messages;
pub use super::profiles::Entity as Profiles;
pub use super::season_rewards::Entity as SeasonRewards;
pub use super::team_applications::Entity as TeamApplications;
pub use super::team_members::Entity as TeamMembers;
pub use super::teams::Entity as Teams;
pub use super::words::Entity as Words;
