pub mod prelude;

pub mod battle_invites;
pub mod friend_requests;
pub mod matches;
pub mod messages;
pub mod profiles;
pub mod season_rewards;
pub mod team_applications;
pub mod team_members;
pub mod teams;
pub mod words;
