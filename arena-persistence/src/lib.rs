pub mod connection;
pub mod entities;
pub mod error;
pub mod repositories;

pub use error::RepositoryError;
pub use repositories::{
    match_repository::{MatchRepository, NewMatch},
    profile_repository::{
        MatchResultUpdate, NewProfile, ProfileRepository, RecordedResult, StudyCharge,
        StudyOutcome,
    },
    season_repository::{SeasonAwardReport, SeasonRepository},
    social_repository::SocialRepository,
    team_repository::{MemberRemoval, TeamRepository},
    word_repository::WordRepository,
};
