pub mod match_repository;
pub mod profile_repository;
pub mod season_repository;
pub mod social_repository;
pub mod team_repository;
pub mod word_repository;
