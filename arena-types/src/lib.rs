pub mod battle;
pub mod messages;
pub mod profile;
pub mod season;
pub mod social;
pub mod team;
pub mod word;

// Re-export all types
pub use battle::*;
pub use messages::*;
pub use profile::*;
pub use season::*;
pub use social::*;
pub use team::*;
pub use word::*;

pub type UserId = uuid::Uuid;
pub type MatchId = uuid::Uuid;
pub type TeamId = uuid::Uuid;
