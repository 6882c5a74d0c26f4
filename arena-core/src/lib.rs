pub mod ai;
pub mod battle;
pub mod energy;
pub mod leaderboard;
pub mod milestones;
pub mod progression;
pub mod quiz;
pub mod ranking;
pub mod score;
pub mod season;
pub mod social;
pub mod streaks;
pub mod teams;
pub mod word_bank;

// Re-export main components
pub use ai::*;
pub use battle::*;
pub use energy::*;
pub use leaderboard::*;
pub use milestones::*;
pub use progression::*;
pub use quiz::*;
pub use ranking::*;
pub use score::*;
pub use season::*;
pub use social::*;
pub use streaks::*;
pub use teams::*;
pub use word_bank::*;
