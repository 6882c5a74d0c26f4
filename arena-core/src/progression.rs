use arena_types::MatchOutcome;

pub const XP_PER_LEVEL: i32 = 100;
pub const MAX_LEVEL: i32 = 100;
pub const XP_PER_CORRECT_ANSWER: i32 = 1;
pub const XP_PER_STUDIED_WORD: i32 = 2;
pub const STARTING_COINS: i32 = 100;

pub fn level_for_xp(xp: i32) -> i32 {
    (xp.max(0) / XP_PER_LEVEL + 1).min(MAX_LEVEL)
}

/// XP and coins granted to one participant at the end of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchReward {
    pub xp: i32,
    pub coins: i32,
}

pub fn match_reward(outcome: MatchOutcome, correct_answers: u32) -> MatchReward {
    let (base_xp, coins) = match outcome {
        MatchOutcome::Win => (30, 10),
        MatchOutcome::Draw => (20, 5),
        MatchOutcome::Loss => (10, 2),
    };

    MatchReward {
        xp: base_xp + correct_answers as i32 * XP_PER_CORRECT_ANSWER,
        coins,
    }
}

pub fn study_reward(words_studied: usize) -> i32 {
    words_studied as i32 * XP_PER_STUDIED_WORD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_curve() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(1_050), 11);
        assert_eq!(level_for_xp(-40), 1);
        assert_eq!(level_for_xp(1_000_000), MAX_LEVEL);
    }

    #[test]
    fn test_match_rewards() {
        assert_eq!(match_reward(MatchOutcome::Win, 8), MatchReward { xp: 38, coins: 10 });
        assert_eq!(match_reward(MatchOutcome::Draw, 0), MatchReward { xp: 20, coins: 5 });
        assert_eq!(match_reward(MatchOutcome::Loss, 3), MatchReward { xp: 13, coins: 2 });
    }

    #[test]
    fn test_study_reward() {
        assert_eq!(study_reward(0), 0);
        assert_eq!(study_reward(10), 20);
    }
}
