use std::time::Duration;

use arena_types::AiDifficulty;
use rand::Rng;

use crate::QuizQuestion;

pub const AI_DISPLAY_NAME: &str = "Word Bot";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiProfile {
    /// Probability of picking the correct choice.
    pub accuracy: f64,
    pub min_response: Duration,
    pub max_response: Duration,
}

pub fn ai_profile(difficulty: AiDifficulty) -> AiProfile {
    match difficulty {
        AiDifficulty::Easy => AiProfile {
            accuracy: 0.55,
            min_response: Duration::from_millis(4_000),
            max_response: Duration::from_millis(9_000),
        },
        AiDifficulty::Normal => AiProfile {
            accuracy: 0.70,
            min_response: Duration::from_millis(2_500),
            max_response: Duration::from_millis(7_000),
        },
        AiDifficulty::Hard => AiProfile {
            accuracy: 0.85,
            min_response: Duration::from_millis(1_500),
            max_response: Duration::from_millis(5_000),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiAnswer {
    pub choice: u32,
    pub elapsed: Duration,
}

pub fn ai_answer<R: Rng + ?Sized>(
    difficulty: AiDifficulty,
    question: &QuizQuestion,
    rng: &mut R,
) -> AiAnswer {
    let profile = ai_profile(difficulty);
    let min = profile.min_response.as_millis() as u64;
    let max = profile.max_response.as_millis() as u64;
    let elapsed = Duration::from_millis(rng.random_range(min..=max));

    let choice_count = question.choices.len() as u32;
    let choice = if choice_count <= 1 || rng.random_bool(profile.accuracy) {
        question.correct_choice
    } else {
        // Any wrong choice, chosen uniformly
        let offset = rng.random_range(1..choice_count);
        (question.correct_choice + offset) % choice_count
    };

    AiAnswer { choice, elapsed }
}
