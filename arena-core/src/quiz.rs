use std::time::Duration;

use arena_types::{Question, WordEntry};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

pub const CHOICES_PER_QUESTION: usize = 4;
pub const BASE_POINTS: u32 = 6;
/// Most points a single question can award (base plus the best speed bonus).
pub const MAX_POINTS_PER_QUESTION: u32 = BASE_POINTS + 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("need at least {needed} words to build a quiz, found {found}")]
    NotEnoughWords { needed: usize, found: usize },
    #[error("word pool needs at least two distinct meanings")]
    NotEnoughMeanings,
}

/// A question together with its answer key. Never sent to clients as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizQuestion {
    pub index: u32,
    pub word: WordEntry,
    pub choices: Vec<String>,
    pub correct_choice: u32,
}

impl QuizQuestion {
    pub fn public(&self) -> Question {
        Question {
            index: self.index,
            word: self.word.word.clone(),
            phonetic: self.word.phonetic.clone(),
            choices: self.choices.clone(),
        }
    }

    pub fn is_correct(&self, choice: u32) -> bool {
        choice == self.correct_choice
    }
}

/// Build `count` multiple-choice questions asking for the meaning of each word.
///
/// The first `count` words of the pool become questions; every word in the
/// pool can supply distractor meanings.
pub fn build_quiz<R: Rng + ?Sized>(
    pool: &[WordEntry],
    count: usize,
    rng: &mut R,
) -> Result<Vec<QuizQuestion>, QuizError> {
    if pool.len() < count || count == 0 {
        return Err(QuizError::NotEnoughWords {
            needed: count.max(1),
            found: pool.len(),
        });
    }

    let mut meanings: Vec<&str> = pool.iter().map(|w| w.meaning.as_str()).collect();
    meanings.sort_unstable();
    meanings.dedup();
    if meanings.len() < 2 {
        return Err(QuizError::NotEnoughMeanings);
    }

    let mut questions = Vec::with_capacity(count);
    for (index, word) in pool.iter().take(count).enumerate() {
        let mut distractors: Vec<&str> = meanings
            .iter()
            .copied()
            .filter(|meaning| *meaning != word.meaning)
            .collect();
        distractors.shuffle(rng);
        distractors.truncate(CHOICES_PER_QUESTION - 1);

        let mut choices: Vec<String> = distractors.into_iter().map(str::to_string).collect();
        choices.push(word.meaning.clone());
        choices.shuffle(rng);

        let correct_choice = choices
            .iter()
            .position(|choice| *choice == word.meaning)
            .unwrap_or_default() as u32;

        questions.push(QuizQuestion {
            index: index as u32,
            word: word.clone(),
            choices,
            correct_choice,
        });
    }

    Ok(questions)
}

/// Extra points for answering quickly.
pub fn speed_bonus(elapsed: Duration) -> u32 {
    match elapsed.as_millis() {
        0..=3_000 => 3,
        3_001..=5_000 => 2,
        5_001..=8_000 => 1,
        _ => 0,
    }
}

/// Points for one answer; late or wrong answers score nothing.
pub fn score_answer(correct: bool, elapsed: Duration, time_limit: Duration) -> u32 {
    if !correct || elapsed > time_limit {
        return 0;
    }
    BASE_POINTS + speed_bonus(elapsed)
}
