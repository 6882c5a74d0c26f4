//! Packed-integer score codec.
//!
//! Older match rows store each side's progress as a single integer:
//! `points + questions_answered * 100 + finished * 10000`. New code works with
//! [`ScoreCard`] and only touches the packed form at the storage boundary.

use arena_types::ScoreCard;
use thiserror::Error;

pub const FINISHED_FLAG: i64 = 10_000;
pub const FIELD_RADIX: i64 = 100;
/// Largest value either packed field can hold.
pub const MAX_FIELD_VALUE: u32 = 99;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("packed score {0} is negative")]
    Negative(i64),
    #[error("packed score {0} is out of range")]
    OutOfRange(i64),
    #[error("points {0} exceed the packed field limit of 99")]
    PointsOverflow(u32),
    #[error("question count {0} exceeds the packed field limit of 99")]
    QuestionsOverflow(u32),
}

/// Points field of a packed score, exactly as clients have always read it.
pub fn legacy_points(raw: i64) -> i64 {
    if raw >= FINISHED_FLAG {
        (raw - FINISHED_FLAG) % FIELD_RADIX
    } else {
        raw % FIELD_RADIX
    }
}

pub fn decode_legacy(raw: i64) -> Result<ScoreCard, ScoreError> {
    if raw < 0 {
        return Err(ScoreError::Negative(raw));
    }

    let finished = raw >= FINISHED_FLAG;
    let rest = if finished { raw - FINISHED_FLAG } else { raw };

    // A second finished flag or a question field past 99 cannot come from the encoder
    if rest >= FINISHED_FLAG {
        return Err(ScoreError::OutOfRange(raw));
    }

    Ok(ScoreCard {
        points: (rest % FIELD_RADIX) as u32,
        questions_answered: (rest / FIELD_RADIX) as u32,
        finished,
    })
}

pub fn encode_legacy(card: &ScoreCard) -> Result<i64, ScoreError> {
    if card.points > MAX_FIELD_VALUE {
        return Err(ScoreError::PointsOverflow(card.points));
    }
    if card.questions_answered > MAX_FIELD_VALUE {
        return Err(ScoreError::QuestionsOverflow(card.questions_answered));
    }

    let finished = if card.finished { FINISHED_FLAG } else { 0 };
    Ok(i64::from(card.points) + i64::from(card.questions_answered) * FIELD_RADIX + finished)
}
