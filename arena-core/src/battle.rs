use std::time::Duration;

use arena_types::{
    AiDifficulty, AnswerResult, BattleView, MatchKind, MatchOutcome, MatchStatus, ScoreCard,
    SeatInfo, WordEntry,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    AI_DISPLAY_NAME, MAX_FIELD_VALUE, MAX_POINTS_PER_QUESTION, QuizQuestion, ai_answer,
    score_answer,
};

/// Largest quiz whose best possible score still fits the packed score format.
pub const MAX_QUESTIONS_PER_BATTLE: usize = (MAX_FIELD_VALUE / MAX_POINTS_PER_QUESTION) as usize;
/// Extra time allowed on top of the per-question limits before a battle is force-finished.
pub const BATTLE_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleError {
    #[error("battle needs between 1 and {max} questions, got {count}")]
    InvalidQuestionCount { count: usize, max: usize },
    #[error("battle has not started")]
    NotStarted,
    #[error("battle is already completed")]
    AlreadyCompleted,
    #[error("all questions already answered")]
    SeatFinished,
    #[error("question {question_index} was already answered")]
    AlreadyAnswered { question_index: u32 },
    #[error("expected an answer to question {expected}, got {got}")]
    OutOfOrder { expected: u32, got: u32 },
    #[error("choice {choice} does not exist")]
    InvalidChoice { choice: u32 },
    #[error("seat is not controlled by the AI")]
    NotAiSeat,
    #[error("player is not part of this battle")]
    NotAParticipant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub fn other(self) -> Self {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }

    fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Participant {
    Human { user_id: Uuid, display_name: String },
    Ai { difficulty: AiDifficulty },
}

impl Participant {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Participant::Human { user_id, .. } => Some(*user_id),
            Participant::Ai { .. } => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Participant::Human { display_name, .. } => display_name,
            Participant::Ai { .. } => AI_DISPLAY_NAME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question_index: u32,
    pub choice: u32,
    pub correct: bool,
    pub points: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct SeatState {
    pub participant: Participant,
    pub score: ScoreCard,
    pub answers: Vec<AnswerRecord>,
}

impl SeatState {
    fn new(participant: Participant) -> Self {
        Self {
            participant,
            score: ScoreCard::default(),
            answers: Vec::new(),
        }
    }

    pub fn correct_answers(&self) -> u32 {
        self.answers.iter().filter(|a| a.correct).count() as u32
    }
}

#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub result: AnswerResult,
    pub seat_finished: bool,
    pub battle_completed: bool,
}

/// One duel between two seats answering the same list of questions at their own pace.
#[derive(Debug, Clone)]
pub struct BattleSession {
    pub id: Uuid,
    pub kind: MatchKind,
    pub status: MatchStatus,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub question_time_limit: Duration,
    questions: Vec<QuizQuestion>,
    seats: [SeatState; 2],
}

impl BattleSession {
    pub fn new(
        id: Uuid,
        kind: MatchKind,
        first: Participant,
        second: Participant,
        questions: Vec<QuizQuestion>,
        question_time_limit: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, BattleError> {
        if questions.is_empty() || questions.len() > MAX_QUESTIONS_PER_BATTLE {
            return Err(BattleError::InvalidQuestionCount {
                count: questions.len(),
                max: MAX_QUESTIONS_PER_BATTLE,
            });
        }

        Ok(Self {
            id,
            kind,
            status: MatchStatus::Pending,
            started_at: now,
            last_activity: now,
            question_time_limit,
            questions,
            seats: [SeatState::new(first), SeatState::new(second)],
        })
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.status == MatchStatus::Pending {
            self.status = MatchStatus::InProgress;
            self.started_at = now;
            self.last_activity = now;
        }
    }

    pub fn seat(&self, seat: Seat) -> &SeatState {
        &self.seats[seat.index()]
    }

    pub fn seat_of(&self, user_id: Uuid) -> Option<Seat> {
        [Seat::First, Seat::Second]
            .into_iter()
            .find(|seat| self.seat(*seat).participant.user_id() == Some(user_id))
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn words(&self) -> Vec<WordEntry> {
        self.questions.iter().map(|q| q.word.clone()).collect()
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    pub fn submit_answer(
        &mut self,
        seat: Seat,
        question_index: u32,
        choice: u32,
        elapsed: Duration,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, BattleError> {
        match self.status {
            MatchStatus::Pending => return Err(BattleError::NotStarted),
            MatchStatus::Completed => return Err(BattleError::AlreadyCompleted),
            MatchStatus::InProgress => {}
        }

        let total = self.questions.len() as u32;
        let state = &self.seats[seat.index()];
        if state.score.finished {
            return Err(BattleError::SeatFinished);
        }

        let expected = state.score.questions_answered;
        if question_index < expected {
            return Err(BattleError::AlreadyAnswered { question_index });
        }
        if question_index != expected {
            return Err(BattleError::OutOfOrder {
                expected,
                got: question_index,
            });
        }

        let question = &self.questions[question_index as usize];
        if choice as usize >= question.choices.len() {
            return Err(BattleError::InvalidChoice { choice });
        }

        let correct = question.is_correct(choice);
        let points = score_answer(correct, elapsed, self.question_time_limit);
        let correct_choice = question.correct_choice;

        let state = &mut self.seats[seat.index()];
        state.answers.push(AnswerRecord {
            question_index,
            choice,
            correct,
            points,
            elapsed,
        });
        state.score.points += points;
        state.score.questions_answered += 1;
        state.score.finished = state.score.questions_answered >= total;
        let score = state.score;

        self.last_activity = now;
        let battle_completed = self.seats.iter().all(|s| s.score.finished);
        if battle_completed {
            self.status = MatchStatus::Completed;
        }

        Ok(AnswerOutcome {
            result: AnswerResult {
                match_id: self.id,
                question_index,
                correct,
                correct_choice,
                points_earned: points,
                score,
            },
            seat_finished: score.finished,
            battle_completed,
        })
    }

    /// Let an AI seat answer questions until it has caught up with `target` answers.
    pub fn advance_ai<R: Rng + ?Sized>(
        &mut self,
        seat: Seat,
        target: u32,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Vec<AnswerOutcome>, BattleError> {
        let difficulty = match self.seat(seat).participant {
            Participant::Ai { difficulty } => difficulty,
            Participant::Human { .. } => return Err(BattleError::NotAiSeat),
        };

        let mut outcomes = Vec::new();
        while self.status == MatchStatus::InProgress {
            let answered = self.seat(seat).score.questions_answered;
            if answered >= target || self.seat(seat).score.finished {
                break;
            }
            let answer = ai_answer(difficulty, &self.questions[answered as usize], rng);
            outcomes.push(self.submit_answer(seat, answered, answer.choice, answer.elapsed, now)?);
        }
        Ok(outcomes)
    }

    /// Latest moment the battle may still be running.
    pub fn deadline(&self) -> DateTime<Utc> {
        let budget = self.question_time_limit * self.questions.len() as u32 + BATTLE_GRACE;
        let budget = chrono::Duration::from_std(budget).unwrap_or_else(|_| chrono::Duration::days(1));
        self.started_at + budget
    }

    pub fn is_timed_out(&self, now: DateTime<Utc>) -> bool {
        self.status == MatchStatus::InProgress && now > self.deadline()
    }

    /// Close the battle; unanswered questions simply score nothing.
    pub fn force_finish(&mut self, now: DateTime<Utc>) {
        if self.status == MatchStatus::Completed {
            return;
        }
        for state in &mut self.seats {
            state.score.finished = true;
        }
        self.status = MatchStatus::Completed;
        self.last_activity = now;
    }

    pub fn winner(&self) -> Option<Seat> {
        if !self.is_completed() {
            return None;
        }
        let first = self.seats[0].score.points;
        let second = self.seats[1].score.points;
        match first.cmp(&second) {
            std::cmp::Ordering::Greater => Some(Seat::First),
            std::cmp::Ordering::Less => Some(Seat::Second),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn outcome_for(&self, seat: Seat) -> Option<MatchOutcome> {
        if !self.is_completed() {
            return None;
        }
        Some(match self.winner() {
            Some(winner) if winner == seat => MatchOutcome::Win,
            Some(_) => MatchOutcome::Loss,
            None => MatchOutcome::Draw,
        })
    }

    fn seat_info(&self, seat: Seat) -> SeatInfo {
        let state = self.seat(seat);
        SeatInfo {
            user_id: state.participant.user_id(),
            display_name: state.participant.display_name().to_string(),
            score: state.score,
        }
    }

    pub fn view_for(&self, seat: Seat) -> BattleView {
        BattleView {
            match_id: self.id,
            kind: self.kind,
            status: self.status,
            you: self.seat_info(seat),
            opponent: self.seat_info(seat.other()),
            questions: self.questions.iter().map(QuizQuestion::public).collect(),
            question_time_limit_seconds: self.question_time_limit.as_secs() as u32,
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_types::Subject;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn questions(count: u32) -> Vec<QuizQuestion> {
        (0..count)
            .map(|index| QuizQuestion {
                index,
                word: WordEntry {
                    id: Uuid::new_v4(),
                    word: format!("word{}", index),
                    meaning: format!("meaning{}", index),
                    phonetic: None,
                    topic: "test".to_string(),
                    grade: 1,
                    subject: Subject::English,
                },
                choices: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_choice: index % 4,
            })
            .collect()
    }

    fn human(name: &str) -> Participant {
        Participant::Human {
            user_id: Uuid::new_v4(),
            display_name: name.to_string(),
        }
    }

    fn started_battle(count: u32) -> BattleSession {
        let mut battle = BattleSession::new(
            Uuid::new_v4(),
            MatchKind::Free,
            human("Alice"),
            human("Bob"),
            questions(count),
            Duration::from_secs(10),
            now(),
        )
        .unwrap();
        battle.start(now());
        battle
    }

    const FAST: Duration = Duration::from_secs(1);

    #[test]
    fn test_question_count_limits() {
        let too_many = BattleSession::new(
            Uuid::new_v4(),
            MatchKind::Free,
            human("A"),
            human("B"),
            questions(MAX_QUESTIONS_PER_BATTLE as u32 + 1),
            Duration::from_secs(10),
            now(),
        );
        assert!(matches!(too_many, Err(BattleError::InvalidQuestionCount { .. })));
        assert_eq!(MAX_QUESTIONS_PER_BATTLE, 11);
    }

    #[test]
    fn test_answers_before_start_are_rejected() {
        let mut battle = BattleSession::new(
            Uuid::new_v4(),
            MatchKind::Free,
            human("A"),
            human("B"),
            questions(3),
            Duration::from_secs(10),
            now(),
        )
        .unwrap();
        let result = battle.submit_answer(Seat::First, 0, 0, FAST, now());
        assert_eq!(result.unwrap_err(), BattleError::NotStarted);
    }

    #[test]
    fn test_answer_updates_score_card() {
        let mut battle = started_battle(3);

        let correct = battle.submit_answer(Seat::First, 0, 0, FAST, now()).unwrap();
        assert!(correct.result.correct);
        assert_eq!(correct.result.points_earned, 9);
        assert_eq!(correct.result.score.questions_answered, 1);

        let wrong = battle.submit_answer(Seat::First, 1, 0, FAST, now()).unwrap();
        assert!(!wrong.result.correct);
        assert_eq!(wrong.result.correct_choice, 1);
        assert_eq!(wrong.result.score.points, 9);
    }

    #[test]
    fn test_ordering_rules() {
        let mut battle = started_battle(3);
        assert_eq!(
            battle.submit_answer(Seat::First, 1, 0, FAST, now()).unwrap_err(),
            BattleError::OutOfOrder {
                expected: 0,
                got: 1
            }
        );

        battle.submit_answer(Seat::First, 0, 0, FAST, now()).unwrap();
        assert_eq!(
            battle.submit_answer(Seat::First, 0, 0, FAST, now()).unwrap_err(),
            BattleError::AlreadyAnswered { question_index: 0 }
        );
        assert_eq!(
            battle.submit_answer(Seat::First, 1, 7, FAST, now()).unwrap_err(),
            BattleError::InvalidChoice { choice: 7 }
        );
    }

    #[test]
    fn test_battle_completes_when_both_seats_finish() {
        let mut battle = started_battle(2);

        battle.submit_answer(Seat::First, 0, 0, FAST, now()).unwrap();
        let first_done = battle.submit_answer(Seat::First, 1, 1, FAST, now()).unwrap();
        assert!(first_done.seat_finished);
        assert!(!first_done.battle_completed);
        assert_eq!(
            battle.submit_answer(Seat::First, 2, 0, FAST, now()).unwrap_err(),
            BattleError::SeatFinished
        );

        battle.submit_answer(Seat::Second, 0, 3, FAST, now()).unwrap();
        let done = battle.submit_answer(Seat::Second, 1, 1, FAST, now()).unwrap();
        assert!(done.battle_completed);
        assert!(battle.is_completed());

        assert_eq!(battle.winner(), Some(Seat::First));
        assert_eq!(battle.outcome_for(Seat::First), Some(MatchOutcome::Win));
        assert_eq!(battle.outcome_for(Seat::Second), Some(MatchOutcome::Loss));
    }

    #[test]
    fn test_equal_points_is_a_draw() {
        let mut battle = started_battle(1);
        battle.submit_answer(Seat::First, 0, 0, FAST, now()).unwrap();
        battle.submit_answer(Seat::Second, 0, 0, FAST, now()).unwrap();
        assert_eq!(battle.winner(), None);
        assert_eq!(battle.outcome_for(Seat::First), Some(MatchOutcome::Draw));
    }

    #[test]
    fn test_timeout_and_force_finish() {
        let mut battle = started_battle(3);
        battle.submit_answer(Seat::First, 0, 0, FAST, now()).unwrap();

        let deadline = battle.deadline();
        assert_eq!(deadline, now() + chrono::Duration::seconds(60));
        assert!(!battle.is_timed_out(deadline));
        assert!(battle.is_timed_out(deadline + chrono::Duration::seconds(1)));

        battle.force_finish(deadline);
        assert!(battle.is_completed());
        assert!(battle.seat(Seat::Second).score.finished);
        assert_eq!(battle.seat(Seat::Second).score.questions_answered, 0);
        assert_eq!(battle.outcome_for(Seat::First), Some(MatchOutcome::Win));
    }

    #[test]
    fn test_ai_catches_up_with_human() {
        let mut battle = BattleSession::new(
            Uuid::new_v4(),
            MatchKind::Free,
            human("Alice"),
            Participant::Ai {
                difficulty: AiDifficulty::Hard,
            },
            questions(3),
            Duration::from_secs(10),
            now(),
        )
        .unwrap();
        battle.start(now());
        let mut rng = StdRng::seed_from_u64(5);

        battle.submit_answer(Seat::First, 0, 0, FAST, now()).unwrap();
        battle.submit_answer(Seat::First, 1, 1, FAST, now()).unwrap();
        let outcomes = battle.advance_ai(Seat::Second, 2, now(), &mut rng).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(battle.seat(Seat::Second).score.questions_answered, 2);

        assert_eq!(
            battle.advance_ai(Seat::First, 3, now(), &mut rng).unwrap_err(),
            BattleError::NotAiSeat
        );
    }

    #[test]
    fn test_view_hides_answers_and_orients_seats() {
        let battle = started_battle(2);
        let view = battle.view_for(Seat::Second);
        assert_eq!(view.you.display_name, "Bob");
        assert_eq!(view.opponent.display_name, "Alice");
        assert_eq!(view.questions.len(), 2);
        assert_eq!(view.question_time_limit_seconds, 10);
    }
}
