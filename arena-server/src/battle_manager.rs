use std::sync::Arc;
use std::time::Duration;

use arena_core::{
    BattleError, BattleSession, Participant, QuizError, QuizQuestion, Seat, WordBank, WordFilter,
    build_quiz, compute_streaks, match_reward,
};
use arena_persistence::{
    MatchRepository, MatchResultUpdate, NewMatch, ProfileRepository, TeamRepository,
};
use arena_types::{
    AiDifficulty, AnswerResult, BattleSummary, BattleView, MatchKind, MatchOutcome, MatchRecord,
    ScoreCard, ServerMessage,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::realtime::ConnectionManager;

/// How many recent matches are scanned when refreshing a player's best win streak.
const STREAK_WINDOW: u64 = 50;
/// Words drawn per battle for every question; the extras only supply distractors.
const POOL_FACTOR: usize = 3;

#[derive(Debug, Error)]
pub enum BattleManagerError {
    #[error("battle not found")]
    NotFound,
    #[error("player is already in a battle")]
    AlreadyInBattle,
    #[error(transparent)]
    Battle(#[from] BattleError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct DuelPlayer {
    pub user_id: Uuid,
    pub display_name: String,
}

struct LiveBattle {
    session: BattleSession,
    /// When each seat was shown its current question.
    question_opened_at: [DateTime<Utc>; 2],
}

fn seat_slot(seat: Seat) -> usize {
    match seat {
        Seat::First => 0,
        Seat::Second => 1,
    }
}

impl LiveBattle {
    fn new(mut session: BattleSession, now: DateTime<Utc>) -> Self {
        session.start(now);
        Self {
            session,
            question_opened_at: [now, now],
        }
    }

    fn elapsed_for(&self, seat: Seat, now: DateTime<Utc>) -> Duration {
        (now - self.question_opened_at[seat_slot(seat)])
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// What one answer changed, captured while the session was locked.
struct AnswerStep {
    result: AnswerResult,
    completed: bool,
    scores: (ScoreCard, ScoreCard),
    human_opponent: Option<Uuid>,
}

pub struct BattleManager {
    battles: DashMap<Uuid, LiveBattle>,
    word_bank: Arc<WordBank>,
    profiles: Arc<ProfileRepository>,
    matches: Arc<MatchRepository>,
    teams: Arc<TeamRepository>,
    connections: Arc<ConnectionManager>,
    questions_per_battle: usize,
    question_time_limit: Duration,
}

impl BattleManager {
    pub fn new(
        word_bank: Arc<WordBank>,
        profiles: Arc<ProfileRepository>,
        matches: Arc<MatchRepository>,
        teams: Arc<TeamRepository>,
        connections: Arc<ConnectionManager>,
        questions_per_battle: usize,
        question_time_limit: Duration,
    ) -> Self {
        Self {
            battles: DashMap::new(),
            word_bank,
            profiles,
            matches,
            teams,
            connections,
            questions_per_battle,
            question_time_limit,
        }
    }

    pub fn active_count(&self) -> usize {
        self.battles.len()
    }

    pub fn is_in_battle(&self, user_id: Uuid) -> bool {
        self.battles
            .iter()
            .any(|live| live.session.seat_of(user_id).is_some())
    }

    fn draw_questions(&self, grade: Option<i32>) -> Result<Vec<QuizQuestion>, QuizError> {
        let mut rng = rand::rng();
        let pool_size = self.questions_per_battle * POOL_FACTOR;
        let filter = WordFilter {
            grade,
            ..WordFilter::default()
        };

        let mut pool = self.word_bank.random_words(&filter, pool_size, &mut rng);
        if pool.len() < self.questions_per_battle && grade.is_some() {
            // Not enough words for this grade yet; use the whole bank
            pool = self
                .word_bank
                .random_words(&WordFilter::default(), pool_size, &mut rng);
        }
        build_quiz(&pool, self.questions_per_battle, &mut rng)
    }

    async fn open_battle(
        &self,
        kind: MatchKind,
        first: Participant,
        second: Participant,
        grade: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<Uuid, BattleManagerError> {
        let questions = self.draw_questions(grade)?;
        let id = Uuid::new_v4();
        let session = BattleSession::new(
            id,
            kind,
            first,
            second,
            questions,
            self.question_time_limit,
            now,
        )?;

        let player1_id = session
            .seat(Seat::First)
            .participant
            .user_id()
            .ok_or(BattleError::NotAParticipant)?;
        self.matches
            .create_match(
                NewMatch {
                    id,
                    kind,
                    player1_id,
                    player2_id: session.seat(Seat::Second).participant.user_id(),
                    words: session.words(),
                },
                now,
            )
            .await?;

        self.battles.insert(id, LiveBattle::new(session, now));
        Ok(id)
    }

    /// Start a free battle against the AI. The player always takes the first seat.
    pub async fn start_ai_battle(
        &self,
        user_id: Uuid,
        difficulty: AiDifficulty,
        now: DateTime<Utc>,
    ) -> Result<BattleView, BattleManagerError> {
        if self.is_in_battle(user_id) {
            return Err(BattleManagerError::AlreadyInBattle);
        }
        let profile = self.profiles.get(user_id).await?;

        let id = self
            .open_battle(
                MatchKind::Free,
                Participant::Human {
                    user_id,
                    display_name: profile.display_name,
                },
                Participant::Ai { difficulty },
                Some(profile.grade),
                now,
            )
            .await?;
        info!("User {} started a {:?} AI battle {}", user_id, difficulty, id);

        self.battle_view(id, user_id)
    }

    /// Start a battle between two people and tell both of them about it.
    pub async fn start_duel(
        &self,
        kind: MatchKind,
        first: DuelPlayer,
        second: DuelPlayer,
        now: DateTime<Utc>,
    ) -> Result<Uuid, BattleManagerError> {
        if self.is_in_battle(first.user_id) || self.is_in_battle(second.user_id) {
            return Err(BattleManagerError::AlreadyInBattle);
        }
        let (first_id, second_id) = (first.user_id, second.user_id);

        let id = self
            .open_battle(
                kind,
                Participant::Human {
                    user_id: first.user_id,
                    display_name: first.display_name,
                },
                Participant::Human {
                    user_id: second.user_id,
                    display_name: second.display_name,
                },
                None,
                now,
            )
            .await?;
        info!(
            "Started {} battle {} between {} and {}",
            kind.as_str(),
            id,
            first_id,
            second_id
        );

        for user_id in [first_id, second_id] {
            if let Ok(battle) = self.battle_view(id, user_id) {
                self.connections
                    .notify_user(user_id, ServerMessage::MatchFound { battle })
                    .await;
            }
        }
        Ok(id)
    }

    pub fn battle_view(&self, match_id: Uuid, user_id: Uuid) -> Result<BattleView, BattleManagerError> {
        let live = self
            .battles
            .get(&match_id)
            .ok_or(BattleManagerError::NotFound)?;
        let seat = live
            .session
            .seat_of(user_id)
            .ok_or(BattleError::NotAParticipant)?;
        Ok(live.session.view_for(seat))
    }

    fn apply_answer(
        &self,
        match_id: Uuid,
        user_id: Uuid,
        question_index: u32,
        choice: u32,
        now: DateTime<Utc>,
    ) -> Result<AnswerStep, BattleManagerError> {
        let mut live = self
            .battles
            .get_mut(&match_id)
            .ok_or(BattleManagerError::NotFound)?;
        let seat = live
            .session
            .seat_of(user_id)
            .ok_or(BattleError::NotAParticipant)?;

        let elapsed = live.elapsed_for(seat, now);
        let outcome = live
            .session
            .submit_answer(seat, question_index, choice, elapsed, now)?;
        live.question_opened_at[seat_slot(seat)] = now;

        let opponent = seat.other();
        let human_opponent = live.session.seat(opponent).participant.user_id();
        if human_opponent.is_none() && !outcome.battle_completed {
            // The AI answers the same question the player just did
            let target = outcome.result.score.questions_answered;
            let mut rng = rand::rng();
            live.session.advance_ai(opponent, target, now, &mut rng)?;
        }

        Ok(AnswerStep {
            result: outcome.result,
            completed: live.session.is_completed(),
            scores: (
                live.session.seat(Seat::First).score,
                live.session.seat(Seat::Second).score,
            ),
            human_opponent,
        })
    }

    pub async fn submit_answer(
        &self,
        match_id: Uuid,
        user_id: Uuid,
        question_index: u32,
        choice: u32,
        now: DateTime<Utc>,
    ) -> Result<AnswerResult, BattleManagerError> {
        let step = self.apply_answer(match_id, user_id, question_index, choice, now)?;

        if step.completed {
            if let Some((_, live)) = self.battles.remove(&match_id) {
                self.finish_battle(live.session, now).await?;
            }
        } else {
            let (first, second) = step.scores;
            self.matches.record_progress(match_id, &first, &second).await?;
        }

        if let Some(opponent) = step.human_opponent {
            self.connections
                .notify_user(
                    opponent,
                    ServerMessage::OpponentProgress {
                        match_id,
                        score: step.result.score,
                    },
                )
                .await;
        }

        Ok(step.result)
    }

    /// Persist a completed session and hand out rewards. Runs at most once per match.
    async fn finish_battle(
        &self,
        session: BattleSession,
        now: DateTime<Utc>,
    ) -> Result<(), BattleManagerError> {
        let first = session.seat(Seat::First).score;
        let second = session.seat(Seat::Second).score;
        let winner_id = session
            .winner()
            .and_then(|seat| session.seat(seat).participant.user_id());

        if !self
            .matches
            .complete_match(session.id, &first, &second, winner_id, now)
            .await?
        {
            return Ok(());
        }

        for seat in [Seat::First, Seat::Second] {
            let Some(user_id) = session.seat(seat).participant.user_id() else {
                continue;
            };
            match self.reward_player(&session, seat, user_id).await {
                Ok(summary) => {
                    self.connections
                        .notify_user(user_id, ServerMessage::BattleFinished { summary })
                        .await;
                }
                Err(e) => error!(
                    "Failed to apply results of battle {} for {}: {:#}",
                    session.id, user_id, e
                ),
            }
        }
        Ok(())
    }

    async fn reward_player(
        &self,
        session: &BattleSession,
        seat: Seat,
        user_id: Uuid,
    ) -> anyhow::Result<BattleSummary> {
        let state = session.seat(seat);
        let outcome = session.outcome_for(seat).unwrap_or(MatchOutcome::Draw);
        let reward = match_reward(outcome, state.correct_answers());

        let recorded = self
            .profiles
            .apply_match_result(
                user_id,
                MatchResultUpdate {
                    kind: session.kind,
                    outcome,
                    xp: reward.xp,
                    coins: reward.coins,
                },
            )
            .await?;

        let wins = i32::from(outcome == MatchOutcome::Win);
        self.teams.add_contribution(user_id, reward.xp, wins).await?;

        let recent = self.matches.recent_outcomes(user_id, STREAK_WINDOW).await?;
        let streaks = compute_streaks(&recent);
        let best = i32::try_from(streaks.best_win_streak).unwrap_or(i32::MAX);
        self.profiles.update_best_win_streak(user_id, best).await?;

        Ok(BattleSummary {
            match_id: session.id,
            kind: session.kind,
            outcome,
            your_score: state.score,
            opponent_score: session.seat(seat.other()).score,
            xp_gained: reward.xp,
            coins_gained: reward.coins,
            rank_points_delta: recorded.rank_change.map(|change| change.delta).unwrap_or(0),
            rank_points: recorded.profile.rank_points,
            rank_tier: recorded.profile.rank_tier,
        })
    }

    /// Force-finish battles that ran past their deadline.
    pub async fn sweep_timeouts(&self, now: DateTime<Utc>) -> usize {
        let overdue: Vec<Uuid> = self
            .battles
            .iter()
            .filter(|live| live.session.is_timed_out(now))
            .map(|live| *live.key())
            .collect();

        let mut finished = 0;
        for match_id in overdue {
            let Some((_, mut live)) = self
                .battles
                .remove_if(&match_id, |_, live| live.session.is_timed_out(now))
            else {
                continue;
            };
            live.session.force_finish(now);
            warn!("Battle {} timed out", match_id);
            match self.finish_battle(live.session, now).await {
                Ok(()) => finished += 1,
                Err(e) => error!("Failed to close timed out battle {}: {}", match_id, e),
            }
        }
        finished
    }

    /// Close matches left running by a previous process. Scores stand as stored; no rewards.
    pub async fn close_stale_matches(&self, now: DateTime<Utc>) -> anyhow::Result<usize> {
        let stale: Vec<MatchRecord> = self
            .matches
            .unfinished()
            .await?
            .into_iter()
            .filter(|record| !self.battles.contains_key(&record.id))
            .collect();

        let mut closed = 0;
        for record in stale {
            let winner_id = match record.player1_score.points.cmp(&record.player2_score.points) {
                std::cmp::Ordering::Greater => Some(record.player1_id),
                std::cmp::Ordering::Less => record.player2_id,
                std::cmp::Ordering::Equal => None,
            };
            let mut first = record.player1_score;
            let mut second = record.player2_score;
            first.finished = true;
            second.finished = true;

            if self
                .matches
                .complete_match(record.id, &first, &second, winner_id, now)
                .await?
            {
                closed += 1;
            }
        }
        if closed > 0 {
            info!("Closed {} stale matches", closed);
        }
        Ok(closed)
    }
}
