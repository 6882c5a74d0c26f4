use arena_types::{MatchOutcome, StreakKind, StreakSummary};

fn streak_kind(outcome: MatchOutcome) -> Option<StreakKind> {
    match outcome {
        MatchOutcome::Win => Some(StreakKind::Win),
        MatchOutcome::Loss => Some(StreakKind::Loss),
        MatchOutcome::Draw => None,
    }
}

/// Summarize streaks over results ordered most-recent-first. Draws break any streak.
pub fn compute_streaks(results: &[MatchOutcome]) -> StreakSummary {
    let current_kind = results.first().copied().and_then(streak_kind);
    let current_streak = match current_kind {
        Some(kind) => results
            .iter()
            .take_while(|outcome| streak_kind(**outcome) == Some(kind))
            .count() as u32,
        None => 0,
    };

    let mut best_win_streak = 0;
    let mut best_loss_streak = 0;
    let mut run_kind = None;
    let mut run_length = 0u32;

    for outcome in results {
        let kind = streak_kind(*outcome);
        if kind.is_some() && kind == run_kind {
            run_length += 1;
        } else {
            run_kind = kind;
            run_length = if kind.is_some() { 1 } else { 0 };
        }

        match run_kind {
            Some(StreakKind::Win) => best_win_streak = best_win_streak.max(run_length),
            Some(StreakKind::Loss) => best_loss_streak = best_loss_streak.max(run_length),
            None => {}
        }
    }

    StreakSummary {
        current_streak,
        current_kind,
        best_win_streak,
        best_loss_streak,
    }
}
