use arena_types::{MilestoneMetric, MilestoneProgress};

#[derive(Debug, Clone, Copy)]
pub struct MilestoneDefinition {
    pub key: &'static str,
    pub metric: MilestoneMetric,
    pub target: u32,
}

pub const MILESTONES: &[MilestoneDefinition] = &[
    MilestoneDefinition {
        key: "first_win",
        metric: MilestoneMetric::Wins,
        target: 1,
    },
    MilestoneDefinition {
        key: "wins_10",
        metric: MilestoneMetric::Wins,
        target: 10,
    },
    MilestoneDefinition {
        key: "wins_50",
        metric: MilestoneMetric::Wins,
        target: 50,
    },
    MilestoneDefinition {
        key: "wins_100",
        metric: MilestoneMetric::Wins,
        target: 100,
    },
    MilestoneDefinition {
        key: "matches_20",
        metric: MilestoneMetric::Matches,
        target: 20,
    },
    MilestoneDefinition {
        key: "matches_100",
        metric: MilestoneMetric::Matches,
        target: 100,
    },
    MilestoneDefinition {
        key: "words_100",
        metric: MilestoneMetric::WordsStudied,
        target: 100,
    },
    MilestoneDefinition {
        key: "words_500",
        metric: MilestoneMetric::WordsStudied,
        target: 500,
    },
    MilestoneDefinition {
        key: "streak_5",
        metric: MilestoneMetric::WinStreak,
        target: 5,
    },
    MilestoneDefinition {
        key: "streak_10",
        metric: MilestoneMetric::WinStreak,
        target: 10,
    },
];

/// Current counter values for each metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct MilestoneCounters {
    pub wins: u32,
    pub matches: u32,
    pub words_studied: u32,
    pub best_win_streak: u32,
}

impl MilestoneCounters {
    fn value(&self, metric: MilestoneMetric) -> u32 {
        match metric {
            MilestoneMetric::Wins => self.wins,
            MilestoneMetric::Matches => self.matches,
            MilestoneMetric::WordsStudied => self.words_studied,
            MilestoneMetric::WinStreak => self.best_win_streak,
        }
    }
}

/// Percentage towards `target`, clamped to 100.
pub fn progress_percent(current: u32, target: u32) -> u32 {
    if target == 0 {
        return 100;
    }
    let percent = u64::from(current) * 100 / u64::from(target);
    percent.min(100) as u32
}

pub fn milestone_progress(
    definition: &MilestoneDefinition,
    counters: &MilestoneCounters,
) -> MilestoneProgress {
    let current = counters.value(definition.metric);
    MilestoneProgress {
        key: definition.key.to_string(),
        metric: definition.metric,
        target: definition.target,
        current,
        progress_percent: progress_percent(current, definition.target),
        completed: current >= definition.target,
    }
}

pub fn all_milestone_progress(counters: &MilestoneCounters) -> Vec<MilestoneProgress> {
    MILESTONES
        .iter()
        .map(|definition| milestone_progress(definition, counters))
        .collect()
}
