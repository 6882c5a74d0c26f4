use arena_types::{MatchOutcome, Tier};

pub const WIN_RANK_POINTS: i32 = 25;
pub const LOSS_RANK_POINTS: i32 = -20;

/// Lower bound of rank points for each tier.
pub fn tier_floor(tier: Tier) -> i32 {
    match tier {
        Tier::Bronze => 0,
        Tier::Silver => 100,
        Tier::Gold => 300,
        Tier::Platinum => 600,
        Tier::Diamond => 1000,
        Tier::Master => 1500,
        Tier::Champion => 2500,
    }
}

pub fn tier_for_points(points: i32) -> Tier {
    Tier::ALL
        .into_iter()
        .rev()
        .find(|tier| points >= tier_floor(*tier))
        .unwrap_or(Tier::Bronze)
}

pub fn next_tier(tier: Tier) -> Option<Tier> {
    let position = Tier::ALL.iter().position(|t| *t == tier)?;
    Tier::ALL.get(position + 1).copied()
}

/// Points still needed to reach the next tier, `None` at champion.
pub fn points_to_next_tier(points: i32) -> Option<i32> {
    let next = next_tier(tier_for_points(points))?;
    Some(tier_floor(next) - points.max(0))
}

pub fn rank_delta(outcome: MatchOutcome) -> i32 {
    match outcome {
        MatchOutcome::Win => WIN_RANK_POINTS,
        MatchOutcome::Draw => 0,
        MatchOutcome::Loss => LOSS_RANK_POINTS,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankChange {
    pub previous_points: i32,
    pub points: i32,
    pub delta: i32,
    pub tier: Tier,
    pub promoted: bool,
    pub demoted: bool,
}

/// Apply a ranked result. Rank points never drop below zero.
pub fn apply_ranked_result(current_points: i32, outcome: MatchOutcome) -> RankChange {
    let previous_points = current_points.max(0);
    let points = (previous_points + rank_delta(outcome)).max(0);
    let previous_tier = tier_for_points(previous_points);
    let tier = tier_for_points(points);

    RankChange {
        previous_points,
        points,
        delta: points - previous_points,
        tier,
        promoted: tier > previous_tier,
        demoted: tier < previous_tier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(tier_for_points(0), Tier::Bronze);
        assert_eq!(tier_for_points(99), Tier::Bronze);
        assert_eq!(tier_for_points(100), Tier::Silver);
        assert_eq!(tier_for_points(299), Tier::Silver);
        assert_eq!(tier_for_points(300), Tier::Gold);
        assert_eq!(tier_for_points(600), Tier::Platinum);
        assert_eq!(tier_for_points(1000), Tier::Diamond);
        assert_eq!(tier_for_points(1500), Tier::Master);
        assert_eq!(tier_for_points(2500), Tier::Champion);
        assert_eq!(tier_for_points(100_000), Tier::Champion);
        assert_eq!(tier_for_points(-5), Tier::Bronze);
    }

    #[test]
    fn test_points_to_next_tier() {
        assert_eq!(points_to_next_tier(0), Some(100));
        assert_eq!(points_to_next_tier(280), Some(20));
        assert_eq!(points_to_next_tier(2500), None);
    }

    #[test]
    fn test_win_promotes_across_boundary() {
        let change = apply_ranked_result(90, MatchOutcome::Win);
        assert_eq!(change.points, 115);
        assert_eq!(change.tier, Tier::Silver);
        assert!(change.promoted);
        assert!(!change.demoted);
    }

    #[test]
    fn test_loss_demotes_and_floors_at_zero() {
        let change = apply_ranked_result(105, MatchOutcome::Loss);
        assert_eq!(change.points, 85);
        assert!(change.demoted);

        let floored = apply_ranked_result(10, MatchOutcome::Loss);
        assert_eq!(floored.points, 0);
        assert_eq!(floored.delta, -10);
    }

    #[test]
    fn test_draw_keeps_points() {
        let change = apply_ranked_result(420, MatchOutcome::Draw);
        assert_eq!(change.points, 420);
        assert_eq!(change.delta, 0);
        assert_eq!(change.tier, Tier::Gold);
    }
}
