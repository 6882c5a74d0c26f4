use std::cmp::Ordering;

use arena_types::{LeaderboardEntry, Tier};
use uuid::Uuid;

/// Free matches a player needs before their win rate competes with others.
pub const MIN_MATCHES_FOR_WIN_RATE: i32 = 5;

/// The counters needed to place a player on any leaderboard.
#[derive(Debug, Clone)]
pub struct PlayerStanding {
    pub user_id: Uuid,
    pub display_name: String,
    pub level: i32,
    pub xp: i32,
    pub rank_tier: Tier,
    pub rank_points: i32,
    pub wins: i32,
    pub matches: i32,
}

impl PlayerStanding {
    pub fn win_rate(&self) -> f64 {
        if self.matches <= 0 {
            0.0
        } else {
            f64::from(self.wins) / f64::from(self.matches)
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.matches >= MIN_MATCHES_FOR_WIN_RATE
    }

    fn into_entry(self, rank: usize) -> LeaderboardEntry {
        let win_rate = (self.win_rate() * 1000.0).round() / 10.0;
        let qualified = self.is_qualified();
        LeaderboardEntry {
            rank: rank as u32,
            user_id: self.user_id,
            display_name: self.display_name,
            level: self.level,
            xp: self.xp,
            rank_tier: self.rank_tier,
            rank_points: self.rank_points,
            wins: self.wins,
            matches: self.matches,
            win_rate,
            qualified,
        }
    }
}

fn by_name_then_id(a: &PlayerStanding, b: &PlayerStanding) -> Ordering {
    a.display_name
        .cmp(&b.display_name)
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Compare two players by wins over matches without going through floats.
fn compare_rates(a: &PlayerStanding, b: &PlayerStanding) -> Ordering {
    let left = i64::from(a.wins) * i64::from(b.matches.max(1));
    let right = i64::from(b.wins) * i64::from(a.matches.max(1));
    left.cmp(&right)
}

fn rank(
    mut players: Vec<PlayerStanding>,
    order: impl Fn(&PlayerStanding, &PlayerStanding) -> Ordering,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    players.sort_by(order);
    players
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, player)| player.into_entry(index + 1))
        .collect()
}

/// Players below the minimum sample size always rank after qualified players.
pub fn rank_by_win_rate(players: Vec<PlayerStanding>, limit: usize) -> Vec<LeaderboardEntry> {
    rank(
        players,
        |a, b| {
            b.is_qualified()
                .cmp(&a.is_qualified())
                .then_with(|| compare_rates(b, a))
                .then_with(|| b.wins.cmp(&a.wins))
                .then_with(|| b.matches.cmp(&a.matches))
                .then_with(|| by_name_then_id(a, b))
        },
        limit,
    )
}

pub fn rank_by_xp(players: Vec<PlayerStanding>, limit: usize) -> Vec<LeaderboardEntry> {
    rank(
        players,
        |a, b| {
            b.xp.cmp(&a.xp)
                .then_with(|| b.level.cmp(&a.level))
                .then_with(|| by_name_then_id(a, b))
        },
        limit,
    )
}

pub fn rank_by_rank_points(players: Vec<PlayerStanding>, limit: usize) -> Vec<LeaderboardEntry> {
    rank(
        players,
        |a, b| {
            b.rank_points
                .cmp(&a.rank_points)
                .then_with(|| b.wins.cmp(&a.wins))
                .then_with(|| by_name_then_id(a, b))
        },
        limit,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(name: &str, wins: i32, matches: i32) -> PlayerStanding {
        PlayerStanding {
            user_id: Uuid::new_v4(),
            display_name: name.to_string(),
            level: 1,
            xp: 0,
            rank_tier: Tier::Bronze,
            rank_points: 0,
            wins,
            matches,
        }
    }

    #[test]
    fn test_unqualified_players_rank_below_qualified() {
        let players = vec![
            standing("Perfect", 4, 4),  // 100% but only 4 matches
            standing("Steady", 3, 10),  // 30%
            standing("Decent", 5, 8),   // 62.5%
            standing("Newbie", 1, 1),   // 100%, 1 match
        ];

        let ranked = rank_by_win_rate(players, 10);
        let names: Vec<_> = ranked.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["Decent", "Steady", "Perfect", "Newbie"]);
        assert!(ranked[0].qualified);
        assert!(!ranked[2].qualified);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[3].rank, 4);
    }

    #[test]
    fn test_win_rate_tie_breaks_on_wins_then_matches() {
        let players = vec![
            standing("Small", 3, 6),
            standing("Large", 10, 20),
            standing("Middle", 5, 10),
        ];

        let ranked = rank_by_win_rate(players, 10);
        let names: Vec<_> = ranked.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["Large", "Middle", "Small"]);
        assert_eq!(ranked[0].win_rate, 50.0);
    }

    #[test]
    fn test_zero_matches_does_not_panic() {
        let ranked = rank_by_win_rate(vec![standing("Idle", 0, 0), standing("Busy", 2, 5)], 10);
        assert_eq!(ranked[0].display_name, "Busy");
        assert_eq!(ranked[1].win_rate, 0.0);
    }

    #[test]
    fn test_xp_ranking_and_limit() {
        let mut players = Vec::new();
        for i in 1..=5 {
            let mut player = standing(&format!("P{}", i), 0, 0);
            player.xp = i * 100;
            players.push(player);
        }

        let ranked = rank_by_xp(players, 3);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].xp, 500);
        assert_eq!(ranked[2].xp, 300);
    }

    #[test]
    fn test_rank_points_ladder_uses_wins_as_tie_break() {
        let mut a = standing("A", 3, 5);
        a.rank_points = 200;
        let mut b = standing("B", 7, 9);
        b.rank_points = 200;
        let mut c = standing("C", 1, 1);
        c.rank_points = 350;

        let ranked = rank_by_rank_points(vec![a, b, c], 10);
        let names: Vec<_> = ranked.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
    }
}
