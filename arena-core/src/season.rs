use arena_types::Tier;
use chrono::{DateTime, Datelike, Utc};

/// Coins granted at season end for the tier a player finished in.
pub fn season_reward_coins(tier: Tier) -> i32 {
    match tier {
        Tier::Bronze => 50,
        Tier::Silver => 100,
        Tier::Gold => 200,
        Tier::Platinum => 350,
        Tier::Diamond => 500,
        Tier::Master => 750,
        Tier::Champion => 1000,
    }
}

/// Seasons run by calendar month, e.g. `2024-05`.
pub fn season_id_for(date: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// The season that ended most recently before `now`.
pub fn previous_season_id(now: DateTime<Utc>) -> String {
    let (year, month) = if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), now.month() - 1)
    };
    format!("{:04}-{:02}", year, month)
}

pub fn is_valid_season_id(season_id: &str) -> bool {
    let Some((year, month)) = season_id.split_once('-') else {
        return false;
    };
    year.len() == 4
        && year.chars().all(|c| c.is_ascii_digit())
        && month.len() == 2
        && month.parse::<u32>().is_ok_and(|m| (1..=12).contains(&m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rewards_increase_with_tier() {
        let coins: Vec<i32> = Tier::ALL.iter().map(|t| season_reward_coins(*t)).collect();
        assert!(coins.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(season_reward_coins(Tier::Champion), 1000);
    }

    #[test]
    fn test_season_ids() {
        let may = Utc.with_ymd_and_hms(2024, 5, 17, 0, 0, 0).unwrap();
        assert_eq!(season_id_for(may), "2024-05");
        assert_eq!(previous_season_id(may), "2024-04");

        let january = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(previous_season_id(january), "2024-12");
    }

    #[test]
    fn test_season_id_validation() {
        assert!(is_valid_season_id("2024-05"));
        assert!(!is_valid_season_id("2024-13"));
        assert!(!is_valid_season_id("24-05"));
        assert!(!is_valid_season_id("spring"));
    }
}
