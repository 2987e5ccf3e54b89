//! League classification from the stone balance.
//!
//! Classification is a pure walk over the configured threshold table:
//! highest tier first, the first tier whose minimum the balance meets wins.
//! The table is validated at config load (non-empty, first threshold 0,
//! strictly ascending), so classification is total.

use stonetap_types::League;

use crate::config::LeagueTier;

/// Classify a stone balance into a league tier.
///
/// Negative balances and an empty table both fall back to the lowest tier,
/// so the function never fails.
pub fn classify(stones: i64, thresholds: &[LeagueTier]) -> League {
    thresholds
        .iter()
        .rev()
        .find(|tier| stones >= tier.min_stones)
        .or_else(|| thresholds.first())
        .map_or(League::Pebble, |tier| tier.league)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LeagueConfig;

    fn default_table() -> Vec<LeagueTier> {
        LeagueConfig::default().thresholds
    }

    #[test]
    fn zero_balance_is_lowest_tier() {
        assert_eq!(classify(0, &default_table()), League::Pebble);
    }

    #[test]
    fn boundary_balance_lands_in_higher_tier() {
        let table = default_table();
        assert_eq!(classify(4_999, &table), League::Pebble);
        assert_eq!(classify(5_000, &table), League::Gravel);
        assert_eq!(classify(49_999, &table), League::Gravel);
        assert_eq!(classify(50_000, &table), League::Cobblestone);
    }

    #[test]
    fn top_tier_is_open_ended() {
        let table = default_table();
        assert_eq!(classify(100_000_000, &table), League::Bedrock);
        assert_eq!(classify(i64::MAX, &table), League::Bedrock);
    }

    #[test]
    fn negative_balance_falls_back_to_lowest() {
        assert_eq!(classify(-50, &default_table()), League::Pebble);
    }

    #[test]
    fn empty_table_falls_back_to_lowest() {
        assert_eq!(classify(1_000_000, &[]), League::Pebble);
    }

    #[test]
    fn classification_is_monotone() {
        let table = default_table();
        let mut previous = classify(0, &table);
        for stones in [100, 5_000, 60_000, 120_000, 600_000, 2_000_000] {
            let league = classify(stones, &table);
            assert!(league >= previous, "league regressed at {stones}");
            previous = league;
        }
    }
}
