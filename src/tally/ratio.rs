//! Ratio arithmetic for tallies.

use crate::types::{MatchUpFormat, SetFormat};

use super::policy::RatioFallback;

/// Rounds to three decimal places.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// The integer key used to compare rounded ratios.
pub fn comparison_key(value: f64) -> i64 {
    (value * 1000.0).round() as i64
}

/// `numerator / denominator` rounded, or `fallback` when the denominator is
/// zero.
pub fn ratio(numerator: u32, denominator: u32, fallback: f64) -> f64 {
    if denominator == 0 {
        fallback
    } else {
        round3(f64::from(numerator) / f64::from(denominator))
    }
}

/// Matches won over matches decided. Falls back to the numerator.
pub fn matches_ratio(won: u32, lost: u32) -> f64 {
    ratio(won, won + lost, f64::from(won))
}

/// Fallback for the sets ratio.
pub fn sets_fallback(policy: RatioFallback, won: u32, opponents: u32, format: &MatchUpFormat) -> f64 {
    match policy {
        RatioFallback::Numerator => f64::from(won),
        RatioFallback::TotalExpected => f64::from(opponents * format.best_of),
    }
}

/// Fallback for the games ratio.
pub fn games_fallback(policy: RatioFallback, won: u32, opponents: u32, format: &MatchUpFormat) -> f64 {
    match policy {
        RatioFallback::Numerator => f64::from(won),
        RatioFallback::TotalExpected => {
            let per_set = match format.set {
                SetFormat::Games { games, .. } => games + 1,
                SetFormat::TiebreakOnly { .. } => 1,
            };
            f64::from(opponents * format.best_of * per_set)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rounds_to_three_places() {
        assert_eq!(ratio(2, 3, 0.0), 0.667);
        assert_eq!(ratio(1, 3, 0.0), 0.333);
        assert_eq!(matches_ratio(2, 1), 0.667);
    }

    #[test]
    fn zero_denominator_uses_fallback() {
        assert_eq!(ratio(4, 0, 4.0), 4.0);
        assert_eq!(matches_ratio(0, 0), 0.0);
    }

    #[test]
    fn total_expected_uses_format_and_group() {
        let format = MatchUpFormat::default();
        // 3 opponents, best of 3.
        assert_eq!(sets_fallback(RatioFallback::TotalExpected, 6, 3, &format), 9.0);
        // 3 opponents, best of 3, 6 games + 1.
        assert_eq!(games_fallback(RatioFallback::TotalExpected, 36, 3, &format), 63.0);
        assert_eq!(games_fallback(RatioFallback::Numerator, 36, 3, &format), 36.0);
    }

    proptest! {
        #[test]
        fn key_orders_like_rounded_ratio(a in 0u32..200, b in 1u32..200, c in 0u32..200, d in 1u32..200) {
            let x = ratio(a, b, 0.0);
            let y = ratio(c, d, 0.0);
            if x < y {
                prop_assert!(comparison_key(x) < comparison_key(y));
            }
        }
    }
}
