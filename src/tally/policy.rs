//! Tally policy supplied by the policy governor.

use serde::{Deserialize, Serialize};

/// A ratio tie-break, applied in the order the policy lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TieBreakCriterion {
    MatchesRatio,
    SetsRatio,
    GamesRatio,

    /// Games won minus games lost; the alternative to `GAMES_RATIO`.
    GamesDifference,

    PointsRatio,
}

/// What a ratio becomes when its denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatioFallback {
    /// The raw numerator.
    #[default]
    Numerator,

    /// The most a participant could win against the whole group, from the
    /// match format and group size.
    TotalExpected,
}

/// Disqualification, head-to-head and tie-break rules for finishing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TallyPolicy {
    pub head_to_head: bool,

    pub tie_break_order: Vec<TieBreakCriterion>,

    /// A participant with a default against them finishes in the lowest tier.
    pub disqualify_defaults: bool,

    /// A participant with a walkover against them finishes in the lowest tier.
    pub disqualify_walkovers: bool,

    pub ratio_fallback: RatioFallback,
}

impl Default for TallyPolicy {
    fn default() -> Self {
        TallyPolicy {
            head_to_head: true,
            tie_break_order: vec![
                TieBreakCriterion::MatchesRatio,
                TieBreakCriterion::SetsRatio,
                TieBreakCriterion::GamesRatio,
                TieBreakCriterion::PointsRatio,
            ],
            disqualify_defaults: true,
            disqualify_walkovers: false,
            ratio_fallback: RatioFallback::Numerator,
        }
    }
}

impl TallyPolicy {
    pub fn with_head_to_head(mut self, enabled: bool) -> Self {
        self.head_to_head = enabled;
        self
    }

    pub fn with_tie_break_order(mut self, order: Vec<TieBreakCriterion>) -> Self {
        self.tie_break_order = order;
        self
    }

    pub fn with_ratio_fallback(mut self, fallback: RatioFallback) -> Self {
        self.ratio_fallback = fallback;
        self
    }
}
