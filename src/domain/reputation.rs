//! Reputation rules: rating aggregation, progress-level tiers and badges.
//!
//! Everything here is pure. The review operations gather [`ReviewStats`]
//! under the expert lock and persist the [`ReputationUpdate`] computed here.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::models::{Badge, BadgeSet, ExpertDetails, ProgressLevel, ReputationUpdate};

/// Reviews created within this many days count towards IN_DEMAND
pub const IN_DEMAND_WINDOW_DAYS: i32 = 30;

const IN_DEMAND_MIN_RECENT_REVIEWS: i64 = 10;
const VERSATILE_MIN_EXPERTISE: usize = 3;

/// (minimum reviews, minimum average, level), checked top-down
const TIERS: [(i64, Decimal, ProgressLevel); 3] = [
    (100, dec!(4.8), ProgressLevel::Platinum),
    (50, dec!(4.7), ProgressLevel::Gold),
    (10, dec!(4.5), ProgressLevel::Silver),
];

/// Aggregates over an expert's current review set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewStats {
    pub review_count: i64,
    pub rating_sum: i64,
    /// Reviews created inside the IN_DEMAND window
    pub recent_review_count: i64,
}

impl ReviewStats {
    pub fn from_ratings<I>(ratings: I, recent_review_count: i64) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        let (review_count, rating_sum) = ratings
            .into_iter()
            .fold((0i64, 0i64), |(count, sum), rating| (count + 1, sum + rating as i64));

        Self {
            review_count,
            rating_sum,
            recent_review_count,
        }
    }

    /// Exact arithmetic mean, zero when there are no reviews
    pub fn average_rating(&self) -> Decimal {
        if self.review_count == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.rating_sum) / Decimal::from(self.review_count)
    }

    /// The mean rounded half-up to one decimal place, as stored
    pub fn rounded_rating(&self) -> Decimal {
        self.average_rating()
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    }
}

pub fn determine_progress_level(review_count: i64, average_rating: Decimal) -> ProgressLevel {
    TIERS
        .iter()
        .find(|(min_reviews, min_average, _)| {
            review_count >= *min_reviews && average_rating >= *min_average
        })
        .map(|(_, _, level)| *level)
        .unwrap_or(ProgressLevel::Bronze)
}

/// Derived badges from scratch, plus whatever manual badges are already held
pub fn determine_badges(
    stats: &ReviewStats,
    expertise_count: usize,
    current: &BadgeSet,
) -> BadgeSet {
    let average = stats.average_rating();
    let count = stats.review_count;

    let mut badges: BadgeSet = current.iter().copied().filter(Badge::is_manual).collect();

    if average >= dec!(4.8) && count >= 10 {
        badges.insert(Badge::TopRated);
    }
    if (3..10).contains(&count) {
        badges.insert(Badge::RisingExpert);
    }
    if stats.recent_review_count >= IN_DEMAND_MIN_RECENT_REVIEWS {
        badges.insert(Badge::InDemand);
    }
    if count >= 100 && average >= dec!(4.8) {
        badges.insert(Badge::EliteExpert);
    }
    if expertise_count >= VERSATILE_MIN_EXPERTISE && average >= dec!(4.5) {
        badges.insert(Badge::VersatilePro);
    }

    badges
}

/// New rating, level and badge set for an expert given its review stats
pub fn compute_reputation(expert: &ExpertDetails, stats: &ReviewStats) -> ReputationUpdate {
    ReputationUpdate {
        ratings: stats.rounded_rating(),
        progress_level: determine_progress_level(stats.review_count, stats.average_rating()),
        badges: determine_badges(stats, expert.expertise.len(), &expert.badges),
    }
}

/// Badges in `new` that were not in `old`
pub fn earned_badges(old: &BadgeSet, new: &BadgeSet) -> Vec<Badge> {
    new.difference(old).copied().collect()
}
