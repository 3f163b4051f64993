//! Basket recommendation engine
//!
//! Fits co-occurrence, interaction and similarity matrices once from a
//! transaction set, then ranks products through interchangeable strategies:
//! item similarity, co-occurrence, a hybrid of the two, customer-based
//! collaborative filtering, basket completion and popularity.

mod engine;
mod explanation;
mod strategies;
mod types;

pub use engine::RecommendationEngine;
pub use explanation::ExplanationReason;
pub use types::*;

use crate::matrix::CooccurrenceCounting;

/// Default strategy tuning
pub const DEFAULT_SETTINGS: StrategySettings = StrategySettings {
    neighbor_pool: 5,
    min_neighbor_similarity: 0.2,
    basket_item_cap: 3,
    basket_partner_depth: 5,
    hybrid_candidate_factor: 2,
    explanation_similarity_floor: 0.3,
    cooccurrence_counting: CooccurrenceCounting::Distinct,
};

/// Recommendations returned when a caller does not ask for a count
pub const DEFAULT_RECOMMENDATIONS: usize = 5;

/// Popular products shown when a caller does not ask for a count
pub const DEFAULT_POPULAR_PRODUCTS: usize = 10;
