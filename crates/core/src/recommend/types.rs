//! Types for the Recommendation Engine

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ApplicationError;
use crate::matrix::CooccurrenceCounting;

/// Tunable constants of the ranking strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategySettings {
    /// Most similar customers consulted by collaborative filtering (default: 5)
    pub neighbor_pool: usize,
    /// Neighbors below this similarity are ignored (default: 0.2)
    pub min_neighbor_similarity: f64,
    /// Basket products considered, in input order (default: 3)
    pub basket_item_cap: usize,
    /// Co-occurrence partners taken per basket product (default: 5)
    pub basket_partner_depth: usize,
    /// Hybrid asks co-occurrence for this many times `n` candidates (default: 2)
    pub hybrid_candidate_factor: usize,
    /// Similarity above which an explanation cites purchase patterns (default: 0.3)
    pub explanation_similarity_floor: f64,
    /// How basket line items are paired when counting co-occurrence
    pub cooccurrence_counting: CooccurrenceCounting,
}

impl Default for StrategySettings {
    fn default() -> Self {
        super::DEFAULT_SETTINGS
    }
}

/// Which strategy produced a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationMethod {
    Similarity,
    Cooccurrence,
    Hybrid,
    Collaborative,
    Popularity,
    CategoryPopularity,
    BasketHybrid,
}

impl RecommendationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationMethod::Similarity => "similarity",
            RecommendationMethod::Cooccurrence => "cooccurrence",
            RecommendationMethod::Hybrid => "hybrid",
            RecommendationMethod::Collaborative => "collaborative",
            RecommendationMethod::Popularity => "popularity",
            RecommendationMethod::CategoryPopularity => "category_popularity",
            RecommendationMethod::BasketHybrid => "basket_hybrid",
        }
    }
}

impl fmt::Display for RecommendationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a recommendation's score measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    /// Co-occurrence or transaction counts
    Count,
    /// Cosine similarity, or summed neighbor similarities
    Similarity,
}

impl ScoreKind {
    fn of(method: RecommendationMethod) -> Self {
        match method {
            RecommendationMethod::Similarity | RecommendationMethod::Collaborative => {
                ScoreKind::Similarity
            }
            RecommendationMethod::Cooccurrence
            | RecommendationMethod::Hybrid
            | RecommendationMethod::Popularity
            | RecommendationMethod::CategoryPopularity
            | RecommendationMethod::BasketHybrid => ScoreKind::Count,
        }
    }
}

/// A single ranked product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub product: String,
    pub score: f64,
    pub score_kind: ScoreKind,
    pub method: RecommendationMethod,
}

impl Recommendation {
    pub fn new(product: impl Into<String>, score: f64, method: RecommendationMethod) -> Self {
        Self { product: product.into(), score, score_kind: ScoreKind::of(method), method }
    }

    /// Relabel under another strategy; the score keeps its original kind.
    pub fn relabeled(self, method: RecommendationMethod) -> Self {
        Self { method, ..self }
    }

    /// Counts render as integers, similarities with three decimals.
    pub fn display_score(&self) -> String {
        match self.score_kind {
            ScoreKind::Count => format!("{:.0}", self.score),
            ScoreKind::Similarity => format!("{:.3}", self.score),
        }
    }
}

/// Why a strategy handed over to popularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No other customer reached the similarity floor
    NoQualifiedNeighbors,
    /// Neighbors qualified but bought nothing the customer lacks
    NoUnpurchasedCandidates,
    /// The basket had no products
    EmptyBasket,
    /// Basket products had no co-occurring partners outside the basket
    NoBasketCandidates,
}

/// Which path produced a ranked list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum Resolution {
    /// The requested strategy satisfied the query on its own
    Primary,
    /// Hybrid topped up co-occurrence results with similarity results
    Supplemented,
    /// Popularity ranking was returned instead
    Fallback { reason: FallbackReason },
    /// The product or customer is not in the fitted data
    UnknownEntity,
}

/// Output of every strategy: the ranking plus the path that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedList {
    pub items: Vec<Recommendation>,
    pub resolution: Resolution,
}

impl RankedList {
    pub fn primary(items: Vec<Recommendation>) -> Self {
        Self { items, resolution: Resolution::Primary }
    }

    pub fn unknown_entity() -> Self {
        Self { items: Vec::new(), resolution: Resolution::UnknownEntity }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn products(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.product.as_str()).collect()
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.resolution, Resolution::Fallback { .. })
    }
}

/// Product-to-product strategies selectable by callers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStrategy {
    Similarity,
    Cooccurrence,
    #[default]
    Hybrid,
}

impl FromStr for ProductStrategy {
    type Err = ApplicationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "similarity" => Ok(Self::Similarity),
            "cooccurrence" | "co-occurrence" => Ok(Self::Cooccurrence),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(ApplicationError::InvalidQuery(format!(
                "unsupported method `{other}` (expected similarity|cooccurrence|hybrid)"
            ))),
        }
    }
}
