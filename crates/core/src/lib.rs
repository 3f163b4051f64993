pub mod baskets;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod insights;
pub mod matrix;
pub mod recommend;
pub mod similarity;

pub use baskets::Basket;
pub use catalog::CategoryCatalog;
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::customer::{CustomerId, CustomerStats};
pub use domain::product::{Category, ProductStats};
pub use domain::transaction::Transaction;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use insights::{GlobalInsights, MonthlyProductCount, NamedCount, ProductPair};
pub use matrix::{CooccurrenceCounting, CooccurrenceMatrix, InteractionMatrix};
pub use recommend::{
    ExplanationReason, FallbackReason, ProductStrategy, RankedList, Recommendation,
    RecommendationEngine, RecommendationMethod, Resolution, ScoreKind, StrategySettings,
};
pub use similarity::SimilarityMatrix;
