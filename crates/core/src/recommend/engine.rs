//! Recommendation Engine implementation

use chrono::NaiveDate;
use tracing::info;

use super::types::StrategySettings;
use crate::baskets::{aggregate, Basket};
use crate::catalog::CategoryCatalog;
use crate::domain::customer::{CustomerId, CustomerStats};
use crate::domain::product::{Category, ProductStats};
use crate::domain::transaction::Transaction;
use crate::errors::DomainError;
use crate::insights::{self, GlobalInsights, MonthlyProductCount, ProductPair};
use crate::matrix::{CooccurrenceMatrix, InteractionMatrix};
use crate::similarity::SimilarityMatrix;

/// Fitted engine. Every matrix and aggregate is built eagerly by
/// [`RecommendationEngine::fit`] and is read-only afterwards; queries take
/// `&self` and return the same answer for the same arguments.
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    pub(super) settings: StrategySettings,
    pub(super) catalog: CategoryCatalog,
    pub(super) transactions: Vec<Transaction>,
    pub(super) baskets: Vec<Basket>,
    pub(super) cooccurrence: CooccurrenceMatrix,
    pub(super) interactions: InteractionMatrix,
    pub(super) product_similarity: SimilarityMatrix<String>,
    pub(super) customer_similarity: SimilarityMatrix<CustomerId>,
    pub(super) product_stats: Vec<ProductStats>,
    pub(super) customer_stats: Vec<CustomerStats>,
    pub(super) insights: GlobalInsights,
}

impl RecommendationEngine {
    /// Build every matrix and aggregate from `transactions`.
    ///
    /// Fails only when a built matrix breaks a structural invariant
    /// (co-occurrence symmetry or zero diagonal, similarity symmetry).
    pub fn fit(
        transactions: Vec<Transaction>,
        catalog: CategoryCatalog,
        settings: StrategySettings,
    ) -> Result<Self, DomainError> {
        let baskets = aggregate(&transactions);

        let cooccurrence = CooccurrenceMatrix::build(&baskets, settings.cooccurrence_counting);
        cooccurrence.verify()?;

        let interactions = InteractionMatrix::build(&transactions);

        let product_similarity = SimilarityMatrix::for_products(&cooccurrence);
        product_similarity.verify_symmetric("product")?;
        let customer_similarity = SimilarityMatrix::for_customers(&interactions);
        customer_similarity.verify_symmetric("customer")?;

        let product_stats = insights::product_stats(&transactions, &catalog);
        let customer_stats = insights::customer_stats(&transactions);
        let global = insights::global_insights(&transactions, &baskets, &catalog);

        info!(
            event_name = "engine.fit.completed",
            transactions = transactions.len(),
            baskets = baskets.len(),
            products = cooccurrence.products().len(),
            customers = interactions.customers().len(),
            counting = ?settings.cooccurrence_counting,
            "recommendation engine fitted"
        );

        Ok(Self {
            settings,
            catalog,
            transactions,
            baskets,
            cooccurrence,
            interactions,
            product_similarity,
            customer_similarity,
            product_stats,
            customer_stats,
            insights: global,
        })
    }

    /// Fit with the default catalog and strategy settings
    pub fn fit_with_defaults(transactions: Vec<Transaction>) -> Result<Self, DomainError> {
        Self::fit(transactions, CategoryCatalog::default(), StrategySettings::default())
    }

    /// Rebuild everything from a new transaction snapshot. On failure the
    /// previously fitted state is kept.
    pub fn refit(&mut self, transactions: Vec<Transaction>) -> Result<(), DomainError> {
        *self = Self::fit(transactions, self.catalog.clone(), self.settings)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Fitted state
    // -------------------------------------------------------------------------

    pub fn settings(&self) -> &StrategySettings {
        &self.settings
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn category_of(&self, product: &str) -> Category {
        self.catalog.category_of(product)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn baskets(&self) -> &[Basket] {
        &self.baskets
    }

    pub fn cooccurrence(&self) -> &CooccurrenceMatrix {
        &self.cooccurrence
    }

    pub fn interactions(&self) -> &InteractionMatrix {
        &self.interactions
    }

    pub fn product_similarity(&self) -> &SimilarityMatrix<String> {
        &self.product_similarity
    }

    pub fn customer_similarity(&self) -> &SimilarityMatrix<CustomerId> {
        &self.customer_similarity
    }

    /// Products seen in any basket, sorted by name
    pub fn products(&self) -> &[String] {
        self.cooccurrence.products().labels()
    }

    pub fn contains_product(&self, product: &str) -> bool {
        self.cooccurrence.products().index_of(product).is_some()
    }

    pub fn contains_customer(&self, customer_id: &CustomerId) -> bool {
        self.interactions.customers().index_of(customer_id).is_some()
    }

    // -------------------------------------------------------------------------
    // Dashboard aggregates
    // -------------------------------------------------------------------------

    /// Ranked by total transactions, highest first
    pub fn product_stats(&self) -> &[ProductStats] {
        &self.product_stats
    }

    pub fn product_stats_for(&self, product: &str) -> Option<&ProductStats> {
        self.product_stats.iter().find(|stats| stats.product == product)
    }

    /// Ordered by customer id
    pub fn customer_stats(&self) -> &[CustomerStats] {
        &self.customer_stats
    }

    pub fn customer_stats_for(&self, customer_id: &CustomerId) -> Option<&CustomerStats> {
        self.customer_stats
            .binary_search_by(|stats| stats.customer_id.cmp(customer_id))
            .ok()
            .map(|index| &self.customer_stats[index])
    }

    pub fn global_insights(&self) -> &GlobalInsights {
        &self.insights
    }

    pub fn frequently_bought_together(&self, min_cooccurrence: u32) -> Vec<ProductPair> {
        insights::frequently_bought_together(&self.cooccurrence, &self.catalog, min_cooccurrence)
    }

    pub fn monthly_product_counts(&self) -> Vec<MonthlyProductCount> {
        insights::monthly_product_counts(&self.transactions)
    }

    /// The customer's transactions in date order; same-day lines keep their
    /// source order.
    pub fn purchase_history(&self, customer_id: &CustomerId) -> Vec<&Transaction> {
        let mut history: Vec<&Transaction> =
            self.transactions.iter().filter(|tx| &tx.customer_id == customer_id).collect();
        history.sort_by_key(|tx| tx.date);
        history
    }

    /// Transactions dated within `start..=end`
    pub fn transactions_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<&Transaction> {
        self.transactions.iter().filter(|tx| tx.date >= start && tx.date <= end).collect()
    }
}
