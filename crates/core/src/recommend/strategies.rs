//! Ranking strategies over the fitted matrices

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::engine::RecommendationEngine;
use super::types::*;
use crate::domain::customer::CustomerId;
use crate::domain::product::Category;

/// Highest score first, ties on product name ascending.
fn rank_scores(
    scores: HashMap<&str, f64>,
    n: usize,
    method: RecommendationMethod,
) -> Vec<Recommendation> {
    let mut ranked: Vec<(&str, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(b.0))
    });
    ranked
        .into_iter()
        .take(n)
        .map(|(product, score)| Recommendation::new(product, score, method))
        .collect()
}

impl RecommendationEngine {
    /// Product-to-product recommendations through the chosen strategy
    pub fn recommend_for_product(
        &self,
        product: &str,
        n: usize,
        strategy: ProductStrategy,
    ) -> RankedList {
        match strategy {
            ProductStrategy::Similarity => self.similar_products(product, n),
            ProductStrategy::Cooccurrence => self.cooccurring_products(product, n),
            ProductStrategy::Hybrid => self.hybrid_products(product, n),
        }
    }

    /// Top `n` products by similarity to `product`, self excluded
    pub fn similar_products(&self, product: &str, n: usize) -> RankedList {
        if !self.contains_product(product) {
            return RankedList::unknown_entity();
        }

        let items = self
            .product_similarity
            .ranked_neighbors(product)
            .into_iter()
            .take(n)
            .map(|(other, score)| {
                Recommendation::new(other.as_str(), score, RecommendationMethod::Similarity)
            })
            .collect();
        RankedList::primary(items)
    }

    /// Top `n` products by basket co-occurrence with `product`; partners that
    /// never shared a basket are dropped, so fewer than `n` may come back.
    pub fn cooccurring_products(&self, product: &str, n: usize) -> RankedList {
        if !self.contains_product(product) {
            return RankedList::unknown_entity();
        }

        let items = self
            .cooccurrence
            .ranked_partners(product)
            .into_iter()
            .take(n)
            .filter(|(_, count)| *count > 0)
            .map(|(other, count)| {
                Recommendation::new(other, f64::from(count), RecommendationMethod::Cooccurrence)
            })
            .collect();
        RankedList::primary(items)
    }

    /// Co-occurrence first; similarity only tops up when co-occurrence alone
    /// cannot fill `n`. Entries are merged by name (first wins), never blended.
    pub fn hybrid_products(&self, product: &str, n: usize) -> RankedList {
        if !self.contains_product(product) {
            return RankedList::unknown_entity();
        }

        let candidates = n.saturating_mul(self.settings.hybrid_candidate_factor.max(1));
        let cooccurring = self.cooccurring_products(product, candidates).items;
        let cooccurring_len = cooccurring.len();

        let mut merged = cooccurring;
        if cooccurring_len < n {
            let mut seen: HashSet<String> =
                merged.iter().map(|item| item.product.clone()).collect();
            for item in self.similar_products(product, n).items {
                if seen.insert(item.product.clone()) {
                    merged.push(item);
                }
            }
        }
        merged.truncate(n);
        let merged: Vec<Recommendation> = merged
            .into_iter()
            .map(|item| item.relabeled(RecommendationMethod::Hybrid))
            .collect();

        let resolution = if merged.len() > cooccurring_len.min(n) {
            Resolution::Supplemented
        } else {
            Resolution::Primary
        };
        RankedList { items: merged, resolution }
    }

    /// Customer-based collaborative filtering.
    ///
    /// The most similar other customers (up to the neighbor pool, each at or
    /// above the similarity floor) vote for products the customer has never
    /// bought, each vote weighted by the neighbor's similarity. Votes add up.
    /// Falls back to global popularity when no product collects a vote.
    pub fn recommend_for_customer(&self, customer_id: &CustomerId, n: usize) -> RankedList {
        let Some(purchased) = self.interactions.purchased_by(customer_id) else {
            return RankedList::unknown_entity();
        };
        let purchased: HashSet<&str> = purchased.into_iter().collect();

        let mut scores: HashMap<&str, f64> = HashMap::new();
        let mut qualified_neighbors = 0usize;
        for (neighbor, similarity) in self
            .customer_similarity
            .ranked_neighbors(customer_id)
            .into_iter()
            .take(self.settings.neighbor_pool)
        {
            if similarity < self.settings.min_neighbor_similarity {
                continue;
            }
            qualified_neighbors += 1;

            for product in self.interactions.purchased_by(neighbor).unwrap_or_default() {
                if !purchased.contains(product) {
                    *scores.entry(product).or_insert(0.0) += similarity;
                }
            }
        }

        if scores.is_empty() {
            let reason = if qualified_neighbors == 0 {
                FallbackReason::NoQualifiedNeighbors
            } else {
                FallbackReason::NoUnpurchasedCandidates
            };
            return self.popularity_fallback("collaborative", reason, n);
        }

        RankedList::primary(rank_scores(scores, n, RecommendationMethod::Collaborative))
    }

    /// Completes a basket from the co-occurrence partners of its first few
    /// products. Partner counts add up across basket products.
    pub fn recommend_for_basket<S>(&self, basket_products: &[S], n: usize) -> RankedList
    where
        S: AsRef<str>,
    {
        let basket: Vec<&str> = basket_products
            .iter()
            .map(AsRef::as_ref)
            .take(self.settings.basket_item_cap)
            .collect();
        if basket.is_empty() {
            return self.popularity_fallback("basket", FallbackReason::EmptyBasket, n);
        }
        let in_basket: HashSet<&str> = basket.iter().copied().collect();

        let mut scores: HashMap<&str, f64> = HashMap::new();
        for product in &basket {
            for (partner, count) in self
                .cooccurrence
                .ranked_partners(product)
                .into_iter()
                .take(self.settings.basket_partner_depth)
            {
                if count == 0 || in_basket.contains(partner) {
                    continue;
                }
                *scores.entry(partner).or_insert(0.0) += f64::from(count);
            }
        }

        if scores.is_empty() {
            return self.popularity_fallback("basket", FallbackReason::NoBasketCandidates, n);
        }

        RankedList::primary(rank_scores(scores, n, RecommendationMethod::BasketHybrid))
    }

    /// Products by transaction count, optionally within one category. Ties
    /// break on product name ascending.
    pub fn popular_products(&self, n: usize, category: Option<Category>) -> RankedList {
        let method = match category {
            Some(_) => RecommendationMethod::CategoryPopularity,
            None => RecommendationMethod::Popularity,
        };

        let items = self
            .product_stats
            .iter()
            .filter(|stats| stats.total_transactions > 0)
            .filter(|stats| category.map_or(true, |wanted| stats.category == wanted))
            .take(n)
            .map(|stats| {
                Recommendation::new(stats.product.as_str(), stats.total_transactions as f64, method)
            })
            .collect();
        RankedList::primary(items)
    }

    /// Most purchased products within `category`
    pub fn category_recommendations(&self, category: Category, n: usize) -> RankedList {
        self.popular_products(n, Some(category))
    }

    fn popularity_fallback(
        &self,
        strategy: &'static str,
        reason: FallbackReason,
        n: usize,
    ) -> RankedList {
        debug!(
            event_name = "engine.query.fallback",
            strategy,
            reason = ?reason,
            "strategy produced no candidates; serving global popularity"
        );
        RankedList {
            items: self.popular_products(n, None).items,
            resolution: Resolution::Fallback { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::domain::customer::CustomerId;
    use crate::domain::transaction::Transaction;
    use crate::recommend::{
        FallbackReason, ProductStrategy, RecommendationEngine, RecommendationMethod, Resolution,
        ScoreKind,
    };

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, day).expect("valid fixture date")
    }

    fn basket(customer: &str, day: u32, products: &[&str]) -> Vec<Transaction> {
        products.iter().map(|product| Transaction::new(customer, date(day), *product)).collect()
    }

    /// Milk shares baskets with Bread (3x), Eggs (2x), Butter (1x), Jam (1x).
    fn engine() -> RecommendationEngine {
        let transactions = [
            basket("alice", 1, &["Milk", "Bread", "Eggs"]),
            basket("alice", 2, &["Milk", "Bread", "Butter"]),
            basket("bob", 1, &["Milk", "Bread", "Eggs"]),
            basket("bob", 3, &["Milk", "Jam"]),
            basket("carol", 1, &["Bread", "Butter"]),
            basket("dave", 4, &["Tea"]),
        ]
        .concat();
        RecommendationEngine::fit_with_defaults(transactions).expect("fixture fits")
    }

    #[test]
    fn cooccurrence_ranks_by_count_and_excludes_self() {
        let list = engine().cooccurring_products("Milk", 3);

        assert_eq!(list.products(), vec!["Bread", "Eggs", "Butter"]);
        assert_eq!(list.items[0].score, 3.0);
        assert_eq!(list.resolution, Resolution::Primary);
    }

    #[test]
    fn cooccurrence_drops_zero_counts() {
        let list = engine().cooccurring_products("Jam", 5);

        assert_eq!(list.products(), vec!["Milk"]);
    }

    #[test]
    fn similarity_never_returns_the_source_product() {
        let engine = engine();
        for product in engine.products() {
            let list = engine.similar_products(product, 10);
            assert!(!list.products().contains(&product.as_str()));
            assert_eq!(list.len(), engine.products().len() - 1);
        }
    }

    #[test]
    fn unknown_product_yields_empty_unknown_entity() {
        let engine = engine();
        let strategies =
            [ProductStrategy::Similarity, ProductStrategy::Cooccurrence, ProductStrategy::Hybrid];
        for strategy in strategies {
            let list = engine.recommend_for_product("Caviar", 5, strategy);
            assert!(list.is_empty());
            assert_eq!(list.resolution, Resolution::UnknownEntity);
        }
    }

    #[test]
    fn hybrid_equals_cooccurrence_when_it_has_enough() {
        let engine = engine();
        let hybrid = engine.hybrid_products("Milk", 3);
        let cooccurring = engine.cooccurring_products("Milk", 3);

        assert_eq!(hybrid.products(), cooccurring.products());
        assert_eq!(hybrid.resolution, Resolution::Primary);
        assert!(hybrid.items.iter().all(|item| item.method == RecommendationMethod::Hybrid));
    }

    #[test]
    fn hybrid_tops_up_with_similarity_when_cooccurrence_is_short() {
        let engine = engine();
        let hybrid = engine.hybrid_products("Jam", 3);

        assert_eq!(hybrid.len(), 3);
        assert_eq!(hybrid.items[0].product, "Milk");
        assert_eq!(hybrid.resolution, Resolution::Supplemented);
        assert!(!hybrid.products().contains(&"Jam"));

        assert_eq!(hybrid.items[0].score_kind, ScoreKind::Count);
        assert_eq!(hybrid.items[0].display_score(), "1");
        for item in &hybrid.items[1..] {
            assert_eq!(item.method, RecommendationMethod::Hybrid);
            assert_eq!(item.score_kind, ScoreKind::Similarity);
            assert_eq!(item.display_score(), format!("{:.3}", item.score));
        }
    }

    #[test]
    fn collaborative_scores_unpurchased_products_of_neighbors() {
        let list = engine().recommend_for_customer(&CustomerId::from("carol"), 3);

        assert_eq!(list.resolution, Resolution::Primary);
        assert!(list.items.iter().all(|item| item.method == RecommendationMethod::Collaborative));
        // alice (0.71) and bob (0.35) both vote for Eggs and Milk; the tie
        // breaks on name.
        assert_eq!(list.products(), vec!["Eggs", "Milk", "Jam"]);
        assert!((list.items[0].score - list.items[1].score).abs() < 1e-12);
    }

    #[test]
    fn isolated_customer_falls_back_to_popularity() {
        let engine = engine();
        let list = engine.recommend_for_customer(&CustomerId::from("dave"), 4);

        assert_eq!(
            list.resolution,
            Resolution::Fallback { reason: FallbackReason::NoQualifiedNeighbors }
        );
        assert_eq!(list.items, engine.popular_products(4, None).items);
    }

    #[test]
    fn customer_who_already_owns_every_neighbor_product_falls_back_to_popularity() {
        let transactions = [
            basket("xavier", 1, &["Milk", "Bread"]),
            basket("yvonne", 1, &["Milk"]),
        ]
        .concat();
        let engine = RecommendationEngine::fit_with_defaults(transactions).expect("fixture fits");

        let list = engine.recommend_for_customer(&CustomerId::from("xavier"), 3);

        assert_eq!(
            list.resolution,
            Resolution::Fallback { reason: FallbackReason::NoUnpurchasedCandidates }
        );
        assert_eq!(list.products(), vec!["Milk", "Bread"]);
        assert!(list.items.iter().all(|item| item.method == RecommendationMethod::Popularity));
    }

    #[test]
    fn unknown_customer_is_empty() {
        let list = engine().recommend_for_customer(&CustomerId::from("zed"), 4);

        assert!(list.is_empty());
        assert_eq!(list.resolution, Resolution::UnknownEntity);
    }

    #[test]
    fn basket_accumulates_partner_counts_and_skips_basket_items() {
        let list = engine().recommend_for_basket(&["Milk", "Butter"], 5);

        assert_eq!(list.resolution, Resolution::Primary);
        // Bread: 3 with Milk + 2 with Butter; Eggs: 2 with Milk.
        assert_eq!(list.items[0].product, "Bread");
        assert_eq!(list.items[0].score, 5.0);
        assert!(!list.products().contains(&"Milk"));
        assert!(!list.products().contains(&"Butter"));
        assert!(list.items.iter().all(|item| item.method == RecommendationMethod::BasketHybrid));
    }

    #[test]
    fn basket_is_capped_to_first_products() {
        let engine = engine();
        let capped = engine.recommend_for_basket(&["Tea", "Jam", "Eggs", "Butter"], 5);
        let first_three = engine.recommend_for_basket(&["Tea", "Jam", "Eggs"], 5);

        assert_eq!(capped, first_three);
    }

    #[test]
    fn empty_basket_falls_back_to_popularity() {
        let engine = engine();
        let list = engine.recommend_for_basket::<&str>(&[], 3);

        assert_eq!(list.resolution, Resolution::Fallback { reason: FallbackReason::EmptyBasket });
        assert_eq!(list.items, engine.popular_products(3, None).items);
    }

    #[test]
    fn basket_without_partners_falls_back_to_popularity() {
        let list = engine().recommend_for_basket(&["Tea", "Caviar"], 3);

        assert_eq!(
            list.resolution,
            Resolution::Fallback { reason: FallbackReason::NoBasketCandidates }
        );
        assert!(list.items.iter().all(|item| item.method == RecommendationMethod::Popularity));
    }

    #[test]
    fn popularity_sorts_by_count_then_name() {
        let list = engine().popular_products(10, None);

        assert_eq!(list.products(), vec!["Bread", "Milk", "Butter", "Eggs", "Jam", "Tea"]);
        assert_eq!(list.items[0].score, 4.0);
        assert!(list.items.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }

    #[test]
    fn repeated_queries_are_identical() {
        let engine = engine();
        let customer = CustomerId::from("alice");

        assert_eq!(
            engine.recommend_for_customer(&customer, 3),
            engine.recommend_for_customer(&customer, 3)
        );
        assert_eq!(engine.hybrid_products("Bread", 4), engine.hybrid_products("Bread", 4));
    }
}
