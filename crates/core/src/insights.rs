//! Dashboard aggregates over the raw transaction set.
//!
//! These are plain group-by summaries, computed once during fit and read by
//! the presentation layer.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::baskets::Basket;
use crate::catalog::CategoryCatalog;
use crate::domain::customer::{CustomerId, CustomerStats};
use crate::domain::product::{Category, ProductStats};
use crate::domain::transaction::Transaction;
use crate::matrix::CooccurrenceMatrix;

/// How many entries the top-products and top-categories lists keep.
pub const TOP_ENTRIES: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalInsights {
    pub total_transactions: u64,
    pub unique_customers: u64,
    pub unique_products: u64,
    pub total_baskets: u64,
    /// Mean line items per basket, rounded to two decimals.
    pub avg_basket_size: f64,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub top_products: Vec<NamedCount>,
    pub top_categories: Vec<NamedCount>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCount {
    pub name: String,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPair {
    pub first: String,
    pub second: String,
    pub cooccurrence: u32,
    pub first_category: Category,
    pub second_category: Category,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyProductCount {
    pub year: i32,
    pub month: u32,
    pub product: String,
    pub transactions: u64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sorted by total transactions descending, then product name ascending.
pub fn product_stats(transactions: &[Transaction], catalog: &CategoryCatalog) -> Vec<ProductStats> {
    #[derive(Default)]
    struct Accumulator<'a> {
        total: u64,
        customers: BTreeSet<&'a CustomerId>,
        first: Option<NaiveDate>,
        last: Option<NaiveDate>,
    }

    let mut grouped: HashMap<&str, Accumulator<'_>> = HashMap::new();
    for transaction in transactions {
        let entry = grouped.entry(transaction.product.as_str()).or_default();
        entry.total += 1;
        entry.customers.insert(&transaction.customer_id);
        entry.first = Some(entry.first.map_or(transaction.date, |d| d.min(transaction.date)));
        entry.last = Some(entry.last.map_or(transaction.date, |d| d.max(transaction.date)));
    }

    let mut stats: Vec<ProductStats> = grouped
        .into_iter()
        .filter_map(|(product, acc)| {
            let unique_customers = acc.customers.len() as u64;
            Some(ProductStats {
                product: product.to_owned(),
                category: catalog.category_of(product),
                total_transactions: acc.total,
                unique_customers,
                first_purchase: acc.first?,
                last_purchase: acc.last?,
                avg_transactions_per_customer: round2(acc.total as f64 / unique_customers as f64),
            })
        })
        .collect();

    stats.sort_by(|a, b| {
        b.total_transactions.cmp(&a.total_transactions).then_with(|| a.product.cmp(&b.product))
    });
    stats
}

/// Sorted by customer id.
pub fn customer_stats(transactions: &[Transaction]) -> Vec<CustomerStats> {
    #[derive(Default)]
    struct Accumulator<'a> {
        total: u64,
        products: BTreeSet<&'a str>,
        days: BTreeSet<NaiveDate>,
    }

    let mut grouped: BTreeMap<&CustomerId, Accumulator<'_>> = BTreeMap::new();
    for transaction in transactions {
        let entry = grouped.entry(&transaction.customer_id).or_default();
        entry.total += 1;
        entry.products.insert(transaction.product.as_str());
        entry.days.insert(transaction.date);
    }

    grouped
        .into_iter()
        .filter_map(|(customer_id, acc)| {
            let shopping_days = acc.days.len() as u64;
            Some(CustomerStats {
                customer_id: customer_id.clone(),
                total_transactions: acc.total,
                unique_products: acc.products.len() as u64,
                first_purchase: *acc.days.first()?,
                last_purchase: *acc.days.last()?,
                shopping_days,
                avg_basket_size: round2(acc.total as f64 / shopping_days as f64),
            })
        })
        .collect()
}

pub fn global_insights(
    transactions: &[Transaction],
    baskets: &[Basket],
    catalog: &CategoryCatalog,
) -> GlobalInsights {
    let customers: BTreeSet<&CustomerId> = transactions.iter().map(|tx| &tx.customer_id).collect();

    let mut product_counts: HashMap<&str, u64> = HashMap::new();
    let mut category_counts: HashMap<Category, u64> = HashMap::new();
    for transaction in transactions {
        *product_counts.entry(transaction.product.as_str()).or_default() += 1;
        *category_counts.entry(catalog.category_of(&transaction.product)).or_default() += 1;
    }

    let avg_basket_size = if baskets.is_empty() {
        0.0
    } else {
        let line_items: usize = baskets.iter().map(Basket::size).sum();
        round2(line_items as f64 / baskets.len() as f64)
    };

    GlobalInsights {
        total_transactions: transactions.len() as u64,
        unique_customers: customers.len() as u64,
        unique_products: product_counts.len() as u64,
        total_baskets: baskets.len() as u64,
        avg_basket_size,
        first_date: transactions.iter().map(|tx| tx.date).min(),
        last_date: transactions.iter().map(|tx| tx.date).max(),
        top_products: top_counts(
            product_counts.into_iter().map(|(name, count)| (name.to_owned(), count)),
        ),
        top_categories: top_counts(
            category_counts
                .into_iter()
                .map(|(category, count)| (category.label().to_owned(), count)),
        ),
    }
}

fn top_counts(counts: impl Iterator<Item = (String, u64)>) -> Vec<NamedCount> {
    let mut named: Vec<NamedCount> =
        counts.map(|(name, count)| NamedCount { name, count }).collect();
    named.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    named.truncate(TOP_ENTRIES);
    named
}

/// Unordered product pairs whose co-occurrence reaches `min_cooccurrence`,
/// strongest first. Pairs that never shared a basket are left out even at a
/// threshold of zero.
pub fn frequently_bought_together(
    cooccurrence: &CooccurrenceMatrix,
    catalog: &CategoryCatalog,
    min_cooccurrence: u32,
) -> Vec<ProductPair> {
    let products = cooccurrence.products();
    let counts = cooccurrence.counts();

    let mut pairs = Vec::new();
    for row in 0..products.len() {
        for col in (row + 1)..products.len() {
            let count = counts.get(row, col);
            if count > 0 && count >= min_cooccurrence {
                let first = products.label(row);
                let second = products.label(col);
                pairs.push(ProductPair {
                    first: first.clone(),
                    second: second.clone(),
                    cooccurrence: count,
                    first_category: catalog.category_of(first),
                    second_category: catalog.category_of(second),
                });
            }
        }
    }

    pairs.sort_by(|a, b| {
        b.cooccurrence
            .cmp(&a.cooccurrence)
            .then_with(|| a.first.cmp(&b.first))
            .then_with(|| a.second.cmp(&b.second))
    });
    pairs
}

/// Transaction counts per calendar month and product, chronological then by
/// product name.
pub fn monthly_product_counts(transactions: &[Transaction]) -> Vec<MonthlyProductCount> {
    let mut grouped: BTreeMap<(i32, u32, &str), u64> = BTreeMap::new();
    for transaction in transactions {
        let key = (transaction.date.year(), transaction.date.month(), transaction.product.as_str());
        *grouped.entry(key).or_default() += 1;
    }

    grouped
        .into_iter()
        .map(|((year, month, product), transactions)| MonthlyProductCount {
            year,
            month,
            product: product.to_owned(),
            transactions,
        })
        .collect()
}
