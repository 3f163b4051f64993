//! Basket aggregation: transactions grouped per customer per day.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::domain::transaction::Transaction;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basket {
    pub customer_id: CustomerId,
    pub date: NaiveDate,
    /// Line items in source order. Repeated purchases stay repeated.
    pub products: Vec<String>,
}

impl Basket {
    /// Number of line items, duplicates included.
    pub fn size(&self) -> usize {
        self.products.len()
    }

    /// Products with repeats removed, in order of first appearance.
    pub fn distinct_products(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.products
            .iter()
            .map(String::as_str)
            .filter(|product| seen.insert(*product))
            .collect()
    }
}

/// Groups transactions by `(customer_id, date)`. Output is ordered by customer
/// then date; an empty input yields no baskets.
pub fn aggregate(transactions: &[Transaction]) -> Vec<Basket> {
    let mut grouped: BTreeMap<(&CustomerId, NaiveDate), Vec<String>> = BTreeMap::new();
    for transaction in transactions {
        grouped
            .entry((&transaction.customer_id, transaction.date))
            .or_default()
            .push(transaction.product.clone());
    }

    grouped
        .into_iter()
        .map(|((customer_id, date), products)| Basket {
            customer_id: customer_id.clone(),
            date,
            products,
        })
        .collect()
}
