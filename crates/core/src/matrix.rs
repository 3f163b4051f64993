//! Dense count matrices built once at fit time.
//!
//! Rows and columns are addressed through a [`Vocabulary`], a sorted and
//! deduplicated label set, so string lookups happen once per query and the
//! structural invariants can be checked cell by cell.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::baskets::Basket;
use crate::domain::customer::CustomerId;
use crate::domain::transaction::Transaction;
use crate::errors::{ApplicationError, DomainError};

/// Stable label <-> index mapping.
#[derive(Clone, Debug)]
pub struct Vocabulary<K> {
    labels: Vec<K>,
    positions: HashMap<K, usize>,
}

/// Positions are derived from `labels`, so the labels alone decide equality.
impl<K: PartialEq> PartialEq for Vocabulary<K> {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl<K: Eq> Eq for Vocabulary<K> {}

impl<K> Vocabulary<K>
where
    K: Ord + Hash + Clone,
{
    pub fn from_labels<I>(labels: I) -> Self
    where
        I: IntoIterator<Item = K>,
    {
        let labels: Vec<K> = labels.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        let positions =
            labels.iter().enumerate().map(|(index, label)| (label.clone(), index)).collect();
        Self { labels, positions }
    }

    pub fn index_of<Q>(&self, label: &Q) -> Option<usize>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.positions.get(label).copied()
    }

    pub fn label(&self, index: usize) -> &K {
        &self.labels[index]
    }

    pub fn labels(&self) -> &[K] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Row-major dense matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T> DenseMatrix<T>
where
    T: Copy + Default,
{
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, cells: vec![T::default(); rows * cols] }
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        self.cells[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.cells[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }
}

/// Which list of a basket is paired up when counting co-occurrence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooccurrenceCounting {
    /// Each product counts once per basket: a cell is "baskets containing both".
    #[default]
    Distinct,
    /// Every line item is paired, so repeated purchases inflate counts.
    LineItems,
}

impl FromStr for CooccurrenceCounting {
    type Err = ApplicationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "distinct" => Ok(Self::Distinct),
            "line_items" | "line-items" => Ok(Self::LineItems),
            other => Err(ApplicationError::Configuration(format!(
                "unsupported co-occurrence counting `{other}` (expected distinct|line_items)"
            ))),
        }
    }
}

/// Symmetric, zero-diagonal product x product basket counts.
#[derive(Clone, Debug, PartialEq)]
pub struct CooccurrenceMatrix {
    products: Vocabulary<String>,
    counts: DenseMatrix<u32>,
}

impl CooccurrenceMatrix {
    pub fn build(baskets: &[Basket], counting: CooccurrenceCounting) -> Self {
        let products = Vocabulary::from_labels(
            baskets.iter().flat_map(|basket| basket.products.iter().cloned()),
        );
        let mut counts = DenseMatrix::zeros(products.len(), products.len());

        for basket in baskets {
            let items: Vec<usize> = match counting {
                CooccurrenceCounting::Distinct => basket
                    .distinct_products()
                    .into_iter()
                    .filter_map(|product| products.index_of(product))
                    .collect(),
                CooccurrenceCounting::LineItems => basket
                    .products
                    .iter()
                    .filter_map(|product| products.index_of(product.as_str()))
                    .collect(),
            };

            for (i, &left) in items.iter().enumerate() {
                for (j, &right) in items.iter().enumerate() {
                    // Same-product pairs only occur in line-item mode; skipping
                    // them keeps the diagonal at zero.
                    if i != j && left != right {
                        counts.set(left, right, counts.get(left, right) + 1);
                    }
                }
            }
        }

        Self { products, counts }
    }

    pub fn products(&self) -> &Vocabulary<String> {
        &self.products
    }

    pub fn counts(&self) -> &DenseMatrix<u32> {
        &self.counts
    }

    /// Zero for unknown products and for self pairs.
    pub fn count(&self, left: &str, right: &str) -> u32 {
        match (self.products.index_of(left), self.products.index_of(right)) {
            (Some(row), Some(col)) => self.counts.get(row, col),
            _ => 0,
        }
    }

    pub fn row(&self, product: &str) -> Option<&[u32]> {
        self.products.index_of(product).map(|index| self.counts.row(index))
    }

    pub fn row_total(&self, product: &str) -> u64 {
        self.row(product).map(|row| row.iter().map(|count| u64::from(*count)).sum()).unwrap_or(0)
    }

    /// Partners of `product` sorted by count descending then name ascending,
    /// self excluded. Zero counts are kept; callers decide whether to drop them.
    pub fn ranked_partners(&self, product: &str) -> Vec<(&str, u32)> {
        let Some(source) = self.products.index_of(product) else {
            return Vec::new();
        };

        let mut partners: Vec<(&str, u32)> = self
            .counts
            .row(source)
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != source)
            .map(|(index, count)| (self.products.label(index).as_str(), *count))
            .collect();
        partners.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        partners
    }

    pub fn verify(&self) -> Result<(), DomainError> {
        let size = self.products.len();
        for row in 0..size {
            if self.counts.get(row, row) != 0 {
                return Err(DomainError::NonZeroSelfCount {
                    product: self.products.label(row).clone(),
                });
            }
            for col in (row + 1)..size {
                if self.counts.get(row, col) != self.counts.get(col, row) {
                    return Err(DomainError::AsymmetricCooccurrence {
                        left: self.products.label(row).clone(),
                        right: self.products.label(col).clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Binary customer x product purchase indicator.
#[derive(Clone, Debug, PartialEq)]
pub struct InteractionMatrix {
    customers: Vocabulary<CustomerId>,
    products: Vocabulary<String>,
    purchased: DenseMatrix<u8>,
}

impl InteractionMatrix {
    pub fn build(transactions: &[Transaction]) -> Self {
        let customers =
            Vocabulary::from_labels(transactions.iter().map(|tx| tx.customer_id.clone()));
        let products = Vocabulary::from_labels(transactions.iter().map(|tx| tx.product.clone()));

        let mut counts: DenseMatrix<u32> = DenseMatrix::zeros(customers.len(), products.len());
        for transaction in transactions {
            if let (Some(row), Some(col)) = (
                customers.index_of(&transaction.customer_id),
                products.index_of(transaction.product.as_str()),
            ) {
                counts.set(row, col, counts.get(row, col) + 1);
            }
        }

        let mut purchased = DenseMatrix::zeros(customers.len(), products.len());
        for row in 0..customers.len() {
            for col in 0..products.len() {
                purchased.set(row, col, u8::from(counts.get(row, col) > 0));
            }
        }

        Self { customers, products, purchased }
    }

    pub fn customers(&self) -> &Vocabulary<CustomerId> {
        &self.customers
    }

    pub fn products(&self) -> &Vocabulary<String> {
        &self.products
    }

    pub fn cells(&self) -> &DenseMatrix<u8> {
        &self.purchased
    }

    /// Products the customer bought at least once, in vocabulary order.
    pub fn purchased_by(&self, customer: &CustomerId) -> Option<Vec<&str>> {
        let row = self.customers.index_of(customer)?;
        Some(
            self.purchased
                .row(row)
                .iter()
                .enumerate()
                .filter(|(_, cell)| **cell == 1)
                .map(|(col, _)| self.products.label(col).as_str())
                .collect(),
        )
    }
}
