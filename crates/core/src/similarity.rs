//! Cosine similarity over matrix rows.
//!
//! Both matrices are computed for every pair of rows, so cost grows as
//! O(P^2 * P) for products and O(C^2 * P) for customers, with quadratic memory.
//! That is the scaling limit of the engine.

use std::cmp::Ordering;
use std::hash::Hash;

use crate::domain::customer::CustomerId;
use crate::errors::DomainError;
use crate::matrix::{CooccurrenceMatrix, DenseMatrix, InteractionMatrix, Vocabulary};

/// Tolerance used when checking symmetry and self-similarity.
pub const SIMILARITY_TOLERANCE: f64 = 1e-9;

/// Cosine of the angle between two vectors. A zero vector has no direction,
/// so any pair involving one scores 0.
pub fn cosine(left: &[f64], right: &[f64]) -> f64 {
    let dot: f64 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_norm = left.iter().map(|value| value * value).sum::<f64>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f64>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        0.0
    } else {
        dot / (left_norm * right_norm)
    }
}

/// Divides each row by its sum. Rows summing to zero stay zero.
pub fn row_normalize(counts: &DenseMatrix<u32>) -> DenseMatrix<f64> {
    let mut normalized = DenseMatrix::zeros(counts.rows(), counts.cols());
    for row in 0..counts.rows() {
        let total: f64 = counts.row(row).iter().map(|count| f64::from(*count)).sum();
        if total == 0.0 {
            continue;
        }
        for col in 0..counts.cols() {
            normalized.set(row, col, f64::from(counts.get(row, col)) / total);
        }
    }
    normalized
}

/// All-pairs cosine similarity of the rows of `vectors`. Only the upper
/// triangle is computed; the lower one is mirrored so the result is exactly
/// symmetric.
pub fn pairwise_cosine(vectors: &DenseMatrix<f64>) -> DenseMatrix<f64> {
    let size = vectors.rows();
    let mut scores = DenseMatrix::zeros(size, size);
    for row in 0..size {
        for col in row..size {
            let score = cosine(vectors.row(row), vectors.row(col));
            scores.set(row, col, score);
            scores.set(col, row, score);
        }
    }
    scores
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityMatrix<K> {
    labels: Vocabulary<K>,
    scores: DenseMatrix<f64>,
}

impl SimilarityMatrix<String> {
    pub fn for_products(cooccurrence: &CooccurrenceMatrix) -> Self {
        let normalized = row_normalize(cooccurrence.counts());
        Self { labels: cooccurrence.products().clone(), scores: pairwise_cosine(&normalized) }
    }
}

impl SimilarityMatrix<CustomerId> {
    pub fn for_customers(interactions: &InteractionMatrix) -> Self {
        let cells = interactions.cells();
        let mut vectors = DenseMatrix::zeros(cells.rows(), cells.cols());
        for row in 0..cells.rows() {
            for col in 0..cells.cols() {
                vectors.set(row, col, f64::from(cells.get(row, col)));
            }
        }
        Self { labels: interactions.customers().clone(), scores: pairwise_cosine(&vectors) }
    }
}

impl<K> SimilarityMatrix<K>
where
    K: Ord + Hash + Clone + std::fmt::Display,
{
    pub fn labels(&self) -> &Vocabulary<K> {
        &self.labels
    }

    pub fn score<Q>(&self, left: &Q, right: &Q) -> Option<f64>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let row = self.labels.index_of(left)?;
        let col = self.labels.index_of(right)?;
        Some(self.scores.get(row, col))
    }

    /// Every other label with its score, highest first, ties on label
    /// ascending. The self entry is never included.
    pub fn ranked_neighbors<Q>(&self, label: &Q) -> Vec<(&K, f64)>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(source) = self.labels.index_of(label) else {
            return Vec::new();
        };

        let mut neighbors: Vec<(&K, f64)> = self
            .scores
            .row(source)
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != source)
            .map(|(index, score)| (self.labels.label(index), *score))
            .collect();
        neighbors.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(b.0))
        });
        neighbors
    }

    pub fn verify_symmetric(&self, matrix: &'static str) -> Result<(), DomainError> {
        let size = self.labels.len();
        for row in 0..size {
            for col in (row + 1)..size {
                if (self.scores.get(row, col) - self.scores.get(col, row)).abs()
                    > SIMILARITY_TOLERANCE
                {
                    return Err(DomainError::AsymmetricSimilarity {
                        matrix,
                        left: self.labels.label(row).to_string(),
                        right: self.labels.label(col).to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
