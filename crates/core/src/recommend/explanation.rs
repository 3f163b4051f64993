use std::fmt;

use serde::{Deserialize, Serialize};

use super::engine::RecommendationEngine;
use crate::domain::product::Category;

/// One justification for recommending a product alongside another
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExplanationReason {
    BoughtTogether { times: u32 },
    SimilarPattern { similarity: f64 },
    SameCategory { category: Category },
    GeneralPopularity,
}

impl fmt::Display for ExplanationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoughtTogether { times } => {
                write!(f, "Frequently bought together ({times} times)")
            }
            Self::SimilarPattern { similarity } => {
                write!(f, "Similar purchase patterns (similarity: {similarity:.2})")
            }
            Self::SameCategory { category } => write!(f, "Same category: {category}"),
            Self::GeneralPopularity => f.write_str("Based on general popularity"),
        }
    }
}

impl RecommendationEngine {
    /// Reasons `recommended` relates to `source`, in a fixed order:
    /// co-occurrence, then similarity, then shared category. Never empty.
    pub fn explanation_reasons(&self, source: &str, recommended: &str) -> Vec<ExplanationReason> {
        let mut reasons = Vec::new();

        let times = self.cooccurrence.count(source, recommended);
        if times > 0 {
            reasons.push(ExplanationReason::BoughtTogether { times });
        }

        if let Some(similarity) = self.product_similarity.score(source, recommended) {
            if similarity > self.settings.explanation_similarity_floor {
                reasons.push(ExplanationReason::SimilarPattern { similarity });
            }
        }

        let category = self.catalog.category_of(source);
        if category.is_known() && category == self.catalog.category_of(recommended) {
            reasons.push(ExplanationReason::SameCategory { category });
        }

        if reasons.is_empty() {
            reasons.push(ExplanationReason::GeneralPopularity);
        }
        reasons
    }

    /// Rendered form of [`Self::explanation_reasons`]
    pub fn explain(&self, source: &str, recommended: &str) -> Vec<String> {
        self.explanation_reasons(source, recommended).iter().map(ToString::to_string).collect()
    }
}
