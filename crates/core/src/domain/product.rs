use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::ApplicationError;

/// Fixed shelf taxonomy. `Unknown` is the fallback for products missing from
/// the catalog and is never an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    GroceriesPantry,
    Beverages,
    FreshProduce,
    MeatDairy,
    Household,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::GroceriesPantry,
        Category::Beverages,
        Category::FreshProduce,
        Category::MeatDairy,
        Category::Household,
        Category::Unknown,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::GroceriesPantry => "Groceries & Pantry",
            Category::Beverages => "Beverages",
            Category::FreshProduce => "Fresh Produce",
            Category::MeatDairy => "Meat & Dairy",
            Category::Household => "Household",
            Category::Unknown => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Unknown)
    }

    fn key(&self) -> &'static str {
        match self {
            Category::GroceriesPantry => "groceries_pantry",
            Category::Beverages => "beverages",
            Category::FreshProduce => "fresh_produce",
            Category::MeatDairy => "meat_dairy",
            Category::Household => "household",
            Category::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ApplicationError;

    /// Accepts either the display label (`Meat & Dairy`) or the snake_case
    /// key (`meat_dairy`), case-insensitively.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Category::ALL
            .into_iter()
            .find(|category| {
                category.label().eq_ignore_ascii_case(wanted)
                    || category.key().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| {
                ApplicationError::InvalidQuery(format!(
                    "unsupported category `{wanted}` (expected one of: {})",
                    Category::ALL.iter().map(Category::label).collect::<Vec<_>>().join(", ")
                ))
            })
    }
}

/// Per-product aggregates derived from the transaction set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductStats {
    pub product: String,
    pub category: Category,
    pub total_transactions: u64,
    pub unique_customers: u64,
    pub first_purchase: NaiveDate,
    pub last_purchase: NaiveDate,
    /// Rounded to two decimals.
    pub avg_transactions_per_customer: f64,
}
