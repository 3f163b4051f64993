use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CustomerId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for CustomerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Per-customer aggregates derived from the transaction set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerStats {
    pub customer_id: CustomerId,
    pub total_transactions: u64,
    pub unique_products: u64,
    pub first_purchase: NaiveDate,
    pub last_purchase: NaiveDate,
    pub shopping_days: u64,
    /// Line items per shopping day, rounded to two decimals.
    pub avg_basket_size: f64,
}
