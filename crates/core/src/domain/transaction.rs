use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;

/// A single purchased line: one customer bought one product on one day.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub customer_id: CustomerId,
    pub date: NaiveDate,
    pub product: String,
}

impl Transaction {
    pub fn new(
        customer_id: impl Into<CustomerId>,
        date: NaiveDate,
        product: impl Into<String>,
    ) -> Self {
        Self { customer_id: customer_id.into(), date, product: product.into() }
    }
}
