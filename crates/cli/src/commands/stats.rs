//! Dataset statistics subcommands.

use chrono::NaiveDate;
use freshcart_core::{ApplicationError, CustomerId};
use serde_json::json;

use super::{respond, CommandResult, GlobalArgs, Session};

pub fn insights(global: &GlobalArgs) -> CommandResult {
    respond(
        "insights",
        (|| -> anyhow::Result<_> {
            let session = Session::open(global)?;
            let insights = session.engine.global_insights().clone();
            let message = format!(
                "{} transactions across {} baskets",
                insights.total_transactions, insights.total_baskets
            );
            Ok((message, insights))
        })(),
    )
}

pub fn product_stats(global: &GlobalArgs, limit: Option<usize>) -> CommandResult {
    respond(
        "product-stats",
        (|| -> anyhow::Result<_> {
            let session = Session::open(global)?;
            let all = session.engine.product_stats();
            let shown = &all[..limit.map_or(all.len(), |limit| limit.min(all.len()))];
            let message = format!("{} of {} products", shown.len(), all.len());
            Ok((message, shown.to_vec()))
        })(),
    )
}

pub fn customer_stats(global: &GlobalArgs, customer_id: Option<&str>) -> CommandResult {
    respond(
        "customer-stats",
        (|| -> anyhow::Result<_> {
            let session = Session::open(global)?;
            let stats = match customer_id {
                Some(raw) => {
                    let id = CustomerId::from(raw);
                    let stats = session.engine.customer_stats_for(&id).ok_or_else(|| {
                        ApplicationError::InvalidQuery(format!(
                            "customer `{raw}` is not in the dataset"
                        ))
                    })?;
                    vec![stats.clone()]
                }
                None => session.engine.customer_stats().to_vec(),
            };
            let message = format!("{} customers", stats.len());
            Ok((message, stats))
        })(),
    )
}

pub fn pairs(global: &GlobalArgs, min_cooccurrence: u32) -> CommandResult {
    respond(
        "pairs",
        (|| -> anyhow::Result<_> {
            let session = Session::open(global)?;
            let pairs = session.engine.frequently_bought_together(min_cooccurrence);
            let message = format!(
                "{} product pairs bought together at least {min_cooccurrence} times",
                pairs.len()
            );
            Ok((message, pairs))
        })(),
    )
}

pub fn history(global: &GlobalArgs, customer_id: &str) -> CommandResult {
    respond(
        "history",
        (|| -> anyhow::Result<_> {
            let session = Session::open(global)?;
            let id = CustomerId::from(customer_id);
            let history: Vec<_> =
                session.engine.purchase_history(&id).into_iter().cloned().collect();
            let message = format!("{} purchases by customer `{customer_id}`", history.len());
            Ok((message, json!({ "customer_id": id, "transactions": history })))
        })(),
    )
}

pub fn range(global: &GlobalArgs, from: NaiveDate, to: NaiveDate) -> CommandResult {
    respond(
        "range",
        (|| -> anyhow::Result<_> {
            if from > to {
                return Err(ApplicationError::InvalidQuery(format!(
                    "--from {from} is after --to {to}"
                ))
                .into());
            }
            let session = Session::open(global)?;
            let transactions: Vec<_> =
                session.engine.transactions_between(from, to).into_iter().cloned().collect();
            let message = format!("{} transactions between {from} and {to}", transactions.len());
            Ok((message, json!({ "from": from, "to": to, "transactions": transactions })))
        })(),
    )
}

pub fn monthly(global: &GlobalArgs, product: Option<&str>) -> CommandResult {
    respond(
        "monthly",
        (|| -> anyhow::Result<_> {
            let session = Session::open(global)?;
            let series: Vec<_> = session
                .engine
                .monthly_product_counts()
                .into_iter()
                .filter(|entry| product.map_or(true, |wanted| entry.product == wanted))
                .collect();
            let message = format!("{} monthly product counts", series.len());
            Ok((message, series))
        })(),
    )
}
