//! Recommendation subcommands.

use freshcart_core::{
    ApplicationError, Category, CustomerId, ExplanationReason, ProductStrategy, RankedList,
    RecommendationEngine, RecommendationMethod, Resolution,
};
use serde::Serialize;
use serde_json::json;

use super::{respond, CommandResult, GlobalArgs, Session};

#[derive(Debug, Serialize)]
pub struct RecommendationView {
    pub rank: usize,
    pub product: String,
    pub score: f64,
    pub display_score: String,
    pub method: RecommendationMethod,
    pub category: Category,
}

#[derive(Debug, Serialize)]
pub struct RankedOutput {
    pub resolution: Resolution,
    pub recommendations: Vec<RecommendationView>,
}

fn ranked_output(engine: &RecommendationEngine, list: RankedList) -> RankedOutput {
    let recommendations = list
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| RecommendationView {
            rank: index + 1,
            product: item.product.clone(),
            score: item.score,
            display_score: item.display_score(),
            method: item.method,
            category: engine.category_of(&item.product),
        })
        .collect();
    RankedOutput { resolution: list.resolution, recommendations }
}

fn summary(subject: &str, output: &RankedOutput) -> String {
    match output.resolution {
        Resolution::UnknownEntity => format!("{subject} is not in the dataset"),
        Resolution::Fallback { reason } => format!(
            "{} popular products for {subject} ({reason:?})",
            output.recommendations.len()
        ),
        Resolution::Primary | Resolution::Supplemented => {
            format!("{} recommendations for {subject}", output.recommendations.len())
        }
    }
}

pub fn products(global: &GlobalArgs, product: &str, limit: usize, method: &str) -> CommandResult {
    respond(
        "products",
        (|| -> anyhow::Result<_> {
            let strategy = method.parse::<ProductStrategy>()?;
            let session = Session::open(global)?;
            let list = session.engine.recommend_for_product(product, limit, strategy);
            let output = ranked_output(&session.engine, list);
            let message = summary(&format!("product `{product}`"), &output);
            Ok((message, json!({ "product": product, "strategy": strategy, "result": output })))
        })(),
    )
}

pub fn customer(global: &GlobalArgs, customer_id: &str, limit: usize) -> CommandResult {
    respond(
        "customer",
        (|| -> anyhow::Result<_> {
            let session = Session::open(global)?;
            let id = CustomerId::from(customer_id);
            let list = session.engine.recommend_for_customer(&id, limit);
            let output = ranked_output(&session.engine, list);
            let message = summary(&format!("customer `{customer_id}`"), &output);
            Ok((message, json!({ "customer_id": id, "result": output })))
        })(),
    )
}

pub fn basket(global: &GlobalArgs, basket_products: &[String], limit: usize) -> CommandResult {
    respond(
        "basket",
        (|| -> anyhow::Result<_> {
            let session = Session::open(global)?;
            let list = session.engine.recommend_for_basket(basket_products, limit);
            let output = ranked_output(&session.engine, list);
            let message = summary("the basket", &output);
            Ok((message, json!({ "basket": basket_products, "result": output })))
        })(),
    )
}

pub fn popular(global: &GlobalArgs, limit: usize, category: Option<&str>) -> CommandResult {
    respond(
        "popular",
        (|| -> anyhow::Result<_> {
            let category = category.map(str::parse::<Category>).transpose()?;
            let session = Session::open(global)?;
            let list = match category {
                Some(category) => session.engine.category_recommendations(category, limit),
                None => session.engine.popular_products(limit, None),
            };
            let output = ranked_output(&session.engine, list);
            let subject = category.map_or_else(|| "all categories".to_string(), |c| c.to_string());
            let message = format!("{} popular products in {subject}", output.recommendations.len());
            Ok((message, json!({ "category": category, "result": output })))
        })(),
    )
}

#[derive(Debug, Serialize)]
struct ExplanationOutput<'a> {
    product: &'a str,
    recommended: &'a str,
    reasons: Vec<String>,
    details: Vec<ExplanationReason>,
}

pub fn explain(global: &GlobalArgs, product: &str, recommended: &str) -> CommandResult {
    respond(
        "explain",
        (|| -> anyhow::Result<_> {
            if product == recommended {
                return Err(ApplicationError::InvalidQuery(
                    "--product and --recommended must name different products".to_string(),
                )
                .into());
            }
            let session = Session::open(global)?;
            let details = session.engine.explanation_reasons(product, recommended);
            let reasons: Vec<String> = details.iter().map(ToString::to_string).collect();
            let message = reasons.join("; ");
            Ok((message, ExplanationOutput { product, recommended, reasons, details }))
        })(),
    )
}

#[derive(Debug, Serialize)]
struct CategoryListing {
    category: Category,
    label: &'static str,
    products: Vec<String>,
}

/// Catalog categories with their known products, plus any dataset products
/// the catalog does not cover.
pub fn catalog(global: &GlobalArgs) -> CommandResult {
    respond(
        "catalog",
        (|| -> anyhow::Result<_> {
            let session = Session::open(global)?;
            let catalog = session.engine.catalog();

            let mut listings: Vec<CategoryListing> = Category::ALL
                .into_iter()
                .filter(|category| category.is_known())
                .map(|category| CategoryListing {
                    category,
                    label: category.label(),
                    products: catalog
                        .products_in(category)
                        .into_iter()
                        .map(str::to_owned)
                        .collect(),
                })
                .collect();
            let uncategorised: Vec<String> = session
                .engine
                .products()
                .iter()
                .filter(|product| !catalog.category_of(product).is_known())
                .cloned()
                .collect();
            listings.push(CategoryListing {
                category: Category::Unknown,
                label: Category::Unknown.label(),
                products: uncategorised,
            });

            let message = format!("{} catalog entries", catalog.len());
            Ok((message, listings))
        })(),
    )
}
