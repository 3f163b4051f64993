use chrono::NaiveDate;
use freshcart_core::{
    CategoryCatalog, CooccurrenceCounting, CustomerId, FallbackReason, ProductStrategy,
    RecommendationEngine, RecommendationMethod, Resolution, StrategySettings, Transaction,
};

type PropertyTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

const PRODUCTS: &[&str] = &[
    "Pasta (500g pack)",
    "Tomato Sauce (jar)",
    "Parmesan Cheese (grated)",
    "Red Wine (bottle)",
    "Bananas (1kg)",
    "Apples (1kg)",
    "Milk (1L bottle)",
    "Cereal (cornflakes box)",
    "Coffee (ground, 250g pack)",
    "Toilet Paper (12-roll pack)",
];

fn day(offset: u32) -> PropertyTestResult<NaiveDate> {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|start| start.checked_add_days(chrono::Days::new(u64::from(offset))))
        .ok_or_else(|| format!("day offset {offset} is out of range"))
}

/// Deterministic pseudo-random shopping trips for eight customers, plus one
/// customer whose only product nobody else buys.
fn synthetic_transactions() -> PropertyTestResult<Vec<Transaction>> {
    let mut state: u64 = 0x5eed;
    let mut next = move |bound: usize| {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((state >> 33) % bound as u64) as usize
    };

    let mut transactions = Vec::new();
    for customer in 0..8 {
        let customer_id = format!("CUST{customer:03}");
        for trip in 0..6 {
            let date = day(customer * 3 + trip * 7)?;
            let items = 1 + next(4);
            for _ in 0..items {
                let product = PRODUCTS[next(PRODUCTS.len())];
                transactions.push(Transaction::new(customer_id.as_str(), date, product));
            }
        }
    }
    transactions.push(Transaction::new("LONER", day(2)?, "Saffron (1g jar)"));
    Ok(transactions)
}

fn fitted() -> PropertyTestResult<RecommendationEngine> {
    RecommendationEngine::fit_with_defaults(synthetic_transactions()?)
        .map_err(|err| err.to_string())
}

#[test]
fn no_product_recommends_itself() -> PropertyTestResult {
    let engine = fitted()?;

    for product in engine.products() {
        for strategy in
            [ProductStrategy::Similarity, ProductStrategy::Cooccurrence, ProductStrategy::Hybrid]
        {
            let list = engine.recommend_for_product(product, 20, strategy);
            require!(
                !list.products().contains(&product.as_str()),
                "{product} appears in its own {strategy:?} list"
            );
        }
    }
    Ok(())
}

#[test]
fn cooccurrence_is_symmetric_with_zero_diagonal() -> PropertyTestResult {
    for counting in [CooccurrenceCounting::Distinct, CooccurrenceCounting::LineItems] {
        let settings =
            StrategySettings { cooccurrence_counting: counting, ..StrategySettings::default() };
        let transactions = synthetic_transactions()?;
        let engine = RecommendationEngine::fit(transactions, CategoryCatalog::default(), settings)
            .map_err(|err| err.to_string())?;
        let matrix = engine.cooccurrence();

        for left in engine.products() {
            require_eq!(matrix.count(left, left), 0);
            for right in engine.products() {
                require_eq!(matrix.count(left, right), matrix.count(right, left));
            }
        }
    }
    Ok(())
}

#[test]
fn product_similarity_is_symmetric_with_unit_self_similarity() -> PropertyTestResult {
    let engine = fitted()?;
    let similarity = engine.product_similarity();

    for left in engine.products() {
        let has_partner = engine.cooccurrence().row_total(left) > 0;
        let own = similarity.score(left.as_str(), left.as_str()).ok_or("missing self score")?;
        if has_partner {
            require!((own - 1.0).abs() < 1e-9, "self similarity of {left} is {own}");
        } else {
            require_eq!(own, 0.0);
        }

        for right in engine.products() {
            let forward = similarity.score(left.as_str(), right.as_str()).ok_or("missing score")?;
            let backward = similarity.score(right.as_str(), left.as_str()).ok_or("missing score")?;
            require!((forward - backward).abs() < 1e-9, "{left}/{right} is asymmetric");
            require!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&forward), "{forward} out of range");
        }
    }
    Ok(())
}

#[test]
fn hybrid_matches_cooccurrence_when_it_has_enough_candidates() -> PropertyTestResult {
    let engine = fitted()?;
    let others = engine.products().len() - 1;

    for product in engine.products() {
        for n in [1, 3, 5, 12] {
            let hybrid = engine.hybrid_products(product, n);
            let cooccurring = engine.cooccurring_products(product, n);

            require_eq!(hybrid.len(), n.min(others));
            if cooccurring.len() >= n {
                require_eq!(hybrid.products(), cooccurring.products());
                require_eq!(hybrid.resolution, Resolution::Primary);
            }
            require!(hybrid.items.iter().all(|item| item.method == RecommendationMethod::Hybrid));
        }
    }
    Ok(())
}

#[test]
fn isolated_customer_receives_global_popularity() -> PropertyTestResult {
    let engine = fitted()?;

    let list = engine.recommend_for_customer(&CustomerId::from("LONER"), 4);

    require_eq!(
        list.resolution,
        Resolution::Fallback { reason: FallbackReason::NoQualifiedNeighbors }
    );
    require_eq!(list.items, engine.popular_products(4, None).items);
    Ok(())
}

#[test]
fn empty_basket_receives_global_popularity() -> PropertyTestResult {
    let engine = fitted()?;
    let empty: [&str; 0] = [];

    let list = engine.recommend_for_basket(&empty, 6);

    require_eq!(list.resolution, Resolution::Fallback { reason: FallbackReason::EmptyBasket });
    require_eq!(list.items, engine.popular_products(6, None).items);
    Ok(())
}

#[test]
fn popularity_is_sorted_by_count_then_name() -> PropertyTestResult {
    let engine = fitted()?;
    let list = engine.popular_products(50, None);

    require_eq!(list.len(), engine.product_stats().len());
    for pair in list.items.windows(2) {
        let ordered = pair[0].score > pair[1].score
            || (pair[0].score == pair[1].score && pair[0].product < pair[1].product);
        require!(ordered, "{} should rank before {}", pair[0].product, pair[1].product);
    }
    Ok(())
}

#[test]
fn collaborative_never_recommends_purchased_products() -> PropertyTestResult {
    let engine = fitted()?;

    for customer in engine.interactions().customers().labels() {
        let list = engine.recommend_for_customer(customer, 10);
        if list.is_fallback() {
            continue;
        }
        let owned = engine.interactions().purchased_by(customer).unwrap_or_default();
        for item in &list.items {
            require!(
                !owned.contains(&item.product.as_str()),
                "{customer} already bought {}",
                item.product
            );
        }
    }
    Ok(())
}

#[test]
fn two_customer_scenario() -> PropertyTestResult {
    let transactions = vec![
        Transaction::new("A", day(0)?, "Milk"),
        Transaction::new("A", day(0)?, "Bread"),
        Transaction::new("A", day(1)?, "Milk"),
        Transaction::new("A", day(1)?, "Eggs"),
        Transaction::new("B", day(0)?, "Milk"),
        Transaction::new("B", day(0)?, "Bread"),
    ];
    let engine =
        RecommendationEngine::fit_with_defaults(transactions).map_err(|err| err.to_string())?;

    require_eq!(engine.cooccurrence().count("Milk", "Bread"), 2);
    require_eq!(engine.cooccurrence().count("Milk", "Eggs"), 1);

    let similar = engine.similar_products("Milk", 2);
    require_eq!(similar.products(), vec!["Bread", "Eggs"]);
    require!(
        similar.items[0].score >= similar.items[1].score,
        "Bread should rank at or above Eggs: {:?}",
        similar.items
    );

    // Milk's normalised row has no weight on itself while Bread and Eggs only
    // point at Milk, so both cosines are zero and the name tie-break decides.
    require!(similar.items.iter().all(|item| item.score.abs() < 1e-9), "{:?}", similar.items);
    Ok(())
}
