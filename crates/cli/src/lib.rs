pub mod commands;
pub mod loader;

use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use freshcart_core::config::AppConfig;
use freshcart_core::recommend::{DEFAULT_POPULAR_PRODUCTS, DEFAULT_RECOMMENDATIONS};

use commands::GlobalArgs;

#[derive(Debug, Parser)]
#[command(
    name = "freshcart",
    about = "FreshCart recommendation CLI",
    long_about = "Fit the FreshCart recommendation engine on a transactions CSV and query \
                  recommendations, explanations, and dataset statistics.",
    after_help = "Examples:\n  \
                  freshcart products --product \"Milk (1L bottle)\" --method hybrid\n  \
                  freshcart basket --product \"Pasta (500g pack)\" --limit 3\n  \
                  freshcart --data transactions.csv insights"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Recommend products related to one product")]
    Products {
        #[arg(long)]
        product: String,
        #[arg(long, default_value_t = DEFAULT_RECOMMENDATIONS)]
        limit: usize,
        #[arg(long, default_value = "hybrid", help = "similarity|cooccurrence|hybrid")]
        method: String,
    },
    #[command(about = "Recommend products for a customer from similar customers")]
    Customer {
        #[arg(long)]
        id: String,
        #[arg(long, default_value_t = DEFAULT_RECOMMENDATIONS)]
        limit: usize,
    },
    #[command(about = "Complete a basket from products bought alongside its items")]
    Basket {
        #[arg(long = "product", help = "Basket product; repeat for each item")]
        products: Vec<String>,
        #[arg(long, default_value_t = DEFAULT_RECOMMENDATIONS)]
        limit: usize,
    },
    #[command(about = "Most purchased products, optionally within a category")]
    Popular {
        #[arg(long, default_value_t = DEFAULT_POPULAR_PRODUCTS)]
        limit: usize,
        #[arg(long)]
        category: Option<String>,
    },
    #[command(about = "Explain why one product is recommended alongside another")]
    Explain {
        #[arg(long)]
        product: String,
        #[arg(long)]
        recommended: String,
    },
    #[command(about = "Dataset-wide totals and top products and categories")]
    Insights,
    #[command(about = "Per-product statistics ranked by transactions")]
    ProductStats {
        #[arg(long)]
        limit: Option<usize>,
    },
    #[command(about = "Per-customer statistics")]
    CustomerStats {
        #[arg(long)]
        id: Option<String>,
    },
    #[command(about = "Product pairs frequently bought together")]
    Pairs {
        #[arg(long, default_value_t = 1)]
        min: u32,
    },
    #[command(about = "A customer's purchases in date order")]
    History {
        #[arg(long)]
        id: String,
    },
    #[command(about = "Transactions within an inclusive date range")]
    Range {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    #[command(about = "Transactions per month and product")]
    Monthly {
        #[arg(long)]
        product: Option<String>,
    },
    #[command(about = "Catalog categories with their products")]
    Catalog,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = commands::load_config(&cli.global) {
        init_logging(&config);
    }

    let global = &cli.global;
    let result = match &cli.command {
        Command::Products { product, limit, method } => {
            commands::recommend::products(global, product, *limit, method)
        }
        Command::Customer { id, limit } => commands::recommend::customer(global, id, *limit),
        Command::Basket { products, limit } => {
            commands::recommend::basket(global, products, *limit)
        }
        Command::Popular { limit, category } => {
            commands::recommend::popular(global, *limit, category.as_deref())
        }
        Command::Explain { product, recommended } => {
            commands::recommend::explain(global, product, recommended)
        }
        Command::Insights => commands::stats::insights(global),
        Command::ProductStats { limit } => commands::stats::product_stats(global, *limit),
        Command::CustomerStats { id } => commands::stats::customer_stats(global, id.as_deref()),
        Command::Pairs { min } => commands::stats::pairs(global, *min),
        Command::History { id } => commands::stats::history(global, id),
        Command::Range { from, to } => commands::stats::range(global, *from, *to),
        Command::Monthly { product } => commands::stats::monthly(global, product.as_deref()),
        Command::Catalog => commands::recommend::catalog(global),
        Command::Config => commands::config::run(global),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr; stdout carries only the JSON command result.
fn init_logging(config: &AppConfig) {
    use freshcart_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
    if let Err(error) = installed {
        eprintln!("logging already initialised: {error}");
    }
}
