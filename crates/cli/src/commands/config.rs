use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use toml::Value;

use super::{load_config, CommandResult, GlobalArgs};

#[derive(Debug, Serialize)]
pub struct ConfigLine {
    pub key: String,
    pub value: String,
    pub source: String,
}

/// Effective configuration with the source each value came from
pub fn run(global: &GlobalArgs) -> CommandResult {
    let config = match load_config(global) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
                None,
            );
        }
    };

    let config_file_path = detect_config_path(global.config.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let data_source = if global.data.is_some() {
        "flag (--data)".to_string()
    } else {
        source("data.transactions_path", &["FRESHCART_DATA_PATH"])
    };
    let engine = &config.engine;

    let lines = vec![
        line(
            "data.transactions_path",
            config.data.transactions_path.display().to_string(),
            data_source,
        ),
        line(
            "engine.neighbor_pool",
            engine.neighbor_pool.to_string(),
            source("engine.neighbor_pool", &["FRESHCART_ENGINE_NEIGHBOR_POOL"]),
        ),
        line(
            "engine.min_neighbor_similarity",
            engine.min_neighbor_similarity.to_string(),
            source("engine.min_neighbor_similarity", &["FRESHCART_ENGINE_MIN_NEIGHBOR_SIMILARITY"]),
        ),
        line(
            "engine.basket_item_cap",
            engine.basket_item_cap.to_string(),
            source("engine.basket_item_cap", &["FRESHCART_ENGINE_BASKET_ITEM_CAP"]),
        ),
        line(
            "engine.basket_partner_depth",
            engine.basket_partner_depth.to_string(),
            source("engine.basket_partner_depth", &["FRESHCART_ENGINE_BASKET_PARTNER_DEPTH"]),
        ),
        line(
            "engine.hybrid_candidate_factor",
            engine.hybrid_candidate_factor.to_string(),
            source("engine.hybrid_candidate_factor", &["FRESHCART_ENGINE_HYBRID_CANDIDATE_FACTOR"]),
        ),
        line(
            "engine.explanation_similarity_floor",
            engine.explanation_similarity_floor.to_string(),
            source(
                "engine.explanation_similarity_floor",
                &["FRESHCART_ENGINE_EXPLANATION_SIMILARITY_FLOOR"],
            ),
        ),
        line(
            "engine.cooccurrence_counting",
            format!("{:?}", engine.cooccurrence_counting),
            source("engine.cooccurrence_counting", &["FRESHCART_ENGINE_COOCCURRENCE_COUNTING"]),
        ),
        line(
            "catalog.categories",
            format!("{} overrides", config.catalog.categories.len()),
            source("catalog.categories", &[]),
        ),
        line(
            "logging.level",
            config.logging.level.clone(),
            source("logging.level", &["FRESHCART_LOGGING_LEVEL", "FRESHCART_LOG_LEVEL"]),
        ),
        line(
            "logging.format",
            format!("{:?}", config.logging.format),
            source("logging.format", &["FRESHCART_LOGGING_FORMAT", "FRESHCART_LOG_FORMAT"]),
        ),
    ];

    CommandResult::success(
        "config",
        "effective config (source precedence: flag > env > file > default)",
        lines,
    )
}

fn line(key: &str, value: String, source: String) -> ConfigLine {
    ConfigLine { key: key.to_string(), value, source }
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("freshcart.toml"), PathBuf::from("config/freshcart.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
