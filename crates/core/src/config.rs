use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CategoryCatalog;
use crate::domain::product::Category;
use crate::matrix::CooccurrenceCounting;
use crate::recommend::StrategySettings;

#[derive(Clone, Debug, Serialize)]
pub struct AppConfig {
    pub data: DataConfig,
    pub engine: StrategySettings,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize)]
pub struct DataConfig {
    pub transactions_path: PathBuf,
}

/// Product -> category assignments layered over the built-in table
#[derive(Clone, Debug, Default, Serialize)]
pub struct CatalogConfig {
    pub categories: BTreeMap<String, Category>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub transactions_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub cooccurrence_counting: Option<CooccurrenceCounting>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const DEFAULT_TRANSACTIONS_PATH: &str = "sample_data/transactions.csv";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig { transactions_path: PathBuf::from(DEFAULT_TRANSACTIONS_PATH) },
            engine: StrategySettings::default(),
            catalog: CatalogConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("freshcart.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Built-in category table with the configured assignments applied
    pub fn category_catalog(&self) -> CategoryCatalog {
        CategoryCatalog::default().with_overrides(
            self.catalog.categories.iter().map(|(product, category)| (product.clone(), *category)),
        )
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(data) = patch.data {
            if let Some(transactions_path) = data.transactions_path {
                self.data.transactions_path = transactions_path;
            }
        }

        if let Some(engine) = patch.engine {
            if let Some(neighbor_pool) = engine.neighbor_pool {
                self.engine.neighbor_pool = neighbor_pool;
            }
            if let Some(min_neighbor_similarity) = engine.min_neighbor_similarity {
                self.engine.min_neighbor_similarity = min_neighbor_similarity;
            }
            if let Some(basket_item_cap) = engine.basket_item_cap {
                self.engine.basket_item_cap = basket_item_cap;
            }
            if let Some(basket_partner_depth) = engine.basket_partner_depth {
                self.engine.basket_partner_depth = basket_partner_depth;
            }
            if let Some(hybrid_candidate_factor) = engine.hybrid_candidate_factor {
                self.engine.hybrid_candidate_factor = hybrid_candidate_factor;
            }
            if let Some(floor) = engine.explanation_similarity_floor {
                self.engine.explanation_similarity_floor = floor;
            }
            if let Some(counting) = engine.cooccurrence_counting {
                self.engine.cooccurrence_counting = counting;
            }
        }

        if let Some(catalog) = patch.catalog {
            for (product, name) in catalog.categories.unwrap_or_default() {
                let category = name.parse::<Category>().map_err(|_| {
                    ConfigError::Validation(format!(
                        "catalog.categories.\"{product}\" has unknown category `{name}`"
                    ))
                })?;
                self.catalog.categories.insert(product, category);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("FRESHCART_DATA_PATH") {
            self.data.transactions_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("FRESHCART_ENGINE_NEIGHBOR_POOL") {
            self.engine.neighbor_pool = parse_usize("FRESHCART_ENGINE_NEIGHBOR_POOL", &value)?;
        }
        if let Some(value) = read_env("FRESHCART_ENGINE_MIN_NEIGHBOR_SIMILARITY") {
            self.engine.min_neighbor_similarity =
                parse_f64("FRESHCART_ENGINE_MIN_NEIGHBOR_SIMILARITY", &value)?;
        }
        if let Some(value) = read_env("FRESHCART_ENGINE_BASKET_ITEM_CAP") {
            self.engine.basket_item_cap = parse_usize("FRESHCART_ENGINE_BASKET_ITEM_CAP", &value)?;
        }
        if let Some(value) = read_env("FRESHCART_ENGINE_BASKET_PARTNER_DEPTH") {
            self.engine.basket_partner_depth =
                parse_usize("FRESHCART_ENGINE_BASKET_PARTNER_DEPTH", &value)?;
        }
        if let Some(value) = read_env("FRESHCART_ENGINE_HYBRID_CANDIDATE_FACTOR") {
            self.engine.hybrid_candidate_factor =
                parse_usize("FRESHCART_ENGINE_HYBRID_CANDIDATE_FACTOR", &value)?;
        }
        if let Some(value) = read_env("FRESHCART_ENGINE_EXPLANATION_SIMILARITY_FLOOR") {
            self.engine.explanation_similarity_floor =
                parse_f64("FRESHCART_ENGINE_EXPLANATION_SIMILARITY_FLOOR", &value)?;
        }
        if let Some(value) = read_env("FRESHCART_ENGINE_COOCCURRENCE_COUNTING") {
            self.engine.cooccurrence_counting =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "FRESHCART_ENGINE_COOCCURRENCE_COUNTING".to_string(),
                    value: value.clone(),
                })?;
        }

        let log_level =
            read_env("FRESHCART_LOGGING_LEVEL").or_else(|| read_env("FRESHCART_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("FRESHCART_LOGGING_FORMAT").or_else(|| read_env("FRESHCART_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(transactions_path) = overrides.transactions_path {
            self.data.transactions_path = transactions_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(counting) = overrides.cooccurrence_counting {
            self.engine.cooccurrence_counting = counting;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_data(&self.data)?;
        validate_engine(&self.engine)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("freshcart.toml"), PathBuf::from("config/freshcart.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_data(data: &DataConfig) -> Result<(), ConfigError> {
    if data.transactions_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data.transactions_path is required. Point it at a CustomerID,Date,Product CSV file"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_engine(engine: &StrategySettings) -> Result<(), ConfigError> {
    let counts = [
        ("engine.neighbor_pool", engine.neighbor_pool),
        ("engine.basket_item_cap", engine.basket_item_cap),
        ("engine.basket_partner_depth", engine.basket_partner_depth),
        ("engine.hybrid_candidate_factor", engine.hybrid_candidate_factor),
    ];
    for (key, value) in counts {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{key} must be greater than zero")));
        }
    }

    let similarities = [
        ("engine.min_neighbor_similarity", engine.min_neighbor_similarity),
        ("engine.explanation_similarity_floor", engine.explanation_similarity_floor),
    ];
    for (key, value) in similarities {
        if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
            return Err(ConfigError::Validation(format!("{key} must be in range -1.0..=1.0")));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    data: Option<DataPatch>,
    engine: Option<EnginePatch>,
    catalog: Option<CatalogPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    transactions_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct EnginePatch {
    neighbor_pool: Option<usize>,
    min_neighbor_similarity: Option<f64>,
    basket_item_cap: Option<usize>,
    basket_partner_depth: Option<usize>,
    hybrid_candidate_factor: Option<usize>,
    explanation_similarity_floor: Option<f64>,
    cooccurrence_counting: Option<CooccurrenceCounting>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    categories: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::domain::product::Category;
    use crate::matrix::CooccurrenceCounting;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn write_config(dir: &TempDir, body: &str) -> Result<PathBuf, String> {
        let path = dir.path().join("freshcart.toml");
        fs::write(&path, body).map_err(|err| err.to_string())?;
        Ok(path)
    }

    #[test]
    fn defaults_load_without_a_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(
            config.data.transactions_path == PathBuf::from("sample_data/transactions.csv"),
            "default data path should point at the sample dataset",
        )?;
        ensure(config.engine.neighbor_pool == 5, "default neighbor pool should be 5")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )?;
        ensure(config.catalog.categories.is_empty(), "no catalog overrides by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_FRESHCART_DATA_DIR", "/srv/freshcart");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[data]
transactions_path = "${TEST_FRESHCART_DATA_DIR}/transactions.csv"
"#,
            )?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.data.transactions_path == PathBuf::from("/srv/freshcart/transactions.csv"),
                "data path should be interpolated from environment",
            )
        })();

        clear_vars(&["TEST_FRESHCART_DATA_DIR"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(&dir, "[data]\ntransactions_path = \"${FRESHCART_TEST_UNSET}\"\n")?;

        let options = LoadOptions { config_path: Some(path), ..LoadOptions::default() };
        let error = match AppConfig::load(options) {
            Ok(_) => return Err("expected interpolation failure".to_string()),
            Err(error) => error,
        };
        ensure(
            matches!(
                error,
                ConfigError::MissingEnvInterpolation { ref var } if var == "FRESHCART_TEST_UNSET"
            ),
            "error should name the missing variable",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FRESHCART_LOG_LEVEL", "warn");
        env::set_var("FRESHCART_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["FRESHCART_LOG_LEVEL", "FRESHCART_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FRESHCART_DATA_PATH", "from-env.csv");
        env::set_var("FRESHCART_ENGINE_NEIGHBOR_POOL", "8");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[data]
transactions_path = "from-file.csv"

[engine]
neighbor_pool = 3
basket_item_cap = 4
cooccurrence_counting = "line_items"

[logging]
level = "warn"
"#,
            )?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    transactions_path: Some(PathBuf::from("from-override.csv")),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.data.transactions_path == PathBuf::from("from-override.csv"),
                "override data path should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.engine.neighbor_pool == 8, "env neighbor pool should win over file")?;
            ensure(config.engine.basket_item_cap == 4, "file basket cap should win over default")?;
            ensure(
                config.engine.cooccurrence_counting == CooccurrenceCounting::LineItems,
                "file counting mode should be applied",
            )
        })();

        clear_vars(&["FRESHCART_DATA_PATH", "FRESHCART_ENGINE_NEIGHBOR_POOL"]);
        result
    }

    #[test]
    fn catalog_overrides_accept_labels_and_keys() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(
            &dir,
            r#"
[catalog.categories]
"Kefir (500ml)" = "Meat & Dairy"
"Milk (1L bottle)" = "beverages"
"#,
        )?;

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;
        let catalog = config.category_catalog();

        ensure(catalog.category_of("Kefir (500ml)") == Category::MeatDairy, "label should parse")?;
        ensure(
            catalog.category_of("Milk (1L bottle)") == Category::Beverages,
            "override should replace the built-in assignment",
        )?;
        ensure(
            catalog.category_of("Bananas (1kg)") == Category::FreshProduce,
            "built-in assignments should survive",
        )
    }

    #[test]
    fn unknown_catalog_category_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(&dir, "[catalog.categories]\n\"Kefir\" = \"Frozen\"\n")?;

        let options = LoadOptions { config_path: Some(path), ..LoadOptions::default() };
        let error = match AppConfig::load(options) {
            Ok(_) => return Err("expected catalog validation failure".to_string()),
            Err(error) => error,
        };
        ensure(
            matches!(error, ConfigError::Validation(ref message) if message.contains("Frozen")),
            "validation failure should mention the bad category",
        )
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FRESHCART_ENGINE_BASKET_ITEM_CAP", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("engine.basket_item_cap")
            );
            ensure(has_message, "validation failure should mention engine.basket_item_cap")
        })();

        clear_vars(&["FRESHCART_ENGINE_BASKET_ITEM_CAP"]);
        result
    }

    #[test]
    fn malformed_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FRESHCART_ENGINE_MIN_NEIGHBOR_SIMILARITY", "high");

        let result = (|| -> Result<(), String> {
            let rejected = matches!(
                AppConfig::load(LoadOptions::default()),
                Err(ConfigError::InvalidEnvOverride { ref key, .. })
                    if key == "FRESHCART_ENGINE_MIN_NEIGHBOR_SIMILARITY"
            );
            ensure(rejected, "non-numeric similarity floor should be rejected")
        })();

        clear_vars(&["FRESHCART_ENGINE_MIN_NEIGHBOR_SIMILARITY"]);
        result
    }

    #[test]
    fn require_file_reports_missing_path() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let missing = dir.path().join("absent.toml");

        let error = match AppConfig::load(LoadOptions {
            config_path: Some(missing.clone()),
            require_file: true,
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected missing file failure".to_string()),
            Err(error) => error,
        };
        ensure(
            matches!(error, ConfigError::MissingConfigFile(ref path) if *path == missing),
            "missing file error should carry the requested path",
        )
    }
}
