pub mod config;
pub mod recommend;
pub mod stats;

use std::path::PathBuf;

use freshcart_core::config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
use freshcart_core::{ApplicationError, RecommendationEngine};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::loader;

/// Flags shared by every subcommand
#[derive(Debug, Clone, Default, clap::Args)]
pub struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a freshcart.toml config file")]
    pub config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "Path to the transactions CSV (overrides data.transactions_path)"
    )]
    pub data: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>, data: impl Serialize) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), 1, None)
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            correlation_id: None,
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        correlation_id: Option<String>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            correlation_id,
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Classifies a command error into an error class and exit code:
    /// 2 configuration, 3 data load or fit, 4 bad request, 1 anything else.
    pub fn from_error(command: &str, error: &anyhow::Error) -> Self {
        let message = format!("{error:#}");

        if let Some(app_error) = error.downcast_ref::<ApplicationError>() {
            let (class, code) = match app_error {
                ApplicationError::InvalidQuery(_) => ("bad_request", 4),
                ApplicationError::DataLoad(_) => ("data_load", 3),
                ApplicationError::Configuration(_) => ("config_validation", 2),
                ApplicationError::Domain(_) => ("engine_fit", 3),
            };
            let interface = app_error.clone().into_interface(correlation_id(command));
            return Self::failure(
                command,
                class,
                format!("{message} ({})", interface.user_message()),
                code,
                Some(interface.correlation_id().to_string()),
            );
        }

        Self::failure(command, "internal", message, 1, Some(correlation_id(command)))
    }
}

/// Wraps a command body's outcome in the JSON envelope
pub fn respond<T: Serialize>(command: &str, result: anyhow::Result<(String, T)>) -> CommandResult {
    match result {
        Ok((message, data)) => CommandResult::success(command, message, data),
        Err(error) => CommandResult::from_error(command, &error),
    }
}

fn correlation_id(command: &str) -> String {
    format!("{command}-{}", Uuid::new_v4().simple())
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        let message = error.to_string().replace('\\', "\\\\").replace('"', "\\\"");
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\
             \"error_class\":\"serialization\",\"message\":\"{message}\"}}"
        )
    })
}

pub fn load_config(global: &GlobalArgs) -> Result<AppConfig, ConfigError> {
    AppConfig::load(LoadOptions {
        config_path: global.config.clone(),
        require_file: global.config.is_some(),
        overrides: ConfigOverrides {
            transactions_path: global.data.clone(),
            ..ConfigOverrides::default()
        },
    })
}

/// Effective configuration plus an engine fitted on its dataset
pub struct Session {
    pub config: AppConfig,
    pub engine: RecommendationEngine,
}

impl Session {
    pub fn open(global: &GlobalArgs) -> anyhow::Result<Self> {
        let config = load_config(global)
            .map_err(|error| ApplicationError::Configuration(error.to_string()))?;
        let path = config.data.transactions_path.clone();

        let transactions = loader::load_transactions(&path).map_err(|error| {
            ApplicationError::DataLoad(format!(
                "loading transactions from `{}`: {error}",
                path.display()
            ))
        })?;
        let loaded = transactions.len();

        let engine =
            RecommendationEngine::fit(transactions, config.category_catalog(), config.engine)
                .map_err(ApplicationError::from)?;

        info!(
            event_name = "cli.dataset.loaded",
            path = %path.display(),
            transactions = loaded,
            products = engine.products().len(),
            "transaction dataset loaded"
        );

        Ok(Self { config, engine })
    }
}
