use tracing_subscriber::EnvFilter;
use weakbus_error::{GenericError, MessengerResult, StackError, StatusCode};

use crate::logging::config::LoggingConfig;

/// Фильтр из конфигурации. Если задан `RUST_LOG` — используем его.
pub fn build_filter_from_config(config: &LoggingConfig) -> MessengerResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(env_filter) => Ok(env_filter),
        Err(_) => filter_from_directive(&config.build_filter_directive()),
    }
}

/// Фильтр из явной директивы; некорректная директива — `ConfigInvalid`.
pub fn filter_from_directive(directive: &str) -> MessengerResult<EnvFilter> {
    EnvFilter::try_new(directive).map_err(|e| {
        StackError::new(GenericError::new(
            StatusCode::ConfigInvalid,
            format!("invalid log filter directive '{directive}': {e}"),
        ))
    })
}
