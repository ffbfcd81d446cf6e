//! Логирование через `tracing`.
//!
//! Библиотека только пишет события (`trace!`/`debug!`/`warn!`); установить
//! глобальный subscriber — дело приложения, для этого есть
//! [`init_logging`].

pub mod config;
mod filters;
mod formatter;

pub use config::{LogFormat, LoggingConfig};
pub use filters::{build_filter_from_config, filter_from_directive};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weakbus_error::{GenericError, MessengerResult, StackError, StatusCode};

/// Устанавливает глобальный subscriber: `EnvFilter` + консольный layer.
///
/// Повторный вызов (или уже установленный subscriber) возвращает
/// `LoggingInit`, а не паникует.
pub fn init_logging(config: &LoggingConfig) -> MessengerResult<()> {
    let env_filter = filters::build_filter_from_config(config)?;
    let console_layer = formatter::build_formatter_from_config(config);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .map_err(|e| {
            StackError::new(GenericError::new(
                StatusCode::LoggingInit,
                format!("failed to install tracing subscriber: {e}"),
            ))
        })?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        format = ?config.format,
        "Logging system initialized"
    );

    Ok(())
}
