use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use weakbus_error::{GenericError, MessengerResult, StackError, StatusCode};

use crate::logging::LoggingConfig;

/// Префикс переменных окружения по умолчанию.
pub const ENV_PREFIX: &str = "WEAKBUS";

/// Настройки мессенджера.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessengerConfig {
    /// Удалять ключ топика, когда в нём не осталось подписок.
    pub prune_empty_topics: bool,
    /// Период фоновой очистки мёртвых подписок; 0 — выключено.
    pub cleanup_interval_ms: u64,
}

/// Полная конфигурация процесса.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub messenger: MessengerConfig,
    pub logging: LoggingConfig,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            prune_empty_topics: true,
            cleanup_interval_ms: 0,
        }
    }
}

impl MessengerConfig {
    /// Период фоновой очистки, если она включена.
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_ms > 0).then(|| Duration::from_millis(self.cleanup_interval_ms))
    }
}

impl Settings {
    /// Загружает настройки: значения по умолчанию, затем переменные окружения
    /// `WEAKBUS_*` (вложенные ключи через `__`, например
    /// `WEAKBUS_MESSENGER__PRUNE_EMPTY_TOPICS=false`).
    pub fn load() -> MessengerResult<Self> {
        Self::load_with_prefix(ENV_PREFIX)
    }

    /// То же, что [`Settings::load`], но с произвольным префиксом.
    pub fn load_with_prefix(prefix: &str) -> MessengerResult<Self> {
        Self::build(prefix).map_err(config_error)
    }

    fn build(prefix: &str) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            // Значения по умолчанию
            .set_default("messenger.prune_empty_topics", true)?
            .set_default("messenger.cleanup_interval_ms", 0)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "compact")?
            // Переменные окружения с префиксом
            .add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        cfg.try_deserialize()
    }
}

fn config_error(err: ConfigError) -> StackError {
    StackError::new(GenericError::new(
        StatusCode::ConfigInvalid,
        format!("failed to load settings: {err}"),
    ))
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::logging::LogFormat;

    /// Тест проверяет значения по умолчанию без переменных окружения.
    #[test]
    #[serial]
    fn test_defaults() {
        let settings = Settings::load_with_prefix("WEAKBUS_TEST_DEFAULTS").unwrap();
        assert!(settings.messenger.prune_empty_topics);
        assert_eq!(settings.messenger.cleanup_interval(), None);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, LogFormat::Compact);
    }

    /// Тест проверяет, что переменные окружения переопределяют значения.
    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("WEAKBUS_TEST_ENV_MESSENGER__PRUNE_EMPTY_TOPICS", "false");
        std::env::set_var("WEAKBUS_TEST_ENV_MESSENGER__CLEANUP_INTERVAL_MS", "250");
        std::env::set_var("WEAKBUS_TEST_ENV_LOGGING__FORMAT", "json");

        let settings = Settings::load_with_prefix("WEAKBUS_TEST_ENV");

        std::env::remove_var("WEAKBUS_TEST_ENV_MESSENGER__PRUNE_EMPTY_TOPICS");
        std::env::remove_var("WEAKBUS_TEST_ENV_MESSENGER__CLEANUP_INTERVAL_MS");
        std::env::remove_var("WEAKBUS_TEST_ENV_LOGGING__FORMAT");

        let settings = settings.unwrap();
        assert!(!settings.messenger.prune_empty_topics);
        assert_eq!(
            settings.messenger.cleanup_interval(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    /// Тест проверяет, что некорректное значение даёт `ConfigInvalid`, а не
    /// панику.
    #[test]
    #[serial]
    fn test_invalid_value_is_config_error() {
        std::env::set_var("WEAKBUS_TEST_BAD_MESSENGER__CLEANUP_INTERVAL_MS", "soon");
        let result = Settings::load_with_prefix("WEAKBUS_TEST_BAD");
        std::env::remove_var("WEAKBUS_TEST_BAD_MESSENGER__CLEANUP_INTERVAL_MS");

        let err = result.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::ConfigInvalid);
    }
}
