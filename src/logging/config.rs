use serde::{Deserialize, Serialize};

/// Формат вывода консольного лога.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Настройки логирования.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Уровень или директива `EnvFilter` (`RUST_LOG` имеет приоритет).
    pub level: String,
    pub format: LogFormat,
    pub with_target: bool,
    pub with_ansi: bool,
    pub with_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            with_target: true,
            with_ansi: true,
            with_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    /// Строит директиву фильтра.
    ///
    /// Голый уровень (`"debug"`) применяется и к крейту, и ко всему
    /// остальному; полноценная директива (`"weakbus=trace,warn"`)
    /// передаётся как есть.
    pub fn build_filter_directive(&self) -> String {
        let level = self.level.trim();
        if level.contains('=') || level.contains(',') {
            level.to_string()
        } else {
            format!("weakbus={level},{level}")
        }
    }
}
