//! Внутрипроцессный pub/sub со слабыми подписками.
//!
//! Подписчик регистрирует метод экземпляра (или статическую функцию) на
//! строковый топик. Мессенджер держит владельца только через `Weak`, так что
//! забытая отписка не продлевает ему жизнь: мёртвые подписки пропускаются
//! при рассылке и удаляются явной очисткой.

/// Загрузка настроек (значения по умолчанию + окружение `WEAKBUS_*`).
pub mod config;
/// Настройка tracing: фильтры и форматы вывода.
pub mod logging;
/// Мессенджер, колбэки и слабые подписки.
pub mod messenger;

// -----------------------------------------------------------------------------
//  Часто используемые публичные типы
// -----------------------------------------------------------------------------

/// Настройки мессенджера и процесса.
pub use config::{MessengerConfig, Settings};
/// Инициализация логирования.
pub use logging::{init_logging, LogFormat, LoggingConfig};
/// API мессенджера.
pub use messenger::{
    global, spawn_cleanup_task, spawn_configured_cleanup_task, Callback, EntryPoint, Messenger,
    MessengerStats, MsgProxy, OwnerId, Payload, SubscriptionHandle, WeakSubscription,
};
/// Типы ошибок и результатов.
pub use weakbus_error::{
    ErrorExt, GenericError, HandlerResult, MessengerError, MessengerResult, StackError, StatusCode,
};
