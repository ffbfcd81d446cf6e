use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Структурные ошибки мессенджера.
///
/// Ошибки обработчиков подписчиков сюда не попадают: `send` возвращает их
/// как есть.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessengerError {
    /// Пустой колбэк или пустое имя топика.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Колбэк с несколькими целями там, где нужна ровно одна.
    #[error("only single-target callbacks are supported, got {targets} targets")]
    Unsupported { targets: usize },

    /// Топик или подписка не найдены.
    #[error("not found: {topic}")]
    NotFound { topic: String },

    /// Значение не приводится к запрошенному типу.
    #[error("cannot cast value of type {found} to {expected}")]
    TypeError {
        expected: &'static str,
        found: &'static str,
    },

    /// Индекс аргумента вне диапазона.
    #[error("index {index} is out of range of {len} arguments")]
    IndexOutOfBounds { index: usize, len: usize },
}

impl MessengerError {
    /// Короткая ошибка `InvalidArgument`.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

impl ErrorExt for MessengerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument { .. } => StatusCode::InvalidArgs,
            Self::Unsupported { .. } => StatusCode::Unsupported,
            Self::NotFound { .. } => StatusCode::NotFound,
            Self::TypeError { .. } => StatusCode::TypeError,
            Self::IndexOutOfBounds { .. } => StatusCode::IndexOutOfBounds,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
