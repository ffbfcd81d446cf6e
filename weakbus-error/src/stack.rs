use std::{fmt, panic::Location, sync::Arc};

use crate::{ErrorExt, StatusCode};

/// Ошибка с цепочкой контекстов.
///
/// Контексты добавляются по мере подъёма ошибки по стеку вызовов. Корневая
/// ошибка и контексты лежат за `Arc`, поэтому клон не копирует их.
#[derive(Clone)]
pub struct StackError {
    inner: Arc<dyn ErrorExt>,
    contexts: Arc<Vec<ErrorContext>>,
}

/// Контекст ошибки с местом вызова.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub message: String,
    pub location: Option<&'static Location<'static>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StackError {
    pub fn new<E: ErrorExt>(err: E) -> Self {
        Self {
            inner: Arc::new(err),
            contexts: Arc::new(Vec::new()),
        }
    }

    /// Добавляет контекст к ошибке.
    #[track_caller]
    pub fn context(
        mut self,
        msg: impl Into<String>,
    ) -> Self {
        let mut new_contexts = (*self.contexts).clone();
        new_contexts.push(ErrorContext {
            message: msg.into(),
            location: Some(Location::caller()),
        });
        self.contexts = Arc::new(new_contexts);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.inner.status_code()
    }

    /// Корневая ошибка.
    pub fn root(&self) -> &dyn ErrorExt {
        self.inner.as_ref()
    }

    pub fn contexts(&self) -> &[ErrorContext] {
        &self.contexts
    }

    /// Downcast корневой ошибки к конкретному типу.
    pub fn downcast_ref<T: ErrorExt>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }

    /// Указывают ли две ошибки на один и тот же корневой объект.
    ///
    /// Так проверяется, что ошибка обработчика прошла через `send` без
    /// обёрток.
    pub fn ptr_eq(
        &self,
        other: &StackError,
    ) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn format_contexts(&self) -> Vec<String> {
        self.contexts
            .iter()
            .map(|ctx| match ctx.location {
                Some(loc) => format!("{} ({}:{})", ctx.message, loc.file(), loc.line()),
                None => ctx.message.clone(),
            })
            .collect()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StackError
////////////////////////////////////////////////////////////////////////////////

impl fmt::Debug for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let mut debug = f.debug_struct("StackError");
        debug.field("inner", &self.inner.to_string());
        debug.field("status_code", &self.status_code());

        if !self.contexts.is_empty() {
            debug.field("contexts", &self.format_contexts());
        }

        debug.finish()
    }
}

impl fmt::Display for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.contexts.is_empty() {
            return write!(f, "{}", self.inner);
        }
        let contexts: Vec<&str> = self.contexts.iter().map(|c| c.message.as_str()).collect();
        write!(f, "{}: {}", contexts.join(" → "), self.inner)
    }
}

impl std::error::Error for StackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl<E: ErrorExt> From<E> for StackError {
    fn from(e: E) -> Self {
        StackError::new(e)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessengerError;

    #[test]
    fn test_context_chain() {
        let err = MessengerError::NotFound {
            topic: "nav".to_string(),
        };
        let stack = StackError::new(err)
            .context("Unregister by handle")
            .context("View model teardown");

        assert_eq!(stack.contexts().len(), 2);
        assert_eq!(stack.contexts()[0].message, "Unregister by handle");
        assert!(stack.contexts()[0].location.is_some());
    }

    #[test]
    fn test_downcast() {
        let err = MessengerError::Unsupported { targets: 2 };
        let stack = StackError::new(err);

        let downcasted = stack.downcast_ref::<MessengerError>();
        assert!(matches!(
            downcasted,
            Some(MessengerError::Unsupported { targets: 2 })
        ));
    }

    /// Тест проверяет, что `root` отдаёт исходную ошибку, а `Debug` содержит
    /// место добавления контекста.
    #[test]
    fn test_root_and_debug() {
        let stack = StackError::new(MessengerError::invalid("empty topic")).context("Register");

        assert_eq!(stack.root().to_string(), "invalid argument: empty topic");
        assert_eq!(stack.status_code(), StatusCode::InvalidArgs);
        let debug = format!("{stack:?}");
        assert!(debug.contains("Register ("));
        assert!(debug.contains("stack.rs"));
    }

    #[test]
    fn test_display() {
        let err = MessengerError::InvalidArgument {
            reason: "topic must not be empty".to_string(),
        };
        let stack = StackError::new(err).context("Register");

        let display = stack.to_string();
        assert!(display.starts_with("Register: "));
        assert!(display.contains("topic must not be empty"));
    }

    /// Тест проверяет, что клон указывает на тот же корень, а новая ошибка —
    /// нет.
    #[test]
    fn test_ptr_eq() {
        let a = StackError::new(MessengerError::Unsupported { targets: 3 });
        let b = a.clone().context("passed through");
        let c = StackError::new(MessengerError::Unsupported { targets: 3 });

        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }
}
