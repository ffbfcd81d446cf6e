use std::{
    any::{type_name, Any},
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;
use weakbus_error::{MessengerError, MessengerResult};

/// Значение с сохранённым именем типа для сообщений об ошибках.
struct Slot {
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Slot {
    fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: type_name::<T>(),
        }
    }

    fn downcast<T: Any>(&self) -> MessengerResult<&T> {
        self.value.downcast_ref::<T>().ok_or_else(|| {
            MessengerError::TypeError {
                expected: type_name::<T>(),
                found: self.type_name,
            }
            .into()
        })
    }
}

/// Запрос-ответ поверх шины.
///
/// Отправитель кладёт аргументы, обработчик читает их, записывает
/// результат и помечает запрос обработанным:
///
/// ```
/// use weakbus::messenger::{Callback, Messenger, MsgProxy, Payload};
/// use weakbus_error::HandlerResult;
///
/// fn add(payload: &Payload) -> HandlerResult {
///     if let Some(proxy) = payload.downcast_ref::<MsgProxy>() {
///         let sum = proxy.get_arg::<i32>(0)? + proxy.get_arg::<i32>(1)?;
///         proxy.set_result(sum);
///         proxy.mark_handled();
///     }
///     Ok(())
/// }
///
/// let bus = Messenger::new();
/// bus.register("math.add", &Callback::unbound(add)).unwrap();
///
/// let proxy = MsgProxy::new().with_arg(2i32).with_arg(40i32);
/// bus.send("math.add", &proxy).unwrap();
/// assert!(proxy.is_handled());
/// assert_eq!(proxy.get_result::<i32>().unwrap(), Some(42));
/// ```
#[derive(Default)]
pub struct MsgProxy {
    args: Vec<Slot>,
    result: Mutex<Option<Slot>>,
    handled: AtomicBool,
}

impl MsgProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавляет аргумент в конец списка.
    pub fn with_arg<T: Any + Send + Sync>(
        mut self,
        value: T,
    ) -> Self {
        self.args.push(Slot::new(value));
        self
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Аргумент по индексу.
    ///
    /// Неверный индекс — `IndexOutOfBounds`, другой тип — `TypeError`.
    pub fn get_arg<T: Any>(
        &self,
        index: usize,
    ) -> MessengerResult<&T> {
        let slot = self
            .args
            .get(index)
            .ok_or(MessengerError::IndexOutOfBounds {
                index,
                len: self.args.len(),
            })?;
        slot.downcast::<T>()
    }

    /// Записывает результат, заменяя предыдущий.
    pub fn set_result<T: Any + Send + Sync>(
        &self,
        value: T,
    ) {
        *self.result.lock() = Some(Slot::new(value));
    }

    pub fn has_result(&self) -> bool {
        self.result.lock().is_some()
    }

    /// Копия результата; `Ok(None)`, если его не записали.
    pub fn get_result<T: Any + Clone>(&self) -> MessengerResult<Option<T>> {
        match self.result.lock().as_ref() {
            Some(slot) => slot.downcast::<T>().map(|v| Some(v.clone())),
            None => Ok(None),
        }
    }

    pub fn mark_handled(&self) {
        self.handled.store(true, Ordering::Release);
    }

    pub fn is_handled(&self) -> bool {
        self.handled.load(Ordering::Acquire)
    }
}

impl fmt::Debug for MsgProxy {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let args: Vec<&str> = self.args.iter().map(|s| s.type_name).collect();
        let result = self.result.lock().as_ref().map(|s| s.type_name);
        f.debug_struct("MsgProxy")
            .field("args", &args)
            .field("result", &result)
            .field("handled", &self.is_handled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use weakbus_error::StatusCode;

    use super::*;

    #[test]
    fn test_get_arg() {
        let proxy = MsgProxy::new()
            .with_arg("profile")
            .with_arg(7u64);

        assert_eq!(proxy.arg_count(), 2);
        assert_eq!(*proxy.get_arg::<&str>(0).unwrap(), "profile");
        assert_eq!(*proxy.get_arg::<u64>(1).unwrap(), 7);
    }

    /// Тест проверяет ошибки доступа к аргументам: индекс и тип.
    #[test]
    fn test_get_arg_errors() {
        let proxy = MsgProxy::new().with_arg(1u8);

        let err = proxy.get_arg::<u8>(3).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::IndexOutOfBounds);
        assert_eq!(
            err.downcast_ref::<MessengerError>(),
            Some(&MessengerError::IndexOutOfBounds { index: 3, len: 1 })
        );

        let err = proxy.get_arg::<String>(0).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::TypeError);
        assert_eq!(
            err.downcast_ref::<MessengerError>(),
            Some(&MessengerError::TypeError {
                expected: type_name::<String>(),
                found: type_name::<u8>(),
            })
        );
    }

    /// Тест проверяет слот результата: пустой, заполненный, чужой тип.
    #[test]
    fn test_result_slot() {
        let proxy = MsgProxy::new();
        assert!(!proxy.has_result());
        assert_eq!(proxy.get_result::<String>().unwrap(), None);

        proxy.set_result(String::from("done"));
        assert!(proxy.has_result());
        assert_eq!(proxy.get_result::<String>().unwrap(), Some("done".into()));

        let err = proxy.get_result::<u32>().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::TypeError);
    }

    #[test]
    fn test_handled_flag() {
        let proxy = MsgProxy::new();
        assert!(!proxy.is_handled());
        proxy.mark_handled();
        assert!(proxy.is_handled());
    }
}
