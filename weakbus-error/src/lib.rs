pub mod ext;
pub mod macros;
pub mod stack;
pub mod status_code;
pub mod types;

// Publicly re-export all error types and functions from the submodules to
// simplify access from external code.
pub use ext::*;
pub use macros::ResultExt;
pub use stack::*;
pub use status_code::*;
pub use types::*;

/// Результат любой операции мессенджера.
pub type MessengerResult<T> = Result<T, StackError>;

/// Результат обработчика сообщения. Ошибка обработчика возвращается из
/// `send` как есть, без обёрток.
pub type HandlerResult = Result<(), StackError>;
