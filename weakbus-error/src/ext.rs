use std::{any::Any, error::Error};

use crate::StatusCode;

/// Общий трейт ошибок мессенджера (object-safe).
///
/// Даёт статус-код для классификации и доступ к конкретному типу через
/// [`Any`], на котором построен [`StackError::downcast_ref`](crate::StackError::downcast_ref).
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// По умолчанию [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    fn as_any(&self) -> &dyn Any;
}
