//! Шина сообщений со слабыми подписками.
//!
//! Подписчик регистрирует метод экземпляра (или статическую функцию) на
//! строковый топик. Подписка держит владельца через `Weak`, поэтому
//! забытая отписка не продлевает ему жизнь: после смерти владельца
//! подписка просто пропускается при рассылке, а [`Messenger::cleanup`]
//! удаляет её из списка.

mod bus;
mod callback;
mod cleanup;
mod global;
mod handle;
mod proxy;
mod subscription;

pub use bus::{Messenger, MessengerStats};
pub use callback::{Callback, EntryPoint, Function, Method, OwnerId, Payload};
pub use cleanup::{spawn_cleanup_task, spawn_configured_cleanup_task};
pub use global::global;
pub use handle::SubscriptionHandle;
pub use proxy::MsgProxy;
pub use subscription::WeakSubscription;
