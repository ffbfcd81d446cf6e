use std::{fmt, sync::Arc};

/// Результат `register`: топик и идентификатор созданной подписки.
///
/// По нему [`Messenger::unregister_handle`](super::Messenger::unregister_handle)
/// удаляет ровно ту запись, которую создал этот вызов.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub(crate) topic: Arc<str>,
    pub(crate) id: u64,
}

impl SubscriptionHandle {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}#{}", self.topic, self.id)
    }
}
