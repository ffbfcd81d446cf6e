use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use weakbus_error::{MessengerResult, StackError};

use super::{
    callback::{StrongTarget, WeakTarget},
    Callback, EntryPoint, OwnerId, Payload,
};

/// Счётчик идентификаторов подписок (уникален в пределах процесса).
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Подписка, не продлевающая жизнь владельца колбэка.
///
/// Хранит слабую ссылку на владельца и идентичность метода. Подписка с
/// мёртвым владельцем (и не статическая) считается мёртвой: она больше
/// никогда не вызывается и удаляется при очистке.
///
/// Равенство следует правилу [`WeakSubscription::matches`]; хэш считается
/// по точке входа и адресу владельца и не меняется после смерти владельца.
#[derive(Clone)]
pub struct WeakSubscription {
    id: u64,
    target: Arc<dyn WeakTarget>,
    /// Сильная ссылка для подписок с `keep_alive`.
    keep_alive: Option<Arc<dyn StrongTarget>>,
}

impl WeakSubscription {
    /// Создаёт подписку из колбэка.
    ///
    /// Пустой колбэк — `InvalidArgument`, колбэк с несколькими целями —
    /// `Unsupported`.
    pub fn new(callback: &Callback) -> MessengerResult<Self> {
        let target = callback.single()?;
        Ok(Self {
            id: NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed),
            target: target.downgrade(),
            keep_alive: None,
        })
    }

    /// Создаёт подписку, которая держит владельца живым до своего удаления.
    pub fn with_keep_alive(callback: &Callback) -> MessengerResult<Self> {
        let mut subscription = Self::new(callback)?;
        subscription.keep_alive = Some(Arc::clone(callback.single()?));
        Ok(subscription)
    }

    /// Уникальный идентификатор подписки.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn entry_point(&self) -> EntryPoint {
        self.target.entry_point()
    }

    /// Адрес владельца; `None` для статической функции.
    pub fn owner_id(&self) -> Option<OwnerId> {
        self.target.owner_id()
    }

    pub fn is_static(&self) -> bool {
        self.target.owner_id().is_none()
    }

    pub fn is_keep_alive(&self) -> bool {
        self.keep_alive.is_some()
    }

    /// Статическая функция или живой владелец.
    pub fn is_alive(&self) -> bool {
        self.target.is_alive()
    }

    /// Вызывает колбэк, если владелец жив.
    ///
    /// Возвращает `Ok(false)`, если владелец мёртв и вызова не было. Ошибка
    /// обработчика возвращается как есть.
    pub fn try_invoke(
        &self,
        payload: &Payload,
    ) -> Result<bool, StackError> {
        match self.target.try_invoke(payload) {
            Some(result) => result.map(|()| true),
            None => Ok(false),
        }
    }

    /// Совпадает ли подписка со свежим колбэком.
    ///
    /// Совпадение: одна и та же точка входа и либо обе стороны статические,
    /// либо обе указывают на одного и того же живого владельца. С мёртвым
    /// владельцем совпадения не бывает: его подписку убирает очистка.
    pub fn matches(
        &self,
        callback: &Callback,
    ) -> bool {
        let Ok(target) = callback.single() else {
            return false;
        };
        self.same_target(target.entry_point(), target.owner_id(), true)
    }

    fn same_target(
        &self,
        entry_point: EntryPoint,
        owner_id: Option<OwnerId>,
        other_alive: bool,
    ) -> bool {
        if self.entry_point() != entry_point {
            return false;
        }
        match (self.owner_id(), owner_id) {
            (None, None) => true,
            (Some(mine), Some(theirs)) => other_alive && self.is_alive() && mine == theirs,
            _ => false,
        }
    }
}

impl PartialEq for WeakSubscription {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.same_target(other.entry_point(), other.owner_id(), other.is_alive())
    }
}

impl Hash for WeakSubscription {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.entry_point().hash(state);
        self.owner_id().hash(state);
    }
}

impl fmt::Debug for WeakSubscription {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("WeakSubscription")
            .field("id", &self.id)
            .field("entry_point", &self.entry_point())
            .field("owner", &self.owner_id())
            .field("alive", &self.is_alive())
            .field("keep_alive", &self.is_keep_alive())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
