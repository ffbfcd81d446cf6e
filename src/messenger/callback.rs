use std::{
    any::{type_name, Any},
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, Weak},
};

use weakbus_error::{HandlerResult, MessengerError, MessengerResult};

/// Полезная нагрузка сообщения. Обработчик сам приводит её к нужному типу
/// через `downcast_ref`.
pub type Payload = dyn Any + Send + Sync;

/// Метод экземпляра: вызывается на живом владельце.
pub type Method<T> = fn(&T, &Payload) -> HandlerResult;

/// Статическая функция: владельца нет.
pub type Function = fn(&Payload) -> HandlerResult;

/// Идентичность вызываемого метода (адрес функции), а не копия кода.
///
/// Две точки входа равны, если совпадают адреса. Имя получателя хранится
/// только для диагностики.
#[derive(Clone, Copy)]
pub struct EntryPoint {
    addr: usize,
    receiver: &'static str,
}

/// Идентичность владельца: адрес аллокации `Arc`.
///
/// Адрес не переиспользуется, пока жив хотя бы один `Weak` на эту аллокацию,
/// поэтому сравнение по адресу корректно для живого владельца.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(usize);

/// Колбэк с сильными ссылками: владелец + метод или статическая функция.
///
/// Аналог привязанного делегата. `Callback::default()` — пустой колбэк
/// без цели; подписка из него не создаётся. [`Callback::combine`] собирает
/// колбэк с несколькими целями: его можно вызвать напрямую, но подписаться
/// им нельзя.
#[derive(Clone, Default)]
pub struct Callback {
    targets: Vec<Arc<dyn StrongTarget>>,
}

/// Сильная сторона цели: держит владельца и умеет ослабить себя.
pub(crate) trait StrongTarget: Send + Sync {
    fn entry_point(&self) -> EntryPoint;
    fn owner_id(&self) -> Option<OwnerId>;
    fn invoke(
        &self,
        payload: &Payload,
    ) -> HandlerResult;
    fn downgrade(&self) -> Arc<dyn WeakTarget>;
}

/// Слабая сторона цели: не продлевает жизнь владельца.
pub(crate) trait WeakTarget: Send + Sync {
    fn entry_point(&self) -> EntryPoint;
    fn owner_id(&self) -> Option<OwnerId>;
    fn is_alive(&self) -> bool;
    /// `None`, если владелец уже мёртв и вызова не было.
    fn try_invoke(
        &self,
        payload: &Payload,
    ) -> Option<HandlerResult>;
}

struct BoundTarget<T> {
    owner: Arc<T>,
    method: Method<T>,
}

struct WeakBoundTarget<T> {
    owner: Weak<T>,
    owner_id: OwnerId,
    method: Method<T>,
}

#[derive(Clone, Copy)]
struct StaticTarget {
    function: Function,
}

////////////////////////////////////////////////////////////////////////////////
// EntryPoint / OwnerId
////////////////////////////////////////////////////////////////////////////////

impl EntryPoint {
    fn of_method<T: 'static>(method: Method<T>) -> Self {
        Self {
            addr: method as usize,
            receiver: type_name::<T>(),
        }
    }

    fn of_function(function: Function) -> Self {
        Self {
            addr: function as usize,
            receiver: "<static>",
        }
    }

    /// Адрес функции.
    pub fn addr(&self) -> usize {
        self.addr
    }

    /// Имя типа получателя или `"<static>"`.
    pub fn receiver(&self) -> &'static str {
        self.receiver
    }
}

impl PartialEq for EntryPoint {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.addr == other.addr
    }
}

impl Eq for EntryPoint {}

impl Hash for EntryPoint {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.addr.hash(state);
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}@{:#x}", self.receiver, self.addr)
    }
}

impl OwnerId {
    fn of<T>(owner: &Arc<T>) -> Self {
        Self(Arc::as_ptr(owner) as *const () as usize)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Реализации целей
////////////////////////////////////////////////////////////////////////////////

impl<T: Send + Sync + 'static> StrongTarget for BoundTarget<T> {
    fn entry_point(&self) -> EntryPoint {
        EntryPoint::of_method(self.method)
    }

    fn owner_id(&self) -> Option<OwnerId> {
        Some(OwnerId::of(&self.owner))
    }

    fn invoke(
        &self,
        payload: &Payload,
    ) -> HandlerResult {
        (self.method)(&self.owner, payload)
    }

    fn downgrade(&self) -> Arc<dyn WeakTarget> {
        Arc::new(WeakBoundTarget {
            owner: Arc::downgrade(&self.owner),
            owner_id: OwnerId::of(&self.owner),
            method: self.method,
        })
    }
}

impl<T: Send + Sync + 'static> WeakTarget for WeakBoundTarget<T> {
    fn entry_point(&self) -> EntryPoint {
        EntryPoint::of_method(self.method)
    }

    fn owner_id(&self) -> Option<OwnerId> {
        Some(self.owner_id)
    }

    fn is_alive(&self) -> bool {
        self.owner.strong_count() > 0
    }

    fn try_invoke(
        &self,
        payload: &Payload,
    ) -> Option<HandlerResult> {
        // Сильная ссылка живёт только на время вызова.
        let owner = self.owner.upgrade()?;
        Some((self.method)(&owner, payload))
    }
}

impl StrongTarget for StaticTarget {
    fn entry_point(&self) -> EntryPoint {
        EntryPoint::of_function(self.function)
    }

    fn owner_id(&self) -> Option<OwnerId> {
        None
    }

    fn invoke(
        &self,
        payload: &Payload,
    ) -> HandlerResult {
        (self.function)(payload)
    }

    fn downgrade(&self) -> Arc<dyn WeakTarget> {
        Arc::new(*self)
    }
}

impl WeakTarget for StaticTarget {
    fn entry_point(&self) -> EntryPoint {
        EntryPoint::of_function(self.function)
    }

    fn owner_id(&self) -> Option<OwnerId> {
        None
    }

    fn is_alive(&self) -> bool {
        true
    }

    fn try_invoke(
        &self,
        payload: &Payload,
    ) -> Option<HandlerResult> {
        Some((self.function)(payload))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Callback
////////////////////////////////////////////////////////////////////////////////

impl Callback {
    /// Колбэк на метод `method` экземпляра `owner`.
    pub fn bound<T: Send + Sync + 'static>(
        owner: &Arc<T>,
        method: Method<T>,
    ) -> Self {
        Self {
            targets: vec![Arc::new(BoundTarget {
                owner: Arc::clone(owner),
                method,
            })],
        }
    }

    /// Колбэк на статическую функцию.
    pub fn unbound(function: Function) -> Self {
        Self {
            targets: vec![Arc::new(StaticTarget { function })],
        }
    }

    /// Объединяет два колбэка; цели вызываются в порядке добавления.
    pub fn combine(
        mut self,
        other: Callback,
    ) -> Self {
        self.targets.extend(other.targets);
        self
    }

    /// Количество целей.
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Пустой колбэк (нет ни одной цели).
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Точка входа единственной цели.
    pub fn entry_point(&self) -> Option<EntryPoint> {
        self.single().ok().map(|t| t.entry_point())
    }

    /// Идентичность владельца единственной цели; `None` для статики.
    pub fn owner_id(&self) -> Option<OwnerId> {
        self.single().ok().and_then(|t| t.owner_id())
    }

    /// Вызывает все цели по порядку. Первая ошибка прерывает вызов.
    pub fn invoke(
        &self,
        payload: &Payload,
    ) -> HandlerResult {
        for target in &self.targets {
            target.invoke(payload)?;
        }
        Ok(())
    }

    /// Единственная цель колбэка.
    ///
    /// Пустой колбэк — `InvalidArgument`, несколько целей — `Unsupported`.
    pub(crate) fn single(&self) -> MessengerResult<&Arc<dyn StrongTarget>> {
        match self.targets.as_slice() {
            [target] => Ok(target),
            [] => Err(MessengerError::invalid("callback has no target").into()),
            targets => Err(MessengerError::Unsupported {
                targets: targets.len(),
            }
            .into()),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let entries: Vec<EntryPoint> = self.targets.iter().map(|t| t.entry_point()).collect();
        f.debug_struct("Callback")
            .field("targets", &entries)
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
