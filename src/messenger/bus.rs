use std::{
    fmt, mem,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};
use weakbus_error::{GenericError, MessengerError, MessengerResult, StatusCode};

use super::{Callback, Payload, SubscriptionHandle, WeakSubscription};
use crate::config::MessengerConfig;

type TopicKey = Arc<str>;
type SharedSlot = Arc<Mutex<TopicSlot>>;

/// Подписки одного топика.
///
/// `evicted` ставится, когда слот удалён из карты: `register`, успевший
/// получить такой слот, повторяет попытку на свежем.
#[derive(Default)]
struct TopicSlot {
    subscriptions: Vec<WeakSubscription>,
    evicted: bool,
}

/// Снимок счётчиков мессенджера.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessengerStats {
    /// Вызовы `send`.
    pub sent: u64,
    /// Успешные вызовы обработчиков.
    pub delivered: u64,
    /// Пропущенные подписки с мёртвым владельцем.
    pub skipped_dead: u64,
    /// Мёртвые подписки, удалённые очисткой.
    pub cleaned: u64,
}

#[derive(Default)]
struct Counters {
    sent: AtomicU64,
    delivered: AtomicU64,
    skipped_dead: AtomicU64,
    cleaned: AtomicU64,
}

/// Шина сообщений со слабыми подписками.
///
/// Поддерживает:
/// - Подписку метода экземпляра или статической функции на топик
/// - Рассылку по снимку списка в порядке регистрации
/// - Явную очистку подписок с мёртвыми владельцами
/// - Удаление пустых топиков (если включено в конфигурации)
///
/// У каждого топика свой мьютекс, так что разные топики не конкурируют.
/// Обработчики вызываются без удержания блокировок и могут сами вызывать
/// `register`/`unregister`, в том числе на том же топике.
pub struct Messenger {
    /// Топик → его подписки
    topics: DashMap<TopicKey, SharedSlot>,
    config: MessengerConfig,
    counters: Counters,
}

impl Messenger {
    /// Создаёт мессенджер с конфигурацией по умолчанию.
    pub fn new() -> Self {
        Self::with_config(MessengerConfig::default())
    }

    pub fn with_config(config: MessengerConfig) -> Self {
        Self {
            topics: DashMap::new(),
            config,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &MessengerConfig {
        &self.config
    }

    /// Подписывает колбэк на топик.
    ///
    /// Подписка не продлевает жизнь владельца. Повторная регистрация той же
    /// пары владелец+метод создаёт независимую запись.
    ///
    /// Пустой топик или пустой колбэк — `InvalidArgument`, колбэк с
    /// несколькими целями — `Unsupported`.
    pub fn register(
        &self,
        topic: &str,
        callback: &Callback,
    ) -> MessengerResult<SubscriptionHandle> {
        self.insert(topic, callback, false)
    }

    /// Как [`register`](Self::register), но подписка держит владельца
    /// живым, пока её не удалят.
    pub fn register_keep_alive(
        &self,
        topic: &str,
        callback: &Callback,
    ) -> MessengerResult<SubscriptionHandle> {
        self.insert(topic, callback, true)
    }

    fn insert(
        &self,
        topic: &str,
        callback: &Callback,
        keep_alive: bool,
    ) -> MessengerResult<SubscriptionHandle> {
        if topic.is_empty() {
            warn!("Rejected registration: empty topic");
            return Err(MessengerError::invalid("topic must not be empty").into());
        }

        let created = if keep_alive {
            WeakSubscription::with_keep_alive(callback)
        } else {
            WeakSubscription::new(callback)
        };
        let subscription = match created {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!(topic, error = %err, "Rejected registration");
                return Err(err);
            }
        };

        let id = subscription.id();
        loop {
            let (key, slot) = self.slot_or_insert(topic);
            let mut guard = slot.lock();
            if guard.evicted {
                continue;
            }
            guard.subscriptions.push(subscription);
            trace!(
                topic,
                id,
                entry_point = ?callback.entry_point(),
                keep_alive,
                "Registered subscription"
            );
            return Ok(SubscriptionHandle { topic: key, id });
        }
    }

    /// Удаляет последнюю по времени регистрации подписку, совпадающую с
    /// колбэком, и заодно все мёртвые подписки топика.
    ///
    /// Возвращает `false`, если совпадения нет или топика нет.
    pub fn unregister(
        &self,
        topic: &str,
        callback: &Callback,
    ) -> bool {
        let Some(slot) = self.slot(topic) else {
            return false;
        };

        let (removed, purged, now_empty) = {
            let mut guard = slot.lock();
            let removed = guard
                .subscriptions
                .iter()
                .rposition(|s| s.matches(callback))
                .map(|index| guard.subscriptions.remove(index));
            let purged = purge_dead(&mut guard.subscriptions);
            (removed, purged, guard.subscriptions.is_empty())
        };

        let found = removed.is_some();
        // Drop владельца keep-alive может снова вызвать мессенджер.
        drop(removed);

        self.record_cleaned(purged);
        trace!(topic, found, purged, "Unregistered callback");

        if now_empty {
            self.prune_if_empty(topic);
        }
        found
    }

    /// Удаляет ровно ту подписку, которую создал `register`.
    pub fn unregister_handle(
        &self,
        handle: &SubscriptionHandle,
    ) -> bool {
        let Some(slot) = self.slot(handle.topic()) else {
            return false;
        };

        let (removed, now_empty) = {
            let mut guard = slot.lock();
            let removed = guard
                .subscriptions
                .iter()
                .position(|s| s.id() == handle.id())
                .map(|index| guard.subscriptions.remove(index));
            (removed, guard.subscriptions.is_empty())
        };

        let found = removed.is_some();
        drop(removed);
        trace!(handle = %handle, found, "Unregistered handle");

        if now_empty {
            self.prune_if_empty(handle.topic());
        }
        found
    }

    /// Удаляет все подписки топика, живые и мёртвые. Возвращает их число.
    pub fn unregister_all(
        &self,
        topic: &str,
    ) -> usize {
        let Some((_, slot)) = self.topics.remove(topic) else {
            return 0;
        };

        let drained = {
            let mut guard = slot.lock();
            guard.evicted = true;
            mem::take(&mut guard.subscriptions)
        };
        let count = drained.len();
        drop(drained);

        debug!(topic, count, "Unregistered all subscriptions");
        count
    }

    /// Удаляет мёртвые подписки топика. Возвращает их число.
    pub fn cleanup(
        &self,
        topic: &str,
    ) -> usize {
        let Some(slot) = self.slot(topic) else {
            return 0;
        };

        let (purged, now_empty) = {
            let mut guard = slot.lock();
            let purged = purge_dead(&mut guard.subscriptions);
            (purged, guard.subscriptions.is_empty())
        };

        self.record_cleaned(purged);
        if purged > 0 {
            debug!(topic, purged, "Cleaned up dead subscriptions");
        }

        if now_empty {
            self.prune_if_empty(topic);
        }
        purged
    }

    /// Очищает все топики. Возвращает общее число удалённых подписок.
    pub fn cleanup_all(&self) -> usize {
        let keys: Vec<TopicKey> = self.topics.iter().map(|e| Arc::clone(e.key())).collect();
        keys.iter().map(|topic| self.cleanup(topic)).sum()
    }

    /// Рассылает сообщение подписчикам топика.
    ///
    /// Работает по снимку списка: блокировка снимается до первого вызова.
    /// Подписки с мёртвым владельцем пропускаются, но не удаляются. Ошибка
    /// обработчика возвращается как есть, оставшиеся подписчики не
    /// вызываются. Если подписчиков нет, это не ошибка.
    pub fn send(
        &self,
        topic: &str,
        payload: &Payload,
    ) -> MessengerResult<()> {
        self.counters.sent.fetch_add(1, Ordering::Relaxed);

        let Some(slot) = self.slot(topic) else {
            trace!(topic, "No subscribers");
            return Ok(());
        };
        let snapshot = slot.lock().subscriptions.clone();

        let mut delivered = 0u64;
        let mut skipped = 0u64;
        for subscription in &snapshot {
            match subscription.try_invoke(payload) {
                Ok(true) => delivered += 1,
                Ok(false) => skipped += 1,
                Err(err) => {
                    self.record_delivery(delivered, skipped);
                    return Err(err);
                }
            }
        }

        self.record_delivery(delivered, skipped);
        debug!(topic, delivered, skipped, "Message sent");
        Ok(())
    }

    /// Выполняет [`send`](Self::send) в блокирующем пуле tokio.
    ///
    /// Паника обработчика продолжается в ожидающей задаче.
    pub async fn send_async(
        self: &Arc<Self>,
        topic: &str,
        payload: Arc<Payload>,
    ) -> MessengerResult<()> {
        let messenger = Arc::clone(self);
        let topic = topic.to_owned();

        match tokio::task::spawn_blocking(move || messenger.send(&topic, &*payload)).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => Err(GenericError::new(
                StatusCode::Internal,
                format!("send task was cancelled: {err}"),
            )
            .into()),
        }
    }

    /// Количество топиков в карте.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Имена топиков в алфавитном порядке.
    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.iter().map(|e| e.key().to_string()).collect();
        names.sort_unstable();
        names
    }

    /// Все подписки топика, включая мёртвые.
    pub fn subscriber_count(
        &self,
        topic: &str,
    ) -> usize {
        self.slot(topic)
            .map_or(0, |slot| slot.lock().subscriptions.len())
    }

    pub fn live_subscriber_count(
        &self,
        topic: &str,
    ) -> usize {
        self.slot(topic).map_or(0, |slot| {
            slot.lock()
                .subscriptions
                .iter()
                .filter(|s| s.is_alive())
                .count()
        })
    }

    pub fn stats(&self) -> MessengerStats {
        MessengerStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            skipped_dead: self.counters.skipped_dead.load(Ordering::Relaxed),
            cleaned: self.counters.cleaned.load(Ordering::Relaxed),
        }
    }

    fn slot(
        &self,
        topic: &str,
    ) -> Option<SharedSlot> {
        self.topics.get(topic).map(|e| Arc::clone(e.value()))
    }

    /// Слот топика и ключ из карты; новый ключ создаётся только для нового
    /// топика.
    fn slot_or_insert(
        &self,
        topic: &str,
    ) -> (TopicKey, SharedSlot) {
        if let Some(entry) = self.topics.get(topic) {
            return (Arc::clone(entry.key()), Arc::clone(entry.value()));
        }
        let entry = self.topics.entry(Arc::from(topic)).or_default();
        (Arc::clone(entry.key()), Arc::clone(entry.value()))
    }

    /// Удаляет топик, если он пуст.
    ///
    /// Блокировка слота берётся под блокировкой шарда, поэтому ни один путь
    /// не должен брать шард, держа слот.
    fn prune_if_empty(
        &self,
        topic: &str,
    ) {
        if !self.config.prune_empty_topics {
            return;
        }

        let pruned = self.topics.remove_if(topic, |_, slot| {
            let mut guard = slot.lock();
            if guard.subscriptions.is_empty() {
                guard.evicted = true;
                true
            } else {
                false
            }
        });

        if pruned.is_some() {
            trace!(topic, "Pruned empty topic");
        }
    }

    fn record_delivery(
        &self,
        delivered: u64,
        skipped: u64,
    ) {
        self.counters
            .delivered
            .fetch_add(delivered, Ordering::Relaxed);
        self.counters
            .skipped_dead
            .fetch_add(skipped, Ordering::Relaxed);
    }

    fn record_cleaned(
        &self,
        purged: usize,
    ) {
        if purged > 0 {
            self.counters
                .cleaned
                .fetch_add(purged as u64, Ordering::Relaxed);
        }
    }
}

/// Убирает мёртвые подписки, сохраняя порядок остальных.
fn purge_dead(subscriptions: &mut Vec<WeakSubscription>) -> usize {
    let before = subscriptions.len();
    subscriptions.retain(WeakSubscription::is_alive);
    before - subscriptions.len()
}

impl Default for Messenger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Messenger {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Messenger")
            .field("topics", &self.topics.len())
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
