use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::interval};

use super::Messenger;

////////////////////////////////////////////////////////////////////////////////
// Внешние функции
////////////////////////////////////////////////////////////////////////////////

/// Запускает фоновую задачу, которая периодически вызывает
/// [`Messenger::cleanup_all`].
///
/// Возвращает `JoinHandle`, которым задачу можно отменить. Нулевой интервал
/// округляется до одной миллисекунды.
pub fn spawn_cleanup_task(
    messenger: Arc<Messenger>,
    cleanup_interval: Duration,
) -> JoinHandle<()> {
    let period = cleanup_interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = interval(period);

        loop {
            ticker.tick().await;

            let cleaned = messenger.cleanup_all();
            if cleaned > 0 {
                tracing::debug!("Cleaned up {} dead subscriptions", cleaned);
            }
        }
    })
}

/// Запускает очистку с интервалом из конфигурации мессенджера.
///
/// `None`, если `cleanup_interval_ms == 0`.
pub fn spawn_configured_cleanup_task(messenger: Arc<Messenger>) -> Option<JoinHandle<()>> {
    let period = messenger.config().cleanup_interval()?;
    Some(spawn_cleanup_task(messenger, period))
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use weakbus_error::HandlerResult;

    use super::*;
    use crate::{
        config::MessengerConfig,
        messenger::{Callback, Payload},
    };

    struct Listener;

    impl Listener {
        fn on_message(
            &self,
            _payload: &Payload,
        ) -> HandlerResult {
            Ok(())
        }
    }

    /// Регистрирует подписку, владелец которой сразу умирает.
    fn register_dead(messenger: &Messenger) {
        let owner = Arc::new(Listener);
        messenger
            .register("cleanup.topic", &Callback::bound(&owner, Listener::on_message))
            .unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_task_runs() {
        tokio::time::pause();

        let messenger = Arc::new(Messenger::new());
        let handle = spawn_cleanup_task(messenger.clone(), Duration::from_secs(5));

        // Первый тик срабатывает сразу; даём ему пройти.
        tokio::time::sleep(Duration::from_millis(10)).await;

        register_dead(&messenger);
        assert_eq!(messenger.subscriber_count("cleanup.topic"), 1);

        // Продвигаем время на 6 секунд - задача должна сработать
        tokio::time::advance(Duration::from_secs(6)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(messenger.subscriber_count("cleanup.topic"), 0);
        assert_eq!(messenger.stats().cleaned, 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_configured_task_disabled_by_default() {
        let messenger = Arc::new(Messenger::new());
        assert!(spawn_configured_cleanup_task(messenger).is_none());

        let messenger = Arc::new(Messenger::with_config(MessengerConfig {
            cleanup_interval_ms: 250,
            ..Default::default()
        }));
        let handle = spawn_configured_cleanup_task(messenger).unwrap();
        handle.abort();
    }
}
