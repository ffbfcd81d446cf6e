use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

use super::Messenger;

/// Общий на процесс мессенджер с настройками по умолчанию.
static GLOBAL: Lazy<Arc<Messenger>> = Lazy::new(|| {
    debug!("Initializing process-wide messenger");
    Arc::new(Messenger::new())
});

/// Общий на процесс экземпляр; создаётся при первом вызове.
///
/// Удобство для кода без явной передачи зависимостей. Компонентам лучше
/// принимать `Arc<Messenger>` снаружи.
pub fn global() -> &'static Arc<Messenger> {
    &GLOBAL
}

impl Messenger {
    /// См. [`global`].
    pub fn global() -> &'static Arc<Messenger> {
        global()
    }
}
