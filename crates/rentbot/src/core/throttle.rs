use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Ограничитель частоты нажатий на кнопки.
///
/// Хранит момент последнего разрешённого нажатия для пары (пользователь, ключ).
/// Повторное нажатие с тем же ключом раньше окна отклоняется и не сдвигает окно.
#[derive(Clone)]
pub struct Throttle {
    last_click: Arc<DashMap<(i64, String), Instant>>,
    window: Duration,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            last_click: Arc::new(DashMap::new()),
            window,
        }
    }

    /// Возвращает `true`, если нажатие нужно отклонить.
    ///
    /// Разрешённое нажатие запоминается.
    pub fn check(&self, user_id: i64, key: &str) -> bool {
        let now = Instant::now();
        let composite = (user_id, key.to_string());
        if let Some(last) = self.last_click.get(&composite) {
            if now.duration_since(*last) < self.window {
                return true;
            }
        }
        self.last_click.insert(composite, now);
        false
    }

    /// Удаляет записи старше окна.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let window = self.window;
        self.last_click.retain(|_, last| now.duration_since(*last) < window);
    }

    pub fn len(&self) -> usize {
        self.last_click.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_click.is_empty()
    }

    /// Periodic cleanup so the map does not grow with every user ever seen.
    pub fn spawn_cleanup_task(self: Arc<Self>, every: Duration) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                self.cleanup();
            }
        });
    }
}
