use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

/// 搜索输入的默认防抖时长
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// 尾沿防抖器
///
/// 每次 [`call`](Debouncer::call) 都会取代上一次；只有在 `delay` 内没有新的调用时，
/// 最后一个值才会发送到输出通道。首次调用不会立即触发。
pub struct Debouncer<T> {
    delay: Duration,
    generation: Arc<AtomicU64>,
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration, tx: mpsc::UnboundedSender<T>) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            tx,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn call(&self, value: T) {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();
        let tx = self.tx.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            sleep(delay).await;
            if generation.load(Ordering::SeqCst) == ticket {
                let _ = tx.send(value);
            }
        });
    }

    /// 丢弃尚未触发的值
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
