//! 活动日志批量写入器
//! 状态机：Idle → Buffering(定时器) → Flushing → Idle。
//! 首条未落盘日志启动防抖定时器，后续记录不重置定时器；
//! 缓冲超过阈值时取消定时器并立即写入。写入失败只记录诊断，不重试

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::model::LogEntry;
use crate::config::RouterConfig;
use crate::store::LogStore;

/// 写入器状态
#[derive(Debug, Default)]
enum FlushState {
    #[default]
    Idle,
    // 定时器句柄 + 代号（用于识别已被取消的定时器）
    Buffering(JoinHandle<()>, u64),
    Flushing,
}

#[derive(Debug, Default)]
struct BatcherState {
    // 新的在前
    buffer: VecDeque<LogEntry>,
    flush: FlushState,
    timer_generation: u64,
}

struct BatcherInner {
    store: Arc<dyn LogStore>,
    flush_delay: Duration,
    flush_threshold: usize,
    capacity: usize,
    state: Mutex<BatcherState>,
    // 串行化落盘，保证较早取出的批次先写入
    flush_lock: tokio::sync::Mutex<()>,
}

/// 活动日志批量写入器
#[derive(Clone)]
pub struct LogBatcher {
    inner: Arc<BatcherInner>,
}

impl LogBatcher {
    pub fn new(store: Arc<dyn LogStore>, config: &RouterConfig) -> Self {
        Self {
            inner: Arc::new(BatcherInner {
                store,
                flush_delay: config.flush_delay,
                flush_threshold: config.flush_threshold,
                capacity: config.log_capacity,
                state: Mutex::new(BatcherState::default()),
                flush_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// 记录一条日志（调用方无需等待）
    pub fn record(&self, entry: LogEntry) {
        let mut state = self.inner.lock_state();
        state.buffer.push_front(entry);

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                // 无法落盘时只保留最新的 capacity 条
                state.buffer.truncate(self.inner.capacity);
                warn!("No async runtime available; activity log entry stays buffered");
                return;
            }
        };

        if !matches!(state.flush, FlushState::Buffering(..)) {
            state.timer_generation += 1;
            let generation = state.timer_generation;
            let inner = Arc::clone(&self.inner);
            let timer = handle.spawn(async move {
                tokio::time::sleep(inner.flush_delay).await;
                inner.on_timer(generation);
            });
            state.flush = FlushState::Buffering(timer, generation);
        }

        // 安全阀
        if state.buffer.len() > self.inner.flush_threshold {
            debug!("Activity log buffer over threshold ({}); flushing now", state.buffer.len());
            if let FlushState::Buffering(timer, _) = std::mem::take(&mut state.flush) {
                timer.abort();
            }
            state.timer_generation += 1;
            state.flush = FlushState::Flushing;
            let inner = Arc::clone(&self.inner);
            handle.spawn(async move { inner.flush().await });
        }
    }

    /// 取消待执行的定时器并立即写入全部缓冲
    pub async fn flush_now(&self) {
        {
            let mut state = self.inner.lock_state();
            if let FlushState::Buffering(timer, _) = std::mem::take(&mut state.flush) {
                timer.abort();
            }
            state.timer_generation += 1;
            state.flush = FlushState::Flushing;
        }
        self.inner.flush().await;
    }

    /// 尚未落盘的条目数
    pub fn pending(&self) -> usize {
        self.inner.lock_state().buffer.len()
    }

    /// 是否有待执行的定时写入
    pub fn is_flush_scheduled(&self) -> bool {
        matches!(self.inner.lock_state().flush, FlushState::Buffering(..))
    }
}

impl BatcherInner {
    fn lock_state(&self) -> MutexGuard<'_, BatcherState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 定时器到期：仅当它仍是当前定时器时才触发写入
    fn on_timer(self: Arc<Self>, generation: u64) {
        {
            let mut state = self.lock_state();
            match state.flush {
                FlushState::Buffering(_, current) if current == generation => {
                    state.flush = FlushState::Flushing;
                }
                _ => return,
            }
        }
        // 写入放到独立任务中，取消定时器不会打断进行中的写入
        tokio::spawn(async move { self.flush().await });
    }

    async fn flush(&self) {
        let _guard = self.flush_lock.lock().await;

        // 先取走缓冲再做 I/O，写入期间到达的日志进入新的缓冲
        let batch: Vec<LogEntry> = {
            let mut state = self.lock_state();
            if matches!(state.flush, FlushState::Flushing) {
                state.flush = FlushState::Idle;
            }
            state.buffer.drain(..).collect()
        };
        if batch.is_empty() {
            return;
        }

        let current = match self.store.read_log().await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Log flush error (read): {}; dropping {} entries", e, batch.len());
                return;
            }
        };

        let count = batch.len();
        let merged: Vec<LogEntry> = batch
            .into_iter()
            .chain(current)
            .take(self.capacity)
            .collect();

        match self.store.write_log(&merged).await {
            Ok(()) => debug!("Flushed {} activity log entries ({} kept)", count, merged.len()),
            Err(e) => error!("Log flush error (write): {}; dropping {} entries", e, count),
        }
    }
}
