//! 内存存储实现
//! 用于嵌入式场景和测试，支持注入读写失败与读取延迟

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use async_trait::async_trait;
use serde_json::Value;

use super::{DraftStore, LogStore, RuleStore};
use crate::activity::LogEntry;
use crate::draft::DraftRule;
use crate::error::{RouterError, RouterResult};
use crate::rule::RawRule;

#[derive(Debug, Default)]
struct MemoryState {
    rules: Vec<Value>,
    global_enabled: Option<bool>,
    activity_log: Vec<LogEntry>,
    draft: Option<DraftRule>,
    rule_read_delay: Duration,
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_rule_reads: AtomicBool,
    fail_log_writes: AtomicBool,
    rule_reads: AtomicUsize,
    log_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以原始规则文档初始化
    pub fn with_rules(rules: Vec<Value>) -> Self {
        let store = Self::default();
        store.set_rules(rules);
        store
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 直接替换规则文档（模拟外部编辑器写入）
    pub fn set_rules(&self, rules: Vec<Value>) {
        self.state().rules = rules;
    }

    pub fn set_global_enabled(&self, enabled: Option<bool>) {
        self.state().global_enabled = enabled;
    }

    pub fn set_rule_read_delay(&self, delay: Duration) {
        self.state().rule_read_delay = delay;
    }

    pub fn fail_rule_reads(&self, fail: bool) {
        self.fail_rule_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_log_writes(&self, fail: bool) {
        self.fail_log_writes.store(fail, Ordering::SeqCst);
    }

    /// 规则读取次数
    pub fn rule_reads(&self) -> usize {
        self.rule_reads.load(Ordering::SeqCst)
    }

    /// 日志写入次数
    pub fn log_writes(&self) -> usize {
        self.log_writes.load(Ordering::SeqCst)
    }

    pub fn rules_snapshot(&self) -> Vec<Value> {
        self.state().rules.clone()
    }

    pub fn log_snapshot(&self) -> Vec<LogEntry> {
        self.state().activity_log.clone()
    }

    pub fn draft_snapshot(&self) -> Option<DraftRule> {
        self.state().draft.clone()
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn load_rules(&self) -> RouterResult<Vec<Value>> {
        self.rule_reads.fetch_add(1, Ordering::SeqCst);
        let delay = self.state().rule_read_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_rule_reads.load(Ordering::SeqCst) {
            return Err(RouterError::RuleStoreError("injected read failure".to_string()));
        }
        Ok(self.state().rules.clone())
    }

    async fn load_global_enabled(&self) -> RouterResult<Option<bool>> {
        Ok(self.state().global_enabled)
    }

    async fn save_rules(&self, rules: &[RawRule]) -> RouterResult<()> {
        self.state().rules = rules.iter().map(RawRule::to_value).collect();
        Ok(())
    }

    async fn save_global_enabled(&self, enabled: bool) -> RouterResult<()> {
        self.state().global_enabled = Some(enabled);
        Ok(())
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn read_log(&self) -> RouterResult<Vec<LogEntry>> {
        Ok(self.state().activity_log.clone())
    }

    async fn write_log(&self, entries: &[LogEntry]) -> RouterResult<()> {
        if self.fail_log_writes.load(Ordering::SeqCst) {
            return Err(RouterError::LogStoreError("injected write failure".to_string()));
        }
        self.log_writes.fetch_add(1, Ordering::SeqCst);
        self.state().activity_log = entries.to_vec();
        Ok(())
    }
}

#[async_trait]
impl DraftStore for MemoryStore {
    async fn read_draft(&self) -> RouterResult<Option<DraftRule>> {
        Ok(self.state().draft.clone())
    }

    async fn write_draft(&self, draft: &DraftRule) -> RouterResult<()> {
        self.state().draft = Some(draft.clone());
        Ok(())
    }

    async fn remove_draft(&self) -> RouterResult<()> {
        self.state().draft = None;
        Ok(())
    }
}
