//! 下载路由器：对接下载事件源的门面
//! 热缓存时同步给出决策（不挂起），冷缓存时告知事件源“稍后答复”，
//! 由 `decide` 完成冷加载。每次解析都记录一条活动日志（禁用时除外）

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use chrono::Local;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::engine::{Decision, DownloadEvent, RuleEngine};
use crate::activity::{LogBatcher, Suggestion, SuggestionAnalyzer};
use crate::compiler::CompiledRule;
use crate::config::RouterConfig;
use crate::error::RouterResult;
use crate::rule::RuleCache;
use crate::store::{LogStore, RuleStore};

/// 对下载事件的即时答复
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// 同步答复（None 表示不干预，使用默认文件名）
    Ready(Option<Decision>),
    /// 缓存为冷：事件源应等待 `DownloadRouter::decide`
    Deferred,
}

/// 存储变更通知
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    Rules,
    GlobalEnabled(bool),
}

/// 下载路由器
pub struct DownloadRouter {
    config: RouterConfig,
    rule_store: Arc<dyn RuleStore>,
    log_store: Arc<dyn LogStore>,
    cache: Arc<RuleCache>,
    batcher: LogBatcher,
    enabled: AtomicBool,
}

impl DownloadRouter {
    pub fn new(config: RouterConfig, rule_store: Arc<dyn RuleStore>, log_store: Arc<dyn LogStore>) -> Self {
        let cache = Arc::new(RuleCache::new(Arc::clone(&rule_store)));
        let batcher = LogBatcher::new(Arc::clone(&log_store), &config);
        Self {
            config,
            rule_store,
            log_store,
            cache,
            batcher,
            enabled: AtomicBool::new(true),
        }
    }

    /// 启动：读取全局开关并预热规则缓存
    pub async fn start(&self) {
        match self.rule_store.load_global_enabled().await {
            Ok(flag) => self.set_enabled(flag.unwrap_or(true)),
            Err(e) => warn!("Failed to read global enable flag, assuming enabled: {}", e),
        }
        let rules = self.cache.refresh().await;
        info!(
            "Download router started ({} rules, enabled={})",
            rules.len(),
            self.is_enabled()
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// 仅更新内存中的开关副本
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// 持久化全局开关并立即生效
    pub async fn save_enabled(&self, enabled: bool) -> RouterResult<()> {
        self.rule_store.save_global_enabled(enabled).await?;
        self.set_enabled(enabled);
        Ok(())
    }

    /// 下载事件入口：热缓存或禁用时同步答复
    pub fn on_determining_filename(&self, event: &DownloadEvent) -> Dispatch {
        if !self.is_enabled() {
            return Dispatch::Ready(None);
        }
        match self.cache.snapshot() {
            Some(rules) => Dispatch::Ready(self.resolve_with(event, &rules)),
            None => {
                debug!("Rule cache cold; deferring decision for {}", event.filename);
                Dispatch::Deferred
            }
        }
    }

    /// 异步决策（冷缓存时挂起到加载完成）
    pub async fn decide(&self, event: &DownloadEvent) -> Option<Decision> {
        if !self.is_enabled() {
            return None;
        }
        let rules = self.cache.get().await;
        self.resolve_with(event, &rules)
    }

    /// 基于给定规则集解析并记录日志
    pub fn resolve_with(&self, event: &DownloadEvent, rules: &[CompiledRule]) -> Option<Decision> {
        let now = Local::now();
        let outcome = RuleEngine::evaluate(event, rules, now.date_naive());

        match &outcome {
            Some(o) => debug!("Download {} routed to {:?} by rule {}", event.filename, o.decision.path, o.rule.id),
            None => debug!("No rule matched download {}", event.filename),
        }

        self.batcher
            .record(RuleEngine::log_entry(event, outcome.as_ref(), now.timestamp_millis()));
        outcome.map(|o| o.decision)
    }

    /// 处理存储变更通知；规则变更时返回后台刷新任务句柄
    pub fn on_store_changed(&self, change: StoreChange) -> Option<JoinHandle<()>> {
        match change {
            StoreChange::GlobalEnabled(enabled) => {
                info!("Global routing {}", if enabled { "enabled" } else { "disabled" });
                self.set_enabled(enabled);
                None
            }
            StoreChange::Rules => match Handle::try_current() {
                Ok(handle) => {
                    let cache = Arc::clone(&self.cache);
                    Some(handle.spawn(async move {
                        cache.refresh().await;
                    }))
                }
                Err(_) => {
                    // 无运行时无法立即刷新，降级为懒加载
                    warn!("No async runtime available; rule cache invalidated instead of refreshed");
                    self.cache.invalidate();
                    None
                }
            },
        }
    }

    /// 读取持久化日志并生成规则建议
    pub async fn suggestions(&self) -> RouterResult<Vec<Suggestion>> {
        let logs = self.log_store.read_log().await?;
        Ok(SuggestionAnalyzer::new(self.config.suggestion_min_hits).analyze(&logs))
    }

    /// 立即写入缓冲中的活动日志
    pub async fn flush_log(&self) {
        self.batcher.flush_now().await;
    }

    pub fn rule_cache(&self) -> &Arc<RuleCache> {
        &self.cache
    }

    pub fn log_batcher(&self) -> &LogBatcher {
        &self.batcher
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }
}
