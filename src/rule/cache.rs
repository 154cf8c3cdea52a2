//! 规则缓存管理
//! 进程内持有编译后规则集的快照：读者同步取走整份不可变快照（Arc），
//! 写者先完整构建新快照再一次性替换，读者永远看不到半更新状态。
//! 同一时刻最多只有一个加载在进行，并发的刷新请求等待并复用其结果

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::compiler::{CompiledRule, CompiledRuleSet, RuleCompiler};
use crate::store::RuleStore;

/// 规则缓存
pub struct RuleCache {
    store: Arc<dyn RuleStore>,
    snapshot: RwLock<Option<CompiledRuleSet>>,
    // 串行化加载
    load_lock: Mutex<()>,
    // 已完成的加载次数，用于识别“等待期间别人已经加载完成”
    completed_loads: AtomicU64,
}

impl RuleCache {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self {
            store,
            snapshot: RwLock::new(None),
            load_lock: Mutex::new(()),
            completed_loads: AtomicU64::new(0),
        }
    }

    /// 当前快照（不挂起）；缓存为冷时返回 None
    pub fn snapshot(&self) -> Option<CompiledRuleSet> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_warm(&self) -> bool {
        self.snapshot().is_some()
    }

    /// 获取规则集：热缓存立即返回，冷缓存时挂起直到加载完成
    pub async fn get(&self) -> CompiledRuleSet {
        if let Some(rules) = self.snapshot() {
            return rules;
        }
        self.load(false).await
    }

    /// 强制从存储重新加载并编译
    pub async fn refresh(&self) -> CompiledRuleSet {
        self.load(true).await
    }

    /// 标记缓存为冷，下次 `get` 时重新加载
    pub fn invalidate(&self) {
        debug!("Rule cache invalidated");
        *self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// 直接安装一份已编译的规则（整体替换）
    pub fn install(&self, rules: Vec<CompiledRule>) -> CompiledRuleSet {
        let rules: CompiledRuleSet = Arc::new(rules);
        *self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::clone(&rules));
        rules
    }

    /// 已完成的加载次数
    pub fn load_count(&self) -> u64 {
        self.completed_loads.load(Ordering::SeqCst)
    }

    async fn load(&self, force: bool) -> CompiledRuleSet {
        let seen = self.completed_loads.load(Ordering::SeqCst);
        let _guard = self.load_lock.lock().await;

        // 等锁期间有加载完成（或缓存已被别人预热），复用其结果
        let finished_while_waiting = self.completed_loads.load(Ordering::SeqCst) != seen;
        if finished_while_waiting || !force {
            if let Some(rules) = self.snapshot() {
                return rules;
            }
        }

        let rules = match self.store.load_rules().await {
            Ok(values) => {
                let compiled = RuleCompiler::compile_values(&values);
                info!("Rules loaded: {}", compiled.len());
                self.install(compiled)
            }
            // 读取失败：保留最后一份可用快照，没有则安装空规则集
            Err(e) => {
                error!("Rule load error: {}", e);
                match self.snapshot() {
                    Some(previous) => previous,
                    None => self.install(Vec::new()),
                }
            }
        };

        self.completed_loads.fetch_add(1, Ordering::SeqCst);
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    fn store_with(rules: serde_json::Value) -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_rules(rules.as_array().cloned().unwrap_or_default()))
    }

    #[tokio::test]
    async fn cold_get_loads_once_then_serves_warm() {
        let store = store_with(json!([{"id": 1, "sitePattern": "a.com"}]));
        let cache = RuleCache::new(store.clone());

        assert!(!cache.is_warm());
        let first = cache.get().await;
        assert_eq!(first.len(), 1);
        assert!(cache.is_warm());

        let second = cache.get().await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.rule_reads(), 1);
    }

    #[tokio::test]
    async fn refresh_replaces_snapshot_without_touching_old_one() {
        let store = store_with(json!([{"id": 1}]));
        let cache = RuleCache::new(store.clone());
        let old = cache.get().await;

        store.set_rules(vec![json!({"id": 1}), json!({"id": 2})]);
        let new = cache.refresh().await;

        assert_eq!(old.len(), 1);
        assert_eq!(new.len(), 2);
        assert_eq!(cache.snapshot().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refreshes_share_one_load() {
        let store = store_with(json!([{"id": 1}]));
        store.set_rule_read_delay(Duration::from_millis(50));
        let cache = Arc::new(RuleCache::new(store.clone()));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.refresh().await })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_eq!(store.rule_reads(), 1);
        assert_eq!(cache.load_count(), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn invalidate_forces_lazy_reload() {
        let store = store_with(json!([{"id": 1}]));
        let cache = RuleCache::new(store.clone());
        cache.get().await;

        cache.invalidate();
        assert!(!cache.is_warm());
        store.set_rules(vec![]);
        assert!(cache.get().await.is_empty());
        assert_eq!(store.rule_reads(), 2);
    }

    #[tokio::test]
    async fn read_failure_keeps_last_known_good() {
        let store = store_with(json!([{"id": 1}]));
        let cache = RuleCache::new(store.clone());
        cache.get().await;

        store.fail_rule_reads(true);
        let rules = cache.refresh().await;
        assert_eq!(rules.len(), 1);
    }

    #[tokio::test]
    async fn cold_read_failure_installs_empty_set() {
        let store = store_with(json!([{"id": 1}]));
        store.fail_rule_reads(true);
        let cache = RuleCache::new(store.clone());

        assert!(cache.get().await.is_empty());
        assert!(cache.is_warm());
    }
}
