//! 全局路由器单例管理
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use super::router::DownloadRouter;
use crate::config::RouterConfig;
use crate::error::{RouterError, RouterResult};
use crate::store::{JsonFileStore, LogStore, RuleStore};

/// 全局路由器实例
static GLOBAL_ROUTER: Lazy<Arc<OnceCell<DownloadRouter>>> = Lazy::new(|| {
    Arc::new(OnceCell::new())
});

/// 初始化全局路由器（重复调用无副作用）
pub async fn init_router(
    config: RouterConfig,
    rule_store: Arc<dyn RuleStore>,
    log_store: Arc<dyn LogStore>,
) -> RouterResult<()> {
    if GLOBAL_ROUTER.get().is_some() {
        return Ok(());
    }

    let router = DownloadRouter::new(config, rule_store, log_store);
    router.start().await;
    if GLOBAL_ROUTER.set(router).is_err() {
        debug!("Global router was initialized concurrently; keeping the first instance");
    }

    Ok(())
}

/// 以 JSON 文件存储初始化全局路由器
pub async fn init_router_with_json_store(config: RouterConfig) -> RouterResult<()> {
    let store = Arc::new(JsonFileStore::from_config(&config));
    init_router(config, store.clone(), store).await
}

/// 获取全局路由器
pub fn global_router() -> RouterResult<&'static DownloadRouter> {
    GLOBAL_ROUTER.get()
        .ok_or(RouterError::RouterNotInitialized)
}
