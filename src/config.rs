//! 全局配置管理,存储所有可配置项

use std::path::PathBuf;
use std::time::Duration;

/// 全局配置
#[derive(Debug, Clone)]
pub struct RouterConfig {
    // 日志批量写入的防抖延迟
    pub flush_delay: Duration,
    // 未落盘日志超过该条数时立即写入（安全阀）
    pub flush_threshold: usize,
    // 持久化活动日志的最大条数
    pub log_capacity: usize,
    // 草稿规则的有效期
    pub draft_ttl: Duration,
    // 生成规则建议所需的最少未匹配次数
    pub suggestion_min_hits: usize,
    // JSON文件存储目录
    pub store_dir: PathBuf,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            flush_delay: Duration::from_secs(1),
            flush_threshold: 10,
            log_capacity: 50,
            draft_ttl: Duration::from_secs(60),
            suggestion_min_hits: 3,
            store_dir: PathBuf::from("download_router_store"),
        }
    }
}

/// 配置管理器（单例）
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> RouterConfig {
        RouterConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: RouterConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RouterConfig::default(),
        }
    }

    pub fn flush_delay(mut self, delay: Duration) -> Self {
        self.config.flush_delay = delay;
        self
    }

    pub fn flush_threshold(mut self, threshold: usize) -> Self {
        self.config.flush_threshold = threshold;
        self
    }

    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.config.log_capacity = capacity;
        self
    }

    pub fn draft_ttl(mut self, ttl: Duration) -> Self {
        self.config.draft_ttl = ttl;
        self
    }

    pub fn suggestion_min_hits(mut self, hits: usize) -> Self {
        self.config.suggestion_min_hits = hits;
        self
    }

    pub fn store_dir(mut self, dir: PathBuf) -> Self {
        self.config.store_dir = dir;
        self
    }

    pub fn build(self) -> RouterConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ConfigManager::get_default();
        assert_eq!(config.flush_delay, Duration::from_secs(1));
        assert_eq!(config.flush_threshold, 10);
        assert_eq!(config.log_capacity, 50);
        assert_eq!(config.draft_ttl, Duration::from_secs(60));
        assert_eq!(config.suggestion_min_hits, 3);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = ConfigManager::custom()
            .flush_threshold(2)
            .log_capacity(5)
            .build();
        assert_eq!(config.flush_threshold, 2);
        assert_eq!(config.log_capacity, 5);
        assert_eq!(config.flush_delay, Duration::from_secs(1));
    }
}
