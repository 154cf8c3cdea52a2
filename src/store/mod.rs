//! 存储接缝：规则存储、活动日志存储、草稿存储
//! 事件订阅与持久化由宿主提供，这里只定义接口和两个实现（内存 / JSON文件）
pub mod memory;
pub mod json_file;

use async_trait::async_trait;
use serde_json::Value;

use crate::activity::LogEntry;
use crate::draft::DraftRule;
use crate::error::RouterResult;
use crate::rule::RawRule;

pub use self::memory::MemoryStore;
pub use self::json_file::JsonFileStore;

/// 存储键名
pub const RULES_KEY: &str = "rules";
pub const GLOBAL_ENABLED_KEY: &str = "globalEnabled";
pub const ACTIVITY_LOG_KEY: &str = "activityLog";
pub const DRAFT_RULE_KEY: &str = "draftRule";

/// 规则存储（跨设备同步）
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// 读取原始规则文档，未设置时返回空列表
    async fn load_rules(&self) -> RouterResult<Vec<Value>>;
    /// 读取全局开关，未设置时返回 None
    async fn load_global_enabled(&self) -> RouterResult<Option<bool>>;
    async fn save_rules(&self, rules: &[RawRule]) -> RouterResult<()>;
    async fn save_global_enabled(&self, enabled: bool) -> RouterResult<()>;
}

/// 活动日志存储（仅本地）
#[async_trait]
pub trait LogStore: Send + Sync {
    /// 读取持久化日志（新的在前），未设置时返回空列表
    async fn read_log(&self) -> RouterResult<Vec<LogEntry>>;
    async fn write_log(&self, entries: &[LogEntry]) -> RouterResult<()>;
}

/// 草稿规则交接存储（仅本地，短期）
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn read_draft(&self) -> RouterResult<Option<DraftRule>>;
    async fn write_draft(&self, draft: &DraftRule) -> RouterResult<()>;
    async fn remove_draft(&self) -> RouterResult<()>;
}
