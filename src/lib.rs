//! download-router - 基于规则的下载路径分流引擎

// 导出全局错误类型
pub use self::error::{RouterError, RouterResult};

// 导出配置模块
pub use self::config::{RouterConfig, ConfigManager, CustomConfigBuilder};

// 导出规则模块核心接口
pub use self::rule::{
    RawRule, RuleId, MatchType, TargetType, FileTypes,
    RuleCache, RuleBook, MatchPreview
};

// 导出编译模块核心接口
pub use self::compiler::{CompiledRule, CompiledRuleSet, SiteMatcher, RuleCompiler};

// 导出路由模块核心接口
pub use self::router::{
    DownloadEvent, Decision, ConflictPolicy, MatchOutcome, RuleEngine,
    DownloadRouter, Dispatch, StoreChange,
    init_router, init_router_with_json_store, global_router,
};

// 导出活动日志模块核心接口
pub use self::activity::{LogEntry, LogStatus, Suggestion, LogBatcher, SuggestionAnalyzer};

// 导出存储接缝
pub use self::store::{RuleStore, LogStore, DraftStore, MemoryStore, JsonFileStore};

// 导出草稿交接接口
pub use self::draft::{DraftRule, create_draft_for_page, take_fresh_draft};

// 导出工具模块核心接口
pub use self::utils::{PathUtils, UrlHost};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod compiler;
pub mod router;
pub mod activity;
pub mod store;
pub mod draft;
pub mod utils;
