//! 路由模块：匹配与决策引擎、下载事件门面、全局单例
pub mod engine;
pub mod router;
pub mod global;

// 导出核心接口
pub use self::engine::{ConflictPolicy, Decision, DownloadEvent, MatchOutcome, RuleEngine};
pub use self::router::{Dispatch, DownloadRouter, StoreChange};
pub use self::global::{global_router, init_router, init_router_with_json_store};
