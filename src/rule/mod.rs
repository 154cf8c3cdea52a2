//! 规则模块：规则数据模型、编译后规则集缓存、编辑器侧的规则簿
pub mod model;
pub mod cache;
pub mod book;

// 导出核心接口
pub use self::model::{FileTypes, MatchType, RawRule, RuleId, TargetType};
pub use self::cache::RuleCache;
pub use self::book::{MatchPreview, RuleBook};
