//! 活动日志模块：日志模型、批量写入、建议分析
pub mod model;
pub mod batcher;
pub mod analyzer;

pub use self::model::{LogEntry, LogStatus, Suggestion};
pub use self::batcher::LogBatcher;
pub use self::analyzer::{SuggestionAnalyzer, FREQUENT_DOMAIN};
