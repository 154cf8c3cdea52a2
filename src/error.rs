//! 全局错误类型定义
//! 热路径（规则匹配）不返回错误，只有存储接缝和编辑器写入会产生错误

use thiserror::Error;
use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;

#[derive(Error, Debug)]
pub enum RouterError {
    // 存储相关错误
    #[error("规则存储读取失败：{0}")]
    RuleStoreError(String),
    #[error("活动日志存储失败：{0}")]
    LogStoreError(String),

    // 规则校验错误（编辑器写入时同步拒绝）
    #[error("无效正则表达式 `{pattern}`：{source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: RegexError,
    },
    #[error("规则不存在：{0}")]
    RuleNotFound(String),
    #[error("规则位置越界：{index}（共 {len} 条）")]
    RuleIndexOutOfRange { index: usize, len: usize },

    // 路由器相关错误
    #[error("路由器未初始化")]
    RouterNotInitialized,

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
}

// 全局Result类型
pub type RouterResult<T> = Result<T, RouterError>;
