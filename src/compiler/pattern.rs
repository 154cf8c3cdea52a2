//! 编译后规则模型
//! 预计算的运行时结构，构建后不可变

use std::sync::Arc;
use regex::Regex;

use crate::rule::{MatchType, RuleId, TargetType};

/// 站点匹配器
#[derive(Debug, Clone)]
pub enum SiteMatcher {
    // 包含匹配（忽略大小写），保存预先小写化的模式
    Includes(String),
    // 完全相等（区分大小写）
    Exact(String),
    // 正则匹配（忽略大小写），模式无效时为 None，永不匹配
    Regex(Option<Regex>),
    // 未知匹配方式，永不匹配
    Never,
}

impl SiteMatcher {
    /// 匹配判断
    ///
    /// `lower_target` 为调用方按事件预先计算好的小写目标URL，
    /// 仅 `Includes` 使用，避免每条规则重复小写化
    pub fn is_match(&self, target: &str, lower_target: &str) -> bool {
        match self {
            SiteMatcher::Includes(pattern) => lower_target.contains(pattern.as_str()),
            SiteMatcher::Exact(pattern) => target == pattern,
            SiteMatcher::Regex(Some(regex)) => regex.is_match(target),
            SiteMatcher::Regex(None) | SiteMatcher::Never => false,
        }
    }

    /// 规则描述
    pub fn describe(&self) -> &str {
        match self {
            SiteMatcher::Includes(_) => "includes",
            SiteMatcher::Exact(_) => "exact",
            SiteMatcher::Regex(Some(r)) => r.as_str(),
            SiteMatcher::Regex(None) => "invalid regex",
            SiteMatcher::Never => "never",
        }
    }
}

/// 编译后的规则
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub id: RuleId,
    pub enabled: bool,
    pub priority: i64,
    pub match_type: MatchType,
    pub target_type: TargetType,
    // 原始模式，用于日志和空模式判断
    pub site_pattern: String,
    pub folder_name: String,
    pub matcher: SiteMatcher,
    // 小写扩展名集合，空表示不过滤
    pub file_types: Vec<String>,
}

impl CompiledRule {
    /// 扩展名过滤：集合为空时放行
    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.file_types.is_empty() || (!ext.is_empty() && self.file_types.iter().any(|ft| ft == ext))
    }
}

/// 编译后的规则集（按优先级降序、ID降序排列），整体替换、不可原地修改
pub type CompiledRuleSet = Arc<Vec<CompiledRule>>;
