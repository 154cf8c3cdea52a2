//! 规则编译器核心
//! 将宽松的原始规则转换为预计算的运行时规则，并给出确定的优先级顺序。
//! 编译过程是全函数：任何畸形输入都降级为安全默认值，永不失败

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use super::pattern::{CompiledRule, SiteMatcher};
use crate::error::{RouterError, RouterResult};
use crate::rule::{MatchType, RawRule, RuleId, TargetType};

/// 合成ID计数器，以进程启动时的毫秒时间戳为起点，单调递增
static NEXT_SYNTHETIC_ID: Lazy<AtomicI64> =
    Lazy::new(|| AtomicI64::new(Utc::now().timestamp_millis()));

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 从存储中的原始 JSON 文档编译
    pub fn compile_values(values: &[Value]) -> Vec<CompiledRule> {
        Self::compile(&RawRule::from_values(values))
    }

    /// 编译规则列表并按 (priority desc, id desc) 排序
    pub fn compile(raw_rules: &[RawRule]) -> Vec<CompiledRule> {
        let start = Instant::now();
        let mut stats = CompileStats::default();

        let mut compiled: Vec<CompiledRule> = raw_rules
            .iter()
            .map(|raw| Self::compile_rule(raw, &mut stats))
            .collect();

        Self::sort(&mut compiled);

        debug!(
            "Compiled {} rules in {:?} (includes={}, exact={}, regex={}, invalid_regex={}, unknown_match_type={}, synthesized_ids={})",
            compiled.len(),
            start.elapsed(),
            stats.includes_count,
            stats.exact_count,
            stats.regex_count,
            stats.invalid_regex_count,
            stats.unknown_count,
            stats.synthesized_ids,
        );

        compiled
    }

    /// 优先级降序，同优先级时ID较大者在前
    pub fn sort(rules: &mut [CompiledRule]) {
        rules.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.id.cmp(&a.id))
        });
    }

    /// 编辑器写入前的校验：正则规则的模式必须能编译
    pub fn validate(raw: &RawRule) -> RouterResult<()> {
        if raw.match_type.as_deref() != Some(MatchType::Regex.as_str()) {
            return Ok(());
        }
        let pattern = raw.site_pattern.as_deref().unwrap_or_default();
        Self::build_regex(pattern)
            .map(|_| ())
            .map_err(|source| RouterError::InvalidRegex {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// 生成一个新的规则ID
    pub fn next_id() -> RuleId {
        RuleId::Num(NEXT_SYNTHETIC_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// 编译单条规则
    fn compile_rule(raw: &RawRule, stats: &mut CompileStats) -> CompiledRule {
        let id = match &raw.id {
            Some(id) => id.clone(),
            None => {
                stats.synthesized_ids += 1;
                Self::next_id()
            }
        };

        let site_pattern = raw.site_pattern.clone().unwrap_or_default();
        let target_type = raw
            .target_type
            .as_deref()
            .map(TargetType::parse)
            .unwrap_or(TargetType::FileUrl);

        let (match_type, matcher) = match raw.match_type.as_deref() {
            None => (MatchType::Includes, Self::includes_matcher(&site_pattern, stats)),
            Some(name) => match MatchType::parse(name) {
                Some(MatchType::Includes) => {
                    (MatchType::Includes, Self::includes_matcher(&site_pattern, stats))
                }
                Some(MatchType::Exact) => {
                    stats.exact_count += 1;
                    (MatchType::Exact, SiteMatcher::Exact(site_pattern.clone()))
                }
                Some(MatchType::Regex) => {
                    (MatchType::Regex, Self::regex_matcher(&id, &site_pattern, stats))
                }
                None => {
                    warn!("Rule {} has unknown matchType {:?}; it will never match", id, name);
                    stats.unknown_count += 1;
                    (MatchType::Includes, SiteMatcher::Never)
                }
            },
        };

        CompiledRule {
            id,
            enabled: raw.enabled.unwrap_or(true),
            priority: raw.priority.unwrap_or(0),
            match_type,
            target_type,
            folder_name: raw.folder_name.clone().unwrap_or_default(),
            file_types: raw
                .file_types
                .as_ref()
                .map(|ft| ft.normalized())
                .unwrap_or_default(),
            matcher,
            site_pattern,
        }
    }

    fn includes_matcher(site_pattern: &str, stats: &mut CompileStats) -> SiteMatcher {
        stats.includes_count += 1;
        SiteMatcher::Includes(site_pattern.to_lowercase())
    }

    /// 无效正则不会中断编译，只记录诊断并生成永不匹配的规则。
    /// 语法为 `regex` crate 方言：不支持环视与反向引用
    fn regex_matcher(id: &RuleId, site_pattern: &str, stats: &mut CompileStats) -> SiteMatcher {
        stats.regex_count += 1;
        if site_pattern.is_empty() {
            return SiteMatcher::Regex(None);
        }

        match Self::build_regex(site_pattern) {
            Ok(regex) => SiteMatcher::Regex(Some(regex)),
            Err(e) => {
                stats.invalid_regex_count += 1;
                warn!("Rule {} has invalid regex {:?}: {}", id, site_pattern, e);
                SiteMatcher::Regex(None)
            }
        }
    }

    fn build_regex(pattern: &str) -> Result<Regex, regex::Error> {
        RegexBuilder::new(pattern).case_insensitive(true).build()
    }
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    includes_count: usize,
    exact_count: usize,
    regex_count: usize,
    invalid_regex_count: usize,
    unknown_count: usize,
    synthesized_ids: usize,
}
