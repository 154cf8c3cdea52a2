//! 匹配与决策引擎
//! 按预计算顺序遍历规则，首个完全满足条件的规则胜出。
//! 引擎本身是同步纯函数：不挂起、不写日志、不返回错误，所有异常都降级为“跳过规则”

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::activity::{LogEntry, LogStatus};
use crate::compiler::CompiledRule;
use crate::rule::TargetType;
use crate::utils::PathUtils;

/// 下载事件（只读输入）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadEvent {
    pub url: String,
    #[serde(default)]
    pub referrer: Option<String>,
    pub filename: String,
}

impl DownloadEvent {
    pub fn new(url: impl Into<String>, referrer: Option<&str>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referrer: referrer.map(str::to_string),
            filename: filename.into(),
        }
    }

    pub fn referrer_str(&self) -> &str {
        self.referrer.as_deref().unwrap_or_default()
    }
}

/// 重名处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictPolicy {
    Uniquify,
}

/// 路由决策
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    // 清洗后的相对路径
    pub path: String,
    pub conflict_policy: ConflictPolicy,
}

/// 匹配结果：胜出规则 + 决策
#[derive(Debug, Clone)]
pub struct MatchOutcome<'a> {
    pub rule: &'a CompiledRule,
    pub decision: Decision,
}

/// 规则引擎
pub struct RuleEngine;

impl RuleEngine {
    /// 以当前本地日期解析
    pub fn resolve(event: &DownloadEvent, rules: &[CompiledRule]) -> Option<Decision> {
        Self::evaluate(event, rules, Local::now().date_naive()).map(|outcome| outcome.decision)
    }

    /// 核心匹配：返回首个适用规则及其决策，没有则为 None
    pub fn evaluate<'a>(
        event: &DownloadEvent,
        rules: &'a [CompiledRule],
        today: NaiveDate,
    ) -> Option<MatchOutcome<'a>> {
        // 每个事件只小写化一次
        let url_lower = event.url.to_lowercase();
        let referrer = event.referrer_str();
        let referrer_lower = referrer.to_lowercase();
        let extension = PathUtils::file_extension(&event.filename);

        for rule in rules {
            if !rule.enabled {
                continue;
            }

            let (target, target_lower) = if rule.target_type == TargetType::PageUrl && !referrer.is_empty() {
                (referrer, referrer_lower.as_str())
            } else {
                (event.url.as_str(), url_lower.as_str())
            };
            if target.is_empty() || rule.site_pattern.is_empty() {
                continue;
            }

            if !rule.matcher.is_match(target, target_lower) {
                continue;
            }

            if !rule.accepts_extension(&extension) {
                debug!(
                    "Rule {} ({}) matched but extension {:?} is filtered out",
                    rule.id,
                    rule.matcher.describe(),
                    extension
                );
                continue;
            }

            let resolved = PathUtils::replace_placeholders(&rule.folder_name, today, target);
            let folder = PathUtils::sanitize_folder_path(&resolved);

            // 模板非空却清洗为空：该规则不适用，继续尝试后续规则
            if !rule.folder_name.is_empty() && folder.is_empty() {
                debug!(
                    "Rule {} folder template {:?} sanitized to empty; skipping",
                    rule.id, rule.folder_name
                );
                continue;
            }

            let path = if folder.is_empty() {
                event.filename.clone()
            } else {
                format!("{}/{}", folder, event.filename)
            };

            return Some(MatchOutcome {
                rule,
                decision: Decision {
                    path,
                    conflict_policy: ConflictPolicy::Uniquify,
                },
            });
        }

        None
    }

    /// 为一次解析构造活动日志条目
    pub fn log_entry(event: &DownloadEvent, outcome: Option<&MatchOutcome<'_>>, timestamp: i64) -> LogEntry {
        match outcome {
            Some(outcome) => LogEntry {
                timestamp,
                filename: event.filename.clone(),
                final_path: outcome.decision.path.clone(),
                url: event.url.clone(),
                referrer: event.referrer_str().to_string(),
                rule_id: Some(outcome.rule.id.clone()),
                rule_name: Some(outcome.rule.site_pattern.clone()),
                status: LogStatus::Matched,
            },
            None => LogEntry {
                timestamp,
                filename: event.filename.clone(),
                final_path: event.filename.clone(),
                url: event.url.clone(),
                referrer: event.referrer_str().to_string(),
                rule_id: None,
                rule_name: None,
                status: LogStatus::NoMatch,
            },
        }
    }
}
