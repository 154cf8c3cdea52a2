//! 日志分析器
//! 统计未匹配下载的来源域名，为频繁出现的域名生成规则建议（只建议，不写入规则存储）

use std::collections::HashMap;
use tracing::debug;

use super::model::{LogEntry, LogStatus, Suggestion};
use crate::rule::{FileTypes, RawRule};
use crate::utils::{PathUtils, UrlHost};

/// 建议类型：频繁访问的域名
pub const FREQUENT_DOMAIN: &str = "frequent_domain";

/// 单个域名的聚合数据
#[derive(Debug, Default)]
struct DomainStats {
    count: usize,
    // 扩展名计数，保持首次出现顺序
    extensions: Vec<(String, usize)>,
}

impl DomainStats {
    fn add_extension(&mut self, ext: String) {
        match self.extensions.iter_mut().find(|(e, _)| *e == ext) {
            Some((_, count)) => *count += 1,
            None => self.extensions.push((ext, 1)),
        }
    }

    /// 出现最多的扩展名，计数相同时取先出现者
    fn top_extension(&self) -> Option<&str> {
        let mut top: Option<(&str, usize)> = None;
        for (ext, count) in &self.extensions {
            if top.is_none_or(|(_, max)| *count > max) {
                top = Some((ext.as_str(), *count));
            }
        }
        top.map(|(ext, _)| ext)
    }
}

/// 规则建议分析器
#[derive(Debug, Clone)]
pub struct SuggestionAnalyzer {
    min_hits: usize,
}

impl Default for SuggestionAnalyzer {
    fn default() -> Self {
        Self { min_hits: 3 }
    }
}

impl SuggestionAnalyzer {
    pub fn new(min_hits: usize) -> Self {
        Self { min_hits }
    }

    /// 分析日志并生成建议，按域名首次出现顺序输出
    pub fn analyze(&self, logs: &[LogEntry]) -> Vec<Suggestion> {
        let no_match: Vec<&LogEntry> = logs
            .iter()
            .filter(|log| log.status == LogStatus::NoMatch)
            .collect();
        if no_match.len() < self.min_hits {
            return Vec::new();
        }

        let mut order: Vec<String> = Vec::new();
        let mut stats: HashMap<String, DomainStats> = HashMap::new();

        for log in no_match {
            let source = if log.referrer.is_empty() { &log.url } else { &log.referrer };
            let Some(domain) = UrlHost::hostname(source) else {
                continue;
            };

            let entry = stats.entry(domain.clone()).or_insert_with(|| {
                order.push(domain);
                DomainStats::default()
            });
            entry.count += 1;

            let ext = PathUtils::file_extension(&log.filename);
            if !ext.is_empty() {
                entry.add_extension(ext);
            }
        }

        let suggestions: Vec<Suggestion> = order
            .iter()
            .filter_map(|domain| {
                let data = stats.get(domain)?;
                (data.count >= self.min_hits).then(|| Self::suggest(domain, data))
            })
            .collect();

        debug!("Analyzer produced {} suggestions from {} domains", suggestions.len(), order.len());
        suggestions
    }

    fn suggest(domain: &str, data: &DomainStats) -> Suggestion {
        let file_types = data
            .top_extension()
            .map(|ext| vec![ext.to_string()])
            .unwrap_or_default();

        Suggestion {
            kind: FREQUENT_DOMAIN.to_string(),
            title: "Frequently used site".to_string(),
            message: format!(
                "{} downloads from {} had no matching rule. Collect them in a dedicated folder?",
                data.count, domain
            ),
            rule_data: RawRule {
                site_pattern: Some(domain.to_string()),
                match_type: Some("includes".to_string()),
                target_type: Some("pageUrl".to_string()),
                folder_name: Some(format!("{}_Files", domain.replace('.', "_"))),
                file_types: Some(FileTypes::List(file_types)),
                enabled: Some(true),
                ..RawRule::default()
            },
        }
    }
}
