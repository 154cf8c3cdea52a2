//! 活动日志与规则建议的数据模型

use serde::{Deserialize, Deserializer, Serialize};

use crate::rule::{RawRule, RuleId};

/// 解析结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Matched,
    NoMatch,
}

/// 活动日志条目（持久化格式）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    // 毫秒时间戳
    pub timestamp: i64,
    pub filename: String,
    pub final_path: String,
    pub url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub referrer: String,
    #[serde(default)]
    pub rule_id: Option<RuleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    pub status: LogStatus,
}

// 旧版日志中 referrer 可能为 null
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// 规则建议（仅供参考，需外部确认后才会成为真正的规则）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub rule_data: RawRule,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn log_entry_wire_format() {
        let entry = LogEntry {
            timestamp: 1,
            filename: "a.zip".into(),
            final_path: "x/a.zip".into(),
            url: "https://a.com/a.zip".into(),
            referrer: String::new(),
            rule_id: Some(RuleId::Num(3)),
            rule_name: None,
            status: LogStatus::NoMatch,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["finalPath"], json!("x/a.zip"));
        assert_eq!(value["ruleId"], json!(3));
        assert_eq!(value["status"], json!("no_match"));
        assert!(value.get("ruleName").is_none());
    }

    #[test]
    fn log_entry_tolerates_missing_optional_fields() {
        let entry: LogEntry = serde_json::from_value(json!({
            "timestamp": 5,
            "filename": "b.pdf",
            "finalPath": "b.pdf",
            "url": "https://b.com/b.pdf",
            "referrer": null,
            "status": "matched"
        }))
        .unwrap();
        assert_eq!(entry.referrer, "");
        assert_eq!(entry.rule_id, None);
        assert_eq!(entry.status, LogStatus::Matched);
    }
}
