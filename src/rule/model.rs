//! 规则数据模型定义
//! 外部存储中的规则文档不可信，`RawRule::from_value` 负责把任意形状的 JSON
//! 宽松地转换为强类型（字段缺失或类型错误一律视为 None），默认值由编译器补全

use std::cmp::Ordering;
use std::fmt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 规则ID（数字或字符串）
///
/// 排序为全序：数字ID（含纯数字字符串）按数值比较且大于非数字字符串，
/// 非数字字符串之间按字典序比较
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleId {
    Num(i64),
    Text(String),
}

impl RuleId {
    /// 数值视图（纯数字字符串也视为数字）
    pub fn numeric(&self) -> Option<i64> {
        match self {
            RuleId::Num(n) => Some(*n),
            RuleId::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }

    fn variant_rank(&self) -> u8 {
        match self {
            RuleId::Num(_) => 1,
            RuleId::Text(_) => 0,
        }
    }

    /// 与字符串形式的ID比较（编辑器传入的ID统一按字符串匹配）
    pub fn matches_str(&self, other: &str) -> bool {
        self.to_string() == other
    }
}

impl Ord for RuleId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a
                .cmp(&b)
                .then_with(|| self.variant_rank().cmp(&other.variant_rank()))
                .then_with(|| self.to_string().cmp(&other.to_string())),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl PartialOrd for RuleId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleId::Num(n) => write!(f, "{}", n),
            RuleId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RuleId {
    fn from(value: i64) -> Self {
        RuleId::Num(value)
    }
}

impl From<&str> for RuleId {
    fn from(value: &str) -> Self {
        RuleId::Text(value.to_string())
    }
}

/// 匹配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchType {
    Includes,
    Exact,
    Regex,
}

impl MatchType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "includes" => Some(MatchType::Includes),
            "exact" => Some(MatchType::Exact),
            "regex" => Some(MatchType::Regex),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Includes => "includes",
            MatchType::Exact => "exact",
            MatchType::Regex => "regex",
        }
    }
}

/// 匹配目标（文件URL或页面URL）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetType {
    FileUrl,
    PageUrl,
}

impl TargetType {
    /// 仅 `pageUrl` 表示页面URL，其他取值一律按文件URL处理
    pub fn parse(raw: &str) -> Self {
        if raw == "pageUrl" {
            TargetType::PageUrl
        } else {
            TargetType::FileUrl
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::FileUrl => "fileUrl",
            TargetType::PageUrl => "pageUrl",
        }
    }
}

/// 文件类型：数组或逗号分隔字符串
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileTypes {
    List(Vec<String>),
    Csv(String),
}

impl FileTypes {
    /// 拆分为去空白、小写、非空的扩展名列表（保持首次出现顺序，去重）
    pub fn normalized(&self) -> Vec<String> {
        let items: Vec<&str> = match self {
            FileTypes::List(list) => list.iter().map(String::as_str).collect(),
            FileTypes::Csv(csv) => csv.split(',').collect(),
        };

        let mut normalized: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            let ext = item.trim().to_lowercase();
            if !ext.is_empty() && !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }
        normalized
    }
}

/// 外部存储中的规则（所有字段可缺失）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RuleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_types: Option<FileTypes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    // 编辑器附加的其他字段，原样保留以便回写
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

const KNOWN_FIELDS: [&str; 8] = [
    "id", "sitePattern", "matchType", "targetType", "folderName", "fileTypes", "priority", "enabled",
];

impl RawRule {
    /// 宽松解析任意 JSON 值，永不失败
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return RawRule::default();
        };

        let string_field = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

        let extra = obj
            .iter()
            .filter(|(k, _)| !KNOWN_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        RawRule {
            id: obj.get("id").and_then(coerce_id),
            site_pattern: string_field("sitePattern"),
            match_type: string_field("matchType").filter(|s| !s.is_empty()),
            target_type: string_field("targetType").filter(|s| !s.is_empty()),
            folder_name: string_field("folderName"),
            file_types: obj.get("fileTypes").and_then(coerce_file_types),
            priority: obj.get("priority").and_then(coerce_priority),
            enabled: obj.get("enabled").and_then(Value::as_bool),
            extra,
        }
    }

    /// 批量宽松解析
    pub fn from_values(values: &[Value]) -> Vec<Self> {
        values.iter().map(Self::from_value).collect()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// 空字符串与 0 视为缺失ID
fn coerce_id(value: &Value) -> Option<RuleId> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                (i != 0).then_some(RuleId::Num(i))
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0 && *f != 0.0)
                    .map(|f| RuleId::Num(f as i64))
            }
        }
        Value::String(s) if !s.is_empty() => Some(RuleId::Text(s.clone())),
        _ => None,
    }
}

/// 数组中只保留字符串元素；字符串按逗号拆分
fn coerce_file_types(value: &Value) -> Option<FileTypes> {
    match value {
        Value::Array(items) => Some(FileTypes::List(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        )),
        Value::String(s) if !s.is_empty() => Some(FileTypes::Csv(s.clone())),
        _ => None,
    }
}

/// 整数解析：数字截断取整，字符串取前导整数部分（如 "7abc" -> 7），其他为 None
pub(crate) fn coerce_priority(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1i64, &trimmed[1..]),
        Some(b'+') => (1i64, &trimmed[1..]),
        _ => (1i64, trimmed),
    };

    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign.saturating_mul(magnitude))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_reads_well_formed_rule() {
        let raw = RawRule::from_value(&json!({
            "id": "abc",
            "sitePattern": "example.com",
            "matchType": "regex",
            "targetType": "pageUrl",
            "folderName": "Docs",
            "fileTypes": ["PDF", " zip "],
            "priority": 4,
            "enabled": false,
            "enableDateSubfolder": true
        }));

        assert_eq!(raw.id, Some(RuleId::Text("abc".into())));
        assert_eq!(raw.site_pattern.as_deref(), Some("example.com"));
        assert_eq!(raw.match_type.as_deref(), Some("regex"));
        assert_eq!(raw.target_type.as_deref(), Some("pageUrl"));
        assert_eq!(raw.priority, Some(4));
        assert_eq!(raw.enabled, Some(false));
        assert_eq!(raw.extra.get("enableDateSubfolder"), Some(&json!(true)));
    }

    #[test]
    fn from_value_tolerates_wrong_types() {
        let raw = RawRule::from_value(&json!({
            "id": 0,
            "sitePattern": 42,
            "enabled": "yes",
            "priority": {"x": 1},
            "fileTypes": 7
        }));
        assert_eq!(raw.id, None);
        assert_eq!(raw.site_pattern, None);
        assert_eq!(raw.enabled, None);
        assert_eq!(raw.priority, None);
        assert_eq!(raw.file_types, None);

        assert_eq!(RawRule::from_value(&json!("garbage")), RawRule::default());
        assert_eq!(RawRule::from_value(&Value::Null), RawRule::default());
    }

    #[test]
    fn priority_coercion() {
        assert_eq!(coerce_priority(&json!(3)), Some(3));
        assert_eq!(coerce_priority(&json!(3.9)), Some(3));
        assert_eq!(coerce_priority(&json!(-2.5)), Some(-2));
        assert_eq!(coerce_priority(&json!("7abc")), Some(7));
        assert_eq!(coerce_priority(&json!("  -12")), Some(-12));
        assert_eq!(coerce_priority(&json!("abc")), None);
        assert_eq!(coerce_priority(&json!(null)), None);
        assert_eq!(coerce_priority(&json!(true)), None);
    }

    #[test]
    fn file_types_normalization() {
        let csv = FileTypes::Csv(" PDF, zip,,Zip ,".into());
        assert_eq!(csv.normalized(), vec!["pdf".to_string(), "zip".to_string()]);

        let list = FileTypes::List(vec!["Mp4".into(), "".into(), " ".into()]);
        assert_eq!(list.normalized(), vec!["mp4".to_string()]);

        let raw = RawRule::from_value(&json!({"fileTypes": ["a", 1, null, "b"]}));
        assert_eq!(raw.file_types, Some(FileTypes::List(vec!["a".into(), "b".into()])));
    }

    #[test]
    fn rule_id_ordering_is_total() {
        let mut ids = vec![
            RuleId::Text("beta".into()),
            RuleId::Num(5),
            RuleId::Text("10".into()),
            RuleId::Text("alpha".into()),
            RuleId::Num(10),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                RuleId::Text("alpha".into()),
                RuleId::Text("beta".into()),
                RuleId::Num(5),
                RuleId::Text("10".into()),
                RuleId::Num(10),
            ]
        );
    }

    #[test]
    fn raw_rule_serializes_camel_case() {
        let raw = RawRule {
            site_pattern: Some("a.com".into()),
            file_types: Some(FileTypes::List(vec!["pdf".into()])),
            enabled: Some(true),
            ..RawRule::default()
        };
        assert_eq!(
            raw.to_value(),
            json!({"sitePattern": "a.com", "fileTypes": ["pdf"], "enabled": true})
        );
    }
}
