//! JSON文件存储
//! 每个存储键对应目录下的一个 JSON 文件，文件不存在视为未设置

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    DraftStore, LogStore, RuleStore, ACTIVITY_LOG_KEY, DRAFT_RULE_KEY, GLOBAL_ENABLED_KEY,
    RULES_KEY,
};
use crate::activity::LogEntry;
use crate::config::RouterConfig;
use crate::draft::DraftRule;
use crate::error::RouterResult;
use crate::rule::RawRule;

/// JSON文件存储
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &RouterConfig) -> Self {
        Self::new(config.store_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// 读取键值，文件不存在时返回 None
    async fn read_key<T: DeserializeOwned>(&self, key: &str) -> RouterResult<Option<T>> {
        let path = self.key_path(key);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let value = serde_json::from_slice(&data)?;
        debug!("Read {} ({} bytes)", path.display(), data.len());
        Ok(Some(value))
    }

    /// 先写临时文件再重命名，避免读到写了一半的文件
    async fn write_key<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> RouterResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.key_path(key);
        let tmp_path = self.dir.join(format!("{}.json.tmp", key));

        let data = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        debug!("Wrote {} ({} bytes)", path.display(), data.len());
        Ok(())
    }

    async fn remove_key(&self, key: &str) -> RouterResult<()> {
        match tokio::fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl RuleStore for JsonFileStore {
    async fn load_rules(&self) -> RouterResult<Vec<Value>> {
        // 文档不是数组时按空规则处理
        let doc: Option<Value> = self.read_key(RULES_KEY).await?;
        Ok(match doc {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        })
    }

    async fn load_global_enabled(&self) -> RouterResult<Option<bool>> {
        let doc: Option<Value> = self.read_key(GLOBAL_ENABLED_KEY).await?;
        Ok(doc.and_then(|v| v.as_bool()))
    }

    async fn save_rules(&self, rules: &[RawRule]) -> RouterResult<()> {
        self.write_key(RULES_KEY, rules).await
    }

    async fn save_global_enabled(&self, enabled: bool) -> RouterResult<()> {
        self.write_key(GLOBAL_ENABLED_KEY, &enabled).await
    }
}

#[async_trait]
impl LogStore for JsonFileStore {
    /// 逐条解析，畸形条目跳过，不影响后续写入
    async fn read_log(&self) -> RouterResult<Vec<LogEntry>> {
        let doc: Option<Value> = self.read_key(ACTIVITY_LOG_KEY).await?;
        let items = match doc {
            None => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                warn!("Activity log document is not an array; starting a new log");
                return Ok(Vec::new());
            }
        };

        let total = items.len();
        let entries: Vec<LogEntry> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        if entries.len() < total {
            warn!("Skipped {} malformed activity log entries", total - entries.len());
        }
        Ok(entries)
    }

    async fn write_log(&self, entries: &[LogEntry]) -> RouterResult<()> {
        self.write_key(ACTIVITY_LOG_KEY, entries).await
    }
}

#[async_trait]
impl DraftStore for JsonFileStore {
    async fn read_draft(&self) -> RouterResult<Option<DraftRule>> {
        self.read_key(DRAFT_RULE_KEY).await
    }

    async fn write_draft(&self, draft: &DraftRule) -> RouterResult<()> {
        self.write_key(DRAFT_RULE_KEY, draft).await
    }

    async fn remove_draft(&self) -> RouterResult<()> {
        self.remove_key(DRAFT_RULE_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{LogBatcher, LogStatus};
    use serde_json::json;
    use std::sync::Arc;

    fn entry(name: &str) -> LogEntry {
        LogEntry {
            timestamp: 1,
            filename: name.to_string(),
            final_path: name.to_string(),
            url: format!("https://a.com/{}", name),
            referrer: String::new(),
            rule_id: None,
            rule_name: None,
            status: LogStatus::NoMatch,
        }
    }

    #[tokio::test]
    async fn missing_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));

        assert!(store.load_rules().await.unwrap().is_empty());
        assert_eq!(store.load_global_enabled().await.unwrap(), None);
        assert!(store.read_log().await.unwrap().is_empty());
        assert_eq!(store.read_draft().await.unwrap(), None);
        store.remove_draft().await.unwrap();
    }

    #[tokio::test]
    async fn rules_and_flags_persist() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        let rule = RawRule::from_value(&json!({"id": "r1", "sitePattern": "a.com", "priority": 2}));
        store.save_rules(&[rule]).await.unwrap();
        store.save_global_enabled(false).await.unwrap();

        let loaded = store.load_rules().await.unwrap();
        assert_eq!(loaded, vec![json!({"id": "r1", "sitePattern": "a.com", "priority": 2})]);
        assert_eq!(store.load_global_enabled().await.unwrap(), Some(false));
    }

    #[tokio::test]
    async fn log_and_draft_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        store.write_log(&[entry("b"), entry("a")]).await.unwrap();
        let names: Vec<_> = store.read_log().await.unwrap().into_iter().map(|e| e.filename).collect();
        assert_eq!(names, vec!["b", "a"]);

        let draft = DraftRule { site_pattern: "a.com".into(), timestamp: 42 };
        store.write_draft(&draft).await.unwrap();
        assert_eq!(store.read_draft().await.unwrap(), Some(draft));
        store.remove_draft().await.unwrap();
        assert_eq!(store.read_draft().await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("activityLog.json"), b"{not json").await.unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.read_log().await.is_err());
    }

    #[tokio::test]
    async fn malformed_log_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let doc = json!([
            {"bogus": 1},
            {
                "timestamp": 7,
                "filename": "a.zip",
                "finalPath": "a.zip",
                "url": "https://a.com/a.zip",
                "referrer": "",
                "ruleId": null,
                "status": "no_match"
            },
            "garbage"
        ]);
        tokio::fs::write(dir.path().join("activityLog.json"), doc.to_string()).await.unwrap();
        let store = JsonFileStore::new(dir.path());

        let log = store.read_log().await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].filename, "a.zip");

        // 下一次写入会覆盖掉畸形条目
        store.write_log(&log).await.unwrap();
        let raw = tokio::fs::read_to_string(dir.path().join("activityLog.json")).await.unwrap();
        assert!(!raw.contains("bogus"));
    }

    #[tokio::test]
    async fn flush_recovers_from_malformed_persisted_log() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("activityLog.json"), br#"[{"bogus": 1}]"#).await.unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path()));
        let batcher = LogBatcher::new(store.clone(), &RouterConfig::default());

        batcher.record(entry("fresh.zip"));
        batcher.flush_now().await;

        let log = store.read_log().await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].filename, "fresh.zip");
    }

    #[tokio::test]
    async fn non_array_log_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("activityLog.json"), b"{\"a\": 1}").await.unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.read_log().await.unwrap().is_empty());
    }
}
