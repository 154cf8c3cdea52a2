//! 草稿规则交接
//! 宿主（如右键菜单）写入一条带时间戳的草稿，规则编辑器在有效期内取用；
//! 草稿读取后总是删除，过期草稿被忽略

use std::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RouterResult;
use crate::store::DraftStore;
use crate::utils::UrlHost;

/// 草稿规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRule {
    pub site_pattern: String,
    // 创建时间（毫秒时间戳）
    pub timestamp: i64,
}

/// 为页面创建草稿：站点模式取主机名，无法解析时使用原始URL
pub async fn create_draft_for_page(
    store: &dyn DraftStore,
    page_url: &str,
    now_ms: i64,
) -> RouterResult<DraftRule> {
    let site_pattern = UrlHost::hostname(page_url).unwrap_or_else(|| page_url.to_string());
    let draft = DraftRule {
        site_pattern,
        timestamp: now_ms,
    };
    store.write_draft(&draft).await?;
    debug!("Draft rule stored for {:?}", draft.site_pattern);
    Ok(draft)
}

/// 取出仍在有效期内的草稿
pub async fn take_fresh_draft(
    store: &dyn DraftStore,
    now_ms: i64,
    ttl: Duration,
) -> RouterResult<Option<DraftRule>> {
    let Some(draft) = store.read_draft().await? else {
        return Ok(None);
    };

    if let Err(e) = store.remove_draft().await {
        warn!("Failed to remove consumed draft rule: {}", e);
    }

    // 时钟回拨导致的负值视为新鲜
    let age_ms = now_ms.saturating_sub(draft.timestamp);
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    if age_ms >= ttl_ms {
        debug!("Ignoring stale draft rule ({} ms old)", age_ms);
        return Ok(None);
    }
    Ok(Some(draft))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn draft_uses_hostname() {
        let store = MemoryStore::new();
        let draft = create_draft_for_page(&store, "https://docs.example.com/page?q=1", 1_000)
            .await
            .unwrap();
        assert_eq!(draft.site_pattern, "docs.example.com");
        assert_eq!(store.draft_snapshot(), Some(draft));
    }

    #[tokio::test]
    async fn draft_falls_back_to_raw_url() {
        let store = MemoryStore::new();
        let draft = create_draft_for_page(&store, "chrome://extensions", 1_000).await.unwrap();
        assert_eq!(draft.site_pattern, "chrome://extensions");
    }

    #[tokio::test]
    async fn fresh_draft_is_returned_and_removed() {
        let store = MemoryStore::new();
        create_draft_for_page(&store, "https://a.com/", 1_000).await.unwrap();

        let taken = take_fresh_draft(&store, 30_000, TTL).await.unwrap();
        assert_eq!(taken.map(|d| d.site_pattern).as_deref(), Some("a.com"));
        assert_eq!(store.draft_snapshot(), None);
        assert_eq!(take_fresh_draft(&store, 30_000, TTL).await.unwrap(), None);
    }

    #[tokio::test]
    async fn draft_from_the_future_counts_as_fresh() {
        let store = MemoryStore::new();
        create_draft_for_page(&store, "https://a.com/", 50_000).await.unwrap();

        let taken = take_fresh_draft(&store, 10_000, TTL).await.unwrap();
        assert_eq!(taken.map(|d| d.timestamp), Some(50_000));
        assert_eq!(store.draft_snapshot(), None);
    }

    #[tokio::test]
    async fn draft_expires_exactly_at_ttl() {
        let store = MemoryStore::new();
        create_draft_for_page(&store, "https://a.com/", 1_000).await.unwrap();
        assert_eq!(take_fresh_draft(&store, 61_000, TTL).await.unwrap(), None);

        create_draft_for_page(&store, "https://a.com/", 1_000).await.unwrap();
        assert!(take_fresh_draft(&store, 60_999, TTL).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stale_draft_is_ignored_and_removed() {
        let store = MemoryStore::new();
        create_draft_for_page(&store, "https://a.com/", 1_000).await.unwrap();

        assert_eq!(take_fresh_draft(&store, 61_000, TTL).await.unwrap(), None);
        assert_eq!(store.draft_snapshot(), None);
    }
}
