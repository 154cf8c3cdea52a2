//! URL主机名解析工具

use tracing::debug;
use url::Url;

/// URL主机名工具
pub struct UrlHost;

impl UrlHost {
    /// 解析 http(s) URL 的主机名（小写）
    ///
    /// 非 http(s)、解析失败或无主机名时返回 None
    pub fn hostname(raw: &str) -> Option<String> {
        if raw.is_empty() {
            return None;
        }

        let parsed = match Url::parse(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("URL parse failed for {:?}: {}", raw, e);
                return None;
            }
        };

        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }

        parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_http_hosts() {
        assert_eq!(UrlHost::hostname("https://example.com/x").as_deref(), Some("example.com"));
        assert_eq!(UrlHost::hostname("http://Sub.Example.COM:8080/").as_deref(), Some("sub.example.com"));
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert_eq!(UrlHost::hostname("ftp://example.com/file"), None);
        assert_eq!(UrlHost::hostname("data:text/plain,hi"), None);
        assert_eq!(UrlHost::hostname("example.com/no-scheme"), None);
        assert_eq!(UrlHost::hostname(""), None);
    }
}
