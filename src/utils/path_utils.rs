//! 路径工具模块
//! 负责扩展名提取、文件夹名清洗和占位符替换，均为无状态纯函数

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use super::url_host::UrlHost;

/// 域名无法解析时使用的占位值
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// 路径工具类
pub struct PathUtils;

impl PathUtils {
    /// 提取文件扩展名（不含点，小写）
    ///
    /// 没有点、点在首位或点在末尾时返回空字符串
    pub fn file_extension(filename: &str) -> String {
        match filename.rfind('.') {
            Some(idx) if idx > 0 && idx + 1 < filename.len() => {
                filename[idx + 1..].to_lowercase()
            }
            _ => String::new(),
        }
    }

    /// 清洗单个目录名
    ///
    /// 先去除首尾空白，再将保留字符 `<>:"/\|?*`、`..` 以及首尾的 `.` 替换为 `_`。
    /// 替换不会引入新的空白或点，因此结果幂等
    pub fn sanitize_folder_name(name: &str) -> String {
        static RESERVED: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r#"[<>:"/\\|?*]|\.\.|^\.|\.$"#).unwrap()
        });

        let trimmed = name.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        RESERVED.replace_all(trimmed, "_").into_owned()
    }

    /// 清洗多级相对目录
    ///
    /// 按 `/` 与 `\` 切分后逐段清洗，丢弃空段，再用 `/` 拼接。
    /// 全部段落为空时返回空字符串
    pub fn sanitize_folder_path(path: &str) -> String {
        path.split(|c| c == '/' || c == '\\')
            .map(Self::sanitize_folder_name)
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// 替换目录模板中的占位符
    ///
    /// 支持 `{YYYY-MM-DD}`、`{YYYY}`、`{MM}`、`{DD}`、`{domain}`；
    /// `{domain}` 取 `source_url` 的主机名，仅在模板中出现时才解析 URL
    pub fn replace_placeholders(template: &str, date: NaiveDate, source_url: &str) -> String {
        if template.is_empty() {
            return String::new();
        }

        let year = format!("{:04}", date.year());
        let month = format!("{:02}", date.month());
        let day = format!("{:02}", date.day());

        let mut resolved = template
            .replace("{YYYY-MM-DD}", &format!("{}-{}-{}", year, month, day))
            .replace("{YYYY}", &year)
            .replace("{MM}", &month)
            .replace("{DD}", &day);

        if resolved.contains("{domain}") {
            let domain = UrlHost::hostname(source_url);
            resolved = resolved.replace(
                "{domain}",
                domain.as_deref().unwrap_or(UNKNOWN_DOMAIN),
            );
        }

        resolved
    }
}
