//! 工具模块：路径处理与URL解析
pub mod path_utils;
pub mod url_host;

pub use self::path_utils::{PathUtils, UNKNOWN_DOMAIN};
pub use self::url_host::UrlHost;
