/// 错误类型
///
/// 定位算法本身从不返回错误（输入不足时返回 `None`），
/// 错误只出现在配置加载与序列化边界。

use thiserror::Error;

/// 配置与编解码错误
#[derive(Debug, Error)]
pub enum WifiNavError {
    /// 读取配置文件失败
    #[error("配置文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 解析或序列化失败
    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    /// SSID 过滤正则表达式无效
    #[error("SSID 过滤表达式无效: {0}")]
    InvalidFilter(#[from] regex::Error),

    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, WifiNavError>;
