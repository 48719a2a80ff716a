use thiserror::Error;

/// # Summary
/// 信号域错误枚举，覆盖配置缺失、网络失败与响应解析失败。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum SignalError {
    // 未配置信号服务地址，请求无法发起
    #[error("Signal endpoint not configured")]
    NotConfigured,
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 响应解析错误，如 JSON 格式不匹配
    #[error("Parse error: {0}")]
    Parse(String),
}
