use thiserror::Error;

/// # Summary
/// 行情域错误枚举，覆盖数据源接入失败的情况。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum MarketError {
    // 行情源订阅或内部通道故障
    #[error("Feed source error: {0}")]
    Source(String),
}
