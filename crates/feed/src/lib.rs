//! # `kehai-feed` - 模拟行情源
//!
//! 本 crate 提供 `CandleSource` 端口的合成数据实现：一条固定节拍、
//! 零均值随机游走的 K 线序列，用于在没有真实行情接入时驱动整个展示链路。
//!
//! ## 架构职责
//! - 生成种子历史与实时 K 线，保证价格序列连续
//! - 固定种子时序列完全可复现，供测试与回放使用

pub mod sim;
