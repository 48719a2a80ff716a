use kehai_core::market::entity::Candle;
use std::collections::VecDeque;

/// # Summary
/// 固定容量的 K 线滚动窗口。
///
/// # Invariants
/// - 长度永不超过容量；满窗后每次插入先进先出地淘汰最旧一根。
/// - 窗口内顺序即插入顺序（时间升序），指标计算依赖该顺序。
/// - 容量在会话生命周期内固定，最小为 1。
#[derive(Debug, Clone)]
pub struct CandleWindow {
    // 内部存储容器
    candles: VecDeque<Candle>,
    // 最大容量
    capacity: usize,
}

impl CandleWindow {
    /// # Summary
    /// 创建一个新的滚动窗口。
    ///
    /// # Arguments
    /// * `capacity`: 固定容量上限，0 会被提升为 1。
    ///
    /// # Returns
    /// 初始化后的空窗口。
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            candles: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// # Summary
    /// 向窗口尾部追加一根 K 线。
    ///
    /// # Logic
    /// 1. 若窗口已满，先淘汰队首最旧的一根。
    /// 2. 追加到队尾。
    ///
    /// # Arguments
    /// * `candle`: 待插入的 K 线。
    pub fn push(&mut self, candle: Candle) {
        if self.candles.len() == self.capacity {
            self.candles.pop_front();
        }
        self.candles.push_back(candle);
    }

    /// 当前窗口内的 K 线数量
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// 窗口是否为空
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// 窗口容量上限
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 最新一根 K 线的引用
    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    /// # Summary
    /// 取窗口尾部至多 `n` 根 K 线的收盘价，按时间升序。
    ///
    /// # Arguments
    /// * `n`: 取样数量上限。
    ///
    /// # Returns
    /// 收盘价列表，窗口不足 `n` 根时返回全部。
    pub fn trailing_closes(&self, n: usize) -> Vec<f64> {
        let skip = self.candles.len().saturating_sub(n);
        self.candles.iter().skip(skip).map(|c| c.close).collect()
    }

    /// # Summary
    /// 获取按时间升序排列的完整窗口快照。
    ///
    /// # Returns
    /// 包含所有 K 线克隆的有序 Vec。
    pub fn to_vec(&self) -> Vec<Candle> {
        self.candles.iter().cloned().collect()
    }
}
