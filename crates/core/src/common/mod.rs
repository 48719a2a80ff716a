use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// # Summary
/// 交易时间周期枚举，定义信号请求与行情展示的粒度。
///
/// # Invariants
/// - 线上协议值固定为 `5s` / `10s` / `15s` / `1m`，序列化时必须保持一致。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimeFrame {
    // 5秒
    #[serde(rename = "5s")]
    Sec5,
    // 10秒
    #[serde(rename = "10s")]
    Sec10,
    // 15秒
    #[serde(rename = "15s")]
    Sec15,
    // 1分钟
    #[serde(rename = "1m")]
    Min1,
}

impl FromStr for TimeFrame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "5s" | "sec5" => Ok(TimeFrame::Sec5),
            "10s" | "sec10" => Ok(TimeFrame::Sec10),
            "15s" | "sec15" => Ok(TimeFrame::Sec15),
            "1m" | "min1" => Ok(TimeFrame::Min1),
            _ => Err(format!("Unknown TimeFrame: {}", s)),
        }
    }
}

impl std::fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeFrame::Sec5 => write!(f, "5s"),
            TimeFrame::Sec10 => write!(f, "10s"),
            TimeFrame::Sec15 => write!(f, "15s"),
            TimeFrame::Min1 => write!(f, "1m"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parse_wire_values() {
        assert_eq!("5s".parse::<TimeFrame>().unwrap(), TimeFrame::Sec5);
        assert_eq!("10s".parse::<TimeFrame>().unwrap(), TimeFrame::Sec10);
        assert_eq!("15s".parse::<TimeFrame>().unwrap(), TimeFrame::Sec15);
        assert_eq!("1m".parse::<TimeFrame>().unwrap(), TimeFrame::Min1);
        assert_eq!(" 1M ".parse::<TimeFrame>().unwrap(), TimeFrame::Min1);
        assert!("3h".parse::<TimeFrame>().is_err());
    }

    #[test]
    fn test_timeframe_display_matches_wire_values() {
        assert_eq!(TimeFrame::Sec5.to_string(), "5s");
        assert_eq!(TimeFrame::Sec10.to_string(), "10s");
        assert_eq!(TimeFrame::Sec15.to_string(), "15s");
        assert_eq!(TimeFrame::Min1.to_string(), "1m");
    }
}
