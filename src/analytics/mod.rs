pub mod store;

pub use store::{AnalyticsStore, MemoryAnalyticsStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::time::iso_millis;

/// 一次成功跳转的点击记录，写入后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    /// 点击时间戳
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    /// 来源页面 (Referer header)
    pub referrer: Option<String>,
    /// 客户端地址
    #[serde(rename = "ip")]
    pub client_address: String,
}

impl ClickEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        referrer: Option<String>,
        client_address: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            referrer,
            client_address: client_address.into(),
        }
    }
}

/// 某个短码的全部点击，按写入顺序（即时间顺序）排列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyticsRecord {
    pub short_code: String,
    pub clicks: Vec<ClickEvent>,
}

impl AnalyticsRecord {
    pub fn new(short_code: impl Into<String>) -> Self {
        Self {
            short_code: short_code.into(),
            clicks: Vec::new(),
        }
    }

    #[inline]
    pub fn total_clicks(&self) -> usize {
        self.clicks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_event_wire_shape() {
        let ts = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let click = ClickEvent::new(ts, None, "203.0.113.7");

        let json = serde_json::to_value(&click).unwrap();
        assert_eq!(json["timestamp"], "2023-11-14T22:13:20.123Z");
        assert_eq!(json["referrer"], serde_json::Value::Null);
        assert_eq!(json["ip"], "203.0.113.7");
        assert!(json.get("client_address").is_none());
    }
}
