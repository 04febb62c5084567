//! 点击分析存储
//!
//! 每个短码对应一个只追加的点击序列，与链接存储一一对应：
//! - `init_for` 在创建链接时调用，且每个短码只调用一次
//! - `record_click` 只追加，不修改已有记录；事件在持有条目锁时才生成，
//!   因此序列中的时间戳不会倒退
//! - 记录从不删除（`discard` 仅用于回滚尚未发布的创建）

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{trace, warn};

use super::{AnalyticsRecord, ClickEvent};
use crate::errors::{Result, ShortUrlError};

pub trait AnalyticsStore: Send + Sync {
    /// 为新短码创建空的点击序列；已存在时返回 `Collision`
    fn init_for(&self, code: &str) -> Result<()>;

    /// 追加一次点击。`make_event` 在持有该短码的写锁时调用，恰好一次；
    /// 短码未知时不调用，静默返回 `false`
    fn record_click(&self, code: &str, make_event: &dyn Fn() -> ClickEvent) -> bool;

    /// 获取点击统计快照
    fn get_stats(&self, code: &str) -> Result<AnalyticsRecord>;

    /// 回滚一次未完成的 `init_for`
    fn discard(&self, code: &str);
}

/// 基于 DashMap 的内存实现
#[derive(Debug, Default)]
pub struct MemoryAnalyticsStore {
    records: DashMap<String, AnalyticsRecord>,
}

impl MemoryAnalyticsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnalyticsStore for MemoryAnalyticsStore {
    fn init_for(&self, code: &str) -> Result<()> {
        match self.records.entry(code.to_string()) {
            Entry::Occupied(_) => Err(ShortUrlError::collision(format!(
                "analytics for '{}' already initialized",
                code
            ))),
            Entry::Vacant(slot) => {
                slot.insert(AnalyticsRecord::new(code));
                Ok(())
            }
        }
    }

    fn record_click(&self, code: &str, make_event: &dyn Fn() -> ClickEvent) -> bool {
        // get_mut 持有该条目的写锁，取时间与追加在同一临界区内
        match self.records.get_mut(code) {
            Some(mut record) => {
                record.clicks.push(make_event());
                trace!(
                    "MemoryAnalyticsStore: {} now has {} clicks",
                    code,
                    record.clicks.len()
                );
                true
            }
            None => {
                warn!("Click for unknown short code dropped: {}", code);
                false
            }
        }
    }

    fn get_stats(&self, code: &str) -> Result<AnalyticsRecord> {
        self.records
            .get(code)
            .map(|r| r.value().clone())
            .ok_or_else(|| ShortUrlError::not_found(format!("no analytics for '{}'", code)))
    }

    fn discard(&self, code: &str) {
        self.records.remove(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn click(offset_secs: i64) -> ClickEvent {
        ClickEvent::new(
            Utc::now() + Duration::seconds(offset_secs),
            Some("https://referrer.example".to_string()),
            "127.0.0.1",
        )
    }

    #[test]
    fn test_init_creates_empty_sequence() {
        let store = MemoryAnalyticsStore::new();
        store.init_for("abc").unwrap();

        let stats = store.get_stats("abc").unwrap();
        assert_eq!(stats.short_code, "abc");
        assert_eq!(stats.total_clicks(), 0);
    }

    #[test]
    fn test_init_twice_is_collision() {
        let store = MemoryAnalyticsStore::new();
        store.init_for("abc").unwrap();
        store.record_click("abc", &|| click(0));

        assert!(matches!(
            store.init_for("abc"),
            Err(ShortUrlError::Collision(_))
        ));
        // 已有点击不受影响
        assert_eq!(store.get_stats("abc").unwrap().total_clicks(), 1);
    }

    #[test]
    fn test_record_click_appends_in_order() {
        let store = MemoryAnalyticsStore::new();
        store.init_for("abc").unwrap();

        let first = click(0);
        let second = click(1);
        assert!(store.record_click("abc", &|| first.clone()));
        assert!(store.record_click("abc", &|| second.clone()));

        let stats = store.get_stats("abc").unwrap();
        assert_eq!(stats.clicks, vec![first, second]);
    }

    #[test]
    fn test_record_click_unknown_code_is_silent() {
        let store = MemoryAnalyticsStore::new();
        let called = std::cell::Cell::new(false);
        assert!(!store.record_click("ghost", &|| {
            called.set(true);
            click(0)
        }));
        assert!(!called.get());
        assert!(matches!(
            store.get_stats("ghost"),
            Err(ShortUrlError::NotFound(_))
        ));
    }

    #[test]
    fn test_discard_removes_record() {
        let store = MemoryAnalyticsStore::new();
        store.init_for("abc").unwrap();
        store.discard("abc");
        assert!(store.get_stats("abc").is_err());
        store.init_for("abc").unwrap();
    }

    #[test]
    fn test_concurrent_clicks_are_all_counted() {
        let store = Arc::new(MemoryAnalyticsStore::new());
        store.init_for("hot").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.record_click("hot", &|| click(0));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.get_stats("hot").unwrap().total_clicks(), 800);
    }

    #[test]
    fn test_concurrent_clicks_keep_timestamp_order() {
        let store = Arc::new(MemoryAnalyticsStore::new());
        store.init_for("hot").unwrap();
        let base = Utc::now();
        let ticks = Arc::new(AtomicI64::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let ticks = ticks.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.record_click("hot", &|| {
                            let n = ticks.fetch_add(1, Ordering::SeqCst);
                            ClickEvent::new(base + Duration::milliseconds(n), None, "10.0.0.1")
                        });
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let clicks = store.get_stats("hot").unwrap().clicks;
        assert_eq!(clicks.len(), 800);
        assert!(
            clicks.windows(2).all(|w| w[0].timestamp < w[1].timestamp),
            "click timestamps must follow sequence order"
        );
    }
}
