use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A short code and the URL it points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub short_code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Derived state of a link at a given instant. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Active,
    Expired,
}

/// 有效期上限（约 100 年），防止 chrono 溢出
pub const MAX_VALIDITY_MINUTES: f64 = 100.0 * 365.0 * 24.0 * 60.0;

/// Minutes (fractions allowed) to a whole-millisecond duration.
///
/// Truncates toward zero and clamps to `±MAX_VALIDITY_MINUTES`; NaN counts as zero.
pub fn validity_duration(validity_minutes: f64) -> Duration {
    if validity_minutes.is_nan() {
        return Duration::zero();
    }
    let minutes = validity_minutes.clamp(-MAX_VALIDITY_MINUTES, MAX_VALIDITY_MINUTES);
    Duration::milliseconds((minutes * 60_000.0).trunc() as i64)
}

impl LinkRecord {
    /// Build a record valid for `validity_minutes` starting at `created_at`.
    pub fn new(
        short_code: impl Into<String>,
        original_url: impl Into<String>,
        created_at: DateTime<Utc>,
        validity_minutes: f64,
    ) -> Self {
        Self {
            short_code: short_code.into(),
            original_url: original_url.into(),
            created_at,
            expires_at: created_at + validity_duration(validity_minutes),
            is_active: true,
        }
    }

    #[inline]
    pub fn status(&self, now: DateTime<Utc>) -> LinkStatus {
        if is_expired(self, now) {
            LinkStatus::Expired
        } else {
            LinkStatus::Active
        }
    }
}

/// A link is expired strictly after `expires_at`; at the exact instant it is still active.
#[inline]
pub fn is_expired(record: &LinkRecord, now: DateTime<Utc>) -> bool {
    now > record.expires_at
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_expires_at_from_validity() {
        let link = LinkRecord::new("abc123", "https://example.com", at(1_000), 30.0);
        assert_eq!(link.expires_at, at(1_000 + 30 * 60));
        assert!(link.is_active);
    }

    #[test]
    fn test_expiry_boundary() {
        let link = LinkRecord::new("abc123", "https://example.com", at(0), 1.0);
        assert!(!is_expired(&link, at(59)));
        assert!(!is_expired(&link, at(60)));
        assert!(is_expired(&link, at(61)));
        assert_eq!(link.status(at(60)), LinkStatus::Active);
        assert_eq!(link.status(at(61)), LinkStatus::Expired);
    }

    #[test]
    fn test_zero_validity_expires_immediately_after_creation() {
        let link = LinkRecord::new("z", "https://example.com", at(100), 0.0);
        assert!(!is_expired(&link, at(100)));
        assert!(is_expired(&link, at(101)));
    }

    #[test]
    fn test_fractional_validity() {
        let link = LinkRecord::new("f", "https://example.com", at(0), 1.5);
        assert_eq!(link.expires_at, at(90));

        let link = LinkRecord::new("f", "https://example.com", at(0), 0.001);
        assert_eq!(link.expires_at - at(0), Duration::milliseconds(60));
    }

    #[test]
    fn test_negative_validity_is_already_expired() {
        let link = LinkRecord::new("n", "https://example.com", at(1_000), -2.0);
        assert_eq!(link.expires_at, at(880));
        assert_eq!(link.status(at(1_000)), LinkStatus::Expired);
    }

    #[test]
    fn test_validity_duration_guards() {
        assert_eq!(validity_duration(f64::NAN), Duration::zero());
        assert_eq!(
            validity_duration(f64::INFINITY),
            validity_duration(MAX_VALIDITY_MINUTES)
        );
        assert_eq!(
            validity_duration(-1e300),
            validity_duration(-MAX_VALIDITY_MINUTES)
        );
        // 上限仍可加到当前时间上
        assert!(Utc::now().checked_add_signed(validity_duration(1e300)).is_some());
    }
}
