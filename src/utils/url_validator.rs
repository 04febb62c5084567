//! URL 验证模块
//!
//! 目标地址必须是可解析的绝对 URL，并阻止可执行脚本的协议。
//! 跳转时原始 URL 经 [`encode_location`] 编码后写入 `Location`。

use std::fmt::Write;

use url::Url;

#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    EmptyUrl,
    BlockedScheme(String),
    InvalidFormat(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::BlockedScheme(scheme) => write!(f, "Blocked URL scheme: {}", scheme),
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

/// 危险协议列表
const BLOCKED_SCHEMES: &[&str] = &["javascript", "data", "file", "vbscript", "about", "blob"];

/// 验证目标 URL，返回解析后的 URL
///
/// `Url::parse` 只接受绝对 URL，相对路径（如 `/foo`、`example.com`）会失败。
pub fn validate_url(raw: &str) -> Result<Url, UrlValidationError> {
    if raw.trim().is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    let url = Url::parse(raw).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    // scheme() 已经是小写
    if BLOCKED_SCHEMES.contains(&url.scheme()) {
        return Err(UrlValidationError::BlockedScheme(url.scheme().to_string()));
    }

    Ok(url)
}

/// `Location` 中可原样保留的字节：可见 ASCII 去掉空格、`"`、`<`、`>`、`` ` ``、`{`、`}`
#[inline]
fn is_location_safe(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x3B | 0x3D | 0x3F..=0x5F | 0x61..=0x7A | 0x7C | 0x7E)
}

/// Percent-encode a stored target URL for the `Location` header.
///
/// Control characters, whitespace, non-ASCII bytes and the unsafe ASCII set
/// become `%XX`. Existing `%XX` escapes are kept as-is and a stray `%` becomes
/// `%25`. The output is always a valid header value.
pub fn encode_location(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(bytes.len());

    for (i, &b) in bytes.iter().enumerate() {
        if b == b'%' {
            let escaped = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            out.push_str(if escaped { "%" } else { "%25" });
        } else if is_location_safe(b) {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{:02X}", b);
        }
    }

    out
}
