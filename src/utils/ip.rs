//! 客户端地址提取
//!
//! 默认使用连接的对端 IP；只有对端在 `trusted_proxies`（单个 IP 或 CIDR）中时，
//! 才信任 `X-Forwarded-For` / `X-Real-IP`。

use std::net::{IpAddr, SocketAddr};

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;
use tracing::debug;

/// 无法确定对端地址时记录的值
pub const UNKNOWN_CLIENT: &str = "unknown";

/// 检查 IP 是否在可信代理列表中
pub fn is_trusted_proxy(ip: &IpAddr, trusted_proxies: &[String]) -> bool {
    trusted_proxies.iter().any(|proxy| {
        if proxy.contains('/') {
            ip_in_cidr(ip, proxy)
        } else {
            proxy.parse::<IpAddr>().is_ok_and(|p| p == *ip)
        }
    })
}

/// CIDR 检查
pub fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = cidr.split_once('/') else {
        return false;
    };
    let Ok(prefix_len) = prefix_len.parse::<u32>() else {
        return false;
    };
    let Ok(network_addr) = network.parse::<IpAddr>() else {
        return false;
    };

    match (ip, network_addr) {
        (IpAddr::V4(ip), IpAddr::V4(net)) if prefix_len <= 32 => {
            let mask = u32::MAX.checked_shl(32 - prefix_len).unwrap_or(0);
            (u32::from(*ip) & mask) == (u32::from(net) & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) if prefix_len <= 128 => {
            let mask = u128::MAX.checked_shl(128 - prefix_len).unwrap_or(0);
            (u128::from(*ip) & mask) == (u128::from(net) & mask)
        }
        _ => false,
    }
}

/// 从请求头提取转发的 IP（X-Forwarded-For 第一个，其次 X-Real-IP）
pub fn forwarded_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// 根据对端地址与可信代理列表决定客户端地址
pub fn resolve_client_address(
    peer: Option<SocketAddr>,
    headers: &HeaderMap,
    trusted_proxies: &[String],
) -> String {
    let Some(peer) = peer else {
        return UNKNOWN_CLIENT.to_string();
    };
    let peer_ip = peer.ip();

    if !trusted_proxies.is_empty()
        && is_trusted_proxy(&peer_ip, trusted_proxies)
        && let Some(real_ip) = forwarded_ip_from_headers(headers)
    {
        debug!("Trusted proxy {} forwarded for {}", peer_ip, real_ip);
        return real_ip;
    }

    peer_ip.to_string()
}

/// 从 HttpRequest 提取客户端地址
pub fn extract_client_address(req: &HttpRequest, trusted_proxies: &[String]) -> String {
    resolve_client_address(req.peer_addr(), req.headers(), trusted_proxies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(
                HeaderName::from_static(k),
                HeaderValue::from_static(v),
            );
        }
        map
    }

    #[test]
    fn test_ip_in_cidr_ipv4() {
        let ip: IpAddr = "192.168.1.100".parse().unwrap();
        assert!(ip_in_cidr(&ip, "192.168.1.0/24"));
        assert!(ip_in_cidr(&ip, "192.168.0.0/16"));
        assert!(ip_in_cidr(&ip, "0.0.0.0/0"));
        assert!(!ip_in_cidr(&ip, "192.168.2.0/24"));
        assert!(!ip_in_cidr(&ip, "192.168.1.0/33"));
    }

    #[test]
    fn test_ip_in_cidr_ipv6() {
        let ip: IpAddr = "2001:db8::1".parse().unwrap();
        assert!(ip_in_cidr(&ip, "2001:db8::/32"));
        assert!(!ip_in_cidr(&ip, "2001:db9::/32"));
        assert!(!ip_in_cidr(&ip, "10.0.0.0/8"));
    }

    #[test]
    fn test_untrusted_peer_ignores_forwarded_header() {
        let peer: SocketAddr = "203.0.113.9:5555".parse().unwrap();
        let h = headers(&[("x-forwarded-for", "1.2.3.4")]);
        assert_eq!(resolve_client_address(Some(peer), &h, &[]), "203.0.113.9");
        assert_eq!(
            resolve_client_address(Some(peer), &h, &["10.0.0.0/8".to_string()]),
            "203.0.113.9"
        );
    }

    #[test]
    fn test_trusted_peer_uses_first_forwarded_entry() {
        let peer: SocketAddr = "10.1.2.3:443".parse().unwrap();
        let trusted = vec!["10.0.0.0/8".to_string()];

        let h = headers(&[("x-forwarded-for", "198.51.100.1, 10.1.2.3")]);
        assert_eq!(resolve_client_address(Some(peer), &h, &trusted), "198.51.100.1");

        let h = headers(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(resolve_client_address(Some(peer), &h, &trusted), "198.51.100.2");

        let h = headers(&[]);
        assert_eq!(resolve_client_address(Some(peer), &h, &trusted), "10.1.2.3");
    }

    #[test]
    fn test_missing_peer() {
        assert_eq!(resolve_client_address(None, &headers(&[]), &[]), UNKNOWN_CLIENT);
    }
}
