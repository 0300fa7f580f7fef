use hyper::header::HeaderValue;
use hyper::HeaderMap;
use std::net::SocketAddr;

/// Forwarded-client header names
pub mod forwarded {
    pub const REAL_IP: &str = "x-real-ip";
    pub const FOR: &str = "x-forwarded-for";
    pub const PROTO: &str = "x-forwarded-proto";
}

/// Set `x-real-ip`, `x-forwarded-for` and `x-forwarded-proto`
///
/// Client-supplied values are overwritten, not appended to.
pub fn add_forwarded_headers(headers: &mut HeaderMap, peer: SocketAddr, is_https: bool) {
    let client_ip = peer.ip().to_string();
    if let Ok(header_value) = HeaderValue::from_str(&client_ip) {
        headers.insert(forwarded::REAL_IP, header_value.clone());
        headers.insert(forwarded::FOR, header_value);
    }

    let proto = if is_https { "https" } else { "http" };
    headers.insert(forwarded::PROTO, HeaderValue::from_static(proto));
}
