//! HTTP Forwarding
//!
//! Forwards a matched request to the planner backend: method, headers,
//! query string and body pass through unchanged apart from the rule's path
//! rewrite. The `Host` header is replaced with the backend's (the backend
//! assumes same-origin traffic), an `Origin` header is rewritten to the
//! backend origin, and hop-by-hop headers are dropped in both directions.
//! Bodies are streamed, not buffered.

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::Response,
};

use super::error::ProxyResult;
use super::rules::{target_url, ProxyRule};

/// Headers that describe the connection rather than the request and must
/// not be forwarded (RFC 9110 section 7.6.1).
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Build the header set for the upstream request.
///
/// `Host` is dropped so the client derives it from the target URL. Shared
/// with the websocket bridge, which filters a few more handshake headers
/// on top.
pub(super) fn filter_request_headers(headers: &HeaderMap, target_origin: &str) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        if is_hop_by_hop(name) || name == header::HOST {
            continue;
        }
        out.append(name.clone(), value.clone());
    }

    if out.contains_key(header::ORIGIN) {
        if let Ok(origin) = HeaderValue::from_str(target_origin.trim_end_matches('/')) {
            out.insert(header::ORIGIN, origin);
        }
    }

    out
}

/// Forward a plain HTTP request to the backend and stream the response back
pub async fn forward(
    client: &reqwest::Client,
    rule: &ProxyRule,
    req: Request,
) -> ProxyResult<Response> {
    let url = target_url(rule, req.uri());
    let (parts, body) = req.into_parts();

    tracing::debug!(method = %parts.method, url = %url, "Forwarding request to backend");

    let upstream = client
        .request(parts.method, &url)
        .headers(filter_request_headers(&parts.headers, rule.target()))
        .body(reqwest::Body::wrap_stream(body.into_data_stream()))
        .send()
        .await?;

    let mut builder = Response::builder().status(upstream.status());
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in upstream.headers() {
            if !is_hop_by_hop(name) {
                headers.append(name.clone(), value.clone());
            }
        }
    }

    Ok(builder.body(Body::from_stream(upstream.bytes_stream()))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_by_hop_headers_are_dropped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(
            header::TRANSFER_ENCODING,
            HeaderValue::from_static("chunked"),
        );
        headers.insert("proxy-connection", HeaderValue::from_static("keep-alive"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

        let filtered = filter_request_headers(&headers, "http://localhost:8501");

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.get(header::ACCEPT).unwrap(), "*/*");
    }

    #[test]
    fn test_host_is_dropped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("localhost:5173"));

        let filtered = filter_request_headers(&headers, "http://localhost:8501");
        assert!(filtered.get(header::HOST).is_none());
    }

    #[test]
    fn test_origin_is_rewritten_to_backend() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ORIGIN,
            HeaderValue::from_static("http://localhost:5173"),
        );

        let filtered = filter_request_headers(&headers, "http://localhost:8501");
        assert_eq!(
            filtered.get(header::ORIGIN).unwrap(),
            "http://localhost:8501"
        );
    }

    #[test]
    fn test_absent_origin_is_not_invented() {
        let headers = HeaderMap::new();
        let filtered = filter_request_headers(&headers, "http://localhost:8501");
        assert!(filtered.get(header::ORIGIN).is_none());
    }

    #[test]
    fn test_multi_value_headers_survive() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("b=2"));

        let filtered = filter_request_headers(&headers, "http://localhost:8501");
        assert_eq!(filtered.get_all(header::COOKIE).iter().count(), 2);
    }
}
