// src/proxy/rule.rs
use hyper::header::{HeaderMap, HeaderName, HeaderValue, HOST, ORIGIN};
use hyper::Uri;
use url::Url;

use super::ProxyError;

/// Stripped from forwarded requests and responses.
const HOP_BY_HOP: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
];

/// Forwards every path starting with `prefix` to `target`.
#[derive(Debug, Clone)]
pub struct ProxyRule {
    prefix: String,
    target: Url,
    change_origin: bool,
    origin_value: HeaderValue,
    host_value: HeaderValue,
}

impl ProxyRule {
    pub fn new(prefix: &str, target: &str, change_origin: bool) -> Result<Self, ProxyError> {
        let invalid = |reason: String| ProxyError::InvalidTarget {
            target: target.to_string(),
            reason,
        };

        let target_url = Url::parse(target).map_err(|e| invalid(e.to_string()))?;
        if !matches!(target_url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {:?}", target_url.scheme())));
        }
        let host = target_url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let authority = match target_url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let origin_value = HeaderValue::from_str(&target_url.origin().ascii_serialization())
            .map_err(|e| invalid(e.to_string()))?;
        let host_value = HeaderValue::from_str(&authority).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            prefix: prefix.to_string(),
            target: target_url,
            change_origin,
            origin_value,
            host_value,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Serialized origin of the target, e.g. `http://127.0.0.1:8000`.
    pub fn target_origin(&self) -> &str {
        // Built from `ascii_serialization`, always valid ASCII.
        self.origin_value.to_str().unwrap_or_default()
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    /// Target scheme and authority, then any target path, then the incoming
    /// path and query untouched.
    pub fn forward_uri(&self, uri: &Uri) -> Result<Uri, ProxyError> {
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let base_path = self.target.path().trim_end_matches('/');
        let forwarded = format!(
            "{}{}{}",
            self.target.origin().ascii_serialization(),
            base_path,
            path_and_query
        );
        forwarded
            .parse::<Uri>()
            .map_err(|e| ProxyError::InvalidUri(e.to_string()))
    }

    pub fn rewrite_headers(&self, headers: &mut HeaderMap) {
        strip_hop_by_hop(headers);
        if self.change_origin {
            headers.insert(HOST, self.host_value.clone());
            if headers.contains_key(ORIGIN) {
                headers.insert(ORIGIN, self.origin_value.clone());
            }
        }
    }
}

pub(crate) fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(HeaderName::from_static(name));
    }
}
