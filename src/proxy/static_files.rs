// src/proxy/static_files.rs
//
// Serves the built single-page app. Unknown extension-less paths get
// index.html so client-side routes survive a reload.
//
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Response};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use super::ProxyError;

const INDEX: &str = "index.html";

#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn serve(&self, request_path: &str) -> Result<Response<Body>, ProxyError> {
        let relative = sanitize(request_path)
            .ok_or_else(|| ProxyError::NotFound(request_path.to_string()))?;

        let mut candidate = self.root.join(&relative);
        if tokio::fs::metadata(&candidate)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            candidate.push(INDEX);
        }

        match tokio::fs::read(&candidate).await {
            Ok(bytes) => Ok(file_response(&candidate, bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound && relative.extension().is_none() => {
                debug!(path = %request_path, "falling back to {}", INDEX);
                let index = self.root.join(INDEX);
                match tokio::fs::read(&index).await {
                    Ok(bytes) => Ok(file_response(&index, bytes)),
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        Err(ProxyError::NotFound(request_path.to_string()))
                    }
                    Err(e) => Err(ProxyError::Io(e)),
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ProxyError::NotFound(request_path.to_string()))
            }
            Err(e) => Err(ProxyError::Io(e)),
        }
    }
}

/// Relative path under the root, or `None` when the request tries to
/// climb out of it.
fn sanitize(request_path: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(request_path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(relative)
}

fn file_response(path: &Path, bytes: Vec<u8>) -> Response<Body> {
    let mut response = Response::new(Body::from(bytes));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type(path)));
    response
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") | Some("map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::StatusCode;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<div id=\"root\"></div>").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/app.js"), "console.log(1)").unwrap();
        dir
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("/"), Some(PathBuf::new()));
        assert_eq!(sanitize("/assets/./app.js"), Some(PathBuf::from("assets/app.js")));
        assert_eq!(sanitize("/../etc/passwd"), None);
        assert_eq!(sanitize("/assets/../../secret"), None);
    }

    #[tokio::test]
    async fn test_serves_index_for_root() {
        let dir = site();
        let files = StaticFiles::new(dir.path());
        let response = files.serve("/").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(body_text(response).await, "<div id=\"root\"></div>");
    }

    #[tokio::test]
    async fn test_serves_asset_with_content_type() {
        let dir = site();
        let response = StaticFiles::new(dir.path())
            .serve("/assets/app.js")
            .await
            .unwrap();
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/javascript; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_spa_fallback_and_missing_asset() {
        let dir = site();
        let files = StaticFiles::new(dir.path());

        let response = files.serve("/chat/42").await.unwrap();
        assert_eq!(body_text(response).await, "<div id=\"root\"></div>");

        let err = files.serve("/assets/missing.css").await.unwrap_err();
        assert!(matches!(err, ProxyError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_traversal_is_refused() {
        let dir = site();
        let err = StaticFiles::new(dir.path())
            .serve("/../Cargo.toml")
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::NotFound(_)));
    }
}
