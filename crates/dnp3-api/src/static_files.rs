//! Plugin static assets, embedded in the binary and mounted under `/dnp3`

use axum::{
    body::Body,
    extract::Path,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use rust_embed::RustEmbed;
use tracing::debug;

/// URL prefix the assets are served from.
pub const STATIC_PREFIX: &str = "/dnp3";

#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

// ============================================================================
// Router Setup
// ============================================================================

pub fn create_static_router() -> Router {
    Router::new().route(&format!("{STATIC_PREFIX}/{{*path}}"), get(serve_static_file))
}

// ============================================================================
// Handlers
// ============================================================================

async fn serve_static_file(Path(path): Path<String>) -> Response {
    let path = path.trim_start_matches('/');

    match StaticAssets::get(path) {
        Some(content) => {
            debug!(path = path, "Serving static file");
            // Asset hash doubles as a version tag for cache validation
            let etag = format!("\"{}\"", hex_prefix(&content.metadata.sha256_hash()));
            (
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static(mime_type_for_path(path))),
                    (header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=3600")),
                ],
                [(header::ETAG, etag)],
                Body::from(content.data),
            )
                .into_response()
        }
        None => {
            debug!(path = path, "Static file not found");
            (StatusCode::NOT_FOUND, "404 Not Found").into_response()
        }
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

fn hex_prefix(hash: &[u8; 32]) -> String {
    hash.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

/// Determine MIME type based on file extension
fn mime_type_for_path(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// List all embedded files
pub fn list_embedded_files() -> Vec<String> {
    StaticAssets::iter().map(|path| path.into_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type_for_path("dnp3.css"), "text/css; charset=utf-8");
        assert_eq!(
            mime_type_for_path("app.js"),
            "application/javascript; charset=utf-8"
        );
        assert_eq!(mime_type_for_path("logo.svg"), "image/svg+xml");
        assert_eq!(
            mime_type_for_path("unknown.xyz"),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_stylesheet_embedded() {
        assert!(list_embedded_files().contains(&"css/dnp3.css".to_string()));
    }

    #[tokio::test]
    async fn test_serve_asset() {
        let response = create_static_router()
            .oneshot(
                Request::builder()
                    .uri("/dnp3/css/dnp3.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/css; charset=utf-8"
        );
        assert!(response.headers().contains_key(header::ETAG));
    }

    #[tokio::test]
    async fn test_missing_asset() {
        let response = create_static_router()
            .oneshot(
                Request::builder()
                    .uri("/dnp3/css/missing.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
