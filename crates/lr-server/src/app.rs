//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::headers;
use crate::state::AppState;

/// Create the application router.
///
/// File requests and live reload upgrades share every path, so everything goes
/// through the fallback handler.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(handlers::handle_request)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(headers::no_store_layer())
                .layer(headers::content_type_options_layer()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live_reload::{ConnectionRegistry, RELOAD_CLIENT};
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use axum::response::Response;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct Site {
        dir: TempDir,
    }

    impl Site {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn write(&self, path: &str, content: impl AsRef<[u8]>) -> &Self {
            let full = self.dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
            self
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn router(&self, live_reload: bool) -> Router {
            create_router(Arc::new(AppState {
                root_dir: self.root().canonicalize().unwrap(),
                index: "index.html".to_owned(),
                live_reload: live_reload.then(|| Arc::new(ConnectionRegistry::new())),
            }))
        }
    }

    async fn get(router: Router, uri: &str) -> Response {
        router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    fn content_type(response: &Response) -> &str {
        response.headers()[header::CONTENT_TYPE].to_str().unwrap()
    }

    #[tokio::test]
    async fn test_non_html_served_verbatim() {
        let site = Site::new();
        site.write("app.js", "console.log('</body>');")
            .write("logo.png", [0x89, b'P', b'N', b'G', 0x00, 0xff]);

        let response = get(site.router(true), "/app.js").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "application/javascript");
        assert_eq!(body_bytes(response).await, b"console.log('</body>');");

        let response = get(site.router(true), "/logo.png").await;
        assert_eq!(content_type(&response), "image/png");
        assert_eq!(
            body_bytes(response).await,
            vec![0x89, b'P', b'N', b'G', 0x00, 0xff]
        );
    }

    #[tokio::test]
    async fn test_root_serves_index_with_reload_client() {
        let site = Site::new();
        site.write("index.html", "<html><body><h1>Home</h1></body></html>");

        let response = get(site.router(true), "/").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "text/html");
        let expected = format!("<html><body><h1>Home</h1>{RELOAD_CLIENT}</body></html>");
        assert_eq!(String::from_utf8(body_bytes(response).await).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_html_without_body_tag_unchanged() {
        let site = Site::new();
        site.write("partial.html", "<p>fragment</p>");

        let response = get(site.router(true), "/partial.html").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"<p>fragment</p>");
    }

    #[tokio::test]
    async fn test_html_unchanged_when_live_reload_disabled() {
        let site = Site::new();
        site.write("index.html", "<body></body>");

        let response = get(site.router(false), "/index.html").await;

        assert_eq!(body_bytes(response).await, b"<body></body>");
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let site = Site::new();

        let response = get(site.router(true), "/nope.css").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(content_type(&response), "text/plain");
        assert_eq!(body_bytes(response).await, b"404 Not Found");
    }

    #[tokio::test]
    async fn test_missing_root_index_is_404() {
        let site = Site::new();

        let response = get(site.router(true), "/").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_bytes(response).await, b"404 Not Found");
    }

    #[tokio::test]
    async fn test_directory_serves_its_index() {
        let site = Site::new();
        site.write("blog/index.html", "<body>blog</body>");

        let response = get(site.router(false), "/blog/").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "text/html");
        assert_eq!(body_bytes(response).await, b"<body>blog</body>");
    }

    #[tokio::test]
    async fn test_directory_without_index_is_404() {
        let site = Site::new();
        site.write("assets/app.css", "body {}");

        let response = get(site.router(true), "/assets").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("public");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(parent.path().join("secret.txt"), "top secret").unwrap();
        let router = create_router(Arc::new(AppState {
            root_dir: root.canonicalize().unwrap(),
            index: "index.html".to_owned(),
            live_reload: None,
        }));

        let response = get(router, "/%2e%2e/secret.txt").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_bytes(response).await, b"404 Not Found");
    }

    #[tokio::test]
    async fn test_path_through_regular_file_is_404() {
        let site = Site::new();
        site.write("index.html", "<body></body>");

        let response = get(site.router(true), "/index.html/missing.css").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_bytes(response).await, b"404 Not Found");
    }

    #[tokio::test]
    async fn test_over_long_name_is_404() {
        let site = Site::new();
        let uri = format!("/{}", "a".repeat(300));

        let response = get(site.router(true), &uri).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_bytes(response).await, b"404 Not Found");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_out_of_root_is_404() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("public");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(parent.path().join("secret.txt"), "top secret").unwrap();
        std::fs::write(root.join("real.txt"), "public").unwrap();
        std::os::unix::fs::symlink(parent.path().join("secret.txt"), root.join("leak.txt"))
            .unwrap();
        std::os::unix::fs::symlink(root.join("real.txt"), root.join("alias.txt")).unwrap();
        let router = create_router(Arc::new(AppState {
            root_dir: root.canonicalize().unwrap(),
            index: "index.html".to_owned(),
            live_reload: None,
        }));

        let response = get(router.clone(), "/leak.txt").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_bytes(response).await, b"404 Not Found");

        let response = get(router, "/alias.txt").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"public");
    }

    #[tokio::test]
    async fn test_unknown_extension_is_plain_text() {
        let site = Site::new();
        site.write("README", "hello");

        let response = get(site.router(true), "/README").await;

        assert_eq!(content_type(&response), "text/plain");
        assert_eq!(body_bytes(response).await, b"hello");
    }

    #[tokio::test]
    async fn test_dev_headers_present() {
        let site = Site::new();
        site.write("style.css", "body {}");

        let ok = get(site.router(true), "/style.css").await;
        assert_eq!(ok.headers()[header::CACHE_CONTROL], "no-store");
        assert_eq!(ok.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

        let missing = get(site.router(true), "/missing").await;
        assert_eq!(missing.headers()[header::CACHE_CONTROL], "no-store");
    }

    #[tokio::test]
    async fn test_non_upgradable_upgrade_request_falls_through() {
        let site = Site::new();
        site.write("index.html", "<body></body>");

        // Upgrade headers without an upgradable connection: not a push
        // connection, so the file is served normally
        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(header::CONNECTION, "upgrade")
            .header(header::UPGRADE, "websocket")
            .header(header::SEC_WEBSOCKET_VERSION, "13")
            .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
            .body(Body::empty())
            .unwrap();
        let response = site.router(true).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "text/html");
    }

    #[tokio::test]
    async fn test_other_methods_serve_files() {
        let site = Site::new();
        site.write("data.json", "{}");

        let request = Request::builder()
            .method(Method::POST)
            .uri("/data.json")
            .body(Body::empty())
            .unwrap();
        let response = site.router(true).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "application/json");
    }
}
