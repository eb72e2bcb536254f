//! Planner Shell Dev Server
//!
//! Assembles the router and runs the server.
//!
//! # Routing
//!
//! The five proxied prefixes are mounted from the rule table; every other
//! path is served from the built shell assets, with `index.html` as the
//! SPA fallback:
//!
//! - `/streamlit`, `/streamlit/*` - embedded planner app (prefix stripped, ws)
//! - `/_stcore`, `/_stcore/*` - planner streaming channel (ws)
//! - `/static/*`, `/vendor/*`, `/component/*` - planner assets
//! - everything else - shell assets
//!
//! # Example
//!
//! ```rust,ignore
//! use planner_shell::config::Config;
//! use planner_shell::server::{serve, AppState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     serve(AppState::new(&config), &config.server).await?;
//!     Ok(())
//! }
//! ```

pub mod state;

pub use state::AppState;

use axum::{routing::any, Router};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::proxy::proxy_handler;

/// Build the dev server router: proxied prefixes plus the asset fallback
pub fn build_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    let mut router = Router::new();
    for rule in shared_state.rules.rules() {
        // The bare prefix, the trailing-slash form (the iframe src is
        // `/streamlit/`), and everything below it all hit the proxy; the
        // wildcard alone matches none of the first two
        router = router
            .route(rule.prefix(), any(proxy_handler))
            .route(&format!("{}/", rule.prefix()), any(proxy_handler))
            .route(&format!("{}/*rest", rule.prefix()), any(proxy_handler));
    }

    let assets = ServeDir::new(&shared_state.assets_dir)
        .fallback(ServeFile::new(shared_state.assets_dir.join("index.html")));

    router
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the dev server
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<(), std::io::Error> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Planner shell dev server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Planner shell dev server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::RuleTable;
    use axum::{
        body::Body,
        extract::ws::WebSocketUpgrade,
        http::{Request, StatusCode, Uri},
        response::Response,
        routing::get,
    };
    use futures_util::{SinkExt, StreamExt};
    use tempfile::tempdir;
    use tower::util::ServiceExt;

    /// Serve a router on an ephemeral port, returning its origin
    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Backend that answers every request with the path (and query) it saw
    fn echo_backend() -> Router {
        async fn echo(uri: Uri) -> String {
            match uri.query() {
                Some(query) => format!("{}?{}", uri.path(), query),
                None => uri.path().to_string(),
            }
        }

        Router::new()
            .route("/", any(echo))
            .route("/*path", any(echo))
    }

    /// Backend with a websocket echo endpoint at the streaming path
    fn ws_echo_backend() -> Router {
        async fn ws_echo(ws: WebSocketUpgrade) -> Response {
            ws.on_upgrade(|mut socket| async move {
                while let Some(Ok(msg)) = socket.recv().await {
                    if socket.send(msg).await.is_err() {
                        break;
                    }
                }
            })
        }

        Router::new().route("/_stcore/stream", get(ws_echo))
    }

    fn shell_app(backend_url: &str) -> (Router, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>shell</html>").unwrap();
        let state = AppState::with_rules(
            RuleTable::planner_defaults(backend_url),
            dir.path().to_path_buf(),
        );
        (build_router(state), dir)
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_unproxied_path_falls_back_to_shell_index() {
        let (app, _dir) = shell_app("http://127.0.0.1:1");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/unrelated/path")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_shell_asset_file_is_served() {
        let (app, dir) = shell_app("http://127.0.0.1:1");
        std::fs::write(dir.path().join("app.css"), "body {}").unwrap();

        let response = app
            .oneshot(Request::builder().uri("/app.css").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "body {}");
    }

    #[tokio::test]
    async fn test_streamlit_prefix_is_stripped_before_forwarding() {
        let backend = spawn_server(echo_backend()).await;
        let (app, _dir) = shell_app(&backend);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/streamlit/app/main.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "/app/main.js");
    }

    #[tokio::test]
    async fn test_bare_streamlit_forwards_to_backend_root() {
        let backend = spawn_server(echo_backend()).await;
        let (app, _dir) = shell_app(&backend);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/streamlit")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "/");
    }

    #[tokio::test]
    async fn test_iframe_src_path_forwards_to_backend_root() {
        let backend = spawn_server(echo_backend()).await;
        let (app, _dir) = shell_app(&backend);

        // The shell's iframe requests exactly this path
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/streamlit/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "/");
    }

    #[tokio::test]
    async fn test_stcore_path_passes_through_unchanged() {
        let backend = spawn_server(echo_backend()).await;
        let (app, _dir) = shell_app(&backend);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/_stcore/stream")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "/_stcore/stream");
    }

    #[tokio::test]
    async fn test_query_string_is_preserved() {
        let backend = spawn_server(echo_backend()).await;
        let (app, _dir) = shell_app(&backend);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/static/logo.png?v=2&cache=false")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "/static/logo.png?v=2&cache=false");
    }

    #[tokio::test]
    async fn test_unreachable_backend_surfaces_bad_gateway() {
        // Bind then drop to find a port nothing is listening on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let (app, _dir) = shell_app(&dead);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/static/logo.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["error"]["code"], "UPSTREAM_UNREACHABLE");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_websocket_upgrade_is_bridged() {
        let backend = spawn_server(ws_echo_backend()).await;
        let (app, _dir) = shell_app(&backend);
        let shell = spawn_server(app).await;

        let url = format!("{}/_stcore/stream", shell.replacen("http", "ws", 1));
        let (mut socket, _response) = tokio_tungstenite::connect_async(&url).await.unwrap();

        socket
            .send(tokio_tungstenite::tungstenite::Message::Text(
                "ping".to_string(),
            ))
            .await
            .unwrap();

        let echoed = socket.next().await.unwrap().unwrap();
        assert_eq!(
            echoed,
            tokio_tungstenite::tungstenite::Message::Text("ping".to_string())
        );
    }

    #[tokio::test]
    async fn test_client_headers_ride_along_on_bridged_upgrade() {
        use axum::http::{header, HeaderMap};
        use tokio_tungstenite::tungstenite::client::IntoClientRequest;

        // Backend reports the cookie it saw as the first frame
        async fn ws_cookie(headers: HeaderMap, ws: WebSocketUpgrade) -> Response {
            let cookie = headers
                .get(header::COOKIE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string();
            ws.on_upgrade(move |mut socket| async move {
                let _ = socket.send(axum::extract::ws::Message::Text(cookie)).await;
            })
        }

        let backend =
            spawn_server(Router::new().route("/_stcore/stream", get(ws_cookie))).await;
        let (app, _dir) = shell_app(&backend);
        let shell = spawn_server(app).await;

        let url = format!("{}/_stcore/stream", shell.replacen("http", "ws", 1));
        let mut request = url.into_client_request().unwrap();
        request
            .headers_mut()
            .insert(header::COOKIE, "session=abc".parse().unwrap());

        let (mut socket, _response) = tokio_tungstenite::connect_async(request).await.unwrap();

        let frame = socket.next().await.unwrap().unwrap();
        assert_eq!(
            frame,
            tokio_tungstenite::tungstenite::Message::Text("session=abc".to_string())
        );
    }

    #[tokio::test]
    async fn test_websocket_upgrade_to_dead_backend_fails_handshake() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let (app, _dir) = shell_app(&dead);
        let shell = spawn_server(app).await;

        let url = format!("{}/_stcore/stream", shell.replacen("http", "ws", 1));
        // The shell answers 502 instead of completing the upgrade
        assert!(tokio_tungstenite::connect_async(&url).await.is_err());
    }
}
