//! Bodega Web library.
//!
//! Server-rendered catalog and administration pages in front of the
//! inventory backend. Exposed as a library so the router can be exercised
//! from tests without binding a socket.
//!
//! # Security
//!
//! The backend is the authority for every permission. This crate hides
//! what a role cannot use and refuses gated routes early, but never holds
//! credentials beyond the user's own bearer token in the server-side
//! session.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;

use axum::{Router, middleware::from_fn, routing::get};
use tower_http::services::ServeDir;

use crate::state::AppState;

/// Static asset directory, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/web/static";

/// Build the application router with every layer except tracing and Sentry,
/// which the binary adds on the outside.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());
    let trust_proxy = state.config().trust_proxy;

    Router::new()
        .route("/health", get(health))
        .merge(routes::routes(trust_proxy))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(from_fn(middleware::expire_session_middleware))
        .layer(session_layer)
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the backend.
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::SocketAddr;

    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;
    use crate::config::WebConfig;

    fn router() -> Router {
        let config = WebConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            timezone_offset_hours: -3,
            log_json: false,
            trust_proxy: false,
            sentry_dsn: None,
            sentry_environment: None,
        };
        app(AppState::new(config).unwrap())
    }

    async fn get(uri: &str) -> axum::response::Response {
        router()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_gated_routes_redirect_guests_to_login() {
        for uri in [
            "/catalogo",
            "/catalogo/1/ficha",
            "/admin/productos",
            "/admin/productos/nuevo",
            "/admin/productos/1/stock",
            "/admin/historial",
        ] {
            let response = get(uri).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(response.headers()[header::LOCATION], "/login", "{uri}");
        }
    }

    #[tokio::test]
    async fn test_public_pages_render_for_guests() {
        for uri in ["/", "/login", "/contacto"] {
            assert_eq!(get(uri).await.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_unknown_taxonomy_post_needs_login_first() {
        let response = router()
            .oneshot(
                Request::post("/admin/bodegas")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("name=x"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_login_limit_ignores_rotating_forwarded_for() {
        let app = router();
        let mut limited = 0;
        for i in 0..10 {
            let mut request = Request::post("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header("x-forwarded-for", format!("198.51.100.{i}"))
                .body(Body::from("username=&password="))
                .unwrap();
            request
                .extensions_mut()
                .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 40_000))));
            let response = app.clone().oneshot(request).await.unwrap();
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                limited += 1;
            }
        }
        assert!(limited >= 4, "only {limited} attempts were limited");
    }
}
