//! End-to-end harness for the Bodega web front end.
//!
//! [`TestContext::spawn`] starts two servers on ephemeral ports: a stub of
//! the inventory REST backend and the real `bodega-web` router pointed at
//! it. Tests drive the site with a cookie-keeping client that does not
//! follow redirects, so `Location` headers can be asserted.
//!
//! # Stub backend
//!
//! - `POST /api/token/` accepts any username with password `secreto`; the
//!   user `admin` gets the `ADMIN` role, everyone else `SELLER`.
//! - Two products, one brand, one category, one provider.
//! - `GET /api/product-history/` always answers 401, which is how tests
//!   exercise the expired-token path.
//! - Contact submissions and stock movements are recorded for assertions.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bodega_web::config::WebConfig;
use bodega_web::state::AppState;
use reqwest::Client;
use serde_json::{Value, json};

/// Password the stub backend accepts for every user.
pub const PASSWORD: &str = "secreto";

const SIGNATURE: &str = "stub-signature";

/// Requests the stub backend saw.
#[derive(Debug, Default)]
pub struct Recorded {
    /// One entry per contact submission: whether it carried a bearer token.
    pub contact_had_auth: Vec<bool>,
    /// Stock movement bodies, as posted.
    pub movements: Vec<Value>,
}

#[derive(Clone, Default)]
struct Backend {
    recorded: Arc<Mutex<Recorded>>,
}

/// Running stub backend plus web front end.
pub struct TestContext {
    /// Base URL of the web front end, without trailing slash.
    pub web_url: String,
    /// Cookie-keeping client that never follows redirects.
    pub client: Client,
    backend: Backend,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl TestContext {
    pub async fn spawn() -> Self {
        let backend = Backend::default();
        let (backend_url, backend_handle) = serve(stub_router(backend.clone())).await;

        let config = WebConfig {
            api_url: backend_url,
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://localhost".to_string(),
            timezone_offset_hours: -3,
            log_json: false,
            trust_proxy: false,
            sentry_dsn: None,
            sentry_environment: None,
        };
        let state = AppState::new(config).expect("stub backend URL is valid");
        let (web_url, web_handle) = serve(bodega_web::app(state)).await;

        let client = Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            web_url,
            client,
            backend,
            handles: vec![backend_handle, web_handle],
        }
    }

    /// Absolute URL for a site path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.web_url)
    }

    /// GET a site path.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// POST a urlencoded form to a site path.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Log in through the login form.
    pub async fn login(&self, username: &str) -> reqwest::Response {
        self.post_form("/login", &[("username", username), ("password", PASSWORD)])
            .await
    }

    /// Snapshot of what the stub backend has recorded so far.
    pub fn recorded<T>(&self, read: impl FnOnce(&Recorded) -> T) -> T {
        read(&self.backend.recorded.lock().unwrap())
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// `Location` header of a redirect response.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn serve(app: Router) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    (format!("http://{addr}"), handle)
}

// =============================================================================
// Stub backend
// =============================================================================

fn stub_router(backend: Backend) -> Router {
    Router::new()
        .route("/api/token/", post(token))
        .route("/api/products/", get(products))
        .route("/api/products/{id}/", get(product))
        .route("/api/product-images/", get(images))
        .route("/api/brands/", get(brands))
        .route("/api/categories/", get(categories))
        .route("/api/providers/", get(providers))
        .route("/api/stock-movements/", get(movements).post(create_movement))
        .route("/api/product-history/", get(history))
        .route("/api/contact-form/", post(contact))
        .with_state(backend)
}

/// Unsigned JWT carrying the given claims.
#[must_use]
pub fn jwt(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.{SIGNATURE}")
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer ") && v.ends_with(SIGNATURE))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Given token not valid for any token type"})),
    )
        .into_response()
}

fn product_json(id: i32, name: &str, stock: i64) -> Value {
    json!({
        "id": id,
        "nombre_comercial": name,
        "sku": format!("SKU-{id}"),
        "ean": "7800000000000",
        "brand": {"id": 1, "name": "Acme"},
        "category": {"id": 1, "name": "Muebles"},
        "provider": {"id": 1, "name": "Distribuidora Sur"},
        "precio_venta": "19990.00",
        "costo_cg": "12000.00",
        "stock": stock,
        "rating": "4.5",
        "images": []
    })
}

fn all_products() -> Vec<Value> {
    vec![
        product_json(1, "Mesa de centro", 12),
        product_json(2, "Silla plegable", 0),
    ]
}

async fn token(Json(body): Json<Value>) -> Response {
    if body["password"] != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "No active account found with the given credentials"})),
        )
            .into_response();
    }
    let role = if body["username"] == "admin" { "ADMIN" } else { "SELLER" };
    let access = jwt(&json!({"username": body["username"], "role": role}));
    Json(json!({"access": access, "refresh": "refresh-token"})).into_response()
}

async fn products(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"count": 2, "next": null, "results": all_products()})).into_response()
}

async fn product(headers: HeaderMap, Path(id): Path<i32>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    all_products()
        .into_iter()
        .find(|p| p["id"] == id)
        .map_or_else(
            || (StatusCode::NOT_FOUND, Json(json!({"detail": "No encontrado."}))).into_response(),
            |p| Json(p).into_response(),
        )
}

async fn images(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!([])).into_response()
}

fn taxonomy(headers: &HeaderMap, name: &str) -> Response {
    if !authorized(headers) {
        return unauthorized();
    }
    Json(json!([{"id": 1, "name": name}])).into_response()
}

async fn brands(headers: HeaderMap) -> Response {
    taxonomy(&headers, "Acme")
}

async fn categories(headers: HeaderMap) -> Response {
    taxonomy(&headers, "Muebles")
}

async fn providers(headers: HeaderMap) -> Response {
    taxonomy(&headers, "Distribuidora Sur")
}

async fn movements(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!([{
        "id": 1,
        "product": 1,
        "quantity": 12,
        "movement_type": "IN",
        "reason": "Carga inicial",
        "user": 1,
        "created_at": "2024-05-10T15:30:00Z"
    }]))
    .into_response()
}

async fn create_movement(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if body["movement_type"] == "OUT" && body["quantity"].as_i64().unwrap_or(0) > 12 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"quantity": ["Stock insuficiente. Disponible: 12."]})),
        )
            .into_response();
    }
    let mut created = body.clone();
    created["id"] = json!(2);
    created["user"] = json!(1);
    created["created_at"] = json!("2024-05-11T10:00:00Z");
    backend.recorded.lock().unwrap().movements.push(body);
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn history() -> Response {
    unauthorized()
}

async fn contact(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    backend
        .recorded
        .lock()
        .unwrap()
        .contact_had_auth
        .push(headers.contains_key(header::AUTHORIZATION));
    (StatusCode::CREATED, Json(json!({"status": "ok"}))).into_response()
}
