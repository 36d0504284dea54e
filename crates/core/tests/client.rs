//! `ApiClient` against a stub backend bound to an ephemeral port.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bodega_core::client::{ApiClient, ApiError, AuthSession, AuthToken, InvalidateHook};
use bodega_core::draft::{ContactDraft, NewStockMovement, ProductPayload};
use bodega_core::gallery::{Gallery, NewImage};
use bodega_core::models::ProductImage;
use bodega_core::{BrandId, CategoryId, ImageId, MovementType, ProductId, ProviderId, Role};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};

const VALID_TOKEN: &str = "valid";

#[derive(Default)]
struct Recorded {
    contact_had_auth: Option<bool>,
    uploads: Vec<(String, String)>,
    patches: Vec<(i32, bool)>,
}

#[derive(Clone, Default)]
struct Backend {
    recorded: Arc<Mutex<Recorded>>,
}

struct TestServer {
    base_url: String,
    backend: Backend,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let backend = Backend::default();
        let app = Router::new()
            .route("/api/token/", post(token))
            .route("/api/products/", get(products).post(create_product))
            .route("/api/products/{id}/pim-sheet/", get(pim_sheet))
            .route("/api/product-images/", get(images).post(upload_image))
            .route("/api/product-images/{id}/", patch(patch_image))
            .route("/api/stock-movements/", post(create_movement))
            .route("/api/product-history/", get(history))
            .route("/api/brands/", get(brands))
            .route("/api/providers/", get(slow_providers))
            .route("/api/contact-form/", post(contact))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            backend,
            handle,
        }
    }

    fn client(&self) -> ApiClient {
        ApiClient::new(&self.base_url).unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn jwt(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.{VALID_TOKEN}")
}

fn session_with(signature: &str, hook: Option<InvalidateHook>) -> AuthSession {
    let access = format!(
        "{}.{}",
        jwt(&json!({"username": "admin", "role": "ADMIN"}))
            .rsplit_once('.')
            .unwrap()
            .0,
        signature
    );
    AuthSession::new(Some(AuthToken::new(access, None).unwrap()), hook)
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer ") && v.ends_with(&format!(".{VALID_TOKEN}")))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Given token not valid for any token type"})),
    )
        .into_response()
}

fn product_json(id: i32, name: &str) -> Value {
    json!({
        "id": id,
        "nombre_comercial": name,
        "sku": format!("SKU-{id}"),
        "ean": "7800000000000",
        "brand": {"id": 1, "name": "Acme"},
        "category": {"id": 1, "name": "Muebles"},
        "provider": null,
        "dimensiones": null,
        "precio_venta": "19990.00",
        "stock": 3,
        "images": []
    })
}

// =============================================================================
// Stub handlers
// =============================================================================

async fn token(Json(body): Json<Value>) -> Response {
    if body["password"] == "secreto" {
        let access = jwt(&json!({"username": body["username"], "role": "SELLER"}));
        Json(json!({"access": access, "refresh": "refresh-token"})).into_response()
    } else {
        unauthorized()
    }
}

#[derive(serde::Deserialize)]
struct PageQuery {
    page: Option<u32>,
}

async fn products(headers: HeaderMap, Query(q): Query<PageQuery>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match q.page {
        None | Some(1) => Json(json!({
            "count": 2,
            "next": "/api/products/?page=2",
            "results": [product_json(1, "Mesa de centro")]
        }))
        .into_response(),
        _ => Json(json!({
            "count": 2,
            "next": null,
            "results": [product_json(2, "Silla")]
        }))
        .into_response(),
    }
}

async fn create_product(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    assert!(body.get("stock").is_none(), "stock must never be written");
    let name = body["nombre_comercial"].as_str().unwrap_or_default();
    (StatusCode::CREATED, Json(product_json(40, name))).into_response()
}

async fn pim_sheet(headers: HeaderMap, Path(id): Path<i32>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"ficha_SKU-{id}.pdf\""),
            ),
        ],
        b"%PDF-1.4".to_vec(),
    )
        .into_response()
}

async fn images(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    // Substring search: asking for product 1 also matches product 11.
    Json(json!([
        {"id": 5, "image": "http://media/5.jpg", "is_principal": true, "product": 1},
        {"id": 6, "image": "http://media/6.jpg", "is_principal": false, "product": 11}
    ]))
    .into_response()
}

async fn upload_image(
    State(backend): State<Backend>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut file_name = String::new();
    let mut is_principal = String::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("image") => file_name = field.file_name().unwrap_or_default().to_owned(),
            Some("is_principal") => is_principal = field.text().await.unwrap(),
            _ => {}
        }
    }
    backend
        .recorded
        .lock()
        .unwrap()
        .uploads
        .push((file_name.clone(), is_principal.clone()));

    if file_name == "roto.png" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 90,
            "image": format!("http://media/{file_name}"),
            "is_principal": is_principal == "true",
            "product": 40
        })),
    )
        .into_response()
}

async fn patch_image(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let is_principal = body["is_principal"].as_bool().unwrap_or_default();
    backend.recorded.lock().unwrap().patches.push((id, is_principal));
    Json(json!({
        "id": id,
        "image": "http://media/x.jpg",
        "is_principal": is_principal,
        "product": 40
    }))
    .into_response()
}

async fn create_movement(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if body["movement_type"] == "OUT" && body["quantity"].as_u64().unwrap_or_default() > 3 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"quantity": "No hay suficiente stock. Disponible: 3, Intentado sacar: 5"})),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 12,
            "product": body["product"],
            "quantity": body["quantity"],
            "movement_type": body["movement_type"],
            "reason": body["reason"],
            "user": 1,
            "created_at": "2025-03-01T12:00:00Z"
        })),
    )
        .into_response()
}

async fn history(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!([
        {
            "history_id": 2, "history_date": "2025-03-02T10:00:00Z", "history_type": "~",
            "history_user": "admin", "history_user_id": 1, "id": 1,
            "nombre_comercial": "Mesa", "precio_venta": "15000.00", "stock": 3, "sku": "SKU-1",
            "brand": 1, "category": 1, "provider": 1, "is_active": true
        },
        {
            "history_id": 1, "history_date": "2025-03-01T10:00:00Z", "history_type": "+",
            "history_user": null, "history_user_id": null, "id": 1,
            "nombre_comercial": "Mesa", "precio_venta": "12000.00", "stock": 3, "sku": "SKU-1",
            "brand": 1, "category": 1, "provider": 1, "is_active": true
        },
        {
            "history_id": 0, "history_date": "2025-02-28T10:00:00Z", "history_type": "?",
            "history_user": null, "history_user_id": null, "id": 1,
            "nombre_comercial": "Mesa", "precio_venta": "12000.00", "stock": 3
        }
    ]))
    .into_response()
}

/// Page 3 links back to page 2.
async fn brands(headers: HeaderMap, Query(q): Query<PageQuery>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let (id, name, next) = match q.page {
        None | Some(1) => (1, "Acme", "/api/brands/?page=2"),
        Some(2) => (2, "Nova", "/api/brands/?page=3"),
        _ => (3, "Roble", "/api/brands/?page=2"),
    };
    Json(json!({"next": next, "results": [{"id": id, "name": name}]})).into_response()
}

async fn slow_providers(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
    Json(json!([{"id": 1, "name": "Distribuidora Sur"}])).into_response()
}

async fn contact(State(backend): State<Backend>, headers: HeaderMap) -> StatusCode {
    backend.recorded.lock().unwrap().contact_had_auth =
        Some(headers.contains_key(header::AUTHORIZATION));
    StatusCode::CREATED
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_obtain_token_decodes_role() {
    let srv = TestServer::spawn().await;
    let token = srv
        .client()
        .obtain_token("vendedor", &SecretString::from("secreto"))
        .await
        .unwrap();
    assert_eq!(token.username(), "vendedor");
    assert_eq!(token.role(), Role::Seller);
    assert!(token.refresh.is_some());
}

#[tokio::test]
async fn test_obtain_token_rejects_bad_password() {
    let srv = TestServer::spawn().await;
    let err = srv
        .client()
        .obtain_token("vendedor", &SecretString::from("otra"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidCredentials(_)));
    assert_eq!(err.user_message(), "Usuario o contraseña incorrectos.");
}

#[tokio::test]
async fn test_list_products_follows_next_links() {
    let srv = TestServer::spawn().await;
    let session = session_with(VALID_TOKEN, None);
    let products = srv.client().list_products(&session).await.unwrap();
    let names: Vec<_> = products.iter().map(|p| p.nombre_comercial.as_str()).collect();
    assert_eq!(names, ["Mesa de centro", "Silla"]);
    assert_eq!(products[0].brand_name(), "Acme");
    assert_eq!(products[0].precio_venta, Decimal::new(19990, 0));
}

#[tokio::test]
async fn test_unauthorized_clears_session_and_fires_hook_once() {
    let srv = TestServer::spawn().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let hook: InvalidateHook = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let session = session_with("revoked", Some(hook));
    let client = srv.client();

    let err = client.list_products(&session).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(!session.is_authenticated().await);

    // The token is gone, so the next call fails locally.
    let err = client.list_history(&session).await.unwrap_err();
    assert!(matches!(err, ApiError::NotAuthenticated));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_insufficient_stock_message_is_surfaced() {
    let srv = TestServer::spawn().await;
    let session = session_with(VALID_TOKEN, None);
    let movement = NewStockMovement {
        product: ProductId::new(1),
        quantity: 5,
        movement_type: MovementType::Out,
        reason: "Venta".to_owned(),
    };
    let err = srv.client().create_movement(&session, &movement).await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "quantity: No hay suficiente stock. Disponible: 3, Intentado sacar: 5"
    );

    let ok = NewStockMovement {
        quantity: 2,
        ..movement
    };
    let created = srv.client().create_movement(&session, &ok).await.unwrap();
    assert_eq!(created.quantity, 2);
    assert_eq!(created.movement_type, MovementType::Out);
}

#[tokio::test]
async fn test_list_images_keeps_exact_product_only() {
    let srv = TestServer::spawn().await;
    let session = session_with(VALID_TOKEN, None);
    let images = srv.client().list_images(&session, ProductId::new(1)).await.unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].id, ImageId::new(5));
}

#[tokio::test]
async fn test_history_decodes_foreign_keys_and_diffs() {
    let srv = TestServer::spawn().await;
    let session = session_with(VALID_TOKEN, None);
    let history = srv.client().list_history(&session).await.unwrap();
    let entries = bodega_core::audit::render_all(&history);
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].snapshot.history_type.label(), "?");
    let changes = entries[0].outcome.changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].label(), "Precio");
    assert_eq!(changes[0].before, "$12.000");
    assert_eq!(changes[0].after, "$15.000");
}

#[tokio::test]
async fn test_contact_is_sent_without_token_for_guests() {
    let srv = TestServer::spawn().await;
    let draft = ContactDraft {
        name: "Ana".to_owned(),
        email: "ana@example.cl".to_owned(),
        subject: "Soporte Técnico".to_owned(),
        message: "Hola".to_owned(),
    };
    let message = draft.validate().unwrap();
    srv.client()
        .submit_contact(&AuthSession::anonymous(), &message)
        .await
        .unwrap();
    assert_eq!(srv.backend.recorded.lock().unwrap().contact_had_auth, Some(false));
}

#[tokio::test]
async fn test_pim_sheet_uses_backend_file_name() {
    let srv = TestServer::spawn().await;
    let session = session_with(VALID_TOKEN, None);
    let doc = srv.client().pim_sheet(&session, ProductId::new(7)).await.unwrap();
    assert_eq!(doc.content_type, "application/pdf");
    assert_eq!(doc.file_name, "ficha_SKU-7.pdf");
    assert!(doc.bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_save_reports_partial_image_failures() {
    let srv = TestServer::spawn().await;
    let session = session_with(VALID_TOKEN, None);

    let mut gallery = Gallery::from_existing(vec![ProductImage {
        id: ImageId::new(5),
        image: "http://media/5.jpg".to_owned(),
        is_principal: true,
        product: Some(ProductId::new(40)),
    }]);
    gallery
        .add_files(vec![
            NewImage {
                file_name: "frente.png".to_owned(),
                content_type: "image/png".to_owned(),
                bytes: vec![1, 2, 3],
            },
            NewImage {
                file_name: "roto.png".to_owned(),
                content_type: "image/png".to_owned(),
                bytes: vec![4, 5, 6],
            },
        ])
        .unwrap();
    gallery
        .set_principal(bodega_core::gallery::Principal::New(0))
        .unwrap();

    let payload = ProductPayload {
        nombre_comercial: "Escritorio".to_owned(),
        ean: "7801234567890".to_owned(),
        sku: "ESC-1".to_owned(),
        brand_id: BrandId::new(1),
        category_id: CategoryId::new(1),
        provider_id: ProviderId::new(1),
        precio_venta: Some(Decimal::new(59990, 0)),
        costo_cg: None,
        peso: None,
        rating: None,
        dimensiones: String::new(),
        descripcion: String::new(),
        lugar_bodega: String::new(),
        edad_uso: String::new(),
    };

    let report = srv
        .client()
        .save_product_with_images(&session, None, &payload, &gallery)
        .await
        .unwrap();

    assert_eq!(report.product.id, ProductId::new(40));
    assert_eq!(report.image_steps, 3);
    assert_eq!(report.failed_images, 1);
    assert_eq!(
        report.warning().as_deref(),
        Some("Producto guardado, pero 1 de 3 operaciones de imagen fallaron.")
    );

    let recorded = srv.backend.recorded.lock().unwrap();
    assert_eq!(recorded.patches, [(5, false)]);
    assert_eq!(
        recorded.uploads,
        [
            ("frente.png".to_owned(), "true".to_owned()),
            ("roto.png".to_owned(), "false".to_owned())
        ]
    );
}

#[tokio::test]
async fn test_pagination_cycle_stops() {
    let srv = TestServer::spawn().await;
    let session = session_with(VALID_TOKEN, None);
    let brands = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        srv.client().list_brands(&session),
    )
    .await
    .expect("pagination cycle must end")
    .unwrap();
    let names: Vec<_> = brands.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["Acme", "Nova", "Roble"]);
}

#[tokio::test]
async fn test_slow_backend_is_waited_out() {
    let srv = TestServer::spawn().await;
    let session = session_with(VALID_TOKEN, None);
    let providers = srv.client().list_providers(&session).await.unwrap();
    assert_eq!(providers.len(), 1);
}
