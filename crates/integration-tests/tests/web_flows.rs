//! Login, role gating and form flows through the real router.

#![allow(clippy::unwrap_used)]

use bodega_integration_tests::{TestContext, location};
use reqwest::StatusCode;

// ============================================================================
// Public pages
// ============================================================================

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::spawn().await;
    let resp = ctx.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_home_for_guest_offers_login() {
    let ctx = TestContext::spawn().await;
    let resp = ctx.get("/").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    let body = resp.text().await.unwrap();
    assert!(body.contains("href=\"/login\""));
    assert!(!body.contains("href=\"/admin/productos\""));
}

#[tokio::test]
async fn test_guest_is_sent_to_login() {
    let ctx = TestContext::spawn().await;
    for path in ["/catalogo", "/admin/productos", "/admin/historial"] {
        let resp = ctx.get(path).await;
        assert!(resp.status().is_redirection(), "{path}");
        assert_eq!(location(&resp), "/login", "{path}");
    }
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_wrong_password_rerenders_form() {
    let ctx = TestContext::spawn().await;
    let resp = ctx
        .post_form("/login", &[("username", "ana"), ("password", "otra")])
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Usuario o contraseña incorrectos."));
    assert!(body.contains("value=\"ana\""));
}

#[tokio::test]
async fn test_blank_login_is_rejected_locally() {
    let ctx = TestContext::spawn().await;
    let resp = ctx
        .post_form("/login", &[("username", " "), ("password", "")])
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("Ingrese usuario y contraseña."));
}

#[tokio::test]
async fn test_seller_lands_on_catalog_without_costs() {
    let ctx = TestContext::spawn().await;
    let resp = ctx.login("ana").await;
    assert_eq!(location(&resp), "/catalogo");

    let resp = ctx.get("/catalogo").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Mesa de centro"));
    assert!(body.contains("Silla plegable"));
    assert!(body.contains("ana"));
    assert!(!body.contains("Costo"));
    assert!(body.contains("/catalogo/1/ficha"));
}

#[tokio::test]
async fn test_seller_cannot_manage_products() {
    let ctx = TestContext::spawn().await;
    ctx.login("ana").await;

    let resp = ctx.get("/admin/productos").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = ctx
        .post_form("/admin/marcas", &[("name", "Nueva marca")])
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_logged_in_user_skips_login_page() {
    let ctx = TestContext::spawn().await;
    ctx.login("admin").await;
    let resp = ctx.get("/login").await;
    assert_eq!(location(&resp), "/admin/productos");
}

#[tokio::test]
async fn test_logout_ends_session() {
    let ctx = TestContext::spawn().await;
    ctx.login("ana").await;

    let resp = ctx.post_form("/logout", &[]).await;
    assert_eq!(location(&resp), "/");

    let resp = ctx.get("/catalogo").await;
    assert_eq!(location(&resp), "/login");
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_catalog_search_filters_items() {
    let ctx = TestContext::spawn().await;
    ctx.login("ana").await;

    let resp = ctx.get("/catalogo?q=silla&vista=lista").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Silla plegable"));
    assert!(!body.contains("Mesa de centro"));
    assert!(body.contains("<table"));
}

#[tokio::test]
async fn test_admin_catalog_shows_costs() {
    let ctx = TestContext::spawn().await;
    ctx.login("admin").await;

    let body = ctx.get("/catalogo?vista=lista").await.text().await.unwrap();
    assert!(body.contains("Costo"));
    assert!(body.contains("$12.000"));
}

// ============================================================================
// Admin
// ============================================================================

#[tokio::test]
async fn test_admin_product_table() {
    let ctx = TestContext::spawn().await;
    let resp = ctx.login("admin").await;
    assert_eq!(location(&resp), "/admin/productos");

    let resp = ctx.get("/admin/productos").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Mesa de centro"));
    assert!(body.contains("Distribuidora Sur"));
    assert!(body.contains("action=\"/admin/marcas\""));
}

#[tokio::test]
async fn test_edit_form_preselects_taxonomy() {
    let ctx = TestContext::spawn().await;
    ctx.login("admin").await;

    let resp = ctx.get("/admin/productos/1/editar").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Editar producto #1"));
    assert!(body.contains("<option value=\"1\" selected>Acme</option>"));
    assert!(body.contains("enctype=\"multipart/form-data\""));
}

#[tokio::test]
async fn test_stock_movement_is_recorded() {
    let ctx = TestContext::spawn().await;
    ctx.login("admin").await;

    let resp = ctx
        .post_form(
            "/admin/productos/1/stock",
            &[("quantity", "3"), ("movement_type", "OUT"), ("reason", "Venta mesón")],
        )
        .await;
    assert!(resp.status().is_redirection());
    assert!(location(&resp).starts_with("/admin/productos/1/stock?ok="));

    let movements = ctx.recorded(|r| r.movements.clone());
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0]["product"], 1);
    assert_eq!(movements[0]["quantity"], 3);
    assert_eq!(movements[0]["reason"], "Venta mesón");
}

#[tokio::test]
async fn test_stock_rejection_shows_backend_message() {
    let ctx = TestContext::spawn().await;
    ctx.login("admin").await;

    let resp = ctx
        .post_form(
            "/admin/productos/1/stock",
            &[("quantity", "50"), ("movement_type", "OUT"), ("reason", "Venta")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Stock insuficiente"));
    assert!(body.contains("value=\"50\""));
}

#[tokio::test]
async fn test_invalid_quantity_never_reaches_backend() {
    let ctx = TestContext::spawn().await;
    ctx.login("admin").await;

    let resp = ctx
        .post_form(
            "/admin/productos/1/stock",
            &[("quantity", "0"), ("movement_type", "IN"), ("reason", "Reposición")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(ctx.recorded(|r| r.movements.is_empty()));
}

#[tokio::test]
async fn test_rejected_token_expires_session() {
    let ctx = TestContext::spawn().await;
    ctx.login("admin").await;

    let resp = ctx.get("/admin/historial").await;
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/login?expired=1");

    let resp = ctx.get("/admin/productos").await;
    assert_eq!(location(&resp), "/login");

    let body = ctx.get("/login?expired=1").await.text().await.unwrap();
    assert!(body.contains("Su sesión expiró"));
}

// ============================================================================
// Contact
// ============================================================================

#[tokio::test]
async fn test_guest_contact_is_sent_without_token() {
    let ctx = TestContext::spawn().await;
    let resp = ctx
        .post_form(
            "/contacto",
            &[
                ("name", "Ana"),
                ("email", "ana@example.cl"),
                ("subject", "Cotización PYME"),
                ("message", "Necesito 20 sillas."),
            ],
        )
        .await;
    assert!(location(&resp).starts_with("/contacto?ok="));
    assert_eq!(ctx.recorded(|r| r.contact_had_auth.clone()), vec![false]);
}

#[tokio::test]
async fn test_contact_with_bad_email_rerenders() {
    let ctx = TestContext::spawn().await;
    let resp = ctx
        .post_form(
            "/contacto",
            &[
                ("name", "Ana"),
                ("email", "ana"),
                ("subject", "Soporte Técnico"),
                ("message", "Hola"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("Correo inválido"));
    assert!(ctx.recorded(|r| r.contact_had_auth.is_empty()));
}
