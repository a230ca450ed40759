// src/api_tests.rs

//! Testes de ponta a ponta sobre o `Router`, com stores em memória.

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{atomic::Ordering, Arc};
use tower::ServiceExt;

use crate::{
    config::{AppConfig, AppState, Backends},
    db::memory::MemoryStore,
    notifier::testing::RecordingNotifier,
    routes::app_router,
    storage::memory::MemoryBlobStore,
};

struct Harness {
    store: Arc<MemoryStore>,
    blobs: Arc<MemoryBlobStore>,
    notifier: Arc<RecordingNotifier>,
    app: Router,
}

fn harness_with(notifier: RecordingNotifier) -> Harness {
    let config = AppConfig::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/unused".to_string()),
        "JWT_SECRET" => Some("test-secret".to_string()),
        "MAX_UPLOAD_BYTES" => Some("1024".to_string()),
        _ => None,
    })
    .unwrap();

    let store = Arc::new(MemoryStore::new());
    let blobs = Arc::new(MemoryBlobStore::default());
    let notifier = Arc::new(notifier);
    store.seed_admin_sede("Administración");

    let backends = Backends {
        sedes: store.clone(),
        tokens: store.clone(),
        orders: store.clone(),
        access: store.clone(),
        admins: store.clone(),
        blobs: blobs.clone(),
        notifier: notifier.clone(),
    };
    let mut state = AppState::new(config, backends);
    state.auth_service = state.auth_service.with_bcrypt_cost(4);

    Harness {
        store,
        blobs,
        notifier,
        app: app_router(state),
    }
}

fn harness() -> Harness {
    harness_with(RecordingNotifier::default())
}

impl Harness {
    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body)
    }

    async fn call(&self, method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let (status, _, bytes) = self.send(request).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "email": email, "password": "secreto123", "fullName": "Admin Prueba" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_sede(&self, admin: &str, name: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/admin/sedes",
                Some(admin),
                Some(json!({ "name": name, "email": "sede@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn client_session(&self, sede: &str) -> String {
        let (status, _) = self
            .call(Method::POST, "/api/portal/token-requests", None, Some(json!({ "sede": sede })))
            .await;
        assert_eq!(status, StatusCode::OK);
        let code = self.notifier.last().unwrap().token;

        let (status, body) = self
            .call(
                Method::POST,
                "/api/portal/sessions",
                None,
                Some(json!({ "sede": sede, "token": code })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["accessToken"].as_str().unwrap().to_string()
    }

    async fn upload(&self, admin: &str, sede_id: &str, order_number: &str, bytes: &'static [u8]) -> (StatusCode, Value) {
        self.upload_body(admin, sede_id, order_number, Body::from(bytes)).await
    }

    async fn upload_body(&self, admin: &str, sede_id: &str, order_number: &str, body: Body) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!(
                "/api/admin/sedes/{}/documents?orderNumber={}&fileType=delivery_note&filename=remision.pdf",
                sede_id, order_number
            ))
            .header(header::AUTHORIZATION, format!("Bearer {}", admin))
            .header(header::CONTENT_TYPE, "application/pdf")
            .body(body)
            .unwrap();
        let (status, _, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }
}

#[tokio::test]
async fn health_is_public() {
    let h = harness();
    let (status, _, body) = h
        .send(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let h = harness();
    let (status, doc) = h.call(Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/portal/orders"]["get"].is_object());
    assert!(doc["components"]["securitySchemes"]["sede_session"].is_object());
}

#[tokio::test]
async fn issue_validate_upload_list_delete() {
    let h = harness();
    let admin = h.register("ana@example.com").await;
    let sede_id = h.create_sede(&admin, "Sede Norte").await;

    // Cliente obtém o código e abre a sessão; o código chega formatado com espaço
    let (status, body) = h
        .call(Method::POST, "/api/portal/token-requests", None, Some(json!({ "sede": "Sede Norte" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isNew"], true);
    assert_eq!(body["delivered"], true);
    let code = h.notifier.last().unwrap().token;
    let spaced = format!("{} {}", &code[..3], &code[3..]);

    let (status, body) = h
        .call(
            Method::POST,
            "/api/portal/sessions",
            None,
            Some(json!({ "sede": "Sede Norte", "token": spaced })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["sede"], "Sede Norte");
    let session = body["accessToken"].as_str().unwrap().to_string();

    // Admin anexa o documento
    let (status, document) = h.upload(&admin, &sede_id, "OC-100", b"%PDF-1.4 remision").await;
    assert_eq!(status, StatusCode::CREATED, "{document}");
    let document_id = document["id"].as_str().unwrap().to_string();
    assert!(document.get("filePath").is_none());

    // Cliente lista e baixa
    let (status, orders) = h.call(Method::GET, "/api/portal/orders", Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["orderNumber"], "OC-100");

    let (status, order) = h.call(Method::GET, "/api/portal/orders/OC-100", Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["documents"][0]["id"], document_id.as_str());
    assert_eq!(order["documents"][0]["fileType"], "delivery_note");

    let download_uri = format!("/api/portal/orders/OC-100/documents/{}", document_id);
    let request = Request::builder()
        .uri(&download_uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", session))
        .body(Body::empty())
        .unwrap();
    let (status, headers, bytes) = h.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&bytes[..], b"%PDF-1.4 remision");
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert!(headers[header::CONTENT_DISPOSITION].to_str().unwrap().contains("remision.pdf"));

    // Admin remove; o blob some e o cliente recebe 404
    let (status, _) = h
        .call(Method::DELETE, &format!("/api/admin/documents/{}", document_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(h.blobs.len(), 0);

    let (status, _) = h.call(Method::GET, &download_uri, Some(&session), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rotation_ends_client_sessions() {
    let h = harness();
    let admin = h.register("ana@example.com").await;
    let sede_id = h.create_sede(&admin, "Sede Norte").await;
    let session = h.client_session("Sede Norte").await;

    let (status, _) = h.call(Method::GET, "/api/portal/orders", Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h
        .call(
            Method::POST,
            &format!("/api/admin/sedes/{}/tokens/regenerate", sede_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["isNew"], true);

    let (status, _) = h.call(Method::GET, "/api/portal/orders", Some(&session), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sessions_never_cross_sedes() {
    let h = harness();
    let admin = h.register("ana@example.com").await;
    let norte = h.create_sede(&admin, "Sede Norte").await;
    h.create_sede(&admin, "Sede Sur").await;
    h.upload(&admin, &norte, "OC-1", b"norte").await;

    let sur_session = h.client_session("Sede Sur").await;
    let (status, orders) = h.call(Method::GET, "/api/portal/orders", Some(&sur_session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(orders.as_array().unwrap().is_empty());

    let (status, _) = h.call(Method::GET, "/api/portal/orders/OC-1", Some(&sur_session), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_code_is_rejected_before_lookup() {
    let h = harness();
    let admin = h.register("ana@example.com").await;
    h.create_sede(&admin, "Sede Norte").await;

    let (status, body) = h
        .call(
            Method::POST,
            "/api/portal/sessions",
            None,
            Some(json!({ "sede": "Sede Norte", "token": "12a456" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["token"].is_array());
    assert_eq!(h.store.token_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_code_is_a_localized_401() {
    let h = harness();
    let admin = h.register("ana@example.com").await;
    h.create_sede(&admin, "Sede Norte").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/portal/sessions")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT_LANGUAGE, "en-US")
        .body(Body::from(json!({ "sede": "Sede Norte", "token": "000000" }).to_string()))
        .unwrap();
    let (status, _, body) = h.send(request).await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid sede or access code.");
}

#[tokio::test]
async fn failed_delivery_is_accepted_not_ok() {
    let h = harness_with(RecordingNotifier::failing());
    let admin = h.register("ana@example.com").await;
    h.create_sede(&admin, "Sede Norte").await;

    let (status, body) = h
        .call(Method::POST, "/api/portal/token-requests", None, Some(json!({ "sede": "Sede Norte" })))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["delivered"], false);
}

#[tokio::test]
async fn admin_routes_need_identity_and_grants() {
    let h = harness();
    let (status, _) = h.call(Method::GET, "/api/admin/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let owner = h.register("ana@example.com").await;
    let sede_id = h.create_sede(&owner, "Sede Norte").await;
    let other = h.register("luis@example.com").await;

    let (status, me) = h.call(Method::GET, "/api/admin/me", Some(&other), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "luis@example.com");
    assert!(me.get("passwordHash").is_none());
    let other_id = me["id"].as_str().unwrap().to_string();

    // Sem administrar: não cria sedes nem concede acessos
    let (status, _) = h
        .call(
            Method::POST,
            "/api/admin/sedes",
            Some(&other),
            Some(json!({ "name": "Sede Sur", "email": "sur@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Sem concessão: 403 sobre a sede
    let (status, body) = h.upload(&other, &sede_id, "OC-1", b"x").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["details"]["capability"], "can_edit");

    // Só leitura
    let (status, _) = h
        .call(
            Method::PUT,
            "/api/admin/access",
            Some(&owner),
            Some(json!({ "adminId": other_id, "sedeId": sede_id, "canView": true, "canEdit": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = h
        .call(Method::GET, &format!("/api/admin/sedes/{}/orders", sede_id), Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h.upload(&other, &sede_id, "OC-1", b"x").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Revogado: volta a 403
    let (status, _) = h
        .call(
            Method::DELETE,
            &format!("/api/admin/access/{}/{}", other_id, sede_id),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = h
        .call(Method::GET, &format!("/api/admin/sedes/{}/orders", sede_id), Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn pending_record_delete_asks_for_retry() {
    let h = harness();
    let admin = h.register("ana@example.com").await;
    let sede_id = h.create_sede(&admin, "Sede Norte").await;
    let (_, document) = h.upload(&admin, &sede_id, "OC-1", b"x").await;
    let uri = format!("/api/admin/documents/{}", document["id"].as_str().unwrap());

    h.store.fail_document_delete.store(true, Ordering::SeqCst);
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(&uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = h.send(request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(headers.contains_key(header::RETRY_AFTER));

    let (status, _) = h.call(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let h = harness();
    let admin = h.register("ana@example.com").await;
    let sede_id = h.create_sede(&admin, "Sede Norte").await;

    let (status, _) = h.upload(&admin, &sede_id, "OC-1", &[7u8; 1025]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = h.upload(&admin, &sede_id, "OC-1", b"").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.blobs.len(), 0);
}

#[tokio::test]
async fn body_past_the_route_limit_is_a_validation_error() {
    let h = harness();
    let admin = h.register("ana@example.com").await;
    let sede_id = h.create_sede(&admin, "Sede Norte").await;

    // Limite do arquivo (1024) + folga da rota (64 KiB) + 1
    let body = Body::from(vec![7u8; 1024 + 64 * 1024 + 1]);
    let (status, body) = h.upload_body(&admin, &sede_id, "OC-1", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["file"].is_array(), "{body}");
    assert_eq!(h.blobs.len(), 0);
    assert_eq!(h.store.order_count(), 0);
}

#[tokio::test]
async fn deactivating_a_sede_ends_client_sessions() {
    let h = harness();
    let admin = h.register("ana@example.com").await;
    let sede_id = h.create_sede(&admin, "Sede Norte").await;
    let session = h.client_session("Sede Norte").await;

    let (status, _) = h.call(Method::GET, "/api/portal/orders", Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h
        .call(
            Method::PATCH,
            &format!("/api/admin/sedes/{}", sede_id),
            Some(&admin),
            Some(json!({ "isActive": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["isActive"], false);

    let (status, _) = h.call(Method::GET, "/api/portal/orders", Some(&session), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_sedes_are_not_portal_sedes() {
    let h = harness();
    h.register("ana@example.com").await;

    let (status, _) = h
        .call(Method::POST, "/api/portal/token-requests", None, Some(json!({ "sede": "Administración" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(h.notifier.count(), 0);
}

#[tokio::test]
async fn public_sede_list_hides_admin_sedes() {
    let h = harness();
    let admin = h.register("ana@example.com").await;
    h.create_sede(&admin, "Sede Sur").await;
    h.create_sede(&admin, "Sede Norte").await;

    let (status, body) = h.call(Method::GET, "/api/portal/sedes", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "name": "Sede Norte" }, { "name": "Sede Sur" }]));
}
