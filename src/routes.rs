// src/routes.rs

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

// Folga para o corpo além do limite do arquivo; o tamanho exato é validado no serviço
const UPLOAD_BODY_SLACK: usize = 64 * 1024;

pub fn app_router(app_state: AppState) -> Router {
    // Portal das sedes (público + sessão de sede)
    let portal_routes = Router::new()
        .route("/sedes", get(handlers::portal::list_sedes))
        .route("/token-requests", post(handlers::portal::request_token))
        .route("/sessions", post(handlers::portal::create_session))
        .route("/orders", get(handlers::portal::list_orders))
        .route("/orders/{order_number}", get(handlers::portal::get_order))
        .route(
            "/orders/{order_number}/documents/{document_id}",
            get(handlers::portal::download_document),
        );

    // Identidade dos admins (pública)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let upload_limit = app_state.config.max_upload_bytes + UPLOAD_BODY_SLACK;

    // Painel (protegido pelo auth_guard)
    let admin_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route(
            "/sedes",
            get(handlers::sedes::list_sedes).post(handlers::sedes::create_sede),
        )
        .route(
            "/sedes/{sede_id}",
            get(handlers::sedes::get_sede).patch(handlers::sedes::update_sede),
        )
        .route(
            "/sedes/{sede_id}/tokens",
            get(handlers::tokens::list_tokens).post(handlers::tokens::issue_token),
        )
        .route(
            "/sedes/{sede_id}/tokens/regenerate",
            post(handlers::tokens::regenerate_token),
        )
        .route("/tokens/{token_id}", patch(handlers::tokens::set_token_active))
        .route("/sedes/{sede_id}/orders", get(handlers::documents::list_sede_orders))
        .route(
            "/sedes/{sede_id}/documents",
            post(handlers::documents::upload_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/orders/{order_id}/documents",
            get(handlers::documents::list_order_documents),
        )
        .route("/documents/mine", get(handlers::documents::my_documents))
        .route(
            "/documents/{document_id}/content",
            get(handlers::documents::download_document),
        )
        .route("/documents/{document_id}", delete(handlers::documents::delete_document))
        .route(
            "/access",
            get(handlers::access::list_access).put(handlers::access::grant_access),
        )
        .route("/access/{admin_id}/{sede_id}", delete(handlers::access::revoke_access))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let cors = cors_layer(app_state.config.cors_allow_origin.as_deref());

    // Combina tudo no router principal
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/portal", portal_routes)
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT_LANGUAGE])
        .expose_headers([header::CONTENT_DISPOSITION, header::RETRY_AFTER]);

    match allow_origin.and_then(|origin| HeaderValue::from_str(origin).ok()) {
        Some(origin) => cors.allow_origin(origin),
        None => cors.allow_origin(Any),
    }
}
