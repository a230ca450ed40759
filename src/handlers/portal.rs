// src/handlers/portal.rs

//! Rotas públicas do portal: seletor de sedes, pedido de código, sessão e consulta.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    handlers::documents::content_response,
    middleware::{i18n::Locale, sede_session::SedeSession},
    models::{
        order::{OrderWithDocuments, PurchaseOrder},
        sede::PublicSede,
        token::{normalize_submitted, CreateSessionPayload, SessionResponse, TokenRequestPayload, TokenRequestResponse},
    },
};

#[utoipa::path(
    get,
    path = "/api/portal/sedes",
    tag = "Portal",
    responses(
        (status = 200, description = "Sedes ativas do seletor", body = Vec<PublicSede>)
    )
)]
pub async fn list_sedes(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<Json<Vec<PublicSede>>, ApiError> {
    let sedes = app_state
        .sede_service
        .list_active_public()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(sedes))
}

// 200 quando o código foi entregue, 202 quando foi emitido mas a entrega falhou
#[utoipa::path(
    post,
    path = "/api/portal/token-requests",
    tag = "Portal",
    request_body = TokenRequestPayload,
    responses(
        (status = 200, description = "Código enviado ao e-mail da sede", body = TokenRequestResponse),
        (status = 202, description = "Código emitido, entrega falhou", body = TokenRequestResponse),
        (status = 404, description = "Sede inexistente ou inativa")
    )
)]
pub async fn request_token(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<TokenRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let response = app_state
        .token_service
        .request_token(&payload.sede)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let status = if response.delivered {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/portal/sessions",
    tag = "Portal",
    request_body = CreateSessionPayload,
    responses(
        (status = 200, description = "Sessão da sede aberta", body = SessionResponse),
        (status = 400, description = "Código fora do formato de 6 dígitos"),
        (status = 401, description = "Sede ou código inválido")
    )
)]
pub async fn create_session(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateSessionPayload>,
) -> Result<Json<SessionResponse>, ApiError> {
    // "482 913" e "482-913" valem como "482913"
    let submitted = normalize_submitted(&payload.token);

    let grant = app_state
        .token_service
        .validate(&payload.sede, &submitted)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let access_token = app_state
        .token_service
        .encode_session(&grant)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(SessionResponse {
        access_token,
        sede: grant.sede,
    }))
}

#[utoipa::path(
    get,
    path = "/api/portal/orders",
    tag = "Portal",
    responses(
        (status = 200, description = "Pedidos da sede, mais recentes primeiro", body = Vec<PurchaseOrder>),
        (status = 401, description = "Sessão ausente ou revogada")
    ),
    security(("sede_session" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    SedeSession(grant): SedeSession,
) -> Result<Json<Vec<PurchaseOrder>>, ApiError> {
    let orders = app_state
        .order_service
        .list_orders(&grant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(orders))
}

#[utoipa::path(
    get,
    path = "/api/portal/orders/{order_number}",
    tag = "Portal",
    params(
        ("order_number" = String, Path, description = "Número do pedido")
    ),
    responses(
        (status = 200, description = "Pedido com seus documentos", body = OrderWithDocuments),
        (status = 401, description = "Sessão ausente ou revogada"),
        (status = 404, description = "Pedido não encontrado nesta sede")
    ),
    security(("sede_session" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    locale: Locale,
    SedeSession(grant): SedeSession,
    Path(order_number): Path<String>,
) -> Result<Json<OrderWithDocuments>, ApiError> {
    let order = app_state
        .order_service
        .find_order(&grant, &order_number)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let documents = app_state
        .order_service
        .list_documents(order.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(OrderWithDocuments { order, documents }))
}

#[utoipa::path(
    get,
    path = "/api/portal/orders/{order_number}/documents/{document_id}",
    tag = "Portal",
    params(
        ("order_number" = String, Path, description = "Número do pedido"),
        ("document_id" = Uuid, Path, description = "ID do documento")
    ),
    responses(
        (status = 200, description = "Conteúdo do arquivo"),
        (status = 401, description = "Sessão ausente ou revogada"),
        (status = 404, description = "Documento não encontrado neste pedido")
    ),
    security(("sede_session" = []))
)]
pub async fn download_document(
    State(app_state): State<AppState>,
    locale: Locale,
    SedeSession(grant): SedeSession,
    Path((order_number, document_id)): Path<(String, Uuid)>,
) -> Result<Response, ApiError> {
    let content = app_state
        .order_service
        .download(&grant, &order_number, document_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(content_response(content))
}
