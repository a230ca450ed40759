// src/handlers/tokens.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedAdmin, i18n::Locale},
    models::token::{AdminTokenResponse, IssuedToken, IssueTokenPayload, SedeToken, SetTokenActivePayload},
};

fn issued_response(issued: IssuedToken) -> impl IntoResponse {
    let status = if issued.is_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(AdminTokenResponse {
            token: issued.token,
            is_new: issued.is_new,
        }),
    )
}

#[utoipa::path(
    get,
    path = "/api/admin/sedes/{sede_id}/tokens",
    tag = "Tokens",
    params(
        ("sede_id" = Uuid, Path, description = "ID da sede")
    ),
    responses(
        (status = 200, description = "Histórico de códigos, mais recente primeiro", body = Vec<SedeToken>),
        (status = 403, description = "Sem can_view")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_tokens(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Path(sede_id): Path<Uuid>,
) -> Result<Json<Vec<SedeToken>>, ApiError> {
    let tokens = app_state
        .token_service
        .list_tokens(admin.id, sede_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tokens))
}

// Corpo opcional: sem e-mail, usa o cadastrado da sede
#[utoipa::path(
    post,
    path = "/api/admin/sedes/{sede_id}/tokens",
    tag = "Tokens",
    params(
        ("sede_id" = Uuid, Path, description = "ID da sede")
    ),
    request_body(content = IssueTokenPayload, description = "Opcional; sem e-mail usa o da sede"),
    responses(
        (status = 201, description = "Código novo", body = AdminTokenResponse),
        (status = 200, description = "Código ativo reaproveitado", body = AdminTokenResponse),
        (status = 403, description = "Sem can_edit")
    ),
    security(("api_jwt" = []))
)]
pub async fn issue_token(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Path(sede_id): Path<Uuid>,
    payload: Option<Json<IssueTokenPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.and_then(|Json(p)| p.email);

    let issued = app_state
        .token_service
        .admin_issue(admin.id, sede_id, email)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(issued_response(issued))
}

#[utoipa::path(
    post,
    path = "/api/admin/sedes/{sede_id}/tokens/regenerate",
    tag = "Tokens",
    params(
        ("sede_id" = Uuid, Path, description = "ID da sede")
    ),
    request_body(content = IssueTokenPayload, description = "Opcional; sem e-mail usa o da sede"),
    responses(
        (status = 201, description = "Código trocado; sessões antigas encerradas", body = AdminTokenResponse),
        (status = 403, description = "Sem can_edit")
    ),
    security(("api_jwt" = []))
)]
pub async fn regenerate_token(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Path(sede_id): Path<Uuid>,
    payload: Option<Json<IssueTokenPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.and_then(|Json(p)| p.email);

    let issued = app_state
        .token_service
        .admin_regenerate(admin.id, sede_id, email)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(issued_response(issued))
}

#[utoipa::path(
    patch,
    path = "/api/admin/tokens/{token_id}",
    tag = "Tokens",
    params(
        ("token_id" = Uuid, Path, description = "ID do código")
    ),
    request_body = SetTokenActivePayload,
    responses(
        (status = 200, description = "Código atualizado", body = SedeToken),
        (status = 400, description = "Código ativo em outra sede"),
        (status = 403, description = "Sem can_edit")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_token_active(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Path(token_id): Path<Uuid>,
    Json(payload): Json<SetTokenActivePayload>,
) -> Result<Json<SedeToken>, ApiError> {
    let token = app_state
        .token_service
        .set_token_active(admin.id, token_id, payload.is_active)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(token))
}
