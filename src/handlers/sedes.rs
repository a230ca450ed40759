// src/handlers/sedes.rs

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
    middleware::{access::RequireAdministering, auth::AuthenticatedAdmin, i18n::Locale},
    models::sede::{CreateSedePayload, Sede, UpdateSedePayload},
};

// Sedes que o admin pode ver
#[utoipa::path(
    get,
    path = "/api/admin/sedes",
    tag = "Sedes",
    responses(
        (status = 200, description = "Sedes visíveis ao admin", body = Vec<Sede>),
        (status = 401, description = "Não autorizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_sedes(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
) -> Result<Json<Vec<Sede>>, ApiError> {
    let sedes = app_state
        .sede_service
        .list_for_admin(admin.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(sedes))
}

#[utoipa::path(
    post,
    path = "/api/admin/sedes",
    tag = "Sedes",
    request_body = CreateSedePayload,
    responses(
        (status = 201, description = "Sede criada", body = Sede),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Requer sede administradora"),
        (status = 409, description = "Nome já usado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_sede(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireAdministering(AuthenticatedAdmin(admin)): RequireAdministering,
    Json(payload): Json<CreateSedePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let sede = app_state
        .sede_service
        .create(admin.id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(sede)))
}

#[utoipa::path(
    get,
    path = "/api/admin/sedes/{sede_id}",
    tag = "Sedes",
    params(
        ("sede_id" = Uuid, Path, description = "ID da sede")
    ),
    responses(
        (status = 200, description = "Sede", body = Sede),
        (status = 403, description = "Sem can_view"),
        (status = 404, description = "Sede não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_sede(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Path(sede_id): Path<Uuid>,
) -> Result<Json<Sede>, ApiError> {
    let sede = app_state
        .sede_service
        .get(admin.id, sede_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(sede))
}

#[utoipa::path(
    patch,
    path = "/api/admin/sedes/{sede_id}",
    tag = "Sedes",
    params(
        ("sede_id" = Uuid, Path, description = "ID da sede")
    ),
    request_body = UpdateSedePayload,
    responses(
        (status = 200, description = "Sede atualizada", body = Sede),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Sem can_edit")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_sede(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Path(sede_id): Path<Uuid>,
    Json(payload): Json<UpdateSedePayload>,
) -> Result<Json<Sede>, ApiError> {
    let sede = app_state
        .sede_service
        .update(admin.id, sede_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(sede))
}
