// src/handlers/access.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{access::RequireAdministering, auth::AuthenticatedAdmin, i18n::Locale},
    models::access::{AdminSedeAccess, GrantAccessPayload, ListAccessQuery},
};

// Sem `adminId`: quem administra vê todas as concessões, os demais só as próprias.
// Consultar outro admin exige administrar.
#[utoipa::path(
    get,
    path = "/api/admin/access",
    tag = "Access",
    params(
        ("adminId" = Option<Uuid>, Query, description = "Admin consultado; padrão é o próprio")
    ),
    responses(
        (status = 200, description = "Concessões", body = Vec<AdminSedeAccess>),
        (status = 403, description = "Consultar outro admin requer sede administradora")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_access(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Query(query): Query<ListAccessQuery>,
) -> Result<Json<Vec<AdminSedeAccess>>, ApiError> {
    let access = &app_state.access_service;

    let result = match query.admin_id {
        Some(target) if target != admin.id => match access.ensure_administering(admin.id).await {
            Ok(()) => access.list_grants(target).await,
            Err(e) => Err(e),
        },
        Some(_) => access.list_grants(admin.id).await,
        None => match access.is_administering(admin.id).await {
            Ok(true) => access.list_all_grants().await,
            Ok(false) => access.list_grants(admin.id).await,
            Err(e) => Err(e),
        },
    };

    let grants = result.map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(grants))
}

#[utoipa::path(
    put,
    path = "/api/admin/access",
    tag = "Access",
    request_body = GrantAccessPayload,
    responses(
        (status = 200, description = "Concessão gravada (sobrescreve a anterior)", body = AdminSedeAccess),
        (status = 403, description = "Requer sede administradora"),
        (status = 404, description = "Admin ou sede inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn grant_access(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireAdministering(AuthenticatedAdmin(admin)): RequireAdministering,
    Json(payload): Json<GrantAccessPayload>,
) -> Result<Json<AdminSedeAccess>, ApiError> {
    let access = app_state
        .access_service
        .grant(payload.admin_id, payload.sede_id, payload.can_view, payload.can_edit)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tracing::info!("Concessão gravada por {}", admin.id);
    Ok(Json(access))
}

#[utoipa::path(
    delete,
    path = "/api/admin/access/{admin_id}/{sede_id}",
    tag = "Access",
    params(
        ("admin_id" = Uuid, Path, description = "ID do admin"),
        ("sede_id" = Uuid, Path, description = "ID da sede")
    ),
    responses(
        (status = 204, description = "Concessão removida"),
        (status = 403, description = "Requer sede administradora"),
        (status = 404, description = "Concessão inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn revoke_access(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireAdministering(AuthenticatedAdmin(admin)): RequireAdministering,
    Path((admin_id, sede_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    app_state
        .access_service
        .revoke(admin_id, sede_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tracing::info!("Revogação feita por {}", admin.id);
    Ok(StatusCode::NO_CONTENT)
}
