// src/middleware/access.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedAdmin, i18n::Locale},
};

/// Guardião das rotas que administram o próprio controle de acesso
/// (criar sedes, conceder e revogar acessos): exige can_edit sobre uma sede
/// administradora.
#[derive(Debug, Clone)]
pub struct RequireAdministering(pub AuthenticatedAdmin);

impl<S> FromRequestParts<S> for RequireAdministering
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;

        // A. Extrai o admin (posto pelo auth_guard)
        let admin = parts
            .extensions
            .get::<AuthenticatedAdmin>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized.to_api_error(&locale, &app_state.i18n_store))?;

        // B. Verifica no banco
        app_state
            .access_service
            .ensure_administering(admin.0.id)
            .await
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

        Ok(RequireAdministering(admin))
    }
}
