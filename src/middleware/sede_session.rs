// src/middleware/sede_session.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::token::SessionGrant,
};

/// Sessão do portal de uma sede (`Authorization: Bearer <accessToken>`).
///
/// A cada requisição o código por trás da sessão é conferido de novo: se foi
/// regenerado ou desativado, a sessão cai.
#[derive(Debug, Clone)]
pub struct SedeSession(pub SessionGrant);

impl<S> FromRequestParts<S> for SedeSession
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized.to_api_error(&locale, &app_state.i18n_store))?;

        let grant = app_state
            .token_service
            .authorize_session(bearer.token())
            .await
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

        Ok(SedeSession(grant))
    }
}
