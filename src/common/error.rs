// src/common/error.rs

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;
use crate::models::access::Capability;

// Segundos sugeridos no Retry-After para falhas transitórias
const RETRY_AFTER_SECS: u64 = 2;

// Códigos do Postgres que indicam falha temporária (timeout, serialização, deadlock, conexões)
const TRANSIENT_PG_CODES: &[&str] = &["57014", "40001", "40P01", "53300"];

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] ValidationErrors),

    #[error("Recurso não encontrado: {0}")]
    NotFound(String),

    // Corrida de criação concorrente. Tratada localmente (releitura), nunca chega ao cliente.
    #[error("Conflito de criação concorrente: {0}")]
    Conflict(String),

    // O código sorteado já está ativo em outra sede. O emissor sorteia outro.
    #[error("Código já ativo em outra sede")]
    TokenCollision,

    #[error("Sessão ausente ou inválida")]
    Unauthorized,

    #[error("Código de acesso rejeitado")]
    InvalidSedeToken,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Sem a capacidade '{capability}' sobre a sede {sede_id}")]
    AccessDenied { sede_id: Uuid, capability: Capability },

    // Gestão de concessões e criação de sedes exigem can_edit numa sede administradora
    #[error("Requer can_edit numa sede administradora")]
    AdministeringRequired,

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Já existe uma sede com o nome '{0}'")]
    SedeAlreadyExists(String),

    #[error("Falha transitória: {0}")]
    Transient(String),

    // O blob já foi removido, mas o registro não. O cliente deve repetir o DELETE.
    #[error("Blob removido, registro {0} pendente de exclusão")]
    DocumentRecordPending(Uuid),

    #[error("Falha na entrega do código: {0}")]
    DeliveryFailed(String),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Erro de armazenamento: {0}")]
    StorageError(String),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// Timeouts e quedas de conexão viram Transient (pode tentar de novo);
// o resto continua sendo erro de banco.
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => AppError::Transient(e.to_string()),
            sqlx::Error::Database(db_err)
                if db_err
                    .code()
                    .is_some_and(|code| TRANSIENT_PG_CODES.contains(&code.as_ref())) =>
            {
                AppError::Transient(e.to_string())
            }
            _ => AppError::DatabaseError(e),
        }
    }
}

impl AppError {
    /// Monta um erro de validação de um único campo, no mesmo formato do `validator`.
    pub fn invalid_field(field: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        let message: String = message.into();
        let mut err = ValidationError::new(code);
        err.message = Some(message.into());
        let mut errors = ValidationErrors::new();
        errors.add(field, err);
        AppError::ValidationError(errors)
    }

    #[cfg(test)]
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Transient(_) | AppError::DocumentRecordPending(_))
    }

    pub fn to_api_error(self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let lang = locale.0.as_str();
        let simple = |status: StatusCode, key: &str| ApiError {
            status,
            error: i18n.translate(lang, key).to_string(),
            details: None,
        };

        match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                ApiError {
                    status: StatusCode::BAD_REQUEST,
                    error: i18n.translate(lang, "validation").to_string(),
                    details: Some(Value::Object(details)),
                }
            }
            AppError::NotFound(what) => {
                // O detalhe fica só no log: o cliente nunca sabe se existe em outra sede.
                tracing::debug!("Não encontrado: {}", what);
                simple(StatusCode::NOT_FOUND, "not_found")
            }
            AppError::Unauthorized => simple(StatusCode::UNAUTHORIZED, "session_required"),
            AppError::InvalidSedeToken => simple(StatusCode::UNAUTHORIZED, "invalid_sede_token"),
            AppError::InvalidCredentials => simple(StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AppError::AccessDenied { sede_id, capability } => ApiError {
                status: StatusCode::FORBIDDEN,
                error: i18n.translate(lang, "access_denied").to_string(),
                details: Some(json!({ "sedeId": sede_id, "capability": capability })),
            },
            AppError::AdministeringRequired => simple(StatusCode::FORBIDDEN, "administering_required"),
            AppError::EmailAlreadyExists => simple(StatusCode::CONFLICT, "email_exists"),
            AppError::SedeAlreadyExists(_) => simple(StatusCode::CONFLICT, "sede_exists"),
            AppError::Conflict(ref msg) => {
                tracing::warn!("Conflito não resolvido chegou ao handler: {}", msg);
                simple(StatusCode::CONFLICT, "conflict")
            }
            AppError::Transient(ref msg) => {
                tracing::warn!("Falha transitória: {}", msg);
                simple(StatusCode::SERVICE_UNAVAILABLE, "transient")
            }
            AppError::DocumentRecordPending(document_id) => ApiError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                error: i18n.translate(lang, "document_record_pending").to_string(),
                details: Some(json!({ "documentId": document_id, "retry": "DELETE" })),
            },
            AppError::DeliveryFailed(ref msg) => {
                tracing::warn!("Entrega falhou: {}", msg);
                simple(StatusCode::BAD_GATEWAY, "delivery_failed")
            }
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                simple(StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

// Usado por middlewares que não têm acesso ao Locale da requisição.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), &I18nStore::default())
            .into_response()
    }
}

/// Erro já traduzido, pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };

        if self.status == StatusCode::SERVICE_UNAVAILABLE {
            let retry_after = RETRY_AFTER_SECS.to_string();
            return (self.status, [(header::RETRY_AFTER, retry_after)], Json(body)).into_response();
        }

        (self.status, Json(body)).into_response()
    }
}
