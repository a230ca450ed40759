// src/services/token_service.rs

//! Emissão e validação dos códigos de acesso das sedes.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use std::sync::Arc;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::{
    common::error::AppError,
    db::store::{SedeStore, TokenStore},
    models::{
        access::Capability,
        sede::Sede,
        token::{IssuedToken, SedeToken, SessionClaims, SessionGrant, TokenCode, TokenRequestResponse},
    },
    notifier::Notifier,
    services::access_service::AccessService,
};

// Com 10^6 códigos, 32 colisões seguidas só acontecem com o espaço praticamente esgotado
const MAX_ISSUE_ATTEMPTS: usize = 32;
const SESSION_KIND: &str = "sede";

pub type CodeGenerator = Arc<dyn Fn() -> TokenCode + Send + Sync>;

fn os_rng_generator() -> CodeGenerator {
    Arc::new(|| TokenCode::generate(&mut OsRng))
}

#[derive(Clone)]
pub struct TokenService {
    sedes: Arc<dyn SedeStore>,
    tokens: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
    access: AccessService,
    generate: CodeGenerator,
    jwt_secret: String,
}

impl TokenService {
    pub fn new(
        sedes: Arc<dyn SedeStore>,
        tokens: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
        access: AccessService,
        jwt_secret: String,
    ) -> Self {
        Self {
            sedes,
            tokens,
            notifier,
            access,
            generate: os_rng_generator(),
            jwt_secret,
        }
    }

    /// Troca a fonte dos códigos (testes de colisão).
    #[cfg(test)]
    pub fn with_generator(mut self, generate: CodeGenerator) -> Self {
        self.generate = generate;
        self
    }

    // Sedes administradoras não entram no portal: não recebem nem validam códigos
    async fn active_sede(&self, sede_name: &str) -> Result<Sede, AppError> {
        self.sedes
            .find_by_name(sede_name.trim())
            .await?
            .filter(|s| s.is_active && !s.is_admin_sede)
            .ok_or_else(|| AppError::NotFound(format!("sede '{}'", sede_name)))
    }

    // =========================================================================
    //  EMISSÃO
    // =========================================================================

    /// Devolve o código ativo da sede ou cria um. Idempotente.
    pub async fn issue_or_reuse(&self, sede_name: &str, email: &str) -> Result<IssuedToken, AppError> {
        let email = checked_email(email)?;
        let sede = self.active_sede(sede_name).await?;
        self.issue_for(&sede, &email).await
    }

    async fn issue_for(&self, sede: &Sede, email: &str) -> Result<IssuedToken, AppError> {
        if let Some(token) = self.tokens.find_active(sede.id).await? {
            return Ok(IssuedToken { token, is_new: false });
        }

        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let code = (self.generate)();

            match self.tokens.insert_active(sede, &code, email).await {
                Ok(token) => {
                    tracing::info!("🎟️ Novo código emitido para a sede '{}' ({})", sede.name, token.id);
                    return Ok(IssuedToken { token, is_new: true });
                }
                Err(AppError::TokenCollision) => {
                    tracing::debug!("Código já ativo em outra sede, sorteando de novo (tentativa {})", attempt);
                }
                Err(AppError::Conflict(_)) => {
                    // Outra requisição emitiu primeiro: o código dela vale para as duas
                    if let Some(token) = self.tokens.find_active(sede.id).await? {
                        return Ok(IssuedToken { token, is_new: false });
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(anyhow::anyhow!(
            "não foi possível emitir código para a sede '{}' após {} tentativas",
            sede.name,
            MAX_ISSUE_ATTEMPTS
        )
        .into())
    }

    /// Desativa o código atual e emite outro. As duas etapas não são atômicas:
    /// uma emissão concorrente entre elas é reaproveitada por `issue_or_reuse`.
    pub async fn regenerate(&self, sede_name: &str, email: &str) -> Result<IssuedToken, AppError> {
        let email = checked_email(email)?;
        let sede = self.active_sede(sede_name).await?;

        let revoked = self.tokens.deactivate_all(sede.id).await?;
        tracing::info!("🔄 Sede '{}': {} código(s) desativado(s)", sede.name, revoked);

        self.issue_for(&sede, &email).await
    }

    /// "Enviar meu código": usa o e-mail cadastrado da sede. Falha de entrega
    /// não desfaz a emissão; a resposta diz `delivered: false`.
    pub async fn request_token(&self, sede_name: &str) -> Result<TokenRequestResponse, AppError> {
        let sede = self.active_sede(sede_name).await?;
        let issued = self.issue_for(&sede, &sede.email).await?;

        let delivered = match self
            .notifier
            .send(&sede.email, &sede.name, &issued.token.token, issued.is_new)
            .await
            .map_err(AppError::from)
        {
            Ok(()) => true,
            Err(AppError::DeliveryFailed(reason)) => {
                tracing::warn!("📭 Código da sede '{}' não entregue: {}", sede.name, reason);
                false
            }
            Err(e) => return Err(e),
        };

        let message = if delivered {
            "El código de acceso fue enviado al correo registrado de la sede."
        } else {
            "El código fue generado, pero no fue posible enviarlo. Contacte al administrador."
        };

        Ok(TokenRequestResponse {
            message: message.to_string(),
            is_new: issued.is_new,
            delivered,
        })
    }

    // =========================================================================
    //  VALIDAÇÃO
    // =========================================================================

    /// Confere (sede, código) e devolve a autorização da sessão.
    /// O formato é verificado antes de qualquer consulta.
    pub async fn validate(&self, sede_name: &str, submitted: &str) -> Result<SessionGrant, AppError> {
        let Some(code) = TokenCode::parse(submitted) else {
            return Err(AppError::invalid_field(
                "token",
                "token_format",
                "El código debe tener exactamente 6 dígitos.",
            ));
        };

        let Some(token) = self.tokens.find_active_match(sede_name.trim(), code.as_str()).await? else {
            tracing::info!("🚫 Código rejeitado para a sede '{}'", sede_name.trim());
            return Err(AppError::InvalidSedeToken);
        };

        let now = Utc::now();
        if let Err(e) = self.tokens.touch_last_used(token.id, now).await {
            tracing::warn!("Não foi possível registrar o uso do código {}: {}", token.id, e);
        }

        Ok(SessionGrant {
            sede_id: token.sede_id,
            sede: token.sede,
            token_id: token.id,
            issued_at: now,
        })
    }

    // =========================================================================
    //  SESSÃO (JWT)
    // =========================================================================

    pub fn encode_session(&self, grant: &SessionGrant) -> Result<String, AppError> {
        let claims = SessionClaims {
            sub: grant.sede_id,
            sede: grant.sede.clone(),
            tid: grant.token_id,
            iat: grant.issued_at.timestamp() as usize,
            kind: SESSION_KIND.to_string(),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    /// Decodifica o JWT e confere, no registro durável, que o código ainda é o ativo.
    pub async fn authorize_session(&self, jwt: &str) -> Result<SessionGrant, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = decode::<SessionClaims>(
            jwt,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::Unauthorized)?
        .claims;

        if claims.kind != SESSION_KIND {
            return Err(AppError::Unauthorized);
        }
        if !self.tokens.is_active_for(claims.tid, claims.sub).await? {
            return Err(AppError::Unauthorized);
        }

        Ok(SessionGrant {
            sede_id: claims.sub,
            sede: claims.sede,
            token_id: claims.tid,
            issued_at: DateTime::from_timestamp(claims.iat as i64, 0).unwrap_or_default(),
        })
    }

    // =========================================================================
    //  PAINEL ADMINISTRATIVO
    // =========================================================================

    pub async fn admin_issue(
        &self,
        actor: Uuid,
        sede_id: Uuid,
        email: Option<String>,
    ) -> Result<IssuedToken, AppError> {
        self.access.ensure(actor, sede_id, Capability::CanEdit).await?;
        let sede = self.sede_by_id(sede_id).await?;
        let email = email.unwrap_or_else(|| sede.email.clone());
        self.issue_or_reuse(&sede.name, &email).await
    }

    pub async fn admin_regenerate(
        &self,
        actor: Uuid,
        sede_id: Uuid,
        email: Option<String>,
    ) -> Result<IssuedToken, AppError> {
        self.access.ensure(actor, sede_id, Capability::CanEdit).await?;
        let sede = self.sede_by_id(sede_id).await?;
        let email = email.unwrap_or_else(|| sede.email.clone());
        tracing::info!("Admin {} regenerou o código da sede '{}'", actor, sede.name);
        self.regenerate(&sede.name, &email).await
    }

    /// Histórico de códigos da sede, mais recente primeiro.
    pub async fn list_tokens(&self, actor: Uuid, sede_id: Uuid) -> Result<Vec<SedeToken>, AppError> {
        self.access.ensure(actor, sede_id, Capability::CanView).await?;
        self.tokens.list_for_sede(sede_id).await
    }

    /// Liga/desliga um código. Ativar desliga os demais da sede.
    pub async fn set_token_active(&self, actor: Uuid, token_id: Uuid, active: bool) -> Result<SedeToken, AppError> {
        let token = self
            .tokens
            .find_by_id(token_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("código {}", token_id)))?;
        self.access.ensure(actor, token.sede_id, Capability::CanEdit).await?;

        let result = if active {
            self.tokens.activate(token_id).await
        } else {
            self.tokens.deactivate(token_id).await
        };

        let updated = match result {
            Ok(Some(token)) => token,
            Ok(None) => return Err(AppError::NotFound(format!("código {}", token_id))),
            Err(AppError::TokenCollision) => {
                return Err(AppError::invalid_field(
                    "isActive",
                    "token_in_use",
                    "Este código está activo en otra sede; genere uno nuevo.",
                ));
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            "Admin {} {} o código {} da sede '{}'",
            actor,
            if active { "ativou" } else { "desativou" },
            token_id,
            updated.sede
        );
        Ok(updated)
    }

    async fn sede_by_id(&self, sede_id: Uuid) -> Result<Sede, AppError> {
        self.sedes
            .find_by_id(sede_id)
            .await?
            .filter(|s| s.is_active && !s.is_admin_sede)
            .ok_or_else(|| AppError::NotFound(format!("sede {}", sede_id)))
    }
}

fn checked_email(email: &str) -> Result<String, AppError> {
    let email = email.trim();
    if !email.validate_email() {
        return Err(AppError::invalid_field(
            "email",
            "email",
            "El correo electrónico es inválido.",
        ));
    }
    Ok(email.to_string())
}
