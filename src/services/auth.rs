// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::AdminStore,
    models::auth::{Admin, Claims, RegisterAdminPayload},
    services::access_service::AccessService,
};

const ADMIN_KIND: &str = "admin";

#[derive(Clone)]
pub struct AuthService {
    admins: Arc<dyn AdminStore>,
    access: AccessService,
    jwt_secret: String,
    session_days: i64,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(admins: Arc<dyn AdminStore>, access: AccessService, jwt_secret: String, session_days: i64) -> Self {
        Self {
            admins,
            access,
            jwt_secret,
            session_days,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    #[cfg(test)]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub async fn register_admin(&self, payload: &RegisterAdminPayload) -> Result<String, AppError> {
        // 1. Hashing fora do runtime assíncrono
        let password = payload.password.clone();
        let cost = self.bcrypt_cost;
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        // 2. Cria o admin
        let email = payload.email.trim().to_lowercase();
        let admin = self
            .admins
            .create(
                &email,
                &hashed_password,
                payload.full_name.trim(),
                payload.company.as_deref().map(str::trim).filter(|c| !c.is_empty()),
            )
            .await?;

        // 3. Primeiro admin do sistema assume as sedes administradoras
        self.access.bootstrap_first_admin(admin.id).await?;

        tracing::info!("👤 Admin {} registrado", admin.id);
        self.create_token(admin.id)
    }

    pub async fn login_admin(&self, email: &str, password: &str) -> Result<String, AppError> {
        let admin = self
            .admins
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password = password.to_owned();
        let password_hash = admin.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(admin.id)
    }

    pub async fn validate_token(&self, token: &str) -> Result<Admin, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthorized)?;

        if token_data.claims.kind != ADMIN_KIND {
            return Err(AppError::Unauthorized);
        }

        self.admins
            .find_by_id(token_data.claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    fn create_token(&self, admin_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(self.session_days);

        let claims = Claims {
            sub: admin_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
            kind: ADMIN_KIND.to_string(),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
