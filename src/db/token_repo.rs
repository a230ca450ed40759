// src/db/token_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{store::TokenStore, unique_violation},
    models::{
        sede::Sede,
        token::{SedeToken, TokenCode},
    },
};

// Nomes dos índices parciais da migration
const ONE_ACTIVE_PER_SEDE: &str = "sede_tokens_one_active_per_sede";
const ACTIVE_TOKEN_VALUE: &str = "sede_tokens_active_token_value";

#[derive(Clone)]
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Traduz as violações dos índices parciais para o vocabulário do emissor.
fn map_insert_error(e: sqlx::Error, sede_id: Uuid) -> AppError {
    match unique_violation(&e) {
        Some(ACTIVE_TOKEN_VALUE) => AppError::TokenCollision,
        Some(ONE_ACTIVE_PER_SEDE) => AppError::Conflict(format!("sede {} já tem código ativo", sede_id)),
        Some(other) => AppError::Conflict(format!("violação de unicidade em {}", other)),
        None => e.into(),
    }
}

#[async_trait]
impl TokenStore for TokenRepository {
    async fn find_active(&self, sede_id: Uuid) -> Result<Option<SedeToken>, AppError> {
        let token = sqlx::query_as::<_, SedeToken>(
            "SELECT * FROM sede_tokens WHERE sede_id = $1 AND is_active = true",
        )
            .bind(sede_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(token)
    }

    async fn find_active_match(&self, sede_name: &str, token: &str) -> Result<Option<SedeToken>, AppError> {
        let found = sqlx::query_as::<_, SedeToken>(
            r#"
            SELECT t.*
            FROM sede_tokens t
            JOIN sedes s ON s.id = t.sede_id
            WHERE s.name = $1
              AND s.is_active = true
              AND s.is_admin_sede = false
              AND t.is_active = true
              AND t.token = $2
            "#,
        )
            .bind(sede_name)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found)
    }

    async fn find_by_id(&self, token_id: Uuid) -> Result<Option<SedeToken>, AppError> {
        let token = sqlx::query_as::<_, SedeToken>("SELECT * FROM sede_tokens WHERE id = $1")
            .bind(token_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(token)
    }

    async fn list_for_sede(&self, sede_id: Uuid) -> Result<Vec<SedeToken>, AppError> {
        let tokens = sqlx::query_as::<_, SedeToken>(
            "SELECT * FROM sede_tokens WHERE sede_id = $1 ORDER BY created_at DESC",
        )
            .bind(sede_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(tokens)
    }

    async fn insert_active(&self, sede: &Sede, code: &TokenCode, email: &str) -> Result<SedeToken, AppError> {
        sqlx::query_as::<_, SedeToken>(
            r#"
            INSERT INTO sede_tokens (sede_id, sede, token, email, is_active)
            VALUES ($1, $2, $3, $4, true)
            RETURNING *
            "#,
        )
            .bind(sede.id)
            .bind(&sede.name)
            .bind(code.as_str())
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, sede.id))
    }

    async fn deactivate_all(&self, sede_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE sede_tokens SET is_active = false WHERE sede_id = $1 AND is_active = true",
        )
            .bind(sede_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn deactivate(&self, token_id: Uuid) -> Result<Option<SedeToken>, AppError> {
        let token = sqlx::query_as::<_, SedeToken>(
            "UPDATE sede_tokens SET is_active = false WHERE id = $1 RETURNING *",
        )
            .bind(token_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(token)
    }

    async fn activate(&self, token_id: Uuid) -> Result<Option<SedeToken>, AppError> {
        // Transação: se o valor colidir com outra sede, o rollback devolve o código antigo.
        let mut tx = self.pool.begin().await?;

        let Some(target) = sqlx::query_as::<_, SedeToken>("SELECT * FROM sede_tokens WHERE id = $1 FOR UPDATE")
            .bind(token_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        if target.is_active {
            tx.commit().await?;
            return Ok(Some(target));
        }

        sqlx::query("UPDATE sede_tokens SET is_active = false WHERE sede_id = $1 AND is_active = true")
            .bind(target.sede_id)
            .execute(&mut *tx)
            .await?;

        let activated = sqlx::query_as::<_, SedeToken>(
            "UPDATE sede_tokens SET is_active = true WHERE id = $1 RETURNING *",
        )
            .bind(token_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_insert_error(e, target.sede_id))?;

        tx.commit().await?;
        Ok(Some(activated))
    }

    async fn touch_last_used(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE sede_tokens SET last_used_at = $2 WHERE id = $1")
            .bind(token_id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn is_active_for(&self, token_id: Uuid, sede_id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM sede_tokens t
                JOIN sedes s ON s.id = t.sede_id
                WHERE t.id = $1
                  AND t.sede_id = $2
                  AND t.is_active = true
                  AND s.is_active = true
            )
            "#,
        )
            .bind(token_id)
            .bind(sede_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}
