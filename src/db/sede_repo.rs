// src/db/sede_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{store::SedeStore, unique_violation},
    models::sede::{CreateSedePayload, Sede, UpdateSedePayload},
};

#[derive(Clone)]
pub struct SedeRepository {
    pool: PgPool,
}

impl SedeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SedeStore for SedeRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<Sede>, AppError> {
        let sede = sqlx::query_as::<_, Sede>("SELECT * FROM sedes WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sede)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Sede>, AppError> {
        let sede = sqlx::query_as::<_, Sede>("SELECT * FROM sedes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sede)
    }

    async fn list_active_public(&self) -> Result<Vec<Sede>, AppError> {
        let sedes = sqlx::query_as::<_, Sede>(
            r#"
            SELECT * FROM sedes
            WHERE is_active = true AND is_admin_sede = false
            ORDER BY name
            "#,
        )
            .fetch_all(&self.pool)
            .await?;

        Ok(sedes)
    }

    async fn list_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Sede>, AppError> {
        let sedes = sqlx::query_as::<_, Sede>("SELECT * FROM sedes WHERE id = ANY($1) ORDER BY name")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(sedes)
    }

    async fn create(&self, input: &CreateSedePayload) -> Result<Sede, AppError> {
        sqlx::query_as::<_, Sede>(
            r#"
            INSERT INTO sedes (name, email, phone, address, is_admin_sede)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
            .bind(&input.name)
            .bind(&input.email)
            .bind(input.phone.as_deref())
            .bind(input.address.as_deref())
            .bind(input.is_admin_sede)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if unique_violation(&e).is_some() {
                    return AppError::SedeAlreadyExists(input.name.clone());
                }
                e.into()
            })
    }

    async fn update(&self, id: Uuid, patch: &UpdateSedePayload) -> Result<Option<Sede>, AppError> {
        // COALESCE: campo ausente mantém o valor atual
        let sede = sqlx::query_as::<_, Sede>(
            r#"
            UPDATE sedes SET
                email = COALESCE($2, email),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address),
                is_active = COALESCE($5, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
            .bind(id)
            .bind(patch.email.as_deref())
            .bind(patch.phone.as_deref())
            .bind(patch.address.as_deref())
            .bind(patch.is_active)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sede)
    }
}
