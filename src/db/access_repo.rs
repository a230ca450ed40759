// src/db/access_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::AccessStore,
    models::access::{AdminSedeAccess, Capability},
};

#[derive(Clone)]
pub struct AccessRepository {
    pool: PgPool,
}

impl AccessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessStore for AccessRepository {
    async fn upsert(
        &self,
        admin_id: Uuid,
        sede_id: Uuid,
        can_view: bool,
        can_edit: bool,
    ) -> Result<AdminSedeAccess, AppError> {
        // UPSERT: a última concessão vence, não acumula
        let access = sqlx::query_as::<_, AdminSedeAccess>(
            r#"
            INSERT INTO admin_sede_access (admin_id, sede_id, can_view, can_edit)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (admin_id, sede_id)
            DO UPDATE SET can_view = EXCLUDED.can_view, can_edit = EXCLUDED.can_edit
            RETURNING *
            "#,
        )
            .bind(admin_id)
            .bind(sede_id)
            .bind(can_view)
            .bind(can_edit)
            .fetch_one(&self.pool)
            .await?;

        Ok(access)
    }

    async fn delete(&self, admin_id: Uuid, sede_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM admin_sede_access WHERE admin_id = $1 AND sede_id = $2")
            .bind(admin_id)
            .bind(sede_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, admin_id: Uuid, sede_id: Uuid) -> Result<Option<AdminSedeAccess>, AppError> {
        let access = sqlx::query_as::<_, AdminSedeAccess>(
            "SELECT * FROM admin_sede_access WHERE admin_id = $1 AND sede_id = $2",
        )
            .bind(admin_id)
            .bind(sede_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(access)
    }

    async fn list_for_admin(&self, admin_id: Uuid) -> Result<Vec<AdminSedeAccess>, AppError> {
        let grants = sqlx::query_as::<_, AdminSedeAccess>(
            "SELECT * FROM admin_sede_access WHERE admin_id = $1 ORDER BY created_at",
        )
            .bind(admin_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(grants)
    }

    async fn list_all(&self) -> Result<Vec<AdminSedeAccess>, AppError> {
        let grants = sqlx::query_as::<_, AdminSedeAccess>(
            "SELECT * FROM admin_sede_access ORDER BY admin_id, created_at",
        )
            .fetch_all(&self.pool)
            .await?;

        Ok(grants)
    }

    async fn has_on_admin_sede(&self, admin_id: Uuid, capability: Capability) -> Result<bool, AppError> {
        let column = match capability {
            Capability::CanView => "a.can_view",
            Capability::CanEdit => "a.can_edit",
        };

        // `column` vem de um match fechado, nunca da entrada
        let sql = format!(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM admin_sede_access a
                JOIN sedes s ON s.id = a.sede_id
                WHERE a.admin_id = $1
                  AND s.is_admin_sede = true
                  AND s.is_active = true
                  AND {} = true
            )
            "#,
            column
        );

        let exists: bool = sqlx::query_scalar(&sql)
            .bind(admin_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn any_admin_sede_grant(&self) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM admin_sede_access a
                JOIN sedes s ON s.id = a.sede_id
                WHERE s.is_admin_sede = true
            )
            "#,
        )
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn admin_sede_ids(&self) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM sedes WHERE is_admin_sede = true")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }
}
