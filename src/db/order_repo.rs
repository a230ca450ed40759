// src/db/order_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{store::OrderStore, unique_violation},
    models::{
        order::{Document, NewDocument, PurchaseOrder, UploadedDocument},
        sede::Sede,
    },
};

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    // =========================================================================
    //  PEDIDOS
    // =========================================================================

    async fn find_order(&self, sede_id: Uuid, order_number: &str) -> Result<Option<PurchaseOrder>, AppError> {
        let order = sqlx::query_as::<_, PurchaseOrder>(
            "SELECT * FROM purchase_orders WHERE sede_id = $1 AND order_number = $2",
        )
            .bind(sede_id)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    async fn find_order_by_id(&self, order_id: Uuid) -> Result<Option<PurchaseOrder>, AppError> {
        let order = sqlx::query_as::<_, PurchaseOrder>("SELECT * FROM purchase_orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    async fn insert_order(
        &self,
        sede: &Sede,
        order_number: &str,
        created_by: Uuid,
    ) -> Result<PurchaseOrder, AppError> {
        sqlx::query_as::<_, PurchaseOrder>(
            r#"
            INSERT INTO purchase_orders (order_number, sede_id, sede, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
            .bind(order_number)
            .bind(sede.id)
            .bind(&sede.name)
            .bind(created_by)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if unique_violation(&e).is_some() {
                    return AppError::Conflict(format!("pedido {} já existe na sede {}", order_number, sede.id));
                }
                e.into()
            })
    }

    async fn touch_order(&self, order_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE purchase_orders SET updated_at = now() WHERE id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_orders(&self, sede_id: Uuid) -> Result<Vec<PurchaseOrder>, AppError> {
        let orders = sqlx::query_as::<_, PurchaseOrder>(
            "SELECT * FROM purchase_orders WHERE sede_id = $1 ORDER BY created_at DESC",
        )
            .bind(sede_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    // =========================================================================
    //  DOCUMENTOS
    // =========================================================================

    async fn list_documents(&self, order_id: Uuid) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE purchase_order_id = $1 ORDER BY created_at DESC",
        )
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(documents)
    }

    async fn find_document(&self, document_id: Uuid) -> Result<Option<Document>, AppError> {
        let document = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(document)
    }

    async fn insert_document(&self, doc: &NewDocument) -> Result<Document, AppError> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (
                purchase_order_id, filename, original_filename, file_type,
                file_size, mime_type, file_path, uploaded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
            .bind(doc.purchase_order_id)
            .bind(&doc.filename)
            .bind(&doc.original_filename)
            .bind(doc.file_type)
            .bind(doc.file_size)
            .bind(&doc.mime_type)
            .bind(&doc.file_path)
            .bind(doc.uploaded_by)
            .fetch_one(&self.pool)
            .await?;

        Ok(document)
    }

    async fn delete_document(&self, document_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_uploaded_by(&self, admin_id: Uuid) -> Result<Vec<UploadedDocument>, AppError> {
        let documents = sqlx::query_as::<_, UploadedDocument>(
            r#"
            SELECT d.*, po.order_number, po.sede_id, po.sede
            FROM documents d
            JOIN purchase_orders po ON po.id = d.purchase_order_id
            WHERE d.uploaded_by = $1
            ORDER BY d.created_at DESC
            "#,
        )
            .bind(admin_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(documents)
    }
}
