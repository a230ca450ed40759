// src/services/order_service.rs

//! Resolução de pedidos e documentos, sempre dentro do escopo de uma sede.

use chrono::Utc;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{OrderStore, SedeStore},
    models::{
        access::Capability,
        order::{Document, DocumentContent, FileType, NewDocument, PurchaseOrder, UploadRequest, UploadedDocument},
        sede::Sede,
        token::SessionGrant,
    },
    services::access_service::AccessService,
    storage::{object_path, timed, BlobError, BlobStore},
};

const MAX_ORDER_NUMBER_LEN: usize = 64;
const DEFAULT_MIME: &str = "application/octet-stream";

#[derive(Clone)]
pub struct OrderService {
    sedes: Arc<dyn SedeStore>,
    orders: Arc<dyn OrderStore>,
    blobs: Arc<dyn BlobStore>,
    access: AccessService,
    max_upload_bytes: usize,
    blob_timeout: Duration,
}

impl OrderService {
    pub fn new(
        sedes: Arc<dyn SedeStore>,
        orders: Arc<dyn OrderStore>,
        blobs: Arc<dyn BlobStore>,
        access: AccessService,
        max_upload_bytes: usize,
        blob_timeout: Duration,
    ) -> Self {
        Self {
            sedes,
            orders,
            blobs,
            access,
            max_upload_bytes,
            blob_timeout,
        }
    }

    // =========================================================================
    //  PORTAL DA SEDE
    // =========================================================================

    /// Busca exata dentro da sede da sessão. Pedido de outra sede é
    /// indistinguível de pedido inexistente.
    pub async fn find_order(&self, grant: &SessionGrant, order_number: &str) -> Result<PurchaseOrder, AppError> {
        self.orders
            .find_order(grant.sede_id, order_number.trim())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("pedido '{}' na sede '{}'", order_number, grant.sede)))
    }

    pub async fn list_orders(&self, grant: &SessionGrant) -> Result<Vec<PurchaseOrder>, AppError> {
        self.orders.list_orders(grant.sede_id).await
    }

    /// Sem nova verificação de sede: o id só chega aqui depois de resolvido no escopo.
    pub async fn list_documents(&self, purchase_order_id: Uuid) -> Result<Vec<Document>, AppError> {
        self.orders.list_documents(purchase_order_id).await
    }

    pub async fn download(
        &self,
        grant: &SessionGrant,
        order_number: &str,
        document_id: Uuid,
    ) -> Result<DocumentContent, AppError> {
        let order = self.find_order(grant, order_number).await?;
        let document = self
            .orders
            .find_document(document_id)
            .await?
            .filter(|d| d.purchase_order_id == order.id)
            .ok_or_else(|| AppError::NotFound(format!("documento {} no pedido {}", document_id, order.id)))?;

        self.read_blob(document).await
    }

    // =========================================================================
    //  PAINEL ADMINISTRATIVO
    // =========================================================================

    pub async fn admin_list_orders(&self, actor: Uuid, sede_id: Uuid) -> Result<Vec<PurchaseOrder>, AppError> {
        self.access.ensure(actor, sede_id, Capability::CanView).await?;
        self.orders.list_orders(sede_id).await
    }

    pub async fn admin_list_documents(&self, actor: Uuid, order_id: Uuid) -> Result<Vec<Document>, AppError> {
        let order = self.order_by_id(order_id).await?;
        self.access.ensure(actor, order.sede_id, Capability::CanView).await?;
        self.list_documents(order.id).await
    }

    pub async fn admin_download(&self, actor: Uuid, document_id: Uuid) -> Result<DocumentContent, AppError> {
        let (document, order) = self.document_with_order(document_id).await?;
        self.access.ensure(actor, order.sede_id, Capability::CanView).await?;
        self.read_blob(document).await
    }

    /// Uploads do admin, mais recentes primeiro, só das sedes que ele ainda vê.
    pub async fn list_uploaded_by(&self, admin_id: Uuid) -> Result<Vec<UploadedDocument>, AppError> {
        let viewable = self.access.viewable_sede_ids(admin_id).await?;
        Ok(self
            .orders
            .list_uploaded_by(admin_id)
            .await?
            .into_iter()
            .filter(|d| viewable.contains(&d.sede_id))
            .collect())
    }

    /// Anexa um documento ao pedido, criando o pedido na primeira vez.
    pub async fn upload(&self, request: UploadRequest, bytes: &[u8]) -> Result<Document, AppError> {
        self.access
            .ensure(request.uploader, request.sede_id, Capability::CanEdit)
            .await?;

        let file_type: FileType = request.file_type.trim().parse().map_err(|_| {
            AppError::invalid_field(
                "fileType",
                "file_type",
                "Tipo de documento inválido: use purchase_order_copy o delivery_note.",
            )
        })?;

        if bytes.is_empty() || bytes.len() > self.max_upload_bytes {
            return Err(file_size_error(self.max_upload_bytes));
        }

        let order_number = checked_order_number(&request.order_number)?;
        let original_filename = request.original_filename.trim();
        if original_filename.is_empty() {
            return Err(AppError::invalid_field(
                "filename",
                "required",
                "El nombre del archivo es obligatorio.",
            ));
        }

        let sede = self
            .sedes
            .find_by_id(request.sede_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| AppError::NotFound(format!("sede {}", request.sede_id)))?;

        // O pedido só nasce depois que o arquivo foi gravado
        let path = object_path(request.uploader, original_filename, Utc::now());
        let stored_path = timed(self.blob_timeout, self.blobs.put(&path, bytes)).await?;

        let order = match self.resolve_or_create_order(&sede, &order_number, request.uploader).await {
            Ok(order) => order,
            Err(e) => {
                self.discard_blob(&stored_path).await;
                return Err(e);
            }
        };

        let mime_type = match request.mime_type.trim() {
            "" => DEFAULT_MIME.to_string(),
            mime => mime.to_string(),
        };

        let new_document = NewDocument {
            purchase_order_id: order.id,
            filename: stored_path.rsplit('/').next().unwrap_or_default().to_string(),
            original_filename: original_filename.to_string(),
            file_type,
            file_size: bytes.len() as i64,
            mime_type,
            file_path: stored_path.clone(),
            uploaded_by: request.uploader,
        };

        let document = match self.orders.insert_document(&new_document).await {
            Ok(document) => document,
            Err(e) => {
                self.discard_blob(&stored_path).await;
                return Err(e);
            }
        };

        if let Err(e) = self.orders.touch_order(order.id).await {
            tracing::warn!("Não foi possível atualizar o pedido {}: {}", order.id, e);
        }

        tracing::info!(
            "📄 Documento {} ({}) anexado ao pedido '{}' da sede '{}' por {}",
            document.id,
            file_type,
            order.order_number,
            sede.name,
            request.uploader
        );
        Ok(document)
    }

    /// Remove primeiro o blob, depois o registro.
    ///
    /// - blob já ausente conta como removido;
    /// - falha no blob não impede a remoção do registro (o blob fica no log);
    /// - falha no registro vira `DocumentRecordPending`, e repetir o DELETE converge.
    pub async fn delete(&self, actor: Uuid, document_id: Uuid) -> Result<(), AppError> {
        let (document, order) = self.document_with_order(document_id).await?;
        self.access.ensure(actor, order.sede_id, Capability::CanEdit).await?;

        match timed(self.blob_timeout, self.blobs.delete(&document.file_path)).await {
            Ok(()) => {}
            Err(BlobError::NotFound(_)) => {
                tracing::debug!("Blob '{}' já não existia", document.file_path);
            }
            Err(e) => {
                tracing::warn!(
                    "🗑️ Blob órfão '{}' do documento {}: {}",
                    document.file_path,
                    document.id,
                    e
                );
            }
        }

        if let Err(e) = self.orders.delete_document(document.id).await {
            tracing::error!("Registro do documento {} não removido: {}", document.id, e);
            return Err(AppError::DocumentRecordPending(document.id));
        }

        tracing::info!(
            "🗑️ Documento {} removido do pedido '{}' por {}",
            document.id,
            order.order_number,
            actor
        );
        Ok(())
    }

    // =========================================================================
    //  AUXILIARES
    // =========================================================================

    async fn resolve_or_create_order(
        &self,
        sede: &Sede,
        order_number: &str,
        created_by: Uuid,
    ) -> Result<PurchaseOrder, AppError> {
        if let Some(order) = self.orders.find_order(sede.id, order_number).await? {
            return Ok(order);
        }

        match self.orders.insert_order(sede, order_number, created_by).await {
            Ok(order) => Ok(order),
            Err(AppError::Conflict(_)) => self
                .orders
                .find_order(sede.id, order_number)
                .await?
                .ok_or_else(|| AppError::from(anyhow::anyhow!("pedido '{}' sumiu após conflito", order_number))),
            Err(e) => Err(e),
        }
    }

    async fn order_by_id(&self, order_id: Uuid) -> Result<PurchaseOrder, AppError> {
        self.orders
            .find_order_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("pedido {}", order_id)))
    }

    async fn document_with_order(&self, document_id: Uuid) -> Result<(Document, PurchaseOrder), AppError> {
        let document = self
            .orders
            .find_document(document_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("documento {}", document_id)))?;
        let order = self.order_by_id(document.purchase_order_id).await?;
        Ok((document, order))
    }

    // Sem registro o blob ficaria órfão
    async fn discard_blob(&self, path: &str) {
        if let Err(e) = timed(self.blob_timeout, self.blobs.delete(path)).await {
            tracing::warn!("🗑️ Blob órfão '{}' após falha no registro: {}", path, e);
        }
    }

    async fn read_blob(&self, document: Document) -> Result<DocumentContent, AppError> {
        let bytes = timed(self.blob_timeout, self.blobs.get(&document.file_path)).await?;
        Ok(DocumentContent { document, bytes })
    }
}

/// Erro de tamanho do arquivo, também usado quando o corpo passa do limite da rota.
pub fn file_size_error(max_upload_bytes: usize) -> AppError {
    AppError::invalid_field(
        "file",
        "file_size",
        format!("El archivo debe tener entre 1 byte y {} bytes.", max_upload_bytes),
    )
}

fn checked_order_number(raw: &str) -> Result<String, AppError> {
    let order_number = raw.trim();
    if order_number.is_empty() || order_number.len() > MAX_ORDER_NUMBER_LEN {
        return Err(AppError::invalid_field(
            "orderNumber",
            "length",
            format!("El número de orden debe tener entre 1 y {} caracteres.", MAX_ORDER_NUMBER_LEN),
        ));
    }
    Ok(order_number.to_string())
}
