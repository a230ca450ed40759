// src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums ---

/// Tipos de documento aceitos (conjunto fechado).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "document_file_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    PurchaseOrderCopy,
    DeliveryNote,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::PurchaseOrderCopy => "purchase_order_copy",
            FileType::DeliveryNote => "delivery_note",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = ();

    // Aceita também os rótulos antigos do painel ("orden_compra", "remision")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase_order_copy" | "orden_compra" => Ok(FileType::PurchaseOrderCopy),
            "delivery_note" | "remision" => Ok(FileType::DeliveryNote),
            _ => Err(()),
        }
    }
}

// --- Entidades ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub order_number: String,
    pub sede_id: Uuid,
    pub sede: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub filename: String,
    pub original_filename: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub mime_type: String,
    // Caminho interno no blob store; não sai na API
    #[serde(skip_serializing)]
    pub file_path: String,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Documento com o contexto do pedido (aba "meus documentos" do painel).
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedDocument {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub document: Document,
    pub order_number: String,
    pub sede_id: Uuid,
    pub sede: String,
}

/// Dados para inserir um documento (o id e a data vêm do banco).
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub purchase_order_id: Uuid,
    pub filename: String,
    pub original_filename: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub mime_type: String,
    pub file_path: String,
    pub uploaded_by: Uuid,
}

/// Entrada do `upload`.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub order_number: String,
    pub sede_id: Uuid,
    pub file_type: String,
    pub original_filename: String,
    pub mime_type: String,
    pub uploader: Uuid,
}

/// Conteúdo de um documento baixado.
#[derive(Debug, Clone)]
pub struct DocumentContent {
    pub document: Document,
    pub bytes: Vec<u8>,
}

// --- Payloads ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithDocuments {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub documents: Vec<Document>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadParams {
    pub order_number: String,
    pub file_type: String,
    pub filename: String,
}
