// src/db/store.rs

//! Contratos do armazenamento de entidades.
//!
//! Os serviços dependem destes traits, não do Postgres diretamente. As
//! implementações de produção são os repositórios `*_repo.rs`; os testes usam
//! `db::memory::MemoryStore`, que respeita as mesmas restrições de unicidade
//! das migrations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        access::{AdminSedeAccess, Capability},
        auth::Admin,
        order::{Document, NewDocument, PurchaseOrder, UploadedDocument},
        sede::{CreateSedePayload, Sede, UpdateSedePayload},
        token::{SedeToken, TokenCode},
    },
};

#[async_trait]
pub trait SedeStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Sede>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Sede>, AppError>;

    /// Sedes ativas que não são administradoras, por nome.
    async fn list_active_public(&self) -> Result<Vec<Sede>, AppError>;

    async fn list_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Sede>, AppError>;

    /// Nome duplicado vira `AppError::SedeAlreadyExists`.
    async fn create(&self, input: &CreateSedePayload) -> Result<Sede, AppError>;

    async fn update(&self, id: Uuid, patch: &UpdateSedePayload) -> Result<Option<Sede>, AppError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn find_active(&self, sede_id: Uuid) -> Result<Option<SedeToken>, AppError>;

    /// Código ativo de uma sede ativa, comparação exata.
    async fn find_active_match(&self, sede_name: &str, token: &str) -> Result<Option<SedeToken>, AppError>;

    async fn find_by_id(&self, token_id: Uuid) -> Result<Option<SedeToken>, AppError>;

    /// Histórico da sede, mais recente primeiro.
    async fn list_for_sede(&self, sede_id: Uuid) -> Result<Vec<SedeToken>, AppError>;

    /// Insere como o único código ativo da sede.
    ///
    /// - `AppError::Conflict` se a sede já tem código ativo (corrida).
    /// - `AppError::TokenCollision` se o valor já está ativo em outra sede.
    async fn insert_active(&self, sede: &Sede, code: &TokenCode, email: &str) -> Result<SedeToken, AppError>;

    /// Desativa todos os códigos ativos da sede. Retorna quantos mudaram.
    async fn deactivate_all(&self, sede_id: Uuid) -> Result<u64, AppError>;

    async fn deactivate(&self, token_id: Uuid) -> Result<Option<SedeToken>, AppError>;

    /// Ativa um código antigo, desativando os outros da sede na mesma operação.
    /// `AppError::TokenCollision` se o valor já está ativo em outra sede.
    async fn activate(&self, token_id: Uuid) -> Result<Option<SedeToken>, AppError>;

    async fn touch_last_used(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;

    /// O código `token_id` ainda é o ativo da sede?
    async fn is_active_for(&self, token_id: Uuid, sede_id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_order(&self, sede_id: Uuid, order_number: &str) -> Result<Option<PurchaseOrder>, AppError>;

    async fn find_order_by_id(&self, order_id: Uuid) -> Result<Option<PurchaseOrder>, AppError>;

    /// `AppError::Conflict` se (sede, order_number) já existe.
    async fn insert_order(
        &self,
        sede: &Sede,
        order_number: &str,
        created_by: Uuid,
    ) -> Result<PurchaseOrder, AppError>;

    async fn touch_order(&self, order_id: Uuid) -> Result<(), AppError>;

    /// Mais recente primeiro.
    async fn list_orders(&self, sede_id: Uuid) -> Result<Vec<PurchaseOrder>, AppError>;

    async fn list_documents(&self, order_id: Uuid) -> Result<Vec<Document>, AppError>;

    async fn find_document(&self, document_id: Uuid) -> Result<Option<Document>, AppError>;

    async fn insert_document(&self, doc: &NewDocument) -> Result<Document, AppError>;

    /// `true` se havia registro.
    async fn delete_document(&self, document_id: Uuid) -> Result<bool, AppError>;

    async fn list_uploaded_by(&self, admin_id: Uuid) -> Result<Vec<UploadedDocument>, AppError>;
}

#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Um registro por (admin, sede); chamadas repetidas sobrescrevem as flags.
    async fn upsert(
        &self,
        admin_id: Uuid,
        sede_id: Uuid,
        can_view: bool,
        can_edit: bool,
    ) -> Result<AdminSedeAccess, AppError>;

    async fn delete(&self, admin_id: Uuid, sede_id: Uuid) -> Result<bool, AppError>;

    async fn find(&self, admin_id: Uuid, sede_id: Uuid) -> Result<Option<AdminSedeAccess>, AppError>;

    async fn list_for_admin(&self, admin_id: Uuid) -> Result<Vec<AdminSedeAccess>, AppError>;

    async fn list_all(&self) -> Result<Vec<AdminSedeAccess>, AppError>;

    /// O admin tem a capacidade em alguma sede administradora?
    async fn has_on_admin_sede(&self, admin_id: Uuid, capability: Capability) -> Result<bool, AppError>;

    /// Existe alguma concessão sobre sedes administradoras?
    async fn any_admin_sede_grant(&self) -> Result<bool, AppError>;

    async fn admin_sede_ids(&self) -> Result<Vec<Uuid>, AppError>;
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Admin>, AppError>;

    /// E-mail duplicado vira `AppError::EmailAlreadyExists`.
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        full_name: &str,
        company: Option<&str>,
    ) -> Result<Admin, AppError>;
}
