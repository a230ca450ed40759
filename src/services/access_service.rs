// src/services/access_service.rs

use std::{collections::HashSet, sync::Arc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{AccessStore, AdminStore, SedeStore},
    models::{
        access::{AdminSedeAccess, Capability},
        sede::Sede,
    },
};

/// Controle de acesso admin -> sede.
///
/// Toda ação de um admin sobre dados de uma sede passa por `check`/`ensure`.
/// Não há cache: cada verificação lê o registro durável, então uma revogação
/// vale a partir da próxima requisição.
#[derive(Clone)]
pub struct AccessService {
    access: Arc<dyn AccessStore>,
    sedes: Arc<dyn SedeStore>,
    admins: Arc<dyn AdminStore>,
}

impl AccessService {
    pub fn new(access: Arc<dyn AccessStore>, sedes: Arc<dyn SedeStore>, admins: Arc<dyn AdminStore>) -> Self {
        Self { access, sedes, admins }
    }

    /// Concede (ou sobrescreve) as capacidades de um admin sobre uma sede.
    pub async fn grant(
        &self,
        admin_id: Uuid,
        sede_id: Uuid,
        can_view: bool,
        can_edit: bool,
    ) -> Result<AdminSedeAccess, AppError> {
        self.admins
            .find_by_id(admin_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("admin {}", admin_id)))?;
        self.sedes
            .find_by_id(sede_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("sede {}", sede_id)))?;

        let access = self.access.upsert(admin_id, sede_id, can_view, can_edit).await?;
        tracing::info!(
            "🔑 Acesso concedido: admin {} -> sede {} (view={}, edit={})",
            admin_id,
            sede_id,
            can_view,
            can_edit
        );
        Ok(access)
    }

    /// Remove a concessão. Revogar o que não existe é NotFound.
    pub async fn revoke(&self, admin_id: Uuid, sede_id: Uuid) -> Result<(), AppError> {
        if !self.access.delete(admin_id, sede_id).await? {
            return Err(AppError::NotFound(format!("acesso {} -> {}", admin_id, sede_id)));
        }
        tracing::info!("🔒 Acesso revogado: admin {} -> sede {}", admin_id, sede_id);
        Ok(())
    }

    pub async fn check(&self, admin_id: Uuid, sede_id: Uuid, capability: Capability) -> Result<bool, AppError> {
        Ok(self
            .access
            .find(admin_id, sede_id)
            .await?
            .is_some_and(|a| a.allows(capability)))
    }

    pub async fn ensure(&self, admin_id: Uuid, sede_id: Uuid, capability: Capability) -> Result<(), AppError> {
        if self.check(admin_id, sede_id, capability).await? {
            Ok(())
        } else {
            tracing::warn!("⛔ Admin {} sem {} sobre a sede {}", admin_id, capability, sede_id);
            Err(AppError::AccessDenied { sede_id, capability })
        }
    }

    /// can_edit sobre alguma sede administradora ativa.
    pub async fn is_administering(&self, admin_id: Uuid) -> Result<bool, AppError> {
        self.access.has_on_admin_sede(admin_id, Capability::CanEdit).await
    }

    pub async fn ensure_administering(&self, admin_id: Uuid) -> Result<(), AppError> {
        if self.is_administering(admin_id).await? {
            Ok(())
        } else {
            Err(AppError::AdministeringRequired)
        }
    }

    pub async fn list_grants(&self, admin_id: Uuid) -> Result<Vec<AdminSedeAccess>, AppError> {
        self.access.list_for_admin(admin_id).await
    }

    pub async fn list_all_grants(&self) -> Result<Vec<AdminSedeAccess>, AppError> {
        self.access.list_all().await
    }

    /// Ids das sedes que o admin pode ver.
    pub async fn viewable_sede_ids(&self, admin_id: Uuid) -> Result<HashSet<Uuid>, AppError> {
        Ok(self
            .list_grants(admin_id)
            .await?
            .into_iter()
            .filter(|a| a.can_view)
            .map(|a| a.sede_id)
            .collect())
    }

    pub async fn list_viewable_sedes(&self, admin_id: Uuid) -> Result<Vec<Sede>, AppError> {
        let ids: Vec<Uuid> = self.viewable_sede_ids(admin_id).await?.into_iter().collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.sedes.list_by_ids(&ids).await
    }

    /// Primeiro admin do sistema: enquanto ninguém tiver concessão sobre uma
    /// sede administradora, quem se registra recebe view+edit em todas elas.
    pub async fn bootstrap_first_admin(&self, admin_id: Uuid) -> Result<bool, AppError> {
        if self.access.any_admin_sede_grant().await? {
            return Ok(false);
        }

        let admin_sedes = self.access.admin_sede_ids().await?;
        for sede_id in &admin_sedes {
            self.access.upsert(admin_id, *sede_id, true, true).await?;
        }

        if !admin_sedes.is_empty() {
            tracing::info!(
                "👑 Admin {} recebeu acesso às {} sede(s) administradora(s)",
                admin_id,
                admin_sedes.len()
            );
        }
        Ok(!admin_sedes.is_empty())
    }
}
