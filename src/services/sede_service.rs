// src/services/sede_service.rs

use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::store::SedeStore,
    models::{
        access::Capability,
        sede::{CreateSedePayload, PublicSede, Sede, UpdateSedePayload},
    },
    services::access_service::AccessService,
};

#[derive(Clone)]
pub struct SedeService {
    sedes: Arc<dyn SedeStore>,
    access: AccessService,
}

impl SedeService {
    pub fn new(sedes: Arc<dyn SedeStore>, access: AccessService) -> Self {
        Self { sedes, access }
    }

    /// Nomes exibidos no seletor do portal.
    pub async fn list_active_public(&self) -> Result<Vec<PublicSede>, AppError> {
        Ok(self
            .sedes
            .list_active_public()
            .await?
            .into_iter()
            .map(|s| PublicSede { name: s.name })
            .collect())
    }

    /// Cria a sede e dá ao criador view+edit sobre ela.
    /// A capacidade de administrar é verificada na rota.
    pub async fn create(&self, creator: Uuid, mut input: CreateSedePayload) -> Result<Sede, AppError> {
        input.name = input.name.trim().to_string();
        input.email = input.email.trim().to_string();
        input.validate()?;

        let sede = self.sedes.create(&input).await?;
        self.access.grant(creator, sede.id, true, true).await?;

        tracing::info!("🏢 Sede '{}' criada por {}", sede.name, creator);
        Ok(sede)
    }

    pub async fn update(&self, actor: Uuid, sede_id: Uuid, patch: UpdateSedePayload) -> Result<Sede, AppError> {
        patch.validate()?;
        self.access.ensure(actor, sede_id, Capability::CanEdit).await?;

        let sede = self
            .sedes
            .update(sede_id, &patch)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("sede {}", sede_id)))?;

        if patch.is_active == Some(false) {
            tracing::info!("🏢 Sede '{}' desativada por {}", sede.name, actor);
        }
        Ok(sede)
    }

    pub async fn get(&self, actor: Uuid, sede_id: Uuid) -> Result<Sede, AppError> {
        self.access.ensure(actor, sede_id, Capability::CanView).await?;
        self.find(sede_id).await
    }

    /// Sem verificação de capacidade; os chamadores já verificaram.
    pub async fn find(&self, sede_id: Uuid) -> Result<Sede, AppError> {
        self.sedes
            .find_by_id(sede_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("sede {}", sede_id)))
    }

    pub async fn list_for_admin(&self, admin_id: Uuid) -> Result<Vec<Sede>, AppError> {
        self.access.list_viewable_sedes(admin_id).await
    }
}
