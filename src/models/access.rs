// src/models/access.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// As duas capacidades independentes que um admin pode ter sobre uma sede.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CanView,
    CanEdit,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::CanView => f.write_str("can_view"),
            Capability::CanEdit => f.write_str("can_edit"),
        }
    }
}

// Registro de concessão admin -> sede. Sem registro, sem acesso.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminSedeAccess {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub sede_id: Uuid,
    pub can_view: bool,
    pub can_edit: bool,
    pub created_at: DateTime<Utc>,
}

impl AdminSedeAccess {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::CanView => self.can_view,
            Capability::CanEdit => self.can_edit,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrantAccessPayload {
    pub admin_id: Uuid,
    pub sede_id: Uuid,
    pub can_view: bool,
    pub can_edit: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAccessQuery {
    pub admin_id: Option<Uuid>,
}
