// src/models/token.rs

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

pub const TOKEN_LEN: usize = 6;
const TOKEN_SPACE: u32 = 1_000_000;

/// Código de acesso de uma sede: exatamente 6 dígitos ASCII.
/// Zeros à esquerda contam ("004821" != "4821").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenCode(String);

impl TokenCode {
    /// Aceita só o formato exato; qualquer outra coisa é `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() == TOKEN_LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    /// Sorteio uniforme em 000000..=999999.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let n = rng.gen_range(0..TOKEN_SPACE);
        Self(format!("{:06}", n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalização na borda HTTP: remove espaços e hífens de formatação
/// ("482 913", "482-913"). Letras e outros símbolos ficam, e o formato é rejeitado depois.
pub fn normalize_submitted(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != '-')
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SedeToken {
    pub id: Uuid,
    pub sede_id: Uuid,
    pub sede: String,
    pub token: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Resultado de `issue_or_reuse`.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: SedeToken,
    pub is_new: bool,
}

/// Autorização de sessão de uma sede, produzida por `validate`.
/// Passada explicitamente a toda chamada do resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub sede_id: Uuid,
    pub sede: String,
    pub token_id: Uuid,
    pub issued_at: DateTime<Utc>,
}

// Claims do JWT que transporta o SessionGrant. Sem `exp`: vale enquanto o código estiver ativo.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub sede: String,
    pub tid: Uuid,
    pub iat: usize,
    pub kind: String,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequestPayload {
    pub sede: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequestResponse {
    pub message: String,
    pub is_new: bool,
    pub delivered: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionPayload {
    pub sede: String,
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    pub sede: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenPayload {
    // Se ausente, usa o e-mail cadastrado da sede
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminTokenResponse {
    #[serde(flatten)]
    pub token: SedeToken,
    pub is_new: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetTokenActivePayload {
    pub is_active: bool,
}
