// src/config.rs

use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::{env, fmt::Display, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use crate::{
    common::i18n::I18nStore,
    db::{
        store::{AccessStore, AdminStore, OrderStore, SedeStore, TokenStore},
        AccessRepository, AdminRepository, OrderRepository, SedeRepository, TokenRepository,
    },
    notifier::{LogNotifier, Notifier},
    services::{AccessService, AuthService, OrderService, SedeService, TokenService},
    storage::{BlobStore, LocalBlobStore},
};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub blob_root: PathBuf,
    pub max_upload_bytes: usize,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub db_statement_timeout: Duration,
    pub blob_timeout: Duration,
    pub admin_session_days: i64,
    pub cors_allow_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} deve ser definida", key))
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            blob_root: get("BLOB_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./storage/purchase-documents")),
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(parse_or(&get, "DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            db_statement_timeout: Duration::from_secs(parse_or(&get, "DB_STATEMENT_TIMEOUT_SECS", 5)?),
            blob_timeout: Duration::from_secs(parse_or(&get, "BLOB_TIMEOUT_SECS", 10)?),
            admin_session_days: parse_or(&get, "ADMIN_SESSION_DAYS", 7)?,
            cors_allow_origin: get("CORS_ALLOW_ORIGIN").filter(|v| !v.trim().is_empty()),
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválida ('{}'): {}", key, raw, e)),
    }
}

/// Abre o pool do Postgres com timeout de aquisição e `statement_timeout` por conexão.
pub async fn connect_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    let statement_timeout = config.db_statement_timeout.as_millis().to_string();
    let options = config
        .database_url
        .parse::<PgConnectOptions>()
        .context("DATABASE_URL inválida")?
        .options([("statement_timeout", statement_timeout.as_str())]);

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_acquire_timeout)
        .connect_with(options)
        .await
        .context("Falha ao conectar ao banco de dados")?;

    tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
    Ok(pool)
}

/// Implementações concretas dos colaboradores externos.
#[derive(Clone)]
pub struct Backends {
    pub sedes: Arc<dyn SedeStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub orders: Arc<dyn OrderStore>,
    pub access: Arc<dyn AccessStore>,
    pub admins: Arc<dyn AdminStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl Backends {
    pub fn postgres(pool: PgPool, config: &AppConfig) -> Self {
        Self {
            sedes: Arc::new(SedeRepository::new(pool.clone())),
            tokens: Arc::new(TokenRepository::new(pool.clone())),
            orders: Arc::new(OrderRepository::new(pool.clone())),
            access: Arc::new(AccessRepository::new(pool.clone())),
            admins: Arc::new(AdminRepository::new(pool)),
            blobs: Arc::new(LocalBlobStore::new(config.blob_root.clone())),
            notifier: Arc::new(LogNotifier),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub i18n_store: I18nStore,
    pub auth_service: AuthService,
    pub access_service: AccessService,
    pub sede_service: SedeService,
    pub token_service: TokenService,
    pub order_service: OrderService,
}

impl AppState {
    // --- Monta o gráfico de dependências ---
    pub fn new(config: AppConfig, backends: Backends) -> Self {
        let access_service = AccessService::new(
            backends.access.clone(),
            backends.sedes.clone(),
            backends.admins.clone(),
        );
        let auth_service = AuthService::new(
            backends.admins.clone(),
            access_service.clone(),
            config.jwt_secret.clone(),
            config.admin_session_days,
        );
        let sede_service = SedeService::new(backends.sedes.clone(), access_service.clone());
        let token_service = TokenService::new(
            backends.sedes.clone(),
            backends.tokens.clone(),
            backends.notifier.clone(),
            access_service.clone(),
            config.jwt_secret.clone(),
        );
        let order_service = OrderService::new(
            backends.sedes.clone(),
            backends.orders.clone(),
            backends.blobs.clone(),
            access_service.clone(),
            config.max_upload_bytes,
            config.blob_timeout,
        );

        Self {
            config: Arc::new(config),
            i18n_store: I18nStore::default(),
            auth_service,
            access_service,
            sede_service,
            token_service,
            order_service,
        }
    }
}
