//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod notifier;
mod routes;
mod services;
mod storage;

#[cfg(test)]
mod api_tests;

use crate::config::{connect_pool, AppConfig, AppState, Backends};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logger: RUST_LOG, ou o padrão abaixo
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("portal_backend=info,tower_http=info")),
        )
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = AppConfig::from_env()?;
    let pool = connect_pool(&config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    tokio::fs::create_dir_all(&config.blob_root).await?;
    tracing::info!("📁 Documentos em {}", config.blob_root.display());

    let bind_addr = config.bind_addr.clone();
    let backends = Backends::postgres(pool, &config);
    let app = routes::app_router(AppState::new(config, backends));

    // Inicia o servidor
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
