// src/storage.rs

//! Armazenamento binário dos documentos.
//!
//! Os serviços só conhecem o trait `BlobStore`. Em produção o backend é o
//! sistema de arquivos local (`LocalBlobStore`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    future::Future,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use uuid::Uuid;

use crate::common::error::AppError;

const MAX_EXTENSION_LEN: usize = 10;
const FALLBACK_EXTENSION: &str = "bin";

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Blob não encontrado: {0}")]
    NotFound(String),

    #[error("Caminho de blob inválido: {0}")]
    InvalidPath(String),

    #[error("Tempo esgotado no blob store")]
    TimedOut,

    #[error("Erro de E/S no blob store: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BlobError> for AppError {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::NotFound(path) => AppError::NotFound(format!("blob {}", path)),
            BlobError::TimedOut => AppError::Transient(e.to_string()),
            other => AppError::StorageError(other.to_string()),
        }
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Grava o conteúdo em `path` e devolve o caminho gravado.
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<String, BlobError>;

    async fn get(&self, path: &str) -> Result<Vec<u8>, BlobError>;

    /// `BlobError::NotFound` se não havia nada em `path`.
    async fn delete(&self, path: &str) -> Result<(), BlobError>;
}

/// Aplica o limite de tempo configurado a uma chamada ao blob store.
pub async fn timed<T, F>(limit: Duration, call: F) -> Result<T, BlobError>
where
    F: Future<Output = Result<T, BlobError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| BlobError::TimedOut)?
}

/// Caminho de um novo documento: `{uploader}/{unix_millis}-{uuid}.{ext}`.
pub fn object_path(uploader: Uuid, original_filename: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}/{}-{}.{}",
        uploader,
        now.timestamp_millis(),
        Uuid::new_v4(),
        file_extension(original_filename)
    )
}

/// Extensão do nome original, só ASCII alfanumérico, minúscula, até 10 caracteres.
pub fn file_extension(original_filename: &str) -> String {
    let Some((stem, ext)) = original_filename.rsplit_once('.') else {
        return FALLBACK_EXTENSION.to_string();
    };
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.bytes().all(|b| b.is_ascii_alphanumeric())
    {
        return FALLBACK_EXTENSION.to_string();
    }
    ext.to_ascii_lowercase()
}

// ---
// Backend local
// ---

#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    // Só caminhos relativos, sem `..`, dentro da raiz
    fn resolve(&self, path: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(path);
        if path.is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(BlobError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn not_found_or_io(e: std::io::Error, path: &str) -> BlobError {
    if e.kind() == ErrorKind::NotFound {
        BlobError::NotFound(path.to_string())
    } else {
        BlobError::Io(e)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<String, BlobError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Grava num temporário e renomeia: leitores nunca veem arquivo pela metade
        let mut partial = full.clone().into_os_string();
        partial.push(".part");
        let partial = PathBuf::from(partial);
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &full).await?;

        Ok(path.to_string())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, BlobError> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full).await.map_err(|e| not_found_or_io(e, path))
    }

    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        let full = self.resolve(path)?;
        tokio::fs::remove_file(&full).await.map_err(|e| not_found_or_io(e, path))
    }
}

// ---
// Backend em memória (testes)
// ---
