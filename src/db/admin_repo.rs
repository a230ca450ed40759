// src/db/admin_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{store::AdminStore, unique_violation},
    models::auth::Admin,
};

// O repositório de administradores, responsável por todas as interações com a tabela 'admins'
#[derive(Clone)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminStore for AdminRepository {
    // Busca um administrador pelo seu e-mail
    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>, AppError> {
        let admin = sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(admin)
    }

    // Busca um administrador pelo seu ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Admin>, AppError> {
        let admin = sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(admin)
    }

    // Cria um novo administrador no banco de dados
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        full_name: &str,
        company: Option<&str>,
    ) -> Result<Admin, AppError> {
        sqlx::query_as::<_, Admin>(
            r#"
            INSERT INTO admins (email, password_hash, full_name, company)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
            .bind(email)
            .bind(password_hash)
            .bind(full_name)
            .bind(company)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                // Converte erro de violação de chave única em um erro mais amigável
                if unique_violation(&e).is_some() {
                    return AppError::EmailAlreadyExists;
                }
                e.into()
            })
    }
}
