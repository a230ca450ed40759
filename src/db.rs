pub mod access_repo;
pub use access_repo::AccessRepository;
pub mod admin_repo;
pub use admin_repo::AdminRepository;
pub mod order_repo;
pub use order_repo::OrderRepository;
pub mod sede_repo;
pub use sede_repo::SedeRepository;
pub mod token_repo;
pub use token_repo::TokenRepository;

pub mod store;

#[cfg(test)]
pub mod memory;

// Se o erro for violação de unicidade, devolve o nome da constraint ("" se o driver não informar).
pub(crate) fn unique_violation(e: &sqlx::Error) -> Option<&str> {
    let db_err = e.as_database_error()?;
    if db_err.is_unique_violation() {
        Some(db_err.constraint().unwrap_or(""))
    } else {
        None
    }
}
