pub mod access;
pub mod auth;
pub mod documents;
pub mod portal;
pub mod sedes;
pub mod tokens;
