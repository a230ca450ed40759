pub mod access;
pub mod auth;
pub mod order;
pub mod sede;
pub mod token;
