pub mod access_service;
pub use access_service::AccessService;
pub mod auth;
pub use auth::AuthService;
pub mod order_service;
pub use order_service::OrderService;
pub mod sede_service;
pub use sede_service::SedeService;
pub mod token_service;
pub use token_service::TokenService;
