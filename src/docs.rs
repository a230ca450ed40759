// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Portal (clientes) ---
        handlers::portal::list_sedes,
        handlers::portal::request_token,
        handlers::portal::create_session,
        handlers::portal::list_orders,
        handlers::portal::get_order,
        handlers::portal::download_document,

        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Sedes ---
        handlers::sedes::list_sedes,
        handlers::sedes::create_sede,
        handlers::sedes::get_sede,
        handlers::sedes::update_sede,

        // --- Códigos ---
        handlers::tokens::list_tokens,
        handlers::tokens::issue_token,
        handlers::tokens::regenerate_token,
        handlers::tokens::set_token_active,

        // --- Documentos ---
        handlers::documents::list_sede_orders,
        handlers::documents::list_order_documents,
        handlers::documents::upload_document,
        handlers::documents::my_documents,
        handlers::documents::download_document,
        handlers::documents::delete_document,

        // --- Acessos ---
        handlers::access::list_access,
        handlers::access::grant_access,
        handlers::access::revoke_access,
    ),
    components(
        schemas(
            // --- Sedes ---
            models::sede::Sede,
            models::sede::PublicSede,
            models::sede::CreateSedePayload,
            models::sede::UpdateSedePayload,

            // --- Códigos e sessão ---
            models::token::SedeToken,
            models::token::TokenRequestPayload,
            models::token::TokenRequestResponse,
            models::token::CreateSessionPayload,
            models::token::SessionResponse,
            models::token::IssueTokenPayload,
            models::token::AdminTokenResponse,
            models::token::SetTokenActivePayload,

            // --- Pedidos e documentos ---
            models::order::FileType,
            models::order::PurchaseOrder,
            models::order::Document,
            models::order::UploadedDocument,
            models::order::OrderWithDocuments,

            // --- Acessos ---
            models::access::AdminSedeAccess,
            models::access::GrantAccessPayload,

            // --- Auth ---
            models::auth::Admin,
            models::auth::RegisterAdminPayload,
            models::auth::LoginAdminPayload,
            models::auth::AuthResponse,
        )
    ),
    tags(
        (name = "Portal", description = "Acesso das sedes por código"),
        (name = "Auth", description = "Autenticação e Registro de admins"),
        (name = "Sedes", description = "Cadastro de sedes"),
        (name = "Tokens", description = "Códigos de acesso das sedes"),
        (name = "Documents", description = "Pedidos e documentos"),
        (name = "Access", description = "Concessões admin -> sede (can_view / can_edit)")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

// Dois bearers: o JWT do admin e a sessão aberta com o código da sede
impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
        components.add_security_scheme(
            "sede_session",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
