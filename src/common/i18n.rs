// src/common/i18n.rs

// Catálogo de mensagens de erro por idioma. O portal atende em espanhol;
// inglês fica como segunda opção para integrações.
#[derive(Debug, Clone)]
pub struct I18nStore {
    default_lang: &'static str,
}

impl Default for I18nStore {
    fn default() -> Self {
        Self { default_lang: "es" }
    }
}

impl I18nStore {
    pub fn translate<'a>(&self, lang: &str, key: &'a str) -> &'a str {
        lookup(lang, key)
            .or_else(|| lookup(self.default_lang, key))
            .unwrap_or(key)
    }
}

fn lookup(lang: &str, key: &str) -> Option<&'static str> {
    let msg = match (lang, key) {
        ("es", "validation") => "Uno o más campos son inválidos.",
        ("es", "not_found") => "Recurso no encontrado.",
        ("es", "session_required") => "Sesión ausente o inválida.",
        ("es", "invalid_sede_token") => "Sede o código de acceso inválido.",
        ("es", "invalid_credentials") => "Correo o contraseña inválidos.",
        ("es", "access_denied") => "No tiene permiso sobre esta sede.",
        ("es", "administering_required") => "Requiere permiso de edición sobre una sede administradora.",
        ("es", "email_exists") => "Este correo ya está en uso.",
        ("es", "sede_exists") => "Ya existe una sede con ese nombre.",
        ("es", "conflict") => "Conflicto al guardar; intente de nuevo.",
        ("es", "transient") => "Servicio temporalmente no disponible; intente de nuevo.",
        ("es", "document_record_pending") => {
            "El archivo fue eliminado pero el registro no; repita la eliminación."
        }
        ("es", "delivery_failed") => "No fue posible enviar el código.",
        ("es", "internal") => "Ocurrió un error inesperado.",

        ("en", "validation") => "One or more fields are invalid.",
        ("en", "not_found") => "Resource not found.",
        ("en", "session_required") => "Missing or invalid session.",
        ("en", "invalid_sede_token") => "Invalid sede or access code.",
        ("en", "invalid_credentials") => "Invalid email or password.",
        ("en", "access_denied") => "You do not have permission on this sede.",
        ("en", "administering_required") => "Requires edit permission on an administering sede.",
        ("en", "email_exists") => "This email is already in use.",
        ("en", "sede_exists") => "A sede with that name already exists.",
        ("en", "conflict") => "Conflict while saving; please retry.",
        ("en", "transient") => "Service temporarily unavailable; please retry.",
        ("en", "document_record_pending") => {
            "The file was removed but its record was not; repeat the deletion."
        }
        ("en", "delivery_failed") => "The access code could not be delivered.",
        ("en", "internal") => "An unexpected error occurred.",
        _ => return None,
    };
    Some(msg)
}
