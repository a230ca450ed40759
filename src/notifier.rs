// src/notifier.rs

//! Entrega do código de acesso à sede (fora de banda).

use async_trait::async_trait;
use thiserror::Error;

use crate::common::error::AppError;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Destinatário inválido: {0}")]
    InvalidRecipient(String),

    #[error("Falha na entrega: {0}")]
    Delivery(String),
}

// Falha de entrega é sucesso parcial: o código já foi emitido
impl From<NotifyError> for AppError {
    fn from(e: NotifyError) -> Self {
        AppError::DeliveryFailed(e.to_string())
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: &str, sede: &str, token: &str, is_new: bool) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMessage {
    pub subject: String,
    pub body: String,
}

/// Mensagem enviada à sede, em espanhol como o portal.
pub fn render_token_message(sede: &str, token: &str, is_new: bool) -> TokenMessage {
    let status = if is_new {
        "ha sido generado"
    } else {
        "sigue siendo válido"
    };

    TokenMessage {
        subject: format!("Código de acceso para {}", sede),
        body: format!(
            "Hola,\n\n\
             Su código de acceso al Portal de Órdenes de Compra para la sede {sede} {status}:\n\n\
             {token}\n\n\
             Ingrese este código junto con el nombre de su sede para consultar sus órdenes y documentos.\n\
             Si usted no solicitó este código, puede ignorar este mensaje.\n"
        ),
    }
}

/// Backend de desenvolvimento: renderiza a mensagem e registra a entrega no log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: &str, sede: &str, token: &str, is_new: bool) -> Result<(), NotifyError> {
        if !email.contains('@') {
            return Err(NotifyError::InvalidRecipient(email.to_string()));
        }

        let message = render_token_message(sede, token, is_new);
        tracing::info!(
            to = %email,
            subject = %message.subject,
            "📧 Código de acesso entregue\n{}",
            message.body
        );
        Ok(())
    }
}
