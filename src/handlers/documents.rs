// src/handlers/documents.rs

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedAdmin, i18n::Locale},
    models::order::{Document, DocumentContent, FileType, PurchaseOrder, UploadParams, UploadRequest, UploadedDocument},
    services::order_service::file_size_error,
};

/// Resposta binária com o nome original do arquivo.
pub fn content_response(content: DocumentContent) -> Response {
    let content_type = HeaderValue::from_str(&content.document.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = format!(
        "attachment; filename=\"{}\"",
        ascii_filename(&content.document.original_filename)
    );

    let mut response = content.bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

// Nome seguro para o Content-Disposition: ASCII imprimível, sem aspas nem barras
fn ascii_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    if cleaned.trim().is_empty() {
        "documento".to_string()
    } else {
        cleaned
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/sedes/{sede_id}/orders",
    tag = "Documents",
    params(
        ("sede_id" = Uuid, Path, description = "ID da sede")
    ),
    responses(
        (status = 200, description = "Pedidos da sede", body = Vec<PurchaseOrder>),
        (status = 403, description = "Sem can_view")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_sede_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Path(sede_id): Path<Uuid>,
) -> Result<Json<Vec<PurchaseOrder>>, ApiError> {
    let orders = app_state
        .order_service
        .admin_list_orders(admin.id, sede_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(orders))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{order_id}/documents",
    tag = "Documents",
    params(
        ("order_id" = Uuid, Path, description = "ID do pedido")
    ),
    responses(
        (status = 200, description = "Documentos do pedido", body = Vec<Document>),
        (status = 403, description = "Sem can_view")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_order_documents(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let documents = app_state
        .order_service
        .admin_list_documents(admin.id, order_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(documents))
}

/// Upload com o arquivo cru no corpo; metadados na query string e o MIME no Content-Type.
#[utoipa::path(
    post,
    path = "/api/admin/sedes/{sede_id}/documents",
    tag = "Documents",
    params(
        ("sede_id" = Uuid, Path, description = "ID da sede"),
        ("orderNumber" = String, Query, description = "Número do pedido (criado no primeiro upload)"),
        ("fileType" = FileType, Query, description = "purchase_order_copy ou delivery_note"),
        ("filename" = String, Query, description = "Nome original do arquivo")
    ),
    request_body(content = String, description = "Arquivo cru; o Content-Type é o MIME", content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Documento anexado", body = Document),
        (status = 400, description = "Tipo, tamanho ou número do pedido inválido"),
        (status = 403, description = "Sem can_edit"),
        (status = 503, description = "Blob store indisponível")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_document(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Path(sede_id): Path<Uuid>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // Corpo acima do limite da rota: mesmo erro de tamanho que o serviço devolve
    let body = body.map_err(|rejection| {
        let err = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            file_size_error(app_state.config.max_upload_bytes)
        } else {
            AppError::invalid_field("file", "body", rejection.body_text())
        };
        err.to_api_error(&locale, &app_state.i18n_store)
    })?;

    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let request = UploadRequest {
        order_number: params.order_number,
        sede_id,
        file_type: params.file_type,
        original_filename: params.filename,
        mime_type,
        uploader: admin.id,
    };

    let document = app_state
        .order_service
        .upload(request, &body)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    get,
    path = "/api/admin/documents/mine",
    tag = "Documents",
    responses(
        (status = 200, description = "Uploads do admin, mais recentes primeiro", body = Vec<UploadedDocument>)
    ),
    security(("api_jwt" = []))
)]
pub async fn my_documents(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
) -> Result<Json<Vec<UploadedDocument>>, ApiError> {
    let documents = app_state
        .order_service
        .list_uploaded_by(admin.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(documents))
}

#[utoipa::path(
    get,
    path = "/api/admin/documents/{document_id}/content",
    tag = "Documents",
    params(
        ("document_id" = Uuid, Path, description = "ID do documento")
    ),
    responses(
        (status = 200, description = "Conteúdo do arquivo"),
        (status = 403, description = "Sem can_view"),
        (status = 404, description = "Documento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn download_document(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Path(document_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let content = app_state
        .order_service
        .admin_download(admin.id, document_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(content_response(content))
}

#[utoipa::path(
    delete,
    path = "/api/admin/documents/{document_id}",
    tag = "Documents",
    params(
        ("document_id" = Uuid, Path, description = "ID do documento")
    ),
    responses(
        (status = 204, description = "Documento removido"),
        (status = 403, description = "Sem can_edit"),
        (status = 503, description = "Registro pendente; repita o DELETE")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_document(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Path(document_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .order_service
        .delete(admin.id, document_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
