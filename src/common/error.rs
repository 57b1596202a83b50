use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de validación")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Insumo no encontrado: {0}")]
    ItemNotFound(Uuid),

    #[error("No hay suficiente stock disponible (disponible: {available}, solicitado: {requested})")]
    InsufficientStock { available: Decimal, requested: Decimal },

    // A quantidade já foi gravada no banco, mas o lançamento no histórico falhou.
    // O detalhe da falha só vai para o log.
    #[error("El stock del insumo {item_id} se actualizó, pero el movimiento no se registró.")]
    PartialLedger { item_id: Uuid },

    #[error("Sin datos para exportar: no hay insumos que coincidan con los filtros")]
    NothingToExport,

    #[error("Fuente no encontrada: {0}")]
    FontNotFound(String),

    #[error("Error al generar el reporte: {0}")]
    ReportRender(String),

    #[error("Integración no configurada: {0}")]
    IntegrationDisabled(&'static str),

    // Falha devolvida por um serviço remoto (storage, e-mail, WhatsApp...)
    #[error("Error del servicio remoto: {0}")]
    Remote(String),

    #[error("Error de base de datos: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Error HTTP: {0}")]
    HttpError(#[from] reqwest::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Error interno del servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientStock { .. } | AppError::NothingToExport => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::IntegrationDisabled(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Remote(_) | AppError::HttpError(_) => StatusCode::BAD_GATEWAY,
            AppError::PartialLedger { .. }
            | AppError::FontNotFound(_)
            | AppError::ReportRender(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error_message = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Uno o más campos son inválidos.",
                    "details": details,
                }));
                return (status, body).into_response();
            }

            // Banco e erros inesperados: loga o detalhe, devolve mensagem genérica.
            ref e @ (AppError::DatabaseError(_) | AppError::InternalServerError(_)) => {
                tracing::error!("Error interno del servidor: {}", e);
                "Ocurrió un error inesperado.".to_string()
            }

            e => {
                if status.is_server_error() {
                    tracing::error!("{}", e);
                }
                e.to_string()
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
