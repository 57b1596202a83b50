// src/handlers/messaging.rs

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::reports::{SendReportPayload, SendReportResponse},
};

const MISSING_PARAMS: &str = "Faltan parámetros 'to' o 'mediaUrl'";

// Aqui o corpo de erro é sempre {success:false, error}, não o formato do AppError.
type RelayResponse = (StatusCode, Json<SendReportResponse>);

fn failure(status: StatusCode, message: impl Into<String>) -> RelayResponse {
    (status, Json(SendReportResponse::failed(message)))
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// POST /api/send-report
#[utoipa::path(
    post,
    path = "/api/send-report",
    tag = "Messaging",
    request_body = SendReportPayload,
    responses(
        (status = 200, description = "Mensagem aceita pelo provedor", body = SendReportResponse),
        (status = 400, description = "Faltam 'to' ou 'mediaUrl'", body = SendReportResponse),
        (status = 405, description = "Método diferente de POST", body = SendReportResponse),
        (status = 500, description = "Erro do provedor", body = SendReportResponse),
        (status = 503, description = "WhatsApp não configurado", body = SendReportResponse)
    )
)]
pub async fn send_report(
    State(app_state): State<AppState>,
    payload: Result<Json<SendReportPayload>, JsonRejection>,
) -> RelayResponse {
    let Ok(Json(payload)) = payload else {
        return failure(StatusCode::BAD_REQUEST, MISSING_PARAMS);
    };

    let (Some(to), Some(media_url)) = (present(payload.to), present(payload.media_url)) else {
        return failure(StatusCode::BAD_REQUEST, MISSING_PARAMS);
    };

    let Some(messenger) = app_state.messenger.as_ref() else {
        return failure(
            StatusCode::SERVICE_UNAVAILABLE,
            AppError::IntegrationDisabled("WhatsApp").to_string(),
        );
    };

    match messenger.send_media(&to, &media_url).await {
        Ok(sid) => (StatusCode::OK, Json(SendReportResponse::sent(sid))),
        Err(e) => {
            tracing::error!("Error en sendReport: {}", e);
            let message = match e {
                AppError::Remote(message) => message,
                other => other.to_string(),
            };
            failure(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}

// Qualquer outro método em /api/send-report
pub async fn method_not_allowed() -> RelayResponse {
    failure(StatusCode::METHOD_NOT_ALLOWED, "Método no permitido")
}
