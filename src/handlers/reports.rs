// src/handlers/reports.rs

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::reports::{EmailReportPayload, EmailReportResponse, ExportFilters, ExportPreview},
    services::report_service::ExportedReport,
};

// Configura os headers para o navegador baixar o arquivo
fn download(report: ExportedReport) -> Response {
    let headers = [
        (header::CONTENT_TYPE, report.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", report.file_name),
        ),
    ];

    let mut response = (headers, report.bytes).into_response();
    response.headers_mut().insert("x-exported-count", HeaderValue::from(report.item_count));
    if let Some(url) = report.public_url.and_then(|url| HeaderValue::from_str(&url).ok()) {
        response.headers_mut().insert("x-report-url", url);
    }
    response
}

// POST /api/reports/preview
#[utoipa::path(
    post,
    path = "/api/reports/preview",
    tag = "Reports",
    request_body = ExportFilters,
    responses((status = 200, description = "Vista previa da exportação", body = ExportPreview))
)]
pub async fn preview(
    State(app_state): State<AppState>,
    Json(filters): Json<ExportFilters>,
) -> impl IntoResponse {
    Json(app_state.report_service.preview(&filters))
}

// POST /api/reports/pdf
#[utoipa::path(
    post,
    path = "/api/reports/pdf",
    tag = "Reports",
    request_body = ExportFilters,
    responses(
        (status = 200, description = "PDF do inventário", content_type = "application/pdf"),
        (status = 422, description = "Nenhum insumo corresponde aos filtros"),
        (status = 500, description = "Fonte ausente ou falha na renderização")
    )
)]
pub async fn export_pdf(
    State(app_state): State<AppState>,
    Json(filters): Json<ExportFilters>,
) -> Result<Response, AppError> {
    let report = app_state.report_service.export_pdf(&filters).await?;
    Ok(download(report))
}

// POST /api/reports/image
#[utoipa::path(
    post,
    path = "/api/reports/image",
    tag = "Reports",
    request_body = ExportFilters,
    responses(
        (status = 200, description = "Snapshot PNG do inventário", content_type = "image/png"),
        (status = 422, description = "Nenhum insumo corresponde aos filtros")
    )
)]
pub async fn export_image(
    State(app_state): State<AppState>,
    Json(filters): Json<ExportFilters>,
) -> Result<Response, AppError> {
    let report = app_state.report_service.export_image(&filters).await?;
    Ok(download(report))
}

// POST /api/reports/email
#[utoipa::path(
    post,
    path = "/api/reports/email",
    tag = "Reports",
    request_body = EmailReportPayload,
    responses(
        (status = 200, description = "Reporte enviado por correo", body = EmailReportResponse),
        (status = 400, description = "E-mail inválido"),
        (status = 502, description = "Falha no provedor de e-mail"),
        (status = 503, description = "E-mail ou storage não configurados")
    )
)]
pub async fn email_report(
    State(app_state): State<AppState>,
    Json(payload): Json<EmailReportPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mailer = app_state
        .mailer
        .as_ref()
        .ok_or(AppError::IntegrationDisabled("envío de correo"))?;

    let attachment_url = app_state.report_service.attachment_url(Utc::now().date_naive())?;
    mailer.send_report(&payload.to, &attachment_url).await?;

    Ok(Json(EmailReportResponse { to: payload.to, attachment_url }))
}
