// src/models/reports.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StockLevelFilter {
    #[default]
    All,
    Low,
    Normal,
}

fn default_true() -> bool {
    true
}

// Filtros do painel de exportação
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportFilters {
    // Vazio = todas as categorias
    #[serde(default)]
    pub selected_categories: Vec<String>,
    #[serde(default)]
    pub stock_level: StockLevelFilter,
    #[serde(default = "default_true")]
    pub include_out_of_stock: bool,
}

impl Default for ExportFilters {
    fn default() -> Self {
        Self {
            selected_categories: Vec::new(),
            stock_level: StockLevelFilter::All,
            include_out_of_stock: true,
        }
    }
}

// "Vista Previa"
#[derive(Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportPreview {
    pub to_export: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EmailReportPayload {
    #[validate(email(message = "Ingresa un correo válido."))]
    #[schema(example = "compras@limpiezas.com")]
    pub to: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailReportResponse {
    pub to: String,
    pub attachment_url: String,
}

// Corpo aceito por /api/send-report (WhatsApp)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendReportPayload {
    pub to: Option<String>,
    pub media_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendReportResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendReportResponse {
    pub fn sent(sid: String) -> Self {
        Self { success: true, sid: Some(sid), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, sid: None, error: Some(error.into()) }
    }
}
