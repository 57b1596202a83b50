// src/docs.rs

use utoipa::OpenApi;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "CleanStock API", description = "Inventario de insumos de limpieza"),
    paths(
        // --- INVENTORY ---
        handlers::inventory::get_all_items,
        handlers::inventory::update_view,
        handlers::inventory::get_status,
        handlers::inventory::reload_items,
        handlers::inventory::get_item,
        handlers::inventory::create_item,
        handlers::inventory::update_item,
        handlers::inventory::delete_item,
        handlers::inventory::update_stock,
        handlers::inventory::quick_adjust,
        handlers::inventory::get_all_categories,
        handlers::inventory::get_low_stock,
        handlers::inventory::get_out_of_stock,
        handlers::inventory::get_expiring,
        handlers::inventory::get_movements,
        handlers::inventory::clear_movements,

        // --- Dashboard ---
        handlers::dashboard::get_summary,

        // --- Reports ---
        handlers::reports::preview,
        handlers::reports::export_pdf,
        handlers::reports::export_image,
        handlers::reports::email_report,

        // --- Messaging ---
        handlers::messaging::send_report,
    ),
    components(
        schemas(
            // --- Inventory ---
            models::inventory::InventoryItem,
            models::inventory::NewItem,
            models::inventory::StockStatus,
            models::inventory::MovementKind,
            models::inventory::StockMovement,
            models::inventory::StockEntryKind,
            models::inventory::SortKey,
            models::inventory::SortOrder,

            // --- Payloads ---
            handlers::inventory::ItemPayload,
            handlers::inventory::ItemUpdatePayload,
            handlers::inventory::StockUpdatePayload,
            handlers::inventory::AdjustDirection,
            handlers::inventory::QuickAdjustPayload,
            handlers::inventory::ViewPayload,
            handlers::inventory::ItemDetail,
            handlers::inventory::StatusResponse,
            handlers::inventory::QuickAdjustResponse,
            handlers::inventory::ClearHistoryResponse,

            // --- DASHBOARD ---
            models::dashboard::DashboardSummary,

            // --- Reports ---
            models::reports::StockLevelFilter,
            models::reports::ExportFilters,
            models::reports::ExportPreview,
            models::reports::EmailReportPayload,
            models::reports::EmailReportResponse,
            models::reports::SendReportPayload,
            models::reports::SendReportResponse,
        )
    ),
    tags(
        (name = "Inventory", description = "Insumos, movimentações e estado da sessão"),
        (name = "Dashboard", description = "Indicadores do painel"),
        (name = "Reports", description = "Exportação em PDF/imagem e envio por e-mail"),
        (name = "Messaging", description = "Envio do relatório por WhatsApp")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_group_is_documented() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        assert!(paths.contains_key("/api/inventory/items/{id}/quick-adjust"));
        assert!(paths.contains_key("/api/dashboard/summary"));
        assert!(paths.contains_key("/api/reports/email"));
        assert!(paths.contains_key("/api/send-report"));
    }
}
