// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::inventory::InventoryItem;

// Os cards do topo do "Panel de Control"
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_items: usize,        // Productos registrados
    pub low_stock_items: usize,    // Requieren reposición (inclui sem estoque)
    pub out_of_stock_items: usize, // Productos agotados
    pub total_value: Decimal,      // Valor del inventario
    pub expiring_soon: usize,      // Vencem dentro da janela padrão
    pub recent_low_stock: Vec<InventoryItem>,
}
