// src/services/dashboard_service.rs

use crate::{models::dashboard::DashboardSummary, services::inventory_service::InventoryService};

// Quantos itens com estoque baixo aparecem no card "Requieren reposición"
const RECENT_LOW_STOCK_LIMIT: usize = 5;

#[derive(Clone)]
pub struct DashboardService {
    inventory: InventoryService,
    expiring_days: u64,
}

impl DashboardService {
    pub fn new(inventory: InventoryService, expiring_days: u64) -> Self {
        Self { inventory, expiring_days }
    }

    pub fn get_summary(&self) -> DashboardSummary {
        let low_stock = self.inventory.low_stock_items();

        DashboardSummary {
            total_items: self.inventory.items().len(),
            low_stock_items: low_stock.len(),
            out_of_stock_items: self.inventory.out_of_stock_items().len(),
            total_value: self.inventory.total_value(),
            expiring_soon: self.inventory.expiring_items(self.expiring_days).len(),
            recent_low_stock: low_stock.into_iter().take(RECENT_LOW_STOCK_LIMIT).collect(),
        }
    }
}
