pub mod dashboard_service;
pub mod inventory_service;
pub mod inventory_state;
pub mod notification_service;
pub mod quick_adjust;
pub mod report_service;
