pub mod inventory_repo;
pub use inventory_repo::{InventoryRepository, PgInventoryRepository};
pub mod storage_repo;
pub use storage_repo::{ReportStorage, SupabaseStorage};
