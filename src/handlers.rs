pub mod dashboard;
pub mod inventory;
pub mod messaging;
pub mod reports;
