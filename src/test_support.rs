// Dublês em memória para os testes de serviços e handlers.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::{collections::HashSet, sync::Arc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::{AppState, Config},
    db::{InventoryRepository, ReportStorage},
    models::inventory::{InventoryItem, NewItem, NewMovement, StockMovement, DEFAULT_LOCATION},
    services::notification_service::{MessagingProvider, ReportMailer},
};

pub fn sample_draft(name: &str, category: &str) -> NewItem {
    NewItem {
        name: name.into(),
        category: category.into(),
        quantity: Decimal::from(5),
        unit: "unidades".into(),
        unit_price: Decimal::from(2),
        min_stock: Decimal::from(1),
        supplier: Some("Distribuidora Limpia".into()),
        expiration_date: None,
        location: DEFAULT_LOCATION.into(),
        description: None,
    }
}

pub fn sample_item(name: &str, category: &str, quantity: i64, min_stock: i64) -> InventoryItem {
    let created = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    NewItem {
        quantity: Decimal::from(quantity),
        min_stock: Decimal::from(min_stock),
        ..sample_draft(name, category)
    }
    .into_item(Uuid::new_v4(), created, created)
}

fn numeric(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoOp {
    FetchItems,
    InsertItem,
    UpdateItem,
    DeleteItem,
    UpdateQuantity,
    InsertMovement,
    FetchMovements,
    DeleteMovements,
}

#[derive(Default)]
pub struct FakeRepository {
    items: Mutex<Vec<InventoryItem>>,
    movements: Mutex<Vec<StockMovement>>,
    quantity_writes: Mutex<Vec<(Uuid, Decimal)>>,
    failing: Mutex<HashSet<RepoOp>>,
}

impl FakeRepository {
    pub fn with_items(items: Vec<InventoryItem>) -> Self {
        Self { items: Mutex::new(items), ..Self::default() }
    }

    pub fn fail_on(&self, op: RepoOp) {
        self.failing.lock().insert(op);
    }

    pub fn quantity_writes(&self) -> Vec<(Uuid, Decimal)> {
        self.quantity_writes.lock().clone()
    }

    pub fn stored_item(&self, id: Uuid) -> Option<InventoryItem> {
        self.items.lock().iter().find(|item| item.id == id).cloned()
    }

    pub fn stored_movements(&self) -> Vec<StockMovement> {
        self.movements.lock().clone()
    }

    fn check(&self, op: RepoOp) -> Result<(), AppError> {
        if self.failing.lock().contains(&op) {
            return Err(AppError::Remote(format!("{op:?} falló")));
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryRepository for FakeRepository {
    async fn fetch_items(&self) -> Result<Vec<InventoryItem>, AppError> {
        self.check(RepoOp::FetchItems)?;
        Ok(self.items.lock().clone())
    }

    async fn insert_item(&self, draft: &NewItem) -> Result<InventoryItem, AppError> {
        self.check(RepoOp::InsertItem)?;
        let today = Utc::now().date_naive();
        let mut item = draft.clone().into_item(Uuid::new_v4(), today, today);
        // Mesmo arredondamento das colunas NUMERIC(14,3) / NUMERIC(14,2)
        item.quantity = numeric(item.quantity, 3);
        item.min_stock = numeric(item.min_stock, 3);
        item.unit_price = numeric(item.unit_price, 2);
        self.items.lock().push(item.clone());
        Ok(item)
    }

    async fn update_item(&self, item: &InventoryItem) -> Result<u64, AppError> {
        self.check(RepoOp::UpdateItem)?;
        let mut items = self.items.lock();
        match items.iter_mut().find(|stored| stored.id == item.id) {
            Some(stored) => {
                *stored = item.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_item(&self, id: Uuid) -> Result<(), AppError> {
        self.check(RepoOp::DeleteItem)?;
        self.items.lock().retain(|item| item.id != id);
        Ok(())
    }

    async fn update_quantity(&self, id: Uuid, quantity: Decimal) -> Result<(), AppError> {
        self.check(RepoOp::UpdateQuantity)?;
        self.quantity_writes.lock().push((id, quantity));
        if let Some(item) = self.items.lock().iter_mut().find(|item| item.id == id) {
            item.quantity = quantity;
        }
        Ok(())
    }

    async fn insert_movement(&self, movement: &NewMovement) -> Result<StockMovement, AppError> {
        self.check(RepoOp::InsertMovement)?;
        let stored = movement.clone().into_movement(Uuid::new_v4());
        self.movements.lock().insert(0, stored.clone());
        Ok(stored)
    }

    async fn fetch_movements(&self, user_id: Uuid) -> Result<Vec<StockMovement>, AppError> {
        self.check(RepoOp::FetchMovements)?;
        Ok(self
            .movements
            .lock()
            .iter()
            .filter(|movement| movement.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_movements_by_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        self.check(RepoOp::DeleteMovements)?;
        let mut movements = self.movements.lock();
        let before = movements.len();
        movements.retain(|movement| movement.user_id != user_id);
        Ok((before - movements.len()) as u64)
    }
}

#[derive(Default)]
pub struct FakeStorage {
    pub uploads: Mutex<Vec<(String, String)>>, // (arquivo, content-type)
    pub fail: bool,
}

#[async_trait]
impl ReportStorage for FakeStorage {
    async fn upload(
        &self,
        file_name: &str,
        _bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        if self.fail {
            return Err(AppError::Remote("bucket no disponible".into()));
        }
        self.uploads.lock().push((file_name.to_string(), content_type.to_string()));
        Ok(self.public_url(file_name))
    }

    fn public_url(&self, file_name: &str) -> String {
        format!("https://storage.test/reportes/{file_name}")
    }
}

#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<(String, String)>>, // (destinatário, anexo)
}

#[async_trait]
impl ReportMailer for FakeMailer {
    async fn send_report(&self, to: &str, attachment_url: &str) -> Result<(), AppError> {
        self.sent.lock().push((to.to_string(), attachment_url.to_string()));
        Ok(())
    }
}

pub struct FakeMessenger {
    pub fail: bool,
}

#[async_trait]
impl MessagingProvider for FakeMessenger {
    async fn send_media(&self, _to: &str, _media_url: &str) -> Result<String, AppError> {
        if self.fail {
            return Err(AppError::Remote("número no válido".into()));
        }
        Ok("SM0123456789".into())
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/cleanstock_test".into()),
        _ => None,
    })
    .unwrap()
}

pub struct TestApp {
    pub state: AppState,
    pub repo: Arc<FakeRepository>,
    pub storage: Arc<FakeStorage>,
    pub mailer: Arc<FakeMailer>,
}

/// Estado completo sobre dublês, já com a carga inicial feita.
pub async fn test_app(items: Vec<InventoryItem>, messenger: Option<FakeMessenger>) -> TestApp {
    let repo = Arc::new(FakeRepository::with_items(items));
    let storage = Arc::new(FakeStorage::default());
    let mailer = Arc::new(FakeMailer::default());

    let state = AppState::from_parts(
        &test_config(),
        repo.clone(),
        Some(storage.clone()),
        Some(mailer.clone()),
        messenger.map(|m| Arc::new(m) as Arc<dyn MessagingProvider>),
    );
    state.inventory_service.load_items().await;

    TestApp { state, repo, storage, mailer }
}
