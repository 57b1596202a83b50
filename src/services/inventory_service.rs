// src/services/inventory_service.rs

use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::error::AppError,
    db::InventoryRepository,
    models::inventory::{
        InventoryItem, NewItem, NewMovement, SortKey, SortOrder, StockEntryKind, StockMovement,
    },
    services::inventory_state::{reduce, InventoryAction, InventoryState},
};

/// Lançamento vindo do diálogo detalhado "Actualizar Stock".
#[derive(Debug, Clone)]
pub struct StockChangeRequest {
    pub kind: StockEntryKind,
    pub quantity: Decimal,
    pub reason: String,
    pub notes: Option<String>,
    pub reference: Option<String>,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn field_error(field: &'static str, code: &'static str, message: &'static str) -> AppError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    let mut errors = ValidationErrors::new();
    errors.add(field, err);
    AppError::ValidationError(errors)
}

/// Fonte única de verdade em memória para insumos e movimentações.
///
/// Cada operação de escrita chama o banco primeiro e só depois aplica a
/// transição local via `reduce`. O lock nunca atravessa um `.await`: duas
/// chamadas concorrentes no mesmo item competem, e a última a terminar vence.
#[derive(Clone)]
pub struct InventoryService {
    repo: Arc<dyn InventoryRepository>,
    state: Arc<RwLock<InventoryState>>,
    acting_user: Uuid,
}

impl InventoryService {
    pub fn new(repo: Arc<dyn InventoryRepository>, acting_user: Uuid) -> Self {
        Self {
            repo,
            state: Arc::new(RwLock::new(InventoryState::default())),
            acting_user,
        }
    }

    fn dispatch_all(&self, actions: impl IntoIterator<Item = InventoryAction>) {
        let mut guard = self.state.write();
        for action in actions {
            let current = std::mem::take(&mut *guard);
            *guard = reduce(current, action);
        }
    }

    fn dispatch(&self, action: InventoryAction) {
        self.dispatch_all([action]);
    }

    fn record_error(&self, error: &AppError) {
        self.dispatch(InventoryAction::SetError(Some(error.to_string())));
    }

    /// Leitura do estado sob o lock de leitura.
    pub fn with_state<R>(&self, f: impl FnOnce(&InventoryState) -> R) -> R {
        f(&*self.state.read())
    }

    // ---
    // Carga inicial
    // ---

    /// Substitui a coleção local inteira. Em caso de falha guarda a mensagem
    /// e mantém os itens anteriores.
    pub async fn load_items(&self) {
        self.dispatch(InventoryAction::SetLoading(true));

        match self.repo.fetch_items().await {
            Ok(items) => {
                tracing::info!("✅ {} insumos cargados", items.len());
                self.dispatch_all([
                    InventoryAction::SetItems(items),
                    InventoryAction::SetError(None),
                ]);
            }
            Err(e) => {
                tracing::warn!("Falha ao carregar insumos: {}", e);
                self.record_error(&e);
            }
        }

        self.dispatch(InventoryAction::SetLoading(false));
    }

    /// Recupera o histórico do usuário atual (mais recente primeiro).
    pub async fn load_movements(&self) {
        match self.repo.fetch_movements(self.acting_user).await {
            Ok(movements) => self.dispatch(InventoryAction::SetMovements(movements)),
            Err(e) => {
                tracing::warn!("Falha ao carregar movimentações: {}", e);
                self.record_error(&e);
            }
        }
    }

    // ---
    // CRUD de insumos
    // ---

    pub async fn add_item(&self, draft: NewItem) -> Result<InventoryItem, AppError> {
        let created = self.repo.insert_item(&draft).await?;

        // O espelho fica com o que o banco gravou (colunas NUMERIC arredondam).
        let today = today();
        let item = InventoryItem { created_at: today, updated_at: today, ..created };
        self.dispatch(InventoryAction::AddItem(item.clone()));

        tracing::info!(item_id = %item.id, "Insumo creado: {}", item.name);
        Ok(item)
    }

    pub async fn update_item(&self, item: InventoryItem) -> Result<InventoryItem, AppError> {
        if self.item_by_id(item.id).is_none() {
            return Err(AppError::ItemNotFound(item.id));
        }

        let affected = self.repo.update_item(&item).await?;
        if affected == 0 {
            tracing::warn!(item_id = %item.id, "Update sem linhas afetadas no banco");
        }

        let today = today();
        self.dispatch(InventoryAction::UpdateItem { item: item.clone(), today });
        Ok(InventoryItem { updated_at: today, ..item })
    }

    /// Remove localmente mesmo quando o banco falha; o erro fica no estado e
    /// também é devolvido para o chamador notificar.
    pub async fn delete_item(&self, id: Uuid) -> Result<(), AppError> {
        let remote = self.repo.delete_item(id).await;

        self.dispatch(InventoryAction::DeleteItem(id));

        if let Err(e) = remote {
            tracing::warn!(item_id = %id, "Falha ao remover insumo no banco: {}", e);
            self.record_error(&e);
            return Err(e);
        }

        tracing::info!(item_id = %id, "Insumo eliminado");
        Ok(())
    }

    // ---
    // Protocolo de atualização de estoque
    // ---

    /// Ajusta a quantidade (nunca abaixo de zero) e grava exatamente uma
    /// movimentação com `|delta|`. Não é idempotente.
    pub async fn update_stock(
        &self,
        item_id: Uuid,
        delta: Decimal,
        reason: &str,
    ) -> Result<StockMovement, AppError> {
        self.apply_stock_change(item_id, delta, reason, None, None).await
    }

    async fn apply_stock_change(
        &self,
        item_id: Uuid,
        delta: Decimal,
        reason: &str,
        notes: Option<&str>,
        reference: Option<&str>,
    ) -> Result<StockMovement, AppError> {
        // 1. Busca no espelho local (não revalida no banco)
        let current = self.item_by_id(item_id).ok_or(AppError::ItemNotFound(item_id))?;

        // 2. Nova quantidade, presa em zero
        let new_quantity = (current.quantity + delta).max(Decimal::ZERO);

        // 3. Grava a quantidade. Se falhar, nada mais acontece.
        if let Err(e) = self.repo.update_quantity(item_id, new_quantity).await {
            tracing::warn!(item_id = %item_id, "Falha ao gravar quantidade: {}", e);
            self.record_error(&e);
            return Err(e);
        }

        // 4. Grava o histórico
        let draft = NewMovement::from_delta(
            &current,
            delta,
            reason,
            notes,
            reference,
            self.acting_user,
            Utc::now(),
        );
        let stock_update = InventoryAction::UpdateStock { id: item_id, delta, today: today() };

        match self.repo.insert_movement(&draft).await {
            // 5. Sucesso completo: quantidade + movimentação no espelho
            Ok(movement) => {
                self.dispatch_all([stock_update, InventoryAction::AddMovement(movement.clone())]);
                tracing::info!(
                    item_id = %item_id,
                    kind = movement.kind.as_str(),
                    quantity = %movement.quantity,
                    "Stock actualizado: {} -> {}",
                    current.quantity,
                    new_quantity
                );
                Ok(movement)
            }
            // A quantidade já está gravada no banco e não é desfeita.
            // O espelho acompanha o banco, mas fica sem a movimentação.
            Err(e) => {
                tracing::warn!(item_id = %item_id, "Quantidade gravada, histórico falhou: {}", e);
                let err = AppError::PartialLedger { item_id };
                self.dispatch_all([
                    stock_update,
                    InventoryAction::SetError(Some(err.to_string())),
                ]);
                Err(err)
            }
        }
    }

    /// Caminho do diálogo detalhado: valida antes de chamar o protocolo.
    pub async fn register_movement(
        &self,
        item_id: Uuid,
        request: StockChangeRequest,
    ) -> Result<StockMovement, AppError> {
        if request.reason.trim().is_empty() {
            return Err(field_error("reason", "required", "El motivo es obligatorio."));
        }

        let current = self.item_by_id(item_id).ok_or(AppError::ItemNotFound(item_id))?;

        let delta = match request.kind {
            StockEntryKind::Entrada | StockEntryKind::Salida if request.quantity <= Decimal::ZERO => {
                return Err(field_error(
                    "quantity",
                    "range",
                    "La cantidad debe ser mayor que cero.",
                ));
            }
            StockEntryKind::Ajuste if request.quantity.is_sign_negative() => {
                return Err(field_error("quantity", "range", "La cantidad no puede ser negativa."));
            }
            StockEntryKind::Entrada => request.quantity,
            StockEntryKind::Salida => {
                if current.quantity < request.quantity {
                    return Err(AppError::InsufficientStock {
                        available: current.quantity,
                        requested: request.quantity,
                    });
                }
                -request.quantity
            }
            StockEntryKind::Ajuste => request.quantity - current.quantity,
        };

        self.apply_stock_change(
            item_id,
            delta,
            request.reason.trim(),
            request.notes.as_deref(),
            request.reference.as_deref(),
        )
        .await
    }

    /// Apaga o histórico do usuário atual no banco e, em caso de sucesso,
    /// também o histórico local.
    pub async fn clear_history(&self) -> Result<u64, AppError> {
        match self.repo.delete_movements_by_user(self.acting_user).await {
            Ok(deleted) => {
                self.dispatch(InventoryAction::ClearMovements);
                tracing::info!("Historial borrado ({} movimientos)", deleted);
                Ok(deleted)
            }
            Err(e) => {
                tracing::warn!("Falha ao apagar histórico: {}", e);
                self.record_error(&e);
                Err(e)
            }
        }
    }

    // ---
    // Estado de visualização
    // ---

    pub fn set_search_term(&self, term: String) {
        self.dispatch(InventoryAction::SetSearchTerm(term));
    }

    pub fn set_selected_category(&self, category: String) {
        self.dispatch(InventoryAction::SetSelectedCategory(category));
    }

    pub fn set_sorting(&self, sort_by: SortKey, sort_order: SortOrder) {
        self.dispatch(InventoryAction::SetSort { sort_by, sort_order });
    }

    // ---
    // Seletores
    // ---

    pub fn items(&self) -> Vec<InventoryItem> {
        self.with_state(|state| state.items.clone())
    }

    pub fn filtered_items(&self) -> Vec<InventoryItem> {
        self.with_state(InventoryState::filtered_items)
    }

    pub fn low_stock_items(&self) -> Vec<InventoryItem> {
        self.with_state(InventoryState::low_stock_items)
    }

    pub fn out_of_stock_items(&self) -> Vec<InventoryItem> {
        self.with_state(InventoryState::out_of_stock_items)
    }

    pub fn expiring_items(&self, days: u64) -> Vec<InventoryItem> {
        let today = today();
        self.with_state(|state| state.expiring_items(days, today))
    }

    pub fn categories(&self) -> Vec<String> {
        self.with_state(InventoryState::categories)
    }

    pub fn total_value(&self) -> Decimal {
        self.with_state(InventoryState::total_value)
    }

    pub fn item_by_id(&self, id: Uuid) -> Option<InventoryItem> {
        self.with_state(|state| state.item_by_id(id).cloned())
    }

    pub fn movements(&self, item_id: Option<Uuid>) -> Vec<StockMovement> {
        self.with_state(|state| {
            state
                .movements
                .iter()
                .filter(|movement| item_id.is_none_or(|id| movement.item_id == id))
                .cloned()
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::inventory::MovementKind,
        test_support::{sample_draft, sample_item, FakeRepository, RepoOp},
    };

    async fn service_with(items: Vec<InventoryItem>) -> (InventoryService, Arc<FakeRepository>) {
        let repo = Arc::new(FakeRepository::with_items(items));
        let service = InventoryService::new(repo.clone(), Uuid::nil());
        service.load_items().await;
        (service, repo)
    }

    #[tokio::test]
    async fn outbound_larger_than_stock_clamps_but_records_full_magnitude() {
        let item = sample_item("Cloro", "Desinfectantes", 10, 5);
        let id = item.id;
        let (service, repo) = service_with(vec![item]).await;

        let movement = service.update_stock(id, Decimal::from(-15), "uso").await.unwrap();

        assert_eq!(movement.kind, MovementKind::Outbound);
        assert_eq!(movement.quantity, Decimal::from(15));
        assert_eq!(service.item_by_id(id).unwrap().quantity, Decimal::ZERO);
        assert_eq!(repo.quantity_writes(), vec![(id, Decimal::ZERO)]);
        assert_eq!(service.movements(None), vec![movement]);
    }

    #[tokio::test]
    async fn each_successful_update_appends_exactly_one_movement() {
        let item = sample_item("Guantes", "Protección", 4, 2);
        let id = item.id;
        let (service, repo) = service_with(vec![item]).await;

        service.update_stock(id, Decimal::from(3), "compra").await.unwrap();
        service.update_stock(id, Decimal::ZERO, "conteo").await.unwrap();

        let movements = service.movements(Some(id));
        assert_eq!(movements.len(), 2);
        // mais recente primeiro
        assert_eq!(movements[0].kind, MovementKind::Adjustment);
        assert_eq!(movements[1].kind, MovementKind::Inbound);
        assert_eq!(movements[1].unit_price, Decimal::from(2));
        assert_eq!(repo.stored_movements().len(), 2);
        assert_eq!(service.item_by_id(id).unwrap().quantity, Decimal::from(7));
    }

    #[tokio::test]
    async fn failed_quantity_write_leaves_everything_untouched() {
        let item = sample_item("Escoba", "Utensilios", 6, 1);
        let id = item.id;
        let (service, repo) = service_with(vec![item]).await;
        repo.fail_on(RepoOp::UpdateQuantity);

        let result = service.update_stock(id, Decimal::from(-2), "uso").await;

        assert!(matches!(result, Err(AppError::Remote(_))));
        assert_eq!(service.item_by_id(id).unwrap().quantity, Decimal::from(6));
        assert!(service.movements(None).is_empty());
        assert!(repo.stored_movements().is_empty());
        assert!(service.with_state(|s| s.error.is_some()));
    }

    #[tokio::test]
    async fn failed_ledger_insert_keeps_the_committed_quantity_without_a_movement() {
        let item = sample_item("Jabón", "Higiene", 8, 2);
        let id = item.id;
        let (service, repo) = service_with(vec![item]).await;
        repo.fail_on(RepoOp::InsertMovement);

        let result = service.update_stock(id, Decimal::from(-3), "uso").await;

        assert!(matches!(result, Err(AppError::PartialLedger { item_id, .. }) if item_id == id));
        assert_eq!(repo.stored_item(id).unwrap().quantity, Decimal::from(5));
        assert_eq!(service.item_by_id(id).unwrap().quantity, Decimal::from(5));
        assert!(service.movements(None).is_empty());
        assert!(repo.stored_movements().is_empty());
        assert!(service.with_state(|s| s.error.as_deref().is_some_and(|e| e.contains("movimiento"))));
        assert!(service.with_state(|s| s.error.as_deref().is_some_and(|e| !e.contains("InsertMovement"))));
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let (service, repo) = service_with(vec![]).await;

        let result = service.update_stock(Uuid::new_v4(), Decimal::ONE, "compra").await;

        assert!(matches!(result, Err(AppError::ItemNotFound(_))));
        assert!(repo.quantity_writes().is_empty());
    }

    #[tokio::test]
    async fn added_item_shows_up_in_category_filter_and_search() {
        let (service, _repo) = service_with(vec![sample_item("Escoba", "Utensilios", 1, 1)]).await;

        let created = service.add_item(sample_draft("Detergente", "Detergentes")).await.unwrap();

        service.set_selected_category("Detergentes".into());
        assert_eq!(service.filtered_items(), vec![created.clone()]);

        service.set_selected_category(String::new());
        service.set_search_term("deterg".into());
        assert_eq!(service.filtered_items(), vec![created]);
    }

    #[tokio::test]
    async fn added_item_mirrors_the_stored_values() {
        let (service, repo) = service_with(vec![]).await;
        let draft = NewItem { unit_price: Decimal::new(3555, 3), ..sample_draft("Cera", "Pisos") };

        let created = service.add_item(draft).await.unwrap();

        assert_eq!(created.unit_price, Decimal::new(356, 2));
        assert_eq!(service.item_by_id(created.id).unwrap().unit_price, Decimal::new(356, 2));
        assert_eq!(repo.stored_item(created.id).unwrap().unit_price, Decimal::new(356, 2));
        assert_eq!(service.total_value(), Decimal::new(1780, 2));
    }

    #[tokio::test]
    async fn deleting_an_item_keeps_its_movements() {
        let item = sample_item("Cloro", "Desinfectantes", 4, 1);
        let id = item.id;
        let (service, repo) = service_with(vec![item]).await;
        service.update_stock(id, Decimal::from(2), "compra").await.unwrap();

        service.delete_item(id).await.unwrap();

        assert!(service.item_by_id(id).is_none());
        assert_eq!(service.movements(Some(id)).len(), 1);
        assert_eq!(repo.stored_movements().len(), 1);

        service.load_movements().await;
        assert_eq!(service.movements(Some(id)).len(), 1);
    }

    #[tokio::test]
    async fn failed_insert_does_not_touch_the_local_collection() {
        let (service, repo) = service_with(vec![]).await;
        repo.fail_on(RepoOp::InsertItem);

        let result = service.add_item(sample_draft("Detergente", "Detergentes")).await;

        assert!(result.is_err());
        assert!(service.items().is_empty());
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_items_and_stores_the_error() {
        let (service, repo) = service_with(vec![sample_item("Cloro", "Desinfectantes", 1, 1)]).await;
        repo.fail_on(RepoOp::FetchItems);

        service.load_items().await;

        assert_eq!(service.items().len(), 1);
        service.with_state(|state| {
            assert!(!state.loading);
            assert!(state.error.is_some());
        });
    }

    #[tokio::test]
    async fn delete_removes_locally_even_when_the_remote_call_fails() {
        let item = sample_item("Cloro", "Desinfectantes", 1, 1);
        let id = item.id;
        let (service, repo) = service_with(vec![item]).await;
        repo.fail_on(RepoOp::DeleteItem);

        let result = service.delete_item(id).await;

        assert!(result.is_err());
        assert!(service.item_by_id(id).is_none());
        assert!(service.with_state(|s| s.error.is_some()));
    }

    #[tokio::test]
    async fn update_item_requires_a_known_id_and_refreshes_the_date() {
        let mut item = sample_item("Trapeador", "Utensilios", 2, 1);
        let id = item.id;
        let (service, repo) = service_with(vec![item.clone()]).await;

        item.min_stock = Decimal::from(4);
        let updated = service.update_item(item.clone()).await.unwrap();

        assert_eq!(updated.updated_at, today());
        assert_eq!(service.item_by_id(id).unwrap().min_stock, Decimal::from(4));
        assert_eq!(repo.stored_item(id).unwrap().min_stock, Decimal::from(4));

        item.id = Uuid::new_v4();
        assert!(matches!(service.update_item(item).await, Err(AppError::ItemNotFound(_))));
    }

    #[tokio::test]
    async fn clear_history_empties_remote_and_local_ledgers() {
        let item = sample_item("Guantes", "Protección", 4, 2);
        let id = item.id;
        let (service, repo) = service_with(vec![item]).await;
        service.update_stock(id, Decimal::ONE, "compra").await.unwrap();

        let deleted = service.clear_history().await.unwrap();

        assert_eq!(deleted, 1);
        assert!(service.movements(None).is_empty());
        assert!(repo.stored_movements().is_empty());
    }

    #[tokio::test]
    async fn dialog_rejects_outbound_beyond_available_stock() {
        let item = sample_item("Cloro", "Desinfectantes", 10, 5);
        let id = item.id;
        let (service, repo) = service_with(vec![item]).await;

        let result = service
            .register_movement(
                id,
                StockChangeRequest {
                    kind: StockEntryKind::Salida,
                    quantity: Decimal::from(12),
                    reason: "uso_operacional".into(),
                    notes: None,
                    reference: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::InsufficientStock { .. })));
        assert!(repo.quantity_writes().is_empty());
    }

    #[tokio::test]
    async fn dialog_rejects_zero_quantity_and_blank_reason() {
        let item = sample_item("Cloro", "Desinfectantes", 10, 5);
        let id = item.id;
        let (service, _repo) = service_with(vec![item]).await;

        let zero = StockChangeRequest {
            kind: StockEntryKind::Entrada,
            quantity: Decimal::ZERO,
            reason: "compra".into(),
            notes: None,
            reference: None,
        };
        assert!(matches!(
            service.register_movement(id, zero.clone()).await,
            Err(AppError::ValidationError(_))
        ));

        let blank = StockChangeRequest { quantity: Decimal::ONE, reason: "  ".into(), ..zero };
        assert!(matches!(
            service.register_movement(id, blank).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn dialog_adjustment_sets_the_absolute_quantity() {
        let item = sample_item("Cloro", "Desinfectantes", 10, 5);
        let id = item.id;
        let (service, _repo) = service_with(vec![item]).await;

        let movement = service
            .register_movement(
                id,
                StockChangeRequest {
                    kind: StockEntryKind::Ajuste,
                    quantity: Decimal::from(3),
                    reason: "ajuste_inventario".into(),
                    notes: Some("conteo físico".into()),
                    reference: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(movement.kind, MovementKind::Outbound);
        assert_eq!(movement.quantity, Decimal::from(7));
        assert_eq!(movement.notes.as_deref(), Some("conteo físico"));
        assert_eq!(service.item_by_id(id).unwrap().quantity, Decimal::from(3));
    }
}
