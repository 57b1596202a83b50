// src/services/inventory_state.rs
//
// Espelho em memória da tabela de insumos + histórico local de movimentações.
// Toda mutação passa por `reduce`, que consome o estado anterior e devolve o novo.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use uuid::Uuid;

use crate::models::inventory::{InventoryItem, SortKey, SortOrder, StockMovement};

/// Janela padrão (em dias) para "vence em breve".
pub const DEFAULT_EXPIRING_DAYS: u64 = 30;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryState {
    pub items: Vec<InventoryItem>,
    pub movements: Vec<StockMovement>, // mais recente primeiro
    pub loading: bool,
    pub error: Option<String>,
    pub search_term: String,
    pub selected_category: String,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone)]
pub enum InventoryAction {
    SetLoading(bool),
    SetError(Option<String>),
    SetItems(Vec<InventoryItem>),
    SetMovements(Vec<StockMovement>),
    AddItem(InventoryItem),
    UpdateItem { item: InventoryItem, today: NaiveDate },
    DeleteItem(Uuid),
    UpdateStock { id: Uuid, delta: Decimal, today: NaiveDate },
    AddMovement(StockMovement),
    ClearMovements,
    SetSearchTerm(String),
    SetSelectedCategory(String),
    SetSort { sort_by: SortKey, sort_order: SortOrder },
}

pub fn reduce(state: InventoryState, action: InventoryAction) -> InventoryState {
    match action {
        InventoryAction::SetLoading(loading) => InventoryState { loading, ..state },
        InventoryAction::SetError(error) => InventoryState { error, ..state },
        InventoryAction::SetItems(items) => InventoryState { items, ..state },
        InventoryAction::SetMovements(movements) => InventoryState { movements, ..state },
        InventoryAction::AddItem(item) => {
            let mut items = state.items;
            items.push(item);
            InventoryState { items, error: None, ..state }
        }
        InventoryAction::UpdateItem { item, today } => {
            let items = state
                .items
                .into_iter()
                .map(|current| {
                    if current.id == item.id {
                        InventoryItem { updated_at: today, ..item.clone() }
                    } else {
                        current
                    }
                })
                .collect();
            InventoryState { items, error: None, ..state }
        }
        InventoryAction::DeleteItem(id) => {
            let items = state.items.into_iter().filter(|item| item.id != id).collect();
            InventoryState { items, error: None, ..state }
        }
        InventoryAction::UpdateStock { id, delta, today } => {
            let items = state
                .items
                .into_iter()
                .map(|item| {
                    if item.id == id {
                        let quantity = (item.quantity + delta).max(Decimal::ZERO);
                        InventoryItem { quantity, updated_at: today, ..item }
                    } else {
                        item
                    }
                })
                .collect();
            InventoryState { items, error: None, ..state }
        }
        InventoryAction::AddMovement(movement) => {
            let mut movements = Vec::with_capacity(state.movements.len() + 1);
            movements.push(movement);
            movements.extend(state.movements);
            InventoryState { movements, ..state }
        }
        InventoryAction::ClearMovements => InventoryState { movements: Vec::new(), ..state },
        InventoryAction::SetSearchTerm(search_term) => InventoryState { search_term, ..state },
        InventoryAction::SetSelectedCategory(selected_category) => {
            InventoryState { selected_category, ..state }
        }
        InventoryAction::SetSort { sort_by, sort_order } => {
            InventoryState { sort_by, sort_order, ..state }
        }
    }
}

fn compare_by(a: &InventoryItem, b: &InventoryItem, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Quantity => a.quantity.cmp(&b.quantity),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        // Sem validade conta como 1970-01-01
        SortKey::ExpirationDate => a
            .expiration_date
            .unwrap_or_default()
            .cmp(&b.expiration_date.unwrap_or_default()),
    }
}

// ---
// Seletores (sempre recalculados, sem cache)
// ---
impl InventoryState {
    /// Busca + filtro de categoria + ordenação configurados na sessão.
    pub fn filtered_items(&self) -> Vec<InventoryItem> {
        let needle = self.search_term.to_lowercase();

        let mut filtered: Vec<InventoryItem> = self
            .items
            .iter()
            .filter(|item| needle.is_empty() || item.matches_search(&needle))
            .filter(|item| self.selected_category.is_empty() || item.category == self.selected_category)
            .cloned()
            .collect();

        filtered.sort_by(|a, b| {
            let ordering = compare_by(a, b, self.sort_by);
            match self.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        filtered
    }

    pub fn low_stock_items(&self) -> Vec<InventoryItem> {
        self.items.iter().filter(|item| item.is_low_stock()).cloned().collect()
    }

    pub fn out_of_stock_items(&self) -> Vec<InventoryItem> {
        self.items.iter().filter(|item| item.is_out_of_stock()).cloned().collect()
    }

    /// Itens com validade dentro de [hoje, hoje + dias].
    pub fn expiring_items(&self, days: u64, today: NaiveDate) -> Vec<InventoryItem> {
        let limit = today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);

        self.items
            .iter()
            .filter(|item| {
                item.expiration_date
                    .is_some_and(|date| date >= today && date <= limit)
            })
            .cloned()
            .collect()
    }

    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self.items.iter().map(|item| item.category.clone()).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    pub fn total_value(&self) -> Decimal {
        self.items.iter().map(InventoryItem::stock_value).sum()
    }

    pub fn item_by_id(&self, id: Uuid) -> Option<&InventoryItem> {
        self.items.iter().find(|item| item.id == id)
    }
}
