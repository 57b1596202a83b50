// src/models/inventory.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Local padrão quando o formulário não informa onde o insumo fica guardado.
pub const DEFAULT_LOCATION: &str = "Almacén principal";

// --- 1. Insumo (o item de estoque) ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: Uuid,
    #[schema(example = "Detergente multiuso")]
    pub name: String,
    #[schema(example = "Detergentes")]
    pub category: String,
    pub quantity: Decimal,
    #[schema(example = "litros")]
    pub unit: String,
    pub unit_price: Decimal,
    pub min_stock: Decimal,
    pub supplier: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub location: String,
    pub description: Option<String>,
    pub created_at: NaiveDate,
    pub updated_at: NaiveDate,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity.is_zero()
    }

    pub fn status(&self) -> StockStatus {
        if self.is_out_of_stock() {
            StockStatus::OutOfStock
        } else if self.is_low_stock() {
            StockStatus::Low
        } else {
            StockStatus::Ok
        }
    }

    /// Valor em estoque (quantidade x preço unitário).
    pub fn stock_value(&self) -> Decimal {
        self.quantity * self.unit_price
    }

    /// `needle` já deve vir em minúsculas.
    pub fn matches_search(&self, needle: &str) -> bool {
        let contains = |text: &str| text.to_lowercase().contains(needle);
        contains(&self.name)
            || contains(&self.category)
            || self.supplier.as_deref().is_some_and(contains)
            || self.description.as_deref().is_some_and(contains)
    }
}

// --- 2. Rascunho de insumo (antes do id atribuído pelo banco) ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub category: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub min_stock: Decimal,
    pub supplier: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub location: String,
    pub description: Option<String>,
}

impl NewItem {
    pub fn into_item(self, id: Uuid, created_at: NaiveDate, updated_at: NaiveDate) -> InventoryItem {
        InventoryItem {
            id,
            name: self.name,
            category: self.category,
            quantity: self.quantity,
            unit: self.unit,
            unit_price: self.unit_price,
            min_stock: self.min_stock,
            supplier: self.supplier,
            expiration_date: self.expiration_date,
            location: self.location,
            description: self.description,
            created_at,
            updated_at,
        }
    }
}

// --- 3. Status de estoque (badges do painel e coluna "Estado" do PDF) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum StockStatus {
    OutOfStock,
    Low,
    Ok,
}

impl StockStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "Sin Stock",
            StockStatus::Low => "Stock Bajo",
            StockStatus::Ok => "Stock OK",
        }
    }

    /// O relatório só distingue "Bajo" (inclui sem estoque) de "Normal".
    pub fn report_label(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock | StockStatus::Low => "Bajo",
            StockStatus::Ok => "Normal",
        }
    }
}

// --- 4. Tipo de movimentação ---
// Nunca informado pelo cliente: sempre derivado do sinal do delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum MovementKind {
    #[serde(rename = "entrada")]
    Inbound,
    #[serde(rename = "salida")]
    Outbound,
    #[serde(rename = "ajuste")]
    Adjustment,
}

impl MovementKind {
    pub fn from_delta(delta: Decimal) -> Self {
        if delta.is_sign_positive() && !delta.is_zero() {
            MovementKind::Inbound
        } else if delta.is_sign_negative() && !delta.is_zero() {
            MovementKind::Outbound
        } else {
            MovementKind::Adjustment
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Inbound => "entrada",
            MovementKind::Outbound => "salida",
            MovementKind::Adjustment => "ajuste",
        }
    }
}

impl FromStr for MovementKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "entrada" => Ok(MovementKind::Inbound),
            "salida" => Ok(MovementKind::Outbound),
            "ajuste" => Ok(MovementKind::Adjustment),
            other => Err(format!("tipo de movimiento desconocido: {other}")),
        }
    }
}

// --- 5. Movimentação de estoque (livro-razão, imutável) ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub item_id: Uuid,
    pub kind: MovementKind,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub reason: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
}

/// Movimentação ainda não gravada. Só pode ser construída a partir de um delta,
/// o que garante `kind = sinal(delta)` e `quantity = |delta|`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    item_id: Uuid,
    kind: MovementKind,
    quantity: Decimal,
    unit_price: Decimal,
    reason: String,
    reference: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    user_id: Uuid,
}

impl NewMovement {
    pub fn from_delta(
        item: &InventoryItem,
        delta: Decimal,
        reason: &str,
        notes: Option<&str>,
        reference: Option<&str>,
        user_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id: item.id,
            kind: MovementKind::from_delta(delta),
            quantity: delta.abs(),
            unit_price: item.unit_price,
            reason: reason.to_string(),
            reference: reference.map(str::to_string),
            notes: notes.map(str::to_string),
            created_at,
            user_id,
        }
    }

    pub fn item_id(&self) -> Uuid {
        self.item_id
    }

    pub fn kind(&self) -> MovementKind {
        self.kind
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn into_movement(self, id: Uuid) -> StockMovement {
        StockMovement {
            id,
            item_id: self.item_id,
            kind: self.kind,
            quantity: self.quantity,
            unit_price: self.unit_price,
            reason: self.reason,
            reference: self.reference,
            notes: self.notes,
            created_at: self.created_at,
            user_id: self.user_id,
        }
    }
}

// --- 6. Tipo de lançamento do diálogo "Actualizar Stock" ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StockEntryKind {
    Entrada, // soma a quantidade
    Salida,  // subtrai (valida saldo)
    Ajuste,  // define a quantidade absoluta
}

// --- 7. Ordenação da listagem ---
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Name,
    Quantity,
    CreatedAt,
    ExpirationDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}
