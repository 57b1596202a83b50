// src/handlers/inventory.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    models::inventory::{
        InventoryItem, NewItem, SortKey, SortOrder, StockEntryKind, StockMovement, StockStatus,
        DEFAULT_LOCATION,
    },
    services::inventory_service::StockChangeRequest,
};

// ---
// Validação Customizada
// ---
fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("El valor no puede ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

// Casas decimais das colunas NUMERIC(14,3) e NUMERIC(14,2)
const QUANTITY_SCALE: u32 = 3;
const PRICE_SCALE: u32 = 2;

fn validate_scale(val: &Decimal, max: u32) -> Result<(), ValidationError> {
    if val.normalize().scale() > max {
        let mut err = ValidationError::new("scale");
        err.add_param("max".into(), &max);
        err.message = Some(format!("Se admiten como máximo {} decimales.", max).into());
        return Err(err);
    }
    Ok(())
}

fn validate_quantity(val: &Decimal) -> Result<(), ValidationError> {
    validate_not_negative(val)?;
    validate_scale(val, QUANTITY_SCALE)
}

fn validate_price(val: &Decimal) -> Result<(), ValidationError> {
    validate_not_negative(val)?;
    validate_scale(val, PRICE_SCALE)
}

fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("La cantidad debe ser mayor que cero.".into());
        return Err(err);
    }
    validate_scale(val, QUANTITY_SCALE)
}

// ---
// Payload: ItemPayload (criação)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    #[validate(length(min = 1, message = "El nombre es obligatorio."))]
    pub name: String,

    #[validate(length(min = 1, message = "La categoría es obligatoria."))]
    pub category: String,

    #[validate(length(min = 1, message = "La unidad de medida es obligatoria."))]
    pub unit: String,

    #[validate(custom(function = "validate_quantity"))]
    #[serde(default)]
    pub quantity: Decimal,

    #[validate(custom(function = "validate_price"))]
    #[serde(default)]
    pub unit_price: Decimal,

    #[validate(custom(function = "validate_quantity"))]
    #[serde(default)]
    pub min_stock: Decimal,

    pub supplier: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    // Vazio = "Almacén principal"
    pub location: Option<String>,
    pub description: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ItemPayload {
    fn into_draft(self) -> NewItem {
        NewItem {
            name: self.name.trim().to_string(),
            category: self.category.trim().to_string(),
            quantity: self.quantity,
            unit: self.unit.trim().to_string(),
            unit_price: self.unit_price,
            min_stock: self.min_stock,
            supplier: non_empty(self.supplier),
            expiration_date: self.expiration_date,
            location: non_empty(self.location).unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            description: non_empty(self.description),
        }
    }
}

// ---
// Payload: ItemUpdatePayload (edição do registro completo)
// ---
// Sem defaults numéricos: omitir `quantity` não pode zerar o estoque.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdatePayload {
    #[validate(length(min = 1, message = "El nombre es obligatorio."))]
    pub name: String,

    #[validate(length(min = 1, message = "La categoría es obligatoria."))]
    pub category: String,

    #[validate(length(min = 1, message = "La unidad de medida es obligatoria."))]
    pub unit: String,

    #[validate(custom(function = "validate_quantity"))]
    pub quantity: Decimal,

    #[validate(custom(function = "validate_price"))]
    pub unit_price: Decimal,

    #[validate(custom(function = "validate_quantity"))]
    pub min_stock: Decimal,

    pub supplier: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl From<ItemUpdatePayload> for ItemPayload {
    fn from(p: ItemUpdatePayload) -> Self {
        Self {
            name: p.name,
            category: p.category,
            unit: p.unit,
            quantity: p.quantity,
            unit_price: p.unit_price,
            min_stock: p.min_stock,
            supplier: p.supplier,
            expiration_date: p.expiration_date,
            location: p.location,
            description: p.description,
        }
    }
}

// ---
// Payload: StockUpdatePayload (diálogo "Actualizar Stock")
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdatePayload {
    pub kind: StockEntryKind,

    // > 0 para entrada/salida; >= 0 para ajuste (checado no serviço)
    #[validate(custom(function = "validate_quantity"))]
    pub quantity: Decimal,

    #[validate(length(min = 1, message = "El motivo es obligatorio."))]
    #[schema(example = "compra")]
    pub reason: String,

    pub notes: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AdjustDirection {
    Add,
    Subtract,
}

fn default_amount() -> Decimal {
    Decimal::ONE
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuickAdjustPayload {
    pub direction: AdjustDirection,

    #[validate(custom(function = "validate_positive"))]
    #[serde(default = "default_amount")]
    pub amount: Decimal,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewPayload {
    pub search_term: Option<String>,
    pub selected_category: Option<String>,
    pub sort_by: Option<SortKey>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListItemsQuery {
    /// Texto buscado em nome, categoria, fornecedor e descrição
    pub search: Option<String>,
    /// Categoria exata (vazio = todas)
    pub category: Option<String>,
    pub sort_by: Option<SortKey>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpiringQuery {
    /// Janela em dias (padrão 30)
    pub days: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MovementsQuery {
    pub item_id: Option<Uuid>,
}

// Insumo + badge de estoque, como no detalhe do painel
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub status: StockStatus,
    #[schema(example = "Stock Bajo")]
    pub status_label: &'static str,
    pub stock_value: Decimal,
}

impl From<InventoryItem> for ItemDetail {
    fn from(item: InventoryItem) -> Self {
        let status = item.status();
        Self {
            status,
            status_label: status.label(),
            stock_value: item.stock_value(),
            item,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub loading: bool,
    pub error: Option<String>,
    pub item_count: usize,
    pub movement_count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuickAdjustResponse {
    pub item_id: Uuid,
    pub current_quantity: Decimal,
    // Ainda não gravado; sai no próximo disparo do debounce
    pub pending_delta: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClearHistoryResponse {
    pub deleted: u64,
}

// Aplica no estado de sessão o que veio preenchido.
fn apply_view(app_state: &AppState, view: ViewPayload) {
    let service = &app_state.inventory_service;

    if let Some(term) = view.search_term {
        service.set_search_term(term);
    }
    if let Some(category) = view.selected_category {
        service.set_selected_category(category);
    }
    if view.sort_by.is_some() || view.sort_order.is_some() {
        let (current_by, current_order) = service.with_state(|s| (s.sort_by, s.sort_order));
        service.set_sorting(
            view.sort_by.unwrap_or(current_by),
            view.sort_order.unwrap_or(current_order),
        );
    }
}

fn status_of(app_state: &AppState) -> StatusResponse {
    app_state.inventory_service.with_state(|s| StatusResponse {
        loading: s.loading,
        error: s.error.clone(),
        item_count: s.items.len(),
        movement_count: s.movements.len(),
    })
}

// GET /api/inventory/items
#[utoipa::path(
    get,
    path = "/api/inventory/items",
    tag = "Inventory",
    params(ListItemsQuery),
    responses(
        (status = 200, description = "Insumos filtrados e ordenados conforme a sessão", body = Vec<InventoryItem>)
    )
)]
pub async fn get_all_items(
    State(app_state): State<AppState>,
    Query(query): Query<ListItemsQuery>,
) -> impl IntoResponse {
    apply_view(
        &app_state,
        ViewPayload {
            search_term: query.search,
            selected_category: query.category,
            sort_by: query.sort_by,
            sort_order: query.sort_order,
        },
    );

    Json(app_state.inventory_service.filtered_items())
}

// PUT /api/inventory/view
#[utoipa::path(
    put,
    path = "/api/inventory/view",
    tag = "Inventory",
    request_body = ViewPayload,
    responses(
        (status = 200, description = "Visão atualizada", body = Vec<InventoryItem>)
    )
)]
pub async fn update_view(
    State(app_state): State<AppState>,
    Json(payload): Json<ViewPayload>,
) -> impl IntoResponse {
    apply_view(&app_state, payload);
    Json(app_state.inventory_service.filtered_items())
}

// GET /api/inventory/status
#[utoipa::path(
    get,
    path = "/api/inventory/status",
    tag = "Inventory",
    responses((status = 200, description = "Estado da sessão", body = StatusResponse))
)]
pub async fn get_status(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(status_of(&app_state))
}

// POST /api/inventory/reload
#[utoipa::path(
    post,
    path = "/api/inventory/reload",
    tag = "Inventory",
    responses((status = 200, description = "Recarga feita (falhas ficam em `error`)", body = StatusResponse))
)]
pub async fn reload_items(State(app_state): State<AppState>) -> impl IntoResponse {
    app_state.inventory_service.load_items().await;
    Json(status_of(&app_state))
}

// GET /api/inventory/items/{id}
#[utoipa::path(
    get,
    path = "/api/inventory/items/{id}",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "ID do insumo")),
    responses(
        (status = 200, body = ItemDetail),
        (status = 404, description = "Insumo não encontrado")
    )
)]
pub async fn get_item(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state
        .inventory_service
        .item_by_id(id)
        .ok_or(AppError::ItemNotFound(id))?;

    Ok(Json(ItemDetail::from(item)))
}

// POST /api/inventory/items
#[utoipa::path(
    post,
    path = "/api/inventory/items",
    tag = "Inventory",
    request_body = ItemPayload,
    responses(
        (status = 201, description = "Insumo criado", body = InventoryItem),
        (status = 400, description = "Campos inválidos"),
        (status = 502, description = "Falha no banco remoto")
    )
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    Json(payload): Json<ItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let item = app_state.inventory_service.add_item(payload.into_draft()).await?;

    Ok((StatusCode::CREATED, Json(item)))
}

// PUT /api/inventory/items/{id}
#[utoipa::path(
    put,
    path = "/api/inventory/items/{id}",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "ID do insumo")),
    request_body = ItemUpdatePayload,
    responses(
        (status = 200, description = "Insumo atualizado", body = InventoryItem),
        (status = 400, description = "Campos inválidos"),
        (status = 404, description = "Insumo não encontrado")
    )
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ItemUpdatePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let current = app_state
        .inventory_service
        .item_by_id(id)
        .ok_or(AppError::ItemNotFound(id))?;

    let draft = ItemPayload::from(payload).into_draft();
    let item = draft.into_item(id, current.created_at, current.updated_at);
    let updated = app_state.inventory_service.update_item(item).await?;

    Ok(Json(updated))
}

// DELETE /api/inventory/items/{id}
#[utoipa::path(
    delete,
    path = "/api/inventory/items/{id}",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "ID do insumo")),
    responses(
        (status = 204, description = "Insumo removido"),
        (status = 502, description = "Removido localmente, mas o banco remoto falhou")
    )
)]
pub async fn delete_item(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // Toques pendentes do insumo não têm mais onde cair.
    app_state.quick_adjuster.forget(id);
    app_state.inventory_service.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/inventory/items/{id}/stock
#[utoipa::path(
    post,
    path = "/api/inventory/items/{id}/stock",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "ID do insumo")),
    request_body = StockUpdatePayload,
    responses(
        (status = 201, description = "Movimentação registrada", body = StockMovement),
        (status = 400, description = "Quantidade ou motivo inválidos"),
        (status = 404, description = "Insumo não encontrado"),
        (status = 422, description = "Estoque insuficiente para a saída"),
        (status = 500, description = "Quantidade gravada, mas o histórico falhou")
    )
)]
pub async fn update_stock(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockUpdatePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let movement = app_state
        .inventory_service
        .register_movement(
            id,
            StockChangeRequest {
                kind: payload.kind,
                quantity: payload.quantity,
                reason: payload.reason,
                notes: non_empty(payload.notes),
                reference: non_empty(payload.reference),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(movement)))
}

// POST /api/inventory/items/{id}/quick-adjust
#[utoipa::path(
    post,
    path = "/api/inventory/items/{id}/quick-adjust",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "ID do insumo")),
    request_body = QuickAdjustPayload,
    responses(
        (status = 202, description = "Toque acumulado; gravado ao fim da janela de debounce", body = QuickAdjustResponse),
        (status = 404, description = "Insumo não encontrado")
    )
)]
pub async fn quick_adjust(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuickAdjustPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let amount = match payload.direction {
        AdjustDirection::Add => payload.amount,
        AdjustDirection::Subtract => -payload.amount,
    };

    let pending_delta = app_state.quick_adjuster.tap(id, amount)?;
    let current_quantity = app_state
        .inventory_service
        .item_by_id(id)
        .map(|item| item.quantity)
        .unwrap_or_default();

    Ok((
        StatusCode::ACCEPTED,
        Json(QuickAdjustResponse { item_id: id, current_quantity, pending_delta }),
    ))
}

// GET /api/inventory/categories
#[utoipa::path(
    get,
    path = "/api/inventory/categories",
    tag = "Inventory",
    responses((status = 200, description = "Categorias distintas, ordenadas", body = Vec<String>))
)]
pub async fn get_all_categories(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(app_state.inventory_service.categories())
}

// GET /api/inventory/low-stock
#[utoipa::path(
    get,
    path = "/api/inventory/low-stock",
    tag = "Inventory",
    responses((status = 200, description = "Quantidade <= estoque mínimo", body = Vec<InventoryItem>))
)]
pub async fn get_low_stock(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(app_state.inventory_service.low_stock_items())
}

// GET /api/inventory/out-of-stock
#[utoipa::path(
    get,
    path = "/api/inventory/out-of-stock",
    tag = "Inventory",
    responses((status = 200, description = "Quantidade zero", body = Vec<InventoryItem>))
)]
pub async fn get_out_of_stock(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(app_state.inventory_service.out_of_stock_items())
}

// GET /api/inventory/expiring
#[utoipa::path(
    get,
    path = "/api/inventory/expiring",
    tag = "Inventory",
    params(ExpiringQuery),
    responses((status = 200, description = "Vencem entre hoje e hoje + N dias", body = Vec<InventoryItem>))
)]
pub async fn get_expiring(
    State(app_state): State<AppState>,
    Query(query): Query<ExpiringQuery>,
) -> impl IntoResponse {
    let days = query.days.unwrap_or(app_state.expiring_days);
    Json(app_state.inventory_service.expiring_items(days))
}

// GET /api/inventory/movements
#[utoipa::path(
    get,
    path = "/api/inventory/movements",
    tag = "Inventory",
    params(MovementsQuery),
    responses((status = 200, description = "Histórico, mais recente primeiro", body = Vec<StockMovement>))
)]
pub async fn get_movements(
    State(app_state): State<AppState>,
    Query(query): Query<MovementsQuery>,
) -> impl IntoResponse {
    Json(app_state.inventory_service.movements(query.item_id))
}

// DELETE /api/inventory/movements
#[utoipa::path(
    delete,
    path = "/api/inventory/movements",
    tag = "Inventory",
    responses(
        (status = 200, description = "Histórico do usuário apagado", body = ClearHistoryResponse),
        (status = 502, description = "Falha no banco remoto")
    )
)]
pub async fn clear_movements(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let deleted = app_state.inventory_service.clear_history().await?;
    Ok(Json(ClearHistoryResponse { deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app_router,
        test_support::{sample_item, test_app},
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, body)
    }

    #[tokio::test]
    async fn create_item_answers_created_with_the_default_location() {
        let app = test_app(vec![], None).await;

        let (status, body) = send(
            app_router(app.state.clone()),
            json_request(
                "POST",
                "/api/inventory/items",
                json!({
                    "name": "Detergente",
                    "category": "Detergentes",
                    "unit": "litros",
                    "quantity": 12,
                    "unitPrice": 3.5,
                    "minStock": 4
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["location"], DEFAULT_LOCATION);
        assert_eq!(app.state.inventory_service.items().len(), 1);
    }

    #[tokio::test]
    async fn create_item_rejects_missing_name_and_negative_stock() {
        let app = test_app(vec![], None).await;

        let (status, body) = send(
            app_router(app.state),
            json_request(
                "POST",
                "/api/inventory/items",
                json!({ "name": "", "category": "Detergentes", "unit": "litros", "quantity": -1 }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"]["name"].is_array());
        assert!(body["details"]["quantity"].is_array());
    }

    #[tokio::test]
    async fn create_item_rejects_more_decimals_than_the_columns_keep() {
        let app = test_app(vec![], None).await;

        let (status, body) = send(
            app_router(app.state.clone()),
            json_request(
                "POST",
                "/api/inventory/items",
                json!({ "name": "Cera", "category": "Pisos", "unit": "litros", "quantity": 1.2345 }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["quantity"][0], "Se admiten como máximo 3 decimales.");
        assert!(app.state.inventory_service.items().is_empty());
    }

    #[test]
    fn prices_keep_two_decimals_and_quantities_three() {
        assert!(validate_price(&Decimal::new(3555, 3)).is_err());
        assert!(validate_price(&Decimal::new(3550, 3)).is_ok());
        assert!(validate_quantity(&Decimal::new(1250, 3)).is_ok());
        assert!(validate_positive(&Decimal::new(5, 4)).is_err());
    }

    #[tokio::test]
    async fn update_without_quantity_does_not_reset_the_stock() {
        let item = sample_item("Trapeador", "Utensilios", 7, 1);
        let id = item.id;
        let app = test_app(vec![item], None).await;

        let (status, _) = send(
            app_router(app.state.clone()),
            json_request(
                "PUT",
                &format!("/api/inventory/items/{id}"),
                json!({ "name": "Trapeador", "category": "Utensilios", "unit": "unidades", "unitPrice": 2, "minStock": 1 }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(app.state.inventory_service.item_by_id(id).unwrap().quantity, Decimal::from(7));
        assert_eq!(app.repo.stored_item(id).unwrap().quantity, Decimal::from(7));
    }

    #[tokio::test]
    async fn full_update_replaces_the_record() {
        let item = sample_item("Trapeador", "Utensilios", 7, 1);
        let id = item.id;
        let app = test_app(vec![item], None).await;

        let (status, body) = send(
            app_router(app.state.clone()),
            json_request(
                "PUT",
                &format!("/api/inventory/items/{id}"),
                json!({
                    "name": "Trapeador",
                    "category": "Utensilios",
                    "unit": "unidades",
                    "quantity": 7,
                    "unitPrice": 2.5,
                    "minStock": 3
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"], DEFAULT_LOCATION);
        assert_eq!(app.repo.stored_item(id).unwrap().min_stock, Decimal::from(3));
    }

    #[tokio::test]
    async fn outbound_dialog_beyond_stock_is_unprocessable() {
        let item = sample_item("Cloro", "Desinfectantes", 10, 5);
        let id = item.id;
        let app = test_app(vec![item], None).await;

        let (status, _) = send(
            app_router(app.state.clone()),
            json_request(
                "POST",
                &format!("/api/inventory/items/{id}/stock"),
                json!({ "kind": "salida", "quantity": 12, "reason": "uso_operacional" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(app.repo.quantity_writes().is_empty());
    }

    #[tokio::test]
    async fn inbound_dialog_records_a_movement() {
        let item = sample_item("Cloro", "Desinfectantes", 10, 5);
        let id = item.id;
        let app = test_app(vec![item], None).await;

        let (status, body) = send(
            app_router(app.state.clone()),
            json_request(
                "POST",
                &format!("/api/inventory/items/{id}/stock"),
                json!({ "kind": "entrada", "quantity": 5, "reason": "compra", "reference": "FAC-001" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["kind"], "entrada");
        assert_eq!(body["reference"], "FAC-001");
        assert_eq!(app.state.inventory_service.item_by_id(id).unwrap().quantity, Decimal::from(15));
    }

    #[tokio::test]
    async fn quick_adjust_is_accepted_and_reports_the_pending_delta() {
        let item = sample_item("Guantes", "Protección", 3, 1);
        let id = item.id;
        let app = test_app(vec![item], None).await;
        let uri = format!("/api/inventory/items/{id}/quick-adjust");

        send(app_router(app.state.clone()), json_request("POST", &uri, json!({ "direction": "add" }))).await;
        let (status, body) = send(
            app_router(app.state.clone()),
            json_request("POST", &uri, json!({ "direction": "add", "amount": 2 })),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        let response: QuickAdjustResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.pending_delta, Decimal::from(3));
        assert_eq!(response.current_quantity, Decimal::from(3));
    }

    #[tokio::test]
    async fn list_query_updates_the_session_view() {
        let app = test_app(
            vec![
                sample_item("Escoba", "Utensilios", 1, 1),
                sample_item("Detergente", "Detergentes", 1, 1),
            ],
            None,
        )
        .await;

        let request = Request::get("/api/inventory/items?category=Utensilios").body(Body::empty()).unwrap();
        let (status, body) = send(app_router(app.state.clone()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], "Escoba");
        assert!(app.state.inventory_service.with_state(|s| s.selected_category == "Utensilios"));
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let app = test_app(vec![], None).await;

        let request = Request::get(format!("/api/inventory/items/{}", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app_router(app.state), request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn item_detail_carries_the_stock_badge() {
        let item = sample_item("Lejía", "Desinfectantes", 2, 2);
        let id = item.id;
        let app = test_app(vec![item], None).await;

        let request = Request::get(format!("/api/inventory/items/{id}")).body(Body::empty()).unwrap();
        let (status, body) = send(app_router(app.state), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Lejía");
        assert_eq!(body["status"], "low");
        assert_eq!(body["statusLabel"], "Stock Bajo");
    }

    #[tokio::test]
    async fn clearing_history_reports_the_deleted_rows() {
        let item = sample_item("Cloro", "Desinfectantes", 10, 5);
        let id = item.id;
        let app = test_app(vec![item], None).await;
        app.state.inventory_service.update_stock(id, Decimal::ONE, "compra").await.unwrap();

        let request = Request::delete("/api/inventory/movements").body(Body::empty()).unwrap();
        let (status, body) = send(app_router(app.state.clone()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], 1);
        assert!(app.state.inventory_service.movements(None).is_empty());
    }
}
