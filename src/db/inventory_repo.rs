// src/db/inventory_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::inventory::{InventoryItem, NewItem, NewMovement, StockMovement, DEFAULT_LOCATION},
};

/// Acesso às tabelas hospedadas `insumos` e `movimientos_inventario`.
///
/// Nenhuma operação é transacional entre si: o protocolo de atualização de
/// estoque grava a quantidade e o histórico em chamadas separadas.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn fetch_items(&self) -> Result<Vec<InventoryItem>, AppError>;

    async fn insert_item(&self, draft: &NewItem) -> Result<InventoryItem, AppError>;

    /// Retorna o número de linhas afetadas (0 quando o id não existe no banco).
    async fn update_item(&self, item: &InventoryItem) -> Result<u64, AppError>;

    async fn delete_item(&self, id: Uuid) -> Result<(), AppError>;

    async fn update_quantity(&self, id: Uuid, quantity: Decimal) -> Result<(), AppError>;

    async fn insert_movement(&self, movement: &NewMovement) -> Result<StockMovement, AppError>;

    async fn fetch_movements(&self, user_id: Uuid) -> Result<Vec<StockMovement>, AppError>;

    async fn delete_movements_by_user(&self, user_id: Uuid) -> Result<u64, AppError>;
}

// Linha da tabela `insumos`, com os nomes de coluna do banco hospedado.
#[derive(Debug, FromRow)]
struct InsumoRow {
    id: Uuid,
    nombre: String,
    categoria: String,
    stockactual: Decimal,
    unidadmedida: String,
    precio: Decimal,
    stockminimo: Decimal,
    proveedor: Option<String>,
    fechavencimiento: Option<NaiveDate>,
    ubicacion: Option<String>,
    descripcion: Option<String>,
    fecha_creacion: Option<NaiveDate>,
    fecha_actualizacion: Option<NaiveDate>,
}

impl InsumoRow {
    fn into_item(self, today: NaiveDate) -> InventoryItem {
        InventoryItem {
            id: self.id,
            name: self.nombre,
            category: self.categoria,
            quantity: self.stockactual,
            unit: self.unidadmedida,
            unit_price: self.precio,
            min_stock: self.stockminimo,
            supplier: self.proveedor,
            expiration_date: self.fechavencimiento,
            location: self.ubicacion.unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            description: self.descripcion,
            created_at: self.fecha_creacion.unwrap_or(today),
            updated_at: self.fecha_actualizacion.unwrap_or(today),
        }
    }
}

// Linha da tabela `movimientos_inventario`.
#[derive(Debug, FromRow)]
struct MovimientoRow {
    id: Uuid,
    producto_id: Uuid,
    tipo_movimiento: String,
    cantidad: Decimal,
    precio_unitario: Decimal,
    motivo: String,
    referencia: Option<String>,
    notas: Option<String>,
    usuario_id: Uuid,
    fecha_movimiento: DateTime<Utc>,
}

impl TryFrom<MovimientoRow> for StockMovement {
    type Error = AppError;

    fn try_from(row: MovimientoRow) -> Result<Self, Self::Error> {
        let kind = row
            .tipo_movimiento
            .parse()
            .map_err(|e: String| AppError::InternalServerError(anyhow::Error::msg(e)))?;

        Ok(StockMovement {
            id: row.id,
            item_id: row.producto_id,
            kind,
            quantity: row.cantidad,
            unit_price: row.precio_unitario,
            reason: row.motivo,
            reference: row.referencia,
            notes: row.notas,
            created_at: row.fecha_movimiento,
            user_id: row.usuario_id,
        })
    }
}

const INSUMO_COLUMNS: &str = "id, nombre, categoria, stockactual, unidadmedida, precio, stockminimo, \
     proveedor, fechavencimiento, ubicacion, descripcion, fecha_creacion, fecha_actualizacion";

const MOVIMIENTO_COLUMNS: &str = "id, producto_id, tipo_movimiento, cantidad, precio_unitario, motivo, \
     referencia, notas, usuario_id, fecha_movimiento";

#[derive(Clone)]
pub struct PgInventoryRepository {
    pool: PgPool,
}

impl PgInventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[async_trait]
impl InventoryRepository for PgInventoryRepository {
    async fn fetch_items(&self) -> Result<Vec<InventoryItem>, AppError> {
        let rows = sqlx::query_as::<_, InsumoRow>(&format!("SELECT {INSUMO_COLUMNS} FROM insumos"))
            .fetch_all(&self.pool)
            .await?;

        let today = today();
        Ok(rows.into_iter().map(|row| row.into_item(today)).collect())
    }

    async fn insert_item(&self, draft: &NewItem) -> Result<InventoryItem, AppError> {
        let row = sqlx::query_as::<_, InsumoRow>(&format!(
            r#"
            INSERT INTO insumos
                (nombre, categoria, stockactual, unidadmedida, precio, stockminimo,
                 proveedor, fechavencimiento, ubicacion, descripcion)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {INSUMO_COLUMNS}
            "#
        ))
        .bind(&draft.name)
        .bind(&draft.category)
        .bind(draft.quantity)
        .bind(&draft.unit)
        .bind(draft.unit_price)
        .bind(draft.min_stock)
        .bind(&draft.supplier)
        .bind(draft.expiration_date)
        .bind(&draft.location)
        .bind(&draft.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_item(today()))
    }

    async fn update_item(&self, item: &InventoryItem) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE insumos SET
                nombre = $2,
                categoria = $3,
                stockactual = $4,
                unidadmedida = $5,
                precio = $6,
                stockminimo = $7,
                proveedor = $8,
                fechavencimiento = $9,
                ubicacion = $10,
                descripcion = $11,
                fecha_actualizacion = CURRENT_DATE
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.quantity)
        .bind(&item.unit)
        .bind(item.unit_price)
        .bind(item.min_stock)
        .bind(&item.supplier)
        .bind(item.expiration_date)
        .bind(&item.location)
        .bind(&item.description)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_item(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM insumos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_quantity(&self, id: Uuid, quantity: Decimal) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE insumos SET stockactual = $2, fecha_actualizacion = CURRENT_DATE WHERE id = $1",
        )
        .bind(id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Registra uma movimentação no livro-razão (auditoria).
    async fn insert_movement(&self, movement: &NewMovement) -> Result<StockMovement, AppError> {
        let row = sqlx::query_as::<_, MovimientoRow>(&format!(
            r#"
            INSERT INTO movimientos_inventario
                (producto_id, tipo_movimiento, cantidad, precio_unitario, motivo,
                 referencia, notas, usuario_id, fecha_movimiento)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {MOVIMIENTO_COLUMNS}
            "#
        ))
        .bind(movement.item_id())
        .bind(movement.kind().as_str())
        .bind(movement.quantity())
        .bind(movement.unit_price())
        .bind(movement.reason())
        .bind(movement.reference())
        .bind(movement.notes())
        .bind(movement.user_id())
        .bind(movement.created_at())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn fetch_movements(&self, user_id: Uuid) -> Result<Vec<StockMovement>, AppError> {
        let rows = sqlx::query_as::<_, MovimientoRow>(&format!(
            "SELECT {MOVIMIENTO_COLUMNS} FROM movimientos_inventario \
             WHERE usuario_id = $1 ORDER BY fecha_movimiento DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StockMovement::try_from).collect()
    }

    async fn delete_movements_by_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM movimientos_inventario WHERE usuario_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
