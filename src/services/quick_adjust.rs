// src/services/quick_adjust.rs

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{common::error::AppError, services::inventory_service::InventoryService};

/// Motivo gravado no histórico para os toques acumulados de +/-.
pub const QUICK_ADJUST_REASON: &str = "Ajuste rápido acumulado";

type FlushFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type FlushFn = Arc<dyn Fn(Decimal) -> FlushFuture + Send + Sync>;

#[derive(Default)]
struct Pending {
    delta: Decimal,
    // Cada toque rearma o timer; só o timer da última geração dispara.
    generation: u64,
}

/// Acumula deltas e chama `flush` uma única vez quando passa `delay` sem
/// novos toques.
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Arc<Mutex<Pending>>,
    flush: FlushFn,
}

impl Debouncer {
    pub fn new<F, Fut>(delay: Duration, flush: F) -> Self
    where
        F: Fn(Decimal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            delay,
            pending: Arc::new(Mutex::new(Pending::default())),
            flush: Arc::new(move |delta| Box::pin(flush(delta))),
        }
    }

    /// Soma `amount` ao acumulado e rearma o timer. Devolve o acumulado atual.
    pub fn push(&self, amount: Decimal) -> Decimal {
        let (generation, accumulated) = {
            let mut pending = self.pending.lock();
            pending.delta += amount;
            pending.generation += 1;
            (pending.generation, pending.delta)
        };

        let pending = self.pending.clone();
        let flush = self.flush.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let delta = {
                let mut pending = pending.lock();
                if pending.generation != generation {
                    return;
                }
                std::mem::take(&mut pending.delta)
            };

            if delta.is_zero() {
                tracing::debug!("Ajuste rápido sem efeito líquido, nada a gravar");
                return;
            }

            flush(delta).await;
        });

        accumulated
    }
}

/// Um debouncer por insumo, para que botões de itens diferentes não se
/// misturem.
#[derive(Clone)]
pub struct QuickAdjuster {
    inventory: InventoryService,
    delay: Duration,
    debouncers: Arc<Mutex<HashMap<Uuid, Debouncer>>>,
}

impl QuickAdjuster {
    pub fn new(inventory: InventoryService, delay: Duration) -> Self {
        Self {
            inventory,
            delay,
            debouncers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registra um toque. O estoque só muda quando o debouncer descarrega.
    pub fn tap(&self, item_id: Uuid, amount: Decimal) -> Result<Decimal, AppError> {
        if self.inventory.item_by_id(item_id).is_none() {
            return Err(AppError::ItemNotFound(item_id));
        }

        let debouncer = self
            .debouncers
            .lock()
            .entry(item_id)
            .or_insert_with(|| self.debouncer_for(item_id))
            .clone();

        Ok(debouncer.push(amount))
    }

    /// Descarta o debouncer de um insumo removido. Um disparo já armado
    /// ainda roda e falha com "no encontrado".
    pub fn forget(&self, item_id: Uuid) {
        self.debouncers.lock().remove(&item_id);
    }

    fn debouncer_for(&self, item_id: Uuid) -> Debouncer {
        let inventory = self.inventory.clone();

        Debouncer::new(self.delay, move |delta| {
            let inventory = inventory.clone();
            async move {
                match inventory.update_stock(item_id, delta, QUICK_ADJUST_REASON).await {
                    Ok(_) => {
                        let action = if delta.is_sign_positive() { "agregaron" } else { "quitaron" };
                        tracing::info!(item_id = %item_id, "Se {} {} unidades correctamente.", action, delta.abs());
                    }
                    Err(e) => {
                        tracing::warn!(item_id = %item_id, "No se pudo actualizar el stock: {}", e);
                    }
                }
            }
        })
    }
}
