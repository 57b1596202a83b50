//src/main.rs

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod services;
#[cfg(test)]
mod test_support;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;

/// Monta o router completo. Separado do `main` para os testes usarem o
/// mesmo roteamento sobre um estado com dublês.
pub fn app_router(app_state: AppState) -> Router {
    let inventory_routes = Router::new()
        .route(
            "/items",
            post(handlers::inventory::create_item).get(handlers::inventory::get_all_items),
        )
        .route(
            "/items/{id}",
            get(handlers::inventory::get_item)
                .put(handlers::inventory::update_item)
                .delete(handlers::inventory::delete_item),
        )
        .route("/items/{id}/stock", post(handlers::inventory::update_stock))
        .route("/items/{id}/quick-adjust", post(handlers::inventory::quick_adjust))
        .route("/view", put(handlers::inventory::update_view))
        .route("/status", get(handlers::inventory::get_status))
        .route("/reload", post(handlers::inventory::reload_items))
        .route("/categories", get(handlers::inventory::get_all_categories))
        .route("/low-stock", get(handlers::inventory::get_low_stock))
        .route("/out-of-stock", get(handlers::inventory::get_out_of_stock))
        .route("/expiring", get(handlers::inventory::get_expiring))
        .route(
            "/movements",
            get(handlers::inventory::get_movements).delete(handlers::inventory::clear_movements),
        );

    let dashboard_routes = Router::new().route("/summary", get(handlers::dashboard::get_summary));

    let report_routes = Router::new()
        .route("/preview", post(handlers::reports::preview))
        .route("/pdf", post(handlers::reports::export_pdf))
        .route("/image", post(handlers::reports::export_image))
        .route("/email", post(handlers::reports::email_report));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/inventory", inventory_routes)
        .nest("/api/dashboard", dashboard_routes)
        .nest("/api/reports", report_routes)
        .route(
            "/api/send-report",
            post(handlers::messaging::send_report).fallback(handlers::messaging::method_not_allowed),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env()?;
    let app_state = AppState::new(&config).await?;

    let app = app_router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    tracing::info!("📚 Documentação em http://{}/swagger-ui", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
