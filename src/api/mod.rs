pub mod handlers;

pub use handlers::health_check;

use crate::service::{ExportService, IngestionPipeline, InvoiceWorkspace};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// 共享状态: 入库、工作集、导出三个服务
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub workspace: Arc<InvoiceWorkspace>,
    pub exporter: Arc<ExportService>,
}

pub fn router(state: AppState) -> Router {
    let invoice_routes = Router::new()
        .route(
            "/api/invoices",
            post(handlers::ingest)
                .get(handlers::list_invoices)
                .delete(handlers::clear_invoices),
        )
        .route("/api/invoices/:file_name", axum::routing::delete(handlers::remove_invoice))
        .route("/api/invoices/:file_name/category", put(handlers::set_category))
        .route("/api/receivers", get(handlers::list_receivers))
        .route("/api/receivers/remove", post(handlers::remove_receiver))
        .route("/api/export", post(handlers::export))
        .with_state(state);

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(invoice_routes)
}
