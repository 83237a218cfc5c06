use einvoice_export_rust::{
    api::{self, AppState},
    models::ExpenseCatalog,
    AggregationEngine, AppConfig, ExportService, IngestionPipeline, InvoiceStore, InvoiceWorkspace,
    SqliteStore,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::{fmt::time::ChronoLocal, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式, RUST_LOG 可覆盖级别
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 打开发票存储
    let store: Arc<dyn InvoiceStore> = Arc::new(SqliteStore::open(&config.store.path).await?);

    // 费用类别目录
    let catalog = match &config.catalog.path {
        Some(path) => {
            let catalog = ExpenseCatalog::from_json_file(path)?;
            info!("Loaded {} expense categories from {:?}", catalog.entries().len(), path);
            catalog
        }
        None => ExpenseCatalog::default(),
    };

    let engine = AggregationEngine::new(&catalog, config.export.reversal_policy())
        .with_number_format(config.export.number_format())
        .with_default_currency(config.export.default_currency.clone());

    let state = AppState {
        pipeline: Arc::new(IngestionPipeline::new(store.clone())),
        workspace: Arc::new(InvoiceWorkspace::new(store.clone())),
        exporter: Arc::new(ExportService::new(store, engine, config.export.output_dir.clone())),
    };

    let app = api::router(state).layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST   /api/invoices                      - ingest documents");
    info!("  GET    /api/invoices                      - list working set");
    info!("  PUT    /api/invoices/:file_name/category  - assign expense category");
    info!("  GET    /api/receivers                     - receiver groups");
    info!("  POST   /api/export                        - export and clear");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
