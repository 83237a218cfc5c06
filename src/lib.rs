pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod parser;
pub mod service;
pub mod util;

pub use config::AppConfig;
pub use db::{InvoiceStore, MemoryStore, SqliteStore};
pub use error::{ExportError, ParseError, StoreError};
pub use parser::parse_document;
pub use service::{AggregationEngine, ExportService, IngestionPipeline, InvoiceWorkspace};
