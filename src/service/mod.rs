pub mod aggregator;
pub mod exporter;
pub mod ingest;
pub mod workspace;

pub use aggregator::{group_by_receiver, AggregationEngine, ExportOptions, ReceiverGroup};
pub use exporter::{default_file_name, ExportOutcome, ExportRequest, ExportService};
pub use ingest::{BatchReport, IncomingFile, IngestReport, IngestResult, IngestionPipeline, Progress};
pub use workspace::{InvoiceWorkspace, WorkspaceDocument};
