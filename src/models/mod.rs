pub mod catalog;
pub mod document_type;
pub mod export;
pub mod invoice;
pub mod stored;
pub mod tax;

pub use catalog::{CatalogEntry, CategoryLookup, ExpenseCatalog, UNASSIGNED_LABEL};
pub use document_type::{infer_document_type, ReversalPolicy, CREDIT_NOTE_CODE};
pub use export::{Cell, ExportMatrix, ExportRow, ExportSummary, RowKind};
pub use invoice::{InvoiceRecord, Party, PaymentMethod, Summary, TaxBreakdownLine};
pub use stored::StoredInvoice;
