pub mod memory;
pub mod pool;
pub mod queries;
pub mod sqlite;
pub mod store;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{InvoiceStore, RemoveReport};
