pub mod amount;
pub mod collate;

pub use amount::{format_amount, parse_amount, CurrencyTotals, NumberFormat};
