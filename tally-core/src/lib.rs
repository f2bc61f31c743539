//! tally-core: record model shared by the store, the ingester and the CLI

pub mod aggregates;
pub mod time;
pub mod transaction;

pub use aggregates::{DescriptionCount, DescriptionTotal};
pub use time::{DateRange, parse_statement_date};
pub use transaction::{
    DedupKey, NewTransaction, Transaction, TransactionType, UnknownTransactionType, parse_currency,
};
