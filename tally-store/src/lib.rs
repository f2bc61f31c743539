//! tally-store: SQLite-backed storage for statement transactions.
//!
//! Two surfaces: typed reads and writes over the `transactions` table, and
//! raw execution of arbitrary SQL returning dynamically typed rows.

pub mod error;
pub mod raw;
pub mod schema;
pub mod store;

pub use error::{Result, StoreError};
pub use raw::{RawRow, SqlValue};
pub use schema::TRANSACTIONS_DDL;
pub use store::Store;
