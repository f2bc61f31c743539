//! Table layout. The DDL text is also shown to the language model, so keep
//! the two in sync by deriving the prompt from [`TRANSACTIONS_DDL`].

use rusqlite::Connection;

use crate::error::Result;

pub const TRANSACTIONS_DDL: &str = "create table transactions
(
    id          integer primary key,
    date        datetime,
    description text,
    type        text,
    amount      real,
    net_amount  real,
    settle_date datetime
);";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id          INTEGER PRIMARY KEY,
    date        DATETIME,
    description TEXT,
    type        TEXT,
    amount      REAL,
    net_amount  REAL,
    settle_date DATETIME
);

CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
";

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
