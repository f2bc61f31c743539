use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("query string is empty")]
    EmptyQuery,

    #[error("query contains more than one statement")]
    MultipleStatements,

    #[error("statement modifies the database and read-only queries are enforced")]
    ReadOnlyViolation,

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database connection lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;
