//! tally-ingest: statement text extraction and deduplicating ingestion.

pub mod convert;
pub mod parsers;
pub mod pipeline;

pub use convert::DEFAULT_CONVERTER;
pub use parsers::statement_line::{LineError, ParsedStatement, StatementLineParser};
pub use pipeline::{FileReport, IngestReport, Ingestor};
