//! Directory ingestion: one worker thread per statement file.
//!
//! Each file is parsed, checked row by row against committed storage, and the
//! surviving rows are written in a single batch. Files never coordinate with
//! each other, so two files introducing the same new row at the same moment
//! can both insert it; duplicate detection only sees what is already committed.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_store::Store;

use crate::convert::{self, DEFAULT_CONVERTER};
use crate::parsers::statement_line::StatementLineParser;

/// Outcome for one statement file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    /// Rows recognised as transactions.
    pub parsed: usize,
    /// Rows that matched the layout but had unusable fields.
    pub rejected: usize,
    /// Rows already present in storage.
    pub duplicates: usize,
    pub inserted: usize,
    /// Set when the file was abandoned (open, read or write failure).
    pub error: Option<String>,
}

impl FileReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            parsed: 0,
            rejected: 0,
            duplicates: 0,
            inserted: 0,
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files: Vec<FileReport>,
    /// Text files produced by PDF conversion and removed afterwards.
    pub cleaned_up: Vec<PathBuf>,
}

impl IngestReport {
    pub fn inserted(&self) -> usize {
        self.files.iter().map(|f| f.inserted).sum()
    }

    pub fn duplicates(&self) -> usize {
        self.files.iter().map(|f| f.duplicates).sum()
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| !f.is_ok())
    }
}

pub struct Ingestor {
    store: Store,
    parser: StatementLineParser,
    converter: String,
}

impl Ingestor {
    pub fn new(store: Store) -> Result<Self> {
        Ok(Self {
            store,
            parser: StatementLineParser::new()?,
            converter: DEFAULT_CONVERTER.to_string(),
        })
    }

    /// Command used to turn PDFs into text (default `pdftotext`).
    pub fn with_converter(mut self, converter: impl Into<String>) -> Self {
        self.converter = converter.into();
        self
    }

    /// Convert PDFs if possible, ingest every `.txt` in `dir` concurrently,
    /// then delete the text files the conversion produced.
    pub fn run(&self, dir: &Path) -> Result<IngestReport> {
        let derived = if convert::converter_available(&self.converter) {
            tracing::info!(converter = %self.converter, "converting PDF statements to text");
            convert::convert_pdfs(dir, &self.converter)?
        } else {
            tracing::warn!(
                converter = %self.converter,
                "converter not found, skipping PDF conversion"
            );
            Vec::new()
        };

        let files = convert::files_with_extension(dir, "txt")?;
        if files.is_empty() {
            tracing::info!(dir = %dir.display(), "no text files found for processing");
        } else {
            tracing::info!(count = files.len(), "found text files for processing");
        }

        let reports = self.ingest_files(&files);
        let cleaned_up = cleanup(&derived);

        Ok(IngestReport {
            files: reports,
            cleaned_up,
        })
    }

    /// Ingest each file on its own thread and wait for all of them.
    /// Reports come back in the order of `files`.
    pub fn ingest_files(&self, files: &[PathBuf]) -> Vec<FileReport> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = files
                .iter()
                .map(|path| scope.spawn(move || self.ingest_file(path)))
                .collect();

            handles
                .into_iter()
                .zip(files)
                .map(|(handle, path)| {
                    handle.join().unwrap_or_else(|_| {
                        let mut report = FileReport::new(path);
                        report.error = Some("worker panicked".to_string());
                        report
                    })
                })
                .collect()
        })
    }

    /// Ingest one file. Failures are logged and captured in the report.
    pub fn ingest_file(&self, path: &Path) -> FileReport {
        let mut report = FileReport::new(path);
        match self.process(path, &mut report) {
            Ok(()) if report.inserted > 0 => {
                tracing::info!(
                    file = %path.display(),
                    inserted = report.inserted,
                    duplicates = report.duplicates,
                    "inserted transactions"
                );
            }
            Ok(()) => {
                tracing::info!(
                    file = %path.display(),
                    duplicates = report.duplicates,
                    "no new transactions"
                );
            }
            Err(e) => {
                let msg = format!("{e:#}");
                tracing::error!(file = %path.display(), error = %msg, "file ingestion failed");
                report.error = Some(msg);
            }
        }
        report
    }

    fn process(&self, path: &Path, report: &mut FileReport) -> Result<()> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        tracing::debug!(file = %path.display(), "processing file");

        let parsed = self
            .parser
            .parse_reader(BufReader::new(file))
            .with_context(|| format!("reading {}", path.display()))?;
        report.parsed = parsed.transactions.len();
        report.rejected = parsed.rejected;

        let mut fresh = Vec::with_capacity(parsed.transactions.len());
        for tx in parsed.transactions {
            if self.store.exists(&tx).context("duplicate lookup")? {
                tracing::debug!(
                    date = %tx.date,
                    description = %tx.description,
                    amount = tx.amount,
                    "duplicate transaction, skipping"
                );
                report.duplicates += 1;
                continue;
            }
            fresh.push(tx);
        }

        let ids = self
            .store
            .insert_batch(&fresh)
            .with_context(|| format!("inserting transactions from {}", path.display()))?;
        report.inserted = ids.len();
        Ok(())
    }
}

/// Remove derived files regardless of how their ingestion went.
fn cleanup(files: &[PathBuf]) -> Vec<PathBuf> {
    let mut removed = Vec::with_capacity(files.len());
    for path in files {
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::info!(file = %path.display(), "deleted converted text");
                removed.push(path.clone());
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "failed to delete converted text");
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATEMENT: &str = "\
Transaction Date Description Type Amount Net Amount Settlement Date
7/19/2024 Islandadv.Whalewatch Purchase -$274.18 -$274.18 7/20/2024
7/19/2024 Transfer from Chime Savings Account Transfer $275.00 $275.00 7/19/2024
";

    #[test]
    fn test_ingest_file_inserts_then_dedupes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("july.txt");
        std::fs::write(&path, STATEMENT).unwrap();

        let store = Store::open_in_memory().unwrap();
        let ingestor = Ingestor::new(store.clone()).unwrap();

        let first = ingestor.ingest_file(&path);
        assert!(first.is_ok());
        assert_eq!((first.parsed, first.inserted, first.duplicates), (2, 2, 0));

        let second = ingestor.ingest_file(&path);
        assert_eq!((second.parsed, second.inserted, second.duplicates), (2, 0, 2));
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_missing_file_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        std::fs::write(&good, STATEMENT).unwrap();
        let missing = dir.path().join("missing.txt");

        let store = Store::open_in_memory().unwrap();
        let ingestor = Ingestor::new(store.clone()).unwrap();
        let reports = ingestor.ingest_files(&[missing.clone(), good.clone()]);

        assert_eq!(reports[0].path, missing);
        assert!(reports[0].error.as_deref().unwrap().contains("opening"));
        assert!(reports[1].is_ok());
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_cleanup_reports_only_removed_files() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.txt");
        std::fs::write(&present, "x").unwrap();
        let absent = dir.path().join("b.txt");

        let removed = cleanup(&[present.clone(), absent]);
        assert_eq!(removed, vec![present.clone()]);
        assert!(!present.exists());
    }
}
