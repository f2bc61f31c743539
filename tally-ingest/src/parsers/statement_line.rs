//! Single-line statement parser (text)
//!
//! Expected rows after PDF-to-text:
//!   7/19/2024   Islandadv.Whalewatch                 Purchase    $274.18    $274.18   7/20/2024
//!   7/19/2024   Transfer from Savings Account        Transfer    $275.00    $275.00   7/19/2024
//!   8/02/2024   Round Up to Savings                  Round Up    -$0.42     -$0.42    8/02/2024
//!
//! Columns: date, description, type, amount, net amount, settlement date.
//! Anything that does not match the whole row (headers, page footers, running
//! totals) is noise and is skipped without complaint.

use std::io::BufRead;

use anyhow::Result;
use regex::Regex;
use tally_core::{NewTransaction, TransactionType, parse_currency, parse_statement_date};
use thiserror::Error;

/// A row matched the statement grammar but one of its fields did not convert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("invalid transaction date {0:?}")]
    Date(String),

    #[error("invalid settlement date {0:?}")]
    SettleDate(String),

    #[error("invalid amount {0:?}")]
    Amount(String),

    #[error("unrecognised transaction type {0:?}")]
    Type(String),
}

/// Result of parsing a whole statement.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedStatement {
    pub transactions: Vec<NewTransaction>,
    /// Rows that matched the grammar but were dropped (see [`LineError`]).
    pub rejected: usize,
}

#[derive(Debug, Clone)]
pub struct StatementLineParser {
    line_re: Regex,
}

impl StatementLineParser {
    pub fn new() -> Result<Self> {
        // The description is lazy so the fixed trailing columns anchor the row
        // even when the merchant text contains spaces or punctuation.
        let line_re = Regex::new(concat!(
            r"^\s*(?P<date>\d{1,2}/\d{1,2}/\d{4})\s+",
            r"(?P<desc>.*?)\s+",
            r"(?P<type>Transfer|Purchase|Direct Debit|ATM Withdrawal|Fee|Deposit|Round Up)\s+",
            r"(?P<amount>-?\$\d+\.\d{2})\s+",
            r"(?P<net>-?\$\d+\.\d{2})\s+",
            r"(?P<settle>\d{1,2}/\d{1,2}/\d{4})\s*$"
        ))?;
        Ok(Self { line_re })
    }

    /// `Ok(None)` for noise, `Ok(Some(_))` for a complete record, `Err` for a
    /// row that matched but carried an unusable field.
    pub fn parse_line(&self, line: &str) -> std::result::Result<Option<NewTransaction>, LineError> {
        let Some(caps) = self.line_re.captures(line) else {
            return Ok(None);
        };

        let date = parse_statement_date(&caps["date"])
            .ok_or_else(|| LineError::Date(caps["date"].to_string()))?;
        let settle_date = parse_statement_date(&caps["settle"])
            .ok_or_else(|| LineError::SettleDate(caps["settle"].to_string()))?;

        let amount =
            parse_currency(&caps["amount"]).ok_or_else(|| LineError::Amount(caps["amount"].to_string()))?;
        let net_amount =
            parse_currency(&caps["net"]).ok_or_else(|| LineError::Amount(caps["net"].to_string()))?;

        let kind: TransactionType = caps["type"]
            .parse()
            .map_err(|_| LineError::Type(caps["type"].to_string()))?;

        Ok(Some(NewTransaction {
            date,
            description: caps["desc"].trim().to_string(),
            kind,
            amount,
            net_amount,
            settle_date,
        }))
    }

    pub fn parse_text(&self, text: &str) -> ParsedStatement {
        let mut out = ParsedStatement::default();
        for (idx, line) in text.lines().enumerate() {
            self.absorb(&mut out, idx + 1, line);
        }
        out
    }

    /// Stream a statement line by line. A read error (including invalid UTF-8)
    /// abandons the whole statement.
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> std::io::Result<ParsedStatement> {
        let mut out = ParsedStatement::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            self.absorb(&mut out, idx + 1, &line);
        }
        Ok(out)
    }

    fn absorb(&self, out: &mut ParsedStatement, line_no: usize, line: &str) {
        match self.parse_line(line) {
            Ok(Some(tx)) => out.transactions.push(tx),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping statement row");
                out.rejected += 1;
            }
        }
    }
}
