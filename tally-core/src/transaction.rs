//! Transaction record types

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Statement category of a transaction.
///
/// Statement lines only ever carry one of the seven literals. Rows read back
/// from storage may hold anything, which lands in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransactionType {
    Transfer,
    Purchase,
    DirectDebit,
    Fee,
    AtmWithdrawal,
    Deposit,
    RoundUp,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transaction type: {0:?}")]
pub struct UnknownTransactionType(pub String);

impl TransactionType {
    /// The recognised categories, in statement order.
    pub const ALL: [TransactionType; 7] = [
        TransactionType::Transfer,
        TransactionType::Purchase,
        TransactionType::DirectDebit,
        TransactionType::Fee,
        TransactionType::AtmWithdrawal,
        TransactionType::Deposit,
        TransactionType::RoundUp,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            TransactionType::Transfer => "Transfer",
            TransactionType::Purchase => "Purchase",
            TransactionType::DirectDebit => "Direct Debit",
            TransactionType::Fee => "Fee",
            TransactionType::AtmWithdrawal => "ATM Withdrawal",
            TransactionType::Deposit => "Deposit",
            TransactionType::RoundUp => "Round Up",
            TransactionType::Other(s) => s,
        }
    }

    /// Lenient conversion for values coming out of the database.
    pub fn from_stored(s: &str) -> Self {
        s.parse()
            .unwrap_or_else(|_| TransactionType::Other(s.to_string()))
    }
}

impl FromStr for TransactionType {
    type Err = UnknownTransactionType;

    /// Exact, case-sensitive match against the seven literals.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTransactionType(s.to_string()))
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TransactionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TransactionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(TransactionType::from_stored(&s))
    }
}

/// The (date, description, amount, net_amount, settle_date) tuple two records
/// must share to be considered the same transaction.
pub type DedupKey<'a> = (NaiveDate, &'a str, f64, f64, NaiveDate);

/// A parsed transaction that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Gross signed amount.
    pub amount: f64,
    /// Signed amount net of adjustments; usually equal to `amount`.
    pub net_amount: f64,
    pub settle_date: NaiveDate,
}

impl NewTransaction {
    pub fn dedup_key(&self) -> DedupKey<'_> {
        (
            self.date,
            self.description.as_str(),
            self.amount,
            self.net_amount,
            self.settle_date,
        )
    }

    /// Attach the surrogate id assigned by storage.
    pub fn with_id(self, id: i64) -> Transaction {
        Transaction {
            id,
            date: self.date,
            description: self.description,
            kind: self.kind,
            amount: self.amount,
            net_amount: self.net_amount,
            settle_date: self.settle_date,
        }
    }
}

/// A persisted transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: f64,
    pub net_amount: f64,
    pub settle_date: NaiveDate,
}

/// Parse a statement amount such as `$274.18` or `-$10.00`.
///
/// The `$` is dropped and the sign kept. Returns `None` when what remains is
/// not a number.
pub fn parse_currency(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace('$', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_round_trips_literals() {
        for t in TransactionType::ALL {
            assert_eq!(t.as_str().parse::<TransactionType>().unwrap(), t);
        }
        assert_eq!(TransactionType::DirectDebit.to_string(), "Direct Debit");
        assert_eq!(TransactionType::AtmWithdrawal.to_string(), "ATM Withdrawal");
    }

    #[test]
    fn test_type_parse_is_case_sensitive() {
        assert!("purchase".parse::<TransactionType>().is_err());
        assert!("Direct  Debit".parse::<TransactionType>().is_err());
        assert_eq!(
            TransactionType::from_stored("Refund"),
            TransactionType::Other("Refund".to_string())
        );
        assert_eq!(
            TransactionType::from_stored("Round Up"),
            TransactionType::RoundUp
        );
    }

    #[test]
    fn test_type_serializes_as_literal() {
        let json = serde_json::to_string(&TransactionType::RoundUp).unwrap();
        assert_eq!(json, "\"Round Up\"");
        let back: TransactionType = serde_json::from_str("\"Fee\"").unwrap();
        assert_eq!(back, TransactionType::Fee);
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("$274.18"), Some(274.18));
        assert_eq!(parse_currency("-$10.00"), Some(-10.0));
        assert_eq!(parse_currency("$"), None);
        assert_eq!(parse_currency("-$abc"), None);
    }

    #[test]
    fn test_with_id_keeps_fields() {
        let d = NaiveDate::from_ymd_opt(2024, 7, 19).unwrap();
        let s = NaiveDate::from_ymd_opt(2024, 7, 20).unwrap();
        let new = NewTransaction {
            date: d,
            description: "Islandadv.Whalewatch".to_string(),
            kind: TransactionType::Purchase,
            amount: 274.18,
            net_amount: 274.18,
            settle_date: s,
        };
        assert_eq!(new.dedup_key(), (d, "Islandadv.Whalewatch", 274.18, 274.18, s));
        let tx = new.with_id(8);
        assert_eq!(tx.id, 8);
        assert_eq!(tx.settle_date, s);
        assert_eq!(tx.description, "Islandadv.Whalewatch");
    }
}
