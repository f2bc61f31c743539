//! Per-description aggregates computed on demand over a date range.

use serde::{Deserialize, Serialize};

/// Sum of `net_amount` for one description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionTotal {
    pub description: String,
    pub total_spent: f64,
}

/// Number of rows carrying one description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionCount {
    pub description: String,
    pub count: i64,
}
