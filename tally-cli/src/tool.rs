//! The query tool offered to the model: it writes SQL, we run it.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tally_core::TransactionType;
use tally_store::TRANSACTIONS_DDL;

pub const TRANSACTIONS_TOOL: &str = "TransactionsTool";

const SAMPLE_ROWS: &str = "\
8,2024-07-19,Islandadv.Whalewatch,Purchase,-274.18,-274.18,2024-07-20
9,2024-07-19,Transfer from Chime Savings Account,Transfer,275,275,2024-07-19
10,2024-07-19,\"Supermaven, Inc.\",Purchase,-10,-10,2024-07-20
11,2024-07-19,\"Notion Labs, Inc.\",Purchase,-11.03,-11.03,2024-07-20";

/// Function definition as sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Arguments of a [`TRANSACTIONS_TOOL`] call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryArgs {
    pub sql: String,
}

impl QueryArgs {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

impl ToolSpec {
    pub fn transactions_query() -> Self {
        let description = transactions_description();
        Self {
            name: TRANSACTIONS_TOOL.to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "sql": {
                        "type": "string",
                        "description": description,
                    }
                },
                "required": ["sql"],
            }),
            description,
        }
    }
}

fn transactions_description() -> String {
    let categories: Vec<String> = TransactionType::ALL.iter().map(|t| t.to_string()).collect();
    format!(
        "Given the user's question, construct a sqlite query to retrieve a dataset to make \
an informed response.\n\n\
The table schema is:\n{TRANSACTIONS_DDL}\n\n\
Dates are stored as YYYY-MM-DD text.\n\n\
Categories are:\n{}\n\n\
Sample rows:\n{SAMPLE_ROWS}\n\n\
Notes:\n\
Descriptions can vary despite being the same merchant. When constructing queries, consider \
using flexible matching.\n",
        categories.join("\n")
    )
}
