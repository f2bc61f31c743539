//! Question answering over the transaction store.
//!
//! The model may ask for data by calling the query tool. Each round executes
//! every call in the reply, appends the results as a user turn and asks
//! again. Tools are only offered while rounds remain, so the exchange always
//! ends with a text answer or an error.

use std::time::Duration;

use tally_store::{Store, StoreError};
use thiserror::Error;

use crate::llm::{ChatModel, Message, ModelError};
use crate::tool::{QueryArgs, TRANSACTIONS_TOOL, ToolSpec};

pub const SYSTEM_PROMPT: &str = "You are a financial advisor and a SQL expert with access to a \
transaction history database via tools and can query it for more robust data and analysis. \
You use database results to make informed responses to help the user.";

pub const DEFAULT_QUESTION: &str =
    "Where do I spend most of my money?  Give me the top 10 places in October";

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 2;

const RESULTS_HEADER: &str = "Here is relevant financial information you requested:\n\n";

const FOLLOW_UP: &str = "If you need more data to answer, call the tool again. \
Otherwise answer my question using these results.";

#[derive(Debug, Error)]
pub enum AskError {
    #[error("model request failed: {0}")]
    Model(#[from] ModelError),

    #[error("malformed arguments for {tool}: {source}")]
    MalformedArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("query failed: {source}\n  sql: {sql}")]
    Query {
        sql: String,
        #[source]
        source: StoreError,
    },

    #[error("could not serialise query results: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("model returned an empty answer")]
    EmptyAnswer,

    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    /// Rounds in which tool calls were executed.
    pub tool_rounds: usize,
    pub queries_executed: usize,
}

/// One question's worth of history.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(question: &str) -> Self {
        Self {
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(question)],
        }
    }

    pub async fn ask<M: ChatModel + ?Sized>(
        &mut self,
        model: &M,
        store: &Store,
        max_tool_rounds: usize,
    ) -> Result<Answer, AskError> {
        let tools = [ToolSpec::transactions_query()];
        let mut rounds = 0;
        let mut queries = 0;

        loop {
            let offered: &[ToolSpec] = if rounds < max_tool_rounds { &tools } else { &[] };
            let reply = model.complete(&self.messages, offered).await?;

            if reply.tool_calls.is_empty() || offered.is_empty() {
                if !reply.tool_calls.is_empty() {
                    tracing::warn!(
                        calls = reply.tool_calls.len(),
                        "ignoring tool calls past the round limit"
                    );
                }
                let text = reply.content.unwrap_or_default().trim().to_string();
                if text.is_empty() {
                    return Err(AskError::EmptyAnswer);
                }
                self.messages.push(Message::assistant(text.clone()));
                return Ok(Answer {
                    text,
                    tool_rounds: rounds,
                    queries_executed: queries,
                });
            }

            rounds += 1;
            if let Some(content) = reply.content.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
                self.messages.push(Message::assistant(content));
            }

            let mut results = String::from(RESULTS_HEADER);
            for call in &reply.tool_calls {
                if call.name != TRANSACTIONS_TOOL {
                    tracing::warn!(tool = %call.name, id = %call.id, "skipping unknown tool");
                    continue;
                }
                let args = QueryArgs::from_json(&call.arguments).map_err(|source| {
                    AskError::MalformedArguments {
                        tool: call.name.clone(),
                        source,
                    }
                })?;

                tracing::info!(round = rounds, sql = %args.sql, "running model query");
                let rows = store
                    .execute_raw(&args.sql, &[])
                    .map_err(|source| AskError::Query {
                        sql: args.sql.clone(),
                        source,
                    })?;
                queries += 1;
                tracing::debug!(rows = rows.len(), "query returned");

                let json = serde_json::to_string(&rows).map_err(AskError::Serialize)?;
                results.push_str(&json);
                results.push_str("\n\n");
            }
            results.push_str(FOLLOW_UP);
            self.messages.push(Message::user(results));
        }
    }
}

/// Answer `question` in a fresh conversation, bounded by `timeout` overall.
pub async fn answer_question<M: ChatModel + ?Sized>(
    model: &M,
    store: &Store,
    question: &str,
    max_tool_rounds: usize,
    timeout: Duration,
) -> Result<Answer, AskError> {
    let mut conversation = Conversation::new(question);
    tokio::time::timeout(timeout, conversation.ask(model, store, max_tool_rounds))
        .await
        .map_err(|_| AskError::Timeout(timeout))?
}
