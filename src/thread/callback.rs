// ABOUTME: Handles the history response for a pending thread operation
// ABOUTME: Zero matches and ambiguous matches are reported; a single match runs the operation

use anyhow::Result;
use serde_json::Value;

use super::color::thread_color;
use super::{ThreadOperation, ThreadOutcome, ThreadResolver};
use crate::json::{array_field, string_field};
use crate::markup::encode::{decode_entities, escape};

pub const NOT_FOUND_MESSAGE: &str = "Thread not found. If the thread start date is not today, make sure you specify the date in the thread timestamp.";

pub const AMBIGUOUS_HEADER: &str =
    "Thread timestamp is ambiguous. Please use one of the following unambiguous thread IDs:\n";

impl ThreadResolver {
    /// Finish `op` with the history `response` for its one-second window.
    /// Consumes the operation on every path.
    pub async fn complete(&self, op: ThreadOperation, response: Result<Value>) -> ThreadOutcome {
        let conversation = op.target().clone();

        let response = match response {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!(
                    channel = %conversation.id(),
                    error = %e,
                    "Error querying threads"
                );
                None
            }
        };

        let matches: &[Value] = match response.as_ref().and_then(|json| array_field(json, "messages")) {
            Some(list) => list.as_slice(),
            None => {
                if response.is_some() {
                    tracing::error!(
                        channel = %conversation.id(),
                        "Error querying threads: missing messages"
                    );
                }
                &[]
            }
        };

        match matches {
            [] => {
                self.account().write_system(&conversation, NOT_FOUND_MESSAGE);
                ThreadOutcome::NotFound
            }
            [entry] => match string_field(entry, "ts") {
                Some(ts) => self.execute(op, ts).await,
                None => {
                    tracing::debug!(
                        channel = %conversation.id(),
                        "Missing ts value in thread callback"
                    );
                    ThreadOutcome::MalformedResponse
                }
            },
            candidates => {
                self.account()
                    .write_system(&conversation, &ambiguous_message(candidates));
                ThreadOutcome::Ambiguous {
                    candidates: candidates.len(),
                }
            }
        }
    }
}

/// List every candidate thread root with its colored timestamp and first line
pub fn ambiguous_message(candidates: &[Value]) -> String {
    let mut message = String::from(AMBIGUOUS_HEADER);
    for entry in candidates {
        let Some(ts) = string_field(entry, "ts") else {
            continue;
        };
        let first_line = string_field(entry, "text")
            .map(|text| quote_safe(text.lines().next().unwrap_or("")))
            .unwrap_or_else(|| "NULL".to_string());
        message.push_str(&format!(
            "<font color=\"#{}\">{}</font> (\"{}\")\n",
            thread_color(ts),
            ts,
            first_line
        ));
    }
    message
}

/// Host markup for a line of Slack text placed inside double quotes.
/// Slack text arrives entity-escaped, so it is decoded first.
fn quote_safe(line: &str) -> String {
    escape(&decode_entities(line)).replace('"', "&quot;")
}
