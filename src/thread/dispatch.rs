// ABOUTME: Issues the one-second history query that locates a thread's first message
// ABOUTME: The pending operation moves into the query task and on to the response handler

use slackline_core::HistoryQuery;
use tokio::task::JoinHandle;

use super::{ThreadOperation, ThreadOutcome, ThreadResolver};

/// Inclusive history window covering every sub-second timestamp of one second
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryWindow {
    pub oldest: String,
    pub latest: String,
}

impl QueryWindow {
    pub fn around(instant: i64) -> Self {
        Self {
            oldest: format!("{}.000000", instant),
            latest: format!("{}.999999", instant),
        }
    }

    pub fn to_query(&self, channel_id: &str) -> HistoryQuery {
        HistoryQuery::new(channel_id)
            .with_oldest(self.oldest.clone())
            .with_latest(self.latest.clone())
            .with_inclusive(true)
    }
}

impl ThreadResolver {
    /// Look up the message posted at `instant` in the operation's conversation,
    /// then hand the operation and the response to [`ThreadResolver::complete`].
    ///
    /// Returns immediately. Dropping the handle does not cancel the lookup.
    pub fn dispatch(&self, op: ThreadOperation, instant: i64) -> JoinHandle<ThreadOutcome> {
        let window = QueryWindow::around(instant);
        let query = window.to_query(op.target().id());
        let resolver = self.clone();

        tracing::debug!(
            channel = %query.channel_id,
            op = op.kind(),
            oldest = %window.oldest,
            latest = %window.latest,
            "Resolving thread timestamp"
        );

        tokio::spawn(async move {
            let response = resolver.account().api.conversations_history(&query).await;
            resolver.complete(op, response).await
        })
    }
}
