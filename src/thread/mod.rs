// ABOUTME: Thread reply and thread viewing by Slack timestamp or by local time
// ABOUTME: Local-time references are resolved through a one-second history query

pub mod callback;
pub mod color;
pub mod dispatch;
pub mod local_time;
pub mod op;
pub mod timestamp;

pub use color::thread_color;
pub use dispatch::QueryWindow;
pub use op::ThreadOperation;
pub use timestamp::is_canonical_ts;

use slackline_core::{Conversation, MessageFlags, SendStatus, ThreadReplies};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::account::SlackAccount;

pub const UNPARSEABLE_MESSAGE: &str = "Could not parse thread timestamp.";

/// How a thread request ended, for callers and logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadOutcome {
    /// Reply handed to the transport, tagged with `ts`
    Posted { ts: String },
    /// Transport rejected the reply or could not address the conversation
    SendFailed,
    /// Reply list for `ts` shown
    RepliesShown { ts: String },
    RepliesFailed,
    /// No message started at the requested second
    NotFound,
    /// Several messages started at the requested second
    Ambiguous { candidates: usize },
    /// The single match had no `ts`
    MalformedResponse,
}

/// Result of entering a thread request
#[derive(Debug)]
pub enum ThreadRequest {
    /// The reference was a canonical timestamp; the action already ran
    Completed(ThreadOutcome),
    /// The reference could not be parsed; the user has been told
    Unparseable,
    /// The reference is being resolved; the handle yields the final outcome
    Pending(JoinHandle<ThreadOutcome>),
}

impl ThreadRequest {
    /// Wait for the final outcome. `None` for unparseable references.
    pub async fn outcome(self) -> Option<ThreadOutcome> {
        match self {
            Self::Completed(outcome) => Some(outcome),
            Self::Unparseable => None,
            Self::Pending(handle) => match handle.await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    tracing::error!(error = %e, "Thread resolution task failed");
                    None
                }
            },
        }
    }
}

/// Entry point for "reply in thread" and "show thread" requests.
#[derive(Clone)]
pub struct ThreadResolver {
    account: SlackAccount,
    replies: Arc<dyn ThreadReplies>,
}

impl ThreadResolver {
    pub fn new(account: SlackAccount, replies: Arc<dyn ThreadReplies>) -> Self {
        Self { account, replies }
    }

    pub fn account(&self) -> &SlackAccount {
        &self.account
    }

    /// Post `message` into the thread named by `reference`: either a canonical
    /// timestamp, or a local time / date-time of the thread's first message.
    pub async fn post_to_thread(
        &self,
        conversation: &Arc<Conversation>,
        reference: &str,
        message: &str,
    ) -> ThreadRequest {
        if is_canonical_ts(reference) {
            let outcome = self.post_reply(conversation, reference, message).await;
            return ThreadRequest::Completed(outcome);
        }

        match self.resolve(conversation, reference) {
            Some(instant) => {
                let op = ThreadOperation::post_reply(Arc::clone(conversation), message);
                ThreadRequest::Pending(self.dispatch(op, instant))
            }
            None => ThreadRequest::Unparseable,
        }
    }

    /// Show the replies of the thread named by `reference`
    pub async fn get_thread_replies(
        &self,
        conversation: &Arc<Conversation>,
        reference: &str,
    ) -> ThreadRequest {
        if is_canonical_ts(reference) {
            let outcome = self.show_replies(conversation, reference).await;
            return ThreadRequest::Completed(outcome);
        }

        match self.resolve(conversation, reference) {
            Some(instant) => {
                let op = ThreadOperation::fetch_replies(Arc::clone(conversation));
                ThreadRequest::Pending(self.dispatch(op, instant))
            }
            None => ThreadRequest::Unparseable,
        }
    }

    fn resolve(&self, conversation: &Conversation, reference: &str) -> Option<i64> {
        let instant = local_time::resolve_local_time(reference, &self.account.threads);
        if instant.is_none() {
            tracing::debug!(
                channel = %conversation.id(),
                reference = %reference,
                "Thread reference is neither a timestamp nor a local time"
            );
            self.account.write_system(conversation, UNPARSEABLE_MESSAGE);
        }
        instant
    }

    /// Run a resolved operation against the canonical timestamp `ts`
    async fn execute(&self, op: ThreadOperation, ts: &str) -> ThreadOutcome {
        match op {
            ThreadOperation::PostReply { target, message } => {
                self.post_reply(&target, ts, &message).await
            }
            ThreadOperation::FetchReplies { target } => self.show_replies(&target, ts).await,
        }
    }

    async fn post_reply(&self, conversation: &Conversation, ts: &str, message: &str) -> ThreadOutcome {
        match self
            .account
            .send_message_in_thread(conversation, ts, message, MessageFlags::NONE)
            .await
        {
            Ok(SendStatus::Sent) => ThreadOutcome::Posted { ts: ts.to_string() },
            Ok(SendStatus::NotApplicable) => {
                tracing::error!(
                    channel = %conversation.id(),
                    message = %message,
                    "Not able to send thread reply: conversation cannot receive messages"
                );
                ThreadOutcome::SendFailed
            }
            Err(e) => {
                tracing::error!(
                    channel = %conversation.id(),
                    message = %message,
                    error = %e,
                    "Not able to send thread reply"
                );
                ThreadOutcome::SendFailed
            }
        }
    }

    async fn show_replies(&self, conversation: &Arc<Conversation>, ts: &str) -> ThreadOutcome {
        match self.replies.fetch_replies(Arc::clone(conversation), ts).await {
            Ok(()) => ThreadOutcome::RepliesShown { ts: ts.to_string() },
            Err(e) => {
                tracing::error!(
                    channel = %conversation.id(),
                    thread_ts = %ts,
                    error = %e,
                    "Failed to fetch thread replies"
                );
                ThreadOutcome::RepliesFailed
            }
        }
    }
}
