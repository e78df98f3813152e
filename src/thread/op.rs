// ABOUTME: Deferred thread actions waiting on timestamp resolution
// ABOUTME: Each operation owns a shared handle to its target conversation

use slackline_core::Conversation;
use std::sync::Arc;

/// Work to run once a thread reference resolves to a canonical timestamp.
///
/// Not `Clone`: the operation is moved into its resolution query and
/// consumed by the response handler, so it completes at most once.
#[derive(Debug)]
pub enum ThreadOperation {
    /// Post `message` (host markup) as a reply in the thread
    PostReply {
        target: Arc<Conversation>,
        message: String,
    },
    /// Show the thread's replies in the conversation
    FetchReplies { target: Arc<Conversation> },
}

impl ThreadOperation {
    pub fn post_reply(target: Arc<Conversation>, message: impl Into<String>) -> Self {
        Self::PostReply {
            target,
            message: message.into(),
        }
    }

    pub fn fetch_replies(target: Arc<Conversation>) -> Self {
        Self::FetchReplies { target }
    }

    pub fn target(&self) -> &Arc<Conversation> {
        match self {
            Self::PostReply { target, .. } | Self::FetchReplies { target } => target,
        }
    }

    /// Short name for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PostReply { .. } => "post_reply",
            Self::FetchReplies { .. } => "fetch_replies",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_holds_conversation_reference() {
        let conv = Arc::new(Conversation::channel("C1", "general"));
        let op = ThreadOperation::post_reply(Arc::clone(&conv), "hello");
        assert_eq!(Arc::strong_count(&conv), 2);
        assert_eq!(op.target().id(), "C1");
        assert_eq!(op.kind(), "post_reply");

        drop(op);
        assert_eq!(Arc::strong_count(&conv), 1);
    }

    #[test]
    fn test_fetch_replies_has_no_message() {
        let conv = Arc::new(Conversation::channel("C1", "general"));
        let op = ThreadOperation::fetch_replies(conv);
        assert!(matches!(op, ThreadOperation::FetchReplies { .. }));
        assert_eq!(op.kind(), "fetch_replies");
    }
}
