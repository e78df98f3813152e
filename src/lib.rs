// ABOUTME: Root library module exposing all public modules
// ABOUTME: Thread resolution, markup translation, RTM handling, and the Slack Web transport

pub mod account;
pub mod commands;
pub mod history;
pub mod json;
pub mod markup;
pub mod replies;
pub mod rtm;
#[cfg(feature = "slack")]
pub mod slack;
pub mod testing;
pub mod thread;

// Re-export platform-facing modules from slackline-core
pub use slackline_core::config;
pub use slackline_core::paths;
pub use slackline_core::traits;

pub use account::SlackAccount;
pub use replies::SlackReplies;
pub use thread::{ThreadOutcome, ThreadRequest, ThreadResolver};
