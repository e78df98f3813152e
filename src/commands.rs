// ABOUTME: Slash command registration and parsing for thread commands
// ABOUTME: Provides /thread and /getreplies, routed to the ThreadResolver

use slackline_core::config::ThreadConfig;
use slackline_core::Conversation;
use std::sync::Arc;
use thiserror::Error;

use crate::thread::local_time::resolve_local_time;
use crate::thread::{is_canonical_ts, ThreadRequest, ThreadResolver};

/// A command the host should offer to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDef {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
}

pub fn registered_commands() -> Vec<CommandDef> {
    vec![
        CommandDef {
            name: "/thread",
            usage: "/thread <timestamp or time> <message>",
            description: "Send a message to a thread",
        },
        CommandDef {
            name: "/getreplies",
            usage: "/getreplies <timestamp or time>",
            description: "Show the replies of a thread",
        },
    ]
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Unknown command: {0}")]
    Unknown(String),
}

/// A parsed thread command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadCommand {
    Post { reference: String, message: String },
    Replies { reference: String },
}

impl ThreadCommand {
    /// Parse `command` (with or without the leading slash) and its argument text.
    ///
    /// For `/getreplies` the whole argument is the thread reference. For
    /// `/thread` the reference is the longest leading run of words that reads
    /// as a timestamp or a local time under `formats` (falling back to the
    /// first word), and the rest is the message.
    pub fn parse(command: &str, args: &str, formats: &ThreadConfig) -> Result<Self, CommandError> {
        let name = command.trim_start_matches('/');
        let args = args.trim();

        match name {
            "thread" => {
                let (reference, message) = split_reference(args, formats);
                if reference.is_empty() || message.is_empty() {
                    return Err(CommandError::Usage(registered_commands()[0].usage));
                }
                Ok(Self::Post {
                    reference: reference.to_string(),
                    message: message.to_string(),
                })
            }
            "getreplies" => {
                if args.is_empty() {
                    return Err(CommandError::Usage(registered_commands()[1].usage));
                }
                Ok(Self::Replies {
                    reference: args.to_string(),
                })
            }
            _ => Err(CommandError::Unknown(command.to_string())),
        }
    }

    pub async fn run(
        self,
        resolver: &ThreadResolver,
        conversation: &Arc<Conversation>,
    ) -> ThreadRequest {
        match self {
            Self::Post { reference, message } => {
                resolver
                    .post_to_thread(conversation, &reference, &message)
                    .await
            }
            Self::Replies { reference } => {
                resolver.get_thread_replies(conversation, &reference).await
            }
        }
    }
}

/// Parse and run one command in `conversation`.
/// Parse errors are shown in the conversation and returned.
pub async fn handle_command(
    resolver: &ThreadResolver,
    conversation: &Arc<Conversation>,
    command: &str,
    args: &str,
) -> Result<ThreadRequest, CommandError> {
    match ThreadCommand::parse(command, args, &resolver.account().threads) {
        Ok(parsed) => {
            tracing::debug!(channel = %conversation.id(), command = %command, "Running thread command");
            Ok(parsed.run(resolver, conversation).await)
        }
        Err(e) => {
            resolver.account().write_system(conversation, &e.to_string());
            Err(e)
        }
    }
}

fn split_reference<'a>(args: &'a str, formats: &ThreadConfig) -> (&'a str, &'a str) {
    let ends: Vec<usize> = args
        .char_indices()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(i, _)| i)
        .chain(std::iter::once(args.len()))
        .collect();

    let readable = |candidate: &str| {
        is_canonical_ts(candidate) || resolve_local_time(candidate, formats).is_some()
    };
    let end = ends
        .iter()
        .rev()
        .copied()
        .find(|&end| readable(&args[..end]))
        .or_else(|| ends.first().copied())
        .unwrap_or(0);

    (&args[..end], args[end..].trim_start())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestBed;
    use crate::thread::{ThreadOutcome, UNPARSEABLE_MESSAGE};

    #[test]
    fn test_registered_commands() {
        let commands = registered_commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].name, "/thread");
        assert_eq!(commands[1].name, "/getreplies");
    }

    #[test]
    fn test_parse_thread_post() {
        assert_eq!(
            ThreadCommand::parse("/thread", "1622557800.000300  hello there ", &ThreadConfig::default()).unwrap(),
            ThreadCommand::Post {
                reference: "1622557800.000300".to_string(),
                message: "hello there".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_thread_without_message_is_usage_error() {
        assert_eq!(
            ThreadCommand::parse("/thread", "14:30:00", &ThreadConfig::default()),
            Err(CommandError::Usage("/thread <timestamp or time> <message>"))
        );
        assert!(matches!(
            ThreadCommand::parse("thread", "", &ThreadConfig::default()),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn test_parse_getreplies() {
        assert_eq!(
            ThreadCommand::parse("getreplies", " 14:30:00 ", &ThreadConfig::default()).unwrap(),
            ThreadCommand::Replies {
                reference: "14:30:00".to_string()
            }
        );
        assert!(matches!(
            ThreadCommand::parse("/getreplies", "", &ThreadConfig::default()),
            Err(CommandError::Usage(_))
        ));
    }

    fn spaced_formats() -> ThreadConfig {
        ThreadConfig {
            time_format: "%H:%M".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            date_time_separator: " ".to_string(),
        }
    }

    #[test]
    fn test_parse_thread_reference_containing_space() {
        assert_eq!(
            ThreadCommand::parse("/thread", "2021-06-01 14:30 hello there", &spaced_formats()).unwrap(),
            ThreadCommand::Post {
                reference: "2021-06-01 14:30".to_string(),
                message: "hello there".to_string(),
            }
        );
        assert_eq!(
            ThreadCommand::parse("/thread", "14:30 hello", &spaced_formats()).unwrap(),
            ThreadCommand::Post {
                reference: "14:30".to_string(),
                message: "hello".to_string(),
            }
        );
        assert!(matches!(
            ThreadCommand::parse("/thread", "2021-06-01 14:30", &spaced_formats()),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn test_parse_thread_unreadable_reference_falls_back_to_first_word() {
        assert_eq!(
            ThreadCommand::parse("/thread", "yesterday at noon", &ThreadConfig::default()).unwrap(),
            ThreadCommand::Post {
                reference: "yesterday".to_string(),
                message: "at noon".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_getreplies_takes_whole_argument() {
        assert_eq!(
            ThreadCommand::parse("/getreplies", " 2021-06-01 14:30 ", &spaced_formats()).unwrap(),
            ThreadCommand::Replies {
                reference: "2021-06-01 14:30".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_handle_getreplies_with_spaced_date_time() {
        let bed = TestBed::new();
        let account = bed.account.clone().with_thread_config(spaced_formats());
        let resolver = ThreadResolver::new(account, bed.replies.clone());
        bed.api.push_history(Ok(serde_json::json!({
            "messages": [{"ts": "1622557800.000300", "text": "root"}]
        })));

        let outcome = handle_command(&resolver, &bed.general, "/getreplies", "2021-06-01 14:30")
            .await
            .unwrap()
            .outcome()
            .await;

        assert_eq!(
            outcome,
            Some(ThreadOutcome::RepliesShown {
                ts: "1622557800.000300".to_string()
            })
        );
        let instant = resolve_local_time("2021-06-01 14:30", &spaced_formats()).unwrap();
        assert_eq!(
            bed.api.queries()[0].oldest,
            Some(format!("{}.000000", instant))
        );
        assert!(bed.host.system_messages().is_empty());
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            ThreadCommand::parse("/part", "x", &ThreadConfig::default()),
            Err(CommandError::Unknown("/part".to_string()))
        );
    }

    #[tokio::test]
    async fn test_handle_thread_command_with_canonical_ts() {
        let bed = TestBed::new();
        let resolver = ThreadResolver::new(bed.account.clone(), bed.replies.clone());
        let request = handle_command(&resolver, &bed.general, "/thread", "5.000005 hi")
            .await
            .unwrap();

        assert_eq!(
            request.outcome().await,
            Some(ThreadOutcome::Posted {
                ts: "5.000005".to_string()
            })
        );
        assert_eq!(bed.transport.sent()[0].thread_ts.as_deref(), Some("5.000005"));
    }

    #[tokio::test]
    async fn test_handle_command_usage_error_shown() {
        let bed = TestBed::new();
        let resolver = ThreadResolver::new(bed.account.clone(), bed.replies.clone());
        let result = handle_command(&resolver, &bed.general, "/thread", "5.000005").await;

        assert!(matches!(result, Err(CommandError::Usage(_))));
        let system = bed.host.system_messages();
        assert_eq!(system.len(), 1);
        assert!(system[0].1.starts_with("Usage: /thread"));
    }

    #[tokio::test]
    async fn test_handle_getreplies_unparseable() {
        let bed = TestBed::new();
        let resolver = ThreadResolver::new(bed.account.clone(), bed.replies.clone());
        let request = handle_command(&resolver, &bed.general, "/getreplies", "yesterday")
            .await
            .unwrap();

        assert!(matches!(request, ThreadRequest::Unparseable));
        assert_eq!(bed.host.system_messages()[0].1, UNPARSEABLE_MESSAGE);
    }
}
