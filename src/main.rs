// ABOUTME: Command-line entry point for classifying, resolving, and acting on thread references
// ABOUTME: Initializes logging and config, then talks to Slack through the Web API transport

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use slackline::{
    config::Config,
    history, paths,
    thread::{self, local_time},
    SlackAccount, SlackReplies, ThreadResolver,
};
use slackline_core::{Conversation, HostSink, MessageFlags, RenderedMessage, StaticDirectory};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slackline::slack::SlackWebClient;

#[derive(Parser)]
#[command(
    name = "slackline",
    version,
    about = "Reply to and read Slack threads by timestamp or local time"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Report whether input is a canonical Slack timestamp")]
    Classify { input: String },
    #[command(about = "Resolve a local time or date-time to epoch seconds")]
    Resolve { input: String },
    #[command(about = "Post to or read a thread")]
    Thread {
        #[command(subcommand)]
        command: ThreadCommand,
    },
    #[command(about = "Print recent history of a channel")]
    History {
        #[command(flatten)]
        target: ChannelArgs,
        #[arg(long, help = "Only messages newer than this timestamp")]
        since: Option<String>,
        #[arg(long, help = "Maximum number of messages (defaults to config)")]
        count: Option<u16>,
    },
}

#[derive(Subcommand)]
enum ThreadCommand {
    #[command(about = "Post a message into a thread")]
    Post {
        #[command(flatten)]
        target: ChannelArgs,
        #[arg(help = "Thread timestamp, local time, or local date-time")]
        reference: String,
        message: String,
    },
    #[command(about = "Print the replies of a thread")]
    Replies {
        #[command(flatten)]
        target: ChannelArgs,
        #[arg(help = "Thread timestamp, local time, or local date-time")]
        reference: String,
    },
}

#[derive(Args)]
struct ChannelArgs {
    #[arg(long, help = "Channel ID")]
    channel: String,
}

/// Prints everything the library shows to the user on stdout
struct ConsoleHost;

impl HostSink for ConsoleHost {
    fn write_system_message(&self, conversation: &Conversation, text: &str, _flags: MessageFlags) {
        println!("[{}] {}", conversation.name(), text);
    }

    fn deliver_message(&self, conversation: &Conversation, message: &RenderedMessage) {
        println!(
            "[{}] {} <{}> {}",
            conversation.name(),
            message.ts,
            message.sender.label(),
            message.html
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_dir = paths::log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "slackline.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,slackline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Command::Classify { input } => {
            let kind = if thread::is_canonical_ts(&input) {
                "timestamp"
            } else {
                "other"
            };
            println!("{}", kind);
        }
        Command::Resolve { input } => match local_time::resolve_local_time(&input, &config.threads) {
            Some(instant) => println!("{}", instant),
            None => anyhow::bail!("{}", thread::UNPARSEABLE_MESSAGE),
        },
        Command::Thread { command } => {
            let (account, conversation) = connect(&config, channel_of(&command)).await?;
            let resolver = ThreadResolver::new(
                account.clone(),
                Arc::new(SlackReplies::new(account.clone())),
            );
            let request = match command {
                ThreadCommand::Post {
                    reference, message, ..
                } => {
                    resolver
                        .post_to_thread(&conversation, &reference, &message)
                        .await
                }
                ThreadCommand::Replies { reference, .. } => {
                    resolver.get_thread_replies(&conversation, &reference).await
                }
            };
            let outcome = request.outcome().await;
            tracing::info!(outcome = ?outcome, "Thread request finished");
        }
        Command::History {
            target,
            since,
            count,
        } => {
            let (account, conversation) = connect(&config, &target.channel).await?;
            let count = count.unwrap_or(account.history_count);
            history::get_history(&account, &conversation, since.as_deref(), count).await?;
        }
    }

    Ok(())
}

fn channel_of(command: &ThreadCommand) -> &str {
    match command {
        ThreadCommand::Post { target, .. } | ThreadCommand::Replies { target, .. } => {
            &target.channel
        }
    }
}

async fn connect(config: &Config, channel_id: &str) -> Result<(SlackAccount, Arc<Conversation>)> {
    let slack = config.require_slack()?;
    let client = Arc::new(SlackWebClient::connect(slack).await?);

    let mut directory = StaticDirectory::new(client.self_user_id());
    let conversation = directory.add_channel(channel_id, channel_id);

    let account = SlackAccount::new(
        client.clone(),
        client,
        Arc::new(ConsoleHost),
        Arc::new(directory),
    )
    .with_thread_config(config.threads.clone())
    .with_history_count(slack.history_count);

    Ok((account, conversation))
}
