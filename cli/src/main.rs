mod outline;
mod shell;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use client::net::api::{ChatApi, HttpChatApi};
use client::net::relay::RelayClient;
use client::net::types::{ApiError, Presentation};
use client::state::document::{DocumentError, DocumentOrchestrator};
use client::state::session::{ChatSession, DocumentStatus, SessionError};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use crate::outline::{OutlineHost, Screen};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("no chat matches `{0}`")]
    UnknownChat(String),
    #[error("health check failed with HTTP {0}")]
    Unhealthy(u16),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("terminal io failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "slidechat", about = "Chat about presentations from the terminal")]
struct Cli {
    #[arg(long, env = "SLIDECHAT_API_URL", default_value = "http://127.0.0.1:8000")]
    api_url: String,

    #[arg(long, env = "SLIDECHAT_RELAY_URL", default_value = "http://127.0.0.1:3001")]
    relay_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the upload relay is up.
    Ping,
    Chats(ChatsCommand),
    /// Send a message to a chat.
    Send {
        chat_id: String,
        text: String,
        /// Message id to use as context.
        #[arg(long)]
        reference: Option<String>,
    },
    /// Upload a presentation to the relay and print its receipt.
    Upload { path: PathBuf },
    /// Render a presentation by URL as a text outline.
    View { url: String },
    /// Interactive chat shell.
    Shell,
}

#[derive(Args, Debug)]
struct ChatsCommand {
    #[command(subcommand)]
    command: ChatsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ChatsSubcommand {
    List,
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        file: PathBuf,
    },
    Show {
        chat_id: String,
    },
}

struct CliContext {
    api: Arc<dyn ChatApi>,
    relay: Arc<RelayClient>,
    relay_url: String,
}

impl CliContext {
    fn session(&self) -> (ChatSession, Screen) {
        let (host, screen) = OutlineHost::new();
        let document = DocumentOrchestrator::new(Box::new(host), self.relay.clone());
        (ChatSession::new(self.api.clone(), document), screen)
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = CliContext {
        api: Arc::new(HttpChatApi::new(&cli.api_url)?),
        relay: Arc::new(RelayClient::new(&cli.relay_url)?),
        relay_url: cli.relay_url,
    };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Chats(chats) => run_chats(&ctx, chats).await,
        Command::Send { chat_id, text, reference } => run_send(&ctx, &chat_id, &text, reference.as_deref()).await,
        Command::Upload { path } => {
            let receipt = ctx.relay.upload(&path).await?;
            print_json(&serde_json::to_value(receipt)?)
        }
        Command::View { url } => run_view(&ctx, &url).await,
        Command::Shell => {
            let (mut session, screen) = ctx.session();
            shell::run(&mut session, &screen).await
        }
    }
}

async fn run_ping(ctx: &CliContext) -> Result<(), CliError> {
    let url = format!("{}/healthz", ctx.relay_url.trim_end_matches('/'));
    let status = reqwest::get(url).await?.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

async fn run_chats(ctx: &CliContext, chats: ChatsCommand) -> Result<(), CliError> {
    let (mut session, screen) = ctx.session();
    match chats.command {
        ChatsSubcommand::List => {
            session.refresh_chats().await?;
            shell::print_rows(&session);
        }
        ChatsSubcommand::Create { title, file } => {
            let presentation = Presentation::read(&file).await?;
            let (chat, status) = session.create_chat(&title, Some(presentation)).await?;
            print_json(&serde_json::to_value(&chat)?)?;
            shell::print_status(&status, &screen);
        }
        ChatsSubcommand::Show { chat_id } => {
            let (_, status) = session.select_chat(Some(&chat_id)).await?;
            shell::print_thread(session.thread());
            shell::print_status(&status, &screen);
        }
    }
    Ok(())
}

async fn run_send(ctx: &CliContext, chat_id: &str, text: &str, reference: Option<&str>) -> Result<(), CliError> {
    let (mut session, _screen) = ctx.session();
    session.select_chat(Some(chat_id)).await?;
    if let Some(reference) = reference {
        session.select_reference(reference).await?;
    }
    let (outcome, _) = session.send(text).await?;
    shell::report_send(&outcome);
    shell::print_thread(session.thread());
    Ok(())
}

async fn run_view(ctx: &CliContext, url: &str) -> Result<(), CliError> {
    let (mut session, screen) = ctx.session();
    let document = session.document_mut();
    document.mount()?;
    let loaded = document.load_from_url(url).await?;
    shell::print_status(&DocumentStatus::Loaded(loaded), &screen);
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
