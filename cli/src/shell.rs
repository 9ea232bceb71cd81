//! Interactive chat shell.
//!
//! Plain lines are sent to the open chat; lines starting with `/` are
//! commands. Errors are printed and the shell keeps going.

use std::path::PathBuf;

use client::net::types::Presentation;
use client::state::session::{ChatSession, DocumentStatus};
use client::state::thread::{Delivery, OpenOutcome, SendOutcome, ThreadController};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::CliError;
use crate::outline::Screen;

const HELP: &str = "\
/chats                 list chats
/open <n|id>           open a chat by list number or id
/close                 close the open chat
/new <file> <title>    create a chat from a presentation
/ref <message-id>      use a message as context for the next send
/unref                 drop the context reference
/attach <file>         show a local presentation in the thread
/history               print the open thread
/quit                  leave
anything else          send as a message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Chats,
    Open(String),
    Close,
    New { path: PathBuf, title: String },
    Reference(String),
    Unreference,
    Attach(PathBuf),
    History,
    Help,
    Quit,
    Send(String),
    Empty,
    Invalid(&'static str),
}

#[must_use]
pub fn parse_line(line: &str) -> ShellCommand {
    let line = line.trim();
    if line.is_empty() {
        return ShellCommand::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ShellCommand::Send(line.to_owned());
    };
    let (name, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let arg = arg.trim();

    match (name, arg.is_empty()) {
        ("chats", _) => ShellCommand::Chats,
        ("close", _) => ShellCommand::Close,
        ("unref", _) => ShellCommand::Unreference,
        ("history", _) => ShellCommand::History,
        ("help", _) => ShellCommand::Help,
        ("quit" | "exit", _) => ShellCommand::Quit,
        ("open", false) => ShellCommand::Open(arg.to_owned()),
        ("ref", false) => ShellCommand::Reference(arg.to_owned()),
        ("attach", false) => ShellCommand::Attach(PathBuf::from(arg)),
        ("new", false) => match arg.split_once(char::is_whitespace) {
            Some((path, title)) => ShellCommand::New { path: PathBuf::from(path), title: title.trim().to_owned() },
            None => ShellCommand::Invalid("usage: /new <file> <title>"),
        },
        ("open" | "ref" | "attach" | "new", true) => ShellCommand::Invalid("missing argument"),
        _ => ShellCommand::Invalid("unknown command; try /help"),
    }
}

/// Resolve `/open` input: a 1-based list position or a chat id.
fn resolve_chat(session: &ChatSession, arg: &str) -> Option<String> {
    let items = &session.chats().items;
    if let Ok(n) = arg.parse::<usize>() {
        if let Some(chat) = n.checked_sub(1).and_then(|i| items.get(i)) {
            return Some(chat.id.clone());
        }
    }
    items.iter().any(|c| c.id == arg).then(|| arg.to_owned())
}

/// # Errors
///
/// Returns an error only when the terminal itself fails.
pub async fn run(session: &mut ChatSession, screen: &Screen) -> Result<(), CliError> {
    if let Err(e) = session.refresh_chats().await {
        eprintln!("error: {e}");
    }
    print_rows(session);
    println!("type /help for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = parse_line(&line);
        if command == ShellCommand::Quit {
            break;
        }
        if let Err(e) = dispatch(session, screen, command).await {
            eprintln!("error: {e}");
        }
    }
    Ok(())
}

async fn dispatch(session: &mut ChatSession, screen: &Screen, command: ShellCommand) -> Result<(), CliError> {
    match command {
        ShellCommand::Empty | ShellCommand::Quit => {}
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::Invalid(reason) => eprintln!("{reason}"),
        ShellCommand::Chats => {
            session.refresh_chats().await?;
            print_rows(session);
        }
        ShellCommand::Open(arg) => {
            let chat_id = resolve_chat(session, &arg).ok_or(CliError::UnknownChat(arg))?;
            let (outcome, status) = session.select_chat(Some(&chat_id)).await?;
            if matches!(outcome, OpenOutcome::Loaded { .. }) {
                print_thread(session.thread());
            }
            print_status(&status, screen);
        }
        ShellCommand::Close => {
            session.select_chat(None).await?;
            println!("chat closed");
        }
        ShellCommand::New { path, title } => {
            let presentation = Presentation::read(&path).await?;
            let (chat, status) = session.create_chat(&title, Some(presentation)).await?;
            println!("created chat {} ({})", chat.title, chat.id);
            print_thread(session.thread());
            print_status(&status, screen);
        }
        ShellCommand::Reference(id) => {
            let status = session.select_reference(&id).await?;
            println!("replying to {id}");
            print_status(&status, screen);
        }
        ShellCommand::Unreference => session.thread().clear_reference(),
        ShellCommand::Attach(path) => {
            let doc = session.attach_file(&path).await?;
            print_thread(session.thread());
            print_status(&DocumentStatus::Loaded(doc), screen);
        }
        ShellCommand::History => print_thread(session.thread()),
        ShellCommand::Send(text) => {
            let (outcome, status) = session.send(&text).await?;
            report_send(&outcome);
            if matches!(outcome, SendOutcome::Confirmed { .. }) {
                print_thread(session.thread());
            }
            print_status(&status, screen);
        }
    }
    Ok(())
}

// =============================================================================
// OUTPUT
// =============================================================================

pub fn print_rows(session: &ChatSession) {
    let rows = session.chats().rows();
    if rows.is_empty() {
        println!("no chats yet");
    }
    for (i, row) in rows.iter().enumerate() {
        let marker = if row.selected { '>' } else { ' ' };
        println!("{marker} {:>3}. {}  {}  ({})", i + 1, row.title, row.date, row.id);
    }
}

pub fn print_thread(thread: &ThreadController) {
    let reference = thread.reference();
    for m in thread.messages() {
        let marker = if reference.as_deref() == Some(m.id.as_str()) { '*' } else { ' ' };
        let state = match m.delivery {
            Delivery::Pending => " (sending)",
            Delivery::Confirmed | Delivery::RolledBack => "",
        };
        let attachment = if m.path.is_some() { " [slides]" } else { "" };
        println!("{marker} {} [{}] {}{attachment}{state}", m.timestamp, m.id, m.text);
    }
}

pub fn print_status(status: &DocumentStatus, screen: &Screen) {
    match status {
        DocumentStatus::Unchanged => {}
        DocumentStatus::Failed(reason) => eprintln!("viewer: {reason}"),
        DocumentStatus::Loaded(_) => {
            let shown = screen.lock().ok().and_then(|s| s.as_ref().map(crate::outline::Outline::render));
            if let Some(text) = shown {
                print!("{text}");
            }
        }
    }
}

pub fn report_send(outcome: &SendOutcome) {
    match outcome {
        SendOutcome::Skipped(reason) => eprintln!("not sent: {reason:?}"),
        SendOutcome::Confirmed { count, .. } => println!("sent ({count} messages in thread)"),
    }
}

#[cfg(test)]
#[path = "shell_test.rs"]
mod shell_test;
