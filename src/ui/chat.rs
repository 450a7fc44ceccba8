use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::chat::commands::{PromptInput, SlashCommand, get_help_text, parse_prompt};
use crate::chat::controller::{ChatSnapshot, ControllerContext, Phase};
use crate::chat::runtime::{ControllerHandle, ControllerRuntime};
use crate::events::{ChatIntent, ViewEvent};
use crate::notify::Notifier;
use crate::ui::Palette;
use crate::ui::transcript::{TranscriptPrinter, format_chat_list, resolve_chat_ref};

/// What the prompt loop should do after a line
enum Flow {
    Continue,
    Exit,
}

/// Run the interactive chat until `/bye` or end of input
pub async fn run_chat(context: ControllerContext, palette: Palette) -> Result<()> {
    let notifier = context.notifier.clone();
    let greeting = if context.identity.display_name.is_empty() {
        "Welcome to MedAssyst.".to_string()
    } else {
        format!("Welcome, {}.", context.identity.display_name)
    };

    let (runtime, handle, mut channels) = ControllerRuntime::new(context);
    let task = runtime.spawn();

    println!("{}", palette.accent(&greeting));
    println!("{}", palette.muted("Describe your symptoms, or type /help for commands."));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printer = TranscriptPrinter::default();
    let mut snapshot = ChatSnapshot::default();
    let mut stdout = std::io::stdout();
    print_prompt(&mut stdout, &palette)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                match handle_line(&line, &snapshot, &handle, notifier.as_ref(), &palette) {
                    Flow::Continue => {
                        if snapshot.phase == Phase::Idle {
                            print_prompt(&mut stdout, &palette)?;
                        }
                    }
                    Flow::Exit => break,
                }
            }
            changed = channels.snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = channels.snapshots.borrow_and_update().clone();
                let was_busy = snapshot.phase != Phase::Idle;
                let output = printer.render(&next);
                if !output.is_empty() {
                    write!(stdout, "{}", output)?;
                }
                if was_busy && next.phase == Phase::Idle {
                    print_prompt(&mut stdout, &palette)?;
                }
                snapshot = next;
            }
            Some(event) = channels.events.recv() => match event {
                ViewEvent::ScrollToBottom => stdout.flush()?,
            },
        }
    }

    handle.shutdown();
    task.await?;
    println!();
    println!("{}", palette.muted("Goodbye. Take care."));
    Ok(())
}

fn print_prompt(stdout: &mut std::io::Stdout, palette: &Palette) -> Result<()> {
    write!(stdout, "{} ", palette.accent(">"))?;
    stdout.flush()?;
    Ok(())
}

fn handle_line(
    line: &str,
    snapshot: &ChatSnapshot,
    handle: &ControllerHandle,
    notifier: &dyn Notifier,
    palette: &Palette,
) -> Flow {
    let command = match parse_prompt(line) {
        PromptInput::Message(text) => {
            if !text.trim().is_empty() {
                handle.send(ChatIntent::Submit(text));
            }
            return Flow::Continue;
        }
        PromptInput::Unknown(raw) => {
            notifier.error(&format!("Unknown command: {} (try /help)", raw));
            return Flow::Continue;
        }
        PromptInput::Command(command) => command,
    };

    if snapshot.phase != Phase::Idle && !command.command.available_while_busy() {
        notifier.info("Please wait until the current reply is finished");
        return Flow::Continue;
    }

    let active_id = snapshot.active.as_ref().map(|chat| chat.id.clone());

    match command.command {
        SlashCommand::New => {
            handle.send(ChatIntent::StartNewChat);
        }
        SlashCommand::Open => match command.argument().and_then(|arg| resolve_chat_ref(&snapshot.chats, arg)) {
            Some(id) => {
                handle.send(ChatIntent::OpenChat(id));
            }
            None => notifier.info("Usage: /open <number|id>"),
        },
        SlashCommand::List => {
            print!("{}", format_chat_list(&snapshot.chats, active_id.as_deref()));
            handle.send(ChatIntent::RefreshChats);
        }
        SlashCommand::Close => match active_id {
            Some(id) => {
                handle.send(ChatIntent::CloseChat(id));
            }
            None => notifier.info("No consultation is open"),
        },
        SlashCommand::Help => println!("{}", palette.muted(&get_help_text())),
        SlashCommand::Bye => return Flow::Exit,
    }

    Flow::Continue
}
