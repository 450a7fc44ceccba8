use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a line with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Start a new consultation
    New,
    /// Open a chat from the list by number or id
    Open,
    /// Show the chat list
    List,
    /// Close the active consultation
    Close,
    /// Show help
    Help,
    /// Exit the application
    Bye,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }
}

/// A line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptInput {
    Message(String),
    Command(ParsedCommand),
    /// Starts with '/' but names no known command
    Unknown(String),
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::New => "start a new consultation",
            SlashCommand::Open => "open a chat: /open <number|id>",
            SlashCommand::List => "show your consultations",
            SlashCommand::Close => "close the active consultation",
            SlashCommand::Help => "show available commands",
            SlashCommand::Bye => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }

    /// Whether this command can be run while a reply is being revealed.
    pub fn available_while_busy(self) -> bool {
        match self {
            SlashCommand::New | SlashCommand::Open | SlashCommand::List | SlashCommand::Help | SlashCommand::Bye => true,
            SlashCommand::Close => false,
        }
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let head = parts.next()?;
    let tail: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(head).ok().or_else(|| match head.to_lowercase().as_str() {
        "q" | "quit" | "exit" => Some(SlashCommand::Bye),
        "n" | "home" => Some(SlashCommand::New),
        "o" => Some(SlashCommand::Open),
        "l" | "ls" | "chats" | "history" => Some(SlashCommand::List),
        "h" | "?" => Some(SlashCommand::Help),
        _ => None,
    })?;

    let argument = if tail.is_empty() {
        None
    } else {
        Some(tail.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Classify a prompt line
pub fn parse_prompt(line: &str) -> PromptInput {
    let trimmed = line.trim();
    if trimmed.starts_with('/') {
        return match parse_slash_command(trimmed) {
            Some(command) => PromptInput::Command(command),
            None => PromptInput::Unknown(trimmed.to_string()),
        };
    }
    PromptInput::Message(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for command in SlashCommand::iter() {
        help.push_str(&format!("/{} - {}\n", command.command(), command.description()));
    }

    help.push_str("\nAliases: /q for /bye, /n for /new, /o for /open, /l for /list.");
    help.push_str("\nAnything else you type is sent to the assistant.");

    help
}
