//! Line-oriented terminal views for the chat and admin statistics screens

pub mod chat;
pub mod stats;
pub mod transcript;

pub use chat::run_chat;
pub use stats::run_stats;
pub use transcript::{TranscriptPrinter, format_chat_list, resolve_chat_ref};

use crate::config::Theme;

/// ANSI styling picked from the configured theme
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub accent: &'static str,
    pub muted: &'static str,
}

const RESET: &str = "\x1b[0m";

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                accent: "\x1b[96m",
                muted: "\x1b[90m",
            },
            Theme::Light => Self {
                accent: "\x1b[34m",
                muted: "\x1b[37m",
            },
        }
    }

    pub fn accent(&self, text: &str) -> String {
        format!("{}{}{}", self.accent, text, RESET)
    }

    pub fn muted(&self, text: &str) -> String {
        format!("{}{}{}", self.muted, text, RESET)
    }
}
