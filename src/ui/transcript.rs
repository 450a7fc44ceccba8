//! Plain-text rendering of chat snapshots for a line terminal.

use chrono::{DateTime, Local, Utc};

use crate::chat::controller::{ChatSnapshot, is_outgoing};
use crate::models::{Chat, Message};

const DIAGNOSIS_PREVIEW_CHARS: usize = 60;

pub fn format_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%d.%m.%Y %H:%M").to_string()
}

fn message_header(message: &Message) -> String {
    let icon = if is_outgoing(message) { "👤" } else { "🩺" };
    format!(
        "{} {} {} {}",
        icon,
        message.sender.label(),
        message.timestamp.with_timezone(&Local).format("%H:%M"),
        "─".repeat(20)
    )
}

/// Sidebar equivalent: numbered chats with date and diagnosis preview
pub fn format_chat_list(chats: &[Chat], active_id: Option<&str>) -> String {
    if chats.is_empty() {
        return "You have no consultations yet. Describe your symptoms to start one.\n".to_string();
    }

    let mut out = String::new();
    for (i, chat) in chats.iter().enumerate() {
        let marker = if Some(chat.id.as_str()) == active_id { "▶" } else { " " };
        out.push_str(&format!(
            "{} {:>2}. {}  ({})\n",
            marker,
            i + 1,
            chat.title,
            format_date(&chat.updated_at)
        ));
        if let Some(preview) = chat.diagnosis_preview(DIAGNOSIS_PREVIEW_CHARS) {
            out.push_str(&format!("       {}\n", preview));
        }
    }
    out
}

/// Resolve `/open` arguments: a 1-based list position or a chat id
pub fn resolve_chat_ref(chats: &[Chat], reference: &str) -> Option<String> {
    let reference = reference.trim();
    if let Ok(position) = reference.parse::<usize>() {
        if let Some(chat) = position.checked_sub(1).and_then(|i| chats.get(i)) {
            return Some(chat.id.clone());
        }
    }
    if reference.is_empty() {
        None
    } else {
        Some(reference.to_string())
    }
}

/// Turns successive snapshots into the text to append to the terminal, so
/// a reply being revealed prints only its new characters.
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    chat_id: Option<String>,
    /// Messages fully printed
    printed: usize,
    /// Chars already printed of the message at `printed`
    partial: Option<usize>,
}

impl TranscriptPrinter {
    pub fn render(&mut self, snapshot: &ChatSnapshot) -> String {
        let mut out = String::new();

        let Some(chat) = &snapshot.active else {
            if self.chat_id.take().is_some() {
                self.reset(&mut out);
                out.push_str("\n── New consultation ── describe your symptoms\n");
            }
            return out;
        };

        if self.chat_id.as_deref() != Some(chat.id.as_str()) {
            self.reset(&mut out);
            out.push_str(&format!("\n══ {} ══ {}\n", chat.title, format_date(&chat.updated_at)));
            self.chat_id = Some(chat.id.clone());
        }

        while let Some(message) = chat.messages.get(self.printed) {
            let revealing = snapshot.revealing_index == Some(self.printed);

            let already = match self.partial {
                Some(chars) => chars,
                None => {
                    out.push_str(&message_header(message));
                    out.push_str("\n  ");
                    0
                }
            };
            out.extend(message.content.chars().skip(already));

            if revealing {
                self.partial = Some(message.content.chars().count());
                break;
            }

            out.push('\n');
            self.printed += 1;
            self.partial = None;
        }

        out
    }

    fn reset(&mut self, out: &mut String) {
        if self.partial.take().is_some() {
            out.push('\n');
        }
        self.printed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::controller::Phase;

    fn chat(id: &str, messages: Vec<Message>) -> Chat {
        Chat {
            id: id.to_string(),
            title: format!("Chat {}", id),
            diagnosis: None,
            messages,
            updated_at: Utc::now(),
            status: None,
        }
    }

    fn snapshot(active: Option<Chat>, revealing_index: Option<usize>) -> ChatSnapshot {
        ChatSnapshot {
            chats: Vec::new(),
            active,
            phase: Phase::Idle,
            revealing_index,
        }
    }

    #[test]
    fn test_reveal_prints_only_new_characters() {
        let mut printer = TranscriptPrinter::default();
        let user = Message::user("cough");

        let first = printer.render(&snapshot(Some(chat("c1", vec![user.clone()])), None));
        assert!(first.contains("Chat c1"));
        assert!(first.contains("cough"));

        let placeholder = Message::assistant("");
        let out = printer.render(&snapshot(Some(chat("c1", vec![user.clone(), placeholder])), Some(1)));
        assert!(out.contains("MedAssyst"));

        let out = printer.render(&snapshot(Some(chat("c1", vec![user.clone(), Message::assistant("Tak")])), Some(1)));
        assert_eq!(out, "Tak");

        let out = printer.render(&snapshot(Some(chat("c1", vec![user.clone(), Message::assistant("Take rest")])), Some(1)));
        assert_eq!(out, "e rest");

        let out = printer.render(&snapshot(Some(chat("c1", vec![user, Message::assistant("Take rest.")])), None));
        assert_eq!(out, ".\n");
    }

    #[test]
    fn test_switching_chat_prints_header_and_history() {
        let mut printer = TranscriptPrinter::default();
        printer.render(&snapshot(Some(chat("c1", vec![Message::user("a")])), None));

        let out = printer.render(&snapshot(Some(chat("c2", vec![Message::user("b"), Message::assistant("c")])), None));
        assert!(out.contains("Chat c2"));
        assert!(out.contains("  b\n"));
        assert!(out.contains("  c\n"));

        let out = printer.render(&snapshot(None, None));
        assert!(out.contains("New consultation"));
        assert!(printer.render(&snapshot(None, None)).is_empty());
    }

    #[test]
    fn test_chat_list_and_resolution() {
        let mut with_diagnosis = chat("c2", Vec::new());
        with_diagnosis.diagnosis = Some("ОРВИ".to_string());
        let chats = vec![chat("c1", Vec::new()), with_diagnosis];

        let listing = format_chat_list(&chats, Some("c2"));
        assert!(listing.contains(" 1. Chat c1"));
        assert!(listing.contains("▶  2. Chat c2"));
        assert!(listing.contains("ОРВИ"));

        assert_eq!(resolve_chat_ref(&chats, "2").as_deref(), Some("c2"));
        assert_eq!(resolve_chat_ref(&chats, "abc123").as_deref(), Some("abc123"));
        assert_eq!(resolve_chat_ref(&chats, "9").as_deref(), Some("9"));
        assert!(resolve_chat_ref(&chats, " ").is_none());
        assert!(format_chat_list(&[], None).contains("no consultations"));
    }
}
