use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Privilege level of an authenticated user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// The authenticated user as reported by the auth endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(alias = "_id")]
    pub id: String,

    #[serde(rename = "name", alias = "displayName", default)]
    pub display_name: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    #[serde(alias = "system", alias = "bot")]
    Assistant,
}

impl Sender {
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "MedAssyst",
        }
    }
}

/// Single entry of a chat's message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A consultation: title, optional diagnosis and its message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    #[serde(alias = "_id")]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub diagnosis: Option<String>,

    #[serde(default)]
    pub messages: Vec<Message>,

    #[serde(rename = "updatedAt", alias = "updated_at", default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub status: Option<String>,
}

impl Chat {
    /// Short diagnosis preview for chat lists
    pub fn diagnosis_preview(&self, max_chars: usize) -> Option<String> {
        self.diagnosis
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(|d| d.chars().take(max_chars).collect())
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}
