//! Network boundary consumed by the chat controller.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::models::{Chat, Identity};

/// Remote chat operations. Every call returns the server's copy of the chat
/// aggregate; the controller caches it.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// All chats belonging to `identity`, most recent first
    async fn list_chats(&self, identity: &Identity) -> Result<Vec<Chat>, GatewayError>;

    async fn get_chat(&self, id: &str) -> Result<Chat, GatewayError>;

    async fn create_chat(&self, identity: &Identity) -> Result<Chat, GatewayError>;

    /// Append `text` as a user message; the returned chat ends with the
    /// assistant's reply.
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<Chat, GatewayError>;

    /// Mark a consultation as finished
    async fn close_chat(&self, chat_id: &str) -> Result<Chat, GatewayError>;
}
