//! In-memory collaborators for controller tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use crate::error::GatewayError;
use crate::gateway::ChatGateway;
use crate::models::{Chat, Identity, Message};
use crate::notify::Notifier;

#[derive(Default)]
struct FakeState {
    chats: BTreeMap<String, Chat>,
    next_id: u32,
    calls: Vec<String>,
    send_failure: Option<GatewayError>,
    list_failure: Option<GatewayError>,
    create_failure: Option<GatewayError>,
    send_gate: Option<Arc<Notify>>,
    list_gate: Option<Arc<Notify>>,
    omit_replies: bool,
}

/// Gateway that keeps chats in memory and answers every message with a
/// fixed reply
pub struct FakeGateway {
    reply: String,
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Seed a chat whose log holds `user_messages`
    pub fn insert_chat(&self, id: &str, user_messages: &[&str]) {
        let chat = Chat {
            id: id.to_string(),
            title: format!("Chat {}", id),
            diagnosis: None,
            messages: user_messages.iter().map(|m| Message::user(*m)).collect(),
            updated_at: Utc::now(),
            status: None,
        };
        self.state.lock().unwrap().chats.insert(id.to_string(), chat);
    }

    /// Hold every send until the returned notify is triggered once per send
    pub fn gate_sends(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().send_gate = Some(gate.clone());
        gate
    }

    /// Hold every list load until notified. The list is read when the call
    /// starts, so a held load answers with the chats as they were then.
    pub fn gate_lists(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().list_gate = Some(gate.clone());
        gate
    }

    /// Answer sends with the user message echoed but no assistant reply
    pub fn omit_replies(&self) {
        self.state.lock().unwrap().omit_replies = true;
    }

    pub fn fail_creates(&self, err: GatewayError) {
        self.state.lock().unwrap().create_failure = Some(err);
    }

    pub fn fail_sends(&self, err: GatewayError) {
        self.state.lock().unwrap().send_failure = Some(err);
    }

    pub fn fail_lists(&self, err: GatewayError) {
        self.state.lock().unwrap().list_failure = Some(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl ChatGateway for FakeGateway {
    async fn list_chats(&self, _identity: &Identity) -> Result<Vec<Chat>, GatewayError> {
        self.record("list".to_string());
        let (result, gate) = {
            let state = self.state.lock().unwrap();
            let result = match &state.list_failure {
                Some(err) => Err(err.clone()),
                None => Ok(state.chats.values().cloned().collect()),
            };
            (result, state.list_gate.clone())
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        result
    }

    async fn get_chat(&self, id: &str) -> Result<Chat, GatewayError> {
        self.record(format!("get {}", id));
        self.state
            .lock()
            .unwrap()
            .chats
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(String::new()))
    }

    async fn create_chat(&self, _identity: &Identity) -> Result<Chat, GatewayError> {
        self.record("create".to_string());
        let mut state = self.state.lock().unwrap();
        if let Some(err) = &state.create_failure {
            return Err(err.clone());
        }
        state.next_id += 1;
        let chat = Chat {
            id: format!("c{}", state.next_id),
            title: "New consultation".to_string(),
            diagnosis: None,
            messages: Vec::new(),
            updated_at: Utc::now(),
            status: None,
        };
        state.chats.insert(chat.id.clone(), chat.clone());
        Ok(chat)
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<Chat, GatewayError> {
        self.record(format!("send {} {}", chat_id, text));

        let gate = self.state.lock().unwrap().send_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(err) = &state.send_failure {
            return Err(err.clone());
        }
        let omit_replies = state.omit_replies;
        let chat = state
            .chats
            .get_mut(chat_id)
            .ok_or_else(|| GatewayError::NotFound(String::new()))?;
        chat.messages.push(Message::user(text));
        if !omit_replies {
            chat.messages.push(Message::assistant(self.reply.clone()));
        }
        chat.updated_at = Utc::now();
        Ok(chat.clone())
    }

    async fn close_chat(&self, chat_id: &str) -> Result<Chat, GatewayError> {
        self.record(format!("close {}", chat_id));
        let mut state = self.state.lock().unwrap();
        let chat = state
            .chats
            .get_mut(chat_id)
            .ok_or_else(|| GatewayError::NotFound(String::new()))?;
        chat.status = Some("closed".to_string());
        Ok(chat.clone())
    }
}

/// Notifier that remembers what it was told
#[derive(Default)]
pub struct RecordingNotifier {
    errors: Mutex<Vec<String>>,
    infos: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }
}
