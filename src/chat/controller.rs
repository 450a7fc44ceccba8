//! Chat session controller: owns the chat list and the active chat, submits
//! messages and drives the typing reveal of each reply.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::chat::reveal::{RevealEngine, RevealHandle, RevealStream, RevealUpdate};
use crate::error::{GatewayError, SubmitError};
use crate::events::{ChatIntent, ViewEvent};
use crate::gateway::ChatGateway;
use crate::models::{Chat, Identity, Message, Sender};
use crate::notify::Notifier;

const LOAD_HISTORY_FAILED: &str = "Could not load chat history";
const LOAD_CHAT_FAILED: &str = "Could not load chat";
const CREATE_CHAT_FAILED: &str = "Could not create a new chat";
const SEND_FAILED: &str = "Could not send message";
const CLOSE_FAILED: &str = "Could not close the consultation";

/// Where the active chat is in its submit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// User message appended locally, waiting for the server
    Submitting,
    /// Reply received, being revealed
    Revealing,
}

/// Progressive display of one assistant reply. Present only while the reply
/// is being revealed; it is settled into the message log and dropped on
/// completion or cancel.
#[derive(Debug, Clone)]
pub struct RevealState {
    pub message_index: usize,
    pub full_text: String,
    pub revealed_text: String,
    handle: RevealHandle,
    final_message: Message,
}

/// What the view reads; published after every state change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatSnapshot {
    pub chats: Vec<Chat>,
    pub active: Option<Chat>,
    pub phase: Phase,
    /// Index of the message currently being revealed, if any
    pub revealing_index: Option<usize>,
}

/// Collaborators handed to the controller at construction
pub struct ControllerContext {
    pub gateway: Arc<dyn ChatGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub identity: Identity,
    pub engine: RevealEngine,
}

/// Receiving ends the view listens on
pub struct ViewChannels {
    pub snapshots: watch::Receiver<ChatSnapshot>,
    pub events: mpsc::UnboundedReceiver<ViewEvent>,
}

/// Result of a gateway call issued by the controller. `epoch` is the value
/// of the active-chat epoch when the call was issued.
#[derive(Debug)]
pub(crate) enum Completion {
    ChatList {
        seq: u64,
        result: Result<Vec<Chat>, GatewayError>,
    },
    Opened {
        epoch: u64,
        request: u64,
        result: Result<Chat, GatewayError>,
    },
    Created {
        epoch: u64,
        text: String,
        result: Result<Chat, GatewayError>,
    },
    Sent {
        epoch: u64,
        chat_id: String,
        result: Result<Chat, GatewayError>,
    },
    Closed {
        chat_id: String,
        result: Result<Chat, GatewayError>,
    },
}

/// Unit of deferred work ready to be applied
#[derive(Debug)]
pub(crate) enum Work {
    Completion(Result<Completion, JoinError>),
    Reveal(Option<RevealUpdate>),
}

pub struct ChatController {
    gateway: Arc<dyn ChatGateway>,
    notifier: Arc<dyn Notifier>,
    identity: Identity,
    engine: RevealEngine,

    chats: Vec<Chat>,
    active: Option<Chat>,
    phase: Phase,
    reveal: Option<RevealState>,
    reveal_stream: Option<RevealStream>,

    /// Bumped whenever the active chat changes; stale completions compare
    /// against it
    epoch: u64,
    /// Latest `open_chat` request; only its response may take effect
    open_seq: u64,
    /// Chat list loads issued so far
    list_seq: u64,
    /// Chats created here, tagged with `list_seq` at creation. A list load
    /// issued no later than that may not contain them yet.
    created_marks: Vec<(u64, String)>,
    pending: JoinSet<Completion>,

    snapshot_tx: watch::Sender<ChatSnapshot>,
    view_tx: mpsc::UnboundedSender<ViewEvent>,
}

impl ChatController {
    pub fn new(context: ControllerContext) -> (Self, ViewChannels) {
        let (snapshot_tx, snapshots) = watch::channel(ChatSnapshot::default());
        let (view_tx, events) = mpsc::unbounded_channel();

        let controller = Self {
            gateway: context.gateway,
            notifier: context.notifier,
            identity: context.identity,
            engine: context.engine,
            chats: Vec::new(),
            active: None,
            phase: Phase::Idle,
            reveal: None,
            reveal_stream: None,
            epoch: 0,
            open_seq: 0,
            list_seq: 0,
            created_marks: Vec::new(),
            pending: JoinSet::new(),
            snapshot_tx,
            view_tx,
        };

        (controller, ViewChannels { snapshots, events })
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn active_chat(&self) -> Option<&Chat> {
        self.active.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn reveal_state(&self) -> Option<&RevealState> {
        self.reveal.as_ref()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            chats: self.chats.clone(),
            active: self.active.clone(),
            phase: self.phase,
            revealing_index: self.reveal.as_ref().map(|r| r.message_index),
        }
    }

    /// Route a view intent. Submit rejections are reported here; everything
    /// else reports through its completion.
    pub fn handle_intent(&mut self, intent: ChatIntent) {
        match intent {
            ChatIntent::Submit(text) => match self.submit(&text) {
                Ok(()) => {}
                Err(SubmitError::Empty) => debug!("ignoring empty submit"),
                Err(SubmitError::Busy) => self
                    .notifier
                    .info("Please wait until the current reply is finished"),
            },
            ChatIntent::OpenChat(id) => self.open_chat(&id),
            ChatIntent::StartNewChat => self.start_new_chat(),
            ChatIntent::RefreshChats => self.load_chat_list(),
            ChatIntent::CloseChat(id) => self.close_chat(&id),
        }
    }

    /// Fetch every chat of the current identity. On failure the previous
    /// list stays as it was.
    pub fn load_chat_list(&mut self) {
        self.list_seq += 1;
        let seq = self.list_seq;
        let gateway = self.gateway.clone();
        let identity = self.identity.clone();
        self.pending.spawn(async move {
            Completion::ChatList {
                seq,
                result: gateway.list_chats(&identity).await,
            }
        });
    }

    /// Fetch a chat and make it active once it arrives. A later call
    /// supersedes any open still in flight.
    pub fn open_chat(&mut self, id: &str) {
        debug!(chat = %id, "opening chat");
        self.open_seq += 1;
        let request = self.open_seq;
        let gateway = self.gateway.clone();
        let epoch = self.epoch;
        let id = id.to_string();
        self.pending.spawn(async move {
            Completion::Opened {
                epoch,
                request,
                result: gateway.get_chat(&id).await,
            }
        });
    }

    /// Forget the active chat; the next submit creates a new one
    pub fn start_new_chat(&mut self) {
        self.cancel_reveal();
        self.set_active(None);
        self.publish();
    }

    pub fn submit(&mut self, text: &str) -> Result<(), SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::Empty);
        }
        if self.phase != Phase::Idle {
            return Err(SubmitError::Busy);
        }

        self.phase = Phase::Submitting;
        let text = text.to_string();

        if self.active.is_some() {
            self.append_and_send(text);
            return Ok(());
        }

        let gateway = self.gateway.clone();
        let identity = self.identity.clone();
        let epoch = self.epoch;
        self.pending.spawn(async move {
            Completion::Created {
                epoch,
                text,
                result: gateway.create_chat(&identity).await,
            }
        });
        self.publish();

        Ok(())
    }

    pub fn close_chat(&mut self, id: &str) {
        let gateway = self.gateway.clone();
        let chat_id = id.to_string();
        self.pending.spawn(async move {
            let result = gateway.close_chat(&chat_id).await;
            Completion::Closed { chat_id, result }
        });
    }

    /// Teardown: stop the reveal, let in-flight requests finish unobserved
    pub fn shutdown(&mut self) {
        self.cancel_reveal();
        self.pending.detach_all();
        self.phase = Phase::Idle;
        self.publish();
    }

    /// True while a gateway call or a reveal is outstanding
    pub fn has_pending_work(&self) -> bool {
        !self.pending.is_empty() || self.reveal_stream.is_some()
    }

    /// Wait for the next completion or reveal step. `None` when nothing is
    /// outstanding.
    pub(crate) async fn next_work(&mut self) -> Option<Work> {
        let has_pending = !self.pending.is_empty();
        let has_reveal = self.reveal_stream.is_some();

        tokio::select! {
            Some(joined) = self.pending.join_next(), if has_pending => Some(Work::Completion(joined)),
            update = next_reveal_update(&mut self.reveal_stream), if has_reveal => Some(Work::Reveal(update)),
            else => None,
        }
    }

    pub(crate) fn apply(&mut self, work: Work) {
        match work {
            Work::Completion(Ok(completion)) => self.apply_completion(completion),
            Work::Completion(Err(err)) => {
                error!(error = %err, "gateway task failed");
                if self.phase == Phase::Submitting {
                    self.phase = Phase::Idle;
                    self.publish();
                }
            }
            Work::Reveal(Some(update)) => self.apply_reveal_update(update),
            Work::Reveal(None) => self.reveal_stream = None,
        }
    }

    /// Drive completions and reveal steps until nothing is outstanding
    pub async fn run_until_idle(&mut self) {
        while let Some(work) = self.next_work().await {
            self.apply(work);
        }
    }

    fn apply_completion(&mut self, completion: Completion) {
        match completion {
            Completion::ChatList { seq, result: Ok(chats) } => self.on_chat_list(seq, chats),
            Completion::ChatList { result: Err(err), .. } => {
                warn!(error = %err, "failed to load chat list");
                self.notifier.error(LOAD_HISTORY_FAILED);
            }

            Completion::Opened {
                epoch,
                request,
                result,
            } => {
                if epoch != self.epoch || request != self.open_seq {
                    debug!("discarding stale chat fetch");
                    return;
                }
                match result {
                    Ok(chat) => {
                        info!(chat = %chat.id, "chat opened");
                        self.cancel_reveal();
                        self.set_active(Some(chat));
                        self.publish();
                        self.scroll_to_bottom();
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to open chat");
                        self.notifier.error(&err.user_message(LOAD_CHAT_FAILED));
                    }
                }
            }

            Completion::Created { epoch, text, result } => self.on_chat_created(epoch, text, result),

            Completion::Sent {
                epoch,
                chat_id,
                result,
            } => self.on_message_sent(epoch, chat_id, result),

            Completion::Closed { chat_id, result } => match result {
                Ok(chat) => {
                    info!(chat = %chat_id, "consultation closed");
                    self.merge_chat(&chat);
                    self.notifier.info("Consultation closed");
                    self.publish();
                }
                Err(err) => {
                    warn!(chat = %chat_id, error = %err, "failed to close chat");
                    self.notifier.error(&err.user_message(CLOSE_FAILED));
                }
            },
        }
    }

    /// Replace the cached list, keeping chats created after this load was
    /// issued that the server response could not include yet
    fn on_chat_list(&mut self, seq: u64, mut chats: Vec<Chat>) {
        debug!(count = chats.len(), seq, "chat list loaded");
        self.created_marks.retain(|(mark, _)| *mark >= seq);

        let missing: Vec<Chat> = self
            .chats
            .iter()
            .filter(|c| self.created_marks.iter().any(|(_, id)| *id == c.id))
            .filter(|c| !chats.iter().any(|n| n.id == c.id))
            .cloned()
            .collect();
        chats.splice(0..0, missing);

        self.chats = chats;
        self.publish();
    }

    fn on_chat_created(&mut self, epoch: u64, text: String, result: Result<Chat, GatewayError>) {
        let chat = match result {
            Ok(chat) => chat,
            Err(err) => {
                warn!(error = %err, "failed to create chat");
                if epoch == self.epoch {
                    self.phase = Phase::Idle;
                    self.notifier.error(&err.user_message(CREATE_CHAT_FAILED));
                    self.publish();
                }
                return;
            }
        };

        info!(chat = %chat.id, "chat created");
        self.created_marks.push((self.list_seq, chat.id.clone()));
        self.chats.retain(|c| c.id != chat.id);
        self.chats.insert(0, chat.clone());

        if epoch != self.epoch {
            // the user moved on; deliver the message without showing it
            debug!(chat = %chat.id, "sending into a chat that is no longer active");
            self.spawn_send(epoch, chat.id, text);
            self.publish();
            return;
        }

        self.set_active(Some(chat));
        self.phase = Phase::Submitting;
        self.append_and_send(text);
    }

    fn on_message_sent(&mut self, epoch: u64, chat_id: String, result: Result<Chat, GatewayError>) {
        let is_current = epoch == self.epoch
            && self.active.as_ref().is_some_and(|c| c.id == chat_id);

        if !is_current {
            debug!(chat = %chat_id, "discarding reply for inactive chat");
            if result.is_ok() {
                self.load_chat_list();
            }
            return;
        }

        let chat = match result {
            Ok(chat) => chat,
            Err(err) => {
                warn!(chat = %chat_id, error = %err, "failed to send message");
                self.fail_send(&err.user_message(SEND_FAILED));
                return;
            }
        };

        let reply = match chat.last_message() {
            Some(message) => match message.sender {
                Sender::Assistant => message.clone(),
                Sender::User => {
                    warn!(chat = %chat_id, "server reply does not end with an assistant message");
                    self.fail_send(SEND_FAILED);
                    return;
                }
            },
            None => {
                warn!(chat = %chat_id, "server returned a chat without messages");
                self.fail_send(SEND_FAILED);
                return;
            }
        };

        if let Some(active) = self.active.as_mut() {
            active.title = chat.title.clone();
            active.diagnosis = chat.diagnosis.clone();
            active.updated_at = chat.updated_at;
            active.status = chat.status.clone();
        }

        self.start_reveal(reply);
    }

    fn fail_send(&mut self, message: &str) {
        self.phase = Phase::Idle;
        self.notifier.error(message);
        self.publish();
    }

    fn start_reveal(&mut self, reply: Message) {
        let Some(active) = self.active.as_mut() else {
            self.phase = Phase::Idle;
            return;
        };

        let (handle, stream) = self.engine.start(reply.content.clone());
        debug!(handle = handle.id(), chars = reply.content.chars().count(), "revealing reply");

        let placeholder = Message {
            sender: reply.sender,
            content: String::new(),
            timestamp: reply.timestamp,
        };
        active.messages.push(placeholder);

        self.reveal = Some(RevealState {
            message_index: active.messages.len() - 1,
            full_text: reply.content.clone(),
            revealed_text: String::new(),
            handle,
            final_message: reply,
        });
        self.reveal_stream = Some(stream);
        self.phase = Phase::Revealing;

        self.publish();
        self.scroll_to_bottom();
    }

    fn apply_reveal_update(&mut self, update: RevealUpdate) {
        let Some(reveal) = self.reveal.as_mut() else {
            return;
        };
        if reveal.handle.id() != update.handle() {
            debug!(handle = update.handle(), "ignoring update from a replaced reveal");
            return;
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };

        match update {
            RevealUpdate::Progress { revealed, .. } => {
                debug_assert!(reveal.full_text.starts_with(&revealed));
                if let Some(message) = active.messages.get_mut(reveal.message_index) {
                    message.content.clone_from(&revealed);
                }
                reveal.revealed_text = revealed;
            }
            RevealUpdate::Complete { .. } => {
                if let Some(reveal) = self.reveal.take() {
                    if let Some(message) = active.messages.get_mut(reveal.message_index) {
                        *message = reveal.final_message;
                    }
                }
                self.reveal_stream = None;
                self.phase = Phase::Idle;
                self.load_chat_list();
            }
        }

        self.publish();
        self.scroll_to_bottom();
    }

    /// Stop any running reveal and settle its message to the full text
    fn cancel_reveal(&mut self) {
        self.reveal_stream = None;
        let Some(reveal) = self.reveal.take() else {
            return;
        };

        reveal.handle.cancel();
        if let Some(message) = self
            .active
            .as_mut()
            .and_then(|chat| chat.messages.get_mut(reveal.message_index))
        {
            *message = reveal.final_message;
        }
    }

    fn append_and_send(&mut self, text: String) {
        let Some(active) = self.active.as_mut() else {
            self.phase = Phase::Idle;
            return;
        };

        active.messages.push(Message::user(text.clone()));
        let chat_id = active.id.clone();

        self.publish();
        self.scroll_to_bottom();
        self.spawn_send(self.epoch, chat_id, text);
    }

    fn spawn_send(&mut self, epoch: u64, chat_id: String, text: String) {
        let gateway = self.gateway.clone();
        self.pending.spawn(async move {
            let result = gateway.send_message(&chat_id, &text).await;
            Completion::Sent {
                epoch,
                chat_id,
                result,
            }
        });
    }

    fn set_active(&mut self, chat: Option<Chat>) {
        self.active = chat;
        self.epoch += 1;
        self.phase = Phase::Idle;
    }

    /// Replace cached copies of `chat` without touching its message log
    /// while a reveal is running on it
    fn merge_chat(&mut self, chat: &Chat) {
        if let Some(entry) = self.chats.iter_mut().find(|c| c.id == chat.id) {
            *entry = chat.clone();
        }
        if let Some(active) = self.active.as_mut().filter(|a| a.id == chat.id) {
            if self.reveal.is_some() {
                active.title = chat.title.clone();
                active.diagnosis = chat.diagnosis.clone();
                active.status = chat.status.clone();
            } else {
                *active = chat.clone();
            }
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn scroll_to_bottom(&self) {
        // nobody listening is fine
        let _ = self.view_tx.send(ViewEvent::ScrollToBottom);
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        if let Some(reveal) = &self.reveal {
            reveal.handle.cancel();
        }
        self.pending.detach_all();
    }
}

async fn next_reveal_update(stream: &mut Option<RevealStream>) -> Option<RevealUpdate> {
    match stream {
        Some(stream) => stream.next_update().await,
        None => None,
    }
}

/// Whether a message belongs on the right-hand (user) side of a transcript
pub fn is_outgoing(message: &Message) -> bool {
    match message.sender {
        Sender::User => true,
        Sender::Assistant => false,
    }
}
