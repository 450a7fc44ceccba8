//! The single event loop that owns a [`ChatController`].

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::chat::controller::{ChatController, ControllerContext, ViewChannels};
use crate::events::ChatIntent;

/// What the view holds to talk to a running controller
#[derive(Clone)]
pub struct ControllerHandle {
    intents: mpsc::UnboundedSender<ChatIntent>,
    shutdown: CancellationToken,
}

impl ControllerHandle {
    /// Queue an intent. Returns false once the loop has stopped.
    pub fn send(&self, intent: ChatIntent) -> bool {
        self.intents.send(intent).is_ok()
    }

    /// Tear the controller down; an in-flight reveal is cancelled
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

pub struct ControllerRuntime {
    controller: ChatController,
    intents: mpsc::UnboundedReceiver<ChatIntent>,
    shutdown: CancellationToken,
}

impl ControllerRuntime {
    pub fn new(context: ControllerContext) -> (Self, ControllerHandle, ViewChannels) {
        let (controller, channels) = ChatController::new(context);
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let runtime = Self {
            controller,
            intents: rx,
            shutdown: shutdown.clone(),
        };
        let handle = ControllerHandle {
            intents: tx,
            shutdown,
        };

        (runtime, handle, channels)
    }

    /// Start the loop on the current tokio runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Load the chat list, then process intents, gateway completions and
    /// reveal steps one at a time until shutdown or every handle is gone.
    pub async fn run(mut self) {
        self.controller.load_chat_list();

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                intent = self.intents.recv() => match intent {
                    Some(intent) => {
                        debug!(?intent, "intent");
                        self.controller.handle_intent(intent);
                    }
                    None => break,
                },
                work = self.controller.next_work(), if self.controller.has_pending_work() => {
                    if let Some(work) = work {
                        self.controller.apply(work);
                    }
                }
            }
        }

        debug!("controller loop stopped");
        self.controller.shutdown();
    }
}
