//! Typing reveal: turns an already complete reply into a timed sequence of
//! growing prefixes, the way a streaming response would have arrived.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::config::RevealConfig;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Steps through the char boundaries of a string. Pure; the timed task in
/// [`RevealEngine`] is a thin loop around it.
#[derive(Debug, Clone)]
pub struct RevealCursor {
    full_text: String,
    /// Byte offset of every char boundary, including 0 and `len()`
    boundaries: Vec<usize>,
    /// Index into `boundaries` of the current prefix end
    position: usize,
    chars_per_step: usize,
}

/// One advance of a [`RevealCursor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealStep<'a> {
    Partial(&'a str),
    Done(&'a str),
}

impl RevealCursor {
    pub fn new(full_text: impl Into<String>, chars_per_step: usize) -> Self {
        let full_text = full_text.into();
        let boundaries = full_text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(full_text.len()))
            .collect();

        Self {
            full_text,
            boundaries,
            position: 0,
            chars_per_step: chars_per_step.max(1),
        }
    }

    /// Move forward by one step. Returns `None` once `Done` has been yielded.
    pub fn advance(&mut self) -> Option<RevealStep<'_>> {
        let last = self.boundaries.len() - 1;
        if self.position > last {
            return None;
        }

        if self.position == last {
            // past-the-end marks the cursor as spent
            self.position = last + 1;
            return Some(RevealStep::Done(&self.full_text));
        }

        self.position = (self.position + self.chars_per_step).min(last);
        if self.position == last {
            self.position = last + 1;
            return Some(RevealStep::Done(&self.full_text));
        }

        Some(RevealStep::Partial(&self.full_text[..self.boundaries[self.position]]))
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn is_done(&self) -> bool {
        self.position >= self.boundaries.len()
    }
}

/// Update emitted while a reveal runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealUpdate {
    Progress { handle: u64, revealed: String },
    Complete { handle: u64, text: String },
}

impl RevealUpdate {
    pub fn handle(&self) -> u64 {
        match self {
            RevealUpdate::Progress { handle, .. } | RevealUpdate::Complete { handle, .. } => *handle,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            RevealUpdate::Progress { revealed, .. } => revealed,
            RevealUpdate::Complete { text, .. } => text,
        }
    }
}

/// Control side of a running reveal
#[derive(Debug, Clone)]
pub struct RevealHandle {
    id: u64,
    token: CancellationToken,
}

impl RevealHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop emitting. Idempotent, and a no-op after completion.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            trace!(handle = self.id, "reveal cancelled");
            self.token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Receiving side of a running reveal. Yields nothing once its handle is
/// cancelled, even if updates were already buffered.
pub struct RevealStream {
    rx: mpsc::UnboundedReceiver<RevealUpdate>,
    token: CancellationToken,
}

impl RevealStream {
    pub async fn next_update(&mut self) -> Option<RevealUpdate> {
        if self.token.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            update = self.rx.recv() => update.filter(|_| !self.token.is_cancelled()),
        }
    }
}

impl Stream for RevealStream {
    type Item = RevealUpdate;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.token.is_cancelled() {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}

/// Spawns reveal tasks at a fixed cadence
#[derive(Debug, Clone, Copy)]
pub struct RevealEngine {
    chars_per_step: usize,
    step_interval: Duration,
}

impl Default for RevealEngine {
    fn default() -> Self {
        Self::new(&RevealConfig::default())
    }
}

impl RevealEngine {
    pub fn new(config: &RevealConfig) -> Self {
        Self {
            chars_per_step: config.chars_per_step.max(1),
            step_interval: config.step_interval(),
        }
    }

    pub fn step_interval(&self) -> Duration {
        self.step_interval
    }

    /// Begin revealing `full_text`. The first prefix is emitted right away,
    /// the rest one `step_interval` apart. Must be called inside a tokio
    /// runtime.
    pub fn start(&self, full_text: impl Into<String>) -> (RevealHandle, RevealStream) {
        let id = NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut cursor = RevealCursor::new(full_text, self.chars_per_step);
        let interval = self.step_interval;
        let task_token = token.clone();

        tokio::spawn(async move {
            let mut first = true;
            loop {
                if !first {
                    tokio::select! {
                        biased;
                        _ = task_token.cancelled() => break,
                        _ = tokio::time::sleep(interval) => {}
                    }
                }
                first = false;

                if task_token.is_cancelled() {
                    break;
                }

                let update = match cursor.advance() {
                    Some(RevealStep::Partial(prefix)) => RevealUpdate::Progress {
                        handle: id,
                        revealed: prefix.to_string(),
                    },
                    Some(RevealStep::Done(text)) => RevealUpdate::Complete {
                        handle: id,
                        text: text.to_string(),
                    },
                    None => break,
                };

                let complete = matches!(update, RevealUpdate::Complete { .. });
                if tx.send(update).is_err() || complete {
                    break;
                }
            }
            trace!(handle = id, "reveal task finished");
        });

        (RevealHandle { id, token: token.clone() }, RevealStream { rx, token })
    }
}
