/// Intents the view sends into the chat controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatIntent {
    /// Send a message in the active chat, creating one if needed
    Submit(String),

    /// Make an existing chat active
    OpenChat(String),

    /// Clear the active chat; the next submit starts a new one
    StartNewChat,

    /// Reload the chat list
    RefreshChats,

    /// Finish a consultation
    CloseChat(String),
}

/// Side effects the controller asks the view to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    /// The message log changed; keep its end in view
    ScrollToBottom,
}
