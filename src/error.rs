//! Error types shared by the gateway and the chat controller.

/// Failure of a remote gateway call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// Timeout, refused connection, TLS failure
    #[error("network failure: {0}")]
    Network(String),

    #[error("server rejected request ({status}): {message}")]
    ServerRejected { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Message suitable for a notification: the server's own wording when it
    /// sent one, `fallback` otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            GatewayError::ServerRejected { message, .. } | GatewayError::Validation(message)
                if !message.trim().is_empty() =>
            {
                message.clone()
            }
            _ => fallback.to_string(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

/// Submission refused before anything reaches the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("message is empty")]
    Empty,

    #[error("a reply is still in progress")]
    Busy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = GatewayError::ServerRejected {
            status: 400,
            message: "Chat is closed".to_string(),
        };
        assert_eq!(err.user_message("Could not send message"), "Chat is closed");

        let err = GatewayError::ServerRejected {
            status: 500,
            message: "  ".to_string(),
        };
        assert_eq!(err.user_message("Could not send message"), "Could not send message");

        let err = GatewayError::Network("timed out".to_string());
        assert_eq!(err.user_message("Could not send message"), "Could not send message");
    }
}
