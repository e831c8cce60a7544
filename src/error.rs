// MIT License - Copyright (c) 2026 Peter Wright
// Error types

/// All errors that can occur while turning panel state into notifications.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to connect to {host}:{port}: {source}")]
    TransportConnect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("No reply within timeout during {stage}")]
    ProtocolTimeout { stage: &'static str },

    #[error("Server rejected {stage}: {reply}")]
    ProtocolRejection { stage: &'static str, reply: String },

    #[error("Malformed inbound message: {reason}")]
    MalformedInboundMessage { reason: String },

    #[error("Snapshot source buffer overflow")]
    BufferOverflow,

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transport not connected")]
    NotConnected,
}

impl NotifyError {
    /// Whether this error came from the network rather than from the peer's answer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NotifyError::Io(_)
                | NotifyError::TransportConnect { .. }
                | NotifyError::ProtocolTimeout { .. }
                | NotifyError::NotConnected
        )
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(NotifyError::ProtocolTimeout { stage: "greeting" }.is_retryable());
        assert!(NotifyError::NotConnected.is_retryable());
        assert!(
            !NotifyError::ProtocolRejection {
                stage: "RCPT TO",
                reply: "550 no such user".to_string()
            }
            .is_retryable()
        );
        assert!(!NotifyError::BufferOverflow.is_retryable());
    }

    #[test]
    fn test_display_includes_stage_and_reply() {
        let e = NotifyError::ProtocolRejection {
            stage: "RCPT TO",
            reply: "550 no such user".to_string(),
        };
        assert_eq!(e.to_string(), "Server rejected RCPT TO: 550 no such user");
    }
}
