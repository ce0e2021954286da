use thiserror::Error;

/// Fatal to a single worker session, never to the whole process: every
/// variant here ends the thread serving one connection, logs, and drops
/// that session's [`crate::session::SessionFiles`].
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("malformed request from client: {0}")]
    Protocol(#[from] netfs_protocol::ProtocolError),

    #[error("listener setup failed: {0}")]
    Bind(#[source] std::io::Error),
}

pub type AgentResult<T> = Result<T, AgentError>;
