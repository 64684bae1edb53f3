use std::io::ErrorKind;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The peer sent a line longer than the configured maximum.
    #[error("line exceeds maximum length of {0} bytes")]
    LineTooLong(usize),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The connection was accepted but the protocol upgrade
    /// (e.g. the WebSocket handshake) did not complete.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// An inbound line carried a `\r` or `\n` before its end, e.g. a
    /// WebSocket frame holding several lines. Accepting it would let the
    /// sender smuggle extra lines to every other client.
    #[error("line contains an embedded terminator")]
    EmbeddedTerminator,
}

impl TransportError {
    /// Returns `true` if an accept loop should log this error, wait, and
    /// try again rather than stop.
    ///
    /// Only an unusable listener socket is terminal. A reset peer or a
    /// momentary file-descriptor shortage must not take the listener down.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::AcceptFailed(e) => !matches!(
                e.kind(),
                ErrorKind::NotConnected | ErrorKind::InvalidInput
            ),
            _ => true,
        }
    }
}
