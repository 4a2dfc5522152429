//! Session-level error kinds.

use thiserror::Error;

/// Errors that terminate (or describe the end of) a session. The read loop
/// is the single point that gives up on non-recoverable errors; handlers may
/// absorb what their domain allows but must not mask framing or
/// state-machine problems.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The underlying stream failed.
    #[error("connection i/o failed")]
    Io(#[from] std::io::Error),

    /// Malformed wire data. The source chain carries the packet id and byte
    /// offset context added at the failure site.
    #[error("malformed wire data")]
    Decode(#[source] anyhow::Error),

    /// A bundle exceeded the packet limit.
    #[error("bundle exceeded {} packets", crate::client::MAX_BUNDLE_LEN)]
    BundleOverflow,

    /// The peer violated the session state machine.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A user handler failed; the session terminates.
    #[error("handler for packet {id:#04x} failed")]
    Handler {
        id: i32,
        #[source]
        cause: anyhow::Error,
    },

    /// Clean shutdown.
    #[error("connection closed")]
    ConnectionClosed,
}
