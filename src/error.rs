use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Which stage of query processing the server reported an error from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// The client sent something the server could not make sense of.
    Client,
    /// The term failed to compile server-side.
    Compile,
    /// The term compiled but failed while running.
    Runtime,
}

impl core::fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Compile => write!(f, "compile"),
            Self::Runtime => write!(f, "runtime"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// DNS or TCP failure before the handshake. Nothing is in flight yet.
    #[error("Failed to connect: {0}")]
    Connect(#[source] std::io::Error),

    /// The server rejected or garbled the protocol handshake.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// SCRAM authentication failed: bad credentials, a malformed exchange,
    /// or a server signature that did not verify.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Socket failure after connect. Fatal to the connection; every
    /// in-flight waiter is drained with [`Error::Disconnected`].
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Delivered to each waiter when the connection dies underneath it.
    #[error("disconnected")]
    Disconnected,

    /// The server sent a response envelope we could not decode. Fatal,
    /// handled like an IO error.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A per-query error reported by the server. Not fatal; only the
    /// owning waiter sees it and the token is freed.
    #[error("Query {kind} error: {message}")]
    Query {
        kind: QueryErrorKind,
        message: String,
    },

    /// Operation attempted on a closed or errored connection.
    #[error("Connection is not connected")]
    NotConnected,

    /// A cursor continuation was fired twice.
    #[error("Cursor continuation already consumed")]
    ContinuationMisused,

    #[error("Bad config error: {0}")]
    BadConfig(String),

    #[error("A bug in zero-reql: {0}")]
    Bug(String),
}

impl From<core::convert::Infallible> for Error {
    fn from(err: core::convert::Infallible) -> Self {
        match err {}
    }
}
