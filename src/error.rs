//! Error types for the courier client.

use thiserror::Error;

/// Result type alias for courier operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while exchanging messages with the controller.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration (unknown transform, authenticator, or
    /// protocol; malformed padding value or header line)
    #[error("configuration error: {0}")]
    Config(String),

    /// Building or re-parsing the bootstrap token failed
    #[error("token construction error: {0}")]
    JwtConstruction(String),

    /// Transport construction, dial, or I/O failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Server answered with a status that is neither 200 nor 401
    #[error("server returned status {0}")]
    Server(u16),

    /// Response was not an octet-stream or carried no data
    #[error("bad response: {0}")]
    BadResponse(String),

    /// A transform stage failed to construct or deconstruct a payload
    #[error("transform error: {0}")]
    Transform(String),

    /// Authentication protocol violation (unexpected message subtype,
    /// agent id mismatch, or PAKE library failure)
    #[error("authentication protocol error: {0}")]
    AuthProtocol(String),

    /// Operation is not supported by this transport
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Unknown key passed to the live reconfiguration surface
    #[error("unknown client setting: {0}")]
    UnknownSetting(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new token construction error
    pub fn jwt(msg: impl Into<String>) -> Self {
        Error::JwtConstruction(msg.into())
    }

    /// Create a new transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Error::Transport(msg.into())
    }

    /// Create a new bad-response error
    pub fn bad_response(msg: impl Into<String>) -> Self {
        Error::BadResponse(msg.into())
    }

    /// Create a new transform error
    pub fn transform(msg: impl Into<String>) -> Self {
        Error::Transform(msg.into())
    }

    /// Create a new authentication protocol error
    pub fn auth(msg: impl Into<String>) -> Self {
        Error::AuthProtocol(msg.into())
    }

    /// Check if this error came out of the transport layer
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Check if this error is a server status error
    pub fn is_server(&self) -> bool {
        matches!(self, Error::Server(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Server(503);
        assert_eq!(err.to_string(), "server returned status 503");

        let err = Error::config("unhandled transform type: rot13");
        assert_eq!(
            err.to_string(),
            "configuration error: unhandled transform type: rot13"
        );

        let err = Error::Unsupported("listen");
        assert_eq!(err.to_string(), "unsupported operation: listen");
    }

    #[test]
    fn test_error_predicates() {
        assert!(Error::transport("dial failed").is_transport());
        assert!(Error::Server(500).is_server());
        assert!(!Error::transform("bad data").is_transport());
    }
}
