use std::io;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single exchange on the device channel.
///
/// Every variant is recoverable by reconnecting; the channel never hands a
/// malformed sample to its caller.
#[derive(Error, Debug)]
pub enum ChannelFailure {
    #[error("I/O error on device session: {0}")]
    Io(#[from] io::Error),

    #[error("timed out after {timeout:?} waiting for {waiting_for:?}")]
    Timeout {
        waiting_for: String,
        timeout: Duration,
    },

    #[error("malformed device response: {response:?}")]
    Parse { response: String },

    #[error("no open device session")]
    NotConnected,
}

/// Custom error type for the reef monitor
#[derive(Error, Debug)]
pub enum ReefError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelFailure),

    #[error("Could not reconnect after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("Interrupted by shutdown request")]
    Interrupted,

    #[error("Measurement log write failed: {0}")]
    LogWrite(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Email error: {0}")]
    Email(String),
}

/// Result type alias for the reef monitor
pub type Result<T> = std::result::Result<T, ReefError>;

impl ReefError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        ReefError::Config(msg.into())
    }

    /// Create an authentication error
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        ReefError::Authentication(msg.into())
    }

    pub fn log_write<S: Into<String>>(msg: S) -> Self {
        ReefError::LogWrite(msg.into())
    }

    pub fn publish<S: Into<String>>(msg: S) -> Self {
        ReefError::Publish(msg.into())
    }

    pub fn email<S: Into<String>>(msg: S) -> Self {
        ReefError::Email(msg.into())
    }

    /// Fatal errors terminate the monitor instead of being isolated per cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReefError::Authentication(_)
                | ReefError::ReconnectExhausted { .. }
                | ReefError::Config(_)
        )
    }
}
