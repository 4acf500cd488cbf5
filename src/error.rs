use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::response::FtpResponse;

/// Enum containing all FTP errors the library uses
#[derive(Debug, Error)]
pub enum FtpError {
    /// An argument was rejected before anything was sent
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The session has no control connection
    #[error("invalid state: disconnected")]
    Disconnected,
    /// The server answered with a status code the operation does not accept
    #[error("unexpected reply: {}", .0.text())]
    UnexpectedResponse(FtpResponse),
    /// The server sent something that is not an FTP reply
    #[error("malformed reply: {0:?}")]
    InvalidResponseFormat(String),
    /// Socket creation, connect, bind, listen or I/O failed
    #[error("{context}: {}", describe_io(.source))]
    Connection {
        context: &'static str,
        #[source]
        source: io::Error,
    },
    /// A socket operation ran past the session timeout
    #[error("{0} timed out")]
    TimedOut(&'static str),
    /// The local side of a transfer could not be opened or written
    #[error("local file {}: {source}", .path.display())]
    LocalFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Coarse classification of [`FtpError`], one per failure domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpErrorKind {
    Caller,
    ConnectionState,
    Protocol,
    Transport,
    Timeout,
    Resource,
}

impl FtpError {
    pub fn kind(&self) -> FtpErrorKind {
        match self {
            FtpError::InvalidArgument(_) => FtpErrorKind::Caller,
            FtpError::Disconnected => FtpErrorKind::ConnectionState,
            FtpError::UnexpectedResponse(_) | FtpError::InvalidResponseFormat(_) => {
                FtpErrorKind::Protocol
            }
            FtpError::Connection { .. } => FtpErrorKind::Transport,
            FtpError::TimedOut(_) => FtpErrorKind::Timeout,
            FtpError::LocalFile { .. } => FtpErrorKind::Resource,
        }
    }

    /// Verbatim server text for protocol errors.
    pub fn server_message(&self) -> Option<String> {
        match self {
            FtpError::UnexpectedResponse(res) => Some(res.text()),
            _ => None,
        }
    }

    pub(crate) fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        FtpError::InvalidArgument(msg.into())
    }

    /// Socket errors caused by the read/write timeout become `TimedOut`.
    pub(crate) fn io(context: &'static str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => FtpError::TimedOut(context),
            _ => FtpError::Connection { context, source },
        }
    }

    pub(crate) fn local_file<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        FtpError::LocalFile {
            path: path.into(),
            source,
        }
    }
}

fn describe_io(e: &io::Error) -> String {
    match e.raw_os_error() {
        Some(code) => format!("[{}] {}", code, e),
        None => e.to_string(),
    }
}

pub type Result<T> = std::result::Result<T, FtpError>;
