//! IMAP error types.

use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;
use std::result;

use bufstream::IntoInnerError as BufError;

use crate::types::{Capability, ResponseCode};

/// A convenience wrapper around `Result` for `imap_session::Error`.
pub type Result<T> = result::Result<T, Error>;

/// A BAD response from the server, which indicates an error message from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Bad {
    /// Human-redable message included with the Bad response.
    pub information: String,
    /// A more specific error status code included with the Bad response.
    pub code: Option<ResponseCode>,
}

impl fmt::Display for Bad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.information)
    }
}

/// A NO response from the server, which indicates an operational error message from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct No {
    /// Human-redable message included with the NO response.
    pub information: String,
    /// A more specific error status code included with the NO response.
    pub code: Option<ResponseCode>,
}

impl fmt::Display for No {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.information)
    }
}

/// A BYE response from the server, which indicates it is going to hang up on us.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Bye {
    /// Human-redable message included with the response.
    pub information: String,
    /// A more specific error status code included with the response.
    pub code: Option<ResponseCode>,
}

impl fmt::Display for Bye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.information)
    }
}

/// The broad class an [`Error`] belongs to.
///
/// `Transport` and `Protocol` errors are fatal: the session is closed and every later call
/// returns [`Error::ConnectionLost`]. The other kinds leave the session usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The underlying stream failed or was closed.
    Transport,
    /// The server said something we could not make sense of, or broke the protocol.
    Protocol,
    /// The server rejected a command with `NO` or `BAD`.
    Command,
    /// The operation needs a capability that is not enabled for this session.
    NotSupported,
    /// The caller passed something that cannot be sent, or the session is in the wrong state.
    Argument,
}

/// A set of errors that can occur in the IMAP client
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// An `io::Error` that occurred while trying to read or write to a network stream.
    Io(IoError),
    /// A BAD response from the IMAP server.
    Bad(Bad),
    /// A NO response from the IMAP server.
    No(No),
    /// The server sent BYE and hung up, or is about to.
    Bye(Bye),
    /// The connection was terminated unexpectedly, or an earlier fatal error closed the session.
    ConnectionLost,
    /// Error parsing a server response.
    Parse(ParseError),
    /// Command inputs were not valid [IMAP
    /// strings](https://tools.ietf.org/html/rfc3501#section-4.3).
    Validate(ValidateError),
    /// The server completed a command other than the oldest one still outstanding.
    TagMismatch(TagMismatch),
    /// A message source produced a different number of bytes than it announced.
    LiteralMismatch {
        /// The length announced in the literal prefix.
        announced: usize,
        /// The number of bytes actually written.
        written: usize,
    },
    /// The operation needs a capability that is absent or was disabled.
    NotSupported(Capability),
    /// No folder by this name exists on the server.
    FolderNotFound(String),
    /// The operation needs this folder to be the selected folder.
    FolderNotOpen(String),
    /// The folder is selected, but only for reading.
    ReadOnly(String),
    /// A message exceeds the append limit of its destination.
    TooBig {
        /// The size of the rejected message.
        size: u64,
        /// The advertised limit.
        limit: u64,
    },
    /// Another caller is currently using the session.
    Busy,
    /// An argument that the session refuses to send.
    Argument(String),
}

impl Error {
    /// The broad class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::ConnectionLost => ErrorKind::Transport,
            Error::Bye(_)
            | Error::Parse(_)
            | Error::TagMismatch(_)
            | Error::LiteralMismatch { .. } => ErrorKind::Protocol,
            Error::Bad(_) | Error::No(_) | Error::FolderNotFound(_) => ErrorKind::Command,
            Error::NotSupported(_) => ErrorKind::NotSupported,
            Error::Validate(_)
            | Error::FolderNotOpen(_)
            | Error::ReadOnly(_)
            | Error::TooBig { .. }
            | Error::Busy
            | Error::Argument(_) => ErrorKind::Argument,
        }
    }

    /// Whether this error ended the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Protocol)
    }

    /// The response code carried by a `NO`, `BAD` or `BYE`, if any.
    pub fn code(&self) -> Option<&ResponseCode> {
        match self {
            Error::Bad(b) => b.code.as_ref(),
            Error::No(n) => n.code.as_ref(),
            Error::Bye(b) => b.code.as_ref(),
            _ => None,
        }
    }
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Error {
        Error::Io(err)
    }
}

impl<T> From<BufError<T>> for Error {
    fn from(err: BufError<T>) -> Error {
        Error::Io(err.into())
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<ValidateError> for Error {
    fn from(err: ValidateError) -> Error {
        Error::Validate(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Io(ref e) => fmt::Display::fmt(e, f),
            Error::Validate(ref e) => fmt::Display::fmt(e, f),
            Error::Parse(ref e) => fmt::Display::fmt(e, f),
            Error::TagMismatch(ref e) => fmt::Display::fmt(e, f),
            Error::No(ref data) => write!(f, "No Response: {}", data),
            Error::Bad(ref data) => write!(f, "Bad Response: {}", data),
            Error::Bye(ref data) => write!(f, "Bye Response: {}", data),
            Error::ConnectionLost => f.write_str("Connection Lost"),
            Error::LiteralMismatch { announced, written } => write!(
                f,
                "Literal announced {} bytes but {} were written",
                announced, written
            ),
            Error::NotSupported(cap) => write!(f, "Server does not support {}", cap),
            Error::FolderNotFound(ref name) => write!(f, "Folder not found: {}", name),
            Error::FolderNotOpen(ref name) => write!(f, "Folder not open: {}", name),
            Error::ReadOnly(ref name) => write!(f, "Folder is open read-only: {}", name),
            Error::TooBig { size, limit } => write!(
                f,
                "Message of {} bytes exceeds the append limit of {} bytes",
                size, limit
            ),
            Error::Busy => f.write_str("Session is in use by another caller"),
            Error::Argument(ref msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Io(ref e) => Some(e),
            Error::Parse(ref e) => Some(e),
            Error::Validate(ref e) => Some(e),
            _ => None,
        }
    }
}

/// An error occured while trying to parse a server response.
#[derive(Debug)]
#[non_exhaustive]
pub enum ParseError {
    /// Indicates an error parsing the status response. Such as OK, NO, and BAD.
    Invalid(Vec<u8>),
    /// The client received a response that was valid, but not one it expected at this point.
    Unexpected(String),
    /// The client could not find or decode the server's authentication challenge.
    Authentication(String, Option<base64::DecodeError>),
    /// A literal announced a length we refuse to buffer.
    LiteralTooLarge(usize),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ParseError::Invalid(_) => f.write_str("Unable to parse status response"),
            ParseError::Unexpected(_) => f.write_str("Encountered unexpected parse response"),
            ParseError::Authentication(_, _) => {
                f.write_str("Unable to parse authentication response")
            }
            ParseError::LiteralTooLarge(len) => {
                write!(f, "Server announced a literal of {} bytes", len)
            }
        }
    }
}

impl StdError for ParseError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            ParseError::Authentication(_, Some(ref e)) => Some(e),
            _ => None,
        }
    }
}

/// An [invalid character](https://tools.ietf.org/html/rfc3501#section-4.3) was found in a command
/// argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateError {
    /// the synopsis of the invalid command
    pub(crate) command_synopsis: String,
    /// the name of the invalid argument
    pub(crate) argument: String,
    /// the invalid character contained in the argument
    pub(crate) offending_char: char,
}

impl ValidateError {
    /// The character that could not be sent.
    pub fn offending_char(&self) -> char {
        self.offending_char
    }
}

impl fmt::Display for ValidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // print character in debug form because invalid ones are often whitespaces
        write!(
            f,
            "Invalid character {:?} in argument '{}' of command '{}'",
            self.offending_char, self.argument, self.command_synopsis
        )
    }
}

impl StdError for ValidateError {}

/// The server completed a command out of order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMismatch {
    /// The tag of the oldest outstanding command, if there was one.
    pub expected: Option<String>,
    /// The tag the server completed.
    pub found: String,
}

impl fmt::Display for TagMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expected {
            Some(ref expected) => write!(
                f,
                "Server completed {} while {} was outstanding",
                self.found, expected
            ),
            None => write!(f, "Server completed unknown command {}", self.found),
        }
    }
}

impl StdError for TagMismatch {}
