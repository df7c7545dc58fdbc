//! Messages to be uploaded with APPEND or REPLACE.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use crate::command::{quote, Command, LiteralData};
use crate::error::{Error, Result};
use crate::types::{Capability, Flag};

/// The raw bytes of a message, as they are sent in an APPEND literal.
///
/// [`len`](MessageSource::len) must be exact: the engine announces it in the literal prefix and
/// closes the session if [`write_to`](MessageSource::write_to) produces a different number of
/// bytes.
pub trait MessageSource: Send + Sync {
    /// The exact size of the message in bytes.
    fn len(&self) -> usize;

    /// Whether the message is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the whole message to `out`.
    fn write_to(&self, out: &mut dyn Write) -> io::Result<()>;

    /// Whether the message carries raw UTF-8 in its headers and so can only be uploaded with
    /// `UTF8=ACCEPT` active.
    fn requires_utf8(&self) -> bool {
        false
    }
}

/// Whether the header section (everything before the first empty line) has 8-bit bytes.
pub(crate) fn headers_require_utf8(message: &[u8]) -> bool {
    let end = message
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .or_else(|| message.windows(2).position(|w| w == b"\n\n"))
        .unwrap_or(message.len());
    !message[..end].is_ascii()
}

impl MessageSource for Vec<u8> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(self)
    }

    fn requires_utf8(&self) -> bool {
        headers_require_utf8(self)
    }
}

impl MessageSource for String {
    fn len(&self) -> usize {
        self.as_str().len()
    }

    fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(self.as_bytes())
    }

    fn requires_utf8(&self) -> bool {
        headers_require_utf8(self.as_bytes())
    }
}

impl MessageSource for &'static [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(self)
    }

    fn requires_utf8(&self) -> bool {
        headers_require_utf8(self)
    }
}

impl MessageSource for &'static str {
    fn len(&self) -> usize {
        str::len(self)
    }

    fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(self.as_bytes())
    }

    fn requires_utf8(&self) -> bool {
        headers_require_utf8(self.as_bytes())
    }
}

/// One message to upload, with the flags and internal date it should get.
///
/// The message itself is shared, so requests are cheap to clone and may be built on one thread
/// and sent from another.
///
/// ```
/// # use imap_session::{AppendRequest, Flag};
/// let request = AppendRequest::new("Subject: hi\r\n\r\nhello\r\n")
///     .flag(Flag::Seen)
///     .flag(Flag::Draft);
/// assert_eq!(request.len(), 22);
/// ```
#[derive(Clone)]
pub struct AppendRequest {
    message: Arc<dyn MessageSource>,
    flags: Vec<Flag>,
    internal_date: Option<DateTime<FixedOffset>>,
}

/// A request for [`crate::Session::replace`]; it carries the same data as an append.
pub type ReplaceRequest = AppendRequest;

impl AppendRequest {
    /// A request to upload `message` with no flags and the server's choice of internal date.
    pub fn new<M: MessageSource + 'static>(message: M) -> Self {
        Self::from_shared(Arc::new(message))
    }

    /// A request for a message that is already shared.
    pub fn from_shared(message: Arc<dyn MessageSource>) -> Self {
        AppendRequest {
            message,
            flags: Vec::new(),
            internal_date: None,
        }
    }

    /// Set a flag (system flag or keyword) on the uploaded message.
    pub fn flag(mut self, flag: Flag) -> Self {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
        self
    }

    /// Set several flags at once.
    pub fn flags(self, flags: impl IntoIterator<Item = Flag>) -> Self {
        flags.into_iter().fold(self, AppendRequest::flag)
    }

    /// Set the internal date of the uploaded message.
    pub fn internal_date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.internal_date = Some(date);
        self
    }

    /// The size of the message in bytes.
    pub fn len(&self) -> usize {
        self.message.len()
    }

    /// Whether the message is empty.
    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
    }

    /// Whether the message can only be uploaded with `UTF8=ACCEPT` active.
    pub fn requires_utf8(&self) -> bool {
        self.message.requires_utf8()
    }

    /// The flags that will be set.
    pub fn flag_list(&self) -> &[Flag] {
        &self.flags
    }

    /// Append the optional flag list, optional date and the message literal to `command`.
    pub(crate) fn render(&self, mut command: Command, utf8_active: bool) -> Result<Command> {
        let flags: Vec<String> = self
            .flags
            .iter()
            .filter(|f| f.is_storable())
            .map(|f| f.validate().map(|_| f.to_string()))
            .collect::<Result<_>>()?;
        if !flags.is_empty() {
            command = command.arg(format!("({})", flags.join(" ")));
        }
        if let Some(date) = &self.internal_date {
            command = command.arg(quote!(date.format("%d-%b-%Y %H:%M:%S %z").to_string()));
        }

        let data = LiteralData::Message(Arc::clone(&self.message));
        if self.message.requires_utf8() {
            if !utf8_active {
                return Err(Error::NotSupported(Capability::Utf8Accept));
            }
            Ok(command.arg("UTF8 (").literal_attached(data, true).raw(")"))
        } else {
            Ok(command.literal(data, false))
        }
    }
}

impl fmt::Debug for AppendRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppendRequest")
            .field("len", &self.message.len())
            .field("flags", &self.flags)
            .field("internal_date", &self.internal_date)
            .finish()
    }
}
