//! Command construction.
//!
//! A [`Command`] is a list of text parts and literals. Rendering it against a tag and the
//! session's literal policy yields [`Segment`]s: each one is a run of text that ends either in a
//! literal prefix (`{n}`, `{n+}`, `~{n}`) or in the final CRLF. The engine writes segments in
//! order and only stops to wait for a continuation before a synchronizing literal.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use crate::error::{Error, Result, ValidateError};
use crate::message::MessageSource;

macro_rules! quote {
    ($x: expr) => {
        format!("\"{}\"", $x.replace(r"\", r"\\").replace("\"", "\\\""))
    };
}

pub(crate) use quote;

/// Quoted strings longer than this are sent as literals instead.
const MAX_QUOTED_LEN: usize = 1024;

/// Reject characters that cannot appear in any IMAP string.
pub(crate) fn validate_str(synopsis: &str, argument: &str, value: &str) -> Result<()> {
    match value.chars().find(|&c| matches!(c, '\r' | '\n' | '\0')) {
        Some(offending_char) => Err(Error::Validate(ValidateError {
            command_synopsis: synopsis.to_string(),
            argument: argument.to_string(),
            offending_char,
        })),
        None => Ok(()),
    }
}

fn needs_literal(value: &str, utf8: bool) -> bool {
    value.len() > MAX_QUOTED_LEN || (!utf8 && !value.is_ascii())
}

/// How literals are announced to the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LiteralPolicy {
    /// Every literal waits for a `+` continuation.
    Synchronizing,
    /// Literals up to `limit` bytes (or of any size, without a limit) are sent right away.
    NonSynchronizing { limit: Option<usize> },
}

impl LiteralPolicy {
    pub(crate) fn synchronizes(self, len: usize) -> bool {
        match self {
            LiteralPolicy::Synchronizing => true,
            LiteralPolicy::NonSynchronizing { limit: None } => false,
            LiteralPolicy::NonSynchronizing { limit: Some(limit) } => len > limit,
        }
    }
}

/// The payload of a literal.
#[derive(Clone)]
pub(crate) enum LiteralData {
    Bytes(Vec<u8>),
    Message(Arc<dyn MessageSource>),
}

impl LiteralData {
    pub(crate) fn len(&self) -> usize {
        match self {
            LiteralData::Bytes(b) => b.len(),
            LiteralData::Message(m) => m.len(),
        }
    }

    /// Write the payload, failing if it does not match the announced length.
    pub(crate) fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let announced = self.len();
        let mut counter = CountingWriter {
            inner: out,
            written: 0,
        };
        match self {
            LiteralData::Bytes(b) => counter.write_all(b)?,
            LiteralData::Message(m) => m.write_to(&mut counter)?,
        }
        if counter.written != announced {
            return Err(Error::LiteralMismatch {
                announced,
                written: counter.written,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for LiteralData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} bytes>", self.len())
    }
}

struct CountingWriter<'a, W: Write> {
    inner: &'a mut W,
    written: usize,
}

impl<W: Write> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[derive(Debug)]
enum Part {
    Text(String),
    Literal {
        data: LiteralData,
        binary: bool,
        spaced: bool,
    },
}

/// A literal waiting to be written after its segment's text.
#[derive(Debug)]
pub(crate) struct PendingLiteral {
    pub(crate) data: LiteralData,
    pub(crate) sync: bool,
}

/// One contiguous write: text, optionally followed by a literal.
#[derive(Debug)]
pub(crate) struct Segment {
    pub(crate) head: Vec<u8>,
    pub(crate) literal: Option<PendingLiteral>,
}

/// A command, before it has a tag.
#[derive(Debug)]
pub(crate) struct Command {
    name: &'static str,
    parts: Vec<Part>,
    sensitive: bool,
}

impl Command {
    pub(crate) fn new(name: &'static str) -> Self {
        Command {
            name,
            parts: vec![Part::Text(name.to_string())],
            sensitive: false,
        }
    }

    /// Append a space and `arg` verbatim.
    pub(crate) fn arg(mut self, arg: impl fmt::Display) -> Self {
        self.parts.push(Part::Text(format!(" {}", arg)));
        self
    }

    /// Append `text` verbatim, without a separating space.
    pub(crate) fn raw(mut self, text: &str) -> Self {
        self.parts.push(Part::Text(text.to_string()));
        self
    }

    /// Append a string argument, quoted when possible and as a literal otherwise.
    pub(crate) fn string(self, value: &str, utf8: bool) -> Self {
        if needs_literal(value, utf8) {
            self.literal(LiteralData::Bytes(value.as_bytes().to_vec()), false)
        } else {
            self.arg(quote!(value))
        }
    }

    /// Append a space and a literal.
    pub(crate) fn literal(mut self, data: LiteralData, binary: bool) -> Self {
        self.parts.push(Part::Literal {
            data,
            binary,
            spaced: true,
        });
        self
    }

    /// Append a literal directly after the previous part.
    pub(crate) fn literal_attached(mut self, data: LiteralData, binary: bool) -> Self {
        self.parts.push(Part::Literal {
            data,
            binary,
            spaced: false,
        });
        self
    }

    /// Keep the arguments out of the logs.
    pub(crate) fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    /// A one-line rendering for the logs.
    pub(crate) fn describe(&self, tag: &str) -> String {
        if self.sensitive {
            return format!("{} {} <redacted>", tag, self.name);
        }
        let mut line = format!("{} ", tag);
        for part in &self.parts {
            match part {
                Part::Text(t) => line.push_str(t),
                Part::Literal { data, spaced, .. } => {
                    if *spaced {
                        line.push(' ');
                    }
                    line.push_str(&format!("{{{} bytes}}", data.len()));
                }
            }
        }
        line
    }

    /// Split the command into segments for transmission.
    pub(crate) fn render(self, tag: &str, policy: LiteralPolicy) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut head = format!("{} ", tag).into_bytes();
        for part in self.parts {
            match part {
                Part::Text(t) => head.extend_from_slice(t.as_bytes()),
                Part::Literal {
                    data,
                    binary,
                    spaced,
                } => {
                    if spaced {
                        head.push(b' ');
                    }
                    if binary {
                        head.push(b'~');
                    }
                    let sync = policy.synchronizes(data.len());
                    let prefix = if sync {
                        format!("{{{}}}\r\n", data.len())
                    } else {
                        format!("{{{}+}}\r\n", data.len())
                    };
                    head.extend_from_slice(prefix.as_bytes());
                    segments.push(Segment {
                        head: std::mem::take(&mut head),
                        literal: Some(PendingLiteral { data, sync }),
                    });
                }
            }
        }
        head.extend_from_slice(b"\r\n");
        segments.push(Segment {
            head,
            literal: None,
        });
        segments
    }
}
