use std::cmp::min;
use std::io::{Error, ErrorKind, Read, Result, Write};

use crate::client::{Connection, Session, DEFAULT_LITERAL_MINUS_LIMIT, DEFAULT_TAG_PREFIX};
use crate::folder::{FolderAccess, FolderId};
use crate::types::{Capabilities, FetchAttribute, Uid};

#[derive(Debug)]
pub struct MockStream {
    read_buf: Vec<u8>,
    read_pos: usize,
    pub written_buf: Vec<u8>,
    /// The bytes written between consecutive flushes.
    pub flushes: Vec<Vec<u8>>,
    flushed_pos: usize,
    err_on_read: bool,
    eof_on_read: bool,
    read_delay: usize,
}

impl Default for MockStream {
    fn default() -> Self {
        MockStream {
            read_buf: Vec::new(),
            read_pos: 0,
            written_buf: Vec::new(),
            flushes: Vec::new(),
            flushed_pos: 0,
            err_on_read: false,
            eof_on_read: false,
            read_delay: 0,
        }
    }
}

impl MockStream {
    pub fn new(read_buf: Vec<u8>) -> MockStream {
        MockStream::default().with_buf(read_buf)
    }

    pub fn with_buf(mut self, read_buf: Vec<u8>) -> MockStream {
        self.read_buf = read_buf;
        self
    }

    pub fn with_eof(mut self) -> MockStream {
        self.eof_on_read = true;
        self
    }

    pub fn with_err(mut self) -> MockStream {
        self.err_on_read = true;
        self
    }

    pub fn with_delay(mut self) -> MockStream {
        self.read_delay = 1;
        self
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.eof_on_read {
            return Ok(0);
        }
        if self.err_on_read {
            return Err(Error::new(ErrorKind::Other, "MockStream Error"));
        }
        if self.read_pos >= self.read_buf.len() {
            return Err(Error::new(ErrorKind::UnexpectedEof, "EOF"));
        }
        let mut write_len = min(buf.len(), self.read_buf.len() - self.read_pos);
        if self.read_delay > 0 {
            self.read_delay -= 1;
            write_len = min(write_len, 1);
        }
        let max_pos = self.read_pos + write_len;
        buf[..write_len].copy_from_slice(&self.read_buf[self.read_pos..max_pos]);
        self.read_pos += write_len;
        Ok(write_len)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.written_buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        if self.flushed_pos < self.written_buf.len() {
            self.flushes
                .push(self.written_buf[self.flushed_pos..].to_vec());
            self.flushed_pos = self.written_buf.len();
        }
        Ok(())
    }
}

/// A logged-in session with `capabilities`, reading `script`.
pub fn mock_session(capabilities: &[&str], script: &[u8]) -> Session<MockStream> {
    let mut conn = Connection::new(
        MockStream::new(script.to_vec()),
        DEFAULT_TAG_PREFIX.to_string(),
        DEFAULT_LITERAL_MINUS_LIMIT,
    );
    conn.capabilities = Capabilities::from_atoms(capabilities);
    Session::new(conn)
}

/// Put `name` in the selected state with `count` messages, without talking to the server. The
/// first messages get `uids`, in order.
pub fn mock_open(
    session: &mut Session<MockStream>,
    name: &str,
    count: u32,
    uids: &[Uid],
) -> FolderId {
    let id = session.folders.get_or_create(name);
    let folder = session.folders.get_mut(id);
    folder.begin_open();
    folder.apply_exists(count);
    for (i, uid) in uids.iter().enumerate() {
        folder.apply_fetch(i as u32 + 1, &[FetchAttribute::Uid(*uid)]);
    }
    folder.flush_notifications();
    folder.open(FolderAccess::ReadWrite);
    session.selected = Some(id);
    id
}
