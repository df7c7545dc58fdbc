use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, Read, Write};
use std::ops::{Deref, DerefMut};
use std::sync::mpsc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bufstream::BufStream;
use enumset::EnumSet;
use lazy_static::lazy_static;
use regex::bytes::Regex;

use super::authenticator::Authenticator;
use super::command::{validate_str, Command, LiteralData, LiteralPolicy, Segment};
use super::error::{Bad, Bye, Error, No, ParseError, Result, TagMismatch};
use super::folder::{normalize, Folder, FolderAccess, FolderEvent, FolderId, FolderStore};
use super::parse::parse_response;
use super::strategy::{self, Operation, Path};
use super::types::*;
use super::utf7;
use super::utils::iter_join;

const LF: u8 = 0x0a;

pub(crate) const DEFAULT_TAG_PREFIX: &str = "A";
pub(crate) const DEFAULT_LITERAL_MINUS_LIMIT: usize = 4096;

/// Server literals larger than this end the session rather than being buffered.
const MAX_RESPONSE_LITERAL: usize = 64 * 1024 * 1024;

/// Selected with `EXAMINE` to leave the selected state without `UNSELECT`.
const UNSELECT_PLACEHOLDER: &str = "imap-session-unselect-placeholder";

lazy_static! {
    static ref LITERAL_AT_EOL: Regex = Regex::new(r"\{(\d+)\}\r?\n$").unwrap();
}

macro_rules! ok_or_unauth_client_err {
    ($r:expr, $self:expr) => {
        match $r {
            Ok(o) => o,
            Err(e) => return Err((e, $self)),
        }
    };
}

/// A command that has been tagged and queued, possibly not yet fully written.
#[derive(Debug)]
struct PendingCommand {
    tag: String,
    name: &'static str,
    segments: VecDeque<Segment>,
    data: Vec<Untagged>,
}

/// The tagged result of a command, with the untagged data that arrived while it was the oldest
/// outstanding command.
#[derive(Debug)]
pub(crate) struct Completion {
    pub(crate) tag: String,
    pub(crate) name: &'static str,
    pub(crate) status: Status,
    pub(crate) code: Option<ResponseCode>,
    pub(crate) text: String,
    pub(crate) data: Vec<Untagged>,
}

impl Completion {
    /// Turn `NO` and `BAD` into errors.
    pub(crate) fn into_result(self) -> Result<Completion> {
        match self.status {
            Status::Ok => Ok(self),
            Status::No => Err(Error::No(No {
                information: self.text,
                code: self.code,
            })),
            Status::Bad => Err(Error::Bad(Bad {
                information: self.text,
                code: self.code,
            })),
            status => Err(Error::Parse(ParseError::Unexpected(format!(
                "{} completed with {:?}",
                self.name, status
            )))),
        }
    }

    /// Response codes from untagged `OK` lines, then the tagged one.
    pub(crate) fn codes(&self) -> impl Iterator<Item = &ResponseCode> {
        self.data
            .iter()
            .filter_map(|u| match u {
                Untagged::Condition {
                    status: Status::Ok,
                    code: Some(code),
                    ..
                } => Some(code),
                _ => None,
            })
            .chain(self.code.iter())
    }

    pub(crate) fn has_code(&self, wanted: &ResponseCode) -> bool {
        self.codes().any(|c| c == wanted)
    }

    pub(crate) fn copy_uid(&self) -> Option<UidMapping> {
        self.codes().find_map(|c| match c {
            ResponseCode::CopyUid {
                uid_validity,
                source,
                destination,
            } => Some(UidMapping::new(
                *uid_validity,
                source.clone(),
                destination.clone(),
            )),
            _ => None,
        })
    }

    pub(crate) fn append_uid(&self) -> Option<Appended> {
        self.codes().find_map(|c| match c {
            ResponseCode::AppendUid { uid_validity, uids } => Some(Appended {
                uid_validity: Some(*uid_validity),
                uids: uids.clone(),
            }),
            _ => None,
        })
    }

    pub(crate) fn modified(&self) -> UidSet {
        self.codes()
            .find_map(|c| match c {
                ResponseCode::Modified(set) => Some(set.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub(crate) fn search_results(&self) -> impl Iterator<Item = u32> + '_ {
        self.data.iter().flat_map(|u| match u {
            Untagged::Search { ids, .. } => ids.as_slice(),
            _ => &[][..],
        }).copied()
    }

    pub(crate) fn fetches(&self) -> impl Iterator<Item = MessageSummary> + '_ {
        self.data.iter().filter_map(|u| match u {
            Untagged::Fetch { seq, attributes } => {
                Some(MessageSummary::from_attributes(*seq, attributes))
            }
            _ => None,
        })
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &Name> {
        self.data.iter().filter_map(|u| match u {
            Untagged::List(name) => Some(name),
            _ => None,
        })
    }

    pub(crate) fn deleted(&self) -> Deleted {
        let mut expunged = Vec::new();
        let mut vanished = UidSet::new();
        for u in &self.data {
            match u {
                Untagged::Expunge(seq) => expunged.push(*seq),
                Untagged::Vanished {
                    earlier: false,
                    uids,
                } => vanished.extend(uids.iter()),
                _ => {}
            }
        }
        let mod_seq = self.codes().find_map(|c| match c {
            ResponseCode::HighestModSeq(m) => Some(*m),
            _ => None,
        });
        Deleted::new(expunged, vanished, mod_seq)
    }
}

/// The engine shared by [`Client`] and [`Session`]: tags commands, writes them (pausing for
/// continuations before synchronizing literals), reads responses, and applies untagged data to
/// the folder state.
#[derive(Debug)]
pub struct Connection<T: Read + Write> {
    pub(crate) stream: BufStream<T>,
    tag: u32,
    tag_prefix: String,
    literal_minus_limit: usize,
    pub(crate) capabilities: Capabilities,
    pending: VecDeque<PendingCommand>,
    completed: HashMap<String, Completion>,
    awaiting_continuation: Option<(String, LiteralData)>,
    pub(crate) folders: FolderStore,
    pub(crate) selected: Option<FolderId>,
    namespaces: Option<Namespaces>,
    bye: Option<Bye>,
    closed: bool,
}

impl<T: Read + Write> Connection<T> {
    pub(crate) fn new(stream: T, tag_prefix: String, literal_minus_limit: usize) -> Self {
        Connection {
            stream: BufStream::new(stream),
            tag: 0,
            tag_prefix,
            literal_minus_limit,
            capabilities: Capabilities::default(),
            pending: VecDeque::new(),
            completed: HashMap::new(),
            awaiting_continuation: None,
            folders: FolderStore::default(),
            selected: None,
            namespaces: None,
            bye: None,
            closed: false,
        }
    }

    /// The capabilities the server advertised, less any that were disabled.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Whether the session has ended, through `LOGOUT` or a fatal error.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn ensure_usable(&self) -> Result<()> {
        if self.closed {
            Err(Error::ConnectionLost)
        } else {
            Ok(())
        }
    }

    pub(crate) fn require(&self, cap: Capability) -> Result<()> {
        if self.capabilities.has(cap) {
            Ok(())
        } else {
            Err(Error::NotSupported(cap))
        }
    }

    pub(crate) fn utf8_active(&self) -> bool {
        self.capabilities.is_active(Capability::Utf8Accept)
    }

    pub(crate) fn encode_name(&self, name: &str) -> String {
        if self.utf8_active() {
            name.to_string()
        } else {
            utf7::encode(name).into_owned()
        }
    }

    fn decode_name(&self, raw: &str) -> String {
        if self.utf8_active() {
            raw.to_string()
        } else {
            utf7::decode(raw).into_owned()
        }
    }

    fn next_tag(&mut self) -> String {
        self.tag += 1;
        format!("{}{:08}", self.tag_prefix, self.tag)
    }

    fn literal_policy(&self) -> LiteralPolicy {
        let caps = self.capabilities.enabled();
        if caps.contains(Capability::LiteralPlus) {
            LiteralPolicy::NonSynchronizing { limit: None }
        } else if caps.contains(Capability::LiteralMinus) || caps.contains(Capability::Imap4rev2)
        {
            LiteralPolicy::NonSynchronizing {
                limit: Some(self.literal_minus_limit),
            }
        } else {
            LiteralPolicy::Synchronizing
        }
    }

    /// Tag and queue `command`, and write as much of it as can be written without a
    /// continuation. Returns the tag.
    pub(crate) fn submit(&mut self, command: Command) -> Result<String> {
        self.ensure_usable()?;
        let tag = self.next_tag();
        log::trace!("C: {}", command.describe(&tag));
        let name = command.name();
        let segments = command.render(&tag, self.literal_policy());
        self.pending.push_back(PendingCommand {
            tag: tag.clone(),
            name,
            segments: segments.into(),
            data: Vec::new(),
        });
        let written = self.transmit();
        self.settle(written)?;
        Ok(tag)
    }

    /// Write queued segments in order until done or until a synchronizing literal must wait.
    fn transmit(&mut self) -> Result<()> {
        if self.awaiting_continuation.is_some() {
            return Ok(());
        }
        for command in self.pending.iter_mut() {
            while let Some(segment) = command.segments.pop_front() {
                self.stream.write_all(&segment.head)?;
                match segment.literal {
                    Some(literal) if literal.sync => {
                        self.stream.flush()?;
                        self.awaiting_continuation = Some((command.tag.clone(), literal.data));
                        return Ok(());
                    }
                    Some(literal) => literal.data.write_to(&mut self.stream)?,
                    None => {}
                }
            }
        }
        self.stream.flush()?;
        Ok(())
    }

    /// Read and process one response. Returns the text of a continuation request that no
    /// literal was waiting for.
    fn step(&mut self) -> Result<Option<String>> {
        let raw = self.read_response_bytes()?;
        match parse_response(&raw)? {
            Response::Continue { text, .. } => match self.awaiting_continuation.take() {
                Some((_, data)) => {
                    data.write_to(&mut self.stream)?;
                    self.transmit()?;
                    Ok(None)
                }
                None => Ok(Some(text)),
            },
            Response::Tagged {
                tag,
                status,
                code,
                text,
            } => {
                self.complete(tag, status, code, text)?;
                Ok(None)
            }
            Response::Untagged(untagged) => {
                self.dispatch(untagged);
                Ok(None)
            }
        }
    }

    fn complete(
        &mut self,
        tag: String,
        status: Status,
        code: Option<ResponseCode>,
        text: String,
    ) -> Result<()> {
        let command = match self.pending.pop_front() {
            Some(command) if command.tag == tag => command,
            other => {
                return Err(Error::TagMismatch(TagMismatch {
                    expected: other.map(|c| c.tag),
                    found: tag,
                }))
            }
        };
        if matches!(&self.awaiting_continuation, Some((waiting, _)) if *waiting == tag) {
            log::debug!("{} {} rejected before its literal was sent", tag, command.name);
            self.awaiting_continuation = None;
            self.transmit()?;
        }
        if let Some(ResponseCode::Capabilities(caps)) = &code {
            self.capabilities.refresh(caps);
        }
        self.folders.flush_notifications();
        self.completed.insert(
            tag.clone(),
            Completion {
                tag,
                name: command.name,
                status,
                code,
                text,
                data: command.data,
            },
        );
        Ok(())
    }

    fn selected_folder(&mut self) -> Option<&mut Folder> {
        let id = self.selected?;
        Some(self.folders.get_mut(id))
    }

    /// Apply untagged data to the session and folder state, then hand it to the oldest
    /// outstanding command.
    fn dispatch(&mut self, untagged: Untagged) {
        let untagged = match untagged {
            Untagged::List(mut name) => {
                name.name = self.decode_name(&name.name);
                name.old_name = name.old_name.map(|old| self.decode_name(&old));
                Untagged::List(name)
            }
            Untagged::Status { mailbox, items } => Untagged::Status {
                mailbox: self.decode_name(&mailbox),
                items,
            },
            Untagged::Namespace(mut namespaces) => {
                for ns in namespaces
                    .personal
                    .iter_mut()
                    .chain(namespaces.other_users.iter_mut())
                    .chain(namespaces.shared.iter_mut())
                {
                    ns.prefix = self.decode_name(&ns.prefix);
                }
                Untagged::Namespace(namespaces)
            }
            other => other,
        };

        match &untagged {
            Untagged::Condition {
                status: Status::Bye,
                code,
                text,
                ..
            } => {
                log::debug!("server said BYE: {}", text);
                self.bye = Some(Bye {
                    information: text.clone(),
                    code: code.clone(),
                });
            }
            Untagged::Condition {
                status: Status::Ok,
                code: Some(code),
                bare,
                ..
            } => {
                if *bare {
                    log::warn!("response code without status word: {:?}", code);
                }
                match code {
                    ResponseCode::Capabilities(caps) => self.capabilities.refresh(caps),
                    code => {
                        if let Some(folder) = self.selected_folder() {
                            folder.apply_code(code);
                        }
                    }
                }
            }
            Untagged::Condition {
                status: Status::No | Status::Bad,
                text,
                ..
            } => log::debug!("untagged warning: {}", text),
            Untagged::Capabilities(caps) => self.capabilities.refresh(caps),
            Untagged::Enabled(caps) => {
                let now = self.capabilities.activate_atoms(caps);
                log::debug!("enabled {:?}", now);
            }
            Untagged::Flags(flags) => {
                if let Some(folder) = self.selected_folder() {
                    folder.apply_flags(flags.clone());
                }
            }
            Untagged::List(name) => {
                let id = self.folders.get_or_create(name.name());
                self.folders.get_mut(id).apply_list(name);
            }
            Untagged::Status { mailbox, items } => {
                let id = self.folders.get_or_create(mailbox);
                self.folders.get_mut(id).apply_status(items);
            }
            Untagged::Namespace(namespaces) => self.namespaces = Some(namespaces.clone()),
            Untagged::Exists(n) => {
                if let Some(folder) = self.selected_folder() {
                    folder.apply_exists(*n);
                }
            }
            Untagged::Recent(n) => {
                if let Some(folder) = self.selected_folder() {
                    folder.apply_recent(*n);
                }
            }
            Untagged::Expunge(seq) => {
                if let Some(folder) = self.selected_folder() {
                    folder.apply_expunge(*seq);
                }
            }
            Untagged::Vanished { earlier, uids } => {
                if let Some(folder) = self.selected_folder() {
                    folder.apply_vanished(uids.clone(), *earlier);
                }
            }
            Untagged::Fetch { seq, attributes } => {
                if let Some(folder) = self.selected_folder() {
                    folder.apply_fetch(*seq, attributes);
                }
            }
            Untagged::Other(line) => log::debug!("ignoring {}", line),
            _ => {}
        }

        match self.pending.front_mut() {
            Some(command) => command.data.push(untagged),
            None => self.folders.flush_notifications(),
        }
    }

    /// Read one complete response: a line, plus any literals it announces and the lines that
    /// continue it.
    fn read_response_bytes(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        loop {
            let line_start = data.len();
            self.readline(&mut data)?;
            let announced = LITERAL_AT_EOL.captures(&data[line_start..]).map(|caps| {
                std::str::from_utf8(&caps[1])
                    .ok()
                    .and_then(|n| n.parse::<usize>().ok())
            });
            let len = match announced {
                None => return Ok(data),
                Some(Some(len)) if len <= MAX_RESPONSE_LITERAL => len,
                Some(Some(len)) => return Err(Error::Parse(ParseError::LiteralTooLarge(len))),
                Some(None) => return Err(Error::Parse(ParseError::Invalid(data))),
            };
            let at = data.len();
            data.resize(at + len, 0);
            self.stream.read_exact(&mut data[at..])?;
        }
    }

    fn readline(&mut self, into: &mut Vec<u8>) -> Result<usize> {
        let read = self.stream.read_until(LF, into)?;
        if read == 0 || into.last() != Some(&LF) {
            return Err(Error::ConnectionLost);
        }

        let line = &into[into.len() - read..];
        let line = line.strip_suffix(b"\r\n").unwrap_or(&line[..line.len() - 1]);
        log::trace!("S: {}", String::from_utf8_lossy(line));

        Ok(read)
    }

    /// Pass `result` through, closing the session first if it is a fatal error.
    pub(crate) fn settle<R>(&mut self, result: Result<R>) -> Result<R> {
        match result {
            Err(e) if e.is_fatal() => Err(self.shutdown(e)),
            other => other,
        }
    }

    fn shutdown(&mut self, err: Error) -> Error {
        if !self.closed {
            log::debug!("closing session: {}", err);
        }
        self.closed = true;
        self.pending.clear();
        self.completed.clear();
        self.awaiting_continuation = None;
        if let Some(id) = self.selected.take() {
            self.folders.get_mut(id).close();
        }
        self.folders.flush_notifications();
        match (err, self.bye.take()) {
            (Error::ConnectionLost, Some(bye)) | (Error::Io(_), Some(bye)) => Error::Bye(bye),
            (err, _) => err,
        }
    }

    /// Process responses until the command tagged `tag` completes.
    pub(crate) fn wait_for(&mut self, tag: &str) -> Result<Completion> {
        let result = self.wait_inner(tag);
        self.settle(result)
    }

    fn wait_inner(&mut self, tag: &str) -> Result<Completion> {
        self.ensure_usable()?;
        loop {
            if let Some(done) = self.completed.remove(tag) {
                return Ok(done);
            }
            if !self.pending.iter().any(|p| p.tag == tag) {
                return Err(Error::Parse(ParseError::Unexpected(format!(
                    "no outstanding command {}",
                    tag
                ))));
            }
            if let Some(text) = self.step()? {
                return Err(Error::Parse(ParseError::Unexpected(format!(
                    "continuation request: {}",
                    text
                ))));
            }
        }
    }

    /// Run one command to completion; `NO` and `BAD` become errors.
    pub(crate) fn run(&mut self, command: Command) -> Result<Completion> {
        let tag = self.submit(command)?;
        self.wait_for(&tag)?.into_result()
    }

    /// Send every command before reading any response. Each command gets its own result; only a
    /// fatal error fails the whole batch.
    pub(crate) fn run_pipelined(&mut self, commands: Vec<Command>) -> Result<Vec<Result<Completion>>> {
        let mut tags = Vec::with_capacity(commands.len());
        for command in commands {
            tags.push(self.submit(command)?);
        }
        let mut results = Vec::with_capacity(tags.len());
        for tag in tags {
            results.push(self.wait_for(&tag)?.into_result());
        }
        Ok(results)
    }
}

/// An authenticated IMAP session providing the usual IMAP commands. This type is what you get from
/// a succesful login attempt.
///
/// Note that the server *is* allowed to unilaterally send things to the client for messages in
/// a selected mailbox whose status has changed. Those updates are applied to the [`Folder`]s of
/// the session and reported to anyone [watching](Session::watch) them.
#[derive(Debug)]
pub struct Session<T: Read + Write> {
    conn: Connection<T>,
}

/// An (unauthenticated) handle to talk to an IMAP server. This is what you get when first
/// connecting. A succesfull call to [`Client::login`] or [`Client::authenticate`] will return a
/// [`Session`] instance that provides the usual IMAP methods.
#[derive(Debug)]
pub struct Client<T: Read + Write> {
    conn: Connection<T>,
}

/// The state the server greeted us with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Greeting {
    /// `* OK`: log in next.
    Ok,
    /// `* PREAUTH`: already authenticated.
    PreAuth,
}

// `Deref` instances are so we can make use of the same underlying primitives in `Client` and
// `Session`
impl<T: Read + Write> Deref for Client<T> {
    type Target = Connection<T>;

    fn deref(&self) -> &Connection<T> {
        &self.conn
    }
}

impl<T: Read + Write> DerefMut for Client<T> {
    fn deref_mut(&mut self) -> &mut Connection<T> {
        &mut self.conn
    }
}

impl<T: Read + Write> Deref for Session<T> {
    type Target = Connection<T>;

    fn deref(&self) -> &Connection<T> {
        &self.conn
    }
}

impl<T: Read + Write> DerefMut for Session<T> {
    fn deref_mut(&mut self) -> &mut Connection<T> {
        &mut self.conn
    }
}

impl<T: Read + Write> Client<T> {
    /// Creates a new client over the given stream, with default settings.
    ///
    /// This method primarily exists for writing tests that mock the underlying transport, but can
    /// also be used to support IMAP over custom tunnels. See [`crate::ClientBuilder`] for the
    /// configurable version.
    ///
    /// **Note:** In case you do need to use `Client::new` over `ClientBuilder`, you will need to
    /// read the greeting yourself with [`Client::read_greeting`] before logging in.
    pub fn new(stream: T) -> Client<T> {
        Client::from_connection(Connection::new(
            stream,
            DEFAULT_TAG_PREFIX.to_string(),
            DEFAULT_LITERAL_MINUS_LIMIT,
        ))
    }

    pub(crate) fn from_connection(conn: Connection<T>) -> Client<T> {
        Client { conn }
    }

    /// Read the server greeting, picking up a `[CAPABILITY ...]` code if there is one.
    pub fn read_greeting(&mut self) -> Result<Greeting> {
        let greeting = self.greeting_inner();
        self.settle(greeting)
    }

    fn greeting_inner(&mut self) -> Result<Greeting> {
        self.ensure_usable()?;
        let raw = self.read_response_bytes()?;
        match parse_response(&raw)? {
            Response::Untagged(Untagged::Condition {
                status, code, text, ..
            }) => {
                if let Some(ResponseCode::Capabilities(caps)) = &code {
                    self.capabilities.refresh(caps);
                }
                match status {
                    Status::Ok => Ok(Greeting::Ok),
                    Status::PreAuth => Ok(Greeting::PreAuth),
                    Status::Bye => Err(Error::Bye(Bye {
                        information: text,
                        code,
                    })),
                    _ => Err(Error::Parse(ParseError::Unexpected(text))),
                }
            }
            _ => Err(Error::Parse(ParseError::Invalid(raw))),
        }
    }

    /// Use the greeting's `PREAUTH` without logging in.
    pub fn preauthenticated(mut self) -> ::std::result::Result<Session<T>, (Error, Client<T>)> {
        if self.capabilities.is_empty() {
            ok_or_unauth_client_err!(self.refresh_capabilities(), self);
        }
        Ok(Session::new(self.conn))
    }

    fn refresh_capabilities(&mut self) -> Result<()> {
        self.run(Command::new("CAPABILITY")).map(|_| ())
    }

    /// Log in to the IMAP server. Upon success a [`Session`](struct.Session.html) instance is
    /// returned; on error the original `Client` instance is returned in addition to the error.
    /// This is because `login` takes ownership of `self`, so in order to try again (e.g. after
    /// prompting the user for credetials), ownership of the original `Client` needs to be
    /// transferred back to the caller.
    ///
    /// Capabilities are refreshed afterwards, from the tagged `[CAPABILITY ...]` code when the
    /// server sends one and with an explicit `CAPABILITY` otherwise.
    pub fn login<U: AsRef<str>, P: AsRef<str>>(
        mut self,
        username: U,
        password: P,
    ) -> ::std::result::Result<Session<T>, (Error, Client<T>)> {
        let username = username.as_ref();
        let password = password.as_ref();
        ok_or_unauth_client_err!(validate_str("LOGIN", "username", username), self);
        ok_or_unauth_client_err!(validate_str("LOGIN", "password", password), self);

        let command = Command::new("LOGIN")
            .string(username, false)
            .string(password, false)
            .sensitive();
        let done = ok_or_unauth_client_err!(self.run(command), self);
        if !matches!(done.code, Some(ResponseCode::Capabilities(_))) {
            ok_or_unauth_client_err!(self.refresh_capabilities(), self);
        }
        Ok(Session::new(self.conn))
    }

    /// Authenticate with the server using the given custom `authenticator` to handle the server's
    /// challenge.
    ///
    /// Each challenge is base64-decoded before it is handed to the authenticator, and each answer
    /// is base64-encoded before it is sent back.
    pub fn authenticate<A: Authenticator, S: AsRef<str>>(
        mut self,
        auth_type: S,
        authenticator: &A,
    ) -> ::std::result::Result<Session<T>, (Error, Client<T>)> {
        let mechanism = auth_type.as_ref();
        if mechanism.is_empty() || !mechanism.bytes().all(|b| b.is_ascii_graphic()) {
            return Err((
                Error::Argument(format!("invalid SASL mechanism {:?}", mechanism)),
                self,
            ));
        }
        let tag = ok_or_unauth_client_err!(
            self.submit(Command::new("AUTHENTICATE").arg(mechanism)),
            self
        );
        let handshake = self.do_auth_handshake(&tag, authenticator);
        let done = ok_or_unauth_client_err!(self.settle(handshake), self);
        if !matches!(done.code, Some(ResponseCode::Capabilities(_))) {
            ok_or_unauth_client_err!(self.refresh_capabilities(), self);
        }
        Ok(Session::new(self.conn))
    }

    /// This func does the handshake process once the authenticate command is made.
    fn do_auth_handshake<A: Authenticator>(
        &mut self,
        tag: &str,
        authenticator: &A,
    ) -> Result<Completion> {
        loop {
            if let Some(done) = self.completed.remove(tag) {
                return done.into_result();
            }
            if let Some(text) = self.step()? {
                let challenge = BASE64.decode(text.trim()).map_err(|e| {
                    Error::Parse(ParseError::Authentication(text.clone(), Some(e)))
                })?;
                let answer = authenticator.process(&challenge);
                log::trace!("C: <authentication data>");
                let mut line = BASE64.encode(answer.as_ref()).into_bytes();
                line.extend_from_slice(b"\r\n");
                self.stream.write_all(&line)?;
                self.stream.flush()?;
            }
        }
    }
}

/// How [`Session::store_flags`] changes the flag list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// `+FLAGS`
    Add,
    /// `-FLAGS`
    Remove,
    /// `FLAGS`
    Replace,
}

impl StoreMode {
    fn item(self, silent: bool) -> &'static str {
        match (self, silent) {
            (StoreMode::Add, false) => "+FLAGS",
            (StoreMode::Add, true) => "+FLAGS.SILENT",
            (StoreMode::Remove, false) => "-FLAGS",
            (StoreMode::Remove, true) => "-FLAGS.SILENT",
            (StoreMode::Replace, false) => "FLAGS",
            (StoreMode::Replace, true) => "FLAGS.SILENT",
        }
    }
}

impl<T: Read + Write> Session<T> {
    pub(crate) fn new(conn: Connection<T>) -> Self {
        Session { conn }
    }

    /// Ask the server for its capabilities again.
    pub fn capability(&mut self) -> Result<&Capabilities> {
        self.run(Command::new("CAPABILITY"))?;
        Ok(&self.capabilities)
    }

    /// [`ENABLE`](https://tools.ietf.org/html/rfc5161) extensions such as `CONDSTORE`,
    /// `QRESYNC` or `UTF8=ACCEPT`. Returns the ones the server confirmed.
    pub fn enable(&mut self, extensions: EnumSet<Capability>) -> Result<EnumSet<Capability>> {
        self.require(Capability::Enable)?;
        for cap in extensions.iter() {
            self.require(cap)?;
        }
        if extensions.is_empty() {
            return Ok(EnumSet::empty());
        }
        let done = self.run(
            Command::new("ENABLE").arg(iter_join(extensions.iter().map(Capability::atom), " ")),
        )?;
        let mut enabled = EnumSet::empty();
        for u in &done.data {
            if let Untagged::Enabled(atoms) = u {
                enabled |= atoms
                    .iter()
                    .filter_map(|a| Capability::from_atom(a))
                    .collect::<EnumSet<_>>();
            }
        }
        Ok(enabled)
    }

    /// Stop using `cap` for this session, even though the server advertises it. Operations that
    /// have a fallback switch to it; the rest fail with [`Error::NotSupported`].
    pub fn disable_capability(&mut self, cap: Capability) {
        log::debug!("disabling {}", cap);
        self.capabilities.revoke(cap);
    }

    /// Undo [`Session::disable_capability`].
    pub fn enable_capability(&mut self, cap: Capability) {
        log::debug!("re-enabling {}", cap);
        self.capabilities.restore(cap);
    }

    /// Noop always succeeds, and it does nothing. It is the way to pick up pending unsolicited
    /// updates.
    pub fn noop(&mut self) -> Result<()> {
        self.run(Command::new("NOOP")).map(|_| ())
    }

    /// Logout informs the server that the client is done with the connection. The session is
    /// closed afterwards.
    pub fn logout(&mut self) -> Result<()> {
        let done = self.run(Command::new("LOGOUT"));
        self.bye = None;
        self.conn.shutdown(Error::ConnectionLost);
        match done {
            Ok(_) | Err(Error::Bye(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// The [`NAMESPACE`](https://tools.ietf.org/html/rfc2342) of the account.
    pub fn namespaces(&mut self) -> Result<Namespaces> {
        if let Some(namespaces) = &self.namespaces {
            return Ok(namespaces.clone());
        }
        self.require(Capability::Namespace)?;
        self.run(Command::new("NAMESPACE"))?;
        Ok(self.namespaces.clone().unwrap_or_default())
    }

    /// The folder behind `id`.
    ///
    /// # Panics
    ///
    /// If `id` came from a different session.
    pub fn folder(&self, id: FolderId) -> &Folder {
        self.folders.get(id)
    }

    /// A handle for the folder with this full name. Nothing is sent to the server.
    pub fn folder_by_name(&mut self, name: &str) -> Result<FolderId> {
        validate_str("SELECT", "mailbox", name)?;
        Ok(self.folders.get_or_create(name))
    }

    /// The handle for a folder this session already knows, without creating one.
    pub fn find_folder(&self, name: &str) -> Option<FolderId> {
        self.folders.lookup(name)
    }

    /// The handle for `INBOX`.
    pub fn inbox(&mut self) -> FolderId {
        self.folders.get_or_create("INBOX")
    }

    /// The selected folder, if any.
    pub fn selected(&self) -> Option<FolderId> {
        self.selected
    }

    /// Every folder this session knows about.
    pub fn folders(&self) -> impl Iterator<Item = (FolderId, &Folder)> {
        self.folders.iter()
    }

    /// Receive every [`FolderEvent`] for `id` from now on.
    pub fn watch(&mut self, id: FolderId) -> mpsc::Receiver<FolderEvent> {
        self.folders.get_mut(id).subscribe()
    }

    pub(crate) fn with_mailbox(&self, command: Command, id: FolderId) -> Command {
        let wire = self.encode_name(self.folders.get(id).name());
        command.string(&wire, self.utf8_active())
    }

    pub(crate) fn ensure_open(&self, id: FolderId, write: bool) -> Result<()> {
        let folder = self.folders.get(id);
        if self.selected != Some(id) {
            return Err(Error::FolderNotOpen(folder.name().to_string()));
        }
        if write && folder.access() == Some(FolderAccess::ReadOnly) {
            return Err(Error::ReadOnly(folder.name().to_string()));
        }
        Ok(())
    }

    /// Turn a `NO [NONEXISTENT]` or `NO [TRYCREATE]` about `id` into [`Error::FolderNotFound`].
    pub(crate) fn check_missing(&mut self, id: FolderId, err: Error) -> Error {
        if matches!(
            err.code(),
            Some(ResponseCode::NonExistent) | Some(ResponseCode::TryCreate)
        ) {
            let folder = self.folders.get_mut(id);
            folder.mark_missing();
            if self.selected == Some(id) {
                self.selected = None;
            }
            return Error::FolderNotFound(self.folders.get(id).name().to_string());
        }
        err
    }

    /// Make sure the delimiter of `id` is known, listing it if needed.
    pub(crate) fn ensure_listed(&mut self, id: FolderId) -> Result<()> {
        if self.folders.get(id).is_listed() {
            return Ok(());
        }
        let name = self.folders.get(id).name().to_string();
        self.list("", &name)?;
        if self.folders.get(id).is_listed() {
            Ok(())
        } else {
            self.folders.get_mut(id).mark_missing();
            Err(Error::FolderNotFound(name))
        }
    }

    /// Select `id` (`SELECT` for [`FolderAccess::ReadWrite`], `EXAMINE` for
    /// [`FolderAccess::ReadOnly`]) and return the access the server granted.
    ///
    /// With `QRESYNC` enabled and a known UID validity and mod-sequence, the folder is
    /// resynchronized, so changes since the last session arrive as `VANISHED (EARLIER)` and
    /// `FETCH` updates. With only `CONDSTORE` enabled, mod-sequences are requested.
    pub fn open(&mut self, id: FolderId, access: FolderAccess) -> Result<FolderAccess> {
        self.ensure_usable()?;
        let verb = match access {
            FolderAccess::ReadOnly => "EXAMINE",
            FolderAccess::ReadWrite => "SELECT",
        };
        let mut command = self.with_mailbox(Command::new(verb), id);
        let folder = self.folders.get(id);
        match (folder.uid_validity(), folder.highest_mod_seq()) {
            (Some(validity), Some(mod_seq)) if self.capabilities.is_active(Capability::QResync) => {
                command = command.arg(format!("(QRESYNC ({} {}))", validity, mod_seq));
            }
            _ if self.capabilities.is_active(Capability::CondStore) => {
                command = command.arg("(CONDSTORE)");
            }
            _ => {}
        }

        if let Some(previous) = self.selected.take() {
            self.folders.get_mut(previous).close();
        }
        self.folders.get_mut(id).begin_open();
        self.selected = Some(id);

        let done = match self.run(command) {
            Ok(done) => done,
            Err(e) => {
                self.selected = None;
                return Err(self.check_missing(id, e));
            }
        };
        let granted = if done.has_code(&ResponseCode::ReadOnly) {
            FolderAccess::ReadOnly
        } else if done.has_code(&ResponseCode::ReadWrite) {
            FolderAccess::ReadWrite
        } else {
            access
        };
        let folder = self.folders.get_mut(id);
        if let Some(code) = &done.code {
            folder.apply_code(code);
        }
        folder.open(granted);
        log::debug!("opened {} {:?}", folder.name(), granted);
        Ok(granted)
    }

    /// Leave the selected state. With `expunge`, messages marked `\Deleted` are removed
    /// (`CLOSE`); without it they stay (`UNSELECT`, or a failing `EXAMINE` when the server lacks
    /// `UNSELECT`).
    pub fn close(&mut self, expunge: bool) -> Result<()> {
        self.ensure_usable()?;
        let id = match self.selected {
            Some(id) => id,
            None => return Ok(()),
        };

        if expunge {
            self.run(Command::new("CLOSE"))?;
        } else {
            match strategy::choose(Operation::Unselect, self.capabilities.enabled()) {
                Path::Native => {
                    self.run(Command::new("UNSELECT"))?;
                }
                Path::Emulated => {
                    let placeholder = Command::new("EXAMINE").string(UNSELECT_PLACEHOLDER, false);
                    if self.run(placeholder).is_ok() {
                        self.run(Command::new("CLOSE"))?;
                    }
                }
            }
        }

        self.selected = None;
        self.folders.get_mut(id).close();
        Ok(())
    }

    /// Create a folder. Special-use attributes need `CREATE-SPECIAL-USE`.
    pub fn create(
        &mut self,
        name: &str,
        special_use: EnumSet<FolderAttribute>,
    ) -> Result<FolderId> {
        validate_str("CREATE", "mailbox", name)?;
        if !(special_use - FolderAttribute::special_use()).is_empty() {
            return Err(Error::Argument(format!(
                "not special-use attributes: {:?}",
                special_use - FolderAttribute::special_use()
            )));
        }
        if !special_use.is_empty() {
            self.require(Capability::CreateSpecialUse)?;
        }

        let mut command = Command::new("CREATE").string(&self.encode_name(name), self.utf8_active());
        if !special_use.is_empty() {
            command = command.arg(format!(
                "(USE ({}))",
                iter_join(special_use.iter().map(FolderAttribute::as_wire), " ")
            ));
        }
        self.run(command)?;

        let id = self.folders.get_or_create(name);
        self.folders.get_mut(id).mark_created(special_use);
        Ok(id)
    }

    /// Create `name` below `parent`, joined with the parent's delimiter.
    pub fn create_subfolder(
        &mut self,
        parent: FolderId,
        name: &str,
        special_use: EnumSet<FolderAttribute>,
    ) -> Result<FolderId> {
        self.ensure_listed(parent)?;
        let folder = self.folders.get(parent);
        let delimiter = match folder.delimiter() {
            Some(d) => d,
            None => {
                return Err(Error::Argument(format!(
                    "{} cannot have subfolders",
                    folder.name()
                )))
            }
        };
        if name.contains(delimiter) {
            return Err(Error::Argument(format!(
                "{:?} contains the delimiter {:?}",
                name, delimiter
            )));
        }
        let full = format!("{}{}{}", folder.name(), delimiter, name);
        self.create(&full, special_use)
    }

    /// Rename a folder. If it (or a folder below it) was open, it is closed first.
    pub fn rename(&mut self, id: FolderId, new_name: &str) -> Result<()> {
        validate_str("RENAME", "new mailbox", new_name)?;
        let command = self
            .with_mailbox(Command::new("RENAME"), id)
            .string(&self.encode_name(new_name), self.utf8_active());
        self.run(command).map_err(|e| self.check_missing(id, e))?;

        self.folders.rename(id, new_name);
        if let Some(selected) = self.selected {
            if !self.folders.get(selected).is_open() {
                self.selected = None;
            }
        }
        Ok(())
    }

    /// Delete a folder. The handle stays valid, with [`Folder::exists`] false.
    pub fn delete(&mut self, id: FolderId) -> Result<()> {
        let command = self.with_mailbox(Command::new("DELETE"), id);
        self.run(command).map_err(|e| self.check_missing(id, e))?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.folders.get_mut(id).mark_deleted();
        Ok(())
    }

    /// Add the folder to the subscription list.
    pub fn subscribe(&mut self, id: FolderId) -> Result<()> {
        let command = self.with_mailbox(Command::new("SUBSCRIBE"), id);
        self.run(command)?;
        self.folders.get_mut(id).set_subscribed(true);
        Ok(())
    }

    /// Remove the folder from the subscription list.
    pub fn unsubscribe(&mut self, id: FolderId) -> Result<()> {
        let command = self.with_mailbox(Command::new("UNSUBSCRIBE"), id);
        self.run(command)?;
        self.folders.get_mut(id).set_subscribed(false);
        Ok(())
    }

    /// Ask for `STATUS` counters. The folder is updated, and the raw items are returned.
    pub fn status(
        &mut self,
        id: FolderId,
        items: EnumSet<StatusDataItem>,
    ) -> Result<Vec<StatusItem>> {
        if items.is_empty() {
            return Err(Error::Argument("STATUS needs at least one data item".into()));
        }
        for item in items.iter() {
            if let Some(cap) = item.required_capability() {
                self.require(cap)?;
            }
        }
        let command = self
            .with_mailbox(Command::new("STATUS"), id)
            .arg(format!("({})", iter_join(items.iter().map(StatusDataItem::atom), " ")));
        let done = self.run(command).map_err(|e| self.check_missing(id, e))?;

        let name = self.folders.get(id).name().to_string();
        let mut result = Vec::new();
        for u in done.data {
            if let Untagged::Status { mailbox, items } = u {
                if normalize(&mailbox) == name {
                    result.extend(items);
                }
            }
        }
        Ok(result)
    }

    /// `LIST reference pattern`. The listed folders are updated, and the names returned.
    pub fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<Name>> {
        self.list_command("LIST", reference, pattern)
    }

    /// `LSUB reference pattern`, the subscribed subset of [`Session::list`].
    pub fn list_subscribed(&mut self, reference: &str, pattern: &str) -> Result<Vec<Name>> {
        self.list_command("LSUB", reference, pattern)
    }

    fn list_command(
        &mut self,
        verb: &'static str,
        reference: &str,
        pattern: &str,
    ) -> Result<Vec<Name>> {
        validate_str(verb, "reference", reference)?;
        validate_str(verb, "pattern", pattern)?;
        let utf8 = self.utf8_active();
        let command = Command::new(verb)
            .string(&self.encode_name(reference), utf8)
            .string(&self.encode_name(pattern), utf8);
        let done = self.run(command)?;
        Ok(done.names().cloned().collect())
    }

    /// `UID SEARCH` in the open folder. `criteria` is sent verbatim.
    pub fn search(&mut self, id: FolderId, criteria: &str) -> Result<UidSet> {
        self.ensure_open(id, false)?;
        validate_str("UID SEARCH", "criteria", criteria)?;
        if !criteria.is_ascii() && !self.utf8_active() {
            return Err(Error::NotSupported(Capability::Utf8Accept));
        }
        let done = self.run(Command::new("UID SEARCH").arg(criteria))?;
        Ok(done.search_results().collect())
    }

    /// Fetch the flags (and, with `CONDSTORE`, mod-sequences) of `uids` in the open folder.
    /// `changed_since` limits the answer to messages changed after that mod-sequence.
    pub fn fetch_flags(
        &mut self,
        id: FolderId,
        uids: &UidSet,
        changed_since: Option<u64>,
    ) -> Result<Vec<MessageSummary>> {
        self.ensure_open(id, false)?;
        if changed_since.is_some() {
            self.require(Capability::CondStore)?;
        }
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        let items = if self.capabilities.is_active(Capability::CondStore)
            || changed_since.is_some()
        {
            "(UID FLAGS MODSEQ)"
        } else {
            "(UID FLAGS)"
        };
        let mut command = Command::new("UID FETCH").arg(uids).arg(items);
        if let Some(mod_seq) = changed_since {
            command = command.arg(format!("(CHANGEDSINCE {})", mod_seq));
        }
        let done = self.run(command)?;
        Ok(done
            .fetches()
            .filter(|m| m.uid.map_or(false, |uid| uids.contains(uid)))
            .collect())
    }

    pub(crate) fn store_command(
        &self,
        uid: bool,
        set: &str,
        mode: StoreMode,
        flags: &[Flag],
        silent: bool,
        unchanged_since: Option<u64>,
    ) -> Result<Command> {
        let flags = flags
            .iter()
            .map(|f| f.validate().map(|_| f.to_string()))
            .collect::<Result<Vec<_>>>()?;
        let mut command = if uid {
            Command::new("UID STORE")
        } else {
            Command::new("STORE")
        }
        .arg(set);
        if let Some(mod_seq) = unchanged_since {
            command = command.arg(format!("(UNCHANGEDSINCE {})", mod_seq));
        }
        Ok(command
            .arg(mode.item(silent))
            .arg(format!("({})", flags.join(" "))))
    }

    /// Change the flags of `uids` in the open folder. With `unchanged_since` (needs `CONDSTORE`),
    /// messages modified after that mod-sequence are left alone and returned.
    pub fn store_flags(
        &mut self,
        id: FolderId,
        uids: &UidSet,
        mode: StoreMode,
        flags: &[Flag],
        unchanged_since: Option<u64>,
    ) -> Result<UidSet> {
        self.ensure_open(id, true)?;
        if unchanged_since.is_some() {
            self.require(Capability::CondStore)?;
        }
        let command =
            self.store_command(true, &uids.to_string(), mode, flags, false, unchanged_since)?;
        if uids.is_empty() {
            return Ok(UidSet::new());
        }
        let done = self.run(command)?;
        Ok(done.modified())
    }

    /// Permanently remove every message marked `\Deleted` from the open folder.
    pub fn expunge(&mut self, id: FolderId) -> Result<Deleted> {
        self.ensure_open(id, true)?;
        let done = self.run(Command::new("EXPUNGE"))?;
        Ok(done.deleted())
    }
}

#[cfg(test)]
mod tests {
    use super::super::mock_stream::{mock_open, mock_session, MockStream};
    use super::*;
    use crate::command::quote;

    fn written(session: &Session<MockStream>) -> String {
        String::from_utf8(session.stream.get_ref().written_buf.clone()).unwrap()
    }

    #[test]
    fn read_greeting() {
        let greeting = "* OK [CAPABILITY IMAP4rev1 LITERAL+ IDLE] Dovecot ready.\r\n";
        let mock_stream = MockStream::new(greeting.as_bytes().to_vec());
        let mut client = Client::new(mock_stream);
        assert_eq!(client.read_greeting().unwrap(), Greeting::Ok);
        assert!(client.capabilities().has(Capability::LiteralPlus));
    }

    #[test]
    fn greeting_bye_closes() {
        let mock_stream = MockStream::new(b"* BYE Too many connections\r\n".to_vec());
        let mut client = Client::new(mock_stream);
        assert!(matches!(client.read_greeting(), Err(Error::Bye(_))));
        assert!(client.is_closed());
    }

    #[test]
    fn readline_delay_read() {
        let greeting = "* PREAUTH Hi.\r\n";
        let mock_stream = MockStream::default()
            .with_buf(greeting.as_bytes().to_vec())
            .with_delay();
        let mut client = Client::new(mock_stream);
        assert_eq!(client.read_greeting().unwrap(), Greeting::PreAuth);
    }

    #[test]
    fn readline_eof() {
        let mock_stream = MockStream::default().with_eof();
        let mut client = Client::new(mock_stream);
        if let Err(Error::ConnectionLost) = client.read_greeting() {
        } else {
            unreachable!("EOF read did not return connection lost");
        }
    }

    #[test]
    fn readline_err() {
        let mock_stream = MockStream::default().with_err();
        let mut client = Client::new(mock_stream);
        assert!(matches!(client.read_greeting(), Err(Error::Io(_))));
        assert!(matches!(client.read_greeting(), Err(Error::ConnectionLost)));
    }

    #[test]
    fn tags_are_sequential_and_padded() {
        let mut session = mock_session(
            &["IMAP4rev1"],
            b"A00000001 OK done\r\nA00000002 OK done\r\n",
        );
        session.noop().unwrap();
        session.noop().unwrap();
        assert_eq!(
            written(&session),
            "A00000001 NOOP\r\nA00000002 NOOP\r\n"
        );
    }

    #[test]
    fn login() {
        let response = b"A00000001 OK [CAPABILITY IMAP4rev1 UIDPLUS] Logged in\r\n".to_vec();
        let username = "username";
        let password = "password";
        let command = format!("A00000001 LOGIN {} {}\r\n", quote!(username), quote!(password));
        let mock_stream = MockStream::new(response);
        let client = Client::new(mock_stream);
        let session = client.login(username, password).unwrap();
        assert_eq!(written(&session), command);
        assert!(session.capabilities().has(Capability::UidPlus));
    }

    #[test]
    fn login_refreshes_capabilities() {
        let response = b"A00000001 OK Logged in\r\n\
                         * CAPABILITY IMAP4rev1 MOVE\r\n\
                         A00000002 OK done\r\n"
            .to_vec();
        let client = Client::new(MockStream::new(response));
        let session = client.login("u", "p").unwrap();
        assert!(session.capabilities().has(Capability::Move));
        assert!(written(&session).ends_with("A00000002 CAPABILITY\r\n"));
    }

    #[test]
    fn login_failure_returns_client() {
        let response = b"A00000001 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n".to_vec();
        let client = Client::new(MockStream::new(response));
        let (err, client) = client.login("u", "p").unwrap_err();
        assert!(matches!(err, Error::No(_)));
        assert!(!client.is_closed());
    }

    #[test]
    fn login_validation() {
        let client = Client::new(MockStream::default());
        let (err, client) = client.login("user\r\n", "p").unwrap_err();
        match err {
            Error::Validate(e) => assert_eq!(e.offending_char(), '\r'),
            other => panic!("{:?}", other),
        }
        assert!(client.stream.get_ref().written_buf.is_empty());
    }

    struct Plain;

    impl Authenticator for Plain {
        type Response = Vec<u8>;

        fn process(&self, challenge: &[u8]) -> Vec<u8> {
            assert_eq!(challenge, b"");
            b"\0user\0pass".to_vec()
        }
    }

    #[test]
    fn authenticate() {
        let response = b"+ \r\n\
                         A00000001 OK [CAPABILITY IMAP4rev1] Authenticated\r\n"
            .to_vec();
        let client = Client::new(MockStream::new(response));
        let session = client.authenticate("PLAIN", &Plain).unwrap();
        assert_eq!(
            written(&session),
            "A00000001 AUTHENTICATE PLAIN\r\nAHVzZXIAcGFzcw==\r\n"
        );
    }

    #[test]
    fn tag_mismatch_is_fatal() {
        let mut session = mock_session(&["IMAP4rev1"], b"A00000009 OK what\r\n");
        let err = session.noop().unwrap_err();
        assert!(matches!(err, Error::TagMismatch(_)));
        assert!(err.is_fatal());
        assert!(matches!(session.noop(), Err(Error::ConnectionLost)));
    }

    #[test]
    fn bad_tagged_status_is_fatal() {
        let mut session = mock_session(&["IMAP4rev1"], b"A00000001 PERHAPS\r\n");
        assert!(matches!(session.noop(), Err(Error::Parse(_))));
        assert!(session.is_closed());
    }

    #[test]
    fn no_is_not_fatal() {
        let mut session = mock_session(
            &["IMAP4rev1"],
            b"A00000001 NO [NONEXISTENT] Unknown Mailbox\r\nA00000002 OK done\r\n",
        );
        let id = session.folder_by_name("Nope").unwrap();
        let err = session.delete(id).unwrap_err();
        assert!(matches!(err, Error::FolderNotFound(ref name) if name == "Nope"));
        assert!(!err.is_fatal());
        assert!(!session.folder(id).exists());
        session.noop().unwrap();
    }

    #[test]
    fn bye_then_eof() {
        let mut session = mock_session(&["IMAP4rev1"], b"* BYE shutting down\r\n");
        match session.noop() {
            Err(Error::Bye(bye)) => assert_eq!(bye.information, "shutting down"),
            other => panic!("{:?}", other),
        }
        assert!(matches!(session.noop(), Err(Error::ConnectionLost)));
    }

    #[test]
    fn fetch_body_literal() {
        let mut session = mock_session(
            &["IMAP4rev1"],
            b"* 2 FETCH (UID 7 BODY[TEXT] {3}\r\nfoo FLAGS (\\Seen))\r\n\
              A00000001 OK FETCH completed\r\n",
        );
        let id = mock_open(&mut session, "INBOX", 2, &[]);
        let summaries = session.fetch_flags(id, &UidSet::from(7), None).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].flags, vec![Flag::Seen]);
        assert_eq!(session.folder(id).uid_of(2), Some(7));
    }

    #[test]
    fn select_populates_folder() {
        let mut session = mock_session(
            &["IMAP4rev1"],
            b"* 172 EXISTS\r\n\
              * 1 RECENT\r\n\
              * OK [UNSEEN 12] Message 12 is first unseen\r\n\
              * OK [UIDVALIDITY 3857529045] UIDs valid\r\n\
              * OK [UIDNEXT 4392] Predicted next UID\r\n\
              * FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n\
              * OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n\
              A00000001 OK [READ-WRITE] SELECT completed\r\n",
        );
        let inbox = session.inbox();
        let events = session.watch(inbox);
        assert_eq!(
            session.open(inbox, FolderAccess::ReadWrite).unwrap(),
            FolderAccess::ReadWrite
        );
        assert_eq!(written(&session), "A00000001 SELECT \"INBOX\"\r\n");
        let folder = session.folder(inbox);
        assert_eq!(folder.count(), 172);
        assert_eq!(folder.recent(), 1);
        assert_eq!(folder.first_unseen(), Some(12));
        assert_eq!(folder.uid_validity(), Some(3857529045));
        assert_eq!(folder.uid_next(), Some(4392));
        assert!(folder.permanent_flags().contains(&Flag::MayCreate));
        assert_eq!(folder.flags().len(), 5);
        assert_eq!(session.selected(), Some(inbox));
        let events: Vec<_> = events.try_iter().collect();
        assert_eq!(events.first(), Some(&FolderEvent::RecentChanged(1)));
        assert!(events.contains(&FolderEvent::CountChanged(172)));
        assert_eq!(events.last(), Some(&FolderEvent::Opened(FolderAccess::ReadWrite)));
    }

    #[test]
    fn select_read_only_code_wins() {
        let mut session = mock_session(
            &["IMAP4rev1"],
            b"* 0 EXISTS\r\nA00000001 OK [READ-ONLY] done\r\n",
        );
        let id = session.folder_by_name("Shared").unwrap();
        assert_eq!(
            session.open(id, FolderAccess::ReadWrite).unwrap(),
            FolderAccess::ReadOnly
        );
        assert!(matches!(session.expunge(id), Err(Error::ReadOnly(_))));
    }

    #[test]
    fn select_with_qresync() {
        let mut session = mock_session(
            &["IMAP4rev1", "ENABLE", "CONDSTORE", "QRESYNC"],
            b"* ENABLED QRESYNC\r\n\
              A00000001 OK enabled\r\n\
              * STATUS Lists (UIDVALIDITY 67890007 HIGHESTMODSEQ 90060115194045000)\r\n\
              A00000002 OK done\r\n\
              * 10 EXISTS\r\n\
              * VANISHED (EARLIER) 41,43:45\r\n\
              A00000003 OK [READ-WRITE] done\r\n",
        );
        let id = session.folder_by_name("Lists").unwrap();
        assert_eq!(
            session.enable(Capability::QResync.into()).unwrap(),
            EnumSet::only(Capability::QResync)
        );
        assert!(session.capabilities().is_active(Capability::CondStore));
        session
            .status(id, StatusDataItem::UidValidity | StatusDataItem::HighestModSeq)
            .unwrap();
        session.open(id, FolderAccess::ReadWrite).unwrap();
        assert!(written(&session).ends_with(
            "A00000003 SELECT \"Lists\" (QRESYNC (67890007 90060115194045000))\r\n"
        ));
        assert_eq!(session.folder(id).count(), 10);
    }

    #[test]
    fn failed_select_leaves_nothing_selected() {
        let mut session = mock_session(
            &["IMAP4rev1"],
            b"* 3 EXISTS\r\nA00000001 OK [READ-WRITE] ok\r\nA00000002 NO no such mailbox\r\n",
        );
        let inbox = session.inbox();
        let other = session.folder_by_name("Other").unwrap();
        session.open(inbox, FolderAccess::ReadWrite).unwrap();
        assert!(session.open(other, FolderAccess::ReadWrite).is_err());
        assert_eq!(session.selected(), None);
        assert!(!session.folder(inbox).is_open());
    }

    #[test]
    fn close_without_unselect_uses_examine() {
        let mut session = mock_session(
            &["IMAP4rev1"],
            b"A00000001 NO [NONEXISTENT] nope\r\n",
        );
        let id = mock_open(&mut session, "INBOX", 1, &[]);
        let events = session.watch(id);
        session.close(false).unwrap();
        assert_eq!(
            written(&session),
            format!("A00000001 EXAMINE \"{}\"\r\n", UNSELECT_PLACEHOLDER)
        );
        assert_eq!(events.try_iter().collect::<Vec<_>>(), vec![FolderEvent::Closed]);
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn close_with_unselect() {
        let mut session = mock_session(&["IMAP4rev1", "UNSELECT"], b"A00000001 OK done\r\n");
        mock_open(&mut session, "INBOX", 1, &[]);
        session.close(false).unwrap();
        assert_eq!(written(&session), "A00000001 UNSELECT\r\n");
    }

    #[test]
    fn rename_open_folder() {
        let mut session = mock_session(&["IMAP4rev1"], b"A00000001 OK renamed\r\n");
        let id = mock_open(&mut session, "Drafts", 1, &[]);
        let events = session.watch(id);
        session.rename(id, "Entwürfe").unwrap();
        assert_eq!(
            written(&session),
            "A00000001 RENAME \"Drafts\" \"Entw&APw-rfe\"\r\n"
        );
        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            vec![
                FolderEvent::Closed,
                FolderEvent::Renamed {
                    old_name: "Drafts".into(),
                    new_name: "Entwürfe".into()
                }
            ]
        );
        assert!(!session.folder(id).is_open());
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn delete_open_folder() {
        let mut session = mock_session(&["IMAP4rev1"], b"A00000001 OK deleted\r\n");
        let id = mock_open(&mut session, "Old", 1, &[]);
        let events = session.watch(id);
        session.delete(id).unwrap();
        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            vec![FolderEvent::Closed, FolderEvent::Deleted]
        );
        assert!(!session.folder(id).exists());
        assert_eq!(session.find_folder("Old"), Some(id));
    }

    #[test]
    fn expunge_batch_one_count_notification() {
        let mut session = mock_session(
            &["IMAP4rev1"],
            b"* 3 EXPUNGE\r\n* 3 EXPUNGE\r\n* 5 EXPUNGE\r\n* 8 EXISTS\r\n\
              A00000001 OK EXPUNGE completed\r\n",
        );
        let id = mock_open(&mut session, "INBOX", 11, &[]);
        let events = session.watch(id);
        let deleted = session.expunge(id).unwrap();
        assert_eq!(deleted.seqs().collect::<Vec<_>>(), vec![3, 3, 5]);
        let counts: Vec<_> = events
            .try_iter()
            .filter(|e| matches!(e, FolderEvent::CountChanged(_)))
            .collect();
        assert_eq!(counts, vec![FolderEvent::CountChanged(8)]);
    }

    #[test]
    fn unsolicited_exists_during_noop() {
        let mut session = mock_session(
            &["IMAP4rev1"],
            b"* 4 EXISTS\r\n* 1 RECENT\r\nA00000001 OK NOOP completed\r\n",
        );
        let id = mock_open(&mut session, "INBOX", 3, &[]);
        let events = session.watch(id);
        session.noop().unwrap();
        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            vec![FolderEvent::RecentChanged(1), FolderEvent::CountChanged(4)]
        );
    }

    #[test]
    fn status_checks_capabilities_first() {
        let mut session = mock_session(&["IMAP4rev1"], b"");
        let id = session.inbox();
        assert!(matches!(
            session.status(id, StatusDataItem::Messages | StatusDataItem::Size),
            Err(Error::NotSupported(Capability::StatusSize))
        ));
        assert!(session.stream.get_ref().written_buf.is_empty());
    }

    #[test]
    fn status_updates_folder() {
        let mut session = mock_session(
            &["IMAP4rev1", "OBJECTID"],
            b"* STATUS \"&AMk-t&AOk-\" (MESSAGES 3 UNSEEN 1 MAILBOXID (Mfeed))\r\n\
              A00000001 OK STATUS completed\r\n",
        );
        let id = session.folder_by_name("Été").unwrap();
        let items = session
            .status(
                id,
                StatusDataItem::Messages | StatusDataItem::Unseen | StatusDataItem::MailboxId,
            )
            .unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(
            written(&session),
            "A00000001 STATUS \"&AMk-t&AOk-\" (MESSAGES UNSEEN MAILBOXID)\r\n"
        );
        let folder = session.folder(id);
        assert_eq!(folder.count(), 3);
        assert_eq!(folder.unread(), Some(1));
        assert_eq!(folder.mailbox_id(), Some("Mfeed"));
    }

    #[test]
    fn create_with_special_use() {
        let mut session = mock_session(
            &["IMAP4rev1", "CREATE-SPECIAL-USE"],
            b"A00000001 OK created\r\n",
        );
        let id = session
            .create("Archive", FolderAttribute::Archive.into())
            .unwrap();
        assert_eq!(
            written(&session),
            "A00000001 CREATE \"Archive\" (USE (\\Archive))\r\n"
        );
        assert_eq!(session.folder(id).special_use(), Into::<EnumSet<FolderAttribute>>::into(FolderAttribute::Archive));

        session.disable_capability(Capability::CreateSpecialUse);
        assert!(matches!(
            session.create("Junk", FolderAttribute::Junk.into()),
            Err(Error::NotSupported(Capability::CreateSpecialUse))
        ));
    }

    #[test]
    fn create_subfolder_of_flat_folder() {
        let mut session = mock_session(
            &["IMAP4rev1"],
            b"* LIST (\\HasNoChildren) NIL \"Flat\"\r\nA00000001 OK done\r\n",
        );
        let id = session.folder_by_name("Flat").unwrap();
        assert!(matches!(
            session.create_subfolder(id, "Child", EnumSet::empty()),
            Err(Error::Argument(_))
        ));
        assert_eq!(written(&session), "A00000001 LIST \"\" \"Flat\"\r\n");
    }

    #[test]
    fn search_and_store() {
        let mut session = mock_session(
            &["IMAP4rev1", "CONDSTORE"],
            b"* SEARCH 4 9\r\nA00000001 OK done\r\n\
              * 1 FETCH (UID 4 FLAGS (\\Seen \\Flagged) MODSEQ (12))\r\n\
              A00000002 OK [MODIFIED 9] Conditional STORE failed\r\n",
        );
        let id = mock_open(&mut session, "INBOX", 2, &[]);
        let found = session.search(id, "UNSEEN").unwrap();
        assert_eq!(found.to_string(), "4,9");
        let modified = session
            .store_flags(id, &found, StoreMode::Add, &[Flag::Flagged], Some(10))
            .unwrap();
        assert_eq!(modified, UidSet::from(9));
        assert!(written(&session).ends_with(
            "A00000002 UID STORE 4,9 (UNCHANGEDSINCE 10) +FLAGS (\\Flagged)\r\n"
        ));
        assert_eq!(session.folder(id).highest_mod_seq(), Some(12));
    }

    #[test]
    fn non_ascii_search_needs_utf8() {
        let mut session = mock_session(&["IMAP4rev1"], b"");
        let id = mock_open(&mut session, "INBOX", 0, &[]);
        assert!(matches!(
            session.search(id, "SUBJECT \"Grüße\""),
            Err(Error::NotSupported(Capability::Utf8Accept))
        ));
    }

    #[test]
    fn operations_need_the_folder_open() {
        let mut session = mock_session(&["IMAP4rev1"], b"");
        let id = session.inbox();
        assert!(matches!(
            session.expunge(id),
            Err(Error::FolderNotOpen(ref name)) if name == "INBOX"
        ));
    }

    #[test]
    fn changedsince_needs_condstore() {
        let mut session = mock_session(&["IMAP4rev1"], b"");
        let id = mock_open(&mut session, "INBOX", 1, &[]);
        assert!(matches!(
            session.fetch_flags(id, &UidSet::from(1), Some(5)),
            Err(Error::NotSupported(Capability::CondStore))
        ));
    }

    #[test]
    fn logout_closes() {
        let mut session = mock_session(
            &["IMAP4rev1"],
            b"* BYE IMAP4rev1 Server logging out\r\nA00000001 OK LOGOUT completed\r\n",
        );
        let id = mock_open(&mut session, "INBOX", 0, &[]);
        session.logout().unwrap();
        assert!(session.is_closed());
        assert!(!session.folder(id).is_open());
        assert!(matches!(session.noop(), Err(Error::ConnectionLost)));
    }

    #[test]
    fn namespaces_are_cached() {
        let mut session = mock_session(
            &["IMAP4rev1", "NAMESPACE"],
            b"* NAMESPACE ((\"\" \"/\")) NIL NIL\r\nA00000001 OK done\r\n",
        );
        let ns = session.namespaces().unwrap();
        assert_eq!(ns.personal[0].delimiter, Some('/'));
        assert_eq!(session.namespaces().unwrap(), ns);
        assert_eq!(written(&session), "A00000001 NAMESPACE\r\n");
    }
}
