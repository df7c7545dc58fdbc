//! Per-folder state, kept in sync with what the server reports.
//!
//! Folders live in an arena owned by the session and are addressed by [`FolderId`]. A folder is
//! created the first time its name is mentioned and is never removed: deleting it on the server
//! only clears [`Folder::exists`], so handles held by callers stay valid and observers still see
//! the `Deleted` and `Renamed` events.

use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc;

use enumset::EnumSet;

use crate::types::*;

/// A handle to a folder known to a session.
///
/// Handles are only meaningful for the session that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderId(usize);

/// How the selected folder was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderAccess {
    /// `EXAMINE`, or a `SELECT` the server answered with `[READ-ONLY]`.
    ReadOnly,
    /// `SELECT` answered with `[READ-WRITE]`.
    ReadWrite,
}

/// A change to a folder, delivered to every receiver returned by [`crate::Session::watch`].
///
/// Events are sent as the responses carrying them are processed. `CountChanged` is held back
/// until the command that was running completes, so a burst of `EXPUNGE` and `EXISTS` lines
/// produces a single notification with the final count.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FolderEvent {
    /// The folder became the selected folder.
    Opened(FolderAccess),
    /// The folder is no longer selected.
    Closed,
    /// The folder was created by this session.
    Created,
    /// The folder was deleted by this session.
    Deleted,
    /// The folder (or one of its ancestors) was renamed.
    Renamed {
        /// The previous full name.
        old_name: String,
        /// The current full name.
        new_name: String,
    },
    /// The folder was subscribed.
    Subscribed,
    /// The folder was unsubscribed.
    Unsubscribed,
    /// The number of messages changed.
    CountChanged(u32),
    /// The `RECENT` count changed.
    RecentChanged(u32),
    /// The unseen count from `STATUS` changed.
    UnreadChanged(u32),
    /// The message at this 1-based position was expunged. Later messages have moved down by one.
    MessageExpunged {
        /// The position the message had before it was removed.
        seq: Seq,
    },
    /// Messages were removed, reported by UID (`QRESYNC`).
    MessagesVanished {
        /// The removed UIDs.
        uids: UidSet,
        /// The removal happened before this session observed the folder.
        earlier: bool,
    },
    /// The flags of a message changed.
    FlagsChanged {
        /// The message.
        seq: Seq,
        /// Its UID, when the server sent it along.
        uid: Option<Uid>,
        /// The complete new flag list.
        flags: Vec<Flag>,
        /// Its new mod-sequence, with `CONDSTORE`.
        mod_seq: Option<u64>,
    },
    /// `UIDVALIDITY` changed. Every UID previously seen for this folder is now meaningless.
    UidValidityChanged(u32),
    /// The next UID hint changed.
    UidNextChanged(Uid),
    /// The highest mod-sequence changed.
    HighestModSeqChanged(u64),
    /// The total size reported by `STATUS` changed.
    SizeChanged(u64),
    /// The append limit changed; `None` means there is no limit.
    AppendLimitChanged(Option<u64>),
    /// The stable folder id (`OBJECTID`) was learned.
    IdChanged(String),
}

/// The state-bearing fields of a folder, for comparing two folders or two points in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSnapshot {
    /// The full name.
    pub name: String,
    /// Whether the folder exists.
    pub exists: bool,
    /// Its access mode, if open.
    pub access: Option<FolderAccess>,
    /// The message count.
    pub count: u32,
    /// The recent count.
    pub recent: u32,
    /// The unseen count.
    pub unread: Option<u32>,
    /// The UID validity.
    pub uid_validity: Option<u32>,
    /// The next UID hint.
    pub uid_next: Option<Uid>,
    /// The highest mod-sequence.
    pub highest_mod_seq: Option<u64>,
}

/// One mailbox on the server.
#[derive(Debug)]
pub struct Folder {
    full_name: String,
    delimiter: Option<char>,
    listed: bool,
    attributes: EnumSet<FolderAttribute>,
    other_attributes: Vec<String>,
    exists: bool,
    access: Option<FolderAccess>,
    count: u32,
    notified_count: u32,
    recent: u32,
    unread: Option<u32>,
    first_unseen: Option<Seq>,
    uid_validity: Option<u32>,
    uid_next: Option<Uid>,
    highest_mod_seq: Option<u64>,
    append_limit: Option<u64>,
    size: Option<u64>,
    id: Option<String>,
    flags: Vec<Flag>,
    permanent_flags: Vec<Flag>,
    /// Sequence number to UID, for the messages whose UID this session has seen.
    uids: BTreeMap<Seq, Uid>,
    observers: Vec<mpsc::Sender<FolderEvent>>,
}

impl Folder {
    fn new(full_name: String) -> Self {
        Folder {
            full_name,
            delimiter: None,
            listed: false,
            attributes: EnumSet::empty(),
            other_attributes: Vec::new(),
            exists: true,
            access: None,
            count: 0,
            notified_count: 0,
            recent: 0,
            unread: None,
            first_unseen: None,
            uid_validity: None,
            uid_next: None,
            highest_mod_seq: None,
            append_limit: None,
            size: None,
            id: None,
            flags: Vec::new(),
            permanent_flags: Vec::new(),
            uids: BTreeMap::new(),
            observers: Vec::new(),
        }
    }

    /// The full name, decoded.
    pub fn name(&self) -> &str {
        &self.full_name
    }

    /// The last component of the name.
    pub fn short_name(&self) -> &str {
        match self.delimiter {
            Some(d) => self.full_name.rsplit(d).next().unwrap_or(&self.full_name),
            None => &self.full_name,
        }
    }

    /// The hierarchy delimiter. `None` either means the server reported `NIL` (the folder cannot
    /// have children) or that the folder has not been listed yet; see [`Folder::is_listed`].
    pub fn delimiter(&self) -> Option<char> {
        self.delimiter
    }

    /// Whether a `LIST` response for this folder has been seen, so that
    /// [`delimiter`](Folder::delimiter) is authoritative.
    pub fn is_listed(&self) -> bool {
        self.listed
    }

    /// The attributes from the last `LIST`.
    pub fn attributes(&self) -> EnumSet<FolderAttribute> {
        self.attributes
    }

    /// Attributes this crate does not know, as sent.
    pub fn other_attributes(&self) -> &[String] {
        &self.other_attributes
    }

    /// The special-use attributes of this folder.
    pub fn special_use(&self) -> EnumSet<FolderAttribute> {
        self.attributes & FolderAttribute::special_use()
    }

    /// `false` once the folder was deleted or reported `\NonExistent`.
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Whether the folder is subscribed, as far as this session knows.
    pub fn is_subscribed(&self) -> bool {
        self.attributes.contains(FolderAttribute::Subscribed)
    }

    /// Whether this is the selected folder.
    pub fn is_open(&self) -> bool {
        self.access.is_some()
    }

    /// The access mode, when open.
    pub fn access(&self) -> Option<FolderAccess> {
        self.access
    }

    /// The number of messages.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The number of messages with `\Recent`.
    pub fn recent(&self) -> u32 {
        self.recent
    }

    /// The number of unseen messages, from the last `STATUS`.
    pub fn unread(&self) -> Option<u32> {
        self.unread
    }

    /// The first unseen message, from `[UNSEEN n]` when the folder was opened.
    pub fn first_unseen(&self) -> Option<Seq> {
        self.first_unseen
    }

    /// The UID validity epoch.
    pub fn uid_validity(&self) -> Option<u32> {
        self.uid_validity
    }

    /// The next UID hint.
    pub fn uid_next(&self) -> Option<Uid> {
        self.uid_next
    }

    /// The highest mod-sequence, with `CONDSTORE`.
    pub fn highest_mod_seq(&self) -> Option<u64> {
        self.highest_mod_seq
    }

    /// The largest message the folder accepts, from `STATUS (APPENDLIMIT)`.
    pub fn append_limit(&self) -> Option<u64> {
        self.append_limit
    }

    /// The total size in bytes, from `STATUS (SIZE)`.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// The stable identifier from `OBJECTID`.
    pub fn mailbox_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The flags defined in the folder.
    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    /// Flags that can be changed permanently. Contains [`Flag::MayCreate`] if new keywords
    /// may be created.
    pub fn permanent_flags(&self) -> &[Flag] {
        &self.permanent_flags
    }

    /// The UID of the message at `seq`, if this session has seen it.
    pub fn uid_of(&self, seq: Seq) -> Option<Uid> {
        self.uids.get(&seq).copied()
    }

    /// The position of the message with `uid`, if this session has seen it.
    pub fn seq_of(&self, uid: Uid) -> Option<Seq> {
        self.uids
            .iter()
            .find(|&(_, &u)| u == uid)
            .map(|(&seq, _)| seq)
    }

    /// Copy out the state-bearing fields.
    pub fn snapshot(&self) -> FolderSnapshot {
        FolderSnapshot {
            name: self.full_name.clone(),
            exists: self.exists,
            access: self.access,
            count: self.count,
            recent: self.recent,
            unread: self.unread,
            uid_validity: self.uid_validity,
            uid_next: self.uid_next,
            highest_mod_seq: self.highest_mod_seq,
        }
    }

    /// Sequence numbers for every UID in `uids`, or `None` if any is unknown.
    pub(crate) fn local_seqs(&self, uids: &UidSet) -> Option<SequenceSet> {
        uids.iter().map(|uid| self.seq_of(uid)).collect()
    }

    /// UIDs for every sequence number in `seqs`, in order, or `None` if any is unknown.
    pub(crate) fn local_uids(&self, seqs: &SequenceSet) -> Option<Vec<Uid>> {
        seqs.iter().map(|seq| self.uid_of(seq)).collect()
    }

    pub(crate) fn subscribe(&mut self) -> mpsc::Receiver<FolderEvent> {
        let (tx, rx) = mpsc::channel();
        self.observers.push(tx);
        rx
    }

    fn emit(&mut self, event: FolderEvent) {
        log::trace!("{}: {:?}", self.full_name, event);
        self.observers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub(crate) fn flush_notifications(&mut self) {
        if self.count != self.notified_count {
            self.notified_count = self.count;
            self.emit(FolderEvent::CountChanged(self.count));
        }
    }

    pub(crate) fn apply_list(&mut self, name: &Name) {
        self.listed = true;
        self.delimiter = name.delimiter();
        if name.is_lsub() {
            self.attributes |= FolderAttribute::Subscribed;
            return;
        }
        self.attributes = name.attributes();
        self.other_attributes = name.other_attributes().to_vec();
        self.exists = !self.attributes.contains(FolderAttribute::NonExistent);
    }

    pub(crate) fn set_subscribed(&mut self, subscribed: bool) {
        if subscribed {
            self.attributes |= FolderAttribute::Subscribed;
            self.emit(FolderEvent::Subscribed);
        } else {
            self.attributes.remove(FolderAttribute::Subscribed);
            self.emit(FolderEvent::Unsubscribed);
        }
    }

    pub(crate) fn mark_created(&mut self, special_use: EnumSet<FolderAttribute>) {
        self.exists = true;
        self.attributes.remove(FolderAttribute::NonExistent);
        self.attributes |= special_use;
        self.emit(FolderEvent::Created);
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.close();
        self.exists = false;
        self.emit(FolderEvent::Deleted);
    }

    /// The server said the folder does not exist.
    pub(crate) fn mark_missing(&mut self) {
        self.close();
        self.exists = false;
    }

    fn set_name(&mut self, new_name: String) {
        let old_name = std::mem::replace(&mut self.full_name, new_name.clone());
        self.emit(FolderEvent::Renamed { old_name, new_name });
    }

    /// Forget the previous selection before `SELECT`/`EXAMINE` repopulates the folder.
    pub(crate) fn begin_open(&mut self) {
        self.uids.clear();
        self.recent = 0;
        self.first_unseen = None;
    }

    pub(crate) fn open(&mut self, access: FolderAccess) {
        self.exists = true;
        self.access = Some(access);
        self.emit(FolderEvent::Opened(access));
    }

    pub(crate) fn close(&mut self) {
        if self.access.take().is_some() {
            self.uids.clear();
            self.emit(FolderEvent::Closed);
        }
    }

    pub(crate) fn apply_flags(&mut self, flags: Vec<Flag>) {
        self.flags = flags;
    }

    pub(crate) fn apply_exists(&mut self, count: u32) {
        self.count = count;
        self.uids.retain(|&seq, _| seq <= count);
    }

    pub(crate) fn apply_recent(&mut self, recent: u32) {
        if self.recent != recent {
            self.recent = recent;
            self.emit(FolderEvent::RecentChanged(recent));
        }
    }

    pub(crate) fn apply_expunge(&mut self, seq: Seq) {
        if seq == 0 || seq > self.count {
            log::warn!(
                "{}: ignoring EXPUNGE of {} with {} messages",
                self.full_name,
                seq,
                self.count
            );
            return;
        }
        self.uids.remove(&seq);
        let shifted = self.uids.split_off(&seq);
        self.uids.extend(shifted.into_iter().map(|(later, uid)| (later - 1, uid)));
        self.count -= 1;
        self.emit(FolderEvent::MessageExpunged { seq });
    }

    pub(crate) fn apply_vanished(&mut self, uids: UidSet, earlier: bool) {
        if !earlier {
            let mut known = 0;
            for (seq, uid) in std::mem::take(&mut self.uids) {
                if uids.contains(uid) {
                    known += 1;
                } else {
                    self.uids.insert(seq - known, uid);
                }
            }
            let removed = u32::try_from(uids.len()).unwrap_or(u32::MAX);
            self.count = self.count.saturating_sub(removed.max(known));
            let count = self.count;
            self.uids.retain(|&seq, _| seq <= count);
        }
        self.emit(FolderEvent::MessagesVanished { uids, earlier });
    }

    pub(crate) fn apply_fetch(&mut self, seq: Seq, attributes: &[FetchAttribute]) {
        if seq == 0 {
            return;
        }
        let summary = MessageSummary::from_attributes(seq, attributes);
        if let Some(uid) = summary.uid {
            if seq <= self.count {
                self.uids.insert(seq, uid);
            } else {
                log::warn!(
                    "{}: ignoring UID of message {} with {} messages",
                    self.full_name,
                    seq,
                    self.count
                );
            }
        }
        if let Some(mod_seq) = summary.mod_seq {
            self.raise_mod_seq(mod_seq);
        }
        if attributes
            .iter()
            .any(|a| matches!(a, FetchAttribute::Flags(_)))
        {
            self.emit(FolderEvent::FlagsChanged {
                seq,
                uid: summary.uid,
                flags: summary.flags,
                mod_seq: summary.mod_seq,
            });
        }
    }

    fn raise_mod_seq(&mut self, mod_seq: u64) {
        if self.highest_mod_seq.map_or(true, |m| mod_seq > m) {
            self.set_highest_mod_seq(mod_seq);
        }
    }

    fn set_highest_mod_seq(&mut self, mod_seq: u64) {
        if self.highest_mod_seq != Some(mod_seq) {
            self.highest_mod_seq = Some(mod_seq);
            self.emit(FolderEvent::HighestModSeqChanged(mod_seq));
        }
    }

    fn set_uid_validity(&mut self, uid_validity: u32) {
        if self.uid_validity != Some(uid_validity) {
            if self.uid_validity.is_some() {
                log::debug!(
                    "{}: UIDVALIDITY changed, forgetting {} UIDs",
                    self.full_name,
                    self.uids.len()
                );
            }
            self.uid_validity = Some(uid_validity);
            self.uids.clear();
            self.emit(FolderEvent::UidValidityChanged(uid_validity));
        }
    }

    fn set_uid_next(&mut self, uid_next: Uid) {
        if self.uid_next != Some(uid_next) {
            self.uid_next = Some(uid_next);
            self.emit(FolderEvent::UidNextChanged(uid_next));
        }
    }

    fn set_id(&mut self, id: String) {
        if self.id.as_deref() != Some(id.as_str()) {
            self.id = Some(id.clone());
            self.emit(FolderEvent::IdChanged(id));
        }
    }

    /// Apply a response code received while this folder was the target of a command.
    pub(crate) fn apply_code(&mut self, code: &ResponseCode) {
        match code {
            ResponseCode::UidValidity(v) => self.set_uid_validity(*v),
            ResponseCode::UidNext(n) => self.set_uid_next(*n),
            ResponseCode::Unseen(seq) => self.first_unseen = Some(*seq),
            ResponseCode::PermanentFlags(flags) => self.permanent_flags = flags.clone(),
            ResponseCode::HighestModSeq(m) => self.set_highest_mod_seq(*m),
            ResponseCode::NoModSeq => self.highest_mod_seq = None,
            ResponseCode::MailboxId(id) => self.set_id(id.clone()),
            _ => {}
        }
    }

    pub(crate) fn apply_status(&mut self, items: &[StatusItem]) {
        for item in items {
            match item {
                StatusItem::Messages(n) => {
                    if !self.is_open() {
                        self.count = *n;
                    }
                }
                StatusItem::Recent(n) => self.apply_recent(*n),
                StatusItem::Unseen(n) => {
                    if self.unread != Some(*n) {
                        self.unread = Some(*n);
                        self.emit(FolderEvent::UnreadChanged(*n));
                    }
                }
                StatusItem::UidNext(n) => self.set_uid_next(*n),
                StatusItem::UidValidity(v) => self.set_uid_validity(*v),
                StatusItem::HighestModSeq(m) => self.set_highest_mod_seq(*m),
                StatusItem::Size(s) => {
                    if self.size != Some(*s) {
                        self.size = Some(*s);
                        self.emit(FolderEvent::SizeChanged(*s));
                    }
                }
                StatusItem::AppendLimit(limit) => {
                    if self.append_limit != *limit {
                        self.append_limit = *limit;
                        self.emit(FolderEvent::AppendLimitChanged(*limit));
                    }
                }
                StatusItem::MailboxId(id) => self.set_id(id.clone()),
                _ => {}
            }
        }
    }
}

/// The arena of folders a session knows about, keyed by normalized full name.
#[derive(Debug, Default)]
pub(crate) struct FolderStore {
    folders: Vec<Folder>,
    by_name: HashMap<String, FolderId>,
}

/// `INBOX` is case-insensitive; every other name is taken as is.
pub(crate) fn normalize(name: &str) -> String {
    if name.eq_ignore_ascii_case("INBOX") {
        "INBOX".to_string()
    } else {
        name.to_string()
    }
}

impl FolderStore {
    pub(crate) fn get_or_create(&mut self, name: &str) -> FolderId {
        let name = normalize(name);
        if let Some(id) = self.by_name.get(&name) {
            return *id;
        }
        let id = FolderId(self.folders.len());
        self.folders.push(Folder::new(name.clone()));
        self.by_name.insert(name, id);
        id
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<FolderId> {
        self.by_name.get(&normalize(name)).copied()
    }

    pub(crate) fn get(&self, id: FolderId) -> &Folder {
        &self.folders[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: FolderId) -> &mut Folder {
        &mut self.folders[id.0]
    }

    /// Rename `id`, and every folder below it in the hierarchy.
    pub(crate) fn rename(&mut self, id: FolderId, new_name: &str) {
        let old_name = self.folders[id.0].full_name.clone();
        let prefix = self.folders[id.0]
            .delimiter
            .map(|d| format!("{}{}", old_name, d));

        let mut moves = vec![(id, normalize(new_name))];
        if let Some(prefix) = prefix {
            for (i, folder) in self.folders.iter().enumerate() {
                if let Some(rest) = folder.full_name.strip_prefix(prefix.as_str()) {
                    let delimiter = &prefix[old_name.len()..];
                    moves.push((FolderId(i), format!("{}{}{}", new_name, delimiter, rest)));
                }
            }
        }

        for (id, name) in moves {
            self.by_name.remove(&self.folders[id.0].full_name);
            match self.by_name.insert(name.clone(), id) {
                // A stale record under the new name is superseded.
                Some(displaced) if displaced != id => self.folders[displaced.0].exists = false,
                _ => {}
            }
            self.folders[id.0].close();
            self.folders[id.0].set_name(name);
        }
    }

    pub(crate) fn flush_notifications(&mut self) {
        self.folders
            .iter_mut()
            .for_each(Folder::flush_notifications);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (FolderId, &Folder)> {
        self.folders
            .iter()
            .enumerate()
            .map(|(i, f)| (FolderId(i), f))
    }
}
