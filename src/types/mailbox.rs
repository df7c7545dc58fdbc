use enumset::{EnumSet, EnumSetType};
use std::fmt;

use super::{Capability, Uid};

/// A data item that can be requested with `STATUS`, or with `LIST ... RETURN (STATUS ...)`.
#[derive(EnumSetType, Debug, Hash)]
pub enum StatusDataItem {
    /// The number of messages in the mailbox.
    Messages,
    /// The number of messages with the `\Recent` flag set.
    Recent,
    /// The next unique identifier value of the mailbox.
    UidNext,
    /// The unique identifier validity value of the mailbox.
    UidValidity,
    /// The number of messages which do not have the `\Seen` flag set.
    Unseen,
    /// The highest mod-sequence value of all messages in the mailbox. Needs `CONDSTORE`.
    HighestModSeq,
    /// The total size of the mailbox in octets. Needs `STATUS=SIZE`.
    Size,
    /// The per-mailbox append limit. Needs `APPENDLIMIT`.
    AppendLimit,
    /// The server's stable identifier for the mailbox. Needs `OBJECTID`.
    MailboxId,
}

impl StatusDataItem {
    /// The extension the server must have before this item may be requested.
    pub fn required_capability(self) -> Option<Capability> {
        match self {
            StatusDataItem::HighestModSeq => Some(Capability::CondStore),
            StatusDataItem::Size => Some(Capability::StatusSize),
            StatusDataItem::AppendLimit => Some(Capability::AppendLimit),
            StatusDataItem::MailboxId => Some(Capability::ObjectId),
            _ => None,
        }
    }

    /// The common set of counters.
    pub fn counts() -> EnumSet<StatusDataItem> {
        StatusDataItem::Messages
            | StatusDataItem::Recent
            | StatusDataItem::UidNext
            | StatusDataItem::UidValidity
            | StatusDataItem::Unseen
    }

    pub(crate) fn atom(self) -> &'static str {
        match self {
            StatusDataItem::Messages => "MESSAGES",
            StatusDataItem::Recent => "RECENT",
            StatusDataItem::UidNext => "UIDNEXT",
            StatusDataItem::UidValidity => "UIDVALIDITY",
            StatusDataItem::Unseen => "UNSEEN",
            StatusDataItem::HighestModSeq => "HIGHESTMODSEQ",
            StatusDataItem::Size => "SIZE",
            StatusDataItem::AppendLimit => "APPENDLIMIT",
            StatusDataItem::MailboxId => "MAILBOXID",
        }
    }
}

impl fmt::Display for StatusDataItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.atom())
    }
}

/// One value from a `STATUS` response.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StatusItem {
    /// `MESSAGES`
    Messages(u32),
    /// `RECENT`
    Recent(u32),
    /// `UIDNEXT`
    UidNext(Uid),
    /// `UIDVALIDITY`
    UidValidity(u32),
    /// `UNSEEN`
    Unseen(u32),
    /// `DELETED`
    Deleted(u32),
    /// `HIGHESTMODSEQ`
    HighestModSeq(u64),
    /// `SIZE`
    Size(u64),
    /// `APPENDLIMIT`; `None` when the server reports `NIL`.
    AppendLimit(Option<u64>),
    /// `MAILBOXID`
    MailboxId(String),
    /// An item this crate does not interpret.
    Other(String),
}
