use super::{Flag, Name, Namespaces, Seq, StatusItem, Uid, UidSet};

/// The status of a tagged or untagged condition response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// `OK`
    Ok,
    /// `NO`
    No,
    /// `BAD`
    Bad,
    /// `PREAUTH`, only ever in the greeting.
    PreAuth,
    /// `BYE`
    Bye,
}

/// A response code, the bracketed part of a status response.
///
/// From [RFC 3501 section 7.1](https://tools.ietf.org/html/rfc3501#section-7.1) and the
/// extensions this crate speaks.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResponseCode {
    /// `ALERT`; the text must be shown to the user.
    Alert,
    /// `PARSE`
    Parse,
    /// `READ-ONLY`
    ReadOnly,
    /// `READ-WRITE`
    ReadWrite,
    /// `TRYCREATE`; the destination folder does not exist yet.
    TryCreate,
    /// `UIDNEXT`
    UidNext(Uid),
    /// `UIDVALIDITY`
    UidValidity(u32),
    /// `UNSEEN`, the sequence number of the first unseen message.
    Unseen(Seq),
    /// `PERMANENTFLAGS`
    PermanentFlags(Vec<Flag>),
    /// `CAPABILITY`
    Capabilities(Vec<String>),
    /// `HIGHESTMODSEQ`
    HighestModSeq(u64),
    /// `NOMODSEQ`
    NoModSeq,
    /// `APPENDUID`, with UIDs in the order the messages were appended.
    AppendUid {
        /// The `UIDVALIDITY` of the destination.
        uid_validity: u32,
        /// The assigned UIDs.
        uids: Vec<Uid>,
    },
    /// `COPYUID`; `source[i]` was copied to `destination[i]`.
    CopyUid {
        /// The `UIDVALIDITY` of the destination.
        uid_validity: u32,
        /// Source UIDs, in the server's order.
        source: Vec<Uid>,
        /// Destination UIDs, in the same order.
        destination: Vec<Uid>,
    },
    /// `UIDNOTSTICKY`
    UidNotSticky,
    /// `MAILBOXID`
    MailboxId(String),
    /// `CLOSED`; the previously selected folder is no longer selected.
    Closed,
    /// `NONEXISTENT`
    NonExistent,
    /// `ALREADYEXISTS`
    AlreadyExists,
    /// `TOOBIG`
    TooBig,
    /// `OVERQUOTA`
    OverQuota,
    /// `LIMIT`
    Limit,
    /// `USEATTR`; the special-use attribute cannot be used.
    UseAttr,
    /// `MODIFIED`, the UIDs a conditional STORE left alone.
    Modified(UidSet),
    /// A code this crate does not interpret.
    Other {
        /// The upper-cased code name.
        name: String,
        /// Whatever followed the name.
        text: Option<String>,
    },
}

/// A parsed attribute of a `FETCH` response.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FetchAttribute {
    /// `UID`
    Uid(Uid),
    /// `FLAGS`
    Flags(Vec<Flag>),
    /// `MODSEQ`
    ModSeq(u64),
    /// `RFC822.SIZE`
    Size(u32),
    /// `INTERNALDATE`, unparsed.
    InternalDate(String),
    /// `EMAILID`
    EmailId(String),
    /// `THREADID`
    ThreadId(Option<String>),
    /// Any other attribute, by name.
    Other(String),
}

/// Server data that is not a command completion.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Untagged {
    /// `* OK|NO|BAD|PREAUTH|BYE [code] text`.
    ///
    /// `bare` is set when the server left out the status word and sent only a bracketed code;
    /// such lines are treated as `OK`.
    Condition {
        /// The status word.
        status: Status,
        /// The response code, if any.
        code: Option<ResponseCode>,
        /// The human-readable text.
        text: String,
        /// The status word was missing.
        bare: bool,
    },
    /// `CAPABILITY`
    Capabilities(Vec<String>),
    /// `ENABLED`
    Enabled(Vec<String>),
    /// `FLAGS`, the flags defined in the selected folder.
    Flags(Vec<Flag>),
    /// `LIST` or `LSUB`
    List(Name),
    /// `STATUS`, with the folder name still in its wire encoding.
    Status {
        /// The folder.
        mailbox: String,
        /// The reported values.
        items: Vec<StatusItem>,
    },
    /// `SEARCH`, plus the `MODSEQ` of a CONDSTORE search.
    Search {
        /// Matching identifiers.
        ids: Vec<u32>,
        /// Highest mod-sequence of the matches.
        mod_seq: Option<u64>,
    },
    /// `NAMESPACE`
    Namespace(Namespaces),
    /// `n EXISTS`
    Exists(u32),
    /// `n RECENT`
    Recent(u32),
    /// `n EXPUNGE`
    Expunge(Seq),
    /// `VANISHED`
    Vanished {
        /// `(EARLIER)` was present: the UIDs were expunged before this session saw them.
        earlier: bool,
        /// The expunged UIDs.
        uids: UidSet,
    },
    /// `n FETCH (...)`
    Fetch {
        /// The message.
        seq: Seq,
        /// The attributes.
        attributes: Vec<FetchAttribute>,
    },
    /// An untagged line this crate does not understand, verbatim.
    Other(String),
}

/// One complete server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `+ text`, a command continuation request.
    Continue {
        /// The response code, if any.
        code: Option<ResponseCode>,
        /// Text or base64 challenge.
        text: String,
    },
    /// `tag OK|NO|BAD [code] text`
    Tagged {
        /// The completed command.
        tag: String,
        /// `Ok`, `No` or `Bad`.
        status: Status,
        /// The response code, if any.
        code: Option<ResponseCode>,
        /// The human-readable text.
        text: String,
    },
    /// Any `*` response.
    Untagged(Untagged),
}
