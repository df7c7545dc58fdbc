//! This module contains types used throughout the IMAP protocol.

pub use enumset::EnumSet;

/// From section [2.3.1.1 of RFC 3501](https://tools.ietf.org/html/rfc3501#section-2.3.1.1).
///
/// A 32-bit value assigned to each message, which when used with the unique identifier validity
/// value forms a 64-bit value that will not refer to any other message in the mailbox or any
/// subsequent mailbox with the same name forever. Unique identifiers are assigned in a strictly
/// ascending fashion in the mailbox.
///
/// Any change of unique identifiers between sessions is detectable through `UIDVALIDITY`; see
/// [`crate::FolderEvent::UidValidityChanged`].
pub type Uid = u32;

/// From section [2.3.1.2 of RFC 3501](https://tools.ietf.org/html/rfc3501#section-2.3.1.2).
///
/// A relative position from 1 to the number of messages in the mailbox, ordered by ascending
/// unique identifier. Sequence numbers shift down whenever a lower-numbered message is expunged.
pub type Seq = u32;

mod appended;
pub use self::appended::{Appended, UidMapping};

mod capabilities;
pub use self::capabilities::{Capabilities, Capability};

mod deleted;
pub use self::deleted::{Deleted, DeletedMessages};

mod fetch;
pub use self::fetch::MessageSummary;

mod flag;
pub use self::flag::Flag;

mod mailbox;
pub use self::mailbox::{StatusDataItem, StatusItem};

mod name;
pub use self::name::{FolderAttribute, Name};

mod namespace;
pub use self::namespace::{Namespace, Namespaces};

mod response;
pub use self::response::{FetchAttribute, Response, ResponseCode, Status, Untagged};

mod sequence_set;
pub use self::sequence_set::{IdSet, SeqKind, SequenceSet, UidKind, UidSet};
