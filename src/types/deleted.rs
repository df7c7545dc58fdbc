use super::{Seq, Uid, UidSet};

/// An enum representing message sequence numbers or UID sequence sets returned
/// in response to a `EXPUNGE` command.
///
/// The `EXPUNGE` command may return several `EXPUNGE` responses referencing
/// message sequence numbers, or it may return a `VANISHED` response referencing
/// multiple UID values in a sequence set if the client has enabled
/// [QRESYNC](https://tools.ietf.org/html/rfc7162#section-3.2.7).
///
/// `Deleted` implements some iterators to make it easy to use. If the caller
/// knows that they should be receiving an `EXPUNGE` or `VANISHED` response,
/// then they can use [`seqs()`](#method.seqs) to get an iterator over `EXPUNGE`
/// message sequence numbers, or [`uids()`](#method.uids) to get an iterator over
/// the `VANISHED` UIDs.
///
/// Each expunged sequence number is the one the message had at the moment the server reported
/// it, so later numbers already account for earlier removals.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Deleted {
    /// The list of messages that were expunged
    pub messages: DeletedMessages,
    /// The mod sequence of the performed operation, if the `QRESYNC` extension
    /// is enabled.
    pub mod_seq: Option<u64>,
}

/// The messages that were expunged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletedMessages {
    /// Message sequence numbers, in the order the server reported them.
    Expunged(Vec<Seq>),
    /// UIDs, when `QRESYNC` is active.
    Vanished(UidSet),
}

impl Deleted {
    pub(crate) fn new(expunged: Vec<Seq>, vanished: UidSet, mod_seq: Option<u64>) -> Self {
        let messages = if expunged.is_empty() && !vanished.is_empty() {
            DeletedMessages::Vanished(vanished)
        } else {
            DeletedMessages::Expunged(expunged)
        };
        Deleted { messages, mod_seq }
    }

    /// Return an iterator over message sequence numbers from an `EXPUNGE`
    /// response. If the client is expecting sequence numbers this function
    /// can be used to ensure only sequence numbers returned.
    pub fn seqs(&self) -> impl Iterator<Item = Seq> + '_ {
        let seqs: &[Seq] = match &self.messages {
            DeletedMessages::Expunged(s) => s,
            DeletedMessages::Vanished(_) => &[],
        };
        seqs.iter().copied()
    }

    /// Return an iterator over UIDs returned in a `VANISHED` response.
    pub fn uids(&self) -> impl Iterator<Item = Uid> + '_ {
        let ranges: &[std::ops::RangeInclusive<u32>] = match &self.messages {
            DeletedMessages::Expunged(_) => &[],
            DeletedMessages::Vanished(s) => s.ranges(),
        };
        ranges.iter().flat_map(|range| range.clone())
    }

    /// How many messages were removed.
    pub fn len(&self) -> usize {
        match &self.messages {
            DeletedMessages::Expunged(v) => v.len(),
            DeletedMessages::Vanished(v) => v.len(),
        }
    }

    /// Return if the set is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
