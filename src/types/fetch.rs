use super::{FetchAttribute, Flag, Seq, Uid};

/// The flag state of one message, from a
/// [`FETCH` response](https://tools.ietf.org/html/rfc3501#section-7.4.2).
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MessageSummary {
    /// The ordinal number of this message in its containing mailbox.
    pub seq: Seq,

    /// A number expressing the unique identifier of the message.
    pub uid: Option<Uid>,

    /// The flags that are set for this message.
    pub flags: Vec<Flag>,

    /// The mod-sequence of the message, with `CONDSTORE`.
    pub mod_seq: Option<u64>,

    /// `RFC822.SIZE`, when fetched.
    pub size: Option<u32>,
}

impl MessageSummary {
    pub(crate) fn from_attributes(seq: Seq, attributes: &[FetchAttribute]) -> Self {
        let mut summary = MessageSummary {
            seq,
            ..MessageSummary::default()
        };
        for attribute in attributes {
            match attribute {
                FetchAttribute::Uid(uid) => summary.uid = Some(*uid),
                FetchAttribute::Flags(flags) => summary.flags = flags.clone(),
                FetchAttribute::ModSeq(m) => summary.mod_seq = Some(*m),
                FetchAttribute::Size(s) => summary.size = Some(*s),
                _ => {}
            }
        }
        summary
    }

    /// Whether `flag` is set.
    pub fn has_flag(&self, flag: &Flag) -> bool {
        self.flags.contains(flag)
    }
}
