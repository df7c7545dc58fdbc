use super::Uid;
use std::fmt;

/// Meta-information about a message, as returned by
/// [`APPEND`](https://tools.ietf.org/html/rfc3501#section-6.3.11).
/// Note that `APPEND` only returns any data if certain extensions are enabled,
/// for example [`UIDPLUS`](https://tools.ietf.org/html/rfc4315).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct Appended {
    /// The unique identifier validity value of the mailbox that the message was appended to.
    /// See [`Uid`] for more details. Only present if server supports [`UIDPLUS`](https://tools.ietf.org/html/rfc4315).
    pub uid_validity: Option<u32>,

    /// The unique identifiers of the appended messages, in the order they were given.
    ///
    /// Empty unless the server reported a UID for every message.
    pub uids: Vec<Uid>,
}

impl fmt::Display for Appended {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "uid_validity: {:?}, uids: {:?}",
            self.uid_validity, self.uids,
        )
    }
}

/// Where copied or moved messages ended up.
///
/// There is one pair per source message. The destination UID is known only when the server
/// reported it in a [`COPYUID`](https://tools.ietf.org/html/rfc4315#section-3) response code,
/// which needs `UIDPLUS`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UidMapping {
    uid_validity: Option<u32>,
    pairs: Vec<(Uid, Option<Uid>)>,
}

impl UidMapping {
    /// Pair `source[i]` with `destination[i]`. Returns an empty mapping if the lengths differ.
    pub fn new(uid_validity: u32, source: Vec<Uid>, destination: Vec<Uid>) -> Self {
        if source.len() != destination.len() {
            log::warn!(
                "COPYUID lists differ in length ({} vs {}), ignoring",
                source.len(),
                destination.len()
            );
            return UidMapping::default();
        }
        UidMapping {
            uid_validity: Some(uid_validity),
            pairs: source.into_iter().zip(destination.into_iter().map(Some)).collect(),
        }
    }

    /// A mapping for messages whose destination UIDs were not reported.
    pub(crate) fn unknown<I: IntoIterator<Item = Uid>>(source: I) -> Self {
        UidMapping {
            uid_validity: None,
            pairs: source.into_iter().map(|uid| (uid, None)).collect(),
        }
    }

    /// The `UIDVALIDITY` of the destination folder, if the server reported it.
    pub fn uid_validity(&self) -> Option<u32> {
        self.uid_validity
    }

    /// The source UIDs, in order.
    pub fn source(&self) -> impl Iterator<Item = Uid> + '_ {
        self.pairs.iter().map(|&(s, _)| s)
    }

    /// The destination UIDs, in the order of their sources. Empty if they were not reported.
    pub fn destination(&self) -> impl Iterator<Item = Uid> + '_ {
        self.pairs.iter().filter_map(|&(_, d)| d)
    }

    /// Iterate over `(source, destination)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Uid, Option<Uid>)> + '_ {
        self.pairs.iter().copied()
    }

    /// The destination UID of `source`, if it was reported.
    pub fn get(&self, source: Uid) -> Option<Uid> {
        self.pairs
            .iter()
            .find(|&&(s, _)| s == source)
            .and_then(|&(_, d)| d)
    }

    /// Whether the server reported where the messages went.
    pub fn has_destinations(&self) -> bool {
        !self.pairs.is_empty() && self.pairs.iter().all(|(_, d)| d.is_some())
    }

    /// The number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_lists_are_dropped() {
        assert!(UidMapping::new(7, vec![1, 2], vec![10]).is_empty());
        let m = UidMapping::new(7, vec![4, 2], vec![10, 11]);
        assert_eq!(m.get(2), Some(11));
        assert_eq!(m.uid_validity(), Some(7));
        assert!(m.has_destinations());
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![(4, Some(10)), (2, Some(11))]);
    }

    #[test]
    fn unknown_destinations_keep_sources() {
        let m = UidMapping::unknown(vec![3, 5]);
        assert_eq!(m.len(), 2);
        assert_eq!(m.source().collect::<Vec<_>>(), vec![3, 5]);
        assert_eq!(m.destination().count(), 0);
        assert_eq!(m.get(3), None);
        assert!(!m.has_destinations());
    }
}
