//! Translating between UIDs and sequence numbers in the open folder.
//!
//! The folder's UID map answers most lookups without I/O. Whatever it cannot answer is asked of
//! the server: `SEARCH UID` for sequence numbers, `FETCH (UID)` for UIDs. A `FETCH` reply also
//! fills in the map.

use std::io::{Read, Write};

use crate::client::Session;
use crate::command::Command;
use crate::error::{Error, ParseError, Result};
use crate::folder::FolderId;
use crate::types::{SequenceSet, Uid, UidSet};

impl<T: Read + Write> Session<T> {
    /// The current sequence numbers of `uids` in the open folder `id`. UIDs that no longer exist
    /// are left out.
    pub fn uids_to_seqs(&mut self, id: FolderId, uids: &UidSet) -> Result<SequenceSet> {
        self.ensure_open(id, false)?;
        if uids.is_empty() {
            return Ok(SequenceSet::new());
        }
        if let Some(seqs) = self.folder(id).local_seqs(uids) {
            return Ok(seqs);
        }
        log::debug!("looking up sequence numbers of {}", uids);
        let done = self.run(Command::new("SEARCH").arg("UID").arg(uids))?;
        Ok(done.search_results().collect())
    }

    /// The UIDs of `seqs` in the open folder `id`, in sequence order.
    pub fn seqs_to_uids(&mut self, id: FolderId, seqs: &SequenceSet) -> Result<Vec<Uid>> {
        self.ensure_open(id, false)?;
        if seqs.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(uids) = self.folder(id).local_uids(seqs) {
            return Ok(uids);
        }
        log::debug!("looking up UIDs of {}", seqs);
        let done = self.run(Command::new("FETCH").arg(seqs).arg("(UID)"))?;
        let mut pairs: Vec<(u32, Uid)> = done
            .fetches()
            .filter(|m| seqs.contains(m.seq))
            .filter_map(|m| m.uid.map(|uid| (m.seq, uid)))
            .collect();
        if pairs.len() != seqs.len() {
            return Err(Error::Parse(ParseError::Unexpected(format!(
                "FETCH {} returned {} UIDs",
                seqs,
                pairs.len()
            ))));
        }
        pairs.sort_unstable();
        Ok(pairs.into_iter().map(|(_, uid)| uid).collect())
    }

    /// The UIDs of `seqs` as a set.
    pub(crate) fn seqs_to_uid_set(&mut self, id: FolderId, seqs: &SequenceSet) -> Result<UidSet> {
        Ok(self.seqs_to_uids(id, seqs)?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::mock_stream::{mock_open, mock_session};
    use crate::types::{SequenceSet, UidSet};

    #[test]
    fn local_map_needs_no_io() {
        let mut session = mock_session(&["IMAP4rev1"], b"");
        let id = mock_open(&mut session, "INBOX", 3, &[10, 11, 15]);
        let seqs = session
            .uids_to_seqs(id, &"11,15".parse::<UidSet>().unwrap())
            .unwrap();
        assert_eq!(seqs.to_string(), "2:3");
        let uids = session
            .seqs_to_uids(id, &SequenceSet::from_range(1..=2))
            .unwrap();
        assert_eq!(uids, vec![10, 11]);
        assert!(session.stream.get_ref().written_buf.is_empty());
    }

    #[test]
    fn unknown_uids_are_searched() {
        let mut session = mock_session(
            &["IMAP4rev1"],
            b"* SEARCH 2 4\r\nA00000001 OK SEARCH completed\r\n",
        );
        let id = mock_open(&mut session, "INBOX", 4, &[]);
        let seqs = session
            .uids_to_seqs(id, &"20,40".parse::<UidSet>().unwrap())
            .unwrap();
        assert_eq!(seqs.to_string(), "2,4");
        assert_eq!(
            session.stream.get_ref().written_buf,
            b"A00000001 SEARCH UID 20,40\r\n"
        );
    }

    #[test]
    fn unknown_seqs_are_fetched() {
        let mut session = mock_session(
            &["IMAP4rev1"],
            b"* 2 FETCH (UID 31)\r\n* 1 FETCH (UID 30)\r\nA00000001 OK FETCH completed\r\n",
        );
        let id = mock_open(&mut session, "INBOX", 2, &[]);
        let uids = session
            .seqs_to_uids(id, &SequenceSet::from_range(1..=2))
            .unwrap();
        assert_eq!(uids, vec![30, 31]);
        assert_eq!(session.folder(id).seq_of(31), Some(2));
    }
}
