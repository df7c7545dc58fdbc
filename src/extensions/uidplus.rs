//! Copying and targeted expunging, using the IMAP UIDPLUS extension specified in [RFC
//! 4315](https://tools.ietf.org/html/rfc4315) when it is available.

use std::io::{Read, Write};

use crate::client::{Session, StoreMode};
use crate::command::Command;
use crate::error::Result;
use crate::folder::FolderId;
use crate::strategy::{self, Operation, Path};
use crate::types::{Deleted, Flag, SequenceSet, UidMapping, UidSet};

impl<T: Read + Write> Session<T> {
    /// Copy the messages with `uids` from the open folder `src` to `dest`.
    ///
    /// With `UIDPLUS` this is a `UID COPY`, and the mapping carries the destination UIDs from the
    /// `[COPYUID]` code. Without it, the UIDs are translated to sequence numbers first and the
    /// mapping pairs every copied message with an unknown destination.
    pub fn copy_to(&mut self, src: FolderId, uids: &UidSet, dest: FolderId) -> Result<UidMapping> {
        self.ensure_open(src, false)?;
        if uids.is_empty() {
            return Ok(UidMapping::default());
        }

        match strategy::choose(Operation::CopyUids, self.capabilities.enabled()) {
            Path::Native => {
                let command = self.with_mailbox(Command::new("UID COPY").arg(uids), dest);
                let done = self.run(command).map_err(|e| self.check_missing(dest, e))?;
                Ok(done
                    .copy_uid()
                    .unwrap_or_else(|| UidMapping::unknown(uids.iter())))
            }
            Path::Emulated => {
                let seqs = self.uids_to_seqs(src, uids)?;
                if seqs.is_empty() {
                    return Ok(UidMapping::default());
                }
                let source = if seqs.len() == uids.len() {
                    uids.iter().collect()
                } else {
                    self.seqs_to_uids(src, &seqs)?
                };
                let command = self.with_mailbox(Command::new("COPY").arg(&seqs), dest);
                self.run(command).map_err(|e| self.check_missing(dest, e))?;
                Ok(UidMapping::unknown(source))
            }
        }
    }

    /// Copy the messages at `seqs` in the open folder `src` to `dest`.
    pub fn copy_seqs_to(
        &mut self,
        src: FolderId,
        seqs: &SequenceSet,
        dest: FolderId,
    ) -> Result<UidMapping> {
        self.ensure_open(src, false)?;
        if seqs.is_empty() {
            return Ok(UidMapping::default());
        }

        let path = strategy::choose(Operation::CopyUids, self.capabilities.enabled());
        let source = match path {
            Path::Native => None,
            Path::Emulated => Some(self.seqs_to_uids(src, seqs)?),
        };
        let command = self.with_mailbox(Command::new("COPY").arg(seqs), dest);
        let done = self.run(command).map_err(|e| self.check_missing(dest, e))?;
        match (done.copy_uid(), source) {
            (Some(mapping), _) => Ok(mapping),
            (None, Some(source)) => Ok(UidMapping::unknown(source)),
            (None, None) => Ok(UidMapping::unknown(self.seqs_to_uids(src, seqs)?)),
        }
    }

    /// Permanently remove the messages with `uids` from the open folder `id`, provided they are
    /// marked `\Deleted`. Other messages marked `\Deleted` stay.
    ///
    /// Without `UIDPLUS`, the other deleted messages have `\Deleted` removed for the duration
    /// of a plain `EXPUNGE` and restored afterwards.
    pub fn expunge_uids(&mut self, id: FolderId, uids: &UidSet) -> Result<Deleted> {
        self.ensure_open(id, true)?;
        if uids.is_empty() {
            return Ok(Deleted::new(Vec::new(), UidSet::new(), None));
        }

        match strategy::choose(Operation::ExpungeUids, self.capabilities.enabled()) {
            Path::Native => {
                let done = self.run(Command::new("UID EXPUNGE").arg(uids))?;
                Ok(done.deleted())
            }
            Path::Emulated => {
                let done = self.run(Command::new("UID SEARCH").arg("DELETED"))?;
                let deleted: UidSet = done.search_results().collect();
                let others = deleted.difference(uids);

                if !others.is_empty() {
                    let unmark = self.store_command(
                        true,
                        &others.to_string(),
                        StoreMode::Remove,
                        &[Flag::Deleted],
                        true,
                        None,
                    )?;
                    self.run(unmark)?;
                }
                let expunged = self.run(Command::new("EXPUNGE"));
                if !others.is_empty() {
                    let restore = self.store_command(
                        true,
                        &others.to_string(),
                        StoreMode::Add,
                        &[Flag::Deleted],
                        true,
                        None,
                    )?;
                    self.run(restore)?;
                }
                Ok(expunged?.deleted())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::mock_stream::{mock_open, mock_session};
    use crate::types::{SequenceSet, UidSet};

    fn written(session: &crate::Session<crate::mock_stream::MockStream>) -> String {
        String::from_utf8(session.stream.get_ref().written_buf.clone()).unwrap()
    }

    #[test]
    fn copy_with_uidplus() {
        let mut session = mock_session(
            &["IMAP4rev1", "UIDPLUS"],
            b"A00000001 OK [COPYUID 38505 304,319:320 3956:3958] Done\r\n",
        );
        let inbox = mock_open(&mut session, "INBOX", 0, &[]);
        let dest = session.folder_by_name("Archive").unwrap();
        let uids: UidSet = "304,319:320".parse().unwrap();
        let mapping = session.copy_to(inbox, &uids, dest).unwrap();
        assert_eq!(written(&session), "A00000001 UID COPY 304,319:320 \"Archive\"\r\n");
        assert_eq!(mapping.uid_validity(), Some(38505));
        assert_eq!(mapping.get(319), Some(3957));
        assert_eq!(mapping.len(), 3);
    }

    #[test]
    fn bare_copyuid_is_accepted() {
        let mut session = mock_session(
            &["IMAP4rev1", "UIDPLUS"],
            b"* [COPYUID 7 5 9]\r\nA00000001 OK Done\r\n",
        );
        let inbox = mock_open(&mut session, "INBOX", 0, &[]);
        let dest = session.folder_by_name("Archive").unwrap();
        let mapping = session.copy_to(inbox, &UidSet::from(5), dest).unwrap();
        assert_eq!(mapping.get(5), Some(9));
    }

    #[test]
    fn copy_without_uidplus() {
        let mut session = mock_session(&["IMAP4rev1"], b"A00000001 OK Done\r\n");
        let inbox = mock_open(&mut session, "INBOX", 4, &[11, 12, 13, 14]);
        let dest = session.folder_by_name("Archive").unwrap();
        let mapping = session
            .copy_to(inbox, &"12:13".parse().unwrap(), dest)
            .unwrap();
        assert_eq!(written(&session), "A00000001 COPY 2:3 \"Archive\"\r\n");
        assert_eq!(mapping.len(), 2);
        assert!(!mapping.has_destinations());
    }

    #[test]
    fn copy_to_missing_folder() {
        let mut session = mock_session(
            &["IMAP4rev1", "UIDPLUS"],
            b"A00000001 NO [TRYCREATE] No such mailbox\r\n",
        );
        let inbox = mock_open(&mut session, "INBOX", 1, &[1]);
        let dest = session.folder_by_name("Nowhere").unwrap();
        assert!(matches!(
            session.copy_to(inbox, &UidSet::from(1), dest),
            Err(crate::Error::FolderNotFound(_))
        ));
        assert!(!session.folder(dest).exists());
    }

    #[test]
    fn copy_seqs_without_uidplus_resolves_uids() {
        let mut session = mock_session(&["IMAP4rev1"], b"A00000001 OK Done\r\n");
        let inbox = mock_open(&mut session, "INBOX", 2, &[7, 8]);
        let dest = session.folder_by_name("Archive").unwrap();
        let mapping = session
            .copy_seqs_to(inbox, &SequenceSet::from(2), dest)
            .unwrap();
        assert_eq!(mapping.source().collect::<Vec<_>>(), vec![8]);
    }

    #[test]
    fn uid_expunge() {
        let mut session = mock_session(
            &["IMAP4rev1", "UIDPLUS"],
            b"* 2 EXPUNGE\r\nA00000001 OK Done\r\n",
        );
        let inbox = mock_open(&mut session, "INBOX", 3, &[5, 6, 7]);
        let deleted = session.expunge_uids(inbox, &UidSet::from(6)).unwrap();
        assert_eq!(written(&session), "A00000001 UID EXPUNGE 6\r\n");
        assert_eq!(deleted.seqs().collect::<Vec<_>>(), vec![2]);
        assert_eq!(session.folder(inbox).count(), 2);
        assert_eq!(session.folder(inbox).uid_of(2), Some(7));
    }

    #[test]
    fn emulated_expunge_protects_other_deleted_messages() {
        let mut session = mock_session(
            &["IMAP4rev1", "UIDPLUS"],
            b"* SEARCH 5 6\r\nA00000001 OK Done\r\n\
              A00000002 OK Done\r\n\
              * 2 EXPUNGE\r\nA00000003 OK Done\r\n\
              A00000004 OK Done\r\n",
        );
        session.disable_capability(crate::Capability::UidPlus);
        let inbox = mock_open(&mut session, "INBOX", 3, &[5, 6, 7]);
        let deleted = session.expunge_uids(inbox, &UidSet::from(6)).unwrap();
        assert_eq!(
            written(&session),
            "A00000001 UID SEARCH DELETED\r\n\
             A00000002 UID STORE 5 -FLAGS.SILENT (\\Deleted)\r\n\
             A00000003 EXPUNGE\r\n\
             A00000004 UID STORE 5 +FLAGS.SILENT (\\Deleted)\r\n"
        );
        assert_eq!(deleted.seqs().collect::<Vec<_>>(), vec![2]);
        assert_eq!(session.folder(inbox).count(), 2);
    }
}
