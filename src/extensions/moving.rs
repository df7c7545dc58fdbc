//! Moving messages between folders, using the IMAP MOVE extension specified in [RFC
//! 6851](https://tools.ietf.org/html/rfc6851) when it is available.

use std::io::{Read, Write};

use crate::client::{Session, StoreMode};
use crate::command::Command;
use crate::error::Result;
use crate::folder::FolderId;
use crate::strategy::{self, Operation, Path};
use crate::types::{Capability, Flag, SequenceSet, UidMapping, UidSet};

impl<T: Read + Write> Session<T> {
    /// Move the messages with `uids` from the open folder `src` to `dest`.
    ///
    /// Without `MOVE`, the messages are copied, marked `\Deleted` and expunged, touching no
    /// other message. Either way the source folder ends up without them and the mapping has one
    /// pair per moved message.
    pub fn move_to(&mut self, src: FolderId, uids: &UidSet, dest: FolderId) -> Result<UidMapping> {
        self.ensure_open(src, true)?;
        if uids.is_empty() {
            return Ok(UidMapping::default());
        }

        match strategy::choose(Operation::MoveUids, self.capabilities.enabled()) {
            Path::Native => {
                let command = self.with_mailbox(Command::new("UID MOVE").arg(uids), dest);
                let done = self.run(command).map_err(|e| self.check_missing(dest, e))?;
                Ok(done
                    .copy_uid()
                    .unwrap_or_else(|| UidMapping::unknown(uids.iter())))
            }
            Path::Emulated => {
                let mapping = self.copy_to(src, uids, dest)?;
                let mark = self.store_command(
                    true,
                    &uids.to_string(),
                    StoreMode::Add,
                    &[Flag::Deleted],
                    true,
                    None,
                )?;
                self.run(mark)?;
                self.expunge_uids(src, uids)?;
                Ok(mapping)
            }
        }
    }

    /// Move the messages at `seqs` from the open folder `src` to `dest`.
    pub fn move_seqs_to(
        &mut self,
        src: FolderId,
        seqs: &SequenceSet,
        dest: FolderId,
    ) -> Result<UidMapping> {
        self.ensure_open(src, true)?;
        if seqs.is_empty() {
            return Ok(UidMapping::default());
        }

        match strategy::choose(Operation::MoveUids, self.capabilities.enabled()) {
            Path::Native => {
                let source = match self.folder(src).local_uids(seqs) {
                    Some(uids) => uids,
                    None if self.capabilities.has(Capability::UidPlus) => Vec::new(),
                    None => self.seqs_to_uids(src, seqs)?,
                };
                let command = self.with_mailbox(Command::new("MOVE").arg(seqs), dest);
                let done = self.run(command).map_err(|e| self.check_missing(dest, e))?;
                Ok(done
                    .copy_uid()
                    .unwrap_or_else(|| UidMapping::unknown(source)))
            }
            Path::Emulated => {
                let uids = self.seqs_to_uid_set(src, seqs)?;
                let mapping = self.copy_seqs_to(src, seqs, dest)?;
                let mark = self.store_command(
                    false,
                    &seqs.to_string(),
                    StoreMode::Add,
                    &[Flag::Deleted],
                    true,
                    None,
                )?;
                self.run(mark)?;
                self.expunge_uids(src, &uids)?;
                Ok(mapping)
            }
        }
    }
}
