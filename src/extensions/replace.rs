//! Replacing a message in place, using the IMAP REPLACE extension specified in [RFC
//! 8508](https://tools.ietf.org/html/rfc8508) when it is available.

use std::io::{Read, Write};

use crate::client::{Session, StoreMode};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::folder::FolderId;
use crate::message::ReplaceRequest;
use crate::strategy::{self, Operation, Path};
use crate::types::{Appended, Flag, Seq, SequenceSet, Uid, UidSet};

impl<T: Read + Write> Session<T> {
    /// Replace the message with `uid` in the open folder `id` by `request`.
    ///
    /// Without `REPLACE`, the new message is appended, and the old one is marked `\Deleted` and
    /// expunged on its own.
    pub fn replace(
        &mut self,
        id: FolderId,
        uid: Uid,
        request: &ReplaceRequest,
    ) -> Result<Appended> {
        self.ensure_open(id, true)?;
        self.check_uploads(id, std::slice::from_ref(request))?;

        match strategy::choose(Operation::Replace, self.capabilities.enabled()) {
            Path::Native => {
                let utf8 = self.utf8_active();
                let target = self.with_mailbox(Command::new("UID REPLACE").arg(uid), id);
                let command = request.render(target, utf8)?;
                let done = self.run(command).map_err(|e| self.check_missing(id, e))?;
                Ok(done.append_uid().unwrap_or_default())
            }
            Path::Emulated => self.emulate_replace(id, uid, request),
        }
    }

    /// Replace the message at `seq` in the open folder `id` by `request`.
    ///
    /// The emulation also expunges the old message, exactly like [`Session::replace`].
    pub fn replace_seq(
        &mut self,
        id: FolderId,
        seq: Seq,
        request: &ReplaceRequest,
    ) -> Result<Appended> {
        self.ensure_open(id, true)?;
        if seq == 0 || seq > self.folder(id).count() {
            return Err(Error::Argument(format!(
                "no message {} in {}",
                seq,
                self.folder(id).name()
            )));
        }
        self.check_uploads(id, std::slice::from_ref(request))?;

        match strategy::choose(Operation::Replace, self.capabilities.enabled()) {
            Path::Native => {
                let utf8 = self.utf8_active();
                let target = self.with_mailbox(Command::new("REPLACE").arg(seq), id);
                let command = request.render(target, utf8)?;
                let done = self.run(command).map_err(|e| self.check_missing(id, e))?;
                Ok(done.append_uid().unwrap_or_default())
            }
            Path::Emulated => {
                let uids = self.seqs_to_uids(id, &SequenceSet::from(seq))?;
                match uids.first() {
                    Some(&uid) => self.emulate_replace(id, uid, request),
                    None => Err(Error::Argument(format!("no message {}", seq))),
                }
            }
        }
    }

    fn emulate_replace(
        &mut self,
        id: FolderId,
        uid: Uid,
        request: &ReplaceRequest,
    ) -> Result<Appended> {
        let appended = self.append(id, request)?;
        let mark = self.store_command(
            true,
            &uid.to_string(),
            StoreMode::Add,
            &[Flag::Deleted],
            true,
            None,
        )?;
        self.run(mark)?;
        self.expunge_uids(id, &UidSet::from(uid))?;
        Ok(appended)
    }
}
