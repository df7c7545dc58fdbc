//! Uploading messages, several per command with the IMAP MULTIAPPEND extension specified in [RFC
//! 3502](https://tools.ietf.org/html/rfc3502) when it is available.

use std::io::{Read, Write};

use crate::client::Session;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::folder::FolderId;
use crate::message::AppendRequest;
use crate::strategy::{self, Operation, Path};
use crate::types::{Appended, Capability};

impl<T: Read + Write> Session<T> {
    /// Upload one message to `id`.
    pub fn append(&mut self, id: FolderId, request: &AppendRequest) -> Result<Appended> {
        self.append_many(id, std::slice::from_ref(request))
    }

    /// Upload `requests` to `id`, in order.
    ///
    /// With `MULTIAPPEND` this is a single `APPEND` carrying every message; otherwise one
    /// `APPEND` per message. The UIDs come back in request order in both cases, and are left
    /// empty unless the server reported one for every message.
    ///
    /// Every message is checked against `UTF8=ACCEPT` and the append limit before anything is
    /// sent, so an oversized or unsendable message fails the whole call.
    pub fn append_many(&mut self, id: FolderId, requests: &[AppendRequest]) -> Result<Appended> {
        self.ensure_usable()?;
        if requests.is_empty() {
            return Ok(Appended::default());
        }
        self.check_uploads(id, requests)?;
        let utf8 = self.utf8_active();

        let path = if requests.len() > 1 {
            strategy::choose(Operation::AppendMany, self.capabilities.enabled())
        } else {
            Path::Native
        };
        match path {
            Path::Native => {
                let mut command = self.with_mailbox(Command::new("APPEND"), id);
                for request in requests {
                    command = request.render(command, utf8)?;
                }
                let done = self.run(command).map_err(|e| self.check_missing(id, e))?;
                Ok(match done.append_uid() {
                    Some(appended) if appended.uids.len() == requests.len() => appended,
                    Some(appended) => Appended {
                        uid_validity: appended.uid_validity,
                        uids: Vec::new(),
                    },
                    None => Appended::default(),
                })
            }
            Path::Emulated => {
                let commands = requests
                    .iter()
                    .map(|request| {
                        request.render(self.with_mailbox(Command::new("APPEND"), id), utf8)
                    })
                    .collect::<Result<Vec<_>>>()?;

                let mut result = Appended::default();
                let mut complete = true;
                for command in commands {
                    let done = self.run(command).map_err(|e| self.check_missing(id, e))?;
                    match done.append_uid() {
                        Some(appended) if appended.uids.len() == 1 => {
                            result.uid_validity = appended.uid_validity;
                            result.uids.extend(appended.uids);
                        }
                        _ => complete = false,
                    }
                }
                if !complete {
                    result.uids.clear();
                }
                Ok(result)
            }
        }
    }

    /// Fail if any of `requests` cannot be uploaded to `id`: with [`Error::NotSupported`] if it
    /// needs `UTF8=ACCEPT` and that is not active, with [`Error::TooBig`] if it exceeds the
    /// folder's or the server's limit.
    pub(crate) fn check_uploads(&self, id: FolderId, requests: &[AppendRequest]) -> Result<()> {
        if !self.utf8_active() && requests.iter().any(AppendRequest::requires_utf8) {
            return Err(Error::NotSupported(Capability::Utf8Accept));
        }
        let limit = self
            .folder(id)
            .append_limit()
            .or_else(|| self.capabilities.append_limit());
        if let Some(limit) = limit {
            if let Some(request) = requests.iter().find(|r| r.len() as u64 > limit) {
                return Err(Error::TooBig {
                    size: request.len() as u64,
                    limit,
                });
            }
        }
        Ok(())
    }
}
