//! Listing subfolders together with their counters, using the IMAP LIST-STATUS extension
//! specified in [RFC 5819](https://tools.ietf.org/html/rfc5819) when it is available.

use std::io::{Read, Write};

use enumset::EnumSet;

use crate::client::Session;
use crate::command::{validate_str, Command};
use crate::error::{Error, Result};
use crate::folder::FolderId;
use crate::strategy::{self, Operation, Path};
use crate::types::{FolderAttribute, StatusDataItem};
use crate::utils::iter_join;

impl<T: Read + Write> Session<T> {
    /// The direct children of `parent`, in the order the server listed them. With
    /// `subscribed_only`, only subscribed children are returned.
    ///
    /// When `items` is not empty, each child's counters are refreshed as well: with
    /// `LIST-STATUS` in the same command, otherwise with one `STATUS` per selectable child (a
    /// child the server refuses `STATUS` for is skipped).
    ///
    /// A folder without a hierarchy delimiter cannot have children; for it the result is empty
    /// and nothing is sent.
    pub fn subfolders(
        &mut self,
        parent: FolderId,
        subscribed_only: bool,
        items: EnumSet<StatusDataItem>,
    ) -> Result<Vec<FolderId>> {
        for item in items.iter() {
            if let Some(cap) = item.required_capability() {
                self.require(cap)?;
            }
        }
        self.ensure_listed(parent)?;
        let pattern = match self.children_pattern(parent) {
            Some(pattern) => pattern,
            None => return Ok(Vec::new()),
        };
        let utf8 = self.utf8_active();

        let path = if items.is_empty() {
            Path::Emulated
        } else {
            strategy::choose(Operation::ListWithStatus, self.capabilities.enabled())
        };
        let children = match path {
            Path::Native => {
                let mut command = Command::new("LIST");
                if subscribed_only {
                    command = command.arg("(SUBSCRIBED)");
                }
                let command = command.string("", utf8).string(&pattern, utf8).arg(format!(
                    "RETURN (CHILDREN STATUS ({}))",
                    iter_join(items.iter().map(StatusDataItem::atom), " ")
                ));
                let done = self.run(command)?;
                self.child_ids(parent, done.names().map(|n| n.name().to_string()).collect())
            }
            Path::Emulated => {
                let verb = if subscribed_only { "LSUB" } else { "LIST" };
                let command = Command::new(verb)
                    .string("", utf8)
                    .string(&pattern, utf8);
                let done = self.run(command)?;
                let children =
                    self.child_ids(parent, done.names().map(|n| n.name().to_string()).collect());
                if !items.is_empty() {
                    self.status_each(&children, items)?;
                }
                children
            }
        };
        Ok(children)
    }

    /// The direct child of `parent` called `name`.
    pub fn subfolder(&mut self, parent: FolderId, name: &str) -> Result<FolderId> {
        validate_str("LIST", "mailbox", name)?;
        self.ensure_listed(parent)?;
        let folder = self.folder(parent);
        let full = match folder.delimiter() {
            Some(delimiter) if !name.contains(delimiter) => {
                format!("{}{}{}", folder.name(), delimiter, name)
            }
            _ => return Err(Error::FolderNotFound(name.to_string())),
        };
        let utf8 = self.utf8_active();
        let command = Command::new("LIST")
            .string("", utf8)
            .string(&self.encode_name(&full), utf8);
        self.run(command)?;
        match self.find_folder(&full) {
            Some(id) if self.folder(id).is_listed() && self.folder(id).exists() => Ok(id),
            _ => Err(Error::FolderNotFound(full)),
        }
    }

    /// `parent` + delimiter + `%`, in wire encoding, or `None` for a flat folder.
    fn children_pattern(&self, parent: FolderId) -> Option<String> {
        let folder = self.folder(parent);
        let delimiter = folder.delimiter()?;
        Some(self.encode_name(&format!("{}{}%", folder.name(), delimiter)))
    }

    /// The folders among `names` that sit directly below `parent`. A parent name containing `%`
    /// or `*` makes the pattern match more than its children, so every name is checked.
    fn child_ids(&self, parent: FolderId, names: Vec<String>) -> Vec<FolderId> {
        let folder = self.folder(parent);
        let delimiter = match folder.delimiter() {
            Some(delimiter) => delimiter,
            None => return Vec::new(),
        };
        let prefix = format!("{}{}", folder.name(), delimiter);
        names
            .into_iter()
            .filter(|name| match name.strip_prefix(prefix.as_str()) {
                Some(rest) => !rest.is_empty() && !rest.contains(delimiter),
                None => false,
            })
            .filter_map(|name| self.find_folder(&name))
            .collect()
    }

    /// Pipeline one `STATUS` per selectable folder in `ids`.
    fn status_each(&mut self, ids: &[FolderId], items: EnumSet<StatusDataItem>) -> Result<()> {
        let unselectable = FolderAttribute::NoSelect | FolderAttribute::NonExistent;
        let atoms = format!("({})", iter_join(items.iter().map(StatusDataItem::atom), " "));
        let targets: Vec<FolderId> = ids
            .iter()
            .copied()
            .filter(|&id| self.folder(id).attributes().is_disjoint(unselectable))
            .collect();
        let commands = targets
            .iter()
            .map(|&id| self.with_mailbox(Command::new("STATUS"), id).arg(&atoms))
            .collect();
        for (id, result) in targets.iter().zip(self.run_pipelined(commands)?) {
            if let Err(e) = result {
                log::debug!("STATUS of {} failed: {}", self.folder(*id).name(), e);
            }
        }
        Ok(())
    }
}
