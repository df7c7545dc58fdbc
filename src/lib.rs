//! An IMAP client that keeps a live model of the server's folders.
//!
//! Commands are tagged, written (with literals sent the cheapest way the server allows) and
//! matched to their tagged completions. Every response in between, solicited or not, is applied
//! to the [`Folder`] it concerns, and watchers of a folder get [`FolderEvent`]s for it.
//!
//! Operations that depend on an extension (`MOVE`, `UIDPLUS`, `MULTIAPPEND`, `REPLACE`,
//! `LIST-STATUS`, `UNSELECT`) pick between the extension and an emulation with plain IMAP4rev1
//! commands; see [`strategy`]. Both give the same result to the caller.
//!
//! # Usage
//!
//! ```no_run
//! use imap_session::{ClientBuilder, FolderAccess, FolderEvent, UidSet};
//!
//! fn main() -> imap_session::Result<()> {
//!     let client = ClientBuilder::new().connect_tcp("imap.example.com", 143)?;
//!     let mut session = client.login("user", "pass").map_err(|(e, _)| e)?;
//!
//!     let inbox = session.inbox();
//!     let events = session.watch(inbox);
//!     session.open(inbox, FolderAccess::ReadWrite)?;
//!     println!("{} messages", session.folder(inbox).count());
//!
//!     let archive = session.folder_by_name("Archive")?;
//!     let unseen: UidSet = session.search(inbox, "UNSEEN")?;
//!     let mapping = session.move_to(inbox, &unseen, archive)?;
//!     for (old, new) in mapping.iter() {
//!         println!("{} is now {:?}", old, new);
//!     }
//!
//!     for event in events.try_iter() {
//!         if let FolderEvent::CountChanged(n) = event {
//!             println!("INBOX now has {} messages", n);
//!         }
//!     }
//!     session.logout()
//! }
//! ```

mod command;
mod parse;
mod types;

pub mod authenticator;
pub mod client;
pub mod error;
pub mod extensions;
pub mod strategy;
pub mod utf7;

mod client_builder;
mod folder;
mod message;
mod reconcile;
mod shared;
mod utils;

pub use types::*;

pub use client::{Client, Connection, Greeting, Session, StoreMode};
pub use client_builder::ClientBuilder;
pub use error::{Error, ErrorKind, Result};
pub use folder::{Folder, FolderAccess, FolderEvent, FolderId, FolderSnapshot};
pub use message::{AppendRequest, MessageSource, ReplaceRequest};
pub use shared::SharedSession;

#[cfg(test)]
mod mock_stream;
