//! Implementations of IMAP extensions, each with the fallback used when the server lacks it.
//! Which path runs is decided by [`crate::strategy::choose`].

pub mod list_status;
pub mod moving;
pub mod multiappend;
pub mod replace;
pub mod uidplus;
