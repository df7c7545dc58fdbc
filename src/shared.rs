use std::io::{Read, Write};
use std::sync::{Arc, Mutex, TryLockError};

use crate::client::Session;
use crate::error::{Error, Result};

/// A [`Session`] that can be handed to several threads.
///
/// Only one operation runs against the connection at a time. A caller that arrives while
/// another operation is outstanding gets [`Error::Busy`] straight away instead of waiting, so
/// the tag sequence of the connection is never interleaved.
///
/// ```no_run
/// # use imap_session::{ClientBuilder, SharedSession};
/// # fn main() -> Result<(), imap_session::Error> {
/// let client = ClientBuilder::new().connect_tcp("imap.example.com", 143)?;
/// let session = client.login("user", "pass").map_err(|(e, _)| e)?;
/// let shared = SharedSession::new(session);
/// let other = shared.clone();
/// std::thread::spawn(move || other.with(|s| s.noop()));
/// shared.with(|s| s.noop())?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SharedSession<T: Read + Write> {
    inner: Arc<Mutex<Session<T>>>,
}

impl<T: Read + Write> Clone for SharedSession<T> {
    fn clone(&self) -> Self {
        SharedSession {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Read + Write> SharedSession<T> {
    /// Wrap `session` for shared use.
    pub fn new(session: Session<T>) -> Self {
        SharedSession {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Run `op` with exclusive access to the session.
    ///
    /// Fails with [`Error::Busy`] if another caller is inside `with` right now, and with
    /// [`Error::ConnectionLost`] if an earlier caller panicked half way through an operation.
    pub fn with<F, R>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&mut Session<T>) -> Result<R>,
    {
        let mut session = match self.inner.try_lock() {
            Ok(session) => session,
            Err(TryLockError::WouldBlock) => {
                log::debug!("session busy, refusing concurrent call");
                return Err(Error::Busy);
            }
            Err(TryLockError::Poisoned(_)) => return Err(Error::ConnectionLost),
        };
        op(&mut session)
    }

    /// Take the session back, if this is the last handle.
    pub fn into_inner(self) -> std::result::Result<Session<T>, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex.into_inner().map_err(|poisoned| SharedSession {
                inner: Arc::new(Mutex::new(poisoned.into_inner())),
            }),
            Err(inner) => Err(SharedSession { inner }),
        }
    }
}
