use crate::client::{Client, Connection, DEFAULT_LITERAL_MINUS_LIMIT, DEFAULT_TAG_PREFIX};
use crate::error::{Error, Result};
use std::io::{Read, Write};
use std::net::TcpStream;

/// A convenience builder for [`Client`] structs over any transport.
///
/// The transport is whatever `Read + Write` stream the caller brings: a TLS stream, a TCP
/// socket or a tunnel. Creating a [`Client`] over a plain socket is straightforward:
/// ```no_run
/// # use imap_session::ClientBuilder;
/// # fn main() -> Result<(), imap_session::Error> {
/// let client = ClientBuilder::new().connect_tcp("imap.example.com", 143)?;
/// # Ok(())
/// # }
/// ```
///
/// Tags and the `LITERAL-` threshold can be adjusted before connecting:
/// ```
/// # use imap_session::ClientBuilder;
/// let mut builder = ClientBuilder::new();
/// builder.tag_prefix('X').unwrap().literal_minus_limit(1024);
/// assert!(builder.tag_prefix('x').is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    tag_prefix: char,
    literal_minus_limit: usize,
    read_greeting: bool,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        ClientBuilder {
            tag_prefix: 'A',
            literal_minus_limit: DEFAULT_LITERAL_MINUS_LIMIT,
            read_greeting: true,
        }
    }
}

impl ClientBuilder {
    /// Make a new `ClientBuilder` with the default settings: tags `A00000001`, `A00000002`, ...,
    /// a 4096-byte `LITERAL-` threshold, and a greeting read on connect.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `prefix` in front of the tag counter. It must be an uppercase ASCII letter.
    pub fn tag_prefix(&mut self, prefix: char) -> Result<&mut Self> {
        if !prefix.is_ascii_uppercase() {
            return Err(Error::Argument(format!(
                "tag prefix must be an uppercase ASCII letter, not {:?}",
                prefix
            )));
        }
        self.tag_prefix = prefix;
        Ok(self)
    }

    /// The largest literal sent without waiting for a continuation when the server has
    /// `LITERAL-` (or is `IMAP4rev2`) but not `LITERAL+`.
    pub fn literal_minus_limit(&mut self, limit: usize) -> &mut Self {
        self.literal_minus_limit = limit;
        self
    }

    /// Whether [`connect`](Self::connect) reads the server greeting. Turn this off to call
    /// [`Client::read_greeting`] yourself.
    pub fn read_greeting(&mut self, read: bool) -> &mut Self {
        self.read_greeting = read;
        self
    }

    /// Make a [`Client`] over an established stream.
    ///
    /// A `BYE` greeting is returned as [`Error::Bye`].
    pub fn connect<T: Read + Write>(&self, stream: T) -> Result<Client<T>> {
        let mut client = Client::from_connection(Connection::new(
            stream,
            self.tag_prefix.to_string(),
            self.literal_minus_limit,
        ));
        if self.read_greeting {
            let greeting = client.read_greeting()?;
            log::debug!("greeted with {:?}", greeting);
        }
        Ok(client)
    }

    /// Open a plain TCP connection and [`connect`](Self::connect) over it.
    pub fn connect_tcp(&self, domain: &str, port: u16) -> Result<Client<TcpStream>> {
        let tcp = TcpStream::connect((domain, port))?;
        self.connect(tcp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_stream::MockStream;
    use crate::types::Capability;

    #[test]
    fn default_prefix() {
        assert_eq!(DEFAULT_TAG_PREFIX, "A");
        assert_eq!(ClientBuilder::new().tag_prefix, 'A');
    }

    #[test]
    fn custom_prefix_and_greeting() {
        let stream = MockStream::new(
            b"* OK [CAPABILITY IMAP4rev1 LITERAL-] ready\r\nZ00000001 OK done\r\n".to_vec(),
        );
        let mut builder = ClientBuilder::new();
        builder.tag_prefix('Z').unwrap();
        let client = builder.connect(stream).unwrap();
        assert!(client.capabilities().has(Capability::LiteralMinus));
        let session = client.preauthenticated().unwrap();
        assert!(session.stream.get_ref().written_buf.is_empty());
    }

    #[test]
    fn bye_greeting() {
        let stream = MockStream::new(b"* BYE go away\r\n".to_vec());
        match ClientBuilder::new().connect(stream) {
            Err(Error::Bye(bye)) => assert_eq!(bye.information, "go away"),
            other => panic!("{:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn rejects_bad_prefix() {
        let mut builder = ClientBuilder::new();
        assert!(matches!(builder.tag_prefix('1'), Err(Error::Argument(_))));
        assert!(matches!(builder.tag_prefix('é'), Err(Error::Argument(_))));
    }
}
