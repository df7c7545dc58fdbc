use crate::error::{Error, Result};
use std::fmt;

/// With the exception of [`Flag::Keyword`], these flags are system flags that are pre-defined in
/// [RFC 3501 section 2.3.2](https://tools.ietf.org/html/rfc3501#section-2.3.2). All system flags
/// begin with `\` in the IMAP protocol.
///
/// Flag names are case-insensitive on the wire; system flags are recognized regardless of case.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum Flag {
    /// Message has been read
    Seen,

    /// Message has been answered
    Answered,

    /// Message is "flagged" for urgent/special attention
    Flagged,

    /// Message is "deleted" for removal by later EXPUNGE
    Deleted,

    /// Message has not completed composition (marked as a draft).
    Draft,

    /// Message is "recently" arrived in this mailbox. Session-only, and can not be stored.
    Recent,

    /// The [`Folder::permanent_flags`](crate::Folder::permanent_flags) can include this special
    /// flag (`\*`), which indicates that it is possible to create new keywords by attempting to
    /// store those flags in the mailbox.
    MayCreate,

    /// A keyword, or a system flag this crate does not know about.
    Keyword(String),
}

impl Flag {
    fn system(s: &str) -> Option<Self> {
        let flag = match s.to_ascii_lowercase().as_str() {
            "\\seen" => Flag::Seen,
            "\\answered" => Flag::Answered,
            "\\flagged" => Flag::Flagged,
            "\\deleted" => Flag::Deleted,
            "\\draft" => Flag::Draft,
            "\\recent" => Flag::Recent,
            "\\*" => Flag::MayCreate,
            _ => return None,
        };
        Some(flag)
    }

    /// A keyword flag, checked to be a valid IMAP atom.
    pub fn keyword(name: impl Into<String>) -> Result<Flag> {
        let name = name.into();
        if let Some(c) = name.chars().find(|&c| !is_keyword_char(c)) {
            return Err(Error::Argument(format!(
                "keyword {:?} contains {:?}",
                name, c
            )));
        }
        if name.is_empty() {
            return Err(Error::Argument("empty keyword".into()));
        }
        Ok(Flag::Keyword(name))
    }

    /// Whether the flag can be set with STORE or APPEND.
    pub fn is_storable(&self) -> bool {
        !matches!(self, Flag::Recent | Flag::MayCreate)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Flag::Keyword(name) if name.starts_with('\\') => {
                match name[1..].chars().find(|&c| !is_keyword_char(c)) {
                    Some(c) => Err(Error::Argument(format!("flag {:?} contains {:?}", name, c))),
                    None => Ok(()),
                }
            }
            Flag::Keyword(name) => Flag::keyword(name.as_str()).map(|_| ()),
            _ => Ok(()),
        }
    }
}

fn is_keyword_char(c: char) -> bool {
    c.is_ascii_graphic() && !matches!(c, '(' | ')' | '{' | '%' | '*' | '"' | '\\' | ']')
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Flag::Seen => write!(f, "\\Seen"),
            Flag::Answered => write!(f, "\\Answered"),
            Flag::Flagged => write!(f, "\\Flagged"),
            Flag::Deleted => write!(f, "\\Deleted"),
            Flag::Draft => write!(f, "\\Draft"),
            Flag::Recent => write!(f, "\\Recent"),
            Flag::MayCreate => write!(f, "\\*"),
            Flag::Keyword(ref s) => write!(f, "{}", s),
        }
    }
}

impl From<String> for Flag {
    fn from(s: String) -> Self {
        Flag::system(&s).unwrap_or(Flag::Keyword(s))
    }
}

impl From<&str> for Flag {
    fn from(s: &str) -> Self {
        Flag::system(s).unwrap_or_else(|| Flag::Keyword(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_flags_ignore_case() {
        assert_eq!(Flag::from("\\SEEN"), Flag::Seen);
        assert_eq!(Flag::from("\\*"), Flag::MayCreate);
        assert_eq!(Flag::from("$Junk"), Flag::Keyword("$Junk".into()));
    }

    #[test]
    fn keyword_validation() {
        assert!(Flag::keyword("$Forwarded").is_ok());
        assert!(Flag::keyword("bad keyword").is_err());
        assert!(Flag::keyword("bad(").is_err());
        assert!(Flag::keyword("").is_err());
        assert!(Flag::from("\\Important").validate().is_ok());
    }
}
