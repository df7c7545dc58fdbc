use enumset::{EnumSet, EnumSetType};

/// An attribute of a folder, as reported by LIST or LSUB.
///
/// Covers the base attributes of [RFC 3501 section
/// 7.2.2](https://tools.ietf.org/html/rfc3501#section-7.2.2), the child and subscription
/// attributes of LIST-EXTENDED, and the special-use attributes of
/// [RFC 6154](https://tools.ietf.org/html/rfc6154).
#[derive(EnumSetType, Debug, Hash)]
pub enum FolderAttribute {
    /// It is not possible for any child levels of hierarchy to exist under this name.
    NoInferiors,
    /// It is not possible to use this name as a selectable mailbox.
    NoSelect,
    /// The mailbox has been marked "interesting" by the server.
    Marked,
    /// The mailbox does not contain any additional messages since the last time it was selected.
    Unmarked,
    /// The folder has child folders.
    HasChildren,
    /// The folder has no child folders.
    HasNoChildren,
    /// The name does not refer to an existing folder.
    NonExistent,
    /// The folder is subscribed.
    Subscribed,
    /// The folder is on a remote server.
    Remote,
    /// Special use: every message in the store.
    All,
    /// Special use: archived messages.
    Archive,
    /// Special use: drafts.
    Drafts,
    /// Special use: flagged messages.
    Flagged,
    /// Special use: junk mail.
    Junk,
    /// Special use: sent mail.
    Sent,
    /// Special use: deleted messages.
    Trash,
    /// Special use: important messages ([RFC 8457](https://tools.ietf.org/html/rfc8457)).
    Important,
}

impl FolderAttribute {
    /// The attribute as it appears on the wire, including the leading backslash.
    pub fn as_wire(self) -> &'static str {
        match self {
            FolderAttribute::NoInferiors => "\\Noinferiors",
            FolderAttribute::NoSelect => "\\Noselect",
            FolderAttribute::Marked => "\\Marked",
            FolderAttribute::Unmarked => "\\Unmarked",
            FolderAttribute::HasChildren => "\\HasChildren",
            FolderAttribute::HasNoChildren => "\\HasNoChildren",
            FolderAttribute::NonExistent => "\\NonExistent",
            FolderAttribute::Subscribed => "\\Subscribed",
            FolderAttribute::Remote => "\\Remote",
            FolderAttribute::All => "\\All",
            FolderAttribute::Archive => "\\Archive",
            FolderAttribute::Drafts => "\\Drafts",
            FolderAttribute::Flagged => "\\Flagged",
            FolderAttribute::Junk => "\\Junk",
            FolderAttribute::Sent => "\\Sent",
            FolderAttribute::Trash => "\\Trash",
            FolderAttribute::Important => "\\Important",
        }
    }

    /// Recognize a wire attribute, ignoring case.
    pub fn from_wire(s: &str) -> Option<Self> {
        EnumSet::<FolderAttribute>::all()
            .iter()
            .find(|attr| attr.as_wire().eq_ignore_ascii_case(s))
    }

    /// The special-use attributes, which can be requested when creating a folder.
    pub fn special_use() -> EnumSet<FolderAttribute> {
        FolderAttribute::All
            | FolderAttribute::Archive
            | FolderAttribute::Drafts
            | FolderAttribute::Flagged
            | FolderAttribute::Junk
            | FolderAttribute::Sent
            | FolderAttribute::Trash
            | FolderAttribute::Important
    }
}

/// A name that matches a `LIST` or `LSUB` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub(crate) attributes: EnumSet<FolderAttribute>,
    pub(crate) other_attributes: Vec<String>,
    pub(crate) delimiter: Option<char>,
    pub(crate) name: String,
    pub(crate) old_name: Option<String>,
    pub(crate) child_info: Vec<String>,
    pub(crate) lsub: bool,
}

impl Name {
    /// Attributes of this name.
    pub fn attributes(&self) -> EnumSet<FolderAttribute> {
        self.attributes
    }

    /// Attributes the crate does not know, verbatim.
    pub fn other_attributes(&self) -> &[String] {
        &self.other_attributes
    }

    /// The hierarchy delimiter is a character used to delimit levels of hierarchy in a mailbox
    /// name.  A client can use it to create child mailboxes, and to search higher or lower levels
    /// of naming hierarchy.  All children of a top-level hierarchy node use the same
    /// separator character.  `None` means that no hierarchy exists; the name is a "flat" name.
    pub fn delimiter(&self) -> Option<char> {
        self.delimiter
    }

    /// The full folder name, decoded from its wire encoding.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The previous name, when the server reports a rename through `OLDNAME`.
    pub fn old_name(&self) -> Option<&str> {
        self.old_name.as_deref()
    }

    /// `CHILDINFO` selection criteria the children of this name matched.
    pub fn child_info(&self) -> &[String] {
        &self.child_info
    }

    /// Whether this came from `LSUB` rather than `LIST`.
    pub fn is_lsub(&self) -> bool {
        self.lsub
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_from_wire() {
        assert_eq!(
            FolderAttribute::from_wire("\\NOSELECT"),
            Some(FolderAttribute::NoSelect)
        );
        assert_eq!(
            FolderAttribute::from_wire("\\Trash"),
            Some(FolderAttribute::Trash)
        );
        assert_eq!(FolderAttribute::from_wire("\\Whatever"), None);
        assert!(FolderAttribute::special_use().contains(FolderAttribute::Sent));
        assert!(!FolderAttribute::special_use().contains(FolderAttribute::Marked));
    }
}
