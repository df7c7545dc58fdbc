/// One namespace from a [`NAMESPACE`](https://tools.ietf.org/html/rfc2342) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// The prefix of folder names in this namespace, decoded.
    pub prefix: String,
    /// The hierarchy delimiter, or `None` for a flat namespace.
    pub delimiter: Option<char>,
}

/// The personal, other users' and shared namespaces the server reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces {
    /// Namespaces holding the user's own folders.
    pub personal: Vec<Namespace>,
    /// Namespaces holding other users' folders.
    pub other_users: Vec<Namespace>,
    /// Namespaces holding shared folders.
    pub shared: Vec<Namespace>,
}
