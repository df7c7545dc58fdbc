use enumset::{EnumSet, EnumSetType};
use std::collections::HashSet;
use std::fmt;

/// A capability this crate knows how to use.
///
/// Capabilities the server advertises but that have no variant here are still recorded, see
/// [`Capabilities::has_str`].
#[derive(EnumSetType, Debug, Hash)]
pub enum Capability {
    /// `IMAP4rev1`
    Imap4rev1,
    /// `IMAP4rev2` ([RFC 9051](https://tools.ietf.org/html/rfc9051))
    Imap4rev2,
    /// `LITERAL+`, non-synchronizing literals of any size.
    LiteralPlus,
    /// `LITERAL-`, non-synchronizing literals up to 4096 bytes.
    LiteralMinus,
    /// `NAMESPACE`
    Namespace,
    /// `UNSELECT`
    Unselect,
    /// `ENABLE`
    Enable,
    /// `UIDPLUS`, which reports UIDs assigned by COPY and APPEND and adds `UID EXPUNGE`.
    UidPlus,
    /// `MULTIAPPEND`
    MultiAppend,
    /// `MOVE`
    Move,
    /// `REPLACE` ([RFC 8508](https://tools.ietf.org/html/rfc8508))
    Replace,
    /// `CONDSTORE`
    CondStore,
    /// `QRESYNC`, which must be turned on with `ENABLE`.
    QResync,
    /// `LIST-EXTENDED`
    ListExtended,
    /// `LIST-STATUS`
    ListStatus,
    /// `SPECIAL-USE`
    SpecialUse,
    /// `CREATE-SPECIAL-USE`
    CreateSpecialUse,
    /// `OBJECTID`
    ObjectId,
    /// `APPENDLIMIT`, with or without a server-wide value.
    AppendLimit,
    /// `STATUS=SIZE`
    StatusSize,
    /// `UTF8=ACCEPT`, which must be turned on with `ENABLE`. `UTF8=ONLY` implies it.
    Utf8Accept,
    /// `IDLE`
    Idle,
    /// `SASL-IR`
    SaslIr,
}

impl Capability {
    /// The atom the server uses to advertise this capability.
    pub fn atom(self) -> &'static str {
        match self {
            Capability::Imap4rev1 => "IMAP4rev1",
            Capability::Imap4rev2 => "IMAP4rev2",
            Capability::LiteralPlus => "LITERAL+",
            Capability::LiteralMinus => "LITERAL-",
            Capability::Namespace => "NAMESPACE",
            Capability::Unselect => "UNSELECT",
            Capability::Enable => "ENABLE",
            Capability::UidPlus => "UIDPLUS",
            Capability::MultiAppend => "MULTIAPPEND",
            Capability::Move => "MOVE",
            Capability::Replace => "REPLACE",
            Capability::CondStore => "CONDSTORE",
            Capability::QResync => "QRESYNC",
            Capability::ListExtended => "LIST-EXTENDED",
            Capability::ListStatus => "LIST-STATUS",
            Capability::SpecialUse => "SPECIAL-USE",
            Capability::CreateSpecialUse => "CREATE-SPECIAL-USE",
            Capability::ObjectId => "OBJECTID",
            Capability::AppendLimit => "APPENDLIMIT",
            Capability::StatusSize => "STATUS=SIZE",
            Capability::Utf8Accept => "UTF8=ACCEPT",
            Capability::Idle => "IDLE",
            Capability::SaslIr => "SASL-IR",
        }
    }

    /// Map an advertised atom to a known capability, ignoring case.
    pub fn from_atom(atom: &str) -> Option<Self> {
        let upper = atom.to_ascii_uppercase();
        if upper == "UTF8=ONLY" {
            return Some(Capability::Utf8Accept);
        }
        if upper.starts_with("APPENDLIMIT=") {
            return Some(Capability::AppendLimit);
        }
        EnumSet::<Capability>::all()
            .iter()
            .find(|cap| cap.atom().eq_ignore_ascii_case(&upper))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.atom())
    }
}

/// From [section 7.2.1 of RFC 3501](https://tools.ietf.org/html/rfc3501#section-7.2.1).
///
/// The capabilities the server advertised, less the ones the caller switched off with
/// [`crate::Session::disable_capability`]. Extensions that need `ENABLE` (such as `QRESYNC` and
/// `UTF8=ACCEPT`) are additionally tracked as *active* once the server confirms them.
///
/// A capability name which begins with `AUTH=` indicates that the server supports that particular
/// authentication mechanism. Unknown capability names are kept so callers can still ask about
/// them.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    advertised: EnumSet<Capability>,
    revoked: EnumSet<Capability>,
    active: EnumSet<Capability>,
    other: HashSet<String>,
    auth_mechanisms: Vec<String>,
    append_limit: Option<u64>,
}

impl Capabilities {
    pub(crate) fn from_atoms<S: AsRef<str>>(atoms: &[S]) -> Self {
        let mut caps = Capabilities::default();
        caps.refresh(atoms);
        caps
    }

    /// Replace the advertised set. Revocations and activations survive a refresh, but an
    /// activation only counts while the capability is still advertised.
    pub(crate) fn refresh<S: AsRef<str>>(&mut self, atoms: &[S]) {
        self.advertised = EnumSet::empty();
        self.other.clear();
        self.auth_mechanisms.clear();
        self.append_limit = None;
        for atom in atoms {
            let atom = atom.as_ref();
            let upper = atom.to_ascii_uppercase();
            if let Some(mechanism) = upper.strip_prefix("AUTH=") {
                self.auth_mechanisms.push(mechanism.to_string());
                self.other.insert(upper);
                continue;
            }
            if let Some(limit) = upper.strip_prefix("APPENDLIMIT=") {
                self.append_limit = limit.parse().ok();
            }
            match Capability::from_atom(atom) {
                Some(cap) => {
                    self.advertised |= cap;
                }
                None => {
                    self.other.insert(upper);
                }
            }
        }
        self.active &= self.advertised;
    }

    /// Check if the server has the given capability and it has not been disabled.
    pub fn has(&self, cap: Capability) -> bool {
        self.enabled().contains(cap)
    }

    /// Check if the server advertised `cap`, even if it was disabled locally.
    pub fn advertised(&self, cap: Capability) -> bool {
        self.advertised.contains(cap)
    }

    /// Check for any advertised capability by its atom, ignoring case.
    pub fn has_str(&self, atom: &str) -> bool {
        match Capability::from_atom(atom) {
            Some(cap) => self.has(cap),
            None => self.other.contains(&atom.to_ascii_uppercase()),
        }
    }

    /// Every known capability that is advertised and not disabled.
    pub fn enabled(&self) -> EnumSet<Capability> {
        self.advertised - self.revoked
    }

    /// Whether the server confirmed `cap` through `ENABLE` (or it is implied by one that was).
    pub fn is_active(&self, cap: Capability) -> bool {
        self.active.contains(cap) && !self.revoked.contains(cap)
    }

    /// The SASL mechanisms from `AUTH=` capabilities, upper-cased.
    pub fn auth_mechanisms(&self) -> &[String] {
        &self.auth_mechanisms
    }

    /// The server-wide limit from `APPENDLIMIT=n`, if one was given.
    pub fn append_limit(&self) -> Option<u64> {
        if self.has(Capability::AppendLimit) {
            self.append_limit
        } else {
            None
        }
    }

    /// Iterate over the capabilities that are advertised but unknown to this crate.
    pub fn other(&self) -> impl Iterator<Item = &str> {
        self.other.iter().map(String::as_str)
    }

    /// Returns how many capabilities the server has.
    pub fn len(&self) -> usize {
        self.advertised.len() + self.other.len()
    }

    /// Returns true if the server purports to have no capabilities.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn revoke(&mut self, cap: Capability) {
        self.revoked |= cap;
    }

    pub(crate) fn restore(&mut self, cap: Capability) {
        self.revoked.remove(cap);
    }

    pub(crate) fn activate(&mut self, cap: Capability) {
        self.active |= cap;
        if cap == Capability::QResync {
            self.active |= Capability::CondStore;
        }
    }

    pub(crate) fn activate_atoms<S: AsRef<str>>(&mut self, atoms: &[S]) -> EnumSet<Capability> {
        let mut now = EnumSet::empty();
        for cap in atoms.iter().filter_map(|a| Capability::from_atom(a.as_ref())) {
            self.activate(cap);
            now |= cap;
        }
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_and_unknown() {
        let caps = Capabilities::from_atoms(&[
            "IMAP4rev1",
            "literal+",
            "AUTH=PLAIN",
            "APPENDLIMIT=35651584",
            "XLIST",
            "UTF8=ONLY",
        ]);
        assert!(caps.has(Capability::Imap4rev1));
        assert!(caps.has(Capability::LiteralPlus));
        assert!(caps.has(Capability::Utf8Accept));
        assert!(caps.has_str("xlist"));
        assert!(caps.has_str("AUTH=plain"));
        assert_eq!(caps.auth_mechanisms(), &["PLAIN".to_string()]);
        assert_eq!(caps.append_limit(), Some(35651584));
        assert!(!caps.has(Capability::Move));
    }

    #[test]
    fn revoke_survives_refresh() {
        let mut caps = Capabilities::from_atoms(&["IMAP4rev1", "MOVE", "UIDPLUS"]);
        caps.revoke(Capability::Move);
        assert!(!caps.has(Capability::Move));
        assert!(caps.advertised(Capability::Move));
        caps.refresh(&["IMAP4rev1", "MOVE", "UIDPLUS", "QRESYNC"]);
        assert!(!caps.has(Capability::Move));
        caps.restore(Capability::Move);
        assert!(caps.has(Capability::Move));
    }

    #[test]
    fn enabling_qresync_activates_condstore() {
        let mut caps = Capabilities::from_atoms(&["IMAP4rev1", "QRESYNC", "CONDSTORE"]);
        let now = caps.activate_atoms(&["QRESYNC"]);
        assert_eq!(now, EnumSet::only(Capability::QResync));
        assert!(caps.is_active(Capability::QResync));
        assert!(caps.is_active(Capability::CondStore));
        caps.refresh(&["IMAP4rev1"]);
        assert!(!caps.is_active(Capability::QResync));
    }
}
