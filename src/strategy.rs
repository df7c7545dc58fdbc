//! Picking between the native form of an operation and its fallback.
//!
//! Several operations have a single-command form behind an extension and a multi-command
//! emulation that works everywhere. The choice depends only on the capabilities in effect,
//! so disabling a capability with [`Session::disable_capability`](crate::Session::disable_capability)
//! switches an operation to its fallback.

use enumset::EnumSet;

use crate::types::Capability;

/// An operation with more than one way of being carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `UID COPY` reporting `COPYUID`, or plain `COPY` by sequence number.
    CopyUids,
    /// `UID MOVE`, or copy, mark `\Deleted` and expunge.
    MoveUids,
    /// One `APPEND` with several messages, or one `APPEND` each.
    AppendMany,
    /// `UID REPLACE`, or append, mark `\Deleted` and expunge.
    Replace,
    /// `UID EXPUNGE`, or an `EXPUNGE` with every other deleted message temporarily restored.
    ExpungeUids,
    /// `LIST ... RETURN (STATUS ...)`, or `LIST` followed by `STATUS` per folder.
    ListWithStatus,
    /// `UNSELECT`, or `EXAMINE` of a folder that does not exist.
    Unselect,
}

/// How an operation will be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Path {
    /// The single-command form.
    Native,
    /// The portable fallback.
    Emulated,
}

impl Operation {
    /// The capabilities the native form needs.
    pub fn required(self) -> EnumSet<Capability> {
        match self {
            Operation::CopyUids => Capability::UidPlus.into(),
            Operation::MoveUids => Capability::Move.into(),
            Operation::AppendMany => Capability::MultiAppend.into(),
            Operation::Replace => Capability::Replace.into(),
            Operation::ExpungeUids => Capability::UidPlus.into(),
            Operation::ListWithStatus => Capability::ListStatus.into(),
            Operation::Unselect => Capability::Unselect.into(),
        }
    }
}

/// Choose the path for `op` given the capabilities in effect.
pub fn choose(op: Operation, capabilities: EnumSet<Capability>) -> Path {
    let path = if capabilities.is_superset(op.required()) {
        Path::Native
    } else {
        Path::Emulated
    };
    log::debug!("{:?}: {:?} path", op, path);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_only_with_everything_required() {
        assert_eq!(
            choose(Operation::MoveUids, Capability::Move | Capability::UidPlus),
            Path::Native
        );
        assert_eq!(
            choose(Operation::MoveUids, Capability::UidPlus.into()),
            Path::Emulated
        );
        assert_eq!(
            choose(Operation::ListWithStatus, Capability::ListExtended.into()),
            Path::Emulated
        );
        assert_eq!(choose(Operation::Unselect, EnumSet::empty()), Path::Emulated);
    }
}
