use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};

/// What happened in a watched pool.
///
/// Read-only activity (open, access, close, metadata) collapses into
/// `Ignored` and never triggers a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoEvent {
    Create,
    Delete,
    Modify,
    MovedFrom,
    MovedTo,
    Ignored,
}

impl RepoEvent {
    pub fn from_kind(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::Create,
            EventKind::Remove(_) => Self::Delete,
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Self::MovedFrom,
            EventKind::Modify(ModifyKind::Name(_)) => Self::MovedTo,
            // chmod/chown/mtime touches
            EventKind::Modify(ModifyKind::Metadata(_)) => Self::Ignored,
            EventKind::Modify(_) => Self::Modify,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => Self::Ignored,
        }
    }

    pub fn is_ignored(self) -> bool {
        self == Self::Ignored
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Delete => "deleted",
            Self::Modify => "modified",
            Self::MovedFrom => "moved out",
            Self::MovedTo => "moved in",
            Self::Ignored => "ignored",
        }
    }
}
