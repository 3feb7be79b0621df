//
// Copyright 2018 yvt, all rights reserved.
//
// This source code is a part of Nightingales.
//
use std::error::Error as StdError;
use std::fmt;

/// Generic error types.
///
/// Most of the kinds defined here describe a malformed graph detected while
/// constructing a group task. Such errors are deterministic given the same
/// inputs — they indicate a bug in the calling renderer, not a transient
/// condition, and there is nothing to retry.
///
/// The remaining kinds (`OutOfDeviceMemory`, `DeviceLost`, and `Other`)
/// originate from the device layer and are merely propagated through this
/// crate, e.g. by [`GpuQueue::submit`](crate::handles::GpuQueue::submit).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// A connection or mapping referenced a member task index outside the
    /// group's member list.
    TaskIndexOutOfBounds,

    /// A connection or mapping referenced an I/O slot index outside the
    /// corresponding slot list.
    IoIndexOutOfBounds,

    /// A connection named the same task as both its source and its
    /// destination.
    SelfReference,

    /// The object kinds of a connection's source and destination slots
    /// disagree.
    KindMismatch,

    /// Two connections target the same member input slot.
    DuplicateConnection,

    /// Two I/O mappings target the same group-level slot index.
    DuplicateMapping,

    /// A group-level slot index is not covered by any I/O mapping.
    IncompleteMapping,

    /// A member input slot is neither fed by an ingroup connection nor
    /// exposed as a group-level input.
    DanglingInput,

    /// The ingroup connections form a cycle; no execution order exists.
    CyclicDependency,

    /// A GPU task was created from a command buffer that is still in the
    /// recording state.
    CmdBufferNotRecorded,

    /// Ran out of device memory during an operation.
    OutOfDeviceMemory,

    /// The device became lost due to hardware/software errors, execution
    /// timeouts, or other reasons.
    DeviceLost,

    /// Any error that is not part of this list.
    Other,
}

impl ErrorKind {
    fn as_str(&self) -> &'static str {
        match *self {
            ErrorKind::TaskIndexOutOfBounds => "task index out of bounds",
            ErrorKind::IoIndexOutOfBounds => "i/o slot index out of bounds",
            ErrorKind::SelfReference => "a task cannot feed itself",
            ErrorKind::KindMismatch => "object kind mismatch",
            ErrorKind::DuplicateConnection => "duplicate connection to an input slot",
            ErrorKind::DuplicateMapping => "duplicate i/o mapping",
            ErrorKind::IncompleteMapping => "incomplete i/o mapping",
            ErrorKind::DanglingInput => "dangling task input",
            ErrorKind::CyclicDependency => "cyclic dependency",
            ErrorKind::CmdBufferNotRecorded => "command buffer is not recorded",
            ErrorKind::OutOfDeviceMemory => "out of device memory",
            ErrorKind::DeviceLost => "device lost",
            ErrorKind::Other => "uncategorized error",
        }
    }
}

/// The generic error type used throughout NgsPresent.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    error: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, error: None }
    }

    pub fn with_detail<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self {
            kind,
            error: Some(error.into()),
        }
    }

    pub fn get_ref(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        use std::ops::Deref;
        self.error.as_ref().map(Deref::deref)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref error) = self.error {
            write!(fmt, "{}: {}", self.kind.as_str(), error)
        } else {
            write!(fmt, "{}", self.kind.as_str())
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.error
            .as_ref()
            .map(|x| &**x as &(dyn StdError + 'static))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

pub type Result<T> = ::std::result::Result<T, Error>;
