//
// Copyright 2018 yvt, all rights reserved.
//
// This source code is a part of Nightingales.
//
use std::{fmt, sync::Arc};

use super::PresentTaskRef;
use crate::error::Result;
use crate::handles::{CmdBufferRef, ObjectKind, ResourceRef};

/// Describes one unique input or output slot of a present task.
///
/// Slot identity is positional — a slot is "output 2 of task 1", not a
/// name. `name` is an optional symbolic binding name (e.g. the uniform
/// buffer binding the slot corresponds to) carried through for the
/// device layer's benefit; the graph layer never keys on it.
#[derive(Debug, Clone)]
pub struct IoSlot {
    /// The coarse object classification used for connection-compatibility
    /// checks.
    pub kind: ObjectKind,

    /// The referenced device object.
    pub resource: ResourceRef,

    /// Optional symbolic binding name.
    pub name: Option<Arc<str>>,
}

impl IoSlot {
    pub fn new(kind: ObjectKind, resource: ResourceRef) -> Self {
        Self {
            kind,
            resource,
            name: None,
        }
    }

    pub fn with_name(kind: ObjectKind, resource: ResourceRef, name: &str) -> Self {
        Self {
            kind,
            resource,
            name: Some(name.into()),
        }
    }
}

/// A wiring edge inside a group task: output slot `source_output` of
/// member `source_task` feeds input slot `dest_input` of member
/// `dest_task`.
///
/// All indices are into the group's member list and the respective
/// members' slot lists; they are validated when the group is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IngroupConnection {
    pub source_task: usize,
    pub source_output: usize,
    pub dest_task: usize,
    pub dest_input: usize,
}

/// Exposes member `task`'s slot `task_io` as the group's own slot
/// `group_io`. Used for both the input and the output side of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IoMapping {
    pub group_io: usize,
    pub task: usize,
    pub task_io: usize,
}

/// The host-side work unit of a CPU task.
///
/// The callback runs to completion synchronously on the present thread,
/// at a point where all of the task's connected inputs have been
/// produced. It must only touch CPU-visible memory (e.g. write updated
/// uniform data into a staging buffer) — submitting GPU work from a
/// callback is a contract violation this crate does not detect.
pub trait HostCallback: fmt::Debug + Send + Sync {
    /// Execute the host-side work.
    fn run(&mut self) -> Result<()>;
}

/// Construct a `Box<dyn HostCallback>` from a closure and the state it
/// operates on.
///
/// `data` is whatever the callback needs across frames — including
/// mutable change-detection state such as
/// [`ShadowState`](crate::cache::ShadowState).
pub fn host_callback_from_closure<T, F>(data: T, closure: F) -> Box<dyn HostCallback>
where
    T: Send + Sync + 'static,
    F: FnMut(&mut T) -> Result<()> + Send + Sync + 'static,
{
    struct ClosureCallback<T, F> {
        data: T,
        closure: F,
    }

    impl<T, F> fmt::Debug for ClosureCallback<T, F> {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.debug_struct("ClosureCallback").finish()
        }
    }

    impl<T, F> HostCallback for ClosureCallback<T, F>
    where
        T: Send + Sync + 'static,
        F: FnMut(&mut T) -> Result<()> + Send + Sync + 'static,
    {
        fn run(&mut self) -> Result<()> {
            (self.closure)(&mut self.data)
        }
    }

    Box::new(ClosureCallback { data, closure })
}

/// Creation parameters of a CPU task.
#[derive(Debug)]
pub struct CpuTaskInfo {
    pub name: String,
    pub inputs: Vec<IoSlot>,
    pub outputs: Vec<IoSlot>,
    pub callback: Box<dyn HostCallback>,
}

/// Creation parameters of a GPU task.
///
/// `cmd_buffer` must be fully recorded before the task is created; the
/// task never mutates it. Every resource the command buffer reads or
/// writes that participates in cross-task ordering must appear in
/// `inputs` or `outputs` — untracked resources receive no ordering
/// guarantee.
#[derive(Debug)]
pub struct GpuTaskInfo {
    pub name: String,
    pub cmd_buffer: CmdBufferRef,
    pub inputs: Vec<IoSlot>,
    pub outputs: Vec<IoSlot>,
}

/// Creation parameters of a group task.
///
/// `num_inputs`/`num_outputs` declare how many group-level slots the
/// group exposes; `input_mappings`/`output_mappings` must cover each
/// group-level index exactly once. `input_mappings` is usually empty for
/// leaf-level groups — it only matters when the group itself is meant to
/// be wired into an enclosing group.
#[derive(Debug)]
pub struct GroupTaskInfo {
    pub name: String,

    /// The member tasks, heterogeneous. Group tasks may appear here too
    /// (groups nest).
    pub tasks: Vec<PresentTaskRef>,

    pub connections: Vec<IngroupConnection>,

    pub num_inputs: usize,
    pub input_mappings: Vec<IoMapping>,

    pub num_outputs: usize,
    pub output_mappings: Vec<IoMapping>,
}
