//
// Copyright 2018 yvt, all rights reserved.
//
// This source code is a part of Nightingales.
//
use atomic_refcell::AtomicRefCell;
use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashSet},
    sync::Arc,
};

use super::{
    CpuTaskInfo, GpuTaskInfo, GroupTaskInfo, HostCallback, IngroupConnection, IoMapping, IoSlot,
};
use crate::error::{Error, ErrorKind, Result};
use crate::handles::{CmdBufferRef, GpuQueue};

#[cfg(test)]
#[path = "./scheduler_test.rs"]
mod scheduler_test;

/// A reference to a present task (CPU, GPU, or group).
///
/// `PresentTaskRef` behaves like an `Arc`: `Clone` retains the task,
/// `Drop` releases it, and the task object is destroyed when the last
/// reference goes away. Building a group clones the member references, so
/// the usual caller pattern — create the members, create the group, drop
/// the member references — transfers ownership to the group.
///
/// A present task is immutable once built. When creation parameters
/// change (target resolution, tap count, ...), the owning renderer drops
/// the stale task and builds a new one; see
/// [`TaskCache`](crate::cache::TaskCache).
#[derive(Debug, Clone)]
pub struct PresentTaskRef {
    inner: Arc<TaskInner>,
}

#[derive(Debug)]
struct TaskInner {
    name: String,
    payload: TaskPayload,
}

#[derive(Debug)]
enum TaskPayload {
    Cpu(CpuTask),
    Gpu(GpuTask),
    Group(GroupTask),
}

#[derive(Debug)]
struct CpuTask {
    inputs: Vec<IoSlot>,
    outputs: Vec<IoSlot>,
    callback: AtomicRefCell<Box<dyn HostCallback>>,
}

#[derive(Debug)]
struct GpuTask {
    cmd_buffer: CmdBufferRef,
    inputs: Vec<IoSlot>,
    outputs: Vec<IoSlot>,
}

#[derive(Debug)]
struct GroupTask {
    tasks: Vec<PresentTaskRef>,
    connections: Vec<IngroupConnection>,

    /// Member indices in a valid execution order. Computed at build time
    /// so the run loop never has to trust the caller-supplied member
    /// order.
    order: Vec<usize>,

    /// Resolved `(member index, member slot index)` per group-level input
    /// slot.
    input_map: Vec<(usize, usize)>,

    /// Resolved `(member index, member slot index)` per group-level
    /// output slot.
    output_map: Vec<(usize, usize)>,
}

impl PresentTaskRef {
    /// Create a CPU task wrapping a host callback.
    pub fn new_cpu(info: CpuTaskInfo) -> Self {
        let CpuTaskInfo {
            name,
            inputs,
            outputs,
            callback,
        } = info;
        Self {
            inner: Arc::new(TaskInner {
                name,
                payload: TaskPayload::Cpu(CpuTask {
                    inputs,
                    outputs,
                    callback: AtomicRefCell::new(callback),
                }),
            }),
        }
    }

    /// Create a GPU task wrapping a pre-recorded command buffer.
    ///
    /// Fails with [`ErrorKind::CmdBufferNotRecorded`] if recording of the
    /// command buffer has not been stopped yet.
    pub fn new_gpu(info: GpuTaskInfo) -> Result<Self> {
        if !info.cmd_buffer.is_recorded() {
            return Err(Error::with_detail(
                ErrorKind::CmdBufferNotRecorded,
                format!("GPU task {:?}", info.name),
            ));
        }
        let GpuTaskInfo {
            name,
            cmd_buffer,
            inputs,
            outputs,
        } = info;
        Ok(Self {
            inner: Arc::new(TaskInner {
                name,
                payload: TaskPayload::Gpu(GpuTask {
                    cmd_buffer,
                    inputs,
                    outputs,
                }),
            }),
        })
    }

    /// Validate and assemble a group task.
    ///
    /// Construction is pure graph building — no CPU or GPU work is
    /// performed. On success the group holds a reference to every member,
    /// so the caller may drop its own member references afterwards.
    ///
    /// The wiring is checked exhaustively rather than trusted:
    ///
    ///  - every connection and mapping index must be in bounds;
    ///  - a connection must not name the same member as source and
    ///    destination, must join slots of the same [`ObjectKind`], and no
    ///    two connections may feed the same input slot;
    ///  - the connections must admit a topological order of the members
    ///    (member list order is *not* assumed to be valid);
    ///  - each group-level I/O index must be mapped exactly once;
    ///  - every member input must be fed by a connection or exposed as a
    ///    group-level input.
    ///
    /// [`ObjectKind`]: crate::handles::ObjectKind
    pub fn new_group(info: GroupTaskInfo) -> Result<Self> {
        let GroupTaskInfo {
            name,
            tasks,
            connections,
            num_inputs,
            input_mappings,
            num_outputs,
            output_mappings,
        } = info;

        validate_connections(&tasks, &connections)?;

        let order = execution_order(tasks.len(), &connections)?;

        let input_map = resolve_mappings(&tasks, &input_mappings, num_inputs, SlotSide::Input)?;
        let output_map = resolve_mappings(&tasks, &output_mappings, num_outputs, SlotSide::Output)?;

        check_input_coverage(&tasks, &connections, &input_mappings)?;

        Ok(Self {
            inner: Arc::new(TaskInner {
                name,
                payload: TaskPayload::Group(GroupTask {
                    tasks,
                    connections,
                    order,
                    input_map,
                    output_map,
                }),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn num_inputs(&self) -> usize {
        match self.inner.payload {
            TaskPayload::Cpu(ref t) => t.inputs.len(),
            TaskPayload::Gpu(ref t) => t.inputs.len(),
            TaskPayload::Group(ref t) => t.input_map.len(),
        }
    }

    pub fn num_outputs(&self) -> usize {
        match self.inner.payload {
            TaskPayload::Cpu(ref t) => t.outputs.len(),
            TaskPayload::Gpu(ref t) => t.outputs.len(),
            TaskPayload::Group(ref t) => t.output_map.len(),
        }
    }

    /// Get the input slot at a positional index.
    ///
    /// For a group task the slot is resolved through the input-mapping
    /// table down to the owning member (recursively, for nested groups).
    pub fn input(&self, index: usize) -> Option<&IoSlot> {
        match self.inner.payload {
            TaskPayload::Cpu(ref t) => t.inputs.get(index),
            TaskPayload::Gpu(ref t) => t.inputs.get(index),
            TaskPayload::Group(ref t) => t
                .input_map
                .get(index)
                .and_then(|&(task, io)| t.tasks[task].input(io)),
        }
    }

    /// Get the output slot at a positional index.
    ///
    /// For a group task the slot is resolved through the output-mapping
    /// table down to the owning member (recursively, for nested groups).
    pub fn output(&self, index: usize) -> Option<&IoSlot> {
        match self.inner.payload {
            TaskPayload::Cpu(ref t) => t.outputs.get(index),
            TaskPayload::Gpu(ref t) => t.outputs.get(index),
            TaskPayload::Group(ref t) => t
                .output_map
                .get(index)
                .and_then(|&(task, io)| t.tasks[task].output(io)),
        }
    }

    /// The member tasks of a group task, in the caller-supplied order.
    /// Returns `None` for leaf tasks.
    pub fn subtasks(&self) -> Option<&[PresentTaskRef]> {
        match self.inner.payload {
            TaskPayload::Group(ref t) => Some(&t.tasks),
            _ => None,
        }
    }

    /// The ingroup connections of a group task, for an external executor
    /// to consult. Returns `None` for leaf tasks.
    pub fn connections(&self) -> Option<&[IngroupConnection]> {
        match self.inner.payload {
            TaskPayload::Group(ref t) => Some(&t.connections),
            _ => None,
        }
    }

    /// Member indices of a group task in the execution order validated at
    /// build time. Returns `None` for leaf tasks.
    pub fn execution_order(&self) -> Option<&[usize]> {
        match self.inner.payload {
            TaskPayload::Group(ref t) => Some(&t.order),
            _ => None,
        }
    }

    /// Check whether two references point at the same task object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run this task on the calling thread.
    ///
    /// CPU callbacks are invoked synchronously, GPU command buffers are
    /// handed to `queue`, and group members execute in the order computed
    /// when the group was built. The first error aborts the run.
    ///
    /// The whole run happens on the single calling ("present") thread;
    /// this crate introduces no parallelism and never blocks on the
    /// device.
    ///
    /// # Panics
    ///
    /// Panics if a CPU callback is re-entered, i.e. if the callback
    /// itself causes the same task to run. This is reported as a borrow
    /// error by the callback's `AtomicRefCell`.
    pub fn run(&self, queue: &mut dyn GpuQueue) -> Result<()> {
        match self.inner.payload {
            TaskPayload::Cpu(ref t) => t.callback.borrow_mut().run(),
            TaskPayload::Gpu(ref t) => queue.submit(&t.cmd_buffer),
            TaskPayload::Group(ref t) => {
                for &i in &t.order {
                    t.tasks[i].run(queue)?;
                }
                Ok(())
            }
        }
    }
}

fn validate_connections(tasks: &[PresentTaskRef], connections: &[IngroupConnection]) -> Result<()> {
    let num_tasks = tasks.len();
    let mut fed_inputs = HashSet::new();

    for conn in connections {
        if conn.source_task >= num_tasks || conn.dest_task >= num_tasks {
            return Err(Error::with_detail(
                ErrorKind::TaskIndexOutOfBounds,
                format!(
                    "connection {} -> {} with {} member tasks",
                    conn.source_task, conn.dest_task, num_tasks
                ),
            ));
        }

        if conn.source_task == conn.dest_task {
            return Err(Error::with_detail(
                ErrorKind::SelfReference,
                format!("task {:?}", tasks[conn.source_task].name()),
            ));
        }

        let source = tasks[conn.source_task]
            .output(conn.source_output)
            .ok_or_else(|| {
                Error::with_detail(
                    ErrorKind::IoIndexOutOfBounds,
                    format!(
                        "no output slot {} on task {:?}",
                        conn.source_output,
                        tasks[conn.source_task].name()
                    ),
                )
            })?;
        let dest = tasks[conn.dest_task].input(conn.dest_input).ok_or_else(|| {
            Error::with_detail(
                ErrorKind::IoIndexOutOfBounds,
                format!(
                    "no input slot {} on task {:?}",
                    conn.dest_input,
                    tasks[conn.dest_task].name()
                ),
            )
        })?;

        if source.kind != dest.kind {
            return Err(Error::with_detail(
                ErrorKind::KindMismatch,
                format!(
                    "{:?} output of {:?} wired to {:?} input of {:?}",
                    source.kind,
                    tasks[conn.source_task].name(),
                    dest.kind,
                    tasks[conn.dest_task].name()
                ),
            ));
        }

        // Two producers for one input slot would leave the execution
        // order ambiguous.
        if !fed_inputs.insert((conn.dest_task, conn.dest_input)) {
            return Err(Error::with_detail(
                ErrorKind::DuplicateConnection,
                format!(
                    "input {} of task {:?}",
                    conn.dest_input,
                    tasks[conn.dest_task].name()
                ),
            ));
        }
    }

    Ok(())
}

/// Find an ordering of member tasks that agrees with the partial order
/// induced by the connections (source executes to completion before
/// destination).
///
/// Ties are broken toward the smallest member index, so a member list
/// that is already in a valid order is reproduced verbatim.
fn execution_order(num_tasks: usize, connections: &[IngroupConnection]) -> Result<Vec<usize>> {
    let mut successors = vec![Vec::new(); num_tasks];
    for conn in connections {
        successors[conn.source_task].push(conn.dest_task);
    }
    for list in &mut successors {
        list.sort();
        list.dedup();
    }

    let mut num_blocking = vec![0; num_tasks];
    for list in &successors {
        for &i in list {
            num_blocking[i] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..num_tasks)
        .filter(|&i| num_blocking[i] == 0)
        .map(Reverse)
        .collect();
    let mut order = Vec::with_capacity(num_tasks);

    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        for &k in &successors[i] {
            num_blocking[k] -= 1;
            if num_blocking[k] == 0 {
                ready.push(Reverse(k));
            }
        }
    }

    if order.len() != num_tasks {
        // Every task left unordered at this point sits on a cycle or
        // behind one.
        return Err(Error::with_detail(
            ErrorKind::CyclicDependency,
            format!("{} of {} member tasks unorderable", num_tasks - order.len(), num_tasks),
        ));
    }

    Ok(order)
}

#[derive(Clone, Copy)]
enum SlotSide {
    Input,
    Output,
}

fn resolve_mappings(
    tasks: &[PresentTaskRef],
    mappings: &[IoMapping],
    num_slots: usize,
    side: SlotSide,
) -> Result<Vec<(usize, usize)>> {
    let mut table = vec![None; num_slots];

    for mapping in mappings {
        if mapping.group_io >= num_slots {
            return Err(Error::with_detail(
                ErrorKind::IoIndexOutOfBounds,
                format!(
                    "group i/o index {} with {} group slots",
                    mapping.group_io, num_slots
                ),
            ));
        }

        let task = tasks.get(mapping.task).ok_or_else(|| {
            Error::with_detail(
                ErrorKind::TaskIndexOutOfBounds,
                format!("mapping references member task {}", mapping.task),
            )
        })?;

        let slot = match side {
            SlotSide::Input => task.input(mapping.task_io),
            SlotSide::Output => task.output(mapping.task_io),
        };
        if slot.is_none() {
            return Err(Error::with_detail(
                ErrorKind::IoIndexOutOfBounds,
                format!(
                    "no such slot {} on member task {:?}",
                    mapping.task_io,
                    task.name()
                ),
            ));
        }

        if table[mapping.group_io].is_some() {
            return Err(Error::with_detail(
                ErrorKind::DuplicateMapping,
                format!("group i/o slot {} mapped twice", mapping.group_io),
            ));
        }
        table[mapping.group_io] = Some((mapping.task, mapping.task_io));
    }

    table
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            entry.ok_or_else(|| {
                Error::with_detail(
                    ErrorKind::IncompleteMapping,
                    format!("group i/o slot {} is unmapped", i),
                )
            })
        })
        .collect()
}

/// Every member input must be fed by some connection or deliberately left
/// open as a group-level input. Anything else is a wiring mistake that
/// would silently execute with stale data.
fn check_input_coverage(
    tasks: &[PresentTaskRef],
    connections: &[IngroupConnection],
    input_mappings: &[IoMapping],
) -> Result<()> {
    for (task_index, task) in tasks.iter().enumerate() {
        for input in 0..task.num_inputs() {
            let connected = connections
                .iter()
                .any(|c| c.dest_task == task_index && c.dest_input == input);
            let exposed = input_mappings
                .iter()
                .any(|m| m.task == task_index && m.task_io == input);
            if !connected && !exposed {
                return Err(Error::with_detail(
                    ErrorKind::DanglingInput,
                    format!("input {} of task {:?}", input, task.name()),
                ));
            }
        }
    }
    Ok(())
}
