//
// Copyright 2018 yvt, all rights reserved.
//
// This source code is a part of Nightingales.
//
//! The present task manager.
//!
//! # Terminology
//!
//! - A **present task** is an opaque unit of per-frame work with declared,
//!   typed inputs and outputs. Leaf tasks come in two flavors: a *CPU
//!   task* wraps a host-side callback that mutates CPU-visible state
//!   (typically staging memory for uniform data), a *GPU task* wraps a
//!   pre-recorded command buffer.
//! - A **group task** composes member tasks (CPU, GPU, or further groups)
//!   into a single opaque task. *Ingroup connections* wire one member's
//!   output slot to another member's input slot, and *I/O mappings* expose
//!   a subset of member slots as the group's own slots.
//! - **Unique inputs/outputs** are I/O slots whose identity is positional
//!   within a task's declared slot list. A slot may additionally carry a
//!   symbolic binding name, but the graph layer never keys on it.
//!
//! Connections assert *ordering*, not data movement: a consumer's input
//! slot aliases the producer's output object, so the only effect of a
//! connection is that the producer executes to completion first. Mutation
//! of the shared object happens inside the task bodies.
//!
//! Group construction is pure graph building — it validates the wiring,
//! computes an execution order, and retains the member tasks. No CPU or
//! GPU work is performed until the group is run.
mod info;
mod scheduler;
pub use self::info::*;
pub use self::scheduler::*;
