//
// Copyright 2018 yvt, all rights reserved.
//
// This source code is a part of Nightingales.
//
//! Handle types for the objects the present-task graph merely refers to.
//!
//! The graph layer never inspects the formats or contents of device
//! objects — it only needs (1) a shared, cloneable reference with a stable
//! identity and (2) a coarse [`ObjectKind`] tag used to validate that a
//! producer's output slot is wired to a compatible consumer input slot.
//! Everything else (allocation, recording, binding) belongs to the device
//! layer.
//!
//! Handle types are distinguished by the suffix `Ref` and they behave like
//! `Arc`s from the application developer's perspective: dropping a handle
//! does not necessarily destroy the underlying object, and `Clone` clones
//! only the reference.
use std::{any::Any, fmt, sync::Arc};

use crate::error::Result;

/// Supports conversion to `dyn Any + Send + Sync`. This trait is
/// automatically implemented on every `impl Any + Send + Sync`.
pub trait AsAnySendSync: Any + Send + Sync {
    fn as_any(&self) -> &(dyn Any + Send + Sync);
    fn as_any_mut(&mut self) -> &mut (dyn Any + Send + Sync);
}

impl<T: Any + Send + Sync> AsAnySendSync for T {
    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
    fn as_any_mut(&mut self) -> &mut (dyn Any + Send + Sync) {
        self
    }
}

/// The coarse classification of a device object referenced by an I/O slot.
///
/// Kind tags exist solely so that connection compatibility can be checked
/// when a group task is built; the graph layer performs no format or size
/// introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Buffer,
    Texture,
    TextureView,
    Sampler,
}

/// A device object that can be referenced by an I/O slot. This is
/// automatically implemented on all compatible types.
pub trait RalObject: AsAnySendSync + fmt::Debug {}

impl<T: AsAnySendSync + fmt::Debug> RalObject for T {}

impl dyn RalObject {
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self).as_any().downcast_ref()
    }
}

/// An opaque shared reference to a device object (buffer, texture, texture
/// view, ...).
///
/// Equality is referential: two `ResourceRef`s compare equal iff they point
/// at the same underlying object. This is the identity notion used by
/// [`TaskCache`](crate::cache::TaskCache) parameter tuples.
#[derive(Debug, Clone)]
pub struct ResourceRef {
    object: Arc<dyn RalObject>,
}

impl ResourceRef {
    pub fn new<T: RalObject>(object: T) -> Self {
        Self {
            object: Arc::new(object),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        // Deref past the `Arc` first; the blanket `AsAnySendSync` impl
        // would otherwise apply to the `Arc` itself.
        (*self.object).as_any().downcast_ref()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }
}

impl PartialEq for ResourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ResourceRef {}

/// Trait for command buffers, as far as this crate is concerned.
///
/// Recording (`start_recording`, `record_*`, `stop_recording`) is entirely
/// the device layer's business; the graph layer only ever asks whether
/// recording has finished, because a GPU task may only wrap a fully
/// recorded command buffer and never mutates it afterwards.
pub trait CmdBuffer: AsAnySendSync + fmt::Debug {
    /// Return `true` if recording has been stopped and the command buffer
    /// is ready for submission.
    fn is_recorded(&self) -> bool;
}

/// An opaque shared reference to a command buffer.
#[derive(Debug, Clone)]
pub struct CmdBufferRef {
    inner: Arc<dyn CmdBuffer>,
}

impl CmdBufferRef {
    pub fn new<T: CmdBuffer>(cmd_buffer: T) -> Self {
        Self {
            inner: Arc::new(cmd_buffer),
        }
    }

    pub fn is_recorded(&self) -> bool {
        self.inner.is_recorded()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.inner).as_any().downcast_ref()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for CmdBufferRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for CmdBufferRef {}

/// Trait for the queue a present-task run submits GPU work to.
///
/// Device-side failures (`OutOfDeviceMemory`, `DeviceLost`, ...) surface
/// through the returned `Result` and abort the run; the graph layer adds
/// no retry logic on top.
pub trait GpuQueue: fmt::Debug {
    /// Submit a recorded command buffer for execution.
    fn submit(&mut self, cmd_buffer: &CmdBufferRef) -> Result<()>;
}
