//
// Copyright 2018 yvt, all rights reserved.
//
// This source code is a part of Nightingales.
//
//! Memoization helpers for per-frame present-task producers.
//!
//! Every renderer that builds a present-task graph each frame (blur,
//! skybox, raycaster, ...) follows the same policy: remember the one task
//! built last time together with the exact parameter tuple that produced
//! it, reuse it while the tuple stays identical, and rebuild from scratch
//! the moment any element differs. This is memoization with
//! invalidation-by-equality — the capacity is exactly one entry per
//! producer, never an LRU.
use parking_lot::Mutex;

use crate::error::Result;
use crate::presentman::PresentTaskRef;

#[cfg(test)]
#[path = "./cache_test.rs"]
mod cache_test;

/// A single-entry present-task cache keyed by the full parameter tuple.
///
/// `P` is whatever the producer's output depends on — resource
/// identities, resolution enums, iteration counts. Equality must cover
/// the *entire* tuple; keying on the render-target handle alone would
/// return stale graphs when a numeric parameter changes.
#[derive(Debug, Default)]
pub struct TaskCache<P> {
    entry: Mutex<Option<(P, PresentTaskRef)>>,
}

impl<P: PartialEq> TaskCache<P> {
    pub fn new() -> Self {
        Self {
            entry: Mutex::new(None),
        }
    }

    /// Return the cached task if `params` matches the tuple it was built
    /// from, otherwise drop the stale task and build a replacement.
    ///
    /// The stale entry is released *before* `build` runs, so a failed
    /// rebuild never leaves a retained graph behind, and the cache is
    /// empty afterwards in that case.
    pub fn get_or_build<F>(&self, params: P, build: F) -> Result<PresentTaskRef>
    where
        F: FnOnce(&P) -> Result<PresentTaskRef>,
    {
        let mut entry = self.entry.lock();

        if let Some((ref cached_params, ref task)) = *entry {
            if *cached_params == params {
                return Ok(task.clone());
            }
        }

        *entry = None;

        let task = build(&params)?;
        *entry = Some((params, task.clone()));
        Ok(task)
    }

    /// Drop the cached entry, forcing a rebuild on the next request.
    pub fn invalidate(&self) {
        self.entry.lock().take();
    }
}

/// Change-detection state for values that are expensive to push to the
/// device, e.g. uniform data uploaded from a CPU task callback.
///
/// Holds the last value handed to [`update`](ShadowState::update); the
/// method reports whether an upload is actually needed. One `ShadowState`
/// per task instance — sharing one across instances (or hiding one in a
/// function-local static) breaks as soon as two instances interleave.
#[derive(Debug, Default)]
pub struct ShadowState<T> {
    last: Option<T>,
}

impl<T: PartialEq> ShadowState<T> {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Record `value` and return `true` if it differs from the previously
    /// recorded one. The first call always returns `true`.
    pub fn update(&mut self, value: T) -> bool {
        if self.last.as_ref() == Some(&value) {
            return false;
        }
        self.last = Some(value);
        true
    }

    /// The last recorded value, if any.
    pub fn get(&self) -> Option<&T> {
        self.last.as_ref()
    }

    /// Forget the recorded value so the next `update` reports a change.
    pub fn invalidate(&mut self) {
        self.last = None;
    }
}
