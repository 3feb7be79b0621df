//
// Copyright 2018 yvt, all rights reserved.
//
// This source code is a part of Nightingales.
//
//! NgsPresent — Nightingales present-task graph
//!
//! Provides components for composing host-side callback work and
//! pre-recorded GPU command buffers into dependency-ordered *present
//! tasks*, the unit of per-frame scheduling at the rendering abstraction
//! layer (RAL).
//!
//! The interesting parts live in [`presentman`](presentman/index.html).
//! [`handles`](handles/index.html) defines the opaque references through
//! which this crate talks to the device layer, and
//! [`cache`](cache/index.html) provides the memoization helpers used by
//! per-frame graph producers.
pub mod cache;
pub mod error;
pub mod handles;
pub mod presentman;

pub use crate::error::{Error, ErrorKind, Result};
