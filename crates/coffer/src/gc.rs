// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! Cooperation protocol with the host's tracing cycle collector.
//!
//! Containers are reference-counted by the host; the tracer additionally
//! needs a mark flag, reference enumeration, and a way to forcibly drop every
//! owned reference when it sweeps a cycle. The mark flag clears on every
//! add-ref/release so the tracer can detect objects touched since its pass.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::element::Element;
use crate::host::{InstanceId, ObjectModel};

/// Atomic reference count plus GC mark flag.
///
/// Counts are atomic because a container can be shared across threads through
/// host handle semantics even though mutation is not thread-safe.
#[derive(Debug)]
pub struct GcHeader {
    refs: AtomicU32,
    mark: AtomicBool,
}

impl GcHeader {
    /// Fresh header with one outstanding reference.
    pub fn new() -> Self {
        Self {
            refs: AtomicU32::new(1),
            mark: AtomicBool::new(false),
        }
    }

    /// Increment; returns the new count. Clears the mark flag.
    pub fn add_ref(&self) -> u32 {
        self.mark.store(false, Ordering::Release);
        self.refs.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement; returns the remaining count. Clears the mark flag.
    /// The caller must hold a reference.
    pub fn release(&self) -> u32 {
        self.mark.store(false, Ordering::Release);
        self.refs.fetch_sub(1, Ordering::AcqRel) - 1
    }

    pub fn count(&self) -> u32 {
        self.refs.load(Ordering::Acquire)
    }

    pub fn set_mark(&self) {
        self.mark.store(true, Ordering::Release);
    }

    pub fn marked(&self) -> bool {
        self.mark.load(Ordering::Acquire)
    }
}

impl Default for GcHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// The GC-protocol operations every container exposes to the host.
///
/// `release` returns the remaining count; the embedder frees the container
/// when it reaches zero. `release_all_references` is used only by the cycle
/// sweep: it drops every owned reference immediately instead of waiting for
/// normal teardown.
pub trait Collectible {
    fn add_ref(&self) -> u32;
    fn release(&self) -> u32;
    fn ref_count(&self) -> u32;
    fn set_gc_flag(&self);
    fn gc_flag(&self) -> bool;
    fn enumerate_references(&self, visit: &mut dyn FnMut(InstanceId));
    fn release_all_references(&mut self);
}

/// Report every foreign reference held by a slot run, forwarding into
/// traceable by-value instances.
pub(crate) fn enumerate_slots(
    objects: &dyn ObjectModel,
    slots: &[Element],
    visit: &mut dyn FnMut(InstanceId),
) {
    for slot in slots {
        match slot {
            Element::Handle(Some(h)) => visit(h.id()),
            Element::Value(v) if v.ty().traceable => {
                objects.forward_trace(v.ty(), v.id(), visit);
            }
            _ => {}
        }
    }
}
