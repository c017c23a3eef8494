// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! The contiguous slot store backing arrays and grids.
//!
//! One [`ElementBuffer`] is owned by exactly one container. Slots `[0, len)`
//! hold constructed elements; spare capacity is uninitialized. Reallocation
//! moves slots without touching host reference counts (ownership transfer,
//! not copy).

use std::sync::Arc;

use crate::element::Element;
use crate::error::{ContainerError, Result};
use crate::host::{HostServices, StorageClass, TypeDescriptor};

/// Maximum representable element count for the platform's size type.
pub fn max_elements() -> usize {
    isize::MAX as usize / std::mem::size_of::<Element>()
}

/// Length/capacity bookkeeping plus element lifecycle over a slot vector.
#[derive(Debug)]
pub struct ElementBuffer {
    services: HostServices,
    ty: Arc<TypeDescriptor>,
    slots: Vec<Element>,
}

impl ElementBuffer {
    /// Empty buffer for one element type.
    pub fn new(services: HostServices, ty: Arc<TypeDescriptor>) -> Self {
        Self {
            services,
            ty,
            slots: Vec::new(),
        }
    }

    /// Buffer with `len` default-constructed slots: zeroed primitives, host
    /// default instances for by-value types, null handles.
    pub fn with_len(services: HostServices, ty: Arc<TypeDescriptor>, len: usize) -> Result<Self> {
        let mut buf = Self::new(services, ty);
        buf.resize_by(len as isize, 0)?;
        Ok(buf)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn ty(&self) -> &Arc<TypeDescriptor> {
        &self.ty
    }

    pub fn services(&self) -> &HostServices {
        &self.services
    }

    /// Grow capacity to hold at least `min_capacity` elements; length is
    /// unchanged.
    pub fn reserve(&mut self, min_capacity: usize) -> Result<()> {
        if min_capacity > max_elements() {
            return Err(ContainerError::SizeLimitExceeded {
                requested: min_capacity,
                max: max_elements(),
            });
        }
        if min_capacity > self.slots.capacity() {
            self.slots
                .try_reserve(min_capacity - self.slots.len())
                .map_err(|_| ContainerError::OutOfMemory)?;
        }
        Ok(())
    }

    /// Bounds-checked slot access.
    pub fn get(&self, index: usize) -> Result<&Element> {
        self.slots
            .get(index)
            .ok_or(ContainerError::IndexOutOfBounds {
                index,
                length: self.slots.len(),
            })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Element> {
        let length = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(ContainerError::IndexOutOfBounds { index, length })
    }

    /// Default element for this buffer's type.
    pub(crate) fn default_slot(&self) -> Result<Element> {
        Element::default_for(&self.services, &self.ty)
    }

    /// Assign into an existing slot, dispatching on storage kind: exact-width
    /// primitive copy, host copy-assign for by-value objects (never
    /// reallocates the slot), add-ref-then-release handle swap so
    /// self-assignment never transiently drops the last reference.
    pub fn set_value(&mut self, index: usize, src: &Element) -> Result<()> {
        self.check_source(src)?;
        let slot = self.get_mut(index)?;
        match (slot, src) {
            (Element::Prim(dst), Element::Prim(s)) => *dst = *s,
            (Element::Value(dst), Element::Value(s)) => dst.assign_from(s)?,
            (Element::Handle(dst), Element::Handle(s)) => {
                let incoming = s.clone();
                *dst = incoming;
            }
            (slot, src) => {
                return Err(ContainerError::TypeMismatch {
                    expected: slot.describe(),
                    got: src.describe(),
                })
            }
        }
        Ok(())
    }

    pub(crate) fn check_source(&self, src: &Element) -> Result<()> {
        if src.matches(&self.ty) {
            Ok(())
        } else {
            Err(ContainerError::TypeMismatch {
                expected: self.ty.name.to_string(),
                got: src.describe(),
            })
        }
    }

    /// Insert or remove `delta` slots at `at`.
    ///
    /// Negative delta destructs `[at, at - delta)` then closes the gap;
    /// positive delta opens a gap at `at` filled with default-constructed
    /// elements. Defaults are fully constructed before any mutation so a host
    /// failure leaves the buffer untouched. An out-of-range `at` is an error,
    /// not a clamp.
    pub fn resize_by(&mut self, delta: isize, at: usize) -> Result<()> {
        let len = self.slots.len();
        if at > len {
            return Err(ContainerError::IndexOutOfBounds { index: at, length: len });
        }
        if delta == 0 {
            return Ok(());
        }
        if delta < 0 {
            let removed = delta.unsigned_abs();
            if at + removed > len {
                return Err(ContainerError::IndexOutOfBounds {
                    index: at + removed,
                    length: len,
                });
            }
            self.slots.drain(at..at + removed);
            return Ok(());
        }

        let added = delta as usize;
        let new_len = len
            .checked_add(added)
            .ok_or(ContainerError::SizeLimitExceeded {
                requested: usize::MAX,
                max: max_elements(),
            })?;
        self.reserve(new_len)?;
        let mut fresh = Vec::new();
        fresh
            .try_reserve(added)
            .map_err(|_| ContainerError::OutOfMemory)?;
        for _ in 0..added {
            fresh.push(self.default_slot()?);
        }
        self.slots.splice(at..at, fresh);
        Ok(())
    }

    /// Append one constructed element, taking ownership.
    pub(crate) fn push_element(&mut self, elem: Element) -> Result<()> {
        self.check_source(&elem)?;
        self.reserve(self.slots.len() + 1)?;
        self.slots.push(elem);
        Ok(())
    }

    /// Insert pre-constructed elements at `at`, taking ownership.
    pub(crate) fn splice_elements(&mut self, at: usize, elems: Vec<Element>) -> Result<()> {
        let len = self.slots.len();
        if at > len {
            return Err(ContainerError::IndexOutOfBounds { index: at, length: len });
        }
        self.reserve(len + elems.len())?;
        self.slots.splice(at..at, elems);
        Ok(())
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<Element> {
        self.slots.pop()
    }

    /// Destruct every live slot; capacity is retained.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Pairwise slot swap, first against last.
    pub fn reverse(&mut self) {
        let len = self.slots.len();
        for i in 0..len / 2 {
            self.slots.swap(i, len - 1 - i);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.slots.iter()
    }

    pub(crate) fn slots(&self) -> &[Element] {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [Element] {
        &mut self.slots
    }

    /// Take the slot vector out, leaving the buffer empty. Grid re-layout
    /// moves slots between geometries through this.
    pub(crate) fn take_slots(&mut self) -> Vec<Element> {
        std::mem::take(&mut self.slots)
    }

    pub(crate) fn replace_slots(&mut self, slots: Vec<Element>) {
        self.slots = slots;
    }

    /// True when the element type can hold references a tracer cares about.
    pub(crate) fn holds_references(&self) -> bool {
        matches!(self.ty.storage, StorageClass::ByHandle) || self.ty.traceable
    }
}
