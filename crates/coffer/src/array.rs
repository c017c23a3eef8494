// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! The one-dimensional dynamic container.
//!
//! A [`ScriptArray`] owns one [`ElementBuffer`] and layers insert/remove,
//! search, and sort on top of it. Sorting is insertion sort on purpose: it is
//! stable, needs only O(1) scratch, and keeps the reentrancy surface small
//! when the comparator re-enters host execution.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::buffer::ElementBuffer;
use crate::compare::{ComparatorBridge, EqualityStrategy, SortOrder};
use crate::element::Element;
use crate::error::{ContainerError, Result};
use crate::gc::{self, Collectible, GcHeader};
use crate::host::{
    CallScope, CallableId, ContainerKind, HostServices, InstanceId, TypeDescriptor,
};
use crate::initlist::InitReader;

/// Resizable array of type-erased elements.
#[derive(Debug)]
pub struct ScriptArray {
    gc: GcHeader,
    buffer: ElementBuffer,
}

impl ScriptArray {
    /// Empty array for one element type.
    pub fn new(services: HostServices, ty: Arc<TypeDescriptor>) -> Self {
        let buffer = ElementBuffer::new(services, ty);
        if buffer.holds_references() {
            buffer
                .services()
                .objects
                .notify_new_collectible(ContainerKind::Array);
        }
        Self {
            gc: GcHeader::new(),
            buffer,
        }
    }

    /// Array of `len` default-constructed elements.
    pub fn with_len(services: HostServices, ty: Arc<TypeDescriptor>, len: usize) -> Result<Self> {
        let mut arr = Self::new(services, ty);
        arr.buffer.resize_by(len as isize, 0)?;
        Ok(arr)
    }

    /// Array of `len` copies of `fill`.
    pub fn with_value(
        services: HostServices,
        ty: Arc<TypeDescriptor>,
        len: usize,
        fill: &Element,
    ) -> Result<Self> {
        let mut arr = Self::with_len(services, ty, len)?;
        for i in 0..len {
            arr.buffer.set_value(i, fill)?;
        }
        Ok(arr)
    }

    /// Array decoded from a flat initializer buffer: `u32` count, then one
    /// 4-byte-aligned payload per element.
    pub fn from_flat_buffer(
        services: HostServices,
        ty: Arc<TypeDescriptor>,
        bytes: &[u8],
    ) -> Result<Self> {
        let mut arr = Self::new(services, ty);
        let mut reader = InitReader::new(bytes);
        let count = reader.read_u32()?;
        arr.buffer.reserve(count as usize)?;
        for _ in 0..count {
            reader.align4();
            let ty = arr.buffer.ty().clone();
            let elem = reader.read_element(arr.buffer.services(), &ty)?;
            arr.buffer.push_element(elem)?;
        }
        Ok(arr)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn element_type(&self) -> &Arc<TypeDescriptor> {
        self.buffer.ty()
    }

    pub fn services(&self) -> &HostServices {
        self.buffer.services()
    }

    /// Bounds-checked element access.
    pub fn at(&self, index: usize) -> Result<&Element> {
        self.buffer.get(index)
    }

    pub fn at_mut(&mut self, index: usize) -> Result<&mut Element> {
        self.buffer.get_mut(index)
    }

    /// Assign into an existing slot.
    pub fn set(&mut self, index: usize, value: &Element) -> Result<()> {
        self.buffer.set_value(index, value)
    }

    /// Insert a copy of `value` at `index`, shifting the tail up.
    pub fn insert_at(&mut self, index: usize, value: &Element) -> Result<()> {
        self.buffer.check_source(value)?;
        if index > self.len() {
            return Err(ContainerError::IndexOutOfBounds {
                index,
                length: self.len(),
            });
        }
        let copy = value.try_clone()?;
        self.buffer.splice_elements(index, vec![copy])
    }

    /// Insert copies of every element of `other` at `index`.
    pub fn insert_range(&mut self, index: usize, other: &ScriptArray) -> Result<()> {
        if other.element_type().id != self.element_type().id {
            return Err(ContainerError::TypeMismatch {
                expected: self.element_type().name.to_string(),
                got: other.element_type().name.to_string(),
            });
        }
        if index > self.len() {
            return Err(ContainerError::IndexOutOfBounds {
                index,
                length: self.len(),
            });
        }
        let mut copies = Vec::new();
        copies
            .try_reserve(other.len())
            .map_err(|_| ContainerError::OutOfMemory)?;
        for elem in other.iter() {
            copies.push(elem.try_clone()?);
        }
        self.buffer.splice_elements(index, copies)
    }

    /// Remove the element at `index`, shifting the tail down.
    pub fn remove_at(&mut self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Err(ContainerError::IndexOutOfBounds {
                index,
                length: self.len(),
            });
        }
        self.buffer.resize_by(-1, index)
    }

    /// Remove `count` elements starting at `start`.
    pub fn remove_range(&mut self, start: usize, count: usize) -> Result<()> {
        let end = start
            .checked_add(count)
            .ok_or(ContainerError::IndexOutOfBounds {
                index: usize::MAX,
                length: self.len(),
            })?;
        if end > self.len() {
            return Err(ContainerError::IndexOutOfBounds {
                index: end,
                length: self.len(),
            });
        }
        self.buffer.resize_by(-(count as isize), start)
    }

    /// Append a copy of `value`.
    pub fn push(&mut self, value: &Element) -> Result<()> {
        self.buffer.check_source(value)?;
        let copy = value.try_clone()?;
        self.buffer.push_element(copy)
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<Element> {
        self.buffer.pop()
    }

    /// Grow capacity without changing length.
    pub fn reserve(&mut self, min_capacity: usize) -> Result<()> {
        self.buffer.reserve(min_capacity)
    }

    /// Grow with default elements or shrink, at the tail.
    pub fn resize(&mut self, new_len: usize) -> Result<()> {
        let len = self.len();
        if new_len >= len {
            self.buffer.resize_by((new_len - len) as isize, len)
        } else {
            self.buffer.resize_by(-((len - new_len) as isize), new_len)
        }
    }

    /// Reverse in place by pairwise slot swap.
    pub fn reverse(&mut self) {
        self.buffer.reverse();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.buffer.iter()
    }

    /// Index of the first element equal to `value` at or after `start`.
    ///
    /// Non-primitive types need a uniquely resolvable equality callable (a
    /// unique ordering callable is the fallback); null handles equal only
    /// each other and never invoke the callable.
    pub fn find(&self, value: &Element, start: usize, scope: CallScope) -> Result<Option<usize>> {
        self.buffer.check_source(value)?;
        let ty = self.buffer.ty().clone();
        let strategy = self.equality_strategy_for(&ty)?;
        let services = self.buffer.services().clone();
        let bridge = ComparatorBridge::new(&services, scope);
        for (i, elem) in self.buffer.slots().iter().enumerate().skip(start) {
            if slots_equal(&bridge, strategy, &ty, elem, value)? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Index of the first element identical to `value` (handle/address
    /// equality only, no callable invocation).
    pub fn find_by_identity(&self, value: &Element, start: usize) -> Result<Option<usize>> {
        self.buffer.check_source(value)?;
        for (i, elem) in self.buffer.slots().iter().enumerate().skip(start) {
            if elem.identity_eq(value) {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Element-wise equality against another array. Different element types
    /// or lengths are unequal, not an error.
    pub fn elements_equal(&self, other: &ScriptArray, scope: CallScope) -> Result<bool> {
        if self.element_type().id != other.element_type().id || self.len() != other.len() {
            return Ok(false);
        }
        let ty = self.buffer.ty().clone();
        let strategy = self.equality_strategy_for(&ty)?;
        let services = self.buffer.services().clone();
        let bridge = ComparatorBridge::new(&services, scope);
        for (a, b) in self.buffer.slots().iter().zip(other.buffer.slots()) {
            if !slots_equal(&bridge, strategy, &ty, a, b)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Sort the whole array ascending.
    pub fn sort_ascending(&mut self, scope: CallScope) -> Result<()> {
        self.sort(0, self.len(), SortOrder::Ascending, scope)
    }

    /// Sort the whole array descending.
    pub fn sort_descending(&mut self, scope: CallScope) -> Result<()> {
        self.sort(0, self.len(), SortOrder::Descending, scope)
    }

    /// Stable insertion sort over `[start, start + count)`.
    pub fn sort(
        &mut self,
        start: usize,
        count: usize,
        order: SortOrder,
        scope: CallScope,
    ) -> Result<()> {
        self.check_range(start, count)?;
        let ty = self.buffer.ty().clone();
        let callable = if ty.is_primitive() {
            None
        } else {
            let services = self.buffer.services();
            Some(services.comparators.unique_ordering(&*services.objects, &ty)?)
        };
        let services = self.buffer.services().clone();
        let bridge = ComparatorBridge::new(&services, scope);
        let slots = &mut self.buffer.slots_mut()[start..start + count];
        insertion_sort(slots, |a, b| {
            let cmp = compare_slots(&bridge, callable, &ty, a, b)?;
            Ok(match order {
                SortOrder::Ascending => cmp == Ordering::Less,
                SortOrder::Descending => cmp == Ordering::Greater,
            })
        })
    }

    /// Sort `[start, start + count)` with a caller-supplied ordering
    /// callable instead of the type's resolved comparator.
    pub fn sort_with(
        &mut self,
        callable: CallableId,
        start: usize,
        count: usize,
        scope: CallScope,
    ) -> Result<()> {
        self.check_range(start, count)?;
        let ty = self.buffer.ty().clone();
        let services = self.buffer.services().clone();
        let bridge = ComparatorBridge::new(&services, scope);
        let slots = &mut self.buffer.slots_mut()[start..start + count];
        insertion_sort(slots, |a, b| match (a, b) {
            (Element::Prim(x), Element::Prim(y)) => Ok(x.compare(y) == Ordering::Less),
            (Element::Handle(None), Element::Handle(_)) => Ok(matches!(b, Element::Handle(Some(_)))),
            (Element::Handle(Some(_)), Element::Handle(None)) => Ok(false),
            _ => bridge.less_by(callable, &ty, a, b),
        })
    }

    fn check_range(&self, start: usize, count: usize) -> Result<()> {
        let end = start
            .checked_add(count)
            .ok_or(ContainerError::IndexOutOfBounds {
                index: usize::MAX,
                length: self.len(),
            })?;
        if end > self.len() {
            return Err(ContainerError::IndexOutOfBounds {
                index: end,
                length: self.len(),
            });
        }
        Ok(())
    }

    fn equality_strategy_for(&self, ty: &TypeDescriptor) -> Result<Option<EqualityStrategy>> {
        if ty.is_primitive() {
            return Ok(None);
        }
        let services = self.buffer.services();
        Ok(Some(
            services
                .comparators
                .equality_strategy(&*services.objects, ty)?,
        ))
    }
}

impl Collectible for ScriptArray {
    fn add_ref(&self) -> u32 {
        self.gc.add_ref()
    }

    fn release(&self) -> u32 {
        self.gc.release()
    }

    fn ref_count(&self) -> u32 {
        self.gc.count()
    }

    fn set_gc_flag(&self) {
        self.gc.set_mark();
    }

    fn gc_flag(&self) -> bool {
        self.gc.marked()
    }

    fn enumerate_references(&self, visit: &mut dyn FnMut(InstanceId)) {
        gc::enumerate_slots(&*self.buffer.services().objects, self.buffer.slots(), visit);
    }

    fn release_all_references(&mut self) {
        log::debug!(
            "[ScriptArray] release_all_references: dropping {} slots",
            self.buffer.len()
        );
        self.buffer.clear();
    }
}

/// Strict ordering between two slots of one element type. Null handles order
/// before every non-null value and equal only to each other.
fn compare_slots(
    bridge: &ComparatorBridge<'_>,
    callable: Option<CallableId>,
    ty: &TypeDescriptor,
    a: &Element,
    b: &Element,
) -> Result<Ordering> {
    match (a, b) {
        (Element::Prim(x), Element::Prim(y)) => Ok(x.compare(y)),
        (Element::Handle(None), Element::Handle(None)) => Ok(Ordering::Equal),
        (Element::Handle(None), Element::Handle(Some(_))) => Ok(Ordering::Less),
        (Element::Handle(Some(_)), Element::Handle(None)) => Ok(Ordering::Greater),
        _ => {
            let callable = callable.ok_or_else(|| ContainerError::NoOrderingAvailable {
                type_name: ty.name.to_string(),
            })?;
            bridge.order(callable, ty, a, b)
        }
    }
}

/// Equality between two slots of one element type.
fn slots_equal(
    bridge: &ComparatorBridge<'_>,
    strategy: Option<EqualityStrategy>,
    ty: &TypeDescriptor,
    a: &Element,
    b: &Element,
) -> Result<bool> {
    match (a, b) {
        (Element::Prim(x), Element::Prim(y)) => Ok(x == y),
        (Element::Handle(None), Element::Handle(None)) => Ok(true),
        (Element::Handle(None), Element::Handle(Some(_)))
        | (Element::Handle(Some(_)), Element::Handle(None)) => Ok(false),
        _ => {
            let strategy = strategy.ok_or_else(|| ContainerError::NoOrderingAvailable {
                type_name: ty.name.to_string(),
            })?;
            match strategy {
                EqualityStrategy::Equality(c) => bridge.equals_by(c, ty, a, b),
                EqualityStrategy::Ordering(c) => {
                    Ok(bridge.order(c, ty, a, b)? == Ordering::Equal)
                }
            }
        }
    }
}

/// Stable insertion sort with a fallible "sorts before" predicate. Aborts
/// immediately on the first predicate error, leaving a permutation of the
/// input (never duplicated or lost elements).
fn insertion_sort<F>(slots: &mut [Element], mut before: F) -> Result<()>
where
    F: FnMut(&Element, &Element) -> Result<bool>,
{
    for i in 1..slots.len() {
        let mut j = i;
        while j > 0 && before(&slots[j], &slots[j - 1])? {
            slots.swap(j, j - 1);
            j -= 1;
        }
    }
    Ok(())
}
