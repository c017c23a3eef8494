// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! The two-dimensional dense container.
//!
//! A [`ScriptGrid`] stores `width * height` elements row-major
//! (`index = x + y * width`) with the same element-lifecycle rules as the
//! array. Resizing preserves the overlapping sub-rectangle of the old and new
//! geometry; rows are not contiguous across width changes, so the move is
//! per-row. No search or sort.

use std::sync::Arc;

use crate::buffer::{max_elements, ElementBuffer};
use crate::element::Element;
use crate::error::{ContainerError, Result};
use crate::gc::{self, Collectible, GcHeader};
use crate::host::{ContainerKind, HostServices, InstanceId, TypeDescriptor};

/// Dense 2-D store of type-erased elements.
#[derive(Debug)]
pub struct ScriptGrid {
    gc: GcHeader,
    width: usize,
    height: usize,
    buffer: ElementBuffer,
}

impl ScriptGrid {
    /// Grid of `width * height` default-constructed elements.
    pub fn new(
        services: HostServices,
        ty: Arc<TypeDescriptor>,
        width: usize,
        height: usize,
    ) -> Result<Self> {
        let cells = checked_area(width, height)?;
        let buffer = ElementBuffer::with_len(services, ty, cells)?;
        if buffer.holds_references() {
            buffer
                .services()
                .objects
                .notify_new_collectible(ContainerKind::Grid);
        }
        Ok(Self {
            gc: GcHeader::new(),
            width,
            height,
            buffer,
        })
    }

    /// Grid filled with copies of `fill`.
    pub fn with_value(
        services: HostServices,
        ty: Arc<TypeDescriptor>,
        width: usize,
        height: usize,
        fill: &Element,
    ) -> Result<Self> {
        let mut grid = Self::new(services, ty, width, height)?;
        for i in 0..grid.buffer.len() {
            grid.buffer.set_value(i, fill)?;
        }
        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn element_type(&self) -> &Arc<TypeDescriptor> {
        self.buffer.ty()
    }

    pub fn services(&self) -> &HostServices {
        self.buffer.services()
    }

    fn index(&self, x: usize, y: usize) -> Result<usize> {
        if x >= self.width || y >= self.height {
            return Err(ContainerError::IndexOutOfBounds {
                index: x + y * self.width.max(1),
                length: self.buffer.len(),
            });
        }
        Ok(x + y * self.width)
    }

    /// Bounds-checked cell access.
    pub fn at(&self, x: usize, y: usize) -> Result<&Element> {
        let i = self.index(x, y)?;
        self.buffer.get(i)
    }

    pub fn at_mut(&mut self, x: usize, y: usize) -> Result<&mut Element> {
        let i = self.index(x, y)?;
        self.buffer.get_mut(i)
    }

    /// Assign into an existing cell.
    pub fn set(&mut self, x: usize, y: usize, value: &Element) -> Result<()> {
        let i = self.index(x, y)?;
        self.buffer.set_value(i, value)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.buffer.iter()
    }

    /// Re-lay-out to `new_width * new_height`, moving the overlapping
    /// `min(old, new)` rectangle row by row and default-constructing newly
    /// exposed cells.
    ///
    /// Defaults for the exposed cells are fully constructed before any
    /// mutation, so a host failure leaves the grid untouched.
    pub fn resize(&mut self, new_width: usize, new_height: usize) -> Result<()> {
        let total = checked_area(new_width, new_height)?;
        let keep_w = self.width.min(new_width);
        let keep_h = self.height.min(new_height);

        let mut fresh = Vec::new();
        fresh
            .try_reserve(total - keep_w * keep_h)
            .map_err(|_| ContainerError::OutOfMemory)?;
        for _ in 0..total - keep_w * keep_h {
            fresh.push(self.buffer.default_slot()?);
        }
        let mut slots = Vec::new();
        slots
            .try_reserve(total)
            .map_err(|_| ContainerError::OutOfMemory)?;

        // Commit phase: move only, no fallible host calls.
        let old_width = self.width;
        let mut old: Vec<Option<Element>> =
            self.buffer.take_slots().into_iter().map(Some).collect();
        for y in 0..new_height {
            for x in 0..new_width {
                let slot = if x < keep_w && y < keep_h {
                    old[x + y * old_width].take()
                } else {
                    fresh.pop()
                };
                if let Some(elem) = slot {
                    slots.push(elem);
                }
            }
        }
        self.buffer.replace_slots(slots);
        self.width = new_width;
        self.height = new_height;
        Ok(())
    }
}

impl Collectible for ScriptGrid {
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
            "[ScriptGrid] release_all_references: dropping {}x{} cells",
            self.width,
            self.height
        );
        self.buffer.clear();
        self.width = 0;
        self.height = 0;
    }
}

fn checked_area(width: usize, height: usize) -> Result<usize> {
    let cells = width
        .checked_mul(height)
        .ok_or(ContainerError::SizeLimitExceeded {
            requested: usize::MAX,
            max: max_elements(),
        })?;
    if cells > max_elements() {
        return Err(ContainerError::SizeLimitExceeded {
            requested: cells,
            max: max_elements(),
        });
    }
    Ok(cells)
}
