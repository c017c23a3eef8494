// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! The single-slot type-erased storage unit behind dictionary entries.
//!
//! A [`ValueCell`] holds at most one value. Integer-family primitives are
//! widened to i64 and floats to f64 so retrieval can offer the documented
//! numeric conversions; the original descriptor is kept for exact type
//! reporting. Storing always prepares the incoming value first and releases
//! the previous one after, so a failed store leaves the cell unchanged and a
//! self-assignment never transiently drops the last reference.

use std::fmt;
use std::sync::Arc;

use crate::element::{Element, ObjectHandle, PrimValue, ValueInstance};
use crate::error::{ContainerError, Result};
use crate::gc::Collectible;
use crate::gc::GcHeader;
use crate::host::{HostServices, InstanceId, StorageClass, TypeDescriptor};

/// Widened payload of one cell.
#[derive(Debug)]
pub enum CellPayload {
    Int(i64),
    Float(f64),
    Value(ValueInstance),
    Handle(Option<ObjectHandle>),
}

/// One type-erased value slot.
pub struct ValueCell {
    gc: GcHeader,
    services: HostServices,
    state: Option<(Arc<TypeDescriptor>, CellPayload)>,
}

impl ValueCell {
    /// Empty cell.
    pub fn empty(services: HostServices) -> Self {
        Self {
            gc: GcHeader::new(),
            services,
            state: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_none()
    }

    /// Descriptor of the held value, if any.
    pub fn type_of(&self) -> Option<&Arc<TypeDescriptor>> {
        self.state.as_ref().map(|(ty, _)| ty)
    }

    /// The raw widened payload, if any.
    pub fn payload(&self) -> Option<&CellPayload> {
        self.state.as_ref().map(|(_, p)| p)
    }

    /// Store a value under a descriptor, replacing whatever is held.
    pub fn store(&mut self, ty: &Arc<TypeDescriptor>, value: &Element) -> Result<()> {
        if !value.matches(ty) {
            return Err(ContainerError::TypeMismatch {
                expected: ty.name.to_string(),
                got: value.describe(),
            });
        }
        // In-place copy-assign when the cell already holds the same by-value
        // type; the slot's storage is never reallocated.
        if let (Some((cur_ty, CellPayload::Value(dst))), Element::Value(src)) =
            (self.state.as_mut(), value)
        {
            if cur_ty.id == ty.id {
                return dst.assign_from(src);
            }
        }
        let payload = match value {
            Element::Prim(p) => match p.widen_float() {
                Some(f) => CellPayload::Float(f),
                None => CellPayload::Int(p.widen_int().unwrap_or(0)),
            },
            Element::Value(v) => CellPayload::Value(v.try_clone()?),
            Element::Handle(h) => CellPayload::Handle(h.clone()),
        };
        // The incoming reference is secured; the old payload drops after.
        self.state = Some((ty.clone(), payload));
        Ok(())
    }

    /// Retrieve a copy of the held value as the requested type.
    ///
    /// Exact type match, or a documented numeric widening conversion
    /// (integer<->double, bool<->integer/double). Anything else is a
    /// `TypeMismatch`, never a garbage value.
    pub fn load(&self, ty: &Arc<TypeDescriptor>) -> Result<Element> {
        let (held_ty, payload) = self.state.as_ref().ok_or_else(|| {
            ContainerError::TypeMismatch {
                expected: ty.name.to_string(),
                got: "nothing".to_string(),
            }
        })?;
        if held_ty.id == ty.id {
            return match (payload, held_ty.storage) {
                (CellPayload::Int(v), StorageClass::Primitive(kind)) => {
                    Ok(Element::Prim(PrimValue::from_widened_int(kind, *v)))
                }
                (CellPayload::Float(v), StorageClass::Primitive(kind)) => {
                    Ok(Element::Prim(PrimValue::from_widened_float(kind, *v)))
                }
                (CellPayload::Value(v), _) => Ok(Element::Value(v.try_clone()?)),
                (CellPayload::Handle(h), _) => Ok(Element::Handle(h.clone())),
                _ => Err(ContainerError::TypeMismatch {
                    expected: ty.name.to_string(),
                    got: held_ty.name.to_string(),
                }),
            };
        }
        // Cross-type retrieval: numeric widening only.
        let requested = ty.primitive_kind().ok_or_else(|| self.mismatch(ty))?;
        match payload {
            CellPayload::Int(v) => Ok(Element::Prim(PrimValue::from_widened_int(requested, *v))),
            CellPayload::Float(v) => {
                Ok(Element::Prim(PrimValue::from_widened_float(requested, *v)))
            }
            _ => Err(self.mismatch(ty)),
        }
    }

    /// Held numeric value widened to i64.
    pub fn load_int(&self) -> Result<i64> {
        match self.payload() {
            Some(CellPayload::Int(v)) => Ok(*v),
            Some(CellPayload::Float(v)) => Ok(*v as i64),
            _ => Err(self.numeric_mismatch("integer")),
        }
    }

    /// Held numeric value widened to f64.
    pub fn load_float(&self) -> Result<f64> {
        match self.payload() {
            Some(CellPayload::Int(v)) => Ok(*v as f64),
            Some(CellPayload::Float(v)) => Ok(*v),
            _ => Err(self.numeric_mismatch("double")),
        }
    }

    /// Held numeric value as a truth value.
    pub fn load_bool(&self) -> Result<bool> {
        match self.payload() {
            Some(CellPayload::Int(v)) => Ok(*v != 0),
            Some(CellPayload::Float(v)) => Ok(*v != 0.0),
            _ => Err(self.numeric_mismatch("bool")),
        }
    }

    /// Drop the held value, releasing any owned reference.
    pub fn clear(&mut self) {
        self.state = None;
    }

    pub(crate) fn visit_references(&self, visit: &mut dyn FnMut(InstanceId)) {
        match &self.state {
            Some((_, CellPayload::Handle(Some(h)))) => visit(h.id()),
            Some((ty, CellPayload::Value(v))) if ty.traceable => {
                self.services.objects.forward_trace(ty, v.id(), visit);
            }
            _ => {}
        }
    }

    fn mismatch(&self, requested: &TypeDescriptor) -> ContainerError {
        ContainerError::TypeMismatch {
            expected: requested.name.to_string(),
            got: self
                .type_of()
                .map_or_else(|| "nothing".to_string(), |ty| ty.name.to_string()),
        }
    }

    fn numeric_mismatch(&self, requested: &str) -> ContainerError {
        ContainerError::TypeMismatch {
            expected: requested.to_string(),
            got: self
                .type_of()
                .map_or_else(|| "nothing".to_string(), |ty| ty.name.to_string()),
        }
    }
}

impl Collectible for ValueCell {
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
        self.visit_references(visit);
    }

    fn release_all_references(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for ValueCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ValueCell");
        match &self.state {
            Some((ty, payload)) => s.field("ty", &ty.name).field("payload", payload).finish(),
            None => s.field("empty", &true).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::PrimitiveKind;

    fn prim_descriptor(id: u32, kind: PrimitiveKind) -> Arc<TypeDescriptor> {
        TypeDescriptor::primitive(crate::host::TypeId(id), kind.name(), kind)
    }

    // A services bundle whose host is never called (primitive-only cells).
    fn inert_services() -> HostServices {
        crate::testkit::RecordingHost::new().services()
    }

    #[test]
    fn test_int_widening_round_trip() {
        let services = inert_services();
        let i16_ty = prim_descriptor(1, PrimitiveKind::I16);
        let mut cell = ValueCell::empty(services);
        cell.store(&i16_ty, &Element::Prim(PrimValue::I16(-42))).unwrap();

        assert_eq!(cell.load_int().unwrap(), -42);
        assert_eq!(cell.load_float().unwrap(), -42.0);
        assert!(cell.load_bool().unwrap());

        let back = cell.load(&i16_ty).unwrap();
        assert!(matches!(back, Element::Prim(PrimValue::I16(-42))));
    }

    #[test]
    fn test_cross_type_numeric_retrieval() {
        let services = inert_services();
        let i32_ty = prim_descriptor(1, PrimitiveKind::I32);
        let f64_ty = prim_descriptor(2, PrimitiveKind::F64);
        let mut cell = ValueCell::empty(services);
        cell.store(&i32_ty, &Element::Prim(PrimValue::I32(7))).unwrap();

        let widened = cell.load(&f64_ty).unwrap();
        assert!(matches!(widened, Element::Prim(PrimValue::F64(v)) if v == 7.0));
    }

    #[test]
    fn test_empty_cell_load_fails() {
        let services = inert_services();
        let ty = prim_descriptor(1, PrimitiveKind::I32);
        let cell = ValueCell::empty(services);
        assert!(matches!(
            cell.load(&ty),
            Err(ContainerError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_replace_then_clear() {
        let services = inert_services();
        let ty = prim_descriptor(1, PrimitiveKind::U8);
        let mut cell = ValueCell::empty(services);
        cell.store(&ty, &Element::Prim(PrimValue::U8(1))).unwrap();
        cell.store(&ty, &Element::Prim(PrimValue::U8(2))).unwrap();
        assert_eq!(cell.load_int().unwrap(), 2);
        cell.clear();
        assert!(cell.is_empty());
    }
}
