// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! Type-erased element slots.
//!
//! An [`Element`] is what one container slot holds: inline primitive bytes,
//! an exclusively-owned by-value host instance, or a shared reference-counted
//! handle. The ownership tokens make the add-ref/release invariant
//! structural: [`ObjectHandle`] add-refs on clone and releases on drop,
//! [`ValueInstance`] destroys its host copy on drop.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::{ContainerError, Result};
use crate::host::{
    HostServices, InstanceId, ObjectModel, PrimitiveKind, StorageClass, TypeDescriptor,
};

/// One primitive value, tagged with its exact width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl PrimValue {
    /// The kind tag of this value.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Bool(_) => PrimitiveKind::Bool,
            Self::I8(_) => PrimitiveKind::I8,
            Self::I16(_) => PrimitiveKind::I16,
            Self::I32(_) => PrimitiveKind::I32,
            Self::I64(_) => PrimitiveKind::I64,
            Self::U8(_) => PrimitiveKind::U8,
            Self::U16(_) => PrimitiveKind::U16,
            Self::U32(_) => PrimitiveKind::U32,
            Self::U64(_) => PrimitiveKind::U64,
            Self::F32(_) => PrimitiveKind::F32,
            Self::F64(_) => PrimitiveKind::F64,
        }
    }

    /// The zero/default value of a kind.
    pub fn zero(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Bool => Self::Bool(false),
            PrimitiveKind::I8 => Self::I8(0),
            PrimitiveKind::I16 => Self::I16(0),
            PrimitiveKind::I32 => Self::I32(0),
            PrimitiveKind::I64 => Self::I64(0),
            PrimitiveKind::U8 => Self::U8(0),
            PrimitiveKind::U16 => Self::U16(0),
            PrimitiveKind::U32 => Self::U32(0),
            PrimitiveKind::U64 => Self::U64(0),
            PrimitiveKind::F32 => Self::F32(0.0),
            PrimitiveKind::F64 => Self::F64(0.0),
        }
    }

    /// Widen an integer-family value to i64 (bool widens to 0/1).
    pub fn widen_int(&self) -> Option<i64> {
        match *self {
            Self::Bool(v) => Some(i64::from(v)),
            Self::I8(v) => Some(i64::from(v)),
            Self::I16(v) => Some(i64::from(v)),
            Self::I32(v) => Some(i64::from(v)),
            Self::I64(v) => Some(v),
            Self::U8(v) => Some(i64::from(v)),
            Self::U16(v) => Some(i64::from(v)),
            Self::U32(v) => Some(i64::from(v)),
            Self::U64(v) => Some(v as i64),
            Self::F32(_) | Self::F64(_) => None,
        }
    }

    /// Widen a float value to f64.
    pub fn widen_float(&self) -> Option<f64> {
        match *self {
            Self::F32(v) => Some(f64::from(v)),
            Self::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Narrow a widened integer back to the given kind (wrapping casts).
    pub fn from_widened_int(kind: PrimitiveKind, v: i64) -> Self {
        match kind {
            PrimitiveKind::Bool => Self::Bool(v != 0),
            PrimitiveKind::I8 => Self::I8(v as i8),
            PrimitiveKind::I16 => Self::I16(v as i16),
            PrimitiveKind::I32 => Self::I32(v as i32),
            PrimitiveKind::I64 => Self::I64(v),
            PrimitiveKind::U8 => Self::U8(v as u8),
            PrimitiveKind::U16 => Self::U16(v as u16),
            PrimitiveKind::U32 => Self::U32(v as u32),
            PrimitiveKind::U64 => Self::U64(v as u64),
            PrimitiveKind::F32 => Self::F32(v as f32),
            PrimitiveKind::F64 => Self::F64(v as f64),
        }
    }

    /// Narrow a widened float back to the given kind (saturating casts).
    pub fn from_widened_float(kind: PrimitiveKind, v: f64) -> Self {
        match kind {
            PrimitiveKind::Bool => Self::Bool(v != 0.0),
            PrimitiveKind::F32 => Self::F32(v as f32),
            PrimitiveKind::F64 => Self::F64(v),
            _ => Self::from_widened_int(kind, v as i64),
        }
    }

    /// Decode exactly `kind.width()` little-endian bytes.
    pub fn from_le_bytes(kind: PrimitiveKind, bytes: &[u8]) -> Result<Self> {
        let need = kind.width();
        if bytes.len() < need {
            return Err(ContainerError::InitializerTruncated {
                need,
                have: bytes.len(),
            });
        }
        let b = &bytes[..need];
        Ok(match kind {
            PrimitiveKind::Bool => Self::Bool(b[0] != 0),
            PrimitiveKind::I8 => Self::I8(b[0] as i8),
            PrimitiveKind::I16 => Self::I16(i16::from_le_bytes([b[0], b[1]])),
            PrimitiveKind::I32 => Self::I32(i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            PrimitiveKind::I64 => Self::I64(i64::from_le_bytes([
                b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            ])),
            PrimitiveKind::U8 => Self::U8(b[0]),
            PrimitiveKind::U16 => Self::U16(u16::from_le_bytes([b[0], b[1]])),
            PrimitiveKind::U32 => Self::U32(u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            PrimitiveKind::U64 => Self::U64(u64::from_le_bytes([
                b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            ])),
            PrimitiveKind::F32 => Self::F32(f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            PrimitiveKind::F64 => Self::F64(f64::from_le_bytes([
                b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            ])),
        })
    }

    /// Encode as exactly `kind.width()` little-endian bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match *self {
            Self::Bool(v) => vec![u8::from(v)],
            Self::I8(v) => vec![v as u8],
            Self::I16(v) => v.to_le_bytes().to_vec(),
            Self::I32(v) => v.to_le_bytes().to_vec(),
            Self::I64(v) => v.to_le_bytes().to_vec(),
            Self::U8(v) => vec![v],
            Self::U16(v) => v.to_le_bytes().to_vec(),
            Self::U32(v) => v.to_le_bytes().to_vec(),
            Self::U64(v) => v.to_le_bytes().to_vec(),
            Self::F32(v) => v.to_le_bytes().to_vec(),
            Self::F64(v) => v.to_le_bytes().to_vec(),
        }
    }

    /// Total order within one kind. Floats fall back to `Equal` for NaN pairs
    /// so a sort still terminates.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (*self, *other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(&b),
            (Self::I8(a), Self::I8(b)) => a.cmp(&b),
            (Self::I16(a), Self::I16(b)) => a.cmp(&b),
            (Self::I32(a), Self::I32(b)) => a.cmp(&b),
            (Self::I64(a), Self::I64(b)) => a.cmp(&b),
            (Self::U8(a), Self::U8(b)) => a.cmp(&b),
            (Self::U16(a), Self::U16(b)) => a.cmp(&b),
            (Self::U32(a), Self::U32(b)) => a.cmp(&b),
            (Self::U64(a), Self::U64(b)) => a.cmp(&b),
            (Self::F32(a), Self::F32(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Self::F64(a), Self::F64(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        }
    }
}

/// Exclusive ownership of one host-allocated by-value instance.
///
/// Dropping the token destroys the instance through the host.
pub struct ValueInstance {
    objects: Arc<dyn ObjectModel>,
    ty: Arc<TypeDescriptor>,
    id: InstanceId,
}

impl ValueInstance {
    /// Take ownership of an already-allocated instance.
    pub fn adopt(objects: Arc<dyn ObjectModel>, ty: Arc<TypeDescriptor>, id: InstanceId) -> Self {
        Self { objects, ty, id }
    }

    /// Allocate a default-constructed instance.
    pub fn default_for(objects: &Arc<dyn ObjectModel>, ty: &Arc<TypeDescriptor>) -> Result<Self> {
        let id = objects.default_instance(ty)?;
        Ok(Self::adopt(objects.clone(), ty.clone(), id))
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn ty(&self) -> &Arc<TypeDescriptor> {
        &self.ty
    }

    /// Host copy-construct a new owned instance from this one.
    pub fn try_clone(&self) -> Result<Self> {
        let id = self.objects.copy_instance(&self.ty, self.id)?;
        Ok(Self::adopt(self.objects.clone(), self.ty.clone(), id))
    }

    /// Host copy-assign `src` into this instance's existing storage.
    pub fn assign_from(&mut self, src: &ValueInstance) -> Result<()> {
        if src.id == self.id {
            return Ok(());
        }
        self.objects.assign_instance(&self.ty, self.id, src.id)?;
        Ok(())
    }
}

impl Drop for ValueInstance {
    fn drop(&mut self) {
        self.objects.destroy_instance(&self.ty, self.id);
    }
}

impl fmt::Debug for ValueInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueInstance")
            .field("ty", &self.ty.name)
            .field("id", &self.id)
            .finish()
    }
}

/// Shared ownership of one reference-counted host instance.
///
/// Clone add-refs, drop releases; the host frees at zero.
pub struct ObjectHandle {
    objects: Arc<dyn ObjectModel>,
    id: InstanceId,
}

impl ObjectHandle {
    /// Take over one existing reference (no add-ref).
    pub fn adopt(objects: Arc<dyn ObjectModel>, id: InstanceId) -> Self {
        Self { objects, id }
    }

    /// Share an instance: add-ref, then own that reference.
    pub fn acquire(objects: &Arc<dyn ObjectModel>, id: InstanceId) -> Self {
        objects.add_ref(id);
        Self::adopt(objects.clone(), id)
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }
}

impl Clone for ObjectHandle {
    fn clone(&self) -> Self {
        Self::acquire(&self.objects, self.id)
    }
}

impl Drop for ObjectHandle {
    fn drop(&mut self) {
        self.objects.release(self.id);
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectHandle").field(&self.id).finish()
    }
}

/// The contents of one container slot.
#[derive(Debug)]
pub enum Element {
    Prim(PrimValue),
    Value(ValueInstance),
    Handle(Option<ObjectHandle>),
}

impl Element {
    /// Default element for a descriptor: zero primitive, host default
    /// instance, or null handle.
    pub fn default_for(services: &HostServices, ty: &Arc<TypeDescriptor>) -> Result<Self> {
        match ty.storage {
            StorageClass::Primitive(kind) => Ok(Self::Prim(PrimValue::zero(kind))),
            StorageClass::ByValue => Ok(Self::Value(ValueInstance::default_for(
                &services.objects,
                ty,
            )?)),
            StorageClass::ByHandle => Ok(Self::Handle(None)),
        }
    }

    /// Copy this element: byte copy, host copy-construct, or add-ref.
    pub fn try_clone(&self) -> Result<Self> {
        match self {
            Self::Prim(p) => Ok(Self::Prim(*p)),
            Self::Value(v) => Ok(Self::Value(v.try_clone()?)),
            Self::Handle(h) => Ok(Self::Handle(h.clone())),
        }
    }

    /// Whether this element is storable under the given descriptor.
    pub fn matches(&self, ty: &TypeDescriptor) -> bool {
        match (self, ty.storage) {
            (Self::Prim(p), StorageClass::Primitive(kind)) => p.kind() == kind,
            (Self::Value(v), StorageClass::ByValue) => v.ty().id == ty.id,
            (Self::Handle(_), StorageClass::ByHandle) => true,
            _ => false,
        }
    }

    /// Handle/address identity, no callable invocation. Primitives compare by
    /// value, by-value instances by host address, handles by id.
    pub fn identity_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Prim(a), Self::Prim(b)) => a == b,
            (Self::Value(a), Self::Value(b)) => a.id() == b.id(),
            (Self::Handle(a), Self::Handle(b)) => {
                a.as_ref().map(ObjectHandle::id) == b.as_ref().map(ObjectHandle::id)
            }
            _ => false,
        }
    }

    /// The instance id a GC tracer should see for this slot, if any.
    pub fn traced_instance(&self) -> Option<InstanceId> {
        match self {
            Self::Handle(Some(h)) => Some(h.id()),
            _ => None,
        }
    }

    /// Short description used in type-mismatch errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Prim(p) => p.kind().name().to_string(),
            Self::Value(v) => v.ty().name.to_string(),
            Self::Handle(Some(_)) => "handle".to_string(),
            Self::Handle(None) => "null handle".to_string(),
        }
    }
}
