// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! Runtime-supplied type metadata.
//!
//! The host runtime owns the type system; the container engine only ever sees
//! a [`TypeDescriptor`] describing how one element type is stored and how wide
//! its payload is. A descriptor is fixed for a container's whole lifetime.

use std::fmt;
use std::sync::Arc;

/// Identifier of a host-registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type#{}", self.0)
    }
}

/// Identifier of one host-allocated object instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub u64);

/// Identifier of a host-resolved callable (comparator, equality operator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallableId(pub u32);

/// Width of a host handle in the flat initializer encoding.
pub const HANDLE_SIZE: usize = 8;

/// The closed set of primitive element representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl PrimitiveKind {
    /// Payload width in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// True for the integer kinds (bool counts as an integer for widening).
    pub fn is_integer(self) -> bool {
        !matches!(self, Self::F32 | Self::F64)
    }

    /// True for f32/f64.
    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Lowercase name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

/// How an element of some type is held in a container slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    /// Inline raw bytes, no host involvement.
    Primitive(PrimitiveKind),
    /// Host-allocated instance exclusively owned by the slot.
    ByValue,
    /// Host-allocated instance shared through reference counting.
    ByHandle,
}

/// Runtime facts about one element type, supplied by the host.
///
/// Read-only to the engine. `instance_size` is the payload width in the flat
/// initializer encoding: the primitive width, the declared object size for
/// by-value types, or [`HANDLE_SIZE`] for handles.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub id: TypeId,
    pub name: Arc<str>,
    pub storage: StorageClass,
    pub instance_size: usize,
    /// Whether instances can themselves hold references (drives GC
    /// enumeration forwarding).
    pub traceable: bool,
}

impl TypeDescriptor {
    /// Descriptor for a primitive type.
    pub fn primitive(id: TypeId, name: &str, kind: PrimitiveKind) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: name.into(),
            storage: StorageClass::Primitive(kind),
            instance_size: kind.width(),
            traceable: false,
        })
    }

    /// Descriptor for a by-value object type of the given declared size.
    pub fn by_value(id: TypeId, name: &str, instance_size: usize, traceable: bool) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: name.into(),
            storage: StorageClass::ByValue,
            instance_size,
            traceable,
        })
    }

    /// Descriptor for a reference-counted handle type.
    pub fn by_handle(id: TypeId, name: &str, traceable: bool) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: name.into(),
            storage: StorageClass::ByHandle,
            instance_size: HANDLE_SIZE,
            traceable,
        })
    }

    /// True when elements are raw primitive bytes.
    pub fn is_primitive(&self) -> bool {
        matches!(self.storage, StorageClass::Primitive(_))
    }

    /// The primitive kind, if this is a primitive type.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.storage {
            StorageClass::Primitive(kind) => Some(kind),
            _ => None,
        }
    }
}
