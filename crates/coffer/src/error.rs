// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! Error taxonomy for container operations.
//!
//! Every operation aborts without partial mutation when it fails. The one
//! variant with special propagation rules is `CallAborted(Nested)`: it is
//! fatal to the whole call stack and must be re-raised verbatim, never
//! converted into an ordinary error.

use std::fmt;

use crate::host::{CallScope, HostError, TypeId};

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, ContainerError>;

/// Call-level failures surfaced by container operations.
#[derive(Debug)]
pub enum ContainerError {
    /// Buffer or host allocation failed; prior state unchanged.
    OutOfMemory,
    /// Explicit index argument outside the valid range.
    IndexOutOfBounds { index: usize, length: usize },
    /// Requested capacity exceeds the maximum representable element count.
    SizeLimitExceeded { requested: usize, max: usize },
    /// Sort/find/equality on a non-primitive type with no resolvable comparator.
    NoOrderingAvailable { type_name: String },
    /// More than one comparator resolves for the type.
    AmbiguousOrdering { type_name: String },
    /// Incompatible type with no defined widening conversion.
    TypeMismatch { expected: String, got: String },
    /// Host could not produce a by-value copy.
    CopyConstructionFailed { type_name: String },
    /// A comparison callable aborted; fatal to the entire call stack.
    CallAborted(CallScope),
    /// Flat initializer buffer ended mid-field.
    InitializerTruncated { need: usize, have: usize },
    /// Flat initializer buffer named a type the host does not know.
    UnknownTypeId(TypeId),
    /// Host call machinery failure.
    InvalidCall(String),
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::IndexOutOfBounds { index, length } => {
                write!(f, "index out of bounds: {} >= {}", index, length)
            }
            Self::SizeLimitExceeded { requested, max } => {
                write!(f, "size limit exceeded: {} > {}", requested, max)
            }
            Self::NoOrderingAvailable { type_name } => {
                write!(f, "no ordering available for type {}", type_name)
            }
            Self::AmbiguousOrdering { type_name } => {
                write!(f, "ambiguous ordering for type {}", type_name)
            }
            Self::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {}, got {}", expected, got)
            }
            Self::CopyConstructionFailed { type_name } => {
                write!(f, "copy construction of {} failed", type_name)
            }
            Self::CallAborted(scope) => write!(f, "comparison call aborted ({:?} scope)", scope),
            Self::InitializerTruncated { need, have } => {
                write!(f, "initializer buffer truncated: need {}, have {}", need, have)
            }
            Self::UnknownTypeId(id) => write!(f, "initializer references unknown {}", id),
            Self::InvalidCall(msg) => write!(f, "invalid call: {}", msg),
        }
    }
}

impl std::error::Error for ContainerError {}

impl From<HostError> for ContainerError {
    fn from(e: HostError) -> Self {
        match e {
            HostError::OutOfMemory => Self::OutOfMemory,
            HostError::CopyFailed { type_name } => Self::CopyConstructionFailed { type_name },
            HostError::InvalidCall(msg) => Self::InvalidCall(msg),
            HostError::UnknownInstance(id) => Self::InvalidCall(format!("unknown instance {:?}", id)),
            HostError::UnknownType(id) => Self::UnknownTypeId(id),
        }
    }
}

impl ContainerError {
    /// True for the abort that must tear down the whole call stack.
    pub fn is_nested_abort(&self) -> bool {
        matches!(self, Self::CallAborted(CallScope::Nested))
    }
}
