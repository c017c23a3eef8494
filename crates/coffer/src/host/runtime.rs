// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! The narrow interface the container engine consumes from the host runtime.
//!
//! The engine never reimplements object lifecycle or call dispatch: it asks
//! the host to copy/assign/destroy by-value instances, to add-ref/release
//! handles, to resolve comparison callables, and to run them. Everything the
//! engine needs is bundled in [`HostServices`].

use std::fmt;
use std::sync::Arc;

use crate::compare::ComparatorCache;
use crate::host::descriptor::{CallableId, InstanceId, TypeDescriptor, TypeId};

/// Failures reported by the host runtime itself.
#[derive(Debug)]
pub enum HostError {
    /// Host allocation failed.
    OutOfMemory,
    /// Host could not copy-construct or copy-assign an instance.
    CopyFailed { type_name: String },
    /// A call could not be prepared or executed.
    InvalidCall(String),
    /// An instance id was not known to the host.
    UnknownInstance(InstanceId),
    /// A type id was not known to the host.
    UnknownType(TypeId),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "host allocation failed"),
            Self::CopyFailed { type_name } => write!(f, "host copy of {} failed", type_name),
            Self::InvalidCall(msg) => write!(f, "invalid host call: {}", msg),
            Self::UnknownInstance(id) => write!(f, "unknown instance {:?}", id),
            Self::UnknownType(id) => write!(f, "unknown {}", id),
        }
    }
}

impl std::error::Error for HostError {}

/// Outcome of resolving an equality/ordering callable for a type.
///
/// `Missing` and `Ambiguous` are reported distinctly so the engine can fail
/// with the matching error instead of guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableResolution {
    Missing,
    Unique(CallableId),
    Ambiguous,
}

/// The kind of container reported to the host tracer at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Array,
    Grid,
    Dictionary,
}

/// Object reflection and lifecycle, supplied by the host.
///
/// `add_ref`/`release` return the new reference count; the host frees the
/// instance when it reaches zero.
pub trait ObjectModel: Send + Sync {
    /// Descriptor for a registered type id.
    fn type_descriptor(&self, id: TypeId) -> Option<Arc<TypeDescriptor>>;

    /// Allocate a default-constructed instance of a by-value or handle type.
    fn default_instance(&self, ty: &TypeDescriptor) -> Result<InstanceId, HostError>;

    /// Allocate a copy-constructed instance from `src`.
    fn copy_instance(&self, ty: &TypeDescriptor, src: InstanceId) -> Result<InstanceId, HostError>;

    /// Allocate an instance decoded from its flat byte representation.
    fn construct_from_bytes(&self, ty: &TypeDescriptor, bytes: &[u8])
        -> Result<InstanceId, HostError>;

    /// Copy-assign `src` into the existing storage of `dst`.
    fn assign_instance(
        &self,
        ty: &TypeDescriptor,
        dst: InstanceId,
        src: InstanceId,
    ) -> Result<(), HostError>;

    /// Destroy an exclusively-owned by-value instance.
    fn destroy_instance(&self, ty: &TypeDescriptor, id: InstanceId);

    /// Increment the shared count of a handle instance.
    fn add_ref(&self, id: InstanceId) -> u32;

    /// Decrement the shared count; the host frees at zero.
    fn release(&self, id: InstanceId) -> u32;

    /// Resolve the equality callable for a type.
    fn resolve_equality(&self, ty: &TypeDescriptor) -> CallableResolution;

    /// Resolve the ordering callable for a type.
    fn resolve_ordering(&self, ty: &TypeDescriptor) -> CallableResolution;

    /// Forward reference enumeration into a traceable by-value instance.
    fn forward_trace(
        &self,
        ty: &TypeDescriptor,
        id: InstanceId,
        visit: &mut dyn FnMut(InstanceId),
    );

    /// Tell the host tracer a new collectible container exists.
    fn notify_new_collectible(&self, kind: ContainerKind);
}

/// Whether a host call starts a fresh top-level context or suspends an
/// already-executing one.
///
/// Always an explicit caller decision, never inferred from ambient state: a
/// sort invoked from inside a script callback must pass `Nested` so the
/// engine suspends and later resumes the outer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallScope {
    TopLevel,
    Nested,
}

/// One bound operand of a comparison call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    ByValue(InstanceId),
    ByHandle(Option<InstanceId>),
}

/// Value produced by a completed callable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallReturn {
    Signed(i64),
    Boolean(bool),
    Unit,
}

/// Result of executing a prepared call.
///
/// `Aborted` means the callable tore down the call stack; the engine must
/// re-raise it rather than convert it into an ordinary error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallOutcome {
    Completed(CallReturn),
    Aborted,
}

/// A host call with its operands bound, ready to execute.
pub trait PreparedCall {
    /// Bind one operand at the given position.
    fn bind_operand(&mut self, position: usize, operand: Operand) -> Result<(), HostError>;

    /// Run the call to completion or abort.
    fn execute(self: Box<Self>) -> Result<CallOutcome, HostError>;
}

/// Host call dispatch.
///
/// `begin` with [`CallScope::Nested`] must push/suspend the current call
/// state and pop/resume it when the call finishes; an abort inside the nested
/// call propagates to the suspended outer state.
pub trait CallEngine: Send + Sync {
    fn begin<'a>(
        &'a self,
        callable: CallableId,
        scope: CallScope,
    ) -> Result<Box<dyn PreparedCall + 'a>, HostError>;
}

/// Everything the container engine consumes from the host, plus the
/// process-wide comparator cache.
///
/// Cheap to clone; containers keep one per instance.
#[derive(Clone)]
pub struct HostServices {
    pub objects: Arc<dyn ObjectModel>,
    pub calls: Arc<dyn CallEngine>,
    pub comparators: Arc<ComparatorCache>,
}

impl HostServices {
    /// Bundle a host with a fresh comparator cache.
    pub fn new(objects: Arc<dyn ObjectModel>, calls: Arc<dyn CallEngine>) -> Self {
        Self {
            objects,
            calls,
            comparators: Arc::new(ComparatorCache::new()),
        }
    }

    /// Bundle a host sharing an existing comparator cache.
    pub fn with_cache(
        objects: Arc<dyn ObjectModel>,
        calls: Arc<dyn CallEngine>,
        comparators: Arc<ComparatorCache>,
    ) -> Self {
        Self {
            objects,
            calls,
            comparators,
        }
    }
}

impl fmt::Debug for HostServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostServices").finish_non_exhaustive()
    }
}
