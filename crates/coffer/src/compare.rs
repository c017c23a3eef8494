// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! Comparator resolution and invocation.
//!
//! Non-primitive elements are compared through host-resolved callables. The
//! process-wide [`ComparatorCache`] resolves each element type once under
//! double-checked locking; the [`ComparatorBridge`] binds two slot operands,
//! runs the callable in an explicit call scope, and maps its result.

use std::cmp::Ordering;
use std::collections::HashMap;

use parking_lot::RwLock;

use crate::element::Element;
use crate::error::{ContainerError, Result};
use crate::host::{
    CallOutcome, CallReturn, CallScope, CallableId, CallableResolution, HostServices, ObjectModel,
    Operand, StorageClass, TypeDescriptor, TypeId,
};

/// Direction of a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Cached resolution outcome for one element type.
#[derive(Debug, Clone, Copy)]
pub struct CachedComparator {
    pub equality: CallableResolution,
    pub ordering: CallableResolution,
}

/// How an equality check will be carried out.
#[derive(Debug, Clone, Copy)]
pub(crate) enum EqualityStrategy {
    /// A dedicated equality callable.
    Equality(CallableId),
    /// Fall back to the ordering callable, equal when it returns zero.
    Ordering(CallableId),
}

/// Process-wide map from type id to resolved comparison callables.
///
/// Multiple threads may construct the first container of some element type
/// concurrently, so population uses the double-checked discipline: read-lock
/// probe, write lock, re-check, resolve through the host, insert.
pub struct ComparatorCache {
    inner: RwLock<HashMap<TypeId, CachedComparator>>,
}

impl ComparatorCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Resolved callables for a type, resolving and caching on first use.
    pub fn lookup(&self, objects: &dyn ObjectModel, ty: &TypeDescriptor) -> CachedComparator {
        if let Some(hit) = self.inner.read().get(&ty.id) {
            return *hit;
        }
        let mut map = self.inner.write();
        // Another thread may have populated while we waited for the lock.
        if let Some(hit) = map.get(&ty.id) {
            return *hit;
        }
        let resolved = CachedComparator {
            equality: objects.resolve_equality(ty),
            ordering: objects.resolve_ordering(ty),
        };
        log::debug!(
            "[ComparatorCache] resolved {} (eq={:?}, ord={:?})",
            ty.name,
            resolved.equality,
            resolved.ordering
        );
        map.insert(ty.id, resolved);
        resolved
    }

    /// Number of cached type entries.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// The unique ordering callable for a type, or the matching error.
    pub(crate) fn unique_ordering(
        &self,
        objects: &dyn ObjectModel,
        ty: &TypeDescriptor,
    ) -> Result<CallableId> {
        match self.lookup(objects, ty).ordering {
            CallableResolution::Unique(c) => Ok(c),
            CallableResolution::Missing => Err(ContainerError::NoOrderingAvailable {
                type_name: ty.name.to_string(),
            }),
            CallableResolution::Ambiguous => Err(ContainerError::AmbiguousOrdering {
                type_name: ty.name.to_string(),
            }),
        }
    }

    /// Equality strategy for a type: a unique equality callable is preferred,
    /// a unique ordering callable is the fallback.
    pub(crate) fn equality_strategy(
        &self,
        objects: &dyn ObjectModel,
        ty: &TypeDescriptor,
    ) -> Result<EqualityStrategy> {
        let resolved = self.lookup(objects, ty);
        match resolved.equality {
            CallableResolution::Unique(c) => Ok(EqualityStrategy::Equality(c)),
            CallableResolution::Ambiguous => Err(ContainerError::AmbiguousOrdering {
                type_name: ty.name.to_string(),
            }),
            CallableResolution::Missing => match resolved.ordering {
                CallableResolution::Unique(c) => Ok(EqualityStrategy::Ordering(c)),
                CallableResolution::Ambiguous => Err(ContainerError::AmbiguousOrdering {
                    type_name: ty.name.to_string(),
                }),
                CallableResolution::Missing => Err(ContainerError::NoOrderingAvailable {
                    type_name: ty.name.to_string(),
                }),
            },
        }
    }
}

impl Default for ComparatorCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Invokes a resolved callable on two element slots.
///
/// The call scope is an explicit caller decision: a sort running inside an
/// already-executing host call passes `Nested`, and the call engine suspends
/// and resumes the outer call state around the nested invocation. An abort is
/// surfaced as `CallAborted(scope)` and must be re-raised untouched.
pub struct ComparatorBridge<'a> {
    services: &'a HostServices,
    scope: CallScope,
}

impl<'a> ComparatorBridge<'a> {
    pub fn new(services: &'a HostServices, scope: CallScope) -> Self {
        Self { services, scope }
    }

    pub fn scope(&self) -> CallScope {
        self.scope
    }

    fn operand(ty: &TypeDescriptor, elem: &Element) -> Result<Operand> {
        match (ty.storage, elem) {
            (StorageClass::ByValue, Element::Value(v)) => Ok(Operand::ByValue(v.id())),
            (StorageClass::ByHandle, Element::Handle(h)) => {
                Ok(Operand::ByHandle(h.as_ref().map(|h| h.id())))
            }
            _ => Err(ContainerError::InvalidCall(format!(
                "cannot bind {} as a {} operand",
                elem.describe(),
                ty.name
            ))),
        }
    }

    fn invoke(
        &self,
        callable: CallableId,
        ty: &TypeDescriptor,
        lhs: &Element,
        rhs: &Element,
    ) -> Result<CallReturn> {
        let mut call = self.services.calls.begin(callable, self.scope)?;
        call.bind_operand(0, Self::operand(ty, lhs)?)?;
        call.bind_operand(1, Self::operand(ty, rhs)?)?;
        match call.execute()? {
            CallOutcome::Completed(ret) => Ok(ret),
            CallOutcome::Aborted => Err(ContainerError::CallAborted(self.scope)),
        }
    }

    /// Strict ordering from a signed-integer callable.
    pub fn order(
        &self,
        callable: CallableId,
        ty: &TypeDescriptor,
        lhs: &Element,
        rhs: &Element,
    ) -> Result<Ordering> {
        match self.invoke(callable, ty, lhs, rhs)? {
            CallReturn::Signed(n) => Ok(n.cmp(&0)),
            other => Err(ContainerError::InvalidCall(format!(
                "ordering callable for {} returned {:?}",
                ty.name, other
            ))),
        }
    }

    /// Boolean equality from an equality callable (a signed result counts as
    /// equal when zero).
    pub fn equals_by(
        &self,
        callable: CallableId,
        ty: &TypeDescriptor,
        lhs: &Element,
        rhs: &Element,
    ) -> Result<bool> {
        match self.invoke(callable, ty, lhs, rhs)? {
            CallReturn::Boolean(b) => Ok(b),
            CallReturn::Signed(n) => Ok(n == 0),
            CallReturn::Unit => Err(ContainerError::InvalidCall(format!(
                "equality callable for {} returned no value",
                ty.name
            ))),
        }
    }

    /// "lhs sorts before rhs" from a caller-supplied predicate. Accepts a
    /// boolean result directly or a signed result interpreted as a strcmp.
    pub fn less_by(
        &self,
        callable: CallableId,
        ty: &TypeDescriptor,
        lhs: &Element,
        rhs: &Element,
    ) -> Result<bool> {
        match self.invoke(callable, ty, lhs, rhs)? {
            CallReturn::Boolean(b) => Ok(b),
            CallReturn::Signed(n) => Ok(n < 0),
            CallReturn::Unit => Err(ContainerError::InvalidCall(format!(
                "sort predicate for {} returned no value",
                ty.name
            ))),
        }
    }
}
