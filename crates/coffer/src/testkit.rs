// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! Instrumented in-memory host for tests and benches.
//!
//! [`RecordingHost`] implements both host traits over concurrent tables and
//! counts every lifecycle call, so tests can assert the add-ref/release
//! invariant against real numbers. Fake instances carry an i64 payload;
//! scripted callables compare by payload. Aborts can be armed to fire after
//! a chosen number of comparison calls.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::element::{Element, ObjectHandle, ValueInstance};
use crate::host::{
    CallEngine, CallOutcome, CallReturn, CallScope, CallableId, CallableResolution, ContainerKind,
    HostError, HostServices, InstanceId, ObjectModel, Operand, PreparedCall, PrimitiveKind,
    TypeDescriptor, TypeId,
};

/// Declared size of fake by-value instances in the flat encoding.
pub const FAKE_VALUE_SIZE: usize = 16;

/// How a scripted callable computes its result from two instance payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedCompare {
    /// Signed sign of `lhs - rhs`.
    OrderByPayload,
    /// Boolean `lhs == rhs`.
    EqualByPayload,
    /// Signed sign of `rhs - lhs`.
    ReverseByPayload,
}

/// Running counters of every host call the engine issued.
#[derive(Debug, Default)]
pub struct HostStats {
    pub add_refs: AtomicU64,
    pub releases: AtomicU64,
    pub copies: AtomicU64,
    pub destroys: AtomicU64,
    pub calls: AtomicU64,
    pub nested_calls: AtomicU64,
    pub collectibles: AtomicU64,
    pub resolutions: AtomicU64,
}

impl HostStats {
    /// add_refs == releases, the container lifecycle invariant.
    pub fn ref_traffic_balanced(&self) -> bool {
        self.add_refs.load(Ordering::SeqCst) == self.releases.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct FakeInstance {
    ty: u32,
    refs: AtomicU32,
    payload: AtomicI64,
    /// References this instance forwards to the tracer.
    links: Mutex<Vec<InstanceId>>,
}

/// In-memory host: type table, instance table, scripted callables.
pub struct RecordingHost {
    types: DashMap<u32, Arc<TypeDescriptor>>,
    instances: DashMap<u64, FakeInstance>,
    callables: DashMap<u32, ScriptedCompare>,
    equality: DashMap<u32, Vec<CallableId>>,
    ordering: DashMap<u32, Vec<CallableId>>,
    next_type: AtomicU32,
    next_instance: AtomicU64,
    next_callable: AtomicU32,
    /// Calls left before an armed abort fires; negative means disarmed.
    abort_countdown: AtomicI64,
    fail_next_copy: AtomicBool,
    /// Suspended outer call frames while a nested call runs.
    suspended: Mutex<Vec<CallScope>>,
    outer_aborted: AtomicBool,
    pub stats: HostStats,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            types: DashMap::new(),
            instances: DashMap::new(),
            callables: DashMap::new(),
            equality: DashMap::new(),
            ordering: DashMap::new(),
            next_type: AtomicU32::new(1),
            next_instance: AtomicU64::new(1),
            next_callable: AtomicU32::new(1),
            abort_countdown: AtomicI64::new(-1),
            fail_next_copy: AtomicBool::new(false),
            suspended: Mutex::new(Vec::new()),
            outer_aborted: AtomicBool::new(false),
            stats: HostStats::default(),
        })
    }

    /// Bundle this host as both object model and call engine.
    pub fn services(self: &Arc<Self>) -> HostServices {
        HostServices::new(self.clone(), self.clone())
    }

    fn register(&self, ty: Arc<TypeDescriptor>) -> Arc<TypeDescriptor> {
        self.types.insert(ty.id.0, ty.clone());
        ty
    }

    fn fresh_type_id(&self) -> TypeId {
        TypeId(self.next_type.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a primitive type.
    pub fn register_primitive(&self, kind: PrimitiveKind) -> Arc<TypeDescriptor> {
        let id = self.fresh_type_id();
        self.register(TypeDescriptor::primitive(id, kind.name(), kind))
    }

    /// Register a by-value object type.
    pub fn register_value_type(&self, name: &str, traceable: bool) -> Arc<TypeDescriptor> {
        let id = self.fresh_type_id();
        self.register(TypeDescriptor::by_value(id, name, FAKE_VALUE_SIZE, traceable))
    }

    /// Register a reference-counted handle type.
    pub fn register_handle_type(&self, name: &str, traceable: bool) -> Arc<TypeDescriptor> {
        let id = self.fresh_type_id();
        self.register(TypeDescriptor::by_handle(id, name, traceable))
    }

    /// Create a scripted callable without attaching it to any type.
    pub fn new_callable(&self, script: ScriptedCompare) -> CallableId {
        let id = CallableId(self.next_callable.fetch_add(1, Ordering::Relaxed));
        self.callables.insert(id.0, script);
        id
    }

    /// Attach an equality callable to a type. Calling twice makes resolution
    /// ambiguous.
    pub fn add_equality(&self, ty: &TypeDescriptor) -> CallableId {
        let id = self.new_callable(ScriptedCompare::EqualByPayload);
        self.equality.entry(ty.id.0).or_default().push(id);
        id
    }

    /// Attach an ordering callable to a type. Calling twice makes resolution
    /// ambiguous.
    pub fn add_ordering(&self, ty: &TypeDescriptor) -> CallableId {
        let id = self.new_callable(ScriptedCompare::OrderByPayload);
        self.ordering.entry(ty.id.0).or_default().push(id);
        id
    }

    /// Allocate an instance with one outstanding reference.
    pub fn alloc_instance(&self, ty: &TypeDescriptor, payload: i64) -> InstanceId {
        let id = self.next_instance.fetch_add(1, Ordering::Relaxed);
        self.instances.insert(
            id,
            FakeInstance {
                ty: ty.id.0,
                refs: AtomicU32::new(1),
                payload: AtomicI64::new(payload),
                links: Mutex::new(Vec::new()),
            },
        );
        InstanceId(id)
    }

    /// A by-value element owning a fresh instance.
    pub fn value_element(
        self: &Arc<Self>,
        ty: &Arc<TypeDescriptor>,
        payload: i64,
    ) -> Element {
        let id = self.alloc_instance(ty, payload);
        let objects: Arc<dyn ObjectModel> = self.clone();
        Element::Value(ValueInstance::adopt(objects, ty.clone(), id))
    }

    /// A handle element owning the allocation's initial reference.
    pub fn handle_element(self: &Arc<Self>, ty: &Arc<TypeDescriptor>, payload: i64) -> Element {
        let id = self.alloc_instance(ty, payload);
        let objects: Arc<dyn ObjectModel> = self.clone();
        Element::Handle(Some(ObjectHandle::adopt(objects, id)))
    }

    /// A handle element sharing an existing instance (add-refs).
    pub fn share_handle(self: &Arc<Self>, id: InstanceId) -> Element {
        let objects: Arc<dyn ObjectModel> = self.clone();
        Element::Handle(Some(ObjectHandle::acquire(&objects, id)))
    }

    /// Payload of a live instance.
    pub fn payload_of(&self, id: InstanceId) -> Option<i64> {
        self.instances
            .get(&id.0)
            .map(|i| i.payload.load(Ordering::SeqCst))
    }

    /// Current reference count of an instance, zero once freed.
    pub fn refs_of(&self, id: InstanceId) -> u32 {
        self.instances
            .get(&id.0)
            .map_or(0, |i| i.refs.load(Ordering::SeqCst))
    }

    /// Number of live instances of all types.
    pub fn live_instances(&self) -> usize {
        self.instances.len()
    }

    /// Record references an instance forwards to the tracer.
    pub fn set_links(&self, id: InstanceId, links: Vec<InstanceId>) {
        if let Some(inst) = self.instances.get(&id.0) {
            *inst.links.lock() = links;
        }
    }

    /// Abort the `(after + 1)`-th comparison call from now.
    pub fn arm_abort_after(&self, after: u64) {
        self.abort_countdown.store(after as i64, Ordering::SeqCst);
    }

    /// Make the next copy-construct/copy-assign fail.
    pub fn fail_next_copy(&self) {
        self.fail_next_copy.store(true, Ordering::SeqCst);
    }

    /// Whether a nested abort was propagated into a suspended outer call.
    pub fn outer_aborted(&self) -> bool {
        self.outer_aborted.load(Ordering::SeqCst)
    }

    /// Suspended call frames right now; zero after balanced push/pop.
    pub fn suspended_depth(&self) -> usize {
        self.suspended.lock().len()
    }

    fn take_copy_failure(&self, ty: &TypeDescriptor) -> Result<(), HostError> {
        if self.fail_next_copy.swap(false, Ordering::SeqCst) {
            return Err(HostError::CopyFailed {
                type_name: ty.name.to_string(),
            });
        }
        Ok(())
    }

    fn resolution_of(&self, table: &DashMap<u32, Vec<CallableId>>, ty: &TypeDescriptor) -> CallableResolution {
        self.stats.resolutions.fetch_add(1, Ordering::SeqCst);
        match table.get(&ty.id.0).map(|v| v.value().clone()) {
            None => CallableResolution::Missing,
            Some(v) if v.is_empty() => CallableResolution::Missing,
            Some(v) if v.len() == 1 => CallableResolution::Unique(v[0]),
            Some(_) => CallableResolution::Ambiguous,
        }
    }

    fn abort_fires(&self) -> bool {
        let left = self.abort_countdown.load(Ordering::SeqCst);
        if left < 0 {
            return false;
        }
        if left == 0 {
            self.abort_countdown.store(-1, Ordering::SeqCst);
            return true;
        }
        self.abort_countdown.store(left - 1, Ordering::SeqCst);
        false
    }

    fn operand_payload(&self, operand: Option<Operand>) -> Result<i64, HostError> {
        let operand = operand.ok_or_else(|| HostError::InvalidCall("unbound operand".into()))?;
        let id = match operand {
            Operand::ByValue(id) | Operand::ByHandle(Some(id)) => id,
            Operand::ByHandle(None) => {
                return Err(HostError::InvalidCall("null handle operand".into()))
            }
        };
        self.payload_of(id).ok_or(HostError::UnknownInstance(id))
    }
}

impl ObjectModel for RecordingHost {
    fn type_descriptor(&self, id: TypeId) -> Option<Arc<TypeDescriptor>> {
        self.types.get(&id.0).map(|t| t.value().clone())
    }

    fn default_instance(&self, ty: &TypeDescriptor) -> Result<InstanceId, HostError> {
        Ok(self.alloc_instance(ty, 0))
    }

    fn copy_instance(&self, ty: &TypeDescriptor, src: InstanceId) -> Result<InstanceId, HostError> {
        self.take_copy_failure(ty)?;
        let payload = self.payload_of(src).ok_or(HostError::UnknownInstance(src))?;
        self.stats.copies.fetch_add(1, Ordering::SeqCst);
        Ok(self.alloc_instance(ty, payload))
    }

    fn construct_from_bytes(
        &self,
        ty: &TypeDescriptor,
        bytes: &[u8],
    ) -> Result<InstanceId, HostError> {
        let mut raw = [0u8; 8];
        let n = bytes.len().min(8);
        raw[..n].copy_from_slice(&bytes[..n]);
        Ok(self.alloc_instance(ty, i64::from_le_bytes(raw)))
    }

    fn assign_instance(
        &self,
        ty: &TypeDescriptor,
        dst: InstanceId,
        src: InstanceId,
    ) -> Result<(), HostError> {
        self.take_copy_failure(ty)?;
        let payload = self.payload_of(src).ok_or(HostError::UnknownInstance(src))?;
        let inst = self
            .instances
            .get(&dst.0)
            .ok_or(HostError::UnknownInstance(dst))?;
        inst.payload.store(payload, Ordering::SeqCst);
        self.stats.copies.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn destroy_instance(&self, _ty: &TypeDescriptor, id: InstanceId) {
        self.stats.destroys.fetch_add(1, Ordering::SeqCst);
        self.instances.remove(&id.0);
    }

    fn add_ref(&self, id: InstanceId) -> u32 {
        self.stats.add_refs.fetch_add(1, Ordering::SeqCst);
        self.instances
            .get(&id.0)
            .map_or(0, |i| i.refs.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn release(&self, id: InstanceId) -> u32 {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
        let remaining = self
            .instances
            .get(&id.0)
            .map_or(0, |i| i.refs.fetch_sub(1, Ordering::SeqCst) - 1);
        if remaining == 0 {
            self.instances.remove(&id.0);
        }
        remaining
    }

    fn resolve_equality(&self, ty: &TypeDescriptor) -> CallableResolution {
        self.resolution_of(&self.equality, ty)
    }

    fn resolve_ordering(&self, ty: &TypeDescriptor) -> CallableResolution {
        self.resolution_of(&self.ordering, ty)
    }

    fn forward_trace(
        &self,
        _ty: &TypeDescriptor,
        id: InstanceId,
        visit: &mut dyn FnMut(InstanceId),
    ) {
        if let Some(inst) = self.instances.get(&id.0) {
            for link in inst.links.lock().iter() {
                visit(*link);
            }
        }
    }

    fn notify_new_collectible(&self, _kind: ContainerKind) {
        self.stats.collectibles.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeCall<'a> {
    host: &'a RecordingHost,
    script: ScriptedCompare,
    scope: CallScope,
    operands: [Option<Operand>; 2],
}

impl PreparedCall for FakeCall<'_> {
    fn bind_operand(&mut self, position: usize, operand: Operand) -> Result<(), HostError> {
        if position >= 2 {
            return Err(HostError::InvalidCall(format!(
                "operand position {} out of range",
                position
            )));
        }
        self.operands[position] = Some(operand);
        Ok(())
    }

    fn execute(self: Box<Self>) -> Result<CallOutcome, HostError> {
        let host = self.host;
        if self.scope == CallScope::Nested {
            // Pop/resume the suspended outer frame.
            host.suspended.lock().pop();
        }
        host.stats.calls.fetch_add(1, Ordering::SeqCst);
        if host.abort_fires() {
            if self.scope == CallScope::Nested {
                // The abort is fatal to the suspended outer call too.
                host.outer_aborted.store(true, Ordering::SeqCst);
            }
            return Ok(CallOutcome::Aborted);
        }
        let lhs = host.operand_payload(self.operands[0])?;
        let rhs = host.operand_payload(self.operands[1])?;
        let ret = match self.script {
            ScriptedCompare::OrderByPayload => CallReturn::Signed(match lhs.cmp(&rhs) {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            }),
            ScriptedCompare::EqualByPayload => CallReturn::Boolean(lhs == rhs),
            ScriptedCompare::ReverseByPayload => CallReturn::Signed(match rhs.cmp(&lhs) {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            }),
        };
        Ok(CallOutcome::Completed(ret))
    }
}

impl CallEngine for RecordingHost {
    fn begin<'a>(
        &'a self,
        callable: CallableId,
        scope: CallScope,
    ) -> Result<Box<dyn PreparedCall + 'a>, HostError> {
        let script = *self
            .callables
            .get(&callable.0)
            .ok_or_else(|| HostError::InvalidCall(format!("unknown callable {:?}", callable)))?;
        if scope == CallScope::Nested {
            // Push/suspend the currently-executing call state.
            self.suspended.lock().push(scope);
            self.stats.nested_calls.fetch_add(1, Ordering::SeqCst);
        }
        Ok(Box::new(FakeCall {
            host: self,
            script,
            scope,
            operands: [None, None],
        }))
    }
}

/// Builder for flat initializer buffers in the engine's binary layout.
#[derive(Default)]
pub struct FlatWriter {
    buf: Vec<u8>,
}

impl FlatWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pad to the next 4-byte boundary.
    pub fn align4(&mut self) -> &mut Self {
        while self.buf.len() % 4 != 0 {
            self.buf.push(0);
        }
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn bytes(&mut self, b: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(b);
        self
    }

    /// Aligned length-prefixed string field.
    pub fn key(&mut self, s: &str) -> &mut Self {
        self.align4();
        self.u32(s.len() as u32);
        self.bytes(s.as_bytes())
    }

    /// Aligned primitive payload at its exact width.
    pub fn prim(&mut self, v: &crate::element::PrimValue) -> &mut Self {
        self.align4();
        let raw = v.to_le_bytes();
        self.bytes(&raw)
    }

    /// Aligned handle payload (zero is the null handle).
    pub fn handle(&mut self, id: Option<InstanceId>) -> &mut Self {
        self.align4();
        self.u64(id.map_or(0, |id| id.0))
    }

    /// Aligned by-value payload: 8-byte LE payload zero-padded to the
    /// declared instance size.
    pub fn value_payload(&mut self, payload: i64, instance_size: usize) -> &mut Self {
        self.align4();
        self.bytes(&payload.to_le_bytes());
        for _ in 8..instance_size {
            self.buf.push(0);
        }
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
