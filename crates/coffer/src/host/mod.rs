// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! Host runtime interface: type descriptors and the consumed service traits.

pub mod descriptor;
pub mod runtime;

pub use descriptor::{
    CallableId, InstanceId, PrimitiveKind, StorageClass, TypeDescriptor, TypeId, HANDLE_SIZE,
};
pub use runtime::{
    CallEngine, CallOutcome, CallReturn, CallScope, CallableResolution, ContainerKind, HostError,
    HostServices, ObjectModel, Operand, PreparedCall,
};
