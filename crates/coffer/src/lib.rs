// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! # coffer - type-erased containers for an embedding script host
//!
//! Generic dynamic containers - a resizable array, a 2-D grid, and a
//! string-keyed dictionary - for values whose concrete type is known only at
//! runtime through a host-supplied reflection interface. One element slot
//! transparently supports three storage disciplines: raw primitives (inline
//! bytes), by-value foreign objects (owned, copy-constructed into the slot),
//! and by-handle foreign objects (shared, reference-counted). Containers
//! cooperate with the host's tracing cycle collector.
//!
//! ## Quick Start
//!
//! ```rust
//! use coffer::testkit::RecordingHost;
//! use coffer::{CallScope, Element, PrimValue, Result, ScriptArray};
//!
//! fn main() -> Result<()> {
//!     let host = RecordingHost::new();
//!     let int = host.register_primitive(coffer::PrimitiveKind::I32);
//!
//!     let mut arr = ScriptArray::new(host.services(), int);
//!     for v in [3, 1, 2] {
//!         arr.push(&Element::Prim(PrimValue::I32(v)))?;
//!     }
//!     arr.sort_ascending(CallScope::TopLevel)?;
//!     assert!(matches!(arr.at(0)?, Element::Prim(PrimValue::I32(1))));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                     Registration layer (host)                |
//! +--------------------------------------------------------------+
//! |  ScriptArray        ScriptGrid        ScriptDictionary       |
//! |      |                  |                |- ValueCell        |
//! |  ElementBuffer      ElementBuffer       (one cell per key)   |
//! +--------------------------------------------------------------+
//! |  Element slots: Prim | ValueInstance | ObjectHandle          |
//! |  ComparatorBridge / ComparatorCache      GC protocol         |
//! +--------------------------------------------------------------+
//! |  Host runtime: ObjectModel + CallEngine (consumed only)      |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ScriptArray`] | One-dimensional container with insert/remove/sort/find |
//! | [`ScriptGrid`] | Dense 2-D store with overlap-preserving resize |
//! | [`ScriptDictionary`] | String-keyed map of [`ValueCell`] slots |
//! | [`Element`] | One type-erased slot value |
//! | [`HostServices`] | The host interface bundle containers consume |
//! | [`Collectible`] | The five-operation GC cooperation protocol |

pub mod array;
pub mod buffer;
pub mod compare;
pub mod dict;
pub mod element;
pub mod error;
pub mod gc;
pub mod grid;
pub mod host;
pub mod initlist;
pub mod testkit;

pub use array::ScriptArray;
pub use buffer::ElementBuffer;
pub use compare::{ComparatorBridge, ComparatorCache, SortOrder};
pub use dict::{CellPayload, ScriptDictionary, ValueCell};
pub use element::{Element, ObjectHandle, PrimValue, ValueInstance};
pub use error::{ContainerError, Result};
pub use gc::{Collectible, GcHeader};
pub use grid::ScriptGrid;
pub use host::{
    CallEngine, CallOutcome, CallReturn, CallScope, CallableId, CallableResolution, ContainerKind,
    HostError, HostServices, InstanceId, ObjectModel, Operand, PreparedCall, PrimitiveKind,
    StorageClass, TypeDescriptor, TypeId,
};
pub use initlist::InitReader;
