// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! The string-keyed dictionary.
//!
//! One heap [`ValueCell`] per key, not a shared buffer. Keys are unique;
//! iteration order is implementation-defined but stable between non-mutating
//! calls. Entries are created on first `set`, replaced in place on later
//! `set`, and removed explicitly or on destruction.

mod cell;

pub use cell::{CellPayload, ValueCell};

use std::collections::HashMap;
use std::sync::Arc;

use crate::element::Element;
use crate::error::Result;
use crate::gc::{Collectible, GcHeader};
use crate::host::{ContainerKind, HostServices, InstanceId, TypeDescriptor, TypeId};
use crate::initlist::InitReader;

/// Mapping from string key to one type-erased value slot.
pub struct ScriptDictionary {
    gc: GcHeader,
    services: HostServices,
    entries: HashMap<String, ValueCell>,
}

impl ScriptDictionary {
    /// Empty dictionary.
    pub fn new(services: HostServices) -> Self {
        services.objects.notify_new_collectible(ContainerKind::Dictionary);
        Self {
            gc: GcHeader::new(),
            services,
            entries: HashMap::new(),
        }
    }

    /// Dictionary decoded from a flat initializer buffer: `u32` entry count,
    /// then per entry an aligned length-prefixed key, an aligned `u32` type
    /// id, and an aligned payload sized per storage kind.
    pub fn from_flat_buffer(services: HostServices, bytes: &[u8]) -> Result<Self> {
        let mut dict = Self::new(services);
        let mut reader = InitReader::new(bytes);
        let count = reader.read_u32()?;
        for _ in 0..count {
            let key = reader.read_string()?;
            reader.align4();
            let type_id = TypeId(reader.read_u32()?);
            let ty = dict
                .services
                .objects
                .type_descriptor(type_id)
                .ok_or(crate::error::ContainerError::UnknownTypeId(type_id))?;
            reader.align4();
            let value = reader.read_element(&dict.services, &ty)?;
            dict.set(&key, &ty, &value)?;
        }
        Ok(dict)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn services(&self) -> &HostServices {
        &self.services
    }

    /// Store `value` under `key`, creating the entry on first use and
    /// replacing in place afterwards (the old value is released).
    pub fn set(&mut self, key: &str, ty: &Arc<TypeDescriptor>, value: &Element) -> Result<()> {
        if let Some(cell) = self.entries.get_mut(key) {
            return cell.store(ty, value);
        }
        let mut cell = ValueCell::empty(self.services.clone());
        cell.store(ty, value)?;
        self.entries.insert(key.to_string(), cell);
        Ok(())
    }

    /// Type-checked retrieval. `Ok(None)` when the key is absent; a type
    /// mismatch with no widening conversion is an error.
    pub fn get(&self, key: &str, ty: &Arc<TypeDescriptor>) -> Result<Option<Element>> {
        match self.entries.get(key) {
            Some(cell) if !cell.is_empty() => cell.load(ty).map(Some),
            _ => Ok(None),
        }
    }

    /// Numeric retrieval widened to i64.
    pub fn get_int(&self, key: &str) -> Result<Option<i64>> {
        match self.entries.get(key) {
            Some(cell) if !cell.is_empty() => cell.load_int().map(Some),
            _ => Ok(None),
        }
    }

    /// Numeric retrieval widened to f64.
    pub fn get_float(&self, key: &str) -> Result<Option<f64>> {
        match self.entries.get(key) {
            Some(cell) if !cell.is_empty() => cell.load_float().map(Some),
            _ => Ok(None),
        }
    }

    /// Numeric retrieval as a truth value.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.entries.get(key) {
            Some(cell) if !cell.is_empty() => cell.load_bool().map(Some),
            _ => Ok(None),
        }
    }

    /// Whether `key` has a live entry.
    pub fn exists(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove one entry, releasing its value. Returns whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove every entry.
    pub fn delete_all(&mut self) {
        self.entries.clear();
    }

    /// Snapshot of the keys at call time.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Iterate `(key, cell)` pairs. The cell exposes its descriptor and
    /// payload view.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValueCell)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The cell backing one key, if present.
    pub fn cell(&self, key: &str) -> Option<&ValueCell> {
        self.entries.get(key)
    }
}

impl Collectible for ScriptDictionary {
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
        for cell in self.entries.values() {
            cell.visit_references(visit);
        }
    }

    fn release_all_references(&mut self) {
        log::debug!(
            "[ScriptDictionary] release_all_references: dropping {} entries",
            self.entries.len()
        );
        self.delete_all();
    }
}

impl std::fmt::Debug for ScriptDictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptDictionary")
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}
