// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! Flat initializer-buffer decoding.
//!
//! The one binary format the engine owns: a little-endian stream of fields
//! padded to 4-byte alignment unconditionally (the host ABI's rule, preserved
//! as-is). Payload width per storage kind: the primitive width, 8 bytes for a
//! handle id, or the full `instance_size` representation for a by-value
//! object, decoded through the host.

use std::sync::Arc;

use crate::element::{Element, ObjectHandle, PrimValue, ValueInstance};
use crate::error::{ContainerError, Result};
use crate::host::{HostServices, InstanceId, StorageClass, TypeDescriptor, HANDLE_SIZE};

/// Cursor over one flat initializer buffer.
pub struct InitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> InitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    /// Skip forward to the next 4-byte boundary.
    pub fn align4(&mut self) {
        self.pos = (self.pos + 3) & !3;
    }

    /// Consume exactly `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(ContainerError::InitializerTruncated {
                need: n,
                have: self.bytes.len().saturating_sub(self.pos),
            });
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Consume one little-endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Consume one little-endian u64.
    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Consume one length-prefixed UTF-8 string (aligned to 4 before the
    /// length word).
    pub fn read_string(&mut self) -> Result<String> {
        self.align4();
        let len = self.read_u32()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| ContainerError::InvalidCall("initializer key is not valid UTF-8".into()))
    }

    /// Consume one element payload of the given type.
    pub fn read_element(
        &mut self,
        services: &HostServices,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Element> {
        match ty.storage {
            StorageClass::Primitive(kind) => {
                let raw = self.take(kind.width())?;
                Ok(Element::Prim(PrimValue::from_le_bytes(kind, raw)?))
            }
            StorageClass::ByHandle => {
                let id = self.read_handle_payload()?;
                Ok(Element::Handle(
                    id.map(|id| ObjectHandle::acquire(&services.objects, id)),
                ))
            }
            StorageClass::ByValue => {
                let raw = self.take(ty.instance_size)?;
                let id = services.objects.construct_from_bytes(ty, raw)?;
                Ok(Element::Value(ValueInstance::adopt(
                    services.objects.clone(),
                    ty.clone(),
                    id,
                )))
            }
        }
    }

    fn read_handle_payload(&mut self) -> Result<Option<InstanceId>> {
        debug_assert_eq!(HANDLE_SIZE, 8);
        let raw = self.read_u64()?;
        Ok(if raw == 0 { None } else { Some(InstanceId(raw)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::PrimitiveKind;

    #[test]
    fn test_align4_skips_padding() {
        let mut r = InitReader::new(&[1, 0, 0, 0, 9, 9, 9, 0x2a, 0, 0, 0, 0]);
        assert_eq!(r.read_u32().unwrap(), 1);
        r.take(3).unwrap();
        r.align4(); // pos 7 -> 8
        assert_eq!(r.remaining(), 4);
    }

    #[test]
    fn test_align4_is_idempotent_on_boundary() {
        let mut r = InitReader::new(&[5, 0, 0, 0, 7, 0, 0, 0]);
        assert_eq!(r.read_u32().unwrap(), 5);
        r.align4();
        assert_eq!(r.read_u32().unwrap(), 7);
    }

    #[test]
    fn test_truncated_take() {
        let mut r = InitReader::new(&[1, 2]);
        let err = r.take(4).unwrap_err();
        assert!(matches!(
            err,
            ContainerError::InitializerTruncated { need: 4, have: 2 }
        ));
    }

    #[test]
    fn test_read_string() {
        let mut buf = vec![3, 0, 0, 0];
        buf.extend_from_slice(b"abc");
        let mut r = InitReader::new(&buf);
        assert_eq!(r.read_string().unwrap(), "abc");
    }

    #[test]
    fn test_prim_payload_width_is_exact() {
        let mut r = InitReader::new(&[0x2a, 0xff]);
        let v = PrimValue::from_le_bytes(PrimitiveKind::U8, r.take(1).unwrap()).unwrap();
        assert_eq!(v, PrimValue::U8(0x2a));
        assert_eq!(r.remaining(), 1);
    }
}
