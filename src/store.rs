//! Store / copy protocol (spec.md §4.6), grounded on the teacher's
//! `AmlContext::store` for the overall shape (dispatch on the target's
//! reference kind, implicit cast onto an existing value) but following
//! spec.md's per-kind rules, which differ from the teacher's in several
//! reference-OS-compatibility details (§9) that must be kept literally.

use alloc::string::String;
use alloc::vec::Vec;

use crate::bitspan;
use crate::error::{AmlError, AmlResult};
use crate::object::{BufferField, BufferIndex, Location, Object, RefKind, Reference};

/// `None` represents the `NullName` sentinel target (spec.md §4.6 "Store to
/// Integer 0" — the no-target case), which is a silent no-op for both
/// verbs.
pub fn store(target: Option<Object>, source: Object, sizeof_int: u8) -> AmlResult<()> {
    match target {
        None => Ok(()),
        Some(Object::Debug) => {
            log_debug_value(&source, 0);
            Ok(())
        }
        Some(Object::Reference(r)) => store_to_reference(&r, source, sizeof_int),
        Some(Object::BufferIndex(bi)) => write_buffer_index(&bi, &source),
        Some(other) => Err(AmlError::TypeMismatch { expected: crate::object::ObjectKind::Reference, found: other.kind() }),
    }
}

pub fn copy_object(target: Object, source: Object) -> AmlResult<()> {
    match target {
        Object::Reference(r) => match r.kind {
            RefKind::RefOf => Err(AmlError::InvalidArgument),
            RefKind::Local | RefKind::Named | RefKind::PkgIndex => r.target.set(source.deep_copy()?),
            RefKind::Arg => match r.target.get()? {
                Object::Reference(inner) => inner.bottom_location()?.set(source.deep_copy()?),
                _ => r.target.set(source.deep_copy()?),
            },
        },
        other => Err(AmlError::TypeMismatch { expected: crate::object::ObjectKind::Reference, found: other.kind() }),
    }
}

fn store_to_reference(r: &Reference, source: Object, sizeof_int: u8) -> AmlResult<()> {
    match r.kind {
        RefKind::RefOf | RefKind::Named => {
            let bottom = r.bottom_location()?;
            assign_with_implicit_cast(&bottom, source, sizeof_int)
        }
        RefKind::Local | RefKind::PkgIndex => match r.target.get()? {
            Object::Reference(inner) => {
                let bottom = inner.bottom_location()?;
                assign_with_implicit_cast(&bottom, source, sizeof_int)
            }
            _ => r.target.set(source.deep_copy()?),
        },
        RefKind::Arg => match r.target.get()? {
            Object::Reference(inner) => {
                let bottom = inner.bottom_location()?;
                assign_with_implicit_cast(&bottom, source, sizeof_int)
            }
            _ => r.target.set(source.deep_copy()?),
        },
    }
}

/// Truncates/zero-pads `source`'s raw byte representation to exactly
/// `len` bytes (spec.md §4.6 "read at most sizeof(dst) bytes ... and
/// zero-pad the rest").
fn cast_bytes(source: &Object, len: usize) -> AmlResult<Vec<u8>> {
    let mut bytes = source.raw_bytes()?;
    bytes.resize(len, 0);
    Ok(bytes)
}

fn assign_with_implicit_cast(dest: &Location, source: Object, sizeof_int: u8) -> AmlResult<()> {
    match dest.get()? {
        Object::Integer(_) => {
            let bytes = cast_bytes(&source, sizeof_int as usize)?;
            let mut buf = [0u8; 8];
            buf[..bytes.len().min(8)].copy_from_slice(&bytes[..bytes.len().min(8)]);
            dest.set(Object::Integer(u64::from_le_bytes(buf)))
        }
        Object::String(existing) => {
            let len = existing.borrow().len();
            dest.set(Object::new_string_owned(cast_bytes(&source, len)?))
        }
        Object::Buffer(existing) => {
            let len = existing.borrow().len();
            dest.set(Object::new_buffer(cast_bytes(&source, len)?))
        }
        Object::BufferField(bf) => write_buffer_field(&bf, &source),
        Object::BufferIndex(bi) => write_buffer_index(&bi, &source),
        _ => dest.set(source.deep_copy()?),
    }
}

pub fn write_buffer_field(field: &BufferField, source: &Object) -> AmlResult<()> {
    let byte_len = ((field.bit_length + 7) / 8) as usize;
    let bytes = cast_bytes(source, byte_len)?;
    bitspan::write_bits(&mut field.backing.borrow_mut(), field.bit_index, field.bit_length, &bytes);
    Ok(())
}

pub fn read_buffer_field(field: &BufferField, is_rev1: bool) -> AmlResult<Object> {
    let bytes = bitspan::read_bits(&field.backing.borrow(), field.bit_index, field.bit_length);
    let threshold = if is_rev1 { 32 } else { 64 };
    if field.bit_length <= threshold && !field.force_buffer {
        let mut buf = [0u8; 8];
        buf[..bytes.len().min(8)].copy_from_slice(&bytes[..bytes.len().min(8)]);
        Ok(Object::Integer(u64::from_le_bytes(buf)))
    } else {
        Ok(Object::new_buffer(bytes))
    }
}

fn write_buffer_index(index: &BufferIndex, source: &Object) -> AmlResult<()> {
    let byte = cast_bytes(source, 1)?[0];
    let mut backing = index.buffer.borrow_mut();
    if let Some(slot) = backing.get_mut(index.idx) {
        *slot = byte;
        Ok(())
    } else {
        Err(AmlError::OutOfBounds)
    }
}

pub fn read_buffer_index(index: &BufferIndex) -> AmlResult<Object> {
    let backing = index.buffer.borrow();
    let byte = *backing.get(index.idx).ok_or(AmlError::OutOfBounds)?;
    Ok(Object::Integer(byte as u64))
}

/// Store to Debug: logs the unwrapped value, recursing one level into
/// packages (spec.md §4.6).
fn log_debug_value(value: &Object, depth: u32) {
    match value {
        Object::Integer(v) => log::debug!("[Debug] Integer({:#x})", v),
        Object::String(s) => log::debug!("[Debug] String({:?})", String::from_utf8_lossy(&s.borrow())),
        Object::Buffer(b) => log::debug!("[Debug] Buffer({:?})", &*b.borrow()),
        Object::Package(p) if depth == 0 => {
            log::debug!("[Debug] Package[{}]", p.borrow().len());
            for e in p.borrow().iter() {
                log_debug_value(e, depth + 1);
            }
        }
        Object::Package(p) => log::debug!("[Debug]   Package[{}]", p.borrow().len()),
        Object::Reference(r) => match r.unwind() {
            Ok(v) => log_debug_value(&v, depth),
            Err(_) => log::debug!("[Debug] <dangling reference>"),
        },
        other => log::debug!("[Debug] {:?}", other.kind()),
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::RefKind;

    #[test]
    fn store_to_local_uninitialized_overwrites_type() {
        let loc = Location::new_slot(Object::Uninitialized);
        let target = Object::Reference(Reference::new(RefKind::Local, loc.clone()));
        store(Some(target), Object::Integer(5), 8).unwrap();
        assert_eq!(loc.get().unwrap().as_integer().unwrap(), 5);
    }

    #[test]
    fn store_casts_to_existing_integer_target() {
        let loc = Location::new_slot(Object::Integer(0));
        let target = Object::Reference(Reference::new(RefKind::Named, loc.clone()));
        store(Some(target), Object::new_string("\x07"), 8).unwrap();
        assert_eq!(loc.get().unwrap().as_integer().unwrap(), 7);
    }

    #[test]
    fn store_to_integer_zero_is_noop() {
        store(None, Object::Integer(42), 8).unwrap();
    }
}
