//! Property-based checks of invariants that should hold for whole families
//! of inputs, not just the single worked example each covers in
//! `scenarios.rs`. Each property assembles a small AML program around the
//! proptest-generated value and drives it through `Interpreter`.

use amlvm::{Handler, Interpreter, RegionSpace};
use proptest::prelude::*;

struct NullHandler;
impl Handler for NullHandler {
    fn read_u8(&self, _address: usize) -> u8 {
        0
    }
    fn read_u16(&self, _address: usize) -> u16 {
        0
    }
    fn read_u32(&self, _address: usize) -> u32 {
        0
    }
    fn read_u64(&self, _address: usize) -> u64 {
        0
    }
    fn write_u8(&mut self, _address: usize, _value: u8) {}
    fn write_u16(&mut self, _address: usize, _value: u16) {}
    fn write_u32(&mut self, _address: usize, _value: u32) {}
    fn write_u64(&mut self, _address: usize, _value: u64) {}
    fn read_io_u8(&self, _port: u16) -> u8 {
        0
    }
    fn read_io_u16(&self, _port: u16) -> u16 {
        0
    }
    fn read_io_u32(&self, _port: u16) -> u32 {
        0
    }
    fn write_io_u8(&self, _port: u16, _value: u8) {}
    fn write_io_u16(&self, _port: u16, _value: u16) {}
    fn write_io_u32(&self, _port: u16, _value: u32) {}
    fn read_pci_u8(&self, _segment: u16, _bus: u8, _device: u8, _function: u8, _offset: u16) -> u8 {
        0
    }
    fn read_pci_u16(&self, _segment: u16, _bus: u8, _device: u8, _function: u8, _offset: u16) -> u16 {
        0
    }
    fn read_pci_u32(&self, _segment: u16, _bus: u8, _device: u8, _function: u8, _offset: u16) -> u32 {
        0
    }
    fn write_pci_u8(&self, _segment: u16, _bus: u8, _device: u8, _function: u8, _offset: u16, _value: u8) {}
    fn write_pci_u16(&self, _segment: u16, _bus: u8, _device: u8, _function: u8, _offset: u16, _value: u16) {}
    fn write_pci_u32(&self, _segment: u16, _bus: u8, _device: u8, _function: u8, _offset: u16, _value: u32) {}
    fn read_region(&self, _space: RegionSpace, _offset: u64, _width_bits: u8) -> u64 {
        0
    }
    fn write_region(&mut self, _space: RegionSpace, _offset: u64, _width_bits: u8, _value: u64) {}
    fn stall(&self, _microseconds: u64) {}
    fn sleep(&self, _milliseconds: u64) {}
    fn get_ticks(&self) -> u64 {
        0
    }
}

fn new_interpreter() -> Interpreter {
    Interpreter::new(Box::new(NullHandler))
}

// --- small AML assemblers, generic over the random inputs below -----------

fn name_seg(s: &str) -> [u8; 4] {
    let mut seg = [b'_'; 4];
    for (i, b) in s.bytes().take(4).enumerate() {
        seg[i] = b;
    }
    seg
}

/// Encodes an ACPI `PkgLength` for a structure whose body (after the
/// length field itself) is `content_len` bytes long.
fn pkg_length(content_len: usize) -> Vec<u8> {
    if content_len + 1 <= 0x3F {
        return vec![(content_len + 1) as u8];
    }
    if content_len + 2 <= 0xFFF {
        let total = content_len + 2;
        return vec![0x40 | (total & 0xF) as u8, ((total >> 4) & 0xFF) as u8];
    }
    if content_len + 3 <= 0xF_FFFF {
        let total = content_len + 3;
        return vec![0x80 | (total & 0xF) as u8, ((total >> 4) & 0xFF) as u8, ((total >> 12) & 0xFF) as u8];
    }
    let total = content_len + 4;
    vec![
        0xC0 | (total & 0xF) as u8,
        ((total >> 4) & 0xFF) as u8,
        ((total >> 12) & 0xFF) as u8,
        ((total >> 20) & 0xFF) as u8,
    ]
}

fn byte_const(v: u8) -> Vec<u8> {
    vec![0x0A, v]
}

fn qword_const(v: u64) -> Vec<u8> {
    let mut out = vec![0x0E];
    out.extend_from_slice(&v.to_le_bytes());
    out
}

fn wrap(opcode: u8, content: Vec<u8>) -> Vec<u8> {
    let mut out = vec![opcode];
    out.extend(pkg_length(content.len()));
    out.extend(content);
    out
}

fn name_decl(name: &str, value: Vec<u8>) -> Vec<u8> {
    let mut out = vec![0x08];
    out.extend(name_seg(name));
    out.extend(value);
    out
}

fn method_decl(name: &str, body: Vec<u8>) -> Vec<u8> {
    let mut content = Vec::new();
    content.extend(name_seg(name));
    content.push(0x00); // MethodFlags: 0 args, not serialized
    content.extend(body);
    wrap(0x14, content)
}

fn buffer_lit(size: u8, init: &[u8]) -> Vec<u8> {
    let mut content = byte_const(size);
    content.extend_from_slice(init);
    wrap(0x11, content)
}

proptest! {
    /// `DerefOf(RefOf(Local0))` always reads back whatever was last stored
    /// into `Local0`, for any 64-bit integer.
    #[test]
    fn deref_of_ref_of_local_is_identity(v: u64) {
        let mut body = Vec::new();
        body.push(0x70); // Store(
        body.extend(qword_const(v));
        body.push(0x60); // , Local0)
        body.push(0xA4); // Return(
        body.push(0x83); // DerefOf(
        body.push(0x71); // RefOf(
        body.push(0x60); // Local0))
        let table = method_decl("DRFI", body);

        let mut interp = new_interpreter();
        interp.load_table(table, 2).unwrap();
        let result = interp.invoke_method_by_path("\\DRFI", Vec::new()).unwrap();
        prop_assert_eq!(result.as_integer().unwrap(), v);
    }

    /// `ToBuffer(ToInteger(buf))` round-trips an 8-byte buffer exactly,
    /// since `ToInteger` always consumes (and `ToBuffer` always produces)
    /// a full 8-byte little-endian span.
    #[test]
    fn to_buffer_to_integer_roundtrips_eight_byte_buffer(bytes in proptest::collection::vec(any::<u8>(), 8..=8)) {
        let mut table = name_decl("BUFV", buffer_lit(8, &bytes));

        let mut body = Vec::new();
        body.push(0xA4); // Return(
        body.push(0x96); // ToBuffer(
        body.push(0x99); // ToInteger(
        body.extend(name_seg("BUFV"));
        body.push(0x00); // , Nil)
        body.push(0x00); // , Nil))
        table.extend(method_decl("RTRP", body));

        let mut interp = new_interpreter();
        interp.load_table(table, 2).unwrap();
        let result = interp.invoke_method_by_path("\\RTRP", Vec::new()).unwrap();
        prop_assert_eq!(&result.as_buffer_bytes().unwrap().borrow()[..], &bytes[..]);
    }

    /// A bit-field write followed by a read of the same field returns
    /// exactly what was written, at any bit offset/width that fits inside
    /// a 4-byte backing buffer, independent of the surrounding bits (which
    /// start zeroed).
    #[test]
    fn bit_field_write_then_read_is_exact(
        bit_index in 0u8..24,
        num_bits in 1u8..9,
        raw_value in any::<u32>(),
    ) {
        let value = (raw_value as u64) & ((1u64 << num_bits) - 1);

        let mut table = name_decl("BUFB", buffer_lit(4, &[]));

        let mut create_field = vec![0x5B, 0x13]; // ExtOpPrefix CreateFieldOp
        create_field.extend(name_seg("BUFB"));
        create_field.extend(byte_const(bit_index));
        create_field.extend(byte_const(num_bits));
        create_field.extend(name_seg("FLDX"));
        table.extend(create_field);

        let mut body = Vec::new();
        body.push(0x70); // Store(
        body.extend(qword_const(value));
        body.extend(name_seg("FLDX")); // , FLDX)
        body.push(0xA4); // Return(
        body.extend(name_seg("FLDX")); // FLDX)
        table.extend(method_decl("BFRW", body));

        let mut interp = new_interpreter();
        interp.load_table(table, 2).unwrap();
        let result = interp.invoke_method_by_path("\\BFRW", Vec::new()).unwrap();
        prop_assert_eq!(result.as_integer().unwrap(), value);
    }

    /// `Add` wraps at 32 bits under a revision-1 table and at 64 bits
    /// otherwise, matching `sizeof_int`'s mask.
    #[test]
    fn add_wraps_by_table_revision(v: u64) {
        let mut body = vec![0x72]; // Add(
        body.extend(qword_const(v));
        body.extend(byte_const(1)); // , 1
        body.push(0x60); // , Local0)
        body.push(0xA4); // Return(
        body.push(0x60); // Local0)
        let table = method_decl("ADDW", body);

        let mut rev1 = new_interpreter();
        rev1.load_table(table.clone(), 1).unwrap();
        let r1 = rev1.invoke_method_by_path("\\ADDW", Vec::new()).unwrap();
        prop_assert_eq!(r1.as_integer().unwrap(), v.wrapping_add(1) & 0xFFFF_FFFF);

        let mut rev2 = new_interpreter();
        rev2.load_table(table, 2).unwrap();
        let r2 = rev2.invoke_method_by_path("\\ADDW", Vec::new()).unwrap();
        prop_assert_eq!(r2.as_integer().unwrap(), v.wrapping_add(1));
    }
}
