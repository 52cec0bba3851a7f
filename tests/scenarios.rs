//! End-to-end scenarios: each test builds the exact byte sequence for one
//! definition block / method body and checks the documented outcome,
//! exercising `Interpreter::load_table` + `invoke_method_by_path` against
//! real AML rather than unit-testing individual opcode handlers.

use amlvm::{Handler, Interpreter, RegionSpace};

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

/// S1: `Add(2, 3, Local0); Return(Local0)` inside a zero-arg method.
#[test]
fn s1_add_constants() {
    let table: Vec<u8> = vec![
        0x14, 0x0E, b'A', b'D', b'D', b'T', 0x00, // MethodOp PkgLength(14) "ADDT" flags=0
        0x72, 0x0A, 0x02, 0x0A, 0x03, 0x60, // Add(2, 3, Local0)
        0xA4, 0x60, // Return(Local0)
    ];

    let mut interp = new_interpreter();
    interp.load_table(table, 2).unwrap();
    let result = interp.invoke_method_by_path("\\ADDT", Vec::new()).unwrap();
    assert_eq!(result.as_integer().unwrap(), 5);
}

/// S2: a bare `NameString` inside a package literal lazily binds to its
/// path string rather than resolving to the named object's value, even
/// when that object already exists at load time.
#[test]
fn s2_package_with_lazy_name() {
    let table: Vec<u8> = vec![
        0x08, b'F', b'O', b'O', b'X', 0x0A, 0x2A, // Name(FOOX, 0x2A)
        0x08, b'P', b'K', b'G', b'X', // Name(PKGX, ...)
        0x12, 0x08, 0x02, // PackageOp PkgLength(8) NumElements=2
        0x0A, 0x05, // 0x05
        b'F', b'O', b'O', b'X', // bare name FOOX, lazily bound
    ];

    let mut interp = new_interpreter();
    interp.load_table(table, 2).unwrap();

    let pkgx = interp.namespace.get_by_path_str(interp.namespace.root(), "\\PKGX").unwrap();
    let object = interp.namespace.get_object(pkgx).unwrap();
    let elements = object.as_package().unwrap();
    let elements = elements.borrow();
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0].as_integer().unwrap(), 5);
    assert_eq!(elements[1].as_string().unwrap(), "FOOX");
}

/// S3: `CreateField(BUFX, 4, 12, FFLD); Store(0xABC, FFLD)` must land the
/// value at the misaligned bit offset, not byte-align it.
#[test]
fn s3_buffer_field_alignment() {
    let table: Vec<u8> = vec![
        0x08, b'B', b'U', b'F', b'X', // Name(BUFX, ...)
        0x11, 0x03, 0x0A, 0x04, // BufferOp PkgLength(3) size=4, no initializer (zero-filled)
        0x5B, 0x13, // ExtOpPrefix CreateFieldOp
        b'B', b'U', b'F', b'X', // source buffer
        0x0A, 0x04, // bit index 4
        0x0A, 0x0C, // num bits 12
        b'F', b'F', b'L', b'D', // field name
        0x70, 0x0B, 0xBC, 0x0A, // Store(0x0ABC, ...)
        b'F', b'F', b'L', b'D',
    ];

    let mut interp = new_interpreter();
    interp.load_table(table, 2).unwrap();

    let bufx = interp.namespace.get_by_path_str(interp.namespace.root(), "\\BUFX").unwrap();
    let object = interp.namespace.get_object(bufx).unwrap();
    let bytes = object.as_buffer_bytes().unwrap();
    // 0xABC << 4 = 0xABC0, little-endian.
    assert_eq!(&bytes.borrow()[..], &[0xC0, 0xAB, 0x00, 0x00]);
}

/// S4: `While(1) { Increment(Local0); If (LEqual(Local0, 3)) { Break } }`
/// must terminate via `Break`, not loop forever.
#[test]
fn s4_while_break() {
    let table: Vec<u8> = vec![
        0x14, 0x17, b'L', b'O', b'O', b'P', 0x00, // MethodOp PkgLength(23) "LOOP" flags=0
        0x70, 0x00, 0x60, // Store(Zero, Local0)
        0xA2, 0x0B, 0x01, // While PkgLength(11) predicate=One
        0x75, 0x60, // Increment(Local0)
        0xA0, 0x06, // If PkgLength(6)
        0x93, 0x60, 0x0A, 0x03, // LEqual(Local0, 3)
        0xA5, // Break
        0xA4, 0x60, // Return(Local0)
    ];

    let mut interp = new_interpreter();
    interp.load_table(table, 2).unwrap();
    let result = interp.invoke_method_by_path("\\LOOP", Vec::new()).unwrap();
    assert_eq!(result.as_integer().unwrap(), 3);
}

/// S5: `DerefOf(Index(BUF2, 1))` reads the indexed byte directly out of
/// the buffer, without ever materializing an intermediate reference object.
#[test]
fn s5_deref_of_buffer_index() {
    let table: Vec<u8> = vec![
        0x08, b'B', b'U', b'F', b'2', // Name(BUF2, ...)
        0x11, 0x06, 0x0A, 0x03, 0x11, 0x22, 0x33, // Buffer(3) { 0x11, 0x22, 0x33 }
        0x14, 0x0F, b'D', b'R', b'E', b'F', 0x00, // MethodOp PkgLength(15) "DREF" flags=0
        0xA4, // Return(
        0x83, // DerefOf(
        0x88, b'B', b'U', b'F', b'2', 0x01, 0x00, // Index(BUF2, One, Nil)
    ];

    let mut interp = new_interpreter();
    interp.load_table(table, 2).unwrap();
    let result = interp.invoke_method_by_path("\\DREF", Vec::new()).unwrap();
    assert_eq!(result.as_integer().unwrap(), 0x22);
}

/// S6: a bare name referenced from a control method defined in a nested
/// scope climbs ancestor scopes until it finds the name, rather than
/// searching only the method's own scope.
#[test]
fn s6_upward_scope_search() {
    let table: Vec<u8> = vec![
        0x10, 0x1F, 0x5C, b'_', b'S', b'B', b'_', // Scope(\_SB) PkgLength(31)
        0x08, b'F', b'O', b'O', b'Z', 0x0A, 0x7B, // Name(FOOZ, 0x7B)
        0x10, 0x11, b'N', b'E', b'S', b'T', // Scope(NEST) PkgLength(17)
        0x14, 0x0B, b'G', b'E', b'T', b'F', 0x00, // MethodOp PkgLength(11) "GETF" flags=0
        0xA4, b'F', b'O', b'O', b'Z', // Return(FOOZ)
    ];

    let mut interp = new_interpreter();
    interp.load_table(table, 2).unwrap();
    let result = interp.invoke_method_by_path("\\_SB.NEST.GETF", Vec::new()).unwrap();
    assert_eq!(result.as_integer().unwrap(), 0x7B);
}
