//! `amlvm` is a pure-Rust AML (ACPI Machine Language) bytecode interpreter,
//! used to run the AML encoded in a platform's DSDT/SSDT tables. A kernel
//! feeds it a table's bytes and a `Handler` implementing the platform's
//! memory/IO/PCI access, then looks up objects or invokes control methods by
//! namespace path.
//!
//! ### Using the library
//! Construct an [`Interpreter`] with a `Handler`, then [`Interpreter::load_table`]
//! each DSDT/SSDT in turn. After that, invoke control methods by path:
//! ```ignore
//! let mut interpreter = Interpreter::new(Box::new(MyHandler));
//! interpreter.load_table(dsdt_bytes, 2)?;
//! let result = interpreter.invoke_method_by_path("\\_SB.PCI0.S08._CRS", Vec::new())?;
//! ```
//!
//! ### About the interpreter
//! Unlike a parser-combinator front end that builds an AST before walking it,
//! this crate decodes and executes a method body in one recursive-descent
//! pass: each `TermArg`/`SuperName`/`Target` is evaluated by an ordinary
//! (possibly recursive) function call over the call frame's `code` buffer
//! directly. See `DESIGN.md` for why.

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

mod bitspan;
mod context;
mod error;
mod exec;
mod frame;
mod handler;
mod name;
mod namespace;
mod object;
mod opcode;
mod pkglen;
mod store;

pub use context::Interpreter;
pub use error::{AmlError, AmlResult};
pub use frame::Flow;
pub use handler::Handler;
pub use name::{NamePath, NameSeg};
pub use namespace::{NodeId, Namespace};
pub use object::{
    BufferField, BufferIndex, Location, MethodObject, Mutex, Object, ObjectKind, OperationRegion,
    PowerResource, Processor, RefKind, Reference, RegionSpace, SharedBytes,
};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;

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

    #[test]
    fn predefined_objects_are_ready_before_any_table_loads() {
        let interp = new_interpreter();
        assert!(interp.namespace.predefined("\\_SB").is_ok());
    }

    #[test]
    fn rev1_table_narrows_integers_to_32_bits() {
        let mut interp = new_interpreter();
        interp.load_table(alloc::vec![], 1).unwrap();
        assert!(interp.is_rev1());
        assert_eq!(interp.sizeof_int(), 4);
    }
}
