//! Kernel services required by the core (spec.md §6). The trait mirrors
//! the teacher's own `Handler` almost one for one, since both cover the
//! same physical memory/IO/PCI-config access surface; `read_region`/
//! `write_region` generalizes the teacher's fixed per-space methods to the
//! full ACPI address-space list (SPEC_FULL.md §C).

use crate::object::RegionSpace;

pub trait Handler: Send + Sync {
    fn read_u8(&self, address: usize) -> u8;
    fn read_u16(&self, address: usize) -> u16;
    fn read_u32(&self, address: usize) -> u32;
    fn read_u64(&self, address: usize) -> u64;

    fn write_u8(&mut self, address: usize, value: u8);
    fn write_u16(&mut self, address: usize, value: u16);
    fn write_u32(&mut self, address: usize, value: u32);
    fn write_u64(&mut self, address: usize, value: u64);

    fn read_io_u8(&self, port: u16) -> u8;
    fn read_io_u16(&self, port: u16) -> u16;
    fn read_io_u32(&self, port: u16) -> u32;

    fn write_io_u8(&self, port: u16, value: u8);
    fn write_io_u16(&self, port: u16, value: u16);
    fn write_io_u32(&self, port: u16, value: u32);

    fn read_pci_u8(&self, segment: u16, bus: u8, device: u8, function: u8, offset: u16) -> u8;
    fn read_pci_u16(&self, segment: u16, bus: u8, device: u8, function: u8, offset: u16) -> u16;
    fn read_pci_u32(&self, segment: u16, bus: u8, device: u8, function: u8, offset: u16) -> u32;

    fn write_pci_u8(&self, segment: u16, bus: u8, device: u8, function: u8, offset: u16, value: u8);
    fn write_pci_u16(&self, segment: u16, bus: u8, device: u8, function: u8, offset: u16, value: u16);
    fn write_pci_u32(&self, segment: u16, bus: u8, device: u8, function: u8, offset: u16, value: u32);

    /// Catch-all for the address spaces that don't have a dedicated method
    /// above (EmbeddedControl, SMBus, SystemCMOS, PciBarTarget, IPMI,
    /// GeneralPurposeIO, GenericSerialBus, OEM-defined).
    fn read_region(&self, space: RegionSpace, offset: u64, width_bits: u8) -> u64;
    fn write_region(&mut self, space: RegionSpace, offset: u64, width_bits: u8, value: u64);

    /// Stall for at least the given number of **microseconds**. An
    /// implementation should not relinquish control of the processor
    /// during the stall.
    fn stall(&self, microseconds: u64);

    /// Sleep for at least the given number of **milliseconds**; may
    /// relinquish the processor.
    fn sleep(&self, milliseconds: u64);

    /// 100ns ticks, for the `Timer` opcode (spec.md §4.5).
    fn get_ticks(&self) -> u64;

    fn handle_fatal_error(&self, fatal_type: u8, fatal_code: u32, fatal_arg: u64) {
        log::error!(
            "fatal error while executing AML (DefFatal): type={:#x} code={:#x} arg={:#x}",
            fatal_type,
            fatal_code,
            fatal_arg
        );
    }
}
