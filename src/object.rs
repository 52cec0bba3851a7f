//! The tagged value universe every AML expression evaluates to (spec.md §3).
//!
//! Sharing follows the teacher's own `AmlValue`: package elements and
//! buffer-field backings are reference-counted so a `Store`/`CopyObject`
//! can alias storage instead of always deep-copying. Since execution is
//! single-threaded per spec.md §5, we use `Rc<RefCell<_>>` rather than
//! `Arc<Mutex<_>>`.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::error::{AmlError, AmlResult};
use crate::namespace::NodeId;

/// A mutable, shared place an `Object` can live in: a local/arg/named slot,
/// or one element of a package. `Reference` is built on top of this so the
/// four non-`RefOf` reference kinds share one "has an inner pointer"
/// implementation, per spec.md §9's design note.
#[derive(Debug, Clone)]
pub enum Location {
    Slot(Rc<RefCell<Object>>),
    Package(Rc<RefCell<Vec<Object>>>, usize),
}

impl Location {
    pub fn new_slot(obj: Object) -> Location {
        Location::Slot(Rc::new(RefCell::new(obj)))
    }

    pub fn get(&self) -> AmlResult<Object> {
        match self {
            Location::Slot(cell) => Ok(cell.borrow().clone()),
            Location::Package(pkg, idx) => {
                pkg.borrow().get(*idx).cloned().ok_or(AmlError::OutOfBounds)
            }
        }
    }

    pub fn set(&self, value: Object) -> AmlResult<()> {
        match self {
            Location::Slot(cell) => {
                *cell.borrow_mut() = value;
                Ok(())
            }
            Location::Package(pkg, idx) => {
                let mut pkg = pkg.borrow_mut();
                let slot = pkg.get_mut(*idx).ok_or(AmlError::OutOfBounds)?;
                *slot = value;
                Ok(())
            }
        }
    }
}

/// The five reference flavors of spec.md §3. The kind is only a dispatch
/// tag for the store/copy protocol (spec.md §4.6) — all five share the
/// same `Location` plumbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    RefOf,
    Named,
    Arg,
    Local,
    PkgIndex,
}

#[derive(Debug, Clone)]
pub struct Reference {
    pub kind: RefKind,
    pub target: Location,
    /// Only meaningful for `Named`: lets diagnostics print a dotted path
    /// without walking the namespace back up.
    pub node: Option<NodeId>,
}

impl Reference {
    pub fn new(kind: RefKind, target: Location) -> Reference {
        Reference { kind, target, node: None }
    }

    pub fn named(target: Location, node: NodeId) -> Reference {
        Reference { kind: RefKind::Named, target, node: Some(node) }
    }

    /// Follow this reference to the bottom-most non-reference object. This
    /// is the reference-OS `DerefOf` quirk (spec.md §4.5/§9): real ACPI
    /// wording has `DerefOf` peel exactly one layer, but the reference OS
    /// unwinds all the way down, and we match that.
    pub fn unwind(&self) -> AmlResult<Object> {
        let mut current = self.target.get()?;
        loop {
            match current {
                Object::Reference(r) => current = r.target.get()?,
                other => return Ok(other),
            }
        }
    }

    /// Like `unwind`, but returns the bottom-most `Location` itself rather
    /// than its value, so the store protocol (spec.md §4.6) can assign into
    /// it rather than just read it.
    pub fn bottom_location(&self) -> AmlResult<Location> {
        let mut loc = self.target.clone();
        loop {
            match loc.get()? {
                Object::Reference(r) => loc = r.target,
                _ => return Ok(loc),
            }
        }
    }
}

pub type SharedBytes = Rc<RefCell<Vec<u8>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSpace {
    SystemMemory,
    SystemIo,
    PciConfig,
    EmbeddedControl,
    SMBus,
    SystemCmos,
    PciBarTarget,
    Ipmi,
    GeneralPurposeIo,
    GenericSerialBus,
    OemDefined(u8),
}

#[derive(Debug, Clone)]
pub struct OperationRegion {
    pub space: RegionSpace,
    pub offset: u64,
    pub length: u64,
}

#[derive(Debug, Clone)]
pub struct BufferField {
    pub backing: SharedBytes,
    pub bit_index: u64,
    pub bit_length: u64,
    /// Set by `CreateField` (the only constructor that takes an explicit
    /// bit length); forces `Read` to always produce a `Buffer` rather than
    /// an `Integer` even when the field would fit in one.
    pub force_buffer: bool,
}

#[derive(Debug, Clone)]
pub struct BufferIndex {
    pub buffer: SharedBytes,
    pub idx: usize,
}

/// Bytecode + metadata for a control method (spec.md §3). `code` is the
/// whole owning table's bytes so methods can be invoked without copying
/// their body out at load time; `body_begin`/`body_end` bound the method.
#[derive(Debug, Clone)]
pub struct MethodObject {
    pub code: Rc<Vec<u8>>,
    pub body_begin: usize,
    pub body_end: usize,
    pub arg_count: u8,
    pub serialized: bool,
    pub sync_level: u8,
    /// Method flag bit that suppresses destruction of namespace nodes the
    /// method creates (spec.md §3 invariant on temporary nodes).
    pub named_objects_persist: bool,
}

impl MethodObject {
    pub fn body(&self) -> &[u8] {
        &self.code[self.body_begin..self.body_end]
    }
}

#[derive(Debug, Clone)]
pub struct Mutex {
    pub handle: u32,
    pub sync_level: u8,
    pub owner: Rc<RefCell<Option<u32>>>,
}

#[derive(Debug, Clone, Copy)]
pub struct Processor {
    pub id: u8,
    pub block_address: u32,
    pub block_length: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct PowerResource {
    pub system_level: u8,
    pub resource_order: u16,
}

/// Discriminant-only view of `Object`, used by `ObjectType`, typechecks,
/// and error reporting without cloning a whole value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Uninitialized,
    Integer,
    String,
    Buffer,
    Package,
    Reference,
    BufferField,
    BufferIndex,
    OperationRegion,
    Method,
    Mutex,
    Processor,
    PowerResource,
    ThermalZone,
    Device,
    Debug,
}

#[derive(Debug, Clone)]
pub enum Object {
    Uninitialized,
    Integer(u64),
    String(SharedBytes),
    Buffer(SharedBytes),
    Package(Rc<RefCell<Vec<Object>>>),
    Reference(Reference),
    BufferField(BufferField),
    BufferIndex(BufferIndex),
    OperationRegion(OperationRegion),
    Method(Rc<MethodObject>),
    Mutex(Mutex),
    Processor(Processor),
    PowerResource(PowerResource),
    ThermalZone,
    Device,
    /// Write-only sink for `Store(x, Debug)`.
    Debug,
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Uninitialized => ObjectKind::Uninitialized,
            Object::Integer(_) => ObjectKind::Integer,
            Object::String(_) => ObjectKind::String,
            Object::Buffer(_) => ObjectKind::Buffer,
            Object::Package(_) => ObjectKind::Package,
            Object::Reference(_) => ObjectKind::Reference,
            Object::BufferField(_) => ObjectKind::BufferField,
            // BufferIndex self-reports as BufferField to ObjectType
            // (spec.md §4.5) even though it's a distinct internal kind.
            Object::BufferIndex(_) => ObjectKind::BufferField,
            Object::OperationRegion(_) => ObjectKind::OperationRegion,
            Object::Method(_) => ObjectKind::Method,
            Object::Mutex(_) => ObjectKind::Mutex,
            Object::Processor(_) => ObjectKind::Processor,
            Object::PowerResource(_) => ObjectKind::PowerResource,
            Object::ThermalZone => ObjectKind::ThermalZone,
            Object::Device => ObjectKind::Device,
            Object::Debug => ObjectKind::Debug,
        }
    }

    pub fn integer(value: u64) -> Object {
        Object::Integer(value)
    }

    pub fn zero() -> Object {
        Object::Integer(0)
    }

    /// All-ones, sized by the table revision (spec.md §3/§4.3
    /// `LOAD_TRUE_OBJECT`).
    pub fn ones(rev1: bool) -> Object {
        Object::Integer(if rev1 { 0xFFFF_FFFF } else { u64::MAX })
    }

    pub fn new_string(s: &str) -> Object {
        Object::String(Rc::new(RefCell::new(s.as_bytes().to_vec())))
    }

    pub fn new_string_owned(bytes: Vec<u8>) -> Object {
        Object::String(Rc::new(RefCell::new(bytes)))
    }

    pub fn new_buffer(bytes: Vec<u8>) -> Object {
        Object::Buffer(Rc::new(RefCell::new(bytes)))
    }

    pub fn new_package(elements: Vec<Object>) -> Object {
        Object::Package(Rc::new(RefCell::new(elements)))
    }

    pub fn as_integer(&self) -> AmlResult<u64> {
        match self {
            Object::Integer(v) => Ok(*v),
            other => Err(AmlError::TypeMismatch { expected: ObjectKind::Integer, found: other.kind() }),
        }
    }

    pub fn as_string_bytes(&self) -> AmlResult<SharedBytes> {
        match self {
            Object::String(b) => Ok(b.clone()),
            other => Err(AmlError::TypeMismatch { expected: ObjectKind::String, found: other.kind() }),
        }
    }

    pub fn as_buffer_bytes(&self) -> AmlResult<SharedBytes> {
        match self {
            Object::Buffer(b) => Ok(b.clone()),
            other => Err(AmlError::TypeMismatch { expected: ObjectKind::Buffer, found: other.kind() }),
        }
    }

    pub fn as_package(&self) -> AmlResult<Rc<RefCell<Vec<Object>>>> {
        match self {
            Object::Package(p) => Ok(p.clone()),
            other => Err(AmlError::TypeMismatch { expected: ObjectKind::Package, found: other.kind() }),
        }
    }

    pub fn as_string(&self) -> AmlResult<String> {
        let bytes = self.as_string_bytes()?;
        Ok(String::from_utf8_lossy(&bytes.borrow()).into_owned())
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Object::Reference(_))
    }

    /// Structural copy used by `CopyObject` and by the default "overwrite"
    /// arm of `Store` (spec.md §4.6): packages recurse element-by-element
    /// into fresh storage, strings/buffers get a fresh backing `Rc`, and
    /// everything else (including `Reference` itself — copying a reference
    /// duplicates the pointer, not its referent) is a plain value copy.
    pub fn deep_copy(&self) -> AmlResult<Object> {
        Ok(match self {
            Object::String(b) => Object::new_string_owned(b.borrow().clone()),
            Object::Buffer(b) => Object::new_buffer(b.borrow().clone()),
            Object::Package(p) => {
                let mut elements = Vec::with_capacity(p.borrow().len());
                for e in p.borrow().iter() {
                    elements.push(e.deep_copy()?);
                }
                Object::new_package(elements)
            }
            other => other.clone(),
        })
    }

    /// Read raw bytes backing this object's "computational data" view, used
    /// by the implicit-cast rule of spec.md §4.6 (`ToInteger` always reads
    /// up to 8 bytes, `ToBuffer`/`ToString` read the object's own storage).
    /// Little-endian for integers, matching AML's wire format.
    pub fn raw_bytes(&self) -> AmlResult<Vec<u8>> {
        match self {
            Object::Integer(v) => Ok(v.to_le_bytes().to_vec()),
            Object::String(b) => Ok(b.borrow().clone()),
            Object::Buffer(b) => Ok(b.borrow().clone()),
            other => Err(AmlError::TypeMismatch { expected: ObjectKind::Buffer, found: other.kind() }),
        }
    }
}
