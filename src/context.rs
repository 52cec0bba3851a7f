//! The execution driver (spec.md §4, §6): owns the namespace, the kernel
//! `Handler`, and the frame stack, and exposes the two ways AML gets run —
//! loading a table's top-level term list, and invoking a control method.
//! Shaped after the teacher's `AmlContext`, which plays the same role.

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::error::{AmlError, AmlResult};
use crate::exec;
use crate::frame::{CallFrame, Flow};
use crate::handler::Handler;
use crate::namespace::{NodeId, Namespace};
use crate::object::{MethodObject, Object};

pub struct Interpreter {
    pub namespace: Namespace,
    pub handler: alloc::boxed::Box<dyn Handler>,
    pub frames: Vec<CallFrame>,
    /// `DSDT`/`SSDT` revision byte; `1` narrows integers to 32 bits
    /// throughout (spec.md §3 "sizeof_int").
    pub revision: u8,
}

impl Interpreter {
    pub fn new(handler: alloc::boxed::Box<dyn Handler>) -> Interpreter {
        Interpreter { namespace: Namespace::new(), handler, frames: Vec::new(), revision: 2 }
    }

    pub fn is_rev1(&self) -> bool {
        self.revision < 2
    }

    pub fn sizeof_int(&self) -> u8 {
        if self.is_rev1() {
            4
        } else {
            8
        }
    }

    /// Parses and executes a whole table's top-level term list (definition
    /// blocks: `Name`, `Scope`, `Method`, `Device`, operation regions,
    /// mutexes, ...), installing everything it defines into the namespace.
    /// `revision` is the table header's AML revision byte.
    pub fn load_table(&mut self, aml: Vec<u8>, revision: u8) -> AmlResult<()> {
        self.revision = revision;
        let len = aml.len();
        let code = Rc::new(aml);
        let root = self.namespace.root();
        self.frames.push(CallFrame::new_top_level(code, len, root));
        let flow = self.run_current_frame();
        let frame = self.frames.pop().expect("frame pushed above");
        self.free_temporaries(frame);
        match flow? {
            Flow::Normal => Ok(()),
            _ => Err(AmlError::BadBytecode(None)),
        }
    }

    /// Invokes a control method by namespace path, matching the teacher's
    /// `invoke_method` entrypoint shape.
    pub fn invoke_method_by_path(&mut self, path: &str, args: Vec<Object>) -> AmlResult<Object> {
        let node = self.namespace.get_by_path_str(self.namespace.root(), path)?;
        self.invoke_method(node, args)
    }

    pub fn invoke_method(&mut self, node: NodeId, args: Vec<Object>) -> AmlResult<Object> {
        let object = self.namespace.get_object(node)?;
        let method: Rc<MethodObject> = match object {
            Object::Method(m) => m,
            _ => return Err(AmlError::TypeMismatch { expected: crate::object::ObjectKind::Method, found: object.kind() }),
        };

        if args.len() != method.arg_count as usize {
            return Err(AmlError::ArgCountMismatch);
        }

        let scope = self.namespace.parent_of(node).unwrap_or(node);
        self.frames.push(CallFrame::new_method_call(method, args, scope));
        let flow = self.run_current_frame();
        let frame = self.frames.pop().expect("frame pushed above");
        self.free_temporaries(frame);

        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Object::zero()),
            Flow::Break | Flow::Continue => Err(AmlError::NotInLoop),
        }
    }

    fn run_current_frame(&mut self) -> AmlResult<Flow> {
        let end = self.frames.last().expect("frame just pushed").code_end;
        exec::run_term_list(self, end)
    }

    /// Unwinds temporary namespace nodes a method created, in reverse
    /// install order (spec.md §3 invariant), unless the method's
    /// `named_objects_persist` flag is set.
    fn free_temporaries(&mut self, frame: CallFrame) {
        if frame.persist_named_objects {
            return;
        }
        for node in frame.temp_nodes.into_iter().rev() {
            self.namespace.uninstall(node);
        }
    }

    pub fn frame(&self) -> &CallFrame {
        self.frames.last().expect("no active frame")
    }

    pub fn frame_mut(&mut self) -> &mut CallFrame {
        self.frames.last_mut().expect("no active frame")
    }
}
