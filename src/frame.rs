//! The call-frame model (spec.md §3 "Call frame"). Each invocation of a
//! control method, and the top-level execution of a table's root term
//! list, pushes one `CallFrame`; the interpreter's `frames: Vec<CallFrame>`
//! is the op-context stack of spec.md §4.3. Nested `If`/`Else`/`While`/
//! scope bodies are realized as ordinary recursive calls into
//! `exec::run_term_list` rather than an explicit `code_blocks` stack —
//! `Flow::Break`/`Continue`/`Return` unwind through the native Rust call
//! stack instead of a hand-rolled `pc`-driven micro-op table (see
//! DESIGN.md, "Open Question decisions").

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::namespace::NodeId;
use crate::object::{MethodObject, Object};

fn fresh_slots<const N: usize>() -> [Rc<RefCell<Object>>; N] {
    core::array::from_fn(|_| Rc::new(RefCell::new(Object::Uninitialized)))
}

/// What a `run_term_list` call unwound with, propagated up through nested
/// `If`/`While`/`Scope` blocks by the caller (spec.md §4.5 control-flow
/// opcodes).
#[derive(Debug, Clone)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Object),
}

pub struct CallFrame {
    /// `None` for the frame created to execute a table's top-level term
    /// list, which has no enclosing method.
    pub method: Option<Rc<MethodObject>>,
    pub code: Rc<Vec<u8>>,
    pub code_offset: usize,
    pub code_end: usize,

    /// Each slot is its own `RefCell` so `RefOf(Local0)`/`RefOf(Arg0)` can
    /// hand out a `Location` that aliases the slot directly.
    pub args: [Rc<RefCell<Object>>; 7],
    pub locals: [Rc<RefCell<Object>>; 8],

    /// Namespace nodes this frame installed, in install order; unwound in
    /// reverse on frame exit when the owning method's
    /// `named_objects_persist` is `false` (spec.md §3 invariant).
    pub temp_nodes: Vec<NodeId>,
    pub cur_scope: NodeId,
    pub persist_named_objects: bool,
}

impl CallFrame {
    pub fn new_top_level(code: Rc<Vec<u8>>, code_end: usize, scope: NodeId) -> CallFrame {
        CallFrame {
            method: None,
            code,
            code_offset: 0,
            code_end,
            args: fresh_slots(),
            locals: fresh_slots(),
            temp_nodes: Vec::new(),
            cur_scope: scope,
            persist_named_objects: true,
        }
    }

    pub fn new_method_call(method: Rc<MethodObject>, args: Vec<Object>, scope: NodeId) -> CallFrame {
        let arg_slots: [Rc<RefCell<Object>>; 7] = fresh_slots();
        for (slot, arg) in arg_slots.iter().zip(args) {
            *slot.borrow_mut() = arg;
        }
        let persist = method.named_objects_persist;
        let code = method.code.clone();
        let body_begin = method.body_begin;
        let body_end = method.body_end;
        CallFrame {
            method: Some(method),
            code,
            code_offset: body_begin,
            code_end: body_end,
            args: arg_slots,
            locals: fresh_slots(),
            temp_nodes: Vec::new(),
            cur_scope: scope,
            persist_named_objects: persist,
        }
    }

    pub fn at_end(&self) -> bool {
        self.code_offset >= self.code_end
    }
}
