//! The opcode dispatch loop (spec.md §4.2-§4.5). Rather than a hand-rolled
//! `pc`-driven micro-op table walking an explicit op-context stack, this
//! realizes the same "preempt and recurse for dynamic arguments" shape
//! with ordinary recursive-descent Rust functions: each nested `TermArg`/
//! `SuperName`/`Target` is evaluated by a normal (possibly recursive)
//! function call, and `Flow::Break`/`Continue`/`Return` unwind through the
//! native call stack exactly the way the spec's op-context stack would
//! unwind by hand. See DESIGN.md, "Open Question decisions", for why.

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::bitspan;
use crate::context::Interpreter;
use crate::error::{AmlError, AmlResult};
use crate::frame::Flow;
use crate::name::{parse_name_string, NamePath};
use crate::object::{
    BufferField, Location, MethodObject, Mutex, Object, ObjectKind, PowerResource, Processor,
    RefKind, Reference, RegionSpace,
};
use crate::opcode::*;
use crate::pkglen::parse_pkg_length;
use crate::store;

// --- byte-level readers -----------------------------------------------

fn cur(ctx: &Interpreter) -> AmlResult<u8> {
    let f = ctx.frame();
    f.code.get(f.code_offset).copied().ok_or(AmlError::BadBytecode(None))
}

fn advance(ctx: &mut Interpreter, n: usize) {
    ctx.frame_mut().code_offset += n;
}

fn read_u8(ctx: &mut Interpreter) -> AmlResult<u8> {
    let b = cur(ctx)?;
    advance(ctx, 1);
    Ok(b)
}

fn read_u16(ctx: &mut Interpreter) -> AmlResult<u16> {
    let lo = read_u8(ctx)? as u16;
    let hi = read_u8(ctx)? as u16;
    Ok(lo | (hi << 8))
}

fn read_u32(ctx: &mut Interpreter) -> AmlResult<u32> {
    let lo = read_u16(ctx)? as u32;
    let hi = read_u16(ctx)? as u32;
    Ok(lo | (hi << 16))
}

fn read_u64(ctx: &mut Interpreter) -> AmlResult<u64> {
    let lo = read_u32(ctx)? as u64;
    let hi = read_u32(ctx)? as u64;
    Ok(lo | (hi << 32))
}

fn read_nul_terminated(ctx: &mut Interpreter) -> AmlResult<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let b = read_u8(ctx)?;
        if b == 0 {
            break;
        }
        out.push(b);
    }
    Ok(out)
}

/// Decodes the name string at the current offset without consuming via
/// `read_u8` one byte at a time (name.rs wants a byte slice + a raw
/// offset), then advances `code_offset` past it.
fn read_name_path(ctx: &mut Interpreter) -> AmlResult<NamePath> {
    let code = ctx.frame().code.clone();
    let mut offset = ctx.frame().code_offset;
    let path = parse_name_string(&code, &mut offset)?;
    ctx.frame_mut().code_offset = offset;
    Ok(path)
}

fn read_pkg_length(ctx: &mut Interpreter) -> AmlResult<usize> {
    let (len, consumed) = {
        let f = ctx.frame();
        parse_pkg_length(&f.code, f.code_offset)?
    };
    let begin = ctx.frame().code_offset;
    advance(ctx, consumed);
    Ok(begin + len)
}

// --- name resolution helpers --------------------------------------------

/// `materialize` turns a raw object fetched from a slot/node into the value
/// a `TermArg` consumer should see: buffer fields and buffer indices read
/// their current bit pattern (spec.md §4.7) rather than handing back the
/// accessor object itself.
fn materialize(ctx: &Interpreter, obj: Object) -> AmlResult<Object> {
    match obj {
        Object::BufferField(bf) => store::read_buffer_field(&bf, ctx.is_rev1()),
        Object::BufferIndex(bi) => store::read_buffer_index(&bi),
        other => Ok(other),
    }
}

/// Follows a `Reference`/`BufferIndex` down to its value; anything else
/// passes through unchanged. Used by ops that take a `SuperName` but need
/// the referenced value (`SizeOf`, `ObjectType`, `Increment`/`Decrement`).
fn resolve_value(obj: Object) -> AmlResult<Object> {
    match obj {
        Object::Reference(r) => r.unwind(),
        Object::BufferIndex(bi) => store::read_buffer_index(&bi),
        other => Ok(other),
    }
}

fn invoke_named_method(ctx: &mut Interpreter, method: Rc<MethodObject>, scope: crate::namespace::NodeId) -> AmlResult<Object> {
    let mut args = Vec::with_capacity(method.arg_count as usize);
    for _ in 0..method.arg_count {
        args.push(eval_term_arg(ctx)?);
    }
    ctx.frames.push(crate::frame::CallFrame::new_method_call(method, args, scope));
    let end = ctx.frame().code_end;
    let flow = run_term_list(ctx, end);
    let frame = ctx.frames.pop().expect("frame pushed above");
    if frame.persist_named_objects {
        // nothing to free
    } else {
        for node in frame.temp_nodes.into_iter().rev() {
            ctx.namespace.uninstall(node);
        }
    }
    match flow? {
        Flow::Return(v) => Ok(v),
        Flow::Normal => Ok(Object::zero()),
        Flow::Break | Flow::Continue => Err(AmlError::NotInLoop),
    }
}

/// Resolves a plain `NameString` appearing in `TermArg` position: if it
/// names a method, invokes it (gathering `arg_count` further `TermArg`s as
/// call arguments); otherwise materializes the named object's value.
fn eval_name_as_value(ctx: &mut Interpreter, path: NamePath) -> AmlResult<Object> {
    let scope = ctx.frame().cur_scope;
    let node = ctx.namespace.find(scope, &path)?.ok_or(AmlError::NotFound)?;
    let object = ctx.namespace.get_object(node)?;
    match object {
        // A method's own bare names resolve against its *definition*
        // scope, not the caller's (context.rs's `invoke_method` does the
        // same via `parent_of`), so a call site in a different scope
        // doesn't change what the callee's names mean.
        Object::Method(m) => {
            let method_scope = ctx.namespace.parent_of(node).unwrap_or(node);
            invoke_named_method(ctx, m, method_scope)
        }
        other => materialize(ctx, other),
    }
}

fn named_reference(ctx: &Interpreter, path: &NamePath) -> AmlResult<Object> {
    let scope = ctx.frame().cur_scope;
    let node = ctx.namespace.find(scope, path)?.ok_or(AmlError::NotFound)?;
    let loc = ctx.namespace.object_location(node)?;
    Ok(Object::Reference(Reference::named(loc, node)))
}

fn local_reference(ctx: &Interpreter, n: usize) -> Object {
    Object::Reference(Reference::new(RefKind::Local, Location::Slot(ctx.frame().locals[n].clone())))
}

fn arg_reference(ctx: &Interpreter, n: usize) -> Object {
    Object::Reference(Reference::new(RefKind::Arg, Location::Slot(ctx.frame().args[n].clone())))
}

// --- top level: term lists and statements --------------------------------

pub fn run_term_list(ctx: &mut Interpreter, end: usize) -> AmlResult<Flow> {
    while ctx.frame().code_offset < end {
        match exec_term_obj(ctx)? {
            Flow::Normal => continue,
            other => return Ok(other),
        }
    }
    Ok(Flow::Normal)
}

fn exec_term_obj(ctx: &mut Interpreter) -> AmlResult<Flow> {
    let op = cur(ctx)?;
    match op {
        NAME_OP => {
            advance(ctx, 1);
            exec_name(ctx)?;
            Ok(Flow::Normal)
        }
        SCOPE_OP => {
            advance(ctx, 1);
            exec_scope(ctx)?;
            Ok(Flow::Normal)
        }
        ALIAS_OP => {
            advance(ctx, 1);
            let source_path = read_name_path(ctx)?;
            let alias_path = read_name_path(ctx)?;
            let scope = ctx.frame().cur_scope;
            let source = ctx.namespace.find(scope, &source_path)?.ok_or(AmlError::NotFound)?;
            let alias = ctx.namespace.create(scope, &alias_path)?;
            ctx.namespace.alias(alias, source)?;
            install_node(ctx, alias);
            Ok(Flow::Normal)
        }
        METHOD_OP => {
            advance(ctx, 1);
            exec_method_decl(ctx)?;
            Ok(Flow::Normal)
        }
        EXTERNAL_OP => {
            advance(ctx, 1);
            let _name = read_name_path(ctx)?;
            let _object_type = read_u8(ctx)?;
            let _arg_count = read_u8(ctx)?;
            Ok(Flow::Normal)
        }
        IF_OP => {
            advance(ctx, 1);
            exec_if(ctx)
        }
        WHILE_OP => {
            advance(ctx, 1);
            exec_while(ctx)
        }
        BREAK_OP => {
            advance(ctx, 1);
            Ok(Flow::Break)
        }
        CONTINUE_OP => {
            advance(ctx, 1);
            Ok(Flow::Continue)
        }
        RETURN_OP => {
            advance(ctx, 1);
            let value = eval_term_arg(ctx)?;
            Ok(Flow::Return(value))
        }
        NOOP_OP | BREAKPOINT_OP => {
            advance(ctx, 1);
            Ok(Flow::Normal)
        }
        NOTIFY_OP => {
            advance(ctx, 1);
            let _target = eval_super_name(ctx)?;
            let _value = eval_term_arg(ctx)?;
            Ok(Flow::Normal)
        }
        CREATE_BIT_FIELD_OP | CREATE_BYTE_FIELD_OP | CREATE_WORD_FIELD_OP | CREATE_DWORD_FIELD_OP
        | CREATE_QWORD_FIELD_OP => {
            advance(ctx, 1);
            exec_create_fixed_field(ctx, op)?;
            Ok(Flow::Normal)
        }
        EXT_PREFIX => {
            let ext = ctx.frame().code.get(ctx.frame().code_offset + 1).copied().ok_or(AmlError::BadBytecode(None))?;
            match ext {
                MUTEX_OP => {
                    advance(ctx, 2);
                    exec_mutex(ctx)?;
                    Ok(Flow::Normal)
                }
                EVENT_OP => {
                    advance(ctx, 2);
                    let path = read_name_path(ctx)?;
                    let scope = ctx.frame().cur_scope;
                    let node = ctx.namespace.create(scope, &path)?;
                    ctx.namespace.set_object(node, Object::Uninitialized);
                    install_node(ctx, node);
                    Ok(Flow::Normal)
                }
                CREATE_FIELD_OP => {
                    advance(ctx, 2);
                    exec_create_field(ctx)?;
                    Ok(Flow::Normal)
                }
                OP_REGION_OP => {
                    advance(ctx, 2);
                    exec_op_region(ctx)?;
                    Ok(Flow::Normal)
                }
                DEVICE_OP => {
                    advance(ctx, 2);
                    exec_scope_like(ctx, Object::Device)
                }
                PROCESSOR_OP => {
                    advance(ctx, 2);
                    exec_processor(ctx)
                }
                POWER_RES_OP => {
                    advance(ctx, 2);
                    exec_power_resource(ctx)
                }
                THERMAL_ZONE_OP => {
                    advance(ctx, 2);
                    exec_scope_like(ctx, Object::ThermalZone)
                }
                STALL_OP => {
                    advance(ctx, 2);
                    let us = eval_term_arg(ctx)?.as_integer()?;
                    ctx.handler.stall(us);
                    Ok(Flow::Normal)
                }
                SLEEP_OP => {
                    advance(ctx, 2);
                    let ms = eval_term_arg(ctx)?.as_integer()?;
                    ctx.handler.sleep(ms);
                    Ok(Flow::Normal)
                }
                SIGNAL_OP | RESET_OP | UNLOAD_OP => {
                    advance(ctx, 2);
                    let _obj = eval_super_name(ctx)?;
                    Ok(Flow::Normal)
                }
                RELEASE_OP => {
                    advance(ctx, 2);
                    let target = eval_super_name(ctx)?;
                    release_mutex(target)?;
                    Ok(Flow::Normal)
                }
                FATAL_OP => {
                    advance(ctx, 2);
                    let fatal_type = read_u8(ctx)?;
                    let fatal_code = read_u32(ctx)?;
                    let fatal_arg = eval_term_arg(ctx)?.as_integer()?;
                    ctx.handler.handle_fatal_error(fatal_type, fatal_code, fatal_arg);
                    Err(AmlError::Fatal { fatal_type, fatal_code, fatal_arg })
                }
                LOAD_OP | LOAD_TABLE_OP => Err(AmlError::Unimplemented),
                FIELD_OP | INDEX_FIELD_OP | BANK_FIELD_OP | DATA_REGION_OP => Err(AmlError::Unimplemented),
                _ => eval_as_statement(ctx),
            }
        }
        _ => eval_as_statement(ctx),
    }
}

/// Fallback for every opcode that only ever appears in value-producing
/// position (arithmetic, conversions, bare method invocations, constants):
/// evaluate it as a `TermArg` and discard the result.
fn eval_as_statement(ctx: &mut Interpreter) -> AmlResult<Flow> {
    eval_term_arg(ctx)?;
    Ok(Flow::Normal)
}

fn install_node(ctx: &mut Interpreter, node: crate::namespace::NodeId) {
    let in_method = ctx.frame().method.is_some();
    ctx.namespace.install(node, in_method);
    if in_method {
        ctx.frame_mut().temp_nodes.push(node);
    }
}

fn exec_name(ctx: &mut Interpreter) -> AmlResult<()> {
    let path = read_name_path(ctx)?;
    let scope = ctx.frame().cur_scope;
    let node = ctx.namespace.create(scope, &path)?;
    let value = eval_term_arg(ctx)?;
    ctx.namespace.set_object(node, value);
    install_node(ctx, node);
    Ok(())
}

/// `DefMethod`: `MethodOp PkgLength NameString MethodFlags TermList`
/// (spec.md §4.5 "Create method"). Only records where the body lives;
/// the body itself runs on invocation, via `CallFrame::new_method_call`.
fn exec_method_decl(ctx: &mut Interpreter) -> AmlResult<()> {
    let end = read_pkg_length(ctx)?;
    let path = read_name_path(ctx)?;
    let flags = read_u8(ctx)?;
    let arg_count = flags & 0x07;
    let serialized = flags & 0x08 != 0;
    let sync_level = (flags >> 4) & 0x0F;

    let scope = ctx.frame().cur_scope;
    let node = ctx.namespace.create(scope, &path)?;
    let method = MethodObject {
        code: ctx.frame().code.clone(),
        body_begin: ctx.frame().code_offset,
        body_end: end,
        arg_count,
        serialized,
        sync_level,
        named_objects_persist: false,
    };
    ctx.namespace.set_object(node, Object::Method(Rc::new(method)));
    install_node(ctx, node);
    ctx.frame_mut().code_offset = end;
    Ok(())
}

fn exec_scope(ctx: &mut Interpreter) -> AmlResult<()> {
    let end = read_pkg_length(ctx)?;
    let path = read_name_path(ctx)?;
    let scope = ctx.frame().cur_scope;
    // `Scope` reopens an existing namespace level when one is already
    // there (e.g. `Scope(\_SB)`), but must also be able to establish a
    // level that doesn't exist yet (spec.md §4.5 code-block bullet) —
    // unlike Device/ThermalZone it attaches no object to the node.
    let node = match ctx.namespace.find(scope, &path)? {
        Some(node) => node,
        None => {
            let node = ctx.namespace.create(scope, &path)?;
            install_node(ctx, node);
            node
        }
    };
    let saved_scope = ctx.frame().cur_scope;
    ctx.frame_mut().cur_scope = node;
    let flow = run_term_list(ctx, end);
    ctx.frame_mut().cur_scope = saved_scope;
    ctx.frame_mut().code_offset = end;
    match flow? {
        Flow::Normal => Ok(()),
        _ => Err(AmlError::BadBytecode(None)),
    }
}

/// Shared body for `Device`/`ThermalZone`, which are plain named scopes
/// whose node holds a sentinel object (spec.md §4.5 control flow bullet).
fn exec_scope_like(ctx: &mut Interpreter, sentinel: Object) -> AmlResult<Flow> {
    let end = read_pkg_length(ctx)?;
    let path = read_name_path(ctx)?;
    let scope = ctx.frame().cur_scope;
    let node = ctx.namespace.create(scope, &path)?;
    ctx.namespace.set_object(node, sentinel);
    install_node(ctx, node);

    let saved_scope = ctx.frame().cur_scope;
    ctx.frame_mut().cur_scope = node;
    let flow = run_term_list(ctx, end);
    ctx.frame_mut().cur_scope = saved_scope;
    ctx.frame_mut().code_offset = end;
    flow?;
    Ok(Flow::Normal)
}

fn exec_processor(ctx: &mut Interpreter) -> AmlResult<Flow> {
    let end = read_pkg_length(ctx)?;
    let path = read_name_path(ctx)?;
    let id = read_u8(ctx)?;
    let block_address = read_u32(ctx)?;
    let block_length = read_u8(ctx)?;
    let scope = ctx.frame().cur_scope;
    let node = ctx.namespace.create(scope, &path)?;
    ctx.namespace.set_object(node, Object::Processor(Processor { id, block_address, block_length }));
    install_node(ctx, node);

    let saved_scope = ctx.frame().cur_scope;
    ctx.frame_mut().cur_scope = node;
    let flow = run_term_list(ctx, end);
    ctx.frame_mut().cur_scope = saved_scope;
    ctx.frame_mut().code_offset = end;
    flow?;
    Ok(Flow::Normal)
}

fn exec_power_resource(ctx: &mut Interpreter) -> AmlResult<Flow> {
    let end = read_pkg_length(ctx)?;
    let path = read_name_path(ctx)?;
    let system_level = read_u8(ctx)?;
    let resource_order = read_u16(ctx)?;
    let scope = ctx.frame().cur_scope;
    let node = ctx.namespace.create(scope, &path)?;
    ctx.namespace.set_object(node, Object::PowerResource(PowerResource { system_level, resource_order }));
    install_node(ctx, node);

    let saved_scope = ctx.frame().cur_scope;
    ctx.frame_mut().cur_scope = node;
    let flow = run_term_list(ctx, end);
    ctx.frame_mut().cur_scope = saved_scope;
    ctx.frame_mut().code_offset = end;
    flow?;
    Ok(Flow::Normal)
}

fn exec_if(ctx: &mut Interpreter) -> AmlResult<Flow> {
    let end = read_pkg_length(ctx)?;
    let predicate = eval_term_arg(ctx)?.as_integer()?;

    let flow = if predicate != 0 {
        let r = run_term_list(ctx, end)?;
        // an If taken must still skip a trailing Else without running it
        ctx.frame_mut().code_offset = end;
        if cur(ctx).ok() == Some(ELSE_OP) {
            advance(ctx, 1);
            let else_end = read_pkg_length(ctx)?;
            ctx.frame_mut().code_offset = else_end;
        }
        r
    } else {
        ctx.frame_mut().code_offset = end;
        if cur(ctx).ok() == Some(ELSE_OP) {
            advance(ctx, 1);
            let else_end = read_pkg_length(ctx)?;
            let r = run_term_list(ctx, else_end)?;
            ctx.frame_mut().code_offset = else_end;
            r
        } else {
            Flow::Normal
        }
    };
    Ok(flow)
}

fn exec_while(ctx: &mut Interpreter) -> AmlResult<Flow> {
    let end = read_pkg_length(ctx)?;
    let predicate_start = ctx.frame().code_offset;
    loop {
        ctx.frame_mut().code_offset = predicate_start;
        let predicate = eval_term_arg(ctx)?.as_integer()?;
        if predicate == 0 {
            ctx.frame_mut().code_offset = end;
            return Ok(Flow::Normal);
        }
        match run_term_list(ctx, end)? {
            Flow::Normal | Flow::Continue => continue,
            Flow::Break => {
                ctx.frame_mut().code_offset = end;
                return Ok(Flow::Normal);
            }
            Flow::Return(v) => return Ok(Flow::Return(v)),
        }
    }
}

fn exec_mutex(ctx: &mut Interpreter) -> AmlResult<()> {
    let path = read_name_path(ctx)?;
    let flags = read_u8(ctx)?;
    let scope = ctx.frame().cur_scope;
    let node = ctx.namespace.create(scope, &path)?;
    ctx.namespace.set_object(
        node,
        Object::Mutex(Mutex { handle: node.0 as u32, sync_level: flags & 0x0F, owner: Rc::new(core::cell::RefCell::new(None)) }),
    );
    install_node(ctx, node);
    Ok(())
}

fn release_mutex(target: Object) -> AmlResult<()> {
    let value = resolve_value(target)?;
    if let Object::Mutex(m) = value {
        *m.owner.borrow_mut() = None;
    }
    Ok(())
}

fn region_space_from_byte(b: u8) -> RegionSpace {
    match b {
        0x00 => RegionSpace::SystemMemory,
        0x01 => RegionSpace::SystemIo,
        0x02 => RegionSpace::PciConfig,
        0x03 => RegionSpace::EmbeddedControl,
        0x04 => RegionSpace::SMBus,
        0x05 => RegionSpace::SystemCmos,
        0x06 => RegionSpace::PciBarTarget,
        0x07 => RegionSpace::Ipmi,
        0x08 => RegionSpace::GeneralPurposeIo,
        0x09 => RegionSpace::GenericSerialBus,
        other => RegionSpace::OemDefined(other),
    }
}

fn exec_op_region(ctx: &mut Interpreter) -> AmlResult<()> {
    let path = read_name_path(ctx)?;
    let space_byte = read_u8(ctx)?;
    let offset = eval_term_arg(ctx)?.as_integer()?;
    let length = eval_term_arg(ctx)?.as_integer()?;
    let scope = ctx.frame().cur_scope;
    let node = ctx.namespace.create(scope, &path)?;
    ctx.namespace.set_object(node, Object::OperationRegion(crate::object::OperationRegion { space: region_space_from_byte(space_byte), offset, length }));
    install_node(ctx, node);
    Ok(())
}

/// `CreateBitField`/`CreateByteField`/`CreateWordField`/`CreateDWordField`/
/// `CreateQWordField` (spec.md §4.5 "Create buffer field").
fn exec_create_fixed_field(ctx: &mut Interpreter, op: u8) -> AmlResult<()> {
    let buffer = eval_term_arg(ctx)?.as_buffer_bytes()?;
    let offset = eval_term_arg(ctx)?.as_integer()?;
    let path = read_name_path(ctx)?;

    let (bit_index, bit_length) = match op {
        CREATE_BIT_FIELD_OP => (offset, 1),
        CREATE_BYTE_FIELD_OP => (offset * 8, 8),
        CREATE_WORD_FIELD_OP => (offset * 8, 16),
        CREATE_DWORD_FIELD_OP => (offset * 8, 32),
        CREATE_QWORD_FIELD_OP => (offset * 8, 64),
        _ => unreachable!(),
    };
    if bit_index + bit_length > (buffer.borrow().len() as u64) * 8 {
        return Err(AmlError::OutOfBounds);
    }

    let scope = ctx.frame().cur_scope;
    let node = ctx.namespace.create(scope, &path)?;
    ctx.namespace.set_object(node, Object::BufferField(BufferField { backing: buffer, bit_index, bit_length, force_buffer: false }));
    install_node(ctx, node);
    Ok(())
}

/// `CreateField(buf, bit_index, num_bits, name)` — the only constructor
/// with an explicit bit length, forcing `force_buffer = true` (spec.md
/// §4.5).
fn exec_create_field(ctx: &mut Interpreter) -> AmlResult<()> {
    let buffer = eval_term_arg(ctx)?.as_buffer_bytes()?;
    let bit_index = eval_term_arg(ctx)?.as_integer()?;
    let bit_length = eval_term_arg(ctx)?.as_integer()?;
    let path = read_name_path(ctx)?;

    if bit_length == 0 || bit_length > u32::MAX as u64 {
        return Err(AmlError::InvalidArgument);
    }
    if bit_index + bit_length > (buffer.borrow().len() as u64) * 8 {
        return Err(AmlError::OutOfBounds);
    }

    let scope = ctx.frame().cur_scope;
    let node = ctx.namespace.create(scope, &path)?;
    ctx.namespace.set_object(node, Object::BufferField(BufferField { backing: buffer, bit_index, bit_length, force_buffer: true }));
    install_node(ctx, node);
    Ok(())
}

// --- SuperName / Target --------------------------------------------------

fn eval_super_name(ctx: &mut Interpreter) -> AmlResult<Object> {
    let op = cur(ctx)?;
    match op {
        LOCAL0..=LOCAL7 => {
            advance(ctx, 1);
            Ok(local_reference(ctx, (op - LOCAL0) as usize))
        }
        ARG0..=ARG6 => {
            advance(ctx, 1);
            Ok(arg_reference(ctx, (op - ARG0) as usize))
        }
        REF_OF_OP => {
            advance(ctx, 1);
            eval_ref_of(ctx)
        }
        INDEX_OP => {
            advance(ctx, 1);
            eval_index(ctx)
        }
        EXT_PREFIX if ctx.frame().code.get(ctx.frame().code_offset + 1) == Some(&DEBUG_OP) => {
            advance(ctx, 2);
            Ok(Object::Debug)
        }
        EXT_PREFIX if ctx.frame().code.get(ctx.frame().code_offset + 1) == Some(&COND_REF_OF_OP) => {
            advance(ctx, 2);
            eval_cond_ref_of(ctx)
        }
        _ => {
            let path = read_name_path(ctx)?;
            named_reference(ctx, &path)
        }
    }
}

/// Like `eval_super_name`, but a plain `NameString` that fails to resolve
/// yields `Ok(None)` instead of `NotFound` (used by `CondRefOf`).
fn eval_super_name_or_unresolved(ctx: &mut Interpreter) -> AmlResult<Option<Object>> {
    let op = cur(ctx)?;
    match op {
        LOCAL0..=LOCAL7 | ARG0..=ARG6 | REF_OF_OP | INDEX_OP => eval_super_name(ctx).map(Some),
        EXT_PREFIX if ctx.frame().code.get(ctx.frame().code_offset + 1) == Some(&DEBUG_OP) => {
            eval_super_name(ctx).map(Some)
        }
        _ => {
            let path = read_name_path(ctx)?;
            let scope = ctx.frame().cur_scope;
            match ctx.namespace.find(scope, &path)? {
                Some(node) => {
                    let loc = ctx.namespace.object_location(node)?;
                    Ok(Some(Object::Reference(Reference::named(loc, node))))
                }
                None => Ok(None),
            }
        }
    }
}

fn eval_target(ctx: &mut Interpreter) -> AmlResult<Option<Object>> {
    if cur(ctx)? == NULL_NAME {
        advance(ctx, 1);
        return Ok(None);
    }
    Ok(Some(eval_super_name(ctx)?))
}

fn store_to_target(ctx: &mut Interpreter, target: Option<Object>, value: Object) -> AmlResult<()> {
    store::store(target, value, ctx.sizeof_int())
}

// --- reference-type expressions ------------------------------------------

fn eval_ref_of(ctx: &mut Interpreter) -> AmlResult<Object> {
    let named = eval_super_name(ctx)?;
    match named {
        Object::Reference(r) => Ok(Object::Reference(Reference { kind: RefKind::RefOf, target: r.target, node: r.node })),
        Object::Debug => Ok(Object::Reference(Reference::new(RefKind::RefOf, Location::new_slot(Object::Debug)))),
        other => Err(AmlError::TypeMismatch { expected: ObjectKind::Reference, found: other.kind() }),
    }
}

fn eval_cond_ref_of(ctx: &mut Interpreter) -> AmlResult<Object> {
    let source = eval_super_name_or_unresolved(ctx)?;
    let target = eval_target(ctx)?;
    match source {
        Some(Object::Reference(r)) => {
            let refof = Object::Reference(Reference { kind: RefKind::RefOf, target: r.target, node: r.node });
            store_to_target(ctx, target, refof)?;
            Ok(Object::Integer(1))
        }
        Some(_) | None => Ok(Object::Integer(0)),
    }
}

fn eval_index(ctx: &mut Interpreter) -> AmlResult<Object> {
    let source = eval_term_arg(ctx)?;
    let idx = eval_term_arg(ctx)?.as_integer()? as usize;
    let target = eval_target(ctx)?;

    let result = match source {
        Object::Buffer(b) | Object::String(b) => {
            if idx >= b.borrow().len() {
                return Err(AmlError::OutOfBounds);
            }
            Object::BufferIndex(crate::object::BufferIndex { buffer: b, idx })
        }
        Object::Package(p) => {
            if idx >= p.borrow().len() {
                return Err(AmlError::OutOfBounds);
            }
            Object::Reference(Reference::new(RefKind::PkgIndex, Location::Package(p, idx)))
        }
        other => return Err(AmlError::TypeMismatch { expected: ObjectKind::Buffer, found: other.kind() }),
    };

    store_to_target(ctx, target, result.clone())?;
    Ok(result)
}

fn eval_deref_of(ctx: &mut Interpreter) -> AmlResult<Object> {
    let operand = eval_term_arg(ctx)?;
    match operand {
        Object::Reference(r) => r.unwind(),
        Object::BufferIndex(bi) => store::read_buffer_index(&bi),
        other => Err(AmlError::TypeMismatch { expected: ObjectKind::Reference, found: other.kind() }),
    }
}

// --- TermArg ---------------------------------------------------------------

fn eval_term_arg(ctx: &mut Interpreter) -> AmlResult<Object> {
    let op = cur(ctx)?;
    let value = match op {
        ZERO_OP => {
            advance(ctx, 1);
            Object::Integer(0)
        }
        ONE_OP => {
            advance(ctx, 1);
            Object::Integer(1)
        }
        ONES_OP => {
            advance(ctx, 1);
            Object::ones(ctx.is_rev1())
        }
        BYTE_PREFIX => {
            advance(ctx, 1);
            Object::Integer(read_u8(ctx)? as u64)
        }
        WORD_PREFIX => {
            advance(ctx, 1);
            Object::Integer(read_u16(ctx)? as u64)
        }
        DWORD_PREFIX => {
            advance(ctx, 1);
            Object::Integer(read_u32(ctx)? as u64)
        }
        QWORD_PREFIX => {
            advance(ctx, 1);
            Object::Integer(read_u64(ctx)?)
        }
        STRING_PREFIX => {
            advance(ctx, 1);
            Object::new_string_owned(read_nul_terminated(ctx)?)
        }
        BUFFER_OP => {
            advance(ctx, 1);
            eval_buffer(ctx)?
        }
        PACKAGE_OP => {
            advance(ctx, 1);
            eval_package(ctx, false)?
        }
        VAR_PACKAGE_OP => {
            advance(ctx, 1);
            eval_package(ctx, true)?
        }
        LOCAL0..=LOCAL7 => {
            advance(ctx, 1);
            materialize(ctx, ctx.frame().locals[(op - LOCAL0) as usize].borrow().clone())?
        }
        ARG0..=ARG6 => {
            advance(ctx, 1);
            materialize(ctx, ctx.frame().args[(op - ARG0) as usize].borrow().clone())?
        }
        STORE_OP => {
            advance(ctx, 1);
            let source = eval_term_arg(ctx)?;
            let target = eval_target(ctx)?;
            store_to_target(ctx, target, source.clone())?;
            source
        }
        REF_OF_OP => {
            advance(ctx, 1);
            eval_ref_of(ctx)?
        }
        ADD_OP | SUBTRACT_OP | MULTIPLY_OP | SHIFT_LEFT_OP | SHIFT_RIGHT_OP | AND_OP | NAND_OP | OR_OP
        | NOR_OP | XOR_OP | MOD_OP => {
            advance(ctx, 1);
            eval_binary_arith(ctx, op)?
        }
        DIVIDE_OP => {
            advance(ctx, 1);
            eval_divide(ctx)?
        }
        INCREMENT_OP | DECREMENT_OP => {
            advance(ctx, 1);
            eval_incr_decr(ctx, op == INCREMENT_OP)?
        }
        NOT_OP => {
            advance(ctx, 1);
            eval_unary_arith(ctx, |a, mask| (!a) & mask)?
        }
        FIND_SET_LEFT_BIT_OP => {
            advance(ctx, 1);
            eval_unary_arith(ctx, |a, _| if a == 0 { 0 } else { 64 - a.leading_zeros() as u64 })?
        }
        FIND_SET_RIGHT_BIT_OP => {
            advance(ctx, 1);
            eval_unary_arith(ctx, |a, _| if a == 0 { 0 } else { a.trailing_zeros() as u64 + 1 })?
        }
        DEREF_OF_OP => {
            advance(ctx, 1);
            eval_deref_of(ctx)?
        }
        CONCAT_OP | CONCAT_RES_OP => {
            advance(ctx, 1);
            eval_concat(ctx)?
        }
        SIZE_OF_OP => {
            advance(ctx, 1);
            let operand = resolve_value(eval_super_name(ctx)?)?;
            eval_sizeof(&operand)?
        }
        INDEX_OP => {
            advance(ctx, 1);
            eval_index(ctx)?
        }
        MATCH_OP => {
            advance(ctx, 1);
            eval_match(ctx)?
        }
        OBJECT_TYPE_OP => {
            advance(ctx, 1);
            let operand = resolve_value(eval_super_name(ctx)?)?;
            Object::Integer(object_type_number(operand.kind()))
        }
        LAND_OP => {
            advance(ctx, 1);
            eval_logic_and_or(ctx, true)?
        }
        LOR_OP => {
            advance(ctx, 1);
            eval_logic_and_or(ctx, false)?
        }
        LNOT_OP => {
            advance(ctx, 1);
            eval_lnot(ctx)?
        }
        LEQUAL_OP => {
            advance(ctx, 1);
            eval_compare(ctx, core::cmp::Ordering::Equal, true)?
        }
        LGREATER_OP => {
            advance(ctx, 1);
            eval_compare(ctx, core::cmp::Ordering::Greater, false)?
        }
        LLESS_OP => {
            advance(ctx, 1);
            eval_compare(ctx, core::cmp::Ordering::Less, false)?
        }
        TO_BUFFER_OP => {
            advance(ctx, 1);
            eval_to_buffer(ctx)?
        }
        TO_DECIMAL_STRING_OP => {
            advance(ctx, 1);
            eval_to_decimal_string(ctx)?
        }
        TO_HEX_STRING_OP => {
            advance(ctx, 1);
            eval_to_hex_string(ctx)?
        }
        TO_INTEGER_OP => {
            advance(ctx, 1);
            eval_to_integer(ctx)?
        }
        TO_STRING_OP => {
            advance(ctx, 1);
            eval_to_string(ctx)?
        }
        COPY_OBJECT_OP => {
            advance(ctx, 1);
            eval_copy_object(ctx)?
        }
        MID_OP => {
            advance(ctx, 1);
            eval_mid(ctx)?
        }
        EXT_PREFIX => {
            let ext = ctx.frame().code.get(ctx.frame().code_offset + 1).copied().ok_or(AmlError::BadBytecode(None))?;
            advance(ctx, 2);
            match ext {
                COND_REF_OF_OP => eval_cond_ref_of(ctx)?,
                ACQUIRE_OP => {
                    let target = eval_super_name(ctx)?;
                    let _timeout = read_u16(ctx)?;
                    acquire_mutex(target)?
                }
                WAIT_OP => {
                    let _event = eval_super_name(ctx)?;
                    let _timeout = eval_term_arg(ctx)?;
                    Object::Integer(0)
                }
                FROM_BCD_OP => {
                    let v = eval_term_arg(ctx)?.as_integer()?;
                    let target = eval_target(ctx)?;
                    let result = Object::Integer(from_bcd(v));
                    store_to_target(ctx, target, result.clone())?;
                    result
                }
                TO_BCD_OP => {
                    let v = eval_term_arg(ctx)?.as_integer()?;
                    let target = eval_target(ctx)?;
                    let result = Object::Integer(to_bcd(v));
                    store_to_target(ctx, target, result.clone())?;
                    result
                }
                REVISION_OP => Object::Integer(2),
                DEBUG_OP => Object::Debug,
                TIMER_OP => Object::Integer(ctx.handler.get_ticks()),
                _ => return Err(AmlError::BadBytecode(Some(ext))),
            }
        }
        _ => eval_name_as_value(ctx, read_name_path(ctx)?)?,
    };
    Ok(value)
}

fn acquire_mutex(target: Object) -> AmlResult<Object> {
    let value = resolve_value(target)?;
    if let Object::Mutex(m) = value {
        *m.owner.borrow_mut() = Some(m.handle);
    }
    // single-threaded: acquisition never actually contends
    Ok(Object::Integer(0))
}

fn from_bcd(v: u64) -> u64 {
    let mut result = 0u64;
    let mut shift = 0;
    let mut rem = v;
    while rem != 0 {
        result |= (rem & 0xF) << shift;
        rem >>= 4;
        shift += 4;
    }
    result
}

fn to_bcd(mut v: u64) -> u64 {
    let mut result = 0u64;
    let mut shift = 0;
    while v != 0 {
        result |= (v % 10) << shift;
        v /= 10;
        shift += 4;
    }
    result
}

// --- composite construction ------------------------------------------------

fn eval_buffer(ctx: &mut Interpreter) -> AmlResult<Object> {
    let end = read_pkg_length(ctx)?;
    let declared_size = eval_term_arg(ctx)?.as_integer()? as usize;
    if declared_size > 0x6000_0000 || declared_size == 0 {
        return Err(AmlError::BadBytecode(None));
    }
    let init: Vec<u8> = ctx.frame().code[ctx.frame().code_offset..end].to_vec();
    ctx.frame_mut().code_offset = end;

    let mut bytes = alloc::vec![0u8; declared_size];
    let n = init.len().min(declared_size);
    bytes[..n].copy_from_slice(&init[..n]);
    Ok(Object::new_buffer(bytes))
}

fn eval_package(ctx: &mut Interpreter, variable_count: bool) -> AmlResult<Object> {
    let end = read_pkg_length(ctx)?;
    let num_elements = if variable_count { eval_term_arg(ctx)?.as_integer()? as usize } else { read_u8(ctx)? as usize };

    let mut elements = alloc::vec![Object::Uninitialized; num_elements];
    let mut i = 0;
    while ctx.frame().code_offset < end {
        let element = eval_package_element(ctx)?;
        if i < num_elements {
            elements[i] = element;
        } else {
            log::warn!("package initializer {} exceeds declared length {}, truncating", i, num_elements);
        }
        i += 1;
    }
    ctx.frame_mut().code_offset = end;
    Ok(Object::new_package(elements))
}

/// One `PackageElement`: either a nested `DataRefObject`/expression, or a
/// bare `NameString`, which is lazily bound to a path string rather than
/// resolved immediately (spec.md §4.5 "Package build").
fn eval_package_element(ctx: &mut Interpreter) -> AmlResult<Object> {
    let op = cur(ctx)?;
    let is_bare_name = !matches!(
        op,
        ZERO_OP | ONE_OP | ONES_OP | BYTE_PREFIX | WORD_PREFIX | DWORD_PREFIX | QWORD_PREFIX | STRING_PREFIX
            | BUFFER_OP | PACKAGE_OP | VAR_PACKAGE_OP
    );
    if is_bare_name && op != EXT_PREFIX {
        let path = read_name_path(ctx)?;
        return Ok(Object::new_string_owned(path.to_path_string().into_bytes()));
    }
    eval_term_arg(ctx)?.deep_copy()
}

// --- arithmetic -------------------------------------------------------------

fn int_mask(ctx: &Interpreter) -> u64 {
    if ctx.is_rev1() {
        0xFFFF_FFFF
    } else {
        u64::MAX
    }
}

fn eval_binary_arith(ctx: &mut Interpreter, op: u8) -> AmlResult<Object> {
    let a = eval_term_arg(ctx)?.as_integer()?;
    let b = eval_term_arg(ctx)?.as_integer()?;
    let target = eval_target(ctx)?;
    let mask = int_mask(ctx);

    let result = match op {
        ADD_OP => a.wrapping_add(b),
        SUBTRACT_OP => a.wrapping_sub(b),
        MULTIPLY_OP => a.wrapping_mul(b),
        SHIFT_LEFT_OP => if b >= 64 { 0 } else { a << b },
        SHIFT_RIGHT_OP => if b >= 64 { 0 } else { a >> b },
        AND_OP => a & b,
        NAND_OP => !(a & b),
        OR_OP => a | b,
        NOR_OP => !(a | b),
        XOR_OP => a ^ b,
        MOD_OP => if b == 0 { 0 } else { a % b },
        _ => unreachable!(),
    } & mask;

    let result = Object::Integer(result);
    store_to_target(ctx, target, result.clone())?;
    Ok(result)
}

fn eval_divide(ctx: &mut Interpreter) -> AmlResult<Object> {
    let a = eval_term_arg(ctx)?.as_integer()?;
    let b = eval_term_arg(ctx)?.as_integer()?;
    let remainder_target = eval_target(ctx)?;
    let quotient_target = eval_target(ctx)?;

    let (quotient, remainder) = if b == 0 {
        log::warn!("AML divide by zero");
        (0, 0)
    } else {
        (a / b, a % b)
    };

    store_to_target(ctx, remainder_target, Object::Integer(remainder))?;
    let quotient = Object::Integer(quotient);
    store_to_target(ctx, quotient_target, quotient.clone())?;
    Ok(quotient)
}

fn eval_unary_arith(ctx: &mut Interpreter, f: impl Fn(u64, u64) -> u64) -> AmlResult<Object> {
    let a = eval_term_arg(ctx)?.as_integer()?;
    let target = eval_target(ctx)?;
    let mask = int_mask(ctx);
    let result = Object::Integer(f(a, mask) & mask);
    store_to_target(ctx, target, result.clone())?;
    Ok(result)
}

fn eval_incr_decr(ctx: &mut Interpreter, increment: bool) -> AmlResult<Object> {
    let target = eval_super_name(ctx)?;
    let loc = match &target {
        Object::Reference(r) => r.bottom_location()?,
        _ => return Err(AmlError::TypeMismatch { expected: ObjectKind::Reference, found: target.kind() }),
    };
    let current = loc.get()?.as_integer()?;
    let mask = int_mask(ctx);
    let updated = if increment { current.wrapping_add(1) } else { current.wrapping_sub(1) } & mask;
    loc.set(Object::Integer(updated))?;
    Ok(Object::Integer(updated))
}

// --- logic -------------------------------------------------------------

/// `Land`/`Lor` coerce their operands via the first 4 bytes of the
/// operand's raw representation regardless of revision — a reference-OS
/// quirk (spec.md §9), not the printed ACPI rule.
fn coerce_logic_operand(obj: &Object) -> AmlResult<u64> {
    let mut bytes = obj.raw_bytes()?;
    bytes.resize(4, 0);
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    Ok(u32::from_le_bytes(buf) as u64)
}

fn eval_logic_and_or(ctx: &mut Interpreter, is_and: bool) -> AmlResult<Object> {
    let a = eval_term_arg(ctx)?;
    let b = eval_term_arg(ctx)?;
    let a = coerce_logic_operand(&a)?;
    let b = coerce_logic_operand(&b)?;
    let result = if is_and { a != 0 && b != 0 } else { a != 0 || b != 0 };
    Ok(bool_object(ctx, result))
}

fn bool_object(ctx: &Interpreter, value: bool) -> Object {
    if value {
        Object::ones(ctx.is_rev1())
    } else {
        Object::Integer(0)
    }
}

fn eval_lnot(ctx: &mut Interpreter) -> AmlResult<Object> {
    // LNotEqual/LLessEqual/LGreaterEqual are encoded as LNot immediately
    // followed by LEqual/LGreater/LLess.
    if let Ok(next) = cur(ctx) {
        match next {
            LEQUAL_OP => {
                advance(ctx, 1);
                let result = eval_compare(ctx, core::cmp::Ordering::Equal, true)?;
                return Ok(bool_object(ctx, result.as_integer()? == 0));
            }
            LGREATER_OP => {
                advance(ctx, 1);
                let result = eval_compare(ctx, core::cmp::Ordering::Greater, false)?;
                return Ok(bool_object(ctx, result.as_integer()? == 0));
            }
            LLESS_OP => {
                advance(ctx, 1);
                let result = eval_compare(ctx, core::cmp::Ordering::Less, false)?;
                return Ok(bool_object(ctx, result.as_integer()? == 0));
            }
            _ => {}
        }
    }
    let a = eval_term_arg(ctx)?.as_integer()?;
    Ok(bool_object(ctx, a == 0))
}

fn compare_objects(a: &Object, b: &Object) -> AmlResult<core::cmp::Ordering> {
    match (a, b) {
        (Object::Integer(x), Object::Integer(y)) => Ok(x.cmp(y)),
        (Object::String(x), Object::String(y)) | (Object::Buffer(x), Object::Buffer(y)) => {
            let xb = x.borrow();
            let yb = y.borrow();
            Ok(xb.as_slice().cmp(yb.as_slice()).then(xb.len().cmp(&yb.len())))
        }
        (a, b) => Err(AmlError::TypeMismatch { expected: a.kind(), found: b.kind() }),
    }
}

fn eval_compare(ctx: &mut Interpreter, wanted: core::cmp::Ordering, equal_ok: bool) -> AmlResult<Object> {
    let a = eval_term_arg(ctx)?;
    let b = eval_term_arg(ctx)?;
    let ordering = compare_objects(&a, &b)?;
    let matches = ordering == wanted || (equal_ok && ordering == core::cmp::Ordering::Equal);
    Ok(bool_object(ctx, matches))
}

// --- sizeof / objecttype ---------------------------------------------------

fn eval_sizeof(operand: &Object) -> AmlResult<Object> {
    let size = match operand {
        Object::String(b) => b.borrow().len(),
        Object::Buffer(b) => b.borrow().len(),
        Object::Package(p) => p.borrow().len(),
        other => return Err(AmlError::TypeMismatch { expected: ObjectKind::Buffer, found: other.kind() }),
    };
    Ok(Object::Integer(size as u64))
}

fn object_type_number(kind: ObjectKind) -> u64 {
    match kind {
        ObjectKind::Uninitialized => 0,
        ObjectKind::Integer => 1,
        ObjectKind::String => 2,
        ObjectKind::Buffer => 3,
        ObjectKind::Package => 4,
        ObjectKind::Device => 6,
        ObjectKind::Method => 8,
        ObjectKind::Mutex => 9,
        ObjectKind::OperationRegion => 10,
        ObjectKind::PowerResource => 11,
        ObjectKind::Processor => 12,
        ObjectKind::ThermalZone => 13,
        ObjectKind::BufferField => 14,
        ObjectKind::Debug => 16,
        ObjectKind::Reference | ObjectKind::BufferIndex => 14,
    }
}

// --- conversions -------------------------------------------------------

fn eval_to_buffer(ctx: &mut Interpreter) -> AmlResult<Object> {
    let source = eval_term_arg(ctx)?;
    let target = eval_target(ctx)?;
    let bytes = source.raw_bytes()?;
    let result = Object::new_buffer(bytes);
    store_to_target(ctx, target, result.clone())?;
    Ok(result)
}

fn eval_to_integer(ctx: &mut Interpreter) -> AmlResult<Object> {
    let source = eval_term_arg(ctx)?;
    let target = eval_target(ctx)?;
    // always reads the first 8 bytes, even at revision 1 (reference-OS
    // quirk, spec.md §9).
    let mut bytes = source.raw_bytes()?;
    bytes.resize(8, 0);
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    let result = Object::Integer(u64::from_le_bytes(buf));
    store_to_target(ctx, target, result.clone())?;
    Ok(result)
}

fn eval_to_string(ctx: &mut Interpreter) -> AmlResult<Object> {
    let source = eval_term_arg(ctx)?;
    let target = eval_target(ctx)?;
    let bytes = match &source {
        Object::Buffer(b) => {
            let b = b.borrow();
            let nul = b.iter().position(|&c| c == 0).unwrap_or(b.len());
            b[..nul].to_vec()
        }
        other => other.raw_bytes()?,
    };
    let result = Object::new_string_owned(bytes);
    store_to_target(ctx, target, result.clone())?;
    Ok(result)
}

fn eval_to_hex_string(ctx: &mut Interpreter) -> AmlResult<Object> {
    let source = eval_term_arg(ctx)?;
    let target = eval_target(ctx)?;
    let text = match &source {
        Object::Integer(v) => alloc::format!("{:#X}", v),
        Object::Buffer(b) => b.borrow().iter().map(|byte| alloc::format!("{:#04X}", byte)).collect::<Vec<_>>().join(","),
        Object::String(_) => source.as_string()?,
        other => return Err(AmlError::TypeMismatch { expected: ObjectKind::Integer, found: other.kind() }),
    };
    let result = Object::new_string(&text);
    store_to_target(ctx, target, result.clone())?;
    Ok(result)
}

fn eval_to_decimal_string(ctx: &mut Interpreter) -> AmlResult<Object> {
    let source = eval_term_arg(ctx)?;
    let target = eval_target(ctx)?;
    let text = match &source {
        Object::Integer(v) => alloc::format!("{}", v),
        Object::Buffer(b) => b.borrow().iter().map(|byte| alloc::format!("{}", byte)).collect::<Vec<_>>().join(","),
        Object::String(_) => source.as_string()?,
        other => return Err(AmlError::TypeMismatch { expected: ObjectKind::Integer, found: other.kind() }),
    };
    let result = Object::new_string(&text);
    store_to_target(ctx, target, result.clone())?;
    Ok(result)
}

fn eval_concat(ctx: &mut Interpreter) -> AmlResult<Object> {
    let a = eval_term_arg(ctx)?;
    let b = eval_term_arg(ctx)?;
    let target = eval_target(ctx)?;
    let sizeof_int = ctx.sizeof_int() as usize;

    let result = match (&a, &b) {
        (Object::Integer(_), _) => {
            let mut out = a.raw_bytes()?;
            out.resize(sizeof_int, 0);
            let mut rest = b.raw_bytes()?;
            rest.resize(sizeof_int, 0);
            out.extend(rest);
            Object::new_buffer(out)
        }
        (Object::Buffer(_), _) => {
            let mut out = a.raw_bytes()?;
            out.extend(b.raw_bytes()?);
            Object::new_buffer(out)
        }
        (Object::String(_), Object::Integer(_)) => {
            let mut s = a.as_string()?;
            s.push_str(&alloc::format!("{:#X}", b.as_integer()?));
            Object::new_string(&s)
        }
        (Object::String(_), Object::String(_)) => {
            let mut s = a.as_string()?;
            s.push_str(&b.as_string()?);
            Object::new_string(&s)
        }
        _ => return Err(AmlError::TypeMismatch { expected: ObjectKind::Buffer, found: b.kind() }),
    };
    store_to_target(ctx, target, result.clone())?;
    Ok(result)
}

fn eval_mid(ctx: &mut Interpreter) -> AmlResult<Object> {
    let source = eval_term_arg(ctx)?;
    let index = eval_term_arg(ctx)?.as_integer()? as usize;
    let length = eval_term_arg(ctx)?.as_integer()? as usize;
    let target = eval_target(ctx)?;

    let result = match &source {
        Object::String(b) => {
            let b = b.borrow();
            let start = index.min(b.len());
            let end = (start + length).min(b.len());
            Object::new_string_owned(b[start..end].to_vec())
        }
        Object::Buffer(b) => {
            let b = b.borrow();
            let start = index.min(b.len());
            let end = (start + length).min(b.len());
            Object::new_buffer(b[start..end].to_vec())
        }
        other => return Err(AmlError::TypeMismatch { expected: ObjectKind::Buffer, found: other.kind() }),
    };
    store_to_target(ctx, target, result.clone())?;
    Ok(result)
}

fn eval_copy_object(ctx: &mut Interpreter) -> AmlResult<Object> {
    let source = eval_term_arg(ctx)?;
    let target = eval_super_name(ctx)?;
    let copy = source.deep_copy()?;
    store::copy_object(target, copy.clone())?;
    Ok(copy)
}

/// Standard ACPI `Match` operators: `MTR`(0)/`MEQ`(1)/`MLE`(2)/`MLT`(3)/
/// `MGE`(4)/`MGT`(5). Returns the index of the first package element
/// satisfying both conditions, or `Ones` if none do.
fn eval_match(ctx: &mut Interpreter) -> AmlResult<Object> {
    let package = eval_term_arg(ctx)?.as_package()?;
    let op1 = read_u8(ctx)?;
    let v1 = eval_term_arg(ctx)?.as_integer()?;
    let op2 = read_u8(ctx)?;
    let v2 = eval_term_arg(ctx)?.as_integer()?;
    let start = eval_term_arg(ctx)?.as_integer()? as usize;

    let matches_one = |value: u64, op: u8, against: u64| -> bool {
        match op {
            0 => true,
            1 => value == against,
            2 => value <= against,
            3 => value < against,
            4 => value >= against,
            5 => value > against,
            _ => false,
        }
    };

    let elements = package.borrow();
    for (i, element) in elements.iter().enumerate().skip(start) {
        if let Ok(value) = element.as_integer() {
            if matches_one(value, op1, v1) && matches_one(value, op2, v2) {
                return Ok(Object::Integer(i as u64));
            }
        }
    }
    Ok(Object::ones(ctx.is_rev1()))
}
