//! The hierarchical namespace (spec.md §3 "Namespace node", §4.1, §6). This
//! is the "external" namespace service of spec.md §1/§6, implemented here
//! as a plain arena tree since no such crate exists in the corpus to
//! depend on; the API shape (`find`, `alloc` + `install`, `uninstall`,
//! `free`, predefined roots) follows the teacher's `Namespace`/`AmlName`
//! vocabulary and `add_predefined_objects` bootstrap.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::error::{AmlError, AmlResult};
use crate::name::{NamePath, NameSeg};
use crate::object::{Location, Object};

/// Arena index into `Namespace::nodes`. `0` is always the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

pub const ROOT: NodeId = NodeId(0);

struct NodeData {
    seg: NameSeg,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    object: Option<Rc<RefCell<Object>>>,
    /// Nodes created by a method whose `named_objects_persist == false`
    /// are freed on frame exit (spec.md §3 invariant).
    temporary: bool,
}

pub struct Namespace {
    nodes: Vec<Option<NodeData>>,
}

impl Namespace {
    pub fn new() -> Namespace {
        let root = NodeData {
            seg: NameSeg(*b"\\\\\\\\"),
            parent: None,
            children: Vec::new(),
            object: None,
            temporary: false,
        };
        let mut ns = Namespace { nodes: alloc::vec![Some(root)] };
        ns.add_predefined_objects();
        ns
    }

    /// Bootstraps the fixed predefined scopes/values every AML namespace
    /// must have before any table is loaded, matching the teacher's
    /// `add_predefined_objects` (same five scopes, same `_OS`/`_OSI`/`_REV`
    /// answers — see SPEC_FULL.md §D).
    fn add_predefined_objects(&mut self) {
        for name in ["_GPE", "_SB_", "_SI_", "_PR_", "_TZ_", "_OSI"] {
            let seg = NameSeg::from_bytes(name.as_bytes().try_into().unwrap()).unwrap();
            self.install_new_scope(ROOT, seg);
        }
        self.bind_root_value("_OS_", Object::new_string("Microsoft Windows NT"));
        self.bind_root_value("_REV", Object::Integer(2));

        // The ACPI global lock, modeled as an ordinary mutex (spec.md §6
        // lists `\_GL` among the fixed predefined roots).
        let gl = self.install_new_scope(ROOT, NameSeg::from_bytes(b"_GL_").unwrap());
        self.set_object(
            gl,
            Object::Mutex(crate::object::Mutex { handle: gl.0 as u32, sync_level: 0, owner: Rc::new(RefCell::new(None)) }),
        );
    }

    fn bind_root_value(&mut self, name: &str, value: Object) {
        let seg = NameSeg::from_bytes(name.as_bytes().try_into().unwrap()).unwrap();
        let id = self.install_new_scope(ROOT, seg);
        self.set_object(id, value);
    }

    fn install_new_scope(&mut self, parent: NodeId, seg: NameSeg) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(NodeData { seg, parent: Some(parent), children: Vec::new(), object: None, temporary: false }));
        self.node_mut(parent).children.push(id);
        id
    }

    fn node(&self, id: NodeId) -> &NodeData {
        self.nodes[id.0].as_ref().expect("use of freed namespace node")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.nodes[id.0].as_mut().expect("use of freed namespace node")
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn name_of(&self, id: NodeId) -> NameSeg {
        self.node(id).seg
    }

    pub fn path_of(&self, id: NodeId) -> String {
        let mut segs = Vec::new();
        let mut cur = Some(id);
        while let Some(n) = cur {
            if n == ROOT {
                break;
            }
            segs.push(self.node(n).seg);
            cur = self.node(n).parent;
        }
        segs.reverse();
        let mut s = String::from("\\");
        for (i, seg) in segs.iter().enumerate() {
            if i > 0 {
                s.push('.');
            }
            s.push_str(seg.as_str());
        }
        s
    }

    /// Single-segment, non-upward child lookup.
    fn find_child(&self, parent: NodeId, seg: NameSeg) -> Option<NodeId> {
        self.node(parent).children.iter().copied().find(|&c| self.node(c).seg == seg)
    }

    /// Find-existing resolution mode (spec.md §4.1), including upward
    /// search for bare single-segment names.
    pub fn find(&self, scope: NodeId, path: &NamePath) -> AmlResult<Option<NodeId>> {
        if path.is_null() {
            return Ok(None);
        }

        let start = self.walk_prefix(scope, path)?;

        if path.is_single_segment() {
            let seg = path.segs[0];
            let mut cursor = Some(start);
            while let Some(c) = cursor {
                if let Some(found) = self.find_child(c, seg) {
                    return Ok(Some(found));
                }
                cursor = self.node(c).parent;
            }
            return Ok(None);
        }

        let mut cur = start;
        for &seg in &path.segs {
            match self.find_child(cur, seg) {
                Some(next) => cur = next,
                None => return Ok(None),
            }
        }
        Ok(Some(cur))
    }

    /// Create-new-last-seg resolution mode (spec.md §4.1). Allocates (but
    /// does not install) the final node; caller installs it via
    /// `install`.
    pub fn create(&mut self, scope: NodeId, path: &NamePath) -> AmlResult<NodeId> {
        if path.segs.is_empty() {
            return Err(AmlError::BadBytecode(None));
        }

        let start = self.walk_prefix(scope, path)?;
        let mut cur = start;
        for &seg in &path.segs[..path.segs.len() - 1] {
            cur = self.find_child(cur, seg).ok_or(AmlError::NotFound)?;
        }

        let last = *path.segs.last().unwrap();
        if self.find_child(cur, last).is_some() {
            return Err(AmlError::AlreadyExists);
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(NodeData { seg: last, parent: Some(cur), children: Vec::new(), object: None, temporary: false }));
        Ok(id)
    }

    fn walk_prefix(&self, scope: NodeId, path: &NamePath) -> AmlResult<NodeId> {
        let mut cur = if path.root { ROOT } else { scope };
        for _ in 0..path.parent_ups {
            cur = self.node(cur).parent.ok_or(AmlError::InvalidNamePrefix)?;
        }
        Ok(cur)
    }

    /// Links a node allocated by `create` into its parent's child list.
    pub fn install(&mut self, id: NodeId, temporary: bool) {
        let parent = self.node(id).parent.expect("installed node must have a parent");
        self.node_mut(parent).children.push(id);
        self.node_mut(id).temporary = temporary;
    }

    /// Removes a node from its parent's child list and frees its arena
    /// slot. Per spec.md §3, temporary nodes are uninstalled in reverse
    /// install order by the call frame — this method just performs one
    /// removal; frame.rs is responsible for ordering.
    pub fn uninstall(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|&c| c != id);
        }
        self.nodes[id.0] = None;
    }

    pub fn set_object(&mut self, id: NodeId, object: Object) {
        self.node_mut(id).object = Some(Rc::new(RefCell::new(object)));
    }

    /// Makes `alias`'s object cell the same shared cell as `source`'s
    /// (spec.md §4.5 "Create alias").
    pub fn alias(&mut self, alias: NodeId, source: NodeId) -> AmlResult<()> {
        let cell = self.node(source).object.clone().ok_or(AmlError::NotFound)?;
        self.node_mut(alias).object = Some(cell);
        Ok(())
    }

    pub fn object_location(&self, id: NodeId) -> AmlResult<Location> {
        let cell = self.node(id).object.clone().ok_or(AmlError::NotFound)?;
        Ok(Location::Slot(cell))
    }

    pub fn get_object(&self, id: NodeId) -> AmlResult<Object> {
        let cell = self.node(id).object.as_ref().ok_or(AmlError::NotFound)?;
        Ok(cell.borrow().clone())
    }

    pub fn get_by_path_str(&self, scope: NodeId, path: &str) -> AmlResult<NodeId> {
        let bytes = encode_path_for_lookup(path);
        let mut offset = 0;
        let parsed = crate::name::parse_name_string(&bytes, &mut offset)?;
        self.find(scope, &parsed)?.ok_or(AmlError::NotFound)
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    pub fn predefined(&self, tag: &str) -> AmlResult<NodeId> {
        self.get_by_path_str(ROOT, tag)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Namespace::new()
    }
}

/// Turns a dotted, human-typed path like `"\_SB.PCI0.S08"` into the raw
/// byte encoding `parse_name_string` expects, for convenience call sites
/// (tests, `predefined`) that don't already have AML bytes on hand.
fn encode_path_for_lookup(path: &str) -> Vec<u8> {
    let mut out = Vec::new();
    let mut rest = path;
    if let Some(stripped) = rest.strip_prefix('\\') {
        out.push(b'\\');
        rest = stripped;
    }
    while let Some(stripped) = rest.strip_prefix('^') {
        out.push(b'^');
        rest = stripped;
    }

    let segs: Vec<&str> = if rest.is_empty() { Vec::new() } else { rest.split('.').collect() };
    match segs.len() {
        0 => out.push(0x00),
        1 => out.extend(pad_seg(segs[0])),
        2 => {
            out.push(0x2E);
            out.extend(pad_seg(segs[0]));
            out.extend(pad_seg(segs[1]));
        }
        n => {
            out.push(0x2F);
            out.push(n as u8);
            for s in segs {
                out.extend(pad_seg(s));
            }
        }
    }
    out
}

fn pad_seg(s: &str) -> [u8; 4] {
    let mut seg = [b'_'; 4];
    for (i, b) in s.bytes().take(4).enumerate() {
        seg[i] = b;
    }
    seg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predefined_scopes_exist() {
        let ns = Namespace::new();
        assert!(ns.predefined("\\_SB").is_ok());
        assert!(ns.predefined("\\_PR").is_ok());
        assert_eq!(ns.get_object(ns.predefined("\\_REV").unwrap()).unwrap().as_integer().unwrap(), 2);
    }

    #[test]
    fn upward_search_climbs_to_definition() {
        let mut ns = Namespace::new();
        let sb = ns.predefined("\\_SB").unwrap();
        let y = ns.install_new_scope(sb, NameSeg(*b"Y___"));
        let z = ns.install_new_scope(y, NameSeg(*b"Z___"));
        let foo = ns.install_new_scope(z, NameSeg(*b"FOO_"));
        ns.set_object(foo, Object::Integer(7));

        let mut offset = 0;
        let path = crate::name::parse_name_string(b"FOO_", &mut offset).unwrap();
        let found = ns.find(z, &path).unwrap().unwrap();
        assert_eq!(found, foo);

        // at \_SB.Y (no local FOO), search climbs to \_SB then \ and misses
        let missed = ns.find(y, &path).unwrap();
        assert!(missed.is_none());
    }
}
