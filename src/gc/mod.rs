//! Precise mark-and-sweep garbage collector for heap-allocated values
//! (`str`, `list`, `tuple`, `map`).
//!
//! Translated from `original_source/src/interpreter/gc.c`. The original is a
//! non-moving tracing collector over an intrusive linked list of `Obj`
//! headers, with a shadow stack rooting objects that are mid-construction
//! (e.g. the items of a list literal being built one push at a time) and a
//! barrier depth counter so nested constructions don't truncate each other's
//! roots. That shape carries over directly here; Rust's ownership model has
//! no way to express "many `Value`s borrow this heap cell, free it when
//! nothing reachable from the roots points to it anymore" without either
//! reference counting (which the original's composite cycles — a list
//! containing itself — would leak) or a real tracing collector, so this is
//! one of the few places in the crate built on raw pointers and `unsafe`.

use crate::value::Value;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::ptr::NonNull;

pub const GC_MIN_RUN: usize = 1024 * 1024;
pub const GC_HEAP_GROW_FACTOR: usize = 2;

#[derive(Debug)]
pub enum ObjKind {
    Str(RefCell<String>),
    List(RefCell<Vec<Value>>),
    Tuple(Box<[Value]>),
    Map(RefCell<IndexMap<MapKey, Value>>),
}

pub struct Obj {
    marked: Cell<bool>,
    managed: bool,
    next: Cell<Option<NonNull<Obj>>>,
    pub kind: ObjKind,
}

/// A `Value` usable as a map key: wraps the byte-level notion of equality the
/// original's `hash`/`eq` trait functions implement for hashable types
/// (bool, num, str, text_lit). Lists/tuples/maps are not used as map keys in
/// Slash, matching the original (`map_type_info.hash` is only ever invoked
/// with scalar keys in practice).
#[derive(Clone)]
pub struct MapKey(pub Value);

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        crate::value::raw_eq(&self.0, &other.0)
    }
}
impl Eq for MapKey {}

impl std::hash::Hash for MapKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        crate::value::hash_value(&self.0, state)
    }
}

/// Copy handle to a heap object. Never null; dereferencing after the object
/// has been swept is a logic error the collector is designed to prevent by
/// construction (an unreached object is, by definition, unreachable from any
/// live `Value`).
#[derive(Clone, Copy)]
pub struct GcRef(NonNull<Obj>);

impl GcRef {
    pub fn obj(&self) -> &Obj {
        unsafe { self.0.as_ref() }
    }
}

impl std::fmt::Debug for GcRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GcRef({:p})", self.0.as_ptr())
    }
}

pub struct Gc {
    head: Option<NonNull<Obj>>,
    gray_stack: Vec<NonNull<Obj>>,
    shadow_stack: Vec<NonNull<Obj>>,
    barrier: usize,
    shadow_checkpoints: Vec<usize>,
    bytes_managing: usize,
    next_run: usize,
}

impl Default for Gc {
    fn default() -> Self {
        Gc {
            head: None,
            gray_stack: Vec::new(),
            shadow_stack: Vec::new(),
            barrier: 0,
            shadow_checkpoints: Vec::new(),
            bytes_managing: 0,
            next_run: GC_MIN_RUN,
        }
    }
}

fn approx_size(kind: &ObjKind) -> usize {
    match kind {
        ObjKind::Str(s) => 32 + s.borrow().capacity(),
        ObjKind::List(l) => 32 + l.borrow().capacity() * std::mem::size_of::<Value>(),
        ObjKind::Tuple(t) => 32 + t.len() * std::mem::size_of::<Value>(),
        ObjKind::Map(m) => 32 + m.borrow().capacity() * 64,
    }
}

impl Gc {
    pub fn alloc(&mut self, kind: ObjKind) -> GcRef {
        let size = approx_size(&kind);
        let obj = Box::new(Obj { marked: Cell::new(true), managed: true, next: Cell::new(self.head), kind });
        let ptr = NonNull::from(Box::leak(obj));
        self.head = Some(ptr);
        self.bytes_managing += size;
        if self.barrier > 0 {
            self.shadow_stack.push(ptr);
        }
        GcRef(ptr)
    }

    pub fn shadow_push(&mut self, r: GcRef) {
        self.shadow_stack.push(r.0);
    }

    pub fn barrier_start(&mut self) {
        self.barrier += 1;
        if self.barrier == 1 {
            self.shadow_checkpoints.push(self.shadow_stack.len());
        }
    }

    pub fn barrier_end(&mut self) {
        if self.barrier == 0 {
            return;
        }
        self.barrier -= 1;
        if self.barrier == 0 {
            if let Some(checkpoint) = self.shadow_checkpoints.pop() {
                self.shadow_stack.truncate(checkpoint);
            }
        }
    }

    fn visit_value(&mut self, v: &Value) {
        let r = match v {
            Value::Str(r) | Value::List(r) | Value::Tuple(r) | Value::Map(r) => *r,
            // A function carries only its name/params/body (an AST handle,
            // not heap state) and captures no scope, so there is nothing
            // further to trace.
            _ => return,
        };
        self.visit_obj(r.0);
    }

    fn visit_obj(&mut self, ptr: NonNull<Obj>) {
        let obj = unsafe { ptr.as_ref() };
        if !obj.managed || obj.marked.get() {
            return;
        }
        obj.marked.set(true);
        self.gray_stack.push(ptr);
    }

    fn blacken(&mut self, ptr: NonNull<Obj>) {
        let obj = unsafe { ptr.as_ref() };
        match &obj.kind {
            ObjKind::Str(_) => {}
            ObjKind::List(items) => {
                let snapshot: Vec<Value> = items.borrow().clone();
                for v in &snapshot {
                    self.visit_value(v);
                }
            }
            ObjKind::Tuple(items) => {
                for v in items.iter() {
                    self.visit_value(v);
                }
            }
            ObjKind::Map(entries) => {
                let snapshot: Vec<(Value, Value)> =
                    entries.borrow().iter().map(|(k, v)| (k.0.clone(), v.clone())).collect();
                for (k, v) in &snapshot {
                    self.visit_value(k);
                    self.visit_value(v);
                }
            }
        }
    }

    /// Walks every value reachable from `roots` (the active scope chain) and
    /// every object currently on the shadow stack, then traces and sweeps.
    pub fn run<'a>(&mut self, roots: impl Iterator<Item = &'a Value>) {
        for ptr in self.shadow_stack.clone() {
            self.visit_obj(ptr);
        }
        for v in roots {
            self.visit_value(v);
        }
        while let Some(ptr) = self.gray_stack.pop() {
            self.blacken(ptr);
        }
        self.sweep();
        self.reset();
    }

    fn sweep(&mut self) {
        let mut cur = self.head;
        let mut prev: Option<NonNull<Obj>> = None;
        let mut freed = 0usize;
        while let Some(ptr) = cur {
            let obj = unsafe { ptr.as_ref() };
            let next = obj.next.get();
            if obj.managed && !obj.marked.get() {
                if let Some(p) = prev {
                    unsafe { p.as_ref().next.set(next) };
                } else {
                    self.head = next;
                }
                freed += approx_size(&obj.kind);
                unsafe { drop(Box::from_raw(ptr.as_ptr())) };
            } else {
                prev = Some(ptr);
            }
            cur = next;
        }
        self.bytes_managing = self.bytes_managing.saturating_sub(freed);
    }

    fn reset(&mut self) {
        self.next_run = (self.bytes_managing * GC_HEAP_GROW_FACTOR).max(GC_MIN_RUN);
        let mut cur = self.head;
        while let Some(ptr) = cur {
            let obj = unsafe { ptr.as_ref() };
            obj.marked.set(false);
            cur = obj.next.get();
        }
    }

    pub fn should_run(&self) -> bool {
        self.bytes_managing > self.next_run
    }

    /// Drops any in-flight barrier/shadow-stack state left over from a
    /// statement that was abandoned mid-construction by a runtime error
    /// (e.g. a error raised while building a list literal, leaving
    /// `barrier > 0`). Called by the interpreter's top-level error recovery,
    /// matching the original's implicit reset of `gc.barrier` on
    /// `longjmp`-based error unwinding.
    pub fn reset_after_error(&mut self) {
        self.shadow_stack.clear();
        self.shadow_checkpoints.clear();
        self.barrier = 0;
    }

    /// Unconditional sweep of every tracked object, used at interpreter
    /// shutdown (`gc_collect_all` in the original).
    pub fn collect_all(&mut self) {
        let mut cur = self.head.take();
        while let Some(ptr) = cur {
            let obj = unsafe { ptr.as_ref() };
            cur = obj.next.get();
            unsafe { drop(Box::from_raw(ptr.as_ptr())) };
        }
    }
}

impl Drop for Gc {
    fn drop(&mut self) {
        self.collect_all();
    }
}
