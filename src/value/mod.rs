//! The `Value` tagged union and its per-type operator/trait table.
//!
//! The original represents every value as a `SlashValue{T: *SlashTypeInfo,
//! union{...}}` where `T` is a pointer to a static vtable of operator/trait
//! function pointers (`include/interpreter/value/slash_value.h`). A Rust
//! enum plus a `match`-dispatching module (`ops.rs`) gives the same
//! behavior — one function per operator, one arm per type — without a
//! hand-rolled vtable, which is the idiomatic translation for a closed set
//! of value kinds known at compile time.

pub mod cast;
pub mod ops;

use crate::ast::StmtId;
use crate::gc::{Gc, GcRef, MapKey, ObjKind};
use indexmap::IndexMap;
use std::rc::Rc;

#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Num(f64),
    Range(i64, i64),
    /// Bare shell words (`echo` argument tokens): immutable, never heap
    /// managed, matching the original's `text_lit_type_info` which wraps a
    /// non-owning `StrView` into the source buffer or an argv entry.
    TextLit(Rc<str>),
    Function(Rc<FunctionVal>),
    Str(GcRef),
    List(GcRef),
    Tuple(GcRef),
    Map(GcRef),
    None,
}

pub struct FunctionVal {
    pub name: Option<String>,
    pub params: Vec<String>,
    /// Deep-copied at the moment the function expression is evaluated (an
    /// `Rc` clone of the arena-allocated node suffices here since AST nodes
    /// are immutable once parsed), so the body survives a REPL reset. No
    /// scope is captured: Slash resolves free variables dynamically, off
    /// whatever scope is active at the call site, not the definition site
    /// (`eval_call` in `original_source/src/interpreter/interpreter.c`
    /// re-parents the callee's scope onto `interpreter->scope` at call time).
    pub body: StmtId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeName {
    Bool,
    Num,
    Range,
    TextLit,
    Function,
    Str,
    List,
    Tuple,
    Map,
    None,
}

impl TypeName {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeName::Bool => "bool",
            TypeName::Num => "num",
            TypeName::Range => "range",
            TypeName::TextLit => "text",
            TypeName::Function => "function",
            TypeName::Str => "str",
            TypeName::List => "list",
            TypeName::Tuple => "tuple",
            TypeName::Map => "map",
            TypeName::None => "none",
        }
    }

    pub fn from_name(name: &str) -> Option<TypeName> {
        Some(match name {
            "bool" => TypeName::Bool,
            "num" => TypeName::Num,
            "range" => TypeName::Range,
            "text" => TypeName::TextLit,
            "function" => TypeName::Function,
            "str" => TypeName::Str,
            "list" => TypeName::List,
            "tuple" => TypeName::Tuple,
            "map" => TypeName::Map,
            "none" => TypeName::None,
            _ => return None,
        })
    }
}

impl Value {
    pub fn type_of(&self) -> TypeName {
        match self {
            Value::Bool(_) => TypeName::Bool,
            Value::Num(_) => TypeName::Num,
            Value::Range(..) => TypeName::Range,
            Value::TextLit(_) => TypeName::TextLit,
            Value::Function(_) => TypeName::Function,
            Value::Str(_) => TypeName::Str,
            Value::List(_) => TypeName::List,
            Value::Tuple(_) => TypeName::Tuple,
            Value::Map(_) => TypeName::Map,
            Value::None => TypeName::None,
        }
    }

    pub fn num_is_int(n: f64) -> bool {
        n.floor() == n
    }

    pub fn as_str_text(&self) -> Option<String> {
        match self {
            Value::TextLit(s) => Some(s.to_string()),
            Value::Str(r) => match &r.obj().kind {
                ObjKind::Str(s) => Some(s.borrow().clone()),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn new_str(gc: &mut Gc, s: impl Into<String>) -> Value {
        Value::Str(gc.alloc(ObjKind::Str(std::cell::RefCell::new(s.into()))))
    }

    pub fn new_list(gc: &mut Gc, items: Vec<Value>) -> Value {
        Value::List(gc.alloc(ObjKind::List(std::cell::RefCell::new(items))))
    }

    pub fn new_tuple(gc: &mut Gc, items: Vec<Value>) -> Value {
        Value::Tuple(gc.alloc(ObjKind::Tuple(items.into_boxed_slice())))
    }

    pub fn new_map(gc: &mut Gc, entries: Vec<(Value, Value)>) -> Value {
        let mut map = IndexMap::new();
        for (k, v) in entries {
            map.insert(MapKey(k), v);
        }
        Value::Map(gc.alloc(ObjKind::Map(std::cell::RefCell::new(map))))
    }
}

/// Byte-level equality used for map keys and `eq`'s scalar fast path —
/// separate from `ops::eq` because map-key equality must not allocate or
/// consult the GC (it runs during `blacken`, where only `&Obj` is
/// available).
pub fn raw_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Num(x), Value::Num(y)) => x == y,
        (Value::Range(s1, e1), Value::Range(s2, e2)) => s1 == s2 && e1 == e2,
        (Value::TextLit(x), Value::TextLit(y)) => x == y,
        (Value::TextLit(x), Value::Str(y)) | (Value::Str(y), Value::TextLit(x)) => match &y.obj().kind {
            ObjKind::Str(s) => x.as_ref() == s.borrow().as_str(),
            _ => false,
        },
        (Value::Str(x), Value::Str(y)) => match (&x.obj().kind, &y.obj().kind) {
            (ObjKind::Str(a), ObjKind::Str(b)) => *a.borrow() == *b.borrow(),
            _ => false,
        },
        (Value::None, Value::None) => true,
        _ => false,
    }
}

pub fn hash_value<H: std::hash::Hasher>(v: &Value, state: &mut H) {
    use std::hash::Hash;
    match v {
        Value::Bool(b) => b.hash(state),
        Value::Num(n) => n.to_bits().hash(state),
        Value::Range(s, e) => {
            s.hash(state);
            e.hash(state);
        }
        Value::TextLit(s) => s.hash(state),
        Value::Str(r) => {
            if let ObjKind::Str(s) = &r.obj().kind {
                s.borrow().hash(state);
            }
        }
        Value::None => 0u8.hash(state),
        _ => 0u8.hash(state),
    }
}
