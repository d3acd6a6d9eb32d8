//! Operator and trait dispatch for `Value`, grounded on
//! `original_source/src/interpreter/interpreter.c`'s `eval_binary_operators`
//! / `eval_unary` and the per-type trait functions referenced from
//! `include/interpreter/value/slash_value.h`.

use crate::errors::{RuntimeError, Signal};
use crate::gc::{Gc, ObjKind};
use crate::token::TokenType;
use crate::value::Value;
use std::cmp::Ordering;

type R<T> = Result<T, Signal>;

fn err(msg: impl Into<String>, line: usize) -> Signal {
    Signal::Runtime(RuntimeError::new(msg, line))
}

pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Num(n) => *n != 0.0,
        Value::Range(s, e) => s != e,
        Value::TextLit(s) => !s.is_empty(),
        Value::Str(r) => match &r.obj().kind {
            ObjKind::Str(s) => !s.borrow().is_empty(),
            _ => false,
        },
        Value::List(r) => match &r.obj().kind {
            ObjKind::List(l) => !l.borrow().is_empty(),
            _ => false,
        },
        Value::Tuple(r) => match &r.obj().kind {
            ObjKind::Tuple(t) => !t.is_empty(),
            _ => false,
        },
        Value::Map(r) => match &r.obj().kind {
            ObjKind::Map(m) => !m.borrow().is_empty(),
            _ => false,
        },
        Value::Function(_) => true,
        Value::None => false,
    }
}

/// `none == x` is false unless `x` is also `none`; no other operator is
/// defined across a `none` operand and a non-`none` operand. Preserved
/// exactly as the original (see DESIGN.md Open Question 1).
pub fn eq(a: &Value, b: &Value) -> bool {
    if matches!(a, Value::None) || matches!(b, Value::None) {
        return matches!(a, Value::None) && matches!(b, Value::None);
    }
    match (a, b) {
        (Value::List(x), Value::List(y)) => match (&x.obj().kind, &y.obj().kind) {
            (ObjKind::List(a), ObjKind::List(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| eq(x, y))
            }
            _ => false,
        },
        (Value::Tuple(x), Value::Tuple(y)) => match (&x.obj().kind, &y.obj().kind) {
            (ObjKind::Tuple(a), ObjKind::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| eq(x, y))
            }
            _ => false,
        },
        _ => crate::value::raw_eq(a, b),
    }
}

pub fn cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Num(x), Value::Num(y)) => x.partial_cmp(y),
        (Value::TextLit(_), Value::Str(_)) | (Value::Str(_), Value::TextLit(_)) => {
            let xs = a.as_str_text()?;
            let ys = b.as_str_text()?;
            xs.partial_cmp(&ys)
        }
        (Value::TextLit(x), Value::TextLit(y)) => x.as_ref().partial_cmp(y.as_ref()),
        (Value::Str(_), Value::Str(_)) => a.as_str_text()?.partial_cmp(&b.as_str_text()?),
        _ => None,
    }
}

fn require_same_type(a: &Value, b: &Value, op: &str, line: usize) -> R<()> {
    if a.type_of() != b.type_of() {
        return Err(err(
            format!(
                "Binary operation failed: type mismatch between '{}' and '{}'",
                a.type_of().as_str(),
                b.type_of().as_str()
            ),
            line,
        ));
    }
    let _ = op;
    Ok(())
}

fn not_defined(op: &str, t: &Value, line: usize) -> Signal {
    err(format!("'{}' operator not defined for type '{}'", op, t.type_of().as_str()), line)
}

pub fn binary_op(gc: &mut Gc, op: TokenType, left: &Value, right: &Value, line: usize) -> R<Value> {
    use TokenType::*;
    // none-operand asymmetry: `none` compared against a non-none value is
    // simply false for equality, and every other operator is undefined.
    if matches!(left, Value::None) && !matches!(right, Value::None) {
        return match op {
            EqualEqual => Ok(Value::Bool(false)),
            BangEqual => Ok(Value::Bool(true)),
            _ => Err(not_defined(op_name(op), left, line)),
        };
    }

    match op {
        EqualEqual => return Ok(Value::Bool(eq(left, right))),
        BangEqual => return Ok(Value::Bool(!eq(left, right))),
        _ => {}
    }

    require_same_type(left, right, op_name(op), line)?;

    match op {
        Plus => add(gc, left, right, line),
        Minus => numeric(left, right, line, "-", |a, b| a - b),
        Star => numeric(left, right, line, "*", |a, b| a * b),
        Slash => numeric(left, right, line, "/", |a, b| a / b),
        SlashSlash => numeric(left, right, line, "//", |a, b| (a / b).floor()),
        Percent => numeric(left, right, line, "%", |a, b| a % b),
        StarStar => numeric(left, right, line, "**", |a, b| a.powf(b)),
        Greater | GreaterEqual | Less | LessEqual => {
            let ord = cmp(left, right).ok_or_else(|| not_defined("comparison", left, line))?;
            let res = match op {
                Greater => ord == Ordering::Greater,
                GreaterEqual => ord != Ordering::Less,
                Less => ord == Ordering::Less,
                LessEqual => ord != Ordering::Greater,
                _ => unreachable!(),
            };
            Ok(Value::Bool(res))
        }
        _ => Err(err(format!("'{}' is not a binary operator", op_name(op)), line)),
    }
}

fn op_name(op: TokenType) -> &'static str {
    use TokenType::*;
    match op {
        Plus => "+",
        Minus => "-",
        Star => "*",
        Slash => "/",
        SlashSlash => "//",
        Percent => "%",
        StarStar => "**",
        Greater => ">",
        GreaterEqual => ">=",
        Less => "<",
        LessEqual => "<=",
        EqualEqual => "==",
        BangEqual => "!=",
        _ => "?",
    }
}

fn numeric(left: &Value, right: &Value, line: usize, name: &str, f: impl Fn(f64, f64) -> f64) -> R<Value> {
    match (left, right) {
        (Value::Num(a), Value::Num(b)) => Ok(Value::Num(f(*a, *b))),
        _ => Err(not_defined(name, left, line)),
    }
}

fn add(gc: &mut Gc, left: &Value, right: &Value, line: usize) -> R<Value> {
    match (left, right) {
        (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
        (Value::TextLit(_), _) | (Value::Str(_), _) => {
            let a = left.as_str_text().ok_or_else(|| not_defined("+", left, line))?;
            let b = right.as_str_text().ok_or_else(|| not_defined("+", right, line))?;
            Ok(Value::new_str(gc, a + &b))
        }
        (Value::List(x), Value::List(y)) => {
            let a = match &x.obj().kind {
                ObjKind::List(l) => l.borrow().clone(),
                _ => unreachable!(),
            };
            let b = match &y.obj().kind {
                ObjKind::List(l) => l.borrow().clone(),
                _ => unreachable!(),
            };
            let mut out = a;
            out.extend(b);
            Ok(Value::new_list(gc, out))
        }
        _ => Err(not_defined("+", left, line)),
    }
}

pub fn unary_op(gc: &mut Gc, op: TokenType, v: &Value, line: usize) -> R<Value> {
    match op {
        TokenType::Minus => match v {
            Value::Num(n) => Ok(Value::Num(-n)),
            _ => Err(not_defined("unary -", v, line)),
        },
        TokenType::Not | TokenType::Bang => Ok(Value::Bool(!truthy(v))),
        _ => {
            let _ = gc;
            Err(err("not a unary operator", line))
        }
    }
}

pub fn print_string(v: &Value) -> String {
    match v {
        Value::Bool(b) => b.to_string(),
        Value::Num(n) => {
            if Value::num_is_int(*n) {
                format!("{}", *n as i64)
            } else {
                n.to_string()
            }
        }
        Value::Range(s, e) => format!("{s}..{e}"),
        Value::TextLit(s) => s.to_string(),
        Value::Str(r) => match &r.obj().kind {
            ObjKind::Str(s) => s.borrow().clone(),
            _ => String::new(),
        },
        Value::List(r) => match &r.obj().kind {
            ObjKind::List(l) => {
                let items: Vec<String> = l.borrow().iter().map(print_string).collect();
                format!("[{}]", items.join(", "))
            }
            _ => String::new(),
        },
        Value::Tuple(r) => match &r.obj().kind {
            ObjKind::Tuple(t) => {
                let items: Vec<String> = t.iter().map(print_string).collect();
                format!("({})", items.join(", "))
            }
            _ => String::new(),
        },
        Value::Map(r) => match &r.obj().kind {
            ObjKind::Map(m) => {
                let items: Vec<String> =
                    m.borrow().iter().map(|(k, v)| format!("{}: {}", print_string(&k.0), print_string(v))).collect();
                format!("@[{}]", items.join(", "))
            }
            _ => String::new(),
        },
        Value::Function(f) => format!("<function {}>", f.name.as_deref().unwrap_or("anonymous")),
        Value::None => "none".to_string(),
    }
}

pub fn item_get(target: &Value, index: &Value, line: usize) -> R<Value> {
    match target {
        Value::List(r) => {
            let ObjKind::List(l) = &r.obj().kind else { unreachable!() };
            let i = require_int_index(index, line)?;
            let l = l.borrow();
            let idx = normalize_index(i, l.len(), line)?;
            Ok(l[idx].clone())
        }
        Value::Tuple(r) => {
            let ObjKind::Tuple(t) = &r.obj().kind else { unreachable!() };
            let i = require_int_index(index, line)?;
            let idx = normalize_index(i, t.len(), line)?;
            Ok(t[idx].clone())
        }
        Value::Map(r) => {
            let ObjKind::Map(m) = &r.obj().kind else { unreachable!() };
            let key = crate::gc::MapKey(index.clone());
            m.borrow().get(&key).cloned().ok_or_else(|| err("Key not found in map", line))
        }
        Value::Str(_) | Value::TextLit(_) => {
            let s = target.as_str_text().unwrap_or_default();
            let chars: Vec<char> = s.chars().collect();
            let i = require_int_index(index, line)?;
            let idx = normalize_index(i, chars.len(), line)?;
            Ok(Value::TextLit(chars[idx].to_string().into()))
        }
        _ => Err(not_defined("item_get", target, line)),
    }
}

fn require_int_index(index: &Value, line: usize) -> R<i64> {
    match index {
        Value::Num(n) if Value::num_is_int(*n) => Ok(*n as i64),
        _ => Err(err("Index must be an integer num", line)),
    }
}

fn normalize_index(i: i64, len: usize, line: usize) -> R<usize> {
    let idx = if i < 0 { i + len as i64 } else { i };
    if idx < 0 || idx as usize >= len {
        return Err(err("Index out of bounds", line));
    }
    Ok(idx as usize)
}

pub fn item_assign(target: &Value, index: &Value, value: Value, line: usize) -> R<()> {
    match target {
        Value::List(r) => {
            let ObjKind::List(l) = &r.obj().kind else { unreachable!() };
            let i = require_int_index(index, line)?;
            let mut l = l.borrow_mut();
            let idx = normalize_index(i, l.len(), line)?;
            l[idx] = value;
            Ok(())
        }
        Value::Map(r) => {
            let ObjKind::Map(m) = &r.obj().kind else { unreachable!() };
            m.borrow_mut().insert(crate::gc::MapKey(index.clone()), value);
            Ok(())
        }
        _ => Err(not_defined("item_assign", target, line)),
    }
}

/// `item in container`: dispatches on the container (right-hand) type,
/// matching `right.T->item_in(right, left)` in the original.
pub fn item_in(container: &Value, item: &Value, line: usize) -> R<bool> {
    match container {
        Value::Range(start, end) => {
            let Value::Num(n) = item else { return Ok(false) };
            if !Value::num_is_int(*n) {
                return Ok(false);
            }
            let n = *n as i64;
            // matches `range_item_in` in the original exactly: `item` is
            // treated as an offset added to `start`, not an absolute value,
            // and the only check is `offset < end` (DESIGN.md Open Question
            // 2) — so e.g. `6 in 2..7` is false (2+6 >= 7) while `0 in 2..7`
            // is true (2+0 < 7).
            Ok(*start + n < *end)
        }
        Value::List(r) => {
            let ObjKind::List(l) = &r.obj().kind else { unreachable!() };
            Ok(l.borrow().iter().any(|v| eq(v, item)))
        }
        Value::Tuple(r) => {
            let ObjKind::Tuple(t) = &r.obj().kind else { unreachable!() };
            Ok(t.iter().any(|v| eq(v, item)))
        }
        Value::Map(r) => {
            let ObjKind::Map(m) = &r.obj().kind else { unreachable!() };
            Ok(m.borrow().contains_key(&crate::gc::MapKey(item.clone())))
        }
        Value::Str(_) | Value::TextLit(_) => {
            let hay = container.as_str_text().unwrap_or_default();
            let needle = item.as_str_text().ok_or_else(|| not_defined("in", item, line))?;
            Ok(hay.contains(&needle))
        }
        _ => Err(not_defined("in", container, line)),
    }
}
