//! `cast x as T` dispatch, grounded on `original_source/src/interpreter/
//! interpreter.c: eval_cast` and the `dynamic_cast` matrix it calls into.

use crate::ast::ExprId;
use crate::errors::{RuntimeError, Signal};
use crate::gc::{Gc, ObjKind};
use crate::value::{ops, TypeName, Value};

type R<T> = Result<T, Signal>;

/// `x as bool` where `x` is literally a subshell expression bypasses normal
/// truthy conversion: the result is whether the subshell's command exited
/// zero, matching the original's special case in `eval_cast`.
pub fn is_subshell_as_bool(source: &ExprId, target: TypeName) -> bool {
    target == TypeName::Bool && matches!(&**source, crate::ast::Expr::Subshell { .. })
}

pub fn cast(gc: &mut Gc, v: &Value, type_name: &str, line: usize) -> R<Value> {
    let Some(target) = TypeName::from_name(type_name) else {
        return Err(Signal::Runtime(RuntimeError::new(format!("Unknown type '{type_name}'"), line)));
    };
    match target {
        TypeName::Bool => Ok(Value::Bool(ops::truthy(v))),
        TypeName::Str => Ok(Value::new_str(gc, ops::print_string(v))),
        TypeName::Num => match v {
            Value::Num(n) => Ok(Value::Num(*n)),
            Value::TextLit(_) | Value::Str(_) => {
                let s = v.as_str_text().unwrap_or_default();
                s.trim()
                    .parse::<f64>()
                    .map(Value::Num)
                    .map_err(|_| Signal::Runtime(RuntimeError::new(format!("Cannot cast '{s}' to num"), line)))
            }
            Value::Bool(b) => Ok(Value::Num(if *b { 1.0 } else { 0.0 })),
            _ => Err(cast_err(v, "num", line)),
        },
        TypeName::List => match v {
            Value::List(_) => Ok(v.clone()),
            Value::Range(s, e) => Ok(Value::new_list(gc, (*s..*e).map(|i| Value::Num(i as f64)).collect())),
            Value::Tuple(r) => {
                let ObjKind::Tuple(t) = &r.obj().kind else { unreachable!() };
                Ok(Value::new_list(gc, t.to_vec()))
            }
            _ => Err(cast_err(v, "list", line)),
        },
        TypeName::Tuple => match v {
            Value::Tuple(_) => Ok(v.clone()),
            Value::List(r) => {
                let ObjKind::List(l) = &r.obj().kind else { unreachable!() };
                Ok(Value::new_tuple(gc, l.borrow().clone()))
            }
            _ => Err(cast_err(v, "tuple", line)),
        },
        TypeName::Range => Err(cast_err(v, "range", line)),
        TypeName::TextLit => Ok(Value::TextLit(ops::print_string(v).into())),
        TypeName::Function | TypeName::Map | TypeName::None => {
            if v.type_of() == target {
                Ok(v.clone())
            } else {
                Err(cast_err(v, target.as_str(), line))
            }
        }
    }
}

fn cast_err(v: &Value, target: &str, line: usize) -> Signal {
    Signal::Runtime(RuntimeError::new(format!("Cannot cast '{}' to '{}'", v.type_of().as_str(), target), line))
}
