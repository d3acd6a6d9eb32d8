//! Control-flow and runtime error types threaded through `eval`/`exec` via
//! `Result`, in place of the original's `setjmp`/`longjmp` non-local exit
//! (`original_source/include/interpreter/error.h`). Shaped after
//! `just-bash`'s `src/interpreter/errors.rs`: small structs, one unifying
//! enum, manual `Display` rather than blanket derives, since each variant's
//! message format differs from a mechanical `{variant}: {field}` rendering.

use std::fmt;

#[derive(Debug, Clone, thiserror::Error)]
pub struct RuntimeError {
    pub message: String,
    pub line: usize,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        RuntimeError { message: message.into(), line }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}]: {}", self.line, self.message)
    }
}

/// Unifies every way control can leave a statement/expression evaluation
/// other than falling off the end normally. `Break`/`Continue` carry a level
/// count (nested-loop exit depth); `Return` carries an optional value;
/// `Exit` is raised by the `exit` builtin and propagates out of the whole
/// interpreter run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Signal {
    Runtime(RuntimeError),
    Break(u32),
    Continue(u32),
    Return(crate::value::Value),
    Exit(i32),
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Runtime(e) => write!(f, "{e}"),
            Signal::Break(n) => write!(f, "break({n})"),
            Signal::Continue(n) => write!(f, "continue({n})"),
            Signal::Return(_) => write!(f, "return"),
            Signal::Exit(code) => write!(f, "exit({code})"),
        }
    }
}

impl From<RuntimeError> for Signal {
    fn from(e: RuntimeError) -> Self {
        Signal::Runtime(e)
    }
}

pub fn is_scope_exit_signal(s: &Signal) -> bool {
    matches!(s, Signal::Break(_) | Signal::Continue(_) | Signal::Return(_))
}

pub type EvalResult<T> = Result<T, Signal>;
