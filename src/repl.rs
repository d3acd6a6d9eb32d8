//! Interactive REPL: line-by-line read/lex/parse/eval with the `-> `/`.. `
//! prompt-continuation protocol.
//!
//! Grounded on `original_source/src/main.c`'s `interactive()` and
//! `original_source/src/interactive/prompt.c`: a line is accumulated into a
//! growing source buffer; if parsing it fails with exactly one "expected
//! `}`" error, the buffer is kept and more input is read under a `.. `
//! continuation prompt instead of being reported, the same way an
//! unterminated `{ ... }` block keeps a shell waiting for its closing brace.
//! Raw line editing/history is delegated to `rustyline`, matching this
//! exercise's framing of interactive line editing as an external concern
//! rather than something to hand-roll against raw termios.

use crate::eval::Interpreter;
use crate::{lex, parse};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = "-> ";
const CONTINUATION_PROMPT: &str = ".. ";

/// Runs the interactive loop until EOF (Ctrl-D) or an `exit` builtin call,
/// returning the process exit code.
pub fn run(interp: &mut Interpreter) -> i32 {
    let mut editor = match DefaultEditor::new() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("[Slash]: failed to start line editor: {e}");
            return 1;
        }
    };

    let mut buffer = String::new();
    let mut continuing = false;

    loop {
        let prompt = if continuing { CONTINUATION_PROMPT } else { PROMPT };
        match editor.readline(prompt) {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);

                let lexed = lex(&buffer);
                if lexed.had_error {
                    for err in &lexed.errors {
                        eprintln!("{err}");
                    }
                    buffer.clear();
                    continuing = false;
                    continue;
                }
                let parsed = parse(lexed.tokens);

                if parsed.expects_continuation() {
                    continuing = true;
                    continue;
                }

                if !parsed.errors.is_empty() {
                    for err in &parsed.errors {
                        eprintln!("[Slash Parse Error, line {}]: {}", err.line, err.message);
                    }
                } else if let Some(code) = interp.run_line(&parsed.statements) {
                    return code;
                }

                buffer.clear();
                continuing = false;
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C: abandon the current (possibly multi-line) input
                // and return to a fresh prompt, matching a shell's SIGINT
                // handling at an interactive prompt.
                buffer.clear();
                continuing = false;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("[Slash]: read error: {e}");
                break;
            }
        }
    }

    interp.prev_exit_code
}
