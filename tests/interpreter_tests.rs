//! End-to-end tests: whole Slash programs run through the public
//! lex/parse/`Interpreter` pipeline, asserting on exit codes and bindings
//! left in global scope — mirroring the concrete scenarios a Slash program
//! is expected to satisfy.

use slash_lang::eval::Interpreter;
use slash_lang::{lex, parse};

fn run(source: &str) -> (i32, Interpreter) {
    let lexed = lex(source);
    assert!(!lexed.had_error, "lex errors: {:?}", lexed.errors);
    let parsed = parse(lexed.tokens);
    assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
    let mut interp = Interpreter::new(&["test".to_string()]);
    let code = interp.run(&parsed.statements);
    (code, interp)
}

#[test]
fn arithmetic_and_truthiness() {
    let (code, interp) = run("var x = 2 + 3 * 4\nassert $x == 14\nassert $x\n");
    assert_eq!(code, 0);
    let x = interp.scope.get("x").unwrap();
    assert!(matches!(x, slash_lang::value::Value::Num(n) if n == 14.0));
}

#[test]
fn pipeline_with_subshell_capture() {
    let (code, interp) = run("var s = (echo hello)\nassert $s == \"hello\"\n");
    assert_eq!(code, 0);
    let s = interp.scope.get("s").unwrap();
    assert_eq!(s.as_str_text().as_deref(), Some("hello"));
}

#[test]
fn iter_loop_with_range_and_break() {
    let (code, interp) = run(
        "var n = 0\nloop i in 0..5 { n += $i; if $i == 3 { break } }\nassert $n == 6\n",
    );
    assert_eq!(code, 0);
    let n = interp.scope.get("n").unwrap();
    assert!(matches!(n, slash_lang::value::Value::Num(v) if v == 6.0));
}

#[test]
fn map_literal_subscript_assign_and_in() {
    let (code, _interp) = run(
        "var m = @[\"a\": 1, \"b\": 2]\n$m[\"c\"] = 3\nassert \"c\" in $m\nassert $m[\"c\"] == 3\n",
    );
    assert_eq!(code, 0);
}

#[test]
fn function_with_closure_by_copy() {
    let (code, _interp) = run("var f = func x { return $x * 2 }\nassert $f(21) == 42\n");
    assert_eq!(code, 0);
}

#[test]
fn runtime_error_sets_exit_code_and_continues() {
    // `$missing` raises a runtime error, but the next top-level statement
    // still runs: per-statement recovery, not whole-file abort.
    let (code, interp) = run("var ok = 0\nassert $missing\nok = 1\n");
    assert_eq!(code, 1);
    let ok = interp.scope.get("ok").unwrap();
    assert!(matches!(ok, slash_lang::value::Value::Num(v) if v == 1.0));
}

#[test]
fn repl_continuation_protocol_on_unterminated_block() {
    // Mirrors the REPL driver's line-at-a-time accumulation: an
    // unterminated `{` requests continuation rather than reporting a parse
    // error, and the full buffer parses cleanly once the closing `}` lands.
    let partial = lex("if true {\n  echo ok");
    let partial_parsed = parse(partial.tokens);
    assert!(partial_parsed.expects_continuation());

    let full = lex("if true {\n  echo ok\n}\n");
    let full_parsed = parse(full.tokens);
    assert!(full_parsed.errors.is_empty());
}
