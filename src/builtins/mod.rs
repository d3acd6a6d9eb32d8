//! Builtins: `which`, `cd`, `vars`, `exit`, `read`, `.`, `time`.
//!
//! This is exactly the original's builtin table
//! (`original_source/src/builtin/which.c`'s `builtins[]`) — no additional
//! bash-isms are added.

use crate::errors::{RuntimeError, Signal};
use crate::eval::Interpreter;
use crate::value::Value;
use std::time::Instant;

type R<T> = Result<T, Signal>;

pub const BUILTIN_NAMES: &[&str] = &["which", "cd", "vars", "exit", "read", ".", "time"];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

pub fn dispatch(interp: &mut Interpreter, name: &str, args: &[String], line: usize) -> R<i32> {
    match name {
        "which" => which(interp, args, line),
        "cd" => cd(interp, args, line),
        "vars" => vars(interp, args),
        "exit" => exit(args),
        "read" => read(interp, args, line),
        "." => dot(interp, args, line),
        "time" => time(interp, args, line),
        _ => unreachable!("dispatch called for non-builtin {name}"),
    }
}

/// PATH search matching `which()`/`which_internal()` in the original: an
/// absolute path is returned as-is with no existence check at this layer; a
/// bare name is searched across `$PATH` entries for an executable regular
/// file.
pub fn resolve_on_path(interp: &Interpreter, cmd: &str, line: usize) -> R<Option<String>> {
    if cmd.starts_with('/') {
        return Ok(Some(cmd.to_string()));
    }
    let path_var = interp
        .scope
        .get("PATH")
        .and_then(|v| v.as_str_text())
        .ok_or_else(|| Signal::Runtime(RuntimeError::new("PATH is not a str", line)))?;
    for dir in path_var.split(':') {
        if dir.is_empty() {
            continue;
        }
        let candidate = std::path::Path::new(dir).join(cmd);
        if let Ok(meta) = std::fs::metadata(&candidate) {
            if meta.is_file() {
                use std::os::unix::fs::PermissionsExt;
                if meta.permissions().mode() & 0o111 != 0 {
                    return Ok(Some(candidate.to_string_lossy().into_owned()));
                }
            }
        }
    }
    Ok(None)
}

fn which(interp: &mut Interpreter, args: &[String], line: usize) -> R<i32> {
    let Some(name) = args.first() else {
        interp.stream.write_err("which: expected one argument\n");
        return Ok(1);
    };
    if is_builtin(name) {
        interp.stream.write_out(&format!("{name}: slash builtin\n"));
        return Ok(0);
    }
    match resolve_on_path(interp, name, line)? {
        Some(path) => {
            interp.stream.write_out(&format!("{path}\n"));
            Ok(0)
        }
        None => {
            interp.stream.write_out(&format!("{name} not found\n"));
            Ok(1)
        }
    }
}

fn cd(interp: &mut Interpreter, args: &[String], line: usize) -> R<i32> {
    let target = match args.first() {
        Some(p) => p.clone(),
        None => interp
            .scope
            .get("HOME")
            .and_then(|v| v.as_str_text())
            .unwrap_or_else(|| "/".to_string()),
    };
    match std::env::set_current_dir(&target) {
        Ok(()) => {
            let old_cwd = interp.scope.get("PWD").and_then(|v| v.as_str_text()).unwrap_or_default();
            let new_cwd = std::env::current_dir().map(|p| p.to_string_lossy().into_owned()).unwrap_or(target);
            interp.global.force_define("OLDPWD", Value::new_str(&mut interp.gc, old_cwd));
            interp.global.force_define("PWD", Value::new_str(&mut interp.gc, new_cwd));
            Ok(0)
        }
        Err(e) => {
            interp.stream.write_err(&format!("cd: {target}: {e}\n"));
            let _ = line;
            Ok(1)
        }
    }
}

fn vars(interp: &mut Interpreter, _args: &[String]) -> R<i32> {
    let mut out = String::new();
    for v in interp.scope.chain_named_values() {
        out.push_str(&format!("{} = {}\n", v.0, crate::value::ops::print_string(&v.1)));
    }
    interp.stream.write_out(&out);
    Ok(0)
}

fn exit(args: &[String]) -> R<i32> {
    let code = args.first().and_then(|s| s.parse::<i32>().ok()).unwrap_or(0);
    Err(Signal::Exit(code))
}

fn read(interp: &mut Interpreter, args: &[String], line: usize) -> R<i32> {
    use std::io::BufRead;
    let var_name = args.first().cloned().unwrap_or_else(|| "REPLY".to_string());
    let stdin = std::io::stdin();
    let mut line_buf = String::new();
    let n = stdin.lock().read_line(&mut line_buf).unwrap_or(0);
    if n == 0 {
        return Ok(1);
    }
    if line_buf.ends_with('\n') {
        line_buf.pop();
    }
    let value = Value::new_str(&mut interp.gc, line_buf);
    interp.global.force_define(&var_name, value);
    let _ = line;
    Ok(0)
}

fn dot(interp: &mut Interpreter, args: &[String], line: usize) -> R<i32> {
    let Some(path) = args.first() else {
        interp.stream.write_err(". : expected a file path\n");
        return Ok(1);
    };
    let source = std::fs::read_to_string(path)
        .map_err(|e| Signal::Runtime(RuntimeError::new(format!("Cannot read '{path}': {e}"), line)))?;
    let lexed = crate::lexer::lex(&source);
    if lexed.had_error {
        for e in &lexed.errors {
            interp.stream.write_err(&format!("{e}\n"));
        }
        return Ok(1);
    }
    let parsed = crate::parser::parse(lexed.tokens);
    if !parsed.errors.is_empty() {
        for e in &parsed.errors {
            interp.stream.write_err(&format!("[line {}]: {}\n", e.line, e.message));
        }
        return Ok(1);
    }
    for stmt in &parsed.statements {
        interp.exec_top(stmt)?;
    }
    Ok(0)
}

fn time(interp: &mut Interpreter, args: &[String], line: usize) -> R<i32> {
    if args.is_empty() {
        interp.stream.write_err("time: expected a command\n");
        return Ok(1);
    }
    let mut usage_before: libc::rusage = unsafe { std::mem::zeroed() };
    unsafe {
        libc::getrusage(libc::RUSAGE_SELF, &mut usage_before);
    }
    let start = Instant::now();
    let status = std::process::Command::new(&args[0])
        .args(&args[1..])
        .status();
    let elapsed = start.elapsed();
    let mut usage_after: libc::rusage = unsafe { std::mem::zeroed() };
    unsafe {
        libc::getrusage(libc::RUSAGE_SELF, &mut usage_after);
    }
    let user = tv_diff(usage_before.ru_utime, usage_after.ru_utime);
    let sys = tv_diff(usage_before.ru_stime, usage_after.ru_stime);
    interp.stream.write_err(&format!(
        "real {:.3}s\nuser {:.3}s\nsys  {:.3}s\n",
        elapsed.as_secs_f64(),
        user,
        sys
    ));
    match status {
        Ok(s) => Ok(s.code().unwrap_or(1)),
        Err(e) => {
            interp.stream.write_err(&format!("time: {e}\n"));
            let _ = line;
            Ok(127)
        }
    }
}

fn tv_diff(a: libc::timeval, b: libc::timeval) -> f64 {
    let a = a.tv_sec as f64 + a.tv_usec as f64 / 1_000_000.0;
    let b = b.tv_sec as f64 + b.tv_usec as f64 / 1_000_000.0;
    b - a
}
