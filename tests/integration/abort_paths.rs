// Callback failures must abort the process. Each case runs in a child copy
// of this test binary selected by an environment variable.

use ffi_bridge::{Abi, Param, PrimType, Routine, Signature, Value};
use std::process::{Command, Output};

const CASE_VAR: &str = "FFI_BRIDGE_ABORT_CASE";

fn int_callback(
    closure: impl Fn(&[Value]) -> Result<Value, String> + 'static,
) -> Routine<Value> {
    Routine::wrap_callback(
        closure,
        Signature::new(
            vec![Param::new("n", PrimType::Int32)],
            Some(PrimType::Int32.into()),
        ),
        Abi::Default,
    )
    .unwrap()
}

fn run_case(case: &str) {
    match case {
        "closure-error" => {
            let cb = int_callback(|_| Err("refused".to_string()));
            let _ = cb.call(&[Value::Int(1)]);
        }
        "closure-panic" => {
            let cb = int_callback(|_| panic!("exploded"));
            let _ = cb.call(&[Value::Int(1)]);
        }
        "foreign-thread" => {
            let cb = int_callback(|args| Ok(args[0].clone()));
            let entry = cb.address();
            let handle = std::thread::spawn(move || {
                let f: extern "C" fn(i32) -> i32 = unsafe { std::mem::transmute(entry) };
                f(5)
            });
            let _ = handle.join();
        }
        "same-thread" => {
            let cb = int_callback(|args| Ok(args[0].clone()));
            let f: extern "C" fn(i32) -> i32 = unsafe { std::mem::transmute(cb.address()) };
            assert_eq!(f(5), 5);
            return;
        }
        other => panic!("unknown case {}", other),
    }
    eprintln!("case {} returned without aborting", case);
}

#[test]
fn abort_child() {
    if let Ok(case) = std::env::var(CASE_VAR) {
        run_case(&case);
    }
}

fn spawn(case: &str) -> Output {
    Command::new(std::env::current_exe().unwrap())
        .args([
            "--exact",
            "integration::abort_paths::abort_child",
            "--test-threads=1",
            "--nocapture",
        ])
        .env(CASE_VAR, case)
        .output()
        .unwrap()
}

#[cfg(unix)]
fn assert_aborted(output: &Output, message: &str) {
    use std::os::unix::process::ExitStatusExt;
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.signal(), Some(libc::SIGABRT), "stderr: {}", stderr);
    assert!(stderr.contains("ffi-bridge: fatal:"), "stderr: {}", stderr);
    assert!(stderr.contains(message), "stderr: {}", stderr);
}

#[cfg(unix)]
#[test]
fn closure_error_aborts() {
    assert_aborted(&spawn("closure-error"), "callback closure failed: refused");
}

#[cfg(unix)]
#[test]
fn closure_panic_aborts() {
    assert_aborted(&spawn("closure-panic"), "callback closure panicked: exploded");
}

#[cfg(unix)]
#[test]
fn foreign_thread_aborts() {
    assert_aborted(&spawn("foreign-thread"), "callback invoked from a foreign thread");
}

#[test]
fn owning_thread_runs_normally() {
    let output = spawn("same-thread");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
}
