//! Unified error system for the bridge
//!
//! Every fallible operation returns [`FfiResult`]. The only failure that is
//! not a value is a callback whose host closure does not return normally;
//! that path goes through [`fatal`] and never comes back.

mod builders;
mod types;

pub use types::{ErrorCategory, ErrorKind, FfiError, FfiResult};

/// Report an unrecoverable failure and abort the process.
///
/// Used where no unwind path exists, i.e. inside a native callback frame.
pub fn fatal(message: &str) -> ! {
    tracing::error!(event = "fatal", message = %message);
    eprintln!("ffi-bridge: fatal: {}", message);
    std::process::abort()
}
