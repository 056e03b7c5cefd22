//! # ffi-bridge - calling native code from a dynamic host
//!
//! A host runtime with its own value model uses this crate to call native
//! functions, lay out native structs and hand host closures to native code
//! as function pointers.
//!
//! ## Quick Start
//!
//! ```
//! use ffi_bridge::{FieldSchema, FieldSpec, Instance, PrimType, Value};
//!
//! let schema = FieldSchema::build(&[
//!     FieldSpec::new("a", PrimType::Int32),
//!     FieldSpec::new("b", PrimType::Int8).array(3),
//! ])
//! .unwrap();
//! assert_eq!(schema.total_size(), 7);
//!
//! let point = Instance::with_values(schema, &[("a", Value::Int(300000))]).unwrap();
//! let a: Value = point.get("a").unwrap();
//! assert_eq!(a, Value::Int(300000));
//! ```
//!
//! ## Architecture
//!
//! 1. **Schema** - packed struct layouts with a libffi descriptor
//! 2. **Marshal** - host values to native bytes and back
//! 3. **Cif** - prepared call interfaces, fixed or per call
//! 4. **Routine** - bound entry points, outbound calls and callbacks
//!
//! Hosts plug in through [`HostValue`]; [`Value`] is a ready-made
//! implementation.

pub mod abi;
pub mod call;
pub mod callback;
pub mod cell;
pub mod cif;
pub mod error;
pub mod instance;
pub mod loader;
pub mod logging;
pub mod marshal;
pub mod memory;
pub mod routine;
pub mod schema;
pub mod signature;
pub mod types;
pub mod value;

pub use abi::Abi;
pub use call::{pair_stream, StreamItem};
pub use callback::CallbackFailure;
pub use cell::{
    alloc_value_pointer, free_value_pointer, get_at_pointer, is_value_pointer, set_at_pointer,
};
pub use cif::CallInterface;
pub use error::{fatal, ErrorCategory, ErrorKind, FfiError, FfiResult};
pub use instance::Instance;
pub use loader::{Library, NativeLibrary};
pub use memory::MemoryOwner;
pub use routine::{Origin, Routine};
pub use schema::{FieldSchema, FieldSpec, FieldType, StructLayout, TypeSpec, ValueType};
pub use signature::{Param, RoutineType, Signature, SpecItem};
pub use types::PrimType;
pub use value::{Category, HostClosure, HostValue, Value};
