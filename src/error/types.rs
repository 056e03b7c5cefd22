//! Error type definitions for the bridge

use std::error::Error as StdError;
use std::fmt;

/// Broad error categories, used to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed type or routine specification; raised while building.
    Specification,
    /// A value does not fit the slot it is being encoded into.
    TypeMismatch,
    /// The native backend refused a CIF or trampoline.
    Resource,
    /// External memory or the owning library is gone.
    Liveness,
}

/// Every failure the bridge reports as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    // Specification errors
    InvalidSpec {
        message: String,
    },
    UnknownType {
        name: String,
    },
    UnknownAbi {
        name: String,
    },
    SizeLimit {
        what: String,
        size: u64,
    },
    DuplicateReturn,
    DuplicateVariadic,
    VariadicNotFinal {
        param: String,
    },
    NullAddress {
        operation: String,
    },

    // Type-mismatch errors
    TypeMismatch {
        expected: String,
        got: String,
    },
    OutOfRange {
        ty: String,
        value: String,
    },
    ArityMismatch {
        expected: usize,
        got: usize,
    },
    ArgumentError {
        param: String,
        message: String,
    },
    LayoutMismatch {
        message: String,
    },
    FieldNotFound {
        name: String,
    },
    IndexOutOfBounds {
        index: usize,
        length: usize,
    },
    VariadicPairing {
        count: usize,
    },

    // Resource errors
    CifPrep {
        operation: String,
        status: String,
    },
    ClosureAlloc {
        message: String,
    },
    LibraryNotFound {
        path: String,
    },
    SymbolNotFound {
        library: String,
        symbol: String,
    },

    // Liveness errors
    MemoryInvalidated {
        address: usize,
    },
    AlreadyInvalidated {
        address: usize,
    },
    NotExternal,
    LibraryClosed {
        library: String,
    },
    UnknownCell {
        address: usize,
    },
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::InvalidSpec { .. }
            | ErrorKind::UnknownType { .. }
            | ErrorKind::UnknownAbi { .. }
            | ErrorKind::SizeLimit { .. }
            | ErrorKind::DuplicateReturn
            | ErrorKind::DuplicateVariadic
            | ErrorKind::VariadicNotFinal { .. }
            | ErrorKind::NullAddress { .. } => ErrorCategory::Specification,
            ErrorKind::TypeMismatch { .. }
            | ErrorKind::OutOfRange { .. }
            | ErrorKind::ArityMismatch { .. }
            | ErrorKind::ArgumentError { .. }
            | ErrorKind::LayoutMismatch { .. }
            | ErrorKind::FieldNotFound { .. }
            | ErrorKind::IndexOutOfBounds { .. }
            | ErrorKind::VariadicPairing { .. } => ErrorCategory::TypeMismatch,
            ErrorKind::CifPrep { .. }
            | ErrorKind::ClosureAlloc { .. }
            | ErrorKind::LibraryNotFound { .. }
            | ErrorKind::SymbolNotFound { .. } => ErrorCategory::Resource,
            ErrorKind::MemoryInvalidated { .. }
            | ErrorKind::AlreadyInvalidated { .. }
            | ErrorKind::NotExternal
            | ErrorKind::LibraryClosed { .. }
            | ErrorKind::UnknownCell { .. } => ErrorCategory::Liveness,
        }
    }

    /// Get a human-readable description of the error
    pub fn description(&self) -> String {
        match self {
            ErrorKind::InvalidSpec { message } => format!("Spec error: {}", message),
            ErrorKind::UnknownType { name } => format!("Spec error: unknown type '{}'", name),
            ErrorKind::UnknownAbi { name } => {
                format!("Spec error: ABI '{}' is not available on this target", name)
            }
            ErrorKind::SizeLimit { what, size } => {
                format!("Spec error: {} of {} bytes exceeds the size limit", what, size)
            }
            ErrorKind::DuplicateReturn => "Spec error: return already specified".to_string(),
            ErrorKind::DuplicateVariadic => {
                "Spec error: variadic marker already specified".to_string()
            }
            ErrorKind::VariadicNotFinal { param } => format!(
                "Spec error: variadic must be the final parameter, found '{}' after it",
                param
            ),
            ErrorKind::NullAddress { operation } => {
                format!("Spec error: {} requires a non-null address", operation)
            }
            ErrorKind::TypeMismatch { expected, got } => {
                format!("Type error: expected {}, got {}", expected, got)
            }
            ErrorKind::OutOfRange { ty, value } => {
                format!("Type error: {} is out of range for {}", value, ty)
            }
            ErrorKind::ArityMismatch { expected, got } => format!(
                "Argument error: expected {} argument{}, got {}",
                expected,
                if *expected == 1 { "" } else { "s" },
                got
            ),
            ErrorKind::ArgumentError { param, message } => {
                format!("Argument error for '{}': {}", param, message)
            }
            ErrorKind::LayoutMismatch { message } => {
                format!("Layout error: {}", message)
            }
            ErrorKind::FieldNotFound { name } => format!("Field error: no field named '{}'", name),
            ErrorKind::IndexOutOfBounds { index, length } => format!(
                "Index error: index {} out of bounds for length {}",
                index, length
            ),
            ErrorKind::VariadicPairing { count } => format!(
                "Argument error: variadic routines must alternate values and type annotations, got {} items",
                count
            ),
            ErrorKind::CifPrep { operation, status } => {
                format!("FFI error in {}: libffi returned {}", operation, status)
            }
            ErrorKind::ClosureAlloc { message } => format!("FFI error in wrap_callback: {}", message),
            ErrorKind::LibraryNotFound { path } => format!("Library not found: {}", path),
            ErrorKind::SymbolNotFound { library, symbol } => {
                format!("Symbol '{}' not found in library '{}'", symbol, library)
            }
            ErrorKind::MemoryInvalidated { address } => format!(
                "Liveness error: external memory at {:#x} has been invalidated",
                address
            ),
            ErrorKind::AlreadyInvalidated { address } => format!(
                "Liveness error: external memory at {:#x} already invalidated",
                address
            ),
            ErrorKind::NotExternal => {
                "Liveness error: cannot invalidate storage owned by the bridge".to_string()
            }
            ErrorKind::LibraryClosed { library } => {
                format!("Liveness error: library '{}' is closed", library)
            }
            ErrorKind::UnknownCell { address } => {
                format!("Liveness error: no live value cell at {:#x}", address)
            }
        }
    }
}

/// Error value with optional context describing where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfiError {
    pub kind: ErrorKind,
    pub context: Option<String>,
}

impl FfiError {
    pub fn new(kind: ErrorKind) -> Self {
        FfiError {
            kind,
            context: None,
        }
    }

    /// Attach context, e.g. the field or parameter being processed.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn description(&self) -> String {
        match &self.context {
            Some(ctx) => format!("{} (in {})", self.kind.description(), ctx),
            None => self.kind.description(),
        }
    }
}

impl fmt::Display for FfiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl StdError for FfiError {}

impl From<ErrorKind> for FfiError {
    fn from(kind: ErrorKind) -> Self {
        FfiError::new(kind)
    }
}

/// Conversion from FfiError to String for hosts that report plain text
impl From<FfiError> for String {
    fn from(err: FfiError) -> String {
        err.description()
    }
}

pub type FfiResult<T> = Result<T, FfiError>;
