//! Builder methods for constructing FfiError instances

use super::types::{ErrorKind, FfiError};

impl FfiError {
    // Specification errors
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        FfiError::new(ErrorKind::InvalidSpec {
            message: message.into(),
        })
    }

    pub fn unknown_type(name: impl Into<String>) -> Self {
        FfiError::new(ErrorKind::UnknownType { name: name.into() })
    }

    pub fn unknown_abi(name: impl Into<String>) -> Self {
        FfiError::new(ErrorKind::UnknownAbi { name: name.into() })
    }

    pub fn size_limit(what: impl Into<String>, size: u64) -> Self {
        FfiError::new(ErrorKind::SizeLimit {
            what: what.into(),
            size,
        })
    }

    pub fn duplicate_return() -> Self {
        FfiError::new(ErrorKind::DuplicateReturn)
    }

    pub fn duplicate_variadic() -> Self {
        FfiError::new(ErrorKind::DuplicateVariadic)
    }

    pub fn variadic_not_final(param: impl Into<String>) -> Self {
        FfiError::new(ErrorKind::VariadicNotFinal {
            param: param.into(),
        })
    }

    pub fn null_address(operation: impl Into<String>) -> Self {
        FfiError::new(ErrorKind::NullAddress {
            operation: operation.into(),
        })
    }

    // Type errors
    pub fn type_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        FfiError::new(ErrorKind::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        })
    }

    pub fn out_of_range(ty: impl Into<String>, value: impl ToString) -> Self {
        FfiError::new(ErrorKind::OutOfRange {
            ty: ty.into(),
            value: value.to_string(),
        })
    }

    pub fn arity_mismatch(expected: usize, got: usize) -> Self {
        FfiError::new(ErrorKind::ArityMismatch { expected, got })
    }

    pub fn argument_error(param: impl Into<String>, message: impl Into<String>) -> Self {
        FfiError::new(ErrorKind::ArgumentError {
            param: param.into(),
            message: message.into(),
        })
    }

    pub fn layout_mismatch(message: impl Into<String>) -> Self {
        FfiError::new(ErrorKind::LayoutMismatch {
            message: message.into(),
        })
    }

    pub fn field_not_found(name: impl Into<String>) -> Self {
        FfiError::new(ErrorKind::FieldNotFound { name: name.into() })
    }

    pub fn index_out_of_bounds(index: usize, length: usize) -> Self {
        FfiError::new(ErrorKind::IndexOutOfBounds { index, length })
    }

    pub fn variadic_pairing(count: usize) -> Self {
        FfiError::new(ErrorKind::VariadicPairing { count })
    }

    // Resource errors
    pub fn cif_prep(operation: impl Into<String>, status: impl Into<String>) -> Self {
        FfiError::new(ErrorKind::CifPrep {
            operation: operation.into(),
            status: status.into(),
        })
    }

    pub fn closure_alloc(message: impl Into<String>) -> Self {
        FfiError::new(ErrorKind::ClosureAlloc {
            message: message.into(),
        })
    }

    pub fn library_not_found(path: impl Into<String>) -> Self {
        FfiError::new(ErrorKind::LibraryNotFound { path: path.into() })
    }

    pub fn symbol_not_found(library: impl Into<String>, symbol: impl Into<String>) -> Self {
        FfiError::new(ErrorKind::SymbolNotFound {
            library: library.into(),
            symbol: symbol.into(),
        })
    }

    // Liveness errors
    pub fn memory_invalidated(address: usize) -> Self {
        FfiError::new(ErrorKind::MemoryInvalidated { address })
    }

    pub fn already_invalidated(address: usize) -> Self {
        FfiError::new(ErrorKind::AlreadyInvalidated { address })
    }

    pub fn not_external() -> Self {
        FfiError::new(ErrorKind::NotExternal)
    }

    pub fn library_closed(library: impl Into<String>) -> Self {
        FfiError::new(ErrorKind::LibraryClosed {
            library: library.into(),
        })
    }

    pub fn unknown_cell(address: usize) -> Self {
        FfiError::new(ErrorKind::UnknownCell { address })
    }
}
