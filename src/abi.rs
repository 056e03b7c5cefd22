//! Calling conventions.

use crate::error::{FfiError, FfiResult};
use libffi::raw;
use std::fmt;

/// A calling convention a routine can be bound with.
///
/// Only conventions libffi supports on the build target resolve to a raw
/// ABI; the rest are rejected when a routine is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Abi {
    #[default]
    Default,
    Unix64,
    Win64,
    Sysv,
    Vfp,
    Stdcall,
    Fastcall,
    Thiscall,
    MsCdecl,
}

impl Abi {
    /// Parse an ABI word such as `"default"`, `"win64"` or `"ms-cdecl"`.
    pub fn from_keyword(word: &str) -> FfiResult<Abi> {
        let abi = match word {
            "default" => Abi::Default,
            "unix64" => Abi::Unix64,
            "win64" => Abi::Win64,
            "sysv" => Abi::Sysv,
            "vfp" => Abi::Vfp,
            "stdcall" => Abi::Stdcall,
            "fastcall" => Abi::Fastcall,
            "thiscall" => Abi::Thiscall,
            "ms-cdecl" => Abi::MsCdecl,
            _ => return Err(FfiError::unknown_abi(word)),
        };
        abi.to_raw()?;
        Ok(abi)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Abi::Default => "default",
            Abi::Unix64 => "unix64",
            Abi::Win64 => "win64",
            Abi::Sysv => "sysv",
            Abi::Vfp => "vfp",
            Abi::Stdcall => "stdcall",
            Abi::Fastcall => "fastcall",
            Abi::Thiscall => "thiscall",
            Abi::MsCdecl => "ms-cdecl",
        }
    }

    /// The libffi ABI constant, if this target has one.
    pub fn to_raw(self) -> FfiResult<raw::ffi_abi> {
        match self {
            Abi::Default => Ok(raw::ffi_abi_FFI_DEFAULT_ABI),
            #[cfg(target_arch = "x86_64")]
            Abi::Unix64 => Ok(raw::ffi_abi_FFI_UNIX64),
            #[cfg(target_arch = "x86_64")]
            Abi::Win64 => Ok(raw::ffi_abi_FFI_WIN64),
            #[cfg(any(target_arch = "x86", target_arch = "arm", target_arch = "aarch64"))]
            Abi::Sysv => Ok(raw::ffi_abi_FFI_SYSV),
            #[cfg(target_arch = "arm")]
            Abi::Vfp => Ok(raw::ffi_abi_FFI_VFP),
            #[cfg(target_arch = "x86")]
            Abi::Stdcall => Ok(raw::ffi_abi_FFI_STDCALL),
            #[cfg(target_arch = "x86")]
            Abi::Fastcall => Ok(raw::ffi_abi_FFI_FASTCALL),
            #[cfg(target_arch = "x86")]
            Abi::Thiscall => Ok(raw::ffi_abi_FFI_THISCALL),
            #[cfg(target_arch = "x86")]
            Abi::MsCdecl => Ok(raw::ffi_abi_FFI_MS_CDECL),
            #[allow(unreachable_patterns)]
            other => Err(FfiError::unknown_abi(other.keyword())),
        }
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}
