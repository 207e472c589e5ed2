//! C signatures of the consensus library entry points.

use std::ffi::{c_int, c_uint};

pub(crate) const VERIFY_SCRIPT: &[u8] = b"bitcoinconsensus_verify_script\0";
pub(crate) const VERIFY_SCRIPT_STACK: &[u8] = b"bitcoinconsensus_verify_script_stack\0";
pub(crate) const VERSION: &[u8] = b"bitcoinconsensus_version\0";

pub(crate) const VERIFY_SCRIPT_NAME: &str = "bitcoinconsensus_verify_script";

/// `int bitcoinconsensus_verify_script(const unsigned char *scriptPubKey,
/// unsigned int scriptPubKeyLen, const unsigned char *txTo, unsigned int txToLen,
/// unsigned int nIn, unsigned int flags, bitcoinconsensus_error* err)`
pub(crate) type VerifyScriptFn = unsafe extern "C" fn(
    *const u8,
    c_uint,
    *const u8,
    c_uint,
    c_uint,
    c_uint,
    *mut c_int,
) -> c_int;

/// Same as [`VerifyScriptFn`] plus `unsigned char *stack, unsigned int *stackSize`.
/// The callee writes the final stack into a caller-owned buffer.
pub(crate) type VerifyScriptStackFn = unsafe extern "C" fn(
    *const u8,
    c_uint,
    *const u8,
    c_uint,
    c_uint,
    c_uint,
    *mut c_int,
    *mut u8,
    *mut c_uint,
) -> c_int;

pub(crate) type VersionFn = unsafe extern "C" fn() -> c_uint;
