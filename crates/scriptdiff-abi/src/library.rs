//! Dynamically loaded consensus library.

use std::ffi::{c_int, c_uint};
use std::path::{Path, PathBuf};

use libloading::Library;
use scriptdiff_core::{
    ConsensusError, STACK_CAPACITY, Variant, Verification, Verifier, VerifierError, VerifyRequest,
};

use crate::discover::discover_library_path;
use crate::symbols::{
    VERIFY_SCRIPT, VERIFY_SCRIPT_NAME, VERIFY_SCRIPT_STACK, VERSION, VerifyScriptFn,
    VerifyScriptStackFn, VersionFn,
};

/// A loaded `libbitcoinconsensus`-compatible shared library.
pub struct ConsensusLibrary {
    lib: Library,
    path: PathBuf,
    version: Option<u32>,
    has_stack_api: bool,
}

impl std::fmt::Debug for ConsensusLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusLibrary")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("has_stack_api", &self.has_stack_api)
            .finish_non_exhaustive()
    }
}

impl ConsensusLibrary {
    /// Load the library at `path` and probe its entry points.
    pub fn load(path: &Path) -> Result<Self, VerifierError> {
        // SAFETY: Loading a dynamic library runs its initializers; the required
        // symbol is validated below before any call is made.
        let lib = unsafe { Library::new(path) }.map_err(|err| VerifierError::Load {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        // SAFETY: Symbol lookup only checks existence; the type matches the C header.
        unsafe { lib.get::<VerifyScriptFn>(VERIFY_SCRIPT) }.map_err(|err| {
            VerifierError::MissingSymbol {
                symbol: VERIFY_SCRIPT_NAME,
                message: err.to_string(),
            }
        })?;

        // SAFETY: Optional symbol probe, type matches the stack-reporting fork's header.
        let has_stack_api = unsafe { lib.get::<VerifyScriptStackFn>(VERIFY_SCRIPT_STACK).is_ok() };

        // SAFETY: Optional symbol probe; `bitcoinconsensus_version` takes no arguments.
        let version = unsafe { lib.get::<VersionFn>(VERSION).ok().map(|sym| sym()) };

        Ok(Self {
            lib,
            path: path.to_path_buf(),
            version,
            has_stack_api,
        })
    }

    /// Load the library named by `SCRIPTDIFF_CONSENSUS_LIB` / `BITCOINCONSENSUS_LIB`.
    pub fn discover() -> Result<Self, VerifierError> {
        let path = discover_library_path().ok_or(VerifierError::NotConfigured)?;
        Self::load(&path)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    #[must_use]
    pub fn has_stack_api(&self) -> bool {
        self.has_stack_api
    }

    fn verify_script(&self, request: &VerifyRequest<'_>) -> Result<Verification, VerifierError> {
        let (spk_len, tx_len) = request_lengths(request)?;
        // SAFETY: Presence was checked in `load`; the type matches the C header.
        let verify = unsafe { self.lib.get::<VerifyScriptFn>(VERIFY_SCRIPT) }.map_err(|err| {
            VerifierError::MissingSymbol {
                symbol: VERIFY_SCRIPT_NAME,
                message: err.to_string(),
            }
        })?;
        let mut err_code: c_int = 0;
        // SAFETY: Both pointers are valid for the given lengths for the duration of
        // the call and `err_code` outlives it.
        let status = unsafe {
            verify(
                request.script_pubkey.as_ptr(),
                spk_len,
                request.tx_to.as_ptr(),
                tx_len,
                request.n_in,
                request.flags.0,
                &mut err_code,
            )
        };
        Ok(Verification {
            status,
            error: ConsensusError::from_code(err_code),
            stack: None,
        })
    }

    fn verify_script_stack(
        &self,
        request: &VerifyRequest<'_>,
    ) -> Result<Verification, VerifierError> {
        if !self.has_stack_api {
            return Err(VerifierError::Unsupported {
                variant: Variant::Stack,
                library: self.path.display().to_string(),
            });
        }
        let (spk_len, tx_len) = request_lengths(request)?;
        // SAFETY: Presence was checked in `load`; the type matches the fork's header.
        let verify = unsafe { self.lib.get::<VerifyScriptStackFn>(VERIFY_SCRIPT_STACK) }
            .map_err(|err| VerifierError::MissingSymbol {
                symbol: "bitcoinconsensus_verify_script_stack",
                message: err.to_string(),
            })?;
        let mut err_code: c_int = 0;
        let mut stack = vec![0u8; STACK_CAPACITY];
        let mut stack_len: c_uint = 0;
        // SAFETY: Input pointers are valid for their lengths; `stack` holds
        // STACK_CAPACITY writable bytes, the size the C API documents for callers.
        let status = unsafe {
            verify(
                request.script_pubkey.as_ptr(),
                spk_len,
                request.tx_to.as_ptr(),
                tx_len,
                request.n_in,
                request.flags.0,
                &mut err_code,
                stack.as_mut_ptr(),
                &mut stack_len,
            )
        };
        let stack = collect_stack(stack, stack_len as usize)?;
        Ok(Verification {
            status,
            error: ConsensusError::from_code(err_code),
            stack: Some(stack),
        })
    }
}

impl Verifier for ConsensusLibrary {
    fn verify(
        &self,
        variant: Variant,
        request: &VerifyRequest<'_>,
    ) -> Result<Verification, VerifierError> {
        match variant {
            Variant::Script => self.verify_script(request),
            Variant::Stack => self.verify_script_stack(request),
        }
    }

    fn label(&self) -> String {
        format!(
            "libbitcoinconsensus:{} version={:?}",
            self.path.display(),
            self.version
        )
    }
}

fn request_lengths(request: &VerifyRequest<'_>) -> Result<(c_uint, c_uint), VerifierError> {
    Ok((
        c_len("scriptPubKey", request.script_pubkey.len())?,
        c_len("txTo", request.tx_to.len())?,
    ))
}

fn c_len(field: &'static str, len: usize) -> Result<c_uint, VerifierError> {
    c_uint::try_from(len).map_err(|_| VerifierError::LengthOverflow { field, len })
}

/// Trim the stack buffer to the reported length, refusing lengths the
/// buffer cannot hold.
fn collect_stack(mut buffer: Vec<u8>, reported: usize) -> Result<Vec<u8>, VerifierError> {
    if reported > buffer.len() {
        return Err(VerifierError::StackOverflow {
            reported,
            capacity: buffer.len(),
        });
    }
    buffer.truncate(reported);
    Ok(buffer)
}
