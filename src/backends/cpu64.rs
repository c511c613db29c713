//! Portable 64-bit CPU zone
//!
//! One lane of `f64`/`u64`. This is the reference zone: it runs on every
//! platform and is the last entry in the automatic selection order.

use std::ffi::c_char;

use crate::bridge::ObjectiveWrapper;
use crate::config::Config;
use crate::error::ErrorCode;
use crate::objective::registrations;
use crate::zone;

single_lane_vectors!(Cpu64Float, Cpu64Int, f64, u64);

/// Construct the named objective for the portable 64-bit zone
///
/// # Safety
///
/// `config` and `wrapper` must be null or valid pointers; `name..name_end`
/// must be a readable byte range, or `name` a NUL-terminated string when
/// `name_end` is null.
pub unsafe extern "C" fn create_objective_cpu64(
    config: *const Config,
    name: *const c_char,
    name_end: *const c_char,
    wrapper: *mut ObjectiveWrapper,
) -> ErrorCode {
    zone::create_objective::<Cpu64Float>(
        "cpu64",
        &registrations::<Cpu64Float>(),
        config,
        name,
        name_end,
        wrapper,
    )
}
