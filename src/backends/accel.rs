//! Accelerator zone
//!
//! Models one device thread per sample: a single 32-bit lane, executed on the
//! host. The zone is only offered for selection when the `gpu` feature is
//! enabled and a wgpu adapter is present, so results computed here stand in
//! for what a device launch would produce with 32-bit arithmetic.

use std::ffi::c_char;
use std::sync::OnceLock;

use crate::bridge::ObjectiveWrapper;
use crate::config::Config;
use crate::error::ErrorCode;
use crate::objective::registrations;
use crate::zone;

single_lane_vectors!(Accel32Float, Accel32Int, f32, u32);

static AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Whether an accelerator adapter is present (probed once, then cached)
pub fn is_available() -> bool {
    *AVAILABLE.get_or_init(probe)
}

#[cfg(feature = "gpu")]
fn probe() -> bool {
    let found = pollster::block_on(async {
        let instance = wgpu::Instance::default();
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .is_some()
    });
    #[cfg(feature = "tracing")]
    tracing::debug!(found, "accelerator probe");
    found
}

#[cfg(not(feature = "gpu"))]
fn probe() -> bool {
    false
}

/// Construct the named objective for the accelerator zone
///
/// # Safety
///
/// `config` and `wrapper` must be null or valid pointers; `name..name_end`
/// must be a readable byte range, or `name` a NUL-terminated string when
/// `name_end` is null.
pub unsafe extern "C" fn create_objective_accel32(
    config: *const Config,
    name: *const c_char,
    name_end: *const c_char,
    wrapper: *mut ObjectiveWrapper,
) -> ErrorCode {
    zone::create_objective::<Accel32Float>(
        "accel32",
        &registrations::<Accel32Float>(),
        config,
        name,
        name_end,
        wrapper,
    )
}
