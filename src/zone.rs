//! Glue between the flat bridge and the generic kernels
//!
//! A zone factory looks the requested name up in the zone's registration
//! table, constructs the objective on the heap and fills the
//! [`ObjectiveWrapper`] with `extern "C"` trampolines. The trampolines recover
//! the zone-private [`FunctionPointers`] table from the wrapper and forward to
//! the kernels monomorphized for that zone and objective.

use std::alloc::{self, Layout};
use std::ffi::{c_char, c_void, CStr};
use std::mem;

use crate::backends::{SimdFloat, UIntOf};
use crate::bridge::{
    initialize_objective_wrapper, ApplyUpdateBridge, BinSumsBoostingBridge,
    BinSumsInteractionBridge, ObjectiveWrapper,
};
use crate::config::Config;
use crate::error::ErrorCode;
use crate::kernels;
use crate::objective::{MultiScoreObjective, Objective, Registration, SingleScoreObjective};

type ApplyUpdateEntry = unsafe fn(*const c_void, &mut ApplyUpdateBridge) -> ErrorCode;

/// Zone-private dispatch table referenced by `ObjectiveWrapper::function_pointers`
pub(crate) struct FunctionPointers {
    apply_update: ApplyUpdateEntry,
    finish_metric: unsafe fn(*const c_void, f64) -> f64,
    check_targets: unsafe fn(*const c_void, usize, *const c_void) -> bool,
    bin_sums_boosting: unsafe fn(&mut BinSumsBoostingBridge) -> ErrorCode,
    bin_sums_interaction: unsafe fn(&mut BinSumsInteractionBridge) -> ErrorCode,
    pub(crate) release_objective: unsafe fn(*mut c_void),
}

/// Heap-allocate `value`, reporting allocation failure instead of aborting
///
/// The result is compatible with `Box::from_raw`.
fn try_box<T>(value: T) -> Result<*mut T, ErrorCode> {
    let layout = Layout::new::<T>();
    if layout.size() == 0 {
        return Ok(Box::into_raw(Box::new(value)));
    }
    // SAFETY: layout has non-zero size
    let ptr = unsafe { alloc::alloc(layout) }.cast::<T>();
    if ptr.is_null() {
        return Err(ErrorCode::OutOfMemory);
    }
    // SAFETY: ptr is freshly allocated with T's layout
    unsafe { ptr.write(value) };
    Ok(ptr)
}

unsafe fn release<O>(objective: *mut c_void) {
    drop(Box::from_raw(objective.cast::<O>()));
}

unsafe fn finish_metric<F: SimdFloat, O: Objective<F>>(objective: *const c_void, metric: f64) -> f64 {
    (*objective.cast::<O>()).finish_metric(metric)
}

unsafe fn check_targets<F: SimdFloat, O: Objective<F>>(
    objective: *const c_void,
    c_samples: usize,
    targets: *const c_void,
) -> bool {
    if c_samples == 0 {
        return true;
    }
    if targets.is_null() {
        return false;
    }
    let targets = std::slice::from_raw_parts(targets.cast::<O::TargetScalar>(), c_samples);
    (*objective.cast::<O>()).check_targets(targets)
}

unsafe fn apply_update_single<F: SimdFloat, O: SingleScoreObjective<F>>(
    objective: *const c_void,
    data: &mut ApplyUpdateBridge,
) -> ErrorCode {
    let objective = &*objective.cast::<O>();
    F::vectorize(|| kernels::apply_update_single::<F, O>(objective, data))
}

unsafe fn apply_update_multi<F: SimdFloat, O: MultiScoreObjective<F>>(
    objective: *const c_void,
    data: &mut ApplyUpdateBridge,
) -> ErrorCode {
    let objective = &*objective.cast::<O>();
    F::vectorize(|| kernels::apply_update_multi::<F, O>(objective, data))
}

unsafe fn bin_sums_boosting<F: SimdFloat>(params: &mut BinSumsBoostingBridge) -> ErrorCode {
    F::vectorize(|| kernels::bin_sums_boosting::<F>(params))
}

unsafe fn bin_sums_interaction<F: SimdFloat>(params: &mut BinSumsInteractionBridge) -> ErrorCode {
    F::vectorize(|| kernels::bin_sums_interaction::<F>(params))
}

/// Table of a live wrapper, or `None` for an all-null one
unsafe fn table<'a, F: SimdFloat>(wrapper: *const ObjectiveWrapper) -> Option<&'a FunctionPointers> {
    let wrapper = wrapper.as_ref()?;
    debug_assert_eq!(wrapper.simd_pack, F::LANES, "wrapper driven by the wrong zone");
    wrapper.function_pointers.cast::<FunctionPointers>().cast_const().as_ref()
}

unsafe extern "C" fn apply_update_c<F: SimdFloat>(
    wrapper: *const ObjectiveWrapper,
    data: *mut ApplyUpdateBridge,
) -> ErrorCode {
    match (table::<F>(wrapper), data.as_mut()) {
        (Some(table), Some(data)) => (table.apply_update)((*wrapper).objective, data),
        _ => ErrorCode::IllegalParamVal,
    }
}

unsafe extern "C" fn finish_metric_c<F: SimdFloat>(wrapper: *const ObjectiveWrapper, metric: f64) -> f64 {
    match table::<F>(wrapper) {
        Some(table) => (table.finish_metric)((*wrapper).objective, metric),
        None => f64::NAN,
    }
}

unsafe extern "C" fn check_targets_c<F: SimdFloat>(
    wrapper: *const ObjectiveWrapper,
    c_samples: usize,
    targets: *const c_void,
) -> bool {
    match table::<F>(wrapper) {
        Some(table) => (table.check_targets)((*wrapper).objective, c_samples, targets),
        None => false,
    }
}

unsafe extern "C" fn bin_sums_boosting_c<F: SimdFloat>(
    wrapper: *const ObjectiveWrapper,
    params: *mut BinSumsBoostingBridge,
) -> ErrorCode {
    match (table::<F>(wrapper), params.as_mut()) {
        (Some(table), Some(params)) => (table.bin_sums_boosting)(params),
        _ => ErrorCode::IllegalParamVal,
    }
}

unsafe extern "C" fn bin_sums_interaction_c<F: SimdFloat>(
    wrapper: *const ObjectiveWrapper,
    params: *mut BinSumsInteractionBridge,
) -> ErrorCode {
    match (table::<F>(wrapper), params.as_mut()) {
        (Some(table), Some(params)) => (table.bin_sums_interaction)(params),
        _ => ErrorCode::IllegalParamVal,
    }
}

fn install<F: SimdFloat, O: Objective<F>>(
    objective: O,
    apply_update: ApplyUpdateEntry,
    wrapper: &mut ObjectiveWrapper,
) -> ErrorCode {
    let table = FunctionPointers {
        apply_update,
        finish_metric: finish_metric::<F, O>,
        check_targets: check_targets::<F, O>,
        bin_sums_boosting: bin_sums_boosting::<F>,
        bin_sums_interaction: bin_sums_interaction::<F>,
        release_objective: release::<O>,
    };
    let adjustments = objective.adjustments();
    let has_hessian = objective.has_hessian();
    let link_param = objective.link_param();
    let gradient_constant = objective.gradient_constant();
    let hessian_constant = objective.hessian_constant();

    let table = match try_box(table) {
        Ok(table) => table,
        Err(code) => return code,
    };
    let objective = match try_box(objective) {
        Ok(objective) => objective,
        Err(code) => {
            // SAFETY: allocated by try_box above and not shared
            drop(unsafe { Box::from_raw(table) });
            return code;
        }
    };

    wrapper.apply_update = Some(apply_update_c::<F>);
    wrapper.finish_metric = Some(finish_metric_c::<F>);
    wrapper.check_targets = Some(check_targets_c::<F>);
    wrapper.bin_sums_boosting = Some(bin_sums_boosting_c::<F>);
    wrapper.bin_sums_interaction = Some(bin_sums_interaction_c::<F>);
    wrapper.objective = objective.cast();
    wrapper.function_pointers = table.cast();

    wrapper.maximize_metric = O::MAXIMIZE_METRIC;
    wrapper.link_function = O::LINK;
    wrapper.link_param = link_param;
    wrapper.learning_rate_adjustment_differential_privacy = adjustments.learning_rate_differential_privacy;
    wrapper.learning_rate_adjustment_gradient_boosting = adjustments.learning_rate_gradient_boosting;
    wrapper.learning_rate_adjustment_hessian_boosting = adjustments.learning_rate_hessian_boosting;
    wrapper.gain_adjustment_gradient_boosting = adjustments.gain_gradient_boosting;
    wrapper.gain_adjustment_hessian_boosting = adjustments.gain_hessian_boosting;
    wrapper.gradient_constant = gradient_constant;
    wrapper.hessian_constant = hessian_constant;
    wrapper.objective_has_hessian = has_hessian;
    wrapper.rmse = O::IS_RMSE;
    wrapper.simd_pack = F::LANES;
    wrapper.float_bytes = mem::size_of::<F::T>();
    wrapper.uint_bytes = mem::size_of::<UIntOf<F>>();
    ErrorCode::None
}

/// Install a single-score objective into `wrapper`
pub(crate) fn install_single<F: SimdFloat, O: SingleScoreObjective<F>>(
    objective: O,
    wrapper: &mut ObjectiveWrapper,
) -> ErrorCode {
    install::<F, O>(objective, apply_update_single::<F, O>, wrapper)
}

/// Install a multi-score objective into `wrapper`
pub(crate) fn install_multi<F: SimdFloat, O: MultiScoreObjective<F>>(
    objective: O,
    wrapper: &mut ObjectiveWrapper,
) -> ErrorCode {
    install::<F, O>(objective, apply_update_multi::<F, O>, wrapper)
}

/// Objective name between `name` and `name_end` (or up to NUL when `name_end` is null)
unsafe fn read_name<'a>(name: *const c_char, name_end: *const c_char) -> Option<&'a [u8]> {
    if name.is_null() {
        return None;
    }
    if name_end.is_null() {
        return Some(CStr::from_ptr(name).to_bytes());
    }
    let len = usize::try_from(name_end.offset_from(name)).ok()?;
    Some(std::slice::from_raw_parts(name.cast::<u8>(), len))
}

/// Shared body of every zone factory
///
/// On any failure the wrapper is left all-null.
///
/// # Safety
///
/// `config` and `wrapper` must be null or valid; `name..name_end` must be a
/// readable byte range (or a NUL-terminated string when `name_end` is null).
#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
pub(crate) unsafe fn create_objective<F: SimdFloat>(
    zone: &str,
    registrations: &[Registration],
    config: *const Config,
    name: *const c_char,
    name_end: *const c_char,
    wrapper: *mut ObjectiveWrapper,
) -> ErrorCode {
    if wrapper.is_null() {
        return ErrorCode::IllegalParamVal;
    }
    initialize_objective_wrapper(wrapper);
    let wrapper = &mut *wrapper;

    let Some(config) = config.as_ref() else {
        return ErrorCode::IllegalParamVal;
    };
    let Some(name) = read_name(name, name_end) else {
        return ErrorCode::IllegalParamVal;
    };
    let Ok(name) = std::str::from_utf8(name) else {
        return ErrorCode::UnknownIdentifier;
    };
    let name = name.trim();

    let Some(registration) = registrations.iter().find(|r| r.matches(name)) else {
        #[cfg(feature = "tracing")]
        tracing::debug!(zone, name, "objective not registered");
        return ErrorCode::UnknownIdentifier;
    };

    let code = (registration.create)(config, wrapper);
    if !code.is_ok() {
        #[cfg(feature = "tracing")]
        tracing::debug!(zone, name, ?code, "objective construction failed");
        crate::bridge::free_objective_wrapper_internals(wrapper);
        return code;
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(zone, name, lanes = F::LANES, "objective created");
    ErrorCode::None
}
