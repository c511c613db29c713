//! Flat data structures shared by every compute zone
//!
//! Everything here is `#[repr(C)]` and made of plain data, raw pointers and
//! `extern "C"` function pointers, so a zone compiled with one instruction set
//! can be driven by a caller compiled with another. The caller owns every
//! buffer referenced by a bridge; zones only borrow them for one call.
//!
//! # Buffer layouts
//!
//! With `L` lanes and `S` scores per sample:
//!
//! - sample scores: `[(b * S + k) * L + l]` for lane group `b`, score `k`, lane `l`
//! - gradients: `[((b * S + k) * H) * L + l]` where `H` is 2 with hessians, else 1;
//!   the hessian of the same element sits `L` slots later
//! - targets, weights, occurrence counts: one element per sample, contiguous
//! - packed bin indexes: see [`crate::pack`]

use std::ffi::c_void;
use std::ptr;

use crate::config::Config;
use crate::error::ErrorCode;
use crate::zone::FunctionPointers;

/// Sentinel for "no packed indexes": every sample maps to bin/tensor index 0
pub const ITEMS_PER_BIT_PACK_NONE: isize = -1;

/// Maximum number of features in an interaction bin sum
pub const MAX_DIMENSIONS: usize = 30;

/// Inverse link function reported by an objective
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Link {
    /// No objective installed
    Error = 0,
    /// `score`
    Identity = 1,
    /// Binary logistic
    Logit = 2,
    /// Multinomial logistic (softmax)
    Mlogit = 3,
    /// Exponential of the score
    Log = 4,
}

/// Parameters of one apply-update call
///
/// Adds the update tensor entry selected by each sample's packed index to its
/// score, then optionally writes gradients (and hessians) and accumulates the
/// objective metric into `metric_out`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ApplyUpdateBridge {
    /// Scores per sample
    pub c_scores: usize,
    /// Packed items per word, or [`ITEMS_PER_BIT_PACK_NONE`]
    pub c_pack: isize,
    /// Write hessians after gradients
    pub hessian_needed: bool,
    /// Accumulate the metric into `metric_out`
    pub calc_metric: bool,
    /// Scratch of `c_scores * lanes` floats for multi-score objectives
    pub multiscore_temp: *mut c_void,
    /// Update tensor, `c_scores` floats per tensor bin
    pub update_tensor_scores: *const c_void,
    /// Sample count, a multiple of the zone's lane count
    pub c_samples: usize,
    /// Packed tensor indexes
    pub packed: *const c_void,
    /// Targets (float for regression, uint for classification)
    pub targets: *const c_void,
    /// Optional sample weights
    pub weights: *const c_void,
    /// Sample scores, updated in place
    pub sample_scores: *mut c_void,
    /// Optional gradient/hessian output; null skips gradient computation
    pub gradients_and_hessians: *mut c_void,
    /// Metric sum over all samples (unaveraged)
    pub metric_out: f64,
}

impl Default for ApplyUpdateBridge {
    fn default() -> Self {
        Self {
            c_scores: 1,
            c_pack: ITEMS_PER_BIT_PACK_NONE,
            hessian_needed: false,
            calc_metric: false,
            multiscore_temp: ptr::null_mut(),
            update_tensor_scores: ptr::null(),
            c_samples: 0,
            packed: ptr::null(),
            targets: ptr::null(),
            weights: ptr::null(),
            sample_scores: ptr::null_mut(),
            gradients_and_hessians: ptr::null_mut(),
            metric_out: 0.0,
        }
    }
}

/// Parameters of one boosting bin-sum call (single feature)
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BinSumsBoostingBridge {
    /// Gradients are interleaved with hessians
    pub hessian: bool,
    /// Scores per sample
    pub c_scores: usize,
    /// Packed items per word, or [`ITEMS_PER_BIT_PACK_NONE`]
    pub c_pack: isize,
    /// Sample count, a multiple of the zone's lane count
    pub c_samples: usize,
    /// Gradients (and hessians) in the interleaved layout
    pub gradients_and_hessians: *const c_void,
    /// Optional sample weights
    pub weights: *const c_void,
    /// Optional per-sample occurrence counts (one byte each)
    pub count_occurrences: *const u8,
    /// Packed bin indexes
    pub packed: *const c_void,
    /// Bin storage, accumulated into (not cleared)
    pub bins: *mut c_void,
    /// One past the end of `bins`; only consulted by debug builds
    pub debug_bins_end: *const c_void,
}

impl Default for BinSumsBoostingBridge {
    fn default() -> Self {
        Self {
            hessian: false,
            c_scores: 1,
            c_pack: ITEMS_PER_BIT_PACK_NONE,
            c_samples: 0,
            gradients_and_hessians: ptr::null(),
            weights: ptr::null(),
            count_occurrences: ptr::null(),
            packed: ptr::null(),
            bins: ptr::null_mut(),
            debug_bins_end: ptr::null(),
        }
    }
}

/// Parameters of one interaction bin-sum call (up to [`MAX_DIMENSIONS`] features)
///
/// The bin of a sample is the row-major flat index
/// `sum(idx[d] * prod(bins_per_dim[e] for e < d))`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BinSumsInteractionBridge {
    /// Gradients are interleaved with hessians
    pub hessian: bool,
    /// Scores per sample
    pub c_scores: usize,
    /// Sample count, a multiple of the zone's lane count
    pub c_samples: usize,
    /// Gradients (and hessians) in the interleaved layout
    pub gradients_and_hessians: *const c_void,
    /// Optional sample weights
    pub weights: *const c_void,
    /// Number of features in the interaction
    pub c_dimensions: usize,
    /// Bin count of each feature
    pub bins_per_dim: [usize; MAX_DIMENSIONS],
    /// Packed items per word of each feature, or [`ITEMS_PER_BIT_PACK_NONE`]
    pub items_per_bit_pack: [isize; MAX_DIMENSIONS],
    /// Packed bin indexes of each feature
    pub packed: [*const c_void; MAX_DIMENSIONS],
    /// Bin storage, accumulated into (not cleared)
    pub bins: *mut c_void,
    /// One past the end of `bins`; only consulted by debug builds
    pub debug_bins_end: *const c_void,
}

impl Default for BinSumsInteractionBridge {
    fn default() -> Self {
        Self {
            hessian: false,
            c_scores: 1,
            c_samples: 0,
            gradients_and_hessians: ptr::null(),
            weights: ptr::null(),
            c_dimensions: 0,
            bins_per_dim: [0; MAX_DIMENSIONS],
            items_per_bit_pack: [ITEMS_PER_BIT_PACK_NONE; MAX_DIMENSIONS],
            packed: [ptr::null(); MAX_DIMENSIONS],
            bins: ptr::null_mut(),
            debug_bins_end: ptr::null(),
        }
    }
}

/// Apply-update entry point
pub type ApplyUpdateFn =
    unsafe extern "C" fn(wrapper: *const ObjectiveWrapper, data: *mut ApplyUpdateBridge) -> ErrorCode;

/// Metric finisher: maps an averaged metric to its reported value
pub type FinishMetricFn = unsafe extern "C" fn(wrapper: *const ObjectiveWrapper, metric: f64) -> f64;

/// Target validator; returns `true` when every target is acceptable
pub type CheckTargetsFn = unsafe extern "C" fn(
    wrapper: *const ObjectiveWrapper,
    c_samples: usize,
    targets: *const c_void,
) -> bool;

/// Boosting bin-sum entry point
pub type BinSumsBoostingFn = unsafe extern "C" fn(
    wrapper: *const ObjectiveWrapper,
    params: *mut BinSumsBoostingBridge,
) -> ErrorCode;

/// Interaction bin-sum entry point
pub type BinSumsInteractionFn = unsafe extern "C" fn(
    wrapper: *const ObjectiveWrapper,
    params: *mut BinSumsInteractionBridge,
) -> ErrorCode;

/// Zone factory: constructs the named objective into `wrapper`
///
/// `name_end` may be null, in which case `name` must be NUL-terminated.
pub type CreateObjectiveFn = unsafe extern "C" fn(
    config: *const Config,
    name: *const std::ffi::c_char,
    name_end: *const std::ffi::c_char,
    wrapper: *mut ObjectiveWrapper,
) -> ErrorCode;

/// Handle to an objective constructed by a zone
///
/// Holds the zone's entry points, the opaque objective instance and the
/// objective's metadata. A wrapper is either fully initialized by a successful
/// factory call or all-null; [`free_objective_wrapper_internals`] returns it to
/// the all-null state.
#[repr(C)]
#[derive(Debug)]
pub struct ObjectiveWrapper {
    pub apply_update: Option<ApplyUpdateFn>,
    pub finish_metric: Option<FinishMetricFn>,
    pub check_targets: Option<CheckTargetsFn>,
    pub bin_sums_boosting: Option<BinSumsBoostingFn>,
    pub bin_sums_interaction: Option<BinSumsInteractionFn>,
    /// Opaque zone-owned objective instance
    pub objective: *mut c_void,
    pub maximize_metric: bool,
    pub link_function: Link,
    /// Link parameter, NaN when the link takes none
    pub link_param: f64,
    pub learning_rate_adjustment_differential_privacy: f64,
    pub learning_rate_adjustment_gradient_boosting: f64,
    pub learning_rate_adjustment_hessian_boosting: f64,
    pub gain_adjustment_gradient_boosting: f64,
    pub gain_adjustment_hessian_boosting: f64,
    pub gradient_constant: f64,
    pub hessian_constant: f64,
    /// The objective produces non-constant hessians
    pub objective_has_hessian: bool,
    /// The objective is root-mean-squared error
    pub rmse: bool,
    /// Lanes per vector in the owning zone
    pub simd_pack: usize,
    /// Bytes per float element in the owning zone
    pub float_bytes: usize,
    /// Bytes per unsigned element in the owning zone
    pub uint_bytes: usize,
    /// Opaque zone-private dispatch table
    pub function_pointers: *mut c_void,
}

impl ObjectiveWrapper {
    /// An all-null wrapper, ready to hand to a factory
    pub const fn zeroed() -> Self {
        Self {
            apply_update: None,
            finish_metric: None,
            check_targets: None,
            bin_sums_boosting: None,
            bin_sums_interaction: None,
            objective: ptr::null_mut(),
            maximize_metric: false,
            link_function: Link::Error,
            link_param: 0.0,
            learning_rate_adjustment_differential_privacy: 0.0,
            learning_rate_adjustment_gradient_boosting: 0.0,
            learning_rate_adjustment_hessian_boosting: 0.0,
            gain_adjustment_gradient_boosting: 0.0,
            gain_adjustment_hessian_boosting: 0.0,
            gradient_constant: 0.0,
            hessian_constant: 0.0,
            objective_has_hessian: false,
            rmse: false,
            simd_pack: 0,
            float_bytes: 0,
            uint_bytes: 0,
            function_pointers: ptr::null_mut(),
        }
    }

    /// `true` once a factory has installed an objective
    pub fn is_initialized(&self) -> bool {
        !self.objective.is_null() && !self.function_pointers.is_null()
    }
}

impl Default for ObjectiveWrapper {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Reset `wrapper` to the all-null state without freeing anything
///
/// # Safety
///
/// `wrapper` must be valid for writes.
pub unsafe extern "C" fn initialize_objective_wrapper(wrapper: *mut ObjectiveWrapper) {
    if !wrapper.is_null() {
        wrapper.write(ObjectiveWrapper::zeroed());
    }
}

/// Release the objective and dispatch table owned by `wrapper`, then reset it
///
/// Safe to call on an all-null wrapper and idempotent afterwards.
///
/// # Safety
///
/// `wrapper` must be null, all-null, or filled in by a zone factory and not
/// freed since.
pub unsafe extern "C" fn free_objective_wrapper_internals(wrapper: *mut ObjectiveWrapper) {
    let Some(wrapper) = wrapper.as_mut() else {
        return;
    };
    if !wrapper.function_pointers.is_null() {
        let table = Box::from_raw(wrapper.function_pointers.cast::<FunctionPointers>());
        if !wrapper.objective.is_null() {
            (table.release_objective)(wrapper.objective);
        }
    }
    *wrapper = ObjectiveWrapper::zeroed();
}
