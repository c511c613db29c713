//! Loss functions evaluated by the kernels
//!
//! An objective is written once against [`SimdFloat`] and instantiated per
//! zone. Single-score objectives (one score per sample) implement
//! [`SingleScoreObjective`]; objectives that couple several scores per sample,
//! like softmax, implement [`MultiScoreObjective`] and see all scores of a lane
//! group at once.
//!
//! Objectives are looked up by name through [`registrations`]. Names match
//! case-insensitively after trimming surrounding whitespace.

mod log_loss;
mod rmse;

pub use log_loss::{LogLossBinary, LogLossMulticlass};
pub use rmse::Rmse;

use crate::backends::{SimdFloat, SimdInt, UIntOf};
use crate::bridge::{Link, ObjectiveWrapper};
use crate::config::Config;
use crate::error::ErrorCode;
use crate::zone;

/// Learning-rate and gain multipliers reported through the wrapper
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustments {
    pub learning_rate_differential_privacy: f64,
    pub learning_rate_gradient_boosting: f64,
    pub learning_rate_hessian_boosting: f64,
    pub gain_gradient_boosting: f64,
    pub gain_hessian_boosting: f64,
}

impl Adjustments {
    /// Every multiplier set to `v`
    pub const fn uniform(v: f64) -> Self {
        Self {
            learning_rate_differential_privacy: v,
            learning_rate_gradient_boosting: v,
            learning_rate_hessian_boosting: v,
            gain_gradient_boosting: v,
            gain_hessian_boosting: v,
        }
    }
}

/// Metadata and target handling shared by every objective
pub trait Objective<F: SimdFloat>: Send + Sync + Sized + 'static {
    /// Lane-vector form of a group of targets
    type Target: Copy;
    /// One target as stored in the caller's buffer
    type TargetScalar: Copy + 'static;

    /// Inverse link of the model scores
    const LINK: Link;
    /// Root-mean-squared error fast path
    const IS_RMSE: bool = false;
    /// Larger metric values are better
    const MAXIMIZE_METRIC: bool = false;

    /// Scores per sample this instance expects
    fn score_count(&self) -> usize {
        1
    }

    /// Whether non-constant hessians are produced
    fn has_hessian(&self) -> bool;

    /// Parameter of [`Self::LINK`], NaN when it takes none
    fn link_param(&self) -> f64 {
        f64::NAN
    }

    fn adjustments(&self) -> Adjustments;

    fn gradient_constant(&self) -> f64 {
        1.0
    }

    fn hessian_constant(&self) -> f64 {
        1.0
    }

    /// Map the averaged metric to its reported value
    fn finish_metric(&self, metric: f64) -> f64 {
        metric
    }

    /// `true` when every target is in the objective's domain
    fn check_targets(&self, targets: &[Self::TargetScalar]) -> bool;

    /// Load the targets of one lane group
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reading `F::LANES` targets.
    unsafe fn load_target(ptr: *const Self::TargetScalar) -> Self::Target;
}

/// Objective with one score per sample
pub trait SingleScoreObjective<F: SimdFloat>: Objective<F> {
    /// Per-sample metric term (summed across samples, then finished)
    fn metric(&self, score: F, target: Self::Target) -> F;

    /// First derivative of the loss with respect to the score
    fn gradient(&self, score: F, target: Self::Target) -> F;

    /// First and second derivatives
    fn gradient_hessian(&self, score: F, target: Self::Target) -> (F, F);
}

/// Objective coupling all scores of a sample
pub trait MultiScoreObjective<F: SimdFloat>: Objective<F> {
    /// Process one lane group
    ///
    /// Reads `scores`, writes gradients (and hessians when `HESSIAN`) when
    /// `KEEP`, and returns the per-lane metric term when `METRIC` (zero
    /// otherwise). `scratch` holds [`Objective::score_count`] vectors.
    ///
    /// # Safety
    ///
    /// Every block must be valid for [`Objective::score_count`] vectors;
    /// `gradients`/`hessians` are only touched when `KEEP`/`HESSIAN`.
    unsafe fn update_block<const KEEP: bool, const HESSIAN: bool, const METRIC: bool>(
        &self,
        scores: LaneBlock<F>,
        target: Self::Target,
        gradients: LaneBlock<F>,
        hessians: LaneBlock<F>,
        scratch: LaneBlock<F>,
    ) -> F;
}

/// Strided view of `k` lane vectors in a caller buffer
#[derive(Debug, Clone, Copy)]
pub struct LaneBlock<F: SimdFloat> {
    base: *mut F::T,
    stride: usize,
}

impl<F: SimdFloat> LaneBlock<F> {
    /// Vectors at `base + k * stride`
    #[inline(always)]
    pub fn new(base: *mut F::T, stride: usize) -> Self {
        Self { base, stride }
    }

    /// Read vector `k`
    ///
    /// # Safety
    ///
    /// `base + k * stride` must be valid for reading `F::LANES` elements.
    #[inline(always)]
    pub unsafe fn get(&self, k: usize) -> F {
        F::load(self.base.add(k * self.stride))
    }

    /// Write vector `k`
    ///
    /// # Safety
    ///
    /// `base + k * stride` must be valid for writing `F::LANES` elements.
    #[inline(always)]
    pub unsafe fn set(&self, k: usize, v: F) {
        v.store(self.base.add(k * self.stride))
    }
}

/// Builds an objective into a wrapper; failures leave the wrapper untouched
pub type CreateFn = fn(config: &Config, wrapper: &mut ObjectiveWrapper) -> ErrorCode;

/// One named entry of a zone's objective table
#[derive(Debug, Clone, Copy)]
pub struct Registration {
    pub name: &'static str,
    pub create: CreateFn,
}

impl Registration {
    /// Case-insensitive match against an already trimmed name
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Objectives compiled into every zone
pub fn registrations<F: SimdFloat>() -> [Registration; 2] {
    [
        Registration {
            name: "rmse",
            create: create_rmse::<F>,
        },
        Registration {
            name: "log_loss",
            create: create_log_loss::<F>,
        },
    ]
}

fn create_rmse<F: SimdFloat>(config: &Config, wrapper: &mut ObjectiveWrapper) -> ErrorCode {
    match Rmse::new(config) {
        Ok(objective) => zone::install_single::<F, _>(objective, wrapper),
        Err(code) => code,
    }
}

fn create_log_loss<F: SimdFloat>(config: &Config, wrapper: &mut ObjectiveWrapper) -> ErrorCode {
    match config.c_outputs {
        0 | 1 => ErrorCode::IllegalParamVal,
        2 => zone::install_single::<F, _>(LogLossBinary::new(config), wrapper),
        _ => zone::install_multi::<F, _>(LogLossMulticlass::new(config), wrapper),
    }
}

/// `1 / (1 + e^-x)`
#[inline(always)]
pub(crate) fn sigmoid<F: SimdFloat>(x: F) -> F {
    let one = F::from_f64(1.0);
    one / (one + (-x).exp())
}

/// `ln(1 + e^x)`, evaluated without overflow
#[inline(always)]
pub(crate) fn softplus<F: SimdFloat>(x: F) -> F {
    let zero = F::zero();
    let positive = F::if_less(x, zero, zero, x);
    positive + (F::from_f64(1.0) + (-x.abs()).exp()).log()
}

/// Broadcast a class index into an integer vector
#[inline(always)]
pub(crate) fn class_index<F: SimdFloat>(k: usize) -> F::Int {
    <F::Int as SimdInt>::splat(<UIntOf<F> as crate::backends::UIntScalar>::from_usize(k))
}
