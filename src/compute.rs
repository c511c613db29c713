//! Safe owner of a zone objective
//!
//! [`Compute`] runs a zone factory, keeps the populated [`ObjectiveWrapper`]
//! and tears it down exactly once on drop. The kernel entry points stay
//! `unsafe`: they read and write caller buffers described by raw-pointer
//! bridges.

use std::ffi::c_void;

#[cfg(feature = "tracing")]
use tracing::{debug, instrument, warn};

use crate::bridge::{
    free_objective_wrapper_internals, ApplyUpdateBridge, BinSumsBoostingBridge,
    BinSumsInteractionBridge, Link, ObjectiveWrapper,
};
use crate::config::Config;
use crate::error::{BoostError, Result};
use crate::objective::Adjustments;
use crate::{available_backends, Backend};

/// Objective constructed in one compute zone
///
/// Not `Clone`: the wrapper exclusively owns the zone's objective instance.
#[derive(Debug)]
pub struct Compute {
    wrapper: ObjectiveWrapper,
    backend: Backend,
}

// SAFETY: objectives are `Send + Sync` and the dispatch table is immutable
// after construction; calls through `&self` never mutate the wrapper.
unsafe impl Send for Compute {}
unsafe impl Sync for Compute {}

impl Compute {
    /// Construct `name` on the fastest backend that accepts it
    ///
    /// Backends are tried in [`crate::SELECTION_ORDER`]; the first successful
    /// factory wins. When every backend fails, the last error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use boostkern::{Compute, Config};
    ///
    /// let compute = Compute::create(&Config::regression(), "rmse").unwrap();
    /// assert!(compute.is_rmse());
    /// ```
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(config), fields(c_outputs = config.c_outputs))
    )]
    pub fn create(config: &Config, name: &str) -> Result<Self> {
        let mut last_error = BoostError::UnsupportedBackend(Backend::Auto);
        for backend in available_backends() {
            match Self::with_backend(backend, config, name) {
                Ok(compute) => {
                    #[cfg(feature = "tracing")]
                    debug!(?backend, "objective created");
                    return Ok(compute);
                }
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    warn!(?backend, %err, "backend rejected objective");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }

    /// Construct `name` on a specific backend
    ///
    /// [`Backend::Auto`] behaves like [`Compute::create`].
    ///
    /// # Errors
    ///
    /// [`BoostError::UnsupportedBackend`] when the backend is not compiled in or
    /// not detected; otherwise the factory's error.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(config), fields(c_outputs = config.c_outputs))
    )]
    pub fn with_backend(backend: Backend, config: &Config, name: &str) -> Result<Self> {
        if backend == Backend::Auto {
            return Self::create(config, name);
        }
        if !backend.is_available() {
            return Err(BoostError::UnsupportedBackend(backend));
        }
        let factory = backend
            .factory()
            .ok_or(BoostError::UnsupportedBackend(backend))?;

        let mut wrapper = ObjectiveWrapper::zeroed();
        let name = name.as_bytes().as_ptr_range();
        // SAFETY: the backend was detected on this CPU; config, the name range
        // and the wrapper are valid for the duration of the call
        let code = unsafe { factory(config, name.start.cast(), name.end.cast(), &mut wrapper) };
        code.into_result()?;
        Ok(Self { wrapper, backend })
    }

    /// Backend the objective was built for
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Raw wrapper, for callers driving the function pointers directly
    pub fn wrapper(&self) -> &ObjectiveWrapper {
        &self.wrapper
    }

    /// Lanes per vector; `c_samples` must be a multiple of this
    pub fn lanes(&self) -> usize {
        self.wrapper.simd_pack
    }

    pub fn float_bytes(&self) -> usize {
        self.wrapper.float_bytes
    }

    pub fn uint_bytes(&self) -> usize {
        self.wrapper.uint_bytes
    }

    pub fn link(&self) -> Link {
        self.wrapper.link_function
    }

    pub fn link_param(&self) -> f64 {
        self.wrapper.link_param
    }

    pub fn maximize_metric(&self) -> bool {
        self.wrapper.maximize_metric
    }

    pub fn has_hessian(&self) -> bool {
        self.wrapper.objective_has_hessian
    }

    pub fn is_rmse(&self) -> bool {
        self.wrapper.rmse
    }

    pub fn gradient_constant(&self) -> f64 {
        self.wrapper.gradient_constant
    }

    pub fn hessian_constant(&self) -> f64 {
        self.wrapper.hessian_constant
    }

    pub fn adjustments(&self) -> Adjustments {
        Adjustments {
            learning_rate_differential_privacy: self
                .wrapper
                .learning_rate_adjustment_differential_privacy,
            learning_rate_gradient_boosting: self.wrapper.learning_rate_adjustment_gradient_boosting,
            learning_rate_hessian_boosting: self.wrapper.learning_rate_adjustment_hessian_boosting,
            gain_gradient_boosting: self.wrapper.gain_adjustment_gradient_boosting,
            gain_hessian_boosting: self.wrapper.gain_adjustment_hessian_boosting,
        }
    }

    /// Add the update tensor to the sample scores; optionally refresh gradients
    /// and accumulate the metric into `data.metric_out`
    ///
    /// # Safety
    ///
    /// Every pointer in `data` must reference a buffer of this backend's element
    /// widths sized for `data.c_samples` samples (see [`crate::layout`]).
    pub unsafe fn apply_update(&self, data: &mut ApplyUpdateBridge) -> Result<()> {
        let apply = self
            .wrapper
            .apply_update
            .ok_or(BoostError::UnexpectedInternal)?;
        apply(&self.wrapper, data).into_result()
    }

    /// Map an averaged metric to the reported value (e.g. `sqrt` for rmse)
    pub fn finish_metric(&self, metric: f64) -> f64 {
        match self.wrapper.finish_metric {
            // SAFETY: the wrapper was filled by this backend's factory
            Some(finish) => unsafe { finish(&self.wrapper, metric) },
            None => f64::NAN,
        }
    }

    /// `true` when every target is valid for the objective
    ///
    /// # Safety
    ///
    /// `targets` must hold `c_samples` elements of the objective's target type
    /// at this backend's width (float for regression, uint for classification).
    pub unsafe fn check_targets(&self, c_samples: usize, targets: *const c_void) -> bool {
        match self.wrapper.check_targets {
            Some(check) => check(&self.wrapper, c_samples, targets),
            None => false,
        }
    }

    /// Accumulate one feature's histogram
    ///
    /// # Safety
    ///
    /// Every pointer in `params` must reference a buffer of this backend's
    /// element widths, and every packed index must select a bin inside
    /// `params.bins`.
    pub unsafe fn bin_sums_boosting(&self, params: &mut BinSumsBoostingBridge) -> Result<()> {
        let bin_sums = self
            .wrapper
            .bin_sums_boosting
            .ok_or(BoostError::UnexpectedInternal)?;
        bin_sums(&self.wrapper, params).into_result()
    }

    /// Accumulate a multi-feature histogram
    ///
    /// # Safety
    ///
    /// As for [`Compute::bin_sums_boosting`]; the bin buffer must hold the
    /// product of `params.bins_per_dim` bins.
    pub unsafe fn bin_sums_interaction(&self, params: &mut BinSumsInteractionBridge) -> Result<()> {
        let bin_sums = self
            .wrapper
            .bin_sums_interaction
            .ok_or(BoostError::UnexpectedInternal)?;
        bin_sums(&self.wrapper, params).into_result()
    }
}

impl Drop for Compute {
    fn drop(&mut self) {
        // SAFETY: the wrapper was filled by a factory and is released only here
        unsafe { free_objective_wrapper_internals(&mut self.wrapper) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_cpu64_rmse_metadata() {
        let compute = Compute::with_backend(Backend::Cpu64, &Config::regression(), "rmse").unwrap();
        assert_eq!(compute.backend(), Backend::Cpu64);
        assert_eq!(compute.lanes(), 1);
        assert_eq!(compute.float_bytes(), 8);
        assert_eq!(compute.link(), Link::Identity);
        assert!(compute.is_rmse());
        assert!(!compute.has_hessian());
        assert_eq!(compute.gradient_constant(), 2.0);
        assert_eq!(compute.adjustments(), Adjustments::uniform(1.0));
    }

    #[test]
    fn test_log_loss_adjustments() {
        let compute = Compute::with_backend(Backend::Cpu64, &Config::new(2), "log_loss").unwrap();
        let adjustments = compute.adjustments();
        assert_eq!(adjustments.learning_rate_gradient_boosting, 4.0);
        assert_eq!(adjustments.learning_rate_hessian_boosting, 1.0);
        assert!(compute.has_hessian());
        assert_eq!(compute.link(), Link::Logit);
    }

    #[test]
    fn test_unknown_name_error() {
        let err = Compute::with_backend(Backend::Cpu64, &Config::regression(), "poisson").unwrap_err();
        assert_eq!(err, BoostError::UnknownIdentifier);
        assert_eq!(err.code(), ErrorCode::UnknownIdentifier);
    }

    #[test]
    fn test_create_auto_unknown_name() {
        let err = Compute::create(&Config::regression(), "poisson").unwrap_err();
        assert_eq!(err, BoostError::UnknownIdentifier);
    }

    #[test]
    fn test_auto_backend_resolves() {
        let compute = Compute::with_backend(Backend::Auto, &Config::regression(), "rmse").unwrap();
        assert_ne!(compute.backend(), Backend::Auto);
        assert_eq!(compute.backend(), crate::select_best_available_backend());
    }

    #[test]
    fn test_finish_metric_rmse() {
        let compute = Compute::with_backend(Backend::Cpu64, &Config::regression(), "rmse").unwrap();
        assert_eq!(compute.finish_metric(2.25), 1.5);
    }

    #[test]
    fn test_compute_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Compute>();
    }
}
