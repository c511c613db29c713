use crate::backends::{FloatScalar, SimdFloat};
use crate::bridge::Link;
use crate::config::Config;
use crate::error::ErrorCode;

use super::{Adjustments, Objective, SingleScoreObjective};

/// Root-mean-squared error regression
///
/// Gradient is the residual `score - target`; the hessian is the constant 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rmse;

impl Rmse {
    /// Requires exactly one output
    pub fn new(config: &Config) -> Result<Self, ErrorCode> {
        if config.c_outputs != 1 {
            return Err(ErrorCode::IllegalParamVal);
        }
        Ok(Rmse)
    }
}

impl<F: SimdFloat> Objective<F> for Rmse {
    type Target = F;
    type TargetScalar = F::T;

    const LINK: Link = Link::Identity;
    const IS_RMSE: bool = true;

    fn has_hessian(&self) -> bool {
        false
    }

    fn adjustments(&self) -> Adjustments {
        Adjustments::uniform(1.0)
    }

    fn gradient_constant(&self) -> f64 {
        2.0
    }

    fn hessian_constant(&self) -> f64 {
        2.0
    }

    fn finish_metric(&self, metric: f64) -> f64 {
        metric.sqrt()
    }

    fn check_targets(&self, targets: &[F::T]) -> bool {
        targets.iter().all(|t| t.to_f64().is_finite())
    }

    #[inline(always)]
    unsafe fn load_target(ptr: *const F::T) -> F {
        F::load(ptr)
    }
}

impl<F: SimdFloat> SingleScoreObjective<F> for Rmse {
    #[inline(always)]
    fn metric(&self, score: F, target: F) -> F {
        let error = score - target;
        error * error
    }

    #[inline(always)]
    fn gradient(&self, score: F, target: F) -> F {
        score - target
    }

    #[inline(always)]
    fn gradient_hessian(&self, score: F, target: F) -> (F, F) {
        (score - target, F::splat(F::T::ONE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::cpu64::Cpu64Float;

    #[test]
    fn test_rmse_requires_single_output() {
        assert_eq!(Rmse::new(&Config::new(2)), Err(ErrorCode::IllegalParamVal));
        assert!(Rmse::new(&Config::regression()).is_ok());
    }

    #[test]
    fn test_rmse_gradient_is_residual() {
        let g = SingleScoreObjective::<Cpu64Float>::gradient(
            &Rmse,
            Cpu64Float::splat(3.0),
            Cpu64Float::splat(1.0),
        );
        assert_eq!(g.0, 2.0);
    }

    #[test]
    fn test_rmse_metric_and_finish() {
        let m = SingleScoreObjective::<Cpu64Float>::metric(
            &Rmse,
            Cpu64Float::splat(1.0),
            Cpu64Float::splat(4.0),
        );
        assert_eq!(m.0, 9.0);
        assert_eq!(Objective::<Cpu64Float>::finish_metric(&Rmse, 9.0), 3.0);
    }

    #[test]
    fn test_rmse_rejects_non_finite_targets() {
        let objective = Rmse;
        assert!(Objective::<Cpu64Float>::check_targets(&objective, &[0.0, -2.5, 1e300]));
        assert!(!Objective::<Cpu64Float>::check_targets(&objective, &[0.0, f64::NAN]));
        assert!(!Objective::<Cpu64Float>::check_targets(&objective, &[f64::INFINITY]));
    }
}
