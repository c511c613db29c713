use crate::backends::{FloatScalar, SimdFloat, SimdInt, UIntOf, UIntScalar};
use crate::bridge::Link;
use crate::config::Config;

use super::{
    class_index, sigmoid, softplus, Adjustments, LaneBlock, MultiScoreObjective, Objective,
    SingleScoreObjective,
};

const LOG_LOSS_ADJUSTMENTS: Adjustments = Adjustments {
    learning_rate_differential_privacy: 4.0,
    learning_rate_gradient_boosting: 4.0,
    learning_rate_hessian_boosting: 1.0,
    gain_gradient_boosting: 4.0,
    gain_hessian_boosting: 1.0,
};

/// Binary cross-entropy on a single logit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLossBinary {
    differential_privacy: bool,
}

impl LogLossBinary {
    pub fn new(config: &Config) -> Self {
        Self {
            differential_privacy: config.is_differential_privacy,
        }
    }
}

impl<F: SimdFloat> Objective<F> for LogLossBinary {
    type Target = F::Int;
    type TargetScalar = UIntOf<F>;

    const LINK: Link = Link::Logit;

    fn has_hessian(&self) -> bool {
        !self.differential_privacy
    }

    fn adjustments(&self) -> Adjustments {
        LOG_LOSS_ADJUSTMENTS
    }

    fn check_targets(&self, targets: &[UIntOf<F>]) -> bool {
        targets.iter().all(|t| t.to_u64() < 2)
    }

    #[inline(always)]
    unsafe fn load_target(ptr: *const UIntOf<F>) -> F::Int {
        <F::Int as SimdInt>::load(ptr)
    }
}

impl<F: SimdFloat> SingleScoreObjective<F> for LogLossBinary {
    #[inline(always)]
    fn metric(&self, score: F, target: F::Int) -> F {
        // -ln(sigmoid((2y - 1) s))
        let y = F::from_int(target);
        softplus(score * (F::splat(F::T::ONE) - y - y))
    }

    #[inline(always)]
    fn gradient(&self, score: F, target: F::Int) -> F {
        sigmoid(score) - F::from_int(target)
    }

    #[inline(always)]
    fn gradient_hessian(&self, score: F, target: F::Int) -> (F, F) {
        let p = sigmoid(score);
        (p - F::from_int(target), p * (F::splat(F::T::ONE) - p))
    }
}

/// Multinomial cross-entropy over `c_classes` logits per sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLossMulticlass {
    c_classes: usize,
    differential_privacy: bool,
}

impl LogLossMulticlass {
    pub fn new(config: &Config) -> Self {
        Self {
            c_classes: config.c_outputs,
            differential_privacy: config.is_differential_privacy,
        }
    }
}

impl<F: SimdFloat> Objective<F> for LogLossMulticlass {
    type Target = F::Int;
    type TargetScalar = UIntOf<F>;

    const LINK: Link = Link::Mlogit;

    fn score_count(&self) -> usize {
        self.c_classes
    }

    fn has_hessian(&self) -> bool {
        !self.differential_privacy
    }

    fn adjustments(&self) -> Adjustments {
        LOG_LOSS_ADJUSTMENTS
    }

    fn check_targets(&self, targets: &[UIntOf<F>]) -> bool {
        targets.iter().all(|t| t.to_u64() < self.c_classes as u64)
    }

    #[inline(always)]
    unsafe fn load_target(ptr: *const UIntOf<F>) -> F::Int {
        <F::Int as SimdInt>::load(ptr)
    }
}

impl<F: SimdFloat> MultiScoreObjective<F> for LogLossMulticlass {
    #[inline(always)]
    unsafe fn update_block<const KEEP: bool, const HESSIAN: bool, const METRIC: bool>(
        &self,
        scores: LaneBlock<F>,
        target: F::Int,
        gradients: LaneBlock<F>,
        hessians: LaneBlock<F>,
        scratch: LaneBlock<F>,
    ) -> F {
        let c_classes = self.c_classes;

        let mut max = scores.get(0);
        for k in 1..c_classes {
            let s = scores.get(k);
            max = F::if_less(max, s, s, max);
        }

        let mut total = F::zero();
        let mut target_score = F::zero();
        for k in 0..c_classes {
            let s = scores.get(k);
            let e = (s - max).exp();
            scratch.set(k, e);
            total += e;
            if METRIC {
                target_score = F::if_equal(target, class_index::<F>(k), s, target_score);
            }
        }

        if KEEP {
            let one = F::splat(F::T::ONE);
            let inverse = one / total;
            for k in 0..c_classes {
                let p = scratch.get(k) * inverse;
                let y = F::if_equal(target, class_index::<F>(k), one, F::zero());
                gradients.set(k, p - y);
                if HESSIAN {
                    hessians.set(k, p * (one - p));
                }
            }
        }

        if METRIC {
            total.log() + max - target_score
        } else {
            F::zero()
        }
    }
}
