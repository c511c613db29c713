use crate::backends::{SimdFloat, SimdInt, UIntOf, UIntScalar};
use crate::bridge::ApplyUpdateBridge;
use crate::error::ErrorCode;
use crate::objective::{LaneBlock, MultiScoreObjective, Objective, SingleScoreObjective};

use super::PackedReader;

/// Score-update loop specialised on the four runtime flags
trait UpdateLoop<F: SimdFloat> {
    /// Objective produces non-constant hessians
    fn has_hessian(&self) -> bool;

    unsafe fn run<const KEEP: bool, const METRIC: bool, const WEIGHT: bool, const HESSIAN: bool>(
        &self,
        data: &mut ApplyUpdateBridge,
    );
}

struct SingleScore<'a, O>(&'a O);
struct MultiScore<'a, O>(&'a O);

/// Apply an update to a single-score objective's samples
///
/// # Safety
///
/// `data` must describe valid buffers for `data.c_samples` samples.
pub(crate) unsafe fn apply_update_single<F, O>(
    objective: &O,
    data: &mut ApplyUpdateBridge,
) -> ErrorCode
where
    F: SimdFloat,
    O: SingleScoreObjective<F>,
{
    if data.c_scores != 1 {
        return ErrorCode::IllegalParamVal;
    }
    dispatch::<F, _>(&SingleScore(objective), data)
}

/// Apply an update to a multi-score objective's samples
///
/// # Safety
///
/// `data` must describe valid buffers for `data.c_samples` samples, and
/// `multiscore_temp` must hold `c_scores` vectors.
pub(crate) unsafe fn apply_update_multi<F, O>(
    objective: &O,
    data: &mut ApplyUpdateBridge,
) -> ErrorCode
where
    F: SimdFloat,
    O: MultiScoreObjective<F>,
{
    if data.c_scores != objective.score_count() {
        return ErrorCode::IllegalParamVal;
    }
    if data.multiscore_temp.is_null() && (data.calc_metric || !data.gradients_and_hessians.is_null()) {
        return ErrorCode::IllegalParamVal;
    }
    dispatch::<F, _>(&MultiScore(objective), data)
}

unsafe fn dispatch<F: SimdFloat, K: UpdateLoop<F>>(kernel: &K, data: &mut ApplyUpdateBridge) -> ErrorCode {
    if data.c_samples % F::LANES != 0 {
        return ErrorCode::UnexpectedInternal;
    }
    if data.c_samples == 0 {
        data.metric_out = 0.0;
        return ErrorCode::None;
    }
    let keep = !data.gradients_and_hessians.is_null();
    match (keep, data.calc_metric) {
        (true, true) => with_weight::<F, K, true, true>(kernel, data),
        (true, false) => with_weight::<F, K, true, false>(kernel, data),
        (false, true) => with_weight::<F, K, false, true>(kernel, data),
        (false, false) => kernel.run::<false, false, false, false>(data),
    }
    ErrorCode::None
}

#[inline(always)]
unsafe fn with_weight<F: SimdFloat, K: UpdateLoop<F>, const KEEP: bool, const METRIC: bool>(
    kernel: &K,
    data: &mut ApplyUpdateBridge,
) {
    if METRIC && !data.weights.is_null() {
        with_hessian::<F, K, KEEP, METRIC, true>(kernel, data)
    } else {
        with_hessian::<F, K, KEEP, METRIC, false>(kernel, data)
    }
}

#[inline(always)]
unsafe fn with_hessian<
    F: SimdFloat,
    K: UpdateLoop<F>,
    const KEEP: bool,
    const METRIC: bool,
    const WEIGHT: bool,
>(
    kernel: &K,
    data: &mut ApplyUpdateBridge,
) {
    if KEEP && data.hessian_needed && kernel.has_hessian() {
        kernel.run::<KEEP, METRIC, WEIGHT, true>(data)
    } else {
        kernel.run::<KEEP, METRIC, WEIGHT, false>(data)
    }
}

impl<F: SimdFloat, O: SingleScoreObjective<F>> UpdateLoop<F> for SingleScore<'_, O> {
    fn has_hessian(&self) -> bool {
        self.0.has_hessian()
    }

    #[inline(always)]
    unsafe fn run<const KEEP: bool, const METRIC: bool, const WEIGHT: bool, const HESSIAN: bool>(
        &self,
        data: &mut ApplyUpdateBridge,
    ) {
        let objective = self.0;
        let tensor = data.update_tensor_scores.cast::<F::T>();
        let mut reader = PackedReader::<F::Int>::new(data.c_pack, data.packed);
        let fixed_update = if reader.is_none() {
            F::splat(tensor.read_unaligned())
        } else {
            F::zero()
        };

        let mut scores = data.sample_scores.cast::<F::T>();
        let mut targets = data.targets.cast::<O::TargetScalar>();
        let mut weights = data.weights.cast::<F::T>();
        let mut gradients = data.gradients_and_hessians.cast::<F::T>();
        let mut metric = F::zero();

        for _ in 0..data.c_samples / F::LANES {
            let update = if reader.is_none() {
                fixed_update
            } else {
                F::gather(tensor, reader.next())
            };
            let score = F::load(scores) + update;
            score.store(scores);
            scores = scores.add(F::LANES);

            if KEEP || METRIC {
                let target = O::load_target(targets);
                targets = targets.add(F::LANES);

                if KEEP {
                    if HESSIAN {
                        let (gradient, hessian) = objective.gradient_hessian(score, target);
                        gradient.store(gradients);
                        hessian.store(gradients.add(F::LANES));
                        gradients = gradients.add(2 * F::LANES);
                    } else {
                        objective.gradient(score, target).store(gradients);
                        gradients = gradients.add(F::LANES);
                    }
                }

                if METRIC {
                    let term = objective.metric(score, target);
                    if WEIGHT {
                        metric += term * F::load(weights);
                        weights = weights.add(F::LANES);
                    } else {
                        metric += term;
                    }
                }
            }
        }

        data.metric_out = if METRIC {
            crate::backends::FloatScalar::to_f64(metric.sum())
        } else {
            0.0
        };
    }
}

impl<F: SimdFloat, O: MultiScoreObjective<F>> UpdateLoop<F> for MultiScore<'_, O> {
    fn has_hessian(&self) -> bool {
        self.0.has_hessian()
    }

    #[inline(always)]
    unsafe fn run<const KEEP: bool, const METRIC: bool, const WEIGHT: bool, const HESSIAN: bool>(
        &self,
        data: &mut ApplyUpdateBridge,
    ) {
        let objective = self.0;
        let c_scores = data.c_scores;
        let tensor = data.update_tensor_scores.cast::<F::T>();
        let mut reader = PackedReader::<F::Int>::new(data.c_pack, data.packed);
        let tensor_stride = UIntOf::<F>::from_usize(c_scores);
        let gradient_stride = if HESSIAN { 2 * F::LANES } else { F::LANES };
        let scratch = LaneBlock::<F>::new(data.multiscore_temp.cast(), F::LANES);

        let mut scores = data.sample_scores.cast::<F::T>();
        let mut targets = data.targets.cast::<O::TargetScalar>();
        let mut weights = data.weights.cast::<F::T>();
        let mut gradients = data.gradients_and_hessians.cast::<F::T>();
        let mut metric = F::zero();

        for _ in 0..data.c_samples / F::LANES {
            let base = reader.next().mul_scalar(tensor_stride);
            let block = LaneBlock::<F>::new(scores, F::LANES);
            for k in 0..c_scores {
                let index = base + <F::Int as SimdInt>::splat(UIntOf::<F>::from_usize(k));
                block.set(k, block.get(k) + F::gather(tensor, index));
            }
            scores = scores.add(c_scores * F::LANES);

            if KEEP || METRIC {
                let target = O::load_target(targets);
                targets = targets.add(F::LANES);

                let term = objective.update_block::<KEEP, HESSIAN, METRIC>(
                    block,
                    target,
                    LaneBlock::new(gradients, gradient_stride),
                    LaneBlock::new(gradients.wrapping_add(F::LANES), gradient_stride),
                    scratch,
                );
                if KEEP {
                    gradients = gradients.add(c_scores * gradient_stride);
                }

                if METRIC {
                    if WEIGHT {
                        metric += term * F::load(weights);
                        weights = weights.add(F::LANES);
                    } else {
                        metric += term;
                    }
                }
            }
        }

        data.metric_out = if METRIC {
            crate::backends::FloatScalar::to_f64(metric.sum())
        } else {
            0.0
        };
    }
}
