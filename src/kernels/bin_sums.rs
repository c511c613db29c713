use crate::backends::{FloatScalar, SimdFloat, SimdInt, UIntOf, UIntScalar};
use crate::bridge::{BinSumsBoostingBridge, BinSumsInteractionBridge, MAX_DIMENSIONS};
use crate::error::ErrorCode;

use super::PackedReader;

/// Bin storage geometry: `[count, weight, (gradient[, hessian]) * c_scores]`
#[derive(Debug, Clone, Copy)]
struct Bins<F: SimdFloat> {
    base: *mut F::T,
    slots: usize,
    c_scores: usize,
    end: *const u8,
}

impl<F: SimdFloat> Bins<F> {
    fn new(base: *mut std::ffi::c_void, c_scores: usize, hessian: bool, end: *const std::ffi::c_void) -> Self {
        let per_score = if hessian { 2 } else { 1 };
        Self {
            base: base.cast(),
            slots: 2 + c_scores * per_score,
            c_scores,
            end: end.cast(),
        }
    }

    #[inline(always)]
    fn bin(&self, index: usize) -> *mut F::T {
        let bin = self.base.wrapping_add(index * self.slots);
        debug_assert!(
            self.end.is_null() || bin.wrapping_add(self.slots).cast::<u8>().cast_const() <= self.end,
            "bin {index} past the end of the bin buffer"
        );
        bin
    }
}

/// Accumulate one lane group into the bins selected by `indexes`
///
/// Lanes are folded in lane order so colliding bins accumulate sequentially.
#[inline(always)]
unsafe fn accumulate<F: SimdFloat, const HESSIAN: bool, const WEIGHT: bool, const COUNT: bool>(
    bins: &Bins<F>,
    indexes: F::Int,
    weight: F,
    counts: F::Int,
    gradients: *const F::T,
) {
    let indexes = indexes.to_array();
    let counts = counts.to_array();
    let weights = weight.to_array();

    F::execute(|lane| {
        let bin = bins.bin(indexes.as_ref()[lane].to_usize());
        let count = if COUNT {
            counts.as_ref()[lane]
        } else {
            UIntOf::<F>::from_usize(1)
        };
        let count_slot = bin.cast::<UIntOf<F>>();
        count_slot.write_unaligned(count_slot.read_unaligned().wrapping_add(count));

        let sample_weight = if WEIGHT {
            weights.as_ref()[lane]
        } else if COUNT {
            F::T::from_f64(count.to_u64() as f64)
        } else {
            F::T::ONE
        };
        let weight_slot = bin.add(1);
        weight_slot.write_unaligned(weight_slot.read_unaligned() + sample_weight);
    });

    let per_score = if HESSIAN { 2 } else { 1 };
    for k in 0..bins.c_scores {
        let element = gradients.add(k * per_score * F::LANES);
        let mut gradient = F::load(element);
        let mut hessian = if HESSIAN { F::load(element.add(F::LANES)) } else { F::zero() };
        if WEIGHT {
            gradient *= weight;
            if HESSIAN {
                hessian *= weight;
            }
        }
        let gradient = gradient.to_array();
        let hessian = hessian.to_array();

        F::execute(|lane| {
            let slot = bins.bin(indexes.as_ref()[lane].to_usize()).add(2 + k * per_score);
            slot.write_unaligned(slot.read_unaligned() + gradient.as_ref()[lane]);
            if HESSIAN {
                let slot = slot.add(1);
                slot.write_unaligned(slot.read_unaligned() + hessian.as_ref()[lane]);
            }
        });
    }
}

/// Accumulate per-bin counts, weights and gradient sums for one feature
///
/// # Safety
///
/// `params` must describe valid buffers for `params.c_samples` samples, and
/// every packed index must select a bin inside `params.bins`.
pub(crate) unsafe fn bin_sums_boosting<F: SimdFloat>(params: &mut BinSumsBoostingBridge) -> ErrorCode {
    if params.c_samples % F::LANES != 0 || params.c_scores == 0 {
        return ErrorCode::IllegalParamVal;
    }
    let weighted = !params.weights.is_null();
    let counted = !params.count_occurrences.is_null();
    match (params.hessian, weighted, counted) {
        (false, false, false) => boosting::<F, false, false, false>(params),
        (false, false, true) => boosting::<F, false, false, true>(params),
        (false, true, false) => boosting::<F, false, true, false>(params),
        (false, true, true) => boosting::<F, false, true, true>(params),
        (true, false, false) => boosting::<F, true, false, false>(params),
        (true, false, true) => boosting::<F, true, false, true>(params),
        (true, true, false) => boosting::<F, true, true, false>(params),
        (true, true, true) => boosting::<F, true, true, true>(params),
    }
    ErrorCode::None
}

unsafe fn boosting<F: SimdFloat, const HESSIAN: bool, const WEIGHT: bool, const COUNT: bool>(
    params: &BinSumsBoostingBridge,
) {
    let bins = Bins::<F>::new(params.bins, params.c_scores, HESSIAN, params.debug_bins_end);
    let mut reader = PackedReader::<F::Int>::new(params.c_pack, params.packed);
    let stride = params.c_scores * if HESSIAN { 2 } else { 1 } * F::LANES;

    let mut gradients = params.gradients_and_hessians.cast::<F::T>();
    let mut weights = params.weights.cast::<F::T>();
    let mut counts = params.count_occurrences;

    for _ in 0..params.c_samples / F::LANES {
        let indexes = reader.next();
        let weight = if WEIGHT {
            let w = F::load(weights);
            weights = weights.add(F::LANES);
            w
        } else {
            F::zero()
        };
        let occurrences = if COUNT {
            let c = <F::Int as SimdInt>::load_bytes(counts);
            counts = counts.add(F::LANES);
            c
        } else {
            <F::Int as SimdInt>::zero()
        };

        accumulate::<F, HESSIAN, WEIGHT, COUNT>(&bins, indexes, weight, occurrences, gradients);
        gradients = gradients.add(stride);
    }
}

/// Accumulate per-bin sums over the flattened tensor of several features
///
/// # Safety
///
/// `params` must describe valid buffers for `params.c_samples` samples, and
/// the bin buffer must hold `prod(bins_per_dim)` bins.
pub(crate) unsafe fn bin_sums_interaction<F: SimdFloat>(
    params: &mut BinSumsInteractionBridge,
) -> ErrorCode {
    if params.c_samples % F::LANES != 0
        || params.c_scores == 0
        || params.c_dimensions == 0
        || params.c_dimensions > MAX_DIMENSIONS
    {
        return ErrorCode::IllegalParamVal;
    }
    match (params.hessian, !params.weights.is_null()) {
        (false, false) => interaction::<F, false, false>(params),
        (false, true) => interaction::<F, false, true>(params),
        (true, false) => interaction::<F, true, false>(params),
        (true, true) => interaction::<F, true, true>(params),
    }
    ErrorCode::None
}

unsafe fn interaction<F: SimdFloat, const HESSIAN: bool, const WEIGHT: bool>(
    params: &BinSumsInteractionBridge,
) {
    let c_dimensions = params.c_dimensions;
    let bins = Bins::<F>::new(params.bins, params.c_scores, HESSIAN, params.debug_bins_end);

    let mut readers = [PackedReader::<F::Int>::none(); MAX_DIMENSIONS];
    let mut multipliers = [UIntOf::<F>::default(); MAX_DIMENSIONS];
    let mut tensor_bins = 1usize;
    for d in 0..c_dimensions {
        readers[d] = PackedReader::new(params.items_per_bit_pack[d], params.packed[d]);
        multipliers[d] = UIntOf::<F>::from_usize(tensor_bins);
        tensor_bins *= params.bins_per_dim[d];
    }

    let stride = params.c_scores * if HESSIAN { 2 } else { 1 } * F::LANES;
    let mut gradients = params.gradients_and_hessians.cast::<F::T>();
    let mut weights = params.weights.cast::<F::T>();

    for _ in 0..params.c_samples / F::LANES {
        let mut indexes = <F::Int as SimdInt>::zero();
        for d in 0..c_dimensions {
            indexes += readers[d].next().mul_scalar(multipliers[d]);
        }
        let weight = if WEIGHT {
            let w = F::load(weights);
            weights = weights.add(F::LANES);
            w
        } else {
            F::zero()
        };

        accumulate::<F, HESSIAN, WEIGHT, false>(
            &bins,
            indexes,
            weight,
            <F::Int as SimdInt>::zero(),
            gradients,
        );
        gradients = gradients.add(stride);
    }
}
