//! Shared helpers: drive a [`Compute`] from `f64` inputs in row-major order
//!
//! Inputs are converted to the zone's element width and lane layout, outputs
//! are converted back, so one test body runs unchanged on every backend.

#![allow(dead_code)]

use std::ffi::c_void;
use std::ptr;

use boostkern::bins::{BinBuffer, BinLayout, BinTotals};
use boostkern::layout;
use boostkern::pack::PackedIndices;
use boostkern::{
    ApplyUpdateBridge, BinSumsBoostingBridge, BinSumsInteractionBridge, Compute, Result,
    ITEMS_PER_BIT_PACK_NONE,
};

pub trait Element: Copy + Default {
    fn from_f64(v: f64) -> Self;
    fn to_f64(self) -> f64;
}

impl Element for f32 {
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Element for f64 {
    fn from_f64(v: f64) -> Self {
        v
    }

    fn to_f64(self) -> f64 {
        self
    }
}

pub trait Word: Copy + Default {
    fn from_u64(v: u64) -> Self;
}

impl Word for u32 {
    fn from_u64(v: u64) -> Self {
        v as u32
    }
}

impl Word for u64 {
    fn from_u64(v: u64) -> Self {
        v
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Targets<'a> {
    Regression(&'a [f64]),
    Classes(&'a [u64]),
}

/// Packed indexes of one feature (or of the update tensor)
#[derive(Debug, Clone, Copy)]
pub struct Indexes<'a> {
    pub values: &'a [usize],
    pub items_per_pack: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct UpdateCase<'a> {
    pub c_scores: usize,
    /// `c_scores` values per tensor bin
    pub tensor: &'a [f64],
    pub indexes: Option<Indexes<'a>>,
    /// Row-major `[sample][score]`
    pub scores: &'a [f64],
    pub targets: Targets<'a>,
    pub weights: Option<&'a [f64]>,
    pub gradients: bool,
    pub hessian: bool,
    pub metric: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub scores: Vec<f64>,
    pub gradients: Vec<f64>,
    pub hessians: Vec<f64>,
    pub metric: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct BinCase<'a> {
    pub c_scores: usize,
    pub hessian: bool,
    pub c_bins: usize,
    pub indexes: Option<Indexes<'a>>,
    /// Row-major `[sample][score]`
    pub gradients: &'a [f64],
    /// Same shape as `gradients`; ignored without hessians
    pub hessians: &'a [f64],
    pub weights: Option<&'a [f64]>,
    pub counts: Option<&'a [u8]>,
}

#[derive(Debug, Clone, Copy)]
pub struct Dimension<'a> {
    pub bins: usize,
    pub indexes: Indexes<'a>,
}

fn convert<T: Element>(values: &[f64]) -> Vec<T> {
    values.iter().map(|&v| T::from_f64(v)).collect()
}

fn pack(compute: &Compute, indexes: &Indexes<'_>) -> Result<PackedIndices> {
    PackedIndices::pack(
        indexes.values,
        indexes.items_per_pack,
        compute.lanes(),
        compute.uint_bytes(),
    )
}

/// Interleaved gradient buffer from row-major gradients and hessians
fn gradient_buffer<T: Element>(
    gradients: &[f64],
    hessians: &[f64],
    c_scores: usize,
    hessian: bool,
    lanes: usize,
) -> Vec<T> {
    let c_samples = gradients.len() / c_scores;
    let mut buffer = vec![T::default(); layout::gradients_len(c_samples, c_scores, hessian)];
    for s in 0..c_samples {
        for k in 0..c_scores {
            let i = s * c_scores + k;
            buffer[layout::gradient_index(s, k, c_scores, hessian, lanes)] = T::from_f64(gradients[i]);
            if hessian {
                buffer[layout::hessian_index(s, k, c_scores, lanes)] = T::from_f64(hessians[i]);
            }
        }
    }
    buffer
}

pub fn apply_update(compute: &Compute, case: &UpdateCase<'_>) -> Result<UpdateOutcome> {
    match compute.float_bytes() {
        4 => apply_update_typed::<f32, u32>(compute, case),
        _ => apply_update_typed::<f64, u64>(compute, case),
    }
}

fn apply_update_typed<T: Element, U: Word>(
    compute: &Compute,
    case: &UpdateCase<'_>,
) -> Result<UpdateOutcome> {
    let lanes = compute.lanes();
    let c_scores = case.c_scores;
    let c_samples = case.scores.len() / c_scores;

    let tensor: Vec<T> = convert(case.tensor);
    let mut scores = layout::interleave(&convert::<T>(case.scores), c_scores, lanes);
    let (float_targets, class_targets): (Vec<T>, Vec<U>) = match case.targets {
        Targets::Regression(t) => (convert(t), Vec::new()),
        Targets::Classes(t) => (Vec::new(), t.iter().map(|&v| U::from_u64(v)).collect()),
    };
    let targets: *const c_void = match case.targets {
        Targets::Regression(_) => float_targets.as_ptr().cast(),
        Targets::Classes(_) => class_targets.as_ptr().cast(),
    };
    let weights: Option<Vec<T>> = case.weights.map(convert);
    let packed = case.indexes.as_ref().map(|i| pack(compute, i)).transpose()?;
    let mut gradients =
        vec![T::default(); layout::gradients_len(c_samples, c_scores, case.hessian)];
    let mut scratch = vec![T::default(); c_scores * lanes];

    let mut data = ApplyUpdateBridge {
        c_scores,
        c_pack: case
            .indexes
            .map_or(ITEMS_PER_BIT_PACK_NONE, |i| i.items_per_pack as isize),
        hessian_needed: case.hessian,
        calc_metric: case.metric,
        multiscore_temp: scratch.as_mut_ptr().cast(),
        update_tensor_scores: tensor.as_ptr().cast(),
        c_samples,
        packed: packed.as_ref().map_or(ptr::null(), PackedIndices::as_ptr),
        targets,
        weights: weights.as_ref().map_or(ptr::null(), |w| w.as_ptr().cast()),
        sample_scores: scores.as_mut_ptr().cast(),
        gradients_and_hessians: if case.gradients {
            gradients.as_mut_ptr().cast()
        } else {
            ptr::null_mut()
        },
        metric_out: 0.0,
    };
    // SAFETY: every buffer above is sized for c_samples samples at this zone's widths
    unsafe { compute.apply_update(&mut data)? };

    let mut out_gradients = Vec::new();
    let mut out_hessians = Vec::new();
    if case.gradients {
        for s in 0..c_samples {
            for k in 0..c_scores {
                let g = layout::gradient_index(s, k, c_scores, case.hessian, lanes);
                out_gradients.push(gradients[g].to_f64());
                if case.hessian {
                    out_hessians.push(gradients[layout::hessian_index(s, k, c_scores, lanes)].to_f64());
                }
            }
        }
    }

    Ok(UpdateOutcome {
        scores: layout::deinterleave(&scores, c_scores, lanes)
            .into_iter()
            .map(Element::to_f64)
            .collect(),
        gradients: out_gradients,
        hessians: out_hessians,
        metric: data.metric_out,
    })
}

pub fn bin_sums_boosting(compute: &Compute, case: &BinCase<'_>) -> Result<Vec<BinTotals>> {
    match compute.float_bytes() {
        4 => bin_sums_boosting_typed::<f32>(compute, case),
        _ => bin_sums_boosting_typed::<f64>(compute, case),
    }
}

fn bin_sums_boosting_typed<T: Element>(
    compute: &Compute,
    case: &BinCase<'_>,
) -> Result<Vec<BinTotals>> {
    let lanes = compute.lanes();
    let c_samples = case.gradients.len() / case.c_scores;
    let gradients: Vec<T> =
        gradient_buffer(case.gradients, case.hessians, case.c_scores, case.hessian, lanes);
    let weights: Option<Vec<T>> = case.weights.map(convert);
    let packed = case.indexes.as_ref().map(|i| pack(compute, i)).transpose()?;
    let mut bins = BinBuffer::new(
        BinLayout::new(case.c_scores, case.hessian, compute.float_bytes())?,
        case.c_bins,
    );

    let mut params = BinSumsBoostingBridge {
        hessian: case.hessian,
        c_scores: case.c_scores,
        c_pack: case
            .indexes
            .map_or(ITEMS_PER_BIT_PACK_NONE, |i| i.items_per_pack as isize),
        c_samples,
        gradients_and_hessians: gradients.as_ptr().cast(),
        weights: weights.as_ref().map_or(ptr::null(), |w| w.as_ptr().cast()),
        count_occurrences: case.counts.map_or(ptr::null(), <[u8]>::as_ptr),
        packed: packed.as_ref().map_or(ptr::null(), PackedIndices::as_ptr),
        bins: bins.as_mut_ptr(),
        debug_bins_end: bins.end_ptr(),
    };
    // SAFETY: buffers sized for c_samples; callers keep indexes below c_bins
    unsafe { compute.bin_sums_boosting(&mut params)? };
    Ok(bins.totals())
}

#[allow(clippy::too_many_arguments)]
pub fn bin_sums_interaction(
    compute: &Compute,
    c_scores: usize,
    hessian: bool,
    dimensions: &[Dimension<'_>],
    gradients: &[f64],
    hessians: &[f64],
    weights: Option<&[f64]>,
) -> Result<Vec<BinTotals>> {
    match compute.float_bytes() {
        4 => bin_sums_interaction_typed::<f32>(compute, c_scores, hessian, dimensions, gradients, hessians, weights),
        _ => bin_sums_interaction_typed::<f64>(compute, c_scores, hessian, dimensions, gradients, hessians, weights),
    }
}

fn bin_sums_interaction_typed<T: Element>(
    compute: &Compute,
    c_scores: usize,
    hessian: bool,
    dimensions: &[Dimension<'_>],
    gradients: &[f64],
    hessians: &[f64],
    weights: Option<&[f64]>,
) -> Result<Vec<BinTotals>> {
    let lanes = compute.lanes();
    let c_samples = gradients.len() / c_scores;
    let gradient_values: Vec<T> = gradient_buffer(gradients, hessians, c_scores, hessian, lanes);
    let weights: Option<Vec<T>> = weights.map(convert);
    let packed = dimensions
        .iter()
        .map(|d| pack(compute, &d.indexes))
        .collect::<Result<Vec<_>>>()?;
    let c_bins: usize = dimensions.iter().map(|d| d.bins).product();
    let mut bins = BinBuffer::new(BinLayout::new(c_scores, hessian, compute.float_bytes())?, c_bins);

    let mut params = BinSumsInteractionBridge {
        hessian,
        c_scores,
        c_samples,
        gradients_and_hessians: gradient_values.as_ptr().cast(),
        weights: weights.as_ref().map_or(ptr::null(), |w| w.as_ptr().cast()),
        c_dimensions: dimensions.len(),
        bins: bins.as_mut_ptr(),
        debug_bins_end: bins.end_ptr(),
        ..Default::default()
    };
    for (d, (dimension, words)) in dimensions.iter().zip(&packed).enumerate() {
        params.bins_per_dim[d] = dimension.bins;
        params.items_per_bit_pack[d] = dimension.indexes.items_per_pack as isize;
        params.packed[d] = words.as_ptr();
    }
    // SAFETY: buffers sized for c_samples; the bin buffer holds prod(bins) bins
    unsafe { compute.bin_sums_interaction(&mut params)? };
    Ok(bins.totals())
}

/// Deterministic values in `[-range, range]` on a 1/64 grid (exact in f32)
pub fn grid_values(n: usize, seed: u64, range: f64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            ((unit * 2.0 - 1.0) * range * 64.0).round() / 64.0
        })
        .collect()
}

/// Deterministic indexes in `0..bound`
pub fn grid_indexes(n: usize, seed: u64, bound: usize) -> Vec<usize> {
    grid_values(n, seed, 1.0)
        .into_iter()
        .map(|v| ((v + 1.0) * 64.0) as usize % bound)
        .collect()
}
