//! Index arithmetic for the lane-interleaved sample buffers
//!
//! Samples are processed in groups of `lanes`. Within a group, every per-score
//! quantity is stored as one contiguous lane vector, so sample `s` of group
//! `b = s / lanes` lives at lane `l = s % lanes` of each vector.
//!
//! # Examples
//!
//! ```
//! use boostkern::layout;
//!
//! // 4 lanes, 2 scores: sample 5 is lane 1 of group 1
//! assert_eq!(layout::score_index(5, 0, 2, 4), 9);
//! assert_eq!(layout::score_index(5, 1, 2, 4), 13);
//! ```

/// Slot of score `score` of `sample` in the sample-score buffer
#[inline]
pub fn score_index(sample: usize, score: usize, c_scores: usize, lanes: usize) -> usize {
    let (group, lane) = (sample / lanes, sample % lanes);
    (group * c_scores + score) * lanes + lane
}

/// Slot of the gradient of `score` of `sample`
#[inline]
pub fn gradient_index(
    sample: usize,
    score: usize,
    c_scores: usize,
    hessian: bool,
    lanes: usize,
) -> usize {
    let per_score = if hessian { 2 } else { 1 };
    let (group, lane) = (sample / lanes, sample % lanes);
    (group * c_scores + score) * per_score * lanes + lane
}

/// Slot of the hessian of `score` of `sample` (gradients interleaved with hessians)
#[inline]
pub fn hessian_index(sample: usize, score: usize, c_scores: usize, lanes: usize) -> usize {
    gradient_index(sample, score, c_scores, true, lanes) + lanes
}

/// Elements in a gradient buffer for `c_samples` samples
#[inline]
pub fn gradients_len(c_samples: usize, c_scores: usize, hessian: bool) -> usize {
    c_samples * c_scores * if hessian { 2 } else { 1 }
}

/// Rearrange row-major `[sample][score]` values into the interleaved layout
///
/// `values.len()` must be a multiple of `c_scores * lanes`.
pub fn interleave<T: Copy + Default>(values: &[T], c_scores: usize, lanes: usize) -> Vec<T> {
    let mut out = vec![T::default(); values.len()];
    for (i, &v) in values.iter().enumerate() {
        let (sample, score) = (i / c_scores, i % c_scores);
        out[score_index(sample, score, c_scores, lanes)] = v;
    }
    out
}

/// Inverse of [`interleave`]
pub fn deinterleave<T: Copy + Default>(values: &[T], c_scores: usize, lanes: usize) -> Vec<T> {
    let mut out = vec![T::default(); values.len()];
    for (i, slot) in out.iter_mut().enumerate() {
        let (sample, score) = (i / c_scores, i % c_scores);
        *slot = values[score_index(sample, score, c_scores, lanes)];
    }
    out
}

/// Round `c_samples` up to a whole number of lane groups
#[inline]
pub fn padded_samples(c_samples: usize, lanes: usize) -> usize {
    c_samples.div_ceil(lanes) * lanes
}
