//! AVX2 zone (x86_64 256-bit SIMD)
//!
//! Eight 32-bit lanes. Requires AVX2 and FMA; available on Intel Haswell
//! (2013+) and AMD Excavator (2015+) CPUs.
//!
//! # Safety
//!
//! The vector types are crate-private and only built inside kernels entered
//! through [`SimdFloat::vectorize`], which the zone only reaches after
//! [`Backend::Avx2`](crate::Backend::Avx2) has been detected. Intrinsic calls
//! on register values rely on this alone; pointer-level requirements are
//! noted where they occur.

use std::arch::x86_64::*;
use std::ffi::c_char;

use super::{SimdFloat, SimdInt};
use crate::bridge::ObjectiveWrapper;
use crate::config::Config;
use crate::error::ErrorCode;
use crate::objective::registrations;
use crate::zone;

/// Eight `u32` lanes
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub(crate) struct Avx2Int(__m256i);

/// Eight `f32` lanes
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub(crate) struct Avx2Float(__m256);

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn with_avx2<R>(func: impl FnOnce() -> R) -> R {
    func()
}

impl SimdInt for Avx2Int {
    type T = u32;
    type Array = [u32; 8];
    const LANES: usize = 8;

    #[inline(always)]
    fn splat(v: u32) -> Self {
        Self(unsafe { _mm256_set1_epi32(v as i32) })
    }

    #[inline(always)]
    unsafe fn load(ptr: *const u32) -> Self {
        Self(_mm256_loadu_si256(ptr.cast()))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u32) {
        _mm256_storeu_si256(ptr.cast(), self.0)
    }

    #[inline(always)]
    fn mul_scalar(self, v: u32) -> Self {
        Self(unsafe { _mm256_mullo_epi32(self.0, _mm256_set1_epi32(v as i32)) })
    }

    #[inline(always)]
    fn make_indexes() -> Self {
        Self(unsafe { _mm256_setr_epi32(0, 1, 2, 3, 4, 5, 6, 7) })
    }

    #[inline(always)]
    fn to_array(self) -> [u32; 8] {
        let mut lanes = [0u32; 8];
        // SAFETY: lanes holds exactly 8 u32
        unsafe { self.store(lanes.as_mut_ptr()) };
        lanes
    }

    #[inline(always)]
    fn from_array(a: [u32; 8]) -> Self {
        // SAFETY: a holds exactly 8 u32
        unsafe { Self::load(a.as_ptr()) }
    }
}

impl std::ops::Add for Avx2Int {
    type Output = Self;
    #[inline(always)]
    fn add(self, other: Self) -> Self {
        Self(unsafe { _mm256_add_epi32(self.0, other.0) })
    }
}

impl std::ops::AddAssign for Avx2Int {
    #[inline(always)]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl std::ops::BitAnd for Avx2Int {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, other: Self) -> Self {
        Self(unsafe { _mm256_and_si256(self.0, other.0) })
    }
}

impl std::ops::Shr<u32> for Avx2Int {
    type Output = Self;
    #[inline(always)]
    fn shr(self, shift: u32) -> Self {
        Self(unsafe { _mm256_srl_epi32(self.0, _mm_cvtsi32_si128(shift as i32)) })
    }
}

impl std::ops::Shl<u32> for Avx2Int {
    type Output = Self;
    #[inline(always)]
    fn shl(self, shift: u32) -> Self {
        Self(unsafe { _mm256_sll_epi32(self.0, _mm_cvtsi32_si128(shift as i32)) })
    }
}

impl SimdFloat for Avx2Float {
    type T = f32;
    type Int = Avx2Int;
    type Array = [f32; 8];
    const LANES: usize = 8;

    #[inline(always)]
    fn splat(v: f32) -> Self {
        Self(unsafe { _mm256_set1_ps(v) })
    }

    #[inline(always)]
    unsafe fn load(ptr: *const f32) -> Self {
        Self(_mm256_loadu_ps(ptr))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut f32) {
        _mm256_storeu_ps(ptr, self.0)
    }

    /// Indexes are interpreted as signed, so they must stay below 2^31
    #[inline(always)]
    unsafe fn gather(ptr: *const f32, idx: Avx2Int) -> Self {
        Self(_mm256_i32gather_ps::<4>(ptr, idx.0))
    }

    #[inline(always)]
    fn to_array(self) -> [f32; 8] {
        let mut lanes = [0f32; 8];
        // SAFETY: lanes holds exactly 8 f32
        unsafe { self.store(lanes.as_mut_ptr()) };
        lanes
    }

    #[inline(always)]
    fn from_array(a: [f32; 8]) -> Self {
        // SAFETY: a holds exactly 8 f32
        unsafe { Self::load(a.as_ptr()) }
    }

    #[inline(always)]
    fn if_less(cmp1: Self, cmp2: Self, true_val: Self, false_val: Self) -> Self {
        unsafe {
            let mask = _mm256_cmp_ps::<_CMP_LT_OQ>(cmp1.0, cmp2.0);
            Self(_mm256_blendv_ps(false_val.0, true_val.0, mask))
        }
    }

    #[inline(always)]
    fn if_equal(cmp1: Avx2Int, cmp2: Avx2Int, true_val: Self, false_val: Self) -> Self {
        unsafe {
            let mask = _mm256_castsi256_ps(_mm256_cmpeq_epi32(cmp1.0, cmp2.0));
            Self(_mm256_blendv_ps(false_val.0, true_val.0, mask))
        }
    }

    #[inline(always)]
    fn abs(self) -> Self {
        Self(unsafe { _mm256_andnot_ps(_mm256_set1_ps(-0.0), self.0) })
    }

    #[inline(always)]
    fn sqrt(self) -> Self {
        Self(unsafe { _mm256_sqrt_ps(self.0) })
    }

    #[inline(always)]
    fn sum(self) -> f32 {
        unsafe {
            let low = _mm256_castps256_ps128(self.0);
            let high = _mm256_extractf128_ps::<1>(self.0);
            let quad = _mm_add_ps(low, high);
            let pair = _mm_hadd_ps(quad, quad);
            _mm_cvtss_f32(_mm_hadd_ps(pair, pair))
        }
    }

    #[inline(always)]
    fn from_int(v: Avx2Int) -> Self {
        Self(unsafe { _mm256_cvtepi32_ps(v.0) })
    }

    #[inline(always)]
    unsafe fn vectorize<R>(func: impl FnOnce() -> R) -> R {
        with_avx2(func)
    }
}

impl std::ops::Neg for Avx2Float {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self(unsafe { _mm256_xor_ps(self.0, _mm256_set1_ps(-0.0)) })
    }
}

intrinsic_float_ops!(Avx2Float, _mm256_add_ps, _mm256_sub_ps, _mm256_mul_ps, _mm256_div_ps);

/// Construct the named objective for the AVX2 zone
///
/// # Safety
///
/// The CPU must support AVX2 and FMA. `config` and `wrapper` must be null or
/// valid pointers; `name..name_end` must be a readable byte range, or `name` a
/// NUL-terminated string when `name_end` is null.
pub unsafe extern "C" fn create_objective_avx2_32(
    config: *const Config,
    name: *const c_char,
    name_end: *const c_char,
    wrapper: *mut ObjectiveWrapper,
) -> ErrorCode {
    zone::create_objective::<Avx2Float>(
        "avx2",
        &registrations::<Avx2Float>(),
        config,
        name,
        name_end,
        wrapper,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avx2_detected() -> bool {
        is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma")
    }

    #[test]
    fn test_avx2_arithmetic_and_sum() {
        if !avx2_detected() {
            eprintln!("Skipping AVX2 test: CPU does not support AVX2+FMA");
            return;
        }
        let a = Avx2Float::from_array([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let b = Avx2Float::splat(0.5);
        assert_eq!((a * b).to_array(), [0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0]);
        assert_eq!(a.sum(), 36.0);
        assert_eq!((-a).abs().to_array(), a.to_array());
    }

    #[test]
    fn test_avx2_gather() {
        if !avx2_detected() {
            eprintln!("Skipping AVX2 test: CPU does not support AVX2+FMA");
            return;
        }
        let table: Vec<f32> = (0..16).map(|i| i as f32 * 10.0).collect();
        let idx = Avx2Int::from_array([15, 0, 3, 3, 7, 8, 1, 2]);
        let v = unsafe { Avx2Float::gather(table.as_ptr(), idx) };
        assert_eq!(v.to_array(), [150.0, 0.0, 30.0, 30.0, 70.0, 80.0, 10.0, 20.0]);
    }

    #[test]
    fn test_avx2_select_ordered() {
        if !avx2_detected() {
            eprintln!("Skipping AVX2 test: CPU does not support AVX2+FMA");
            return;
        }
        let cmp1 = Avx2Float::from_array([f32::NAN, -0.0, 1.0, 0.0, 1.0, 2.0, 3.0, -1.0]);
        let cmp2 = Avx2Float::from_array([1.0, 0.0, 2.0, f32::NAN, 1.0, 1.0, 4.0, 0.0]);
        let r = Avx2Float::if_less(cmp1, cmp2, Avx2Float::splat(1.0), Avx2Float::splat(0.0));
        assert_eq!(r.to_array(), [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_avx2_int_ops() {
        if !avx2_detected() {
            eprintln!("Skipping AVX2 test: CPU does not support AVX2+FMA");
            return;
        }
        let v = Avx2Int::make_indexes();
        assert_eq!(v.mul_scalar(3).to_array(), [0, 3, 6, 9, 12, 15, 18, 21]);
        assert_eq!((Avx2Int::splat(0xABCD) >> 8).to_array(), [0xAB; 8]);
        assert_eq!((Avx2Int::splat(1) << 40).to_array(), [0; 8]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn lane_value() -> impl Strategy<Value = f32> {
            prop_oneof![
                4 => (-1000i32..1000).prop_map(|v| v as f32 / 8.0),
                1 => Just(0.0f32),
                1 => Just(-0.0f32),
                1 => Just(f32::NAN),
                1 => Just(f32::INFINITY),
                1 => Just(f32::NEG_INFINITY),
            ]
        }

        fn lanes() -> impl Strategy<Value = [f32; 8]> {
            prop::array::uniform8(lane_value())
        }

        fn bits(v: [f32; 8]) -> [u32; 8] {
            v.map(f32::to_bits)
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            #[test]
            fn prop_if_less_ordered(a in lanes(), b in lanes(), t in lanes(), f in lanes()) {
                if !avx2_detected() {
                    return Ok(());
                }
                let r = Avx2Float::if_less(
                    Avx2Float::from_array(a),
                    Avx2Float::from_array(b),
                    Avx2Float::from_array(t),
                    Avx2Float::from_array(f),
                );
                let expected: [f32; 8] = std::array::from_fn(|i| if a[i] < b[i] { t[i] } else { f[i] });
                prop_assert_eq!(bits(r.to_array()), bits(expected));
            }

            #[test]
            fn prop_if_equal_on_int_keys(
                a in prop::array::uniform8(0u32..4),
                b in prop::array::uniform8(0u32..4),
                t in lanes(),
                f in lanes(),
            ) {
                if !avx2_detected() {
                    return Ok(());
                }
                let r = Avx2Float::if_equal(
                    Avx2Int::from_array(a),
                    Avx2Int::from_array(b),
                    Avx2Float::from_array(t),
                    Avx2Float::from_array(f),
                );
                let expected: [f32; 8] = std::array::from_fn(|i| if a[i] == b[i] { t[i] } else { f[i] });
                prop_assert_eq!(bits(r.to_array()), bits(expected));
            }

            #[test]
            fn prop_array_round_trip_bit_identical(values in lanes(), ints in prop::array::uniform8(any::<u32>())) {
                if !avx2_detected() {
                    return Ok(());
                }
                prop_assert_eq!(bits(Avx2Float::from_array(values).to_array()), bits(values));
                prop_assert_eq!(Avx2Int::from_array(ints).to_array(), ints);

                // one element past an aligned start
                let mut buffer = [0f32; 9];
                buffer[1..].copy_from_slice(&values);
                let mut out = [0f32; 9];
                unsafe { Avx2Float::load(buffer.as_ptr().add(1)).store(out.as_mut_ptr().add(1)) };
                let stored: Vec<u32> = out[1..].iter().map(|v| v.to_bits()).collect();
                prop_assert_eq!(stored, bits(values).to_vec());
            }

            #[test]
            fn prop_gather_matches_indexing(
                table in prop::collection::vec(lane_value(), 64),
                idx in prop::array::uniform8(0u32..64),
            ) {
                if !avx2_detected() {
                    return Ok(());
                }
                let v = unsafe { Avx2Float::gather(table.as_ptr(), Avx2Int::from_array(idx)) };
                let expected = idx.map(|i| table[i as usize]);
                prop_assert_eq!(bits(v.to_array()), bits(expected));
            }

            #[test]
            fn prop_sum_matches_fold(values in prop::array::uniform8((-1000i32..1000).prop_map(|v| v as f32 / 8.0))) {
                if !avx2_detected() {
                    return Ok(());
                }
                // eighths below 2^10 sum exactly in f32
                let expected = values.iter().fold(0.0f32, |acc, v| acc + v);
                prop_assert_eq!(Avx2Float::from_array(values).sum(), expected);
            }
        }
    }
}
