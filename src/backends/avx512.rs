//! AVX-512 zone (x86_64 512-bit SIMD)
//!
//! Sixteen 32-bit lanes. Requires AVX-512F; available on Intel Skylake-X
//! (2017+) and AMD Zen 4 (2022+) CPUs.
//!
//! Comparisons produce `__mmask16` values instead of vector masks, so selects
//! go through the masked blend instructions.
//!
//! # Safety
//!
//! The vector types are crate-private and only built inside kernels entered
//! through [`SimdFloat::vectorize`], after
//! [`Backend::Avx512f`](crate::Backend::Avx512f) has been detected. Intrinsic
//! calls on register values rely on this alone.

use std::arch::x86_64::*;
use std::ffi::c_char;

use super::{SimdFloat, SimdInt};
use crate::bridge::ObjectiveWrapper;
use crate::config::Config;
use crate::error::ErrorCode;
use crate::objective::registrations;
use crate::zone;

/// Sixteen `u32` lanes
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub(crate) struct Avx512Int(__m512i);

/// Sixteen `f32` lanes
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub(crate) struct Avx512Float(__m512);

#[target_feature(enable = "avx512f")]
unsafe fn with_avx512f<R>(func: impl FnOnce() -> R) -> R {
    func()
}

impl SimdInt for Avx512Int {
    type T = u32;
    type Array = [u32; 16];
    const LANES: usize = 16;

    #[inline(always)]
    fn splat(v: u32) -> Self {
        Self(unsafe { _mm512_set1_epi32(v as i32) })
    }

    #[inline(always)]
    unsafe fn load(ptr: *const u32) -> Self {
        Self(_mm512_loadu_si512(ptr.cast()))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u32) {
        _mm512_storeu_si512(ptr.cast(), self.0)
    }

    #[inline(always)]
    fn mul_scalar(self, v: u32) -> Self {
        Self(unsafe { _mm512_mullo_epi32(self.0, _mm512_set1_epi32(v as i32)) })
    }

    #[inline(always)]
    fn to_array(self) -> [u32; 16] {
        let mut lanes = [0u32; 16];
        // SAFETY: lanes holds exactly 16 u32
        unsafe { self.store(lanes.as_mut_ptr()) };
        lanes
    }

    #[inline(always)]
    fn from_array(a: [u32; 16]) -> Self {
        // SAFETY: a holds exactly 16 u32
        unsafe { Self::load(a.as_ptr()) }
    }
}

impl std::ops::Add for Avx512Int {
    type Output = Self;
    #[inline(always)]
    fn add(self, other: Self) -> Self {
        Self(unsafe { _mm512_add_epi32(self.0, other.0) })
    }
}

impl std::ops::AddAssign for Avx512Int {
    #[inline(always)]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl std::ops::BitAnd for Avx512Int {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, other: Self) -> Self {
        Self(unsafe { _mm512_and_si512(self.0, other.0) })
    }
}

impl std::ops::Shr<u32> for Avx512Int {
    type Output = Self;
    #[inline(always)]
    fn shr(self, shift: u32) -> Self {
        Self(unsafe { _mm512_srl_epi32(self.0, _mm_cvtsi32_si128(shift as i32)) })
    }
}

impl std::ops::Shl<u32> for Avx512Int {
    type Output = Self;
    #[inline(always)]
    fn shl(self, shift: u32) -> Self {
        Self(unsafe { _mm512_sll_epi32(self.0, _mm_cvtsi32_si128(shift as i32)) })
    }
}

impl SimdFloat for Avx512Float {
    type T = f32;
    type Int = Avx512Int;
    type Array = [f32; 16];
    const LANES: usize = 16;

    #[inline(always)]
    fn splat(v: f32) -> Self {
        Self(unsafe { _mm512_set1_ps(v) })
    }

    #[inline(always)]
    unsafe fn load(ptr: *const f32) -> Self {
        Self(_mm512_loadu_ps(ptr))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut f32) {
        _mm512_storeu_ps(ptr, self.0)
    }

    /// Indexes are interpreted as signed, so they must stay below 2^31
    #[inline(always)]
    unsafe fn gather(ptr: *const f32, idx: Avx512Int) -> Self {
        Self(_mm512_i32gather_ps::<4>(idx.0, ptr.cast()))
    }

    #[inline(always)]
    fn to_array(self) -> [f32; 16] {
        let mut lanes = [0f32; 16];
        // SAFETY: lanes holds exactly 16 f32
        unsafe { self.store(lanes.as_mut_ptr()) };
        lanes
    }

    #[inline(always)]
    fn from_array(a: [f32; 16]) -> Self {
        // SAFETY: a holds exactly 16 f32
        unsafe { Self::load(a.as_ptr()) }
    }

    #[inline(always)]
    fn if_less(cmp1: Self, cmp2: Self, true_val: Self, false_val: Self) -> Self {
        unsafe {
            let mask = _mm512_cmp_ps_mask::<_CMP_LT_OQ>(cmp1.0, cmp2.0);
            Self(_mm512_mask_blend_ps(mask, false_val.0, true_val.0))
        }
    }

    #[inline(always)]
    fn if_equal(cmp1: Avx512Int, cmp2: Avx512Int, true_val: Self, false_val: Self) -> Self {
        unsafe {
            let mask = _mm512_cmpeq_epi32_mask(cmp1.0, cmp2.0);
            Self(_mm512_mask_blend_ps(mask, false_val.0, true_val.0))
        }
    }

    #[inline(always)]
    fn abs(self) -> Self {
        Self(unsafe { _mm512_abs_ps(self.0) })
    }

    #[inline(always)]
    fn sqrt(self) -> Self {
        Self(unsafe { _mm512_sqrt_ps(self.0) })
    }

    #[inline(always)]
    fn sum(self) -> f32 {
        unsafe { _mm512_reduce_add_ps(self.0) }
    }

    #[inline(always)]
    fn from_int(v: Avx512Int) -> Self {
        Self(unsafe { _mm512_cvtepi32_ps(v.0) })
    }

    #[inline(always)]
    unsafe fn vectorize<R>(func: impl FnOnce() -> R) -> R {
        with_avx512f(func)
    }
}

impl std::ops::Neg for Avx512Float {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        unsafe {
            let sign = _mm512_set1_epi32(i32::MIN);
            Self(_mm512_castsi512_ps(_mm512_xor_si512(_mm512_castps_si512(self.0), sign)))
        }
    }
}

intrinsic_float_ops!(Avx512Float, _mm512_add_ps, _mm512_sub_ps, _mm512_mul_ps, _mm512_div_ps);

/// Construct the named objective for the AVX-512 zone
///
/// # Safety
///
/// The CPU must support AVX-512F. `config` and `wrapper` must be null or valid
/// pointers; `name..name_end` must be a readable byte range, or `name` a
/// NUL-terminated string when `name_end` is null.
pub unsafe extern "C" fn create_objective_avx512f_32(
    config: *const Config,
    name: *const c_char,
    name_end: *const c_char,
    wrapper: *mut ObjectiveWrapper,
) -> ErrorCode {
    zone::create_objective::<Avx512Float>(
        "avx512f",
        &registrations::<Avx512Float>(),
        config,
        name,
        name_end,
        wrapper,
    )
}
