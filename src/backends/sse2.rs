//! SSE2 zone (x86_64 baseline SIMD)
//!
//! Four 32-bit lanes in 128-bit registers. SSE2 is part of the x86_64 baseline,
//! so this zone is always available on x86_64.
//!
//! SSE2 has no 32-bit low multiply or gather; both fall back to per-lane code.
//!
//! # Safety
//!
//! Intrinsic calls on register values need nothing beyond the x86_64
//! baseline; pointer-level requirements are noted where they occur.

use std::arch::x86_64::*;
use std::ffi::c_char;

use super::{SimdFloat, SimdInt};
use crate::bridge::ObjectiveWrapper;
use crate::config::Config;
use crate::error::ErrorCode;
use crate::objective::registrations;
use crate::zone;

/// Four `u32` lanes
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct Sse2Int(__m128i);

/// Four `f32` lanes
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct Sse2Float(__m128);

impl SimdInt for Sse2Int {
    type T = u32;
    type Array = [u32; 4];
    const LANES: usize = 4;

    #[inline(always)]
    fn splat(v: u32) -> Self {
        Self(unsafe { _mm_set1_epi32(v as i32) })
    }

    #[inline(always)]
    unsafe fn load(ptr: *const u32) -> Self {
        Self(_mm_loadu_si128(ptr.cast()))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u32) {
        _mm_storeu_si128(ptr.cast(), self.0)
    }

    #[inline(always)]
    fn mul_scalar(self, v: u32) -> Self {
        let mut lanes = self.to_array();
        for lane in &mut lanes {
            *lane = lane.wrapping_mul(v);
        }
        Self::from_array(lanes)
    }

    #[inline(always)]
    fn make_indexes() -> Self {
        Self(unsafe { _mm_setr_epi32(0, 1, 2, 3) })
    }

    #[inline(always)]
    fn to_array(self) -> [u32; 4] {
        let mut lanes = [0u32; 4];
        // SAFETY: lanes holds exactly 4 u32
        unsafe { self.store(lanes.as_mut_ptr()) };
        lanes
    }

    #[inline(always)]
    fn from_array(a: [u32; 4]) -> Self {
        // SAFETY: a holds exactly 4 u32
        unsafe { Self::load(a.as_ptr()) }
    }
}

impl std::ops::Add for Sse2Int {
    type Output = Self;
    #[inline(always)]
    fn add(self, other: Self) -> Self {
        Self(unsafe { _mm_add_epi32(self.0, other.0) })
    }
}

impl std::ops::AddAssign for Sse2Int {
    #[inline(always)]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl std::ops::BitAnd for Sse2Int {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, other: Self) -> Self {
        Self(unsafe { _mm_and_si128(self.0, other.0) })
    }
}

impl std::ops::Shr<u32> for Sse2Int {
    type Output = Self;
    #[inline(always)]
    fn shr(self, shift: u32) -> Self {
        // counts >= 32 clear the lane
        Self(unsafe { _mm_srl_epi32(self.0, _mm_cvtsi32_si128(shift as i32)) })
    }
}

impl std::ops::Shl<u32> for Sse2Int {
    type Output = Self;
    #[inline(always)]
    fn shl(self, shift: u32) -> Self {
        // counts >= 32 clear the lane
        Self(unsafe { _mm_sll_epi32(self.0, _mm_cvtsi32_si128(shift as i32)) })
    }
}

impl SimdFloat for Sse2Float {
    type T = f32;
    type Int = Sse2Int;
    type Array = [f32; 4];
    const LANES: usize = 4;

    #[inline(always)]
    fn splat(v: f32) -> Self {
        Self(unsafe { _mm_set1_ps(v) })
    }

    #[inline(always)]
    unsafe fn load(ptr: *const f32) -> Self {
        Self(_mm_loadu_ps(ptr))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut f32) {
        _mm_storeu_ps(ptr, self.0)
    }

    #[inline(always)]
    fn to_array(self) -> [f32; 4] {
        let mut lanes = [0f32; 4];
        // SAFETY: lanes holds exactly 4 f32
        unsafe { self.store(lanes.as_mut_ptr()) };
        lanes
    }

    #[inline(always)]
    fn from_array(a: [f32; 4]) -> Self {
        // SAFETY: a holds exactly 4 f32
        unsafe { Self::load(a.as_ptr()) }
    }

    #[inline(always)]
    fn if_less(cmp1: Self, cmp2: Self, true_val: Self, false_val: Self) -> Self {
        unsafe {
            let mask = _mm_cmplt_ps(cmp1.0, cmp2.0);
            Self(_mm_or_ps(
                _mm_and_ps(mask, true_val.0),
                _mm_andnot_ps(mask, false_val.0),
            ))
        }
    }

    #[inline(always)]
    fn if_equal(cmp1: Sse2Int, cmp2: Sse2Int, true_val: Self, false_val: Self) -> Self {
        unsafe {
            let mask = _mm_castsi128_ps(_mm_cmpeq_epi32(cmp1.0, cmp2.0));
            Self(_mm_or_ps(
                _mm_and_ps(mask, true_val.0),
                _mm_andnot_ps(mask, false_val.0),
            ))
        }
    }

    #[inline(always)]
    fn abs(self) -> Self {
        Self(unsafe { _mm_andnot_ps(_mm_set1_ps(-0.0), self.0) })
    }

    #[inline(always)]
    fn sqrt(self) -> Self {
        Self(unsafe { _mm_sqrt_ps(self.0) })
    }

    #[inline(always)]
    fn sum(self) -> f32 {
        unsafe {
            // (0+2, 1+3), then the two halves
            let pairs = _mm_add_ps(self.0, _mm_movehl_ps(self.0, self.0));
            let total = _mm_add_ss(pairs, _mm_shuffle_ps::<1>(pairs, pairs));
            _mm_cvtss_f32(total)
        }
    }

    #[inline(always)]
    fn from_int(v: Sse2Int) -> Self {
        Self(unsafe { _mm_cvtepi32_ps(v.0) })
    }
}

impl std::ops::Neg for Sse2Float {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self(unsafe { _mm_xor_ps(self.0, _mm_set1_ps(-0.0)) })
    }
}

intrinsic_float_ops!(Sse2Float, _mm_add_ps, _mm_sub_ps, _mm_mul_ps, _mm_div_ps);

/// Construct the named objective for the SSE2 zone
///
/// # Safety
///
/// `config` and `wrapper` must be null or valid pointers; `name..name_end`
/// must be a readable byte range, or `name` a NUL-terminated string when
/// `name_end` is null.
pub unsafe extern "C" fn create_objective_sse2_32(
    config: *const Config,
    name: *const c_char,
    name_end: *const c_char,
    wrapper: *mut ObjectiveWrapper,
) -> ErrorCode {
    zone::create_objective::<Sse2Float>(
        "sse2",
        &registrations::<Sse2Float>(),
        config,
        name,
        name_end,
        wrapper,
    )
}
