//! Lane-vector types for each compute zone
//!
//! Every zone provides a float/int vector pair that implements [`SimdFloat`] and
//! [`SimdInt`]. The generic kernels in [`crate::kernels`] are written once
//! against these traits and monomorphized per zone, so the numeric code never
//! names an instruction set.
//!
//! # Safety
//!
//! All intrinsics are isolated inside the zone modules. `load`/`store`/`gather`
//! take raw pointers because the kernels walk caller-owned bridge buffers; the
//! pointer contracts are documented on each method. Loads and stores tolerate
//! unaligned addresses.
//!
//! # Zones
//!
//! - `cpu64`: portable 64-bit single lane (f64/u64)
//! - `sse2`: x86_64 baseline SIMD (4 x 32-bit)
//! - `avx2`: x86_64 256-bit SIMD (8 x 32-bit)
//! - `avx512`: x86_64 512-bit SIMD (16 x 32-bit)
//! - `accel`: accelerator device-thread model (1 x 32-bit)

use std::fmt::Debug;
use std::ops::{
    Add, AddAssign, BitAnd, Div, DivAssign, Mul, MulAssign, Neg, Shl, Shr, Sub, SubAssign,
};

/// Implements a one-lane float/int vector pair over plain scalars.
///
/// Used by the zones whose "vector" is a single element: the 64-bit CPU zone
/// and the accelerator thread model.
macro_rules! single_lane_vectors {
    ($float:ident, $int:ident, $f:ty, $u:ty) => {
        /// One-lane unsigned integer vector
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(transparent)]
        pub struct $int(pub(crate) $u);

        impl $crate::backends::SimdInt for $int {
            type T = $u;
            type Array = [$u; 1];
            const LANES: usize = 1;

            #[inline(always)]
            fn splat(v: $u) -> Self {
                Self(v)
            }

            #[inline(always)]
            unsafe fn load(ptr: *const $u) -> Self {
                Self(ptr.read_unaligned())
            }

            #[inline(always)]
            unsafe fn store(self, ptr: *mut $u) {
                ptr.write_unaligned(self.0)
            }

            #[inline(always)]
            fn mul_scalar(self, v: $u) -> Self {
                Self(self.0.wrapping_mul(v))
            }

            #[inline(always)]
            fn make_indexes() -> Self {
                Self(0)
            }

            #[inline(always)]
            fn to_array(self) -> [$u; 1] {
                [self.0]
            }

            #[inline(always)]
            fn from_array(a: [$u; 1]) -> Self {
                Self(a[0])
            }
        }

        impl std::ops::Add for $int {
            type Output = Self;
            #[inline(always)]
            fn add(self, other: Self) -> Self {
                Self(self.0.wrapping_add(other.0))
            }
        }

        impl std::ops::AddAssign for $int {
            #[inline(always)]
            fn add_assign(&mut self, other: Self) {
                *self = *self + other;
            }
        }

        impl std::ops::BitAnd for $int {
            type Output = Self;
            #[inline(always)]
            fn bitand(self, other: Self) -> Self {
                Self(self.0 & other.0)
            }
        }

        // Shifts at or past the lane width yield 0, matching the vector
        // shift-by-register instructions of the SIMD zones.
        impl std::ops::Shr<u32> for $int {
            type Output = Self;
            #[inline(always)]
            fn shr(self, shift: u32) -> Self {
                Self(self.0.checked_shr(shift).unwrap_or(0))
            }
        }

        impl std::ops::Shl<u32> for $int {
            type Output = Self;
            #[inline(always)]
            fn shl(self, shift: u32) -> Self {
                Self(self.0.checked_shl(shift).unwrap_or(0))
            }
        }

        /// One-lane float vector
        #[derive(Debug, Clone, Copy, PartialEq)]
        #[repr(transparent)]
        pub struct $float(pub(crate) $f);

        impl $crate::backends::SimdFloat for $float {
            type T = $f;
            type Int = $int;
            type Array = [$f; 1];
            const LANES: usize = 1;

            #[inline(always)]
            fn splat(v: $f) -> Self {
                Self(v)
            }

            #[inline(always)]
            unsafe fn load(ptr: *const $f) -> Self {
                Self(ptr.read_unaligned())
            }

            #[inline(always)]
            unsafe fn store(self, ptr: *mut $f) {
                ptr.write_unaligned(self.0)
            }

            #[inline(always)]
            unsafe fn gather(ptr: *const $f, idx: $int) -> Self {
                Self(ptr.add(idx.0 as usize).read_unaligned())
            }

            #[inline(always)]
            unsafe fn scatter(self, ptr: *mut $f, idx: $int) {
                ptr.add(idx.0 as usize).write_unaligned(self.0)
            }

            #[inline(always)]
            fn to_array(self) -> [$f; 1] {
                [self.0]
            }

            #[inline(always)]
            fn from_array(a: [$f; 1]) -> Self {
                Self(a[0])
            }

            #[inline(always)]
            fn if_less(cmp1: Self, cmp2: Self, true_val: Self, false_val: Self) -> Self {
                if cmp1.0 < cmp2.0 {
                    true_val
                } else {
                    false_val
                }
            }

            #[inline(always)]
            fn if_equal(cmp1: $int, cmp2: $int, true_val: Self, false_val: Self) -> Self {
                if cmp1.0 == cmp2.0 {
                    true_val
                } else {
                    false_val
                }
            }

            #[inline(always)]
            fn abs(self) -> Self {
                Self(self.0.abs())
            }

            #[inline(always)]
            fn sqrt(self) -> Self {
                Self(self.0.sqrt())
            }

            #[inline(always)]
            fn exp(self) -> Self {
                Self(self.0.exp())
            }

            #[inline(always)]
            fn log(self) -> Self {
                Self(self.0.ln())
            }

            #[inline(always)]
            fn sum(self) -> $f {
                self.0
            }

            #[inline(always)]
            fn from_int(v: $int) -> Self {
                Self(v.0 as $f)
            }
        }

        impl std::ops::Neg for $float {
            type Output = Self;
            #[inline(always)]
            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl_float_binops!($float, add, Add, add_assign, AddAssign, +);
        impl_float_binops!($float, sub, Sub, sub_assign, SubAssign, -);
        impl_float_binops!($float, mul, Mul, mul_assign, MulAssign, *);
        impl_float_binops!($float, div, Div, div_assign, DivAssign, /);
    };
}

macro_rules! impl_float_binops {
    ($float:ident, $method:ident, $trait:ident, $assign_method:ident, $assign_trait:ident, $op:tt) => {
        impl std::ops::$trait for $float {
            type Output = Self;
            #[inline(always)]
            fn $method(self, other: Self) -> Self {
                Self(self.0 $op other.0)
            }
        }

        impl std::ops::$assign_trait for $float {
            #[inline(always)]
            fn $assign_method(&mut self, other: Self) {
                *self = *self $op other;
            }
        }
    };
}

/// Implements `Add`/`Sub`/`Mul`/`Div` (and their `*Assign` forms) for a
/// vector newtype through one intrinsic per operator.
#[cfg(target_arch = "x86_64")]
macro_rules! intrinsic_float_ops {
    ($float:ident, $add:ident, $sub:ident, $mul:ident, $div:ident) => {
        intrinsic_binop!($float, add, Add, add_assign, AddAssign, $add);
        intrinsic_binop!($float, sub, Sub, sub_assign, SubAssign, $sub);
        intrinsic_binop!($float, mul, Mul, mul_assign, MulAssign, $mul);
        intrinsic_binop!($float, div, Div, div_assign, DivAssign, $div);
    };
}

#[cfg(target_arch = "x86_64")]
macro_rules! intrinsic_binop {
    ($ty:ident, $method:ident, $trait:ident, $assign_method:ident, $assign_trait:ident, $intrinsic:ident) => {
        impl std::ops::$trait for $ty {
            type Output = Self;
            #[inline(always)]
            fn $method(self, other: Self) -> Self {
                // SAFETY: zone vectors only exist once the zone's ISA is detected
                Self(unsafe { $intrinsic(self.0, other.0) })
            }
        }

        impl std::ops::$assign_trait for $ty {
            #[inline(always)]
            fn $assign_method(&mut self, other: Self) {
                *self = std::ops::$trait::$method(*self, other);
            }
        }
    };
}

pub mod accel;
pub mod cpu64;

#[cfg(target_arch = "x86_64")]
pub mod avx2;

#[cfg(target_arch = "x86_64")]
pub mod avx512;

#[cfg(target_arch = "x86_64")]
pub mod sse2;

/// Scalar float element of a zone (f32 or f64)
pub trait FloatScalar:
    Copy
    + Debug
    + Default
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + Send
    + Sync
    + 'static
{
    /// Additive identity
    const ZERO: Self;
    /// Multiplicative identity
    const ONE: Self;

    /// Narrowing conversion (rounds to nearest for f32)
    fn from_f64(v: f64) -> Self;
    /// Widening conversion
    fn to_f64(self) -> f64;
    /// Natural exponential
    fn exp(self) -> Self;
    /// Natural logarithm
    fn ln(self) -> Self;
}

impl FloatScalar for f32 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;

    #[inline(always)]
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    #[inline(always)]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    #[inline(always)]
    fn exp(self) -> Self {
        f32::exp(self)
    }

    #[inline(always)]
    fn ln(self) -> Self {
        f32::ln(self)
    }
}

impl FloatScalar for f64 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;

    #[inline(always)]
    fn from_f64(v: f64) -> Self {
        v
    }

    #[inline(always)]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline(always)]
    fn exp(self) -> Self {
        f64::exp(self)
    }

    #[inline(always)]
    fn ln(self) -> Self {
        f64::ln(self)
    }
}

/// Scalar unsigned element of a zone (u32 or u64)
pub trait UIntScalar: Copy + Debug + Default + Eq + Send + Sync + 'static {
    /// Width in bits
    const BITS: u32;
    /// All bits set
    const MAX: Self;

    /// Truncating conversion from `usize`
    fn from_usize(v: usize) -> Self;
    /// Widening (or truncating on 32-bit hosts) conversion to `usize`
    fn to_usize(self) -> usize;
    /// Widening conversion
    fn to_u64(self) -> u64;
    /// Modular addition
    fn wrapping_add(self, other: Self) -> Self;
    /// Value with the low `bits` bits set (all bits once `bits >= BITS`)
    fn low_mask(bits: u32) -> Self;
}

impl UIntScalar for u32 {
    const BITS: u32 = u32::BITS;
    const MAX: Self = u32::MAX;

    #[inline(always)]
    fn from_usize(v: usize) -> Self {
        v as u32
    }

    #[inline(always)]
    fn to_usize(self) -> usize {
        self as usize
    }

    #[inline(always)]
    fn to_u64(self) -> u64 {
        u64::from(self)
    }

    #[inline(always)]
    fn wrapping_add(self, other: Self) -> Self {
        u32::wrapping_add(self, other)
    }

    #[inline(always)]
    fn low_mask(bits: u32) -> Self {
        match 1u32.checked_shl(bits) {
            Some(v) => v - 1,
            None => u32::MAX,
        }
    }
}

impl UIntScalar for u64 {
    const BITS: u32 = u64::BITS;
    const MAX: Self = u64::MAX;

    #[inline(always)]
    fn from_usize(v: usize) -> Self {
        v as u64
    }

    #[inline(always)]
    fn to_usize(self) -> usize {
        self as usize
    }

    #[inline(always)]
    fn to_u64(self) -> u64 {
        self
    }

    #[inline(always)]
    fn wrapping_add(self, other: Self) -> Self {
        u64::wrapping_add(self, other)
    }

    #[inline(always)]
    fn low_mask(bits: u32) -> Self {
        match 1u64.checked_shl(bits) {
            Some(v) => v - 1,
            None => u64::MAX,
        }
    }
}

/// Unsigned integer lane vector
///
/// Arithmetic is modular; shifts by at least the lane width produce zero.
pub trait SimdInt:
    Copy
    + Debug
    + Add<Output = Self>
    + AddAssign
    + BitAnd<Output = Self>
    + Shr<u32, Output = Self>
    + Shl<u32, Output = Self>
    + Send
    + Sync
    + 'static
{
    /// Lane element
    type T: UIntScalar;
    /// `[T; LANES]`
    type Array: Copy + Default + AsRef<[Self::T]> + AsMut<[Self::T]>;
    /// Lane count
    const LANES: usize;

    /// Broadcast to every lane
    fn splat(v: Self::T) -> Self;

    /// All lanes zero
    #[inline(always)]
    fn zero() -> Self {
        Self::splat(Self::T::default())
    }

    /// Load `LANES` consecutive elements
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reading `LANES` elements.
    unsafe fn load(ptr: *const Self::T) -> Self;

    /// Store `LANES` consecutive elements
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for writing `LANES` elements.
    unsafe fn store(self, ptr: *mut Self::T);

    /// Load `LANES` bytes, zero-extending each into a lane
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reading `LANES` bytes.
    #[inline(always)]
    unsafe fn load_bytes(ptr: *const u8) -> Self {
        let mut lanes = Self::Array::default();
        for (i, lane) in lanes.as_mut().iter_mut().enumerate() {
            *lane = Self::T::from_usize(usize::from(*ptr.add(i)));
        }
        Self::from_array(lanes)
    }

    /// Lane-wise modular multiply by a broadcast scalar
    fn mul_scalar(self, v: Self::T) -> Self;

    /// `[0, 1, .., LANES - 1]`
    #[inline(always)]
    fn make_indexes() -> Self {
        let mut lanes = Self::Array::default();
        for (i, lane) in lanes.as_mut().iter_mut().enumerate() {
            *lane = Self::T::from_usize(i);
        }
        Self::from_array(lanes)
    }

    /// Spill lanes to an array
    fn to_array(self) -> Self::Array;

    /// Fill lanes from an array
    fn from_array(a: Self::Array) -> Self;

    /// Call `func(lane, value)` once per lane, in lane order
    #[inline(always)]
    fn execute(self, mut func: impl FnMut(usize, Self::T)) {
        let lanes = self.to_array();
        for (i, &v) in lanes.as_ref().iter().enumerate() {
            func(i, v);
        }
    }
}

/// Floating-point lane vector
///
/// Arithmetic is lane-wise IEEE-754. `exp` and `log` default to applying the
/// scalar library function per lane; zones with a native instruction override
/// them.
pub trait SimdFloat:
    Copy
    + Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Send
    + Sync
    + 'static
{
    /// Lane element
    type T: FloatScalar;
    /// Matching integer vector (same lane count and element width)
    type Int: SimdInt;
    /// `[T; LANES]`
    type Array: Copy + Default + AsRef<[Self::T]> + AsMut<[Self::T]>;
    /// Lane count
    const LANES: usize;

    /// Broadcast to every lane
    fn splat(v: Self::T) -> Self;

    /// Broadcast an `f64`, narrowing if the zone is 32-bit
    #[inline(always)]
    fn from_f64(v: f64) -> Self {
        Self::splat(Self::T::from_f64(v))
    }

    /// All lanes `+0.0`
    #[inline(always)]
    fn zero() -> Self {
        Self::splat(Self::T::ZERO)
    }

    /// Load `LANES` consecutive elements
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reading `LANES` elements.
    unsafe fn load(ptr: *const Self::T) -> Self;

    /// Store `LANES` consecutive elements
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for writing `LANES` elements.
    unsafe fn store(self, ptr: *mut Self::T);

    /// Load `ptr[idx[lane]]` into each lane
    ///
    /// # Safety
    ///
    /// Every `ptr + idx[lane]` must be valid for reading.
    #[inline(always)]
    unsafe fn gather(ptr: *const Self::T, idx: Self::Int) -> Self {
        let indexes = idx.to_array();
        let mut lanes = Self::Array::default();
        for (lane, &i) in lanes.as_mut().iter_mut().zip(indexes.as_ref()) {
            *lane = ptr.add(i.to_usize()).read_unaligned();
        }
        Self::from_array(lanes)
    }

    /// Store each lane to `ptr[idx[lane]]`; on colliding indexes the highest lane wins
    ///
    /// # Safety
    ///
    /// Every `ptr + idx[lane]` must be valid for writing.
    #[inline(always)]
    unsafe fn scatter(self, ptr: *mut Self::T, idx: Self::Int) {
        let indexes = idx.to_array();
        let values = self.to_array();
        for (&v, &i) in values.as_ref().iter().zip(indexes.as_ref()) {
            ptr.add(i.to_usize()).write_unaligned(v);
        }
    }

    /// Spill lanes to an array
    fn to_array(self) -> Self::Array;

    /// Fill lanes from an array
    fn from_array(a: Self::Array) -> Self;

    /// Apply a scalar function to every lane
    #[inline(always)]
    fn apply_func(self, func: impl Fn(Self::T) -> Self::T) -> Self {
        let mut lanes = self.to_array();
        for lane in lanes.as_mut() {
            *lane = func(*lane);
        }
        Self::from_array(lanes)
    }

    /// Per lane: `if cmp1 < cmp2 { true_val } else { false_val }`
    ///
    /// Ordered comparison, so any NaN operand selects `false_val`.
    fn if_less(cmp1: Self, cmp2: Self, true_val: Self, false_val: Self) -> Self;

    /// Per lane: `if cmp1 == cmp2 { true_val } else { false_val }` keyed on integers
    fn if_equal(cmp1: Self::Int, cmp2: Self::Int, true_val: Self, false_val: Self) -> Self;

    /// Clear the sign bit of every lane
    fn abs(self) -> Self;

    /// Lane-wise square root
    fn sqrt(self) -> Self;

    /// Lane-wise `e^x`
    #[inline(always)]
    fn exp(self) -> Self {
        self.apply_func(<Self::T as FloatScalar>::exp)
    }

    /// Lane-wise natural logarithm
    #[inline(always)]
    fn log(self) -> Self {
        self.apply_func(<Self::T as FloatScalar>::ln)
    }

    /// Horizontal sum of all lanes (reduction order is zone-defined)
    fn sum(self) -> Self::T;

    /// Convert unsigned lanes to float
    ///
    /// 32-bit zones convert through signed integers, so lanes must be below 2^31.
    fn from_int(v: Self::Int) -> Self;

    /// Run `func` with this zone's instruction set enabled for code generation
    ///
    /// Kernels enter through this hook so that the generic code inlined into
    /// `func` is compiled for the zone's target features.
    ///
    /// # Safety
    ///
    /// The running CPU must support the zone's instruction set.
    #[inline(always)]
    unsafe fn vectorize<R>(func: impl FnOnce() -> R) -> R {
        func()
    }

    /// Call `func(lane)` once per lane index
    #[inline(always)]
    fn execute(mut func: impl FnMut(usize)) {
        for i in 0..Self::LANES {
            func(i);
        }
    }

    /// Call `func(lane, value)` once per lane, in lane order
    #[inline(always)]
    fn execute_with(self, mut func: impl FnMut(usize, Self::T)) {
        let lanes = self.to_array();
        for (i, &v) in lanes.as_ref().iter().enumerate() {
            func(i, v);
        }
    }
}

/// Unsigned element type of a float vector's integer partner
pub type UIntOf<F> = <<F as SimdFloat>::Int as SimdInt>::T;

/// Float element type of a float vector
pub type FloatOf<F> = <F as SimdFloat>::T;
