//! Generic compute kernels
//!
//! Each kernel is written once against [`SimdFloat`] and monomorphized for
//! every zone and every combination of its runtime flags. Flags are turned
//! into const generics at the entry point so the inner loops carry no
//! per-sample branches.
//!
//! All kernels require `c_samples` to be a multiple of the zone's lane count.

mod apply_update;
mod bin_sums;

pub(crate) use apply_update::{apply_update_multi, apply_update_single};
pub(crate) use bin_sums::{bin_sums_boosting, bin_sums_interaction};

use std::ffi::c_void;

use crate::backends::{SimdInt, UIntScalar};
use crate::bridge::ITEMS_PER_BIT_PACK_NONE;

/// Sequential reader of bit-packed indexes, one lane group per call
///
/// Words are laid out one per lane; each word holds `items_per_pack`
/// consecutive lane groups, lowest bits first.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PackedReader<I: SimdInt> {
    packed: *const I::T,
    items_per_pack: usize,
    bits: u32,
    mask: I,
    position: usize,
    words: I,
}

impl<I: SimdInt> PackedReader<I> {
    /// Reader that yields index 0 for every lane
    #[inline(always)]
    pub(crate) fn none() -> Self {
        Self {
            packed: std::ptr::null(),
            items_per_pack: 0,
            bits: 0,
            mask: I::zero(),
            position: 0,
            words: I::zero(),
        }
    }

    /// Reader over `packed` with `c_pack` items per word
    ///
    /// [`ITEMS_PER_BIT_PACK_NONE`] or a null buffer give [`Self::none`].
    #[inline(always)]
    pub(crate) fn new(c_pack: isize, packed: *const c_void) -> Self {
        if c_pack == ITEMS_PER_BIT_PACK_NONE || c_pack <= 0 || packed.is_null() {
            return Self::none();
        }
        let items_per_pack = c_pack as usize;
        debug_assert!(items_per_pack <= I::T::BITS as usize);
        let bits = I::T::BITS / items_per_pack as u32;
        Self {
            packed: packed.cast(),
            items_per_pack,
            bits,
            mask: I::splat(I::T::low_mask(bits)),
            position: 0,
            words: I::zero(),
        }
    }

    #[inline(always)]
    pub(crate) fn is_none(&self) -> bool {
        self.items_per_pack == 0
    }

    /// Indexes of the next lane group
    ///
    /// # Safety
    ///
    /// The packed buffer must hold a word per lane for every group read.
    #[inline(always)]
    pub(crate) unsafe fn next(&mut self) -> I {
        if self.items_per_pack == 0 {
            return I::zero();
        }
        if self.position == 0 {
            self.words = I::load(self.packed);
            self.packed = self.packed.add(I::LANES);
        }
        let indexes = (self.words >> (self.position as u32 * self.bits)) & self.mask;
        self.position += 1;
        if self.position == self.items_per_pack {
            self.position = 0;
        }
        indexes
    }
}
