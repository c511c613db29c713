//! Histogram bin storage
//!
//! A bin is `2 + c_scores * H` elements of the zone's width, where `H` is 2
//! with hessians and 1 without:
//!
//! ```text
//! [count (uint), weight (float), gradient_0, (hessian_0), gradient_1, ...]
//! ```
//!
//! [`BinBuffer`] owns zeroed storage of this shape and decodes it back into
//! `f64`/`u64` totals.

use std::ffi::c_void;

use crate::error::{BoostError, Result};

/// Shape of one bin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinLayout {
    pub c_scores: usize,
    pub hessian: bool,
    /// 4 for 32-bit zones, 8 for 64-bit zones
    pub element_bytes: usize,
}

impl BinLayout {
    pub fn new(c_scores: usize, hessian: bool, element_bytes: usize) -> Result<Self> {
        if c_scores == 0 || !matches!(element_bytes, 4 | 8) {
            return Err(BoostError::IllegalParamVal);
        }
        Ok(Self {
            c_scores,
            hessian,
            element_bytes,
        })
    }

    /// Elements per bin
    pub fn slots(&self) -> usize {
        2 + self.c_scores * if self.hessian { 2 } else { 1 }
    }

    /// Bytes per bin
    pub fn bin_bytes(&self) -> usize {
        self.slots() * self.element_bytes
    }
}

/// Decoded contents of one bin
#[derive(Debug, Clone, PartialEq)]
pub struct BinTotals {
    pub count: u64,
    pub weight: f64,
    pub gradients: Vec<f64>,
    /// Empty when the layout carries no hessians
    pub hessians: Vec<f64>,
}

/// Zero-initialized storage for `c_bins` bins
#[derive(Debug, Clone)]
pub struct BinBuffer {
    layout: BinLayout,
    c_bins: usize,
    storage: Vec<u64>,
}

impl BinBuffer {
    pub fn new(layout: BinLayout, c_bins: usize) -> Self {
        let bytes = layout.bin_bytes() * c_bins;
        Self {
            layout,
            c_bins,
            storage: vec![0; bytes.div_ceil(8)],
        }
    }

    pub fn layout(&self) -> BinLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.c_bins
    }

    pub fn is_empty(&self) -> bool {
        self.c_bins == 0
    }

    /// Reset every bin to zero
    pub fn clear(&mut self) {
        self.storage.fill(0);
    }

    /// Pointer for a bridge `bins` field
    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        self.storage.as_mut_ptr().cast()
    }

    /// One past the last bin, for a bridge `debug_bins_end` field
    pub fn end_ptr(&self) -> *const c_void {
        let bytes = self.layout.bin_bytes() * self.c_bins;
        self.storage.as_ptr().cast::<u8>().wrapping_add(bytes).cast()
    }

    fn read_uint(&self, slot: usize) -> u64 {
        if self.layout.element_bytes == 4 {
            u64::from(bytemuck::cast_slice::<u64, u32>(&self.storage)[slot])
        } else {
            self.storage[slot]
        }
    }

    fn read_float(&self, slot: usize) -> f64 {
        if self.layout.element_bytes == 4 {
            f64::from(bytemuck::cast_slice::<u64, f32>(&self.storage)[slot])
        } else {
            bytemuck::cast_slice::<u64, f64>(&self.storage)[slot]
        }
    }

    /// Decode bin `index`
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn bin(&self, index: usize) -> BinTotals {
        assert!(index < self.c_bins, "bin {index} out of range ({} bins)", self.c_bins);
        let base = index * self.layout.slots();
        let per_score = if self.layout.hessian { 2 } else { 1 };

        let mut gradients = Vec::with_capacity(self.layout.c_scores);
        let mut hessians = Vec::new();
        for k in 0..self.layout.c_scores {
            let slot = base + 2 + k * per_score;
            gradients.push(self.read_float(slot));
            if self.layout.hessian {
                hessians.push(self.read_float(slot + 1));
            }
        }
        BinTotals {
            count: self.read_uint(base),
            weight: self.read_float(base + 1),
            gradients,
            hessians,
        }
    }

    /// Decode every bin
    pub fn totals(&self) -> Vec<BinTotals> {
        (0..self.c_bins).map(|i| self.bin(i)).collect()
    }

    /// Sum of counts across bins
    pub fn total_count(&self) -> u64 {
        (0..self.c_bins).map(|i| self.bin(i).count).sum()
    }

    /// Sum of weights across bins
    pub fn total_weight(&self) -> f64 {
        (0..self.c_bins).map(|i| self.bin(i).weight).sum()
    }
}
