//! Bit-packed index buffers
//!
//! Each lane owns a column of words. A word holds `items_per_pack` indexes of
//! `bits = word_bits / items_per_pack` bits, lowest bits first, one per
//! consecutive lane group. Sample `s` with `L` lanes lives in word
//! `(s / (L * P)) * L + s % L` at shift `((s % (L * P)) / L) * bits`.
//!
//! # Examples
//!
//! ```
//! use boostkern::pack::PackedIndices;
//!
//! // 4 lanes of u32 words, 8 items of 4 bits per word
//! let indexes: Vec<usize> = (0..32).map(|i| i % 16).collect();
//! let packed = PackedIndices::pack(&indexes, 8, 4, 4).unwrap();
//! assert_eq!(packed.len(), 4);
//! assert_eq!(packed.unpack(8, 4, 32), indexes);
//! ```

use std::ffi::c_void;

use crate::error::{BoostError, Result};

/// Packed index words of the zone's unsigned width
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackedIndices {
    U32(Vec<u32>),
    U64(Vec<u64>),
}

impl PackedIndices {
    /// Bits per item for a word of `uint_bytes` holding `items_per_pack` items
    pub fn bits_per_item(items_per_pack: usize, uint_bytes: usize) -> usize {
        uint_bytes * 8 / items_per_pack
    }

    /// Pack `indexes` (one per sample) for a zone with `lanes` lanes
    ///
    /// Fails with [`BoostError::IllegalParamVal`] when the sample count is not
    /// a multiple of `lanes`, `items_per_pack` does not fit the word, or an
    /// index needs more than the available bits.
    pub fn pack(
        indexes: &[usize],
        items_per_pack: usize,
        lanes: usize,
        uint_bytes: usize,
    ) -> Result<Self> {
        let word_bits = uint_bytes * 8;
        if lanes == 0
            || indexes.len() % lanes != 0
            || items_per_pack == 0
            || items_per_pack > word_bits
            || !matches!(uint_bytes, 4 | 8)
        {
            return Err(BoostError::IllegalParamVal);
        }
        let bits = Self::bits_per_item(items_per_pack, uint_bytes);
        if bits < 64 && indexes.iter().any(|&i| (i as u64) >> bits != 0) {
            return Err(BoostError::IllegalParamVal);
        }

        let per_group = lanes * items_per_pack;
        let words = indexes.len().div_ceil(per_group) * lanes;
        let mut packed = vec![0u64; words];
        for (s, &index) in indexes.iter().enumerate() {
            let word = (s / per_group) * lanes + s % lanes;
            let shift = ((s % per_group) / lanes) * bits;
            packed[word] |= (index as u64) << shift;
        }

        Ok(match uint_bytes {
            4 => PackedIndices::U32(packed.into_iter().map(|w| w as u32).collect()),
            _ => PackedIndices::U64(packed),
        })
    }

    /// Inverse of [`PackedIndices::pack`] for the first `c_samples` samples
    pub fn unpack(&self, items_per_pack: usize, lanes: usize, c_samples: usize) -> Vec<usize> {
        let word_bits = match self {
            PackedIndices::U32(_) => 32,
            PackedIndices::U64(_) => 64,
        };
        let word = |i: usize| match self {
            PackedIndices::U32(w) => u64::from(w[i]),
            PackedIndices::U64(w) => w[i],
        };
        let bits = word_bits / items_per_pack.max(1);
        let mask = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
        let per_group = lanes * items_per_pack;
        (0..c_samples)
            .map(|s| {
                let index = (s / per_group) * lanes + s % lanes;
                let shift = ((s % per_group) / lanes) * bits;
                ((word(index) >> shift) & mask) as usize
            })
            .collect()
    }

    /// Number of words
    pub fn len(&self) -> usize {
        match self {
            PackedIndices::U32(w) => w.len(),
            PackedIndices::U64(w) => w.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pointer to pass as a bridge `packed` field
    pub fn as_ptr(&self) -> *const c_void {
        match self {
            PackedIndices::U32(w) => w.as_ptr().cast(),
            PackedIndices::U64(w) => w.as_ptr().cast(),
        }
    }
}
