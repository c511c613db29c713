//! Boostkern: SIMD Compute Zones for Gradient Boosting
//!
//! **Boostkern** provides the inner loops of a gradient-boosting trainer, built
//! once per instruction-set "zone":
//!
//! 1. **Cpu64** - portable `f64`/`u64`, one lane
//! 2. **SSE2 / AVX2 / AVX-512F** - `f32`/`u32` at 4, 8 and 16 lanes
//! 3. **Accel32** - `f32`/`u32` zone selected when a `wgpu` adapter is present
//!
//! Every zone exposes the same C-compatible surface: a factory that builds a
//! named objective (`"rmse"`, `"log_loss"`) into an [`ObjectiveWrapper`], and
//! kernels for score updates, gradients, metrics and histogram bin sums.
//!
//! # Design Principles
//!
//! - **Write once, vectorize everywhere**: objectives and kernels are generic
//!   over one SIMD abstraction; each zone only supplies its vector types
//! - **Runtime dispatch**: zones are detected once and tried fastest first
//! - **Stable ABI**: bridges and wrappers are `#[repr(C)]`, errors are codes
//! - **Lane-exact agreement**: 32-bit zones agree lane for lane
//!
//! # Quick Start
//!
//! ```rust
//! use boostkern::{ApplyUpdateBridge, Backend, Compute, Config};
//!
//! let compute = Compute::with_backend(Backend::Cpu64, &Config::regression(), "rmse").unwrap();
//!
//! let tensor = [0.5f64];
//! let targets = [1.5f64, 2.5];
//! let mut scores = [1.0f64, 2.0];
//! let mut data = ApplyUpdateBridge {
//!     calc_metric: true,
//!     c_samples: 2,
//!     update_tensor_scores: tensor.as_ptr().cast(),
//!     targets: targets.as_ptr().cast(),
//!     sample_scores: scores.as_mut_ptr().cast(),
//!     ..Default::default()
//! };
//! unsafe { compute.apply_update(&mut data).unwrap() };
//!
//! assert_eq!(scores, [1.5, 2.5]);
//! assert_eq!(compute.finish_metric(data.metric_out / 2.0), 0.0);
//! ```

pub mod backends;
pub mod bins;
pub mod bridge;
pub mod compute;
pub mod config;
pub mod error;
pub mod layout;
pub mod objective;
pub mod pack;
pub mod tolerance;

mod kernels;
mod zone;

use std::sync::OnceLock;

pub use bridge::{
    ApplyUpdateBridge, BinSumsBoostingBridge, BinSumsInteractionBridge, CreateObjectiveFn, Link,
    ObjectiveWrapper, ITEMS_PER_BIT_PACK_NONE, MAX_DIMENSIONS,
};
pub use compute::Compute;
pub use config::Config;
pub use error::{BoostError, ErrorCode, Result};

/// Compute zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Portable 64-bit zone, one lane
    Cpu64,
    /// SSE2 (128-bit, 4 lanes)
    Sse2,
    /// AVX2 with FMA (256-bit, 8 lanes)
    Avx2,
    /// AVX-512F (512-bit, 16 lanes)
    Avx512f,
    /// 32-bit accelerator zone (wgpu adapter present)
    Accel32,
    /// Auto-select best available
    Auto,
}

/// Order in which [`Compute::create`] tries zones
pub const SELECTION_ORDER: [Backend; 5] = [
    Backend::Accel32,
    Backend::Avx512f,
    Backend::Avx2,
    Backend::Sse2,
    Backend::Cpu64,
];

impl Backend {
    /// Select the best available backend for the current platform
    ///
    /// This is a convenience wrapper around `select_best_available_backend()`
    pub fn select_best() -> Self {
        select_best_available_backend()
    }

    /// Lanes per vector (`Auto` resolves first)
    pub fn lanes(self) -> usize {
        match self {
            Backend::Cpu64 | Backend::Accel32 => 1,
            Backend::Sse2 => 4,
            Backend::Avx2 => 8,
            Backend::Avx512f => 16,
            Backend::Auto => select_best_available_backend().lanes(),
        }
    }

    /// Width of the zone's float and unsigned element types
    pub fn float_bytes(self) -> usize {
        match self {
            Backend::Cpu64 => 8,
            Backend::Auto => select_best_available_backend().float_bytes(),
            _ => 4,
        }
    }

    /// Whether this zone is compiled in and detected on the running machine
    pub fn is_available(self) -> bool {
        match self {
            Backend::Cpu64 => true,
            Backend::Accel32 => backends::accel::is_available(),
            Backend::Auto => true,
            #[cfg(target_arch = "x86_64")]
            Backend::Sse2 => is_x86_feature_detected!("sse2"),
            #[cfg(target_arch = "x86_64")]
            Backend::Avx2 => is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma"),
            #[cfg(target_arch = "x86_64")]
            Backend::Avx512f => is_x86_feature_detected!("avx512f"),
            #[cfg(not(target_arch = "x86_64"))]
            Backend::Sse2 | Backend::Avx2 | Backend::Avx512f => false,
        }
    }

    /// The zone's objective factory, if compiled for this target
    ///
    /// The factory of an undetected SIMD zone must not be called; check
    /// [`Backend::is_available`] first.
    pub fn factory(self) -> Option<CreateObjectiveFn> {
        match self {
            Backend::Cpu64 => Some(backends::cpu64::create_objective_cpu64),
            Backend::Accel32 => Some(backends::accel::create_objective_accel32),
            #[cfg(target_arch = "x86_64")]
            Backend::Sse2 => Some(backends::sse2::create_objective_sse2_32),
            #[cfg(target_arch = "x86_64")]
            Backend::Avx2 => Some(backends::avx2::create_objective_avx2_32),
            #[cfg(target_arch = "x86_64")]
            Backend::Avx512f => Some(backends::avx512::create_objective_avx512f_32),
            #[cfg(not(target_arch = "x86_64"))]
            Backend::Sse2 | Backend::Avx2 | Backend::Avx512f => None,
            Backend::Auto => None,
        }
    }
}

/// Detect best SIMD zone for x86_64 platforms
#[cfg(target_arch = "x86_64")]
fn detect_x86_backend() -> Backend {
    if is_x86_feature_detected!("avx512f") {
        return Backend::Avx512f;
    }
    if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
        return Backend::Avx2;
    }
    if is_x86_feature_detected!("sse2") {
        return Backend::Sse2;
    }
    Backend::Cpu64
}

/// Select the best available zone for the current platform
///
/// The accelerator zone wins when an adapter is found. Otherwise, on x86_64:
///
/// 1. AVX-512F (if `avx512f` feature detected)
/// 2. AVX2 (if `avx2` and `fma` features detected)
/// 3. SSE2 (baseline for x86_64)
/// 4. Cpu64 (fallback)
///
/// Other platforms fall back to Cpu64. Detection runs once.
///
/// # Examples
///
/// ```
/// use boostkern::select_best_available_backend;
///
/// let backend = select_best_available_backend();
/// println!("Using backend: {:?}", backend);
/// ```
pub fn select_best_available_backend() -> Backend {
    static BEST: OnceLock<Backend> = OnceLock::new();
    *BEST.get_or_init(|| {
        let best = if backends::accel::is_available() {
            Backend::Accel32
        } else {
            detect_cpu_backend()
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(?best, "selected compute zone");
        best
    })
}

fn detect_cpu_backend() -> Backend {
    #[cfg(target_arch = "x86_64")]
    {
        detect_x86_backend()
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        Backend::Cpu64
    }
}

/// Every detected zone, fastest first
pub fn available_backends() -> Vec<Backend> {
    SELECTION_ORDER
        .into_iter()
        .filter(|backend| backend.is_available())
        .collect()
}
