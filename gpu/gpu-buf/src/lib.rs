//! # GPU Buffer Descriptors
//!
//! Shared surface/buffer model for the AUX page-table builder.
//!
//! ## What you get
//! - A [`GpuAddress`] newtype (u64) so GPU virtual addresses cannot be mixed
//!   with byte offsets or CPU pointers.
//! - [`SurfaceDesc`] describing one tiled surface: per-plane layout, the
//!   matching CCS (compression metadata) planes, tiling and format
//!   classification.
//! - Power-of-two alignment helpers ([`align_up`] / [`align_down`]).
//!
//! Layout values (plane offsets, strides, CCS geometry) are **inputs** here:
//! they are computed by the buffer/tiling layer and consumed read-only by the
//! table builder.

mod addresses;
mod surface;

pub use crate::addresses::GpuAddress;
pub use crate::surface::{CcsPlane, SurfaceDesc, SurfacePlane, TilingMode};

/// Align `x` down to the nearest multiple of `a`.
///
/// Returns the greatest value `y <= x` such that `y % a == 0`.
///
/// ### Preconditions
/// - `a` must be **non-zero** and a **power of two**; the bit-trick formula
///   relies on that property. No runtime checks are performed.
///
/// ### Examples
/// ```rust
/// # use gpu_buf::align_down;
/// assert_eq!(align_down(0, 0x10000), 0);
/// assert_eq!(align_down(0xffff, 0x10000), 0);
/// assert_eq!(align_down(0x10000, 0x10000), 0x10000);
/// assert_eq!(align_down(0x12345, 16), 0x12340);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_down(x: u64, a: u64) -> u64 {
    x & !(a - 1)
}

/// Align `x` up to the nearest multiple of `a`.
///
/// Returns the smallest value `y >= x` such that `y % a == 0`.
///
/// ### Preconditions
/// - `a` must be **non-zero** and a **power of two**.
/// - `x + (a - 1)` must not overflow `u64`.
///
/// ### Examples
/// ```rust
/// # use gpu_buf::align_up;
/// assert_eq!(align_up(0, 0x10000), 0);
/// assert_eq!(align_up(1, 0x10000), 0x10000);
/// assert_eq!(align_up(0x10000, 0x10000), 0x10000);
/// assert_eq!(align_up(0x12345, 16), 0x12350);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_up(x: u64, a: u64) -> u64 {
    (x + a - 1) & !(a - 1)
}
