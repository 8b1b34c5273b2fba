//! # GPU Virtual Addresses

use core::ops::{Add, AddAssign, Sub};

/// A **GPU virtual** address (ppGTT address as seen by the hardware).
///
/// Newtype over `u64` to prevent mixing with byte offsets inside buffers.
/// No alignment guarantees by itself.
///
/// ### Notes
/// - When embedded in AUX page-table entries, the low N bits must be zeroed
///   (N depends on the level's pointer-field shift).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GpuAddress(pub u64);

impl GpuAddress {
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for GpuAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:012x}", self.0)
    }
}

impl core::fmt::Debug for GpuAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:012x} (GPU @{} MiB)", self.0, self.0 / 1024 / 1024)
    }
}

impl Add<u64> for GpuAddress {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0.checked_add(rhs).expect("GpuAddress add"))
    }
}

impl AddAssign<u64> for GpuAddress {
    fn add_assign(&mut self, rhs: u64) {
        *self = *self + rhs;
    }
}

impl Sub<Self> for GpuAddress {
    type Output = u64;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0.checked_sub(rhs.0).expect("GpuAddress sub")
    }
}

impl PartialEq<u64> for GpuAddress {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

impl From<u64> for GpuAddress {
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}
