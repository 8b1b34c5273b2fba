//! # Build Errors
//!
//! Typed rejection of inputs the fixed-function encoding tables cannot
//! express. Internal invariant violations (capacity overrun, unsorted
//! surface lists, pointer-field overflow) are *not* errors: those are
//! caller bugs and panic, because a partially-built table handed to the
//! hardware is worse than a crash at build time.

use gpu_buf::TilingMode;

/// Why an AUX table build was rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuxTableError {
    /// Compressed surfaces must use a Y-family tiling.
    #[error("unsupported tiling {0:?} for a compressed surface")]
    UnsupportedTiling(TilingMode),

    /// Bit depth outside the hardware depth-code table (8/10/12/16/32/64).
    #[error("unsupported bit depth: {0} bpp")]
    UnsupportedBitsPerPixel(u32),

    /// Semi-planar YUV depth outside the documented format table.
    #[error("unsupported semi-planar YUV depth: {0} bpp")]
    UnsupportedChromaDepth(u32),

    /// Interleaved YUV depth with no format code (only 16 bpp YCbCr).
    #[error("unsupported interleaved YUV depth: {0} bpp")]
    UnsupportedYuvDepth(u32),

    /// Non-YUV depth with no format code (only 32 bpp ARGB).
    #[error("unsupported RGB depth: {0} bpp")]
    UnsupportedRgbDepth(u32),

    /// The command stream does not run with the full 48-bit ppGTT
    /// addressing the AUX walk requires.
    #[error("command stream does not use full 48-bit ppGTT addressing")]
    AddressingMode,
}
