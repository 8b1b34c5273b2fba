//! # Table Entries
//!
//! Explicit bit-packing for the two 64-bit entry kinds of the AUX walk.
//!
//! - [`AuxBranchEntry`] (L3/L2): a valid bit plus the physical address of the
//!   child table in bits `47:entry_ptr_shift`.
//! - [`AuxLeafEntry`] (L1): a valid bit, the CCS block address in bits
//!   `47:8`, and format-specific fields (tile mode, depth code,
//!   chroma-plane indicator, pixel-format code).
//!
//! Layouts are built with mask/shift accessors, never `repr(C)` bit-field
//! overlay; the bit positions match the hardware tables (the tile-mode
//! offset is the one Mesa uses, it is not called out by bspec).

use crate::error::AuxTableError;
use bitfield_struct::bitfield;
use gpu_buf::{SurfaceDesc, TilingMode};

/// Depth code for 16 bpp (bits 56:54 of a leaf entry).
pub const DEPTH_16BPP: u8 = 0;
/// Depth code for 12 bpp.
pub const DEPTH_12BPP: u8 = 2;
/// Depth code for 10 bpp.
pub const DEPTH_10BPP: u8 = 3;
/// Depth code for 8 bpp.
pub const DEPTH_8BPP: u8 = 4;
/// Depth code for 32 bpp.
pub const DEPTH_32BPP: u8 = 5;
/// Depth code for 64 bpp.
pub const DEPTH_64BPP: u8 = 6;
/// Hardware "reserved" depth sentinel, used by some semi-planar formats.
pub const DEPTH_RESERVED: u8 = 7;

/// Pixel-format code: interleaved YCbCr, 16 bpp.
pub const FORMAT_YCRCB: u8 = 0x03;
/// Pixel-format code: P010 (10-bit semi-planar).
pub const FORMAT_P010: u8 = 0x07;
/// Pixel-format code: P016 (12/16-bit semi-planar).
pub const FORMAT_P016: u8 = 0x08;
/// Pixel-format code: 8-bit-per-channel ARGB.
pub const FORMAT_ARGB_8B: u8 = 0x0A;
/// Pixel-format code: NV12/NV21 (8-bit semi-planar).
pub const FORMAT_NV12_21: u8 = 0x0F;

/// L1 (leaf) entry: maps one 64 KiB main-surface block to one 256-byte
/// CCS block.
#[bitfield(u64)]
pub struct AuxLeafEntry {
    /// Valid (bit 0). A zero entry means "unmapped".
    pub valid: bool,

    /// Compression mode (bits 2:1).
    #[bits(2)]
    pub compression_mod: u8,

    /// Lossy compression (bit 3).
    pub lossy_compression: bool,

    /// Bits 7:4 are reserved.
    #[bits(4)]
    __reserved_low: u8,

    /// CCS block physical address, bits 47:8 (256-byte aligned).
    #[bits(40)]
    ccs_addr_47_8: u64,

    /// Bits 51:48 are reserved.
    #[bits(4)]
    __reserved_mid: u8,

    /// Tile mode (bits 53:52): 1 for TileY, 0 otherwise.
    #[bits(2)]
    pub tile_mode: u8,

    /// Color depth code (bits 56:54), see the `DEPTH_*` constants.
    #[bits(3)]
    pub depth: u8,

    /// Chroma-plane indicator (bit 57): set for the CbCr plane of a
    /// semi-planar surface.
    pub chroma_plane: bool,

    /// Pixel-format code (bits 63:58), see the `FORMAT_*` constants.
    #[bits(6)]
    pub format: u8,
}

impl AuxLeafEntry {
    /// CCS block address carried by the entry (256-byte aligned).
    #[inline]
    #[must_use]
    pub const fn ccs_address(self) -> u64 {
        self.ccs_addr_47_8() << 8
    }

    /// Store a CCS block address (must be 256-byte aligned).
    #[inline]
    pub const fn set_ccs_address(&mut self, addr: u64) {
        debug_assert!(addr & 0xff == 0);
        self.set_ccs_addr_47_8(addr >> 8);
    }
}

/// L3/L2 (branch) entry: points at the next-lower table.
///
/// The address field is written by OR-ing the (suitably aligned) child
/// table address over these flags, exactly like the leaf path; only the
/// valid bit is a true flag here.
#[bitfield(u64)]
pub struct AuxBranchEntry {
    /// Valid (bit 0). A zero entry means "no child table yet".
    pub valid: bool,

    /// Child table physical address, bits 47:1 as stored (the low bits up
    /// to the level's `entry_ptr_shift` are zero by alignment).
    #[bits(47)]
    addr_47_1: u64,

    /// Bits 63:48 are reserved.
    #[bits(16)]
    __reserved: u16,
}

impl AuxBranchEntry {
    /// Child table physical address carried by the entry.
    ///
    /// The bits below the level's `entry_ptr_shift` are zero by table
    /// alignment, so no per-level mask is needed to recover the address.
    #[inline]
    #[must_use]
    pub const fn child_address(self) -> u64 {
        self.addr_47_1() << 1
    }
}

/// Format-independent flag set for branch (Lx) entries: the valid bit.
#[inline]
#[must_use]
pub const fn lx_flags() -> u64 {
    AuxBranchEntry::new().with_valid(true).into_bits()
}

/// Compute the format/tiling/depth-specific flag bits of a leaf entry for
/// plane `plane_index` of `surface` (0 = luma/single plane, 1 = chroma).
///
/// The lookup is intentionally incomplete, mirroring the documented
/// hardware table: unsupported combinations are rejected rather than
/// guessed at.
///
/// # Errors
/// [`AuxTableError`] when the tiling, bit depth, or format classification
/// has no hardware encoding.
pub fn l1_flags(surface: &SurfaceDesc, plane_index: usize) -> Result<u64, AuxTableError> {
    let tile_mode = match surface.tiling {
        TilingMode::Y => 1,
        // No Yf/Ys differentiation; both encode as 0.
        TilingMode::Yf | TilingMode::Ys => 0,
        other => return Err(AuxTableError::UnsupportedTiling(other)),
    };

    let depth = match surface.bpp {
        16 => DEPTH_16BPP,
        12 => DEPTH_12BPP,
        10 => DEPTH_10BPP,
        8 => DEPTH_8BPP,
        32 => DEPTH_32BPP,
        64 => DEPTH_64BPP,
        other => return Err(AuxTableError::UnsupportedBitsPerPixel(other)),
    };

    let mut entry = AuxLeafEntry::new()
        .with_valid(true)
        .with_tile_mode(tile_mode)
        .with_depth(depth);

    if surface.format_is_yuv_semiplanar {
        entry.set_chroma_plane(plane_index > 0);
        match surface.bpp {
            8 => {
                entry.set_format(FORMAT_NV12_21);
                entry.set_depth(DEPTH_RESERVED);
            }
            10 => {
                entry.set_format(FORMAT_P010);
                entry.set_depth(DEPTH_RESERVED);
            }
            12 | 16 => entry.set_format(FORMAT_P016),
            other => return Err(AuxTableError::UnsupportedChromaDepth(other)),
        }
    } else if surface.format_is_yuv {
        match surface.bpp {
            16 => entry.set_format(FORMAT_YCRCB),
            other => return Err(AuxTableError::UnsupportedYuvDepth(other)),
        }
    } else {
        match surface.bpp {
            32 => entry.set_format(FORMAT_ARGB_8B),
            other => return Err(AuxTableError::UnsupportedRgbDepth(other)),
        }
    }

    Ok(entry.into_bits())
}
