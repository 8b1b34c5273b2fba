//! # Surface Descriptors
//!
//! A [`SurfaceDesc`] is the read-only view of one GPU surface that the AUX
//! page-table builder consumes: where the color planes and their CCS
//! (compression metadata) planes live inside the buffer, how the surface is
//! tiled, and how its pixel format is classified.
//!
//! All offsets are relative to the buffer base; the buffer's GPU address is
//! assigned when the buffer is placed (softpinned) and may be absent for a
//! surface that has not been bound yet.

use crate::addresses::GpuAddress;

/// Tiling layout of a surface.
///
/// Only the tiling *identity* matters here; the actual pixel swizzling is
/// handled by the buffer/tiling layer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TilingMode {
    /// No tiling, row-major rows.
    Linear,
    /// Legacy X-tiling.
    X,
    /// Y-tiling (the common compressed layout).
    Y,
    /// Yf variant of Y-tiling.
    Yf,
    /// Ys variant of Y-tiling.
    Ys,
}

/// One color plane of a surface.
///
/// Single-plane formats have one of these; semi-planar YUV has two
/// (luma first, then the interleaved chroma plane).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SurfacePlane {
    /// Byte offset of the plane from the buffer base.
    pub offset: u64,
    /// Size of the plane in bytes.
    pub size: u64,
    /// Row stride in bytes.
    pub stride: u32,
}

/// One CCS (compression metadata) plane, parallel to a color plane.
///
/// Geometry is precomputed by the buffer layer; a zero `stride` marks the
/// surface as uncompressed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CcsPlane {
    /// Byte offset of the CCS plane from the buffer base.
    pub offset: u64,
    /// Size of the CCS plane in bytes.
    pub size: u64,
    /// Row stride in bytes; zero means "no compression".
    pub stride: u32,
}

/// Read-only descriptor of one surface inside a GPU buffer.
#[derive(Clone, Debug)]
pub struct SurfaceDesc {
    /// GPU address of the buffer, once placed. `None` until bound.
    pub addr: Option<GpuAddress>,
    /// Total size of the backing buffer in bytes.
    pub buffer_size: u64,
    /// Color planes (1 for single-plane formats, 2 for semi-planar YUV).
    pub planes: Vec<SurfacePlane>,
    /// CCS planes, parallel to `planes` when the surface is compressed.
    pub ccs: Vec<CcsPlane>,
    /// Tiling layout.
    pub tiling: TilingMode,
    /// Bits per pixel of the (luma) plane.
    pub bpp: u32,
    /// Any YUV format (interleaved or planar).
    pub format_is_yuv: bool,
    /// Semi-planar YUV (separate luma + interleaved chroma plane).
    pub format_is_yuv_semiplanar: bool,
}

impl SurfaceDesc {
    /// Whether the surface carries compression metadata.
    #[inline]
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.ccs.first().is_some_and(|c| c.stride != 0)
    }

    /// Whether the buffer has been placed at a GPU address.
    #[inline]
    #[must_use]
    pub const fn is_placed(&self) -> bool {
        self.addr.is_some()
    }

    /// The buffer's GPU address.
    ///
    /// ### Panics
    /// Panics if the buffer has not been placed yet; the table builder only
    /// ever sees placed surfaces.
    #[inline]
    #[must_use]
    pub fn gpu_address(&self) -> GpuAddress {
        self.addr.expect("surface buffer has not been placed")
    }

    /// Pin the buffer to `addr`.
    #[inline]
    pub fn place(&mut self, addr: GpuAddress) {
        self.addr = Some(addr);
    }

    /// Bytes from the buffer base to the end of the highest-addressed plane
    /// (color or CCS). This is the address span the AUX table must cover.
    #[must_use]
    pub fn mapped_len(&self) -> u64 {
        let color = self.planes.iter().map(|p| p.offset + p.size).max();
        let ccs = self.ccs.iter().map(|c| c.offset + c.size).max();
        color
            .into_iter()
            .chain(ccs)
            .max()
            .unwrap_or(self.buffer_size)
    }

    /// One past the highest GPU address the surface's planes occupy.
    #[inline]
    #[must_use]
    pub fn mapped_end(&self) -> GpuAddress {
        self.gpu_address() + self.mapped_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn y_tiled_argb(size: u64) -> SurfaceDesc {
        SurfaceDesc {
            addr: None,
            buffer_size: size + size / 256,
            planes: vec![SurfacePlane {
                offset: 0,
                size,
                stride: 1024,
            }],
            ccs: vec![CcsPlane {
                offset: size,
                size: size / 256,
                stride: 64,
            }],
            tiling: TilingMode::Y,
            bpp: 32,
            format_is_yuv: false,
            format_is_yuv_semiplanar: false,
        }
    }

    #[test]
    fn compression_follows_ccs_stride() {
        let mut s = y_tiled_argb(0x10000);
        assert!(s.is_compressed());
        s.ccs[0].stride = 0;
        assert!(!s.is_compressed());
        s.ccs.clear();
        assert!(!s.is_compressed());
    }

    #[test]
    fn mapped_len_covers_ccs_plane() {
        let s = y_tiled_argb(0x10000);
        assert_eq!(s.mapped_len(), 0x10000 + 0x100);
    }

    #[test]
    fn mapped_end_needs_placement() {
        let mut s = y_tiled_argb(0x10000);
        s.place(GpuAddress::new(0x20000));
        assert_eq!(s.mapped_end(), GpuAddress::new(0x20000 + 0x10100));
    }
}
