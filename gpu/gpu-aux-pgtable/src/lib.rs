//! # AUX (CCS) Page-Table Builder
//!
//! Builds the hardware-format, 3-level address-translation table that lets
//! the GPU's render and video-enhancement engines find, for any address in
//! a tiled, color-compressed surface, the CCS metadata block describing how
//! that region is compressed.
//!
//! ## What you get
//! - Fixed geometry of the 3-level walk ([`AUX_PGTABLE_LEVELS`]: index
//!   slices, pointer shifts, table sizes).
//! - A capacity plan ([`AuxPgtable::plan`]) that sizes all levels into
//!   one contiguous backing layout, root region at offset 0.
//! - A lazy populate pass ([`AuxPgtable::populate`]) that creates child
//!   tables on first touch and writes format-specific [`AuxLeafEntry`]
//!   values.
//! - A [`driver`] layer that orchestrates
//!   size → allocate → map → populate → unmap → attach
//!   against an [`AuxTableBackend`](driver::AuxTableBackend), plus the
//!   post-execution address verification.
//!
//! ## Address walk
//!
//! ```text
//! | 47‒36 | 35‒24 | 23‒16 | 15‒0         |
//! |   L3  |   L2  |   L1  | block offset |
//!
//!  L3 (root, 32 KiB)  →  L2 (32 KiB)  →  L1 (8 KiB)  →  256-byte CCS block
//! ```
//!
//! One L1 entry maps a 64 KiB main-surface block to one 256-byte CCS block
//! (the fixed compression-metadata ratio of the target hardware).
//!
//! The table lives in one GPU buffer for the duration of a single command
//! submission; it is built synchronously on the calling thread and is
//! immutable once unmapped.

pub mod driver;
mod entry;
mod error;
mod level;
mod plan;
mod populate;

pub use crate::entry::{
    AuxBranchEntry, AuxLeafEntry, DEPTH_RESERVED, FORMAT_ARGB_8B, FORMAT_NV12_21, FORMAT_P010,
    FORMAT_P016, FORMAT_YCRCB, l1_flags, lx_flags,
};
pub use crate::error::AuxTableError;
pub use crate::level::{
    AUX_CCS_BLOCK_SIZE, AUX_CCS_UNIT_SIZE, AUX_LEVEL_COUNT, AUX_PGTABLE_LEVELS, ENTRY_BYTES,
    GFX_ADDRESS_BITS, LevelDescriptor, MAIN_SURFACE_BLOCK_SIZE,
};
pub use crate::plan::{AuxPgtable, LevelLayout};
pub use crate::populate::Relocation;

#[cfg(test)]
pub(crate) mod testutil {
    //! Surface builders and an in-memory backend mock shared by the unit
    //! tests.

    use crate::driver::{AuxTableBackend, Engine};
    use gpu_buf::{CcsPlane, GpuAddress, SurfaceDesc, SurfacePlane, TilingMode};

    /// A placed, compressed, Y-tiled 32 bpp ARGB surface of `size` main
    /// bytes at `addr`, with its CCS plane appended.
    pub fn argb_surface_at(addr: u64, size: u64) -> SurfaceDesc {
        let mut s = argb_surface(size, TilingMode::Y);
        s.place(GpuAddress::new(addr));
        s
    }

    /// Unplaced variant of [`argb_surface_at`] with selectable tiling.
    pub fn argb_surface(size: u64, tiling: TilingMode) -> SurfaceDesc {
        let ccs_size = size / 256;
        SurfaceDesc {
            addr: None,
            buffer_size: size + ccs_size,
            planes: vec![SurfacePlane {
                offset: 0,
                size,
                stride: 1024,
            }],
            ccs: vec![CcsPlane {
                offset: size,
                size: ccs_size,
                stride: 64,
            }],
            tiling,
            bpp: 32,
            format_is_yuv: false,
            format_is_yuv_semiplanar: false,
        }
    }

    /// A placed, uncompressed surface (no CCS planes).
    pub fn uncompressed_surface_at(addr: u64, size: u64) -> SurfaceDesc {
        let mut s = argb_surface(size, TilingMode::Y);
        s.ccs.clear();
        s.buffer_size = size;
        s.place(GpuAddress::new(addr));
        s
    }

    /// An unplaced semi-planar YUV surface: luma plane of `luma_size`
    /// bytes, chroma plane of half that, CCS planes for both.
    pub fn semiplanar_surface(luma_size: u64, bpp: u32) -> SurfaceDesc {
        let chroma_size = luma_size / 2;
        let luma_ccs = luma_size / 256;
        let chroma_ccs = chroma_size / 256;
        let ccs_base = luma_size + chroma_size;
        SurfaceDesc {
            addr: None,
            buffer_size: ccs_base + luma_ccs + chroma_ccs,
            planes: vec![
                SurfacePlane {
                    offset: 0,
                    size: luma_size,
                    stride: 1024,
                },
                SurfacePlane {
                    offset: luma_size,
                    size: chroma_size,
                    stride: 1024,
                },
            ],
            ccs: vec![
                CcsPlane {
                    offset: ccs_base,
                    size: luma_ccs,
                    stride: 64,
                },
                CcsPlane {
                    offset: ccs_base + luma_ccs,
                    size: chroma_ccs,
                    stride: 64,
                },
            ],
            tiling: TilingMode::Y,
            bpp,
            format_is_yuv: true,
            format_is_yuv_semiplanar: true,
        }
    }

    /// Placed variant of [`semiplanar_surface`].
    pub fn semiplanar_surface_at(addr: u64, luma_size: u64, bpp: u32) -> SurfaceDesc {
        let mut s = semiplanar_surface(luma_size, bpp);
        s.place(GpuAddress::new(addr));
        s
    }

    /// One recorded relocation request.
    #[derive(Debug, Eq, PartialEq)]
    pub struct MockReloc {
        pub target: usize,
        pub offset: u64,
        pub referenced: usize,
        pub delta: u64,
    }

    struct MockBuffer {
        addr: u64,
        data: Vec<u8>,
    }

    /// In-memory stand-in for the buffer manager + command encoder.
    ///
    /// Buffers are handles into a slab; GPU addresses are assigned
    /// sequentially from a high base so they never collide with the test
    /// surfaces.
    pub struct MockBackend {
        buffers: Vec<Option<MockBuffer>>,
        pub relocations: Vec<MockReloc>,
        pub emitted: Vec<(Engine, GpuAddress)>,
        pub full_addressing: bool,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self {
                buffers: Vec::new(),
                relocations: Vec::new(),
                emitted: Vec::new(),
                full_addressing: true,
            }
        }

        /// Number of not-yet-released buffers.
        pub fn live_buffers(&self) -> usize {
            self.buffers.iter().filter(|b| b.is_some()).count()
        }
    }

    impl AuxTableBackend for MockBackend {
        type Buffer = usize;

        fn create_backing(&mut self, size: u64, align: u64) -> usize {
            let addr = 0x80_0000_0000 + self.buffers.len() as u64 * 0x1000_0000;
            assert_eq!(addr % align, 0);
            self.buffers.push(Some(MockBuffer {
                addr,
                data: vec![0u8; usize::try_from(size).unwrap()],
            }));
            self.buffers.len() - 1
        }

        fn gpu_address(&self, buffer: &usize) -> GpuAddress {
            GpuAddress::new(self.buffers[*buffer].as_ref().expect("buffer released").addr)
        }

        fn with_cpu_map<R>(&mut self, buffer: &usize, f: impl FnOnce(&mut [u8]) -> R) -> R {
            let buf = self.buffers[*buffer].as_mut().expect("buffer released");
            f(&mut buf.data)
        }

        fn release(&mut self, buffer: usize) {
            assert!(self.buffers[buffer].take().is_some(), "double release");
        }

        fn supports_aux_addressing(&self) -> bool {
            self.full_addressing
        }

        fn register_relocation(
            &mut self,
            target: &usize,
            offset: u64,
            referenced: &usize,
            delta: u64,
        ) {
            self.relocations.push(MockReloc {
                target: *target,
                offset,
                referenced: *referenced,
                delta,
            });
        }

        fn emit_table_base(&mut self, engine: Engine, table: GpuAddress) {
            self.emitted.push((engine, table));
        }
    }
}
