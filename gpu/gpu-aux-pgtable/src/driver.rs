//! # Driver Orchestration
//!
//! Ties the planner, allocator and populator to the external GPU services:
//! size → allocate backing → map → populate → unmap → register relocations,
//! then hand the backing buffer to the command encoder. A separate
//! post-execution step verifies that every surface pinned for the build is
//! still where the baked entries say it is, then releases the buffer.
//!
//! The collaborators (buffer allocation, CPU mapping, relocation
//! bookkeeping, state-register emission) enter through the
//! [`AuxTableBackend`] trait; this module never touches a real device.

use crate::error::AuxTableError;
use crate::plan::AuxPgtable;
use gpu_buf::{GpuAddress, SurfaceDesc, align_up};
use log::debug;

/// A compressed surface must be 64 KiB aligned.
const SURFACE_ALIGN: u64 = 0x10000;

/// Keep the first page reserved, so pinned buffers can be told apart by a
/// non-zero address.
const RESERVED_LOW: u64 = 0x1000;

/// Exclusive upper bound of the GPU address space used for placement.
const ADDRESS_LIMIT: u64 = 1 << crate::level::GFX_ADDRESS_BITS;

/// Hardware engine whose fixed-function state receives the table base.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Engine {
    /// 3D render engine.
    Render,
    /// Video enhancement (VEBOX) engine.
    VideoEnhance,
}

/// External GPU services the table builder relies on.
///
/// Implementations wrap the real buffer manager and command encoder; tests
/// use an in-memory mock. Contracts:
///
/// - [`create_backing`](Self::create_backing) returns a GPU-resident,
///   **zero-initialized** buffer of at least `size` bytes at `align`ment.
/// - [`with_cpu_map`](Self::with_cpu_map) gives scoped CPU write access;
///   the mapping is valid only for the duration of the closure.
/// - [`register_relocation`](Self::register_relocation) records that the
///   64-bit value at `offset` inside `target` must be patched to
///   `referenced`'s final GPU address plus `delta` before submission.
/// - [`emit_table_base`](Self::emit_table_base) writes the fixed-function
///   state that tells `engine` where the root table lives.
pub trait AuxTableBackend {
    /// Buffer handle type of the underlying buffer manager.
    type Buffer;

    /// Allocate a zero-initialized, GPU-resident backing buffer.
    fn create_backing(&mut self, size: u64, align: u64) -> Self::Buffer;

    /// The buffer's (possibly provisional) GPU address.
    fn gpu_address(&self, buffer: &Self::Buffer) -> GpuAddress;

    /// Run `f` with the buffer mapped for CPU writes.
    fn with_cpu_map<R>(&mut self, buffer: &Self::Buffer, f: impl FnOnce(&mut [u8]) -> R) -> R;

    /// Release the buffer.
    fn release(&mut self, buffer: Self::Buffer);

    /// Whether the command stream runs with full 48-bit ppGTT addressing.
    fn supports_aux_addressing(&self) -> bool;

    /// Record a deferred address patch against the command stream.
    fn register_relocation(
        &mut self,
        target: &Self::Buffer,
        offset: u64,
        referenced: &Self::Buffer,
        delta: u64,
    );

    /// Program `engine`'s AUX table base registers with `table`.
    fn emit_table_base(&mut self, engine: Engine, table: GpuAddress);
}

/// Build a populated AUX table covering `surfaces`.
///
/// `surfaces` is the compressed subset, sorted by ascending GPU address;
/// an empty slice yields `Ok(None)` (nothing to translate). On success the
/// caller owns the returned backing buffer and is responsible for handing
/// it to the command encoder and releasing it after execution.
///
/// # Errors
/// An unsupported surface format aborts the build; the backing buffer is
/// released before the error is returned.
pub fn build_aux_table<B: AuxTableBackend>(
    backend: &mut B,
    surfaces: &[&SurfaceDesc],
) -> Result<Option<B::Buffer>, AuxTableError> {
    if surfaces.is_empty() {
        return Ok(None);
    }

    let mut pgt = AuxPgtable::plan(surfaces);
    let buffer = backend.create_backing(pgt.size(), pgt.max_align());
    let table_base = backend.gpu_address(&buffer);
    debug!(
        "building AUX table for {} surface(s): {} bytes at {table_base}",
        surfaces.len(),
        pgt.size()
    );

    let populated = backend.with_cpu_map(&buffer, |arena| pgt.populate(arena, table_base, surfaces));
    match populated {
        Ok(relocs) => {
            for r in &relocs {
                backend.register_relocation(&buffer, r.offset, &buffer, r.delta);
            }
            Ok(Some(buffer))
        }
        Err(err) => {
            backend.release(buffer);
            Err(err)
        }
    }
}

/// An AUX table attached to a copy operation, together with the surface
/// addresses that must stay pinned until the commands have executed.
pub struct CopyAuxTable<B: AuxTableBackend> {
    table: B::Buffer,
    pinned: Vec<GpuAddress>,
}

impl<B: AuxTableBackend> CopyAuxTable<B> {
    /// Prepare the AUX state for a copy from `src` to `dst`.
    ///
    /// Returns `Ok(None)` when neither surface is compressed. Otherwise:
    /// places both surfaces at fixed addresses (already-placed buffers
    /// keep their address and are reserved first, in address order; an
    /// unplaced compressed buffer is pinned into the largest free gap at
    /// 64 KiB alignment), builds the table over the compressed subset,
    /// emits `engine`'s table base registers, and records the pinned
    /// addresses for the post-execution check.
    ///
    /// # Errors
    /// [`AuxTableError::AddressingMode`] when the command stream cannot
    /// express 48-bit AUX walks; format errors propagate from the build.
    pub fn prepare(
        backend: &mut B,
        engine: Engine,
        src: &mut SurfaceDesc,
        dst: &mut SurfaceDesc,
    ) -> Result<Option<Self>, AuxTableError> {
        if !src.is_compressed() && !dst.is_compressed() {
            return Ok(None);
        }
        if !backend.supports_aux_addressing() {
            return Err(AuxTableError::AddressingMode);
        }

        let mut surfs = [src, dst];
        // Reservation order: binding position is address-dependent, so
        // already-placed buffers claim their slots first.
        let mut reserved: Vec<usize> = Vec::new();
        for i in 0..surfs.len() {
            if surfs[i].is_placed() {
                reserve_sorted(&mut reserved, &surfs, i);
            }
        }
        for i in 0..surfs.len() {
            if !surfs[i].is_placed() && surfs[i].is_compressed() {
                let placed: Vec<&SurfaceDesc> = reserved.iter().map(|&r| &*surfs[r]).collect();
                let addr = find_free_slot(&placed, surfs[i].buffer_size);
                debug!("pinning unplaced surface {i} at {addr}");
                surfs[i].place(addr);
                reserve_sorted(&mut reserved, &surfs, i);
            }
        }

        // Table entries exist only for the compressed subset.
        let compressed: Vec<&SurfaceDesc> = reserved
            .iter()
            .map(|&r| &*surfs[r])
            .filter(|s| s.is_compressed())
            .collect();
        let pinned: Vec<GpuAddress> = compressed.iter().map(|s| s.gpu_address()).collect();

        let Some(table) = build_aux_table(backend, &compressed)? else {
            return Ok(None);
        };

        let base = backend.gpu_address(&table);
        backend.emit_table_base(engine, base);

        Ok(Some(Self { table, pinned }))
    }

    /// The table's backing buffer, for command-stream bookkeeping.
    #[must_use]
    pub const fn table(&self) -> &B::Buffer {
        &self.table
    }

    /// Addresses the compressed surfaces were pinned to at build time, in
    /// ascending order.
    #[must_use]
    pub fn pinned_addresses(&self) -> &[GpuAddress] {
        &self.pinned
    }

    /// Post-execution check and cleanup.
    ///
    /// `surfaces` must be the same compressed surfaces the table was built
    /// for, in the same (ascending) order.
    ///
    /// ### Panics
    /// Panics if any surface no longer sits at its build-time address: the
    /// baked entries would silently translate to the wrong CCS blocks.
    pub fn verify_and_release(self, backend: &mut B, surfaces: &[&SurfaceDesc]) {
        assert_eq!(
            surfaces.len(),
            self.pinned.len(),
            "surface set differs from the one the table was built for"
        );
        for (surface, pinned) in surfaces.iter().zip(&self.pinned) {
            assert_eq!(
                surface.gpu_address(),
                *pinned,
                "pinned surface moved across execution; AUX entries are stale"
            );
        }
        backend.release(self.table);
    }
}

/// Insert `index` into `reserved` keeping it sorted by surface address.
fn reserve_sorted(reserved: &mut Vec<usize>, surfs: &[&mut SurfaceDesc], index: usize) {
    let addr = surfs[index].gpu_address();
    let pos = reserved
        .iter()
        .position(|&r| surfs[r].gpu_address() > addr)
        .unwrap_or(reserved.len());
    reserved.insert(pos, index);
}

/// Pick a 64 KiB-aligned address for a buffer of `size` bytes inside the
/// largest gap left between the already-placed buffers.
///
/// `placed` must be sorted by ascending address. The first page is never
/// handed out.
///
/// ### Panics
/// Panics when no gap is large enough.
fn find_free_slot(placed: &[&SurfaceDesc], size: u64) -> GpuAddress {
    let mut last_end = RESERVED_LOW;
    let mut best_start = RESERVED_LOW;
    let mut best_size = 0u64;

    for surface in placed {
        let addr = surface.gpu_address().as_u64();
        let gap = addr.saturating_sub(last_end);
        if gap > best_size {
            best_start = last_end;
            best_size = gap;
        }
        last_end = last_end.max(addr + surface.buffer_size);
    }
    let tail = ADDRESS_LIMIT - last_end;
    if tail > best_size {
        best_start = last_end;
        best_size = tail;
    }

    let pad = align_up(best_start, SURFACE_ALIGN) - best_start;
    assert!(
        best_size >= pad && best_size - pad >= size,
        "no free GPU address range large enough for the surface"
    );
    GpuAddress::new(best_start + pad)
}
