//! # Lazy Population
//!
//! Walks every compressed surface in 64 KiB main-surface steps, creating
//! child tables on first touch and writing the leaf entries that point at
//! the matching CCS blocks.
//!
//! The backing allocation is a plain byte arena: tables are integer byte
//! offsets into it, and "allocate if empty" is a compare-against-zero on
//! the 8-byte parent slot. Because entry values embed the backing buffer's
//! absolute GPU address, every child-pointer write also records a
//! [`Relocation`] so the command encoder can patch the value once the
//! buffer's final placement is known.

use crate::entry::{AuxBranchEntry, l1_flags, lx_flags};
use crate::error::AuxTableError;
use crate::level::{AUX_CCS_BLOCK_SIZE, AUX_LEVEL_COUNT, ENTRY_BYTES, MAIN_SURFACE_BLOCK_SIZE};
use crate::plan::AuxPgtable;
use gpu_buf::{GpuAddress, SurfaceDesc};

/// A deferred patch of an entry inside the table's backing buffer.
///
/// Once the buffer's final GPU address is known, the 64-bit value at
/// `offset` must become `buffer_address + delta`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Relocation {
    /// Byte offset of the entry within the backing buffer.
    pub offset: u64,
    /// Value to add to the buffer's GPU address (child table offset plus
    /// the branch flag bits). Fits in 32 bits (asserted), matching the
    /// relocation ABI's delta field.
    pub delta: u64,
}

impl AuxPgtable {
    /// Populate the CPU-mapped `arena` with entries for every surface.
    ///
    /// `table_base` is the backing buffer's (provisional) GPU address; the
    /// returned relocations re-patch the embedded child pointers if the
    /// buffer moves before submission.
    ///
    /// ### Panics
    /// Panics if the arena is smaller than the planned size, if the root
    /// table does not land at offset 0, on level-region exhaustion, or if
    /// an address does not fit a level's pointer field (>48-bit placement).
    ///
    /// # Errors
    /// An unsupported surface format aborts the build; no partially valid
    /// table is handed out.
    pub fn populate(
        &mut self,
        arena: &mut [u8],
        table_base: GpuAddress,
        surfaces: &[&SurfaceDesc],
    ) -> Result<Vec<Relocation>, AuxTableError> {
        let size = usize::try_from(self.size()).expect("table size fits usize");
        assert!(arena.len() >= size, "backing buffer smaller than planned");
        arena[..size].fill(0);

        let mut relocs = Vec::new();

        let root = self.alloc_table(AUX_LEVEL_COUNT - 1);
        // The root table's address is what gets programmed into hardware.
        assert_eq!(root, 0, "root table must land at offset 0");

        for surface in surfaces {
            self.populate_surface(arena, table_base, surface, root, &mut relocs)?;
        }

        Ok(relocs)
    }

    /// Write the full root-to-leaf chains for one surface, color plane by
    /// color plane (luma then chroma for semi-planar formats).
    fn populate_surface(
        &mut self,
        arena: &mut [u8],
        table_base: GpuAddress,
        surface: &SurfaceDesc,
        root: u64,
        relocs: &mut Vec<Relocation>,
    ) -> Result<(), AuxTableError> {
        assert_eq!(
            surface.planes.len(),
            surface.ccs.len(),
            "compressed surface must carry one CCS plane per color plane"
        );
        let base = surface.gpu_address();
        let lx = lx_flags();

        for (plane_index, plane) in surface.planes.iter().enumerate() {
            let flags = l1_flags(surface, plane_index)?;

            let mut main = base + plane.offset;
            let end = base + plane.offset + plane.size;
            let mut aux = base + surface.ccs[plane_index].offset;

            while main < end {
                let mut table = root;
                for level in (1..AUX_LEVEL_COUNT).rev() {
                    table = self.child_table(arena, table_base, table, level, main, lx, relocs);
                }
                self.set_leaf(arena, table, main, aux, flags);

                main += MAIN_SURFACE_BLOCK_SIZE;
                aux += AUX_CCS_BLOCK_SIZE;
            }
        }
        Ok(())
    }

    /// Fetch the child table referenced by `parent`'s slot for `address`
    /// at `level`, allocating and linking it if the slot is still zero.
    ///
    /// Addresses sharing a parent index resolve to the same child offset;
    /// the zero sentinel is the only "absent" state, so an entry is written
    /// exactly once per build.
    fn child_table(
        &mut self,
        arena: &mut [u8],
        table_base: GpuAddress,
        parent: u64,
        level: usize,
        address: GpuAddress,
        lx: u64,
        relocs: &mut Vec<Relocation>,
    ) -> u64 {
        let ld = &self.levels()[level];
        let slot = parent + ld.entry_index(address.as_u64()) as u64 * ENTRY_BYTES;

        let current = read_entry(arena, slot);
        if current == 0 {
            let child = self.alloc_table(level - 1);
            assert_eq!(
                (table_base.as_u64() + child) & !ld.ptr_mask(),
                0,
                "child table address exceeds the L{} pointer field",
                level + 1
            );

            let delta = child | lx;
            write_entry(arena, slot, table_base.as_u64() + delta);

            // The relocation ABI carries a signed 32-bit delta.
            assert!(delta <= i32::MAX as u64);
            relocs.push(Relocation {
                offset: slot,
                delta,
            });
            child
        } else {
            AuxBranchEntry::from_bits(current).child_address() - table_base.as_u64()
        }
    }

    /// Write the leaf entry mapping `address`'s 64 KiB block to the CCS
    /// block at `aux`.
    fn set_leaf(&self, arena: &mut [u8], l1_table: u64, address: GpuAddress, aux: GpuAddress, flags: u64) {
        let ld = &self.levels()[0];
        let slot = l1_table + ld.entry_index(address.as_u64()) as u64 * ENTRY_BYTES;

        assert_eq!(
            aux.as_u64() & !ld.ptr_mask(),
            0,
            "CCS block address exceeds the leaf pointer field"
        );
        write_entry(arena, slot, aux.as_u64() | flags);
    }
}

/// Read the 64-bit entry at byte `offset` (entries are little-endian, like
/// the hardware consumes them).
pub(crate) fn read_entry(arena: &[u8], offset: u64) -> u64 {
    let o = usize::try_from(offset).expect("entry offset fits usize");
    let bytes: [u8; 8] = arena[o..o + 8].try_into().expect("entry within arena");
    u64::from_le_bytes(bytes)
}

/// Write the 64-bit entry at byte `offset`.
pub(crate) fn write_entry(arena: &mut [u8], offset: u64, value: u64) {
    let o = usize::try_from(offset).expect("entry offset fits usize");
    arena[o..o + 8].copy_from_slice(&value.to_le_bytes());
}
