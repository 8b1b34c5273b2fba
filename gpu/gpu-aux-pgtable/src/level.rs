//! # AUX Page-Table Level Geometry
//!
//! Fixed hardware configuration of the 3-level AUX translation table.
//!
//! A 48-bit main-surface address is divided into four fields:
//!
//! ```text
//! | 47‒36 | 35‒24 | 23‒16 | 15‒0         |
//! |   L3  |   L2  |   L1  | block offset |
//! ```
//!
//! The hardware uses these fields as **indices** into three levels of tables:
//!
//! ```text
//!  L3 (root)  →  L2  →  L1  →  CCS block
//! ```
//!
//! | Level | Index bits | Entries | Table size | Entry points at |
//! |:------|:-----------|:--------|:-----------|:----------------|
//! | L3    | 47:36 (12) | 4096    | 32 KiB     | an L2 table |
//! | L2    | 35:24 (12) | 4096    | 32 KiB     | an L1 table |
//! | L1    | 23:16 (8)  | 256     | 8 KiB      | one 256-byte CCS block |
//!
//! The bits below 16 are the offset inside one 64 KiB main-surface block;
//! every address in that block shares a single L1 entry.

/// Width of the GPU virtual address space covered by the walk.
pub const GFX_ADDRESS_BITS: u32 = 48;

/// The unit size to which the AUX CCS surface is aligned.
pub const AUX_CCS_UNIT_SIZE: u64 = 64;

/// CCS bytes mapped by one L1 entry.
pub const AUX_CCS_BLOCK_SIZE: u64 = 4 * AUX_CCS_UNIT_SIZE;

/// Main-surface bytes described by one CCS block:
/// 256 bytes per CCS block × 8 bits per byte ÷ 2 bits per main-surface
/// cacheline × 64 bytes per cacheline.
pub const MAIN_SURFACE_BLOCK_SIZE: u64 = AUX_CCS_BLOCK_SIZE * 8 / 2 * 64;

/// Number of hierarchy levels.
pub const AUX_LEVEL_COUNT: usize = 3;

/// Bytes occupied by one 64-bit table entry.
pub const ENTRY_BYTES: u64 = 8;

/// Fixed geometry of one table level.
///
/// Immutable hardware configuration; see [`AUX_PGTABLE_LEVELS`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LevelDescriptor {
    /// Lowest address bit of this level's index slice.
    pub index_shift: u32,
    /// Width of the index slice in bits.
    pub index_bits: u32,
    /// Lowest bit of the physical-address field packed into an entry at
    /// this level. Child tables (or CCS blocks) must be aligned to
    /// `1 << entry_ptr_shift`.
    pub entry_ptr_shift: u32,
    /// Physical size of one table at this level.
    pub table_bytes: u64,
}

/// The 3-level AUX table geometry, **leaf first** (index 0 is L1).
pub static AUX_PGTABLE_LEVELS: [LevelDescriptor; AUX_LEVEL_COUNT] = [
    // L1: one entry per 64 KiB main-surface block, pointing at a CCS block.
    LevelDescriptor {
        index_shift: 16,
        index_bits: 8,
        entry_ptr_shift: 8,
        table_bytes: 8 * 1024,
    },
    // L2
    LevelDescriptor {
        index_shift: 24,
        index_bits: 12,
        entry_ptr_shift: 13,
        table_bytes: 32 * 1024,
    },
    // L3 (root)
    LevelDescriptor {
        index_shift: 36,
        index_bits: 12,
        entry_ptr_shift: 15,
        table_bytes: 32 * 1024,
    },
];

impl LevelDescriptor {
    /// Address bits covered by one table at this level (index slice plus
    /// everything below it).
    #[inline]
    #[must_use]
    pub const fn span_bits(&self) -> u32 {
        self.index_shift + self.index_bits
    }

    /// Extract this level's table index from a main-surface address.
    #[inline]
    #[must_use]
    pub const fn entry_index(&self, address: u64) -> usize {
        ((address >> self.index_shift) & ((1u64 << self.index_bits) - 1)) as usize
    }

    /// Mask selecting the physical-address field of an entry at this level:
    /// bits `47:entry_ptr_shift`.
    #[inline]
    #[must_use]
    pub const fn ptr_mask(&self) -> u64 {
        ((1u64 << GFX_ADDRESS_BITS) - 1) & !((1u64 << self.entry_ptr_shift) - 1)
    }

    /// Number of entries in one table at this level.
    #[inline]
    #[must_use]
    pub const fn entry_count(&self) -> usize {
        (self.table_bytes / ENTRY_BYTES) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_ratio_constants() {
        assert_eq!(AUX_CCS_BLOCK_SIZE, 256);
        assert_eq!(MAIN_SURFACE_BLOCK_SIZE, 0x10000);
        // One L1 entry per main-surface block.
        assert_eq!(
            MAIN_SURFACE_BLOCK_SIZE,
            1u64 << AUX_PGTABLE_LEVELS[0].index_shift
        );
    }

    #[test]
    fn levels_partition_the_address_space() {
        // Consecutive index slices must tile the 48-bit space without gaps,
        // from the leaf's shift up to bit 47.
        let mut bit = AUX_PGTABLE_LEVELS[0].index_shift;
        for ld in &AUX_PGTABLE_LEVELS {
            assert_eq!(ld.index_shift, bit);
            bit += ld.index_bits;
        }
        assert_eq!(bit, GFX_ADDRESS_BITS);
    }

    #[test]
    fn tables_have_room_for_every_index() {
        // The L1 table is larger than its index slice strictly needs
        // (8 KiB holds 1024 slots, the 8 index bits address 256 of them);
        // the upper levels are exactly sized.
        for ld in &AUX_PGTABLE_LEVELS {
            assert!(ld.entry_count() >= 1usize << ld.index_bits);
        }
        assert_eq!(AUX_PGTABLE_LEVELS[0].entry_count(), 1024);
        assert_eq!(AUX_PGTABLE_LEVELS[1].entry_count(), 4096);
        assert_eq!(AUX_PGTABLE_LEVELS[2].entry_count(), 4096);
    }

    #[test]
    fn entry_index_extraction() {
        let addr = 0x0000_8123_4560_0000u64;
        assert_eq!(AUX_PGTABLE_LEVELS[2].entry_index(addr), 0x812);
        assert_eq!(AUX_PGTABLE_LEVELS[1].entry_index(addr), 0x345);
        assert_eq!(AUX_PGTABLE_LEVELS[0].entry_index(addr), 0x60);
    }

    #[test]
    fn ptr_masks_stop_at_48_bits() {
        assert_eq!(AUX_PGTABLE_LEVELS[0].ptr_mask(), 0x0000_ffff_ffff_ff00);
        assert_eq!(AUX_PGTABLE_LEVELS[1].ptr_mask(), 0x0000_ffff_ffff_e000);
        assert_eq!(AUX_PGTABLE_LEVELS[2].ptr_mask(), 0x0000_ffff_ffff_8000);
    }
}
