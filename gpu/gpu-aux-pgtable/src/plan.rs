//! # Capacity Planning & Table Allocation
//!
//! Sizing happens before the backing buffer exists: for each level the
//! planner counts how many level-granularity address windows are needed to
//! cover every surface's span, then packs the per-level regions into one
//! contiguous layout, root region first. Population later draws individual
//! tables from those regions with a bump cursor; the pre-computed counts
//! are a hard capacity limit, not a hint.

use crate::level::{AUX_LEVEL_COUNT, AUX_PGTABLE_LEVELS, LevelDescriptor};
use gpu_buf::{SurfaceDesc, align_down, align_up};
use log::{debug, trace};

/// Layout of one level's table region inside the backing allocation.
#[derive(Copy, Clone, Debug, Default)]
pub struct LevelLayout {
    /// Number of tables this level needs.
    pub table_count: u64,
    /// Byte offset of this level's region within the backing buffer.
    pub region_base: u64,
    /// Bump cursor for the next table allocation; starts at `region_base`.
    cursor: u64,
}

/// Sized layout of a complete 3-level AUX table build.
///
/// Created by [`AuxPgtable::plan`]; consumed by the populate pass. The
/// backing buffer itself is owned by the driver layer.
pub struct AuxPgtable {
    levels: &'static [LevelDescriptor; AUX_LEVEL_COUNT],
    layout: [LevelLayout; AUX_LEVEL_COUNT],
    size: u64,
    max_align: u64,
}

impl AuxPgtable {
    /// Compute the per-level table counts and the flat byte layout for
    /// `surfaces`.
    ///
    /// Regions are packed root level first, so the root table region (and
    /// with it the root table itself) starts at offset 0 — the root's
    /// address is the one programmed into fixed-function state.
    ///
    /// ### Panics
    /// Panics unless `surfaces` is sorted by ascending GPU address with
    /// disjoint buffer ranges; every surface must already be placed.
    #[must_use]
    pub fn plan(surfaces: &[&SurfaceDesc]) -> Self {
        let levels = &AUX_PGTABLE_LEVELS;
        let mut layout = [LevelLayout::default(); AUX_LEVEL_COUNT];
        let mut size = 0u64;
        let mut max_align = 0u64;

        for level in (0..AUX_LEVEL_COUNT).rev() {
            let ld = &levels[level];
            let region_base = align_up(size, ld.table_bytes);
            let table_count = window_count(ld.span_bits(), surfaces);
            layout[level] = LevelLayout {
                table_count,
                region_base,
                cursor: region_base,
            };
            size = region_base + table_count * ld.table_bytes;
            max_align = max_align.max(ld.table_bytes);
            debug!(
                "AUX L{}: {table_count} table(s) at offset {region_base:#x}",
                level + 1
            );
        }

        // Hardware requirement, guaranteed by root-first packing.
        assert_eq!(layout[AUX_LEVEL_COUNT - 1].region_base, 0);

        Self {
            levels,
            layout,
            size,
            max_align,
        }
    }

    /// Total backing-buffer size in bytes (all level regions plus
    /// inter-region alignment padding).
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Largest per-level alignment requirement for the backing buffer.
    #[inline]
    #[must_use]
    pub const fn max_align(&self) -> u64 {
        self.max_align
    }

    /// The level descriptors this build uses (leaf first).
    #[inline]
    #[must_use]
    pub const fn levels(&self) -> &'static [LevelDescriptor; AUX_LEVEL_COUNT] {
        self.levels
    }

    /// Layout of `level`'s region.
    #[inline]
    #[must_use]
    pub fn layout(&self, level: usize) -> &LevelLayout {
        &self.layout[level]
    }

    /// Allocate one table at `level`, returning its byte offset within the
    /// backing buffer.
    ///
    /// ### Panics
    /// Panics if the level's planned region is exhausted: that means the
    /// planner under-counted (or the surface list changed since planning),
    /// which is a latent bug, not a recoverable condition.
    pub(crate) fn alloc_table(&mut self, level: usize) -> u64 {
        let ld = &self.levels[level];
        let li = &mut self.layout[level];

        let table = li.cursor;
        li.cursor += ld.table_bytes;
        trace!("AUX L{} table allocated at offset {table:#x}", level + 1);
        assert!(
            li.cursor <= li.region_base + li.table_count * ld.table_bytes,
            "AUX L{} region exhausted: planner under-counted",
            level + 1
        );
        table
    }
}

/// Number of `1 << span_bits`-sized address windows needed to cover the
/// union of all surface spans.
///
/// Surfaces must be sorted by ascending GPU address with disjoint raw
/// ranges (asserted); two surfaces whose *aligned* windows overlap share
/// the boundary window instead of counting it twice.
fn window_count(span_bits: u32, surfaces: &[&SurfaceDesc]) -> u64 {
    let granule = 1u64 << span_bits;
    let mut count = 0u64;
    let mut end = 0u64;
    let mut prev_end = 0u64;

    for (i, surface) in surfaces.iter().enumerate() {
        let addr = surface.gpu_address().as_u64();
        assert!(
            i == 0 || addr >= prev_end,
            "surfaces must be sorted by GPU address and disjoint"
        );
        prev_end = addr + surface.mapped_len();

        // Avoid double counting for overlapping aligned windows.
        let start = align_down(addr, granule).max(end);
        end = align_up(addr + surface.mapped_len(), granule);
        assert!(end >= start);

        count += (end - start) >> span_bits;
    }

    count
}
