use aligned::{A64, Aligned};
use v_frame::{
    pixel::{CastFromPrimitive, Pixel},
    plane::Plane,
};

use crate::data::{
    motion::{MV_UNITS_PER_SAMPLE, MotionVector, SuperblockBestState},
    plane::{Area, AsRegion, PlaneOffset, PlaneRegion, Rect},
    superblock::{B8_COUNT, B16_COUNT, B32_COUNT, SB_IN_B8, SB_IN_B16, SB_IN_B32, SB_SIZE},
};

/// Number of simultaneous horizontal candidates in one batch.
pub const CANDIDATE_COUNT: usize = 8;

/// One row of the hierarchical search: 8 horizontal candidate displacements,
/// one full sample apart, sharing a single vertical offset.
///
/// `base_mv` is the absolute motion vector of candidate 0; candidate `k`
/// displaces it by `k` full samples on the horizontal axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateRow {
    /// Motion vector of candidate 0, vertical offset included.
    pub base_mv: MotionVector,
}

impl CandidateRow {
    /// A row whose candidate 0 sits at the full-sample displacement
    /// `(dx, dy)`.
    pub const fn from_fullpel(dx: i16, dy: i16) -> Self {
        Self {
            base_mv: MotionVector::from_fullpel(dx, dy),
        }
    }

    /// Absolute motion vector of candidate `index`.
    pub const fn candidate_mv(self, index: usize) -> MotionVector {
        MotionVector {
            row: self.base_mv.row,
            col: self.base_mv.col + index as i16 * MV_UNITS_PER_SAMPLE,
        }
    }
}

/// SAD of every 8x8 sub-block of one superblock, for each of the 8
/// candidates of one [`CandidateRow`].
///
/// Values are sampled at half vertical density (the even rows of each
/// sub-block) and stored undoubled; the aggregation doubles them exactly
/// once when comparing against full-resolution state. The table is transient,
/// scoped to a single aggregation call.
pub struct PartitionSadTable {
    /// `sad_8x8[b][k]`: undoubled half-density SAD of sub-block `b` (raster
    /// order) under candidate `k`.
    pub sad_8x8: Aligned<A64, [[u32; CANDIDATE_COUNT]; B8_COUNT]>,
}

impl PartitionSadTable {
    /// An all-zero table, to be filled by a batch SAD producer.
    pub fn new() -> Self {
        Self {
            sad_8x8: Aligned([[0; CANDIDATE_COUNT]; B8_COUNT]),
        }
    }

    /// Portable batch SAD producer.
    ///
    /// Fills the table for the superblock at `org_region` against the
    /// reference plane, with candidate 0 at the full-sample displacement
    /// `(dx0, dy)` relative to the superblock position `po`. Any external
    /// producer filling the same layout is equally valid; this one exists so
    /// the aggregation is exercisable end to end.
    ///
    /// # Panics
    ///
    /// - If the displacements of the 8 candidates are not all addressable
    ///   in `p_ref`, padding included.
    pub fn compute<T: Pixel>(
        &mut self,
        org_region: &PlaneRegion<'_, T>,
        p_ref: &Plane<T>,
        po: PlaneOffset,
        dx0: i16,
        dy: i16,
    ) {
        let ref_region = p_ref.region(Area::Rect(Rect {
            x: po.x + dx0 as isize,
            y: po.y + dy as isize,
            width: SB_SIZE + CANDIDATE_COUNT - 1,
            height: SB_SIZE,
        }));

        for y8 in 0..SB_IN_B8 {
            for x8 in 0..SB_IN_B8 {
                let sads = &mut self.sad_8x8[y8 * SB_IN_B8 + x8];
                *sads = [0; CANDIDATE_COUNT];
                // Half vertical sampling density: even rows only.
                for r in (0..8).step_by(2) {
                    let org_row = &org_region[y8 * 8 + r][x8 * 8..x8 * 8 + 8];
                    let ref_row = &ref_region[y8 * 8 + r][x8 * 8..x8 * 8 + 8 + CANDIDATE_COUNT - 1];
                    for (k, sad) in sads.iter_mut().enumerate() {
                        *sad += org_row
                            .iter()
                            .zip(&ref_row[k..k + 8])
                            .map(|(&a, &b)| i32::cast_from(a).abs_diff(i32::cast_from(b)))
                            .sum::<u32>();
                    }
                }
            }
        }
    }
}

impl Default for PartitionSadTable {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

// Pure running minimum: the lowest candidate index wins exact ties.
fn min_candidate(sads: &[u32; CANDIDATE_COUNT]) -> (usize, u32) {
    let mut idx = 0;
    let mut best = sads[0];
    for (k, &sad) in sads.iter().enumerate().skip(1) {
        if sad < best {
            idx = k;
            best = sad;
        }
    }
    (idx, best)
}

/// Fold one fully-populated candidate batch into the persisted best state,
/// at all four partition granularities.
///
/// Each level reduces its 8 candidates by running minimum (lowest index wins
/// ties), doubles the half-density sum to a full-resolution-equivalent SAD,
/// and replaces the stored entry only on strict improvement; the winning
/// motion vector is `base_mv` displaced by the winning candidate index on
/// the horizontal axis. Re-aggregating an identical batch therefore leaves
/// the state unchanged, and stored SADs never increase.
pub fn aggregate_candidate_row(
    state: &mut SuperblockBestState,
    row: CandidateRow,
    table: &PartitionSadTable,
) {
    // 8x8: reduce each sub-block's candidate row directly.
    for (b, sads) in table.sad_8x8.iter().enumerate() {
        let (k, sad) = min_candidate(sads);
        state.best_8x8[b].improve(sad * 2, row.candidate_mv(k));
    }

    // 16x16: each partition sums its four 8x8 children per candidate. The
    // children of the partition at (x16, y16) are the sub-blocks at
    // (2*x16 + i, 2*y16 + j).
    let mut sad_16x16 = [[0u32; CANDIDATE_COUNT]; B16_COUNT];
    for y16 in 0..SB_IN_B16 {
        for x16 in 0..SB_IN_B16 {
            let sums = &mut sad_16x16[y16 * SB_IN_B16 + x16];
            for j in 0..2 {
                for i in 0..2 {
                    let child = (2 * y16 + j) * SB_IN_B8 + 2 * x16 + i;
                    for (sum, &sad) in sums.iter_mut().zip(&table.sad_8x8[child]) {
                        *sum += sad;
                    }
                }
            }
            let (k, sad) = min_candidate(sums);
            state.best_16x16[y16 * SB_IN_B16 + x16].improve(sad * 2, row.candidate_mv(k));
        }
    }

    // 32x32: same rule one level up, over the undoubled 16x16 sums.
    let mut sad_32x32 = [[0u32; CANDIDATE_COUNT]; B32_COUNT];
    for y32 in 0..SB_IN_B32 {
        for x32 in 0..SB_IN_B32 {
            let sums = &mut sad_32x32[y32 * SB_IN_B32 + x32];
            for j in 0..2 {
                for i in 0..2 {
                    let child = (2 * y32 + j) * SB_IN_B16 + 2 * x32 + i;
                    for (sum, &sad) in sums.iter_mut().zip(&sad_16x16[child]) {
                        *sum += sad;
                    }
                }
            }
            let (k, sad) = min_candidate(sums);
            state.best_32x32[y32 * SB_IN_B32 + x32].improve(sad * 2, row.candidate_mv(k));
        }
    }

    // 64x64: the four 32x32 sums cover the whole superblock.
    let mut sad_64x64 = [0u32; CANDIDATE_COUNT];
    for sums in &sad_32x32 {
        for (sum, &sad) in sad_64x64.iter_mut().zip(sums) {
            *sum += sad;
        }
    }
    let (k, sad) = min_candidate(&sad_64x64);
    state.best_64x64.improve(sad * 2, row.candidate_mv(k));
}
