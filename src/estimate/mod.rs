pub(crate) mod exhaustive;
pub(crate) mod hierarchy;

use arrayvec::ArrayVec;
use log::debug;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use thiserror::Error;
use v_frame::{pixel::Pixel, plane::Plane};

use crate::{
    data::{
        block::BlockWidth,
        motion::{MV_UNITS_PER_SAMPLE, MotionField, MotionVector, SuperblockBestState},
        plane::{Area, AsRegion, PlaneOffset, Rect, edge_padding},
        sad::get_sad,
        superblock::{SB_SIZE, SuperBlockOffset},
    },
    estimate::{
        exhaustive::{SearchResult, SearchWindow, exhaustive_search},
        hierarchy::{CANDIDATE_COUNT, CandidateRow, PartitionSadTable, aggregate_candidate_row},
    },
};

/// Options controlling the motion-estimation pass.
#[derive(Debug, Clone, Copy)]
pub struct MotionEstimationConfig {
    /// Horizontal extent of the coarse search window, in candidate
    /// displacements.
    pub search_width: usize,
    /// Vertical extent of the coarse search window, in candidate
    /// displacements.
    pub search_height: usize,
    /// Number of candidate rows aggregated around the coarse winner during
    /// hierarchical refinement.
    pub refine_rows: usize,
}

impl Default for MotionEstimationConfig {
    #[inline]
    fn default() -> Self {
        MotionEstimationConfig {
            search_width: 48,
            search_height: 32,
            refine_rows: 8,
        }
    }
}

impl MotionEstimationConfig {
    /// Edge padding the reference plane must provide for this window, per
    /// axis.
    const fn required_padding(&self) -> (usize, usize) {
        (
            self.search_width / 2 + CANDIDATE_COUNT,
            self.search_height / 2 + self.refine_rows,
        )
    }
}

/// Error returned when the caller-supplied planes cannot support the
/// requested search.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EstimationError {
    /// Source and reference must describe the same coding area.
    #[error("source and reference plane dimensions differ")]
    DimensionMismatch,
    /// The reference plane does not carry enough replicated border pixels
    /// for the configured window.
    #[error("reference plane has {available} pixels of edge padding, the search needs {required}")]
    InsufficientPadding {
        /// Padding the configured window needs on the offending axis.
        required: usize,
        /// Padding the plane actually carries on that axis.
        available: usize,
    },
}

// Displacement range addressable for a w x h block at po, padding included.
fn displacement_bounds<T: Pixel>(
    plane: &Plane<T>,
    po: PlaneOffset,
    w: usize,
    h: usize,
) -> (isize, isize, isize, isize) {
    let cfg = &plane.cfg;
    let dx_min = -(cfg.xorigin as isize) - po.x;
    let dx_max = (cfg.stride - cfg.xorigin) as isize - w as isize - po.x;
    let dy_min = -(cfg.yorigin as isize) - po.y;
    let dy_max = (cfg.alloc_height - cfg.yorigin) as isize - h as isize - po.y;
    (dx_min, dx_max, dy_min, dy_max)
}

// Place a window of up to `count` displacements so that it contains `center`
// and stays inside [d_min, d_max].
fn clamp_window(center: isize, count: usize, d_min: isize, d_max: isize) -> (isize, usize) {
    let avail = (d_max - d_min + 1).max(0) as usize;
    let count = count.min(avail);
    if count == 0 {
        return (d_min, 0);
    }
    let lo = (center - (count / 2) as isize).clamp(d_min, d_max - count as isize + 1);
    (lo, count)
}

/// Estimate motion for one superblock against one reference picture.
///
/// Runs the coarse exhaustive search over a window centered on the best of
/// `seeds` (the zero vector is always worth including), then refines full
/// superblocks with ascending candidate-row batches folded into the returned
/// best state. Blocks clipped by the frame edge are searched at the largest
/// fitting width class and skip hierarchical refinement.
///
/// # Panics
///
/// - If the superblock offset lies outside the plane, or the clipped block
///   is narrower than the smallest width class.
pub fn estimate_superblock_motion<T: Pixel>(
    org: &Plane<T>,
    p_ref: &Plane<T>,
    sbo: SuperBlockOffset,
    seeds: &[MotionVector],
    cfg: &MotionEstimationConfig,
    bit_depth: usize,
) -> SuperblockBestState {
    let po = sbo.to_plane_offset();
    assert!(po.x < org.cfg.width as isize && po.y < org.cfg.height as isize);
    let rem_w = (org.cfg.width as isize - po.x) as usize;
    let rem_h = (org.cfg.height as isize - po.y) as usize;

    let full_sb = rem_w >= SB_SIZE && rem_h >= SB_SIZE;
    let w = BlockWidth::largest_fitting(rem_w.min(SB_SIZE)).width();
    let h = rem_h.min(SB_SIZE);

    let org_region = org.region(Area::Rect(Rect {
        x: po.x,
        y: po.y,
        width: w,
        height: h,
    }));

    let (dx_min, dx_max, dy_min, dy_max) = displacement_bounds(p_ref, po, w, h);

    // Pick the best starting point among the seeds; the first seed wins
    // ties, like every other comparison in this pass.
    let mut seed_sad = u32::MAX;
    let (mut seed_dx, mut seed_dy) = (0isize, 0isize);
    for seed in seeds {
        let fullpel = seed.quantize_to_fullpel();
        let dx = ((fullpel.col / MV_UNITS_PER_SAMPLE) as isize).clamp(dx_min, dx_max);
        let dy = ((fullpel.row / MV_UNITS_PER_SAMPLE) as isize).clamp(dy_min, dy_max);
        let cand_region = p_ref.region(Area::Rect(Rect {
            x: po.x + dx,
            y: po.y + dy,
            width: w,
            height: h,
        }));
        let sad = get_sad(&org_region, &cand_region, w, h, bit_depth);
        if sad < seed_sad {
            seed_sad = sad;
            seed_dx = dx;
            seed_dy = dy;
        }
    }

    // Coarse exhaustive search over a window containing the chosen seed.
    let (win_x, win_w) = clamp_window(seed_dx, cfg.search_width, dx_min, dx_max);
    let (win_y, win_h) = clamp_window(seed_dy, cfg.search_height, dy_min, dy_max);
    let window = SearchWindow {
        x: win_x as i16,
        y: win_y as i16,
        width: win_w,
        height: win_h,
    };
    let mut coarse = SearchResult {
        best_sad: seed_sad,
        best_dx: (seed_dx - win_x) as i16,
        best_dy: (seed_dy - win_y) as i16,
    };
    exhaustive_search(&org_region, p_ref, po, window, w, h, bit_depth, &mut coarse);

    let coarse_dx = win_x + coarse.best_dx as isize;
    let coarse_dy = win_y + coarse.best_dy as isize;

    let mut state = SuperblockBestState::empty();
    state.best_64x64.improve(
        coarse.best_sad,
        MotionVector::from_fullpel(coarse_dx as i16, coarse_dy as i16),
    );

    if !full_sb {
        return state;
    }

    // Hierarchical refinement: one candidate batch per row, ascending
    // vertical offset, centered on the coarse winner.
    let batch_dx_max = dx_max - (CANDIDATE_COUNT as isize - 1);
    if batch_dx_max < dx_min {
        return state;
    }
    let x0 = (coarse_dx - (CANDIDATE_COUNT as isize / 2)).clamp(dx_min, batch_dx_max);
    let (dy_lo, dy_count) = clamp_window(coarse_dy, cfg.refine_rows, dy_min, dy_max);

    let mut table = PartitionSadTable::new();
    for dy in dy_lo..dy_lo + dy_count as isize {
        let row = CandidateRow::from_fullpel(x0 as i16, dy as i16);
        table.compute(&org_region, p_ref, po, x0 as i16, dy as i16);
        aggregate_candidate_row(&mut state, row, &table);
    }

    state
}

/// Estimate motion for every superblock of a frame against one reference
/// picture.
///
/// Superblock rows are processed in parallel; within a row, each superblock
/// is seeded from its left neighbor's whole-superblock winner and the zero
/// vector.
///
/// # Errors
///
/// - If the planes disagree on the coding area, or the reference padding
///   cannot support the configured window.
pub fn estimate_frame_motion<T: Pixel>(
    org: &Plane<T>,
    p_ref: &Plane<T>,
    cfg: &MotionEstimationConfig,
    bit_depth: usize,
) -> Result<MotionField, EstimationError> {
    if org.cfg.width != p_ref.cfg.width || org.cfg.height != p_ref.cfg.height {
        return Err(EstimationError::DimensionMismatch);
    }

    let (req_x, req_y) = cfg.required_padding();
    let (pad_x, pad_y) = edge_padding(p_ref);
    if pad_x < req_x {
        return Err(EstimationError::InsufficientPadding {
            required: req_x,
            available: pad_x,
        });
    }
    if pad_y < req_y {
        return Err(EstimationError::InsufficientPadding {
            required: req_y,
            available: pad_y,
        });
    }

    let sb_cols = org.cfg.width.div_ceil(SB_SIZE);
    let sb_rows = org.cfg.height.div_ceil(SB_SIZE);
    let mut field = MotionField::new(sb_cols, sb_rows);

    field
        .rows_mut()
        .enumerate()
        .collect::<Vec<_>>()
        .into_par_iter()
        .for_each(|(sby, row_states)| {
            let mut left: Option<MotionVector> = None;
            for (sbx, slot) in row_states.iter_mut().enumerate() {
                let po_x = sbx * SB_SIZE;
                // Slivers narrower than the smallest width class keep their
                // sentinel entries.
                if org.cfg.width - po_x < 4 {
                    left = None;
                    continue;
                }

                let mut seeds = ArrayVec::<MotionVector, 2>::new();
                seeds.push(MotionVector::default());
                if let Some(mv) = left {
                    seeds.push(mv);
                }

                let state = estimate_superblock_motion(
                    org,
                    p_ref,
                    SuperBlockOffset { x: sbx, y: sby },
                    &seeds,
                    cfg,
                    bit_depth,
                );
                left = Some(state.best_64x64.mv);
                *slot = state;
            }
        });

    debug!(
        "motion pass: {}x{} superblocks, {}x{} coarse window, {} refine rows",
        sb_cols, sb_rows, cfg.search_width, cfg.search_height, cfg.refine_rows
    );

    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::motion::MotionVector;

    // A pattern with period 16 on both axes and no other self-coincidence:
    // any displacement that is not a multiple of (16, 16) changes some
    // pixel, so within a window smaller than the period the zero-SAD
    // displacement is unique.
    fn tile_pattern(x: isize, y: isize) -> u8 {
        (((x & 15) | ((y & 15) << 4)) & 255) as u8
    }

    fn make_plane(
        width: usize,
        height: usize,
        pad: usize,
        f: impl Fn(isize, isize) -> u8,
    ) -> Plane<u8> {
        let mut plane = Plane::new(width, height, 0, 0, pad, pad);
        let stride = plane.cfg.stride;
        let xo = plane.cfg.xorigin as isize;
        let yo = plane.cfg.yorigin as isize;
        for (i, row) in plane.data.chunks_mut(stride).enumerate() {
            for (j, pixel) in row.iter_mut().enumerate() {
                *pixel = f(j as isize - xo, i as isize - yo);
            }
        }
        plane
    }

    const SMALL_WINDOW: MotionEstimationConfig = MotionEstimationConfig {
        search_width: 12,
        search_height: 12,
        refine_rows: 6,
    };

    #[test]
    fn recovers_global_shift_at_all_granularities() {
        let (shift_x, shift_y) = (5isize, -3isize);
        let org = make_plane(128, 128, 16, tile_pattern);
        let reference = make_plane(128, 128, 16, |x, y| tile_pattern(x - shift_x, y - shift_y));

        let field =
            estimate_frame_motion(&org, &reference, &SMALL_WINDOW, 8).expect("valid geometry");
        assert_eq!((field.cols, field.rows), (2, 2));

        let expected = MotionVector::from_fullpel(shift_x as i16, shift_y as i16);
        for sby in 0..2 {
            for sbx in 0..2 {
                let state = &field[sby][sbx];
                assert_eq!(state.best_64x64.mv, expected, "sb ({sbx}, {sby})");
                assert_eq!(state.best_64x64.sad, 0);
                for best in &state.best_32x32 {
                    assert_eq!((best.mv, best.sad), (expected, 0));
                }
                for best in &state.best_16x16 {
                    assert_eq!((best.mv, best.sad), (expected, 0));
                }
                for best in &state.best_8x8 {
                    assert_eq!((best.mv, best.sad), (expected, 0));
                }
            }
        }
    }

    #[test]
    fn identical_frames_settle_on_zero_motion() {
        let org = make_plane(64, 64, 16, tile_pattern);
        let reference = make_plane(64, 64, 16, tile_pattern);

        let field =
            estimate_frame_motion(&org, &reference, &SMALL_WINDOW, 8).expect("valid geometry");
        let state = &field[0][0];
        assert_eq!(state.best_64x64.mv, MotionVector::default());
        assert_eq!(state.best_64x64.sad, 0);
    }

    #[test]
    fn clipped_edge_blocks_use_fitting_width_class() {
        // 88 = 64 + 24: the right column of superblocks is 24 wide, the
        // bottom row 24 tall.
        let (shift_x, shift_y) = (2isize, 1isize);
        let org = make_plane(88, 88, 16, tile_pattern);
        let reference = make_plane(88, 88, 16, |x, y| tile_pattern(x - shift_x, y - shift_y));

        let field =
            estimate_frame_motion(&org, &reference, &SMALL_WINDOW, 8).expect("valid geometry");
        assert_eq!((field.cols, field.rows), (2, 2));

        let expected = MotionVector::from_fullpel(shift_x as i16, shift_y as i16);
        for sby in 0..2 {
            for sbx in 0..2 {
                let state = &field[sby][sbx];
                assert_eq!(state.best_64x64.mv, expected, "sb ({sbx}, {sby})");
                assert_eq!(state.best_64x64.sad, 0);
            }
        }
        // Clipped superblocks skip hierarchical refinement.
        assert_eq!(field[0][1].best_16x16[0].sad, u32::MAX);
        assert_eq!(field[1][0].best_8x8[0].sad, u32::MAX);
    }

    #[test]
    fn rejects_mismatched_planes() {
        let org = make_plane(128, 128, 32, tile_pattern);
        let reference = make_plane(64, 64, 32, tile_pattern);
        let err = estimate_frame_motion(&org, &reference, &MotionEstimationConfig::default(), 8)
            .unwrap_err();
        assert_eq!(err, EstimationError::DimensionMismatch);
    }

    #[test]
    fn rejects_insufficient_padding() {
        let org = make_plane(128, 128, 8, tile_pattern);
        let reference = make_plane(128, 128, 8, tile_pattern);
        let err = estimate_frame_motion(&org, &reference, &MotionEstimationConfig::default(), 8)
            .unwrap_err();
        assert!(matches!(err, EstimationError::InsufficientPadding { .. }));
    }
}
