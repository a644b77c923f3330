use v_frame::pixel::{CastFromPrimitive, Pixel};

use crate::data::{
    block::{BlockWidth, MAX_BLOCK_HEIGHT},
    plane::{Area, PlaneRegion, Rect},
};

pub(super) fn get_sad_internal<T: Pixel>(
    plane_org: &PlaneRegion<'_, T>,
    plane_ref: &PlaneRegion<'_, T>,
    w: usize,
    h: usize,
    _bit_depth: usize,
) -> u32 {
    // Shape mismatches are contract violations; there is deliberately no
    // silently-succeeding default path for unsupported widths.
    assert!(
        BlockWidth::from_width_opt(w).is_ok(),
        "unsupported block width: {w}"
    );
    assert!(
        (1..=MAX_BLOCK_HEIGHT).contains(&h),
        "unsupported block height: {h}"
    );

    let plane_org = plane_org.subregion(Area::Rect(Rect {
        x: 0,
        y: 0,
        width: w,
        height: h,
    }));
    let plane_ref = plane_ref.subregion(Area::Rect(Rect {
        x: 0,
        y: 0,
        width: w,
        height: h,
    }));

    plane_org
        .rows_iter()
        .zip(plane_ref.rows_iter())
        .map(|(src, dst)| {
            src.iter()
                .zip(dst)
                .map(|(&p1, &p2)| i32::cast_from(p1).abs_diff(i32::cast_from(p2)))
                .sum::<u32>()
        })
        .sum()
}
