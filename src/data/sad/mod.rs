mod rust;


use v_frame::pixel::Pixel;

use super::plane::PlaneRegion;

/// Compute the sum of absolute differences between two equal-shaped blocks.
///
/// `w` must be one of the supported width classes (4, 8, 16, 24, 32, 48,
/// 64) and `h` in `1..=64`; both regions must cover at least `w`x`h`
/// pixels. The accumulator is wide enough that no intermediate sum can
/// saturate for any supported shape.
///
/// # Panics
///
/// - If `w` or `h` is outside the supported shapes.
pub fn get_sad<T: Pixel>(
    plane_org: &PlaneRegion<'_, T>,
    plane_ref: &PlaneRegion<'_, T>,
    w: usize,
    h: usize,
    bit_depth: usize,
) -> u32 {
    rust::get_sad_internal(plane_org, plane_ref, w, h, bit_depth)
}
