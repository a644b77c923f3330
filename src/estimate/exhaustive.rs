use v_frame::{pixel::Pixel, plane::Plane};

use crate::data::{
    plane::{Area, AsRegion, PlaneOffset, PlaneRegion, Rect},
    sad::get_sad,
};

/// The rectangular displacement range scanned by [`exhaustive_search`].
///
/// `x`/`y` give the displacement of the window's top-left corner relative to
/// the block position; `width`/`height` give the number of candidate
/// displacements along each axis. Callers searching a pre-decimated
/// reference pass the decimated plane itself; its stride covers the
/// line-skipping role the raw encoder kept a second stride field for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    /// Horizontal displacement of the window origin, in full samples.
    pub x: i16,
    /// Vertical displacement of the window origin, in full samples.
    pub y: i16,
    /// Number of horizontal candidate displacements.
    pub width: usize,
    /// Number of vertical candidate displacements.
    pub height: usize,
}

/// Running best of an exhaustive search.
///
/// The caller seeds this with an initial displacement guess and a sentinel
/// SAD larger than any attainable value; the search only ever replaces it on
/// strict improvement, so the first displacement scanned in row-major order
/// wins all ties, including ties against the seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SearchResult {
    /// Lowest SAD found so far.
    pub best_sad: u32,
    /// Horizontal displacement of `best_sad`, relative to the window origin.
    pub best_dx: i16,
    /// Vertical displacement of `best_sad`, relative to the window origin.
    pub best_dy: i16,
}

impl SearchResult {
    /// A result seeded with a displacement guess and the sentinel SAD.
    pub const fn seeded(dx: i16, dy: i16) -> Self {
        Self {
            best_sad: u32::MAX,
            best_dx: dx,
            best_dy: dy,
        }
    }
}

/// Scan every displacement of `window` and keep the lowest-SAD match.
///
/// The `w`x`h` source block `org_region` is compared against the reference
/// block at `po + window origin + (dx, dy)` for every `dx` in
/// `0..window.width` and `dy` in `0..window.height`. The scan is row-major
/// (`dy` outer ascending, `dx` inner ascending) and updates `best` only on
/// strictly smaller SAD, with no special-cased remainder columns, so the
/// first displacement encountered wins all ties. A window with zero extent
/// leaves the seeded result untouched.
///
/// The caller guarantees that the whole window, extended by the block
/// shape, is addressable in `p_ref` (padding included).
///
/// # Panics
///
/// - If `w` is not a supported width class or the window overruns the
///   reference plane allocation.
pub fn exhaustive_search<T: Pixel>(
    org_region: &PlaneRegion<'_, T>,
    p_ref: &Plane<T>,
    po: PlaneOffset,
    window: SearchWindow,
    w: usize,
    h: usize,
    bit_depth: usize,
    best: &mut SearchResult,
) {
    if window.width == 0 || window.height == 0 {
        return;
    }

    let search_region = p_ref.region(Area::Rect(Rect {
        x: po.x + window.x as isize,
        y: po.y + window.y as isize,
        width: window.width + w - 1,
        height: window.height + h - 1,
    }));

    for (dy, vert_window) in search_region.vert_windows(h).enumerate() {
        for (dx, ref_window) in vert_window.horz_windows(w).enumerate() {
            let sad = get_sad(org_region, &ref_window, w, h, bit_depth);

            if sad < best.best_sad {
                best.best_sad = sad;
                best.best_dx = dx as i16;
                best.best_dy = dy as i16;
            }
        }
    }
}
