use std::{iter::FusedIterator, marker::PhantomData, ops::Index, slice};

use v_frame::{
    pixel::Pixel,
    plane::{Plane, PlaneConfig},
};
pub use v_frame::plane::PlaneOffset;

use super::block::{BLOCK_TO_PLANE_SHIFT, BlockOffset};

/// Rectangle of a plane region, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// X coordinate relative to the plane origin (xorigin, yorigin).
    ///
    /// Negative values reach into the left padding.
    pub x: isize,
    /// Y coordinate relative to the plane origin (xorigin, yorigin).
    pub y: isize,
    /// Width of the rectangle in pixels.
    pub width: usize,
    /// Height of the rectangle in pixels.
    pub height: usize,
}

/// Structure to describe a rectangle area in several ways
///
/// To retrieve a subregion from a region, we need to provide the subregion
/// bounds, relative to its parent region. The subregion must always be
/// included in its parent region.
///
/// For that purpose, we could just use a rectangle (x, y, width, height), but
/// this would be too cumbersome to use in practice. For example, we often
/// need to pass a subregion from an offset, using the same bottom-right
/// corner as its parent, or to pass a subregion expressed in block offset
/// instead of pixel offset.
#[derive(Debug, Clone, Copy)]
pub enum Area {
    /// A well-defined rectangle
    Rect(Rect),
    /// A rectangle starting at offset (x, y) and ending at the bottom-right
    /// corner of the parent
    StartingAt {
        /// X coordinate of the top-left corner.
        x: isize,
        /// Y coordinate of the top-left corner.
        y: isize,
    },
    /// A rectangle starting at the given block offset until the bottom-right
    /// corner of the parent
    BlockStartingAt {
        /// Offset of the top-left corner, in blocks.
        bo: BlockOffset,
    },
}

impl Area {
    /// Convert to a rectangle of pixels.
    pub const fn to_rect(self, parent_width: usize, parent_height: usize) -> Rect {
        match self {
            Area::Rect(rect) => rect,
            Area::StartingAt { x, y } => Rect {
                x,
                y,
                width: (parent_width as isize - x) as usize,
                height: (parent_height as isize - y) as usize,
            },
            Area::BlockStartingAt { bo } => {
                let x = (bo.x << BLOCK_TO_PLANE_SHIFT) as isize;
                let y = (bo.y << BLOCK_TO_PLANE_SHIFT) as isize;
                Rect {
                    x,
                    y,
                    width: (parent_width as isize - x) as usize,
                    height: (parent_height as isize - y) as usize,
                }
            }
        }
    }
}

/// Bounded region of a plane
///
/// This allows giving access to a rectangular area of a plane without
/// giving access to the whole plane.
#[derive(Debug)]
pub struct PlaneRegion<'a, T: Pixel> {
    data: *const T, // points to (rect.x, rect.y)
    /// Geometry of the underlying plane.
    pub plane_cfg: &'a PlaneConfig,
    // private to guarantee borrowing rules
    rect: Rect,
    phantom: PhantomData<&'a T>,
}

impl<'a, T: Pixel> PlaneRegion<'a, T> {
    /// # Panics
    ///
    /// - If the rectangle is not fully addressable within the plane
    ///   allocation, padding included.
    pub fn new(plane: &'a Plane<T>, rect: Rect) -> Self {
        let cfg = &plane.cfg;
        assert!(rect.x >= -(cfg.xorigin as isize));
        assert!(rect.y >= -(cfg.yorigin as isize));
        assert!(cfg.xorigin as isize + rect.x + rect.width as isize <= cfg.stride as isize);
        assert!(cfg.yorigin as isize + rect.y + rect.height as isize <= cfg.alloc_height as isize);

        let origin =
            (cfg.yorigin as isize + rect.y) * cfg.stride as isize + cfg.xorigin as isize + rect.x;
        Self {
            // SAFETY: The above asserts ensure the rectangle stays within the
            // plane allocation.
            data: unsafe { plane.data.as_ptr().offset(origin) },
            plane_cfg: cfg,
            rect,
            phantom: PhantomData,
        }
    }

    /// A region covering the full nominal area of the plane.
    pub fn new_from_plane(plane: &'a Plane<T>) -> Self {
        let rect = Rect {
            x: 0,
            y: 0,
            width: plane.cfg.width,
            height: plane.cfg.height,
        };
        Self::new(plane, rect)
    }

    /// Bounds of this region, relative to the plane origin.
    pub const fn rect(&self) -> &Rect {
        &self.rect
    }

    /// Iterator over the rows of this region.
    pub fn rows_iter(&self) -> PlaneRegionRowsIter<'_, T> {
        PlaneRegionRowsIter {
            data: self.data,
            stride: self.plane_cfg.stride,
            width: self.rect.width,
            remaining: self.rect.height,
            phantom: PhantomData,
        }
    }

    /// Iterator over all vertically-shifted `h`-tall windows of this region,
    /// top to bottom.
    pub fn vert_windows(&self, h: usize) -> VertWindows<'_, T> {
        VertWindows {
            data: self.data,
            plane_cfg: self.plane_cfg,
            remaining: (self.rect.height as isize - h as isize + 1).max(0) as usize,
            output_rect: Rect {
                x: self.rect.x,
                y: self.rect.y,
                width: self.rect.width,
                height: h,
            },
            phantom: PhantomData,
        }
    }

    /// Iterator over all horizontally-shifted `w`-wide windows of this
    /// region, left to right.
    pub fn horz_windows(&self, w: usize) -> HorzWindows<'_, T> {
        HorzWindows {
            data: self.data,
            plane_cfg: self.plane_cfg,
            remaining: (self.rect.width as isize - w as isize + 1).max(0) as usize,
            output_rect: Rect {
                x: self.rect.x,
                y: self.rect.y,
                width: w,
                height: self.rect.height,
            },
            phantom: PhantomData,
        }
    }

    /// Return a view to a subregion of the plane
    ///
    /// The subregion must be included in (i.e. must not exceed) this region.
    ///
    /// It is described by an `Area`, relative to this region.
    ///
    /// # Panics
    ///
    /// - If the requested dimensions are larger than the plane region size
    pub fn subregion(&self, area: Area) -> PlaneRegion<'_, T> {
        let rect = area.to_rect(self.rect.width, self.rect.height);
        assert!(rect.x >= 0 && rect.x as usize <= self.rect.width);
        assert!(rect.y >= 0 && rect.y as usize <= self.rect.height);
        // SAFETY: The above asserts ensure we do not go outside the original
        // rectangle.
        let data =
            unsafe { self.data.add(rect.y as usize * self.plane_cfg.stride + rect.x as usize) };
        let absolute_rect = Rect {
            x: self.rect.x + rect.x,
            y: self.rect.y + rect.y,
            width: rect.width,
            height: rect.height,
        };
        PlaneRegion {
            data,
            plane_cfg: self.plane_cfg,
            rect: absolute_rect,
            phantom: PhantomData,
        }
    }
}

// SAFETY: can be safely sent across threads
unsafe impl<T: Pixel> Send for PlaneRegion<'_, T> {}
// SAFETY: read-only view over plane data
unsafe impl<T: Pixel> Sync for PlaneRegion<'_, T> {}

impl<T: Pixel> Index<usize> for PlaneRegion<'_, T> {
    type Output = [T];

    fn index(&self, index: usize) -> &Self::Output {
        assert!(index < self.rect.height);
        // SAFETY: The above assert ensures we do not access OOB data.
        unsafe {
            let ptr = self.data.add(index * self.plane_cfg.stride);
            slice::from_raw_parts(ptr, self.rect.width)
        }
    }
}

/// Iterator over plane region rows
pub struct PlaneRegionRowsIter<'a, T: Pixel> {
    data: *const T,
    stride: usize,
    width: usize,
    remaining: usize,
    phantom: PhantomData<&'a T>,
}

impl<'a, T: Pixel> Iterator for PlaneRegionRowsIter<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        (self.remaining > 0).then(|| {
            // SAFETY: struct ensures we do not overflow bounds
            let row = unsafe {
                let ptr = self.data;
                self.data = self.data.add(self.stride);
                slice::from_raw_parts(ptr, self.width)
            };
            self.remaining -= 1;
            row
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Pixel> ExactSizeIterator for PlaneRegionRowsIter<'_, T> {
}
impl<T: Pixel> FusedIterator for PlaneRegionRowsIter<'_, T> {
}

/// Iterator over vertically-shifted windows of a region
pub struct VertWindows<'a, T: Pixel> {
    data: *const T,
    plane_cfg: &'a PlaneConfig,
    remaining: usize,
    output_rect: Rect,
    phantom: PhantomData<&'a T>,
}

/// Iterator over horizontally-shifted windows of a region
pub struct HorzWindows<'a, T: Pixel> {
    data: *const T,
    plane_cfg: &'a PlaneConfig,
    remaining: usize,
    output_rect: Rect,
    phantom: PhantomData<&'a T>,
}

impl<'a, T: Pixel> Iterator for VertWindows<'a, T> {
    type Item = PlaneRegion<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.nth(0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        (self.remaining > n).then(|| {
            // SAFETY: struct ensures we do not overflow bounds
            self.data = unsafe { self.data.add(self.plane_cfg.stride * n) };
            self.output_rect.y += n as isize;
            let output = PlaneRegion {
                data: self.data,
                plane_cfg: self.plane_cfg,
                rect: self.output_rect,
                phantom: PhantomData,
            };
            // SAFETY: We verified that we have enough data left to not go OOB.
            self.data = unsafe { self.data.add(self.plane_cfg.stride) };
            self.output_rect.y += 1;
            self.remaining -= n + 1;
            output
        })
    }
}

impl<'a, T: Pixel> Iterator for HorzWindows<'a, T> {
    type Item = PlaneRegion<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.nth(0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        (self.remaining > n).then(|| {
            // SAFETY: struct ensures we do not overflow bounds
            self.data = unsafe { self.data.add(n) };
            self.output_rect.x += n as isize;
            let output = PlaneRegion {
                data: self.data,
                plane_cfg: self.plane_cfg,
                rect: self.output_rect,
                phantom: PhantomData,
            };
            // SAFETY: We verified that we have enough data left to not go OOB.
            self.data = unsafe { self.data.add(1) };
            self.output_rect.x += 1;
            self.remaining -= n + 1;
            output
        })
    }
}

impl<T: Pixel> ExactSizeIterator for VertWindows<'_, T> {
}
impl<T: Pixel> FusedIterator for VertWindows<'_, T> {
}
impl<T: Pixel> ExactSizeIterator for HorzWindows<'_, T> {
}
impl<T: Pixel> FusedIterator for HorzWindows<'_, T> {
}

/// Extension trait for constructing regions directly from a [`Plane`].
pub trait AsRegion<T: Pixel> {
    /// A region covering the full nominal area of the plane.
    fn as_region(&self) -> PlaneRegion<'_, T>;
    /// A region covering `area`, relative to the plane origin.
    fn region(&self, area: Area) -> PlaneRegion<'_, T>;
}

impl<T: Pixel> AsRegion<T> for Plane<T> {
    #[inline]
    fn as_region(&self) -> PlaneRegion<'_, T> {
        PlaneRegion::new_from_plane(self)
    }

    #[inline]
    fn region(&self, area: Area) -> PlaneRegion<'_, T> {
        let rect = area.to_rect(self.cfg.width, self.cfg.height);
        PlaneRegion::new(self, rect)
    }
}

/// Number of replicated edge pixels addressable on each side of a plane.
///
/// Search windows must stay inside these bounds; the padding collaborator
/// guarantees at least `search extent - 1` extra pixels on every side.
pub fn edge_padding<T: Pixel>(plane: &Plane<T>) -> (usize, usize) {
    (plane.cfg.xorigin, plane.cfg.yorigin)
}
