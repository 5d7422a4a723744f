//! Frame/tile region math: the normalized rectangles used to composite
//! one tile of one frame into the working buffer, and to slice the
//! finished buffer back into per-tile output rectangles.

use retex_spec::{MaterialGeometry, PartBounds};

/// A normalized (0–1) UV rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UVRegion {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl UVRegion {
    /// The degenerate empty region. Composition must skip it.
    pub const EMPTY: UVRegion = UVRegion {
        left: 0.0,
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
    };

    /// The full unit rectangle.
    pub const FULL: UVRegion = UVRegion {
        left: 0.0,
        top: 0.0,
        right: 1.0,
        bottom: 1.0,
    };

    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// True when the region has no area.
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Map an inner rectangle (expressed in this region's coordinates)
    /// into absolute coordinates.
    pub fn sub(&self, inner: &UVRegion) -> UVRegion {
        let w = self.width();
        let h = self.height();
        UVRegion::new(
            self.left + inner.left * w,
            self.top + inner.top * h,
            self.left + inner.right * w,
            self.top + inner.bottom * h,
        )
    }

    /// Rasterize against a pixel grid.
    pub fn to_pixels(&self, width: u32, height: u32) -> PixelRect {
        let x0 = (self.left * width as f32).round().max(0.0) as u32;
        let y0 = (self.top * height as f32).round().max(0.0) as u32;
        let x1 = (self.right * width as f32).round().min(width as f32) as u32;
        let y1 = (self.bottom * height as f32).round().min(height as f32) as u32;
        PixelRect {
            x: x0.min(x1),
            y: y0.min(y1),
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }
}

/// An integer pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One source-to-destination mapping for one tile of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRegion {
    /// Where to sample in the source image.
    pub source: UVRegion,
    /// Where to paint in the working buffer.
    pub dest: UVRegion,
}

impl RenderRegion {
    /// True when either side is degenerate.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty() || self.dest.is_empty()
    }
}

/// Computes render and publish regions for one material's addressing
/// scheme. Both enumerations share tile indexing and frame wrapping, so a
/// pixel painted by the render pass lands inside the rectangle the
/// publish pass later crops.
#[derive(Debug, Clone)]
pub struct RegionEnumerator<'a> {
    geometry: &'a MaterialGeometry,
    source_frame_count: u32,
    dest_frame_count: u32,
    target_frame: Option<u32>,
    target_part: Option<usize>,
}

impl<'a> RegionEnumerator<'a> {
    pub fn new(geometry: &'a MaterialGeometry, source_frames: u32, dest_frames: u32) -> Self {
        Self {
            geometry,
            source_frame_count: source_frames.max(1),
            dest_frame_count: dest_frames.max(1),
            target_frame: None,
            target_part: None,
        }
    }

    /// Restrict the working buffer to a single frame.
    pub fn with_target_frame(mut self, frame: Option<u32>) -> Self {
        self.target_frame = frame;
        self
    }

    /// Restrict the working buffer to a single tile/part.
    pub fn with_target_part(mut self, part: Option<usize>) -> Self {
        self.target_part = part;
        self
    }

    /// Number of tiles to composite per frame.
    pub fn tile_count(&self) -> u32 {
        if self.target_part.is_some() {
            1
        } else {
            self.geometry.tile_count()
        }
    }

    /// Frame indices to paint into the working buffer.
    pub fn dest_frames(&self) -> Vec<u32> {
        match self.target_frame {
            Some(frame) => vec![frame],
            None => (0..self.dest_frame_count).collect(),
        }
    }

    /// Full-frame rectangle for a wrapped frame index within a stack of
    /// `count` frames.
    fn frame_region(frame: u32, count: u32) -> UVRegion {
        let count = count.max(1);
        let wrapped = frame % count;
        let fraction = 1.0 / count as f32;
        UVRegion::new(
            0.0,
            wrapped as f32 * fraction,
            1.0,
            (wrapped + 1) as f32 * fraction,
        )
    }

    /// Tile rectangle within one frame, identical for source and
    /// destination layouts.
    fn tile_region(&self, tile: u32) -> UVRegion {
        if !self.geometry.parts.is_empty() {
            let Some(bounds) = self.geometry.part_bounds() else {
                return UVRegion::EMPTY;
            };
            self.part_region(tile as usize, &bounds)
        } else if let Some(ctm) = &self.geometry.ctm {
            if ctm.method.is_repeat() {
                UVRegion::FULL
            } else {
                let (cols, rows) = ctm.grid();
                let col = tile % cols;
                let row = tile / cols;
                if row >= rows {
                    return UVRegion::EMPTY;
                }
                UVRegion::new(
                    col as f32 / cols as f32,
                    row as f32 / rows as f32,
                    (col + 1) as f32 / cols as f32,
                    (row + 1) as f32 / rows as f32,
                )
            }
        } else {
            UVRegion::FULL
        }
    }

    /// Part rectangle normalized against the material bounding box.
    fn part_region(&self, index: usize, bounds: &PartBounds) -> UVRegion {
        let Some(part) = self.geometry.parts.get(index) else {
            return UVRegion::EMPTY;
        };
        if part.is_empty() || bounds.width == 0 || bounds.height == 0 {
            return UVRegion::EMPTY;
        }
        let w = bounds.width as f32;
        let h = bounds.height as f32;
        UVRegion::new(
            (part.left - bounds.left) as f32 / w,
            (part.top - bounds.top) as f32 / h,
            (part.right() - bounds.left) as f32 / w,
            (part.bottom() - bounds.top) as f32 / h,
        )
    }

    /// Render mapping for one tile of one frame. Frame indices wrap on
    /// both sides, so a shorter sequence replays a longer one.
    pub fn render_region(&self, frame: u32, tile: u32) -> RenderRegion {
        let tile_index = match self.target_part {
            Some(part) => part as u32,
            None => tile,
        };
        let tile_rect = self.tile_region(tile_index);
        if tile_rect.is_empty() {
            return RenderRegion {
                source: UVRegion::EMPTY,
                dest: UVRegion::EMPTY,
            };
        }

        let source_frame = Self::frame_region(frame, self.source_frame_count);
        let source = source_frame.sub(&tile_rect);

        let dest = if self.target_part.is_some() {
            // The working buffer holds exactly this tile.
            match self.target_frame {
                Some(_) => UVRegion::FULL,
                None => Self::frame_region(frame, self.dest_frame_count),
            }
        } else {
            let dest_frame = match self.target_frame {
                Some(_) => UVRegion::FULL,
                None => Self::frame_region(frame, self.dest_frame_count),
            };
            dest_frame.sub(&tile_rect)
        };

        RenderRegion { source, dest }
    }

    /// Rectangle within the working buffer holding one tile of one
    /// frame, used when slicing finished output.
    pub fn publish_region(&self, frame: u32, tile: u32) -> UVRegion {
        self.render_region(frame, tile).dest
    }
}
