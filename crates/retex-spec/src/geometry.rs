//! Geometry metadata: connected-texture tiling, multi-part atlas layout,
//! and animation flags for one material.

use serde::{Deserialize, Serialize};

/// Connected-texture method. Repeat-style methods collapse to a single
/// tile spanning the full frame; tiled methods publish a grid of tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CtmMethod {
    /// One tile repeated across the surface.
    Repeat,
    /// One fixed tile (no context sensitivity).
    Fixed,
    /// Four-tile horizontal strip.
    Horizontal,
    /// Four-tile vertical strip.
    Vertical,
    /// Five-tile compact layout.
    Compact,
    /// Full 12x4 context grid.
    Full,
    /// Expanded 12x4 context grid.
    Expanded,
}

impl CtmMethod {
    /// True for methods that publish a single full-frame tile.
    pub fn is_repeat(&self) -> bool {
        matches!(self, CtmMethod::Repeat | CtmMethod::Fixed)
    }

    /// Conventional tile grid for the method.
    pub fn default_grid(&self) -> (u32, u32) {
        match self {
            CtmMethod::Repeat | CtmMethod::Fixed => (1, 1),
            CtmMethod::Horizontal => (4, 1),
            CtmMethod::Vertical => (1, 4),
            CtmMethod::Compact => (5, 1),
            CtmMethod::Full | CtmMethod::Expanded => (12, 4),
        }
    }
}

/// Connected-texture layout: a method plus an optional grid override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtmLayout {
    pub method: CtmMethod,
    /// Grid column count; defaults to the method's conventional grid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_count_x: Option<u32>,
    /// Grid row count; defaults to the method's conventional grid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_count_y: Option<u32>,
}

impl CtmLayout {
    pub fn new(method: CtmMethod) -> Self {
        Self {
            method,
            tile_count_x: None,
            tile_count_y: None,
        }
    }

    /// Effective tile grid, falling back to the method default.
    pub fn grid(&self) -> (u32, u32) {
        let (dx, dy) = self.method.default_grid();
        (
            self.tile_count_x.unwrap_or(dx).max(1),
            self.tile_count_y.unwrap_or(dy).max(1),
        )
    }

    /// Number of tiles published by this layout.
    pub fn publish_tile_count(&self) -> u32 {
        if self.method.is_repeat() {
            1
        } else {
            let (x, y) = self.grid();
            x * y
        }
    }
}

/// One named sub-rectangle of a multi-part atlas, in source pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRegion {
    pub name: String,
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl PartRegion {
    pub fn new(name: impl Into<String>, left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.left + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height as i32
    }

    /// True when the rectangle has zero area.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Pixel-space bounding box over a set of parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartBounds {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

/// Geometry metadata supplied by the caller per material.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaterialGeometry {
    /// Frames are stacked vertically in source files; frame count is
    /// inferred from `height / width`.
    #[serde(default)]
    pub animated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctm: Option<CtmLayout>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<PartRegion>,
}

impl MaterialGeometry {
    /// Plain, unanimated, untiled geometry.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Bounding box over all declared parts, `None` when no parts exist
    /// or every part is degenerate.
    pub fn part_bounds(&self) -> Option<PartBounds> {
        let mut bounds: Option<(i32, i32, i32, i32)> = None;
        for part in self.parts.iter().filter(|p| !p.is_empty()) {
            bounds = Some(match bounds {
                None => (part.left, part.top, part.right(), part.bottom()),
                Some((l, t, r, b)) => (
                    l.min(part.left),
                    t.min(part.top),
                    r.max(part.right()),
                    b.max(part.bottom()),
                ),
            });
        }
        bounds.map(|(l, t, r, b)| PartBounds {
            left: l,
            top: t,
            width: (r - l) as u32,
            height: (b - t) as u32,
        })
    }

    /// Number of tiles one frame is divided into.
    pub fn tile_count(&self) -> u32 {
        if !self.parts.is_empty() {
            self.parts.len() as u32
        } else if let Some(ctm) = &self.ctm {
            ctm.publish_tile_count()
        } else {
            1
        }
    }
}
