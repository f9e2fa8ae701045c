//! Page geometry and scale-to-fit placement.
//!
//! All values are in PDF points (1/72 inch).

/// Fixed target page dimensions shared by every page of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGeometry {
    pub width: u32,
    pub height: u32,
}

impl PageGeometry {
    /// The A4-like page every document is laid out on.
    pub const A4: PageGeometry = PageGeometry {
        width: 595,
        height: 842,
    };

    /// Whether both sides are non-zero, so any raster can be placed.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        PageGeometry::A4
    }
}

/// Where a raster lands on its page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRect {
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl PlacementRect {
    /// Scales a `width` x `height` raster uniformly so it fits inside the
    /// page, touching the page edge on its constraining axis, and centers it.
    ///
    /// The scale factor is `min(page_w / w, page_h / h)` and the scaled
    /// dimensions are floored. Integer arithmetic keeps the constraining
    /// side exactly equal to the page side. Returns `None` for an empty
    /// raster or an empty page.
    pub fn fit(width: u32, height: u32, page: PageGeometry) -> Option<Self> {
        if width == 0 || height == 0 || !page.is_valid() {
            return None;
        }

        let (w, h) = (u64::from(width), u64::from(height));
        let (page_w, page_h) = (u64::from(page.width), u64::from(page.height));

        // w * page_h >= h * page_w  <=>  page_w / w <= page_h / h
        let (scaled_w, scaled_h) = if w * page_h >= h * page_w {
            (page_w, h * page_w / w)
        } else {
            (w * page_h / h, page_h)
        };

        // Extreme aspect ratios can floor a side to nothing.
        let scaled_width = scaled_w.max(1) as u32;
        let scaled_height = scaled_h.max(1) as u32;

        Some(PlacementRect {
            scaled_width,
            scaled_height,
            offset_x: (page.width - scaled_width) as f32 / 2.0,
            offset_y: (page.height - scaled_height) as f32 / 2.0,
        })
    }

    /// Uniform scale factor applied to the source raster.
    pub fn scale(width: u32, height: u32, page: PageGeometry) -> f64 {
        (f64::from(page.width) / f64::from(width)).min(f64::from(page.height) / f64::from(height))
    }
}
