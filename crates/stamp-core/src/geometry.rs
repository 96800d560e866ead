//! Stamp placement geometry
//!
//! All coordinates here use a top-left origin with the Y axis pointing down,
//! measured in PDF points. Conversion to PDF user space (bottom-left origin)
//! happens in the loader when the image is drawn.

use crate::config::StampConfig;

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    pub fn a4() -> Self {
        Self::new(595.0, 842.0)
    }
}

/// Target rectangle for the stamp, as `(x0, y0)`-`(x1, y1)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertionRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl InsertionRect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// True when the rect lies inside `[0, width] x [0, height]`
    pub fn is_within(&self, page: PageGeometry) -> bool {
        self.x0 >= 0.0 && self.y0 >= 0.0 && self.x1 <= page.width && self.y1 <= page.height
    }
}

/// Placement expressed as fractions of the page width and height,
/// measured from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativePosition {
    x: f64,
    y: f64,
}

impl RelativePosition {
    /// Returns `None` for NaN or infinite components. Finite values outside
    /// `[0, 1]` are kept and clamped when the rect is computed.
    pub fn new(x: f64, y: f64) -> Option<Self> {
        if x.is_finite() && y.is_finite() {
            Some(Self { x, y })
        } else {
            None
        }
    }

    /// Parse a position from loosely typed form fields.
    ///
    /// Anything other than two numbers inside `[0, 1]` means "no position",
    /// and the caller falls back to the default placement.
    pub fn from_form(x: Option<&str>, y: Option<&str>) -> Option<Self> {
        let x: f64 = x?.trim().parse().ok()?;
        let y: f64 = y?.trim().parse().ok()?;
        if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
            return None;
        }
        Self::new(x, y)
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    /// Components clamped to `[0, 1]`
    pub fn clamped(&self) -> (f64, f64) {
        (self.x.clamp(0.0, 1.0), self.y.clamp(0.0, 1.0))
    }
}

/// Compute the stamp rect for one page.
///
/// With a position, the anchor is pulled inward so the whole stamp stays on
/// the page. Without one, the stamp sits `margin` points from the bottom-right
/// corner and is not clamped: pages smaller than `stamp + margin` produce
/// negative coordinates.
pub fn stamp_rect(
    page: PageGeometry,
    config: &StampConfig,
    position: Option<RelativePosition>,
) -> InsertionRect {
    let (x, y) = match position {
        Some(position) => {
            let (x_rel, y_rel) = position.clamped();
            let x = clamp_anchor(x_rel * page.width, page.width, config.stamp_width);
            let y = clamp_anchor(y_rel * page.height, page.height, config.stamp_height);
            (x, y)
        }
        None => (
            page.width - config.stamp_width - config.margin,
            page.height - config.stamp_height - config.margin,
        ),
    };

    InsertionRect::new(x, y, x + config.stamp_width, y + config.stamp_height)
}

fn clamp_anchor(raw: f64, extent: f64, stamp: f64) -> f64 {
    raw.max(0.0).min((extent - stamp).max(0.0))
}

/// Fit an image of `image_width` x `image_height` pixels into `rect` without
/// distortion, anchored at the rect's top-left corner.
///
/// Returns the drawn `(width, height)` in points.
pub fn fit_keep_proportion(rect: &InsertionRect, image_width: u32, image_height: u32) -> (f64, f64) {
    if image_width == 0 || image_height == 0 {
        return (0.0, 0.0);
    }
    let iw = image_width as f64;
    let ih = image_height as f64;
    let scale = (rect.width() / iw).min(rect.height() / ih);
    (iw * scale, ih * scale)
}
