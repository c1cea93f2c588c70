/// A 2D displacement in pixels.
///
/// Used for per-glyph paint offsets: moves the glyph when drawn but
/// does not move the pen.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
}

impl Offset {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

/// Axis-aligned float rectangle.
///
/// Glyph bounds use a y-down coordinate system relative to the
/// alphabetic baseline, so ink above the baseline has negative `y`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_edges(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    /// True when the rectangle encloses no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// True when every component is zero.
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.width == 0.0 && self.height == 0.0
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    /// Grow to enclose `other`. Empty rectangles are ignored on either side.
    pub fn unite(&mut self, other: &Rect) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }
        self.unite_even_if_empty(other);
    }

    /// Grow to enclose `other` unless `other` is all zero. Unlike
    /// [`Rect::unite`], a zero-width rectangle with a height still counts.
    pub fn unite_if_non_zero(&mut self, other: &Rect) {
        if other.is_zero() {
            return;
        }
        if self.is_zero() {
            *self = *other;
            return;
        }
        self.unite_even_if_empty(other);
    }

    fn unite_even_if_empty(&mut self, other: &Rect) {
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.max_x().max(other.max_x());
        let bottom = self.max_y().max(other.max_y());
        *self = Rect::from_edges(left, top, right, bottom);
    }

    /// Move the left edge to `x`, keeping the right edge in place.
    pub fn shift_x_edge_to(&mut self, x: f32) {
        let right = self.max_x();
        self.x = x;
        self.width = (right - x).max(0.0);
    }
}
