use cgmath::Vector2;

/// An integral size in pixels.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntSize {
    pub width: i32,
    pub height: i32,
}

impl IntSize {
    #[inline]
    pub const fn new(width: i32, height: i32) -> Self {
        IntSize { width, height }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn area(&self) -> usize {
        (self.width.max(0) as usize) * (self.height.max(0) as usize)
    }
}

/// A rectangle in pixels, as taken by `glViewport`, `glScissor` and `glReadPixels`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Viewport { x, y, w, h }
    }

    #[inline]
    pub fn from_size(size: IntSize) -> Self {
        Viewport::new(0, 0, size.width, size.height)
    }

    #[inline]
    pub fn size(&self) -> IntSize {
        IntSize::new(self.w, self.h)
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.size().area()
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.w && y < self.y + self.h
    }
}

/// A rectangle in the normalized texture space.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TexRect {
    pub origin: Vector2<f32>,
    pub size: Vector2<f32>,
}

impl Default for TexRect {
    fn default() -> Self {
        TexRect::unit()
    }
}

impl TexRect {
    #[inline]
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        TexRect {
            origin: Vector2::new(x, y),
            size: Vector2::new(w, h),
        }
    }

    /// The whole texture, `{0, 0, 1, 1}`.
    #[inline]
    pub fn unit() -> Self {
        TexRect::new(0.0, 0.0, 1.0, 1.0)
    }

    /// Maps a coordinate in the unit square into this rectangle.
    #[inline]
    pub fn map(&self, uv: Vector2<f32>) -> Vector2<f32> {
        Vector2::new(
            self.origin.x + uv.x * self.size.x,
            self.origin.y + uv.y * self.size.y,
        )
    }

    /// Maps a coordinate inside this rectangle back into the unit square.
    #[inline]
    pub fn unmap(&self, uv: Vector2<f32>) -> Vector2<f32> {
        Vector2::new(
            if self.size.x != 0.0 { (uv.x - self.origin.x) / self.size.x } else { 0.0 },
            if self.size.y != 0.0 { (uv.y - self.origin.y) / self.size.y } else { 0.0 },
        )
    }
}
