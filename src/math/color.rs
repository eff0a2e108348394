/// A RGBA color with floating point components in the range 0 to 1.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color4F {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// A RGBA color with one byte per component.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color4B {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color4F {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color4F { r, g, b, a }
    }

    pub fn white() -> Self {
        Color4F::new(1.0, 1.0, 1.0, 1.0)
    }

    pub fn black() -> Self {
        Color4F::new(0.0, 0.0, 0.0, 1.0)
    }

    pub fn transparent() -> Self {
        Color4F::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn gray(level: f32) -> Self {
        Color4F::new(level, level, level, 1.0)
    }

    /// Clip to [0.0, 1.0] range.
    pub fn clip(&self) -> Self {
        let c = |v: f32| v.max(0.0).min(1.0);
        Color4F::new(c(self.r), c(self.g), c(self.b), c(self.a))
    }

    /// Returns a copy with the alpha replaced.
    #[inline]
    pub fn with_alpha(&self, a: f32) -> Self {
        Color4F::new(self.r, self.g, self.b, a)
    }

    /// Returns a copy with the rgb channels multiplied by alpha.
    #[inline]
    pub fn premultiplied(&self) -> Self {
        Color4F::new(self.r * self.a, self.g * self.a, self.b * self.a, self.a)
    }

    #[inline]
    pub fn rgba(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Linear interpolation between two colors.
    pub fn lerp(&self, rhs: Color4F, t: f32) -> Self {
        Color4F::new(
            self.r + (rhs.r - self.r) * t,
            self.g + (rhs.g - self.g) * t,
            self.b + (rhs.b - self.b) * t,
            self.a + (rhs.a - self.a) * t,
        )
    }
}

impl Color4B {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color4B { r, g, b, a }
    }

    pub fn white() -> Self {
        Color4B::new(255, 255, 255, 255)
    }

    #[inline]
    pub fn rgba(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Converts a unit float to a byte, rounding to the nearest value.
#[inline]
pub fn byte_from_float(v: f32) -> u8 {
    (v.max(0.0).min(1.0) * 255.0 + 0.5) as u8
}

/// Converts a byte to a unit float.
#[inline]
pub fn float_from_byte(v: u8) -> f32 {
    f32::from(v) / 255.0
}

impl From<Color4B> for Color4F {
    fn from(c: Color4B) -> Self {
        Color4F::new(
            float_from_byte(c.r),
            float_from_byte(c.g),
            float_from_byte(c.b),
            float_from_byte(c.a),
        )
    }
}

impl From<Color4F> for Color4B {
    fn from(c: Color4F) -> Self {
        Color4B::new(
            byte_from_float(c.r),
            byte_from_float(c.g),
            byte_from_float(c.b),
            byte_from_float(c.a),
        )
    }
}

impl From<[f32; 4]> for Color4F {
    fn from(v: [f32; 4]) -> Self {
        Color4F::new(v[0], v[1], v[2], v[3])
    }
}

impl From<[u8; 4]> for Color4B {
    fn from(v: [u8; 4]) -> Self {
        Color4B::new(v[0], v[1], v[2], v[3])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn conversions() {
        for i in 0..=255u8 {
            assert_eq!(byte_from_float(float_from_byte(i)), i);
        }

        let c: Color4B = Color4F::new(1.0, 0.5, 0.0, 2.0).into();
        assert_eq!(c, Color4B::new(255, 128, 0, 255));
    }

    #[test]
    fn premultiplied() {
        let c = Color4F::new(1.0, 0.5, 0.2, 0.5).premultiplied();
        assert_eq!(c, Color4F::new(0.5, 0.25, 0.1, 0.5));
    }
}
