//! Deterministic populators for common shapes.
//!
//! Every generator writes the channels of the vertex content of the mesh it populates. If
//! no content was chosen, locations, normals and texture coordinates are generated.
//! Shapes are drawn as indexed triangles unless noted otherwise.
//!
//! Indices are 16 bits wide. Divisions that would need more than `MAX_INDEXED_VERTICES`
//! vertices are reduced until the shape fits, keeping their ratio, and a warning is
//! logged.

use std::f32::consts::PI;

use crate::math::prelude::*;

use super::font::{BitmapFont, TextAlignment};
use super::mesh::{DrawMode, Mesh};
use super::vertex_array::VertexContent;

/// The most vertices a mesh with 16 bit indices can address.
pub const MAX_INDEXED_VERTICES: usize = 1 << 16;

/// Reduces `divs` until `vertices(divs)` fits 16 bit indices, without going below `min`.
/// The division that is further along, relative to what was asked, gives way first.
fn fit_divisions<F>(
    shape: &str,
    divs: (usize, usize),
    min: (usize, usize),
    vertices: F,
) -> (usize, usize)
where
    F: Fn(usize, usize) -> usize,
{
    let mut fitted = divs;
    while vertices(fitted.0, fitted.1) > MAX_INDEXED_VERTICES {
        let (x, y) = fitted;
        if x > min.0 && (y <= min.1 || x * divs.1 >= y * divs.0) {
            fitted.0 -= 1;
        } else if y > min.1 {
            fitted.1 -= 1;
        } else {
            break;
        }
    }

    if fitted != divs {
        warn!(
            "Reduces the divisions of {} from {:?} to {:?} to fit 16 bit vertex indices.",
            shape, divs, fitted
        );
    }

    fitted
}

/// How the texture of a box is laid out.
///
/// Textures wrap a box as an unfolded cube: the left, front, right and back sides sit
/// side by side in the middle row, with the top above and the bottom below the front.
/// The layout is fixed by the point of the texture where the left, front and bottom
/// sides meet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxTextureLayout {
    /// The corner at `(1/4, 1/3)`, the usual layout of a cube atlas.
    Cube,
    /// Each side gets a share of the texture proportional to its size.
    Uniform,
    /// An explicit corner, as fractions of the texture.
    Corner(Vector2<f32>),
}

impl BoxTextureLayout {
    fn corner(self, dim: Vector3<f32>) -> Vector2<f32> {
        match self {
            BoxTextureLayout::Cube => Vector2::new(0.25, 1.0 / 3.0),
            BoxTextureLayout::Uniform => {
                let w = 2.0 * (dim.x + dim.z);
                let h = dim.y + 2.0 * dim.z;
                Vector2::new(
                    if w > 0.0 { dim.z / w } else { 0.25 },
                    if h > 0.0 { dim.z / h } else { 1.0 / 3.0 },
                )
            }
            BoxTextureLayout::Corner(v) => v,
        }
    }
}

/// Writes vertices and triangles into a mesh, skipping absent channels.
struct Builder<'a> {
    mesh: &'a mut Mesh,
    content: VertexContent,
    next: usize,
    index: usize,
}

impl<'a> Builder<'a> {
    fn new(mesh: &'a mut Mesh, vertices: usize, indices: usize, mode: DrawMode) -> Self {
        debug_assert!(indices == 0 || vertices <= MAX_INDEXED_VERTICES);
        if mesh.vertex_content().is_empty() {
            mesh.set_vertex_content(VertexContent::standard());
        }

        let content = mesh.vertex_content();
        mesh.set_draw_mode(mode);
        mesh.set_vertex_count(vertices);
        mesh.set_vertex_index_count(indices);
        mesh.set_texture_rectangles(TexRect::unit());

        Builder {
            mesh,
            content,
            next: 0,
            index: 0,
        }
    }

    fn vertex(&mut self, p: Point3<f32>, n: Vector3<f32>, uv: Vector2<f32>) -> usize {
        let i = self.next;
        self.next += 1;

        if self.content.contains(VertexContent::LOCATION) {
            self.mesh.set_vertex_location_at(i, p);
        }

        if self.content.contains(VertexContent::NORMAL) {
            self.mesh.set_vertex_normal_at(i, n);
        }

        if self.content.contains(VertexContent::COLOR) {
            self.mesh.set_vertex_color4b_at(i, Color4B::white());
        }

        for unit in 0..self.mesh.texture_unit_count() {
            self.mesh.set_vertex_texcoord_at(i, unit, uv);
        }

        i
    }

    fn index(&mut self, v: usize) {
        self.mesh.set_vertex_index_at(self.index, v);
        self.index += 1;
    }

    fn triangle(&mut self, a: usize, b: usize, c: usize) {
        self.index(a);
        self.index(b);
        self.index(c);
    }

    /// Two triangles over `a b c d` in counter-clockwise order.
    fn quad(&mut self, a: usize, b: usize, c: usize, d: usize) {
        self.triangle(a, b, c);
        self.triangle(a, c, d);
    }

    /// A `(nx, ny)` grid of quads with corners `p(s, t)` for `s, t` in `[0, 1]`. The
    /// texture coordinates map the grid onto `uv`.
    fn grid<F>(&mut self, nx: usize, ny: usize, uv: TexRect, n: Vector3<f32>, p: F)
    where
        F: Fn(f32, f32) -> Point3<f32>,
    {
        let first = self.next;
        for iy in 0..=ny {
            for ix in 0..=nx {
                let s = ix as f32 / nx as f32;
                let t = iy as f32 / ny as f32;
                self.vertex(p(s, t), n, uv.map(Vector2::new(s, t)));
            }
        }

        let at = |ix: usize, iy: usize| first + iy * (nx + 1) + ix;
        for iy in 0..ny {
            for ix in 0..nx {
                self.quad(at(ix, iy), at(ix + 1, iy), at(ix + 1, iy + 1), at(ix, iy + 1));
            }
        }
    }
}

impl Mesh {
    /// A triangle with `divs` subdivisions per edge, `divs²` faces in total. The winding
    /// of `face` is kept.
    pub fn populate_as_triangle(&mut self, face: Face, uvs: [Vector2<f32>; 3], divs: usize) {
        let (d, _) = fit_divisions("triangle", (divs.max(1), 1), (1, 1), |d, _| {
            (d + 1) * (d + 2) / 2
        });
        let vertices = (d + 1) * (d + 2) / 2;
        let mut b = Builder::new(self, vertices, 3 * d * d, DrawMode::Triangles);

        let [p0, p1, p2] = face.vertices;
        let n = face.normal();
        let (e1, e2) = (p1 - p0, p2 - p0);
        let (t1, t2) = (uvs[1] - uvs[0], uvs[2] - uvs[0]);

        let mut rows = Vec::with_capacity(d + 1);
        for j in 0..=d {
            rows.push(b.next);
            for i in 0..=(d - j) {
                let (fi, fj) = (i as f32 / d as f32, j as f32 / d as f32);
                b.vertex(p0 + e1 * fi + e2 * fj, n, uvs[0] + t1 * fi + t2 * fj);
            }
        }

        let at = |i: usize, j: usize| rows[j] + i;
        for j in 0..d {
            for i in 0..(d - j) {
                b.triangle(at(i, j), at(i + 1, j), at(i, j + 1));
                if i + j + 1 < d {
                    b.triangle(at(i + 1, j), at(i + 1, j + 1), at(i, j + 1));
                }
            }
        }
    }

    /// A rectangle in the X-Y plane facing +Z, centered on the origin.
    pub fn populate_as_centered_rectangle(&mut self, size: Vector2<f32>, divs: (usize, usize)) {
        self.populate_as_rectangle(size, Vector2::new(0.5, 0.5), divs);
    }

    /// A rectangle in the X-Y plane facing +Z, split into a `divs` grid of quads.
    /// `origin` is the point of the rectangle, as fractions of its size, that lies at
    /// the origin of the mesh.
    pub fn populate_as_rectangle(
        &mut self,
        size: Vector2<f32>,
        origin: Vector2<f32>,
        divs: (usize, usize),
    ) {
        let divs = (divs.0.max(1), divs.1.max(1));
        let (nx, ny) = fit_divisions("rectangle", divs, (1, 1), |x, y| (x + 1) * (y + 1));
        let mut b = Builder::new(
            self,
            (nx + 1) * (ny + 1),
            6 * nx * ny,
            DrawMode::Triangles,
        );

        b.grid(nx, ny, TexRect::unit(), Vector3::unit_z(), |s, t| {
            Point3::new((s - origin.x) * size.x, (t - origin.y) * size.y, 0.0)
        });
    }

    /// A disk in the X-Y plane facing +Z, with `divs.0` rings and `divs.1` sectors. The
    /// innermost ring is made of single triangles and the others of quads, giving
    /// `(2 * rings - 1) * sectors` faces.
    pub fn populate_as_disk(&mut self, radius: f32, divs: (usize, usize)) {
        let divs = (divs.0.max(1), divs.1.max(3));
        let (rings, sectors) = fit_divisions("disk", divs, (1, 3), |r, k| 1 + r * k);
        let faces = (2 * rings - 1) * sectors;
        let mut b = Builder::new(self, 1 + rings * sectors, 3 * faces, DrawMode::Triangles);

        let n = Vector3::unit_z();
        let uv = |x: f32, y: f32| Vector2::new(0.5 + x / (2.0 * radius), 0.5 + y / (2.0 * radius));

        let center = b.vertex(Point3::new(0.0, 0.0, 0.0), n, Vector2::new(0.5, 0.5));
        let first = b.next;
        for r in 1..=rings {
            let rho = radius * r as f32 / rings as f32;
            for k in 0..sectors {
                let theta = 2.0 * PI * k as f32 / sectors as f32;
                let (x, y) = (rho * theta.cos(), rho * theta.sin());
                b.vertex(Point3::new(x, y, 0.0), n, uv(x, y));
            }
        }

        let at = |r: usize, k: usize| first + (r - 1) * sectors + (k % sectors);
        for k in 0..sectors {
            b.triangle(center, at(1, k), at(1, k + 1));
        }

        for r in 1..rings {
            for k in 0..sectors {
                b.quad(at(r, k), at(r + 1, k), at(r + 1, k + 1), at(r, k + 1));
            }
        }
    }

    /// A solid box filling `bounds`, textured as an unfolded cube.
    pub fn populate_as_solid_box(&mut self, bounds: Aabb3, layout: BoxTextureLayout) {
        let mut b = Builder::new(self, 24, 36, DrawMode::Triangles);

        let (lo, hi) = (bounds.min, bounds.max);
        let corner = |x: bool, y: bool, z: bool| {
            Point3::new(
                if x { hi.x } else { lo.x },
                if y { hi.y } else { lo.y },
                if z { hi.z } else { lo.z },
            )
        };

        let c = layout.corner(bounds.dim());
        let (s1, s2, s3) = (c.x, 0.5, 0.5 + c.x);
        let (t1, t2) = (c.y, 1.0 - c.y);

        // Corners of each side counter-clockwise from its lower left, as seen from outside.
        let sides = [
            // Front
            (
                Vector3::unit_z(),
                [(false, false, true), (true, false, true), (true, true, true), (false, true, true)],
                TexRect::new(s1, t1, s2 - s1, t2 - t1),
            ),
            // Right
            (
                Vector3::unit_x(),
                [(true, false, true), (true, false, false), (true, true, false), (true, true, true)],
                TexRect::new(s2, t1, s3 - s2, t2 - t1),
            ),
            // Back
            (
                -Vector3::unit_z(),
                [(true, false, false), (false, false, false), (false, true, false), (true, true, false)],
                TexRect::new(s3, t1, 1.0 - s3, t2 - t1),
            ),
            // Left
            (
                -Vector3::unit_x(),
                [(false, false, false), (false, false, true), (false, true, true), (false, true, false)],
                TexRect::new(0.0, t1, s1, t2 - t1),
            ),
            // Top
            (
                Vector3::unit_y(),
                [(false, true, true), (true, true, true), (true, true, false), (false, true, false)],
                TexRect::new(s1, t2, s2 - s1, 1.0 - t2),
            ),
            // Bottom
            (
                -Vector3::unit_y(),
                [(false, false, false), (true, false, false), (true, false, true), (false, false, true)],
                TexRect::new(s1, 0.0, s2 - s1, t1),
            ),
        ];

        let uvs = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        for &(n, ref corners, rect) in &sides {
            let mut v = [0; 4];
            for k in 0..4 {
                let (x, y, z) = corners[k];
                let uv = rect.map(Vector2::new(uvs[k].0, uvs[k].1));
                v[k] = b.vertex(corner(x, y, z), n, uv);
            }

            b.quad(v[0], v[1], v[2], v[3]);
        }
    }

    /// A solid box textured with a cube atlas.
    pub fn populate_as_cube_mapped_solid_box(&mut self, bounds: Aabb3) {
        self.populate_as_solid_box(bounds, BoxTextureLayout::Cube);
    }

    /// The twelve edges of `bounds`, drawn as lines.
    pub fn populate_as_wire_box(&mut self, bounds: Aabb3) {
        let mut b = Builder::new(self, 8, 24, DrawMode::Lines);
        for (i, p) in bounds.to_corners().iter().enumerate() {
            debug_assert_eq!(i, b.next);
            b.vertex(*p, Vector3::zero(), Vector2::zero());
        }

        // Corners are ordered with x varying fastest, then y, then z.
        let edges = [
            (0, 1), (2, 3), (4, 5), (6, 7),
            (0, 2), (1, 3), (4, 6), (5, 7),
            (0, 4), (1, 5), (2, 6), (3, 7),
        ];

        for &(a, c) in &edges {
            b.index(a);
            b.index(c);
        }
    }

    /// A sphere centered on the origin with poles on the Y axis. `divs.0` divides the
    /// equator and `divs.1` the meridians. The caps are single triangles and the other
    /// bands are quads.
    ///
    /// The texture wraps with a cylindrical projection starting on the -Z axis, so its
    /// center faces +Z.
    pub fn populate_as_sphere(&mut self, radius: f32, divs: (usize, usize)) {
        let divs = (divs.0.max(3), divs.1.max(2));
        let (nx, ny) = fit_divisions("sphere", divs, (3, 2), |x, y| (x + 1) * (y + 1));
        let faces = 2 * nx + 2 * nx * (ny - 2);
        let mut b = Builder::new(self, (nx + 1) * (ny + 1), 3 * faces, DrawMode::Triangles);

        let first = b.next;
        for j in 0..=ny {
            let phi = PI * j as f32 / ny as f32;
            let (y, rho) = (phi.cos(), phi.sin());
            for i in 0..=nx {
                let theta = 2.0 * PI * i as f32 / nx as f32;
                let n = Vector3::new(-rho * theta.sin(), y, -rho * theta.cos());
                let uv = Vector2::new(i as f32 / nx as f32, 1.0 - j as f32 / ny as f32);
                b.vertex(Point3::from_vec(n * radius), n, uv);
            }
        }

        let at = |i: usize, j: usize| first + j * (nx + 1) + i;
        for j in 0..ny {
            for i in 0..nx {
                let (ul, ur) = (at(i, j), at(i + 1, j));
                let (ll, lr) = (at(i, j + 1), at(i + 1, j + 1));
                if j == 0 {
                    b.triangle(ll, lr, ul);
                } else if j == ny - 1 {
                    b.triangle(ll, ur, ul);
                } else {
                    b.quad(ll, lr, ur, ul);
                }
            }
        }
    }

    /// An open cone whose base is centered on the origin of the X-Z plane, with its apex
    /// at `height` on +Y. `divs.0` divides the base and `divs.1` the height. The
    /// texture wraps horizontally starting on the -Z axis.
    pub fn populate_as_hollow_cone(&mut self, radius: f32, height: f32, divs: (usize, usize)) {
        let divs = (divs.0.max(3), divs.1.max(1));
        let (na, nh) = fit_divisions("cone", divs, (3, 1), |a, h| (a + 1) * (h + 1));
        let faces = na * (2 * nh - 1);
        let mut b = Builder::new(self, (na + 1) * (nh + 1), 3 * faces, DrawMode::Triangles);

        let slant = (radius * radius + height * height).sqrt();
        let first = b.next;
        for k in 0..=nh {
            let f = k as f32 / nh as f32;
            let (rho, y) = (radius * (1.0 - f), height * f);
            for i in 0..=na {
                let theta = 2.0 * PI * i as f32 / na as f32;
                let (dx, dz) = (-theta.sin(), -theta.cos());
                let p = Point3::new(rho * dx, y, rho * dz);
                let n = if slant > 0.0 {
                    Vector3::new(dx * height, radius, dz * height) / slant
                } else {
                    Vector3::unit_y()
                };

                b.vertex(p, n, Vector2::new(i as f32 / na as f32, f));
            }
        }

        let at = |i: usize, k: usize| first + k * (na + 1) + i;
        for k in 0..nh {
            for i in 0..na {
                let (ll, lr) = (at(i, k), at(i + 1, k));
                let (ul, ur) = (at(i, k + 1), at(i + 1, k + 1));
                if k == nh - 1 {
                    b.triangle(ll, lr, ul);
                } else {
                    b.quad(ll, lr, ur, ul);
                }
            }
        }
    }

    /// A strip of `points.len() - 1` connected lines.
    pub fn populate_as_line_strip(&mut self, points: &[Point3<f32>]) {
        if self.vertex_content().is_empty() {
            self.set_vertex_content(VertexContent::standard());
        }

        self.set_draw_mode(DrawMode::LineStrip);
        self.set_vertex_index_count(0);
        self.set_vertex_count(points.len());
        for (i, p) in points.iter().enumerate() {
            self.set_vertex_location_at(i, *p);
        }
    }

    /// One rectangle per visible glyph of `text`, laid out with `font` and facing +Z.
    ///
    /// A `line_height` of zero keeps the pixel size of the font. `origin` is the point of
    /// the laid out text, as fractions of its size, that lies at the origin of the mesh.
    /// Each glyph is split into a `divs` grid of quads. Characters missing from the font
    /// are skipped. Glyphs that do not fit 16 bit indices, even undivided, are dropped
    /// from the end.
    pub fn populate_as_bitmap_font_label(
        &mut self,
        text: &str,
        font: &BitmapFont,
        line_height: f32,
        alignment: TextAlignment,
        origin: Vector2<f32>,
        divs: (usize, usize),
    ) {
        let divs = (divs.0.max(1), divs.1.max(1));
        let font_line = font.line_height() as f32;
        let scale = if line_height > 0.0 { line_height / font_line } else { 1.0 };
        let (aw, ah) = font.atlas_size();
        let (aw, ah) = (aw as f32, ah as f32);

        let lines: Vec<&str> = text.split('\n').collect();
        let widths: Vec<i32> = lines.iter().map(|v| font.line_width(v)).collect();
        let max_width = widths.iter().cloned().max().unwrap_or(0) as f32;
        let total_height = lines.len() as f32 * font_line;

        let glyphs = lines
            .iter()
            .flat_map(|v| v.chars())
            .filter_map(|c| font.glyph(c))
            .filter(|g| g.width > 0 && g.height > 0)
            .count();

        let (nx, ny) = fit_divisions("label", divs, (1, 1), |x, y| glyphs * (x + 1) * (y + 1));
        let per_glyph = (nx + 1) * (ny + 1);
        let glyphs = if glyphs * per_glyph > MAX_INDEXED_VERTICES {
            let fitted = MAX_INDEXED_VERTICES / per_glyph;
            warn!("Drops {} glyphs of a label to fit 16 bit vertex indices.", glyphs - fitted);
            fitted
        } else {
            glyphs
        };

        let mut remaining = glyphs;
        let mut b = Builder::new(
            self,
            glyphs * per_glyph,
            glyphs * 6 * nx * ny,
            DrawMode::Triangles,
        );

        let offset = Vector2::new(max_width * origin.x, total_height * origin.y);
        for (l, line) in lines.iter().enumerate() {
            let mut x = (max_width - widths[l] as f32) * alignment.factor();
            let top = total_height - l as f32 * font_line;

            let mut prev = None;
            for c in line.chars() {
                if let Some(p) = prev {
                    x += font.kerning(p, c) as f32;
                }
                prev = Some(c);

                let g = match font.glyph(c) {
                    Some(g) => *g,
                    None => {
                        debug!("Font {} has no glyph for {:?}.", font.face(), c);
                        continue;
                    }
                };

                if g.width > 0 && g.height > 0 && remaining > 0 {
                    remaining -= 1;
                    let x0 = x + g.x_offset as f32 - offset.x;
                    let y1 = top - g.y_offset as f32 - offset.y;
                    let (w, h) = (g.width as f32, g.height as f32);

                    // Atlas rows are stored top first.
                    let uv = TexRect::new(g.x as f32 / aw, (g.y as f32 + h) / ah, w / aw, -h / ah);
                    b.grid(nx, ny, uv, Vector3::unit_z(), |s, t| {
                        Point3::new((x0 + s * w) * scale, (y1 - h + t * h) * scale, 0.0)
                    });
                }

                x += g.x_advance as f32;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::font::SAMPLE;

    #[test]
    fn triangle() {
        let face = Face::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        );

        let uvs = [Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0)];
        let mut mesh = Mesh::default();
        mesh.populate_as_triangle(face, uvs, 3);
        assert_eq!(mesh.vertex_content(), VertexContent::standard());
        assert_eq!(mesh.face_count(), 9);
        assert_eq!(mesh.vertex_count(), 10);
        for f in 0..9 {
            assert_ulps_eq!(mesh.face_normal_at(f), Vector3::unit_z());
        }
    }

    #[test]
    fn rectangle_origin() {
        let mut mesh = Mesh::default();
        mesh.populate_as_rectangle(Vector2::new(4.0, 2.0), Vector2::new(0.0, 1.0), (2, 3));
        assert_eq!(mesh.face_count(), 12);

        let aabb = mesh.bounding_box().unwrap();
        assert_eq!(aabb.min, Point3::new(0.0, -2.0, 0.0));
        assert_eq!(aabb.max, Point3::new(4.0, 0.0, 0.0));
        assert_eq!(mesh.vertex_texcoord_at(0, 0), Vector2::new(0.0, 0.0));
    }

    #[test]
    fn keeps_chosen_content() {
        let mut mesh = Mesh::default();
        mesh.set_vertex_content(VertexContent::LOCATION | VertexContent::COLOR);
        mesh.populate_as_centered_rectangle(Vector2::new(1.0, 1.0), (1, 1));
        assert!(mesh.normals().is_none());
        assert_eq!(mesh.vertex_color4b_at(3), Color4B::white());
    }

    #[test]
    fn disk() {
        let mut mesh = Mesh::default();
        mesh.populate_as_disk(1.0, (4, 3));
        assert_eq!(mesh.face_count(), 3 * (2 * 4 - 1));
        for f in 0..mesh.face_count() {
            assert_ulps_eq!(mesh.face_normal_at(f), Vector3::unit_z());
        }
    }

    #[test]
    fn solid_box() {
        let bounds = Aabb3::new(Point3::new(-1.0, -2.0, -3.0), Point3::new(1.0, 2.0, 3.0));
        let mut mesh = Mesh::default();
        mesh.populate_as_solid_box(bounds, BoxTextureLayout::Uniform);
        assert_eq!(mesh.bounding_box().unwrap(), bounds);
        assert_eq!(mesh.face_count(), 12);

        for f in 0..12 {
            let n = mesh.face_normal_at(f);
            let c = mesh.face_center_at(f).to_vec();
            assert!(n.dot(c) > 0.0);
        }
    }

    #[test]
    fn cube_mapped_box() {
        let bounds = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let mut mesh = Mesh::default();
        mesh.populate_as_cube_mapped_solid_box(bounds);

        // Lower left corner of the front side.
        assert_eq!(mesh.vertex_texcoord_at(0, 0), Vector2::new(0.25, 1.0 / 3.0));
    }

    #[test]
    fn sphere() {
        let mut mesh = Mesh::default();
        mesh.populate_as_sphere(2.0, (4, 2));
        assert_eq!(mesh.face_count(), 8);

        mesh.populate_as_sphere(2.0, (12, 8));
        assert_eq!(mesh.face_count(), 2 * 12 + 2 * 12 * 6);
        for f in 0..mesh.face_count() {
            let n = mesh.face_normal_at(f);
            let c = mesh.face_center_at(f).to_vec();
            assert!(n.dot(c) > 0.0, "face {} points inwards", f);
        }

        let aabb = mesh.bounding_box().unwrap();
        assert_ulps_eq!(aabb.max.y, 2.0);
        assert_ulps_eq!(aabb.min.y, -2.0);
    }

    #[test]
    fn hollow_cone() {
        let mut mesh = Mesh::default();
        mesh.populate_as_hollow_cone(1.0, 2.0, (4, 2));
        assert_eq!(mesh.face_count(), 4 * 3);
        for f in 0..mesh.face_count() {
            let n = mesh.face_normal_at(f);
            let c = mesh.face_center_at(f);
            assert!(n.dot(Vector3::new(c.x, 0.0, c.z)) > 0.0);
        }
    }

    #[test]
    fn line_strip() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];

        let mut mesh = Mesh::default();
        mesh.populate_as_line_strip(&points);
        assert_eq!(mesh.vertex_content(), VertexContent::standard());
        assert_eq!(mesh.draw_mode(), DrawMode::LineStrip);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.vertex_location_at(2), points[2]);
    }

    #[test]
    fn wire_box() {
        let bounds = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0));
        let mut mesh = Mesh::default();
        mesh.populate_as_wire_box(bounds);
        assert_eq!(mesh.vertex_content(), VertexContent::standard());
        assert_eq!(mesh.draw_mode(), DrawMode::Lines);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 12);
        assert_eq!(mesh.bounding_box().unwrap(), bounds);
    }

    #[test]
    fn divisions_fit_16_bit_indices() {
        let mut mesh = Mesh::default();
        mesh.populate_as_rectangle(Vector2::new(1.0, 1.0), Vector2::new(0.0, 0.0), (300, 300));
        assert_eq!(mesh.vertex_count(), MAX_INDEXED_VERTICES);
        assert_eq!(mesh.face_count(), 2 * 255 * 255);

        mesh.populate_as_sphere(1.0, (400, 200));
        assert!(mesh.vertex_count() <= MAX_INDEXED_VERTICES);
        assert!(mesh.face_count() > 2 * 200 * 100);
        for i in 0..mesh.vertex_index_count() {
            assert!(mesh.vertex_index_at(i) < mesh.vertex_count());
        }

        let aabb = mesh.bounding_box().unwrap();
        assert_ulps_eq!(aabb.min.y, -1.0);
        assert_ulps_eq!(aabb.max.y, 1.0);

        mesh.populate_as_disk(1.0, (1000, 1000));
        assert!(mesh.vertex_count() <= MAX_INDEXED_VERTICES);
        mesh.populate_as_hollow_cone(1.0, 1.0, (3, 100_000));
        assert!(mesh.vertex_count() <= MAX_INDEXED_VERTICES);
        mesh.populate_as_triangle(
            Face::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ),
            [Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0)],
            1000,
        );
        assert!(mesh.vertex_count() <= MAX_INDEXED_VERTICES);
    }

    #[test]
    fn long_label_drops_trailing_glyphs() {
        let font = BitmapFont::parse(SAMPLE).unwrap();
        let text: String = ::std::iter::repeat('A').take(20_000).collect();
        let mut mesh = Mesh::default();
        mesh.populate_as_bitmap_font_label(
            &text,
            &font,
            0.0,
            TextAlignment::Left,
            Vector2::new(0.0, 0.0),
            (4, 4),
        );

        assert_eq!(mesh.vertex_count(), MAX_INDEXED_VERTICES);
        assert_eq!(mesh.face_count(), 2 * MAX_INDEXED_VERTICES / 4);
    }

    #[test]
    fn bitmap_font_label() {
        let font = BitmapFont::parse(SAMPLE).unwrap();
        let mut mesh = Mesh::default();
        mesh.populate_as_bitmap_font_label(
            "AB A\nB?",
            &font,
            0.0,
            TextAlignment::Left,
            Vector2::new(0.0, 0.0),
            (1, 1),
        );

        // Spaces and unknown characters produce no rectangles.
        assert_eq!(mesh.vertex_count(), 4 * 4);
        assert_eq!(mesh.face_count(), 4 * 2);

        let aabb = mesh.bounding_box().unwrap();
        assert_eq!(aabb.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.max.y, 40.0 - 4.0);

        // The first glyph samples the top left of the atlas.
        assert_eq!(mesh.vertex_texcoord_at(2, 0), Vector2::new(0.0, 0.0));
        assert_eq!(mesh.vertex_texcoord_at(1, 0), Vector2::new(10.0 / 128.0, 16.0 / 64.0));

        mesh.populate_as_bitmap_font_label(
            "A",
            &font,
            2.0,
            TextAlignment::Center,
            Vector2::new(0.5, 0.5),
            (2, 2),
        );
        assert_eq!(mesh.vertex_count(), 9);
        assert_eq!(mesh.face_count(), 8);
        let aabb = mesh.bounding_box().unwrap();
        assert_ulps_eq!(aabb.min.x, -0.5);
        assert_ulps_eq!(aabb.max.x, 0.5);
    }
}
