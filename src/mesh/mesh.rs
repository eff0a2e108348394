//! Meshes: a set of vertex arrays sharing one vertex count, plus optional indices.

use std::cell::RefCell;

use bincode;

use crate::errors::*;
use crate::gles::consts::*;
use crate::gles::engine::GLEngine;
use crate::identity::{Identifiable, Identity};
use crate::materials::texture::Texture;
use crate::math::prelude::*;

use super::vertex_array::{Component, VertexArray, VertexContent};

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawMode {
    Triangles,
    TriangleStrip,
    TriangleFan,
    Lines,
    LineStrip,
    Points,
}

impl DrawMode {
    pub fn to_gl(self) -> GLenum {
        match self {
            DrawMode::Triangles => TRIANGLES,
            DrawMode::TriangleStrip => TRIANGLE_STRIP,
            DrawMode::TriangleFan => TRIANGLE_FAN,
            DrawMode::Lines => LINES,
            DrawMode::LineStrip => LINE_STRIP,
            DrawMode::Points => POINTS,
        }
    }

    /// The number of primitives drawn from `n` elements.
    pub fn primitive_count(self, n: usize) -> usize {
        match self {
            DrawMode::Triangles => n / 3,
            DrawMode::TriangleStrip | DrawMode::TriangleFan => n.saturating_sub(2),
            DrawMode::Lines => n / 2,
            DrawMode::LineStrip => n.saturating_sub(1),
            DrawMode::Points => n,
        }
    }

    /// The first element drawn for face `f`.
    pub fn first_element_of_face(self, f: usize) -> usize {
        match self {
            DrawMode::Triangles => 3 * f,
            DrawMode::TriangleStrip | DrawMode::LineStrip | DrawMode::Points => f,
            DrawMode::TriangleFan => f + 1,
            DrawMode::Lines => 2 * f,
        }
    }
}

/// The texture coordinates of one texture unit.
///
/// Coordinates are kept mapped into the effective rectangle of the unit, which is the
/// texture rectangle scaled by the coverage of the texture in its POT storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TexCoords {
    array: VertexArray<f32>,
    rect: TexRect,
    coverage: Vector2<f32>,
    is_flipped_vertically: bool,
}

impl TexCoords {
    fn new(len: usize) -> Self {
        let mut array = VertexArray::new(TEXTURE_COORD_ARRAY, 2);
        array.set_len(len);
        TexCoords {
            array,
            rect: TexRect::unit(),
            coverage: Vector2::new(1.0, 1.0),
            is_flipped_vertically: true,
        }
    }

    #[inline]
    pub fn array(&self) -> &VertexArray<f32> {
        &self.array
    }

    #[inline]
    pub fn array_mut(&mut self) -> &mut VertexArray<f32> {
        &mut self.array
    }

    /// The sub-rectangle of the texture the coordinates sample.
    #[inline]
    pub fn rect(&self) -> TexRect {
        self.rect
    }

    #[inline]
    pub fn coverage(&self) -> Vector2<f32> {
        self.coverage
    }

    /// The rectangle the coordinates are actually mapped into.
    pub fn effective_rect(&self) -> TexRect {
        TexRect::new(
            self.rect.origin.x * self.coverage.x,
            self.rect.origin.y * self.coverage.y,
            self.rect.size.x * self.coverage.x,
            self.rect.size.y * self.coverage.y,
        )
    }

    /// Whether the coordinates expect a texture whose rows are stored top first.
    #[inline]
    pub fn is_flipped_vertically(&self) -> bool {
        self.is_flipped_vertically
    }

    fn remap<F>(&mut self, f: F)
    where
        F: Fn(Vector2<f32>) -> Vector2<f32>,
    {
        for uv in self.array.data_mut().chunks_mut(2) {
            let v = f(Vector2::new(uv[0], uv[1]));
            uv[0] = v.x;
            uv[1] = v.y;
        }
    }

    fn remap_between(&mut self, from: TexRect, to: TexRect) {
        if from != to {
            self.remap(|uv| to.map(from.unmap(uv)));
        }
    }

    pub fn set_rect(&mut self, rect: TexRect) {
        let from = self.effective_rect();
        self.rect = rect;
        let to = self.effective_rect();
        self.remap_between(from, to);
    }

    pub fn set_coverage(&mut self, coverage: Vector2<f32>) {
        let from = self.effective_rect();
        self.coverage = coverage;
        let to = self.effective_rect();
        self.remap_between(from, to);
    }

    /// Folds the coverage and row order of `texture` into the coordinates.
    pub fn align_with_texture(&mut self, texture: &Texture) {
        self.set_coverage(texture.coverage());
        if texture.is_flipped_vertically() != self.is_flipped_vertically {
            self.flip_vertically();
            self.is_flipped_vertically = texture.is_flipped_vertically();
        }
    }

    /// Mirrors the coordinates inside the effective rectangle along the vertical axis.
    pub fn flip_vertically(&mut self) {
        let r = self.effective_rect();
        let sum = 2.0 * r.origin.y + r.size.y;
        self.remap(|uv| Vector2::new(uv.x, sum - uv.y));
    }

    pub fn flip_horizontally(&mut self) {
        let r = self.effective_rect();
        let sum = 2.0 * r.origin.x + r.size.x;
        self.remap(|uv| Vector2::new(sum - uv.x, uv.y));
    }

    /// Scales the coordinates so the texture repeats `n` times in each direction. The
    /// texture must use a repeating wrap mode.
    pub fn repeat(&mut self, n: Vector2<f32>) {
        let r = self.effective_rect();
        self.remap(|uv| {
            Vector2::new(
                r.origin.x + (uv.x - r.origin.x) * n.x,
                r.origin.y + (uv.y - r.origin.y) * n.y,
            )
        });
    }
}

/// A mesh.
///
/// Every attribute array holds exactly `vertex_count` elements. The client copy of an
/// array can be released once it is buffered, after which reading it panics.
#[derive(Debug, Serialize, Deserialize)]
pub struct Mesh {
    #[serde(skip)]
    identity: Identity,
    draw_mode: DrawMode,
    content: VertexContent,
    vertex_count: usize,
    vertex_unit_count: usize,
    locations: Option<VertexArray<f32>>,
    normals: Option<VertexArray<f32>>,
    colors: Option<VertexArray<u8>>,
    texcoords: Vec<TexCoords>,
    indices: Option<VertexArray<u16>>,
    matrix_indices: Option<VertexArray<u8>>,
    weights: Option<VertexArray<f32>>,
    should_cache_faces: bool,
    #[serde(skip)]
    faces: RefCell<Option<Vec<Face>>>,
}

impl Identifiable for Mesh {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Mesh::new(None::<&str>)
    }
}

impl Clone for Mesh {
    fn clone(&self) -> Self {
        Mesh {
            identity: self.identity.copy(),
            draw_mode: self.draw_mode,
            content: self.content,
            vertex_count: self.vertex_count,
            vertex_unit_count: self.vertex_unit_count,
            locations: self.locations.clone(),
            normals: self.normals.clone(),
            colors: self.colors.clone(),
            texcoords: self.texcoords.clone(),
            indices: self.indices.clone(),
            matrix_indices: self.matrix_indices.clone(),
            weights: self.weights.clone(),
            should_cache_faces: self.should_cache_faces,
            faces: RefCell::new(None),
        }
    }
}

macro_rules! array_or_panic {
    ($self:ident, $field:ident, $what:expr) => {
        match $self.$field {
            Some(ref v) => v,
            None => panic!("Mesh {} has no {}.", $self.describe(), $what),
        }
    };
}

macro_rules! array_mut_or_panic {
    ($self:ident, $field:ident, $what:expr) => {{
        if $self.$field.is_none() {
            panic!("Mesh {} has no {}.", $self.describe(), $what);
        }

        match $self.$field {
            Some(ref mut v) => v,
            None => unreachable!(),
        }
    }};
}

impl Mesh {
    pub fn new<T: AsRef<str>>(name: Option<T>) -> Self {
        Mesh {
            identity: Identity::new(name),
            draw_mode: DrawMode::Triangles,
            content: VertexContent::empty(),
            vertex_count: 0,
            vertex_unit_count: 0,
            locations: None,
            normals: None,
            colors: None,
            texcoords: Vec::new(),
            indices: None,
            matrix_indices: None,
            weights: None,
            should_cache_faces: false,
            faces: RefCell::new(None),
        }
    }

    /// Reads a mesh written by `to_bytes`.
    pub fn from_bytes<T: AsRef<str>>(name: Option<T>, bytes: &[u8]) -> Result<Self> {
        let mut mesh: Mesh = bincode::deserialize(bytes)?;
        mesh.identity = Identity::new(name);
        Ok(mesh)
    }

    /// Serializes the client copy of every array. Fails if any array was released.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if !self.is_retained() {
            bail!("Mesh {} has released vertex data.", self.describe());
        }

        Ok(bincode::serialize(self)?)
    }

    fn is_retained(&self) -> bool {
        fn ok<T: Component>(v: &Option<VertexArray<T>>) -> bool {
            v.as_ref().map(|v| v.is_retained()).unwrap_or(true)
        }

        ok(&self.locations)
            && ok(&self.normals)
            && ok(&self.colors)
            && ok(&self.indices)
            && ok(&self.matrix_indices)
            && ok(&self.weights)
            && self.texcoords.iter().all(|v| v.array.is_retained())
    }

    #[inline]
    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    #[inline]
    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        self.draw_mode = mode;
        self.invalidate_faces();
    }

    #[inline]
    pub fn vertex_content(&self) -> VertexContent {
        self.content
    }

    #[inline]
    pub fn has_vertex_content(&self, content: VertexContent) -> bool {
        self.content.contains(content)
    }

    /// Creates the arrays of `content` and drops the others.
    pub fn set_vertex_content(&mut self, content: VertexContent) {
        let n = self.vertex_count;
        let units = self.vertex_unit_count.max(1);

        fn ensure<T: Component>(
            slot: &mut Option<VertexArray<T>>,
            enabled: bool,
            semantic: GLenum,
            components: usize,
            n: usize,
        ) {
            if !enabled {
                *slot = None;
                return;
            }

            let keep = slot.as_ref().map(|v| v.components() == components).unwrap_or(false);
            if !keep {
                let mut v = VertexArray::new(semantic, components);
                v.set_len(n);
                *slot = Some(v);
            }
        }

        ensure(&mut self.locations, content.contains(VertexContent::LOCATION), VERTEX_ARRAY, 3, n);
        ensure(&mut self.normals, content.contains(VertexContent::NORMAL), NORMAL_ARRAY, 3, n);
        ensure(&mut self.colors, content.contains(VertexContent::COLOR), COLOR_ARRAY, 4, n);
        ensure(
            &mut self.matrix_indices,
            content.contains(VertexContent::MATRIX_INDICES),
            MATRIX_INDEX_ARRAY_OES,
            units,
            n,
        );
        ensure(
            &mut self.weights,
            content.contains(VertexContent::WEIGHTS),
            WEIGHT_ARRAY_OES,
            units,
            n,
        );

        if content.contains(VertexContent::TEXCOORD) {
            if self.texcoords.is_empty() {
                self.texcoords.push(TexCoords::new(n));
            }
        } else {
            self.texcoords.clear();
        }

        if content.intersects(VertexContent::MATRIX_INDICES | VertexContent::WEIGHTS) {
            self.vertex_unit_count = units;
        }

        self.content = content;
        self.invalidate_faces();
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Resizes every attribute array.
    pub fn set_vertex_count(&mut self, n: usize) {
        self.vertex_count = n;
        if let Some(ref mut v) = self.locations {
            v.set_len(n);
        }
        if let Some(ref mut v) = self.normals {
            v.set_len(n);
        }
        if let Some(ref mut v) = self.colors {
            v.set_len(n);
        }
        if let Some(ref mut v) = self.matrix_indices {
            v.set_len(n);
        }
        if let Some(ref mut v) = self.weights {
            v.set_len(n);
        }
        for v in &mut self.texcoords {
            v.array.set_len(n);
        }

        self.invalidate_faces();
    }

    // Indices.

    #[inline]
    pub fn has_indices(&self) -> bool {
        self.indices.is_some()
    }

    pub fn vertex_index_count(&self) -> usize {
        self.indices.as_ref().map(|v| v.len()).unwrap_or(0)
    }

    /// Allocates `n` indices, or drops the indices if `n` is zero.
    pub fn set_vertex_index_count(&mut self, n: usize) {
        if n == 0 {
            self.indices = None;
        } else {
            let indices = self
                .indices
                .get_or_insert_with(|| VertexArray::new(ELEMENT_ARRAY_BUFFER, 1));
            indices.set_len(n);
        }

        self.invalidate_faces();
    }

    pub fn vertex_index_at(&self, i: usize) -> usize {
        array_or_panic!(self, indices, "indices").element(i)[0] as usize
    }

    pub fn set_vertex_index_at(&mut self, i: usize, v: usize) {
        assert!(
            v <= ::std::u16::MAX as usize,
            "Vertex index {} does not fit 16 bit indices.",
            v
        );
        array_mut_or_panic!(self, indices, "indices").set_element(i, &[v as u16]);
        self.invalidate_faces();
    }

    /// The number of elements drawn, indices if the mesh has any.
    pub fn element_count(&self) -> usize {
        match self.indices {
            Some(ref v) => v.len(),
            None => self.vertex_count,
        }
    }

    // Locations.

    pub fn vertex_location_at(&self, i: usize) -> Point3<f32> {
        let v = array_or_panic!(self, locations, "locations").element(i);
        Point3::new(v[0], v[1], v[2])
    }

    pub fn set_vertex_location_at(&mut self, i: usize, p: Point3<f32>) {
        array_mut_or_panic!(self, locations, "locations").set_element(i, &[p.x, p.y, p.z]);
        self.invalidate_faces();
    }

    /// The location with a `w` of one.
    pub fn vertex_homogeneous_location_at(&self, i: usize) -> Vector4<f32> {
        self.vertex_location_at(i).to_homogeneous()
    }

    /// Sets the location from homogeneous coordinates, dividing by `w`.
    pub fn set_vertex_homogeneous_location_at(&mut self, i: usize, v: Vector4<f32>) {
        let w = if v.w != 0.0 { v.w } else { 1.0 };
        self.set_vertex_location_at(i, Point3::new(v.x / w, v.y / w, v.z / w));
    }

    // Normals.

    pub fn vertex_normal_at(&self, i: usize) -> Vector3<f32> {
        let v = array_or_panic!(self, normals, "normals").element(i);
        Vector3::new(v[0], v[1], v[2])
    }

    pub fn set_vertex_normal_at(&mut self, i: usize, n: Vector3<f32>) {
        array_mut_or_panic!(self, normals, "normals").set_element(i, &[n.x, n.y, n.z]);
    }

    // Colors.

    pub fn vertex_color4b_at(&self, i: usize) -> Color4B {
        let v = array_or_panic!(self, colors, "colors").element(i);
        Color4B::new(v[0], v[1], v[2], v[3])
    }

    pub fn set_vertex_color4b_at(&mut self, i: usize, c: Color4B) {
        array_mut_or_panic!(self, colors, "colors").set_element(i, &c.rgba());
    }

    pub fn vertex_color4f_at(&self, i: usize) -> Color4F {
        self.vertex_color4b_at(i).into()
    }

    pub fn set_vertex_color4f_at(&mut self, i: usize, c: Color4F) {
        self.set_vertex_color4b_at(i, c.into());
    }

    // Texture coordinates.

    #[inline]
    pub fn texture_unit_count(&self) -> usize {
        self.texcoords.len()
    }

    /// Adds the coordinates of another texture unit, copied from the last unit.
    pub fn add_texture_unit(&mut self) {
        let v = match self.texcoords.last() {
            Some(v) => v.clone(),
            None => TexCoords::new(self.vertex_count),
        };

        self.texcoords.push(v);
        self.content |= VertexContent::TEXCOORD;
    }

    pub fn texcoords(&self, unit: usize) -> Option<&TexCoords> {
        self.texcoords.get(unit)
    }

    pub fn texcoords_mut(&mut self, unit: usize) -> Option<&mut TexCoords> {
        self.texcoords.get_mut(unit)
    }

    fn texcoords_or_panic(&self, unit: usize) -> &TexCoords {
        match self.texcoords.get(unit) {
            Some(v) => v,
            None => panic!("Mesh {} has no texture unit {}.", self.describe(), unit),
        }
    }

    fn texcoords_mut_or_panic(&mut self, unit: usize) -> &mut TexCoords {
        if unit >= self.texcoords.len() {
            panic!("Mesh {} has no texture unit {}.", self.describe(), unit);
        }

        &mut self.texcoords[unit]
    }

    pub fn vertex_texcoord_at(&self, i: usize, unit: usize) -> Vector2<f32> {
        let v = self.texcoords_or_panic(unit).array.element(i);
        Vector2::new(v[0], v[1])
    }

    pub fn set_vertex_texcoord_at(&mut self, i: usize, unit: usize, uv: Vector2<f32>) {
        self.texcoords_mut_or_panic(unit)
            .array
            .set_element(i, &[uv.x, uv.y]);
    }

    pub fn texture_rectangle(&self, unit: usize) -> TexRect {
        self.texcoords_or_panic(unit).rect()
    }

    pub fn set_texture_rectangle(&mut self, unit: usize, rect: TexRect) {
        self.texcoords_mut_or_panic(unit).set_rect(rect);
    }

    /// Sets the rectangle of every unit.
    pub fn set_texture_rectangles(&mut self, rect: TexRect) {
        for v in &mut self.texcoords {
            v.set_rect(rect);
        }
    }

    pub fn align_with_texture(&mut self, unit: usize, texture: &Texture) {
        if let Some(v) = self.texcoords.get_mut(unit) {
            v.align_with_texture(texture);
        }
    }

    pub fn flip_texture_vertically(&mut self, unit: usize) {
        self.texcoords_mut_or_panic(unit).flip_vertically();
    }

    pub fn flip_texture_horizontally(&mut self, unit: usize) {
        self.texcoords_mut_or_panic(unit).flip_horizontally();
    }

    pub fn repeat_texture(&mut self, unit: usize, n: Vector2<f32>) {
        self.texcoords_mut_or_panic(unit).repeat(n);
    }

    // Skinning channels.

    /// The number of bones that can influence a vertex.
    #[inline]
    pub fn vertex_unit_count(&self) -> usize {
        self.vertex_unit_count
    }

    /// Changes the number of bone influences per vertex. Existing matrix indices and
    /// weights are dropped.
    pub fn set_vertex_unit_count(&mut self, n: usize) {
        self.vertex_unit_count = n;
        if let Some(ref mut v) = self.matrix_indices {
            v.set_components(n.max(1));
        }
        if let Some(ref mut v) = self.weights {
            v.set_components(n.max(1));
        }
    }

    pub fn vertex_matrix_index_at(&self, i: usize, unit: usize) -> usize {
        array_or_panic!(self, matrix_indices, "matrix indices").element(i)[unit] as usize
    }

    pub fn set_vertex_matrix_index_at(&mut self, i: usize, unit: usize, v: usize) {
        let array = array_mut_or_panic!(self, matrix_indices, "matrix indices");
        assert!(
            v <= ::std::u8::MAX as usize,
            "Matrix index {} does not fit 8 bit bone indices.",
            v
        );

        let mut e = array.element(i).to_vec();
        e[unit] = v as u8;
        array.set_element(i, &e);
    }

    pub fn vertex_weight_at(&self, i: usize, unit: usize) -> f32 {
        array_or_panic!(self, weights, "weights").element(i)[unit]
    }

    pub fn set_vertex_weight_at(&mut self, i: usize, unit: usize, v: f32) {
        let array = array_mut_or_panic!(self, weights, "weights");
        let mut e = array.element(i).to_vec();
        e[unit] = v;
        array.set_element(i, &e);
    }

    // Faces.

    /// Keeps the faces computed from the locations until the locations change.
    pub fn set_should_cache_faces(&mut self, v: bool) {
        self.should_cache_faces = v;
        if !v {
            self.invalidate_faces();
        }
    }

    #[inline]
    pub fn should_cache_faces(&self) -> bool {
        self.should_cache_faces
    }

    fn invalidate_faces(&self) {
        self.faces.borrow_mut().take();
    }

    pub fn face_count(&self) -> usize {
        self.draw_mode.primitive_count(self.element_count())
    }

    /// The vertex indices of face `f`. Strips alternate the winding of odd faces so
    /// every face is counter-clockwise.
    pub fn face_indices_at(&self, f: usize) -> FaceIndices {
        let e = match self.draw_mode {
            DrawMode::Triangles => [3 * f, 3 * f + 1, 3 * f + 2],
            DrawMode::TriangleStrip if f % 2 == 0 => [f, f + 1, f + 2],
            DrawMode::TriangleStrip => [f + 1, f, f + 2],
            DrawMode::TriangleFan => [0, f + 1, f + 2],
            DrawMode::Lines => [2 * f, 2 * f + 1, 2 * f + 1],
            DrawMode::LineStrip => [f, f + 1, f + 1],
            DrawMode::Points => [f, f, f],
        };

        let map = |v: usize| {
            if self.indices.is_some() {
                self.vertex_index_at(v) as u32
            } else {
                v as u32
            }
        };

        FaceIndices([map(e[0]), map(e[1]), map(e[2])])
    }

    pub fn face_from_indices(&self, indices: FaceIndices) -> Face {
        let FaceIndices([a, b, c]) = indices;
        Face::new(
            self.vertex_location_at(a as usize),
            self.vertex_location_at(b as usize),
            self.vertex_location_at(c as usize),
        )
    }

    pub fn face_at(&self, f: usize) -> Face {
        if !self.should_cache_faces {
            return self.face_from_indices(self.face_indices_at(f));
        }

        let mut faces = self.faces.borrow_mut();
        if faces.is_none() {
            let all = (0..self.face_count())
                .map(|i| self.face_from_indices(self.face_indices_at(i)))
                .collect();
            *faces = Some(all);
        }

        match *faces {
            Some(ref v) => v[f],
            None => unreachable!(),
        }
    }

    pub fn face_center_at(&self, f: usize) -> Point3<f32> {
        self.face_at(f).center()
    }

    pub fn face_normal_at(&self, f: usize) -> Vector3<f32> {
        self.face_at(f).normal()
    }

    pub fn face_plane_at(&self, f: usize) -> Plane {
        self.face_at(f).plane()
    }

    // Geometry.

    /// The box around every vertex location, if there is any.
    pub fn bounding_box(&self) -> Option<Aabb3> {
        let locations = self.locations.as_ref()?;
        Aabb3::from_points(
            locations
                .data()
                .chunks(3)
                .map(|v| Point3::new(v[0], v[1], v[2])),
        )
    }

    /// Moves the origin of the mesh to `location`, by subtracting it from every vertex.
    pub fn move_pivot_to(&mut self, location: Vector3<f32>) {
        if let Some(ref mut v) = self.locations {
            for p in v.data_mut().chunks_mut(3) {
                p[0] -= location.x;
                p[1] -= location.y;
                p[2] -= location.z;
            }
        }

        self.invalidate_faces();
    }

    pub fn move_pivot_to_center_of_geometry(&mut self) {
        if let Some(aabb) = self.bounding_box() {
            self.move_pivot_to(aabb.center().to_vec());
        }
    }

    // Direct access to arrays.

    pub fn locations(&self) -> Option<&VertexArray<f32>> {
        self.locations.as_ref()
    }

    pub fn locations_mut(&mut self) -> Option<&mut VertexArray<f32>> {
        self.invalidate_faces();
        self.locations.as_mut()
    }

    pub fn normals(&self) -> Option<&VertexArray<f32>> {
        self.normals.as_ref()
    }

    pub fn normals_mut(&mut self) -> Option<&mut VertexArray<f32>> {
        self.normals.as_mut()
    }

    pub fn colors(&self) -> Option<&VertexArray<u8>> {
        self.colors.as_ref()
    }

    pub fn colors_mut(&mut self) -> Option<&mut VertexArray<u8>> {
        self.colors.as_mut()
    }

    pub fn indices(&self) -> Option<&VertexArray<u16>> {
        self.indices.as_ref()
    }

    pub fn indices_mut(&mut self) -> Option<&mut VertexArray<u16>> {
        self.invalidate_faces();
        self.indices.as_mut()
    }

    pub fn matrix_indices(&self) -> Option<&VertexArray<u8>> {
        self.matrix_indices.as_ref()
    }

    pub fn weights(&self) -> Option<&VertexArray<f32>> {
        self.weights.as_ref()
    }

    // Retention and buffering.

    /// Keeps the client copy of the arrays in `content` after buffering.
    pub fn retain_vertex_content(&mut self, content: VertexContent) {
        self.for_each_array(content, |a| a.set_should_retain(true), |a| a.set_should_retain(true));
    }

    /// Keeps the arrays in `content` in client memory only.
    pub fn do_not_buffer_vertex_content(&mut self, content: VertexContent) {
        self.for_each_array(content, |a| a.set_should_buffer(false), |a| a.set_should_buffer(false));
    }

    fn for_each_array<F, G>(&mut self, content: VertexContent, f: F, g: G)
    where
        F: Fn(&mut VertexArray<f32>),
        G: Fn(&mut VertexArray<u8>),
    {
        if content.contains(VertexContent::LOCATION) {
            if let Some(ref mut v) = self.locations {
                f(v);
            }
        }
        if content.contains(VertexContent::NORMAL) {
            if let Some(ref mut v) = self.normals {
                f(v);
            }
        }
        if content.contains(VertexContent::COLOR) {
            if let Some(ref mut v) = self.colors {
                g(v);
            }
        }
        if content.contains(VertexContent::TEXCOORD) {
            for v in &mut self.texcoords {
                f(&mut v.array);
            }
        }
        if content.contains(VertexContent::MATRIX_INDICES) {
            if let Some(ref mut v) = self.matrix_indices {
                g(v);
            }
        }
        if content.contains(VertexContent::WEIGHTS) {
            if let Some(ref mut v) = self.weights {
                f(v);
            }
        }
    }

    pub fn retain_vertex_locations(&mut self) {
        self.retain_vertex_content(VertexContent::LOCATION);
    }

    pub fn retain_vertex_normals(&mut self) {
        self.retain_vertex_content(VertexContent::NORMAL);
    }

    pub fn retain_vertex_colors(&mut self) {
        self.retain_vertex_content(VertexContent::COLOR);
    }

    pub fn retain_vertex_texture_coordinates(&mut self) {
        self.retain_vertex_content(VertexContent::TEXCOORD);
    }

    pub fn retain_vertex_matrix_indices(&mut self) {
        self.retain_vertex_content(VertexContent::MATRIX_INDICES);
    }

    pub fn retain_vertex_weights(&mut self) {
        self.retain_vertex_content(VertexContent::WEIGHTS);
    }

    pub fn retain_vertex_indices(&mut self) {
        if let Some(ref mut v) = self.indices {
            v.set_should_retain(true);
        }
    }

    pub fn do_not_buffer_vertex_locations(&mut self) {
        self.do_not_buffer_vertex_content(VertexContent::LOCATION);
    }

    pub fn do_not_buffer_vertex_normals(&mut self) {
        self.do_not_buffer_vertex_content(VertexContent::NORMAL);
    }

    pub fn do_not_buffer_vertex_colors(&mut self) {
        self.do_not_buffer_vertex_content(VertexContent::COLOR);
    }

    pub fn do_not_buffer_vertex_texture_coordinates(&mut self) {
        self.do_not_buffer_vertex_content(VertexContent::TEXCOORD);
    }

    pub fn do_not_buffer_vertex_matrix_indices(&mut self) {
        self.do_not_buffer_vertex_content(VertexContent::MATRIX_INDICES);
    }

    pub fn do_not_buffer_vertex_weights(&mut self) {
        self.do_not_buffer_vertex_content(VertexContent::WEIGHTS);
    }

    pub fn do_not_buffer_vertex_indices(&mut self) {
        if let Some(ref mut v) = self.indices {
            v.set_should_buffer(false);
        }
    }

    /// Sets the buffer usage of every array, e.g. `DYNAMIC_DRAW` for content that is
    /// rewritten each frame.
    pub fn set_buffer_usage(&mut self, usage: GLenum) {
        self.for_each_array(VertexContent::all(), |a| a.set_usage(usage), |a| a.set_usage(usage));
        if let Some(ref mut v) = self.indices {
            v.set_usage(usage);
        }
    }

    pub fn create_gl_buffers(&mut self, engine: &mut GLEngine) {
        self.for_each_array_gl(engine, |a, e| a.create_buffer(e), |a, e| a.create_buffer(e));
        if let Some(ref mut v) = self.indices {
            v.create_buffer(engine);
        }
    }

    pub fn delete_gl_buffers(&mut self, engine: &mut GLEngine) {
        self.for_each_array_gl(engine, |a, e| a.delete_buffer(e), |a, e| a.delete_buffer(e));
        if let Some(ref mut v) = self.indices {
            v.delete_buffer(engine);
        }
    }

    /// Copies the changed parts of every array into its GL buffer.
    pub fn update_gl_buffers(&mut self, engine: &mut GLEngine) {
        self.for_each_array_gl(engine, |a, e| a.update_buffer(e), |a, e| a.update_buffer(e));
        if let Some(ref mut v) = self.indices {
            v.update_buffer(engine);
        }
    }

    pub fn update_vertex_locations_gl_buffer(&mut self, engine: &mut GLEngine) {
        if let Some(ref mut v) = self.locations {
            v.update_buffer(engine);
        }
    }

    pub fn update_vertex_normals_gl_buffer(&mut self, engine: &mut GLEngine) {
        if let Some(ref mut v) = self.normals {
            v.update_buffer(engine);
        }
    }

    pub fn update_vertex_colors_gl_buffer(&mut self, engine: &mut GLEngine) {
        if let Some(ref mut v) = self.colors {
            v.update_buffer(engine);
        }
    }

    pub fn update_vertex_texture_coordinates_gl_buffer(&mut self, engine: &mut GLEngine) {
        for v in &mut self.texcoords {
            v.array.update_buffer(engine);
        }
    }

    pub fn update_vertex_indices_gl_buffer(&mut self, engine: &mut GLEngine) {
        if let Some(ref mut v) = self.indices {
            v.update_buffer(engine);
        }
    }

    fn for_each_array_gl<F, G>(&mut self, engine: &mut GLEngine, f: F, g: G)
    where
        F: Fn(&mut VertexArray<f32>, &mut GLEngine),
        G: Fn(&mut VertexArray<u8>, &mut GLEngine),
    {
        if let Some(ref mut v) = self.locations {
            f(v, engine);
        }
        if let Some(ref mut v) = self.normals {
            f(v, engine);
        }
        if let Some(ref mut v) = self.colors {
            g(v, engine);
        }
        for v in &mut self.texcoords {
            f(&mut v.array, engine);
        }
        if let Some(ref mut v) = self.matrix_indices {
            g(v, engine);
        }
        if let Some(ref mut v) = self.weights {
            f(v, engine);
        }
    }

    /// Frees the client copy of the buffered arrays that are not retained.
    pub fn release_redundant_data(&mut self) {
        self.for_each_array(
            VertexContent::all(),
            |a| a.release_redundant_data(),
            |a| a.release_redundant_data(),
        );

        if let Some(ref mut v) = self.indices {
            v.release_redundant_data();
        }

        self.invalidate_faces();
    }

    // Drawing.

    /// Points the client arrays at this mesh. Texture units beyond the coordinates of
    /// the mesh reuse the coordinates of its last unit.
    pub fn bind(&self, engine: &mut GLEngine, texture_units: usize) {
        match self.locations {
            Some(ref v) => v.bind(engine),
            None => engine.enable_client_array(VERTEX_ARRAY, false),
        }

        match self.normals {
            Some(ref v) => v.bind(engine),
            None => engine.enable_client_array(NORMAL_ARRAY, false),
        }

        match self.colors {
            Some(ref v) => v.bind(engine),
            None => engine.enable_client_array(COLOR_ARRAY, false),
        }

        match self.matrix_indices {
            Some(ref v) => v.bind(engine),
            None => engine.enable_client_array(MATRIX_INDEX_ARRAY_OES, false),
        }

        match self.weights {
            Some(ref v) => v.bind(engine),
            None => engine.enable_client_array(WEIGHT_ARRAY_OES, false),
        }

        if let Some(last) = self.texcoords.len().checked_sub(1) {
            for unit in 0..texture_units {
                self.texcoords[unit.min(last)].array.bind_texcoords(engine, unit);
            }
        }
    }

    /// Draws every element.
    pub fn draw(&self, engine: &mut GLEngine) {
        self.draw_range(engine, 0, self.element_count());
    }

    /// Draws `count` elements starting at `first`. Elements are indices if the mesh
    /// has any, vertices otherwise.
    pub fn draw_range(&self, engine: &mut GLEngine, first: usize, count: usize) {
        let mode = self.draw_mode.to_gl();
        match self.indices {
            Some(ref v) => {
                engine.bind_buffer(ELEMENT_ARRAY_BUFFER, v.buffer());
                engine.draw_elements(mode, count, UNSIGNED_SHORT, v.pointer(first).offset);
            }
            None => engine.draw_arrays(mode, first, count),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gles::EngineParams;

    fn quad() -> Mesh {
        let mut mesh = Mesh::new(Some("quad"));
        mesh.set_vertex_content(VertexContent::standard());
        mesh.set_vertex_count(4);
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        for (i, &(x, y)) in corners.iter().enumerate() {
            mesh.set_vertex_location_at(i, Point3::new(x, y, 0.0));
            mesh.set_vertex_normal_at(i, Vector3::unit_z());
            mesh.set_vertex_texcoord_at(i, 0, Vector2::new(x, y));
        }

        mesh.set_vertex_index_count(6);
        for (i, &v) in [0, 1, 2, 2, 3, 0].iter().enumerate() {
            mesh.set_vertex_index_at(i, v);
        }

        mesh
    }

    #[test]
    fn arrays_share_vertex_count() {
        let mut mesh = quad();
        mesh.set_vertex_content(VertexContent::standard() | VertexContent::COLOR);
        assert_eq!(mesh.colors().unwrap().len(), 4);

        mesh.set_vertex_count(7);
        assert_eq!(mesh.locations().unwrap().len(), 7);
        assert_eq!(mesh.texcoords(0).unwrap().array().len(), 7);
        assert_eq!(mesh.vertex_location_at(2), Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn faces() {
        let mut mesh = quad();
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.face_indices_at(1), FaceIndices([2, 3, 0]));
        assert_eq!(mesh.face_normal_at(0), Vector3::unit_z());

        mesh.set_should_cache_faces(true);
        let center = mesh.face_center_at(0);
        mesh.set_vertex_location_at(1, Point3::new(4.0, 0.0, 0.0));
        assert_ne!(mesh.face_center_at(0), center);
    }

    #[test]
    fn strip_winding() {
        let mut mesh = quad();
        mesh.set_vertex_index_count(0);
        mesh.set_draw_mode(DrawMode::TriangleStrip);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.face_indices_at(0), FaceIndices([0, 1, 2]));
        assert_eq!(mesh.face_indices_at(1), FaceIndices([2, 1, 3]));
    }

    #[test]
    fn pivot() {
        let mut mesh = quad();
        mesh.move_pivot_to_center_of_geometry();
        let aabb = mesh.bounding_box().unwrap();
        assert_eq!(aabb.min, Point3::new(-0.5, -0.5, 0.0));
        assert_eq!(aabb.max, Point3::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn texture_rectangle() {
        let mut mesh = quad();
        mesh.set_texture_rectangle(0, TexRect::new(0.5, 0.0, 0.5, 0.5));
        assert_eq!(mesh.vertex_texcoord_at(2, 0), Vector2::new(1.0, 0.5));

        mesh.texcoords_mut(0).unwrap().set_coverage(Vector2::new(0.5, 1.0));
        assert_eq!(mesh.vertex_texcoord_at(2, 0), Vector2::new(0.5, 0.5));
        assert_eq!(mesh.vertex_texcoord_at(0, 0), Vector2::new(0.25, 0.0));

        mesh.set_texture_rectangle(0, TexRect::unit());
        assert_eq!(mesh.vertex_texcoord_at(2, 0), Vector2::new(0.5, 1.0));

        mesh.flip_texture_vertically(0);
        assert_eq!(mesh.vertex_texcoord_at(2, 0), Vector2::new(0.5, 0.0));
        mesh.flip_texture_horizontally(0);
        assert_eq!(mesh.vertex_texcoord_at(2, 0), Vector2::new(0.0, 0.0));
    }

    #[test]
    fn repeat_texture() {
        let mut mesh = quad();
        mesh.repeat_texture(0, Vector2::new(2.0, 3.0));
        assert_eq!(mesh.vertex_texcoord_at(2, 0), Vector2::new(2.0, 3.0));
    }

    #[test]
    fn release_redundant_data() {
        let (mut engine, _) = GLEngine::headless(EngineParams::default());
        let mut mesh = quad();
        mesh.retain_vertex_locations();
        mesh.do_not_buffer_vertex_normals();
        mesh.create_gl_buffers(&mut engine);
        mesh.release_redundant_data();

        assert_eq!(mesh.vertex_location_at(1), Point3::new(1.0, 0.0, 0.0));
        assert_eq!(mesh.vertex_normal_at(1), Vector3::unit_z());
        assert!(!mesh.texcoords(0).unwrap().array().is_retained());
        assert!(!mesh.indices().unwrap().is_retained());
        assert!(mesh.to_bytes().is_err());
    }

    #[test]
    fn archive() {
        let mesh = quad();
        let bytes = mesh.to_bytes().unwrap();
        let copy = Mesh::from_bytes(Some("copy"), &bytes).unwrap();
        assert_eq!(copy.name(), Some("copy"));
        assert_ne!(copy.tag(), mesh.tag());
        assert_eq!(copy.vertex_count(), 4);
        assert_eq!(copy.vertex_index_at(4), 3);
        assert_eq!(copy.vertex_texcoord_at(3, 0), Vector2::new(0.0, 1.0));
    }

    #[test]
    fn draw() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let mut mesh = quad();
        mesh.create_gl_buffers(&mut engine);
        mesh.bind(&mut engine, 1);
        mesh.draw(&mut engine);

        let draws = probe.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].mode, TRIANGLES);
        assert_eq!(draws[0].count, 6);
        assert!(draws[0].indexed);
    }

    #[test]
    #[should_panic]
    fn index_beyond_16_bits() {
        let mut mesh = quad();
        mesh.set_vertex_index_at(0, 1 << 16);
    }

    #[test]
    #[should_panic]
    fn matrix_index_beyond_8_bits() {
        let mut mesh = quad();
        mesh.set_vertex_content(VertexContent::standard() | VertexContent::MATRIX_INDICES);
        mesh.set_vertex_unit_count(2);
        mesh.set_vertex_matrix_index_at(0, 1, 255);
        assert_eq!(mesh.vertex_matrix_index_at(0, 1), 255);
        mesh.set_vertex_matrix_index_at(0, 1, 256);
    }
}
