//! A device through which the scene is viewed.

use crate::gles::consts::*;
use crate::math::prelude::*;

use super::rotator::look_rotation;

/// The projection of a camera node. The view matrix comes from the global transform of
/// the node; the camera looks along its local -Z axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Camera::perspective(Deg(60.0), 1.0, 0.1, 1000.0)
    }
}

impl Camera {
    /// Creates a new camera with orthographic projection.
    pub fn ortho(width: f32, height: f32, near: f32, far: f32) -> Self {
        Camera::new(Projection::ortho(width, height, near, far))
    }

    /// Creates a new camera with perspective projection.
    pub fn perspective<T>(fovy: T, aspect: f32, near: f32, far: f32) -> Self
    where
        T: Into<Rad<f32>>,
    {
        Camera::new(Projection::perspective(fovy.into(), aspect, near, far))
    }

    pub fn new(projection: Projection) -> Self {
        projection.validate();
        Camera { projection }
    }

    #[inline]
    pub fn projection(&self) -> Projection {
        self.projection
    }

    #[inline]
    pub fn set_projection(&mut self, projection: Projection) {
        projection.validate();
        self.projection = projection;
    }

    /// Gets the near/far clipping plane distances.
    pub fn clip_planes(&self) -> (f32, f32) {
        match self.projection {
            Projection::Ortho { near, far, .. } => (near, far),
            Projection::Perspective { near, far, .. } => (near, far),
        }
    }

    /// Sets the aspect ratio (width divided by height), keeping the vertical extent.
    pub fn set_aspect(&mut self, aspect: f32) {
        let projection = match self.projection {
            Projection::Ortho {
                height, near, far, ..
            } => Projection::ortho(height * aspect, height, near, far),
            Projection::Perspective {
                fovy, near, far, ..
            } => Projection::perspective(fovy, aspect, near, far),
        };

        self.set_projection(projection);
    }

    #[inline]
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection.to_matrix()
    }

    /// The view of this camera placed by `transform`, the global transform of its node.
    pub fn view_from(&self, transform: &Matrix4<f32>) -> CameraView {
        let view = transform.invert().unwrap_or_else(Matrix4::identity);
        CameraView::new(view, self.projection_matrix())
    }
}

/// The matrices a frame is drawn with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub frustum: Frustum,
}

impl CameraView {
    pub fn new(view: Matrix4<f32>, projection: Matrix4<f32>) -> Self {
        CameraView {
            view,
            projection,
            frustum: Frustum::from_matrix(&(projection * view)),
        }
    }

    /// A view from `eye` along `forward`.
    pub fn look_along(
        eye: Point3<f32>,
        forward: Vector3<f32>,
        up: Vector3<f32>,
        projection: Matrix4<f32>,
    ) -> Self {
        let rotation = Matrix3::from(look_rotation(forward, up));
        let view = Matrix4::from(rotation.transpose()) * Matrix4::from_translation(-eye.to_vec());
        CameraView::new(view, projection)
    }

    /// The location of the eye in world space.
    pub fn eye(&self) -> Point3<f32> {
        let inv = self.view.invert().unwrap_or_else(Matrix4::identity);
        Point3::from_vec(inv.w.truncate())
    }
}

/// The forward and up directions of the camera that renders one face of a cube map,
/// following the GL cube map conventions.
pub fn cube_face_orientation(face: GLenum) -> Option<(Vector3<f32>, Vector3<f32>)> {
    let (x, y, z) = (Vector3::unit_x(), Vector3::unit_y(), Vector3::unit_z());
    match face {
        TEXTURE_CUBE_MAP_POSITIVE_X => Some((x, -y)),
        TEXTURE_CUBE_MAP_NEGATIVE_X => Some((-x, -y)),
        TEXTURE_CUBE_MAP_POSITIVE_Y => Some((y, z)),
        TEXTURE_CUBE_MAP_NEGATIVE_Y => Some((-y, -z)),
        TEXTURE_CUBE_MAP_POSITIVE_Z => Some((z, -y)),
        TEXTURE_CUBE_MAP_NEGATIVE_Z => Some((-z, -y)),
        _ => None,
    }
}

/// The view that renders one face of a cube map seen from `location`.
pub fn cube_face_view(location: Point3<f32>, face: GLenum, near: f32, far: f32) -> Option<CameraView> {
    let (forward, up) = cube_face_orientation(face)?;
    let projection = Projection::perspective(Deg(90.0).into(), 1.0, near, far).to_matrix();
    Some(CameraView::look_along(location, forward, up, projection))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn view_from_transform() {
        let camera = Camera::default();
        let transform = Matrix4::from_translation(Vector3::new(0.0, 0.0, 10.0));
        let view = camera.view_from(&transform);

        let p = view.view.transform_point(Point3::new(0.0, 0.0, 0.0));
        assert_ulps_eq!(p, Point3::new(0.0, 0.0, -10.0), epsilon = 1e-5);
        assert_ulps_eq!(view.eye(), Point3::new(0.0, 0.0, 10.0), epsilon = 1e-5);

        let origin = Point3::new(0.0, 0.0, 0.0);
        assert_eq!(view.frustum.contains(&origin), PlaneRelation::In);
    }

    #[test]
    fn cube_faces() {
        let eye = Point3::new(1.0, 2.0, 3.0);
        for &face in &[
            TEXTURE_CUBE_MAP_POSITIVE_X,
            TEXTURE_CUBE_MAP_NEGATIVE_X,
            TEXTURE_CUBE_MAP_POSITIVE_Y,
            TEXTURE_CUBE_MAP_NEGATIVE_Y,
            TEXTURE_CUBE_MAP_POSITIVE_Z,
            TEXTURE_CUBE_MAP_NEGATIVE_Z,
        ] {
            let (forward, _) = cube_face_orientation(face).unwrap();
            let view = cube_face_view(eye, face, 0.1, 100.0).unwrap();

            // A point straight ahead lands in the middle of the face.
            let ahead = view.view.transform_point(eye + forward * 5.0);
            assert_ulps_eq!(ahead, Point3::new(0.0, 0.0, -5.0), epsilon = 1e-4);
            assert_eq!(view.frustum.contains(&(eye + forward * 5.0)), PlaneRelation::In);
            assert_eq!(view.frustum.contains(&(eye - forward * 5.0)), PlaneRelation::Out);
        }

        assert!(cube_face_orientation(TEXTURE_2D).is_none());
    }

    #[test]
    fn cube_face_up() {
        // +X looks along +X with -Y up, so +Z of the world is on the left of the image.
        let view = cube_face_view(Point3::new(0.0, 0.0, 0.0), TEXTURE_CUBE_MAP_POSITIVE_X, 0.1, 10.0)
            .unwrap();
        let p = view.view.transform_point(Point3::new(1.0, 0.0, 1.0));
        assert!(p.x < 0.0);

        let p = view.view.transform_point(Point3::new(1.0, 1.0, 0.0));
        assert!(p.y < 0.0);
    }
}
