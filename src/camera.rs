use nalgebra::{Matrix4, Point3, Vector3};

/// A pinhole camera described by its world-space position, look and up
/// vectors, and vertical field of view.
#[derive(Debug, Clone)]
pub struct Camera {
    pos: Point3<f32>,
    look: Vector3<f32>,
    up: Vector3<f32>,
    height_angle: f32,
}

impl Camera {
    pub fn new(pos: Point3<f32>, look: Vector3<f32>, up: Vector3<f32>, height_angle: f32) -> Self {
        Self {
            pos,
            look,
            up,
            height_angle,
        }
    }

    /// Point the camera from `pos` at `target`.
    pub fn look_at(pos: Point3<f32>, target: Point3<f32>, up: Vector3<f32>, height_angle: f32) -> Self {
        Self::new(pos, target - pos, up, height_angle)
    }

    pub fn height_angle(&self) -> f32 {
        self.height_angle
    }

    pub fn position(&self) -> Point3<f32> {
        self.pos
    }

    /// The orthonormal camera basis: `w` opposes the look direction, `v` is
    /// the up vector with its `w` component projected out, `u = v × w`.
    fn basis(&self) -> (Vector3<f32>, Vector3<f32>, Vector3<f32>) {
        let w = -self.look.normalize();
        let v = (self.up - self.up.dot(&w) * w).normalize();
        let u = v.cross(&w);
        (u, v, w)
    }

    /// The world-to-camera view matrix.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        let (u, v, w) = self.basis();
        let rotate = Matrix4::new(
            u.x, u.y, u.z, 0., //
            v.x, v.y, v.z, 0., //
            w.x, w.y, w.z, 0., //
            0., 0., 0., 1.,
        );
        rotate * Matrix4::new_translation(&-self.pos.coords)
    }

    /// The inverse of the view matrix. Built directly from the basis rather
    /// than by a generic inversion, as the rotation part is orthonormal.
    pub fn camera_to_world(&self) -> Matrix4<f32> {
        let (u, v, w) = self.basis();
        let rotate = Matrix4::new(
            u.x, v.x, w.x, 0., //
            u.y, v.y, w.y, 0., //
            u.z, v.z, w.z, 0., //
            0., 0., 0., 1.,
        );
        Matrix4::new_translation(&self.pos.coords) * rotate
    }
}

#[test]
fn test_view_matrix_centers_camera() {
    use approx::assert_relative_eq;

    let camera = Camera::new(
        Point3::new(1., 2., 3.),
        Vector3::new(0., 0., -1.),
        Vector3::new(0., 1., 0.),
        std::f32::consts::FRAC_PI_2,
    );

    let eye = camera.view_matrix().transform_point(&camera.position());
    assert_relative_eq!(eye, Point3::origin(), epsilon = 1e-6);
}

#[test]
fn test_camera_to_world_inverts_view() {
    use approx::assert_relative_eq;

    let camera = Camera::look_at(
        Point3::new(4., -2., 7.),
        Point3::new(0., 1., 0.),
        Vector3::new(0., 1., 0.),
        std::f32::consts::FRAC_PI_3,
    );

    let round_trip = camera.camera_to_world() * camera.view_matrix();
    assert_relative_eq!(round_trip, Matrix4::identity(), epsilon = 1e-5);
}

#[test]
fn test_camera_space_forward_is_look() {
    use approx::assert_relative_eq;

    let camera = Camera::new(
        Point3::new(0., 0., 5.),
        Vector3::new(0., 0., -2.),
        Vector3::new(0., 1., 0.),
        std::f32::consts::FRAC_PI_2,
    );

    // -z in camera space is the look direction in world space.
    let forward = camera
        .camera_to_world()
        .transform_vector(&Vector3::new(0., 0., -1.));
    assert_relative_eq!(forward, Vector3::new(0., 0., -1.), epsilon = 1e-6);
}
