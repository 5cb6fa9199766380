use std::ops::Neg;

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

/// A world transform (CTM) paired with its cached inverse, so that rays can be
/// mapped into object space without inverting per intersection test.
#[derive(Debug, Clone)]
pub struct Transform {
    matrix: Matrix4<f32>,
    inverse: Matrix4<f32>,
}

impl Transform {
    pub fn new() -> Self {
        Self {
            matrix: Matrix4::identity(),
            inverse: Matrix4::identity(),
        }
    }

    /// Wrap a matrix produced elsewhere (e.g. a scene-graph CTM). Returns
    /// `None` when the matrix is singular.
    pub fn from_matrix(matrix: Matrix4<f32>) -> Option<Self> {
        matrix.try_inverse().map(|inverse| Self { matrix, inverse })
    }

    pub fn matrix(&self) -> &Matrix4<f32> {
        &self.matrix
    }

    pub fn inverse(&self) -> &Matrix4<f32> {
        &self.inverse
    }

    /// Append a translation to this transform.
    pub fn translate(mut self, vec: &Vector3<f32>) -> Self {
        self.matrix.append_translation_mut(vec);
        self.inverse.prepend_translation_mut(&vec.neg());
        self
    }

    /// Append a uniform scaling to this transform.
    pub fn uniform_scale(self, amount: f32) -> Self {
        self.scale(&Vector3::new(amount, amount, amount))
    }

    /// Append a scaling to this transform. The components must be non-zero,
    /// as the inverse is maintained alongside the matrix.
    pub fn scale(mut self, amounts: &Vector3<f32>) -> Self {
        self.matrix.append_nonuniform_scaling_mut(amounts);
        self.inverse
            .prepend_nonuniform_scaling_mut(&amounts.map(f32::recip));
        self
    }

    /// Append an axis-angle rotation to the transform.
    pub fn rotate(mut self, axisangle: &Vector3<f32>) -> Self {
        self.matrix = Matrix4::new_rotation(*axisangle) * self.matrix;
        self.inverse *= Matrix4::new_rotation(axisangle.neg());
        self
    }

    /// The matrix that carries object-space normals to world space: the
    /// transpose of the inverse's upper 3×3.
    pub fn normal_matrix(&self) -> Matrix3<f32> {
        self.inverse.fixed_view::<3, 3>(0, 0).transpose()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// Compose two transforms; the right-hand side applies first.
impl std::ops::Mul<&Transform> for &Transform {
    type Output = Transform;

    fn mul(self, rhs: &Transform) -> Transform {
        Transform {
            matrix: self.matrix * rhs.matrix,
            inverse: rhs.inverse * self.inverse,
        }
    }
}

pub trait ApplyTransform {
    /// Carry a value from object space to world space.
    fn apply(&self, transform: &Transform) -> Self;

    /// Carry a value from world space to object space.
    fn invert(&self, transform: &Transform) -> Self;
}

impl ApplyTransform for Point3<f32> {
    #[inline]
    fn apply(&self, transform: &Transform) -> Self {
        transform.matrix.transform_point(self)
    }

    #[inline]
    fn invert(&self, transform: &Transform) -> Self {
        transform.inverse.transform_point(self)
    }
}

impl ApplyTransform for Vector3<f32> {
    #[inline]
    fn apply(&self, transform: &Transform) -> Self {
        transform.matrix.transform_vector(self)
    }

    #[inline]
    fn invert(&self, transform: &Transform) -> Self {
        transform.inverse.transform_vector(self)
    }
}

#[test]
fn test_translate() {
    let t = Transform::new().translate(&Vector3::new(1., 0., 0.));
    let p = Point3::new(1., 0., 0.);
    assert_eq!(p, p.apply(&t).invert(&t));
}

#[test]
fn test_scaling() {
    let t = Transform::new().scale(&Vector3::new(10.0, 1.0, 0.5));
    let p = Point3::new(1., 0., 1.);
    assert_eq!(p, p.apply(&t).invert(&t));
}

#[test]
fn test_rotation() {
    let t = Transform::new().rotate(&Vector3::new(std::f32::consts::PI, 0., 0.));
    let p = Point3::new(0., 1., 0.);
    assert_eq!(p, p.apply(&t).invert(&t));
}

#[test]
fn test_composition() {
    let t = Transform::new()
        .uniform_scale(10.0)
        .translate(&Vector3::new(1., 0., 0.));
    let p = Point3::new(1., 0., 1.);
    assert_eq!(p, p.apply(&t).invert(&t));
}

#[test]
fn test_from_matrix() {
    let t = Transform::from_matrix(Matrix4::new_translation(&Vector3::new(0., 2., 0.)))
        .expect("translation is invertible");
    let p = Point3::new(1., 0., 0.);
    assert_eq!(Point3::new(1., 2., 0.), p.apply(&t));

    assert!(Transform::from_matrix(Matrix4::zeros()).is_none());
}

#[test]
fn test_normal_matrix_nonuniform_scale() {
    use approx::assert_relative_eq;

    // A sphere squashed along x: the object-space normal of the point that
    // lands on the world +x axis must stay +x after the inverse-transpose.
    let t = Transform::new().scale(&Vector3::new(2., 1., 1.));
    let n = t.normal_matrix() * Vector3::new(1., 0., 0.);
    assert_relative_eq!(n.normalize(), Vector3::new(1., 0., 0.));

    // A slanted normal bends away from the squashed axis.
    let n = (t.normal_matrix() * Vector3::new(1., 1., 0.)).normalize();
    assert!(n.y > n.x);
}
