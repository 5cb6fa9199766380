use nalgebra::Vector3;

/// Reflect `vec` through `normal`.
pub fn reflect(vec: &Vector3<f32>, normal: &Vector3<f32>) -> Vector3<f32> {
    vec - normal * 2. * vec.dot(normal)
}

/// The angle between two directions, in radians.
pub fn angle_between(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    a.normalize().dot(&b.normalize()).clamp(-1., 1.).acos()
}

pub trait Mix {
    type Output;

    fn mix(self, b: Self, t: f32) -> Self::Output;
}

impl Mix for f32 {
    type Output = f32;

    #[inline]
    fn mix(self, y: f32, t: f32) -> f32 {
        self * (1.0 - t) + y * t
    }
}

#[inline]
pub fn deg_to_rad(deg: f32) -> f32 {
    (deg / 180.) * std::f32::consts::PI
}

#[test]
fn test_deg_to_rad() {
    assert_eq!(std::f32::consts::PI, deg_to_rad(180.));
}

#[test]
fn test_reflect() {
    let v = Vector3::new(1., -1., 0.);
    let n = Vector3::new(0., 1., 0.);
    assert_eq!(Vector3::new(1., 1., 0.), reflect(&v, &n));
}

#[test]
fn test_angle_between() {
    use approx::assert_relative_eq;

    let a = Vector3::new(0., 0., -1.);
    let b = Vector3::new(0., 1., 0.);
    assert_relative_eq!(angle_between(&a, &b), std::f32::consts::FRAC_PI_2);
    assert_relative_eq!(angle_between(&a, &a), 0.);
}
