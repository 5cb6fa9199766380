use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

use crate::scene::Primitive;

/// A ray in a primitive's object space. Ephemeral: one is built per
/// intersection test and discarded afterwards.
#[derive(Debug, Clone)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

/// The nearest valid hit reported by an intersection test. Everything here is
/// in object space; the tracer carries it back to world space.
#[derive(Debug, Clone)]
pub struct Intersection {
    pub t: f32,
    /// Unit surface normal at the hit point.
    pub normal: Vector3<f32>,
    pub point: Point3<f32>,
    /// Which analytic sub-surface was hit: cube face 0–5, quadric body 0/1,
    /// cylinder caps 2 (top) and 3 (bottom), cone base 2.
    pub marker: usize,
}

/// Roots of `a·t² + b·t + c = 0` when the discriminant is non-negative. A
/// tangent ray reports its repeated root. Degenerate coefficients (`a = 0`)
/// produce non-finite roots that [`nearest`] discards.
fn quadratic_roots(a: f32, b: f32, c: f32) -> Option<(f32, f32)> {
    let disc = b * b - 4. * a * c;
    if disc < 0. {
        return None;
    }
    let root = disc.sqrt();
    Some(((-b + root) / (2. * a), (-b - root) / (2. * a)))
}

/// Index and value of the smallest finite candidate. Infinite entries mark
/// tossed candidates; NaN entries (degenerate quadratics) never win.
fn nearest(candidates: &[f32]) -> Option<(usize, f32)> {
    candidates
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, t)| t.is_finite())
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Nearest valid intersection with a primitive, or `None` when the ray
    /// misses it entirely.
    pub fn intersect(&self, primitive: Primitive) -> Option<Intersection> {
        match primitive {
            Primitive::Sphere => self.sphere(),
            Primitive::Cube => self.cube(),
            Primitive::Cylinder => self.cylinder(),
            Primitive::Cone => self.cone(),
        }
    }

    /// `t` at which the ray crosses the plane `Ax + By + Cz + D = 0`, or
    /// infinity when parallel or behind the origin.
    fn plane(&self, a: f32, b: f32, c: f32, d: f32) -> f32 {
        let denom = a * self.direction.x + b * self.direction.y + c * self.direction.z;
        if denom == 0. {
            return f32::INFINITY;
        }
        let t = -(a * self.origin.x + b * self.origin.y + c * self.origin.z + d) / denom;
        if t > 0. {
            t
        } else {
            f32::INFINITY
        }
    }

    /// A flat cap at `y = ±0.5`, bounded by the unit radius. `axis_sign`
    /// selects the top (+1) or bottom (-1) cap.
    fn cap(&self, axis_sign: f32) -> f32 {
        let t = self.plane(0., 2. * axis_sign, 0., -1.);
        if t.is_finite() {
            let p = self.at(t);
            if p.x * p.x + p.z * p.z > 0.25 {
                return f32::INFINITY;
            }
        }
        t
    }

    /// Implicit sphere `x² + y² + z² = 0.25`.
    fn sphere(&self) -> Option<Intersection> {
        let p = &self.origin;
        let d = &self.direction;

        let a = d.x * d.x + d.y * d.y + d.z * d.z;
        let b = 2. * (p.x * d.x + p.y * d.y + p.z * d.z);
        let c = p.x * p.x + p.y * p.y + p.z * p.z - 0.25;

        let (mut t1, mut t2) = quadratic_roots(a, b, c)?;
        if !(t1 > 0.) {
            t1 = f32::INFINITY;
        }
        if !(t2 > 0.) {
            t2 = f32::INFINITY;
        }

        let (_, t) = nearest(&[t1, t2])?;
        let point = self.at(t);
        Some(Intersection {
            t,
            // gradient of the implicit surface
            normal: Vector3::new(2. * point.x, 2. * point.y, 2. * point.z).normalize(),
            point,
            marker: 0,
        })
    }

    /// Unit cube: six axis-aligned planes at ±0.5, markers ordered
    /// +x, -x, +y, -y, +z, -z.
    fn cube(&self) -> Option<Intersection> {
        let mut candidates: SmallVec<[f32; 6]> = SmallVec::new();

        for face in 0..6usize {
            let axis = face / 2;
            let sign = if face % 2 == 0 { 1. } else { -1. };

            let mut coeffs = Vector3::zeros();
            coeffs[axis] = 2. * sign;
            let mut t = self.plane(coeffs.x, coeffs.y, coeffs.z, -1.);

            if t.is_finite() {
                let p = self.at(t);
                let (i, j) = ((axis + 1) % 3, (axis + 2) % 3);
                if p[i] > 0.5 || p[i] < -0.5 || p[j] > 0.5 || p[j] < -0.5 {
                    t = f32::INFINITY;
                }
            }
            candidates.push(t);
        }

        let (marker, t) = nearest(&candidates)?;
        let mut normal = Vector3::zeros();
        normal[marker / 2] = if marker % 2 == 0 { 1. } else { -1. };

        Some(Intersection {
            t,
            normal,
            point: self.at(t),
            marker,
        })
    }

    /// Implicit cylinder `x² + z² = 0.25` with `|y| ≤ 0.5`, plus caps.
    fn cylinder(&self) -> Option<Intersection> {
        let p = &self.origin;
        let d = &self.direction;

        let a = d.x * d.x + d.z * d.z;
        let b = 2. * (p.x * d.x + p.z * d.z);
        let c = p.x * p.x + p.z * p.z - 0.25;

        let (mut t1, mut t2) = quadratic_roots(a, b, c)?;

        // body roots only count within the height bound
        let y1 = p.y + t1 * d.y;
        let y2 = p.y + t2 * d.y;
        if y1 > 0.5 || y1 < -0.5 {
            t1 = f32::INFINITY;
        }
        if y2 > 0.5 || y2 < -0.5 {
            t2 = f32::INFINITY;
        }

        let t3 = self.cap(1.);
        let t4 = self.cap(-1.);

        let (marker, t) = nearest(&[t1, t2, t3, t4])?;
        let point = self.at(t);
        let normal = match marker {
            0 | 1 => Vector3::new(2. * point.x, 0., 2. * point.z).normalize(),
            2 => Vector3::new(0., 1., 0.),
            _ => Vector3::new(0., -1., 0.),
        };

        Some(Intersection {
            t,
            normal,
            point,
            marker,
        })
    }

    /// Implicit cone `x² + z² = 0.25·(0.5 - y)²` with the apex at `y = 0.5`,
    /// plus the base cap at `y = -0.5`.
    fn cone(&self) -> Option<Intersection> {
        let p = &self.origin;
        let d = &self.direction;

        let a = d.x * d.x + d.z * d.z - 0.25 * d.y * d.y;
        let b = 2. * p.x * d.x + 2. * p.z * d.z - 0.5 * p.y * d.y + 0.25 * d.y;
        let c = p.x * p.x + p.z * p.z - 0.25 * p.y * p.y + 0.25 * p.y - 0.0625;

        let (mut t1, mut t2) = quadratic_roots(a, b, c)?;

        // the height bound also rejects the upper nappe of the double cone
        let y1 = p.y + t1 * d.y;
        let y2 = p.y + t2 * d.y;
        if y1 > 0.5 || y1 < -0.5 {
            t1 = f32::INFINITY;
        }
        if y2 > 0.5 || y2 < -0.5 {
            t2 = f32::INFINITY;
        }

        let t3 = self.cap(-1.);

        let (marker, t) = nearest(&[t1, t2, t3])?;
        let point = self.at(t);
        let normal = match marker {
            // the slant normal, from the implicit gradient
            0 | 1 => Vector3::new(2. * point.x, -0.5 * point.y + 0.25, 2. * point.z).normalize(),
            _ => Vector3::new(0., -1., 0.),
        };

        Some(Intersection {
            t,
            normal,
            point,
            marker,
        })
    }
}

#[cfg(test)]
use approx::assert_relative_eq;

#[test]
fn test_sphere_center_ray_antipodal() {
    let hit = Ray::new(Point3::new(0., 0., -5.), Vector3::new(0., 0., 1.))
        .intersect(Primitive::Sphere)
        .expect("hits the sphere");
    assert_relative_eq!(hit.t, 4.5);
    assert_relative_eq!(hit.point, Point3::new(0., 0., -0.5));

    // the same axis from the other side lands on the antipodal point
    let back = Ray::new(Point3::new(0., 0., 5.), Vector3::new(0., 0., -1.))
        .intersect(Primitive::Sphere)
        .expect("hits the sphere");
    assert_relative_eq!(back.point, Point3::new(0., 0., 0.5));
    assert_relative_eq!(hit.point.coords, -back.point.coords);
}

#[test]
fn test_sphere_normal_is_normalized_point() {
    let hit = Ray::new(Point3::new(1., 2., 3.), Vector3::new(-1., -2., -3.))
        .intersect(Primitive::Sphere)
        .expect("hits the sphere");
    assert_relative_eq!(hit.normal, hit.point.coords.normalize(), epsilon = 1e-6);
    assert_relative_eq!(hit.normal.norm(), 1., epsilon = 1e-6);
}

#[test]
fn test_sphere_miss_and_behind() {
    let ray = Ray::new(Point3::new(0., 0., -5.), Vector3::new(0., 1., 0.));
    assert!(ray.intersect(Primitive::Sphere).is_none());

    // both roots behind the origin
    let ray = Ray::new(Point3::new(0., 0., 5.), Vector3::new(0., 0., 1.));
    assert!(ray.intersect(Primitive::Sphere).is_none());
}

#[test]
fn test_sphere_tangent_repeated_root() {
    let hit = Ray::new(Point3::new(0.5, 0., -5.), Vector3::new(0., 0., 1.))
        .intersect(Primitive::Sphere)
        .expect("a grazing ray still reports its repeated root");
    assert_relative_eq!(hit.t, 5.);
    assert_relative_eq!(hit.point, Point3::new(0.5, 0., 0.));
}

#[test]
fn test_cube_faces_and_markers() {
    let hit = Ray::new(Point3::new(5., 0.1, 0.2), Vector3::new(-1., 0., 0.))
        .intersect(Primitive::Cube)
        .expect("hits the +x face");
    assert_eq!(hit.marker, 0);
    assert_relative_eq!(hit.normal, Vector3::new(1., 0., 0.));
    assert_relative_eq!(hit.t, 4.5);

    let hit = Ray::new(Point3::new(0., -5., 0.), Vector3::new(0., 1., 0.))
        .intersect(Primitive::Cube)
        .expect("hits the -y face");
    assert_eq!(hit.marker, 3);
    assert_relative_eq!(hit.normal, Vector3::new(0., -1., 0.));

    // antipodal entry points through the center
    let front = Ray::new(Point3::new(0., 0., -5.), Vector3::new(0., 0., 1.))
        .intersect(Primitive::Cube)
        .unwrap();
    let back = Ray::new(Point3::new(0., 0., 5.), Vector3::new(0., 0., -1.))
        .intersect(Primitive::Cube)
        .unwrap();
    assert_relative_eq!(front.point.coords, -back.point.coords);
}

#[test]
fn test_cube_miss_outside_faces() {
    let ray = Ray::new(Point3::new(5., 0.9, 0.), Vector3::new(-1., 0., 0.));
    assert!(ray.intersect(Primitive::Cube).is_none());
}

#[test]
fn test_cylinder_body() {
    let hit = Ray::new(Point3::new(-5., 0., 0.), Vector3::new(1., 0., 0.))
        .intersect(Primitive::Cylinder)
        .expect("hits the body");
    assert!(hit.marker < 2);
    assert_relative_eq!(hit.point, Point3::new(-0.5, 0., 0.));
    assert_relative_eq!(hit.normal, Vector3::new(-1., 0., 0.));

    let back = Ray::new(Point3::new(5., 0., 0.), Vector3::new(-1., 0., 0.))
        .intersect(Primitive::Cylinder)
        .unwrap();
    assert_relative_eq!(hit.point.coords, -back.point.coords);
}

#[test]
fn test_cylinder_axis_ray_hits_cap() {
    // dx = dz = 0 degenerates the quadratic; the cap test still fires and the
    // NaN roots never win the candidate selection.
    let hit = Ray::new(Point3::new(0., 5., 0.), Vector3::new(0., -1., 0.))
        .intersect(Primitive::Cylinder)
        .expect("hits the top cap");
    assert_eq!(hit.marker, 2);
    assert_relative_eq!(hit.t, 4.5);
    assert_relative_eq!(hit.normal, Vector3::new(0., 1., 0.));
}

#[test]
fn test_cylinder_cap_radial_bound() {
    let ray = Ray::new(Point3::new(0.6, 5., 0.), Vector3::new(0., -1., 0.));
    assert!(ray.intersect(Primitive::Cylinder).is_none());
}

#[test]
fn test_cone_slant_normal() {
    let hit = Ray::new(Point3::new(-5., 0., 0.), Vector3::new(1., 0., 0.))
        .intersect(Primitive::Cone)
        .expect("hits the slant");
    assert!(hit.marker < 2);
    assert_relative_eq!(hit.t, 4.75);
    assert_relative_eq!(hit.point, Point3::new(-0.25, 0., 0.));
    let expected = Vector3::new(-0.5, 0.25, 0.).normalize();
    assert_relative_eq!(hit.normal, expected, epsilon = 1e-6);
}

#[test]
fn test_cone_base_cap() {
    let hit = Ray::new(Point3::new(0.3, -5., 0.), Vector3::new(0., 1., 0.))
        .intersect(Primitive::Cone)
        .expect("hits the base");
    assert_eq!(hit.marker, 2);
    assert_relative_eq!(hit.t, 4.5);
    assert_relative_eq!(hit.normal, Vector3::new(0., -1., 0.));
}

#[test]
fn test_cone_above_apex_misses() {
    let ray = Ray::new(Point3::new(-5., 0.75, 0.), Vector3::new(1., 0., 0.));
    assert!(ray.intersect(Primitive::Cone).is_none());
}
