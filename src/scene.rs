use std::path::PathBuf;

use nalgebra::{Point3, Vector3};

use crate::{camera::Camera, canvas::Color, transform::Transform};

/// Primitive shapes, each defined implicitly in a canonical unit object
/// space: radius/half-side 0.5, height 1, centered at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Sphere,
    Cube,
    Cylinder,
    Cone,
}

/// A texture file reference attached to a material.
#[derive(Debug, Clone)]
pub struct TextureMap {
    pub filename: PathBuf,
    /// Horizontal tiling factor.
    pub repeat_u: f32,
    /// Vertical tiling factor.
    pub repeat_v: f32,
    /// Weight for blending the sampled texel into the diffuse color.
    pub blend: f32,
}

impl TextureMap {
    pub fn new(filename: impl Into<PathBuf>, blend: f32) -> Self {
        Self {
            filename: filename.into(),
            repeat_u: 1.,
            repeat_v: 1.,
            blend,
        }
    }

    pub fn with_repeat(mut self, repeat_u: f32, repeat_v: f32) -> Self {
        self.repeat_u = repeat_u;
        self.repeat_v = repeat_v;
        self
    }
}

/// Phong material of a shape.
#[derive(Debug, Clone)]
pub struct Material {
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub reflective: Color,
    pub shininess: f32,
    pub texture: Option<TextureMap>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Color::black(),
            diffuse: Color::new(0.8, 0.8, 0.8),
            specular: Color::black(),
            reflective: Color::black(),
            shininess: 1.,
            texture: None,
        }
    }
}

impl Material {
    pub fn with_ambient(mut self, ambient: Color) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn with_diffuse(mut self, diffuse: Color) -> Self {
        self.diffuse = diffuse;
        self
    }

    pub fn with_specular(mut self, specular: Color, shininess: f32) -> Self {
        self.specular = specular;
        self.shininess = shininess;
        self
    }

    pub fn with_reflective(mut self, reflective: Color) -> Self {
        self.reflective = reflective;
        self
    }

    pub fn with_texture(mut self, texture: TextureMap) -> Self {
        self.texture = Some(texture);
        self
    }
}

/// Quadratic distance falloff coefficients for point and spot lights.
#[derive(Debug, Clone, Copy)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Attenuation {
    pub fn none() -> Self {
        Self {
            constant: 1.,
            linear: 0.,
            quadratic: 0.,
        }
    }

    /// `min(1, 1 / (c1 + c2·d + c3·d²))` for a distance `d`.
    pub fn factor(&self, dist: f32) -> f32 {
        (1. / (self.constant + dist * self.linear + dist * dist * self.quadratic)).min(1.)
    }
}

#[derive(Debug, Clone)]
pub enum Light {
    Directional {
        color: Color,
        direction: Vector3<f32>,
    },
    Point {
        color: Color,
        position: Point3<f32>,
        attenuation: Attenuation,
    },
    Spot {
        color: Color,
        position: Point3<f32>,
        direction: Vector3<f32>,
        attenuation: Attenuation,
        /// Full cone angle, in radians.
        angle: f32,
        /// Width of the falloff band inside the cone edge, in radians.
        penumbra: f32,
    },
}

/// Scalar lighting weights applied uniformly across the scene.
#[derive(Debug, Clone, Copy)]
pub struct GlobalCoefficients {
    pub ka: f32,
    pub kd: f32,
    pub ks: f32,
}

/// A [`Primitive`] placed in the world by a scene-graph CTM.
#[derive(Debug, Clone)]
pub struct ShapeInstance {
    pub primitive: Primitive,
    pub material: Material,
    pub ctm: Transform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ShapeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LightId(u32);

/// Everything a render pass reads: canvas dimensions, the flattened shape
/// and light lists, global coefficients, and the camera. Immutable once the
/// render starts.
#[derive(Debug)]
pub struct Scene {
    width: u32,
    height: u32,
    camera: Camera,
    globals: GlobalCoefficients,
    shapes: Vec<ShapeInstance>,
    lights: Vec<Light>,
}

impl Scene {
    pub fn new(width: u32, height: u32, camera: Camera, globals: GlobalCoefficients) -> Self {
        Self {
            width,
            height,
            camera,
            globals,
            shapes: Vec::new(),
            lights: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn globals(&self) -> GlobalCoefficients {
        self.globals
    }

    pub fn shapes(&self) -> &[ShapeInstance] {
        &self.shapes
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn add_shape(&mut self, shape: ShapeInstance) -> ShapeId {
        let id = ShapeId(self.shapes.len() as u32);
        self.shapes.push(shape);
        id
    }

    pub fn add_light(&mut self, light: Light) -> LightId {
        let id = LightId(self.lights.len() as u32);
        self.lights.push(light);
        id
    }

    #[inline]
    pub fn shape(&self, ShapeId(id): ShapeId) -> &ShapeInstance {
        &self.shapes[id as usize]
    }

    #[inline]
    pub fn light(&self, LightId(id): LightId) -> &Light {
        &self.lights[id as usize]
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// View-plane height at unit distance, from the vertical field of view.
    pub fn plane_height(&self) -> f32 {
        2. * (self.camera.height_angle() / 2.).tan()
    }

    pub fn plane_width(&self) -> f32 {
        self.plane_height() * self.aspect_ratio()
    }

    /// Camera-space ray direction through pixel `(row, col)`.
    pub fn ray_direction(&self, row: u32, col: u32) -> Vector3<f32> {
        let x = (col as f32 + 0.5) / self.width as f32 - 0.5;
        let y = (self.height as f32 - 0.5 - row as f32) / self.height as f32 - 0.5;

        Vector3::new(self.plane_width() * x, self.plane_height() * y, -1.)
    }
}

#[cfg(test)]
fn test_scene(width: u32, height: u32, fov: f32) -> Scene {
    Scene::new(
        width,
        height,
        Camera::new(
            Point3::origin(),
            Vector3::new(0., 0., -1.),
            Vector3::new(0., 1., 0.),
            fov,
        ),
        GlobalCoefficients {
            ka: 1.,
            kd: 1.,
            ks: 1.,
        },
    )
}

#[test]
fn test_shape_and_light_handles() {
    let mut scene = test_scene(4, 4, std::f32::consts::FRAC_PI_2);
    let id = scene.add_shape(ShapeInstance {
        primitive: Primitive::Cone,
        material: Material::default(),
        ctm: Transform::new(),
    });
    let light = scene.add_light(Light::Directional {
        color: Color::white(),
        direction: Vector3::new(0., -1., 0.),
    });

    assert_eq!(scene.shape(id).primitive, Primitive::Cone);
    assert!(matches!(scene.light(light), Light::Directional { .. }));
}

#[test]
fn test_plane_dimensions() {
    use approx::assert_relative_eq;

    // A 90° field of view spans two units at unit distance.
    let scene = test_scene(200, 100, std::f32::consts::FRAC_PI_2);
    assert_relative_eq!(scene.plane_height(), 2.);
    assert_relative_eq!(scene.plane_width(), 4.);
}

#[test]
fn test_center_ray_points_forward() {
    use approx::assert_relative_eq;

    // an odd canvas samples the exact view-plane center
    let scene = test_scene(101, 101, std::f32::consts::FRAC_PI_2);
    let dir = scene.ray_direction(50, 50);
    assert_relative_eq!(dir.x, 0., epsilon = 1e-6);
    assert_relative_eq!(dir.y, 0., epsilon = 1e-6);
    assert_relative_eq!(dir.z, -1.);
}

#[test]
fn test_corner_rays_mirror() {
    use approx::assert_relative_eq;

    let scene = test_scene(100, 100, std::f32::consts::FRAC_PI_2);
    let top_left = scene.ray_direction(0, 0);
    let bottom_right = scene.ray_direction(99, 99);
    assert_relative_eq!(top_left.x, -bottom_right.x, epsilon = 1e-6);
    assert_relative_eq!(top_left.y, -bottom_right.y, epsilon = 1e-6);
}
