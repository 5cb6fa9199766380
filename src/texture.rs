use std::path::Path;

use anyhow::Context;
use log::warn;
use nalgebra::Point3;

use crate::{
    canvas::Color,
    scene::{Material, Primitive, Scene, TextureMap},
};

/// A texture file decoded to RGBA8, row-major with `v = 1` at the top row.
#[derive(Debug, Clone)]
pub struct TextureImage {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl TextureImage {
    /// Decode any `image`-supported file to RGBA8.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("failed to load texture `{}`", path.display()))?
            .to_rgba8();

        Ok(Self {
            width: img.width(),
            height: img.height(),
            pixels: img.pixels().map(|px| px.0).collect(),
        })
    }

    /// Wrap pixel data already in memory.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<[u8; 4]>) -> Self {
        assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// The texel under an object-space hit point. Indices that land outside
    /// the image (exact-boundary hits) resolve to neutral black so a bad
    /// sample can never take down the render.
    pub fn sample(
        &self,
        map: &TextureMap,
        primitive: Primitive,
        point: &Point3<f32>,
        marker: usize,
    ) -> Color {
        let (u, v) = uv_for(primitive, point, marker);

        let repeat_u = map.repeat_u as i32;
        let repeat_v = map.repeat_v as i32;
        let index = if repeat_u != 1 || repeat_v != 1 {
            texel_index_tiled(u, v, self.width, self.height, repeat_u, repeat_v)
        } else {
            texel_index(u, v, self.width, self.height)
        };

        usize::try_from(index)
            .ok()
            .and_then(|ix| self.pixels.get(ix))
            .map_or_else(Color::black, |px| Color::from_rgba8(*px))
    }
}

/// UV coordinates for a hit, selected by primitive type and sub-surface
/// marker. The per-face axis and sign choices are a fixed convention; texture
/// placement depends on them, so they are not derived from first principles.
pub fn uv_for(primitive: Primitive, point: &Point3<f32>, marker: usize) -> (f32, f32) {
    match primitive {
        Primitive::Cylinder | Primitive::Cone => {
            if marker >= 2 {
                plane_uv(point.x, point.z)
            } else {
                (perimeter_u(point.x, point.z), point.y + 0.5)
            }
        }

        Primitive::Sphere => (perimeter_u(point.x, point.z), sphere_v(point.y)),

        Primitive::Cube => match marker {
            0 => plane_uv(-point.z, point.y),
            1 => plane_uv(point.z, point.y),
            2 => plane_uv(point.x, -point.z),
            3 => plane_uv(point.x, point.z),
            4 => plane_uv(point.x, point.y),
            _ => plane_uv(-point.x, point.y),
        },
    }
}

/// Orthogonal-projection UV for caps and cube faces.
fn plane_uv(a: f32, b: f32) -> (f32, f32) {
    (a + 0.5, b + 0.5)
}

/// Azimuthal `u` around the y axis, wrapped into [0, 1]. Points with a zero
/// x or z coordinate (sphere poles, the seam) map to 0.5.
fn perimeter_u(px: f32, pz: f32) -> f32 {
    use std::f32::consts::PI;

    if px != 0. && pz != 0. {
        let theta = pz.atan2(px);
        if theta < 0. {
            -theta / (2. * PI)
        } else {
            1. - theta / (2. * PI)
        }
    } else {
        0.5
    }
}

/// Latitude `v` for the sphere, from the arcsine of the height.
fn sphere_v(py: f32) -> f32 {
    (py / 0.5).asin() / std::f32::consts::PI + 0.5
}

/// Row-major texel index for an untiled texture. When the raw `u` exceeds 1
/// or the raw `v` falls below 0, the index shifts back by one; that
/// correction is long-standing observed behavior, kept as-is.
fn texel_index(u: f32, v: f32, width: u32, height: u32) -> i64 {
    let correction = if u > 1. || v < 0. { 1 } else { 0 };
    let u = u.min(1.);
    let v = v.max(0.);

    let col = (u * width as f32).floor().max(0.) as i64;
    let row = (((1. - v).max(0.)) * height as f32).floor() as i64;
    width as i64 * row + col - correction
}

/// Row-major texel index with tiling: UV scales by the truncated repeat
/// factors and wraps modulo the image dimensions. Carries the same
/// out-of-bounds correction as [`texel_index`].
fn texel_index_tiled(u: f32, v: f32, width: u32, height: u32, repeat_u: i32, repeat_v: i32) -> i64 {
    let correction = if u > 1. || v < 0. { 1 } else { 0 };
    let u = u.min(1.);
    let v = v.max(0.);

    let col = ((u * repeat_u as f32 * width as f32).floor() as i64) % width as i64;
    let row = (((1. - v) * repeat_v as f32 * height as f32).floor() as i64) % height as i64;
    width as i64 * row + col - correction
}

/// Texture images for one render pass, indexed alongside the scene's shape
/// list. Loaded once up front; read-only afterwards.
#[derive(Debug, Default)]
pub struct TextureSet {
    images: Vec<Option<TextureImage>>,
}

impl TextureSet {
    /// A set with no images, for renders with texture mapping disabled.
    pub fn empty(shapes: usize) -> Self {
        Self {
            images: (0..shapes).map(|_| None).collect(),
        }
    }

    /// Load the texture of every shape that references one. A file that
    /// fails to load is logged and its shape samples as neutral black.
    pub fn load(scene: &Scene) -> Self {
        let images = scene
            .shapes()
            .iter()
            .map(|shape| {
                let map = shape.material.texture.as_ref()?;
                match TextureImage::open(&map.filename) {
                    Ok(img) => Some(img),
                    Err(err) => {
                        warn!("{err:#}");
                        None
                    }
                }
            })
            .collect();

        Self { images }
    }

    /// Sample the texture of shape `shape`, or `None` when its material has
    /// no texture reference.
    pub fn sample(
        &self,
        shape: usize,
        material: &Material,
        primitive: Primitive,
        point: &Point3<f32>,
        marker: usize,
    ) -> Option<Color> {
        let map = material.texture.as_ref()?;
        let color = match self.images.get(shape).and_then(Option::as_ref) {
            Some(img) => img.sample(map, primitive, point, marker),
            None => Color::black(),
        };
        Some(color)
    }
}

#[cfg(test)]
use approx::assert_relative_eq;

#[test]
fn test_cube_face_uv_is_deterministic() {
    // +x face through the face center: the projection axes are (-z, y).
    let (u, v) = uv_for(Primitive::Cube, &Point3::new(0.5, 0., 0.), 0);
    assert_relative_eq!(u, 0.5);
    assert_relative_eq!(v, 0.5);

    let (u, v) = uv_for(Primitive::Cube, &Point3::new(0.5, 0.25, -0.25), 0);
    assert_relative_eq!(u, 0.75);
    assert_relative_eq!(v, 0.75);
}

#[test]
fn test_sphere_uv() {
    // poles collapse to the seam value
    let (u, v) = uv_for(Primitive::Sphere, &Point3::new(0., -0.5, 0.), 0);
    assert_relative_eq!(u, 0.5);
    assert_relative_eq!(v, 0.);

    let (_, v) = uv_for(Primitive::Sphere, &Point3::new(0., 0.5, 0.), 0);
    assert_relative_eq!(v, 1.);
}

#[test]
fn test_cylinder_body_and_cap_uv() {
    let (u, v) = uv_for(Primitive::Cylinder, &Point3::new(0.5, -0.25, 0.0001), 1);
    assert!(u < 1. && u > 0.9);
    assert_relative_eq!(v, 0.25);

    // caps project on the (x, z) plane
    let (u, v) = uv_for(Primitive::Cylinder, &Point3::new(0.25, 0.5, -0.25), 2);
    assert_relative_eq!(u, 0.75);
    assert_relative_eq!(v, 0.25);
}

#[test]
fn test_texel_index() {
    assert_eq!(texel_index(0.5, 0.5, 8, 8), 36);
    assert_eq!(texel_index(0., 1., 8, 8), 0);
    assert_eq!(texel_index(0.99, 0.01, 8, 8), 63);
}

#[test]
fn test_texel_index_out_of_bounds_correction() {
    // A raw u above 1 clamps to the row end, shifted back by one. This is
    // the preserved quirk: the shift comes from the raw value, not the
    // clamped one.
    assert_eq!(texel_index(1.2, 0.5, 8, 8), 8 * 4 + 8 - 1);
    assert_eq!(texel_index(0.5, -0.25, 8, 8), 8 * 8 + 4 - 1);
    // in-range values never shift
    assert_eq!(texel_index(1.0, 0.5, 8, 8), 8 * 4 + 8);
}

#[test]
fn test_texel_index_tiled_wraps() {
    assert_eq!(texel_index_tiled(0.75, 0.25, 8, 8, 2, 2), 36);
    assert_eq!(texel_index_tiled(0.5, 0.5, 8, 8, 1, 1), texel_index(0.5, 0.5, 8, 8));
}

#[test]
fn test_sample_boundary_is_black() {
    let img = TextureImage::from_raw(2, 2, vec![[255; 4]; 4]);
    let map = TextureMap::new("unused.png", 1.);

    // an exact u = 1 hit indexes one past the row and resolves to black
    let color = img.sample(&map, Primitive::Cube, &Point3::new(0.5, 0., -0.5), 0);
    assert_eq!(color, Color::black());

    let color = img.sample(&map, Primitive::Cube, &Point3::new(0.5, 0., 0.), 0);
    assert_eq!(color, Color::white());
}
