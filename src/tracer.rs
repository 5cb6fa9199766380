use nalgebra::{Matrix4, Point3, Vector3};

use crate::{
    canvas::Color,
    math::{self, Mix},
    ray::{Intersection, Ray},
    render::Config,
    scene::{Light, Scene, ShapeInstance},
    texture::TextureSet,
    transform::ApplyTransform,
};

/// Recursion cutoff for reflection rays.
const MAX_DEPTH: u32 = 4;

/// Origin offset applied to a reflection ray, and the lower bound its hits
/// must clear. The pair keeps a bounced ray from re-intersecting the surface
/// it left.
const REFLECT_BIAS: f32 = -0.005;
const REFLECT_MIN_T: f32 = 0.05;

/// The same guard pair for shadow rays.
const SHADOW_BIAS: f32 = -0.005;
const SHADOW_MIN_T: f32 = 0.0055;

/// One render pass worth of tracing state: read-only scene data, the feature
/// toggles, and the textures loaded for this pass.
pub struct RayTracer<'a> {
    scene: &'a Scene,
    config: &'a Config,
    textures: &'a TextureSet,
    camera_to_world: Matrix4<f32>,
}

/// The winning shape of a nearest-hit search, still in object space.
struct Hit<'a> {
    shape_index: usize,
    shape: &'a ShapeInstance,
    intersection: Intersection,
}

impl<'a> RayTracer<'a> {
    pub fn new(scene: &'a Scene, config: &'a Config, textures: &'a TextureSet) -> Self {
        Self {
            scene,
            config,
            textures,
            camera_to_world: scene.camera().camera_to_world(),
        }
    }

    /// Trace the primary ray for pixel `(row, col)` and resolve its color.
    pub fn trace_pixel(&self, row: u32, col: u32) -> Color {
        let eye = self.camera_to_world.transform_point(&Point3::origin());
        let dir = self
            .camera_to_world
            .transform_vector(&self.scene.ray_direction(row, col))
            .normalize();

        self.trace(eye, dir, 0, 0., 0.)
    }

    /// Follow a world-space ray into the scene. `epsilon` nudges the origin
    /// along the ray and `min_t` rejects hits too close to it; primary rays
    /// pass zero for both, secondary rays the bias pair above.
    fn trace(&self, start: Point3<f32>, dir: Vector3<f32>, depth: u32, epsilon: f32, min_t: f32) -> Color {
        let start = start + dir * epsilon;

        match self.find_hit(&start, &dir, min_t) {
            None => Color::black(),
            Some(hit) => {
                // only offset rays deepen the recursion
                let depth = if epsilon != 0. { depth + 1 } else { depth };
                self.shade(&start, &hit, depth)
            }
        }
    }

    /// The closest intersection across all shapes. Each shape sees the ray in
    /// its own object space; `t` is a shared parameter along the world ray,
    /// so candidates compare directly.
    fn find_hit(&self, start: &Point3<f32>, dir: &Vector3<f32>, min_t: f32) -> Option<Hit<'a>> {
        let mut nearest: Option<Hit> = None;

        for (shape_index, shape) in self.scene.shapes().iter().enumerate() {
            let ray = Ray::new(start.invert(&shape.ctm), dir.invert(&shape.ctm));
            if let Some(intersection) = ray.intersect(shape.primitive) {
                if intersection.t > min_t
                    && nearest
                        .as_ref()
                        .map_or(true, |hit| intersection.t < hit.intersection.t)
                {
                    nearest = Some(Hit {
                        shape_index,
                        shape,
                        intersection,
                    });
                }
            }
        }

        nearest
    }

    /// Phong shading for a hit: ambient, then per-light diffuse and specular
    /// with shadows and attenuation, then the reflection bounce.
    fn shade(&self, start: &Point3<f32>, hit: &Hit, depth: u32) -> Color {
        if depth > MAX_DEPTH {
            return Color::black();
        }

        let material = &hit.shape.material;
        let globals = self.scene.globals();
        let ctm = &hit.shape.ctm;

        let world_point = hit.intersection.point.apply(ctm);
        let world_normal = (ctm.normal_matrix() * hit.intersection.normal).normalize();
        let to_eye = (start - world_point).normalize();

        let texture = if self.config.texture_map {
            self.textures.sample(
                hit.shape_index,
                material,
                hit.shape.primitive,
                &hit.intersection.point,
                hit.intersection.marker,
            )
        } else {
            None
        };
        let blend = material.texture.as_ref().map_or(0., |map| map.blend);

        let mut illumination = globals.ka * &material.ambient;

        for light in self.scene.lights() {
            let (to_light, light_pos, attenuation, intensity) = light_setup(light, &world_point);

            if self.config.shadows && self.occluded(&world_point, &to_light, light_pos) {
                continue;
            }

            let n_dot_l = world_normal.dot(&to_light);

            let reflected = math::reflect(&-to_light, &world_normal).normalize();
            let mut r_dot_eye = reflected.dot(&to_eye);
            if r_dot_eye >= 0. {
                r_dot_eye = r_dot_eye.powf(material.shininess);
            }

            // texture modulates only the diffuse term
            let diffuse_base = globals.kd * &material.diffuse;
            let diffuse = match &texture {
                Some(texel) => (&diffuse_base).mix(texel, blend),
                None => diffuse_base,
            };

            illumination += ((attenuation * n_dot_l) * &(&diffuse * &intensity)).max_zero();
            illumination += ((attenuation * globals.ks * r_dot_eye)
                * &(&material.specular * &intensity))
                .max_zero();
        }

        if self.config.reflections && !material.reflective.is_black() {
            let bounce = math::reflect(&-to_eye, &world_normal).normalize();
            let reflection = self.trace(world_point, bounce, depth, REFLECT_BIAS, REFLECT_MIN_T);
            illumination += &(globals.ks * &material.reflective) * &reflection;
        }

        illumination
    }

    /// Whether anything blocks the path from `point` to a light. Directional
    /// lights sit at infinity, so any forward hit shadows them.
    fn occluded(&self, point: &Point3<f32>, to_light: &Vector3<f32>, light_pos: Option<Point3<f32>>) -> bool {
        let origin = point + to_light * SHADOW_BIAS;
        let limit = light_pos.map_or(f32::INFINITY, |pos| (pos - origin).norm());

        for shape in self.scene.shapes() {
            let ray = Ray::new(origin.invert(&shape.ctm), to_light.invert(&shape.ctm));
            if let Some(hit) = ray.intersect(shape.primitive) {
                if hit.t < limit && hit.t > SHADOW_MIN_T {
                    return true;
                }
            }
        }

        false
    }
}

/// Per-light direction, position, attenuation, and effective intensity for a
/// point being shaded.
fn light_setup(
    light: &Light,
    point: &Point3<f32>,
) -> (Vector3<f32>, Option<Point3<f32>>, f32, Color) {
    match light {
        Light::Directional { color, direction } => {
            ((-direction).normalize(), None, 1., color.clone())
        }

        Light::Point {
            color,
            position,
            attenuation,
        } => {
            let dist = (position - point).norm();
            (
                (position - point).normalize(),
                Some(*position),
                attenuation.factor(dist),
                color.clone(),
            )
        }

        Light::Spot {
            color,
            position,
            direction,
            attenuation,
            angle,
            penumbra,
        } => {
            let to_light = (position - point).normalize();
            let dist = (position - point).norm();

            let outer = *angle;
            let inner = angle - penumbra;
            let theta = math::angle_between(&-to_light, direction);

            let mut intensity = color.clone();
            if theta > inner && theta <= outer {
                // smooth falloff from full at the inner cone to zero at the
                // outer; past the outer cone the light is left untouched
                let x = (theta - inner) / (outer - inner);
                let falloff = -2. * x.powi(3) + 3. * x.powi(2);
                intensity = (1. - falloff) * &intensity;
            }

            (to_light, Some(*position), attenuation.factor(dist), intensity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        camera::Camera,
        render::ConfigBuilder,
        scene::{Attenuation, GlobalCoefficients, Material, Primitive},
        transform::Transform,
    };

    fn front_camera() -> Camera {
        Camera::new(
            Point3::new(0., 0., 5.),
            Vector3::new(0., 0., -1.),
            Vector3::new(0., 1., 0.),
            std::f32::consts::FRAC_PI_4,
        )
    }

    fn globals() -> GlobalCoefficients {
        GlobalCoefficients {
            ka: 0.1,
            kd: 0.8,
            ks: 1.,
        }
    }

    fn sphere(material: Material) -> crate::scene::ShapeInstance {
        crate::scene::ShapeInstance {
            primitive: Primitive::Sphere,
            material,
            ctm: Transform::new(),
        }
    }

    fn matte() -> Material {
        Material::default()
            .with_ambient(Color::new(0.2, 0.2, 0.2))
            .with_diffuse(Color::white())
    }

    #[test]
    fn test_single_sphere_scenario() {
        let mut scene = Scene::new(64, 64, front_camera(), globals());
        scene.add_shape(sphere(matte()));
        scene.add_light(Light::Directional {
            color: Color::white(),
            direction: Vector3::new(0., 0., -1.),
        });
        let config = ConfigBuilder::default().build();
        let textures = TextureSet::empty(1);
        let tracer = RayTracer::new(&scene, &config, &textures);

        let center = tracer.trace_pixel(32, 32);
        // near the silhouette's top edge, where the normal has tipped well
        // away from the light
        let edge = tracer.trace_pixel(25, 32);
        assert!(center.r > edge.r);
        assert!(center.r > 0.5);

        // pixels outside the projected sphere are exactly the background
        assert_eq!(tracer.trace_pixel(0, 0), Color::black());
        assert_eq!(tracer.trace_pixel(63, 1), Color::black());
    }

    #[test]
    fn test_top_lit_sphere_is_bright_on_top() {
        let mut scene = Scene::new(64, 64, front_camera(), globals());
        scene.add_shape(sphere(matte()));
        scene.add_light(Light::Directional {
            color: Color::white(),
            direction: Vector3::new(0., -1., 0.),
        });
        let config = ConfigBuilder::default().build();
        let textures = TextureSet::empty(1);
        let tracer = RayTracer::new(&scene, &config, &textures);

        let top = tracer.trace_pixel(26, 32);
        let bottom = tracer.trace_pixel(38, 32);
        assert!(top.r > bottom.r);
    }

    #[test]
    fn test_directional_light_unoccluded_is_never_shadowed() {
        let mut scene = Scene::new(8, 8, front_camera(), globals());
        scene.add_shape(sphere(matte()));
        scene.add_light(Light::Directional {
            color: Color::white(),
            direction: Vector3::new(0., -1., 0.),
        });
        let config = ConfigBuilder::default().build();
        let textures = TextureSet::empty(1);
        let tracer = RayTracer::new(&scene, &config, &textures);

        // a point well below the sphere, lit from below: nothing between the
        // point and infinity, whichever way the scene is turned
        for dir in [
            Vector3::new(0., -1., 0.),
            Vector3::new(1., -1., 0.).normalize(),
            Vector3::new(-0.3, -1., 0.7).normalize(),
        ] {
            assert!(!tracer.occluded(&Point3::new(0., -3., 0.), &dir, None));
        }

        // and straight up through the sphere is occluded
        assert!(tracer.occluded(&Point3::new(0., -3., 0.), &Vector3::new(0., 1., 0.), None));
    }

    #[test]
    fn test_point_light_occlusion_respects_distance() {
        let mut scene = Scene::new(8, 8, front_camera(), globals());
        scene.add_shape(sphere(matte()));
        let config = ConfigBuilder::default().build();
        let textures = TextureSet::empty(1);
        let tracer = RayTracer::new(&scene, &config, &textures);

        // light between the point and the sphere: the sphere is beyond it
        let light = Point3::new(0., -1., 0.);
        assert!(!tracer.occluded(&Point3::new(0., -3., 0.), &Vector3::new(0., 1., 0.), Some(light)));

        // light behind the sphere: the sphere blocks it
        let light = Point3::new(0., 3., 0.);
        assert!(tracer.occluded(&Point3::new(0., -3., 0.), &Vector3::new(0., 1., 0.), Some(light)));
    }

    #[test]
    fn test_mirrored_box_recursion_terminates() {
        // the camera sits inside a mirror-walled cube; every bounce hits
        // another mirror, so only the depth bound ends the recursion
        let camera = Camera::new(
            Point3::new(0., 0., 0.),
            Vector3::new(0.3, 0.2, -1.),
            Vector3::new(0., 1., 0.),
            std::f32::consts::FRAC_PI_3,
        );
        let mut scene = Scene::new(16, 16, camera, globals());
        scene.add_shape(crate::scene::ShapeInstance {
            primitive: Primitive::Cube,
            material: Material::default()
                .with_diffuse(Color::new(0.1, 0.1, 0.1))
                .with_reflective(Color::white()),
            ctm: Transform::new().uniform_scale(4.),
        });
        scene.add_light(Light::Point {
            color: Color::white(),
            position: Point3::new(0., 1., 0.),
            attenuation: Attenuation::none(),
        });

        let config = ConfigBuilder::default().build();
        let textures = TextureSet::empty(1);
        let tracer = RayTracer::new(&scene, &config, &textures);

        for row in 0..16 {
            for col in 0..16 {
                let color = tracer.trace_pixel(row, col);
                assert!(color.r.is_finite() && color.g.is_finite() && color.b.is_finite());
            }
        }
    }

    #[test]
    fn test_empty_scene_is_background() {
        let scene = Scene::new(4, 4, front_camera(), globals());
        let config = ConfigBuilder::default().build();
        let textures = TextureSet::empty(0);
        let tracer = RayTracer::new(&scene, &config, &textures);

        assert_eq!(tracer.trace_pixel(2, 2), Color::black());
    }

    #[test]
    fn test_shadow_flag_disables_shadowing() {
        // an occluder floats between a top light and the main sphere
        let mut scene = Scene::new(64, 64, front_camera(), globals());
        scene.add_shape(sphere(matte()));
        scene.add_shape(crate::scene::ShapeInstance {
            primitive: Primitive::Sphere,
            material: matte(),
            ctm: Transform::new()
                .uniform_scale(0.8)
                .translate(&Vector3::new(0., 1.5, 0.)),
        });
        scene.add_light(Light::Directional {
            color: Color::white(),
            direction: Vector3::new(0., -1., 0.),
        });
        let textures = TextureSet::empty(2);

        let lit_config = ConfigBuilder::default().set_shadows(false).build();
        let shadow_config = ConfigBuilder::default().set_shadows(true).build();

        // a pixel on the main sphere's upper half, shadowed by the occluder
        let lit = RayTracer::new(&scene, &lit_config, &textures).trace_pixel(26, 32);
        let shadowed = RayTracer::new(&scene, &shadow_config, &textures).trace_pixel(26, 32);

        assert!(lit.r > shadowed.r);
    }

    #[test]
    fn test_spot_light_penumbra_band() {
        use approx::assert_relative_eq;

        let spot = Light::Spot {
            color: Color::white(),
            position: Point3::new(0., 2., 0.),
            direction: Vector3::new(0., -1., 0.),
            attenuation: Attenuation::none(),
            angle: deg(30.),
            penumbra: deg(10.),
        };

        // straight below: inside the inner cone, full intensity
        let (_, _, _, intensity) = light_setup(&spot, &Point3::new(0., 0., 0.));
        assert_relative_eq!(intensity.r, 1.);

        // just inside the outer cone the falloff has nearly run to zero
        let x = 2. * deg(29.9).tan();
        let (_, _, _, intensity) = light_setup(&spot, &Point3::new(x, 0., 0.));
        assert!(intensity.r < 1e-2);

        // midway through the band it is partially lit
        let x = 2. * deg(25.).tan();
        let (_, _, _, intensity) = light_setup(&spot, &Point3::new(x, 0., 0.));
        assert!(intensity.r > 0.1 && intensity.r < 0.9);

        // past the outer cone the original leaves the light untouched
        let x = 2. * deg(45.).tan();
        let (_, _, _, intensity) = light_setup(&spot, &Point3::new(x, 0., 0.));
        assert_relative_eq!(intensity.r, 1.);
    }

    fn deg(d: f32) -> f32 {
        crate::math::deg_to_rad(d)
    }
}
