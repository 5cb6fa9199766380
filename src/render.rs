use std::{sync::Arc, thread};

use crossbeam::channel::{unbounded, Receiver};
use log::debug;

use crate::{
    canvas::{Canvas, Color},
    scene::Scene,
    texture::TextureSet,
    tracer::RayTracer,
};

pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        ConfigBuilder {
            config: Config {
                jobs: 1,
                shadows: true,
                reflections: true,
                refraction: false,
                texture_map: true,
                texture_filter: false,
                parallelism: true,
                supersample: false,
                acceleration: false,
                depth_of_field: false,
            },
        }
    }
}

impl ConfigBuilder {
    pub fn set_jobs(mut self, jobs: usize) -> Self {
        self.config.jobs = usize::max(jobs, 1);
        self
    }

    pub fn set_shadows(mut self, enabled: bool) -> Self {
        self.config.shadows = enabled;
        self
    }

    pub fn set_reflections(mut self, enabled: bool) -> Self {
        self.config.reflections = enabled;
        self
    }

    pub fn set_refraction(mut self, enabled: bool) -> Self {
        self.config.refraction = enabled;
        self
    }

    pub fn set_texture_map(mut self, enabled: bool) -> Self {
        self.config.texture_map = enabled;
        self
    }

    pub fn set_texture_filter(mut self, enabled: bool) -> Self {
        self.config.texture_filter = enabled;
        self
    }

    pub fn set_parallelism(mut self, enabled: bool) -> Self {
        self.config.parallelism = enabled;
        self
    }

    pub fn set_supersample(mut self, enabled: bool) -> Self {
        self.config.supersample = enabled;
        self
    }

    pub fn set_acceleration(mut self, enabled: bool) -> Self {
        self.config.acceleration = enabled;
        self
    }

    pub fn set_depth_of_field(mut self, enabled: bool) -> Self {
        self.config.depth_of_field = enabled;
        self
    }

    pub fn build(self) -> Arc<Config> {
        Arc::new(self.config)
    }
}

/// Render toggles handed in from the outside. Only the shadow, reflection,
/// and texture flags change this renderer's output; the rest are accepted for
/// interface compatibility and currently inert.
#[derive(Debug)]
pub struct Config {
    pub jobs: usize,
    pub shadows: bool,
    pub reflections: bool,
    pub refraction: bool,
    pub texture_map: bool,
    pub texture_filter: bool,
    pub parallelism: bool,
    pub supersample: bool,
    pub acceleration: bool,
    pub depth_of_field: bool,
}

pub struct RenderedRow {
    pub y: usize,
    pub row: Vec<Color>,
}

/// Start the render workers and return the channel their finished rows
/// arrive on. Worker `i` renders the rows with `row % jobs == i`; rows are
/// independent, so the split never changes the image.
pub fn render(scene: Arc<Scene>, config: Arc<Config>) -> Receiver<RenderedRow> {
    let textures = Arc::new(if config.texture_map {
        TextureSet::load(&scene)
    } else {
        TextureSet::empty(scene.shapes().len())
    });

    let jobs = if config.parallelism {
        config.jobs.max(1)
    } else {
        1
    };
    debug!("rendering with {jobs} worker(s)");

    let (send, recv) = unbounded();

    for i in 0..jobs {
        let scene = scene.clone();
        let config = config.clone();
        let textures = textures.clone();
        let send = send.clone();

        thread::spawn(move || {
            let tracer = RayTracer::new(&scene, &config, &textures);
            let width = scene.width();

            for y in (i..scene.height() as usize).step_by(jobs) {
                let mut row = Vec::with_capacity(width as usize);
                for x in 0..width {
                    row.push(tracer.trace_pixel(y as u32, x));
                }
                if send.send(RenderedRow { y, row }).is_err() {
                    // the receiver hung up; nothing left to do
                    return;
                }
            }
        });
    }

    recv
}

/// Collect every row into a canvas.
pub fn write_canvas(scene: &Scene, recv: Receiver<RenderedRow>) -> Canvas {
    let mut canvas = Canvas::new(scene.width(), scene.height());

    for _ in 0..scene.height() {
        let row = recv.recv().expect("Failed to read all rows!");
        canvas.blit_row(row.y, row.row);
    }

    canvas
}

/// Render a scene to a finished canvas.
pub fn render_to_canvas(scene: Arc<Scene>, config: Arc<Config>) -> Canvas {
    let recv = render(scene.clone(), config);
    write_canvas(&scene, recv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        camera::Camera,
        scene::{GlobalCoefficients, Light, Material, Primitive, ShapeInstance},
        transform::Transform,
    };
    use nalgebra::{Point3, Vector3};

    fn small_scene() -> Arc<Scene> {
        let camera = Camera::new(
            Point3::new(0., 0., 5.),
            Vector3::new(0., 0., -1.),
            Vector3::new(0., 1., 0.),
            std::f32::consts::FRAC_PI_4,
        );
        let mut scene = Scene::new(24, 16, camera, GlobalCoefficients {
            ka: 0.2,
            kd: 0.8,
            ks: 1.,
        });
        scene.add_shape(ShapeInstance {
            primitive: Primitive::Sphere,
            material: Material::default()
                .with_ambient(Color::new(0.1, 0.1, 0.1))
                .with_diffuse(Color::new(0.9, 0.4, 0.2)),
            ctm: Transform::new(),
        });
        scene.add_light(Light::Directional {
            color: Color::white(),
            direction: Vector3::new(-0.5, -1., -1.),
        });
        Arc::new(scene)
    }

    #[test]
    fn test_worker_count_does_not_change_output() {
        let scene = small_scene();

        let serial = render_to_canvas(scene.clone(), ConfigBuilder::default().set_jobs(1).build());
        let parallel = render_to_canvas(scene.clone(), ConfigBuilder::default().set_jobs(3).build());

        assert_eq!(serial.data(), parallel.data());
    }

    #[test]
    fn test_parallelism_flag_forces_one_worker() {
        let scene = small_scene();

        let config = ConfigBuilder::default()
            .set_jobs(8)
            .set_parallelism(false)
            .build();
        let canvas = render_to_canvas(scene.clone(), config);
        assert_eq!(canvas.width(), 24);
        assert_eq!(canvas.height(), 16);
    }
}
