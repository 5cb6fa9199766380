use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::info;
use nalgebra::{Point3, Vector3};

use luster::{
    camera::Camera,
    canvas::Color,
    math::deg_to_rad,
    render::{self, ConfigBuilder},
    scene::{
        Attenuation, GlobalCoefficients, Light, Material, Primitive, Scene, ShapeInstance,
        TextureMap,
    },
    transform::Transform,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Demo {
    /// One of each primitive on a reflective floor.
    Primitives,
    /// A sphere and cone inside a mirror-walled room.
    Mirrors,
    /// A spot light over a cylinder, showing the penumbra band.
    Spot,
}

#[derive(Debug, Parser)]
#[command(about = "Offline Phong ray tracer")]
struct Opts {
    /// Output image path.
    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,

    #[arg(long, default_value_t = 512)]
    width: u32,

    #[arg(long, default_value_t = 512)]
    height: u32,

    /// Worker threads; defaults to the number of cpus.
    #[arg(long)]
    jobs: Option<usize>,

    /// Which built-in demo scene to render.
    #[arg(long, value_enum, default_value = "primitives")]
    scene: Demo,

    #[arg(long)]
    no_shadows: bool,

    #[arg(long)]
    no_reflections: bool,

    /// Texture file applied to the demo sphere.
    #[arg(long)]
    texture: Option<PathBuf>,

    /// Also print an ascii preview to stdout.
    #[arg(long)]
    ascii: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();

    let scene = Arc::new(build_scene(&opts));
    let config = ConfigBuilder::default()
        .set_jobs(opts.jobs.unwrap_or_else(num_cpus::get))
        .set_shadows(!opts.no_shadows)
        .set_reflections(!opts.no_reflections)
        .set_texture_map(opts.texture.is_some())
        .build();

    let start = Instant::now();
    let canvas = render::render_to_canvas(scene.clone(), config);
    info!(
        "rendered {}x{} in {:.2?}",
        canvas.width(),
        canvas.height(),
        start.elapsed()
    );

    if opts.ascii {
        println!("{}", canvas.to_ascii());
    }

    image::save_buffer(
        &opts.output,
        &canvas.data(),
        canvas.width(),
        canvas.height(),
        image::ColorType::Rgba8,
    )
    .with_context(|| format!("failed to write `{}`", opts.output.display()))?;
    info!("wrote {}", opts.output.display());

    Ok(())
}

fn build_scene(opts: &Opts) -> Scene {
    match opts.scene {
        Demo::Primitives => primitives_demo(opts),
        Demo::Mirrors => mirrors_demo(opts),
        Demo::Spot => spot_demo(opts),
    }
}

fn globals() -> GlobalCoefficients {
    GlobalCoefficients {
        ka: 0.5,
        kd: 0.6,
        ks: 0.6,
    }
}

fn sphere_material(opts: &Opts) -> Material {
    let mut material = Material::default()
        .with_ambient(Color::new(0.2, 0.05, 0.05))
        .with_diffuse(Color::new(0.9, 0.2, 0.2))
        .with_specular(Color::white(), 25.);
    if let Some(path) = &opts.texture {
        material = material.with_texture(TextureMap::new(path.clone(), 0.6));
    }
    material
}

fn primitives_demo(opts: &Opts) -> Scene {
    let camera = Camera::look_at(
        Point3::new(3.5, 2.5, 5.5),
        Point3::new(0., 0., 0.),
        Vector3::new(0., 1., 0.),
        deg_to_rad(35.),
    );
    let mut scene = Scene::new(opts.width, opts.height, camera, globals());

    // floor: a flattened cube with a mirror sheen
    scene.add_shape(ShapeInstance {
        primitive: Primitive::Cube,
        material: Material::default()
            .with_ambient(Color::new(0.1, 0.1, 0.12))
            .with_diffuse(Color::new(0.5, 0.5, 0.55))
            .with_reflective(Color::new(0.3, 0.3, 0.3)),
        ctm: Transform::new()
            .scale(&Vector3::new(10., 0.1, 10.))
            .translate(&Vector3::new(0., -0.8, 0.)),
    });

    scene.add_shape(ShapeInstance {
        primitive: Primitive::Sphere,
        material: sphere_material(opts),
        ctm: Transform::new()
            .uniform_scale(1.5)
            .translate(&Vector3::new(-1.1, 0., 0.)),
    });

    scene.add_shape(ShapeInstance {
        primitive: Primitive::Cube,
        material: Material::default()
            .with_ambient(Color::new(0.05, 0.15, 0.05))
            .with_diffuse(Color::new(0.2, 0.8, 0.3))
            .with_specular(Color::white(), 10.),
        ctm: Transform::new()
            .rotate(&Vector3::new(0., deg_to_rad(30.), 0.))
            .translate(&Vector3::new(1.1, -0.25, 0.)),
    });

    scene.add_shape(ShapeInstance {
        primitive: Primitive::Cylinder,
        material: Material::default()
            .with_ambient(Color::new(0.05, 0.05, 0.15))
            .with_diffuse(Color::new(0.25, 0.35, 0.9))
            .with_specular(Color::white(), 40.),
        ctm: Transform::new()
            .scale(&Vector3::new(0.8, 1.4, 0.8))
            .translate(&Vector3::new(0.2, -0.05, -1.6)),
    });

    scene.add_shape(ShapeInstance {
        primitive: Primitive::Cone,
        material: Material::default()
            .with_ambient(Color::new(0.15, 0.12, 0.02))
            .with_diffuse(Color::new(0.95, 0.75, 0.1)),
        ctm: Transform::new()
            .scale(&Vector3::new(1.2, 1.2, 1.2))
            .translate(&Vector3::new(0., -0.15, 1.6)),
    });

    scene.add_light(Light::Directional {
        color: Color::new(0.35, 0.35, 0.35),
        direction: Vector3::new(-1., -2., -1.),
    });
    scene.add_light(Light::Point {
        color: Color::white(),
        position: Point3::new(4., 5., 3.),
        attenuation: Attenuation {
            constant: 1.,
            linear: 0.02,
            quadratic: 0.002,
        },
    });

    scene
}

fn mirrors_demo(opts: &Opts) -> Scene {
    let camera = Camera::look_at(
        Point3::new(0., 0.4, 2.6),
        Point3::new(0., -0.2, 0.),
        Vector3::new(0., 1., 0.),
        deg_to_rad(50.),
    );
    let mut scene = Scene::new(opts.width, opts.height, camera, globals());

    // the room itself: camera and shapes sit inside this cube
    scene.add_shape(ShapeInstance {
        primitive: Primitive::Cube,
        material: Material::default()
            .with_ambient(Color::new(0.05, 0.05, 0.05))
            .with_diffuse(Color::new(0.15, 0.15, 0.2))
            .with_reflective(Color::new(0.8, 0.8, 0.8)),
        ctm: Transform::new().uniform_scale(8.),
    });

    scene.add_shape(ShapeInstance {
        primitive: Primitive::Sphere,
        material: sphere_material(opts),
        ctm: Transform::new().translate(&Vector3::new(-0.5, -0.5, 0.)),
    });

    scene.add_shape(ShapeInstance {
        primitive: Primitive::Cone,
        material: Material::default()
            .with_ambient(Color::new(0.02, 0.1, 0.1))
            .with_diffuse(Color::new(0.1, 0.7, 0.7))
            .with_specular(Color::white(), 15.),
        ctm: Transform::new().translate(&Vector3::new(0.6, -0.5, -0.4)),
    });

    scene.add_light(Light::Point {
        color: Color::white(),
        position: Point3::new(0., 3., 1.),
        attenuation: Attenuation {
            constant: 1.,
            linear: 0.1,
            quadratic: 0.01,
        },
    });

    scene
}

fn spot_demo(opts: &Opts) -> Scene {
    let camera = Camera::look_at(
        Point3::new(0., 2., 6.),
        Point3::new(0., 0., 0.),
        Vector3::new(0., 1., 0.),
        deg_to_rad(30.),
    );
    let mut scene = Scene::new(opts.width, opts.height, camera, globals());

    scene.add_shape(ShapeInstance {
        primitive: Primitive::Cube,
        material: Material::default()
            .with_ambient(Color::new(0.08, 0.08, 0.08))
            .with_diffuse(Color::new(0.7, 0.7, 0.7)),
        ctm: Transform::new()
            .scale(&Vector3::new(12., 0.1, 12.))
            .translate(&Vector3::new(0., -1., 0.)),
    });

    scene.add_shape(ShapeInstance {
        primitive: Primitive::Cylinder,
        material: Material::default()
            .with_ambient(Color::new(0.1, 0.06, 0.03))
            .with_diffuse(Color::new(0.8, 0.5, 0.25))
            .with_specular(Color::white(), 30.),
        ctm: Transform::new().scale(&Vector3::new(1., 1.9, 1.)),
    });

    scene.add_light(Light::Spot {
        color: Color::white(),
        position: Point3::new(0., 5., 0.5),
        direction: Vector3::new(0., -1., -0.1).normalize(),
        attenuation: Attenuation {
            constant: 1.,
            linear: 0.05,
            quadratic: 0.,
        },
        angle: deg_to_rad(25.),
        penumbra: deg_to_rad(8.),
    });
    scene.add_light(Light::Directional {
        color: Color::new(0.12, 0.12, 0.15),
        direction: Vector3::new(1., -1., -1.),
    });

    scene
}
