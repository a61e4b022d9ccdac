use std::num::NonZeroUsize;
use std::time::Instant;

use anyhow::{Result, bail};
use clap::Parser;
use env_logger::Env;
use log::info;

use isocsg::{
    mesh::Settings,
    shape::Shape,
    shapes::{circle, rectangle, union_all},
    var::Var,
};

/// Builds and meshes a simple spur gear
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Number of teeth
    #[clap(short = 'n', long, default_value_t = 17)]
    teeth: usize,

    /// Pitch radius
    #[clap(short, long, default_value_t = 2.0)]
    radius: f64,

    /// Gear thickness (along Z)
    #[clap(long, default_value_t = 0.5)]
    thickness: f64,

    /// Samples per axis
    #[clap(short = 'R', long, default_value_t = 128)]
    resolution: usize,

    /// Number of threads to use
    #[clap(short, long, default_value_t = NonZeroUsize::new(8).unwrap())]
    threads: NonZeroUsize,
}

/// Builds the 2D gear profile
///
/// Teeth on one side of the Y axis are built by rotation, then mirrored to
/// the other side; this works for both odd and even tooth counts, since the
/// tooth at 0° lies on the mirror axis.
fn gear(teeth: usize, radius: f64) -> Result<Shape<2>> {
    if teeth < 3 {
        bail!("need at least 3 teeth, got {teeth}");
    }
    let module = 2.0 * radius / teeth as f64;
    let root = radius - 1.25 * module;
    let tip = radius + module;
    let width = std::f64::consts::PI * radius / teeth as f64 * 0.5;

    let tooth = rectangle(-width / 2.0, width / 2.0, root - module, tip)
        .intersection(&circle(0.0, 0.0, tip));
    let step = 360.0 / teeth as f64;
    let half: Vec<_> = (0..=teeth / 2)
        .map(|i| tooth.rotate(i as f64 * step))
        .collect();
    let half = union_all(&half)?;
    let teeth = half.union(&half.reflect(Var::X)?);

    let body = circle(0.0, 0.0, root).union(&teeth);
    let bore = circle(0.0, 0.0, radius * 0.25);
    Ok(body.difference(&bore).with_tag("gear"))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();
    let args = Args::parse();

    let start = Instant::now();
    let profile = gear(args.teeth, args.radius)?;
    let solid = profile.extrude(0.0, args.thickness)?;
    info!("Built shape in {:?}", start.elapsed());

    let settings = Settings {
        threads: args.threads.into(),
        ..Settings::default()
    };
    info!("Meshing with {} threads", settings.threads);

    let start = Instant::now();
    let contour = profile.contour(args.resolution, &settings)?;
    info!(
        "Contoured profile in {:?}: {} vertices, {} segments, {} loops",
        start.elapsed(),
        contour.vertices.len(),
        contour.segments.len(),
        contour.polylines().len()
    );

    let start = Instant::now();
    let mesh = solid.mesh(args.resolution, &settings)?;
    info!(
        "Meshed solid in {:?}: {} vertices, {} triangles",
        start.elapsed(),
        mesh.vertices.len(),
        mesh.triangles.len()
    );
    info!(
        "Surface area {:.4}, volume {:.4}",
        mesh.area(),
        mesh.volume()
    );
    Ok(())
}
