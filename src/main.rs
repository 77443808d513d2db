use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use mri_scan_sim::acquisition::AcquiredImage;
use mri_scan_sim::geometry::Point3;
use mri_scan_sim::{
    AppContext, ColorScale, Config, ImageGeometry, ScanParameters, ScanPlane, Session, TissueModel,
    Viewport,
};
use ndarray::{Array2, Array3};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Plan a scan on a synthetic phantom and save the acquired slices"
)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Axial, sagittal or coronal
    #[arg(long, default_value = "axial")]
    plane: String,
    #[arg(long, default_value = "SE")]
    technique: String,
    #[arg(long, default_value_t = 20.0)]
    te: f64,
    #[arg(long, default_value_t = 500.0)]
    tr: f64,
    #[arg(long, default_value_t = 0.0)]
    ti: f64,
    #[arg(long, default_value_t = 5)]
    slices: usize,
    /// Turn the volume in the planning view before scanning (degrees)
    #[arg(long, default_value_t = 0.0)]
    rotate: f64,
    #[arg(long, default_value = "out")]
    output: PathBuf,
}

/// Fluid-filled sphere inside a block of soft tissue, in air.
fn phantom() -> Result<TissueModel, Box<dyn Error>> {
    let dim = (64, 64, 64);
    let spacing = [4.0; 3];
    let centre = |n: usize| (n as f64 - 1.0) / 2.0;
    let radius = |(i, j, k): (usize, usize, usize)| {
        let (x, y, z) = (
            (i as f64 - centre(dim.0)) * spacing[0],
            (j as f64 - centre(dim.1)) * spacing[1],
            (k as f64 - centre(dim.2)) * spacing[2],
        );
        (x * x + y * y + z * z).sqrt()
    };
    let map = |fluid: f64, tissue: f64| {
        Array3::from_shape_fn(dim, |index| match radius(index) {
            r if r < 50.0 => fluid,
            r if r < 110.0 => tissue,
            _ => 0.0,
        })
    };
    Ok(TissueModel::new(
        map(4000.0, 900.0),
        map(2000.0, 90.0),
        map(1500.0, 50.0),
        map(1.0, 0.8),
        spacing,
    )?)
}

fn main() -> Result<(), Box<dyn Error>> {
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp_secs()
        .try_init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let scan_plane = ScanPlane::parse(&args.plane)
        .ok_or_else(|| format!("unknown scan plane {:?}", args.plane))?;
    let interaction = config.interaction.clone();
    let mut session = Session::new(AppContext::new(config), phantom()?);

    let parameters = ScanParameters {
        technique: args.technique.clone(),
        te_ms: args.te,
        tr_ms: args.tr,
        ti_ms: args.ti,
        scan_plane,
        n_slices: args.slices,
        fov_mm: [240.0, 240.0],
        matrix: [128, 128],
        ..ScanParameters::default()
    };
    let item = session.add_scan_item("phantom", parameters)?;

    if args.rotate != 0.0 {
        let mut bus = session.planning_bus(item, 0)?;
        let geometry =
            ImageGeometry::principal(scan_plane, Point3::origin(), [256.0, 256.0], [2.0, 2.0])?;
        let survey = AcquiredImage {
            data: Array2::zeros((geometry.rows(), geometry.columns())),
            geometry,
        };
        let viewport = Viewport::attach_new(&mut bus, survey, interaction);
        viewport.borrow_mut().drag_rotate(&mut bus, args.rotate.to_radians())?;
        drop(viewport);
        let rotations = bus.volume().get_rotations().to_degrees();
        log::info!("Planned rotations RL/AP/FH: {rotations:?}");
        session.store_plan(item, 0, bus.into_volume())?;
    }

    let series = session.scan(item)?;
    std::fs::create_dir_all(&args.output)?;
    for (index, image) in series.images.iter().enumerate() {
        let path = args.output.join(format!("{}_{index:03}.png", series.name));
        let gray = image
            .to_gray_image(&ColorScale::fit(&image.data))
            .ok_or("image buffer does not match its dimensions")?;
        gray.save(&path)?;
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}
