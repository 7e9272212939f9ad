//! A CLI tool for inspecting and repairing the geometry of NIfTI-1 volumes.
use clap::{Parser, Subcommand};
use nifti_geometry::{
    split_filename, GeometryError, OrientationCode, Provenance, SplineOrder, VolumeReader,
    VolumeWriter,
};
use std::path::PathBuf;
use tracing::Level;

/// Exit code for when an error emerged while reading the volume.
const ERROR_READ: i32 = -2;
/// Exit code for when an error emerged while transforming the volume.
const ERROR_TRANSFORM: i32 = -3;
/// Exit code for when an error emerged while writing the volume.
const ERROR_WRITE: i32 = -4;

/// Inspect and repair the geometry of NIfTI-1 volumes
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    #[command(subcommand)]
    command: Command,

    /// Verbose mode
    #[clap(short = 'v', long = "verbose", global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the geometry of a volume, before and after header repair
    Info {
        file: PathBuf,
    },
    /// Write a volume with its header repaired
    Rectify {
        file: PathBuf,
        /// The output directory
        #[clap(short = 'o', long = "output")]
        output: PathBuf,
    },
    /// Bring a volume to another spacing and orientation, then back to
    /// its original geometry
    Regrid {
        file: PathBuf,
        /// The output directory
        #[clap(short = 'o', long = "output")]
        output: PathBuf,
        /// Grid spacings used in between, in millimetres
        #[clap(long = "pixdim", value_delimiter = ',')]
        pixdim: Vec<f64>,
        /// Orientation used in between (e.g. RAS)
        #[clap(long = "axcodes")]
        axcodes: Option<String>,
        /// Spline interpolation order (0 to 5)
        #[clap(long = "order", default_value = "3")]
        order: u8,
    },
}

fn main() {
    let App { command, verbose } = App::parse();

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
            .finish(),
    )
    .unwrap_or_else(|e| {
        eprintln!("{}", e);
    });

    let outcome = match command {
        Command::Info { file } => info(file),
        Command::Rectify { file, output } => rectify(file, output),
        Command::Regrid {
            file,
            output,
            pixdim,
            axcodes,
            order,
        } => regrid(file, output, pixdim, axcodes, order),
    };
    if let Err((code, e)) = outcome {
        eprintln!("[ERROR] {}", e);
        std::process::exit(code);
    }
}

type CliResult = Result<(), (i32, GeometryError)>;

fn info(file: PathBuf) -> CliResult {
    let raw = VolumeReader::new().load(&file).map_err(|e| (ERROR_READ, e))?;
    let header = &raw.header;
    let (rectified, outcome) = nifti_geometry::rectify(header.clone());

    println!("{}", file.display());
    println!("  shape:   {:?}", header.shape);
    println!("  pixdim:  {:?}", header.pixdim);
    match header.axcodes() {
        Ok(codes) => println!("  axcodes: {}", codes),
        Err(e) => println!("  axcodes: ({})", e),
    }
    println!("  affine:{}", rectified.affine);
    println!("  repair:  {:?}", outcome);
    Ok(())
}

fn rectify(file: PathBuf, output: PathBuf) -> CliResult {
    let image = VolumeReader::new().read_file(&file).map_err(|e| (ERROR_READ, e))?;
    let (_, name, ext) = split_filename(&file);
    VolumeWriter::new()
        .save_volume_5d(&image.data, &format!("{}{}", name, ext), &output, &image.header.affine)
        .map_err(|e| (ERROR_WRITE, e))?;
    Ok(())
}

fn regrid(
    file: PathBuf,
    output: PathBuf,
    pixdim: Vec<f64>,
    axcodes: Option<String>,
    order: u8,
) -> CliResult {
    let order = SplineOrder::from_order(order).map_err(|e| (ERROR_TRANSFORM, e))?;
    let axcodes = match axcodes {
        Some(codes) => codes
            .parse::<OrientationCode>()
            .map_err(|e| (ERROR_TRANSFORM, e))?,
        None => OrientationCode::default(),
    };

    let image = VolumeReader::new().read_file(&file).map_err(|e| (ERROR_READ, e))?;
    let provenance = Provenance::from_header(&image.header)
        .map_err(|e| (ERROR_TRANSFORM, e))?
        .with_output_pixdim(pixdim)
        .with_output_axcodes(axcodes);
    let regridded = provenance
        .to_output(image.data, order)
        .map_err(|e| (ERROR_TRANSFORM, e))?;
    tracing::info!("Regridded to shape {:?}", regridded.shape());

    let (_, name, ext) = split_filename(&file);
    VolumeWriter::new()
        .interp_order(order)
        .write(
            Some(regridded),
            &format!("{}_regrid{}", name, ext),
            &output,
            Some(&provenance),
        )
        .map_err(|e| (ERROR_WRITE, e))?;
    Ok(())
}
