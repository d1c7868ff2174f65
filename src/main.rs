use std::path::PathBuf;

use chrono::Datelike;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use terramask::config::Config;
use terramask::export::export_image;
use terramask::indices::{SpectralIndex, add_indices};
use terramask::readers::open_image;
use terramask::{ImageCollection, Masks, Session, TimeSeries, diagnostics};

#[derive(Parser, Debug)]
#[command(version, about = "Region masks and spectral indices over a local raster catalogue")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the combined mask of the configured region
    Mask {
        #[arg(short, long)]
        config: PathBuf,

        /// Image directory to mask with the combined mask
        #[arg(short, long, requires = "out")]
        image: Option<PathBuf>,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Add spectral index bands to an image
    Indices {
        #[arg(short, long, required_unless_present = "list")]
        image: Option<PathBuf>,

        #[arg(short, long, required_unless_present = "list")]
        out: Option<PathBuf>,

        /// Indices to compute, all of them when omitted
        #[arg(long = "index", value_name = "NAME")]
        indices: Vec<SpectralIndex>,

        /// Print the available indices and exit
        #[arg(long)]
        list: bool,
    },

    /// Masked monthly composites of the configured collection
    Monthly {
        #[arg(short, long)]
        config: PathBuf,

        /// Year to composite, the year of start_date when omitted
        #[arg(short, long)]
        year: Option<i32>,

        #[arg(short, long)]
        out: PathBuf,
    },

    /// Load every catalogue product and report on it
    Diagnose {
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Mask { config, image, out } => {
            let config = Config::from_file(config)?;
            let session = Session::connect(config.catalog())?;
            let mut masks = Masks::new(&session, config.region(), config.masks())?;

            let combined = masks.calculate_combined_mask()?;
            println!(
                "Combined mask keeps {} of {} pixels",
                combined.count(),
                combined.grid().len()
            );

            if let (Some(image), Some(out)) = (image, out) {
                let masked = masks.update_combined_mask(&open_image(image)?)?;
                let path = export_image(&masked, out)?;
                println!("Masked image written to {}", path.display());
            }

            if let Some(export) = config.export() {
                let id = masks.export_combined_mask(
                    &session,
                    export.scale,
                    &export.description,
                    &export.folder,
                )?;
                info!("combined mask export submitted as task {}", id);
            }

            report_tasks(&session);
        }

        Command::Indices {
            image,
            out,
            indices,
            list,
        } => {
            if list {
                for index in SpectralIndex::ALL {
                    let bands: Vec<_> = index.bands().iter().map(|b| b.to_string()).collect();
                    println!("{:<8} {}", index.name(), bands.join(", "));
                }
                return Ok(());
            }

            let (Some(image), Some(out)) = (image, out) else {
                return Err("--image and --out are required".into());
            };
            let indices = if indices.is_empty() {
                SpectralIndex::ALL.to_vec()
            } else {
                indices
            };

            let image = add_indices(open_image(image)?, &indices)?;
            let path = export_image(&image, out)?;
            println!("{} bands written to {}", image.bands().len(), path.display());
        }

        Command::Monthly { config, year, out } => {
            let config = Config::from_file(config)?;
            let dir = config
                .collection()
                .ok_or("the configuration has no collection directory")?;
            let session = Session::connect(config.catalog())?;
            let mut masks = Masks::new(&session, config.region(), config.masks())?;

            let end = config.end_date().succ_opt().unwrap_or(config.end_date());
            let collection = ImageCollection::load(dir)?.filter_date(config.start_date(), end);
            info!("{} scenes in the configured period", collection.len());

            let masked = collection.try_map(|image| masks.update_combined_mask(image))?;
            let year = year.unwrap_or(config.start_date().year());
            let monthly = masked.by_month(year)?;

            for composite in monthly.iter() {
                let month = composite.property("month").unwrap_or_default() as u32;
                let path = export_image(composite, out.join(format!("{}{:02}01", year, month)))?;
                println!("Composite {}-{:02} written to {}", year, month, path.display());
            }
            if monthly.is_empty() {
                println!("No scenes in {}", year);
            }

            report_tasks(&session);
        }

        Command::Diagnose { config } => {
            let config = Config::from_file(config)?;
            let session = Session::connect(config.catalog())?;
            let checks = diagnostics::smoke_test(&session);
            for check in &checks {
                println!("{}", check);
            }
            if checks.iter().any(|c| !c.is_ok()) {
                return Err("some products could not be loaded".into());
            }
        }
    }

    Ok(())
}

/// Waits for the background exports and prints their final state.
fn report_tasks(session: &Session) {
    for task in session.wait_all() {
        println!("Task {} ({}): {}", task.id, task.description, task.state);
    }
}
