use clap::Parser;
use tracing_subscriber::EnvFilter;

use terramask::tabular::merge_files;

/// Outer join of two CSV files on a shared column.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Input CSV file 1
    #[arg(long)]
    icsv1: String,

    /// Input CSV file 2
    #[arg(long)]
    icsv2: String,

    /// The label of the column that the merge will be based on
    #[arg(long)]
    label: String,

    /// The name of the output merged CSV file
    #[arg(long)]
    ocsv: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    println!("icsv1 = {}", args.icsv1);
    println!("icsv2 = {}", args.icsv2);
    println!("label = {}", args.label);
    println!("ocsv  = {}", args.ocsv);

    let merged = merge_files(&args.icsv1, &args.icsv2, &args.label, &args.ocsv)?;
    println!("{} rows written to {}", merged.rows().len(), args.ocsv);

    Ok(())
}
