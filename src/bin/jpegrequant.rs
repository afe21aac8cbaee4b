//! jpegrequant CLI - change the quality of a baseline JPEG without a pixel
//! round trip.

use clap::{ArgAction, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use jpeg_requant::jpeg_marker_code::JpegMarkerCode;
use jpeg_requant::{RequantizationPath, TranscodeOptions};

/// Coefficient-domain JPEG requantizer
#[derive(Parser)]
#[command(name = "jpegrequant")]
#[command(version)]
#[command(about = "Rescale the quantization tables of a JPEG and requantize its coefficients", long_about = None)]
#[command(after_help = "EXAMPLES:
    jpegrequant transcode -i photo.jpg -o smaller.jpg -q 30
    jpegrequant transcode -i photo.jpg -o smaller.jpg -q 30 --spatial
    jpegrequant info -i photo.jpg

Set RUST_LOG (e.g. RUST_LOG=jpeg_requant=trace) to override -v.")]
struct Cli {
    /// Raise the log level (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Requantize a JPEG at a new quality
    ///
    /// Quality 50 keeps the file's own tables; lower values coarsen them and
    /// higher values refine them. The output file is only written on success.
    #[command(visible_alias = "t")]
    Transcode {
        /// Input JPEG file
        #[arg(short, long, help = "Path to the input JPEG")]
        input: PathBuf,

        /// Output JPEG file
        #[arg(short, long, help = "Path for the requantized JPEG")]
        output: PathBuf,

        /// Quality level (1-100)
        #[arg(short, long, default_value = "50", value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,

        /// Requantize through an inverse and forward DCT instead of directly
        #[arg(long)]
        spatial: bool,
    },

    /// Display the marker segments, components and quantization tables
    #[command(visible_alias = "i")]
    Info {
        /// Input file path
        #[arg(short, long, help = "Path to the JPEG to inspect")]
        input: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Transcode {
            input,
            output,
            quality,
            spatial,
        } => transcode_image(&input, &output, quality, spatial),
        Commands::Info { input } => show_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn transcode_image(
    input: &PathBuf,
    output: &PathBuf,
    quality: u8,
    spatial: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = TranscodeOptions {
        quality,
        path: if spatial {
            RequantizationPath::Spatial
        } else {
            RequantizationPath::Coefficient
        },
    };
    let report = jpeg_requant::transcode_file(input, output, &options)?;
    println!(
        "✓ Requantized {} blocks at quality {} ({} -> {} bytes) to {:?}",
        report.blocks, report.quality, report.input_size, report.output_size, output
    );
    Ok(())
}

fn show_info(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let parsed = jpeg_requant::parse_jpeg(&data)?;

    println!("File: {:?}", input);
    println!("Size: {} bytes", data.len());
    println!();

    println!("Segments:");
    for segment in &parsed.segments {
        println!(
            "  {:<6} {} bytes",
            JpegMarkerCode::name(segment.marker),
            segment.payload.len()
        );
    }
    println!("  entropy-coded data: {} bytes", parsed.entropy_data.len());

    let frame = parsed.frame_header()?;
    println!();
    println!("Frame: {}", JpegMarkerCode::name(frame.marker));
    println!("  Dimensions: {}x{}", frame.width, frame.height);
    println!("  Precision:  {} bits", frame.precision);
    for component in &frame.components {
        println!(
            "  Component {}: sampling {}x{}, quantization table {}",
            component.id, component.h_samp_factor, component.v_samp_factor, component.quant_table_dest
        );
    }

    if let Ok(scan) = parsed.scan_header() {
        println!();
        println!("Scan: Ss={} Se={} Ah/Al={:#04x}", scan.spectral_start, scan.spectral_end, scan.successive_approximation);
        for component in &scan.components {
            println!(
                "  Component {}: DC table {}, AC table {}",
                component.id, component.dc_table_dest, component.ac_table_dest
            );
        }
    }

    for table in parsed.defined_quantization_tables() {
        println!();
        println!("Quantization table {} ({:?}):", table.id, table.precision);
        for row in &table.values {
            let cells: Vec<String> = row.iter().map(|v| format!("{:4}", v)).collect();
            println!("  {}", cells.join(""));
        }
    }
    Ok(())
}
