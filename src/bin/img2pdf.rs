//! img2pdf CLI
//!
//! Lays out the given images into a single PDF, one image per page, and
//! saves it to the chosen destination.

use clap::Parser;
use img2pdf::{ensure_pdf_extension, save_pdf, Opener, PageComposer};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// img2pdf - Put images on A4 pages and save them as one PDF
#[derive(Parser, Debug)]
#[command(name = "img2pdf")]
#[command(version, about, long_about = None)]
struct Args {
    /// Images to convert, one page each, in page order
    #[arg(required = true)]
    filenames: Vec<PathBuf>,

    /// Output filename (".pdf" is appended if missing)
    #[arg(short, long)]
    output_filename: Option<PathBuf>,

    /// Document title (defaults to the output file name)
    #[arg(long)]
    title: Option<String>,

    /// Open the PDF in the default viewer once saved
    #[arg(long)]
    open: bool,

    /// Enable debug mode
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let missing: Vec<&PathBuf> = args.filenames.iter().filter(|p| !p.exists()).collect();
    if !missing.is_empty() {
        for path in missing {
            eprintln!("Error: File not found: {}", path.display());
        }
        std::process::exit(1);
    }

    let output_path = match args.output_filename {
        Some(ref output) => ensure_pdf_extension(output),
        None => generate_output_filename(&args.filenames[0]),
    };
    let title = args
        .title
        .clone()
        .unwrap_or_else(|| document_title(&output_path));

    println!("Selected images: {}", args.filenames.len());
    println!("Output: {}", output_path.display());

    match convert_images(&args.filenames, &output_path, &title) {
        Ok(pages) => {
            println!("✓ Saved {} page(s) to {}", pages, output_path.display());
        }
        Err(e) => {
            eprintln!("✗ Conversion failed: {}", e);
            std::process::exit(1);
        }
    }

    if args.open {
        // The document is already saved; a viewer failure is not fatal.
        if let Err(e) = Opener::detect().open(&output_path) {
            warn!("Could not open {}: {}", output_path.display(), e);
        }
    }

    Ok(())
}

fn convert_images(
    filenames: &[PathBuf],
    output_path: &Path,
    title: &str,
) -> Result<usize, Box<dyn std::error::Error>> {
    info!("Converting {} image(s)", filenames.len());

    let pdf = PageComposer::new().title(title).compose(filenames)?;
    save_pdf(&pdf, output_path)?;

    Ok(pdf.page_count())
}

fn generate_output_filename(first_input: &Path) -> PathBuf {
    let mut output = first_input.to_path_buf();

    let stem = first_input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("images");

    output.set_file_name(format!("{}.pdf", stem));

    output
}

fn document_title(output_path: &Path) -> String {
    output_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(img2pdf::composer::DEFAULT_TITLE)
        .to_string()
}
