//! Labelforge: rasterize vector annotations into dataset formats.
//!
//! Labelforge reads per-image label files (polygons, rectangles, circles,
//! lines, points and linestrips drawn in an annotation editor) and exports
//! them as pixel-accurate training data:
//!
//! - a flat class-index pixel map per image (`PixelMap/`),
//! - a VOC-style layout, either detection XML or segmentation rasters (`VOC/`),
//! - one COCO instance-segmentation document with RLE masks (`COCO/`).
//!
//! # Modules
//!
//! - [`ir`]: Annotation model and label-file reader
//! - [`registry`]: Dataset-wide label to class-id table
//! - [`raster`]: Shape rasterization, label rasters and COCO RLE
//! - [`instance`]: Grouping shapes into annotated instances
//! - [`encode`]: Format encoders
//! - [`export`]: Planning, output layout and the export loop
//! - [`error`]: Error types for labelforge operations

pub mod encode;
pub mod error;
pub mod export;
pub mod instance;
pub mod ir;
pub mod raster;
pub mod registry;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use error::LabelforgeError;
pub use export::{export_dataset, plan_export, ExportFormat, ExportOptions, ExportPlan};

use export::layout::OutputLayout;
use export::source::LabelDirSource;

/// The labelforge CLI application.
#[derive(Parser)]
#[command(name = "labelforge")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Only log warnings and errors.
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Export annotated images as a dataset.
    Export(ExportArgs),
    /// Show what an export would do without writing anything.
    Plan(PlanArgs),
}

/// Where the images come from.
#[derive(clap::Args)]
struct InputArgs {
    /// Images, label files, or directories of images.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output format ('pixel-map', 'voc', or 'coco').
    #[arg(long, short)]
    format: String,

    /// Directory holding the label files, if not next to the images.
    #[arg(long)]
    labels_dir: Option<PathBuf>,

    /// Keep only images whose path contains this substring.
    #[arg(long)]
    pattern: Option<String>,
}

/// Arguments for the export subcommand.
#[derive(clap::Args)]
struct ExportArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output root directory; the format subtree is created inside it.
    #[arg(long, short, env = "LABELFORGE_OUTPUT")]
    output: PathBuf,

    /// Print the plan and the target subtree, then stop.
    #[arg(long)]
    dry_run: bool,

    /// Replace the format subtree if it already exists.
    #[arg(long)]
    overwrite: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    report: String,
}

/// Arguments for the plan subcommand.
#[derive(clap::Args)]
struct PlanArgs {
    #[command(flatten)]
    input: InputArgs,
}

/// Run the labelforge CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), LabelforgeError> {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    match cli.command {
        Some(Commands::Export(args)) => run_export(args),
        Some(Commands::Plan(args)) => run_plan(args),
        None => {
            println!("labelforge {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Rasterize vector annotations into pixel map, VOC and COCO datasets.");
            println!();
            println!("Run 'labelforge --help' for usage information.");
            Ok(())
        }
    }
}

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init();
}

/// Build the source and the plan shared by both subcommands.
fn load_plan(input: &InputArgs) -> Result<(LabelDirSource, ExportFormat, ExportPlan), LabelforgeError> {
    let format: ExportFormat = input.format.parse()?;
    let source = LabelDirSource::from_inputs(
        &input.inputs,
        input.labels_dir.as_deref(),
        input.pattern.as_deref(),
    )?;
    let plan = plan_export(&source, format)?;
    Ok((source, format, plan))
}

/// Execute the plan subcommand.
fn run_plan(args: PlanArgs) -> Result<(), LabelforgeError> {
    let (_, _, plan) = load_plan(&args.input)?;
    print!("{}", plan);
    Ok(())
}

/// Execute the export subcommand.
fn run_export(args: ExportArgs) -> Result<(), LabelforgeError> {
    let report_format = match args.report.as_str() {
        "text" | "json" => args.report.as_str(),
        other => {
            return Err(LabelforgeError::UnsupportedFormat(format!(
                "report format '{}' (supported: text, json)",
                other
            )))
        }
    };

    let (source, format, plan) = load_plan(&args.input)?;
    let target = OutputLayout::new(&args.output, format.subtree(), &[]);
    target.validate()?;

    if args.dry_run {
        print!("{}", plan);
        if target.exists() {
            println!("Would replace {}", target.dir().display());
        } else {
            println!("Would create {}", target.dir().display());
        }
        return Ok(());
    }

    if target.exists() && !args.overwrite {
        return Err(LabelforgeError::OutputExists { path: target.dir() });
    }

    let options = ExportOptions {
        format,
        output_dir: args.output,
    };
    let report = export::run_plan(&source, &plan, &options)?;

    if report_format == "json" {
        let json = serde_json::to_string_pretty(&report).map_err(std::io::Error::other)?;
        println!("{}", json);
    } else {
        print!("{}", report);
    }
    Ok(())
}
