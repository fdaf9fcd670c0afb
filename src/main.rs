use clap::{Parser, Subcommand};
use log::Level;
use std::path::{Path, PathBuf};
use svg_export::{batch, config, imaging, output};

#[derive(Parser)]
#[command(name = "svg-export")]
#[command(about = "Rasterize SVG artwork to PNG, JPEG, or TIFF with print DPI metadata")]
#[command(long_about = "\
Rasterize SVG artwork to PNG, JPEG, or TIFF with print DPI metadata

Pixel size is the SVG's declared size scaled by dpi/72, and the same DPI is
written into the file (PNG pHYs, JPEG EXIF + JFIF, TIFF resolution tags), so
the output prints at the size the artwork was drawn for.

Size resolution (first available wins):
  width + height attributes → viewBox → renderer's natural size

Settings are read from ./svg-export.toml (or --config). Flags override it.

Run 'svg-export gen-config' to generate a documented svg-export.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./svg-export.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert SVG files (or directories of them)
    Convert(ConvertArgs),
    /// Validate SVG files and print their pixel size without rendering
    Check {
        /// SVG files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Resolution to size at (default from config)
        #[arg(long)]
        dpi: Option<u32>,
    },
    /// Print a stock svg-export.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// SVG files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Write outputs here instead of next to each source
    #[arg(long, short)]
    out_dir: Option<PathBuf>,
    /// Output format: png, jpeg (jpg), tiff (tif)
    #[arg(long, short)]
    format: Option<String>,
    /// Print resolution in dots per inch
    #[arg(long)]
    dpi: Option<u32>,
    /// JPEG quality, 0.0-1.0
    #[arg(long)]
    quality: Option<f32>,
    /// Flatten onto white instead of keeping transparency
    #[arg(long)]
    opaque: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logger(cli.verbose)?;

    match cli.command {
        Command::Convert(args) => {
            let config = load_config(cli.config.as_deref())?;
            init_thread_pool(&config.processing);

            let mut options = config.convert_options();
            if let Some(format) = args.format {
                options.format = format;
            }
            if let Some(dpi) = args.dpi {
                options.dpi = dpi;
            }
            if let Some(quality) = args.quality {
                options.quality = quality;
            }
            if args.opaque {
                options.transparent = false;
            }

            let files = batch::collect_inputs(&args.inputs)?;
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_batch_event(&event);
                }
            });
            let result = batch::convert_files(&files, args.out_dir.as_deref(), &options, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let summary = result?;
            output::print_batch_summary(&summary);
            summary.into_result()?;
        }
        Command::Check { inputs, dpi } => {
            let config = load_config(cli.config.as_deref())?;
            init_thread_pool(&config.processing);
            let dpi = dpi.unwrap_or(config.output.dpi);

            let files = batch::collect_inputs(&inputs)?;
            let rasterizer = imaging::ResvgRasterizer::new();
            let reports = batch::check_files(&rasterizer, &files, dpi)?;
            output::print_check_reports(&reports, dpi);

            let invalid = reports.iter().filter(|r| r.result.is_err()).count();
            if invalid > 0 {
                return Err(format!("{invalid} of {} files are invalid", reports.len()).into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the explicit config file, or `./svg-export.toml` when present.
fn load_config(explicit: Option<&Path>) -> Result<config::ExportConfig, Box<dyn std::error::Error>> {
    match explicit {
        Some(path) if !path.exists() => {
            Err(format!("config file not found: {}", path.display()).into())
        }
        Some(path) => Ok(config::load_config(path)?),
        None => Ok(config::load_config(Path::new(config::CONFIG_FILE_NAME))?),
    }
}

/// Warnings already reach the user through the progress output, so the
/// logger stays at errors unless asked for more.
fn setup_logger(verbose: u8) -> Result<(), log::SetLoggerError> {
    let level = match verbose {
        0 => Level::Error,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };
    simple_logger::init_with_level(level)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
