use clap::{Parser, Subcommand};
use infoto::imaging::{FreetypeFace, RustCodec, rasterize};
use infoto::{config, output, process, scan};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "infoto")]
#[command(about = "Stamp a photo's EXIF details into a solid-color border")]
#[command(long_about = "\
Stamp a photo's EXIF details into a solid-color border

Each image gets a border on every side; the bottom border carries a caption
built from the image's EXIF tags. The result is written next to the source
with -edited inserted before the extension:

  DSCF0042.JPG  →  DSCF0042-edited.JPG

A directory target annotates every JPEG, PNG and TIFF directly inside it,
skipping hidden files and earlier -edited outputs.

Config files are TOML, or JSON in the original infoto format (*.json).
Run 'infoto gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (TOML, or JSON by extension). Defaults apply without one.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log pipeline steps (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Annotate one image, or every image in a directory
    Annotate {
        /// Image or directory. Falls back to `target` from the config.
        target: Option<PathBuf>,
    },
    /// Validate the config and load the font without writing anything
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Command::Annotate { target } => {
            let config = config::load_config(cli.config.as_deref())?;
            let target = target
                .or_else(|| config.target.clone())
                .ok_or("no target given: pass an image or directory, or set `target` in the config")?;
            let images = scan::resolve_targets(&target)?;
            init_thread_pool(&config.processing);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = process::annotate_batch(&RustCodec::new(), &images, &config, Some(tx));
            printer.join().ok();
            let report = result?;
            output::print_batch_summary(&report);
            if !report.failed.is_empty() {
                return Err(format!("{} images failed", report.failed.len()).into());
            }
        }
        Command::Check => {
            let config = config::load_config(cli.config.as_deref())?;
            output::print_check_output(&config);
            let face = FreetypeFace::load(&config.font.ttf_file, config.font.point)?;
            rasterize(&face, "F/2.8 | 1/250S | ISO 400")?;
            if let Some(target) = &config.target {
                let images = scan::resolve_targets(target)?;
                println!("Target");
                println!("    {} ({} images)", target.display(), images.len());
            }
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// `max_processes` can lower the worker count below the core count, never raise it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
