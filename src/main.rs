use clap::{Parser, Subcommand};
use imcull::analysis::{self, Analyzer};
use imcull::cancel::CancelToken;
use imcull::catalog::Catalog;
use imcull::config::{self, ImcullConfig};
use imcull::imaging::RustBackend;
use imcull::{backup, editor, output, scan};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imcull")]
#[command(about = "Culling assistant for photographers")]
#[command(long_about = "\
Culling assistant for photographers

Point it at a shoot directory. RAW and JPEG files of the same frame are
paired into one image (the RAW is primary), EXIF is read best-effort, every
image gets a focus score, and the keepers can be backed up or handed to a
RAW editor.

Pairing:

  IMG_0001.CR2 + IMG_0001.JPG    → one image, CR2 primary
  IMG_0003.CR2 + IMG_0003_1.JPG  → one image (camera suffix tolerated)
  IMG_0004.JPG                   → lone JPEG
  RAW/IMG_5.NEF + JPG/IMG_5.JPG  → one image (pairs across folders,
                                   same folder preferred)

RAW: .arw .cr2 .cr3 .nef .orf .raf .rw2 .dng
JPEG: .jpg .jpeg .jpe .jif .jfif (case-insensitive)

Run 'imcull gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: <config_dir>/imcull/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that work on a shoot directory.
#[derive(clap::Args, Clone)]
struct ShootArgs {
    /// Shoot directory (default: import.default_source_dir)
    dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// List images with their pairs and key metadata
    Scan {
        #[command(flatten)]
        shoot: ShootArgs,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Score every image for focus and report blurry ones
    Analyze {
        #[command(flatten)]
        shoot: ShootArgs,
        /// Override culling.blur_threshold
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Copy images (and their pairs) to the backup destinations
    Backup {
        #[command(flatten)]
        shoot: ShootArgs,
        /// Destination root (repeatable; default: import.backup_locations)
        #[arg(long = "dest")]
        dest: Vec<PathBuf>,
        /// Copy straight into each destination, no YYYY-MM-DD folder
        #[arg(long)]
        no_date_subfolder: bool,
        /// Analyze first and leave blurry images out
        #[arg(long)]
        skip_blurry: bool,
        /// Minimum rating to select (default: culling.default_min_rating)
        #[arg(long)]
        min_rating: Option<u8>,
    },
    /// Open images (and their pairs) in the external editor
    Open {
        #[command(flatten)]
        shoot: ShootArgs,
        /// Analyze first and leave blurry images out
        #[arg(long)]
        skip_blurry: bool,
        /// Minimum rating to select (default: culling.default_min_rating)
        #[arg(long)]
        min_rating: Option<u8>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let cfg = config::load_config(cli.config.as_deref())?;
    init_thread_pool(&cfg.processing);
    let backend = RustBackend::new();

    match cli.command {
        Command::Scan { shoot, json } => {
            let root = resolve_source(&shoot, &cfg)?;
            let records = scan::scan_directory(&root, &backend, &CancelToken::new())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                output::print_scan(&records, &root);
            }
        }
        Command::Analyze { shoot, threshold } => {
            let root = resolve_source(&shoot, &cfg)?;
            let mut detector = cfg.detector();
            if let Some(t) = threshold {
                if !t.is_finite() || t < 0.0 {
                    return Err(format!("--threshold must be a finite number >= 0, got {t}").into());
                }
                detector.threshold = t;
            }
            let mut catalog = load_catalog(&root, &backend)?;
            let analyzer = Analyzer::new(backend, detector, cfg.thumbnail_config());
            analyze_with_progress(&mut catalog, &analyzer);
            output::print_summary(&catalog.summary());
        }
        Command::Backup {
            shoot,
            dest,
            no_date_subfolder,
            skip_blurry,
            min_rating,
        } => {
            let min_rating = cfg.min_rating(min_rating)?;
            let root = resolve_source(&shoot, &cfg)?;
            let destinations: Vec<PathBuf> = if dest.is_empty() {
                cfg.import.backup_locations.iter().map(PathBuf::from).collect()
            } else {
                dest
            };
            if destinations.is_empty() {
                return Err("no backup destinations: pass --dest or set import.backup_locations".into());
            }
            let mut catalog = load_catalog(&root, &backend)?;
            if skip_blurry {
                let analyzer = Analyzer::new(backend, cfg.detector(), cfg.thumbnail_config());
                analyze_with_progress(&mut catalog, &analyzer);
                info!(rejected = catalog.reject_blurry(), "rejected blurry images");
            }
            let keep = catalog.selected(min_rating);
            output::print_selection(keep.len(), catalog.len(), min_rating);
            let date_subfolder = cfg.culling.date_subfolder && !no_date_subfolder;
            let report = backup::backup(&keep, &destinations, date_subfolder);
            output::print_backup(&report);
        }
        Command::Open {
            shoot,
            skip_blurry,
            min_rating,
        } => {
            if !cfg.editor.enabled {
                return Err("editor is disabled (editor.enabled = false)".into());
            }
            let min_rating = cfg.min_rating(min_rating)?;
            let root = resolve_source(&shoot, &cfg)?;
            let mut catalog = load_catalog(&root, &backend)?;
            if skip_blurry {
                let analyzer = Analyzer::new(backend, cfg.detector(), cfg.thumbnail_config());
                analyze_with_progress(&mut catalog, &analyzer);
                catalog.reject_blurry();
            }
            let keep = catalog.selected(min_rating);
            output::print_selection(keep.len(), catalog.len(), min_rating);
            if keep.is_empty() {
                return Ok(());
            }
            let executable = &cfg.editor.executable;
            let version = editor::probe(executable);
            editor::launch(executable, &keep)?;
            let files = editor::files_to_open(&keep).len();
            output::print_editor_launch(executable, version.as_deref(), files);
        }
        Command::GenConfig => unreachable!("handled before config is loaded"),
    }

    Ok(())
}

/// Install the log subscriber. Default `imcull=info`, `--verbose` raises it to
/// debug, `RUST_LOG` wins over both.
fn init_tracing(verbose: bool) {
    let default = if verbose { "imcull=debug" } else { "imcull=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// The directory argument, or the configured default source directory.
fn resolve_source(shoot: &ShootArgs, cfg: &ImcullConfig) -> Result<PathBuf, String> {
    match &shoot.dir {
        Some(dir) => Ok(dir.clone()),
        None if !cfg.import.default_source_dir.is_empty() => {
            Ok(backup::expand_home(Path::new(&cfg.import.default_source_dir)))
        }
        None => Err("no directory given and import.default_source_dir is not set".to_string()),
    }
}

fn load_catalog(root: &Path, backend: &RustBackend) -> Result<Catalog, scan::ScanError> {
    let records = scan::scan_directory(root, backend, &CancelToken::new())?;
    println!("{} images loaded", records.len());
    Ok(Catalog::new(records))
}

/// Run analysis with events printed from a separate thread.
fn analyze_with_progress(catalog: &mut Catalog, analyzer: &Analyzer<RustBackend>) {
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_analysis_event(&event) {
                println!("{}", line);
            }
        }
    });
    analysis::analyze_pending(catalog, analyzer, &CancelToken::new(), Some(tx));
    printer.join().ok();
}
