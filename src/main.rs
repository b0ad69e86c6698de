use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use modpacker::archive::{ArchiveBuilder, ExternalToolBuilder};
use modpacker::batch::{self, BatchReport};
use modpacker::cancel::CancellationToken;
use modpacker::compress::{CompressionLevel, ZipCompressor};
use modpacker::game::GameKind;
use modpacker::logging;
use modpacker::packager::{Options, Packager};
use modpacker::plugin::FilesystemTemplate;
use modpacker::progress::NullReporter;

#[derive(Parser, Debug)]
#[command(name = "modpacker")]
#[command(version)]
#[command(about = "Classify and package Creation Engine mod assets", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Write diagnostic log output to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Package a single mod's generated assets.
    Pack {
        /// Directory of generated/derivative assets.
        #[arg(long, value_name = "PATH")]
        generated_root: PathBuf,

        /// Directory of the reference (vanilla + installed mods) tree.
        #[arg(long, value_name = "PATH")]
        reference_root: PathBuf,

        /// Target game.
        #[arg(long, value_enum)]
        game: GameArg,

        /// Mod name; used as the plugin/archive stem. No whitespace.
        #[arg(long)]
        mod_name: String,

        /// Output directory for the package.
        #[arg(long, value_name = "PATH")]
        out: PathBuf,

        /// Path to an external BSArch-compatible archiving tool.
        #[arg(long, value_name = "PATH")]
        archive_tool: PathBuf,

        /// Path to a plugin template file to clone, overriding the built-in.
        #[arg(long, value_name = "PATH")]
        plugin_template: PathBuf,

        /// Classifier worker thread count.
        #[arg(long, default_value_t = default_threads())]
        threads: usize,

        /// Per-chunk archive size cap, in bytes.
        #[arg(long, default_value_t = modpacker::chunk::DEFAULT_CHUNK_SIZE_BYTES)]
        chunk_size_bytes: u64,

        /// Compression level 0 (store) through 9 (maximum).
        #[arg(long, default_value_t = 3)]
        compression_level: u8,
    },

    /// Package every mod folder under a collection root.
    Batch {
        /// Directory containing one subdirectory per candidate mod.
        #[arg(long, value_name = "PATH")]
        collection_root: PathBuf,

        /// Directory of the reference (vanilla + installed mods) tree,
        /// shared across every mod in the collection.
        #[arg(long, value_name = "PATH")]
        reference_root: PathBuf,

        #[arg(long, value_enum)]
        game: GameArg,

        #[arg(long, value_name = "PATH")]
        out: PathBuf,

        #[arg(long, value_name = "PATH")]
        archive_tool: PathBuf,

        #[arg(long, value_name = "PATH")]
        plugin_template: PathBuf,

        #[arg(long, default_value_t = default_threads())]
        threads: usize,

        #[arg(long, default_value_t = 4)]
        batch_concurrency: usize,

        #[arg(long, default_value_t = modpacker::chunk::DEFAULT_CHUNK_SIZE_BYTES)]
        chunk_size_bytes: u64,

        #[arg(long, default_value_t = 3)]
        compression_level: u8,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum GameArg {
    Skyrim,
    Fallout4,
}

impl From<GameArg> for GameKind {
    fn from(g: GameArg) -> Self {
        match g {
            GameArg::Skyrim => GameKind::Skyrim,
            GameArg::Fallout4 => GameKind::Fallout4,
        }
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4).min(8)
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_from_optional_path(args.log_file.as_deref(), log::LevelFilter::Info)
        .context("failed to initialize logging")?;
    info!("modpacker {} starting", modpacker::VERSION);

    match args.command {
        Command::Pack {
            generated_root,
            reference_root,
            game,
            mod_name,
            out,
            archive_tool,
            plugin_template,
            threads,
            chunk_size_bytes,
            compression_level,
        } => run_pack(
            &generated_root,
            &reference_root,
            game.into(),
            &mod_name,
            &out,
            &archive_tool,
            &plugin_template,
            threads,
            chunk_size_bytes,
            compression_level,
        ),
        Command::Batch {
            collection_root,
            reference_root,
            game,
            out,
            archive_tool,
            plugin_template,
            threads,
            batch_concurrency,
            chunk_size_bytes,
            compression_level,
        } => run_batch(
            &collection_root,
            &reference_root,
            game.into(),
            &out,
            &archive_tool,
            &plugin_template,
            threads,
            batch_concurrency,
            chunk_size_bytes,
            compression_level,
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_pack(
    generated_root: &std::path::Path,
    reference_root: &std::path::Path,
    game: GameKind,
    mod_name: &str,
    out: &std::path::Path,
    archive_tool: &std::path::Path,
    plugin_template: &std::path::Path,
    threads: usize,
    chunk_size_bytes: u64,
    compression_level: u8,
) -> Result<()> {
    let builders: Vec<Box<dyn ArchiveBuilder>> = vec![Box::new(ExternalToolBuilder::new("bsarch", archive_tool))];
    let compressor = ZipCompressor;
    let template = FilesystemTemplate::new(Some(plugin_template.to_path_buf()), Some(plugin_template.to_path_buf()));
    let packager = Packager {
        archive_builders: &builders,
        compressor: &compressor,
        template_source: &template,
        progress: &NullReporter,
    };

    let options = Options {
        threads,
        chunk_size_bytes,
        compression_level: CompressionLevel(compression_level),
        plugin_template_override: Some(plugin_template.to_path_buf()),
        ..Options::default()
    };

    let layout = packager
        .build_package(
            generated_root,
            reference_root,
            game,
            mod_name,
            out,
            &options,
            &CancellationToken::new(),
        )
        .context("packaging failed")?;

    println!("package written to {}", layout.root.display());
    if let Some(p) = &layout.packed_archive {
        println!("  packed: {}", p.display());
    }
    if let Some(p) = &layout.loose_archive {
        println!("  loose:  {}", p.display());
    }
    for warning in &layout.warnings {
        println!("  warning: {warning}");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_batch(
    collection_root: &std::path::Path,
    reference_root: &std::path::Path,
    game: GameKind,
    out: &std::path::Path,
    archive_tool: &std::path::Path,
    plugin_template: &std::path::Path,
    threads: usize,
    batch_concurrency: usize,
    chunk_size_bytes: u64,
    compression_level: u8,
) -> Result<()> {
    let builders: Vec<Box<dyn ArchiveBuilder>> = vec![Box::new(ExternalToolBuilder::new("bsarch", archive_tool))];
    let compressor = ZipCompressor;
    let template = FilesystemTemplate::new(Some(plugin_template.to_path_buf()), Some(plugin_template.to_path_buf()));
    let packager = Packager {
        archive_builders: &builders,
        compressor: &compressor,
        template_source: &template,
        progress: &NullReporter,
    };

    let options = Options {
        threads,
        batch_concurrency,
        chunk_size_bytes,
        compression_level: CompressionLevel(compression_level),
        plugin_template_override: Some(plugin_template.to_path_buf()),
        ..Options::default()
    };

    let report: BatchReport = batch::process_collection(
        collection_root,
        reference_root,
        out,
        game,
        &options,
        &packager,
        &CancellationToken::new(),
    )
    .context("batch run failed")?;

    report.write_json(&out.join("batch_report.json")).context("writing batch_report.json")?;

    println!(
        "processed {}/{} mods ({} skipped, {} failed)",
        report.summary.processed, report.summary.total_mods, report.summary.skipped_no_plugin, report.summary.failed
    );
    Ok(())
}
