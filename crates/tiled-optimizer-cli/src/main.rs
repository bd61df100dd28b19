use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use image::{DynamicImage, ImageReader};
use serde::Deserialize;
use tiled_optimizer_core::{
    LogLevel, MapDocument, OptimizeOutput, OptimizerConfig, optimize_map, to_manifest_json,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "tiled-optimizer",
    about = "Pack the tiles a Tiled map uses into a few atlas chunks",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Optimize a map: write the rewritten map and its atlas images
    Optimize(OptimizeArgs),
    /// Run the optimizer and print statistics without writing the map
    Stats(OptimizeArgs),
}

#[derive(Parser, Debug, Clone)]
struct OptimizeArgs {
    // Input/Output
    /// Tiled map in JSON format
    #[arg(help_heading = "Input/Output")]
    map: PathBuf,
    /// Output directory (default: `dist` next to the map)
    #[arg(short, long, help_heading = "Input/Output")]
    out_dir: Option<PathBuf>,
    /// File name of the optimized map (default: the input file name)
    #[arg(long, help_heading = "Input/Output")]
    map_name: Option<String>,
    /// YAML config file path (overrides the options below)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,

    // Atlas
    /// Tile edge in pixels; every tileset must use it
    #[arg(long, default_value_t = 32, help_heading = "Atlas")]
    tile_size: u32,
    /// Edge of one atlas chunk in pixels (multiple of --tile-size)
    #[arg(long, default_value_t = 512, help_heading = "Atlas")]
    atlas_size: u32,
    /// Atlas image name prefix
    #[arg(long, default_value = "chunk", help_heading = "Atlas")]
    prefix: String,
    /// Atlas image name suffix (`{prefix}-{n}-{suffix}.png`)
    #[arg(long, help_heading = "Atlas")]
    suffix: Option<String>,
    /// Do not pack unused tiles that carry a `name` property
    #[arg(long, default_value_t = false, help_heading = "Atlas")]
    no_named_tiles: bool,
    /// Extract chunk tiles in parallel (requires feature `parallel`)
    #[arg(long, default_value_t = false, help_heading = "Atlas")]
    parallel: bool,

    // Export
    /// Export the atlas manifest and stats (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: optimize and report, but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    let log_level = log_level_for(cli.quiet, cli.verbose);
    let progress = cli.progress && !cli.quiet;
    match &cli.command {
        Commands::Optimize(args) => run_optimize(args, log_level, progress),
        Commands::Stats(args) => {
            let mut a = args.clone();
            a.dry_run = true;
            run_optimize(&a, log_level, progress)
        }
    }
}

fn run_optimize(args: &OptimizeArgs, log_level: LogLevel, show_progress: bool) -> anyhow::Result<()> {
    let base = OptimizerConfig {
        tile_size: args.tile_size,
        atlas_size: args.atlas_size,
        prefix: args.prefix.clone(),
        suffix: args.suffix.clone(),
        log_level,
        keep_named_tiles: !args.no_named_tiles,
        parallel: args.parallel,
    };
    // Config file sets options en bloc, on top of the CLI values
    let cfg = if let Some(path) = &args.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)
            .with_context(|| format!("parse config {}", path.display()))?;
        y.into_optimizer_config(base)
            .with_context(|| format!("config {}", path.display()))?
    } else {
        base
    };

    if args.print_config {
        match args.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }
    cfg.validate()?;

    let text = fs::read_to_string(&args.map)
        .with_context(|| format!("read map {}", args.map.display()))?;
    let map = MapDocument::from_json_str(&text)
        .with_context(|| format!("parse map {}", args.map.display()))?;
    let map_dir = args
        .map
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let images = load_tileset_images(&map, &map_dir, show_progress)?;
    info!(count = images.len(), "loaded tileset images");

    let started = Instant::now();
    let out = optimize_map(map, images, cfg)?;
    let stats = &out.stats;
    info!(
        atlases = stats.atlases,
        unique_tiles = stats.unique_tiles,
        references = stats.references,
        unresolved = stats.unresolved,
        area = format!("{:.2}%", stats.area_ratio() * 100.0),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "stats"
    );
    if args.dry_run {
        println!("{}", stats.summary());
    } else {
        let out_dir = args.out_dir.clone().unwrap_or_else(|| map_dir.join("dist"));
        write_outputs(&out, &out_dir, &output_map_name(&args.map, args.map_name.as_deref()))?;
    }

    if let Some(stats_path) = &args.export_stats {
        let value = to_manifest_json(&out);
        fs::write(stats_path, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("write {}", stats_path.display()))?;
        info!(?stats_path, "stats exported");
    }
    Ok(())
}

/// Output map file name. A `--map-name` without extension takes the input's.
fn output_map_name(input: &Path, map_name: Option<&str>) -> String {
    let input_name = input
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("map.json")
        .to_string();
    match map_name {
        Some(name) if Path::new(name).extension().is_some() => name.to_string(),
        Some(name) => match input.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{name}.{ext}"),
            None => name.to_string(),
        },
        None => input_name,
    }
}

fn write_outputs(out: &OptimizeOutput, out_dir: &Path, map_name: &str) -> anyhow::Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("create out_dir {}", out_dir.display()))?;

    let map_path = out_dir.join(map_name);
    fs::write(&map_path, out.map.to_json_string()?)
        .with_context(|| format!("write {}", map_path.display()))?;
    info!(?map_path, tilesets = out.map.tilesets.len(), "map written");

    for (name, bytes) in out.encode_atlases()? {
        let png_path = out_dir.join(&name);
        fs::write(&png_path, bytes).with_context(|| format!("write {}", png_path.display()))?;
        info!(?png_path, "wrote atlas");
    }
    Ok(())
}

/// Decodes every tileset image, resolved against the map's directory, in
/// tileset order.
fn load_tileset_images(
    map: &MapDocument,
    map_dir: &Path,
    progress: bool,
) -> anyhow::Result<Vec<DynamicImage>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(map.tilesets.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut list = Vec::with_capacity(map.tilesets.len());
    for ts in &map.tilesets {
        if ts.image.is_empty() {
            anyhow::bail!("tileset {} has no image (image collections are not supported)", ts.name);
        }
        let path = map_dir.join(&ts.image);
        if let Some(b) = &bar {
            b.set_message(ts.image.clone());
        }
        let img = load_image(&path).with_context(|| format!("load tileset image {}", path.display()))?;
        if ts.imagewidth.is_some_and(|w| w != img.width())
            || ts.imageheight.is_some_and(|h| h != img.height())
        {
            warn!(
                tileset = %ts.name,
                width = img.width(),
                height = img.height(),
                "image size differs from the tileset record"
            );
        }
        list.push(img);
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(list)
}

fn load_image(p: &Path) -> anyhow::Result<DynamicImage> {
    let img = ImageReader::open(p)?.with_guessed_format()?.decode()?;
    Ok(img)
}

fn log_level_for(quiet: bool, verbose: u8) -> LogLevel {
    if quiet {
        LogLevel::Silent
    } else if verbose > 0 {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    }
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    tile_size: Option<u32>,
    atlas_size: Option<u32>,
    prefix: Option<String>,
    suffix: Option<String>,
    log_level: Option<String>,
    keep_named_tiles: Option<bool>,
    parallel: Option<bool>,
}

impl YamlConfig {
    fn into_optimizer_config(self, mut cfg: OptimizerConfig) -> anyhow::Result<OptimizerConfig> {
        if let Some(v) = self.tile_size {
            cfg.tile_size = v;
        }
        if let Some(v) = self.atlas_size {
            cfg.atlas_size = v;
        }
        if let Some(v) = self.prefix {
            cfg.prefix = v;
        }
        if let Some(v) = self.suffix {
            cfg.suffix = Some(v);
        }
        if let Some(v) = self.log_level {
            cfg.log_level = match v.parse() {
                Ok(level) => level,
                Err(()) => anyhow::bail!("unknown log_level: {} (silent|normal|verbose)", v),
            };
        }
        if let Some(v) = self.keep_named_tiles {
            cfg.keep_named_tiles = v;
        }
        if let Some(v) = self.parallel {
            cfg.parallel = v;
        }
        Ok(cfg)
    }
}
