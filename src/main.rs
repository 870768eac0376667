use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use thumbsmith::config::{self, Config};
use thumbsmith::pipeline::{PipelineError, PipelineRequest, RunReport, ThumbnailPipeline};
use thumbsmith::progress::ChannelReporter;
use thumbsmith::store::CacheStats;
use thumbsmith::transcode::{CodecTranscoder, CompressionOptions};
use thumbsmith::{naming, output, probe, sizes};
use walkdir::WalkDir;

/// Shared flags for commands that take size/compression overrides.
#[derive(clap::Args, Clone)]
struct SizeArgs {
    /// Override the default breakpoint widths positionally (repeatable,
    /// e.g. --width 300 --width 600)
    #[arg(long = "width", value_name = "PX")]
    widths: Vec<u32>,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked a single time at startup for clap's 'static version
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "thumbsmith")]
#[command(about = "Responsive image derivative generator with a build cache")]
#[command(long_about = "\
Responsive image derivative generator with a build cache

For every source image, thumbsmith encodes resized copies at four breakpoint
widths (sm=250, md=500, lg=800, hd=1368), each in two variants: the source's
native format and WebP. Derivatives land in a durable cache directory and
are copied into the publish directory, so unchanged images cost nothing on
later builds.

Filesystem layout (defaults):

  src/site/img/photo.jpg                       # source
  .cache/photo-sm.jpg ... photo-hd.jpg         # native derivatives
  .cache/photo-modern-sm.webp ... -hd.webp     # WebP derivatives
  dist/img/compressed/<same filenames>         # published output

Cache validity is all-or-nothing per image: if any derivative is missing,
the whole set is regenerated. Derivatives are keyed by name only — after
replacing a source image in place, clear the cache directory.

On CI deploys (DEPLOY_URL set) the cache moves to /opt/build/cache/thumbsmith
so the provider's build cache persists it between runs.

Run 'thumbsmith gen-config' to generate a documented thumbsmith.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Project root (where thumbsmith.toml and relative directories resolve)
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and publish derivatives for the given sources (all
    /// jpeg/png files under the source directory when none are given)
    Process {
        /// Site-relative source paths, e.g. /img/photo.jpg
        sources: Vec<String>,

        #[command(flatten)]
        size_args: SizeArgs,

        /// Encoding quality (1-100)
        #[arg(long)]
        quality: Option<u32>,

        /// Disable lossless WebP encoding for the codec pass
        #[arg(long)]
        lossy: bool,

        /// Worker threads (defaults to the core count)
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Print the intrinsic dimensions of a source image or URL
    Dimensions {
        /// Site-relative path or http(s) URL
        src: String,
    },
    /// Print the published URL paths a source image's derivatives get
    Paths {
        /// Site-relative source path
        src: String,

        #[command(flatten)]
        size_args: SizeArgs,
    },
    /// Print a stock thumbsmith.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Process {
            sources,
            size_args,
            quality,
            lossy,
            threads,
        } => {
            let config = load_config(&cli.root)?;
            if let Some(threads) = threads {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build_global()
                    .ok();
            }

            let sources = if sources.is_empty() {
                scan_sources(&config)
            } else {
                sources
            };
            if sources.is_empty() {
                println!("No images found under {}", config.source_prefix);
                return Ok(());
            }

            let compression = CompressionOptions {
                quality,
                lossless: lossy.then_some(false),
                ..CompressionOptions::default()
            };
            let width_overrides = (!size_args.widths.is_empty()).then(|| size_args.widths.clone());

            let pipeline = ThumbnailPipeline::new(config, CodecTranscoder::new());
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_event(&event);
                }
            });
            let reporter = ChannelReporter::new(tx);

            let mut stats = CacheStats::default();
            let mut run_error: Option<PipelineError> = None;
            for src in &sources {
                let request = PipelineRequest {
                    src: src.clone(),
                    width_overrides: width_overrides.clone(),
                    compression: compression.clone(),
                };
                match pipeline.run(&request, &reporter) {
                    Ok(RunReport { cache_hit: true, .. }) => stats.hit(),
                    Ok(_) => stats.generate(),
                    Err(e) => {
                        run_error = Some(e);
                        break;
                    }
                }
            }
            drop(reporter);
            printer.join().unwrap();
            if let Some(e) = run_error {
                return Err(e.into());
            }
            println!("Cache: {stats}");
        }
        Command::Dimensions { src } => {
            let config = load_config(&cli.root)?;
            let dims = probe::resolve_dimensions(&config, &src)?;
            println!("{}", output::format_dimensions(&src, dims));
        }
        Command::Paths { src, size_args } => {
            let config = load_config(&cli.root)?;
            let overrides = (!size_args.widths.is_empty()).then_some(size_args.widths.as_slice());
            let table = sizes::resolve_sizes(overrides);
            for line in output::format_paths(&config.path_prefix, &src, &table) {
                println!("{line}");
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load configuration and anchor relative directories at the project root.
fn load_config(root: &Path) -> Result<Config, config::ConfigError> {
    let mut config = Config::load(root)?;
    if config.cache_dir.is_relative() {
        config.cache_dir = root.join(&config.cache_dir);
    }
    if config.publish_dir.is_relative() {
        config.publish_dir = root.join(&config.publish_dir);
    }
    if Path::new(&config.source_prefix).is_relative() {
        config.source_prefix = root
            .join(&config.source_prefix)
            .to_string_lossy()
            .into_owned();
    }
    Ok(config)
}

/// Walk the source directory for processable images, as site-relative paths.
fn scan_sources(config: &Config) -> Vec<String> {
    let root = Path::new(&config.source_prefix);
    let mut sources: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    ["jpg", "jpeg", "png"]
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                })
        })
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .and_then(|rel| rel.to_str())
                .map(naming::normalize_src)
        })
        .collect();
    sources.sort();
    sources
}
