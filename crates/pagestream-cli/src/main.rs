//! pagestream CLI: open or drain a file through the simulated network reader.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use pagestream_core::config::{DeliveryMode, StreamConfig};
use pagestream_io::{drain, DrainOptions, PagedStream};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pagestream")]
#[command(about = "Fetch-on-demand paged reader simulating a network byte stream", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a file and report whether the first page could be fetched
    Open {
        /// File to open
        path: PathBuf,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Read a file end to end through the probe/fetch/release loop
    Drain {
        /// File to drain
        path: PathBuf,

        #[command(flatten)]
        stream: StreamArgs,

        /// Bytes read per chunk
        #[arg(long, default_value_t = 4096)]
        chunk: usize,

        /// Bytes requested per simulated fetch
        #[arg(long, default_value_t = 8192)]
        request: usize,

        /// Keep consumed pages instead of purging them
        #[arg(long)]
        no_purge: bool,

        /// Hash the file directly and compare with the streamed bytes
        #[arg(long)]
        verify: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
struct StreamArgs {
    /// JSON config file (overrides environment)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Page size in bytes (overrides config)
    #[arg(long)]
    page_size: Option<usize>,

    /// Resident page memory cap in bytes (overrides config; unbounded by default)
    #[arg(long)]
    mem_cap: Option<usize>,

    /// Delivery model: random or full (overrides config)
    #[arg(long)]
    delivery: Option<DeliveryMode>,

    /// Seed for random delivery (overrides config)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Open { path, stream } => {
            if let Err(e) = open_file(&path, &stream) {
                println!("open failed: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Drain {
            path,
            stream,
            chunk,
            request,
            no_purge,
            verify,
            json,
        } => {
            let opts = DrainOptions {
                chunk_len: chunk,
                request_len: request,
                purge_behind: !no_purge,
                ..Default::default()
            };
            if let Err(e) = drain_file(&path, &stream, &opts, verify, json) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

/// Config file if given, otherwise the environment; flags win over both.
fn resolve_config(args: &StreamArgs) -> Result<StreamConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => StreamConfig::from_json_file(path)?,
        None => StreamConfig::from_env(),
    };
    apply_overrides(&mut config, args);
    config.validate()?;
    tracing::debug!(?config, "resolved stream config");
    Ok(config)
}

fn apply_overrides(cfg: &mut StreamConfig, args: &StreamArgs) {
    if let Some(size) = args.page_size {
        cfg.page_size = size;
    }
    if let Some(cap) = args.mem_cap {
        cfg.mem_cap_bytes = cap;
    }
    if let Some(mode) = args.delivery {
        cfg.delivery = mode;
    }
    if let Some(seed) = args.seed {
        cfg.seed = Some(seed);
    }
}

fn open_file(path: &Path, args: &StreamArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    let mut stream = PagedStream::<File>::new(config)?;
    stream.open(path)?;
    let length = stream.length()?;

    match length.total {
        Some(total) => println!("open ok: avail={} total={}", length.avail, total),
        None => println!("open ok: avail={} total=unknown", length.avail),
    }
    stream.close();
    Ok(())
}

fn drain_file(
    path: &Path,
    args: &StreamArgs,
    opts: &DrainOptions,
    verify: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    let mut stream = PagedStream::<File>::new(config)?;
    stream.open(path)?;

    let mut hasher = blake3::Hasher::new();
    let summary = drain(&mut stream, opts, |chunk| {
        hasher.update(chunk);
    })?;
    let streamed = hasher.finalize();
    stream.close();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("✓ Drained {} bytes in {} chunks", summary.bytes, summary.chunks);
        println!("  Fetch rounds: {}", summary.fetch_rounds);
        println!("  Underflows: {}", summary.underflows);
        println!("  Pages purged: {}", summary.pages_purged);
        println!("  Peak resident: {} bytes", summary.peak_budget_bytes);
        println!("  BLAKE3: {}", streamed.to_hex());
    }

    if verify {
        let direct = hash_file(path)?;
        if direct != streamed {
            return Err(format!(
                "digest mismatch: streamed {} but file is {}",
                streamed.to_hex(),
                direct.to_hex()
            )
            .into());
        }
        if !json {
            println!("✓ Digest matches file contents");
        }
    }

    Ok(())
}

fn hash_file(path: &Path) -> std::io::Result<blake3::Hash> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flags_override_config() {
        let mut config = StreamConfig::default();
        let args = StreamArgs {
            page_size: Some(4096),
            delivery: Some(DeliveryMode::Full),
            seed: Some(11),
            ..Default::default()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.page_size, 4096);
        assert_eq!(config.delivery, DeliveryMode::Full);
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.mem_cap_bytes, StreamConfig::default().mem_cap_bytes);
    }

    #[test]
    fn config_file_then_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"page_size": 512, "seed": 3}}"#).unwrap();
        let args = StreamArgs {
            config: Some(file.path().to_path_buf()),
            seed: Some(4),
            ..Default::default()
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.page_size, 512);
        assert_eq!(config.seed, Some(4));
    }

    #[test]
    fn invalid_override_is_rejected() {
        let args = StreamArgs {
            page_size: Some(0),
            ..Default::default()
        };
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn drain_and_verify_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..12_345u32).map(|i| (i % 97) as u8).collect();
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        let args = StreamArgs {
            seed: Some(1),
            ..Default::default()
        };
        drain_file(file.path(), &args, &DrainOptions::default(), true, true).unwrap();
        assert_eq!(hash_file(file.path()).unwrap(), blake3::hash(&data));
    }

    #[test]
    fn open_missing_file_fails() {
        let args = StreamArgs::default();
        assert!(open_file(Path::new("/definitely/not/here.mkv"), &args).is_err());
    }
}
