use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voicepack_builder::{
    Catalog, ClipStore, Config, FfmpegTranscoder, GladosVoice, Pipeline, package,
};

/// Voicepack - builds a voice pack archive for Valetudo-compatible robots
#[derive(Parser)]
#[command(name = "voicepack", version, about)]
struct Cli {
    /// Path to a TOML config file (defaults to the platform config dir)
    #[arg(short, long, env = "VOICEPACK_CONFIG")]
    config: Option<PathBuf>,

    /// Sound list file override
    #[arg(long, env = "VOICEPACK_SOUND_LIST")]
    sound_list: Option<PathBuf>,

    /// Working directory override
    #[arg(long, env = "VOICEPACK_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch and encode every clip in the sound list
    Build {
        /// Parallel fetch/encode workers
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Package encoded clips into the release archive and publish metadata
    Release {
        /// Skip rewriting the README with the new checksum and size
        #[arg(long)]
        no_readme: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voicepack_builder=info",
        1 => "info,voicepack_builder=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.sound_list {
        config.sound_list = path;
    }
    if let Some(path) = cli.out_dir {
        config.out_dir = path;
    }

    match cli.command {
        Command::Build { workers } => cmd_build(config, workers).await,
        Command::Release { no_readme } => cmd_release(&config, no_readme),
    }
}

/// Fetch and encode every clip in the sound list
async fn cmd_build(mut config: Config, workers: Option<usize>) -> anyhow::Result<()> {
    if let Some(workers) = workers {
        config.workers = workers;
    }
    config.validate()?;

    let catalog = Catalog::load(&config.sound_list)?;

    // Probe for ffmpeg before generating any network traffic
    let transcoder = FfmpegTranscoder::new(config.encode.clone())?;
    let source = GladosVoice::new(
        config.fetch.generate_url.clone(),
        config.fetch.timeout,
        config.fetch.retry.clone(),
    )?;
    let store = ClipStore::new(config.out_dir.clone(), config.stale_dir.clone());

    let total = catalog.len();
    println!("Building {total} clips with {} parallel workers...", config.workers);

    let pipeline = Pipeline::new(Arc::new(source), Arc::new(transcoder), store, config.workers);
    let report = pipeline.run(&catalog).await?;

    println!(
        "Done. OK: {}, Skipped: {}, Errors: {}",
        report.done,
        report.skipped,
        report.failed.len()
    );

    if !report.is_complete() {
        for failure in &report.failed {
            eprintln!("  [{}] {}", failure.index, failure.error);
        }
        anyhow::bail!("{} of {total} clips failed; no release possible", report.failed.len());
    }

    Ok(())
}

/// Package encoded clips and publish checksum, size, and URL
fn cmd_release(config: &Config, no_readme: bool) -> anyhow::Result<()> {
    let catalog = Catalog::load(&config.sound_list)?;

    let info = package::package(
        &config.out_dir,
        &catalog,
        &config.release.archive_path,
        Some(config.release.url.clone()),
    )?;

    if no_readme {
        tracing::debug!("skipping README update");
    } else {
        package::update_readme(&config.release.readme_path, &info)?;
    }

    println!("Voice pack released: {}", config.release.archive_path.display());
    println!("  Language:  {}", config.language);
    println!("  MD5:       {}", info.md5);
    println!("  File size: {} bytes", info.size_bytes);
    if let Some(url) = &info.url {
        println!("  URL:       {url}");
    }

    Ok(())
}
